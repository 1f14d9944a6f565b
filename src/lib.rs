//! Balance Index - On-device life balance engine
//!
//! Turns daily wearable metrics and self-report check-ins into a 0-100 life
//! balance index through a deterministic pipeline: scoring → baseline →
//! plan rules → explanation. Around that spine sit consistency scoring,
//! descriptive analytics and a small personal logistic-regression model that
//! estimates tomorrow's risk of a drop.
//!
//! ## Modules
//!
//! - **Scoring & plans**: `score`, `baseline`, `plan`
//! - **Explainability**: `explain` (drivers, what-ifs, coverage, patterns)
//! - **History**: `consistency`, `analytics`, `risk`
//! - **Persistence & IO**: `store`, `adapters`, `export`, `ffi`

pub mod adapters;
pub mod analytics;
pub mod baseline;
pub mod config;
pub mod consistency;
pub mod error;
pub mod explain;
pub mod export;
pub mod narrative;
pub mod pipeline;
pub mod plan;
pub mod risk;
pub mod score;
pub mod stats;
pub mod store;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use baseline::{compute_baseline, compute_baseline_meta, BaselineMeta};
pub use config::EngineConfig;
pub use error::BalanceError;
pub use pipeline::{BalanceEngine, DayRefresh, ImportSummary};
pub use plan::{generate_plan, GeneratedPlan, PlanInput, SavedPlan};
pub use score::{score, ScoreInput, ScoreResult};

/// Engine version
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
