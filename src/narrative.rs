//! Natural-language plan explanations
//!
//! Narration is optional garnish: a failing service is logged and yields
//! `None`, never touching the numeric results it describes.

use crate::error::BalanceError;
use crate::plan::SavedPlan;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Prompt plus optional context sent to an explanation service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl ExplanationRequest {
    /// Request a short, friendly explanation of a saved plan
    pub fn for_plan(plan: &SavedPlan) -> Self {
        let baseline = plan
            .baseline
            .map(|b| b.to_string())
            .unwrap_or_else(|| "not yet available".to_string());
        let context = format!(
            "Date: {}\nLBI: {}\nBaseline: {baseline}\nConfidence: {}\nCategory: {}\nFocus: {}\nActions: {}\nRule explanation: {}",
            plan.date,
            plan.index,
            plan.confidence,
            plan.category,
            plan.focus,
            plan.actions.join("; "),
            plan.explanation.as_deref().unwrap_or("")
        );
        Self {
            prompt: "Explain today's plan in two or three supportive sentences without adding new advice.".to_string(),
            context: Some(context),
        }
    }
}

/// Something that can turn a request into prose
pub trait ExplanationService {
    fn explain(&self, request: &ExplanationRequest) -> Result<String, BalanceError>;
}

/// Offline narrator that restates the rule explanation
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleNarrator;

impl ExplanationService for RuleNarrator {
    fn explain(&self, request: &ExplanationRequest) -> Result<String, BalanceError> {
        let context = request
            .context
            .as_deref()
            .ok_or_else(|| BalanceError::InvalidInput("explanation context is required".to_string()))?;
        let field = |name: &str| {
            context
                .lines()
                .find_map(|l| l.strip_prefix(name))
                .map(str::trim)
                .unwrap_or("")
        };
        Ok(format!(
            "Today's focus: {} {}",
            field("Focus:"),
            field("Rule explanation:").trim_start_matches("Plan logic: ")
        )
        .trim()
        .to_string())
    }
}

/// Ask `service` for prose, logging and swallowing any failure
pub fn narrate(service: &dyn ExplanationService, request: &ExplanationRequest) -> Option<String> {
    match service.explain(request) {
        Ok(text) if !text.trim().is_empty() => Some(text),
        Ok(_) => {
            warn!("explanation service returned empty text");
            None
        }
        Err(e) => {
            warn!(error = %e, "explanation service failed");
            None
        }
    }
}
