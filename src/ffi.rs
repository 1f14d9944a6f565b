//! FFI bindings for the balance index engine
//!
//! This module provides C-compatible functions for calling the engine from other languages.
//! Inputs and outputs are JSON encoded as null-terminated C strings. Returned strings
//! are allocated here and must be freed by the caller using `lbi_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::adapters::{NormalizedCsvAdapter, WearableImportAdapter};
use crate::analytics::build_analytics_summary;
use crate::config::EngineConfig;
use crate::error::BalanceError;
use crate::pipeline::BalanceEngine;
use crate::plan::{generate_plan, PlanInput};
use crate::risk::{predict_tomorrow, train_if_ready, DualModels};
use crate::score::{score, ScoreInput};
use crate::store::{KvRepository, MemoryKv};
use crate::types::{CheckIn, DailyRecord, WearableMetrics};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Read a required string argument, recording an error when it is unusable
unsafe fn required_arg(ptr: *const c_char, name: &str) -> Result<String, BalanceError> {
    cstr_to_string(ptr).ok_or_else(|| BalanceError::InvalidInput(format!("Invalid {name} string pointer")))
}

fn parse_date(value: &str) -> Result<NaiveDate, BalanceError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| BalanceError::DateParseError(format!("{value}: {e}")))
}

/// Serialize a result, or record its error and return NULL
fn respond<T: Serialize>(result: Result<T, BalanceError>) -> *mut c_char {
    match result.and_then(|value| Ok(serde_json::to_string(&value)?)) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Score a day. Input is a `ScoreInput` JSON object; output is a `ScoreResult`.
///
/// # Safety
/// - `input_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `lbi_free_string`.
/// - Returns NULL on error; call `lbi_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lbi_score(input_json: *const c_char) -> *mut c_char {
    clear_last_error();
    respond(required_arg(input_json, "input JSON").and_then(|json| {
        let input: ScoreInput = serde_json::from_str(&json)?;
        Ok(score(&input))
    }))
}

/// Generate a plan from a `PlanInput` JSON object.
///
/// # Safety
/// - `input_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `lbi_free_string`.
/// - Returns NULL on error; call `lbi_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lbi_generate_plan(input_json: *const c_char) -> *mut c_char {
    clear_last_error();
    respond(required_arg(input_json, "input JSON").and_then(|json| {
        let input: PlanInput = serde_json::from_str(&json)?;
        Ok(generate_plan(&input))
    }))
}

/// Parse a normalized wearable CSV into `{days, errors}`.
///
/// Row errors are part of the output; only a bad pointer fails.
///
/// # Safety
/// - `csv` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `lbi_free_string`.
/// - Returns NULL on error; call `lbi_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lbi_parse_wearable_csv(csv: *const c_char) -> *mut c_char {
    clear_last_error();
    respond(required_arg(csv, "CSV").map(|text| NormalizedCsvAdapter.parse(&text)))
}

/// Analytics summary over a JSON array of daily records.
///
/// # Safety
/// - `records_json` must be a valid null-terminated C string.
/// - `window_days <= 0` selects the default window.
/// - Returns a newly allocated string that must be freed with `lbi_free_string`.
/// - Returns NULL on error; call `lbi_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lbi_analytics(records_json: *const c_char, window_days: i32) -> *mut c_char {
    clear_last_error();
    let window = if window_days <= 0 {
        EngineConfig::default().analytics_window_days
    } else {
        window_days as usize
    };
    respond(required_arg(records_json, "records JSON").and_then(|json| {
        let records: Vec<DailyRecord> = serde_json::from_str(&json)?;
        Ok(build_analytics_summary(&records, window, Utc::now()))
    }))
}

/// Train the risk models over a JSON array of daily records.
///
/// Output is a `TrainOutcome`; persisting the models is up to the caller.
///
/// # Safety
/// - `records_json` must be a valid null-terminated C string.
/// - `config_json` may be NULL for default settings.
/// - Returns a newly allocated string that must be freed with `lbi_free_string`.
/// - Returns NULL on error; call `lbi_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lbi_train(records_json: *const c_char, config_json: *const c_char) -> *mut c_char {
    clear_last_error();
    let config = cstr_to_string(config_json);
    respond(required_arg(records_json, "records JSON").and_then(|json| {
        let records: Vec<DailyRecord> = serde_json::from_str(&json)?;
        let config = match config {
            Some(c) => EngineConfig::from_json(&c)?,
            None => EngineConfig::default(),
        };
        Ok(train_if_ready(&records, &config.dataset, &config.training))
    }))
}

/// Predict tomorrow's risk from records and an optional model blob.
///
/// # Safety
/// - `records_json` must be a valid null-terminated C string.
/// - `models_json` may be NULL when no models have been trained.
/// - Returns a newly allocated string that must be freed with `lbi_free_string`.
/// - Returns NULL on error; call `lbi_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lbi_predict(records_json: *const c_char, models_json: *const c_char) -> *mut c_char {
    clear_last_error();
    let models = cstr_to_string(models_json);
    respond(required_arg(records_json, "records JSON").and_then(|json| {
        let records: Vec<DailyRecord> = serde_json::from_str(&json)?;
        let models = models.map(|m| DualModels::from_json(&m)).transpose()?;
        let config = EngineConfig::default();
        Ok(predict_tomorrow(&records, models.as_ref(), &config.dataset))
    }))
}

// ============================================================================
// Stateful Engine API
// ============================================================================

/// Opaque handle to an in-memory engine
pub struct BalanceEngineHandle {
    engine: BalanceEngine<KvRepository<MemoryKv>>,
}

/// Create an in-memory engine.
///
/// # Safety
/// - `config_json` may be NULL for default settings.
/// - Must be freed with `lbi_engine_free`.
/// - Returns NULL on error; call `lbi_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lbi_engine_new(config_json: *const c_char) -> *mut BalanceEngineHandle {
    clear_last_error();

    let config = match cstr_to_string(config_json) {
        Some(json) => match EngineConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        },
        None => EngineConfig::default(),
    };

    let engine = BalanceEngine::new(KvRepository::new(MemoryKv::new()), config);
    Box::into_raw(Box::new(BalanceEngineHandle { engine }))
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `lbi_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn lbi_engine_free(engine: *mut BalanceEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Record wearable metrics for a `YYYY-MM-DD` date; returns the day refresh or `null`.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `lbi_engine_new`.
/// - `date` and `wearable_json` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `lbi_free_string`.
/// - Returns NULL on error; call `lbi_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lbi_engine_record_wearable(
    engine: *mut BalanceEngineHandle,
    date: *const c_char,
    wearable_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }
    let handle = &*engine;

    respond((|| -> Result<_, BalanceError> {
        let date = parse_date(&required_arg(date, "date")?)?;
        let wearable: WearableMetrics = serde_json::from_str(&required_arg(wearable_json, "wearable JSON")?)?;
        handle.engine.record_wearable(date, wearable, None)
    })())
}

/// Record a check-in for a `YYYY-MM-DD` date; returns the day refresh or `null`.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `lbi_engine_new`.
/// - `date` and `check_in_json` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `lbi_free_string`.
/// - Returns NULL on error; call `lbi_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lbi_engine_record_check_in(
    engine: *mut BalanceEngineHandle,
    date: *const c_char,
    check_in_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }
    let handle = &*engine;

    respond((|| -> Result<_, BalanceError> {
        let date = parse_date(&required_arg(date, "date")?)?;
        let check_in: CheckIn = serde_json::from_str(&required_arg(check_in_json, "check-in JSON")?)?;
        handle.engine.record_check_in(date, check_in)
    })())
}

/// Explain a `YYYY-MM-DD` date from the engine's stored records.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `lbi_engine_new`.
/// - `date` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `lbi_free_string`.
/// - Returns NULL on error; call `lbi_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lbi_engine_explain_day(engine: *mut BalanceEngineHandle, date: *const c_char) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }
    let handle = &*engine;

    respond(required_arg(date, "date").and_then(|d| handle.engine.explain_day(parse_date(&d)?)))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by engine functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an `lbi_*` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn lbi_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next `lbi_*` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn lbi_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn lbi_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
