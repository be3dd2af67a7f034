//! FFI bindings for Synheart Cycle
//!
//! This module provides C-compatible functions for calling the engine from
//! mobile hosts. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using `cycle_free_string`.
//! Dates are passed as `YYYY-MM-DD` strings.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::NaiveDate;

use crate::error::CycleError;
use crate::pipeline::{forecast_from_json, health_samples_to_history};
use crate::store::CycleStore;
use crate::types::{parse_date, PeriodRecord, SymptomRecord};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
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

/// Read a required string argument, recording an error when it is missing
unsafe fn required_arg(ptr: *const c_char, name: &str) -> Option<String> {
    let value = cstr_to_string(ptr);
    if value.is_none() {
        set_last_error(&format!("Invalid {name} string pointer"));
    }
    value
}

/// Read a required date argument
unsafe fn required_date(ptr: *const c_char, name: &str) -> Option<NaiveDate> {
    let raw = required_arg(ptr, name)?;
    match parse_date(&raw) {
        Ok(date) => Some(date),
        Err(e) => {
            set_last_error(&e.to_string());
            None
        }
    }
}

fn result_to_cstr(result: Result<String, CycleError>) -> *mut c_char {
    match result {
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

/// Compute a forecast report from history JSON.
///
/// # Safety
/// - `history_json` and `today` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `cycle_free_string`.
/// - Returns NULL on error; call `cycle_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cycle_forecast(
    history_json: *const c_char,
    today: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(json) = required_arg(history_json, "history_json") else {
        return ptr::null_mut();
    };
    let Some(today) = required_date(today, "today") else {
        return ptr::null_mut();
    };

    result_to_cstr(forecast_from_json(&json, today))
}

/// Convert device flow samples JSON into history JSON.
///
/// # Safety
/// - `samples_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `cycle_free_string`.
/// - Returns NULL on error; call `cycle_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cycle_health_samples_to_history(
    samples_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(json) = required_arg(samples_json, "samples_json") else {
        return ptr::null_mut();
    };

    result_to_cstr(health_samples_to_history(&json))
}

// ============================================================================
// Stateful API
// ============================================================================

/// Opaque handle to a cycle store
pub struct CycleStoreHandle {
    store: CycleStore,
}

/// Create a new store from saved history JSON (or NULL for an empty store).
///
/// # Safety
/// - `history_json` must be NULL or a valid null-terminated C string.
/// - `today` must be a valid null-terminated C string.
/// - Returns a pointer that must be freed with `cycle_store_free`.
/// - Returns NULL on error; call `cycle_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cycle_store_new(
    history_json: *const c_char,
    today: *const c_char,
) -> *mut CycleStoreHandle {
    clear_last_error();

    let Some(today) = required_date(today, "today") else {
        return ptr::null_mut();
    };

    let store = match cstr_to_string(history_json) {
        Some(json) => match CycleStore::from_json(&json, today) {
            Ok(store) => store,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        },
        None => CycleStore::new(today),
    };

    Box::into_raw(Box::new(CycleStoreHandle { store }))
}

/// Free a store.
///
/// # Safety
/// - `store` must be a valid pointer returned by `cycle_store_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn cycle_store_free(store: *mut CycleStoreHandle) {
    if !store.is_null() {
        drop(Box::from_raw(store));
    }
}

/// Add a period (PeriodRecord JSON) and return the new snapshot JSON.
///
/// # Safety
/// - `store` must be a valid pointer returned by `cycle_store_new`.
/// - `record_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `cycle_free_string`.
/// - Returns NULL on error; call `cycle_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cycle_store_add_period(
    store: *mut CycleStoreHandle,
    record_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if store.is_null() {
        set_last_error("Null store pointer");
        return ptr::null_mut();
    }
    let handle = &mut *store;

    let Some(json) = required_arg(record_json, "record_json") else {
        return ptr::null_mut();
    };

    let result = serde_json::from_str::<PeriodRecord>(&json)
        .map_err(CycleError::from)
        .and_then(|record| {
            let snapshot = handle.store.add_period(record)?;
            serde_json::to_string(snapshot).map_err(CycleError::from)
        });
    result_to_cstr(result)
}

/// Add a symptom (SymptomRecord JSON) and return the new snapshot JSON.
///
/// # Safety
/// - `store` must be a valid pointer returned by `cycle_store_new`.
/// - `symptom_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `cycle_free_string`.
/// - Returns NULL on error; call `cycle_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cycle_store_add_symptom(
    store: *mut CycleStoreHandle,
    symptom_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if store.is_null() {
        set_last_error("Null store pointer");
        return ptr::null_mut();
    }
    let handle = &mut *store;

    let Some(json) = required_arg(symptom_json, "symptom_json") else {
        return ptr::null_mut();
    };

    let result = serde_json::from_str::<SymptomRecord>(&json)
        .map_err(CycleError::from)
        .and_then(|symptom| {
            let snapshot = handle.store.add_symptom(symptom)?;
            serde_json::to_string(snapshot).map_err(CycleError::from)
        });
    result_to_cstr(result)
}

/// Get the current snapshot JSON.
///
/// # Safety
/// - `store` must be a valid pointer returned by `cycle_store_new`.
/// - Returns a newly allocated string that must be freed with `cycle_free_string`.
/// - Returns NULL on error; call `cycle_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cycle_store_snapshot(store: *const CycleStoreHandle) -> *mut c_char {
    clear_last_error();

    if store.is_null() {
        set_last_error("Null store pointer");
        return ptr::null_mut();
    }
    let handle = &*store;

    result_to_cstr(serde_json::to_string(handle.store.snapshot()).map_err(CycleError::from))
}

/// Save the store's history as JSON.
///
/// # Safety
/// - `store` must be a valid pointer returned by `cycle_store_new`.
/// - Returns a newly allocated string that must be freed with `cycle_free_string`.
/// - Returns NULL on error; call `cycle_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cycle_store_save(store: *const CycleStoreHandle) -> *mut c_char {
    clear_last_error();

    if store.is_null() {
        set_last_error("Null store pointer");
        return ptr::null_mut();
    }
    let handle = &*store;

    result_to_cstr(handle.store.to_json())
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Cycle functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Cycle function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn cycle_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next Cycle function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn cycle_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Cycle library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn cycle_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
