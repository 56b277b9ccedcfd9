//! FFI (Foreign Function Interface) bindings for cross-language interop.
//!
//! This module exposes the presence transfer protocol through C-compatible
//! functions that can be called from Swift (macOS) and C# (Windows).
//!
//! # Memory Management
//!
//! - Rust allocates memory and returns pointers to Swift/C#
//! - The calling code MUST call the corresponding `_free` functions to prevent leaks
//! - Strings are null-terminated UTF-8
//!
//! # Usage from Swift (macOS)
//!
//! ```swift
//! let presence = presencebridge_query_module(modulePath, configJson)
//! defer { presencebridge_free_presence(presence) }
//!
//! if presence?.pointee.available != 0 {
//!     // Use presence data...
//! }
//! ```
//!
//! # Usage from C# (Windows)
//!
//! ```csharp
//! [DllImport("presencebridge_core.dll")]
//! private static extern IntPtr presencebridge_query_module(string path, string config);
//!
//! [DllImport("presencebridge_core.dll")]
//! private static extern void presencebridge_free_presence(IntPtr presence);
//! ```

use crate::config::PresenceConfig;
use crate::context::PresenceContext;
use crate::icons::{cache_icon_data, clear_icon_cache, get_cached_icon_path};
use crate::json;
use crate::resolver::ModuleHandle;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr;
use std::slice;
use tracing::warn;

// ============================================================================
// C-Compatible Types
// ============================================================================

/// C-compatible presence information, decoded to UTF-8.
#[repr(C)]
pub struct CPresence {
    pub client_id: u64,
    pub state: *mut c_char,
    pub details: *mut c_char,
    pub large_icon_url: *mut c_char,
    pub small_icon_url: *mut c_char,
    /// 1 when the companion reported presence, 0 for the degraded state.
    pub available: c_int,
}

// ============================================================================
// Presence Query
// ============================================================================

/// Query a companion module for its current presence.
///
/// `module_path` is the path to the companion dynamic library; a module that
/// fails to load degrades to "unavailable" rather than erroring. `config_json`
/// may be null for defaults. Returns null only on hard errors (bad UTF-8
/// argument, malformed configuration, boundary conversion failure).
///
/// Caller MUST call presencebridge_free_presence() when done.
#[no_mangle]
pub extern "C" fn presencebridge_query_module(
    module_path: *const c_char,
    config_json: *const c_char,
) -> *mut CPresence {
    if module_path.is_null() {
        return ptr::null_mut();
    }

    let path = unsafe {
        match CStr::from_ptr(module_path).to_str() {
            Ok(s) => s,
            Err(_) => return ptr::null_mut(),
        }
    };

    let config = if config_json.is_null() {
        PresenceConfig::default()
    } else {
        let text = unsafe {
            match CStr::from_ptr(config_json).to_str() {
                Ok(s) => s,
                Err(_) => return ptr::null_mut(),
            }
        };
        match parse_config_lenient(text) {
            Some(config) => config,
            None => return ptr::null_mut(),
        }
    };

    let module = ModuleHandle::open(Path::new(path));
    match PresenceContext::query(&module, &config) {
        Ok(context) => Box::into_raw(Box::new(presence_to_c(&context))),
        Err(e) => {
            warn!(error = %e, "presence configuration did not cross the boundary");
            ptr::null_mut()
        }
    }
}

/// Free a CPresence struct returned by presencebridge_query_module().
#[no_mangle]
pub extern "C" fn presencebridge_free_presence(presence: *mut CPresence) {
    if !presence.is_null() {
        unsafe {
            let p = Box::from_raw(presence);
            free_c_char(p.state);
            free_c_char(p.details);
            free_c_char(p.large_icon_url);
            free_c_char(p.small_icon_url);
        }
    }
}

/// Accept unknown keys and wrongly-typed optional fields; reject only input
/// that is not a JSON object at all.
fn parse_config_lenient(text: &str) -> Option<PresenceConfig> {
    let value = json::parse_object(text).ok()?;
    Some(PresenceConfig {
        app_id: json::str_field(&value, "app_id").unwrap_or_default().to_owned(),
        locale: json::str_field(&value, "locale").map(str::to_owned),
        show_elapsed: json::bool_field(&value, "show_elapsed").unwrap_or(false),
    })
}

fn presence_to_c(context: &PresenceContext) -> CPresence {
    CPresence {
        client_id: context.client_id(),
        state: opt_to_c_char(context.state()),
        details: opt_to_c_char(context.details()),
        large_icon_url: opt_to_c_char(context.large_icon_url()),
        small_icon_url: opt_to_c_char(context.small_icon_url()),
        available: context.is_available() as c_int,
    }
}

// ============================================================================
// Icon Management
// ============================================================================

/// Cache icon data for a given URL.
/// This should be called by the native UI after downloading the icon.
/// Returns the cached file path on success, or null on error.
/// Caller MUST call presencebridge_free_string() when done.
#[no_mangle]
pub extern "C" fn presencebridge_cache_icon(
    icon_url: *const c_char,
    data: *const u8,
    data_length: c_int,
) -> *mut c_char {
    if icon_url.is_null() || data.is_null() || data_length <= 0 {
        return ptr::null_mut();
    }

    unsafe {
        let url = match CStr::from_ptr(icon_url).to_str() {
            Ok(s) => s,
            Err(_) => return ptr::null_mut(),
        };

        let data_slice = slice::from_raw_parts(data, data_length as usize);

        match cache_icon_data(url, data_slice) {
            Ok(path) => string_to_c_char(&path.to_string_lossy()),
            Err(e) => {
                warn!(error = %e, "failed to cache icon");
                ptr::null_mut()
            }
        }
    }
}

/// Get the cached icon path for a URL, if it exists.
/// Returns null if the icon is not cached.
/// Caller MUST call presencebridge_free_string() when done.
#[no_mangle]
pub extern "C" fn presencebridge_get_cached_icon_path(icon_url: *const c_char) -> *mut c_char {
    if icon_url.is_null() {
        return ptr::null_mut();
    }

    unsafe {
        let url = match CStr::from_ptr(icon_url).to_str() {
            Ok(s) => s,
            Err(_) => return ptr::null_mut(),
        };

        match get_cached_icon_path(url) {
            Some(path) => string_to_c_char(&path.to_string_lossy()),
            None => ptr::null_mut(),
        }
    }
}

/// Clear all cached icons.
/// Returns 0 on success, 1 on error.
#[no_mangle]
pub extern "C" fn presencebridge_clear_icon_cache() -> c_int {
    match clear_icon_cache() {
        Ok(_) => 0,
        Err(e) => {
            warn!(error = %e, "failed to clear icon cache");
            1
        }
    }
}

// ============================================================================
// String Management
// ============================================================================

/// Free a string returned by FFI functions.
#[no_mangle]
pub extern "C" fn presencebridge_free_string(s: *mut c_char) {
    free_c_char(s);
}

// ============================================================================
// Helper Functions
// ============================================================================

fn string_to_c_char(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(c_str) => c_str.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn opt_to_c_char(s: Option<&str>) -> *mut c_char {
    s.map(string_to_c_char).unwrap_or(ptr::null_mut())
}

fn free_c_char(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            let _ = CString::from_raw(s);
        }
    }
}
