//! Caller-side configuration and its boundary representation.
//!
//! A [`PresenceConfig`] lives entirely in host memory. To cross into a
//! companion module it is converted into a [`RawQueryConfig`] whose C strings
//! are valid only for the duration of one call; the conversion is exposed as
//! a closure-scoped handle so the pointer cannot be retained past the call.

use std::ffi::{c_void, CString};
use std::fs;
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Host-side presence configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Application identity the companion should report presence for.
    pub app_id: String,
    /// BCP 47 locale tag for localized presence text, if any.
    pub locale: Option<String>,
    /// Whether the companion should include elapsed-time information.
    pub show_elapsed: bool,
}

impl PresenceConfig {
    pub fn from_json(input: &str) -> anyhow::Result<Self> {
        serde_json::from_str(input).context("Failed to parse presence configuration")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read configuration file: {:?}", path))?;
        Self::from_json(&content)
    }
}

/// The boundary view of a configuration, as companion modules read it.
///
/// Opaque to the transfer protocol itself, which only ever passes it along
/// as `*mut c_void`.
#[repr(C)]
pub struct RawQueryConfig {
    /// Never null.
    pub app_id: *const c_char,
    /// Null when no locale is set.
    pub locale: *const c_char,
    pub show_elapsed: u8,
}

/// Conversion failures at the boundary. Absence of a feature is never an
/// error; only a configuration that cannot be represented across the
/// boundary is.
#[derive(Debug, thiserror::Error)]
pub enum BoundaryError {
    #[error("configuration field `{field}` contains an interior nul byte")]
    InteriorNul { field: &'static str },
}

/// Produces a boundary-stable handle for one call.
///
/// The handle is only valid inside the closure; callees must not retain it.
pub trait BoundaryConfig {
    fn with_boundary_handle<R, F>(&self, f: F) -> Result<R, BoundaryError>
    where
        F: FnOnce(*mut c_void) -> R;
}

impl BoundaryConfig for PresenceConfig {
    fn with_boundary_handle<R, F>(&self, f: F) -> Result<R, BoundaryError>
    where
        F: FnOnce(*mut c_void) -> R,
    {
        let app_id = CString::new(self.app_id.as_str())
            .map_err(|_| BoundaryError::InteriorNul { field: "app_id" })?;
        let locale = self
            .locale
            .as_deref()
            .map(CString::new)
            .transpose()
            .map_err(|_| BoundaryError::InteriorNul { field: "locale" })?;

        // The CStrings outlive the closure call, so the raw view stays valid
        // exactly as long as the handle does.
        let mut raw = RawQueryConfig {
            app_id: app_id.as_ptr(),
            locale: locale.as_ref().map_or(ptr::null(), |c| c.as_ptr()),
            show_elapsed: self.show_elapsed as u8,
        };
        Ok(f(&mut raw as *mut RawQueryConfig as *mut c_void))
    }
}
