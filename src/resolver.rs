//! Export resolution for companion modules.
//!
//! Companion modules are ordinary dynamic libraries. Every export lookup here
//! is advisory: a detached handle or a missing symbol is a normal outcome and
//! surfaces as `None`, never as an error. Features whose export is absent
//! simply report unavailable upstream.

use std::ffi::c_void;
use std::path::Path;

use libloading::{Library, Symbol};
use tracing::debug;

use crate::block::RawPresenceBlock;

/// The fixed, protocol-defined name of the presence query export.
pub const PRESENCE_QUERY_EXPORT: &str = "GetCurrentPresenceInfo";

/// Result code a presence export returns on success. Any other value means
/// the out-pointer must be ignored.
pub const PRESENCE_OK: i32 = 0;

/// Calling signature of the presence query export: an opaque configuration
/// handle in, an out-pointer the callee fills with a block it allocated, and
/// a signed 32-bit result code back.
pub type PresenceQueryFn =
    unsafe extern "C" fn(*mut c_void, *mut *mut RawPresenceBlock) -> i32;

/// A loaded companion module, or the null handle.
///
/// `None` inside is the null module handle: "no module" is a first-class
/// state, not an error, and is indistinguishable downstream from a module
/// that lacks the feature.
pub struct ModuleHandle {
    library: Option<Library>,
}

impl ModuleHandle {
    /// The null handle. Every lookup on it reports absence.
    pub fn detached() -> Self {
        Self { library: None }
    }

    /// Wrap an already-loaded library.
    pub fn from_library(library: Library) -> Self {
        Self {
            library: Some(library),
        }
    }

    /// Load a companion module from disk. A module that fails to load
    /// degrades to the detached handle; loading is best-effort because a
    /// missing companion just means the feature is unavailable.
    pub fn open(path: &Path) -> Self {
        match unsafe { Library::new(path) } {
            Ok(library) => Self::from_library(library),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "companion module did not load");
                Self::detached()
            }
        }
    }

    pub fn is_attached(&self) -> bool {
        self.library.is_some()
    }

    /// Look up an export under a caller-declared signature.
    ///
    /// Absence (detached handle or missing symbol) is `None`, never an error.
    ///
    /// # Safety
    ///
    /// Native symbol tables are untyped: `T` is a type-level claim the caller
    /// makes about the export. A mismatch between the declared and actual
    /// signature is undefined behavior at the call site.
    pub unsafe fn resolve<T>(&self, name: &str) -> Option<Symbol<'_, T>> {
        let library = self.library.as_ref()?;
        library.get(name.as_bytes()).ok()
    }
}

/// The seam between module handling and the transfer protocol.
///
/// Production code implements this on [`ModuleHandle`]; tests implement it
/// with counting doubles and synthetic exports.
pub trait PresenceSource {
    /// False for the null module handle. When false, no export lookup is
    /// ever attempted.
    fn is_attached(&self) -> bool;

    /// Resolve the presence query export, if the module carries one.
    fn presence_export(&self) -> Option<PresenceQueryFn>;
}

impl PresenceSource for ModuleHandle {
    fn is_attached(&self) -> bool {
        ModuleHandle::is_attached(self)
    }

    fn presence_export(&self) -> Option<PresenceQueryFn> {
        // Copying the fn pointer out of the Symbol is sound for as long as
        // the library stays loaded, which this handle guarantees.
        let export = unsafe {
            self.resolve::<PresenceQueryFn>(PRESENCE_QUERY_EXPORT)
                .map(|symbol| *symbol)
        };
        if export.is_none() {
            debug!(export = PRESENCE_QUERY_EXPORT, "export not present in module");
        }
        export
    }
}
