//! The host-side owner of one presence block.
//!
//! A [`PresenceContext`] is built once, at query time, and is immutable
//! afterwards except for its lazy decode caches and the terminal `close()`
//! transition. "Feature not available" is a first-class degraded state, never
//! an error: a detached module, a missing export, a non-success result code
//! and a null block all land in the same place, a context that reports
//! `is_available() == false` and absent fields.
//!
//! Contexts are single-threaded by construction (`!Send`/`!Sync` via the raw
//! pointer they own); disposal happens on the owning thread, explicitly via
//! `close()` or deterministically on drop.

use std::cell::OnceCell;
use std::ptr;

use tracing::debug;

use crate::block::{BlockHandle, RawPresenceBlock};
use crate::config::{BoundaryConfig, BoundaryError};
use crate::resolver::{PresenceSource, PRESENCE_OK, PRESENCE_QUERY_EXPORT};

pub struct PresenceContext {
    block: Option<BlockHandle>,
    // Decode-once caches: each UTF-16 field is decoded on first access and
    // served from here afterwards.
    state: OnceCell<Option<String>>,
    details: OnceCell<Option<String>>,
    large_icon_url: OnceCell<Option<String>>,
    small_icon_url: OnceCell<Option<String>>,
}

impl PresenceContext {
    /// Query a presence source with the given configuration.
    ///
    /// Transitions, in order:
    /// 1. detached source → unavailable, no export lookup attempted;
    /// 2. export missing → unavailable;
    /// 3. configuration converted to its boundary handle (the only step that
    ///    can fail, and the failure propagates);
    /// 4. export invoked with the handle and an out-pointer;
    /// 5. result code `PRESENCE_OK` with a non-null block → the context takes
    ///    sole ownership of the block; anything else → unavailable, and the
    ///    context neither retains nor frees whatever the callee wrote.
    pub fn query<S, C>(source: &S, config: &C) -> Result<Self, BoundaryError>
    where
        S: PresenceSource,
        C: BoundaryConfig,
    {
        if !source.is_attached() {
            debug!("no companion module attached, presence unavailable");
            return Ok(Self::unavailable());
        }
        let Some(export) = source.presence_export() else {
            debug!(export = PRESENCE_QUERY_EXPORT, "presence export not found");
            return Ok(Self::unavailable());
        };

        let block = config.with_boundary_handle(|handle| {
            let mut out: *mut RawPresenceBlock = ptr::null_mut();
            let code = unsafe { export(handle, &mut out) };
            if code == PRESENCE_OK && !out.is_null() {
                // Ownership transfers here, atomically with the ok code.
                Some(unsafe { BlockHandle::from_raw(out) })
            } else {
                // Never took ownership, so never free: a failing callee keeps
                // whatever it wrote through the out-pointer.
                debug!(code, "presence query reported no data");
                None
            }
        })?;

        Ok(Self {
            block,
            state: OnceCell::new(),
            details: OnceCell::new(),
            large_icon_url: OnceCell::new(),
            small_icon_url: OnceCell::new(),
        })
    }

    fn unavailable() -> Self {
        Self {
            block: None,
            state: OnceCell::new(),
            details: OnceCell::new(),
            large_icon_url: OnceCell::new(),
            small_icon_url: OnceCell::new(),
        }
    }

    /// True iff the query produced a block this context owns.
    pub fn is_available(&self) -> bool {
        self.block.is_some()
    }

    /// The reported application identifier, or 0 when unavailable.
    pub fn client_id(&self) -> u64 {
        self.block.as_ref().map_or(0, BlockHandle::client_id)
    }

    pub fn state(&self) -> Option<&str> {
        self.state
            .get_or_init(|| self.block.as_ref().and_then(BlockHandle::read_state))
            .as_deref()
    }

    pub fn details(&self) -> Option<&str> {
        self.details
            .get_or_init(|| self.block.as_ref().and_then(BlockHandle::read_details))
            .as_deref()
    }

    pub fn large_icon_url(&self) -> Option<&str> {
        self.large_icon_url
            .get_or_init(|| self.block.as_ref().and_then(BlockHandle::read_large_icon_url))
            .as_deref()
    }

    pub fn small_icon_url(&self) -> Option<&str> {
        self.small_icon_url
            .get_or_init(|| self.block.as_ref().and_then(BlockHandle::read_small_icon_url))
            .as_deref()
    }

    /// Release the block (sub-fields first, then the block itself) and clear
    /// the decode caches. Idempotent; `Drop` is the deterministic fallback.
    ///
    /// Taking `&mut self` means no decoded view handed out by an accessor can
    /// still be live when disposal runs.
    pub fn close(&mut self) {
        if let Some(mut block) = self.block.take() {
            block.close();
        }
        self.state.take();
        self.details.take();
        self.large_icon_url.take();
        self.small_icon_url.take();
    }
}

impl Drop for PresenceContext {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PresenceConfig;
    use crate::producer::emit_block;
    use crate::resolver::PresenceQueryFn;
    use std::cell::Cell;
    use std::ffi::c_void;
    use std::sync::atomic::{AtomicPtr, Ordering};

    /// Counting double for the resolver seam.
    struct CountingSource {
        attached: bool,
        export: Option<PresenceQueryFn>,
        lookups: Cell<u32>,
    }

    impl CountingSource {
        fn new(attached: bool, export: Option<PresenceQueryFn>) -> Self {
            Self {
                attached,
                export,
                lookups: Cell::new(0),
            }
        }
    }

    impl PresenceSource for CountingSource {
        fn is_attached(&self) -> bool {
            self.attached
        }

        fn presence_export(&self) -> Option<PresenceQueryFn> {
            self.lookups.set(self.lookups.get() + 1);
            self.export
        }
    }

    unsafe extern "C" fn export_icon_only(
        _config: *mut c_void,
        out: *mut *mut RawPresenceBlock,
    ) -> i32 {
        *out = emit_block(42, None, None, Some("icon.png"), None);
        PRESENCE_OK
    }

    unsafe extern "C" fn export_absent(
        _config: *mut c_void,
        out: *mut *mut RawPresenceBlock,
    ) -> i32 {
        *out = ptr::null_mut();
        PRESENCE_OK
    }

    // Stashes the state buffer so a test can overwrite the source bytes
    // between two accessor reads.
    static STATE_BUFFER: AtomicPtr<u16> = AtomicPtr::new(ptr::null_mut());

    unsafe extern "C" fn export_with_state(
        _config: *mut c_void,
        out: *mut *mut RawPresenceBlock,
    ) -> i32 {
        let block = emit_block(7, Some("alpha"), None, None, None);
        STATE_BUFFER.store((*block).state, Ordering::SeqCst);
        *out = block;
        PRESENCE_OK
    }

    // Stashes the block so a test can verify the context left it alone.
    static REJECTED_BLOCK: AtomicPtr<RawPresenceBlock> = AtomicPtr::new(ptr::null_mut());

    unsafe extern "C" fn export_failure_code(
        _config: *mut c_void,
        out: *mut *mut RawPresenceBlock,
    ) -> i32 {
        let block = emit_block(7, Some("ignored"), None, None, None);
        REJECTED_BLOCK.store(block, Ordering::SeqCst);
        *out = block;
        1
    }

    fn config() -> PresenceConfig {
        PresenceConfig {
            app_id: "42".into(),
            ..Default::default()
        }
    }

    #[test]
    fn successful_query_round_trips_fields() {
        let source = CountingSource::new(true, Some(export_icon_only));
        let ctx = PresenceContext::query(&source, &config()).unwrap();
        assert!(ctx.is_available());
        assert_eq!(ctx.client_id(), 42);
        assert_eq!(ctx.large_icon_url(), Some("icon.png"));
        assert_eq!(ctx.small_icon_url(), None);
        assert_eq!(ctx.state(), None);
        assert_eq!(ctx.details(), None);
    }

    #[test]
    fn detached_source_skips_export_lookup() {
        let source = CountingSource::new(false, Some(export_icon_only));
        let ctx = PresenceContext::query(&source, &config()).unwrap();
        assert!(!ctx.is_available());
        assert_eq!(source.lookups.get(), 0);
    }

    #[test]
    fn missing_export_is_unavailable() {
        let source = CountingSource::new(true, None);
        let ctx = PresenceContext::query(&source, &config()).unwrap();
        assert!(!ctx.is_available());
        assert_eq!(source.lookups.get(), 1);
    }

    #[test]
    fn success_code_with_null_block_is_unavailable() {
        let source = CountingSource::new(true, Some(export_absent));
        let ctx = PresenceContext::query(&source, &config()).unwrap();
        assert!(!ctx.is_available());
        assert_eq!(ctx.client_id(), 0);
        assert_eq!(ctx.state(), None);
        assert_eq!(ctx.large_icon_url(), None);
    }

    #[test]
    fn failure_code_block_is_neither_retained_nor_freed() {
        let source = CountingSource::new(true, Some(export_failure_code));
        {
            let ctx = PresenceContext::query(&source, &config()).unwrap();
            assert!(!ctx.is_available());
            assert_eq!(ctx.client_id(), 0);
            assert_eq!(ctx.state(), None);
        }
        // The context never owned the rejected block: after it is dropped,
        // the callee's allocation is still intact and the test frees it.
        let rejected = REJECTED_BLOCK.swap(ptr::null_mut(), Ordering::SeqCst);
        assert!(!rejected.is_null());
        let mut leftover = unsafe { BlockHandle::from_raw(rejected) };
        assert_eq!(leftover.client_id(), 7);
        assert_eq!(leftover.read_state().as_deref(), Some("ignored"));
        leftover.close();
    }

    #[test]
    fn string_fields_decode_once() {
        let source = CountingSource::new(true, Some(export_with_state));
        let ctx = PresenceContext::query(&source, &config()).unwrap();
        let first = ctx.state().map(str::to_owned);
        assert_eq!(first.as_deref(), Some("alpha"));

        // Overwrite the source buffer in place. A second read must come from
        // the cache, not from a fresh decode.
        let buffer = STATE_BUFFER.swap(ptr::null_mut(), Ordering::SeqCst);
        assert!(!buffer.is_null());
        for (i, unit) in "omega".encode_utf16().enumerate() {
            unsafe { *buffer.add(i) = unit };
        }

        assert_eq!(ctx.state(), first.as_deref());
        assert_eq!(ctx.state(), Some("alpha"));
    }

    #[test]
    fn close_is_idempotent_and_terminal() {
        let source = CountingSource::new(true, Some(export_icon_only));
        let mut ctx = PresenceContext::query(&source, &config()).unwrap();
        assert!(ctx.is_available());
        ctx.close();
        assert!(!ctx.is_available());
        assert_eq!(ctx.client_id(), 0);
        assert_eq!(ctx.large_icon_url(), None);
        ctx.close();
        assert!(!ctx.is_available());
    }

    #[test]
    fn unavailable_context_reports_defaults_everywhere() {
        let source = CountingSource::new(false, None);
        let ctx = PresenceContext::query(&source, &config()).unwrap();
        assert!(!ctx.is_available());
        assert_eq!(ctx.client_id(), 0);
        assert_eq!(ctx.state(), None);
        assert_eq!(ctx.details(), None);
        assert_eq!(ctx.large_icon_url(), None);
        assert_eq!(ctx.small_icon_url(), None);
    }

    #[test]
    fn interior_nul_config_propagates_as_error() {
        let source = CountingSource::new(true, Some(export_icon_only));
        let bad = PresenceConfig {
            app_id: "nul\0inside".into(),
            ..Default::default()
        };
        assert!(PresenceContext::query(&source, &bad).is_err());
    }
}
