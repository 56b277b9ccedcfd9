//! The fixed-layout presence record handed across the companion-module boundary.
//!
//! A companion module allocates one `RawPresenceBlock` plus a separate buffer
//! for each non-null string field, all from the C runtime allocator, and hands
//! the block back through an out-pointer. From that moment the host side owns
//! everything and must free it exactly once, sub-fields first, then the block.
//!
//! # Layout
//!
//! Field order is part of the protocol and must not change:
//!
//! | offset | field            | contents                                  |
//! |--------|------------------|-------------------------------------------|
//! | 0      | `client_id`      | 64-bit application identifier             |
//! | 8      | `state`          | UTF-16 string buffer, null if unset       |
//! | 16     | `details`        | UTF-16 string buffer, null if unset       |
//! | 24     | `large_icon_url` | UTF-16 string buffer, null if unset       |
//! | 32     | `small_icon_url` | UTF-16 string buffer, null if unset       |
//! | 40     | `reserved`       | opaque, currently always null             |
//!
//! 48 bytes total on 64-bit targets. String buffers are zero-terminated
//! UTF-16 code units, by convention at most 256 characters of payload; the
//! limit is a producer-side convention and is not enforced here.

use std::ffi::c_void;
use std::ptr;

/// The wire record. `#[repr(C)]` pins the field order above.
#[repr(C)]
pub struct RawPresenceBlock {
    pub client_id: u64,
    pub state: *mut u16,
    pub details: *mut u16,
    pub large_icon_url: *mut u16,
    pub small_icon_url: *mut u16,
    /// Forward-compatibility slot. Freed as a raw allocation if non-null,
    /// never interpreted.
    pub reserved: *mut c_void,
}

/// Sole owner of one `RawPresenceBlock` allocation.
///
/// The internal pointer doubles as the disposal tombstone: once `close()` has
/// run it is null and every accessor degrades to its "absent" value. The raw
/// owning pointer is never exposed; callers only ever see decoded copies.
///
/// Holding a raw pointer makes this type `!Send`/`!Sync`, which matches the
/// single-owning-thread contract of the protocol.
pub struct BlockHandle {
    ptr: *mut RawPresenceBlock,
}

impl BlockHandle {
    /// Take ownership of a block returned by a companion export.
    ///
    /// A null pointer yields an inert handle that reports every field as
    /// absent and whose `close()` is a no-op.
    ///
    /// # Safety
    ///
    /// `ptr` must be null, or a block allocated with the C runtime allocator
    /// whose string and reserved fields are each null or separately allocated
    /// the same way, and no other owner may remain.
    pub unsafe fn from_raw(ptr: *mut RawPresenceBlock) -> Self {
        Self { ptr }
    }

    /// True until `close()` has run (or the handle was built from null).
    pub fn is_open(&self) -> bool {
        !self.ptr.is_null()
    }

    pub fn client_id(&self) -> u64 {
        if self.ptr.is_null() {
            return 0;
        }
        unsafe { (*self.ptr).client_id }
    }

    pub fn read_state(&self) -> Option<String> {
        if self.ptr.is_null() {
            return None;
        }
        unsafe { read_wide((*self.ptr).state) }
    }

    pub fn read_details(&self) -> Option<String> {
        if self.ptr.is_null() {
            return None;
        }
        unsafe { read_wide((*self.ptr).details) }
    }

    pub fn read_large_icon_url(&self) -> Option<String> {
        if self.ptr.is_null() {
            return None;
        }
        unsafe { read_wide((*self.ptr).large_icon_url) }
    }

    pub fn read_small_icon_url(&self) -> Option<String> {
        if self.ptr.is_null() {
            return None;
        }
        unsafe { read_wide((*self.ptr).small_icon_url) }
    }

    /// Two-phase disposal: free each owned sub-allocation in field order,
    /// then the block itself, then tombstone. Idempotent.
    pub fn close(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        unsafe {
            // Exhaustive destructuring keeps the free list in sync with the
            // struct: adding a field is a compile error here until handled.
            let RawPresenceBlock {
                client_id: _,
                state,
                details,
                large_icon_url,
                small_icon_url,
                reserved,
            } = ptr::read(self.ptr);

            free_wide(state);
            free_wide(details);
            free_wide(large_icon_url);
            free_wide(small_icon_url);
            if !reserved.is_null() {
                // Opaque slot: a matching raw free, no interpretation.
                libc::free(reserved);
            }
            libc::free(self.ptr as *mut c_void);
        }
        self.ptr = ptr::null_mut();
    }
}

impl Drop for BlockHandle {
    fn drop(&mut self) {
        // Explicit close() already tombstoned, making this a no-op.
        self.close();
    }
}

/// Decode a zero-terminated UTF-16 buffer into an owned string.
///
/// Never mutates or frees the source buffer. Decoding is lossy; the producer
/// side is trusted to write well-formed UTF-16 and a stray unpaired surrogate
/// becomes U+FFFD rather than an error.
///
/// # Safety
///
/// `ptr` must be null or point to a readable buffer terminated by a zero
/// code unit.
unsafe fn read_wide(ptr: *const u16) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let mut len = 0usize;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    let units = std::slice::from_raw_parts(ptr, len);
    Some(String::from_utf16_lossy(units))
}

unsafe fn free_wide(ptr: *mut u16) {
    if !ptr.is_null() {
        libc::free(ptr as *mut c_void);
    }
}
