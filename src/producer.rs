//! Allocation helpers for the companion side of the presence protocol.
//!
//! A companion module written in Rust can use these to build the block the
//! host will later free. Everything comes from the C runtime allocator, the
//! shared allocator family both sides of the boundary agree on. The same
//! helpers back the synthetic producers in this crate's tests.

use std::ffi::c_void;
use std::mem;
use std::ptr;

use crate::block::RawPresenceBlock;

/// Allocate a zero-terminated UTF-16 copy of `s` with `malloc`.
///
/// Returns null on allocation failure. The caller (ultimately the host's
/// disposal routine) frees it with `free`.
pub fn alloc_wide(s: &str) -> *mut u16 {
    let units: Vec<u16> = s.encode_utf16().chain(std::iter::once(0)).collect();
    let buf = unsafe { libc::malloc(units.len() * mem::size_of::<u16>()) } as *mut u16;
    if buf.is_null() {
        return ptr::null_mut();
    }
    unsafe {
        ptr::copy_nonoverlapping(units.as_ptr(), buf, units.len());
    }
    buf
}

/// Allocate a complete presence block, all-or-nothing.
///
/// `None` fields become null pointers. If any allocation fails, everything
/// already made is freed and null is returned, so a partially-populated
/// block can never escape. The `reserved` slot is always null.
pub fn emit_block(
    client_id: u64,
    state: Option<&str>,
    details: Option<&str>,
    large_icon_url: Option<&str>,
    small_icon_url: Option<&str>,
) -> *mut RawPresenceBlock {
    fn alloc_field(s: Option<&str>, made: &mut Vec<*mut u16>) -> Result<*mut u16, ()> {
        match s {
            None => Ok(ptr::null_mut()),
            Some(s) => {
                let p = alloc_wide(s);
                if p.is_null() {
                    return Err(());
                }
                made.push(p);
                Ok(p)
            }
        }
    }

    let mut made: Vec<*mut u16> = Vec::with_capacity(4);
    let fields = alloc_field(state, &mut made).and_then(|state| {
        Ok((
            state,
            alloc_field(details, &mut made)?,
            alloc_field(large_icon_url, &mut made)?,
            alloc_field(small_icon_url, &mut made)?,
        ))
    });

    let (state, details, large_icon_url, small_icon_url) = match fields {
        Ok(fields) => fields,
        Err(()) => {
            free_all(&made);
            return ptr::null_mut();
        }
    };

    let block = unsafe { libc::malloc(mem::size_of::<RawPresenceBlock>()) } as *mut RawPresenceBlock;
    if block.is_null() {
        free_all(&made);
        return ptr::null_mut();
    }
    unsafe {
        ptr::write(
            block,
            RawPresenceBlock {
                client_id,
                state,
                details,
                large_icon_url,
                small_icon_url,
                reserved: ptr::null_mut(),
            },
        );
    }
    block
}

fn free_all(buffers: &[*mut u16]) {
    for &p in buffers {
        unsafe { libc::free(p as *mut c_void) };
    }
}
