// C ABI for collaborators written in other languages (DMA device layers,
// packet schedulers). Elements are opaque `esize`-byte records.
//
// The C side owns role discipline: on a ring created with RING_F_SP_ENQ
// (RING_F_SC_DEQ) only one thread may enqueue (dequeue) at a time.

use std::ffi::{c_char, c_void, CStr};
use std::ptr;

use crate::MPMC::Structs::Buffer_Structs::{Backing, Behavior, RingConfig, Transfer};
use crate::MPMC::Ring;

/// Handle to a ring instance (opaque pointer)
pub struct RingHandle {
    inner: Ring,
}

// -----------------------------------------------------------------------------
// Lifecycle
// -----------------------------------------------------------------------------

/// Create a new heap-backed ring.
///
/// # Arguments
/// * `name` - NUL-terminated name, or NULL.
/// * `count` - Capacity in elements (power of two unless `RING_F_EXACT_SZ`).
/// * `esize` - Element size in bytes, a multiple of 4.
/// * `flags` - `RING_F_*` flag word.
///
/// # Returns
/// * Pointer to `RingHandle`, or NULL on failure.
///
/// # Safety
/// `name` must be NULL or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn dmxp_ring_create(
    name: *const c_char,
    count: u32,
    esize: u32,
    flags: u32,
) -> *mut RingHandle {
    let name = if name.is_null() {
        String::new()
    } else {
        CStr::from_ptr(name).to_string_lossy().into_owned()
    };

    let ring = RingConfig::from_flags(count, esize, flags)
        .and_then(|config| Ring::with_config(config, &name, Backing::Heap));

    match ring {
        Ok(ring) => Box::into_raw(Box::new(RingHandle { inner: ring })),
        Err(e) => {
            tracing::error!(name = %name, count, esize, flags, error = %e, "FFI: failed to create ring");
            ptr::null_mut()
        }
    }
}

/// Free a ring handle.
///
/// # Safety
/// `handle` must be NULL or a pointer returned by [`dmxp_ring_create`] that has not been freed,
/// and no other thread may be using it.
#[no_mangle]
pub unsafe extern "C" fn dmxp_ring_free(handle: *mut RingHandle) {
    if !handle.is_null() {
        let _ = Box::from_raw(handle); // Dropped automatically
    }
}

// -----------------------------------------------------------------------------
// Data path
// -----------------------------------------------------------------------------

unsafe fn enqueue(
    handle: *mut RingHandle,
    obj: *const c_void,
    n: u32,
    behavior: Behavior,
    free_space: *mut u32,
) -> u32 {
    if handle.is_null() || (obj.is_null() && n != 0) {
        return 0;
    }
    let buffer = (*handle).inner.buffer();
    let is_sp = buffer.producer_mode().is_single();
    let t = buffer.do_enqueue(obj as *const u8, n, behavior, is_sp);
    report(t, free_space)
}

unsafe fn dequeue(
    handle: *mut RingHandle,
    obj: *mut c_void,
    n: u32,
    behavior: Behavior,
    available: *mut u32,
) -> u32 {
    if handle.is_null() || (obj.is_null() && n != 0) {
        return 0;
    }
    let buffer = (*handle).inner.buffer();
    let is_sc = buffer.consumer_mode().is_single();
    let t = buffer.do_dequeue(obj as *mut u8, n, behavior, is_sc);
    report(t, available)
}

unsafe fn report(t: Transfer, out: *mut u32) -> u32 {
    if !out.is_null() {
        *out = t.remaining;
    }
    t.count
}

/// Enqueue exactly `n` elements from `obj`, or none.
///
/// # Returns
/// * `n` on success, 0 if the ring lacks room. `*free_space` (if not NULL) receives the
///   free slots left.
///
/// # Safety
/// `handle` must be a live handle; `obj` must point to `n * esize` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn dmxp_ring_enqueue_bulk(
    handle: *mut RingHandle,
    obj: *const c_void,
    n: u32,
    free_space: *mut u32,
) -> u32 {
    enqueue(handle, obj, n, Behavior::Fixed, free_space)
}

/// Enqueue up to `n` elements from `obj`.
///
/// # Safety
/// See [`dmxp_ring_enqueue_bulk`].
#[no_mangle]
pub unsafe extern "C" fn dmxp_ring_enqueue_burst(
    handle: *mut RingHandle,
    obj: *const c_void,
    n: u32,
    free_space: *mut u32,
) -> u32 {
    enqueue(handle, obj, n, Behavior::Variable, free_space)
}

/// Dequeue exactly `n` elements into `obj`, or none.
///
/// # Returns
/// * `n` on success, 0 if fewer are available. `*available` (if not NULL) receives the
///   entries left.
///
/// # Safety
/// `handle` must be a live handle; `obj` must point to `n * esize` writable bytes.
#[no_mangle]
pub unsafe extern "C" fn dmxp_ring_dequeue_bulk(
    handle: *mut RingHandle,
    obj: *mut c_void,
    n: u32,
    available: *mut u32,
) -> u32 {
    dequeue(handle, obj, n, Behavior::Fixed, available)
}

/// Dequeue up to `n` elements into `obj`.
///
/// # Safety
/// See [`dmxp_ring_dequeue_bulk`].
#[no_mangle]
pub unsafe extern "C" fn dmxp_ring_dequeue_burst(
    handle: *mut RingHandle,
    obj: *mut c_void,
    n: u32,
    available: *mut u32,
) -> u32 {
    dequeue(handle, obj, n, Behavior::Variable, available)
}

// -----------------------------------------------------------------------------
// Inspection
// -----------------------------------------------------------------------------

/// Entries in the ring (0 for NULL).
///
/// # Safety
/// `handle` must be NULL or a live handle.
#[no_mangle]
pub unsafe extern "C" fn dmxp_ring_count(handle: *const RingHandle) -> u32 {
    handle.as_ref().map_or(0, |h| h.inner.count())
}

/// Free slots in the ring (0 for NULL).
///
/// # Safety
/// `handle` must be NULL or a live handle.
#[no_mangle]
pub unsafe extern "C" fn dmxp_ring_free_count(handle: *const RingHandle) -> u32 {
    handle.as_ref().map_or(0, |h| h.inner.free_count())
}

/// Capacity of the ring (0 for NULL).
///
/// # Safety
/// `handle` must be NULL or a live handle.
#[no_mangle]
pub unsafe extern "C" fn dmxp_ring_capacity(handle: *const RingHandle) -> u32 {
    handle.as_ref().map_or(0, |h| h.inner.capacity())
}
