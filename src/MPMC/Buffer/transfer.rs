// Bulk copy of elements between caller memory and ring storage.
//
// Element widths of exactly 8 or 16 bytes get their own lane type; every
// other multiple of 4 is rescaled to a run of 4-byte words. The lane only
// changes how the bytes are moved, never which bytes end up where.

use std::mem::size_of;
use std::ptr;

/// Which way a transfer moves data.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Caller buffer -> ring storage.
    Enqueue,
    /// Ring storage -> caller buffer.
    Dequeue,
}

/// A unit of copy granularity.
pub(crate) trait Lane: Copy {
    /// Lanes moved per unrolled step.
    const UNROLL: usize;

    /// Copy one unrolled step (`UNROLL` lanes) from `src` to `dst`.
    ///
    /// # Safety
    /// Both pointers must be valid for `UNROLL * size_of::<Self>()` bytes and not overlap.
    #[inline(always)]
    unsafe fn copy_step(dst: *mut u8, src: *const u8) {
        let width = size_of::<Self>();
        for k in 0..Self::UNROLL {
            let v = ptr::read_unaligned(src.add(k * width) as *const Self);
            ptr::write_unaligned(dst.add(k * width) as *mut Self, v);
        }
    }
}

impl Lane for u32 {
    const UNROLL: usize = 8;
}

impl Lane for u64 {
    const UNROLL: usize = 4;
}

impl Lane for u128 {
    const UNROLL: usize = 2;

    // A pair of 16-byte elements moves as one 32-byte block
    #[inline(always)]
    unsafe fn copy_step(dst: *mut u8, src: *const u8) {
        ptr::copy_nonoverlapping(src, dst, 2 * size_of::<u128>());
    }
}

/// Copy `n` contiguous lanes.
#[inline(always)]
unsafe fn copy_lanes<L: Lane>(mut dst: *mut u8, mut src: *const u8, n: usize) {
    let width = size_of::<L>();
    let step = L::UNROLL * width;

    for _ in 0..n / L::UNROLL {
        L::copy_step(dst, src);
        dst = dst.add(step);
        src = src.add(step);
    }
    for _ in 0..n % L::UNROLL {
        let v = ptr::read_unaligned(src as *const L);
        ptr::write_unaligned(dst as *mut L, v);
        dst = dst.add(width);
        src = src.add(width);
    }
}

/// Move `n` lanes between `obj` and ring slots `[idx, idx + n)` of a ring of `size` lanes,
/// splitting the copy where it runs off the end of storage.
#[inline(always)]
unsafe fn transfer_lanes<L: Lane>(
    dir: Direction,
    ring: *mut u8,
    obj: *mut u8,
    size: usize,
    idx: usize,
    n: usize,
) {
    let width = size_of::<L>();
    let (first, second) = if idx + n <= size {
        (n, 0)
    } else {
        (size - idx, n - (size - idx))
    };

    let slot = ring.add(idx * width);
    match dir {
        Direction::Enqueue => copy_lanes::<L>(slot, obj, first),
        Direction::Dequeue => copy_lanes::<L>(obj, slot, first),
    }

    if second > 0 {
        // Start at the beginning
        let rest = obj.add(first * width);
        match dir {
            Direction::Enqueue => copy_lanes::<L>(ring, rest, second),
            Direction::Dequeue => copy_lanes::<L>(rest, ring, second),
        }
    }
}

/// Move `n` elements of `esize` bytes between `obj` and ring storage starting at slot `idx`.
///
/// # Safety
/// - `ring` must point to `size * esize` bytes of storage and `obj` to `n * esize` bytes.
/// - `idx < size` and `n <= size`; `esize` is a non-zero multiple of 4.
/// - The caller owns slots `[idx, idx + n)` (mod `size`) for the duration of the call.
#[inline]
pub(crate) unsafe fn transfer(
    dir: Direction,
    ring: *mut u8,
    obj: *mut u8,
    size: u32,
    idx: u32,
    esize: u32,
    n: u32,
) {
    debug_assert!(idx < size && n <= size);
    debug_assert!(esize != 0 && esize % 4 == 0);

    let (size, idx, n) = (size as usize, idx as usize, n as usize);
    match esize {
        8 => transfer_lanes::<u64>(dir, ring, obj, size, idx, n),
        16 => transfer_lanes::<u128>(dir, ring, obj, size, idx, n),
        _ => {
            // Normalize to 4-byte words
            let scale = esize as usize / size_of::<u32>();
            transfer_lanes::<u32>(dir, ring, obj, size * scale, idx * scale, n * scale)
        }
    }
}
