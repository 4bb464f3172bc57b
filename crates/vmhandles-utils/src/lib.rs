//! # vmhandles-utils
//!
//! Shared utilities for the vmhandles workspace: ordered atomic access to raw
//! memory, synchronization re-exports and small newtypes.
use std::mem::align_of;

pub mod atomic;
pub mod newtypes;
pub mod sync;

pub use newtypes::{ByteOffset, RefSlotIndex};

pub fn is_ptr_aligned_to_field(ptr: *const u8, field_size: usize) -> bool {
    let address = ptr as usize;
    match field_size {
        0 | 1 => true,
        2 => address % align_of::<u16>() == 0,
        4 => address % align_of::<u32>() == 0,
        8 => address % align_of::<u64>() == 0,
        _ => address % field_size == 0,
    }
}

#[cfg(feature = "memory-validation")]
pub fn validate_alignment(ptr: *const u8, align: usize) {
    if (ptr as usize) % align != 0 {
        panic!(
            "Alignment violation: pointer {:p} is not aligned to {}",
            ptr, align
        );
    }
}

#[cfg(not(feature = "memory-validation"))]
#[inline(always)]
pub fn validate_alignment(_ptr: *const u8, _align: usize) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_follows_field_size() {
        let words = [0u64; 2];
        let base = words.as_ptr() as *const u8;
        assert!(is_ptr_aligned_to_field(base, 8));
        assert!(is_ptr_aligned_to_field(base.wrapping_add(1), 1));
        assert!(!is_ptr_aligned_to_field(base.wrapping_add(1), 2));
        assert!(is_ptr_aligned_to_field(base.wrapping_add(4), 4));
        assert!(!is_ptr_aligned_to_field(base.wrapping_add(4), 8));
    }
}
