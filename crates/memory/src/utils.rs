//! Alignment helpers shared by the allocators
//!
//! `alignment` must be a power of two everywhere in this module. That is
//! only checked with `debug_assert!`; callers validate alignment up front.

/// Whether `address` is a multiple of `alignment`
///
/// # Examples
/// ```
/// use cairn_memory::utils::is_aligned;
///
/// assert!(is_aligned(0x40, 16));
/// assert!(!is_aligned(0x44, 16));
/// ```
#[inline(always)]
pub const fn is_aligned(address: usize, alignment: usize) -> bool {
    debug_assert!(alignment.is_power_of_two());
    address & (alignment - 1) == 0
}

/// Bytes to skip so that `address` becomes a multiple of `alignment`
///
/// Zero when `address` is already aligned. Never overflows, even for
/// addresses right below `usize::MAX`.
///
/// # Examples
/// ```
/// use cairn_memory::utils::padding_needed;
///
/// assert_eq!(padding_needed(7, 8), 1);
/// assert_eq!(padding_needed(8, 8), 0);
/// assert_eq!(padding_needed(9, 8), 7);
/// ```
#[inline(always)]
pub const fn padding_needed(address: usize, alignment: usize) -> usize {
    if is_aligned(address, alignment) {
        0
    } else {
        alignment - (address & (alignment - 1))
    }
}
