/* Define the Min, Max, Default page sizes. */
/** Minimum Page Size Shift (power of 2) */
pub const UNIV_PAGE_SIZE_SHIFT_MIN: u32 = 12;
/** Maximum Page Size Shift (power of 2) */
pub const UNIV_PAGE_SIZE_SHIFT_MAX: u32 = 16;
/** log2 of default page size (1<<14 == 16384 bytes). */
pub const UNIV_PAGE_SIZE_SHIFT_DEF: u32 = 14;

/** Minimum page size InnoDB currently supports. */
pub const UNIV_PAGE_SIZE_MIN: u32 = 1u32 << UNIV_PAGE_SIZE_SHIFT_MIN;
/** Maximum page size InnoDB currently supports. */
pub const UNIV_PAGE_SIZE_MAX: u32 = 1u32 << UNIV_PAGE_SIZE_SHIFT_MAX;
/** Default page size for InnoDB tablespaces. */
pub const UNIV_PAGE_SIZE_DEF: u32 = 1u32 << UNIV_PAGE_SIZE_SHIFT_DEF;

/// log2 of the page size (14 for 1<<14 == 16384 bytes).
pub fn page_size_shift(page_size: u32) -> u32 {
    match page_size {
        65536 => 16,
        32768 => 15,
        16384 => 14,
        8192 => 13,
        4096 => 12,
        _ => panic!("Invalid page size: {}", page_size),
    }
}
