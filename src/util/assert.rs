/// Test if `ptr` is aligned to a multiple of `align`
pub fn aligned_to<T>(ptr: *const T, align: usize) -> bool {
    ptr as usize % align == 0
}

/// Test if `align` is something an allocator could honour
pub fn valid_align(align: usize) -> bool {
    align.is_power_of_two()
}
