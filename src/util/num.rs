/// Round up `n` to the nearest multiple of `to`, or `None` if that overflows
pub fn round_up(n: usize, to: usize) -> Option<usize> {
    debug_assert!(to != 0);
    Some(n.checked_add(to - 1)? / to * to)
}

/// Sum `values`, or `None` if the total doesn't fit in a `usize`
pub fn checked_sum(values: impl IntoIterator<Item = usize>) -> Option<usize> {
    values
        .into_iter()
        .try_fold(0usize, |total, value| total.checked_add(value))
}
