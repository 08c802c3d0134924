/// Rounds `value` up to the next multiple of `boundary`.
///
/// `boundary` must be a power of two. The addition is unchecked, use
/// [`checked_align_to`] when `value` comes from a caller.
///
/// # Examples
///
/// ```rust
/// use mapalloc::align_to;
///
/// assert_eq!(align_to!(1, 4096), 4096);
/// assert_eq!(align_to!(4096, 4096), 4096);
/// assert_eq!(align_to!(13, 16), 16);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $boundary:expr) => {
    ($value + $boundary - 1) & !($boundary - 1)
  };
}

/// Overflow-checked form of [`align_to!`].
///
/// Returns `None` when the rounded value does not fit in a `usize`.
pub fn checked_align_to(
  value: usize,
  boundary: usize,
) -> Option<usize> {
  debug_assert!(boundary.is_power_of_two());
  value
    .checked_add(boundary - 1)
    .map(|bumped| bumped & !(boundary - 1))
}
