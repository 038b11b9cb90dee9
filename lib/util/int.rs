use std::mem::transmute_copy;

/// Trait for field-less enums represented by a contiguous range of `u8`.
///
/// # Safety
///
/// Must only be implemented for `repr(u8)` types whose discriminants cover
/// every value in `MIN..=MAX` with no gaps.
pub unsafe trait Int: 'static + Send + Sync + Copy {
    /// The smallest discriminant.
    const MIN: u8;

    /// The largest discriminant.
    const MAX: u8;

    /// Casts from the discriminant.
    #[track_caller]
    #[inline(always)]
    fn new(i: u8) -> Self {
        const { assert!(size_of::<Self>() == 1) }
        debug_assert!((Self::MIN..=Self::MAX).contains(&i));
        unsafe { transmute_copy(&i) }
    }

    /// Casts from the discriminant, if in range.
    #[inline(always)]
    fn try_new(i: u8) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&i) {
            Some(Self::new(i))
        } else {
            None
        }
    }

    /// Casts to the discriminant.
    #[inline(always)]
    fn get(self) -> u8 {
        const { assert!(size_of::<Self>() == 1) }
        unsafe { transmute_copy(&self) }
    }

    /// An iterator over all values in `MIN..=MAX`.
    #[inline(always)]
    fn iter() -> impl DoubleEndedIterator<Item = Self> + ExactSizeIterator {
        (Self::MIN..=Self::MAX).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::{Arbitrary, proptest};

    #[derive(Debug, Copy, Clone, Eq, PartialEq, Arbitrary)]
    #[repr(u8)]
    enum Digit {
        One = 1,
        Two,
        Three,
        Four,
        Five,
        Six,
        Seven,
        Eight,
        Nine,
    }

    unsafe impl Int for Digit {
        const MIN: u8 = Digit::One as u8;
        const MAX: u8 = Digit::Nine as u8;
    }

    #[proptest]
    fn int_roundtrips_through_repr(d: Digit) {
        assert_eq!(Digit::new(d.get()), d);
    }

    #[proptest]
    fn try_new_accepts_exactly_the_value_range(i: u8) {
        assert_eq!(Digit::try_new(i).is_some(), (1..=9).contains(&i));
    }

    #[test]
    fn int_iterates_in_order() {
        assert_eq!(
            Vec::from_iter(Digit::iter().map(Int::get)),
            Vec::from_iter(1..=9)
        );
    }
}
