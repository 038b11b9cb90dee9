use crate::util::Int;
use derive_more::with_trait::Display;
use std::ops::Not;

/// The color of a chess [`Piece`][crate::chess::Piece].
#[derive(Debug, Display, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
#[repr(u8)]
pub enum Color {
    #[display("white")]
    White,
    #[display("black")]
    Black,
}

unsafe impl Int for Color {
    const MIN: u8 = Color::White as u8;
    const MAX: u8 = Color::Black as u8;
}

impl Not for Color {
    type Output = Self;

    #[inline(always)]
    fn not(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl From<bool> for Color {
    /// `false` is white, `true` is black.
    #[inline(always)]
    fn from(b: bool) -> Self {
        Int::new(b as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[proptest]
    fn color_has_an_equivalent_boolean(c: Color) {
        assert_eq!(Color::from(c == Color::Black), c);
    }

    #[proptest]
    fn not_flips_color(c: Color) {
        assert_ne!(!c, c);
        assert_eq!(!!c, c);
    }
}
