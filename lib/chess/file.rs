use crate::chess::{Bitboard, Mirror, Rank, Transpose};
use crate::util::Int;
use derive_more::with_trait::{Display, Error};
use std::fmt::{self, Formatter, Write};
use std::str::FromStr;

/// A column on the chess board.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
#[repr(u8)]
pub enum File {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl File {
    /// Returns a [`Bitboard`] that only contains this file.
    #[inline(always)]
    pub fn bitboard(self) -> Bitboard {
        Bitboard::new(0x0101010101010101 << self.get())
    }
}

unsafe impl Int for File {
    const MIN: u8 = File::A as u8;
    const MAX: u8 = File::H as u8;
}

impl Mirror for File {
    /// Horizontally mirrors this file.
    #[inline(always)]
    fn mirror(self) -> Self {
        Self::new(self.get() ^ Self::MAX)
    }
}

impl Transpose for File {
    type Transposition = Rank;

    /// This file's corresponding rank.
    #[inline(always)]
    fn transpose(self) -> Rank {
        Rank::new(self.get())
    }
}

impl Display for File {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_char((b'a' + self.get()).into())
    }
}

/// The reason why parsing [`File`] failed.
#[derive(Debug, Display, Error, Default, Clone, Eq, PartialEq)]
#[display("failed to parse file")]
pub struct ParseFileError;

impl FromStr for File {
    type Err = ParseFileError;

    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [c] = s.as_bytes() else {
            return Err(ParseFileError);
        };

        c.checked_sub(b'a')
            .and_then(Int::try_new)
            .ok_or(ParseFileError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::Square;
    use test_strategy::proptest;

    #[proptest]
    fn mirroring_file_returns_its_complement(f: File) {
        assert_eq!(f.mirror().get(), File::MAX - f.get());
    }

    #[proptest]
    fn file_has_an_equivalent_bitboard(f: File) {
        assert_eq!(
            Vec::from_iter(f.bitboard()),
            Vec::from_iter(Rank::iter().map(|r| Square::new(f, r)))
        );
    }

    #[proptest]
    fn parsing_printed_file_is_an_identity(f: File) {
        assert_eq!(f.to_string().parse(), Ok(f));
    }
}
