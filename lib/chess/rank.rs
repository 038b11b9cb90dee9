use crate::chess::{Bitboard, File, Flip, Transpose};
use crate::util::Int;
use derive_more::with_trait::{Display, Error};
use std::fmt::{self, Formatter, Write};
use std::str::FromStr;

/// A row on the chess board.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
#[repr(u8)]
pub enum Rank {
    First,
    Second,
    Third,
    Fourth,
    Fifth,
    Sixth,
    Seventh,
    Eighth,
}

impl Rank {
    /// Returns a [`Bitboard`] that only contains this rank.
    #[inline(always)]
    pub fn bitboard(self) -> Bitboard {
        Bitboard::new(0xFF << (8 * self.get()))
    }
}

unsafe impl Int for Rank {
    const MIN: u8 = Rank::First as u8;
    const MAX: u8 = Rank::Eighth as u8;
}

impl Flip for Rank {
    /// Vertically flips this rank.
    #[inline(always)]
    fn flip(self) -> Self {
        Self::new(self.get() ^ Self::MAX)
    }
}

impl Transpose for Rank {
    type Transposition = File;

    /// This rank's corresponding file.
    #[inline(always)]
    fn transpose(self) -> File {
        File::new(self.get())
    }
}

impl Display for Rank {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_char((b'1' + self.get()).into())
    }
}

/// The reason why parsing [`Rank`] failed.
#[derive(Debug, Display, Error, Default, Clone, Eq, PartialEq)]
#[display("failed to parse rank")]
pub struct ParseRankError;

impl FromStr for Rank {
    type Err = ParseRankError;

    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [c] = s.as_bytes() else {
            return Err(ParseRankError);
        };

        c.checked_sub(b'1')
            .and_then(Int::try_new)
            .ok_or(ParseRankError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::Square;
    use test_strategy::proptest;

    #[proptest]
    fn flipping_rank_returns_its_complement(r: Rank) {
        assert_eq!(r.flip().get(), Rank::MAX - r.get());
    }

    #[proptest]
    fn rank_has_an_equivalent_bitboard(r: Rank) {
        assert_eq!(
            Vec::from_iter(r.bitboard()),
            Vec::from_iter(File::iter().map(|f| Square::new(f, r)))
        );
    }

    #[proptest]
    fn parsing_printed_rank_is_an_identity(r: Rank) {
        assert_eq!(r.to_string().parse(), Ok(r));
    }
}
