use crate::chess::{Bitboard, Color, Flip, Role, Square};
use crate::util::{Assume, Int};
use derive_more::with_trait::{Display, Error};
use std::fmt::{self, Formatter, Write};
use std::str::FromStr;
use std::sync::LazyLock;

static JUMPS: LazyLock<[Bitboard; 64]> = LazyLock::new(|| {
    #[rustfmt::skip]
    let steps = [(-2, 1), (-1, 2), (1, 2), (2, 1), (2, -1), (1, -2), (-1, -2), (-2, -1)];
    Square::iter()
        .map(|sq| Bitboard::fill(sq, &steps, Bitboard::full()).without(sq))
        .collect::<Vec<_>>()
        .try_into()
        .assume()
});

static STEPS: LazyLock<[Bitboard; 64]> = LazyLock::new(|| {
    #[rustfmt::skip]
    let steps = [(-1, 0), (-1, 1), (0, 1), (1, 1), (1, 0), (1, -1), (0, -1), (-1, -1)];
    Square::iter()
        .map(|sq| Bitboard::fill(sq, &steps, Bitboard::full()).without(sq))
        .collect::<Vec<_>>()
        .try_into()
        .assume()
});

static FORKS: LazyLock<[[Bitboard; 64]; 2]> = LazyLock::new(|| {
    let forks = |steps: [(i8, i8); 2]| -> [Bitboard; 64] {
        Square::iter()
            .map(|sq| Bitboard::fill(sq, &steps, Bitboard::full()).without(sq))
            .collect::<Vec<_>>()
            .try_into()
            .assume()
    };

    [forks([(-1, 1), (1, 1)]), forks([(-1, -1), (1, -1)])]
});

/// A chess piece of a certain [`Role`] and [`Color`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
#[repr(u8)]
pub enum Piece {
    WhitePawn,
    BlackPawn,
    WhiteKnight,
    BlackKnight,
    WhiteBishop,
    BlackBishop,
    WhiteRook,
    BlackRook,
    WhiteQueen,
    BlackQueen,
    WhiteKing,
    BlackKing,
}

unsafe impl Int for Piece {
    const MIN: u8 = Piece::WhitePawn as u8;
    const MAX: u8 = Piece::BlackKing as u8;
}

impl Piece {
    /// Constructs [`Piece`] from a pair of [`Role`] and [`Color`].
    #[inline(always)]
    pub fn new(r: Role, c: Color) -> Self {
        Int::new(c.get() | (r.get() << 1))
    }

    /// This piece's [`Role`].
    #[inline(always)]
    pub fn role(self) -> Role {
        Role::new(self.get() >> 1)
    }

    /// This piece's [`Color`].
    #[inline(always)]
    pub fn color(self) -> Color {
        Color::new(self.get() & 0b1)
    }

    /// This piece's possible attacks from a given square.
    ///
    /// Pawn attacks are the diagonal captures only; pushes are moves, not
    /// attacks.
    #[inline(always)]
    pub fn attacks(self, sq: Square, occupied: Bitboard) -> Bitboard {
        match self.role() {
            Role::Pawn => FORKS[self.color().get() as usize][sq.get() as usize],
            Role::Knight => JUMPS[sq.get() as usize],
            Role::King => STEPS[sq.get() as usize],
            Role::Bishop => Self::slides(sq, &[(-1, 1), (1, 1), (1, -1), (-1, -1)], occupied),
            Role::Rook => Self::slides(sq, &[(-1, 0), (0, 1), (1, 0), (0, -1)], occupied),
            Role::Queen => {
                Self::slides(sq, &[(-1, 1), (1, 1), (1, -1), (-1, -1)], occupied)
                    | Self::slides(sq, &[(-1, 0), (0, 1), (1, 0), (0, -1)], occupied)
            }
        }
    }

    #[inline(always)]
    fn slides(sq: Square, steps: &[(i8, i8)], occupied: Bitboard) -> Bitboard {
        Bitboard::fill(sq, steps, occupied).without(sq)
    }
}

impl Flip for Piece {
    /// Mirrors this piece's [`Color`].
    #[inline(always)]
    fn flip(self) -> Self {
        Int::new(self.get() ^ 0b1)
    }
}

impl Display for Piece {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let c = match self.role() {
            Role::Pawn => 'p',
            Role::Knight => 'n',
            Role::Bishop => 'b',
            Role::Rook => 'r',
            Role::Queen => 'q',
            Role::King => 'k',
        };

        f.write_char(match self.color() {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        })
    }
}

/// The reason why parsing [`Piece`] failed.
#[derive(Debug, Display, Error, Default, Clone, Eq, PartialEq)]
#[display("failed to parse piece")]
pub struct ParsePieceError;

impl FromStr for Piece {
    type Err = ParsePieceError;

    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [c] = s.as_bytes() else {
            return Err(ParsePieceError);
        };

        let color = Color::from(c.is_ascii_lowercase());
        let role = s
            .to_ascii_uppercase()
            .parse::<Role>()
            .map_err(|_| ParsePieceError)?;

        Ok(Piece::new(role, color))
    }
}
