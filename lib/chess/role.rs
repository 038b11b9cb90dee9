use crate::util::Int;
use derive_more::with_trait::{Display, Error};
use std::fmt::{self, Formatter, Write};
use std::str::FromStr;

/// The type of a chess [`Piece`][crate::chess::Piece].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
#[repr(u8)]
pub enum Role {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

unsafe impl Int for Role {
    const MIN: u8 = Role::Pawn as u8;
    const MAX: u8 = Role::King as u8;
}

impl Role {
    /// The four roles a pawn can promote to, strongest first.
    pub const PROMOTIONS: [Role; 4] = [Role::Queen, Role::Rook, Role::Bishop, Role::Knight];
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_char(match self {
            Role::Pawn => 'P',
            Role::Knight => 'N',
            Role::Bishop => 'B',
            Role::Rook => 'R',
            Role::Queen => 'Q',
            Role::King => 'K',
        })
    }
}

/// The reason why parsing [`Role`] failed.
#[derive(Debug, Display, Error, Default, Clone, Eq, PartialEq)]
#[display("failed to parse role")]
pub struct ParseRoleError;

impl FromStr for Role {
    type Err = ParseRoleError;

    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "P" => Ok(Role::Pawn),
            "N" => Ok(Role::Knight),
            "B" => Ok(Role::Bishop),
            "R" => Ok(Role::Rook),
            "Q" => Ok(Role::Queen),
            "K" => Ok(Role::King),
            _ => Err(ParseRoleError),
        }
    }
}
