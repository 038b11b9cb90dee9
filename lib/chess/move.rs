use crate::chess::{Role, Square};
use arrayvec::ArrayVec;
use derive_more::with_trait::Display;
use std::fmt::{self, Formatter};

/// A chess move in coordinate notation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub struct Move {
    whence: Square,
    whither: Square,
    promotion: Option<Role>,
}

impl Move {
    #[inline(always)]
    pub fn new(whence: Square, whither: Square, promotion: Option<Role>) -> Self {
        Move {
            whence,
            whither,
            promotion,
        }
    }

    /// The square this move departs from.
    #[inline(always)]
    pub fn whence(&self) -> Square {
        self.whence
    }

    /// The square this move arrives at.
    #[inline(always)]
    pub fn whither(&self) -> Square {
        self.whither
    }

    /// The [`Role`] a pawn promotes to, if this move is a promotion.
    #[inline(always)]
    pub fn promotion(&self) -> Option<Role> {
        self.promotion
    }
}

impl Display for Move {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.whence, f)?;
        Display::fmt(&self.whither, f)?;
        if let Some(r) = self.promotion {
            write!(f, "{}", r.to_string().to_ascii_lowercase())?;
        }

        Ok(())
    }
}

/// A list of moves generated for one position.
pub type MoveList = ArrayVec<Move, 256>;

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[proptest]
    fn move_prints_in_coordinate_notation(
        #[filter(#m.promotion().is_none())] m: Move,
    ) {
        assert_eq!(m.to_string(), format!("{}{}", m.whence(), m.whither()));
    }

    #[test]
    fn promotion_prints_lower_case_suffix() {
        let m = Move::new(Square::E7, Square::E8, Some(Role::Queen));
        assert_eq!(m.to_string(), "e7e8q");
    }
}
