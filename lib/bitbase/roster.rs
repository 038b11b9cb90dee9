use crate::bitbase::Signature;
use crate::chess::{Board, Color, Piece, Role};
use crate::util::Int;
use arrayvec::ArrayVec;
use derive_more::with_trait::{Display, Error};
use std::fmt::{self, Formatter};
use std::str::FromStr;

/// The largest number of pieces a bitbase can describe.
pub const MAX_PIECES: usize = 10;

/// The canonical ordered roster of an endgame's pieces.
///
/// The first two entries are always the white and the black king. The
/// remaining entries are sorted by descending strength, white before black
/// within equal strength, so that equal pieces end up adjacent.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Roster {
    pieces: ArrayVec<Piece, MAX_PIECES>,
}

impl Roster {
    /// The roster of the pieces on `board`.
    pub fn from_board(board: &Board) -> Self {
        Self::from_iter(board.iter().map(|(p, _)| p))
    }

    /// Builds a roster from any collection of pieces.
    ///
    /// Kings in the input are ignored; the two mandatory kings are always
    /// placed first.
    pub fn from_iter(pieces: impl IntoIterator<Item = Piece>) -> Self {
        let mut roster = Roster {
            pieces: ArrayVec::new(),
        };

        roster.pieces.push(Piece::new(Role::King, Color::White));
        roster.pieces.push(Piece::new(Role::King, Color::Black));

        let mut rest: ArrayVec<Piece, MAX_PIECES> = pieces
            .into_iter()
            .filter(|p| p.role() != Role::King)
            .collect();

        rest.sort_by_key(|p| (u8::MAX - p.role().get(), p.color().get()));
        roster.pieces.extend(rest);
        roster
    }

    /// The pieces in canonical order.
    #[inline(always)]
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// The piece at position `i`.
    #[inline(always)]
    pub fn piece(&self, i: usize) -> Piece {
        self.pieces[i]
    }

    /// The total number of pieces, kings included.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// The number of pawns of either color.
    #[inline(always)]
    pub fn pawns(&self) -> usize {
        self.pieces.iter().filter(|p| p.role() == Role::Pawn).count()
    }

    /// Whether either side has a pawn.
    #[inline(always)]
    pub fn has_pawns(&self) -> bool {
        self.pawns() > 0
    }

    /// This roster's [`Signature`].
    #[inline(always)]
    pub fn signature(&self) -> Signature {
        Signature::from_iter(self.pieces.iter().copied())
    }

    /// A new roster with the piece at `i` removed.
    pub fn removed(&self, i: usize) -> Roster {
        let pieces = self
            .pieces
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, &p)| p);

        Roster::from_iter(pieces)
    }

    /// A new roster with the pawn at `i` replaced by a `role` piece of the
    /// same color.
    pub fn promoted(&self, i: usize, role: Role) -> Roster {
        debug_assert_eq!(self.pieces[i].role(), Role::Pawn);
        let pieces = self.pieces.iter().enumerate().map(|(j, &p)| {
            if j == i {
                Piece::new(role, p.color())
            } else {
                p
            }
        });

        Roster::from_iter(pieces)
    }
}

impl Display for Roster {
    /// Prints the roster grouped by side, the white king first: `KRPKN`.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for color in Color::iter() {
            write!(f, "K")?;
            for piece in &self.pieces[2..] {
                if piece.color() == color {
                    write!(f, "{}", piece.role())?;
                }
            }
        }

        Ok(())
    }
}

/// The reason why parsing [`Roster`] failed.
#[derive(Debug, Display, Error, Default, Clone, Eq, PartialEq)]
#[display("failed to parse roster")]
pub struct ParseRosterError;

impl FromStr for Roster {
    type Err = ParseRosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // One character per piece, kings included.
        if !s.starts_with('K') || s.len() > MAX_PIECES {
            return Err(ParseRosterError);
        }

        let mut color = Color::White;
        let mut kings = 1;
        let mut pieces = ArrayVec::<Piece, MAX_PIECES>::new();

        for c in s.chars().skip(1) {
            let role: Role = c.to_string().parse().map_err(|_| ParseRosterError)?;
            if role == Role::King {
                if color == Color::Black {
                    return Err(ParseRosterError);
                }

                color = Color::Black;
                kings += 1;
            } else {
                pieces
                    .try_push(Piece::new(role, color))
                    .map_err(|_| ParseRosterError)?;
            }
        }

        if kings != 2 {
            return Err(ParseRosterError);
        }

        Ok(Roster::from_iter(pieces))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[test]
    fn kings_come_first() {
        let roster: Roster = "KRPKN".parse().unwrap();
        assert_eq!(roster.piece(0), Piece::new(Role::King, Color::White));
        assert_eq!(roster.piece(1), Piece::new(Role::King, Color::Black));
    }

    #[test]
    fn pieces_sort_by_descending_strength_white_first() {
        let roster: Roster = "KPRKQ".parse().unwrap();
        let order: Vec<_> = roster.pieces()[2..]
            .iter()
            .map(|p| (p.role(), p.color()))
            .collect();

        assert_eq!(
            order,
            vec![
                (Role::Queen, Color::Black),
                (Role::Rook, Color::White),
                (Role::Pawn, Color::White),
            ]
        );
    }

    #[test]
    fn display_groups_by_side() {
        let roster: Roster = "KPRKQ".parse().unwrap();
        assert_eq!(roster.to_string(), "KRPKQ");
    }

    #[test]
    fn parsing_rejects_missing_kings() {
        assert!("KRP".parse::<Roster>().is_err());
        assert!("RPK".parse::<Roster>().is_err());
        assert!("KRKPK".parse::<Roster>().is_err());
    }

    #[test]
    fn removed_drops_one_piece() {
        let roster: Roster = "KRPKN".parse().unwrap();
        assert_eq!(roster.removed(2).to_string(), "KPKN");
    }

    #[test]
    fn promoted_replaces_a_pawn() {
        let roster: Roster = "KPK".parse().unwrap();
        assert_eq!(roster.promoted(2, Role::Queen).to_string(), "KQK");
    }

    #[proptest]
    fn parsing_printed_roster_is_an_identity(
        #[strategy("K[QRBNP]{0,3}K[QRBNP]{0,3}")] s: String,
    ) {
        let roster: Roster = s.parse().unwrap();
        assert_eq!(roster.to_string().parse::<Roster>(), Ok(roster));
    }

    #[test]
    fn pawn_count_is_tracked() {
        let roster: Roster = "KPPKP".parse().unwrap();
        assert_eq!(roster.pawns(), 3);
        assert!(roster.has_pawns());
        assert!(!"KRK".parse::<Roster>().unwrap().has_pawns());
    }
}
