use crate::chess::{Board, Color, Flip, Piece, Role};
use crate::util::Int;
use derive_more::with_trait::Debug;
use std::fmt::{self, Display, Formatter};

const BITS_PER_SIDE: u32 = 10;
const SIDE_MASK: u32 = (1 << BITS_PER_SIDE) - 1;

/// A compact identifier of an endgame's material.
///
/// Packs the count of every non-king role per side, two bits each with
/// saturation at three, white in the low half. Used as the registry key and
/// as the cluster cache's file identity.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[debug("Signature({self})")]
pub struct Signature(u32);

impl Signature {
    /// The signature of the material on `board`.
    #[inline(always)]
    pub fn from_board(board: &Board) -> Self {
        Self::from_iter(board.iter().map(|(p, _)| p))
    }

    /// The signature of a collection of pieces; kings are not counted.
    pub fn from_iter(pieces: impl IntoIterator<Item = Piece>) -> Self {
        let mut sig = Signature::default();
        for piece in pieces {
            if piece.role() != Role::King {
                sig.add(piece);
            }
        }

        sig
    }

    #[inline(always)]
    fn shift(role: Role, color: Color) -> u32 {
        2 * role.get() as u32 + BITS_PER_SIDE * color.get() as u32
    }

    #[inline(always)]
    fn add(&mut self, piece: Piece) {
        let shift = Self::shift(piece.role(), piece.color());
        if (self.0 >> shift) & 0b11 < 0b11 {
            self.0 += 1 << shift;
        }
    }

    /// The number of `role` pieces of `color`, saturated at three.
    #[inline(always)]
    pub fn count(self, role: Role, color: Color) -> u32 {
        (self.0 >> Self::shift(role, color)) & 0b11
    }

    /// Whether `color` has any piece besides the king.
    #[inline(always)]
    pub fn has_pieces(self, color: Color) -> bool {
        let side = self.0 >> (BITS_PER_SIDE * color.get() as u32);
        side & SIDE_MASK != 0
    }

    /// Whether `color` can deliver mate at all.
    ///
    /// A bare king or a lone minor piece cannot.
    pub fn has_mating_material(self, color: Color) -> bool {
        let heavy = self.count(Role::Pawn, color)
            + self.count(Role::Rook, color)
            + self.count(Role::Queen, color);

        let minors = self.count(Role::Knight, color) + self.count(Role::Bishop, color);
        heavy > 0 || minors > 1
    }

    /// The raw key.
    #[inline(always)]
    pub fn get(self) -> u32 {
        self.0
    }

    /// Reconstructs a signature from its raw key, e.g. a file header.
    #[inline(always)]
    pub fn from_raw(raw: u32) -> Self {
        Signature(raw)
    }
}

impl Flip for Signature {
    /// Swaps the piece counts of white and black.
    ///
    /// The bitbase generated for KRK answers KKR probes through this
    /// inversion.
    #[inline(always)]
    fn flip(self) -> Self {
        Signature(((self.0 & SIDE_MASK) << BITS_PER_SIDE) | (self.0 >> BITS_PER_SIDE))
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for color in Color::iter() {
            write!(f, "K")?;
            for role in Role::iter().rev().skip(1) {
                for _ in 0..self.count(role, color) {
                    write!(f, "{role}")?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitbase::Roster;
    use std::fmt::Debug;
    use test_strategy::proptest;

    #[proptest]
    fn flip_is_an_involution(#[strategy("K[QRBNP]{0,3}K[QRBNP]{0,3}")] s: String) {
        let sig = s.parse::<Roster>().unwrap().signature();
        assert_eq!(sig.flip().flip(), sig);
    }

    #[test]
    fn flip_swaps_sides() {
        let krk = "KRK".parse::<Roster>().unwrap().signature();
        let kkr = "KKR".parse::<Roster>().unwrap().signature();
        assert_eq!(krk.flip(), kkr);
        assert_ne!(krk, kkr);
    }

    #[test]
    fn symmetric_signature_is_its_own_flip() {
        let sig = "KPKP".parse::<Roster>().unwrap().signature();
        assert_eq!(sig.flip(), sig);
    }

    #[proptest]
    fn display_matches_roster_display(#[strategy("K[QRBNP]{0,3}K[QRBNP]{0,3}")] s: String) {
        let roster: Roster = s.parse().unwrap();
        assert_eq!(roster.signature().to_string(), roster.to_string());
    }

    #[test]
    fn mating_material() {
        let sig = |s: &str| s.parse::<Roster>().unwrap().signature();

        assert!(!sig("KK").has_mating_material(Color::White));
        assert!(!sig("KNK").has_mating_material(Color::White));
        assert!(!sig("KBK").has_mating_material(Color::White));
        assert!(sig("KPK").has_mating_material(Color::White));
        assert!(sig("KRK").has_mating_material(Color::White));
        assert!(sig("KBNK").has_mating_material(Color::White));
        assert!(!sig("KRK").has_mating_material(Color::Black));
    }
}
