use crate::bitbase::{MAX_PIECES, Roster};
use crate::chess::{Bitboard, Board, Color, File, Flip, Mirror, Piece, Rank, Role, Square, Transpose};
use crate::util::Int;
use arrayvec::ArrayVec;
use std::sync::LazyLock;

/// Number of sides to move.
pub const COLORS: u64 = 2;

/// Squares a pawn can stand on.
pub const PAWN_SQUARES: u64 = 48;

/// Squares any other piece can stand on.
pub const PIECE_SQUARES: u64 = 64;

/// Non-adjacent king pairs with the white king folded to files a-d.
pub const KING_PAIRS_WITH_PAWNS: u64 = 1806;

/// Non-adjacent king pairs with the white king folded to the a1-d1-d4
/// triangle and diagonal duplicates suppressed.
pub const KING_PAIRS_WITHOUT_PAWNS: u64 = 462;

/// The white king squares spanning one octant of the board.
const TRIANGLE: [Square; 10] = [
    Square::A1,
    Square::B1,
    Square::C1,
    Square::D1,
    Square::B2,
    Square::C2,
    Square::D2,
    Square::C3,
    Square::D3,
    Square::D4,
];

const NO_PAIR: u16 = u16::MAX;

struct KingTable {
    /// Pair index by `wk * 64 + bk`, [`NO_PAIR`] where not canonical.
    encode: Vec<u16>,
    /// `(white king, black king)` by pair index.
    decode: Vec<(Square, Square)>,
}

impl KingTable {
    fn build(whites: &[Square], skip: impl Fn(Square, Square) -> bool) -> KingTable {
        let mut encode = vec![NO_PAIR; 64 * 64];
        let mut decode = Vec::new();

        for &wk in whites {
            for bk in Square::iter() {
                if skip(wk, bk) || wk.touches(bk) {
                    continue;
                }

                encode[wk.get() as usize * 64 + bk.get() as usize] = decode.len() as u16;
                decode.push((wk, bk));
            }
        }

        KingTable { encode, decode }
    }
}

static WITH_PAWNS: LazyLock<KingTable> = LazyLock::new(|| {
    let whites: Vec<Square> = Square::iter().filter(|sq| sq.file() < File::E).collect();
    KingTable::build(&whites, |_, _| false)
});

static WITHOUT_PAWNS: LazyLock<KingTable> = LazyLock::new(|| {
    KingTable::build(&TRIANGLE, |wk, bk| wk.on_diagonal() && bk.above_diagonal())
});

/// A decoded arrangement: one square per roster entry plus the side to move.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Arrangement {
    pub squares: ArrayVec<Square, MAX_PIECES>,
    pub turn: Color,
}

/// The bijection between arrangements of a roster's pieces and the dense
/// index range of its bitbase.
///
/// Layout, least significant first: the side-to-move bit, the folded king
/// pair, then one fixed-radix digit per remaining piece. Fixed radixes keep
/// the digits independent, so substituting one piece's square changes exactly
/// one digit.
#[derive(Debug, Clone)]
pub struct Layout {
    roster: Roster,
    has_pawns: bool,
    size: u64,
}

impl Layout {
    pub fn new(roster: Roster) -> Self {
        let has_pawns = roster.has_pawns();
        let kings = if has_pawns {
            KING_PAIRS_WITH_PAWNS
        } else {
            KING_PAIRS_WITHOUT_PAWNS
        };

        let mut size = COLORS * kings;
        for piece in &roster.pieces()[2..] {
            size *= match piece.role() {
                Role::Pawn => PAWN_SQUARES,
                _ => PIECE_SQUARES,
            };
        }

        Layout {
            roster,
            has_pawns,
            size,
        }
    }

    /// The roster this layout indexes.
    #[inline(always)]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The number of indices, legal or not.
    #[inline(always)]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Maps an arrangement to its index, or `None` if no legal index
    /// describes it (kings touching, squares shared, pawns on the back
    /// ranks).
    pub fn encode(&self, squares: &[Square], turn: Color) -> Option<u64> {
        debug_assert_eq!(squares.len(), self.roster.len());

        if squares[0].touches(squares[1]) {
            return None;
        }

        let mut folded: ArrayVec<Square, MAX_PIECES> = squares.iter().copied().collect();

        // Fold the white king into its canonical region; every other square
        // follows the same transformations.
        let mirror = folded[0].file() >= File::E;
        let flip = !self.has_pawns && {
            let wk = if mirror { folded[0].mirror() } else { folded[0] };
            wk.rank() >= Rank::Fifth
        };

        for sq in &mut folded {
            if mirror {
                *sq = sq.mirror();
            }
            if flip {
                *sq = sq.flip();
            }
        }

        if self.has_pawns {
            for (piece, &sq) in self.roster.pieces().iter().zip(&folded) {
                if piece.role() == Role::Pawn
                    && (sq.rank() == Rank::First || sq.rank() == Rank::Eighth)
                {
                    return None;
                }
            }
        } else {
            // Transpose when the white king sits above the diagonal, or when
            // it sits on it and the black king is above.
            if folded[0].above_diagonal()
                || (folded[0].on_diagonal() && folded[1].above_diagonal())
            {
                for sq in &mut folded {
                    *sq = sq.transpose();
                }
            }

            // With both kings on the diagonal the first piece off it decides
            // the transposition; every piece before it is transpose
            // invariant.
            loop {
                self.sort_twins(&mut folded);
                if !self.transpose_trigger(&folded) {
                    break;
                }

                for sq in &mut folded[2..] {
                    *sq = sq.transpose();
                }
            }
        }

        if self.has_pawns {
            self.sort_twins(&mut folded);
        }

        let mut occupied = Bitboard::empty();
        for &sq in &folded {
            if occupied.contains(sq) {
                return None;
            }

            occupied = occupied.with(sq);
        }

        let table = self.kings();
        let pair = table.encode[folded[0].get() as usize * 64 + folded[1].get() as usize];
        debug_assert_ne!(pair, NO_PAIR);

        let mut index = match turn {
            Color::White => 0,
            Color::Black => 1,
        };

        let mut weight = COLORS;
        index += pair as u64 * weight;
        weight *= table.decode.len() as u64;

        for (piece, &sq) in self.roster.pieces().iter().zip(&folded).skip(2) {
            let (digit, radix) = match piece.role() {
                Role::Pawn => (sq.get() as u64 - 8, PAWN_SQUARES),
                _ => (sq.get() as u64, PIECE_SQUARES),
            };

            index += digit * weight;
            weight *= radix;
        }

        Some(index)
    }

    /// Maps an index back to its arrangement, or `None` for a structurally
    /// illegal index.
    pub fn decode(&self, index: u64) -> Option<Arrangement> {
        if index >= self.size {
            return None;
        }

        let mut rest = index;
        let turn = match rest % COLORS {
            0 => Color::White,
            _ => Color::Black,
        };
        rest /= COLORS;

        let table = self.kings();
        let pairs = table.decode.len() as u64;
        let (wk, bk) = table.decode[(rest % pairs) as usize];
        rest /= pairs;

        let mut squares = ArrayVec::new();
        squares.push(wk);
        squares.push(bk);

        let mut occupied = wk.bitboard() | bk.bitboard();
        let mut all_on_diagonal = !self.has_pawns && wk.on_diagonal() && bk.on_diagonal();

        for (i, piece) in self.roster.pieces().iter().enumerate().skip(2) {
            let (radix, base) = match piece.role() {
                Role::Pawn => (PAWN_SQUARES, 8),
                _ => (PIECE_SQUARES, 0),
            };

            let sq: Square = Int::new((rest % radix + base) as u8);
            rest /= radix;

            if occupied.contains(sq) {
                return None;
            }

            // Identical pieces in ascending order only; anything else is the
            // image of a permutation already indexed elsewhere.
            if *piece == self.roster.piece(i - 1) && sq <= squares[i - 1] {
                return None;
            }

            if !self.has_pawns {
                if all_on_diagonal && sq.above_diagonal() {
                    return None;
                }

                all_on_diagonal &= sq.on_diagonal();
            }

            occupied = occupied.with(sq);
            squares.push(sq);
        }

        Some(Arrangement { squares, turn })
    }

    /// The index of the position on `board`, which must hold exactly this
    /// layout's roster.
    pub fn encode_board(&self, board: &Board) -> Option<u64> {
        let squares = self.board_squares(board, |p| p, |sq| sq)?;
        self.encode(&squares, board.turn())
    }

    /// The index of the color-swapped image of `board` in this layout, which
    /// must hold the swapped roster.
    ///
    /// The board is reflected through a half turn, piece colors and the side
    /// to move invert. The bitbase built for KRK answers KKR probes this way.
    pub fn encode_board_swapped(&self, board: &Board) -> Option<u64> {
        let squares = self.board_squares(board, Flip::flip, |sq| sq.flip().mirror())?;
        self.encode(&squares, !board.turn())
    }

    fn board_squares(
        &self,
        board: &Board,
        piece_map: impl Fn(Piece) -> Piece,
        square_map: impl Fn(Square) -> Square,
    ) -> Option<ArrayVec<Square, MAX_PIECES>> {
        let mut squares = ArrayVec::new();

        for (i, &piece) in self.roster.pieces().iter().enumerate() {
            let twins = self.roster.pieces()[..i]
                .iter()
                .filter(|&&p| p == piece)
                .count();

            let sq = board
                .by_piece(piece_map(piece))
                .iter()
                .nth(twins)
                .map(&square_map)?;

            squares.push(sq);
        }

        Some(squares)
    }

    fn kings(&self) -> &'static KingTable {
        if self.has_pawns {
            &WITH_PAWNS
        } else {
            &WITHOUT_PAWNS
        }
    }

    /// Sorts the squares of identical adjacent roster pieces ascending.
    fn sort_twins(&self, squares: &mut [Square]) {
        let pieces = self.roster.pieces();
        let mut start = 2;

        while start < pieces.len() {
            let mut end = start + 1;
            while end < pieces.len() && pieces[end] == pieces[start] {
                end += 1;
            }

            squares[start..end].sort_unstable();
            start = end;
        }
    }

    /// Whether the leading on-diagonal run is followed by an above-diagonal
    /// square, in which case the whole tail must be transposed.
    fn transpose_trigger(&self, squares: &[Square]) -> bool {
        if !squares[0].on_diagonal() || !squares[1].on_diagonal() {
            return false;
        }

        for &sq in &squares[2..] {
            if sq.above_diagonal() {
                return true;
            }

            if !sq.on_diagonal() {
                return false;
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::sample::select;
    use test_strategy::proptest;

    fn layout(s: &str) -> Layout {
        Layout::new(s.parse().unwrap())
    }

    #[test]
    fn king_tables_have_the_documented_sizes() {
        assert_eq!(WITH_PAWNS.decode.len() as u64, KING_PAIRS_WITH_PAWNS);
        assert_eq!(WITHOUT_PAWNS.decode.len() as u64, KING_PAIRS_WITHOUT_PAWNS);
    }

    #[test]
    fn domain_sizes_multiply_out() {
        assert_eq!(layout("KK").size(), 2 * 462);
        assert_eq!(layout("KRK").size(), 2 * 462 * 64);
        assert_eq!(layout("KPK").size(), 2 * 1806 * 48);
        assert_eq!(layout("KQKR").size(), 2 * 462 * 64 * 64);
        assert_eq!(layout("KRPKN").size(), 2 * 1806 * 64 * 64 * 48);
    }

    #[proptest(cases = 256)]
    fn decode_of_encode_is_identity(
        #[strategy(select(vec!["KRK", "KQKR", "KPK", "KRRK", "KPKP", "KNKB"]))] s: &'static str,
        #[strategy(0u64..u64::MAX)] seed: u64,
    ) {
        let layout = layout(s);
        let index = seed % layout.size();

        // Legal indices round-trip exactly; illegal ones stay illegal.
        if let Some(arrangement) = layout.decode(index) {
            assert_eq!(
                layout.encode(&arrangement.squares, arrangement.turn),
                Some(index)
            );
        }
    }

    #[proptest(cases = 128)]
    fn mirrored_pawnless_arrangements_share_an_index(
        #[strategy(0u64..u64::MAX)] seed: u64,
    ) {
        let layout = layout("KQKR");
        let index = seed % layout.size();

        if let Some(arrangement) = layout.decode(index) {
            let mirrored: Vec<Square> =
                arrangement.squares.iter().map(|sq| sq.mirror()).collect();
            let flipped: Vec<Square> = arrangement.squares.iter().map(|sq| sq.flip()).collect();
            let transposed: Vec<Square> =
                arrangement.squares.iter().map(|sq| sq.transpose()).collect();

            assert_eq!(layout.encode(&mirrored, arrangement.turn), Some(index));
            assert_eq!(layout.encode(&flipped, arrangement.turn), Some(index));
            assert_eq!(layout.encode(&transposed, arrangement.turn), Some(index));
        }
    }

    #[proptest(cases = 128)]
    fn mirrored_pawn_arrangements_share_an_index(#[strategy(0u64..u64::MAX)] seed: u64) {
        let layout = layout("KPK");
        let index = seed % layout.size();

        if let Some(arrangement) = layout.decode(index) {
            let mirrored: Vec<Square> =
                arrangement.squares.iter().map(|sq| sq.mirror()).collect();

            assert_eq!(layout.encode(&mirrored, arrangement.turn), Some(index));
        }
    }

    #[test]
    fn touching_kings_have_no_index() {
        let layout = layout("KRK");
        let squares = [Square::E4, Square::E5, Square::A1];
        assert_eq!(layout.encode(&squares, Color::White), None);
    }

    #[test]
    fn shared_squares_have_no_index() {
        let layout = layout("KRK");
        let squares = [Square::A1, Square::H8, Square::A1];
        assert_eq!(layout.encode(&squares, Color::White), None);
    }

    #[test]
    fn pawns_on_the_back_rank_have_no_index() {
        let layout = layout("KPK");
        assert_eq!(
            layout.encode(&[Square::A1, Square::H8, Square::E8], Color::White),
            None
        );
        assert_eq!(
            layout.encode(&[Square::A1, Square::H8, Square::E1], Color::Black),
            None
        );
    }

    #[test]
    fn twin_order_is_canonicalized_by_encode() {
        let layout = layout("KRRK");

        // Swapping the rook squares must map back to the same index; only
        // the ascending order is stored.
        for index in 0..layout.size() {
            if let Some(arrangement) = layout.decode(index) {
                let mut swapped: Vec<Square> = arrangement.squares.to_vec();
                swapped.swap(2, 3);
                assert_eq!(layout.encode(&swapped, arrangement.turn), Some(index));
                return;
            }
        }

        unreachable!("no legal index found");
    }

    #[test]
    fn encode_board_matches_encode() {
        let layout = layout("KPK");
        let board: Board = "8/8/4k3/8/8/4P3/4K3/8 w - -".parse().unwrap();

        let squares = [Square::E2, Square::E6, Square::E3];
        assert_eq!(
            layout.encode_board(&board),
            layout.encode(&squares, Color::White)
        );
    }

    #[test]
    fn swapped_probe_uses_the_half_turn_image() {
        // White king e7, black pawn e6, black king e3, black to move is the
        // color swap of white king e6, white pawn e3, black king e2, white
        // to move, up to the mirror the encoding folds away.
        let layout = layout("KPK");
        let board: Board = "8/4K3/4p3/8/8/4k3/8/8 b - -".parse().unwrap();

        let squares = [Square::E6, Square::E2, Square::E3];
        assert_eq!(
            layout.encode_board_swapped(&board),
            layout.encode(&squares, Color::White)
        );
    }
}
