use crate::bitbase::{
    Arrangement, Bitbase, BitbaseSet, Codec, DEFAULT_CLUSTER_SIZE, Dispenser, GenerationState,
    Layout, PACKAGE_SIZE, Roster, Value,
};
use crate::chess::{Board, Color, Rank, Role, Square};
use crate::util::Int;
use derive_more::with_trait::{Display, Error};
use log::{debug, info};
use std::collections::BTreeSet;
use std::time::Instant;
use std::{fs, io, thread};

/// Knobs of a generation run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Worker threads per pass.
    pub threads: usize,
    /// Compression of the stored file.
    pub codec: Codec,
    /// Decompressed cluster size of the stored file.
    pub cluster_size: u32,
    /// Hard cap on fixpoint iterations; generation converges far earlier.
    pub max_iterations: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            threads: thread::available_parallelism().map_or(1, |n| n.get()),
            codec: Codec::Lz,
            cluster_size: DEFAULT_CLUSTER_SIZE,
            max_iterations: 1024,
        }
    }
}

/// The reason why a generation run failed.
#[derive(Debug, Display, Error)]
pub enum GenerateError {
    /// A smaller bitbase the run must probe is neither loaded nor loadable.
    #[display("missing dependency bitbase {_0}")]
    #[error(ignore)]
    DependencyMissing(String),
    #[display("{_0}")]
    Io(io::Error),
}

impl From<io::Error> for GenerateError {
    #[inline(always)]
    fn from(e: io::Error) -> Self {
        GenerateError::Io(e)
    }
}

/// Builds bitbases by retrograde fixpoint iteration and registers them.
#[derive(Debug)]
pub struct Generator<'a> {
    set: &'a mut BitbaseSet,
    settings: Settings,
}

impl<'a> Generator<'a> {
    pub fn new(set: &'a mut BitbaseSet) -> Self {
        Self::with_settings(set, Settings::default())
    }

    pub fn with_settings(set: &'a mut BitbaseSet, settings: Settings) -> Self {
        Generator { set, settings }
    }

    /// Builds the bitbase for `roster` and, first, every bitbase it can
    /// reach by a capture or a promotion.
    ///
    /// Already loadable bitbases are attached instead of rebuilt. The
    /// recursion bottoms out at bare kings, which are a draw by definition
    /// and never built.
    pub fn compute_rec(&mut self, roster: &Roster) -> Result<(), GenerateError> {
        if roster.len() <= 2 {
            return Ok(());
        }

        let name = roster.to_string();
        if self.set.is_available(&name) || self.set.load(&name).is_ok() {
            return Ok(());
        }

        for i in 2..roster.len() {
            if roster.piece(i).role() == Role::Pawn {
                for role in Role::PROMOTIONS {
                    self.compute_rec(&roster.promoted(i, role))?;
                }
            }

            self.compute_rec(&roster.removed(i))?;
        }

        self.compute(roster)
    }

    /// Builds the bitbase for `roster` alone, stores it in the set's
    /// directory, and registers it.
    ///
    /// Every bitbase reachable by one capture or promotion must already be
    /// registered.
    pub fn compute(&mut self, roster: &Roster) -> Result<(), GenerateError> {
        let name = roster.to_string();
        if self.set.is_available(&name) {
            return Ok(());
        }

        for dependency in probe_dependencies(roster) {
            if !self.set.is_available(&dependency) {
                return Err(GenerateError::DependencyMissing(dependency));
            }
        }

        let layout = Layout::new(roster.clone());
        let state = GenerationState::new(layout.size());
        let threads = self.settings.threads.max(1);
        let clock = Instant::now();

        info!("computing bitbase {name}, {} positions", layout.size());

        let set = &*self.set;
        let dispenser = Dispenser::new(layout.size());
        thread::scope(|scope| {
            for _ in 0..threads {
                scope.spawn(|| initial_worker(set, &layout, &state, &dispenser));
            }
        });

        info!(
            "initial pass of {name} done after {:.1?}, {state}",
            clock.elapsed()
        );

        // Iteration zero scans the full range, so the queue starts empty and
        // only retrograde marks feed the following iterations.
        state.clear_all_candidates();

        for iteration in 0..self.settings.max_iterations {
            let before = state.wins();

            let dispenser = Dispenser::new(layout.size());
            thread::scope(|scope| {
                for _ in 0..threads {
                    scope.spawn(|| fixpoint_worker(&layout, &state, &dispenser, iteration > 0));
                }
            });

            let found = state.wins() - before;
            debug!("iteration {iteration} of {name}: {found} new wins");
            if found == 0 {
                break;
            }
        }

        info!(
            "bitbase {name} complete after {:.1?}, {state}",
            clock.elapsed()
        );

        let bitbase = Bitbase::from_vector(state.snapshot_won());
        fs::create_dir_all(self.set.directory())?;
        bitbase.store(
            &self.set.path_for(roster),
            roster.signature(),
            self.settings.cluster_size,
            self.settings.codec,
        )?;

        self.set.insert(roster, bitbase);
        Ok(())
    }
}

/// Every roster reachable from `roster` by one capture or promotion whose
/// probe needs a bitbase of its own.
fn probe_dependencies(roster: &Roster) -> BTreeSet<String> {
    let mut dependencies = BTreeSet::new();
    let mut consider = |successor: Roster| {
        if successor.signature().has_pieces(Color::White) {
            dependencies.insert(successor.to_string());
        }
    };

    for i in 2..roster.len() {
        consider(roster.removed(i));

        if roster.piece(i).role() == Role::Pawn {
            for role in Role::PROMOTIONS {
                let promoted = roster.promoted(i, role);
                consider(promoted.clone());

                // A promotion can capture at the same time.
                for j in 2..promoted.len() {
                    if promoted.piece(j).color() != roster.piece(i).color() {
                        consider(promoted.removed(j));
                    }
                }
            }
        }
    }

    dependencies
}

fn place(board: &mut Board, layout: &Layout, arrangement: &Arrangement) {
    board.clear();
    for (&piece, &sq) in layout.roster().pieces().iter().zip(&arrangement.squares) {
        board.set_piece(sq, piece);
    }

    board.set_turn(arrangement.turn);
}

/// First pass: weed out illegal indices, decide mates and stalemates, and
/// resolve every capture and promotion against the smaller bitbases.
fn initial_worker(
    set: &BitbaseSet,
    layout: &Layout,
    state: &GenerationState,
    dispenser: &Dispenser,
) {
    let mut board = Board::default();

    while let Some(range) = dispenser.next_package(PACKAGE_SIZE) {
        for index in state.get_work(range.start, range.end - range.start, false) {
            let Some(arrangement) = layout.decode(index) else {
                state.set_illegal(index);
                continue;
            };

            place(&mut board, layout, &arrangement);
            debug_assert_eq!(layout.encode_board(&board), Some(index));

            if !board.is_legal_position() {
                state.set_illegal(index);
                continue;
            }

            let moves = board.moves();
            if moves.is_empty() {
                // Checkmated black is the one immediate white win.
                if board.turn() == Color::Black && board.is_in_check() {
                    state.set_win(index);
                } else {
                    state.set_loss_or_draw(index);
                }

                continue;
            }

            let turn = board.turn();
            for m in moves {
                if !board.is_capture(m) && m.promotion().is_none() {
                    continue;
                }

                let undo = board.play(m);
                let white_win = set.value_from_single(&board) == Value::Win;
                board.undo(m, undo);

                match turn {
                    Color::White if white_win => {
                        state.set_win(index);
                        break;
                    }

                    // Black found an escape into a position white never
                    // wins; this index can never become a win.
                    Color::Black if !white_win => {
                        state.set_loss_or_draw(index);
                        break;
                    }

                    _ => {}
                }
            }
        }
    }
}

/// Fixpoint pass: decide still-open positions from the quiet moves alone,
/// reading the very vector being written.
fn fixpoint_worker(
    layout: &Layout,
    state: &GenerationState,
    dispenser: &Dispenser,
    only_candidates: bool,
) {
    let mut board = Board::default();

    while let Some(range) = dispenser.next_package(PACKAGE_SIZE) {
        for index in state.get_work(range.start, range.end - range.start, only_candidates) {
            let Some(mut arrangement) = layout.decode(index) else {
                debug_assert!(false, "undecided index {index} must decode");
                continue;
            };

            place(&mut board, layout, &arrangement);
            debug_assert_eq!(layout.encode_board(&board), Some(index));

            if decide(layout, state, &mut board) {
                state.set_win(index);
                mark_candidates(layout, state, &board, &mut arrangement);
            }
        }
    }
}

/// The winning rule over quiet moves: any winning child for White, no
/// non-winning child for Black.
///
/// Captures and promotions are settled: a winning one already decided the
/// index in the initial pass, and for Black a capture that escapes the win
/// kept the index out of the fixpoint altogether.
fn decide(layout: &Layout, state: &GenerationState, board: &mut Board) -> bool {
    let turn = board.turn();

    for m in board.moves() {
        if board.is_capture(m) || m.promotion().is_some() {
            continue;
        }

        let undo = board.play(m);
        let child = layout.encode_board(board);
        board.undo(m, undo);

        let won = child.is_some_and(|i| state.is_won(i));
        match turn {
            Color::White if won => return true,
            Color::Black if !won => return false,
            _ => {}
        }
    }

    turn == Color::Black
}

/// Queues every position that could have reached this one by a single quiet
/// move.
///
/// The mover is the side not to move here. Origins come from the piece's own
/// attack mask; king origins additionally avoid the squares next to the
/// enemy king, pawn origins are the straight pushes. Spurious candidates
/// simply fail the winning rule next iteration, missing one would lose a
/// win.
fn mark_candidates(
    layout: &Layout,
    state: &GenerationState,
    board: &Board,
    arrangement: &mut Arrangement,
) {
    let mover = !arrangement.turn;
    let occupied = board.occupied();

    for i in 0..layout.roster().len() {
        let piece = layout.roster().piece(i);
        if piece.color() != mover {
            continue;
        }

        let destination = arrangement.squares[i];
        let mut queue = |origin: Square, arrangement: &mut Arrangement| {
            arrangement.squares[i] = origin;
            if let Some(predecessor) = layout.encode(&arrangement.squares, mover) {
                state.set_candidate(predecessor);
            }

            arrangement.squares[i] = destination;
        };

        match piece.role() {
            Role::Pawn => {
                let (step, home, jump): (i8, Rank, Rank) = match mover {
                    Color::White => (-8, Rank::Third, Rank::Fourth),
                    Color::Black => (8, Rank::Sixth, Rank::Fifth),
                };

                if (mover == Color::White && destination.rank() >= home)
                    || (mover == Color::Black && destination.rank() <= home)
                {
                    queue(offset(destination, step), arrangement);
                    if destination.rank() == jump {
                        queue(offset(destination, 2 * step), arrangement);
                    }
                }
            }

            role => {
                let mut origins = board.attack_mask(destination);
                if role == Role::King {
                    let enemy = board.king(arrangement.turn);
                    origins &= !board.attack_mask(enemy);
                }

                for origin in origins {
                    if !occupied.contains(origin) {
                        queue(origin, arrangement);
                    }
                }
            }
        }
    }
}

#[inline(always)]
fn offset(sq: Square, by: i8) -> Square {
    Int::new((sq.get() as i8 + by) as u8)
}
