use crate::bitbase::{AtomicBits, BitVector};
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

/// The shared state of one generation run.
///
/// Three bit vectors over the same index domain: `won` holds the result,
/// `computed` marks every decided index (won, lost-or-drawn, or illegal),
/// `candidate` queues indices for the next fixpoint iteration. `won` and
/// `computed` only ever grow; `won` is always a subset of `computed`.
#[derive(Debug)]
pub struct GenerationState {
    won: AtomicBits,
    computed: AtomicBits,
    candidate: AtomicBits,
    wins: AtomicU64,
    losses_or_draws: AtomicU64,
    illegal: AtomicU64,
}

impl GenerationState {
    pub fn new(size: u64) -> Self {
        GenerationState {
            won: AtomicBits::new(size),
            computed: AtomicBits::new(size),
            candidate: AtomicBits::new(size),
            wins: AtomicU64::new(0),
            losses_or_draws: AtomicU64::new(0),
            illegal: AtomicU64::new(0),
        }
    }

    /// The index domain size.
    #[inline(always)]
    pub fn size(&self) -> u64 {
        self.won.len()
    }

    /// Whether `index` is decided.
    #[inline(always)]
    pub fn is_computed(&self, index: u64) -> bool {
        self.computed.get(index)
    }

    /// Whether `index` is a recorded win.
    #[inline(always)]
    pub fn is_won(&self, index: u64) -> bool {
        self.won.get(index)
    }

    /// Records a win for `index`.
    #[inline(always)]
    pub fn set_win(&self, index: u64) {
        self.wins.fetch_add(1, Ordering::Relaxed);
        self.won.set(index);
        self.computed.set(index);
    }

    /// Records that `index` is lost or drawn.
    #[inline(always)]
    pub fn set_loss_or_draw(&self, index: u64) {
        self.losses_or_draws.fetch_add(1, Ordering::Relaxed);
        self.computed.set(index);
    }

    /// Records that `index` does not describe a legal position.
    #[inline(always)]
    pub fn set_illegal(&self, index: u64) {
        self.illegal.fetch_add(1, Ordering::Relaxed);
        self.computed.set(index);
    }

    /// Whether `index` is queued for the next iteration.
    #[inline(always)]
    pub fn is_candidate(&self, index: u64) -> bool {
        self.candidate.get(index)
    }

    /// Queues `index` for the next iteration.
    #[inline(always)]
    pub fn set_candidate(&self, index: u64) {
        self.candidate.set(index);
    }

    /// Queues every index in `candidates`.
    pub fn set_candidates(&self, candidates: &[u64]) {
        for &index in candidates {
            self.candidate.set(index);
        }
    }

    /// Unqueues every index.
    pub fn clear_all_candidates(&self) {
        self.candidate.clear_all();
    }

    /// Materialises the ordered list of indices to examine in
    /// `begin..begin + count`.
    ///
    /// Decided indices are skipped. With `only_candidates` only queued
    /// indices are returned, and each one is unqueued as it is handed out so
    /// it does not linger into the following iteration.
    pub fn get_work(&self, begin: u64, count: u64, only_candidates: bool) -> Vec<u64> {
        let end = (begin + count).min(self.size());
        let mut work = Vec::new();

        for index in begin..end {
            if self.is_computed(index) {
                continue;
            }

            if only_candidates {
                if !self.candidate.get(index) {
                    continue;
                }

                self.candidate.clear(index);
            }

            work.push(index);
        }

        work
    }

    /// A plain copy of the win bits.
    pub fn snapshot_won(&self) -> BitVector {
        self.won.snapshot()
    }

    /// The number of wins recorded so far.
    pub fn wins(&self) -> u64 {
        self.wins.load(Ordering::Relaxed)
    }

    /// The number of losses or draws recorded so far.
    pub fn losses_or_draws(&self) -> u64 {
        self.losses_or_draws.load(Ordering::Relaxed)
    }

    /// The number of illegal indices recorded so far.
    pub fn illegal(&self) -> u64 {
        self.illegal.load(Ordering::Relaxed)
    }
}

impl Display for GenerationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "won: {} loss or draw: {} illegal: {}",
            self.wins(),
            self.losses_or_draws(),
            self.illegal()
        )
    }
}
