use std::ops::Range;
use std::sync::Mutex;

/// The number of indices a worker claims at a time.
pub const PACKAGE_SIZE: u64 = 50_000;

/// Thread-safe dispatch of index ranges to generation workers.
#[derive(Debug)]
pub struct Dispenser {
    next: Mutex<u64>,
    end: u64,
}

impl Dispenser {
    /// Dispenses packages covering `0..end`.
    pub fn new(end: u64) -> Self {
        Dispenser {
            next: Mutex::new(0),
            end,
        }
    }

    /// The next range of at most `size` indices, or `None` when exhausted.
    pub fn next_package(&self, size: u64) -> Option<Range<u64>> {
        let mut next = self.next.lock().unwrap_or_else(|e| e.into_inner());
        if *next >= self.end {
            return None;
        }

        let start = *next;
        *next = (start + size).min(self.end);
        Some(start..*next)
    }
}
