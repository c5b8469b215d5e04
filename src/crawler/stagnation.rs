//! Scroll-stagnation detection and recovery sizing
//!
//! Lazy-loading feeds sometimes stop delivering posts until the page is
//! scrolled well past the last rendered item. After every cycle the crawler
//! reports the dedup index size; when it has not grown for `threshold`
//! consecutive cycles the tracker asks for a forced scroll burst. Each burst
//! in an unbroken stagnation streak is one jump longer than the previous
//! one, and any new content resets the escalation.

/// A forced scroll burst to perform before the next cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollBurst {
    /// Number of large jumps to perform
    pub jumps: u32,
}

/// Tracks dedup-index growth across cycles
#[derive(Debug, Clone)]
pub struct StagnationTracker {
    threshold: u32,
    stagnant_cycles: u32,
    recovery_rounds: u32,
    last_size: usize,
}

impl StagnationTracker {
    /// Creates a tracker
    ///
    /// # Arguments
    ///
    /// * `threshold` - Stagnant cycles that trigger a burst (at least 1)
    /// * `initial_size` - Dedup index size before the first cycle
    pub fn new(threshold: u32, initial_size: usize) -> Self {
        Self {
            threshold: threshold.max(1),
            stagnant_cycles: 0,
            recovery_rounds: 0,
            last_size: initial_size,
        }
    }

    /// Records the index size after a cycle
    ///
    /// Returns the burst to perform, if stagnation reached the threshold.
    pub fn observe(&mut self, current_size: usize) -> Option<ScrollBurst> {
        let grew = current_size != self.last_size;
        self.last_size = current_size;

        if grew {
            self.stagnant_cycles = 0;
            self.recovery_rounds = 0;
            return None;
        }

        self.stagnant_cycles += 1;
        if self.stagnant_cycles < self.threshold {
            return None;
        }

        let burst = ScrollBurst {
            jumps: self.recovery_rounds + 1,
        };
        self.recovery_rounds += 1;
        self.stagnant_cycles = 0;
        Some(burst)
    }

    #[cfg(test)]
    fn stagnant_cycles(&self) -> u32 {
        self.stagnant_cycles
    }

    #[cfg(test)]
    fn recovery_rounds(&self) -> u32 {
        self.recovery_rounds
    }
}
