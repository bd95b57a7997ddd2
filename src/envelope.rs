//! Amplitude envelope per channel.
//!
//! The envelope is a plain moving average of absolute magnitudes scaled by 2.
//! It has no attack/decay asymmetry, so short bursts are spread over the whole
//! window. Anything implementing [`EnvelopeSmoother`] can replace it without
//! touching the classifier or the debounce gate.

use std::collections::VecDeque;

/// Default window length in samples.
pub const WINDOW_LEN: usize = 64;

pub trait EnvelopeSmoother {
    /// Push one non-negative magnitude and return the current envelope value.
    fn update(&mut self, magnitude: u32) -> f64;
    /// Forget all history, as if freshly created.
    fn reset(&mut self);
    fn capacity(&self) -> usize;
}

/// Fixed-capacity FIFO of magnitudes, zero-primed at creation.
///
/// Length is always exactly `capacity`: every push evicts the oldest entry.
/// The running sum is kept in a `u64`, so even `capacity` copies of
/// `u32::MAX` cannot overflow it for any window that fits in memory.
#[derive(Debug, Clone)]
pub struct MovingAverageEnvelope {
    values: VecDeque<u32>,
    sum: u64,
}

impl MovingAverageEnvelope {
    /// `capacity` of 0 is bumped to 1 so the mean is always defined.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::from(vec![0u32; capacity]),
            sum: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn sum(&self) -> u64 {
        self.sum
    }

    /// Envelope for the current window contents, without pushing anything.
    pub fn value(&self) -> f64 {
        self.sum as f64 / self.values.len() as f64 * 2.0
    }

    pub fn values(&self) -> impl Iterator<Item = &u32> {
        self.values.iter()
    }
}

impl Default for MovingAverageEnvelope {
    fn default() -> Self {
        Self::new(WINDOW_LEN)
    }
}

impl EnvelopeSmoother for MovingAverageEnvelope {
    fn update(&mut self, magnitude: u32) -> f64 {
        if let Some(oldest) = self.values.pop_front() {
            self.sum -= oldest as u64;
        }
        self.values.push_back(magnitude);
        self.sum += magnitude as u64;
        self.value()
    }

    fn reset(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0);
        self.sum = 0;
    }

    fn capacity(&self) -> usize {
        self.values.len()
    }
}
