//! Global cooldown between dispatched actions.

use crate::types::Outcome;

/// Seconds that must elapse after a dispatch before any action may fire again.
pub const COOLDOWN_SECS: f64 = 0.5;

/// Decide whether `outcome` fires at `now` given the last dispatch time.
///
/// `last_dispatch` is `None` before the first dispatch of a run, in which
/// case any action fires. Returns the (possibly updated) last dispatch time.
/// The cooldown is shared by all three actions.
pub fn try_dispatch(
    outcome: Outcome,
    now: f64,
    cooldown_secs: f64,
    last_dispatch: Option<f64>,
) -> (bool, Option<f64>) {
    if !outcome.is_action() {
        return (false, last_dispatch);
    }
    match last_dispatch {
        Some(last) if now - last <= cooldown_secs => (false, last_dispatch),
        _ => (true, Some(now)),
    }
}

/// Owns the debounce timestamp for one run of the sample loop.
#[derive(Debug, Clone)]
pub struct DebounceGate {
    cooldown_secs: f64,
    last_dispatch: Option<f64>,
}

impl DebounceGate {
    pub fn new(cooldown_secs: f64) -> Self {
        Self {
            cooldown_secs,
            last_dispatch: None,
        }
    }

    pub fn last_dispatch(&self) -> Option<f64> {
        self.last_dispatch
    }

    /// True when the caller must dispatch `outcome` now.
    pub fn check(&mut self, outcome: Outcome, now: f64) -> bool {
        let (fire, last) = try_dispatch(outcome, now, self.cooldown_secs, self.last_dispatch);
        self.last_dispatch = last;
        fire
    }
}

impl Default for DebounceGate {
    fn default() -> Self {
        Self::new(COOLDOWN_SECS)
    }
}
