use crate::classifier::classify;
use crate::debounce::DebounceGate;
use crate::envelope::{EnvelopeSmoother, MovingAverageEnvelope};
use crate::types::*;
use chrono::Local;

/// Per-run pipeline state: one smoother per channel plus the debounce gate.
///
/// Created when the loop starts and dropped when it stops, so a restart
/// always begins from zero-primed windows and "no prior dispatch".
/// Only the loop thread touches it.
pub struct Pipeline<S: EnvelopeSmoother = MovingAverageEnvelope> {
    smoother1: S,
    smoother2: S,
    gate: DebounceGate,
    bindings: ActionBindings,
}

/// Result of one tick.
#[derive(Debug, Clone)]
pub struct Tick {
    pub record: ObservationRecord,
    /// Bound action to dispatch, set only when the gate let the outcome through.
    pub dispatch: Option<String>,
}

impl Pipeline<MovingAverageEnvelope> {
    pub fn new(window_len: usize, cooldown_secs: f64, bindings: ActionBindings) -> Self {
        Self::with_smoothers(
            MovingAverageEnvelope::new(window_len),
            MovingAverageEnvelope::new(window_len),
            DebounceGate::new(cooldown_secs),
            bindings,
        )
    }
}

impl<S: EnvelopeSmoother> Pipeline<S> {
    pub fn with_smoothers(smoother1: S, smoother2: S, gate: DebounceGate, bindings: ActionBindings) -> Self {
        Self {
            smoother1,
            smoother2,
            gate,
            bindings,
        }
    }

    /// Smooth both channels, classify, and run the gate.
    /// `now` is monotonic seconds used for the cooldown; the record gets wall-clock time.
    pub fn process(&mut self, sample: Sample, now: f64) -> Tick {
        let envelope1 = self.smoother1.update(sample.raw1.unsigned_abs());
        let envelope2 = self.smoother2.update(sample.raw2.unsigned_abs());

        let outcome = classify(sample.raw1, envelope1, envelope2);
        let fired = self.gate.check(outcome, now);
        let dispatch = if fired {
            self.bindings.for_outcome(outcome).map(str::to_string)
        } else {
            None
        };

        Tick {
            record: ObservationRecord {
                timestamp: Local::now(),
                raw1: sample.raw1,
                raw2: sample.raw2,
                envelope1,
                envelope2,
                outcome,
                fired,
            },
            dispatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::WINDOW_LEN;

    fn pipeline() -> Pipeline {
        Pipeline::new(WINDOW_LEN, 0.5, ActionBindings::new("space", "left", "right"))
    }

    #[test]
    fn test_first_flex_fires_action1() {
        let mut p = pipeline();
        let tick = p.process(Sample::new(25, 5), 0.0);
        assert!((tick.record.envelope1 - 2.0 * 25.0 / 64.0).abs() < 1e-9);
        assert!((tick.record.envelope2 - 2.0 * 5.0 / 64.0).abs() < 1e-9);
        assert_eq!(tick.record.outcome, Outcome::Action1);
        assert!(tick.record.fired);
        assert_eq!(tick.dispatch.as_deref(), Some("space"));
    }

    #[test]
    fn test_negative_raw_uses_magnitude_for_envelope() {
        let mut p = pipeline();
        let tick = p.process(Sample::new(-64, -32), 0.0);
        assert!((tick.record.envelope1 - 2.0).abs() < 1e-9);
        assert!((tick.record.envelope2 - 1.0).abs() < 1e-9);
        assert_eq!(tick.record.outcome, Outcome::None);
        assert!(tick.dispatch.is_none());
    }

    #[test]
    fn test_repeated_flex_is_debounced() {
        let mut p = pipeline();
        let fired: Vec<bool> = (0..5)
            .map(|i| p.process(Sample::new(30, 0), i as f64 * 0.1).record.fired)
            .collect();
        assert_eq!(fired, vec![true, false, false, false, false]);
        // 0.6s after the first fire the gate is open again
        assert!(p.process(Sample::new(30, 0), 0.6).record.fired);
    }

    #[test]
    fn test_primed_envelopes_yield_action3() {
        let mut p = pipeline();
        let mut last = None;
        for i in 0..WINDOW_LEN {
            last = Some(p.process(Sample::new(15, 200), i as f64 * 0.001));
        }
        let tick = last.unwrap();
        assert!(tick.record.envelope1 > 10.0);
        assert!(tick.record.envelope2 > 100.0);
        assert_eq!(tick.record.outcome, Outcome::Action3);
    }

    #[test]
    fn test_channel2_only_yields_action2() {
        let mut p = pipeline();
        let mut outcomes = Vec::new();
        let mut dispatched = Vec::new();
        for i in 0..WINDOW_LEN {
            let tick = p.process(Sample::new(0, 300), i as f64 * 0.001);
            outcomes.push(tick.record.outcome);
            dispatched.extend(tick.dispatch);
        }
        assert_eq!(*outcomes.last().unwrap(), Outcome::Action2);
        assert_eq!(dispatched, vec!["left".to_string()]);
    }

    #[test]
    fn test_record_carries_raw_values() {
        let mut p = pipeline();
        let tick = p.process(Sample::new(7, -9), 0.0);
        assert_eq!(tick.record.raw1, 7);
        assert_eq!(tick.record.raw2, -9);
    }
}
