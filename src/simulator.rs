use crate::error::TransportError;
use crate::source::{SampleSource, DELIMITER};
use crate::types::Sample;
use log::info;
use std::thread;
use std::time::{Duration, Instant};

/// One segment of the scripted demo: a muscle state held for `ms`.
#[derive(Debug, Clone, Copy)]
pub struct Phase {
    pub name: &'static str,
    pub ms: u32,
    /// Peak amplitude on each channel; the sign alternates every sample
    /// like a rectifiable EMG burst.
    pub amp1: i32,
    pub amp2: i32,
}

/// Tour that walks through every gesture, then repeats.
pub fn demo_script() -> Vec<Phase> {
    vec![
        Phase { name: "rest", ms: 1500, amp1: 0, amp2: 0 },
        Phase { name: "quick flex (channel 1)", ms: 300, amp1: 45, amp2: 0 },
        Phase { name: "rest", ms: 1500, amp1: 0, amp2: 0 },
        Phase { name: "sustained channel 2", ms: 1500, amp1: 0, amp2: 220 },
        Phase { name: "rest", ms: 1500, amp1: 0, amp2: 0 },
        Phase { name: "co-contraction", ms: 1500, amp1: 60, amp2: 220 },
    ]
}

const NOISE_AMP: i32 = 3;

/// Generates a synthetic two-channel stream paced in real time.
/// Lets the whole pipeline run without a sensor board attached.
pub struct SimulatedSource {
    rate_hz: u32,
    script: Vec<Phase>,
    phase_idx: usize,
    tick_in_phase: u64,
    tick: u64,
    rng: u64,
    next_due: Option<Instant>,
}

impl SimulatedSource {
    pub fn new(rate_hz: u32) -> Self {
        Self::with_script(rate_hz, demo_script())
    }

    pub fn with_script(rate_hz: u32, script: Vec<Phase>) -> Self {
        Self {
            rate_hz: rate_hz.max(1),
            script,
            phase_idx: 0,
            tick_in_phase: 0,
            tick: 0,
            rng: 0x9E37_79B9_7F4A_7C15,
            next_due: None,
        }
    }

    fn ticks_for(&self, phase: &Phase) -> u64 {
        (phase.ms as u64 * self.rate_hz as u64 / 1000).max(1)
    }

    /// Next sample of the script, without any pacing.
    pub fn next_sample(&mut self) -> Sample {
        if self.script.is_empty() {
            return Sample::new(self.noise(), self.noise());
        }
        let phase = self.script[self.phase_idx];
        if self.tick_in_phase == 0 {
            info!("  sim: {} for {}ms", phase.name, phase.ms);
        }

        let sign = if self.tick % 2 == 0 { 1 } else { -1 };
        let raw1 = sign * phase.amp1 + self.noise();
        let raw2 = sign * phase.amp2 + self.noise();

        self.tick += 1;
        self.tick_in_phase += 1;
        if self.tick_in_phase >= self.ticks_for(&phase) {
            self.tick_in_phase = 0;
            self.phase_idx = (self.phase_idx + 1) % self.script.len();
        }
        Sample::new(raw1, raw2)
    }

    /// xorshift64, mapped to [-NOISE_AMP, NOISE_AMP].
    fn noise(&mut self) -> i32 {
        self.rng ^= self.rng << 13;
        self.rng ^= self.rng >> 7;
        self.rng ^= self.rng << 17;
        (self.rng % (2 * NOISE_AMP as u64 + 1)) as i32 - NOISE_AMP
    }
}

impl SampleSource for SimulatedSource {
    fn describe(&self) -> String {
        format!("simulator @ {}Hz", self.rate_hz)
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        let period = Duration::from_secs_f64(1.0 / self.rate_hz as f64);
        let now = Instant::now();
        let due = *self.next_due.get_or_insert(now);
        if due > now {
            let wait = due - now;
            if wait > timeout {
                thread::sleep(timeout);
                return Ok(None);
            }
            thread::sleep(wait);
        }
        // Don't try to catch up after a long stall.
        self.next_due = Some(due.max(now) + period);

        let s = self.next_sample();
        Ok(Some(format!("{}{}{}", s.raw1, DELIMITER, s.raw2)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_is_small_noise() {
        let mut sim = SimulatedSource::with_script(
            1000,
            vec![Phase { name: "rest", ms: 100, amp1: 0, amp2: 0 }],
        );
        for _ in 0..500 {
            let s = sim.next_sample();
            assert!(s.raw1.abs() <= NOISE_AMP);
            assert!(s.raw2.abs() <= NOISE_AMP);
        }
    }

    #[test]
    fn test_burst_alternates_sign() {
        let mut sim = SimulatedSource::with_script(
            1000,
            vec![Phase { name: "burst", ms: 100, amp1: 100, amp2: 0 }],
        );
        let a = sim.next_sample();
        let b = sim.next_sample();
        assert!(a.raw1 > 90);
        assert!(b.raw1 < -90);
    }

    #[test]
    fn test_phases_advance_by_duration() {
        let mut sim = SimulatedSource::with_script(
            1000,
            vec![
                Phase { name: "a", ms: 10, amp1: 100, amp2: 0 },
                Phase { name: "b", ms: 10, amp1: 0, amp2: 100 },
            ],
        );
        for _ in 0..10 {
            assert!(sim.next_sample().raw1.abs() > 90);
        }
        for _ in 0..10 {
            assert!(sim.next_sample().raw2.abs() > 90);
        }
        // Wraps back to the first phase
        assert!(sim.next_sample().raw1.abs() > 90);
    }

    #[test]
    fn test_read_line_emits_tab_separated_pairs() {
        let mut sim = SimulatedSource::new(1000);
        let line = sim
            .read_line(Duration::from_millis(50))
            .unwrap()
            .expect("first line is due immediately");
        assert!(crate::source::parse_sample(&line).is_ok(), "line: {:?}", line);
    }
}
