use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

// ─── Raw samples from the sensor board ──────────────────────────────────────

/// One line from the sensor interface: a signed reading per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub raw1: i32,
    pub raw2: i32,
}

impl Sample {
    pub fn new(raw1: i32, raw2: i32) -> Self {
        Self { raw1, raw2 }
    }
}

// ─── Classified gestures ────────────────────────────────────────────────────

/// Gesture decided for one tick. Exactly one per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    None,
    Action1,
    Action2,
    Action3,
}

impl Outcome {
    /// Numeric output code used in the textual record: 0 = none, 1..=3 = action slot.
    pub fn code(self) -> u8 {
        match self {
            Outcome::None => 0,
            Outcome::Action1 => 1,
            Outcome::Action2 => 2,
            Outcome::Action3 => 3,
        }
    }

    pub fn is_action(self) -> bool {
        self != Outcome::None
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ─── Action bindings ────────────────────────────────────────────────────────

/// Maps the three gesture slots to opaque action identifiers (key names).
/// Snapshotted when the loop starts; rebinding needs a stop/start cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBindings {
    pub action1: String,
    pub action2: String,
    pub action3: String,
}

impl ActionBindings {
    pub fn new(
        action1: impl Into<String>,
        action2: impl Into<String>,
        action3: impl Into<String>,
    ) -> Self {
        Self {
            action1: action1.into(),
            action2: action2.into(),
            action3: action3.into(),
        }
    }

    /// Action bound to an outcome, `None` for `Outcome::None`.
    pub fn for_outcome(&self, outcome: Outcome) -> Option<&str> {
        match outcome {
            Outcome::None => None,
            Outcome::Action1 => Some(&self.action1),
            Outcome::Action2 => Some(&self.action2),
            Outcome::Action3 => Some(&self.action3),
        }
    }
}

impl Default for ActionBindings {
    fn default() -> Self {
        Self::new("space", "left", "right")
    }
}

impl fmt::Display for ActionBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "action1={} action2={} action3={}",
            self.action1, self.action2, self.action3
        )
    }
}

// ─── Per-tick observation ───────────────────────────────────────────────────

/// Full diagnostic snapshot of one processed sample.
/// Produced by the sample loop, consumed by the console display, data logger and tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub timestamp: DateTime<Local>,
    pub raw1: i32,
    pub raw2: i32,
    pub envelope1: f64,
    pub envelope2: f64,
    pub outcome: Outcome,
    /// True when the debounce gate let this outcome through to the action sink.
    pub fired: bool,
}

impl fmt::Display for ObservationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | Raw: {}, {} | Envelope: {:.2}, {:.2} | Output: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.raw1,
            self.raw2,
            self.envelope1,
            self.envelope2,
            self.outcome.code(),
        )
    }
}

/// Recoverable problem seen by the sample loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    MalformedSample,
    TransportRead,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub timestamp: DateTime<Local>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            DiagnosticKind::MalformedSample => "Malformed data received",
            DiagnosticKind::TransportRead => "Serial read error",
        };
        write!(
            f,
            "{} | {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            label,
            self.message
        )
    }
}

// ─── Inter-thread messages ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Observation(ObservationRecord),
    Diagnostic(Diagnostic),
}

// ─── Session clock ──────────────────────────────────────────────────────────

/// Monotonic clock for debounce timing. Wall-clock time is only used for display.
#[derive(Clone)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}
