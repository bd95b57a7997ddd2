use crate::types::*;
use crossbeam_channel::Receiver;
use std::io::{self, Write};
use std::time::{Duration, Instant};

/// Prints observation records as text lines, e.g.
/// `2024-03-09 14:05:07 | Raw: 25, 5 | Envelope: 0.78, 0.16 | Output: 1`.
///
/// Records are throttled to `max_hz`, except those that fired an action,
/// which are always shown. Diagnostics are always shown.
pub struct ConsoleDisplay {
    rx: Receiver<PipelineEvent>,
    max_hz: u32,
}

impl ConsoleDisplay {
    pub fn new(rx: Receiver<PipelineEvent>, max_hz: u32) -> Self {
        Self { rx, max_hz }
    }

    pub fn run(&self) {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let _ = self.render_all(&mut out);
    }

    /// Render until every sender is dropped.
    pub fn render_all<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let min_gap = if self.max_hz == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / self.max_hz as f64)
        };
        let mut last_shown: Option<Instant> = None;

        for event in self.rx.iter() {
            match event {
                PipelineEvent::Observation(rec) => {
                    let now = Instant::now();
                    let due = last_shown.map_or(true, |t| now.duration_since(t) >= min_gap);
                    if rec.fired || due {
                        writeln!(out, "{}", rec)?;
                        last_shown = Some(now);
                    }
                }
                PipelineEvent::Diagnostic(diag) => writeln!(out, "{}", diag)?,
            }
            out.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use crossbeam_channel::unbounded;

    fn obs(raw1: i32, fired: bool) -> PipelineEvent {
        PipelineEvent::Observation(ObservationRecord {
            timestamp: Local::now(),
            raw1,
            raw2: 0,
            envelope1: 1.0,
            envelope2: 2.0,
            outcome: if fired { Outcome::Action1 } else { Outcome::None },
            fired,
        })
    }

    fn render(events: Vec<PipelineEvent>, max_hz: u32) -> String {
        let (tx, rx) = unbounded();
        for e in events {
            tx.send(e).unwrap();
        }
        drop(tx);
        let mut buf = Vec::new();
        ConsoleDisplay::new(rx, max_hz).render_all(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_unthrottled_prints_every_record() {
        let text = render(vec![obs(1, false), obs(2, false), obs(3, false)], 0);
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("| Raw: 2, 0 | Envelope: 1.00, 2.00 | Output: 0"));
    }

    #[test]
    fn test_throttle_keeps_fired_records() {
        // 1 Hz: the burst collapses to the first line plus the fired one.
        let text = render(vec![obs(1, false), obs(2, false), obs(3, true), obs(4, false)], 1);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2, "got: {:?}", lines);
        assert!(lines[1].ends_with("Output: 1"));
    }

    #[test]
    fn test_diagnostics_always_printed() {
        let diag = PipelineEvent::Diagnostic(Diagnostic {
            timestamp: Local::now(),
            kind: DiagnosticKind::MalformedSample,
            message: "expected 2 fields, got 3".into(),
        });
        let text = render(vec![obs(1, false), diag], 1);
        assert!(text.contains("Malformed data received: expected 2 fields, got 3"));
    }
}
