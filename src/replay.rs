//! Recorded-stream source — plays back a captured text log line by line.
//!
//! Works with any `BufRead`: files, in-memory buffers. Lines are handed to the
//! pipeline verbatim, so malformed lines in a capture show up as diagnostics
//! exactly as they would live. Blank lines are skipped.

use crate::error::TransportError;
use crate::source::SampleSource;
use log::info;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

pub struct ReplaySource<R: BufRead + Send> {
    name: String,
    reader: R,
    /// 0 = as fast as the loop can consume.
    rate_hz: u32,
    next_due: Option<Instant>,
    line_buf: String,
    lines_read: u64,
    finished: bool,
}

impl ReplaySource<BufReader<File>> {
    pub fn open(path: &Path, rate_hz: u32) -> Result<Self, TransportError> {
        let file = File::open(path).map_err(|e| TransportError::Open {
            source_name: format!("replay {}", path.display()),
            reason: e.to_string(),
        })?;
        Ok(Self::from_reader(
            format!("replay {}", path.display()),
            BufReader::new(file),
            rate_hz,
        ))
    }
}

impl<R: BufRead + Send> ReplaySource<R> {
    pub fn from_reader(name: impl Into<String>, reader: R, rate_hz: u32) -> Self {
        Self {
            name: name.into(),
            reader,
            rate_hz,
            next_due: None,
            line_buf: String::new(),
            lines_read: 0,
            finished: false,
        }
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Sleep until the next line is due. Returns false if that is further away than `timeout`.
    fn pace(&mut self, timeout: Duration) -> bool {
        if self.rate_hz == 0 {
            return true;
        }
        let period = Duration::from_secs_f64(1.0 / self.rate_hz as f64);
        let now = Instant::now();
        let due = *self.next_due.get_or_insert(now);
        if due > now {
            let wait = due - now;
            if wait > timeout {
                thread::sleep(timeout);
                return false;
            }
            thread::sleep(wait);
        }
        self.next_due = Some(due.max(now) + period);
        true
    }
}

impl<R: BufRead + Send> SampleSource for ReplaySource<R> {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        if self.finished {
            // Idle like a quiet sensor until someone stops the loop.
            thread::sleep(timeout);
            return Ok(None);
        }
        if !self.pace(timeout) {
            return Ok(None);
        }
        loop {
            self.line_buf.clear();
            match self.reader.read_line(&mut self.line_buf)? {
                0 => {
                    info!("{}: end of recording after {} lines", self.name, self.lines_read);
                    self.finished = true;
                    return Ok(None);
                }
                _ => {
                    let trimmed = self.line_buf.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    self.lines_read += 1;
                    return Ok(Some(trimmed.to_string()));
                }
            }
        }
    }
}
