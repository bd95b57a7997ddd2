//! Sample sources: the transport that delivers `<raw1>\t<raw2>` lines.

use crate::error::{MalformedSample, TransportError};
use crate::replay::ReplaySource;
use crate::simulator::SimulatedSource;
use crate::types::Sample;
use std::path::PathBuf;
use std::time::Duration;

/// Field separator on the wire.
pub const DELIMITER: char = '\t';

/// Baud rate the EMG board firmware uses.
pub const DEFAULT_BAUD: u32 = 115200;

/// A line-oriented source, exclusively owned by the running sample loop.
pub trait SampleSource: Send {
    /// Human-readable name for logs ("serial /dev/ttyACM0", "simulator", ...).
    fn describe(&self) -> String;

    /// Wait at most `timeout` for the next complete line.
    /// `Ok(None)` means nothing arrived in time and is not an error.
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError>;

    /// Release the underlying handle. Called once when the loop stops.
    fn close(&mut self) {}
}

/// Which transport to open when the loop starts.
#[derive(Debug, Clone)]
pub enum SourceConfig {
    Serial { port: String, baud_rate: u32 },
    Simulator { rate_hz: u32 },
    Replay { path: PathBuf, rate_hz: u32 },
}

impl SourceConfig {
    pub fn open(&self) -> Result<Box<dyn SampleSource>, TransportError> {
        match self {
            SourceConfig::Serial { port, baud_rate } => open_serial(port, *baud_rate),
            SourceConfig::Simulator { rate_hz } => Ok(Box::new(SimulatedSource::new(*rate_hz))),
            SourceConfig::Replay { path, rate_hz } => {
                Ok(Box::new(ReplaySource::open(path, *rate_hz)?))
            }
        }
    }
}

#[cfg(feature = "hardware")]
fn open_serial(port: &str, baud_rate: u32) -> Result<Box<dyn SampleSource>, TransportError> {
    Ok(Box::new(crate::serial_reader::SerialSource::open(port, baud_rate)?))
}

#[cfg(not(feature = "hardware"))]
fn open_serial(port: &str, _baud_rate: u32) -> Result<Box<dyn SampleSource>, TransportError> {
    Err(TransportError::Open {
        source_name: format!("serial {}", port),
        reason: "built without the 'hardware' feature".into(),
    })
}

/// Parse one trimmed line into a sample. Exactly two integer fields.
pub fn parse_sample(line: &str) -> Result<Sample, MalformedSample> {
    let fields: Vec<&str> = line.trim().split(DELIMITER).collect();
    if fields.len() != 2 {
        return Err(MalformedSample::FieldCount(fields.len()));
    }
    let parse = |s: &str| {
        s.trim()
            .parse::<i32>()
            .map_err(|_| MalformedSample::NotInteger(s.to_string()))
    };
    Ok(Sample::new(parse(fields[0])?, parse(fields[1])?))
}

/// Reassembles newline-terminated lines from arbitrary byte chunks.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buf: Vec<u8>,
}

/// Partial lines longer than this are dropped; the board never sends them.
const MAX_LINE: usize = 4096;

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        if self.buf.len() > MAX_LINE && !self.buf.contains(&b'\n') {
            self.buf.clear();
        }
    }

    /// Next complete line with `\r\n` / `\n` stripped, or `None` if none is buffered yet.
    pub fn next_line(&mut self) -> Option<Result<String, std::string::FromUtf8Error>> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8(line))
    }

    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(parse_sample("25\t5"), Ok(Sample::new(25, 5)));
        assert_eq!(parse_sample("  -12\t300\r\n"), Ok(Sample::new(-12, 300)));
    }

    #[test]
    fn test_parse_wrong_field_count() {
        assert_eq!(parse_sample("1\t2\t3"), Err(MalformedSample::FieldCount(3)));
        assert_eq!(parse_sample("42"), Err(MalformedSample::FieldCount(1)));
    }

    #[test]
    fn test_parse_non_integer() {
        assert_eq!(
            parse_sample("abc\t5"),
            Err(MalformedSample::NotInteger("abc".into()))
        );
        assert!(matches!(parse_sample("1.5\t2"), Err(MalformedSample::NotInteger(_))));
        assert!(matches!(parse_sample("1\t"), Err(MalformedSample::NotInteger(_))));
    }

    #[test]
    fn test_parse_space_is_not_a_delimiter() {
        assert!(parse_sample("1 2").is_err());
        assert!(parse_sample("1,2").is_err());
    }

    #[test]
    fn test_assembler_split_across_chunks() {
        let mut asm = LineAssembler::new();
        asm.push(b"12\t");
        assert!(asm.next_line().is_none());
        asm.push(b"34\r\n56\t7");
        assert_eq!(asm.next_line().unwrap().unwrap(), "12\t34");
        assert!(asm.next_line().is_none());
        assert_eq!(asm.pending(), 4);
        asm.push(b"8\n");
        assert_eq!(asm.next_line().unwrap().unwrap(), "56\t78");
    }

    #[test]
    fn test_assembler_multiple_lines_in_one_chunk() {
        let mut asm = LineAssembler::new();
        asm.push(b"1\t2\n3\t4\n\n");
        assert_eq!(asm.next_line().unwrap().unwrap(), "1\t2");
        assert_eq!(asm.next_line().unwrap().unwrap(), "3\t4");
        assert_eq!(asm.next_line().unwrap().unwrap(), "");
        assert!(asm.next_line().is_none());
    }

    #[test]
    fn test_assembler_invalid_utf8() {
        let mut asm = LineAssembler::new();
        asm.push(&[0xFF, 0xFE, b'\n']);
        assert!(asm.next_line().unwrap().is_err());
        assert_eq!(asm.pending(), 0);
    }

    #[test]
    fn test_assembler_drops_runaway_garbage() {
        let mut asm = LineAssembler::new();
        asm.push(&vec![b'x'; MAX_LINE + 1]);
        assert_eq!(asm.pending(), 0);
    }

    #[cfg(not(feature = "hardware"))]
    #[test]
    fn test_serial_without_hardware_feature_fails_to_open() {
        let cfg = SourceConfig::Serial {
            port: "/dev/null".into(),
            baud_rate: DEFAULT_BAUD,
        };
        assert!(matches!(cfg.open(), Err(TransportError::Open { .. })));
    }
}
