//! Serial transport for the EMG board. One text line per sample:
//!
//! ```text
//! <raw1>\t<raw2>\r\n
//! ```
//!
//! Both fields are signed decimal integers. Lines may arrive split across
//! reads; the assembler keeps partial lines between calls.

use crate::error::TransportError;
use crate::source::{LineAssembler, SampleSource};
use log::{debug, info};
use serialport::SerialPort;
use std::io::{self, Read};
use std::time::{Duration, Instant};

/// Upper bound for a single blocking port read, so a stop request is seen promptly.
const POLL_SLICE: Duration = Duration::from_millis(100);

pub struct SerialSource {
    port_name: String,
    port: Option<Box<dyn SerialPort>>,
    assembler: LineAssembler,
    buf: [u8; 256],
}

impl SerialSource {
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self, TransportError> {
        info!("Opening serial port: {} @ {}", port_name, baud_rate);
        let port = serialport::new(port_name, baud_rate)
            .timeout(POLL_SLICE)
            .open()
            .map_err(|e| TransportError::Open {
                source_name: format!("serial {}", port_name),
                reason: e.to_string(),
            })?;
        info!("Serial port opened. Reading lines...");
        Ok(Self {
            port_name: port_name.to_string(),
            port: Some(port),
            assembler: LineAssembler::new(),
            buf: [0u8; 256],
        })
    }
}

impl SampleSource for SerialSource {
    fn describe(&self) -> String {
        format!("serial {}", self.port_name)
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(line) = self.assembler.next_line() {
                return line
                    .map(Some)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into());
            }

            let port = self.port.as_mut().ok_or(TransportError::Closed)?;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            port.set_timeout(remaining.min(POLL_SLICE))
                .map_err(|e| TransportError::Read(io::Error::other(e)))?;

            match port.read(&mut self.buf) {
                Ok(0) => continue,
                Ok(n) => self.assembler.push(&self.buf[..n]),
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {
                    if Instant::now() >= deadline {
                        return Ok(None);
                    }
                }
                Err(e) => return Err(TransportError::Read(e)),
            }
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("Closed serial port {}", self.port_name);
        }
    }
}
