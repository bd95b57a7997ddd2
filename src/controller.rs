//! Start/stop state machine around the sample loop.
//!
//! `Stopped → Running` opens the source and spawns the loop thread;
//! `Running → Stopped` raises the cancel flag and joins the thread.
//! Both transitions happen under one mutex, so two concurrent starts can
//! never race on the same source.

use crate::action_sink::ActionSink;
use crate::coordinator::Pipeline;
use crate::error::TransportError;
use crate::source::{parse_sample, SampleSource, SourceConfig};
use crate::types::*;
use chrono::Local;
use crossbeam_channel::{Sender, TrySendError};
use log::{debug, error, info, trace, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Reply to a control request, rendered as the status strings the UI shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Started(ActionBindings),
    AlreadyRunning,
    Stopped,
    AlreadyStopped,
    ErrorOpeningSource(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Started(_) => write!(f, "started"),
            Status::AlreadyRunning => write!(f, "already running"),
            Status::Stopped => write!(f, "stopped"),
            Status::AlreadyStopped => write!(f, "already stopped"),
            Status::ErrorOpeningSource(_) => write!(f, "error opening source"),
        }
    }
}

/// Tunables for one run of the loop.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub window_len: usize,
    pub cooldown_secs: f64,
    /// Bound on a single blocking read; also bounds how long a stop can take.
    pub read_timeout: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            window_len: crate::envelope::WINDOW_LEN,
            cooldown_secs: crate::debounce::COOLDOWN_SECS,
            read_timeout: Duration::from_millis(1000),
        }
    }
}

/// Anything that can hand the controller a freshly opened source.
pub trait SourceFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn SampleSource>, TransportError>;
    fn describe(&self) -> String;
}

impl SourceFactory for SourceConfig {
    fn open(&self) -> Result<Box<dyn SampleSource>, TransportError> {
        SourceConfig::open(self)
    }

    fn describe(&self) -> String {
        format!("{:?}", self)
    }
}

struct RunningLoop {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<LoopStats>,
}

/// Counters reported when a run ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub fired: u64,
    pub malformed: u64,
    pub read_errors: u64,
    pub timeouts: u64,
}

pub struct Controller {
    factory: Box<dyn SourceFactory>,
    sink: Arc<dyn ActionSink>,
    event_txs: Vec<Sender<PipelineEvent>>,
    settings: LoopSettings,
    running: Mutex<Option<RunningLoop>>,
    last_stats: Mutex<Option<LoopStats>>,
}

impl Controller {
    pub fn new(
        factory: Box<dyn SourceFactory>,
        sink: Arc<dyn ActionSink>,
        event_txs: Vec<Sender<PipelineEvent>>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            factory,
            sink,
            event_txs,
            settings,
            running: Mutex::new(None),
            last_stats: Mutex::new(None),
        }
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<RunningLoop>> {
        // A panicked loop thread never holds this lock, so poisoning only
        // means a control call panicked; the Option is still consistent.
        self.running.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.lock_running().is_some()
    }

    /// Counters from the most recently stopped run.
    pub fn last_stats(&self) -> Option<LoopStats> {
        *self.last_stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Open the source and spawn the loop with a snapshot of `bindings`.
    pub fn start(&self, bindings: ActionBindings) -> Status {
        let mut running = self.lock_running();
        if running.is_some() {
            info!("Start requested but the loop is already running");
            return Status::AlreadyRunning;
        }

        let source = match self.factory.open() {
            Ok(s) => s,
            Err(e) => {
                error!("Error opening source {}: {}", self.factory.describe(), e);
                return Status::ErrorOpeningSource(e.to_string());
            }
        };

        info!("Sample loop starting on {} with {}", source.describe(), bindings);
        let cancel = Arc::new(AtomicBool::new(false));
        let sample_loop = SampleLoop {
            source,
            pipeline: Pipeline::new(
                self.settings.window_len,
                self.settings.cooldown_secs,
                bindings.clone(),
            ),
            sink: Arc::clone(&self.sink),
            event_txs: self.event_txs.clone(),
            cancel: Arc::clone(&cancel),
            read_timeout: self.settings.read_timeout,
            clock: SessionClock::new(),
            stats: LoopStats::default(),
        };

        let handle = match thread::Builder::new()
            .name("sample-loop".into())
            .spawn(move || sample_loop.run())
        {
            Ok(h) => h,
            Err(e) => {
                error!("Failed to spawn sample loop: {}", e);
                return Status::ErrorOpeningSource(e.to_string());
            }
        };

        *running = Some(RunningLoop { cancel, handle });
        Status::Started(bindings)
    }

    /// Signal the loop and wait for it to release the source.
    pub fn stop(&self) -> Status {
        let mut running = self.lock_running();
        let Some(active) = running.take() else {
            debug!("Stop requested but the loop is not running");
            return Status::AlreadyStopped;
        };

        active.cancel.store(true, Ordering::Release);
        match active.handle.join() {
            Ok(stats) => {
                info!(
                    "Sample loop stopped: {} ticks, {} fired, {} malformed, {} read errors",
                    stats.ticks, stats.fired, stats.malformed, stats.read_errors
                );
                *self.last_stats.lock().unwrap_or_else(|e| e.into_inner()) = Some(stats);
            }
            Err(_) => error!("Sample loop thread panicked"),
        }
        Status::Stopped
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Everything the loop thread owns for one run.
struct SampleLoop {
    source: Box<dyn SampleSource>,
    pipeline: Pipeline,
    sink: Arc<dyn ActionSink>,
    event_txs: Vec<Sender<PipelineEvent>>,
    cancel: Arc<AtomicBool>,
    read_timeout: Duration,
    clock: SessionClock,
    stats: LoopStats,
}

impl SampleLoop {
    fn run(mut self) -> LoopStats {
        while !self.cancel.load(Ordering::Acquire) {
            match self.source.read_line(self.read_timeout) {
                Ok(None) => self.stats.timeouts += 1,
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    self.handle_line(&line);
                }
                Err(e) => {
                    self.stats.read_errors += 1;
                    warn!("Serial read error: {}", e);
                    self.emit(PipelineEvent::Diagnostic(Diagnostic {
                        timestamp: Local::now(),
                        kind: DiagnosticKind::TransportRead,
                        message: e.to_string(),
                    }));
                    // Back off a little, but never past the stop deadline.
                    thread::sleep(self.read_timeout.min(Duration::from_millis(100)));
                }
            }
        }
        self.source.close();
        info!("Released {}", self.source.describe());
        self.stats
    }

    fn handle_line(&mut self, line: &str) {
        let sample = match parse_sample(line) {
            Ok(s) => s,
            Err(e) => {
                self.stats.malformed += 1;
                warn!("Malformed data received: {:?} ({})", line, e);
                self.emit(PipelineEvent::Diagnostic(Diagnostic {
                    timestamp: Local::now(),
                    kind: DiagnosticKind::MalformedSample,
                    message: e.to_string(),
                }));
                return;
            }
        };

        let tick = self.pipeline.process(sample, self.clock.now_secs());
        if let Some(action) = &tick.dispatch {
            self.stats.fired += 1;
            self.sink.fire(action);
        }

        self.stats.ticks += 1;
        if self.stats.ticks % 1000 == 0 {
            debug!("Sample loop: {} ticks, {} fired", self.stats.ticks, self.stats.fired);
        }
        trace!("{}", tick.record);
        self.emit(PipelineEvent::Observation(tick.record));
    }

    /// Never blocks: a slow consumer loses events rather than stalling the sensor.
    fn emit(&self, event: PipelineEvent) {
        for tx in &self.event_txs {
            match tx.try_send(event.clone()) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => {}
                Err(TrySendError::Full(_)) => trace!("Event consumer full, dropping event"),
            }
        }
    }
}
