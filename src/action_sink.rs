use crossbeam_channel::{unbounded, Sender, TrySendError};
use log::{debug, error, info, warn};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Where dispatched actions go. Fire-and-forget: the sample loop calls this
/// synchronously and must not be held up, so implementations never wait
/// on the outside world.
pub trait ActionSink: Send + Sync {
    fn fire(&self, action: &str);
}

/// Logs each action. Default when no injector is configured.
pub struct LogSink;

impl ActionSink for LogSink {
    fn fire(&self, action: &str) {
        info!("▶ action: {}", action);
    }
}

/// Runs an external key injector with the action id appended,
/// e.g. `xdotool key` → `xdotool key space`.
///
/// `fire` never waits on the child; spawned children are handed to a
/// reaper thread that collects their exit status.
pub struct CommandSink {
    program: String,
    args: Vec<String>,
    reaper_tx: Sender<Child>,
    reaped: Arc<AtomicUsize>,
}

impl CommandSink {
    /// Parse a whitespace-separated command line. `None` if it is empty
    /// or the reaper thread cannot be started.
    pub fn from_command_line(cmd: &str) -> Option<Self> {
        let mut parts = cmd.split_whitespace().map(str::to_string);
        let program = parts.next()?;

        let (reaper_tx, reaper_rx) = unbounded::<Child>();
        let reaped = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reaped);
        let spawned = thread::Builder::new()
            .name("action-reaper".into())
            .spawn(move || {
                // Ends once the sink (the only sender) is dropped.
                for mut child in reaper_rx.iter() {
                    match child.wait() {
                        Ok(status) if !status.success() => debug!("Action command exited with {}", status),
                        Ok(_) => {}
                        Err(e) => warn!("Failed to reap action command: {}", e),
                    }
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            });
        if let Err(e) = spawned {
            error!("Failed to start action reaper thread: {}", e);
            return None;
        }

        Some(Self {
            program,
            args: parts.collect(),
            reaper_tx,
            reaped,
        })
    }

    /// Number of spawned commands whose exit status has been collected.
    pub fn reaped(&self) -> usize {
        self.reaped.load(Ordering::Relaxed)
    }

    pub fn command_for(&self, action: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(action)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

impl ActionSink for CommandSink {
    fn fire(&self, action: &str) {
        match self.command_for(action).spawn() {
            Ok(child) => {
                info!("▶ action: {} (via {})", action, self.program);
                if let Err(e) = self.reaper_tx.send(child) {
                    // Reaper gone; poll once so a fast exit is still collected.
                    let mut child = e.into_inner();
                    let _ = child.try_wait();
                    warn!("Action reaper stopped; {} may be left unreaped", self.program);
                }
            }
            Err(e) => warn!("Failed to run {} for action {}: {}", self.program, action, e),
        }
    }
}

/// Forwards action ids over a channel. Drops them, with a warning, if the
/// receiver is full or gone.
pub struct ChannelSink {
    tx: Sender<String>,
}

impl ChannelSink {
    pub fn new(tx: Sender<String>) -> Self {
        Self { tx }
    }
}

impl ActionSink for ChannelSink {
    fn fire(&self, action: &str) {
        match self.tx.try_send(action.to_string()) {
            Ok(()) => {}
            Err(TrySendError::Full(a)) => warn!("Action channel full, dropping action {}", a),
            Err(TrySendError::Disconnected(a)) => debug!("Action channel closed, dropping action {}", a),
        }
    }
}
