use crate::settings::Settings;
use crate::types::*;
use crossbeam_channel::Receiver;
use log::{error, info};
use serde_json::json;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes one session directory per run of the binary:
/// `manifest.json`, `observations.jsonl` and, on shutdown, `stats.json`.
pub struct DataLogger {
    rx: Receiver<PipelineEvent>,
    session_dir: PathBuf,
}

/// Totals written to `stats.json`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogStats {
    pub observations: u64,
    pub fired: u64,
    pub diagnostics: u64,
}

impl DataLogger {
    pub fn new(rx: Receiver<PipelineEvent>, output_dir: &Path, settings: &Settings) -> io::Result<Self> {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let session_dir = output_dir.join(format!("session_{}", stamp));
        fs::create_dir_all(&session_dir)?;

        let logger = Self { rx, session_dir };
        logger.write_manifest(settings)?;
        Ok(logger)
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Run the logger until every sender is dropped. Blocks the calling thread.
    pub fn run(&self) -> io::Result<LogStats> {
        info!("Data logger → {:?}", self.session_dir);

        let obs_path = self.session_dir.join("observations.jsonl");
        let mut writer = BufWriter::new(File::create(&obs_path)?);
        let mut stats = LogStats::default();

        for event in self.rx.iter() {
            match event {
                PipelineEvent::Observation(rec) => {
                    let line = serde_json::to_string(&rec).map_err(io::Error::other)?;
                    writeln!(writer, "{}", line)?;
                    stats.observations += 1;
                    if rec.fired {
                        stats.fired += 1;
                    }
                    if stats.observations % 1000 == 0 {
                        writer.flush()?;
                        info!("Logged {} observations", stats.observations);
                    }
                }
                PipelineEvent::Diagnostic(diag) => {
                    stats.diagnostics += 1;
                    let line = serde_json::to_string(&json!({ "diagnostic": diag }))
                        .map_err(io::Error::other)?;
                    writeln!(writer, "{}", line)?;
                }
            }
        }
        writer.flush()?;

        let stats_json = json!({
            "total_observations": stats.observations,
            "total_fired": stats.fired,
            "total_diagnostics": stats.diagnostics,
        });
        let stats_path = self.session_dir.join("stats.json");
        fs::write(&stats_path, serde_json::to_string_pretty(&stats_json).map_err(io::Error::other)?)
            .unwrap_or_else(|e| error!("Failed to write stats: {}", e));

        info!(
            "Session saved: {} observations, {} fired → {:?}",
            stats.observations, stats.fired, self.session_dir
        );
        Ok(stats)
    }

    fn write_manifest(&self, settings: &Settings) -> io::Result<()> {
        let manifest = json!({
            "version": env!("CARGO_PKG_VERSION"),
            "system": "emg-gesture",
            "started_at": chrono::Local::now().to_rfc3339(),
            "settings": settings,
            "thresholds": {
                "raw1_flex": crate::classifier::RAW1_FLEX,
                "env2_quiet": crate::classifier::ENV2_QUIET,
                "env2_active": crate::classifier::ENV2_ACTIVE,
                "env1_split": crate::classifier::ENV1_SPLIT,
            },
        });
        let path = self.session_dir.join("manifest.json");
        fs::write(&path, serde_json::to_string_pretty(&manifest).map_err(io::Error::other)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use crossbeam_channel::unbounded;

    fn record(outcome: Outcome, fired: bool) -> ObservationRecord {
        ObservationRecord {
            timestamp: Local::now(),
            raw1: 1,
            raw2: 2,
            envelope1: 0.5,
            envelope2: 0.25,
            outcome,
            fired,
        }
    }

    #[test]
    fn test_session_files_written() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = unbounded();
        let logger = DataLogger::new(rx, dir.path(), &Settings::default()).unwrap();
        let session = logger.session_dir().to_path_buf();
        assert!(session.join("manifest.json").exists());

        tx.send(PipelineEvent::Observation(record(Outcome::Action1, true))).unwrap();
        tx.send(PipelineEvent::Observation(record(Outcome::Action1, false))).unwrap();
        tx.send(PipelineEvent::Diagnostic(Diagnostic {
            timestamp: Local::now(),
            kind: DiagnosticKind::MalformedSample,
            message: "expected 2 fields, got 3".into(),
        }))
        .unwrap();
        drop(tx);

        let stats = logger.run().unwrap();
        assert_eq!(stats, LogStats { observations: 2, fired: 1, diagnostics: 1 });

        let lines = fs::read_to_string(session.join("observations.jsonl")).unwrap();
        let parsed: Vec<serde_json::Value> =
            lines.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0]["outcome"], "Action1");
        assert_eq!(parsed[0]["fired"], true);
        assert_eq!(parsed[2]["diagnostic"]["kind"], "MalformedSample");

        let stats: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(session.join("stats.json")).unwrap()).unwrap();
        assert_eq!(stats["total_observations"], 2);
    }

    #[test]
    fn test_observation_lines_parse_back() {
        let rec = record(Outcome::Action3, true);
        let line = serde_json::to_string(&rec).unwrap();
        let back: ObservationRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(back.outcome, Outcome::Action3);
        assert_eq!(back.raw2, 2);
    }
}
