use emg_gesture::action_sink::{ActionSink, CommandSink, LogSink};
use emg_gesture::console_display::ConsoleDisplay;
use emg_gesture::control::{parse_command, Command, ControlSurface, HELP};
use emg_gesture::controller::Controller;
use emg_gesture::data_logger::DataLogger;
use emg_gesture::presets::PresetStore;
use emg_gesture::settings::Settings;
use emg_gesture::source::SourceConfig;
use emg_gesture::types::*;

use clap::Parser;
use crossbeam_channel::bounded;
use log::{error, info, warn};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

#[derive(Parser)]
#[command(name = "emg-gesture")]
#[command(about = "Two-channel EMG gesture control: envelope, classify, debounce, press keys")]
struct Cli {
    /// Use the built-in signal simulator instead of the serial port
    #[arg(long)]
    simulate: bool,

    /// Replay a recorded tab-separated capture instead of reading the sensor
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Samples per second for the simulator / replay (0 = replay as fast as possible)
    #[arg(long, default_value_t = 200)]
    rate: u32,

    /// Serial port of the EMG board (e.g., /dev/ttyACM0, COM3)
    #[arg(long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// Settings file (JSON); missing file means defaults
    #[arg(long, default_value = "emg-gesture.json")]
    config: PathBuf,

    /// Preset file (JSON, {"presets": [...]})
    #[arg(long)]
    presets: Option<PathBuf>,

    /// Select a saved preset's bindings at startup
    #[arg(long)]
    preset: Option<String>,

    /// Action for gesture 1 (quick channel-1 flex)
    #[arg(long)]
    action1: Option<String>,

    /// Action for gesture 2 (channel 2 alone)
    #[arg(long)]
    action2: Option<String>,

    /// Action for gesture 3 (both channels)
    #[arg(long)]
    action3: Option<String>,

    /// External key injector; the action id is appended (e.g., "xdotool key")
    #[arg(long)]
    key_command: Option<String>,

    /// Enable data logging
    #[arg(long)]
    log_data: bool,

    /// Output directory for logged sessions
    #[arg(long, default_value = "./sessions")]
    output_dir: PathBuf,

    /// Print observation records to the terminal
    #[arg(long)]
    console: bool,

    /// Maximum observation lines per second on the console (0 = every sample)
    #[arg(long, default_value_t = 20)]
    display_hz: u32,

    /// Start the sample loop immediately
    #[arg(long)]
    autostart: bool,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let cli = Cli::parse();

    let mut settings = Settings::load_or_default(&cli.config);
    if let Some(port) = &cli.port {
        settings.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        settings.baud_rate = baud;
    }
    if let Some(path) = &cli.presets {
        settings.presets_file = path.clone();
    }

    let store = PresetStore::new(settings.presets_file.clone());
    let mut selection = settings.bindings.clone();
    if let Some(name) = &cli.preset {
        match store.get(name) {
            Some(p) => selection = p.bindings,
            None => warn!("No preset named {:?} in {:?}", name, store.path()),
        }
    }
    if let Some(a) = &cli.action1 {
        selection.action1 = a.clone();
    }
    if let Some(a) = &cli.action2 {
        selection.action2 = a.clone();
    }
    if let Some(a) = &cli.action3 {
        selection.action3 = a.clone();
    }

    let source = pick_source(&cli, &settings);

    info!("═══════════════════════════════════════════════");
    info!("  EMG GESTURE v{}", env!("CARGO_PKG_VERSION"));
    info!("  Source: {:?}", source);
    info!("  Bindings: {}", selection);
    info!("  Window: {} samples, cooldown {:.2}s", settings.window_len, settings.cooldown_secs);
    if cli.console { info!("  UI: console records"); }
    if cli.log_data { info!("  Logging to {:?}", cli.output_dir); }
    info!("═══════════════════════════════════════════════");

    // Channels: sample loop → consumers
    let mut event_txs: Vec<crossbeam_channel::Sender<PipelineEvent>> = Vec::new();
    let mut handles = Vec::new();

    // ─── Console display ────────────────────────────────────────────
    if cli.console {
        let (tx, rx) = bounded::<PipelineEvent>(1024);
        event_txs.push(tx);
        let hz = cli.display_hz;
        handles.push(thread::Builder::new().name("display".into()).spawn(move || {
            ConsoleDisplay::new(rx, hz).run();
        }).unwrap());
    }

    // ─── Data logger ────────────────────────────────────────────────
    if cli.log_data {
        let (tx, rx) = bounded::<PipelineEvent>(4096);
        match DataLogger::new(rx, &cli.output_dir, &settings) {
            Ok(logger) => {
                event_txs.push(tx);
                handles.push(thread::Builder::new().name("logger".into()).spawn(move || {
                    if let Err(e) = logger.run() {
                        error!("Data logger failed: {}", e);
                    }
                }).unwrap());
            }
            Err(e) => error!("Cannot create session directory in {:?}: {}", cli.output_dir, e),
        }
    }

    // ─── Action sink ────────────────────────────────────────────────
    let sink: Arc<dyn ActionSink> = match cli.key_command.as_deref().and_then(CommandSink::from_command_line) {
        Some(cmd) => Arc::new(cmd),
        None => Arc::new(LogSink),
    };

    let controller = Controller::new(Box::new(source), sink, event_txs, settings.loop_settings());
    let mut surface = ControlSurface::new(controller, store, selection);

    if cli.autostart {
        println!("{}", surface.execute(Command::Start(None)));
    } else {
        println!("{}", HELP);
    }

    // ─── Control surface on the main thread ─────────────────────────
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("stdin: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(cmd) => println!("{}", surface.execute(cmd)),
            Err(e) => println!("{}", e),
        }
    }

    println!("{}", surface.execute(Command::Quit));

    // Dropping the controller drops the last event senders, which ends the consumers.
    drop(surface);
    for h in handles {
        let _ = h.join();
    }
}

fn pick_source(cli: &Cli, settings: &Settings) -> SourceConfig {
    if let Some(path) = &cli.replay {
        return SourceConfig::Replay { path: path.clone(), rate_hz: cli.rate };
    }
    if cli.simulate {
        return SourceConfig::Simulator { rate_hz: cli.rate.max(1) };
    }
    if cfg!(feature = "hardware") {
        SourceConfig::Serial { port: settings.port.clone(), baud_rate: settings.baud_rate }
    } else {
        error!("Hardware mode requires 'hardware' feature. Falling back to simulator.");
        SourceConfig::Simulator { rate_hz: cli.rate.max(1) }
    }
}
