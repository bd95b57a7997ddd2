pub mod action_sink;
pub mod classifier;
pub mod console_display;
pub mod control;
pub mod controller;
pub mod coordinator;
pub mod data_logger;
pub mod debounce;
pub mod envelope;
pub mod error;
pub mod presets;
pub mod replay;
pub mod settings;
pub mod simulator;
pub mod source;
pub mod types;

#[cfg(feature = "hardware")]
pub mod serial_reader;
