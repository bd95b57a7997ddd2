//! Text command surface: the terminal stand-in for the start/stop buttons,
//! the three action dropdowns and the preset sidebar.

use crate::controller::{Controller, Status};
use crate::presets::PresetStore;
use crate::types::ActionBindings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start with the given bindings, or the current selection.
    Start(Option<ActionBindings>),
    Stop,
    Status,
    Bind(ActionBindings),
    Presets,
    Load(String),
    Save(String),
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  start [a1 a2 a3]   start the sample loop (optionally rebinding first)
  stop               stop the sample loop
  status             show running state and current bindings
  bind a1 a2 a3      select actions (use commas for names with spaces: bind page up, page down, f5)
  presets            list saved presets
  load <name>        select the bindings of a saved preset
  save <name>        save the current bindings as a preset
  quit               stop and exit";

/// Split binding arguments: comma-separated if any comma is present, else whitespace.
fn parse_bindings(args: &str) -> Result<ActionBindings, String> {
    let parts: Vec<&str> = if args.contains(',') {
        args.split(',').map(str::trim).collect()
    } else {
        args.split_whitespace().collect()
    };
    match parts.as_slice() {
        [a, b, c] if !a.is_empty() && !b.is_empty() && !c.is_empty() => {
            Ok(ActionBindings::new(*a, *b, *c))
        }
        _ => Err(format!("expected 3 actions, got {:?}", args)),
    }
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    match word.to_ascii_lowercase().as_str() {
        "start" if rest.is_empty() => Ok(Command::Start(None)),
        "start" => parse_bindings(rest).map(|b| Command::Start(Some(b))),
        "stop" => Ok(Command::Stop),
        "status" => Ok(Command::Status),
        "bind" => parse_bindings(rest).map(Command::Bind),
        "presets" | "list" => Ok(Command::Presets),
        "load" if !rest.is_empty() => Ok(Command::Load(rest.to_string())),
        "save" if !rest.is_empty() => Ok(Command::Save(rest.to_string())),
        "load" | "save" => Err(format!("{} needs a preset name", word)),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        "" => Err("empty command".into()),
        other => Err(format!("unknown command {:?} (try 'help')", other)),
    }
}

/// Holds the current selection and forwards commands to the controller and preset store.
pub struct ControlSurface {
    controller: Controller,
    presets: PresetStore,
    selection: ActionBindings,
}

impl ControlSurface {
    pub fn new(controller: Controller, presets: PresetStore, selection: ActionBindings) -> Self {
        Self {
            controller,
            presets,
            selection,
        }
    }

    pub fn selection(&self) -> &ActionBindings {
        &self.selection
    }

    /// Run one command and return the text to show the user.
    pub fn execute(&mut self, command: Command) -> String {
        match command {
            Command::Start(bindings) => {
                if let Some(b) = bindings {
                    self.selection = b;
                }
                match self.controller.start(self.selection.clone()) {
                    Status::Started(b) => format!("started with keys: {}", b),
                    Status::ErrorOpeningSource(reason) => format!("error opening source ({})", reason),
                    other => other.to_string(),
                }
            }
            Command::Stop => self.controller.stop().to_string(),
            Command::Status => format!(
                "{}; selected {}",
                if self.controller.is_running() { "running" } else { "stopped" },
                self.selection
            ),
            Command::Bind(b) => {
                self.selection = b;
                self.selection_reply()
            }
            Command::Presets => {
                let presets = self.presets.list();
                if presets.is_empty() {
                    "no presets saved".to_string()
                } else {
                    presets
                        .iter()
                        .map(|p| format!("{}: {}", p.name, p.bindings))
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            Command::Load(name) => match self.presets.get(&name) {
                Some(p) => {
                    self.selection = p.bindings;
                    self.selection_reply()
                }
                None => format!("no preset named {:?}", name),
            },
            Command::Save(name) => match self.presets.upsert(&name, self.selection.clone()) {
                Ok(list) => format!("saved preset {:?} ({} presets)", name, list.len()),
                Err(e) => format!("error saving preset: {}", e),
            },
            Command::Help => HELP.to_string(),
            Command::Quit => self.controller.stop().to_string(),
        }
    }

    fn selection_reply(&self) -> String {
        if self.controller.is_running() {
            format!("selected {} (stop and start to apply)", self.selection)
        } else {
            format!("selected {}", self.selection)
        }
    }
}
