//! Named action-binding presets, stored as `{"presets": [...]}` JSON.

use crate::error::PresetError;
use crate::types::ActionBindings;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(flatten)]
    pub bindings: ActionBindings,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PresetFile {
    #[serde(default)]
    presets: Vec<Preset>,
}

pub struct PresetStore {
    path: PathBuf,
}

impl PresetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All presets in file order. A missing file is an empty store;
    /// an unreadable or malformed one is logged and treated as empty.
    pub fn list(&self) -> Vec<Preset> {
        if !self.path.exists() {
            return Vec::new();
        }
        match self.read() {
            Ok(presets) => presets,
            Err(e) => {
                warn!("Error loading presets from {:?}: {}", self.path, e);
                Vec::new()
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Preset> {
        self.list().into_iter().find(|p| p.name == name)
    }

    /// Update the preset called `name` in place, or append it. Returns the new list.
    pub fn upsert(&self, name: &str, bindings: ActionBindings) -> Result<Vec<Preset>, PresetError> {
        let mut presets = self.list();
        match presets.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.bindings = bindings,
            None => presets.push(Preset {
                name: name.to_string(),
                bindings,
            }),
        }
        self.write(&presets)?;
        info!("Saved preset {:?} to {:?}", name, self.path);
        Ok(presets)
    }

    fn read(&self) -> Result<Vec<Preset>, PresetError> {
        let data = std::fs::read_to_string(&self.path)?;
        let file: PresetFile = serde_json::from_str(&data)?;
        Ok(file.presets)
    }

    fn write(&self, presets: &[Preset]) -> Result<(), PresetError> {
        let file = PresetFile {
            presets: presets.to_vec(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> PresetStore {
        PresetStore::new(dir.path().join("presets.json"))
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.list().is_empty());
        assert!(store.get("game").is_none());
    }

    #[test]
    fn test_upsert_appends_then_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.upsert("slides", ActionBindings::new("space", "left", "right")).unwrap();
        store.upsert("game", ActionBindings::new("up", "a", "d")).unwrap();
        let list = store.upsert("slides", ActionBindings::new("enter", "page up", "page down")).unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "slides", "update keeps position");
        assert_eq!(list[0].bindings.action2, "page up");
        assert_eq!(store.get("game").unwrap().bindings.action1, "up");
    }

    #[test]
    fn test_file_format_matches_flat_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.upsert("p", ActionBindings::new("f1", "f2", "f3")).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        let entry = &raw["presets"][0];
        assert_eq!(entry["name"], "p");
        assert_eq!(entry["action1"], "f1");
        assert_eq!(entry["action3"], "f3");
    }

    #[test]
    fn test_reads_hand_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            r#"{"presets": [{"name": "x", "action1": "esc", "action2": "tab", "action3": "home"}]}"#,
        )
        .unwrap();
        let p = store.get("x").unwrap();
        assert_eq!(p.bindings, ActionBindings::new("esc", "tab", "home"));
    }

    #[test]
    fn test_malformed_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "not json").unwrap();
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_missing_presets_key_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "{}").unwrap();
        assert!(store.list().is_empty());
    }
}
