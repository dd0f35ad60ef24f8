//! The JSON state file every CLI command round-trips through.
//!
//! Holds a full store snapshot plus the retained change journal, written
//! pretty-printed so a state file stays diffable and inspectable.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use adgate_engine::events::ChangeRecord;
use adgate_engine::store::memory::StoreSnapshot;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StateFile {
    pub snapshot: StoreSnapshot,
    /// Journal records, oldest first.
    #[serde(default)]
    pub journal: Vec<ChangeRecord>,
}

pub fn load(path: &Path) -> Result<StateFile> {
    if !path.exists() {
        bail!(
            "state file {} not found (run `adgate init --scenario <file>` first)",
            path.display()
        );
    }
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn save(path: &Path, state: &StateFile) -> Result<()> {
    let json = serde_json::to_string_pretty(state)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
