use anyhow::{Context, Result, bail};
use broadlink_lib::LearnedSignal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Learned signals stored by name in a JSON file.
///
/// The file is an object mapping each name to the base64 of the signal
/// bytes, e.g. `{"tv_power": "JgBGAJQPFA0T..."}`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
struct Entries(BTreeMap<String, String>);

#[derive(Debug)]
pub struct CommandLibrary {
    path: PathBuf,
    entries: Entries,
}

impl CommandLibrary {
    /// Load the library at `path`, creating an empty one if the file is missing.
    pub fn open(path: &Path) -> Result<Self> {
        let entries = if path.exists() {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read command library {:?}", path))?;
            if json.trim().is_empty() {
                Entries::default()
            } else {
                serde_json::from_str(&json)
                    .with_context(|| format!("Command library {:?} is not a JSON object of strings", path))?
            }
        } else {
            info!("Creating command library at {:?}", path);
            let library = Self {
                path: path.to_path_buf(),
                entries: Entries::default(),
            };
            library.save()?;
            return Ok(library);
        };

        debug!(entries = entries.0.len(), "Loaded command library {:?}", path);
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json + "\n")
            .with_context(|| format!("Failed to write command library {:?}", self.path))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.0.contains_key(name)
    }

    /// Store `signal` under `name`. Existing names are only replaced with `overwrite`.
    pub fn insert(&mut self, name: &str, signal: &LearnedSignal, overwrite: bool) -> Result<()> {
        if self.contains(name) && !overwrite {
            bail!("Command '{name}' already exists");
        }
        self.entries.0.insert(name.to_string(), signal.to_base64()?);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<LearnedSignal> {
        let encoded = self
            .entries
            .0
            .get(name)
            .with_context(|| format!("Unknown command '{name}'"))?;
        LearnedSignal::from_base64(encoded).with_context(|| format!("Stored command '{name}' is corrupt"))
    }

    /// Names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.0.is_empty()
    }
}
