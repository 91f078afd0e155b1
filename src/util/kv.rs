//! Line-oriented `key = value` configuration files.
//!
//! Used for `sympi.conf` (shared settings such as `slurm_enabled`) and the
//! per-implementation files in the etc directory that map a version to its
//! download URL. Blank lines and `#` comments are ignored; order is kept.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// An ordered key-value store, optionally backed by a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvStore {
    path: Option<PathBuf>,
    entries: Vec<KeyValue>,
}

impl KvStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        KvStore::default()
    }

    /// Parse `key = value` lines.
    pub fn parse(contents: &str) -> Self {
        let entries = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                let (key, value) = line.split_once('=')?;
                Some(KeyValue {
                    key: key.trim().to_string(),
                    value: value.trim().to_string(),
                })
            })
            .collect();

        KvStore {
            path: None,
            entries,
        }
    }

    /// Load a store from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::not_found("configuration file", path.display().to_string()),
            _ => Error::io(path, e),
        })?;
        let mut store = Self::parse(&contents);
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    /// Load a store, starting empty if the file does not exist yet.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(KvStore {
                path: Some(path.to_path_buf()),
                entries: Vec::new(),
            })
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    /// Boolean value of `key`; `None` if unset or not a boolean.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)?.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }

    /// Update `key` in place, or append it.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.value = value,
            None => self.entries.push(KeyValue { key, value }),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{} = {}\n", e.key, e.value))
            .collect()
    }

    /// Write the store back to its file.
    pub fn save(&self) -> Result<()> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| Error::config("key-value store has no backing file"))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::write(path, self.render()).map_err(|e| Error::io(path, e))
    }
}
