//! JSON file storage backend.
//!
//! The whole store is one JSON object keyed like the extension's local
//! storage (`savedSets`, `permittedDomains`). Every save rewrites the file
//! through a temporary sibling and a rename.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;
use serde_json::{Map, Value};

use pt_core::error::{Error, Result};
use pt_core::StorageBackend;

pub struct JsonFileBackend {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl JsonFileBackend {
    /// Open a store file. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Map::new(),
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(entries)) => entries,
                Ok(_) => {
                    return Err(Error::Storage(format!(
                        "'{}' does not contain a JSON object",
                        path.display()
                    )))
                }
                Err(e) => return Err(Error::Storage(format!("Failed to parse '{}': {}", path.display(), e))),
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Store {} does not exist yet", path.display());
                Map::new()
            }
            Err(e) => return Err(Error::Storage(format!("Failed to read '{}': {}", path.display(), e))),
        };

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("Failed to create '{}': {}", parent.display(), e)))?;
        }

        let text = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::Storage(format!("Failed to encode store: {}", e)))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, text).map_err(|e| Error::Storage(format!("Failed to write '{}': {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| Error::Storage(format!("Failed to replace '{}': {}", self.path.display(), e)))
    }
}

impl StorageBackend for JsonFileBackend {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    /// The in-memory copy only changes once the file has been replaced.
    fn save(&mut self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.clone();
        entries.insert(key.to_string(), value);
        self.write(&entries)?;
        self.entries = entries;
        Ok(())
    }
}
