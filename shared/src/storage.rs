//! Dataset storage rooted at a directory.
//!
//! Jobs read the previous revision of a dataset (the Star Wars catalog is
//! rebuilt on top of the committed one) and write the new revision in place.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::output::{write_json_atomic, JsonStyle, OutputError, OutputResult};

/// A directory of JSON datasets.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    /// Root directory, e.g. `Fictional Stars/catalogs`
    root_path: PathBuf,
}

impl DatasetStore {
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Path of dataset `name` (a file name relative to the root).
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root_path.join(name)
    }

    /// Load dataset `name`.
    ///
    /// Returns None if the file does not exist.
    /// Returns Some(Err) if the file exists but cannot be read or parsed.
    pub fn load_json<T: DeserializeOwned>(&self, name: &str) -> Option<OutputResult<T>> {
        let path = self.path_for(name);
        if !path.exists() {
            return None;
        }

        let loaded = std::fs::read_to_string(&path)
            .map_err(|source| OutputError::Io {
                path: path.clone(),
                source,
            })
            .and_then(|text| {
                serde_json::from_str(&text).map_err(|source| OutputError::Parse {
                    path: path.clone(),
                    source,
                })
            });
        Some(loaded)
    }

    /// Save dataset `name` atomically and return where it landed.
    pub fn save_json<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
        style: JsonStyle,
    ) -> OutputResult<PathBuf> {
        let path = self.path_for(name);
        write_json_atomic(&path, value, style)?;
        Ok(path)
    }

    /// File names in the root with the given extension, sorted.
    pub fn list(&self, extension: &str) -> OutputResult<Vec<String>> {
        if !self.root_path.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.root_path).map_err(|source| OutputError::Io {
            path: self.root_path.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| OutputError::Io {
                path: self.root_path.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some(extension) {
                if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
