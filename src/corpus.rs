//! In-memory corpus of extracted material text.
//!
//! Append-only for the life of the process: no eviction, no size cap,
//! no deduplication. Appends are serialised by a single write lock.

use crate::files::{self, DocumentFormat};
use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Extracted text of one reading material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialRecord {
    /// Original upload name, or the stored name for startup-scanned files.
    pub label: String,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct CorpusStore {
    records: RwLock<Vec<MaterialRecord>>,
}

impl CorpusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, label: impl Into<String>, text: impl Into<String>) {
        self.records.write().push(MaterialRecord {
            label: label.into(),
            text: text.into(),
        });
    }

    /// Copy of all records in insertion order.
    pub fn snapshot(&self) -> Vec<MaterialRecord> {
        self.records.read().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.records.read().iter().map(|r| r.label.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Startup scan: extract every material in `dir` in filename order.
    ///
    /// Unsupported, unreadable and empty files are logged and skipped.
    /// Blocking; call from `spawn_blocking` inside the runtime.
    pub fn load_directory(&self, dir: &Path) -> Result<usize> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read materials dir {}", dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            let label = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if DocumentFormat::from_path(&path).is_err() {
                tracing::debug!(file = %label, "Skipping non-material file");
                continue;
            }
            let ext = files::extension_of(&label).unwrap_or_default();
            match files::extract::extract(&path, &ext) {
                Ok(text) if !text.is_empty() => {
                    self.append(label, text);
                    loaded += 1;
                }
                Ok(_) => tracing::debug!(file = %label, "Skipping empty material"),
                Err(e) => tracing::warn!(file = %label, error = %e, "Failed to load material"),
            }
        }
        Ok(loaded)
    }
}
