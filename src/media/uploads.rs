use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

/// The uploads directory: a flat pool of files the database rows point at by
/// bare filename. Nothing here is enforced by the store, so reconciliation
/// goes through [`Uploads::scan`].
pub struct Uploads {
    root: PathBuf,
}

/// What a reconciliation pass found: files no row references, and referenced
/// filenames with no file behind them.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct UploadsReport {
    pub unreferenced: Vec<String>,
    pub missing: Vec<String>,
}

impl Uploads {
    pub fn new<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create uploads directory {root:?}"))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Copies a file into the pool under a sanitized name, appending `_1`,
    /// `_2`, ... while the name is taken. Returns the stored filename.
    pub fn store_file(&self, src: &Path) -> Result<String> {
        let original = src
            .file_name()
            .ok_or_else(|| anyhow!("Source path {src:?} has no filename"))?
            .to_string_lossy();
        let filename = sanitize_filename(&original)
            .ok_or_else(|| anyhow!("Filename {original:?} is empty after sanitizing"))?;

        let (base, ext) = match filename.rsplit_once('.') {
            Some((base, ext)) if !base.is_empty() => (base.to_string(), format!(".{ext}")),
            _ => (filename.clone(), String::new()),
        };

        let mut candidate = filename;
        let mut counter = 1;
        while self.root.join(&candidate).exists() {
            candidate = format!("{base}_{counter}{ext}");
            counter += 1;
        }

        let dest = self.root.join(&candidate);
        fs::copy(src, &dest).with_context(|| format!("Failed to copy {src:?} to {dest:?}"))?;
        info!("Stored upload {:?} as {}", src, candidate);
        Ok(candidate)
    }

    /// Best-effort removal: a missing or stubborn file is logged and
    /// otherwise ignored, so row deletion never fails over disk state.
    pub fn remove_file(&self, name: &str) {
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return;
        }
        let path = self.root.join(name);
        if !path.exists() {
            return;
        }
        if let Err(err) = fs::remove_file(&path) {
            warn!("Failed to delete upload {:?}: {}", path, err);
        }
    }

    /// Walks the pool (hidden entries skipped) and reconciles it against the
    /// filenames the database references.
    pub fn scan(&self, referenced: &HashSet<String>) -> Result<UploadsReport> {
        let mut present = HashSet::new();
        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| !is_hidden(e))
        {
            let entry = entry?;
            if entry.file_type().is_file() {
                let name = entry
                    .path()
                    .strip_prefix(&self.root)
                    .unwrap_or(entry.path())
                    .to_string_lossy()
                    .to_string();
                present.insert(name);
            }
        }

        let mut unreferenced: Vec<String> = present.difference(referenced).cloned().collect();
        let mut missing: Vec<String> = referenced.difference(&present).cloned().collect();
        unreferenced.sort();
        missing.sort();
        Ok(UploadsReport { unreferenced, missing })
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn sanitize_filename(name: &str) -> Option<String> {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
