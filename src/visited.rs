use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

const STORE_FILE: &str = "visited.json";

/// Identifiers of pages opened so far, persisted as a JSON array. Reads and
/// writes never fail the caller: errors are logged and the set keeps living in
/// memory.
#[derive(Debug, Default)]
pub struct VisitedStore {
    path: Option<PathBuf>,
    visited: BTreeSet<String>,
}

impl VisitedStore {
    pub fn default_path() -> Option<PathBuf> {
        let mut dir = dirs::data_dir()?;
        dir.push("linkweb");
        dir.push(STORE_FILE);
        Some(dir)
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn open(path: Option<PathBuf>) -> Self {
        let visited = match path.as_deref() {
            Some(path) => read_set(path).unwrap_or_else(|error| {
                warn!(error = format!("{error:#}"), "visited pages unavailable, starting empty");
                BTreeSet::new()
            }),
            None => BTreeSet::new(),
        };

        Self { path, visited }
    }

    pub fn get(&self) -> &BTreeSet<String> {
        &self.visited
    }

    pub fn contains(&self, id: &str) -> bool {
        self.visited.contains(id)
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn add(&mut self, id: &str) {
        if !self.visited.insert(id.to_owned()) {
            return;
        }

        if let Some(path) = &self.path
            && let Err(error) = write_set(path, &self.visited)
        {
            warn!(error = format!("{error:#}"), "failed to persist visited pages");
        }
    }
}

fn read_set(path: &Path) -> Result<BTreeSet<String>> {
    if !path.exists() {
        return Ok(BTreeSet::new());
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(BTreeSet::new());
    }

    let ids: Vec<String> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of strings", path.display()))?;
    debug!(path = %path.display(), count = ids.len(), "loaded visited pages");
    Ok(ids.into_iter().collect())
}

fn write_set(path: &Path, visited: &BTreeSet<String>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let encoded = serde_json::to_string(visited).context("failed to encode visited pages")?;
    std::fs::write(path, encoded).with_context(|| format!("failed to write {}", path.display()))
}
