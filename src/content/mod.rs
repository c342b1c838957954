mod parse;
pub mod slug;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

pub use parse::ContentError;
use parse::parse_index_json;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContentEntry {
    pub title: Option<String>,
    pub links: Vec<String>,
    pub tags: Vec<String>,
}

/// Read-only link index: normalized identifier to title, outgoing links and
/// tag identifiers.
#[derive(Clone, Debug, Default)]
pub struct ContentIndex {
    entries: BTreeMap<String, ContentEntry>,
    backlinks: HashMap<String, Vec<String>>,
}

impl ContentIndex {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, ContentEntry)>,
    {
        let mut normalized = BTreeMap::new();
        for (key, entry) in entries {
            let id = slug::normalize(&key);
            let links = entry.links.iter().map(|link| slug::normalize(link)).collect();
            let tags = entry
                .tags
                .iter()
                .filter(|tag| !tag.trim().is_empty())
                .map(|tag| slug::tag_slug(tag))
                .collect();
            normalized.insert(
                id,
                ContentEntry {
                    title: entry.title,
                    links,
                    tags,
                },
            );
        }

        let mut backlinks: HashMap<String, Vec<String>> = HashMap::new();
        for (source, entry) in &normalized {
            for target in &entry.links {
                if target != source && normalized.contains_key(target) {
                    backlinks
                        .entry(target.clone())
                        .or_default()
                        .push(source.clone());
                }
            }
        }
        for sources in backlinks.values_mut() {
            sources.sort();
            sources.dedup();
        }

        Self {
            entries: normalized,
            backlinks,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ContentError> {
        let raw_entries = parse_index_json(raw)?;
        Ok(Self::from_entries(raw_entries.into_iter().map(|(key, raw)| {
            (
                key,
                ContentEntry {
                    title: raw.title,
                    links: raw.links,
                    tags: raw.tags,
                },
            )
        })))
    }

    /// A missing file is an empty index; unreadable or malformed files are errors.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "content index not found, continuing with an empty index");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read content index {}", path.display()))?;
        let index = Self::parse(&raw)
            .with_context(|| format!("failed to parse content index {}", path.display()))?;
        info!(path = %path.display(), pages = index.len(), "loaded content index");
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ContentEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ContentEntry)> {
        self.entries.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn title_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.entries
            .get(id)
            .and_then(|entry| entry.title.as_deref())
            .filter(|title| !title.is_empty())
            .unwrap_or(id)
    }

    pub fn backlinks(&self, id: &str) -> &[String] {
        self.backlinks.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Documents carrying the given tag identifier.
    pub fn tagged(&self, tag: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.tags.iter().any(|candidate| candidate == tag))
            .map(|(id, _)| id.as_str())
            .collect()
    }
}
