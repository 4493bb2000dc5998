//! Core data model shared across the parsing, classification, and sync stages

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single playlist entry as produced by the parser.
///
/// Carries no identity beyond the current run; classification derives
/// everything else from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    /// Raw title text following the attribute block
    pub title: String,
    /// `key="value"` attributes from the EXTINF line, keys unique
    pub attributes: HashMap<String, String>,
    /// Stream URL from the line following the EXTINF declaration
    pub url: String,
}

impl PlaylistEntry {
    /// Category label, falling back to `Ungrouped` when the attribute is
    /// missing or empty.
    pub fn group(&self) -> &str {
        self.attributes
            .get("group-title")
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or("Ungrouped")
    }

    /// Display name, preferring the explicit `tvg-name` attribute over the
    /// raw title.
    pub fn display_name(&self) -> &str {
        self.attributes
            .get("tvg-name")
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.title)
    }
}

/// Content kind, serialized with the manifest's historical labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[serde(rename = "livetv")]
    LiveChannel,
    Movie,
    #[serde(rename = "series")]
    Episode,
}

/// A classified playlist entry, carrying only the fields relevant to its
/// kind. Derived deterministically from a [`PlaylistEntry`] and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedItem {
    LiveChannel {
        group: String,
        name: String,
        url: String,
    },
    Movie {
        group: String,
        name: String,
        url: String,
    },
    Episode {
        group: String,
        name: String,
        url: String,
        show: String,
        season: u32,
        episode: u32,
        episode_title: Option<String>,
    },
}

impl ClassifiedItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            ClassifiedItem::LiveChannel { .. } => ItemKind::LiveChannel,
            ClassifiedItem::Movie { .. } => ItemKind::Movie,
            ClassifiedItem::Episode { .. } => ItemKind::Episode,
        }
    }

    pub fn group(&self) -> &str {
        match self {
            ClassifiedItem::LiveChannel { group, .. }
            | ClassifiedItem::Movie { group, .. }
            | ClassifiedItem::Episode { group, .. } => group,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ClassifiedItem::LiveChannel { name, .. }
            | ClassifiedItem::Movie { name, .. }
            | ClassifiedItem::Episode { name, .. } => name,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            ClassifiedItem::LiveChannel { url, .. }
            | ClassifiedItem::Movie { url, .. }
            | ClassifiedItem::Episode { url, .. } => url,
        }
    }
}

/// Aggregate counters returned to the invoker after a sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Pointer files written at paths unknown to the previous manifest
    pub created: u64,
    /// Pointer files rewritten at paths the previous manifest tracked
    pub updated: u64,
    /// Entries rejected by the allowlist
    pub skipped: u64,
    /// Pointer files removed because they dropped out of the playlist
    pub deleted: u64,
    /// Sidecar and artwork files removed alongside deleted pointers
    pub sidecars_deleted: u64,
}
