//! Persistent run manifest
//!
//! The manifest is the only state carried between runs: a mapping from
//! stream-URL fingerprints to the entries materialized for them, written
//! fully at the end of every successful run. [`ManifestStore`] owns the
//! read-modify-write cycle; the invoker acquires a [`RunGuard`] (which also
//! takes an on-disk lock so overlapping runs fail fast) and commits the new
//! manifest through it.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::errors::{AppError, AppResult};
use crate::models::{ClassifiedItem, ItemKind};

/// State directory under the output root.
pub const STATE_DIR: &str = ".strm-sync";
/// Manifest file name inside the state directory.
pub const MANIFEST_FILE: &str = "manifest.json";
const LOCK_FILE: &str = "run.lock";

/// One materialized item, keyed in the manifest by its URL fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub kind: ItemKind,
    pub group: String,
    pub name: String,
    /// Absolute target path as a string, stable across runs
    pub path: String,
    pub url: String,
    pub show: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl ManifestEntry {
    /// Build the manifest record for an item materialized at `path`.
    pub fn for_item(item: &ClassifiedItem, path: String) -> Self {
        let (show, season, episode) = match item {
            ClassifiedItem::Episode {
                show,
                season,
                episode,
                ..
            } => (Some(show.clone()), Some(*season), Some(*episode)),
            _ => (None, None, None),
        };
        Self {
            kind: item.kind(),
            group: item.group().to_string(),
            name: item.name().to_string(),
            path,
            url: item.url().to_string(),
            show,
            season,
            episode,
        }
    }
}

/// The persisted cross-run state: fingerprint → entry plus a generation
/// timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub generated_at: i64,
    #[serde(default)]
    pub items: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Wrap freshly computed items with the current generation timestamp.
    pub fn now(items: BTreeMap<String, ManifestEntry>) -> Self {
        Self {
            generated_at: Utc::now().timestamp(),
            items,
        }
    }

    /// Set of target paths this manifest tracks.
    pub fn paths(&self) -> HashSet<String> {
        self.items.values().map(|entry| entry.path.clone()).collect()
    }
}

/// Handle on the state directory of one output root.
pub struct ManifestStore {
    state_dir: PathBuf,
}

impl ManifestStore {
    pub fn open(out_root: &Path) -> AppResult<Self> {
        let state_dir = out_root.join(STATE_DIR);
        fs::create_dir_all(&state_dir)?;
        Ok(Self { state_dir })
    }

    /// Acquire the run lock and load the previous manifest.
    ///
    /// A missing or unreadable manifest is treated as empty; a present lock
    /// file means another run is in flight and is a hard error.
    pub fn begin(&self) -> AppResult<RunGuard> {
        let lock_path = self.state_dir.join(LOCK_FILE);
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(AppError::RunInProgress {
                    path: lock_path.display().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }
        Ok(RunGuard {
            manifest_path: self.state_dir.join(MANIFEST_FILE),
            lock_path,
            previous: self.load(),
        })
    }

    fn load(&self) -> Manifest {
        let path = self.state_dir.join(MANIFEST_FILE);
        let Ok(text) = fs::read_to_string(&path) else {
            return Manifest::default();
        };
        match serde_json::from_str(&text) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("ignoring unreadable manifest {}: {e}", path.display());
                Manifest::default()
            }
        }
    }
}

/// Exclusive access to one run's manifest cycle. Dropping the guard releases
/// the lock; committing persists the new manifest atomically first.
pub struct RunGuard {
    manifest_path: PathBuf,
    lock_path: PathBuf,
    pub previous: Manifest,
}

impl RunGuard {
    /// Atomically replace the on-disk manifest with `next`.
    pub fn commit(self, next: &Manifest) -> AppResult<()> {
        let dir = self
            .manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, next)?;
        file.as_file_mut().sync_all()?;
        file.persist(&self.manifest_path)
            .map_err(|e| AppError::Io(e.error))?;
        Ok(())
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}
