//! Manifest reconciliation
//!
//! The sync engine converges the on-disk pointer library with the current
//! playlist: it computes the desired state in playlist order, writes pointer
//! files idempotently, places matched artwork next to live channels, deletes
//! what dropped out of the playlist, and persists the new manifest. One call
//! is one exclusive batch pass; individual file failures are logged and
//! skipped so the run always reaches the manifest-persist step.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::allowlist::AllowRules;
use crate::artwork::{self, ArtworkIndex};
use crate::classify::{classify_entry, clean_lang_tags};
use crate::errors::AppResult;
use crate::manifest::{Manifest, ManifestEntry, ManifestStore};
use crate::models::{ClassifiedItem, SyncSummary};
use crate::paths::{self, POINTER_EXTENSION};
use crate::playlist::PlaylistParser;

/// Artwork source directory under the output root.
pub const ARTWORK_DIR: &str = "picons";

/// Fixed image names written next to a matched live channel's pointer.
const POSTER_FILE: &str = "poster.png";
const BACKDROP_FILE: &str = "backdrop.png";

/// Folder-level artwork removed once a directory holds no more pointers.
const FOLDER_ARTWORK: &[&str] = &[
    "poster.png",
    "poster.jpg",
    "backdrop.png",
    "backdrop.jpg",
    "fanart.jpg",
    "folder.jpg",
    "folder.png",
];

/// Classic same-stem sidecar extensions, pruned only on request.
const SIDECAR_EXTENSIONS: &[&str] = &["nfo", "jpg", "jpeg", "png", "webp", "srt", "ass", "sub"];

/// Image extensions eligible for `<stem>-*` suffixed cleanup.
const SUFFIXED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Behavior switches supplied by the invoker.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Delete pointer files whose entries dropped out of the playlist
    pub sync_delete: bool,
    /// Also delete classic same-stem sidecars next to deleted pointers
    pub prune_sidecars: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            sync_delete: true,
            prune_sidecars: false,
        }
    }
}

/// Stable identity key for a stream URL.
pub fn fingerprint(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// One-shot reconciliation engine for a single output root.
pub struct SyncEngine<'a> {
    out_root: PathBuf,
    rules: &'a AllowRules,
    options: SyncOptions,
}

impl<'a> SyncEngine<'a> {
    pub fn new(out_root: impl Into<PathBuf>, rules: &'a AllowRules, options: SyncOptions) -> Self {
        Self {
            out_root: out_root.into(),
            rules,
            options,
        }
    }

    /// Full batch pass: acquire the run guard, reconcile against the previous
    /// manifest, persist the new one.
    pub fn run(&self, playlist_text: &str) -> AppResult<SyncSummary> {
        let store = ManifestStore::open(&self.out_root)?;
        let guard = store.begin()?;
        let (summary, next) = self.reconcile(playlist_text, &guard.previous)?;
        guard.commit(&next)?;
        info!(
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            deleted = summary.deleted,
            sidecars_deleted = summary.sidecars_deleted,
            "sync run finished"
        );
        Ok(summary)
    }

    /// Compute desired state, converge the filesystem, and return the
    /// summary plus the manifest to persist.
    pub fn reconcile(
        &self,
        playlist_text: &str,
        previous: &Manifest,
    ) -> AppResult<(SyncSummary, Manifest)> {
        let mut summary = SyncSummary::default();
        let previous_paths = previous.paths();
        let artwork_index = ArtworkIndex::build(&self.out_root.join(ARTWORK_DIR));

        let mut items: BTreeMap<String, ManifestEntry> = BTreeMap::new();
        // Target path -> owning fingerprint; first claim wins.
        let mut path_owners: HashMap<String, String> = HashMap::new();
        let mut seen_movie_keys: HashSet<String> = HashSet::new();

        for entry in PlaylistParser::new(playlist_text) {
            let item = classify_entry(&entry);

            if !self.rules.is_allowed(&item) {
                debug!("not allowed: {} [{}]", item.name(), item.group());
                summary.skipped += 1;
                continue;
            }

            if let ClassifiedItem::Movie { name, .. } = &item {
                let key = paths::movie_dedup_key(&clean_lang_tags(name));
                if !seen_movie_keys.insert(key) {
                    debug!("suppressing duplicate movie: {name}");
                    continue;
                }
            }

            let target = self.out_root.join(paths::target_path(&item));
            let target_str = target.to_string_lossy().into_owned();
            let key = fingerprint(item.url());

            if let Some(owner) = path_owners.get(&target_str) {
                if *owner != key {
                    warn!(
                        "distinct stream {} maps to already-claimed path {}, keeping the first",
                        item.url(),
                        target_str
                    );
                    continue;
                }
            }

            match write_pointer(&target, item.url()) {
                Ok(true) => {
                    if previous_paths.contains(&target_str) {
                        summary.updated += 1;
                    } else {
                        summary.created += 1;
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    // Degrade to a no-op for this item; an untracked path in
                    // the manifest would break the path-set invariant.
                    warn!("failed to write pointer {}: {e}", target.display());
                    continue;
                }
            }

            if let ClassifiedItem::LiveChannel { name, .. } = &item {
                self.place_artwork(&artwork_index, name, &target);
            }

            path_owners.insert(target_str.clone(), key.clone());
            items.insert(key, ManifestEntry::for_item(&item, target_str));
        }

        if self.options.sync_delete {
            self.delete_removed(&previous_paths, &path_owners, &mut summary);
        }

        Ok((summary, Manifest::now(items)))
    }

    /// Copy the best-matching artwork as poster and backdrop into the
    /// channel's directory. Failures are logged and skipped.
    fn place_artwork(&self, index: &ArtworkIndex, name: &str, pointer: &Path) {
        let Some(source) = index.best_match(name) else {
            return;
        };
        let Some(dir) = pointer.parent() else {
            return;
        };
        for file in [POSTER_FILE, BACKDROP_FILE] {
            if let Err(e) = artwork::copy_if_different(source, &dir.join(file)) {
                warn!("failed to copy artwork for {name}: {e}");
            }
        }
    }

    /// Delete pointer files tracked by the previous manifest that the current
    /// playlist no longer wants, plus their associated artwork and any
    /// directories left empty.
    fn delete_removed(
        &self,
        previous_paths: &HashSet<String>,
        desired: &HashMap<String, String>,
        summary: &mut SyncSummary,
    ) {
        let mut removed: Vec<&String> = previous_paths
            .iter()
            .filter(|path| !desired.contains_key(*path))
            .collect();
        removed.sort();

        for path_str in removed {
            let path = Path::new(path_str);
            if !path.starts_with(&self.out_root) {
                warn!(
                    "refusing to delete {} outside output root {}",
                    path.display(),
                    self.out_root.display()
                );
                continue;
            }
            let is_pointer = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(POINTER_EXTENSION));
            if !is_pointer || !path.is_file() {
                continue;
            }
            if let Err(e) = fs::remove_file(path) {
                warn!("failed to delete {}: {e}", path.display());
                continue;
            }
            debug!("deleted {}", path.display());
            summary.deleted += 1;
            self.cleanup_after_delete(path, summary);
        }
    }

    fn cleanup_after_delete(&self, pointer: &Path, summary: &mut SyncSummary) {
        let Some(dir) = pointer.parent() else {
            return;
        };
        let Some(stem) = pointer.file_stem().and_then(|s| s.to_str()) else {
            return;
        };

        // Per-stem suffixed images (Jellyfin style: "Name-poster.jpg") always
        // go with their pointer.
        let suffix_prefix = format!("{stem}-");
        if let Ok(entries) = fs::read_dir(dir) {
            for candidate in entries.filter_map(Result::ok) {
                let candidate_path = candidate.path();
                let Some(file_name) = candidate_path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let is_suffixed_image = file_name.starts_with(&suffix_prefix)
                    && candidate_path.extension().is_some_and(|ext| {
                        SUFFIXED_IMAGE_EXTENSIONS
                            .iter()
                            .any(|img| ext.eq_ignore_ascii_case(img))
                    });
                if is_suffixed_image && candidate_path.is_file() {
                    match fs::remove_file(&candidate_path) {
                        Ok(()) => summary.sidecars_deleted += 1,
                        Err(e) => debug!("failed to delete {}: {e}", candidate_path.display()),
                    }
                }
            }
        }

        if self.options.prune_sidecars {
            for ext in SIDECAR_EXTENSIONS {
                let sidecar = dir.join(format!("{stem}.{ext}"));
                if sidecar.is_file() {
                    match fs::remove_file(&sidecar) {
                        Ok(()) => summary.sidecars_deleted += 1,
                        Err(e) => debug!("failed to delete {}: {e}", sidecar.display()),
                    }
                }
            }
        }

        if !has_pointer_files(dir) {
            for name in FOLDER_ARTWORK {
                let art = dir.join(name);
                if art.is_file() {
                    match fs::remove_file(&art) {
                        Ok(()) => summary.sidecars_deleted += 1,
                        Err(e) => debug!("failed to delete {}: {e}", art.display()),
                    }
                }
            }
        }

        self.prune_empty_dirs(dir);
    }

    /// Walk upward removing now-empty directories, stopping strictly at the
    /// output root.
    fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        loop {
            if current == self.out_root || !current.starts_with(&self.out_root) {
                return;
            }
            if fs::remove_dir(&current).is_err() {
                // Non-empty or already gone; either way the walk ends here.
                return;
            }
            let Some(parent) = current.parent() else {
                return;
            };
            current = parent.to_path_buf();
        }
    }
}

fn has_pointer_files(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries.filter_map(Result::ok).any(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(POINTER_EXTENSION))
            })
        })
        .unwrap_or(false)
}

/// Write `url + newline` to `path` only when absent or different.
fn write_pointer(path: &Path, url: &str) -> AppResult<bool> {
    let content = format!("{}\n", url.trim());
    if let Ok(existing) = fs::read_to_string(path) {
        if existing == content {
            return Ok(false);
        }
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(true)
}
