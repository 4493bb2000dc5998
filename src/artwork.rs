//! Fuzzy artwork matching
//!
//! Indexes the picon directory once per run and matches channel display
//! names against it by token overlap plus string similarity. Copies are
//! idempotent: a destination is rewritten only when its bytes differ from
//! the source.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::errors::AppResult;
use crate::paths::strip_name_prefix;

/// Minimum score an artwork candidate must reach to be used. Requires real
/// token overlap; similarity alone cannot clear it.
pub const MATCH_THRESHOLD: f64 = 2.2;

/// Tokens carrying no identity: quality tags, country codes, generic words.
const STOPWORDS: &[&str] = &[
    "hd", "sd", "fhd", "uhd", "4k", "8k", "hevc", "h265", "raw", "vip", "plus", "tv", "channel",
    "kanal", "the", "de", "at", "ch", "uk", "gb", "us", "fr", "es", "it", "tr", "ar", "ru", "pl",
    "nl", "pt", "be", "dk", "se", "no", "fi",
];

static NUMBER_GROUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*\d+\s*\)").expect("valid number group regex"));

#[derive(Debug)]
struct ArtworkEntry {
    path: PathBuf,
    tokens: Vec<String>,
    joined: String,
}

/// Index over the artwork files found under one directory, rebuilt per run.
#[derive(Debug, Default)]
pub struct ArtworkIndex {
    entries: Vec<ArtworkEntry>,
}

impl ArtworkIndex {
    /// Recursively scan `dir` for `.png` files. An absent directory yields an
    /// empty index.
    pub fn build(dir: &Path) -> Self {
        if !dir.is_dir() {
            debug!("artwork directory {} absent, matching disabled", dir.display());
            return Self::default();
        }
        let mut entries = Vec::new();
        for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
            {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let tokens = tokenize(stem);
            if tokens.is_empty() {
                continue;
            }
            let joined = tokens.join(" ");
            entries.push(ArtworkEntry {
                path: path.to_path_buf(),
                tokens,
                joined,
            });
        }
        debug!("indexed {} artwork files under {}", entries.len(), dir.display());
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Best-scoring artwork file for a channel name, if any candidate clears
    /// the threshold.
    pub fn best_match(&self, channel_name: &str) -> Option<&Path> {
        let name_tokens = tokenize(channel_name);
        if name_tokens.is_empty() {
            return None;
        }
        let name_joined = name_tokens.join(" ");
        let name_set: HashSet<&str> = name_tokens.iter().map(String::as_str).collect();

        let mut best: Option<(f64, &ArtworkEntry)> = None;
        for entry in &self.entries {
            let file_set: HashSet<&str> = entry.tokens.iter().map(String::as_str).collect();
            let overlap = name_set.intersection(&file_set).count();
            let ratio = strsim::normalized_levenshtein(&name_joined, &entry.joined);
            let score = 2.0 * overlap as f64 + ratio;
            if best.is_none_or(|(top, _)| score > top) {
                best = Some((score, entry));
            }
        }
        match best {
            Some((score, entry)) if score >= MATCH_THRESHOLD => {
                debug!(
                    "matched artwork {} for '{}' (score {score:.2})",
                    entry.path.display(),
                    channel_name
                );
                Some(&entry.path)
            }
            _ => None,
        }
    }
}

/// Normalize a channel or file name into comparison tokens.
pub fn tokenize(name: &str) -> Vec<String> {
    let rest = strip_name_prefix(name);
    let expanded = rest.replace('&', " and ");
    let without_numbers = NUMBER_GROUP_RE.replace_all(&expanded, " ");

    // Split letter/digit boundaries and strip non-alphanumerics; diacritics
    // survive because the check is Unicode-aware.
    let mut buf = String::with_capacity(without_numbers.len() + 8);
    let mut prev: Option<char> = None;
    for c in without_numbers.chars() {
        if c.is_alphanumeric() {
            if let Some(p) = prev {
                if p.is_alphanumeric() && p.is_numeric() != c.is_numeric() {
                    buf.push(' ');
                }
            }
            for lc in c.to_lowercase() {
                buf.push(lc);
            }
        } else {
            buf.push(' ');
        }
        prev = Some(c);
    }

    let raw: Vec<&str> = buf.split_whitespace().collect();
    let mut tokens = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        // Re-merge "4 k"/"8 k" split apart by the boundary pass.
        let (token, step) = if (raw[i] == "4" || raw[i] == "8") && raw.get(i + 1) == Some(&"k") {
            (format!("{}k", raw[i]), 2)
        } else {
            (raw[i].to_string(), 1)
        };
        if !STOPWORDS.contains(&token.as_str()) {
            tokens.push(token);
        }
        i += step;
    }
    tokens
}

/// Copy `source` to `dest` only when the destination is missing or its bytes
/// differ. Returns whether anything was written.
pub fn copy_if_different(source: &Path, dest: &Path) -> AppResult<bool> {
    if dest.is_file() {
        let source_len = fs::metadata(source)?.len();
        let dest_len = fs::metadata(dest)?.len();
        if source_len == dest_len && fs::read(source)? == fs::read(dest)? {
            return Ok(false);
        }
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn tokenize_normalizes_channel_names() {
        assert_eq!(tokenize("DE: SAT 1 HD"), vec!["sat", "1"]);
        assert_eq!(tokenize("sat1hd"), vec!["sat", "1"]);
        assert_eq!(tokenize("Sky Sport 4K"), vec!["sky", "sport"]);
        assert_eq!(tokenize("A&E"), vec!["a", "and", "e"]);
        assert_eq!(tokenize("Film (2)"), vec!["film"]);
    }

    #[test]
    fn tokenize_keeps_diacritics() {
        assert_eq!(tokenize("Künstler Kanal"), vec!["künstler"]);
    }

    fn index_with(files: &[&str]) -> (TempDir, ArtworkIndex) {
        let dir = TempDir::new().unwrap();
        for name in files {
            fs::write(dir.path().join(name), name.as_bytes()).unwrap();
        }
        let index = ArtworkIndex::build(dir.path());
        (dir, index)
    }

    #[test]
    fn best_match_requires_token_overlap() {
        let (_dir, index) = index_with(&["sat1.png", "unrelated.png"]);
        assert_eq!(index.len(), 2);

        let hit = index.best_match("DE: SAT 1 HD").unwrap();
        assert_eq!(hit.file_name().unwrap(), "sat1.png");

        assert!(index.best_match("Completely Different").is_none());
    }

    #[test]
    fn non_png_files_are_ignored() {
        let (_dir, index) = index_with(&["sat1.jpg"]);
        assert!(index.is_empty());
    }

    #[test]
    fn absent_directory_yields_empty_index() {
        let index = ArtworkIndex::build(Path::new("/nonexistent/picons"));
        assert!(index.is_empty());
    }

    #[test]
    fn copy_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("src.png");
        let dest = dir.path().join("sub/poster.png");
        fs::write(&source, b"bytes").unwrap();

        assert!(copy_if_different(&source, &dest).unwrap());
        assert!(!copy_if_different(&source, &dest).unwrap());

        fs::write(&source, b"other").unwrap();
        assert!(copy_if_different(&source, &dest).unwrap());
        assert_eq!(fs::read(&dest).unwrap(), b"other");
    }
}
