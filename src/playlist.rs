//! Extended M3U playlist parsing
//!
//! Turns raw playlist text into a lazy sequence of [`PlaylistEntry`] values.
//! An entry starts at an `#EXTINF:` line; its stream URL is the next
//! non-comment, non-blank line. Malformed metadata never aborts parsing:
//! unparseable EXTINF lines and entries without a following URL are skipped.

use std::collections::HashMap;
use std::str::Lines;

use tracing::debug;

use crate::models::PlaylistEntry;

/// Lazy, non-restartable iterator over the entries of one playlist.
pub struct PlaylistParser<'a> {
    lines: Lines<'a>,
}

impl<'a> PlaylistParser<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
        }
    }
}

impl Iterator for PlaylistParser<'_> {
    type Item = PlaylistEntry;

    fn next(&mut self) -> Option<PlaylistEntry> {
        loop {
            let line = self.lines.next()?.trim();
            if !line.starts_with("#EXTINF") {
                continue;
            }
            let Some((head, title)) = split_extinf(line) else {
                debug!("skipping unparseable EXTINF line: {line}");
                continue;
            };
            // The URL is the next non-comment, non-blank line; running out of
            // input here drops the entry.
            let url = loop {
                let candidate = self.lines.next()?.trim();
                if candidate.is_empty() || candidate.starts_with('#') {
                    continue;
                }
                break candidate;
            };
            return Some(PlaylistEntry {
                title: title.to_string(),
                attributes: parse_attributes(head),
                url: url.to_string(),
            });
        }
    }
}

/// Split an EXTINF line into its duration/attribute part and title.
///
/// The separator is the first comma outside double quotes, so quoted
/// attribute values may contain commas. Returns `None` when the line has no
/// separating comma or no integer duration.
fn split_extinf(line: &str) -> Option<(&str, &str)> {
    let content = line.strip_prefix("#EXTINF:")?;
    let mut in_quotes = false;
    let mut split_at = None;
    for (idx, ch) in content.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                split_at = Some(idx);
                break;
            }
            _ => {}
        }
    }
    let idx = split_at?;
    let head = &content[..idx];
    let title = content[idx + 1..].trim();
    let duration = head.split_whitespace().next()?;
    if duration.parse::<i64>().is_err() {
        return None;
    }
    Some((head, title))
}

/// Extract `key="value"` pairs from the attribute part of an EXTINF line.
///
/// Only quoted values are recognized; unknown keys pass through untouched.
fn parse_attributes(head: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    let mut rest = head;
    while let Some(eq) = rest.find("=\"") {
        let key_start = rest[..eq]
            .rfind(|c: char| c.is_whitespace())
            .map(|i| i + 1)
            .unwrap_or(0);
        let key = &rest[key_start..eq];
        let after = &rest[eq + 2..];
        let Some(close) = after.find('"') else {
            break;
        };
        let value = &after[..close];
        if !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            attributes.insert(key.to_string(), value.to_string());
        }
        rest = &after[close + 1..];
    }
    attributes
}
