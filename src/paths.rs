//! Target path derivation
//!
//! Maps an admitted [`ClassifiedItem`] to its canonical relative output path
//! with filesystem-safe segment names. The mapping is deterministic: the same
//! item always lands at the same path, which is what makes diff-based
//! reconciliation possible.

use std::path::PathBuf;

use crate::classify::clean_lang_tags;
use crate::models::ClassifiedItem;

/// Extension of the pointer files the sync engine manages.
pub const POINTER_EXTENSION: &str = "strm";

/// Delimiters that may terminate a leading region/quality prefix, checked in
/// this priority order.
pub const NAME_PREFIX_DELIMITERS: &[char] = &[':', '|', '_', '-'];

const MAX_SEGMENT_LEN: usize = 180;
const SEGMENT_TRIM: &[char] = &[' ', '.', '_'];
const ILLEGAL_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
const QUALITY_TOKENS: &[&str] = &["sd", "hd", "fhd", "uhd", "4k", "8k"];
const COUNTRY_CODES: &[&str] = &[
    "de", "at", "ch", "uk", "gb", "us", "fr", "es", "it", "tr", "ar", "ru", "pl", "nl", "pt",
    "be", "dk", "se", "no", "fi",
];

/// Make a string safe to use as a single path segment.
///
/// Collapses whitespace, drops directional marks, replaces illegal path
/// characters with `_`, trims surrounding separators and dots, and caps the
/// length. An empty result becomes `Unknown`.
pub fn safe_name(raw: &str) -> String {
    let mut collapsed = String::with_capacity(raw.len());
    for part in raw.split_whitespace() {
        if !collapsed.is_empty() {
            collapsed.push(' ');
        }
        collapsed.push_str(part);
    }
    let replaced: String = collapsed
        .chars()
        .filter(|c| !matches!(c, '\u{200e}' | '\u{200f}'))
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let mut name = replaced.trim_matches(SEGMENT_TRIM).to_string();
    if name.chars().count() > MAX_SEGMENT_LEN {
        name = name
            .chars()
            .take(MAX_SEGMENT_LEN)
            .collect::<String>()
            .trim_end_matches(SEGMENT_TRIM)
            .to_string();
    }
    if name.is_empty() {
        "Unknown".to_string()
    } else {
        name
    }
}

/// Remainder of a name after its leading prefix token, if stripping one
/// leaves anything behind.
pub(crate) fn strip_name_prefix(name: &str) -> &str {
    let trimmed = name.trim();
    for delim in NAME_PREFIX_DELIMITERS {
        if let Some(idx) = trimmed.find(*delim) {
            let rest = trimmed[idx + delim.len_utf8()..].trim();
            if !rest.is_empty() {
                return rest;
            }
            break;
        }
    }
    trimmed
}

/// Derive the folder name a live channel's files live under.
///
/// Strips one leading delimiter-separated prefix token, then up to two
/// leading country-code tokens, preserving the rest of the name verbatim.
pub fn channel_folder(name: &str) -> String {
    let rest = strip_name_prefix(name);
    let mut words: Vec<&str> = rest.split_whitespace().collect();
    let mut stripped = 0;
    while stripped < 2 && words.len() > 1 {
        let lowered = words[0].to_lowercase();
        if !COUNTRY_CODES.contains(&lowered.as_str()) {
            break;
        }
        words.remove(0);
        stripped += 1;
    }
    if words.is_empty() {
        rest.to_string()
    } else {
        words.join(" ")
    }
}

/// Per-run deduplication key for a movie: cleaned name, lower-cased, with
/// quality/codec tokens removed.
pub fn movie_dedup_key(cleaned_name: &str) -> String {
    cleaned_name
        .to_lowercase()
        .split_whitespace()
        .filter(|word| !QUALITY_TOKENS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Relative output path for an admitted item.
pub fn target_path(item: &ClassifiedItem) -> PathBuf {
    match item {
        ClassifiedItem::Episode {
            show,
            season,
            episode,
            ..
        } => {
            let base = format!("{show} - S{season:02}E{episode:02}");
            PathBuf::from("Series")
                .join(safe_name(show))
                .join(format!("Season {season:02}"))
                .join(format!("{}.{POINTER_EXTENSION}", safe_name(&base)))
        }
        ClassifiedItem::Movie { group, name, .. } => {
            let cleaned = clean_lang_tags(name);
            PathBuf::from("Movies")
                .join(safe_name(group))
                .join(format!("{}.{POINTER_EXTENSION}", safe_name(&cleaned)))
        }
        ClassifiedItem::LiveChannel { group, name, .. } => PathBuf::from("LiveTV")
            .join(safe_name(group))
            .join(safe_name(&channel_folder(name)))
            .join(format!("{}.{POINTER_EXTENSION}", safe_name(name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn safe_name_replaces_illegal_characters() {
        assert_eq!(safe_name("DE: Sport"), "DE_ Sport");
        assert_eq!(safe_name("a/b\\c*d?e\"f<g>h|i"), "a_b_c_d_e_f_g_h_i");
        assert_eq!(safe_name("  spaced   out  "), "spaced out");
    }

    #[test]
    fn safe_name_trims_and_caps() {
        assert_eq!(safe_name(" ._ odd _. "), "odd");
        assert_eq!(safe_name(""), "Unknown");
        assert_eq!(safe_name("___"), "Unknown");
        let long = "x".repeat(400);
        assert_eq!(safe_name(&long).chars().count(), 180);
    }

    #[test]
    fn channel_folder_strips_prefix_and_country_codes() {
        assert_eq!(channel_folder("DE: SAT 1 HD"), "SAT 1 HD");
        assert_eq!(channel_folder("UK | BBC One FHD"), "BBC One FHD");
        assert_eq!(channel_folder("AT - ORF 1"), "ORF 1");
        // No delimiter: up to two leading country codes go.
        assert_eq!(channel_folder("DE AT ORF 2"), "ORF 2");
        // Never strips down to nothing.
        assert_eq!(channel_folder("HD:"), "HD:");
        assert_eq!(channel_folder("ZDF"), "ZDF");
    }

    #[test]
    fn delimiter_priority_prefers_colon() {
        assert_eq!(channel_folder("FR: TF1 - Suisse"), "TF1 - Suisse");
    }

    #[test]
    fn movie_dedup_key_strips_quality_tokens() {
        assert_eq!(movie_dedup_key("Inception HD"), "inception");
        assert_eq!(movie_dedup_key("Inception FHD"), "inception");
        assert_eq!(movie_dedup_key("Dune Part Two 4K"), "dune part two");
        assert_ne!(movie_dedup_key("Dune"), movie_dedup_key("Dune Part Two"));
    }

    #[test]
    fn episode_target_path() {
        let item = ClassifiedItem::Episode {
            group: "EN Series".to_string(),
            name: "Show Name S01E05".to_string(),
            url: "http://x/1.mkv".to_string(),
            show: "Show Name".to_string(),
            season: 1,
            episode: 5,
            episode_title: None,
        };
        assert_eq!(
            target_path(&item),
            Path::new("Series/Show Name/Season 01/Show Name - S01E05.strm")
        );
    }

    #[test]
    fn movie_target_path_cleans_language_tags() {
        let item = ClassifiedItem::Movie {
            group: "VOD: Action".to_string(),
            name: "Inception (EN)".to_string(),
            url: "http://x/42.mkv".to_string(),
        };
        assert_eq!(
            target_path(&item),
            Path::new("Movies/VOD_ Action/Inception.strm")
        );
    }

    #[test]
    fn live_channel_target_path() {
        let item = ClassifiedItem::LiveChannel {
            group: "DE: Sport".to_string(),
            name: "DE: SAT 1 HD".to_string(),
            url: "http://x/1.ts".to_string(),
        };
        assert_eq!(
            target_path(&item),
            Path::new("LiveTV/DE_ Sport/SAT 1 HD/DE_ SAT 1 HD.strm")
        );
    }
}
