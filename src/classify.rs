//! Entry classification and episode metadata extraction
//!
//! Decides what a playlist entry *is* (live channel, movie, or episode) and,
//! for episodic content, pulls show/season/episode out of the display name.
//! All functions here are pure; identical inputs always produce identical
//! outputs.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::models::{ClassifiedItem, ItemKind, PlaylistEntry};

/// Group labels containing any of these mark episodic content.
const SERIES_GROUP_HINTS: &[&str] = &["series", "serien", "tv shows", "shows"];

/// URL extensions classified as movies when the entry is not episodic.
const MOVIE_EXTENSIONS: &[&str] = &["mkv", "mp4"];

/// Punctuation trimmed from show and episode-title captures.
const CAPTURE_TRIM: &[char] = &[' ', '-', '_', ':', '|', '.'];

static EPISODE_HINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(s\s*\d{1,2}\s*e\s*\d{1,2}|s\d{1,2}e\d{1,2}|\d{1,2}\s*x\s*\d{1,2})")
        .expect("valid episode hint regex")
});

static LANG_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\((DE|GER|DEU|EN|ENG|FR|ES|IT|TR|AR|RU|PL|NL)\)")
        .expect("valid language tag regex")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

// The three episode-number forms, tried in strict order: spaced "S01 E06",
// tight "S01E06", then "1x06". The first match wins.
static LOOSE_SE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<show>.*?)[\s\-_:|.]*s\s*(?P<s>\d{1,2})\s*e\s*(?P<e>\d{1,2})[\s\-_:|.]*?(?P<ep>.*)$")
        .expect("valid loose SxxExx regex")
});

static TIGHT_SE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<show>.*?)[\s\-_:|.]*s(?P<s>\d{1,2})e(?P<e>\d{1,2})[\s\-_:|.]*?(?P<ep>.*)$")
        .expect("valid tight SxxExx regex")
});

static CROSS_SE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<show>.*?)[\s\-_:|.]*?(?P<s>\d{1,2})\s*x\s*(?P<e>\d{1,2})[\s\-_:|.]*?(?P<ep>.*)$")
        .expect("valid NxM regex")
});

/// Episode metadata extracted from a display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeParts {
    pub show: String,
    pub season: u32,
    pub episode: u32,
    pub episode_title: Option<String>,
}

/// Assign a kind to an entry. First match wins:
/// episodic group or episode pattern in the name/title, then movie
/// container extension on the URL, then live channel.
pub fn classify(url: &str, group: &str, name: &str, title: &str) -> ItemKind {
    if is_series_group(group) || has_episode_pattern(name) || has_episode_pattern(title) {
        return ItemKind::Episode;
    }
    if MOVIE_EXTENSIONS.contains(&url_extension(url).as_str()) {
        return ItemKind::Movie;
    }
    ItemKind::LiveChannel
}

/// Classify a parsed entry into a [`ClassifiedItem`], extracting episode
/// metadata where applicable. When no episode pattern matches, the show
/// falls back to the cleaned display name with season = episode = 0.
pub fn classify_entry(entry: &PlaylistEntry) -> ClassifiedItem {
    let group = entry.group().to_string();
    let name = entry.display_name().to_string();
    let url = entry.url.clone();

    match classify(&url, &group, &name, &entry.title) {
        ItemKind::Episode => match extract_show_season_episode(&name) {
            Some(parts) if !parts.show.is_empty() => ClassifiedItem::Episode {
                group,
                name,
                url,
                show: parts.show,
                season: parts.season,
                episode: parts.episode,
                episode_title: parts.episode_title,
            },
            _ => {
                let show = clean_lang_tags(&name);
                ClassifiedItem::Episode {
                    group,
                    name,
                    url,
                    show,
                    season: 0,
                    episode: 0,
                    episode_title: None,
                }
            }
        },
        ItemKind::Movie => ClassifiedItem::Movie { group, name, url },
        ItemKind::LiveChannel => ClassifiedItem::LiveChannel { group, name, url },
    }
}

/// Try the episode-number patterns in priority order against a display name.
pub fn extract_show_season_episode(name: &str) -> Option<EpisodeParts> {
    let title = name.trim();
    for re in [&*LOOSE_SE_RE, &*TIGHT_SE_RE, &*CROSS_SE_RE] {
        if let Some(caps) = re.captures(title) {
            let show = clean_lang_tags(caps["show"].trim_matches(CAPTURE_TRIM));
            let season = caps["s"].parse().unwrap_or(0);
            let episode = caps["e"].parse().unwrap_or(0);
            let ep = caps["ep"].trim_matches(CAPTURE_TRIM);
            let episode_title = (!ep.is_empty()).then(|| ep.to_string());
            return Some(EpisodeParts {
                show,
                season,
                episode,
                episode_title,
            });
        }
    }
    None
}

pub fn has_episode_pattern(s: &str) -> bool {
    EPISODE_HINT_RE.is_match(s)
}

pub fn is_series_group(group: &str) -> bool {
    let g = group.to_lowercase();
    SERIES_GROUP_HINTS.iter().any(|hint| g.contains(hint))
}

/// Strip parenthetical language tags and collapse whitespace.
pub fn clean_lang_tags(s: &str) -> String {
    let cleaned = LANG_TAG_RE.replace_all(s.trim(), "");
    WHITESPACE_RE.replace_all(&cleaned, " ").trim().to_string()
}

/// Lower-cased extension of the URL's path component, empty when absent.
fn url_extension(raw: &str) -> String {
    let path = match Url::parse(raw) {
        Ok(url) => url.path().to_lowercase(),
        // Not an absolute URL; treat everything before query/fragment as path.
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_lowercase(),
    };
    match path.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && !ext.contains('/') => ext.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_decision_order() {
        // Series group wins over movie extension.
        assert_eq!(
            classify("http://x/1.mkv", "EN Series", "Show S01E01", "Show S01E01"),
            ItemKind::Episode
        );
        // Episode pattern in the name wins regardless of group.
        assert_eq!(
            classify("http://x/1.ts", "DE: Sport", "Show 2x07", "Show 2x07"),
            ItemKind::Episode
        );
        assert_eq!(
            classify("http://x/movie/42.mp4", "VOD", "Inception", "Inception"),
            ItemKind::Movie
        );
        assert_eq!(
            classify("http://x/live/1234.ts", "DE: Sport", "SAT 1 HD", "SAT 1 HD"),
            ItemKind::LiveChannel
        );
        // Query strings do not leak into the extension probe.
        assert_eq!(
            classify("http://x/live/1234.ts?token=a.mkv", "News", "CH", "CH"),
            ItemKind::LiveChannel
        );
    }

    #[test]
    fn tight_form_wins_for_unspaced_names() {
        let parts = extract_show_season_episode("Show Name S01E05 Pilot").unwrap();
        assert_eq!(parts.show, "Show Name");
        assert_eq!(parts.season, 1);
        assert_eq!(parts.episode, 5);
        assert_eq!(parts.episode_title.as_deref(), Some("Pilot"));
    }

    #[test]
    fn loose_form_extracts_episode_title() {
        let parts = extract_show_season_episode("Show Name - S01 E05 - Pilot").unwrap();
        assert_eq!(parts.show, "Show Name");
        assert_eq!(parts.season, 1);
        assert_eq!(parts.episode, 5);
        assert_eq!(parts.episode_title.as_deref(), Some("Pilot"));
    }

    #[test]
    fn cross_form_applies_last() {
        let parts = extract_show_season_episode("Show Name 2x07 Finale").unwrap();
        assert_eq!(parts.show, "Show Name");
        assert_eq!(parts.season, 2);
        assert_eq!(parts.episode, 7);
        assert_eq!(parts.episode_title.as_deref(), Some("Finale"));
    }

    #[test]
    fn show_capture_drops_language_tags() {
        let parts = extract_show_season_episode("Breaking Bad (DE) S02E03").unwrap();
        assert_eq!(parts.show, "Breaking Bad");
        assert_eq!(parts.episode_title, None);
    }

    #[test]
    fn no_pattern_yields_none() {
        assert!(extract_show_season_episode("Some Documentary").is_none());
    }

    #[test]
    fn classify_entry_falls_back_to_cleaned_name() {
        let entry = PlaylistEntry {
            title: "Tatort (DE)".to_string(),
            attributes: [("group-title".to_string(), "DE Serien".to_string())]
                .into_iter()
                .collect(),
            url: "http://x/ep/9.mkv".to_string(),
        };
        match classify_entry(&entry) {
            ClassifiedItem::Episode {
                show,
                season,
                episode,
                ..
            } => {
                assert_eq!(show, "Tatort");
                assert_eq!(season, 0);
                assert_eq!(episode, 0);
            }
            other => panic!("expected episode, got {other:?}"),
        }
    }

    #[test]
    fn lang_tag_cleanup_collapses_whitespace() {
        assert_eq!(clean_lang_tags("  Foo  (EN)  Bar "), "Foo Bar");
        assert_eq!(clean_lang_tags("(fr) Plain"), "Plain");
    }
}
