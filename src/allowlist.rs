//! Allowlist filtering
//!
//! User-maintained allow rules decide which classified items get
//! materialized. The structures deserialize straight from the invoker's JSON
//! configuration; missing or malformed sections default to empty, which
//! admits nothing for that kind.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::ClassifiedItem;

/// Allow rules for one of the live/movie kinds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KindRules {
    /// Categories admitted title-by-title alongside `titles`
    #[serde(default)]
    pub categories: HashSet<String>,
    /// Individually admitted display names
    #[serde(default)]
    pub titles: HashSet<String>,
    /// Categories admitted wholesale, including titles not seen yet
    #[serde(default)]
    pub full_categories: HashSet<String>,
}

/// Allow rules for episodic content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesRules {
    #[serde(default)]
    pub shows: HashSet<String>,
    #[serde(default)]
    pub titles: HashSet<String>,
}

/// The complete allowlist configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllowRules {
    #[serde(default)]
    pub livetv: KindRules,
    #[serde(default)]
    pub movies: KindRules,
    #[serde(default)]
    pub series: SeriesRules,
}

impl AllowRules {
    /// Pure inclusion decision for one classified item.
    pub fn is_allowed(&self, item: &ClassifiedItem) -> bool {
        match item {
            ClassifiedItem::LiveChannel { group, name, .. } => {
                kind_allows(&self.livetv, group, name)
            }
            ClassifiedItem::Movie { group, name, .. } => kind_allows(&self.movies, group, name),
            ClassifiedItem::Episode { name, show, .. } => {
                self.series.shows.contains(show) || self.series.titles.contains(name)
            }
        }
    }
}

fn kind_allows(rules: &KindRules, group: &str, name: &str) -> bool {
    if rules.full_categories.contains(group) {
        return true;
    }
    rules.categories.contains(group) || rules.titles.contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(group: &str, name: &str) -> ClassifiedItem {
        ClassifiedItem::LiveChannel {
            group: group.to_string(),
            name: name.to_string(),
            url: "http://x/1.ts".to_string(),
        }
    }

    fn episode(name: &str, show: &str) -> ClassifiedItem {
        ClassifiedItem::Episode {
            group: "Series".to_string(),
            name: name.to_string(),
            url: "http://x/1.mkv".to_string(),
            show: show.to_string(),
            season: 1,
            episode: 1,
            episode_title: None,
        }
    }

    #[test]
    fn empty_rules_admit_nothing() {
        let rules = AllowRules::default();
        assert!(!rules.is_allowed(&live("DE: Sport", "SAT 1 HD")));
        assert!(!rules.is_allowed(&episode("Show S01E01", "Show")));
    }

    #[test]
    fn full_category_overrides_narrow_lists() {
        let rules: AllowRules = serde_json::from_str(
            r#"{"livetv": {"full_categories": ["DE: Sport"]}}"#,
        )
        .unwrap();
        // Neither the title nor the category is in the narrow lists.
        assert!(rules.is_allowed(&live("DE: Sport", "Brand New Channel")));
        assert!(!rules.is_allowed(&live("DE: News", "Brand New Channel")));
    }

    #[test]
    fn category_or_title_admits() {
        let rules: AllowRules = serde_json::from_str(
            r#"{"movies": {"categories": ["VOD: Action"], "titles": ["Solaris"]}}"#,
        )
        .unwrap();
        let by_category = ClassifiedItem::Movie {
            group: "VOD: Action".to_string(),
            name: "Anything".to_string(),
            url: "http://x/1.mkv".to_string(),
        };
        let by_title = ClassifiedItem::Movie {
            group: "VOD: Drama".to_string(),
            name: "Solaris".to_string(),
            url: "http://x/2.mkv".to_string(),
        };
        let neither = ClassifiedItem::Movie {
            group: "VOD: Drama".to_string(),
            name: "Stalker".to_string(),
            url: "http://x/3.mkv".to_string(),
        };
        assert!(rules.is_allowed(&by_category));
        assert!(rules.is_allowed(&by_title));
        assert!(!rules.is_allowed(&neither));
    }

    #[test]
    fn series_admit_by_show_or_raw_title() {
        let rules: AllowRules = serde_json::from_str(
            r#"{"series": {"shows": ["Show Name"], "titles": ["Other S02E01"]}}"#,
        )
        .unwrap();
        assert!(rules.is_allowed(&episode("Show Name S01E01", "Show Name")));
        assert!(rules.is_allowed(&episode("Other S02E01", "Other")));
        assert!(!rules.is_allowed(&episode("Third S01E01", "Third")));
    }

    #[test]
    fn unknown_sections_default_to_empty() {
        let rules: AllowRules = serde_json::from_str(r#"{"livetv": {}}"#).unwrap();
        assert!(!rules.is_allowed(&live("DE: Sport", "SAT 1 HD")));
    }
}
