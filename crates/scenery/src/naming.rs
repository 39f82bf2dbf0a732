//! Filename heuristics used to discover and pair background variations.

use std::collections::HashSet;

use tracing::debug;

const MIN_MATCH_LEN: usize = 4;
const PREFIX_RATIO: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapCategory {
    Gm,
    Player,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapClassification {
    pub category: MapCategory,
    pub matched_token: Option<String>,
}

impl MapClassification {
    fn neutral() -> Self {
        Self {
            category: MapCategory::Neutral,
            matched_token: None,
        }
    }
}

pub fn is_separator(ch: char) -> bool {
    matches!(ch, '-' | '_' | ' ' | '.')
}

/// Fuzzy check whether `file_name` belongs to the same family as `base_name`.
///
/// Both names are compared case-insensitively, extensions already stripped.
/// A candidate matches when one name contains the other (a candidate contained
/// in the base must be longer than three characters), or when the names share
/// a long enough common prefix: at least `max(4, floor(0.6 * shorter))`
/// characters, or a whole leading word of four or more characters followed by
/// a separator in both names (`tavern_interior` / `tavern_exterior`).
pub fn is_likely_variation(file_name: &str, base_name: &str) -> bool {
    let file_lower = file_name.to_lowercase();
    let base_lower = base_name.to_lowercase();

    if file_lower.contains(&base_lower) {
        return true;
    }
    if base_lower.contains(&file_lower) && file_lower.chars().count() >= MIN_MATCH_LEN {
        return true;
    }

    let prefix = common_prefix(&file_lower, &base_lower);
    let prefix_len = prefix.chars().count();
    let shorter = file_lower.chars().count().min(base_lower.chars().count());
    let threshold = ((shorter as f64) * PREFIX_RATIO).floor() as usize;
    if prefix_len >= threshold.max(MIN_MATCH_LEN) {
        return true;
    }

    let shared_word = prefix
        .rfind(is_separator)
        .map(|end| prefix[..end].trim_end_matches(is_separator))
        .unwrap_or("");
    let matched = shared_word.chars().count() >= MIN_MATCH_LEN;
    debug!(
        file_name,
        base_name,
        prefix_len,
        threshold,
        shared_word,
        matched,
        "scan_prefix_check"
    );
    matched
}

fn common_prefix<'a>(left: &'a str, right: &str) -> &'a str {
    let mut end = 0usize;
    for ((index, a), b) in left.char_indices().zip(right.chars()) {
        if a != b {
            break;
        }
        end = index + a.len_utf8();
    }
    &left[..end]
}

/// Splits a comma separated identifier setting into lowercase, de-duplicated
/// tokens. Blank input yields no tokens, which disables that role.
pub fn parse_identifiers(csv: &str) -> Vec<String> {
    let mut seen = HashSet::<String>::new();
    csv.split(',')
        .map(|entry| entry.trim().to_lowercase())
        .filter(|entry| !entry.is_empty())
        .filter(|entry| seen.insert(entry.clone()))
        .collect()
}

fn tokens_of(file_name: &str) -> Vec<String> {
    file_name
        .split(is_separator)
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Classifies a filename (no extension) as GM, Player or neutral. GM tokens
/// are checked first, so a name carrying both kinds of token is a GM map.
pub fn classify_map_file(
    file_name: &str,
    gm_tokens: &[String],
    player_tokens: &[String],
) -> MapClassification {
    let tokens = tokens_of(file_name);
    let find = |candidates: &[String]| {
        candidates
            .iter()
            .find(|candidate| tokens.iter().any(|token| token == *candidate))
            .cloned()
    };

    if let Some(token) = find(gm_tokens) {
        return MapClassification {
            category: MapCategory::Gm,
            matched_token: Some(token),
        };
    }
    if let Some(token) = find(player_tokens) {
        return MapClassification {
            category: MapCategory::Player,
            matched_token: Some(token),
        };
    }
    MapClassification::neutral()
}

/// Removes the first whole-token occurrence of `token` and one adjacent
/// separator, preferring the one before it. The rest of the name is untouched.
pub fn remove_token_from_file_name(file_name: &str, token: &str) -> String {
    let token_lower = token.to_lowercase();
    let Some((start, end)) = token_spans(file_name)
        .into_iter()
        .find(|(start, end)| file_name[*start..*end].to_lowercase() == token_lower)
    else {
        return file_name.to_string();
    };

    let before = file_name[..start].chars().next_back();
    let after = file_name[end..].chars().next();
    let (cut_start, cut_end) = match (before, after) {
        (Some(ch), _) if is_separator(ch) => (start - ch.len_utf8(), end),
        (_, Some(ch)) if is_separator(ch) => (start, end + ch.len_utf8()),
        _ => (start, end),
    };

    let mut result = String::with_capacity(file_name.len());
    result.push_str(&file_name[..cut_start]);
    result.push_str(&file_name[cut_end..]);
    result
}

fn token_spans(file_name: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    for (index, ch) in file_name.char_indices() {
        if is_separator(ch) {
            if let Some(token_start) = start.take() {
                spans.push((token_start, index));
            }
        } else if start.is_none() {
            start = Some(index);
        }
    }
    if let Some(token_start) = start {
        spans.push((token_start, file_name.len()));
    }
    spans
}

/// Canonical grouping key: lowercase tokens joined by a single `_`.
pub fn normalize_for_pairing(file_name: &str) -> String {
    tokens_of(file_name).join("_")
}

/// Grouping key for a classified file, with its role token removed so that
/// `forest_gm` and `forest_player` share the key `forest`.
pub fn compute_clean_key(file_name: &str, matched_token: &str) -> String {
    normalize_for_pairing(&remove_token_from_file_name(file_name, matched_token))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|token| token.to_string()).collect()
    }

    #[test]
    fn likely_variation_matches_contained_names() {
        assert!(is_likely_variation("forest_night", "forest"));
        assert!(is_likely_variation("Dark_Forest", "forest"));
        assert!(is_likely_variation("clearing", "forest_clearing_day"));
    }

    #[test]
    fn likely_variation_rejects_unrelated_and_short_names() {
        assert!(!is_likely_variation("castle", "forest"));
        assert!(!is_likely_variation("day", "forest_clearing_day"));
        assert!(!is_likely_variation("map_b", "mab_a"));
    }

    #[test]
    fn likely_variation_accepts_shared_prefix() {
        assert!(is_likely_variation("tavern_interior", "tavern_exterior"));
        assert!(is_likely_variation("dungeon_level1", "dungeon_level2_flooded"));
        assert!(!is_likely_variation("cave_a", "castle_a"));
    }

    #[test]
    fn parse_identifiers_dedupes_and_lowercases() {
        assert_eq!(parse_identifiers(" GM, dm ,gm,, "), tokens(&["gm", "dm"]));
        assert!(parse_identifiers("   ").is_empty());
    }

    #[test]
    fn classification_checks_gm_tokens_first() {
        let gm = tokens(&["gm"]);
        let player = tokens(&["player"]);
        let result = classify_map_file("battle_gm_v2", &gm, &player);
        assert_eq!(result.category, MapCategory::Gm);
        assert_eq!(result.matched_token.as_deref(), Some("gm"));

        let both = classify_map_file("battle-player-gm", &gm, &player);
        assert_eq!(both.category, MapCategory::Gm);

        let pl = classify_map_file("Battle.Player", &gm, &player);
        assert_eq!(pl.category, MapCategory::Player);
        assert_eq!(pl.matched_token.as_deref(), Some("player"));
    }

    #[test]
    fn classification_requires_whole_tokens() {
        let gm = tokens(&["gm"]);
        let player = tokens(&["pl"]);
        let result = classify_map_file("pigment_plains", &gm, &player);
        assert_eq!(result, MapClassification::neutral());
    }

    #[test]
    fn remove_token_prefers_preceding_separator() {
        assert_eq!(remove_token_from_file_name("forest_gm_night", "gm"), "forest_night");
        assert_eq!(remove_token_from_file_name("gm-forest", "gm"), "forest");
        assert_eq!(remove_token_from_file_name("forest GM", "gm"), "forest");
        assert_eq!(remove_token_from_file_name("gm", "gm"), "");
        assert_eq!(remove_token_from_file_name("gm_forest_gm", "gm"), "forest_gm");
        assert_eq!(remove_token_from_file_name("forest", "gm"), "forest");
    }

    #[test]
    fn clean_keys_pair_gm_and_player_files() {
        assert_eq!(compute_clean_key("Forest_GM", "gm"), "forest");
        assert_eq!(compute_clean_key("forest-player", "player"), "forest");
        assert_eq!(normalize_for_pairing("Forest  Night"), "forest_night");
        assert_eq!(
            compute_clean_key("forest_gm_night", "gm"),
            normalize_for_pairing("forest-night")
        );
    }
}
