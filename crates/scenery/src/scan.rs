//! Discovers sibling background files of a seed image and turns them into
//! variation rows.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::data::Variation;
use crate::host::{FileBrowser, HostError};
use crate::naming::{
    classify_map_file, compute_clean_key, is_likely_variation, normalize_for_pairing,
    remove_token_from_file_name, MapCategory,
};
use crate::paths::{decode_percent, directory_of, extract_base_name};

/// Root namespace passed to the host file browser.
pub const BROWSE_SOURCE: &str = "data";

#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    /// Default GM background; its directory is browsed.
    pub seed_path: String,
    /// GM and Player paths of every existing row.
    pub existing_paths: HashSet<String>,
    pub gm_tokens: Vec<String>,
    pub player_tokens: Vec<String>,
    /// Player fallback for GM-only groups.
    pub scene_background: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    /// Replacement GM image for the Default row, when a GM file of the seed
    /// itself was found.
    pub default_gm_background: Option<String>,
    /// New rows sorted by name.
    pub variations: Vec<Variation>,
}

#[derive(Debug, Clone)]
struct ClassifiedFile {
    path: String,
    file_name: String,
    matched_token: Option<String>,
}

#[derive(Debug, Default)]
struct FileGroup {
    gm: Option<ClassifiedFile>,
    player: Option<ClassifiedFile>,
    neutral: Option<ClassifiedFile>,
}

impl FileGroup {
    fn offer(&mut self, category: MapCategory, file: ClassifiedFile) {
        let slot = match category {
            MapCategory::Gm => &mut self.gm,
            MapCategory::Player => &mut self.player,
            MapCategory::Neutral => &mut self.neutral,
        };
        if slot.is_none() {
            *slot = Some(file);
        }
    }

    /// GM and Player paths by pairing priority.
    fn pair(&self, scene_background: &str) -> Option<(String, String)> {
        let pair = match (&self.gm, &self.player, &self.neutral) {
            (Some(gm), Some(player), _) => (gm.path.clone(), player.path.clone()),
            (Some(gm), None, Some(neutral)) => (gm.path.clone(), neutral.path.clone()),
            (None, Some(player), Some(neutral)) => (neutral.path.clone(), player.path.clone()),
            (Some(gm), None, None) => (gm.path.clone(), scene_background.to_string()),
            (None, Some(player), None) => (player.path.clone(), player.path.clone()),
            (None, None, Some(neutral)) => (neutral.path.clone(), neutral.path.clone()),
            (None, None, None) => return None,
        };
        Some(pair)
    }

    fn naming_file(&self) -> Option<&ClassifiedFile> {
        self.neutral
            .as_ref()
            .or(self.player.as_ref())
            .or(self.gm.as_ref())
    }
}

fn clean_key_of(file_name: &str, matched_token: Option<&str>) -> String {
    match matched_token {
        Some(token) => compute_clean_key(file_name, token),
        None => normalize_for_pairing(file_name),
    }
}

/// Browses the seed's directory and builds variation rows from the files that
/// look related to it.
pub fn scan_variations<B>(browser: &mut B, request: &ScanRequest) -> Result<ScanOutcome, HostError>
where
    B: FileBrowser + ?Sized,
{
    let mut outcome = ScanOutcome::default();
    if request.seed_path.is_empty() {
        return Ok(outcome);
    }

    let directory = directory_of(&request.seed_path);
    let files = browser.browse(BROWSE_SOURCE, directory)?;
    let base_name = extract_base_name(&request.seed_path);

    let mut order = Vec::<String>::new();
    let mut groups = HashMap::<String, FileGroup>::new();
    for path in files {
        if request.existing_paths.contains(&path) {
            continue;
        }
        let file_name = extract_base_name(&path);
        if !is_likely_variation(&file_name, &base_name) {
            continue;
        }

        let classification =
            classify_map_file(&file_name, &request.gm_tokens, &request.player_tokens);
        let key = clean_key_of(&file_name, classification.matched_token.as_deref());
        debug!(
            file = %path,
            category = ?classification.category,
            token = classification.matched_token.as_deref().unwrap_or(""),
            key = %key,
            "scan_classified"
        );

        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().offer(
            classification.category,
            ClassifiedFile {
                path,
                file_name,
                matched_token: classification.matched_token,
            },
        );
    }

    let seed_classification =
        classify_map_file(&base_name, &request.gm_tokens, &request.player_tokens);
    let seed_key = clean_key_of(&base_name, seed_classification.matched_token.as_deref());

    for key in order {
        let Some(group) = groups.remove(&key) else {
            continue;
        };

        // A lone GM file of the seed upgrades the Default row; a full GM and
        // Player pair still becomes a variation of its own.
        if key == seed_key && !(group.gm.is_some() && group.player.is_some()) {
            if let Some(gm) = &group.gm {
                debug!(file = %gm.path, "scan_default_enhanced");
                outcome.default_gm_background = Some(gm.path.clone());
            }
            continue;
        }

        let Some((gm_background, pl_background)) = group.pair(&request.scene_background) else {
            continue;
        };
        let Some(naming_file) = group.naming_file() else {
            continue;
        };
        let name = derive_variation_name(naming_file, &base_name);
        outcome
            .variations
            .push(Variation::new(&name, &gm_background, &pl_background));
    }

    outcome.variations.sort_by(|left, right| {
        left.name
            .to_lowercase()
            .cmp(&right.name.to_lowercase())
            .then_with(|| left.name.cmp(&right.name))
    });

    info!(
        directory,
        found = outcome.variations.len(),
        default_enhanced = outcome.default_gm_background.is_some(),
        "scan_completed"
    );
    Ok(outcome)
}

fn derive_variation_name(file: &ClassifiedFile, base_name: &str) -> String {
    let stripped = match file.matched_token.as_deref() {
        Some(token) => remove_token_from_file_name(&file.file_name, token),
        None => file.file_name.clone(),
    };
    let without_base = if base_name.is_empty() {
        stripped.clone()
    } else {
        stripped.replacen(base_name, "", 1)
    };

    let name = humanize(&without_base);
    if name.is_empty() {
        humanize(&stripped)
    } else {
        name
    }
}

fn humanize(raw: &str) -> String {
    decode_percent(raw)
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
