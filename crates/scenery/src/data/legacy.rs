use serde::Deserialize;
use serde_json::Value;

use crate::elements::SceneElementSnapshot;
use crate::paths::{clean_path, clean_path_value};

use super::types::{SceneryData, Variation, DEFAULT_VARIATION_NAME};

/// Schema written by releases that had a single image per variation and kept
/// the Default background outside the variation list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySceneryData {
    #[serde(default)]
    pub bg: Option<Value>,
    #[serde(default)]
    pub gm: Option<Value>,
    #[serde(default)]
    pub pl: Option<Value>,
    #[serde(default)]
    pub variations: Vec<LegacyVariation>,
    #[serde(default)]
    pub default_scene_data: Option<SceneElementSnapshot>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyVariation {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub file: Option<Value>,
    #[serde(default)]
    pub scene_data: Option<SceneElementSnapshot>,
}

impl LegacySceneryData {
    /// A stored blob is legacy when it still carries the old `bg` field.
    pub fn detect(raw: &Value) -> bool {
        raw.get("bg").is_some_and(Value::is_string)
    }
}

/// Upgrades legacy data in memory. The old Default background becomes
/// variation 0 with identical GM and player images, each old `file` fills
/// both slots of its variation, and the active index is the first variation
/// whose GM image equals the old GM selection.
pub fn migrate_legacy(legacy: LegacySceneryData) -> SceneryData {
    let default_background = clean_path_value(legacy.bg.as_ref());
    let mut variations = vec![Variation {
        name: DEFAULT_VARIATION_NAME.to_string(),
        gm_background: default_background.clone(),
        pl_background: default_background,
        scene_data: legacy.default_scene_data,
    }];

    for old in legacy.variations {
        let file = clean_path_value(old.file.as_ref());
        if file.is_empty() {
            continue;
        }
        let name = old
            .name
            .as_ref()
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        variations.push(Variation {
            name,
            gm_background: file.clone(),
            pl_background: file,
            scene_data: old.scene_data,
        });
    }

    let legacy_gm = clean_path_value(legacy.gm.as_ref());
    let active_variation_index = variations
        .iter()
        .position(|variation| clean_path(&variation.gm_background) == legacy_gm)
        .unwrap_or(0);

    SceneryData {
        active_variation_index,
        variations,
    }
}
