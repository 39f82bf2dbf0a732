use serde::{Deserialize, Serialize};

use crate::elements::SceneElementSnapshot;
use crate::error::SceneryError;
use crate::paths::clean_path;

pub const DEFAULT_VARIATION_NAME: &str = "Default";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gm_background: String,
    #[serde(default)]
    pub pl_background: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_data: Option<SceneElementSnapshot>,
}

impl Variation {
    pub fn new(name: &str, gm_background: &str, pl_background: &str) -> Self {
        Self {
            name: name.to_string(),
            gm_background: gm_background.to_string(),
            pl_background: pl_background.to_string(),
            scene_data: None,
        }
    }

    /// Matches a cleaned background path against either slot.
    pub fn uses_background(&self, cleaned: &str) -> bool {
        clean_path(&self.gm_background) == cleaned || clean_path(&self.pl_background) == cleaned
    }

    pub fn has_scene_data(&self) -> bool {
        self.scene_data
            .as_ref()
            .is_some_and(SceneElementSnapshot::has_data)
    }

    pub fn image_for(&self, is_gm: bool) -> &str {
        if is_gm {
            &self.gm_background
        } else {
            &self.pl_background
        }
    }
}

/// Variation list persisted on a scene. Index 0 is the Default variation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneryData {
    #[serde(default)]
    pub active_variation_index: usize,
    pub variations: Vec<Variation>,
}

impl SceneryData {
    /// Builds persisted data from edited rows. Row 0 must carry a GM
    /// background; see [`SceneryData::from_complete_rows`] for the rest.
    pub fn from_rows(rows: Vec<Variation>, active_index: usize) -> Result<Self, SceneryError> {
        let Some(default) = rows.first() else {
            return Err(SceneryError::NoValidVariations);
        };
        if default.gm_background.is_empty() {
            return Err(SceneryError::MissingDefaultBackground);
        }
        Ok(Self::from_complete_rows(rows, active_index))
    }

    /// Keeps the rows that have a GM background. `active_index` is a row
    /// index and follows its row: it becomes 0 when that row is dropped and
    /// the last variation when it points past the rows.
    pub fn from_complete_rows(rows: Vec<Variation>, active_index: usize) -> Self {
        let row_count = rows.len();
        let mut active = None;
        let mut variations = Vec::with_capacity(row_count);
        for (row_index, variation) in rows.into_iter().enumerate() {
            if variation.gm_background.is_empty() {
                continue;
            }
            if row_index == active_index {
                active = Some(variations.len());
            }
            variations.push(variation);
        }

        let active_variation_index = match active {
            Some(index) => index,
            None if active_index >= row_count => variations.len().saturating_sub(1),
            None => 0,
        };
        Self {
            active_variation_index,
            variations,
        }
    }

    /// Single Default variation mirroring `background`.
    pub fn default_for(background: &str) -> Self {
        let background = clean_path(background);
        Self {
            active_variation_index: 0,
            variations: vec![Variation::new(
                DEFAULT_VARIATION_NAME,
                &background,
                &background,
            )],
        }
    }

    pub fn clamp_active(&mut self) {
        let last = self.variations.len().saturating_sub(1);
        self.active_variation_index = self.active_variation_index.min(last);
    }

    pub fn active(&self) -> Option<&Variation> {
        self.variations.get(self.active_variation_index)
    }

    /// Image of the active variation for the current user's role, cleaned.
    pub fn user_image(&self, is_gm: bool) -> String {
        self.active()
            .map(|variation| clean_path(variation.image_for(is_gm)))
            .unwrap_or_default()
    }

    pub fn position_of_background(&self, background: &str) -> Option<usize> {
        let cleaned = clean_path(background);
        self.variations
            .iter()
            .position(|variation| variation.uses_background(&cleaned))
    }

    /// Follows a host-side edit of the scene background. The Default player
    /// image always mirrors the scene; its GM image only follows when it was
    /// not customized (equal to the player image).
    pub fn with_scene_background(&self, new_background: &str) -> Self {
        let cleaned = clean_path(new_background);
        let mut updated = self.clone();
        if let Some(default) = updated.variations.first_mut() {
            let customized = clean_path(&default.gm_background) != clean_path(&default.pl_background);
            default.name = DEFAULT_VARIATION_NAME.to_string();
            if !customized {
                default.gm_background = cleaned.clone();
            }
            default.pl_background = cleaned;
        }
        updated
    }

    /// Keeps the Default player image locked to the scene background.
    pub fn lock_default_player_background(&mut self, scene_background: &str) {
        let cleaned = clean_path(scene_background);
        if cleaned.is_empty() {
            return;
        }
        if let Some(default) = self.variations.first_mut() {
            default.pl_background = cleaned;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Variation> {
        vec![
            Variation::new("Default", "maps/a.webp", "maps/a.webp"),
            Variation::new("", "", ""),
            Variation::new("Night", "maps/a_night.webp", "maps/a_night.webp"),
        ]
    }

    #[test]
    fn from_rows_drops_incomplete_and_clamps() {
        let data = SceneryData::from_rows(rows(), 9).expect("data");
        assert_eq!(data.variations.len(), 2);
        assert_eq!(data.active_variation_index, 1);
    }

    #[test]
    fn active_row_keeps_its_variation_when_earlier_rows_drop() {
        let mut rows = rows();
        rows.push(Variation::new("Snow", "maps/a_snow.webp", "maps/a_snow.webp"));

        let data = SceneryData::from_rows(rows.clone(), 2).expect("data");
        assert_eq!(data.variations.len(), 3);
        assert_eq!(data.active_variation_index, 1);
        assert_eq!(data.active().map(|v| v.name.as_str()), Some("Night"));

        let data = SceneryData::from_rows(rows, 1).expect("data");
        assert_eq!(data.active_variation_index, 0);
    }

    #[test]
    fn from_rows_requires_default_background() {
        let mut rows = rows();
        rows[0].gm_background.clear();
        assert!(matches!(
            SceneryData::from_rows(rows, 0),
            Err(SceneryError::MissingDefaultBackground)
        ));
        assert!(matches!(
            SceneryData::from_rows(Vec::new(), 0),
            Err(SceneryError::NoValidVariations)
        ));
    }

    #[test]
    fn user_image_follows_role() {
        let mut data = SceneryData::default_for("maps/a.webp");
        data.variations
            .push(Variation::new("Alt", "maps/b_gm.webp", "maps/b_pl.webp"));
        data.active_variation_index = 1;
        assert_eq!(data.user_image(true), "maps/b_gm.webp");
        assert_eq!(data.user_image(false), "maps/b_pl.webp");
    }

    #[test]
    fn scene_background_change_respects_customized_gm_image() {
        let plain = SceneryData::default_for("maps/a.webp");
        let updated = plain.with_scene_background("maps/new.webp");
        assert_eq!(updated.variations[0].gm_background, "maps/new.webp");
        assert_eq!(updated.variations[0].pl_background, "maps/new.webp");

        let mut custom = SceneryData::default_for("maps/a.webp");
        custom.variations[0].gm_background = "maps/a_gm.webp".to_string();
        let updated = custom.with_scene_background("maps/new.webp");
        assert_eq!(updated.variations[0].gm_background, "maps/a_gm.webp");
        assert_eq!(updated.variations[0].pl_background, "maps/new.webp");
    }

    #[test]
    fn background_lookup_checks_both_slots() {
        let mut data = SceneryData::default_for("maps/a.webp");
        data.variations
            .push(Variation::new("Alt", "maps/b_gm.webp", "maps/b_pl.webp"));
        assert_eq!(data.position_of_background(" maps/b_pl.webp,"), Some(1));
        assert_eq!(data.position_of_background("maps/zzz.webp"), None);
    }
}
