use std::collections::HashSet;

use tracing::{debug, info};

use crate::data::{SceneryData, Variation, DEFAULT_VARIATION_NAME};
use crate::elements::capture_scene_elements;
use crate::error::SceneryError;
use crate::host::{SceneDocument, SceneryHost};
use crate::paths::clean_path;
use crate::scan::{scan_variations, ScanRequest};

use super::{is_viewed, load_data, persist, reject, SceneryManager};

/// One editable row of the variation form, raw as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormRow {
    pub name: String,
    pub gm_background: String,
    pub pl_background: String,
}

impl FormRow {
    pub fn new(name: &str, gm_background: &str, pl_background: &str) -> Self {
        Self {
            name: name.to_string(),
            gm_background: gm_background.to_string(),
            pl_background: pl_background.to_string(),
        }
    }

    fn from_variation(variation: &Variation) -> Self {
        Self::new(
            &variation.name,
            &variation.gm_background,
            &variation.pl_background,
        )
    }

    fn is_blank(&self) -> bool {
        self.name.is_empty() && self.gm_background.is_empty()
    }
}

/// Display state of one variation in the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariationCard {
    pub index: usize,
    pub name: String,
    pub gm_background: String,
    pub pl_background: String,
    pub is_default: bool,
    pub is_active: bool,
    pub is_empty: bool,
    pub has_scene_data: bool,
    pub scene_data_summary: Option<String>,
    /// Element data comes from the live scene rather than the snapshot.
    pub is_live_capture: bool,
}

/// Edit session over the variations of one scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariationForm {
    pub scene_id: String,
    pub rows: Vec<FormRow>,
    pub active_index: usize,
    pub cards: Vec<VariationCard>,
}

impl VariationForm {
    /// Appends a row; the player image defaults to the GM image.
    pub fn add_variation(&mut self, name: &str, gm_background: &str, pl_background: &str) {
        let pl_background = if pl_background.is_empty() {
            gm_background
        } else {
            pl_background
        };
        self.rows
            .push(FormRow::new(name, gm_background, pl_background));
    }

    /// Drops non-default rows that have neither a name nor a GM image.
    pub fn remove_blank_variations(&mut self) {
        let mut index = 0usize;
        self.rows.retain(|row| {
            let keep = index == 0 || !row.is_blank();
            index += 1;
            keep
        });
    }

    /// Every GM and Player path already in the form.
    pub fn existing_paths(&self) -> HashSet<String> {
        self.rows
            .iter()
            .flat_map(|row| [&row.gm_background, &row.pl_background])
            .filter(|path| !path.is_empty())
            .cloned()
            .collect()
    }

    /// Rows as variations. Snapshots carry over from `existing` by matching
    /// the cleaned GM image.
    pub fn parse_rows(&self, existing: Option<&SceneryData>) -> Vec<Variation> {
        self.rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let mut name = row.name.trim().to_string();
                if name.is_empty() && index == 0 {
                    name = DEFAULT_VARIATION_NAME.to_string();
                }
                let mut variation = Variation::new(
                    &name,
                    &clean_path(&row.gm_background),
                    &clean_path(&row.pl_background),
                );
                if !variation.gm_background.is_empty() {
                    variation.scene_data = existing
                        .and_then(|data| {
                            data.variations.iter().find(|candidate| {
                                clean_path(&candidate.gm_background) == variation.gm_background
                            })
                        })
                        .and_then(|candidate| candidate.scene_data.clone());
                }
                variation
            })
            .collect()
    }

    /// Index the row at `row_index` takes once incomplete rows are dropped on
    /// save. `None` when the row is out of range or has no GM image.
    pub fn persisted_index(&self, row_index: usize) -> Option<usize> {
        let is_complete = |row: &FormRow| !clean_path(&row.gm_background).is_empty();
        let row = self.rows.get(row_index)?;
        if !is_complete(row) {
            return None;
        }
        Some(self.rows[..row_index].iter().filter(|row| is_complete(row)).count())
    }

    pub(crate) fn reload(&mut self, data: &SceneryData) {
        self.rows = data.variations.iter().map(FormRow::from_variation).collect();
        self.active_index = data.active_variation_index;
    }
}

impl SceneryManager {
    /// Opens the edit form of `scene_id`. Without persisted data the form
    /// holds a single Default row mirroring the current background.
    pub fn prepare_form<H: SceneryHost>(
        &self,
        host: &H,
        scene_id: &str,
    ) -> Result<VariationForm, SceneryError> {
        let scene = host
            .scene(scene_id)
            .ok_or_else(|| SceneryError::SceneNotFound {
                scene_id: scene_id.to_string(),
            })?;
        let viewed = is_viewed(host, scene_id);

        let data = load_data(host, scene_id).unwrap_or_else(|| {
            let current = if viewed {
                host.canvas_background()
                    .unwrap_or_else(|| scene.background_src().to_string())
            } else {
                scene.background_src().to_string()
            };
            SceneryData::default_for(&current)
        });

        let selection = self.config.variation_managed_selection();
        let cards = data
            .variations
            .iter()
            .enumerate()
            .map(|(index, variation)| {
                let is_active = index == data.active_variation_index;
                let live = (is_active && viewed)
                    .then(|| capture_scene_elements(Some(scene), &selection))
                    .flatten();
                let is_live_capture = live.is_some();
                let shown = live.as_ref().or(variation.scene_data.as_ref());
                VariationCard {
                    index,
                    name: variation.name.clone(),
                    gm_background: variation.gm_background.clone(),
                    pl_background: variation.pl_background.clone(),
                    is_default: index == 0,
                    is_active,
                    is_empty: variation.gm_background.is_empty()
                        && variation.pl_background.is_empty(),
                    has_scene_data: shown.is_some_and(|snapshot| snapshot.has_data()),
                    scene_data_summary: shown.map(|snapshot| snapshot.summary()),
                    is_live_capture,
                }
            })
            .collect();

        debug!(
            scene_id,
            variations = data.variations.len(),
            active = data.active_variation_index,
            "variation_form_prepared"
        );
        let mut form = VariationForm {
            scene_id: scene_id.to_string(),
            rows: Vec::new(),
            active_index: 0,
            cards,
        };
        form.reload(&data);
        Ok(form)
    }

    /// Scans the Default row's directory and appends the discovered rows.
    /// Returns how many rows were added.
    pub fn scan_into_form<H: SceneryHost>(
        &self,
        host: &mut H,
        form: &mut VariationForm,
    ) -> Result<usize, SceneryError> {
        let Some(default) = form.rows.first() else {
            return Ok(0);
        };
        if default.gm_background.is_empty() {
            return Ok(0);
        }

        let request = ScanRequest {
            seed_path: default.gm_background.clone(),
            existing_paths: form.existing_paths(),
            gm_tokens: self.config.gm_tokens(),
            player_tokens: self.config.player_tokens(),
            scene_background: default.pl_background.clone(),
        };
        let outcome = match scan_variations(host, &request) {
            Ok(outcome) => outcome,
            Err(err) => return reject(host, err.into()),
        };

        if let Some(gm_background) = outcome.default_gm_background {
            if let Some(default) = form.rows.first_mut() {
                default.gm_background = gm_background;
            }
        }
        form.remove_blank_variations();
        let added = outcome.variations.len();
        for variation in outcome.variations {
            form.add_variation(
                &variation.name,
                &variation.gm_background,
                &variation.pl_background,
            );
        }
        Ok(added)
    }

    /// Persists the form without closing it. Returns `false` when no row is
    /// complete enough to save.
    pub fn sync_form<H: SceneryHost>(
        &self,
        host: &mut H,
        form: &mut VariationForm,
    ) -> Result<bool, SceneryError> {
        let existing = load_data(host, &form.scene_id);
        let rows = form.parse_rows(existing.as_ref());
        let mut data = SceneryData::from_complete_rows(rows, form.active_index);
        if data.variations.is_empty() {
            debug!(scene_id = %form.scene_id, "variation_form_sync_skipped");
            return Ok(false);
        }
        self.lock_default_to_scene(host, &form.scene_id, &mut data);
        if let Err(err) = persist(host, &form.scene_id, &data) {
            return reject(host, err);
        }
        form.reload(&data);
        debug!(scene_id = %form.scene_id, variations = data.variations.len(), "variation_form_synced");
        Ok(true)
    }

    /// Validates and persists the form, then shows the result on the canvas
    /// when the scene is on display.
    pub fn submit_form<H: SceneryHost>(
        &mut self,
        host: &mut H,
        form: &mut VariationForm,
    ) -> Result<SceneryData, SceneryError> {
        let existing = load_data(host, &form.scene_id);
        let rows = form.parse_rows(existing.as_ref());
        let mut data = match SceneryData::from_rows(rows, form.active_index) {
            Ok(data) => data,
            Err(err) => return reject(host, err),
        };
        self.lock_default_to_scene(host, &form.scene_id, &mut data);
        if let Err(err) = persist(host, &form.scene_id, &data) {
            return reject(host, err);
        }
        form.reload(&data);
        info!(
            scene_id = %form.scene_id,
            variations = data.variations.len(),
            active = data.active_variation_index,
            "variation_form_submitted"
        );

        if is_viewed(host, &form.scene_id) {
            let image = data.user_image(host.is_gm());
            if image.is_empty() {
                self.restore_active_variation(host, &form.scene_id, &data);
            } else {
                self.set_image(host, &image, true);
            }
        }
        Ok(data)
    }

    /// Removes the row at `index` after confirmation. Returns whether a
    /// variation was deleted.
    pub fn delete_variation<H: SceneryHost>(
        &self,
        host: &mut H,
        form: &mut VariationForm,
        index: usize,
    ) -> Result<bool, SceneryError> {
        if index == 0 {
            return reject(host, SceneryError::DefaultVariationLocked);
        }
        if index >= form.rows.len() {
            return Ok(false);
        }
        let Some(index) = form.persisted_index(index) else {
            // Never saved: dropping the row from the form is enough.
            form.rows.remove(index);
            if form.active_index == index {
                form.active_index = 0;
            } else if form.active_index > index {
                form.active_index -= 1;
            }
            self.sync_form(host, form)?;
            return Ok(false);
        };
        if index == 0 {
            return reject(host, SceneryError::DefaultVariationLocked);
        }
        self.sync_form(host, form)?;

        let Some(mut data) = load_data(host, &form.scene_id) else {
            return Ok(false);
        };
        let Some(variation) = data.variations.get(index) else {
            return Ok(false);
        };

        if !variation.name.is_empty()
            || !variation.gm_background.is_empty()
            || variation.has_scene_data()
        {
            let display_name = if variation.name.is_empty() {
                variation.gm_background.as_str()
            } else {
                variation.name.as_str()
            };
            let content = format!("Delete variation \"{display_name}\"?");
            if !host.confirm("Delete Variation", &content) {
                return Ok(false);
            }
        }

        let removed = data.variations.remove(index);
        if data.active_variation_index >= index && data.active_variation_index > 0 {
            data.active_variation_index -= 1;
        }
        if let Err(err) = persist(host, &form.scene_id, &data) {
            return reject(host, err);
        }
        form.reload(&data);
        info!(scene_id = %form.scene_id, variation = %removed.name, "variation_deleted");
        Ok(true)
    }

    fn lock_default_to_scene<H: SceneryHost>(
        &self,
        host: &H,
        scene_id: &str,
        data: &mut SceneryData,
    ) {
        if let Some(scene) = host.scene(scene_id) {
            data.lock_default_player_background(scene.background_src());
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::data::read_scenery_data;
    use crate::elements::ElementKind;
    use crate::host::memory::{MemoryHost, MemoryScene};
    use crate::host::{ElementCollections, Notice};
    use crate::manager::fixtures::{
        host_with, records, scene, scene_mut, snapshot, three_variations, SCENE_ID,
    };
    use crate::SceneryConfig;

    use super::*;

    fn manager() -> SceneryManager {
        SceneryManager::new(SceneryConfig::default())
    }

    #[test]
    fn form_without_data_mirrors_current_background() {
        let host = MemoryHost::viewing(MemoryScene::new(SCENE_ID, "Keep", " maps/keep.webp,"));
        let form = manager().prepare_form(&host, SCENE_ID).expect("form");
        assert_eq!(form.rows, vec![FormRow::new("Default", "maps/keep.webp", "maps/keep.webp")]);
        assert_eq!(form.cards.len(), 1);
        assert!(form.cards[0].is_default);
        assert!(form.cards[0].is_live_capture);
        assert_eq!(form.cards[0].scene_data_summary.as_deref(), Some("No elements"));
    }

    #[test]
    fn cards_use_live_capture_for_active_variation_only() {
        let mut data = three_variations();
        data.variations[2].scene_data = Some(snapshot(ElementKind::Walls, 2));
        let mut host = host_with(&data);
        scene_mut(&mut host).seed(ElementKind::Lights, records(3));
        scene_mut(&mut host).seed(ElementKind::Drawings, records(1));

        let form = manager().prepare_form(&host, SCENE_ID).expect("form");
        let active = &form.cards[0];
        assert!(active.is_active && active.is_live_capture);
        assert_eq!(active.scene_data_summary.as_deref(), Some("3 lights"));
        assert!(active.has_scene_data);

        let night = &form.cards[1];
        assert!(!night.has_scene_data);
        assert_eq!(night.scene_data_summary, None);

        let ruins = &form.cards[2];
        assert!(!ruins.is_live_capture);
        assert_eq!(ruins.scene_data_summary.as_deref(), Some("2 walls"));
    }

    #[test]
    fn add_and_remove_blank_rows() {
        let host = host_with(&three_variations());
        let mut form = manager().prepare_form(&host, SCENE_ID).expect("form");
        form.add_variation("", "", "");
        form.add_variation("Snow", "maps/keep_snow.webp", "");
        assert_eq!(form.rows[4].pl_background, "maps/keep_snow.webp");

        form.remove_blank_variations();
        assert_eq!(form.rows.len(), 4);
        assert_eq!(form.rows[3].name, "Snow");
    }

    #[test]
    fn scan_appends_discovered_rows() {
        let mut host = host_with(&three_variations());
        host.add_directory(
            "maps",
            &[
                "maps/keep.webp",
                "maps/keep_gm.webp",
                "maps/keep_night.webp",
                "maps/keep_night_gm.webp",
                "maps/keep_snow.webp",
            ],
        );
        let manager = manager();
        let mut form = manager.prepare_form(&host, SCENE_ID).expect("form");
        form.add_variation("", "", "");

        let added = manager.scan_into_form(&mut host, &mut form).expect("scan");
        assert_eq!(added, 1);
        assert_eq!(form.rows.len(), 4);
        assert_eq!(form.rows[0].gm_background, "maps/keep_gm.webp");
        assert_eq!(form.rows[3], FormRow::new("snow", "maps/keep_snow.webp", "maps/keep_snow.webp"));
    }

    #[test]
    fn submit_preserves_snapshots_and_locks_default_player_image() {
        let mut data = three_variations();
        data.variations[2].scene_data = Some(snapshot(ElementKind::Tiles, 3));
        let mut host = host_with(&data);
        let mut manager = manager();
        manager.on_canvas_init(&mut host);
        manager.on_canvas_ready(&mut host);

        let mut form = manager.prepare_form(&host, SCENE_ID).expect("form");
        form.rows[0].pl_background = "maps/other.webp".to_string();
        form.rows[2].name = "  Ruined Keep ".to_string();
        form.rows[2].gm_background = "maps/keep_ruins.webp, ".to_string();
        form.add_variation("Unfinished", "", "");
        form.active_index = 2;

        let saved = manager.submit_form(&mut host, &mut form).expect("submit");
        assert_eq!(saved.variations.len(), 3);
        assert_eq!(saved.variations[0].pl_background, "maps/keep.webp");
        assert_eq!(saved.variations[2].name, "Ruined Keep");
        assert_eq!(
            saved.variations[2]
                .scene_data
                .as_ref()
                .map(|snapshot| snapshot.tiles.len()),
            Some(3)
        );
        let persisted = read_scenery_data(scene(&host)).expect("data");
        assert_eq!(persisted.active_variation_index, 2);
        assert_eq!(persisted.variations[1], saved.variations[1]);
        // The outgoing Default variation was captured on the switch.
        assert!(persisted.variations[0].scene_data.is_some());
        assert_eq!(
            host.displayed_background.as_deref(),
            Some("maps/keep_ruins.webp")
        );
        assert_eq!(scene(&host).element_count(ElementKind::Tiles), 3);
    }

    #[test]
    fn submit_keeps_selected_row_active_after_blank_row_drops() {
        let mut host = host_with(&three_variations());
        let mut manager = manager();
        manager.on_canvas_init(&mut host);
        manager.on_canvas_ready(&mut host);

        let mut form = manager.prepare_form(&host, SCENE_ID).expect("form");
        form.add_variation("Snow", "maps/keep_snow.webp", "");
        form.rows[1].gm_background.clear();
        form.active_index = 2;

        let saved = manager.submit_form(&mut host, &mut form).expect("submit");
        let names: Vec<&str> = saved.variations.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["Default", "Ruins", "Snow"]);
        assert_eq!(saved.active_variation_index, 1);
        assert_eq!(form.active_index, 1);
        assert_eq!(
            host.displayed_background.as_deref(),
            Some("maps/keep_ruins.webp")
        );
    }

    #[test]
    fn submit_falls_back_to_default_when_active_row_is_blank() {
        let mut host = host_with(&three_variations());
        let mut manager = manager();
        let mut form = manager.prepare_form(&host, SCENE_ID).expect("form");
        form.rows[1].gm_background.clear();
        form.active_index = 1;

        let saved = manager.submit_form(&mut host, &mut form).expect("submit");
        assert_eq!(saved.variations.len(), 2);
        assert_eq!(saved.active_variation_index, 0);
    }

    #[test]
    fn submit_rejects_missing_default_background() {
        let mut host = host_with(&three_variations());
        let mut manager = manager();
        let mut form = manager.prepare_form(&host, SCENE_ID).expect("form");
        form.rows[0].gm_background.clear();

        let error = manager.submit_form(&mut host, &mut form).expect_err("invalid");
        assert!(matches!(error, SceneryError::MissingDefaultBackground));
        assert_eq!(host.notices_of(Notice::Warn).len(), 1);
        assert_eq!(scene(&host).flag_writes, 0);
    }

    #[test]
    fn sync_skips_forms_without_valid_rows() {
        let mut host = host_with(&three_variations());
        let manager = manager();
        let mut form = manager.prepare_form(&host, SCENE_ID).expect("form");
        for row in &mut form.rows {
            row.gm_background.clear();
        }
        assert!(!manager.sync_form(&mut host, &mut form).expect("sync"));
        assert_eq!(scene(&host).flag_writes, 0);
    }

    #[test]
    fn delete_shifts_active_index_and_respects_confirmation() {
        let mut data = three_variations();
        data.active_variation_index = 2;
        let mut host = host_with(&data);
        let manager = manager();
        let mut form = manager.prepare_form(&host, SCENE_ID).expect("form");

        host.confirm_answer = false;
        assert!(!manager.delete_variation(&mut host, &mut form, 1).expect("declined"));
        assert_eq!(form.rows.len(), 3);

        host.confirm_answer = true;
        assert!(manager.delete_variation(&mut host, &mut form, 1).expect("deleted"));
        let saved = read_scenery_data(scene(&host)).expect("data");
        assert_eq!(saved.variations.len(), 2);
        assert_eq!(saved.active_variation_index, 1);
        assert_eq!(saved.variations[1].name, "Ruins");
        assert_eq!(form.rows.len(), 2);

        let error = manager
            .delete_variation(&mut host, &mut form, 0)
            .expect_err("default");
        assert!(matches!(error, SceneryError::DefaultVariationLocked));
    }

    #[test]
    fn delete_of_unsaved_row_only_drops_it() {
        let mut host = host_with(&three_variations());
        let manager = manager();
        let mut form = manager.prepare_form(&host, SCENE_ID).expect("form");
        form.add_variation("Draft", "", "");

        assert!(!manager.delete_variation(&mut host, &mut form, 3).expect("delete"));
        assert_eq!(form.rows.len(), 3);
    }

    #[test]
    fn delete_targets_row_after_blank_row() {
        let mut host = host_with(&three_variations());
        let manager = manager();
        let mut form = manager.prepare_form(&host, SCENE_ID).expect("form");
        form.add_variation("Snow", "maps/keep_snow.webp", "");
        form.rows[1].gm_background.clear();

        assert!(manager.delete_variation(&mut host, &mut form, 2).expect("delete"));
        let persisted = read_scenery_data(scene(&host)).expect("data");
        let names: Vec<&str> = persisted.variations.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["Default", "Snow"]);
    }
}
