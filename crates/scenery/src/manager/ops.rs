use tracing::info;

use crate::elements::{capture_scene_elements, ElementKind, ElementSelection};
use crate::error::SceneryError;
use crate::host::{Notice, SceneryHost};

use super::{is_viewed, load_data, persist, reject, SceneryManager, VariationForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyRequest {
    pub source_index: Option<usize>,
    pub target_index: usize,
    /// Element types copied from the source.
    pub selection: ElementSelection,
    /// Empty every unselected type on the target.
    pub reset_unselected: bool,
}

/// A variation offered as copy source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySource {
    pub index: usize,
    pub name: String,
    pub summary: String,
}

impl SceneryManager {
    /// Variations that can feed a copy into `target_index`: complete ones
    /// other than the target that hold element data. The active variation of
    /// the displayed scene is judged by its live elements.
    pub fn copy_sources<H: SceneryHost>(
        &self,
        host: &H,
        scene_id: &str,
        target_index: usize,
    ) -> Vec<CopySource> {
        let Some(data) = load_data(host, scene_id) else {
            return Vec::new();
        };
        let live = is_viewed(host, scene_id)
            .then(|| {
                capture_scene_elements(
                    host.scene(scene_id),
                    &self.config.variation_managed_selection(),
                )
            })
            .flatten();

        data.variations
            .iter()
            .enumerate()
            .filter(|(index, variation)| {
                *index != target_index && !variation.gm_background.is_empty()
            })
            .filter_map(|(index, variation)| {
                let snapshot = match (index == data.active_variation_index, live.as_ref()) {
                    (true, Some(live)) => live,
                    _ => variation.scene_data.as_ref()?,
                };
                snapshot.has_data().then(|| CopySource {
                    index,
                    name: variation.name.clone(),
                    summary: snapshot.summary(),
                })
            })
            .collect()
    }

    /// Copies the selected element types of one variation into another and
    /// persists the result. Returns the target's new summary.
    pub fn copy_elements<H: SceneryHost>(
        &self,
        host: &mut H,
        form: &mut VariationForm,
        request: &CopyRequest,
    ) -> Result<String, SceneryError> {
        if request.target_index == 0 {
            return reject(host, SceneryError::DefaultVariationLocked);
        }
        // Request indices are form rows; the sync below renumbers them.
        let source_position = request
            .source_index
            .map(|row| form.persisted_index(row).ok_or(row));
        let target_position = form.persisted_index(request.target_index);
        self.sync_form(host, form)?;

        let Some(source_position) = source_position else {
            return reject(host, SceneryError::NoSourceVariation);
        };
        let scene_id = form.scene_id.clone();
        let Some(mut data) = load_data(host, &scene_id) else {
            return reject(host, SceneryError::NoSceneryData { scene_id });
        };
        let source_index = match source_position {
            Ok(index) => index,
            Err(row) => return reject(host, SceneryError::VariationNotFound { index: row }),
        };
        let Some(source) = data.variations.get(source_index) else {
            return reject(host, SceneryError::VariationNotFound { index: source_index });
        };

        let source_data = if source_index == data.active_variation_index
            && is_viewed(host, &scene_id)
        {
            capture_scene_elements(
                host.scene(&scene_id),
                &self.config.variation_managed_selection(),
            )
        } else {
            source.scene_data.clone()
        };
        let Some(source_data) = source_data else {
            let name = source.name.clone();
            return reject(host, SceneryError::SourceHasNoData { name });
        };
        if !request.selection.any() {
            return reject(host, SceneryError::NoElementTypeSelected);
        }

        let target = match target_position {
            Some(0) => return reject(host, SceneryError::DefaultVariationLocked),
            Some(index) => data.variations.get_mut(index),
            None => None,
        };
        let Some(target) = target else {
            return reject(
                host,
                SceneryError::VariationNotFound {
                    index: request.target_index,
                },
            );
        };
        let target_data = target.scene_data.get_or_insert_with(Default::default);
        for kind in ElementKind::ALL {
            if request.selection.contains(kind) {
                *target_data.records_mut(kind) = source_data.records(kind).to_vec();
            } else if request.reset_unselected {
                target_data.records_mut(kind).clear();
            }
        }
        let summary = target_data.summary();
        let target_name = target.name.clone();

        if let Err(err) = persist(host, &scene_id, &data) {
            return reject(host, err);
        }
        form.reload(&data);
        info!(
            scene_id = %scene_id,
            source = source_index,
            target = %target_name,
            summary = %summary,
            "variation_elements_copied"
        );
        host.notify(Notice::Info, &format!("Copied: {summary}"));
        Ok(summary)
    }

    /// Deletes the snapshot of the variation at `index` after confirmation,
    /// so the next switch to it restores an empty scene. Returns whether a
    /// snapshot was removed.
    pub fn reset_scene_data<H: SceneryHost>(
        &self,
        host: &mut H,
        form: &mut VariationForm,
        index: usize,
    ) -> Result<bool, SceneryError> {
        if index == 0 {
            return reject(host, SceneryError::DefaultVariationLocked);
        }
        let position = form.persisted_index(index);
        self.sync_form(host, form)?;

        let Some(index) = position else {
            return Ok(false);
        };
        if index == 0 {
            return reject(host, SceneryError::DefaultVariationLocked);
        }
        let Some(mut data) = load_data(host, &form.scene_id) else {
            return Ok(false);
        };
        let Some(variation) = data.variations.get_mut(index) else {
            return Ok(false);
        };
        if variation.scene_data.is_none() {
            return Ok(false);
        }
        if !host.confirm(
            "Reset Scene Data",
            "Remove all captured scene elements for this variation?",
        ) {
            return Ok(false);
        }

        variation.scene_data = None;
        let name = variation.name.clone();
        if let Err(err) = persist(host, &form.scene_id, &data) {
            return reject(host, err);
        }
        form.reload(&data);
        info!(scene_id = %form.scene_id, variation = %name, "variation_scene_data_reset");
        host.notify(Notice::Info, "Reset scene data");
        Ok(true)
    }
}
