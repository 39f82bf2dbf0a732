use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::data::{read_scenery_data, SceneryData, Variation};
use crate::elements::{
    capture_scene_elements, restore_scene_elements, ElementSelection, SceneElementSnapshot,
};
use crate::host::{delta_has_property, ElementCollections, Notice, SceneDocument, SceneryHost};
use crate::paths::{clean_path, clean_path_value};
use crate::{FLAG_KEY, MODULE_ID};

use super::{is_viewed, load_data, persist, SceneryManager, SetImageOutcome};

const LOADING_NOTICE: &str = "Loading...";
const SWAP_FAILED_NOTICE: &str = "Failed to update background image";

impl SceneryManager {
    /// Puts `image` on the canvas of the viewed scene.
    ///
    /// With `draw == false` the image is only queued for the next canvas-ready
    /// pass. A drawn switch made after the first canvas-ready pass saves the
    /// managed elements of the outgoing variation (GM only) and restores the
    /// incoming one; during the fresh load the persisted elements are kept.
    pub fn set_image<H: SceneryHost>(
        &mut self,
        host: &mut H,
        image: &str,
        draw: bool,
    ) -> SetImageOutcome {
        let Some(scene_id) = host.viewed_scene_id() else {
            return SetImageOutcome::NoScene;
        };
        if self.loading_image.as_deref() == Some(image) {
            debug!(image, "background_already_loading");
            return SetImageOutcome::AlreadyLoading;
        }

        let live_background = host.canvas_background().unwrap_or_default();
        let state = self.transient_mut(&scene_id);
        let current = state
            .custom_background
            .clone()
            .unwrap_or_else(|| live_background.clone());

        if !draw {
            state
                .original_background
                .get_or_insert_with(|| live_background.clone());
            state.pending_background = Some(image.to_string());
            state.custom_background = Some(image.to_string());
            debug!(scene_id = %scene_id, image, "background_queued");
            return SetImageOutcome::Queued;
        }

        if !host.canvas_ready() {
            return SetImageOutcome::CanvasNotReady;
        }

        self.loading_image = Some(image.to_string());
        let outcome = self.apply_image(host, &scene_id, image, &current, &live_background);
        self.loading_image = None;
        outcome
    }

    fn apply_image<H: SceneryHost>(
        &mut self,
        host: &mut H,
        scene_id: &str,
        image: &str,
        current: &str,
        live_background: &str,
    ) -> SetImageOutcome {
        let state = self.transient_mut(scene_id);
        state
            .original_background
            .get_or_insert_with(|| live_background.to_string());
        let fresh_load = !state.initialized;
        let switched = clean_path(current) != clean_path(image);

        if switched && host.is_gm() && !fresh_load {
            self.save_elements_for_background(host, scene_id, current);
        } else if switched && fresh_load {
            debug!(scene_id, "fresh_load_skips_element_save");
        }

        let texture = match host.load_texture(image) {
            Ok(texture) => texture,
            Err(err) => {
                error!(scene_id, image, error = %err, "background_swap_failed");
                host.notify(Notice::Error, SWAP_FAILED_NOTICE);
                return SetImageOutcome::Failed;
            }
        };
        host.swap_background(texture, image);

        let state = self.transient_mut(scene_id);
        state.custom_background = Some(image.to_string());
        if switched && state.pending_background.is_none() {
            host.notify(Notice::Info, LOADING_NOTICE);
        }

        let restored = (switched && !fresh_load)
            .then(|| self.restore_elements_for_background(host, scene_id, image));
        info!(scene_id, image, switched, fresh_load, "background_applied");
        SetImageOutcome::Applied { switched, restored }
    }

    /// Captures the managed elements into the variation using `background`.
    pub(crate) fn save_elements_for_background<H: SceneryHost>(
        &self,
        host: &mut H,
        scene_id: &str,
        background: &str,
    ) -> bool {
        let selection = self.config.variation_managed_selection();
        let Some(scene) = host.scene_mut(scene_id) else {
            return false;
        };
        let Some(mut data) = read_scenery_data(scene) else {
            return false;
        };
        let Some(index) = data.position_of_background(background) else {
            warn!(
                scene_id,
                background = %clean_path(background),
                "variation_not_found_for_save"
            );
            return false;
        };
        let Some(snapshot) = capture_scene_elements(Some(&*scene), &selection) else {
            return false;
        };

        let summary = snapshot.summary();
        data.variations[index].scene_data = Some(snapshot);
        match crate::data::write_scenery_data(scene, &data) {
            Ok(()) => {
                info!(
                    scene_id,
                    variation = %data.variations[index].name,
                    summary = %summary,
                    "variation_elements_saved"
                );
                true
            }
            Err(err) => {
                error!(scene_id, error = %err, "variation_elements_save_failed");
                false
            }
        }
    }

    /// Hydrates the live scene from the variation using `background`.
    pub(crate) fn restore_elements_for_background<H: SceneryHost>(
        &self,
        host: &mut H,
        scene_id: &str,
        background: &str,
    ) -> bool {
        let selection = self.config.variation_managed_selection();
        let Some(scene) = host.scene_mut(scene_id) else {
            return false;
        };
        let Some(data) = read_scenery_data(scene) else {
            return false;
        };
        let Some(index) = data.position_of_background(background) else {
            warn!(
                scene_id,
                background = %clean_path(background),
                "variation_not_found_for_restore"
            );
            return false;
        };
        restore_variation(scene, &data.variations[index], index == 0, &selection)
    }

    /// Hydrates the live scene from the active variation by index.
    pub(crate) fn restore_active_variation<H: SceneryHost>(
        &self,
        host: &mut H,
        scene_id: &str,
        data: &SceneryData,
    ) -> bool {
        let selection = self.config.variation_managed_selection();
        let Some(variation) = data.active() else {
            return false;
        };
        let Some(scene) = host.scene_mut(scene_id) else {
            return false;
        };
        restore_variation(
            scene,
            variation,
            data.active_variation_index == 0,
            &selection,
        )
    }

    /// Queues the user's image of the viewed scene before the canvas draws.
    pub fn on_canvas_init<H: SceneryHost>(&mut self, host: &mut H) {
        let Some(scene_id) = host.viewed_scene_id() else {
            return;
        };
        let Some(scene) = host.scene(&scene_id) else {
            return;
        };
        let Some(data) = read_scenery_data(scene) else {
            return;
        };

        let current = clean_path(scene.background_src());
        let expected = data
            .variations
            .first()
            .map(|default| clean_path(&default.gm_background))
            .unwrap_or_default();
        let pending = self
            .transient(&scene_id)
            .is_some_and(|state| state.pending_background.is_some());
        if current != expected && !pending {
            info!(
                scene_id = %scene_id,
                current = %current,
                expected = %expected,
                "background_override_skipped"
            );
            return;
        }

        let image = data.user_image(host.is_gm());
        if !image.is_empty() {
            self.set_image(host, &image, false);
        }
    }

    /// Applies the queued image, or the user's image when the canvas shows
    /// something else, then ends the fresh-load window.
    pub fn on_canvas_ready<H: SceneryHost>(&mut self, host: &mut H) {
        let Some(scene_id) = host.viewed_scene_id() else {
            return;
        };

        let pending = self.transient_mut(&scene_id).pending_background.take();
        if let Some(pending) = pending {
            debug!(scene_id = %scene_id, image = %pending, "pending_background_applied");
            self.set_image(host, &pending, true);
        } else if let Some(data) = load_data(host, &scene_id) {
            let current = clean_path(&host.canvas_background().unwrap_or_default());
            let image = data.user_image(host.is_gm());
            if !image.is_empty() && image != current {
                self.set_image(host, &image, true);
            }
        }

        self.transient_mut(&scene_id).initialized = true;
        debug!(scene_id = %scene_id, "scene_initialized");
    }

    /// Reacts to a host-side update of `scene_id` described by `delta`.
    pub fn on_scene_updated<H: SceneryHost>(&mut self, host: &mut H, scene_id: &str, delta: &Value) {
        host.refresh_scene_directory();
        let viewed = is_viewed(host, scene_id);

        if delta_has_property(delta, &["background", "src"]) {
            if let Some(data) = load_data(host, scene_id) {
                let new_background = clean_path_value(delta.pointer("/background/src"));
                if new_background.is_empty() {
                    warn!(scene_id, "scene_background_cleared_ignored");
                    return;
                }
                let updated = data.with_scene_background(&new_background);
                info!(scene_id, background = %new_background, "scene_background_followed");
                if let Err(err) = persist(host, scene_id, &updated) {
                    error!(scene_id, error = %err, "scene_background_follow_failed");
                }
                if viewed {
                    let image = updated.user_image(host.is_gm());
                    if !image.is_empty() {
                        self.set_image(host, &image, true);
                    }
                }
                return;
            }
        }

        if !viewed || !delta_has_property(delta, &["flags", MODULE_ID, FLAG_KEY]) {
            return;
        }
        if let Some(data) = load_data(host, scene_id) {
            let image = data.user_image(host.is_gm());
            if !image.is_empty() {
                self.set_image(host, &image, true);
            }
        }
    }

    /// Puts the pre-override background back on the canvas and forgets the
    /// tracked backgrounds. Returns whether a swap happened.
    pub fn reset_background<H: SceneryHost>(&mut self, host: &mut H) -> bool {
        let Some(scene_id) = host.viewed_scene_id() else {
            return false;
        };
        let Some(original) = self
            .transient(&scene_id)
            .and_then(|state| state.original_background.clone())
        else {
            return false;
        };
        if host.canvas_background().as_deref() == Some(original.as_str()) {
            debug!(scene_id = %scene_id, "background_already_original");
            return false;
        }

        let swapped = match host.load_texture(&original) {
            Ok(texture) => {
                host.swap_background(texture, &original);
                true
            }
            Err(err) => {
                error!(scene_id = %scene_id, error = %err, "background_reset_failed");
                false
            }
        };

        let state = self.transient_mut(&scene_id);
        state.original_background = None;
        state.custom_background = None;
        swapped
    }
}

/// The Default variation without a snapshot keeps whatever is live; any other
/// variation without one restores an empty scene.
fn restore_variation<S>(
    scene: &mut S,
    variation: &Variation,
    is_default: bool,
    selection: &ElementSelection,
) -> bool
where
    S: ElementCollections + ?Sized,
{
    if is_default && variation.scene_data.is_none() {
        debug!("default_variation_keeps_live_elements");
        return true;
    }
    let empty = SceneElementSnapshot::default();
    let snapshot = variation.scene_data.as_ref().unwrap_or(&empty);
    debug!(
        variation = %variation.name,
        summary = %snapshot.summary(),
        "variation_elements_restoring"
    );
    restore_scene_elements(scene, snapshot, selection)
}
