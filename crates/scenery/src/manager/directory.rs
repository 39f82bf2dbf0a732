use tracing::debug;

use crate::data::read_scenery_data;
use crate::host::{DirectoryView, SceneryHost};

use super::SceneryManager;

impl SceneryManager {
    /// Badges every listed scene that has variations beyond the Default one
    /// with its variation count, and gives GMs the header action when it is
    /// enabled. Returns the number of badges added.
    pub fn on_directory_rendered<H, V>(&self, host: &H, view: &mut V) -> usize
    where
        H: SceneryHost,
        V: DirectoryView + ?Sized,
    {
        if self.config.show_header_button && host.is_gm() && !view.has_header_action() {
            view.add_header_action();
            debug!("scene_directory_header_action_added");
        }
        if !self.config.show_variations_label {
            return 0;
        }

        let mut badges = 0usize;
        for scene_id in host.scene_ids() {
            if !view.has_entry(&scene_id) {
                continue;
            }
            let Some(data) = host.scene(&scene_id).and_then(read_scenery_data) else {
                continue;
            };
            if data.variations.len() > 1 {
                view.prepend_badge(&scene_id, &data.variations.len().to_string());
                badges += 1;
            }
        }
        debug!(badges, "scene_directory_badged");
        badges
    }

    /// Scene the header action opens: the viewed one, else the highlighted
    /// entry, else the first scene.
    pub fn header_action_scene<H, V>(&self, host: &H, view: &V) -> Option<String>
    where
        H: SceneryHost,
        V: DirectoryView + ?Sized,
    {
        host.viewed_scene_id()
            .or_else(|| view.selected_entry())
            .or_else(|| host.scene_ids().into_iter().next())
    }
}
