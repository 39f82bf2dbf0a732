use tracing::debug;

use crate::host::ElementCollections;

use super::{ElementCounts, ElementKind, ElementSelection, SceneElementSnapshot};

/// Serializes the selected element collections of `scene`. Unselected types
/// come back as empty arrays. Read-only; `None` when there is no scene.
pub fn capture_scene_elements<S>(
    scene: Option<&S>,
    selection: &ElementSelection,
) -> Option<SceneElementSnapshot>
where
    S: ElementCollections + ?Sized,
{
    let scene = scene?;
    let mut snapshot = SceneElementSnapshot::default();
    for kind in selection.kinds() {
        *snapshot.records_mut(kind) = scene.element_records(kind);
    }
    debug!(summary = %snapshot.summary(), "scene_elements_captured");
    Some(snapshot)
}

/// Live element counts of every type, selected or not.
pub fn live_counts<S>(scene: Option<&S>) -> ElementCounts
where
    S: ElementCollections + ?Sized,
{
    let mut counts = ElementCounts::default();
    if let Some(scene) = scene {
        for kind in ElementKind::ALL {
            counts.set(kind, scene.element_count(kind));
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::host::memory::MemoryScene;

    #[test]
    fn capture_only_reads_selected_types() {
        let mut scene = MemoryScene::new("s1", "Scene", "maps/forest.webp");
        scene.seed(ElementKind::Lights, vec![json!({ "x": 1 }), json!({ "x": 2 })]);
        scene.seed(ElementKind::Walls, vec![json!({ "c": [0, 0, 10, 10] })]);

        let selection = ElementSelection::from_kinds([ElementKind::Lights]);
        let snapshot = capture_scene_elements(Some(&scene), &selection).expect("snapshot");

        assert_eq!(snapshot.lights.len(), 2);
        assert!(snapshot.walls.is_empty());
        assert!(snapshot.lights.iter().all(|record| record.contains_key("_id")));
        assert_eq!(scene.element_count(ElementKind::Walls), 1);
    }

    #[test]
    fn capture_without_scene_is_none() {
        assert!(capture_scene_elements::<MemoryScene>(None, &ElementSelection::all()).is_none());
        assert_eq!(live_counts::<MemoryScene>(None).total(), 0);
    }
}
