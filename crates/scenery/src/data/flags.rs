use serde_json::Value;
use tracing::{debug, warn};

use crate::error::SceneryError;
use crate::host::FlagStore;
use crate::{FLAG_KEY, MODULE_ID};

use super::legacy::{migrate_legacy, LegacySceneryData};
use super::types::SceneryData;

/// Top-level legacy fields nulled on every write so merge-style stores drop
/// them.
pub const LEGACY_KEYS: [&str; 4] = ["bg", "gm", "pl", "defaultSceneData"];

/// Reads the persisted variation data, upgrading the legacy schema on the
/// fly. Unreadable blobs and empty variation lists read as absent.
pub fn read_scenery_data<S>(store: &S) -> Option<SceneryData>
where
    S: FlagStore + ?Sized,
{
    let raw = store.get_flag(MODULE_ID, FLAG_KEY)?;
    if raw.is_null() {
        return None;
    }

    let data = if LegacySceneryData::detect(&raw) {
        match serde_path_to_error::deserialize::<_, LegacySceneryData>(raw) {
            Ok(legacy) => {
                debug!("scenery_data_migrated_from_legacy");
                migrate_legacy(legacy)
            }
            Err(error) => {
                warn!(path = %error.path(), error = %error.inner(), "scenery_legacy_data_unreadable");
                return None;
            }
        }
    } else {
        match serde_path_to_error::deserialize::<_, SceneryData>(raw) {
            Ok(data) => data,
            Err(error) => {
                warn!(path = %error.path(), error = %error.inner(), "scenery_data_unreadable");
                return None;
            }
        }
    };

    if data.variations.is_empty() {
        return None;
    }
    Some(data)
}

/// Persists `data` in the current schema with the active index clamped.
pub fn write_scenery_data<S>(store: &mut S, data: &SceneryData) -> Result<(), SceneryError>
where
    S: FlagStore + ?Sized,
{
    if data.variations.is_empty() {
        return Err(SceneryError::NoValidVariations);
    }
    let mut data = data.clone();
    data.clamp_active();

    let mut value = serde_json::to_value(&data).map_err(SceneryError::Encode)?;
    if let Value::Object(map) = &mut value {
        for key in LEGACY_KEYS {
            map.insert(key.to_string(), Value::Null);
        }
    }
    store.set_flag(MODULE_ID, FLAG_KEY, value)?;
    debug!(
        variations = data.variations.len(),
        active = data.active_variation_index,
        "scenery_data_written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::data::Variation;
    use crate::host::memory::MemoryScene;

    #[test]
    fn legacy_blob_reads_as_current_schema_and_writes_back_clean() {
        let mut scene = MemoryScene::new("s1", "Scene", "maps/a.webp");
        scene
            .set_flag(
                MODULE_ID,
                FLAG_KEY,
                json!({ "bg": "maps/a.webp", "gm": "maps/a.webp", "pl": "maps/a.webp", "variations": [] }),
            )
            .expect("seed");

        let data = read_scenery_data(&scene).expect("data");
        assert_eq!(data.variations.len(), 1);
        write_scenery_data(&mut scene, &data).expect("write");

        let stored = scene.get_flag(MODULE_ID, FLAG_KEY).expect("stored");
        assert!(stored["bg"].is_null());
        assert!(stored["defaultSceneData"].is_null());
        assert_eq!(stored["variations"][0]["gmBackground"], "maps/a.webp");
        assert_eq!(read_scenery_data(&scene), Some(data));
    }

    #[test]
    fn write_clamps_out_of_range_active_index() {
        let mut scene = MemoryScene::new("s1", "Scene", "maps/a.webp");
        for requested in [2usize, 3, 10, usize::MAX] {
            let mut data = SceneryData::default_for("maps/a.webp");
            data.variations.push(Variation::new("B", "maps/b.webp", "maps/b.webp"));
            data.active_variation_index = requested;
            write_scenery_data(&mut scene, &data).expect("write");
            let stored = scene.get_flag(MODULE_ID, FLAG_KEY).expect("stored");
            assert_eq!(stored["activeVariationIndex"], 1, "requested={requested}");
        }
    }

    #[test]
    fn absent_or_unreadable_data_reads_as_none() {
        let mut scene = MemoryScene::new("s1", "Scene", "maps/a.webp");
        assert!(read_scenery_data(&scene).is_none());
        scene
            .set_flag(MODULE_ID, FLAG_KEY, json!({ "variations": "nope" }))
            .expect("seed");
        assert!(read_scenery_data(&scene).is_none());
        scene
            .set_flag(MODULE_ID, FLAG_KEY, json!({ "activeVariationIndex": 0, "variations": [] }))
            .expect("seed");
        assert!(read_scenery_data(&scene).is_none());
    }

    #[test]
    fn snapshot_absence_round_trips() {
        let mut scene = MemoryScene::new("s1", "Scene", "maps/a.webp");
        let data = SceneryData::default_for("maps/a.webp");
        write_scenery_data(&mut scene, &data).expect("write");
        let stored = scene.get_flag(MODULE_ID, FLAG_KEY).expect("stored");
        assert!(stored["variations"][0].get("sceneData").is_none());
    }

    #[test]
    fn write_failure_surfaces_as_error() {
        let mut scene = MemoryScene::new("s1", "Scene", "maps/a.webp");
        scene.fail_flag_writes = true;
        let result = write_scenery_data(&mut scene, &SceneryData::default_for("maps/a.webp"));
        assert!(matches!(result, Err(SceneryError::Host(_))));
    }
}
