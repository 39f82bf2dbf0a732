use tracing::{error, info};

use crate::host::{ElementCollections, HostError};

use super::{ElementKind, ElementRecord, ElementSelection, SceneElementSnapshot, IDENTITY_FIELD};

/// Replaces every selected collection of `scene` with the snapshot's records.
///
/// Each selected type is fully swapped: all live elements are deleted, then
/// the snapshot records are created without identity so the host assigns
/// fresh ids. Unselected types are not touched. Returns `false` on the first
/// host failure; types swapped before it stay swapped.
pub fn restore_scene_elements<S>(
    scene: &mut S,
    snapshot: &SceneElementSnapshot,
    selection: &ElementSelection,
) -> bool
where
    S: ElementCollections + ?Sized,
{
    for kind in selection.kinds() {
        if let Err(error) = replace_collection(scene, kind, snapshot.records(kind)) {
            error!(%kind, %error, "scene_elements_restore_failed");
            return false;
        }
    }
    info!(summary = %snapshot.summary(), "scene_elements_restored");
    true
}

fn replace_collection<S>(
    scene: &mut S,
    kind: ElementKind,
    target: &[ElementRecord],
) -> Result<(), HostError>
where
    S: ElementCollections + ?Sized,
{
    let live_ids = scene
        .element_records(kind)
        .iter()
        .filter_map(|record| record.get(IDENTITY_FIELD).and_then(|id| id.as_str()))
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    if !live_ids.is_empty() {
        scene.delete_elements(kind, &live_ids)?;
    }

    let records = target.iter().map(strip_identity).collect::<Vec<_>>();
    let created = records.len();
    if !records.is_empty() {
        scene.create_elements(kind, records)?;
    }
    info!(
        %kind,
        document = kind.document_name(),
        deleted = live_ids.len(),
        created,
        "scene_elements_replaced"
    );
    Ok(())
}

pub fn strip_identity(record: &ElementRecord) -> ElementRecord {
    let mut record = record.clone();
    record.remove(IDENTITY_FIELD);
    record
}
