use thiserror::Error;

use crate::host::HostError;

#[derive(Debug, Error)]
pub enum SceneryError {
    #[error("the Default variation needs a background image")]
    MissingDefaultBackground,
    #[error("no valid variations defined")]
    NoValidVariations,
    #[error("select at least one element type")]
    NoElementTypeSelected,
    #[error("select a source variation")]
    NoSourceVariation,
    #[error("source variation \"{name}\" has no data to copy")]
    SourceHasNoData { name: String },
    #[error("the Default variation cannot be changed by this operation")]
    DefaultVariationLocked,
    #[error("variation {index} does not exist")]
    VariationNotFound { index: usize },
    #[error("scene {scene_id} does not exist")]
    SceneNotFound { scene_id: String },
    #[error("scene {scene_id} has no variation data")]
    NoSceneryData { scene_id: String },
    #[error("failed to encode variation data: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Host(#[from] HostError),
}
