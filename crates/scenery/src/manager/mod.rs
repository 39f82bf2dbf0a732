//! Orchestrates variation switches for the scene on the canvas.
//!
//! The manager owns every piece of process-local state: the per-scene
//! [`TransientState`] side table and the in-flight image latch. Persisted
//! state lives in the scene flags and is re-read on every operation, so the
//! host document stays the source of truth.

mod background;
mod directory;
mod form;
mod ops;

use std::collections::HashMap;

use tracing::error;

use crate::config::SceneryConfig;
use crate::data::{read_scenery_data, write_scenery_data, SceneryData};
use crate::error::SceneryError;
use crate::host::{Notice, SceneryHost};

pub use form::{FormRow, VariationCard, VariationForm};
pub use ops::{CopyRequest, CopySource};

/// Per-scene state that only lives as long as the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransientState {
    /// Canvas background before this manager first overrode it.
    pub original_background: Option<String>,
    /// Last background this manager put on the canvas.
    pub custom_background: Option<String>,
    /// Swap queued during canvas init, applied on canvas ready.
    pub pending_background: Option<String>,
    /// Set once the first canvas-ready pass has completed.
    pub initialized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetImageOutcome {
    NoScene,
    /// Canvas not drawable yet; the image was queued as pending.
    Queued,
    /// A load of the same image is already in flight.
    AlreadyLoading,
    CanvasNotReady,
    Applied {
        switched: bool,
        /// Result of the element restore, when one ran.
        restored: Option<bool>,
    },
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct SceneryManager {
    config: SceneryConfig,
    transient: HashMap<String, TransientState>,
    loading_image: Option<String>,
}

impl SceneryManager {
    pub fn new(config: SceneryConfig) -> Self {
        Self {
            config,
            transient: HashMap::new(),
            loading_image: None,
        }
    }

    pub fn config(&self) -> &SceneryConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SceneryConfig {
        &mut self.config
    }

    pub fn transient(&self, scene_id: &str) -> Option<&TransientState> {
        self.transient.get(scene_id)
    }

    fn transient_mut(&mut self, scene_id: &str) -> &mut TransientState {
        self.transient.entry(scene_id.to_string()).or_default()
    }

    /// Drops the transient state of an unloaded scene.
    pub fn forget_scene(&mut self, scene_id: &str) {
        self.transient.remove(scene_id);
    }

    /// Image currently being loaded, if any.
    pub fn loading_image(&self) -> Option<&str> {
        self.loading_image.as_deref()
    }
}

fn load_data<H: SceneryHost>(host: &H, scene_id: &str) -> Option<SceneryData> {
    host.scene(scene_id).and_then(read_scenery_data)
}

fn persist<H: SceneryHost>(
    host: &mut H,
    scene_id: &str,
    data: &SceneryData,
) -> Result<(), SceneryError> {
    let scene = host
        .scene_mut(scene_id)
        .ok_or_else(|| SceneryError::SceneNotFound {
            scene_id: scene_id.to_string(),
        })?;
    write_scenery_data(scene, data)
}

fn is_viewed<H: SceneryHost>(host: &H, scene_id: &str) -> bool {
    host.viewed_scene_id().as_deref() == Some(scene_id)
}

/// Surfaces a failed user operation and hands the error back to the caller.
fn reject<H: SceneryHost, T>(host: &mut H, error: SceneryError) -> Result<T, SceneryError> {
    match &error {
        SceneryError::Encode(_) | SceneryError::Host(_) => {
            error!(error = %error, "scenery_operation_failed");
            host.notify(Notice::Error, &format!("Scenery error: {error}"));
        }
        _ => host.notify(Notice::Warn, &error.to_string()),
    }
    Err(error)
}
