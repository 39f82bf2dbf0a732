//! Background variations for virtual tabletop scenes.
//!
//! A scene carries a list of named background variations, each with a GM and
//! a player image and an optional snapshot of the scene's elements (lights,
//! walls, tiles, ...). [`SceneryManager`] switches between variations and
//! keeps the live scene in step with the snapshots.

pub mod config;
pub mod data;
pub mod elements;
mod error;
pub mod host;
pub mod manager;
pub mod naming;
pub mod paths;
pub mod scan;

pub use config::{ConfigError, SceneryConfig};
pub use data::{read_scenery_data, write_scenery_data, SceneryData, Variation};
pub use elements::{
    capture_scene_elements, restore_scene_elements, ElementCounts, ElementKind, ElementRecord,
    ElementSelection, SceneElementSnapshot,
};
pub use error::SceneryError;
pub use host::{
    DirectoryView, ElementCollections, FileBrowser, FlagStore, HostError, Notice, SceneDocument,
    SceneryHost,
};
pub use manager::{
    CopyRequest, CopySource, FormRow, SceneryManager, SetImageOutcome, TransientState,
    VariationCard, VariationForm,
};
pub use scan::{scan_variations, ScanOutcome, ScanRequest};

/// Flag scope the variation data is stored under.
pub const MODULE_ID: &str = "scenery";
/// Flag key inside [`MODULE_ID`].
pub const FLAG_KEY: &str = "data";
