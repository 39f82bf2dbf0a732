//! Capabilities consumed from the virtual tabletop host.
//!
//! The manager never talks to a renderer, database or UI directly. Every
//! side effect goes through these traits so that the same engine can drive a
//! live client, a JSON scene file or the in-memory host used by tests.

mod atomic_io;
pub mod memory;
pub mod scene_file;

use serde_json::Value;
use thiserror::Error;

use crate::elements::{ElementKind, ElementRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("failed to load texture {path}: {message}")]
    TextureLoad { path: String, message: String },
    #[error("failed to persist flag {scope}.{key}: {message}")]
    FlagWrite {
        scope: String,
        key: String,
        message: String,
    },
    #[error("failed to {operation} {kind} elements: {message}")]
    Elements {
        operation: &'static str,
        kind: ElementKind,
        message: String,
    },
    #[error("failed to browse {directory}: {message}")]
    Browse { directory: String, message: String },
}

/// Flag storage on a scene-like document. Each call is atomic on its own and
/// the last write wins.
pub trait FlagStore {
    fn get_flag(&self, scope: &str, key: &str) -> Option<Value>;
    fn set_flag(&mut self, scope: &str, key: &str, value: Value) -> Result<(), HostError>;
}

/// The embedded element collections of a scene.
pub trait ElementCollections {
    /// Serialized records of every live element of `kind`, identity included.
    fn element_records(&self, kind: ElementKind) -> Vec<ElementRecord>;

    fn element_count(&self, kind: ElementKind) -> usize {
        self.element_records(kind).len()
    }

    /// Creates elements from records without identity; the host assigns ids.
    fn create_elements(
        &mut self,
        kind: ElementKind,
        records: Vec<ElementRecord>,
    ) -> Result<(), HostError>;

    fn delete_elements(&mut self, kind: ElementKind, ids: &[String]) -> Result<(), HostError>;
}

pub trait SceneDocument: FlagStore + ElementCollections {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    /// Background path stored on the document, not what the canvas draws.
    fn background_src(&self) -> &str;
}

pub trait FileBrowser {
    /// Lists the files of `directory` as paths usable as backgrounds.
    fn browse(&mut self, source: &str, directory: &str) -> Result<Vec<String>, HostError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Info,
    Warn,
    Error,
}

/// The live session: scenes, the canvas showing one of them and the user.
pub trait SceneryHost: FileBrowser {
    type Scene: SceneDocument;
    type Texture;

    fn is_gm(&self) -> bool;

    /// Scene currently displayed on the canvas.
    fn viewed_scene_id(&self) -> Option<String>;
    fn scene(&self, id: &str) -> Option<&Self::Scene>;
    fn scene_mut(&mut self, id: &str) -> Option<&mut Self::Scene>;
    fn scene_ids(&self) -> Vec<String>;

    fn canvas_ready(&self) -> bool;
    /// Background the canvas is drawing right now, if any.
    fn canvas_background(&self) -> Option<String>;
    fn load_texture(&mut self, path: &str) -> Result<Self::Texture, HostError>;
    /// Assigns the texture to the background layer of the viewed scene, marks
    /// it dirty and forces a render pass.
    fn swap_background(&mut self, texture: Self::Texture, path: &str);

    fn notify(&mut self, level: Notice, message: &str);
    fn confirm(&mut self, title: &str, content: &str) -> bool;
    fn refresh_scene_directory(&mut self) {}
}

/// A rendered scene directory that badges can be attached to.
pub trait DirectoryView {
    fn has_entry(&self, scene_id: &str) -> bool;
    fn prepend_badge(&mut self, scene_id: &str, label: &str);

    /// Whether the directory header already carries the variations button.
    fn has_header_action(&self) -> bool;
    fn add_header_action(&mut self);

    /// Entry the user has highlighted, if any.
    fn selected_entry(&self) -> Option<String> {
        None
    }
}

/// Whether a host update delta touches the dotted `path`.
pub fn delta_has_property(delta: &Value, path: &[&str]) -> bool {
    let mut current = delta;
    for segment in path {
        match current.get(segment) {
            Some(next) => current = next,
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn delta_property_lookup_walks_nested_objects() {
        let delta = json!({ "background": { "src": "a.png" }, "flags": { "scenery": {} } });
        assert!(delta_has_property(&delta, &["background", "src"]));
        assert!(delta_has_property(&delta, &["flags", "scenery"]));
        assert!(!delta_has_property(&delta, &["flags", "scenery", "data"]));
        assert!(!delta_has_property(&json!({}), &["background"]));
    }
}
