//! Host backed by JSON scene exports on disk.
//!
//! Each scene is one JSON document (`_id`, `name`, `background.src`, `flags`
//! and the eight element collections). Background paths are resolved against
//! a data root, which is also what the file browser lists. There is no
//! renderer: the "canvas" is the path of the last swapped-in background.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::elements::{ElementKind, ElementRecord, SceneElementSnapshot, IDENTITY_FIELD};

use super::atomic_io::write_text_atomic;
use super::{
    ElementCollections, FileBrowser, FlagStore, HostError, Notice, SceneDocument, SceneryHost,
};

#[derive(Debug, Error)]
pub enum SceneFileError {
    #[error("failed to read scene file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse scene file {path} at {field}: {message}")]
    Parse {
        path: PathBuf,
        field: String,
        message: String,
    },
    #[error("failed to write scene file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode scene {scene_id}: {source}")]
    Encode {
        scene_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("scene {scene_id} is loaded twice ({path})")]
    DuplicateScene { scene_id: String, path: PathBuf },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneBackground {
    #[serde(default)]
    pub src: String,
    /// Offsets, tint and whatever else the background carries.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneFile {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub background: SceneBackground,
    #[serde(default)]
    pub flags: Map<String, Value>,
    #[serde(flatten)]
    pub elements: SceneElementSnapshot,
    /// Scene fields this crate does not touch (tokens, grid, dimensions, ...),
    /// written back unchanged. Must stay after `elements` so the element
    /// arrays are claimed first.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
    #[serde(skip)]
    next_element_id: u64,
}

impl SceneFile {
    pub fn new(id: &str, name: &str, background: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            background: SceneBackground {
                src: background.to_string(),
                rest: Map::new(),
            },
            flags: Map::new(),
            elements: SceneElementSnapshot::default(),
            rest: Map::new(),
            next_element_id: 0,
        }
    }

    pub fn parse(raw: &str, path: &Path) -> Result<Self, SceneFileError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            SceneFileError::Parse {
                path: path.to_path_buf(),
                field: error.path().to_string(),
                message: error.into_inner().to_string(),
            }
        })
    }

    pub fn read(path: &Path) -> Result<Self, SceneFileError> {
        let raw = fs::read_to_string(path).map_err(|source| SceneFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, path)
    }

    pub fn write(&self, path: &Path) -> Result<(), SceneFileError> {
        let text =
            serde_json::to_string_pretty(self).map_err(|source| SceneFileError::Encode {
                scene_id: self.id.clone(),
                source,
            })?;
        write_text_atomic(path, &text).map_err(|source| SceneFileError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    fn allocate_id(&mut self, kind: ElementKind) -> String {
        loop {
            self.next_element_id += 1;
            let candidate = format!("{}-{}-{}", kind, self.id, self.next_element_id);
            let taken = self.elements.records(kind).iter().any(|record| {
                record.get(IDENTITY_FIELD).and_then(Value::as_str) == Some(candidate.as_str())
            });
            if !taken {
                return candidate;
            }
        }
    }
}

impl FlagStore for SceneFile {
    fn get_flag(&self, scope: &str, key: &str) -> Option<Value> {
        self.flags
            .get(scope)
            .and_then(|entries| entries.get(key))
            .filter(|value| !value.is_null())
            .cloned()
    }

    fn set_flag(&mut self, scope: &str, key: &str, value: Value) -> Result<(), HostError> {
        let entry = self
            .flags
            .entry(scope.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(entries) = entry else {
            return Err(HostError::FlagWrite {
                scope: scope.to_string(),
                key: key.to_string(),
                message: "flag scope is not an object".to_string(),
            });
        };
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

impl ElementCollections for SceneFile {
    fn element_records(&self, kind: ElementKind) -> Vec<ElementRecord> {
        self.elements.records(kind).to_vec()
    }

    fn element_count(&self, kind: ElementKind) -> usize {
        self.elements.records(kind).len()
    }

    fn create_elements(
        &mut self,
        kind: ElementKind,
        records: Vec<ElementRecord>,
    ) -> Result<(), HostError> {
        for mut record in records {
            let id = self.allocate_id(kind);
            record.insert(IDENTITY_FIELD.to_string(), Value::String(id));
            self.elements.records_mut(kind).push(record);
        }
        Ok(())
    }

    fn delete_elements(&mut self, kind: ElementKind, ids: &[String]) -> Result<(), HostError> {
        self.elements.records_mut(kind).retain(|record| {
            record
                .get(IDENTITY_FIELD)
                .and_then(Value::as_str)
                .map_or(true, |id| !ids.iter().any(|target| target == id))
        });
        Ok(())
    }
}

impl SceneDocument for SceneFile {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn background_src(&self) -> &str {
        &self.background.src
    }
}

/// Command line session over scene files: one user, one viewed scene.
#[derive(Debug)]
pub struct FileHost {
    data_root: PathBuf,
    scenes: BTreeMap<String, (PathBuf, SceneFile)>,
    viewed: Option<String>,
    is_gm: bool,
    assume_yes: bool,
    displayed_background: Option<String>,
}

impl FileHost {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            scenes: BTreeMap::new(),
            viewed: None,
            is_gm: true,
            assume_yes: false,
            displayed_background: None,
        }
    }

    pub fn with_role(mut self, is_gm: bool) -> Self {
        self.is_gm = is_gm;
        self
    }

    /// Answers every confirmation prompt with yes.
    pub fn with_assume_yes(mut self, assume_yes: bool) -> Self {
        self.assume_yes = assume_yes;
        self
    }

    /// Loads a scene file and returns its id.
    pub fn load_scene(&mut self, path: &Path) -> Result<String, SceneFileError> {
        let scene = SceneFile::read(path)?;
        let scene_id = scene.id.clone();
        if self.scenes.contains_key(&scene_id) {
            return Err(SceneFileError::DuplicateScene {
                scene_id,
                path: path.to_path_buf(),
            });
        }
        info!(scene_id = %scene_id, path = %path.display(), "scene_file_loaded");
        self.scenes
            .insert(scene_id.clone(), (path.to_path_buf(), scene));
        Ok(scene_id)
    }

    /// Displays `scene_id` on a fresh canvas.
    pub fn view(&mut self, scene_id: &str) -> bool {
        if !self.scenes.contains_key(scene_id) {
            return false;
        }
        self.viewed = Some(scene_id.to_string());
        self.displayed_background = None;
        true
    }

    pub fn displayed_background(&self) -> Option<&str> {
        self.displayed_background.as_deref()
    }

    /// Writes every loaded scene back to its file.
    pub fn save(&self) -> Result<(), SceneFileError> {
        for (path, scene) in self.scenes.values() {
            scene.write(path)?;
            info!(scene_id = %scene.id, path = %path.display(), "scene_file_saved");
        }
        Ok(())
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.data_root.join(path.trim_start_matches('/'))
    }
}

impl FileBrowser for FileHost {
    fn browse(&mut self, _source: &str, directory: &str) -> Result<Vec<String>, HostError> {
        let browse_error = |error: io::Error| HostError::Browse {
            directory: directory.to_string(),
            message: error.to_string(),
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(self.resolve(directory)).map_err(browse_error)? {
            let entry = entry.map_err(browse_error)?;
            if !entry.file_type().map_err(browse_error)?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            files.push(if directory.is_empty() {
                name
            } else {
                format!("{}/{}", directory.trim_end_matches('/'), name)
            });
        }
        files.sort();
        Ok(files)
    }
}

impl SceneryHost for FileHost {
    type Scene = SceneFile;
    type Texture = PathBuf;

    fn is_gm(&self) -> bool {
        self.is_gm
    }

    fn viewed_scene_id(&self) -> Option<String> {
        self.viewed.clone()
    }

    fn scene(&self, id: &str) -> Option<&SceneFile> {
        self.scenes.get(id).map(|(_, scene)| scene)
    }

    fn scene_mut(&mut self, id: &str) -> Option<&mut SceneFile> {
        self.scenes.get_mut(id).map(|(_, scene)| scene)
    }

    fn scene_ids(&self) -> Vec<String> {
        self.scenes.keys().cloned().collect()
    }

    fn canvas_ready(&self) -> bool {
        self.viewed.is_some()
    }

    fn canvas_background(&self) -> Option<String> {
        self.displayed_background.clone().or_else(|| {
            let id = self.viewed.as_deref()?;
            self.scene(id).map(|scene| scene.background.src.clone())
        })
    }

    fn load_texture(&mut self, path: &str) -> Result<PathBuf, HostError> {
        let resolved = self.resolve(path);
        if path.is_empty() || !resolved.is_file() {
            return Err(HostError::TextureLoad {
                path: path.to_string(),
                message: format!("{} is not a file", resolved.display()),
            });
        }
        Ok(resolved)
    }

    fn swap_background(&mut self, texture: PathBuf, path: &str) {
        info!(path, texture = %texture.display(), "canvas_background_swapped");
        self.displayed_background = Some(path.to_string());
    }

    fn notify(&mut self, level: Notice, message: &str) {
        match level {
            Notice::Info => info!(message, "notice"),
            Notice::Warn => warn!(message, "notice"),
            Notice::Error => error!(message, "notice"),
        }
    }

    fn confirm(&mut self, title: &str, content: &str) -> bool {
        if !self.assume_yes {
            warn!(title, content, "confirmation_declined");
        }
        self.assume_yes
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use crate::data::{read_scenery_data, SceneryData, Variation};
    use crate::SceneryManager;
    use crate::SceneryConfig;

    use super::*;

    fn write_scene(dir: &Path, value: &Value) -> PathBuf {
        let path = dir.join("scene.json");
        fs::write(&path, serde_json::to_string(value).expect("encode")).expect("write scene");
        path
    }

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, b"img").expect("write image");
    }

    #[test]
    fn scene_file_round_trips_unknown_flags_and_elements() {
        let temp = TempDir::new().expect("tempdir");
        let path = write_scene(
            temp.path(),
            &json!({
                "_id": "keep",
                "name": "Keep",
                "background": { "src": "maps/keep.webp" },
                "flags": { "other-module": { "x": 1 } },
                "walls": [{ "_id": "w1", "c": [0, 0, 10, 10] }]
            }),
        );

        let mut scene = SceneFile::read(&path).expect("scene");
        assert_eq!(scene.element_count(ElementKind::Walls), 1);
        scene
            .create_elements(ElementKind::Lights, vec![Map::new()])
            .expect("create");
        scene.write(&path).expect("write");

        let reread = SceneFile::read(&path).expect("reread");
        assert_eq!(reread.flags["other-module"], json!({ "x": 1 }));
        assert_eq!(reread.elements.lights.len(), 1);
        assert!(reread.elements.lights[0].contains_key(IDENTITY_FIELD));
    }

    #[test]
    fn switch_keeps_scene_fields_it_does_not_model() {
        let temp = TempDir::new().expect("tempdir");
        touch(temp.path(), "maps/keep.webp");
        touch(temp.path(), "maps/keep_night.webp");
        let path = write_scene(
            temp.path(),
            &json!({
                "_id": "keep",
                "name": "Keep",
                "width": 4000,
                "grid": { "size": 100 },
                "tokens": [{ "_id": "t1", "name": "Guard" }],
                "background": { "src": "maps/keep.webp", "offsetX": 25, "tint": "#fff" },
                "walls": [{ "_id": "w1", "c": [0, 0, 10, 10] }]
            }),
        );

        let mut host = FileHost::new(temp.path());
        let scene_id = host.load_scene(&path).expect("load");
        host.view(&scene_id);
        let scene = host.scene_mut(&scene_id).expect("scene");
        let data = SceneryData {
            active_variation_index: 0,
            variations: vec![
                Variation::new("Default", "maps/keep.webp", "maps/keep.webp"),
                Variation::new("Night", "maps/keep_night.webp", "maps/keep_night.webp"),
            ],
        };
        crate::data::write_scenery_data(scene, &data).expect("data");

        let mut manager = SceneryManager::new(SceneryConfig::default());
        manager.on_canvas_init(&mut host);
        manager.on_canvas_ready(&mut host);
        manager.set_image(&mut host, "maps/keep_night.webp", true);
        host.save().expect("save");

        let raw: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(raw["width"], json!(4000));
        assert_eq!(raw["grid"], json!({ "size": 100 }));
        assert_eq!(raw["tokens"], json!([{ "_id": "t1", "name": "Guard" }]));
        assert_eq!(raw["background"]["offsetX"], json!(25));
        assert_eq!(raw["background"]["tint"], json!("#fff"));
        assert_eq!(raw["walls"], json!([]));
        assert!(raw.get("rest").is_none());
    }

    #[test]
    fn parse_error_reports_field_path() {
        let error = SceneFile::parse(
            r#"{ "_id": "keep", "background": { "src": 3 } }"#,
            Path::new("keep.json"),
        )
        .expect_err("invalid");
        match error {
            SceneFileError::Parse { field, .. } => assert_eq!(field, "background.src"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn browse_lists_sorted_files_of_directory() {
        let temp = TempDir::new().expect("tempdir");
        touch(temp.path(), "maps/keep_b.webp");
        touch(temp.path(), "maps/keep_a.webp");
        fs::create_dir_all(temp.path().join("maps/nested")).expect("mkdir");

        let mut host = FileHost::new(temp.path());
        let files = host.browse("data", "maps").expect("browse");
        assert_eq!(files, vec!["maps/keep_a.webp", "maps/keep_b.webp"]);
        assert!(matches!(
            host.browse("data", "missing"),
            Err(HostError::Browse { .. })
        ));
    }

    #[test]
    fn switch_through_file_host_persists_snapshot() {
        let temp = TempDir::new().expect("tempdir");
        touch(temp.path(), "maps/keep.webp");
        touch(temp.path(), "maps/keep_night.webp");

        let mut scene = SceneFile::new("keep", "Keep", "maps/keep.webp");
        let data = SceneryData {
            active_variation_index: 0,
            variations: vec![
                Variation::new("Default", "maps/keep.webp", "maps/keep.webp"),
                Variation::new("Night", "maps/keep_night.webp", "maps/keep_night.webp"),
            ],
        };
        crate::data::write_scenery_data(&mut scene, &data).expect("data");
        scene
            .create_elements(ElementKind::Lights, vec![Map::new(), Map::new()])
            .expect("lights");
        let path = temp.path().join("keep.json");
        scene.write(&path).expect("write");

        let mut host = FileHost::new(temp.path());
        let scene_id = host.load_scene(&path).expect("load");
        assert!(host.view(&scene_id));

        let mut manager = SceneryManager::new(SceneryConfig::default());
        manager.on_canvas_init(&mut host);
        manager.on_canvas_ready(&mut host);
        manager.set_image(&mut host, "maps/keep_night.webp", true);
        host.save().expect("save");

        let saved = SceneFile::read(&path).expect("reread");
        assert_eq!(saved.element_count(ElementKind::Lights), 0);
        let data = read_scenery_data(&saved).expect("data");
        let default = data.variations[0].scene_data.as_ref().expect("snapshot");
        assert_eq!(default.lights.len(), 2);
        assert_eq!(host.displayed_background(), Some("maps/keep_night.webp"));
    }

    #[test]
    fn missing_texture_is_a_load_error() {
        let temp = TempDir::new().expect("tempdir");
        let mut host = FileHost::new(temp.path());
        assert!(matches!(
            host.load_texture("maps/none.webp"),
            Err(HostError::TextureLoad { .. })
        ));
    }
}
