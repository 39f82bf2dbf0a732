//! In-process host with no renderer behind it. Scenes, files and the canvas
//! live in plain collections, which makes every hook observable.

use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value};

use crate::elements::{ElementKind, ElementRecord, IDENTITY_FIELD};

use super::{
    DirectoryView, ElementCollections, FileBrowser, FlagStore, HostError, Notice,
    SceneDocument, SceneryHost,
};

#[derive(Debug, Clone, Default)]
pub struct MemoryScene {
    id: String,
    name: String,
    pub background: String,
    flags: BTreeMap<String, Map<String, Value>>,
    collections: BTreeMap<ElementKind, Vec<ElementRecord>>,
    next_element_id: u64,
    failing_kinds: HashSet<ElementKind>,
    pub fail_flag_writes: bool,
    pub flag_writes: usize,
}

impl MemoryScene {
    pub fn new(id: &str, name: &str, background: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            background: background.to_string(),
            ..Self::default()
        }
    }

    /// Adds live elements; non-object values are ignored.
    pub fn seed(&mut self, kind: ElementKind, records: Vec<Value>) {
        let records = records
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect::<Vec<_>>();
        self.insert_records(kind, records);
    }

    /// Makes every create/delete of `kind` fail.
    pub fn fail_on(&mut self, kind: ElementKind) {
        self.failing_kinds.insert(kind);
    }

    fn insert_records(&mut self, kind: ElementKind, records: Vec<ElementRecord>) {
        for mut record in records {
            self.next_element_id += 1;
            let id = format!("{}.{}.{}", self.id, kind, self.next_element_id);
            record.insert(IDENTITY_FIELD.to_string(), Value::String(id));
            self.collections.entry(kind).or_default().push(record);
        }
    }

    fn check_failure(&self, kind: ElementKind, operation: &'static str) -> Result<(), HostError> {
        if self.failing_kinds.contains(&kind) {
            return Err(HostError::Elements {
                operation,
                kind,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

impl FlagStore for MemoryScene {
    fn get_flag(&self, scope: &str, key: &str) -> Option<Value> {
        self.flags
            .get(scope)
            .and_then(|entries| entries.get(key))
            .filter(|value| !value.is_null())
            .cloned()
    }

    fn set_flag(&mut self, scope: &str, key: &str, value: Value) -> Result<(), HostError> {
        if self.fail_flag_writes {
            return Err(HostError::FlagWrite {
                scope: scope.to_string(),
                key: key.to_string(),
                message: "injected failure".to_string(),
            });
        }
        self.flags
            .entry(scope.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.flag_writes += 1;
        Ok(())
    }
}

impl ElementCollections for MemoryScene {
    fn element_records(&self, kind: ElementKind) -> Vec<ElementRecord> {
        self.collections.get(&kind).cloned().unwrap_or_default()
    }

    fn element_count(&self, kind: ElementKind) -> usize {
        self.collections.get(&kind).map_or(0, Vec::len)
    }

    fn create_elements(
        &mut self,
        kind: ElementKind,
        records: Vec<ElementRecord>,
    ) -> Result<(), HostError> {
        self.check_failure(kind, "create")?;
        self.insert_records(kind, records);
        Ok(())
    }

    fn delete_elements(&mut self, kind: ElementKind, ids: &[String]) -> Result<(), HostError> {
        self.check_failure(kind, "delete")?;
        if let Some(records) = self.collections.get_mut(&kind) {
            records.retain(|record| {
                record
                    .get(IDENTITY_FIELD)
                    .and_then(Value::as_str)
                    .map_or(true, |id| !ids.iter().any(|target| target == id))
            });
        }
        Ok(())
    }
}

impl SceneDocument for MemoryScene {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn background_src(&self) -> &str {
        &self.background
    }
}

#[derive(Debug, Clone)]
pub struct MemoryHost {
    pub scenes: Vec<MemoryScene>,
    pub viewed: Option<String>,
    pub is_gm: bool,
    pub canvas_ready: bool,
    pub displayed_background: Option<String>,
    /// Directory path to the file paths it contains, in listing order.
    pub directories: BTreeMap<String, Vec<String>>,
    pub missing_textures: HashSet<String>,
    pub confirm_answer: bool,
    pub notices: Vec<(Notice, String)>,
    pub texture_loads: Vec<String>,
    pub renders: usize,
    pub directory_refreshes: usize,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self {
            scenes: Vec::new(),
            viewed: None,
            is_gm: true,
            canvas_ready: true,
            displayed_background: None,
            directories: BTreeMap::new(),
            missing_textures: HashSet::new(),
            confirm_answer: true,
            notices: Vec::new(),
            texture_loads: Vec::new(),
            renders: 0,
            directory_refreshes: 0,
        }
    }
}

impl MemoryHost {
    /// Host viewing `scene` as a GM.
    pub fn viewing(scene: MemoryScene) -> Self {
        let viewed = Some(scene.id.clone());
        Self {
            scenes: vec![scene],
            viewed,
            ..Self::default()
        }
    }

    pub fn viewed_scene(&self) -> Option<&MemoryScene> {
        let id = self.viewed.as_deref()?;
        self.scene(id)
    }

    pub fn viewed_scene_mut(&mut self) -> Option<&mut MemoryScene> {
        let id = self.viewed.clone()?;
        self.scene_mut(&id)
    }

    pub fn add_directory(&mut self, directory: &str, files: &[&str]) {
        self.directories.insert(
            directory.to_string(),
            files.iter().map(|file| file.to_string()).collect(),
        );
    }

    pub fn notices_of(&self, level: Notice) -> Vec<&str> {
        self.notices
            .iter()
            .filter(|(notice, _)| *notice == level)
            .map(|(_, message)| message.as_str())
            .collect()
    }
}

impl FileBrowser for MemoryHost {
    fn browse(&mut self, _source: &str, directory: &str) -> Result<Vec<String>, HostError> {
        self.directories
            .get(directory)
            .cloned()
            .ok_or_else(|| HostError::Browse {
                directory: directory.to_string(),
                message: "no such directory".to_string(),
            })
    }
}

impl SceneryHost for MemoryHost {
    type Scene = MemoryScene;
    type Texture = String;

    fn is_gm(&self) -> bool {
        self.is_gm
    }

    fn viewed_scene_id(&self) -> Option<String> {
        self.viewed.clone()
    }

    fn scene(&self, id: &str) -> Option<&MemoryScene> {
        self.scenes.iter().find(|scene| scene.id == id)
    }

    fn scene_mut(&mut self, id: &str) -> Option<&mut MemoryScene> {
        self.scenes.iter_mut().find(|scene| scene.id == id)
    }

    fn scene_ids(&self) -> Vec<String> {
        self.scenes.iter().map(|scene| scene.id.clone()).collect()
    }

    fn canvas_ready(&self) -> bool {
        self.canvas_ready
    }

    fn canvas_background(&self) -> Option<String> {
        self.displayed_background
            .clone()
            .or_else(|| self.viewed_scene().map(|scene| scene.background.clone()))
    }

    fn load_texture(&mut self, path: &str) -> Result<String, HostError> {
        self.texture_loads.push(path.to_string());
        if path.is_empty() || self.missing_textures.contains(path) {
            return Err(HostError::TextureLoad {
                path: path.to_string(),
                message: "not found".to_string(),
            });
        }
        Ok(path.to_string())
    }

    fn swap_background(&mut self, texture: String, _path: &str) {
        self.displayed_background = Some(texture);
        self.renders += 1;
    }

    fn notify(&mut self, level: Notice, message: &str) {
        self.notices.push((level, message.to_string()));
    }

    fn confirm(&mut self, _title: &str, _content: &str) -> bool {
        self.confirm_answer
    }

    fn refresh_scene_directory(&mut self) {
        self.directory_refreshes += 1;
    }
}

/// Scene directory rendered as a list of entries with their badges.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    pub entries: BTreeMap<String, Vec<String>>,
    pub header_action: bool,
    pub selected: Option<String>,
}

impl MemoryDirectory {
    pub fn with_entries(ids: &[&str]) -> Self {
        Self {
            entries: ids.iter().map(|id| (id.to_string(), Vec::new())).collect(),
            ..Self::default()
        }
    }
}

impl DirectoryView for MemoryDirectory {
    fn has_entry(&self, scene_id: &str) -> bool {
        self.entries.contains_key(scene_id)
    }

    fn prepend_badge(&mut self, scene_id: &str, label: &str) {
        if let Some(badges) = self.entries.get_mut(scene_id) {
            badges.insert(0, label.to_string());
        }
    }

    fn has_header_action(&self) -> bool {
        self.header_action
    }

    fn add_header_action(&mut self) {
        self.header_action = true;
    }

    fn selected_entry(&self) -> Option<String> {
        self.selected.clone()
    }
}
