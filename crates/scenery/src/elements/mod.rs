mod capture;
mod restore;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use capture::{capture_scene_elements, live_counts};
pub use restore::{restore_scene_elements, strip_identity};

/// Serialized scene element as handed out by the host, keyed like the host's
/// own document data.
pub type ElementRecord = Map<String, Value>;

/// Record field holding the host-assigned identity of an element.
pub const IDENTITY_FIELD: &str = "_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    Lights,
    Sounds,
    Tiles,
    Walls,
    Drawings,
    Templates,
    Regions,
    Notes,
}

impl ElementKind {
    pub const ALL: [ElementKind; 8] = [
        ElementKind::Lights,
        ElementKind::Sounds,
        ElementKind::Tiles,
        ElementKind::Walls,
        ElementKind::Drawings,
        ElementKind::Templates,
        ElementKind::Regions,
        ElementKind::Notes,
    ];

    /// Collection name on the scene document; also the snapshot key.
    pub fn collection_name(self) -> &'static str {
        match self {
            ElementKind::Lights => "lights",
            ElementKind::Sounds => "sounds",
            ElementKind::Tiles => "tiles",
            ElementKind::Walls => "walls",
            ElementKind::Drawings => "drawings",
            ElementKind::Templates => "templates",
            ElementKind::Regions => "regions",
            ElementKind::Notes => "notes",
        }
    }

    /// Embedded document type name the host uses for bulk operations.
    pub fn document_name(self) -> &'static str {
        match self {
            ElementKind::Lights => "AmbientLight",
            ElementKind::Sounds => "AmbientSound",
            ElementKind::Tiles => "Tile",
            ElementKind::Walls => "Wall",
            ElementKind::Drawings => "Drawing",
            ElementKind::Templates => "MeasuredTemplate",
            ElementKind::Regions => "Region",
            ElementKind::Notes => "Note",
        }
    }

    pub fn from_collection_name(name: &str) -> Option<Self> {
        let lowered = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.collection_name() == lowered)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection_name())
    }
}

/// Captured element records of one variation, one array per element type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneElementSnapshot {
    pub lights: Vec<ElementRecord>,
    pub sounds: Vec<ElementRecord>,
    pub tiles: Vec<ElementRecord>,
    pub walls: Vec<ElementRecord>,
    pub drawings: Vec<ElementRecord>,
    pub templates: Vec<ElementRecord>,
    pub regions: Vec<ElementRecord>,
    pub notes: Vec<ElementRecord>,
}

impl SceneElementSnapshot {
    pub fn records(&self, kind: ElementKind) -> &[ElementRecord] {
        match kind {
            ElementKind::Lights => &self.lights,
            ElementKind::Sounds => &self.sounds,
            ElementKind::Tiles => &self.tiles,
            ElementKind::Walls => &self.walls,
            ElementKind::Drawings => &self.drawings,
            ElementKind::Templates => &self.templates,
            ElementKind::Regions => &self.regions,
            ElementKind::Notes => &self.notes,
        }
    }

    pub fn records_mut(&mut self, kind: ElementKind) -> &mut Vec<ElementRecord> {
        match kind {
            ElementKind::Lights => &mut self.lights,
            ElementKind::Sounds => &mut self.sounds,
            ElementKind::Tiles => &mut self.tiles,
            ElementKind::Walls => &mut self.walls,
            ElementKind::Drawings => &mut self.drawings,
            ElementKind::Templates => &mut self.templates,
            ElementKind::Regions => &mut self.regions,
            ElementKind::Notes => &mut self.notes,
        }
    }

    pub fn has_data(&self) -> bool {
        ElementKind::ALL
            .into_iter()
            .any(|kind| !self.records(kind).is_empty())
    }

    pub fn counts(&self) -> ElementCounts {
        let mut counts = ElementCounts::default();
        for kind in ElementKind::ALL {
            counts.set(kind, self.records(kind).len());
        }
        counts
    }

    /// Human readable summary such as `"3 lights, 2 walls"`.
    pub fn summary(&self) -> String {
        self.counts().summary()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementCounts {
    counts: [usize; 8],
}

impl ElementCounts {
    pub fn get(&self, kind: ElementKind) -> usize {
        self.counts[kind as usize]
    }

    pub fn set(&mut self, kind: ElementKind, count: usize) {
        self.counts[kind as usize] = count;
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn summary(&self) -> String {
        let parts = ElementKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind) > 0)
            .map(|kind| format!("{} {}", self.get(kind), kind))
            .collect::<Vec<_>>();
        if parts.is_empty() {
            "No elements".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Per-type mask. Used both for the variation-managed set and for the types
/// picked in a copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementSelection {
    pub lights: bool,
    pub sounds: bool,
    pub tiles: bool,
    pub walls: bool,
    pub drawings: bool,
    pub templates: bool,
    pub regions: bool,
    pub notes: bool,
}

impl ElementSelection {
    pub fn all() -> Self {
        Self::from_kinds(ElementKind::ALL)
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_kinds(kinds: impl IntoIterator<Item = ElementKind>) -> Self {
        let mut selection = Self::none();
        for kind in kinds {
            selection.set(kind, true);
        }
        selection
    }

    pub fn contains(&self, kind: ElementKind) -> bool {
        match kind {
            ElementKind::Lights => self.lights,
            ElementKind::Sounds => self.sounds,
            ElementKind::Tiles => self.tiles,
            ElementKind::Walls => self.walls,
            ElementKind::Drawings => self.drawings,
            ElementKind::Templates => self.templates,
            ElementKind::Regions => self.regions,
            ElementKind::Notes => self.notes,
        }
    }

    pub fn set(&mut self, kind: ElementKind, selected: bool) {
        let slot = match kind {
            ElementKind::Lights => &mut self.lights,
            ElementKind::Sounds => &mut self.sounds,
            ElementKind::Tiles => &mut self.tiles,
            ElementKind::Walls => &mut self.walls,
            ElementKind::Drawings => &mut self.drawings,
            ElementKind::Templates => &mut self.templates,
            ElementKind::Regions => &mut self.regions,
            ElementKind::Notes => &mut self.notes,
        };
        *slot = selected;
    }

    pub fn any(&self) -> bool {
        ElementKind::ALL.into_iter().any(|kind| self.contains(kind))
    }

    pub fn complement(&self) -> Self {
        Self::from_kinds(
            ElementKind::ALL
                .into_iter()
                .filter(|kind| !self.contains(*kind)),
        )
    }

    pub fn kinds(&self) -> impl Iterator<Item = ElementKind> + '_ {
        ElementKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}
