use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::elements::{ElementKind, ElementSelection};
use crate::naming::parse_identifiers;

pub const GM_IDENTIFIERS_ENV_VAR: &str = "SCENERY_GM_IDENTIFIERS";
pub const PLAYER_IDENTIFIERS_ENV_VAR: &str = "SCENERY_PLAYER_IDENTIFIERS";
pub const GLOBAL_ELEMENTS_ENV_VAR: &str = "SCENERY_GLOBAL_ELEMENTS";

const DEFAULT_GM_IDENTIFIERS: &str = "gm, dm";
const DEFAULT_PLAYER_IDENTIFIERS: &str = "player, pl";

/// Installation-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneryConfig {
    /// Comma separated filename tokens marking GM maps.
    pub gm_map_identifiers: String,
    /// Comma separated filename tokens marking player maps.
    pub player_map_identifiers: String,
    pub show_variations_label: bool,
    pub show_header_button: bool,
    pub debug_logging: bool,
    /// Element types left on the scene across variation switches.
    pub global_elements: ElementSelection,
}

impl Default for SceneryConfig {
    fn default() -> Self {
        Self {
            gm_map_identifiers: DEFAULT_GM_IDENTIFIERS.to_string(),
            player_map_identifiers: DEFAULT_PLAYER_IDENTIFIERS.to_string(),
            show_variations_label: true,
            show_header_button: true,
            debug_logging: false,
            global_elements: ElementSelection::from_kinds([
                ElementKind::Drawings,
                ElementKind::Templates,
            ]),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path} at {field}: {message}")]
    Parse {
        path: PathBuf,
        field: String,
        message: String,
    },
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("unknown element type '{name}' in {var}")]
    UnknownElementType { var: &'static str, name: String },
}

impl SceneryConfig {
    /// Defaults, then the optional settings file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::read_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(read_env_var)?;
        Ok(config)
    }

    pub fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_json(&raw, path)
    }

    pub fn parse_json(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize::<_, Self>(&mut deserializer).map_err(|error| {
            let field = error.path().to_string();
            ConfigError::Parse {
                path: path.to_path_buf(),
                field: if field.is_empty() { ".".to_string() } else { field },
                message: error.into_inner().to_string(),
            }
        })
    }

    pub(crate) fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&'static str) -> Result<Option<String>, ConfigError>,
    {
        if let Some(value) = lookup(GM_IDENTIFIERS_ENV_VAR)? {
            self.gm_map_identifiers = value;
        }
        if let Some(value) = lookup(PLAYER_IDENTIFIERS_ENV_VAR)? {
            self.player_map_identifiers = value;
        }
        if let Some(value) = lookup(GLOBAL_ELEMENTS_ENV_VAR)? {
            self.global_elements = parse_element_list(GLOBAL_ELEMENTS_ENV_VAR, &value)?;
        }
        Ok(())
    }

    pub fn gm_tokens(&self) -> Vec<String> {
        parse_identifiers(&self.gm_map_identifiers)
    }

    pub fn player_tokens(&self) -> Vec<String> {
        parse_identifiers(&self.player_map_identifiers)
    }

    /// Element types captured and restored per variation.
    pub fn variation_managed_selection(&self) -> ElementSelection {
        self.global_elements.complement()
    }

    pub fn reset_to_defaults(&mut self) {
        *self = Self::default();
    }
}

fn read_env_var(var: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(var) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(source) => Err(ConfigError::EnvVar { var, source }),
    }
}

/// Parses a comma separated list of element collection names.
pub fn parse_element_list(var: &'static str, raw: &str) -> Result<ElementSelection, ConfigError> {
    let mut selection = ElementSelection::none();
    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let kind = ElementKind::from_collection_name(entry).ok_or_else(|| {
            ConfigError::UnknownElementType {
                var,
                name: entry.to_string(),
            }
        })?;
        selection.set(kind, true);
    }
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn defaults_manage_everything_but_drawings_and_templates() {
        let config = SceneryConfig::default();
        let managed = config.variation_managed_selection();
        assert!(managed.contains(ElementKind::Lights));
        assert!(managed.contains(ElementKind::Notes));
        assert!(!managed.contains(ElementKind::Drawings));
        assert!(!managed.contains(ElementKind::Templates));
        assert_eq!(config.gm_tokens(), vec!["gm".to_string(), "dm".to_string()]);
        assert_eq!(
            config.player_tokens(),
            vec!["player".to_string(), "pl".to_string()]
        );
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("settings.json");
        fs::write(
            &path,
            r#"{ "gmMapIdentifiers": "secret", "globalElements": { "walls": true } }"#,
        )
        .expect("write settings");

        let config = SceneryConfig::read_file(&path).expect("config");
        assert_eq!(config.gm_tokens(), vec!["secret".to_string()]);
        assert!(config.show_variations_label);
        assert!(!config.variation_managed_selection().contains(ElementKind::Walls));
        assert!(config.variation_managed_selection().contains(ElementKind::Drawings));
    }

    #[test]
    fn parse_errors_name_the_field() {
        let error = SceneryConfig::parse_json(
            r#"{ "showVariationsLabel": "yes" }"#,
            Path::new("settings.json"),
        )
        .expect_err("invalid");
        match error {
            ConfigError::Parse { field, .. } => assert_eq!(field, "showVariationsLabel"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn overrides_replace_identifiers_and_globals() {
        let values = HashMap::from([
            (PLAYER_IDENTIFIERS_ENV_VAR, "players".to_string()),
            (GLOBAL_ELEMENTS_ENV_VAR, "lights, Notes".to_string()),
        ]);
        let mut config = SceneryConfig::default();
        config
            .apply_overrides(|var| Ok(values.get(var).cloned()))
            .expect("overrides");

        assert_eq!(config.player_tokens(), vec!["players".to_string()]);
        assert_eq!(config.gm_tokens(), vec!["gm".to_string(), "dm".to_string()]);
        assert!(!config.variation_managed_selection().contains(ElementKind::Lights));
        assert!(config.variation_managed_selection().contains(ElementKind::Drawings));

        config.reset_to_defaults();
        assert_eq!(config, SceneryConfig::default());
    }

    #[test]
    fn unknown_global_element_is_rejected() {
        let error = parse_element_list(GLOBAL_ELEMENTS_ENV_VAR, "lights,tokens").expect_err("bad");
        assert!(matches!(error, ConfigError::UnknownElementType { name, .. } if name == "tokens"));
    }
}
