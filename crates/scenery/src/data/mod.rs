mod flags;
mod legacy;
mod types;

pub use flags::{read_scenery_data, write_scenery_data, LEGACY_KEYS};
pub use legacy::{migrate_legacy, LegacySceneryData, LegacyVariation};
pub use types::{SceneryData, Variation, DEFAULT_VARIATION_NAME};
