// Engine configuration
// Immutable once loaded; every generation run borrows the same `&Settings`.

pub mod palette;
pub mod settings;

use std::path::PathBuf;

use thiserror::Error;

pub use palette::Palette;
pub use settings::{
    AssumptionDefaults, FormatSettings, ModelSettings, ScenarioRange, ScenarioSettings,
    SensitivitySettings, Settings, UnitSettings,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported config extension: {0}")]
    Extension(String),
    #[error("config validation error: {0}")]
    Invalid(String),
}
