use thiserror::Error;

use finmodel_config::ConfigError;
use finmodel_core::AxisError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid period axis: {0}")]
    Axis(#[from] AxisError),
    #[error("invalid defined name '{name}': {reason}")]
    DefinedName { name: String, reason: String },
}
