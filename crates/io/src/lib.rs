// Workbook persistence
//
// `generate_financial_model` is the one-call entry point: build the model, then
// write it to the caller's path.

pub mod xlsx;
pub mod xlsx_styles;

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use thiserror::Error;
use tracing::info;

use finmodel_config::Settings;
use finmodel_engine::{build_model, EngineError, ModelRequest};

pub use xlsx::{export, ExportError, ExportResult};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Build the model for `request` and save it to `path`, stamped with today's date.
pub fn generate_financial_model(
    request: &ModelRequest,
    settings: &Settings,
    path: impl AsRef<Path>,
) -> Result<PathBuf, GenerateError> {
    generate_financial_model_on(request, settings, path, Local::now().date_naive())
}

/// As [`generate_financial_model`], with an explicit generation date.
pub fn generate_financial_model_on(
    request: &ModelRequest,
    settings: &Settings,
    path: impl AsRef<Path>,
    generated_on: NaiveDate,
) -> Result<PathBuf, GenerateError> {
    let path = path.as_ref();
    let model = build_model(request, settings, generated_on)?;
    let stats = export(&model, settings, path)?;
    info!(
        company = model.company(),
        path = %path.display(),
        formula_errors = stats.formula_errors,
        "financial model generated"
    );
    Ok(path.to_path_buf())
}
