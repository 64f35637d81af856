//! Financial model synthesis.
//!
//! A [`ModelRequest`] plus [`Settings`](finmodel_config::Settings) resolve into an
//! assumption registry and a period axis; every sheet is then laid out into typed
//! row maps and emitted as formula cells that reference each other only through
//! those maps. [`build_model`] returns the assembled [`FinancialModel`];
//! [`evaluate_all`] computes every formula the way a spreadsheet would.

pub mod assumptions;
pub mod baseline;
pub mod comps;
pub mod context;
pub mod dashboard;
pub mod error;
pub mod eval;
pub mod input;
pub mod model;
pub mod names;
pub mod ratios;
pub mod scenarios;
pub mod sensitivity;
pub mod statements;
pub mod summary;
pub mod valuation;

#[cfg(test)]
mod test_support;

pub use assumptions::{AssumptionKey, AssumptionRegistry, SourceTier};
pub use error::EngineError;
pub use eval::{evaluate_all, ModelEvaluator};
pub use input::ModelRequest;
pub use model::{build_model, FinancialModel, ModelRows};
pub use names::DefinedName;
