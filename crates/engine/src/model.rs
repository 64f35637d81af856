//! Model assembly: resolves the run state, lays out every sheet, then emits
//! them in workbook order.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use finmodel_config::Settings;
use finmodel_core::{PeriodAxis, RowMap, Sheet, SheetKind, MAX_FORECAST_YEARS};
use tracing::{debug, info, warn};

use crate::assumptions::AssumptionRegistry;
use crate::baseline::Baseline;
use crate::comps::{self, CompLine};
use crate::context::BuildContext;
use crate::dashboard::{self, DashboardLayout};
use crate::error::EngineError;
use crate::input::ModelRequest;
use crate::names::{self, DefinedName};
use crate::ratios::{self, RatioLine};
use crate::scenarios::{self, ScenLine};
use crate::sensitivity::{self, SensitivityLayout};
use crate::statements::{BsLine, CfLine, IsLine, StatementLayouts};
use crate::summary::{self, SummaryLine};
use crate::valuation::{self, ValLine};

/// Finalized row maps of every laid-out sheet.
#[derive(Debug, Clone)]
pub struct ModelRows {
    pub ratios: RowMap<RatioLine>,
    pub income: RowMap<IsLine>,
    pub balance: RowMap<BsLine>,
    pub cash_flow: RowMap<CfLine>,
    pub valuation: RowMap<ValLine>,
    pub comparables: RowMap<CompLine>,
    pub scenarios: RowMap<ScenLine>,
    pub summary: RowMap<SummaryLine>,
}

/// An assembled workbook, ready to evaluate or persist.
#[derive(Debug, Clone)]
pub struct FinancialModel {
    company: String,
    sheets: Vec<Sheet>,
    defined_names: Vec<DefinedName>,
    active: SheetKind,
    pub axis: PeriodAxis,
    pub assumptions: AssumptionRegistry,
    pub rows: ModelRows,
    pub sensitivity: SensitivityLayout,
    pub dashboard: DashboardLayout,
}

impl FinancialModel {
    pub fn company(&self) -> &str {
        &self.company
    }

    /// Sheets in workbook order.
    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, kind: SheetKind) -> &Sheet {
        &self.sheets[kind.position()]
    }

    pub fn defined_names(&self) -> &[DefinedName] {
        &self.defined_names
    }

    pub fn active_sheet(&self) -> SheetKind {
        self.active
    }

    pub fn cell_count(&self) -> usize {
        self.sheets.iter().map(Sheet::cell_count).sum()
    }
}

/// Requested horizon clamped into `1..=MAX_FORECAST_YEARS`.
pub fn forecast_horizon(requested: i64) -> usize {
    let clamped = requested.clamp(1, MAX_FORECAST_YEARS as i64);
    if clamped != requested {
        warn!(requested, used = clamped, "forecast_years out of range, clamped");
    }
    clamped as usize
}

/// Build the whole model. `generated_on` stamps the Summary sheet and supplies
/// the base year when the settings leave it open.
pub fn build_model(
    request: &ModelRequest,
    settings: &Settings,
    generated_on: NaiveDate,
) -> Result<FinancialModel, EngineError> {
    settings.validate()?;
    let forecast_years = forecast_horizon(request.model_structure.forecast_years);
    let base_year = settings.model.base_year.unwrap_or_else(|| generated_on.year());
    let axis = PeriodAxis::new(
        settings.model.hist_years,
        forecast_years,
        base_year,
        settings.model.first_column,
    )?;
    info!(
        company = %request.company_name,
        forecast_years,
        base_year,
        "building financial model"
    );

    let baseline = Baseline::resolve(&request.financial_data, settings);
    let assumptions = AssumptionRegistry::resolve(request, &baseline, settings);
    let ratios_layout = ratios::layout(&assumptions);
    let defined_names = names::define_all(
        assumptions
            .defined_names()
            .into_iter()
            .chain(ratios::defined_names(ratios_layout.rows())),
    )?;

    let ctx = BuildContext {
        settings,
        request,
        axis: &axis,
        assumptions: &assumptions,
        baseline: &baseline,
    };

    // Layout first: every builder below receives finalized row maps only.
    let statements = StatementLayouts::new();
    let valuation_layout = valuation::layout();
    let peers = comps::peers(&ctx);
    let comps_layout = comps::layout(peers.len());
    let sensitivity_layout = SensitivityLayout::new(settings, ctx.label_col());
    let scenario_layout = scenarios::layout();
    let dashboard_layout = DashboardLayout::new();
    let summary_layout = summary::layout();

    let is = statements.income.rows();
    let bs = statements.balance.rows();
    let cf = statements.cash_flow.rows();
    let val = valuation_layout.rows();

    let mut built: BTreeMap<SheetKind, Sheet> = BTreeMap::new();
    let mut emit = |sheet: Sheet| {
        debug!(sheet = sheet.name(), cells = sheet.cell_count(), "sheet built");
        built.insert(sheet.kind(), sheet);
    };
    emit(summary::build(&ctx, &summary_layout, val, generated_on));
    let mut assumptions_sheet = assumptions.build_sheet(&ctx);
    ratios::write(&ctx, &ratios_layout, &mut assumptions_sheet, is, bs, cf);
    emit(assumptions_sheet);
    for sheet in statements.build(&ctx) {
        emit(sheet);
    }
    emit(valuation::build(&ctx, &valuation_layout, is, bs, cf));
    emit(comps::build(&ctx, &comps_layout, &peers, is, bs, val));
    emit(sensitivity::build(&ctx, &sensitivity_layout));
    emit(scenarios::build(&ctx, &scenario_layout, is, val));
    emit(dashboard::build(&ctx, &dashboard_layout, is, val));

    let sheets: Vec<Sheet> = built.into_values().collect();
    debug_assert!(sheets.iter().map(Sheet::kind).eq(SheetKind::ORDER));

    let rows = ModelRows {
        ratios: ratios_layout.into_rows(),
        income: statements.income.into_rows(),
        balance: statements.balance.into_rows(),
        cash_flow: statements.cash_flow.into_rows(),
        valuation: valuation_layout.into_rows(),
        comparables: comps_layout.into_rows(),
        scenarios: scenario_layout.into_rows(),
        summary: summary_layout.into_rows(),
    };
    let model = FinancialModel {
        company: ctx.company().to_string(),
        sheets,
        defined_names,
        active: SheetKind::Summary,
        axis,
        assumptions,
        rows,
        sensitivity: sensitivity_layout,
        dashboard: dashboard_layout,
    };
    info!(
        sheets = model.sheets.len(),
        cells = model.cell_count(),
        names = model.defined_names.len(),
        "financial model built"
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    #[test]
    fn horizon_is_clamped() {
        assert_eq!(forecast_horizon(0), 1);
        assert_eq!(forecast_horizon(-3), 1);
        assert_eq!(forecast_horizon(7), 7);
        assert_eq!(forecast_horizon(40), 10);
    }

    #[test]
    fn sheets_follow_workbook_order() {
        let model = build_model(&ModelRequest::default(), &Settings::default(), date()).unwrap();
        let kinds: Vec<_> = model.sheets().iter().map(Sheet::kind).collect();
        assert_eq!(kinds, SheetKind::ORDER.to_vec());
        assert_eq!(model.active_sheet(), SheetKind::Summary);
        assert_eq!(model.defined_names().len(), 33);
        assert_eq!(model.company(), "Company");
    }

    #[test]
    fn base_year_defaults_to_generation_year() {
        let model = build_model(&ModelRequest::default(), &Settings::default(), date()).unwrap();
        assert_eq!(model.axis.forecast()[0].label, "FY2025E");
        assert_eq!(model.axis.historical()[0].label, "FY2020");

        let mut settings = Settings::default();
        settings.model.base_year = Some(2030);
        let model = build_model(&ModelRequest::default(), &settings, date()).unwrap();
        assert_eq!(model.axis.last().label, "FY2034E");
    }

    #[test]
    fn invalid_history_is_rejected() {
        let mut settings = Settings::default();
        settings.model.hist_years = 0;
        let err = build_model(&ModelRequest::default(), &settings, date()).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)), "{err}");
    }

    #[test]
    fn settings_built_in_code_are_validated() {
        let mut settings = Settings::default();
        settings.sensitivity.wacc_axis.clear();
        let err = build_model(&ModelRequest::default(), &settings, date()).unwrap_err();
        assert!(err.to_string().contains("sensitivity.wacc_axis"), "{err}");
    }
}
