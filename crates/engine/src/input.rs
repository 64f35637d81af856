//! Generation request contract.
//!
//! Everything is optional: missing blocks default to empty, unknown keys are
//! ignored, and numeric fields that arrive as strings, nulls or garbage are
//! read as absent rather than failing the whole request.

use std::collections::BTreeMap;

use finmodel_config::UnitSettings;
use finmodel_core::SheetKind;
use serde::{Deserialize, Deserializer};

/// Default forecast horizon when the request omits one.
pub const DEFAULT_FORECAST_YEARS: i64 = 5;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelRequest {
    pub company_name: String,
    pub model_structure: ModelStructure,
    pub financial_data: FinancialData,
    pub industry_info: IndustryInfo,
}

impl ModelRequest {
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelStructure {
    pub forecast_years: i64,
    /// Assumption key -> value, applied ahead of every other source
    pub assumption_overrides: BTreeMap<String, f64>,
    /// Replacement titles for individual sheets
    pub sheet_titles: BTreeMap<SheetKind, String>,
}

impl Default for ModelStructure {
    fn default() -> Self {
        Self {
            forecast_years: DEFAULT_FORECAST_YEARS,
            assumption_overrides: BTreeMap::new(),
            sheet_titles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FinancialData {
    pub company_info: CompanyInfo,
    pub income_statement: IncomeFigures,
    pub balance_sheet: BalanceFigures,
    pub cash_flow: CashFlowFigures,
    pub real_financials: RealFinancials,
    #[serde(alias = "damodaran")]
    pub industry_benchmarks: Benchmarks,
    pub peers: Vec<Peer>,
    pub data_source: Option<String>,
}

/// Live quote and profile figures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompanyInfo {
    #[serde(deserialize_with = "lenient")]
    pub revenue_growth: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub gross_margin: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub ebitda_margin: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub beta: Option<f64>,
    /// Already in report units
    #[serde(deserialize_with = "lenient")]
    pub shares_outstanding: Option<f64>,
    /// Raw share count as quoted by market-data feeds
    #[serde(rename = "sharesOutstanding", deserialize_with = "lenient")]
    pub raw_shares_outstanding: Option<f64>,
    #[serde(alias = "currentPrice", deserialize_with = "lenient")]
    pub current_price: Option<f64>,
    #[serde(alias = "marketCap", deserialize_with = "lenient")]
    pub market_cap: Option<f64>,
    #[serde(alias = "faceValue", deserialize_with = "lenient")]
    pub face_value: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IncomeFigures {
    #[serde(alias = "totalRevenue", deserialize_with = "lenient")]
    pub revenue: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub ebitda: Option<f64>,
    #[serde(alias = "netIncome", deserialize_with = "lenient")]
    pub net_income: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BalanceFigures {
    #[serde(alias = "totalAssets", deserialize_with = "lenient")]
    pub total_assets: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CashFlowFigures {
    #[serde(alias = "operatingCashflow", deserialize_with = "lenient")]
    pub operating_cash_flow: Option<f64>,
    #[serde(alias = "capitalExpenditures", deserialize_with = "lenient")]
    pub capital_expenditure: Option<f64>,
}

/// Consolidated figures already in report units.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RealFinancials {
    #[serde(deserialize_with = "lenient")]
    pub revenue: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub ebitda: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub net_income: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub gross_margin: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub ebitda_margin: Option<f64>,
}

/// Cached industry averages.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Benchmarks {
    pub growth: GrowthBenchmark,
    pub margins: MarginBenchmark,
    pub working_capital: WorkingCapitalBenchmark,
    pub capex: CapexBenchmark,
    pub wacc: WaccBenchmark,
    pub erp: ErpBenchmark,
    pub beta: BetaBenchmark,
    #[serde(deserialize_with = "lenient")]
    pub terminal_growth: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub tax_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GrowthBenchmark {
    #[serde(deserialize_with = "lenient")]
    pub expected_growth: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MarginBenchmark {
    #[serde(deserialize_with = "lenient")]
    pub gross_margin: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub ebitda_margin: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkingCapitalBenchmark {
    #[serde(deserialize_with = "lenient")]
    pub receivable_days: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub inventory_days: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub payable_days: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CapexBenchmark {
    #[serde(deserialize_with = "lenient")]
    pub capex_to_sales: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub capex_to_depreciation: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WaccBenchmark {
    #[serde(deserialize_with = "lenient")]
    pub cost_of_debt: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub debt_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ErpBenchmark {
    #[serde(deserialize_with = "lenient")]
    pub risk_free_rate: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub total_erp: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BetaBenchmark {
    #[serde(deserialize_with = "lenient")]
    pub levered_beta: Option<f64>,
}

/// Comparable company supplied with the request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Peer {
    pub name: String,
    #[serde(deserialize_with = "lenient")]
    pub market_cap: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub revenue: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub ebitda: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub ebitda_margin: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub pe: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub ev_ebitda: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub ev_revenue: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub roe: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IndustryInfo {
    pub industry_name: String,
    pub model_type: String,
    pub key_metrics: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub industry_beta: Option<f64>,
}

/// Numbers, numeric strings, or absent. Anything else reads as absent.
fn lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    })
}

/// Bring a raw monetary figure into report units.
///
/// Figures whose magnitude exceeds `normalize_threshold` are assumed to be in
/// base currency units and are divided by `report_divisor` (1e9 / 1e7 turns
/// rupees into crores). Smaller figures are assumed to be in report units
/// already. This is a magnitude heuristic: a genuinely small company reported
/// in rupees, or a huge one already in crores, is misclassified.
pub fn normalize_amount(raw: f64, units: &UnitSettings) -> f64 {
    if raw.abs() > units.normalize_threshold {
        raw / units.report_divisor
    } else {
        raw
    }
}
