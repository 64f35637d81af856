// Engine settings
// Loaded from TOML or JSON; every section falls back to defaults when absent.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::palette::Palette;
use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: ModelSettings,
    pub units: UnitSettings,
    pub palette: Palette,
    pub formats: FormatSettings,
    pub sensitivity: SensitivitySettings,
    pub scenarios: ScenarioSettings,
    pub defaults: AssumptionDefaults,
}

/// Period axis and sheet geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Number of historical periods before the first forecast year
    pub hist_years: usize,
    /// Zero-based column of the first period (2 = column C)
    pub first_column: u16,
    /// Zero-based column holding row labels (1 = column B)
    pub label_column: u16,
    /// First forecast year; `None` uses the current calendar year
    pub base_year: Option<i32>,
    /// Day-count basis for working-capital days
    pub days_in_year: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            hist_years: 5,
            first_column: 2,
            label_column: 1,
            base_year: None,
            days_in_year: 365.0,
        }
    }
}

/// Report currency and unit conventions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitSettings {
    pub currency_symbol: String,
    /// Label appended to sheet titles, e.g. "Crores"
    pub unit_label: String,
    /// Raw monetary figures with larger magnitude are treated as unscaled
    pub normalize_threshold: f64,
    /// Divisor applied to unscaled raw figures (1e7 = crores)
    pub report_divisor: f64,
    /// Multiplier from equity-value units per share-count unit to a per-share price
    pub per_share_scale: f64,
}

impl Default for UnitSettings {
    fn default() -> Self {
        Self {
            currency_symbol: "₹".into(),
            unit_label: "Crores".into(),
            normalize_threshold: 1e9,
            report_divisor: 1e7,
            per_share_scale: 1.0,
        }
    }
}

/// Excel number-format codes per display-format class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatSettings {
    pub integer: String,
    pub decimal: String,
    pub currency: String,
    pub percent: String,
    pub ratio: String,
    pub factor: String,
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            integer: "#,##0".into(),
            decimal: "#,##0.0".into(),
            currency: "₹#,##0".into(),
            percent: "0.0%".into(),
            ratio: "0.00\"x\"".into(),
            factor: "0.000".into(),
        }
    }
}

/// Axes and proxy constants for the sensitivity grids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivitySettings {
    pub wacc_axis: Vec<f64>,
    pub terminal_growth_axis: Vec<f64>,
    pub revenue_growth_axis: Vec<f64>,
    pub ebitda_margin_axis: Vec<f64>,
    pub base_cash_flow: f64,
    pub base_revenue: f64,
    pub exit_multiple: f64,
    pub horizon_years: f64,
}

impl Default for SensitivitySettings {
    fn default() -> Self {
        Self {
            wacc_axis: vec![0.08, 0.09, 0.10, 0.11, 0.12, 0.13, 0.14],
            terminal_growth_axis: vec![0.02, 0.025, 0.03, 0.035, 0.04, 0.045, 0.05],
            revenue_growth_axis: vec![0.05, 0.08, 0.10, 0.12, 0.15, 0.18, 0.20],
            ebitda_margin_axis: vec![0.15, 0.20, 0.25, 0.30, 0.35],
            base_cash_flow: 1000.0,
            base_revenue: 10000.0,
            exit_multiple: 8.0,
            horizon_years: 5.0,
        }
    }
}

/// Bear and bull literals for one scenario driver. Base is their midpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRange {
    pub bear: f64,
    pub bull: f64,
}

impl ScenarioRange {
    pub const fn new(bear: f64, bull: f64) -> Self {
        Self { bear, bull }
    }

    pub fn base(&self) -> f64 {
        (self.bear + self.bull) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSettings {
    pub revenue_growth: ScenarioRange,
    pub ebitda_margin: ScenarioRange,
    pub terminal_growth: ScenarioRange,
    pub wacc: ScenarioRange,
    pub exit_multiple: ScenarioRange,
    pub capex_pct: ScenarioRange,
    pub working_capital_days: ScenarioRange,
    pub debt_to_equity: ScenarioRange,
    pub tax_rate: ScenarioRange,
    pub horizon_years: f64,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            revenue_growth: ScenarioRange::new(0.05, 0.15),
            ebitda_margin: ScenarioRange::new(0.18, 0.32),
            terminal_growth: ScenarioRange::new(0.02, 0.05),
            wacc: ScenarioRange::new(0.14, 0.09),
            exit_multiple: ScenarioRange::new(6.0, 10.0),
            capex_pct: ScenarioRange::new(0.08, 0.04),
            working_capital_days: ScenarioRange::new(60.0, 35.0),
            debt_to_equity: ScenarioRange::new(0.8, 0.3),
            tax_rate: ScenarioRange::new(0.30, 0.22),
            horizon_years: 5.0,
        }
    }
}

/// Last-resort assumption values, used when no override, company figure or
/// benchmark supplies one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssumptionDefaults {
    pub revenue_growth: f64,
    pub gross_margin: f64,
    pub ebitda_margin: f64,
    pub other_opex_pct: f64,
    /// Floor for the derived SG&A percentage
    pub sga_floor: f64,
    pub receivable_days: f64,
    pub inventory_days: f64,
    pub payable_days: f64,
    pub capex_pct: f64,
    pub da_pct: f64,
    pub interest_pct: f64,
    pub cost_of_debt: f64,
    pub debt_to_equity: f64,
    pub debt_amortization: f64,
    pub risk_free_rate: f64,
    pub equity_risk_premium: f64,
    pub beta: f64,
    pub terminal_growth: f64,
    pub tax_rate: f64,
    pub dividend_payout: f64,
    pub shares_outstanding: f64,
    /// Nominal value per share
    pub face_value: f64,
    /// Anchor revenue when no base figure is available
    pub base_revenue: f64,
    /// Market cap / revenue proxy for the anchor revenue
    pub price_to_sales: f64,
    /// Total assets / market cap proxy for the balance-sheet base
    pub assets_to_market_cap: f64,
    /// Total assets / revenue proxy for the balance-sheet base
    pub assets_to_revenue: f64,
}

impl Default for AssumptionDefaults {
    fn default() -> Self {
        Self {
            revenue_growth: 0.10,
            gross_margin: 0.35,
            ebitda_margin: 0.20,
            other_opex_pct: 0.02,
            sga_floor: 0.05,
            receivable_days: 45.0,
            inventory_days: 30.0,
            payable_days: 60.0,
            capex_pct: 0.05,
            da_pct: 0.04,
            interest_pct: 0.02,
            cost_of_debt: 0.09,
            debt_to_equity: 0.5,
            debt_amortization: 0.0,
            risk_free_rate: 0.07,
            equity_risk_premium: 0.055,
            beta: 1.0,
            terminal_growth: 0.04,
            tax_rate: 0.25,
            dividend_payout: 0.20,
            shares_outstanding: 10.0,
            face_value: 10.0,
            base_revenue: 10000.0,
            price_to_sales: 3.0,
            assets_to_market_cap: 1.5,
            assets_to_revenue: 1.25,
        }
    }
}

impl Settings {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from a `.toml` or `.json` file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&contents),
            Some("json") => Self::from_json(&contents),
            other => Err(ConfigError::Extension(other.unwrap_or("").to_string())),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.model.hist_years == 0 {
            return invalid("model.hist_years must be at least 1".into());
        }
        if self.model.first_column <= self.model.label_column {
            return invalid(format!(
                "model.first_column ({}) must be right of model.label_column ({})",
                self.model.first_column, self.model.label_column
            ));
        }
        if self.model.days_in_year <= 0.0 {
            return invalid("model.days_in_year must be positive".into());
        }
        if self.units.report_divisor <= 0.0 || self.units.normalize_threshold <= 0.0 {
            return invalid("units.report_divisor and units.normalize_threshold must be positive".into());
        }

        let axes = [
            ("sensitivity.wacc_axis", &self.sensitivity.wacc_axis),
            ("sensitivity.terminal_growth_axis", &self.sensitivity.terminal_growth_axis),
            ("sensitivity.revenue_growth_axis", &self.sensitivity.revenue_growth_axis),
            ("sensitivity.ebitda_margin_axis", &self.sensitivity.ebitda_margin_axis),
        ];
        for (name, axis) in axes {
            if axis.is_empty() {
                return invalid(format!("{name} must not be empty"));
            }
            if axis.iter().any(|v| !v.is_finite()) {
                return invalid(format!("{name} must contain finite values"));
            }
        }
        if self.sensitivity.horizon_years <= 0.0 || self.scenarios.horizon_years <= 0.0 {
            return invalid("horizon_years must be positive".into());
        }

        self.palette.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.model.hist_years, 5);
        assert_eq!(settings.model.first_column, 2);
        assert_eq!(settings.formats.percent, "0.0%");
    }

    #[test]
    fn partial_toml_overrides_one_field() {
        let settings = Settings::from_toml(
            r#"
[model]
hist_years = 3
base_year = 2030

[sensitivity]
wacc_axis = [0.1, 0.11, 0.12]

[scenarios.exit_multiple]
bear = 5.0
bull = 12.0
"#,
        )
        .unwrap();
        assert_eq!(settings.model.hist_years, 3);
        assert_eq!(settings.model.base_year, Some(2030));
        assert_eq!(settings.model.first_column, 2);
        assert_eq!(settings.sensitivity.wacc_axis.len(), 3);
        assert_eq!(settings.sensitivity.terminal_growth_axis.len(), 7);
        assert_eq!(settings.scenarios.exit_multiple.base(), 8.5);
    }

    #[test]
    fn json_settings() {
        let settings =
            Settings::from_json(r#"{"units": {"per_share_scale": 10.0}, "defaults": {"tax_rate": 0.3}}"#)
                .unwrap();
        assert_eq!(settings.units.per_share_scale, 10.0);
        assert_eq!(settings.units.report_divisor, 1e7);
        assert_eq!(settings.defaults.tax_rate, 0.3);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            Settings::from_toml("[model]\nhist_years = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Settings::from_toml("[sensitivity]\nwacc_axis = []"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Settings::from_toml("[model]\nfirst_column = 1"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Settings::from_toml("[model\n"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("engine.toml");
        fs::write(&toml_path, "[units]\nunit_label = \"Millions\"\n").unwrap();
        assert_eq!(Settings::load(&toml_path).unwrap().units.unit_label, "Millions");

        let yaml_path = dir.path().join("engine.yaml");
        fs::write(&yaml_path, "").unwrap();
        assert!(matches!(Settings::load(&yaml_path), Err(ConfigError::Extension(_))));

        let missing = dir.path().join("missing.toml");
        assert!(matches!(Settings::load(&missing), Err(ConfigError::Read { .. })));
    }
}
