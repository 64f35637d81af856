//! Assumption registry.
//!
//! Every named input is resolved once through its source chain
//! (override -> company figures -> industry benchmark -> default) and pinned to
//! a row of the Assumptions sheet. Later sheets reference the value cell by
//! absolute address; the workbook also publishes a defined name for it.

use finmodel_config::Settings;
use finmodel_core::{
    CellAddress, CellStyle, Expr, Layout, LineKey, NumberFormat, RowMap, Sheet, SheetKind, Slot,
    StyleRole,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::baseline::Baseline;
use crate::context::BuildContext;
use crate::input::{normalize_amount, ModelRequest};

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    Override,
    Real,
    Benchmark,
    Default,
    Derived,
}

impl SourceTier {
    pub fn label(&self) -> &'static str {
        match self {
            SourceTier::Override => "Override",
            SourceTier::Real => "Company data",
            SourceTier::Benchmark => "Industry benchmark",
            SourceTier::Default => "Default",
            SourceTier::Derived => "Derived",
        }
    }
}

/// Zero, missing and non-finite figures carry no information.
pub(crate) fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != 0.0)
}

/// First usable candidate, else `fallback` tagged as a default.
pub(crate) fn resolve_chain(
    key: &str,
    candidates: &[(SourceTier, Option<f64>)],
    fallback: f64,
) -> (f64, SourceTier) {
    for (tier, value) in candidates {
        if let Some(value) = usable(*value) {
            debug!(key, tier = ?tier, value, "resolved");
            return (value, *tier);
        }
    }
    debug!(key, value = fallback, "fell back to default");
    (fallback, SourceTier::Default)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Percent,
    Ratio,
    Currency,
    Days,
    Number,
}

impl Unit {
    pub fn format(&self) -> NumberFormat {
        match self {
            Unit::Percent => NumberFormat::Percent,
            Unit::Ratio => NumberFormat::Ratio,
            Unit::Currency => NumberFormat::Currency,
            Unit::Days => NumberFormat::Integer,
            Unit::Number => NumberFormat::Decimal,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Unit::Percent => "percent",
            Unit::Ratio => "ratio",
            Unit::Currency => "currency",
            Unit::Days => "days",
            Unit::Number => "number",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssumptionKey {
    RevenueGrowth,
    GrossMargin,
    EbitdaMargin,
    SgaPct,
    OtherOpexPct,
    ReceivableDays,
    InventoryDays,
    PayableDays,
    CapexPct,
    DaPct,
    InterestPct,
    CostOfDebt,
    DebtToEquity,
    DebtAmortization,
    DividendPayout,
    RiskFreeRate,
    EquityRiskPremium,
    Beta,
    TerminalGrowth,
    TaxRate,
    SharesOutstanding,
    CurrentPrice,
    MarketCap,
}

impl LineKey for AssumptionKey {
    const SHEET: SheetKind = SheetKind::Assumptions;
}

impl AssumptionKey {
    pub const ALL: [AssumptionKey; 23] = [
        AssumptionKey::RevenueGrowth,
        AssumptionKey::GrossMargin,
        AssumptionKey::EbitdaMargin,
        AssumptionKey::SgaPct,
        AssumptionKey::OtherOpexPct,
        AssumptionKey::ReceivableDays,
        AssumptionKey::InventoryDays,
        AssumptionKey::PayableDays,
        AssumptionKey::CapexPct,
        AssumptionKey::DaPct,
        AssumptionKey::InterestPct,
        AssumptionKey::CostOfDebt,
        AssumptionKey::DebtToEquity,
        AssumptionKey::DebtAmortization,
        AssumptionKey::DividendPayout,
        AssumptionKey::RiskFreeRate,
        AssumptionKey::EquityRiskPremium,
        AssumptionKey::Beta,
        AssumptionKey::TerminalGrowth,
        AssumptionKey::TaxRate,
        AssumptionKey::SharesOutstanding,
        AssumptionKey::CurrentPrice,
        AssumptionKey::MarketCap,
    ];

    /// Request-level key, as used in `assumption_overrides`.
    pub fn key(&self) -> &'static str {
        match self {
            AssumptionKey::RevenueGrowth => "revenue_growth",
            AssumptionKey::GrossMargin => "gross_margin",
            AssumptionKey::EbitdaMargin => "ebitda_margin",
            AssumptionKey::SgaPct => "sga_pct",
            AssumptionKey::OtherOpexPct => "other_opex_pct",
            AssumptionKey::ReceivableDays => "receivable_days",
            AssumptionKey::InventoryDays => "inventory_days",
            AssumptionKey::PayableDays => "payable_days",
            AssumptionKey::CapexPct => "capex_pct",
            AssumptionKey::DaPct => "da_pct",
            AssumptionKey::InterestPct => "interest_pct",
            AssumptionKey::CostOfDebt => "cost_of_debt",
            AssumptionKey::DebtToEquity => "debt_to_equity",
            AssumptionKey::DebtAmortization => "debt_amortization",
            AssumptionKey::DividendPayout => "dividend_payout",
            AssumptionKey::RiskFreeRate => "risk_free_rate",
            AssumptionKey::EquityRiskPremium => "equity_risk_premium",
            AssumptionKey::Beta => "beta",
            AssumptionKey::TerminalGrowth => "terminal_growth",
            AssumptionKey::TaxRate => "tax_rate",
            AssumptionKey::SharesOutstanding => "shares_outstanding",
            AssumptionKey::CurrentPrice => "current_price",
            AssumptionKey::MarketCap => "market_cap",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.key() == key)
    }

    /// Workbook-level defined name for the value cell.
    pub fn defined_name(&self) -> &'static str {
        match self {
            AssumptionKey::RevenueGrowth => "Revenue_Growth",
            AssumptionKey::GrossMargin => "Gross_Margin",
            AssumptionKey::EbitdaMargin => "EBITDA_Margin",
            AssumptionKey::SgaPct => "SGA_Pct",
            AssumptionKey::OtherOpexPct => "Other_Opex_Pct",
            AssumptionKey::ReceivableDays => "Receivable_Days",
            AssumptionKey::InventoryDays => "Inventory_Days",
            AssumptionKey::PayableDays => "Payable_Days",
            AssumptionKey::CapexPct => "Capex_Pct",
            AssumptionKey::DaPct => "DA_Pct",
            AssumptionKey::InterestPct => "Interest_Pct",
            AssumptionKey::CostOfDebt => "Cost_Of_Debt",
            AssumptionKey::DebtToEquity => "Debt_To_Equity",
            AssumptionKey::DebtAmortization => "Debt_Amortization",
            AssumptionKey::DividendPayout => "Dividend_Payout",
            AssumptionKey::RiskFreeRate => "Risk_Free_Rate",
            AssumptionKey::EquityRiskPremium => "Equity_Risk_Premium",
            AssumptionKey::Beta => "Beta",
            AssumptionKey::TerminalGrowth => "Terminal_Growth",
            AssumptionKey::TaxRate => "Tax_Rate",
            AssumptionKey::SharesOutstanding => "Shares_Outstanding",
            AssumptionKey::CurrentPrice => "Current_Price",
            AssumptionKey::MarketCap => "Market_Cap",
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            AssumptionKey::ReceivableDays
            | AssumptionKey::InventoryDays
            | AssumptionKey::PayableDays => Unit::Days,
            AssumptionKey::DebtToEquity | AssumptionKey::Beta => Unit::Ratio,
            AssumptionKey::CurrentPrice => Unit::Currency,
            AssumptionKey::SharesOutstanding | AssumptionKey::MarketCap => Unit::Number,
            _ => Unit::Percent,
        }
    }

    fn note(&self) -> &'static str {
        match self {
            AssumptionKey::RevenueGrowth => "Annual revenue growth",
            AssumptionKey::GrossMargin => "Gross profit / revenue",
            AssumptionKey::EbitdaMargin => "EBITDA / revenue",
            AssumptionKey::SgaPct => "Gross margin - EBITDA margin - other opex, floored",
            AssumptionKey::OtherOpexPct => "Other operating expenses / revenue",
            AssumptionKey::ReceivableDays => "DSO",
            AssumptionKey::InventoryDays => "DIO, on cost of goods sold",
            AssumptionKey::PayableDays => "DPO, on cost of goods sold",
            AssumptionKey::CapexPct => "Capital expenditure / revenue",
            AssumptionKey::DaPct => "Capex to sales / capex to depreciation",
            AssumptionKey::InterestPct => "Interest expense / revenue",
            AssumptionKey::CostOfDebt => "Pre-tax borrowing rate",
            AssumptionKey::DebtToEquity => "Target capital structure",
            AssumptionKey::DebtAmortization => "Annual paydown of long-term debt",
            AssumptionKey::DividendPayout => "Share of positive net income paid out",
            AssumptionKey::RiskFreeRate => "10Y government bond yield",
            AssumptionKey::EquityRiskPremium => "Country equity risk premium",
            AssumptionKey::Beta => "Levered beta",
            AssumptionKey::TerminalGrowth => "Long-term nominal growth",
            AssumptionKey::TaxRate => "Effective corporate tax rate",
            AssumptionKey::SharesOutstanding => "Share count in report units",
            AssumptionKey::CurrentPrice => "Latest market price",
            AssumptionKey::MarketCap => "Market capitalization",
        }
    }
}

/// Assumptions sheet: section headers and the row of every key.
const SLOTS: &[Slot<AssumptionKey>] = &[
    Slot::Header("GROWTH"),
    Slot::line(AssumptionKey::RevenueGrowth, "Revenue Growth Rate"),
    Slot::Blank,
    Slot::Header("MARGINS"),
    Slot::line(AssumptionKey::GrossMargin, "Gross Margin"),
    Slot::line(AssumptionKey::EbitdaMargin, "EBITDA Margin"),
    Slot::line(AssumptionKey::SgaPct, "SG&A as % of Revenue"),
    Slot::line(AssumptionKey::OtherOpexPct, "Other Opex as % of Revenue"),
    Slot::Blank,
    Slot::Header("WORKING CAPITAL"),
    Slot::line(AssumptionKey::ReceivableDays, "Receivable Days"),
    Slot::line(AssumptionKey::InventoryDays, "Inventory Days"),
    Slot::line(AssumptionKey::PayableDays, "Payable Days"),
    Slot::Blank,
    Slot::Header("CAPEX & D&A"),
    Slot::line(AssumptionKey::CapexPct, "Capex % of Revenue"),
    Slot::line(AssumptionKey::DaPct, "D&A % of Revenue"),
    Slot::Blank,
    Slot::Header("FINANCING"),
    Slot::line(AssumptionKey::InterestPct, "Interest % of Revenue"),
    Slot::line(AssumptionKey::CostOfDebt, "Cost of Debt (pre-tax)"),
    Slot::line(AssumptionKey::DebtToEquity, "Debt/Equity Ratio"),
    Slot::line(AssumptionKey::DebtAmortization, "Long-term Debt Amortization"),
    Slot::line(AssumptionKey::DividendPayout, "Dividend Payout Ratio"),
    Slot::Blank,
    Slot::Header("VALUATION INPUTS"),
    Slot::line(AssumptionKey::RiskFreeRate, "Risk-free Rate"),
    Slot::line(AssumptionKey::EquityRiskPremium, "Equity Risk Premium"),
    Slot::line(AssumptionKey::Beta, "Beta"),
    Slot::line(AssumptionKey::TerminalGrowth, "Terminal Growth Rate"),
    Slot::line(AssumptionKey::TaxRate, "Tax Rate"),
    Slot::Blank,
    Slot::Header("COMPANY DATA"),
    Slot::line(AssumptionKey::SharesOutstanding, "Shares Outstanding"),
    Slot::line(AssumptionKey::CurrentPrice, "Current Price"),
    Slot::line(AssumptionKey::MarketCap, "Market Cap"),
];

const COLUMN_HEADER_ROW: u32 = 5;
const FIRST_ROW: u32 = 6;
pub(crate) const VALUE_COL: u16 = 2;
pub(crate) const UNIT_COL: u16 = 3;
pub(crate) const NOTE_COL: u16 = 4;
pub(crate) const SOURCE_COL: u16 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assumption {
    pub key: AssumptionKey,
    pub value: f64,
    pub unit: Unit,
    pub tier: SourceTier,
}

#[derive(Debug, Clone)]
pub struct AssumptionRegistry {
    entries: Vec<Assumption>,
    layout: Layout<AssumptionKey>,
    sga_floor: f64,
}

impl AssumptionRegistry {
    /// Resolve every assumption. Never fails: each key ends at its default.
    pub fn resolve(request: &ModelRequest, baseline: &Baseline, settings: &Settings) -> Self {
        let data = &request.financial_data;
        let info = &data.company_info;
        let real = &data.real_financials;
        let bench = &data.industry_benchmarks;
        let defaults = &settings.defaults;

        use AssumptionKey as K;
        use SourceTier::{Benchmark, Real};

        let mut resolver = Resolver {
            overrides: Overrides::parse(request),
            entries: Vec::with_capacity(K::ALL.len()),
        };

        resolver.take(
            K::RevenueGrowth,
            &[(Real, info.revenue_growth), (Benchmark, bench.growth.expected_growth)],
            defaults.revenue_growth,
        );
        let gross = resolver.take(
            K::GrossMargin,
            &[
                (Real, info.gross_margin),
                (Real, real.gross_margin),
                (Benchmark, bench.margins.gross_margin),
            ],
            defaults.gross_margin,
        );
        let ebitda = resolver.take(
            K::EbitdaMargin,
            &[
                (Real, info.ebitda_margin),
                (Real, real.ebitda_margin),
                (Benchmark, bench.margins.ebitda_margin),
            ],
            defaults.ebitda_margin,
        );
        let other_opex = resolver.take(K::OtherOpexPct, &[], defaults.other_opex_pct);
        if resolver.overrides.get(K::SgaPct).is_some() {
            resolver.take(K::SgaPct, &[], defaults.sga_floor);
        } else {
            let value = (gross - ebitda - other_opex).max(defaults.sga_floor);
            debug!(key = "sga_pct", value, "derived from margins");
            resolver.record(K::SgaPct, value, SourceTier::Derived);
        }

        let wc = &bench.working_capital;
        resolver.take(K::ReceivableDays, &[(Benchmark, wc.receivable_days)], defaults.receivable_days);
        resolver.take(K::InventoryDays, &[(Benchmark, wc.inventory_days)], defaults.inventory_days);
        resolver.take(K::PayableDays, &[(Benchmark, wc.payable_days)], defaults.payable_days);

        let capex_real = if baseline.revenue.tier == SourceTier::Real {
            data.cash_flow
                .capital_expenditure
                .map(|capex| normalize_amount(capex.abs(), &settings.units) / baseline.revenue.value)
        } else {
            None
        };
        resolver.take(
            K::CapexPct,
            &[(Real, capex_real), (Benchmark, bench.capex.capex_to_sales)],
            defaults.capex_pct,
        );
        let da_bench = match (usable(bench.capex.capex_to_sales), usable(bench.capex.capex_to_depreciation)) {
            (Some(sales), Some(dep)) => Some(sales / dep),
            _ => None,
        };
        resolver.take(K::DaPct, &[(Benchmark, da_bench)], defaults.da_pct);

        resolver.take(K::InterestPct, &[], defaults.interest_pct);
        resolver.take(K::CostOfDebt, &[(Benchmark, bench.wacc.cost_of_debt)], defaults.cost_of_debt);
        let de_bench = bench
            .wacc
            .debt_ratio
            .filter(|r| *r > 0.0 && *r < 1.0)
            .map(|r| r / (1.0 - r));
        resolver.take(K::DebtToEquity, &[(Benchmark, de_bench)], defaults.debt_to_equity);
        resolver.take(K::DebtAmortization, &[], defaults.debt_amortization);
        resolver.take(K::DividendPayout, &[], defaults.dividend_payout);

        resolver.take(K::RiskFreeRate, &[(Benchmark, bench.erp.risk_free_rate)], defaults.risk_free_rate);
        resolver.take(
            K::EquityRiskPremium,
            &[(Benchmark, bench.erp.total_erp)],
            defaults.equity_risk_premium,
        );
        resolver.take(
            K::Beta,
            &[
                (Real, info.beta),
                (Benchmark, request.industry_info.industry_beta),
                (Benchmark, bench.beta.levered_beta),
            ],
            defaults.beta,
        );
        resolver.take(K::TerminalGrowth, &[(Benchmark, bench.terminal_growth)], defaults.terminal_growth);
        resolver.take(K::TaxRate, &[(Benchmark, bench.tax_rate)], defaults.tax_rate);

        let raw_shares = info
            .raw_shares_outstanding
            .map(|raw| raw / settings.units.report_divisor);
        resolver.take(
            K::SharesOutstanding,
            &[(Real, info.shares_outstanding), (Real, raw_shares)],
            defaults.shares_outstanding,
        );
        resolver.take(K::CurrentPrice, &[(Real, info.current_price)], 0.0);
        resolver.take(
            K::MarketCap,
            &[(Real, info.market_cap.map(|m| normalize_amount(m, &settings.units)))],
            0.0,
        );

        // SG&A is resolved after other opex but laid out before it
        let mut entries = resolver.entries;
        entries.sort_by_key(|a| a.key);

        Self {
            entries,
            layout: Layout::new(FIRST_ROW, SLOTS),
            sga_floor: defaults.sga_floor,
        }
    }

    pub fn get(&self, key: AssumptionKey) -> &Assumption {
        &self.entries[key as usize]
    }

    pub fn value(&self, key: AssumptionKey) -> f64 {
        self.get(key).value
    }

    pub fn tier(&self, key: AssumptionKey) -> SourceTier {
        self.get(key).tier
    }

    pub fn iter(&self) -> impl Iterator<Item = &Assumption> + '_ {
        self.entries.iter()
    }

    pub fn rows(&self) -> &RowMap<AssumptionKey> {
        self.layout.rows()
    }

    /// First row below the input block.
    pub fn end_row(&self) -> u32 {
        self.layout.end_row()
    }

    /// Address of the value cell.
    pub fn addr(&self, key: AssumptionKey) -> CellAddress {
        self.rows().addr(key, VALUE_COL)
    }

    /// Absolute reference to the value cell, for use on any sheet.
    pub fn cell(&self, key: AssumptionKey) -> Expr {
        Expr::abs_cell(self.addr(key))
    }

    /// `(name, address)` for every assumption, in row order.
    pub fn defined_names(&self) -> Vec<(String, CellAddress)> {
        self.rows()
            .iter()
            .map(|(key, _)| (key.defined_name().to_string(), self.addr(key)))
            .collect()
    }

    pub fn build_sheet(&self, ctx: &BuildContext) -> Sheet {
        let mut sheet = ctx.new_sheet(SheetKind::Assumptions, "Model Assumptions".to_string());
        let label_col = ctx.label_col();

        let source = ctx
            .request
            .financial_data
            .data_source
            .clone()
            .unwrap_or_else(|| "Company filings + industry benchmarks".to_string());
        sheet.text(3, label_col, format!("Data Sources: {}", source), StyleRole::Note);
        sheet.text(4, label_col, "Yellow cells are inputs - modify to update projections", StyleRole::Note);

        for (col, heading) in [
            (label_col, "Assumption"),
            (VALUE_COL, "Value"),
            (UNIT_COL, "Unit"),
            (NOTE_COL, "Basis"),
            (SOURCE_COL, "Source"),
        ] {
            sheet.text(COLUMN_HEADER_ROW, col, heading, StyleRole::Header);
        }

        self.layout.write_labels(&mut sheet, label_col);
        for (row, item) in self.layout.items() {
            let assumption = self.get(item.key);
            let format = assumption.unit.format();
            if assumption.tier == SourceTier::Derived && item.key == AssumptionKey::SgaPct {
                // Stays live: editing either margin or other opex moves SG&A
                let spread = self.cell(AssumptionKey::GrossMargin)
                    - self.cell(AssumptionKey::EbitdaMargin)
                    - self.cell(AssumptionKey::OtherOpexPct);
                sheet.formula(
                    row,
                    VALUE_COL,
                    Expr::max(spread, Expr::num(self.sga_floor)),
                    CellStyle::new(StyleRole::Calc, format),
                );
            } else {
                sheet.number(row, VALUE_COL, assumption.value, CellStyle::new(StyleRole::Input, format));
            }
            sheet.text(row, UNIT_COL, assumption.unit.name(), StyleRole::Label);
            sheet.text(row, NOTE_COL, item.key.note(), StyleRole::Note);
            sheet.text(row, SOURCE_COL, assumption.tier.label(), StyleRole::Note);
        }

        sheet.set_column_width(VALUE_COL, 14.0);
        sheet.set_column_width(UNIT_COL, 10.0);
        sheet.set_column_width(NOTE_COL, 40.0);
        sheet.set_column_width(SOURCE_COL, 20.0);
        sheet
    }
}

struct Resolver {
    overrides: Overrides,
    entries: Vec<Assumption>,
}

impl Resolver {
    fn take(&mut self, key: AssumptionKey, chain: &[(SourceTier, Option<f64>)], fallback: f64) -> f64 {
        let (value, tier) = match self.overrides.get(key) {
            Some(value) => (value, SourceTier::Override),
            None => resolve_chain(key.key(), chain, fallback),
        };
        self.record(key, value, tier)
    }

    fn record(&mut self, key: AssumptionKey, value: f64, tier: SourceTier) -> f64 {
        self.entries.push(Assumption {
            key,
            value,
            unit: key.unit(),
            tier,
        });
        value
    }
}

/// Values that would leave a formula without a finite result.
fn admissible(key: AssumptionKey, value: f64) -> bool {
    match key {
        // Weights are 1/(1+D/E) and D/E/(1+D/E)
        AssumptionKey::DebtToEquity => value > -1.0,
        _ => true,
    }
}

/// Parsed override map. Unknown keys, non-finite and out-of-range values are
/// dropped with a warning.
struct Overrides {
    values: Vec<(AssumptionKey, f64)>,
}

impl Overrides {
    fn parse(request: &ModelRequest) -> Self {
        let mut values = Vec::new();
        for (key, value) in &request.model_structure.assumption_overrides {
            match AssumptionKey::from_key(key) {
                Some(_) if !value.is_finite() => {
                    warn!(key = %key, "ignoring non-finite assumption override");
                }
                Some(parsed) if !admissible(parsed, *value) => {
                    warn!(key = %key, value = *value, "ignoring out-of-range assumption override");
                }
                Some(parsed) => values.push((parsed, *value)),
                None => warn!(key = %key, "ignoring unknown assumption override"),
            }
        }
        Self { values }
    }

    /// Overrides are explicit intent, so zero is accepted.
    fn get(&self, key: AssumptionKey) -> Option<f64> {
        self.values.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(json: &str) -> AssumptionRegistry {
        let request = ModelRequest::from_json(json).unwrap();
        let settings = Settings::default();
        let baseline = Baseline::resolve(&request.financial_data, &settings);
        AssumptionRegistry::resolve(&request, &baseline, &settings)
    }

    #[test]
    fn empty_request_uses_defaults() {
        let reg = registry("{}");
        assert_eq!(reg.value(AssumptionKey::RevenueGrowth), 0.10);
        assert_eq!(reg.tier(AssumptionKey::RevenueGrowth), SourceTier::Default);
        assert_eq!(reg.value(AssumptionKey::Beta), 1.0);
        assert_eq!(reg.value(AssumptionKey::SharesOutstanding), 10.0);
        // 0.35 - 0.20 - 0.02
        assert!((reg.value(AssumptionKey::SgaPct) - 0.13).abs() < 1e-12);
        assert_eq!(reg.tier(AssumptionKey::SgaPct), SourceTier::Derived);
    }

    #[test]
    fn entries_follow_key_order() {
        let reg = registry("{}");
        for (i, a) in reg.iter().enumerate() {
            assert_eq!(a.key, AssumptionKey::ALL[i]);
        }
    }

    #[test]
    fn zero_and_missing_fall_through() {
        let reg = registry(
            r#"{
                "financial_data": {
                    "company_info": {"beta": 0, "revenue_growth": 0.0},
                    "damodaran": {"beta": {"levered_beta": 1.2}, "growth": {"expected_growth": 0.12}}
                },
                "industry_info": {"industry_beta": null}
            }"#,
        );
        assert_eq!(reg.value(AssumptionKey::Beta), 1.2);
        assert_eq!(reg.tier(AssumptionKey::Beta), SourceTier::Benchmark);
        assert_eq!(reg.value(AssumptionKey::RevenueGrowth), 0.12);
    }

    #[test]
    fn overrides_win_and_unknown_keys_are_ignored() {
        let reg = registry(
            r#"{
                "model_structure": {"assumption_overrides": {
                    "tax_rate": 0.3, "debt_amortization": 0.0, "warp_factor": 9
                }},
                "financial_data": {"damodaran": {"tax_rate": 0.22}}
            }"#,
        );
        assert_eq!(reg.value(AssumptionKey::TaxRate), 0.3);
        assert_eq!(reg.tier(AssumptionKey::TaxRate), SourceTier::Override);
        assert_eq!(reg.tier(AssumptionKey::DebtAmortization), SourceTier::Override);
    }

    #[test]
    fn degenerate_capital_structure_override_is_ignored() {
        let reg = registry(
            r#"{"model_structure": {"assumption_overrides": {"debt_to_equity": -1}}}"#,
        );
        assert_eq!(reg.value(AssumptionKey::DebtToEquity), 0.5);
        assert_eq!(reg.tier(AssumptionKey::DebtToEquity), SourceTier::Default);

        let reg = registry(
            r#"{"model_structure": {"assumption_overrides": {"debt_to_equity": -0.25}}}"#,
        );
        assert_eq!(reg.value(AssumptionKey::DebtToEquity), -0.25);
    }

    #[test]
    fn benchmark_derivations() {
        let reg = registry(
            r#"{"financial_data": {"industry_benchmarks": {
                "capex": {"capex_to_sales": 0.06, "capex_to_depreciation": 1.5},
                "wacc": {"debt_ratio": 0.2}
            }}}"#,
        );
        assert!((reg.value(AssumptionKey::DaPct) - 0.04).abs() < 1e-12);
        assert!((reg.value(AssumptionKey::DebtToEquity) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn raw_share_count_is_scaled() {
        let reg = registry(r#"{"financial_data": {"company_info": {"sharesOutstanding": 250000000}}}"#);
        assert_eq!(reg.value(AssumptionKey::SharesOutstanding), 25.0);
    }

    #[test]
    fn addresses_are_absolute_and_named() {
        let reg = registry("{}");
        assert_eq!(
            reg.cell(AssumptionKey::RevenueGrowth).to_formula(SheetKind::IncomeStatement),
            "=Assumptions!$C$8"
        );
        let names = reg.defined_names();
        assert_eq!(names.len(), AssumptionKey::ALL.len());
        assert_eq!(names[0].0, "Revenue_Growth");
    }
}
