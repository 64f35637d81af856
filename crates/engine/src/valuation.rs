//! Valuation bridge: WACC, discounted free cash flow, terminal value and the
//! walk from enterprise value to an implied share price.

use finmodel_core::{
    CellStyle, Expr, Layout, LineKey, NumberFormat, RowMap, Sheet, SheetKind, Slot, StyleRole,
};
use serde::Serialize;

use crate::assumptions::AssumptionKey as A;
use crate::context::{BuildContext, CALC, FIRST_LINE_ROW, PERCENT, RATIO, TOTAL};
use crate::statements::cash_flow::WORKING_CAPITAL_LINES;
use crate::statements::{BsLine, CfLine, IsLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValLine {
    RiskFreeRate,
    EquityRiskPremium,
    Beta,
    CostOfEquity,
    CostOfDebtPreTax,
    TaxRate,
    CostOfDebtPostTax,
    DebtToEquity,
    WeightEquity,
    WeightDebt,
    Wacc,
    ProjectionYear,
    FiscalYear,
    Ebit,
    DaAddBack,
    WorkingCapitalChange,
    Fcff,
    DiscountFactor,
    PvFcff,
    TerminalGrowth,
    TerminalValue,
    PvTerminalValue,
    SumPvFcff,
    PvTerminalValueBridge,
    EnterpriseValue,
    NetDebt,
    EquityValue,
    SharesOutstanding,
    SharePrice,
    CurrentPrice,
    Upside,
}

impl LineKey for ValLine {
    const SHEET: SheetKind = SheetKind::Valuation;
}

const SLOTS: &[Slot<ValLine>] = &[
    Slot::Header("WACC CALCULATION"),
    Slot::line(ValLine::RiskFreeRate, "Risk-free Rate"),
    Slot::line(ValLine::EquityRiskPremium, "Equity Risk Premium"),
    Slot::line(ValLine::Beta, "Beta"),
    Slot::total(ValLine::CostOfEquity, "Cost of Equity"),
    Slot::Blank,
    Slot::line(ValLine::CostOfDebtPreTax, "Cost of Debt (pre-tax)"),
    Slot::line(ValLine::TaxRate, "Tax Rate"),
    Slot::total(ValLine::CostOfDebtPostTax, "Cost of Debt (post-tax)"),
    Slot::Blank,
    Slot::line(ValLine::DebtToEquity, "Target Debt/Equity"),
    Slot::line(ValLine::WeightEquity, "Weight of Equity"),
    Slot::line(ValLine::WeightDebt, "Weight of Debt"),
    Slot::total(ValLine::Wacc, "WACC"),
    Slot::Blank,
    Slot::Header("DISCOUNTED CASH FLOW"),
    Slot::derived(ValLine::ProjectionYear, "Projection Year"),
    Slot::derived(ValLine::FiscalYear, "Fiscal Year"),
    Slot::line(ValLine::Ebit, "EBIT"),
    Slot::line(ValLine::DaAddBack, "Add: D&A"),
    Slot::line(ValLine::WorkingCapitalChange, "Change in Working Capital"),
    Slot::total(ValLine::Fcff, "Free Cash Flow to Firm"),
    Slot::line(ValLine::DiscountFactor, "Discount Factor"),
    Slot::total(ValLine::PvFcff, "PV of FCFF"),
    Slot::Blank,
    Slot::Header("TERMINAL VALUE"),
    Slot::line(ValLine::TerminalGrowth, "Terminal Growth Rate"),
    Slot::total(ValLine::TerminalValue, "Terminal Value"),
    Slot::total(ValLine::PvTerminalValue, "PV of Terminal Value"),
    Slot::Blank,
    Slot::Header("VALUATION SUMMARY"),
    Slot::line(ValLine::SumPvFcff, "Sum of PV (FCFF)"),
    Slot::line(ValLine::PvTerminalValueBridge, "PV of Terminal Value"),
    Slot::total(ValLine::EnterpriseValue, "Enterprise Value"),
    Slot::line(ValLine::NetDebt, "Less: Net Debt"),
    Slot::total(ValLine::EquityValue, "Equity Value"),
    Slot::line(ValLine::SharesOutstanding, "Shares Outstanding"),
    Slot::total(ValLine::SharePrice, "Implied Share Price"),
    Slot::line(ValLine::CurrentPrice, "Current Share Price"),
    Slot::derived(ValLine::Upside, "Upside / (Downside)"),
];

const OUTPUT: CellStyle = CellStyle::new(StyleRole::Output, NumberFormat::Currency);

pub fn layout() -> Layout<ValLine> {
    Layout::new(FIRST_LINE_ROW, SLOTS)
}

/// Per-share scale applied to equity / shares, omitted when it is 1.
pub(crate) fn scaled(per_share: Expr, scale: f64) -> Expr {
    if scale == 1.0 {
        per_share
    } else {
        per_share * Expr::num(scale)
    }
}

pub fn build(
    ctx: &BuildContext,
    layout: &Layout<ValLine>,
    income: &RowMap<IsLine>,
    balance: &RowMap<BsLine>,
    cash_flow: &RowMap<CfLine>,
) -> Sheet {
    let mut sheet = ctx.new_sheet(SheetKind::Valuation, "DCF Valuation".to_string());
    layout.write_labels(&mut sheet, ctx.label_col());

    let rows = layout.rows();
    let a = ctx.assumptions;
    let c = ctx.value_col();
    let one = || Expr::num(1.0);
    let v = |key: ValLine| rows.cell(key, c);
    let fixed = |key: ValLine| rows.abs(key, c);

    // WACC block
    let mut put = |key: ValLine, expr: Expr, style: CellStyle| sheet.formula(rows.row(key), c, expr, style);
    put(ValLine::RiskFreeRate, a.cell(A::RiskFreeRate), PERCENT);
    put(ValLine::EquityRiskPremium, a.cell(A::EquityRiskPremium), PERCENT);
    put(ValLine::Beta, a.cell(A::Beta), RATIO);
    put(
        ValLine::CostOfEquity,
        v(ValLine::RiskFreeRate) + v(ValLine::Beta) * v(ValLine::EquityRiskPremium),
        PERCENT,
    );
    put(ValLine::CostOfDebtPreTax, a.cell(A::CostOfDebt), PERCENT);
    put(ValLine::TaxRate, a.cell(A::TaxRate), PERCENT);
    put(
        ValLine::CostOfDebtPostTax,
        v(ValLine::CostOfDebtPreTax) * (one() - v(ValLine::TaxRate)),
        PERCENT,
    );
    put(ValLine::DebtToEquity, a.cell(A::DebtToEquity), RATIO);
    put(ValLine::WeightEquity, Expr::safe_div(one(), one() + v(ValLine::DebtToEquity)), PERCENT);
    put(
        ValLine::WeightDebt,
        Expr::safe_div(v(ValLine::DebtToEquity), one() + v(ValLine::DebtToEquity)),
        PERCENT,
    );
    put(
        ValLine::Wacc,
        v(ValLine::WeightEquity) * v(ValLine::CostOfEquity)
            + v(ValLine::WeightDebt) * v(ValLine::CostOfDebtPostTax),
        CellStyle::new(StyleRole::Output, NumberFormat::Percent),
    );

    // DCF block: one column per forecast year, starting at the value column
    let forecast = ctx.axis.forecast();
    let (wc_first, wc_last) = WORKING_CAPITAL_LINES;
    for (j, period) in forecast.iter().enumerate() {
        let col = c + j as u16;
        let src = period.column;
        let at = |key: ValLine| rows.cell(key, col);

        sheet.text(rows.row(ValLine::ProjectionYear), col, format!("Year {}", j + 1), StyleRole::Header);
        sheet.text(rows.row(ValLine::FiscalYear), col, period.label.clone(), StyleRole::Header);
        sheet.set_column_width(col, 13.0);

        let mut put = |key: ValLine, expr: Expr, style: CellStyle| sheet.formula(rows.row(key), col, expr, style);
        put(ValLine::Ebit, income.cell(IsLine::Ebit, src), CALC);
        put(ValLine::DaAddBack, -income.cell(IsLine::Da, src), CALC);
        put(
            ValLine::WorkingCapitalChange,
            Expr::sum_range(cash_flow.addr(wc_first, src), cash_flow.addr(wc_last, src)),
            CALC,
        );
        put(
            ValLine::Fcff,
            at(ValLine::Ebit) + at(ValLine::DaAddBack) + at(ValLine::WorkingCapitalChange),
            TOTAL,
        );
        put(
            ValLine::DiscountFactor,
            Expr::safe_div(one(), (one() + fixed(ValLine::Wacc)).pow(Expr::num((j + 1) as f64))),
            CellStyle::new(StyleRole::Calc, NumberFormat::Factor),
        );
        put(ValLine::PvFcff, at(ValLine::Fcff) * at(ValLine::DiscountFactor), TOTAL);
    }

    let first_col = c;
    let last_col = c + forecast.len().saturating_sub(1) as u16;
    let last = |key: ValLine| rows.cell(key, last_col);

    let mut put = |key: ValLine, expr: Expr, style: CellStyle| sheet.formula(rows.row(key), c, expr, style);

    // Terminal block
    put(ValLine::TerminalGrowth, a.cell(A::TerminalGrowth), PERCENT);
    let wacc = v(ValLine::Wacc);
    let growth = v(ValLine::TerminalGrowth);
    let gordon = last(ValLine::Fcff) * (one() + growth.clone()) / (wacc.clone() - growth.clone());
    put(
        ValLine::TerminalValue,
        Expr::if_then(
            wacc.gt(growth),
            Expr::max(gordon, Expr::num(0.0)),
            Expr::num(0.0),
        ),
        TOTAL,
    );
    put(
        ValLine::PvTerminalValue,
        v(ValLine::TerminalValue) * last(ValLine::DiscountFactor),
        TOTAL,
    );

    // Bridge to equity
    put(
        ValLine::SumPvFcff,
        Expr::sum_range(rows.addr(ValLine::PvFcff, first_col), rows.addr(ValLine::PvFcff, last_col)),
        CALC,
    );
    put(ValLine::PvTerminalValueBridge, v(ValLine::PvTerminalValue), CALC);
    put(
        ValLine::EnterpriseValue,
        v(ValLine::SumPvFcff) + v(ValLine::PvTerminalValueBridge),
        CellStyle::new(StyleRole::Output, NumberFormat::Integer),
    );
    let bs_last = ctx.axis.last().column;
    put(
        ValLine::NetDebt,
        balance.cell(BsLine::ShortTermDebt, bs_last) + balance.cell(BsLine::LongTermDebt, bs_last)
            - balance.cell(BsLine::Cash, bs_last),
        CALC,
    );
    put(
        ValLine::EquityValue,
        v(ValLine::EnterpriseValue) - v(ValLine::NetDebt),
        CellStyle::new(StyleRole::Output, NumberFormat::Integer),
    );
    put(
        ValLine::SharesOutstanding,
        a.cell(A::SharesOutstanding),
        CellStyle::new(StyleRole::Calc, NumberFormat::Decimal),
    );
    put(
        ValLine::SharePrice,
        scaled(
            Expr::safe_div(v(ValLine::EquityValue), v(ValLine::SharesOutstanding)),
            ctx.settings.units.per_share_scale,
        ),
        OUTPUT,
    );
    put(
        ValLine::CurrentPrice,
        a.cell(A::CurrentPrice),
        CellStyle::new(StyleRole::Calc, NumberFormat::Currency),
    );
    put(
        ValLine::Upside,
        (v(ValLine::SharePrice) / v(ValLine::CurrentPrice) - one()).or_zero(),
        PERCENT,
    );

    sheet.set_column_width(c, 14.0);
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::StatementLayouts;
    use crate::test_support::Fixture;

    fn build_default() -> (Sheet, Layout<ValLine>) {
        let fx = Fixture::default();
        let ctx = fx.context();
        let statements = StatementLayouts::new();
        let layout = layout();
        let sheet = build(
            &ctx,
            &layout,
            statements.income.rows(),
            statements.balance.rows(),
            statements.cash_flow.rows(),
        );
        (sheet, layout)
    }

    fn formula(sheet: &Sheet, row: u32, col: u16) -> String {
        sheet
            .get(row, col)
            .and_then(|cell| cell.as_formula())
            .map(|expr| expr.to_formula(SheetKind::Valuation))
            .unwrap_or_default()
    }

    #[test]
    fn discount_factor_compounds_wacc() {
        let (sheet, layout) = build_default();
        let rows = layout.rows();
        let wacc = rows.addr(ValLine::Wacc, 2).a1_absolute();
        assert_eq!(
            formula(&sheet, rows.row(ValLine::DiscountFactor), 4),
            format!("=IFERROR(1/(1+{})^3,0)", wacc)
        );
    }

    #[test]
    fn capital_weights_are_guarded() {
        let (sheet, layout) = build_default();
        let rows = layout.rows();
        let de = rows.addr(ValLine::DebtToEquity, 2).a1();
        assert_eq!(
            formula(&sheet, rows.row(ValLine::WeightEquity), 2),
            format!("=IFERROR(1/(1+{0}),0)", de)
        );
        assert_eq!(
            formula(&sheet, rows.row(ValLine::WeightDebt), 2),
            format!("=IFERROR({0}/(1+{0}),0)", de)
        );
        let factor = sheet.get(rows.row(ValLine::DiscountFactor), 2).unwrap();
        assert_eq!(factor.style.format, NumberFormat::Factor);
    }

    #[test]
    fn dcf_columns_read_forecast_periods() {
        let (sheet, layout) = build_default();
        let rows = layout.rows();
        // First forecast period sits in column H (5 historical years from C)
        assert_eq!(formula(&sheet, rows.row(ValLine::Ebit), 2), "=Income_Statement!H19");
        assert_eq!(
            sheet.get(rows.row(ValLine::ProjectionYear), 6).unwrap().as_text(),
            Some("Year 5")
        );
    }

    #[test]
    fn terminal_value_is_guarded() {
        let (sheet, layout) = build_default();
        let text = formula(&sheet, layout.rows().row(ValLine::TerminalValue), 2);
        assert!(text.starts_with("=IF(C19>C32,MAX("), "{}", text);
        assert!(text.ends_with(",0),0)"), "{}", text);
    }

    #[test]
    fn unit_scale_is_omitted() {
        let (sheet, layout) = build_default();
        let text = formula(&sheet, layout.rows().row(ValLine::SharePrice), 2);
        assert_eq!(text, "=IFERROR(C41/C42,0)");
    }
}
