//! Bear / Base / Bull scenario table.

use finmodel_config::ScenarioRange;
use finmodel_core::{
    CellStyle, Expr, Layout, LineKey, NumberFormat, RowMap, Sheet, SheetKind, Slot, StyleRole,
};
use serde::Serialize;

use crate::assumptions::AssumptionKey as A;
use crate::context::{BuildContext, FIRST_LINE_ROW, HEADER_ROW};
use crate::statements::IsLine;
use crate::valuation::{scaled, ValLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScenLine {
    RevenueGrowth,
    EbitdaMargin,
    TerminalGrowth,
    Wacc,
    ExitMultiple,
    CapexPct,
    WorkingCapitalDays,
    DebtToEquity,
    TaxRate,
    HorizonYears,
    RevenueCagr,
    CurrentRevenue,
    ExitRevenue,
    ExitEbitda,
    EnterpriseValue,
    NetDebt,
    EquityValue,
    SharePrice,
    AfterTaxEbitda,
    ExitCapex,
    WorkingCapitalBuild,
    ExitFcf,
    PerpetuityEv,
    ImpliedMultiple,
    DebtCapacity,
    EntryPrice,
    ExitPrice,
    AnnualReturn,
}

impl LineKey for ScenLine {
    const SHEET: SheetKind = SheetKind::Scenarios;
}

const SLOTS: &[Slot<ScenLine>] = &[
    Slot::Header("KEY DRIVERS"),
    Slot::line(ScenLine::RevenueGrowth, "Revenue Growth"),
    Slot::line(ScenLine::EbitdaMargin, "EBITDA Margin"),
    Slot::line(ScenLine::TerminalGrowth, "Terminal Growth"),
    Slot::line(ScenLine::Wacc, "WACC"),
    Slot::line(ScenLine::ExitMultiple, "Exit EV/EBITDA Multiple"),
    Slot::Blank,
    Slot::Header("OPERATING ASSUMPTIONS"),
    Slot::line(ScenLine::CapexPct, "Capex % of Revenue"),
    Slot::line(ScenLine::WorkingCapitalDays, "Working Capital Days"),
    Slot::line(ScenLine::DebtToEquity, "Debt/Equity Ratio"),
    Slot::line(ScenLine::TaxRate, "Tax Rate"),
    Slot::line(ScenLine::HorizonYears, "Holding Period (Years)"),
    Slot::Blank,
    Slot::Header("OUTPUTS"),
    Slot::line(ScenLine::RevenueCagr, "Revenue CAGR"),
    Slot::line(ScenLine::CurrentRevenue, "Current Revenue"),
    Slot::line(ScenLine::ExitRevenue, "Exit-Year Revenue"),
    Slot::line(ScenLine::ExitEbitda, "Exit-Year EBITDA"),
    Slot::total(ScenLine::EnterpriseValue, "Enterprise Value"),
    Slot::line(ScenLine::NetDebt, "Less: Net Debt"),
    Slot::total(ScenLine::EquityValue, "Equity Value"),
    Slot::total(ScenLine::SharePrice, "Implied Share Price"),
    Slot::Blank,
    Slot::Header("CASH FLOW CROSS-CHECK"),
    Slot::line(ScenLine::AfterTaxEbitda, "After-tax EBITDA"),
    Slot::line(ScenLine::ExitCapex, "Less: Capex"),
    Slot::line(ScenLine::WorkingCapitalBuild, "Less: Working Capital Build"),
    Slot::total(ScenLine::ExitFcf, "Exit-Year Free Cash Flow"),
    Slot::total(ScenLine::PerpetuityEv, "Perpetuity Enterprise Value"),
    Slot::derived(ScenLine::ImpliedMultiple, "Implied EV/EBITDA"),
    Slot::line(ScenLine::DebtCapacity, "Debt at Target D/E"),
    Slot::Blank,
    Slot::Header("RETURN ANALYSIS"),
    Slot::line(ScenLine::EntryPrice, "Entry Price"),
    Slot::line(ScenLine::ExitPrice, "Exit Price"),
    Slot::total(ScenLine::AnnualReturn, "Annualized Return"),
];

pub fn layout() -> Layout<ScenLine> {
    Layout::new(FIRST_LINE_ROW, SLOTS)
}

fn style(role: StyleRole, format: NumberFormat) -> CellStyle {
    CellStyle::new(role, format)
}

pub fn build(
    ctx: &BuildContext,
    layout: &Layout<ScenLine>,
    income: &RowMap<IsLine>,
    valuation: &RowMap<ValLine>,
) -> Sheet {
    let mut sheet = ctx.new_sheet(SheetKind::Scenarios, "Scenario Analysis".to_string());
    layout.write_labels(&mut sheet, ctx.label_col());

    let rows = layout.rows();
    let bear = ctx.value_col();
    let base = bear + 1;
    let bull = bear + 2;
    for (col, heading) in [
        (ctx.label_col(), "Scenario"),
        (bear, "Bear"),
        (base, "Base"),
        (bull, "Bull"),
    ] {
        sheet.text(HEADER_ROW, col, heading, StyleRole::Header);
        sheet.set_column_width(col, 16.0);
    }

    let s = &ctx.settings.scenarios;
    let drivers: [(ScenLine, ScenarioRange, NumberFormat); 9] = [
        (ScenLine::RevenueGrowth, s.revenue_growth, NumberFormat::Percent),
        (ScenLine::EbitdaMargin, s.ebitda_margin, NumberFormat::Percent),
        (ScenLine::TerminalGrowth, s.terminal_growth, NumberFormat::Percent),
        (ScenLine::Wacc, s.wacc, NumberFormat::Percent),
        (ScenLine::ExitMultiple, s.exit_multiple, NumberFormat::Ratio),
        (ScenLine::CapexPct, s.capex_pct, NumberFormat::Percent),
        (ScenLine::WorkingCapitalDays, s.working_capital_days, NumberFormat::Integer),
        (ScenLine::DebtToEquity, s.debt_to_equity, NumberFormat::Ratio),
        (ScenLine::TaxRate, s.tax_rate, NumberFormat::Percent),
    ];
    for (key, range, format) in drivers {
        let row = rows.row(key);
        sheet.number(row, bear, range.bear, style(StyleRole::Input, format));
        sheet.number(row, bull, range.bull, style(StyleRole::Input, format));
        sheet.formula(
            row,
            base,
            (rows.cell(key, bear) + rows.cell(key, bull)) / Expr::num(2.0),
            style(StyleRole::Calc, format),
        );
    }
    for col in [bear, base, bull] {
        sheet.number(
            rows.row(ScenLine::HorizonYears),
            col,
            s.horizon_years,
            style(StyleRole::Input, NumberFormat::Integer),
        );
    }

    let current_revenue = income.abs(IsLine::Revenue, ctx.axis.last_historical().column);
    let net_debt = valuation.abs(ValLine::NetDebt, ctx.value_col());
    let a = ctx.assumptions;
    let one = || Expr::num(1.0);
    let days_in_year = ctx.settings.model.days_in_year;
    let integer = style(StyleRole::Calc, NumberFormat::Integer);
    let currency = style(StyleRole::Calc, NumberFormat::Currency);

    for col in [bear, base, bull] {
        let at = |key: ScenLine| rows.cell(key, col);
        let mut put = |key: ScenLine, expr: Expr, style: CellStyle| sheet.formula(rows.row(key), col, expr, style);

        put(ScenLine::RevenueCagr, at(ScenLine::RevenueGrowth), style(StyleRole::Calc, NumberFormat::Percent));
        put(ScenLine::CurrentRevenue, current_revenue.clone(), integer);
        put(
            ScenLine::ExitRevenue,
            at(ScenLine::CurrentRevenue) * (one() + at(ScenLine::RevenueGrowth)).pow(at(ScenLine::HorizonYears)),
            integer,
        );
        put(ScenLine::ExitEbitda, at(ScenLine::ExitRevenue) * at(ScenLine::EbitdaMargin), integer);
        put(
            ScenLine::EnterpriseValue,
            at(ScenLine::ExitEbitda) * at(ScenLine::ExitMultiple),
            style(StyleRole::Total, NumberFormat::Integer),
        );
        put(ScenLine::NetDebt, net_debt.clone(), integer);
        put(
            ScenLine::EquityValue,
            at(ScenLine::EnterpriseValue) - at(ScenLine::NetDebt),
            style(StyleRole::Total, NumberFormat::Integer),
        );
        put(
            ScenLine::SharePrice,
            scaled(
                Expr::safe_div(at(ScenLine::EquityValue), a.cell(A::SharesOutstanding)),
                ctx.settings.units.per_share_scale,
            ),
            style(StyleRole::Output, NumberFormat::Currency),
        );

        // Exit-year cash flow capitalized at the scenario WACC and terminal growth
        put(
            ScenLine::AfterTaxEbitda,
            at(ScenLine::ExitEbitda) * (one() - at(ScenLine::TaxRate)),
            integer,
        );
        put(ScenLine::ExitCapex, -(at(ScenLine::ExitRevenue) * at(ScenLine::CapexPct)), integer);
        // Revenue added in the exit year, carried for working-capital days
        let revenue_added = Expr::safe_div(
            at(ScenLine::ExitRevenue) * at(ScenLine::RevenueGrowth),
            one() + at(ScenLine::RevenueGrowth),
        );
        put(
            ScenLine::WorkingCapitalBuild,
            -(revenue_added * at(ScenLine::WorkingCapitalDays) / Expr::num(days_in_year)),
            integer,
        );
        put(
            ScenLine::ExitFcf,
            at(ScenLine::AfterTaxEbitda) + at(ScenLine::ExitCapex) + at(ScenLine::WorkingCapitalBuild),
            style(StyleRole::Total, NumberFormat::Integer),
        );
        let (wacc, growth) = (at(ScenLine::Wacc), at(ScenLine::TerminalGrowth));
        let gordon = at(ScenLine::ExitFcf) * (one() + growth.clone()) / (wacc.clone() - growth.clone());
        put(
            ScenLine::PerpetuityEv,
            Expr::if_then(wacc.gt(growth), Expr::max(gordon, Expr::num(0.0)), Expr::num(0.0)),
            style(StyleRole::Total, NumberFormat::Integer),
        );
        put(
            ScenLine::ImpliedMultiple,
            Expr::safe_div(at(ScenLine::PerpetuityEv), at(ScenLine::ExitEbitda)),
            style(StyleRole::Calc, NumberFormat::Ratio),
        );
        put(
            ScenLine::DebtCapacity,
            Expr::safe_div(
                at(ScenLine::EnterpriseValue) * at(ScenLine::DebtToEquity),
                one() + at(ScenLine::DebtToEquity),
            ),
            integer,
        );

        put(ScenLine::EntryPrice, a.cell(A::CurrentPrice), currency);
        put(ScenLine::ExitPrice, at(ScenLine::SharePrice), currency);
        put(
            ScenLine::AnnualReturn,
            ((at(ScenLine::ExitPrice) / at(ScenLine::EntryPrice)).pow(one() / at(ScenLine::HorizonYears))
                - one())
            .or_zero(),
            style(StyleRole::Output, NumberFormat::Percent),
        );
    }

    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::income;
    use crate::test_support::Fixture;
    use crate::valuation;
    use finmodel_core::CellAddress;

    const DRIVERS: [ScenLine; 10] = [
        ScenLine::RevenueGrowth,
        ScenLine::EbitdaMargin,
        ScenLine::TerminalGrowth,
        ScenLine::Wacc,
        ScenLine::ExitMultiple,
        ScenLine::CapexPct,
        ScenLine::WorkingCapitalDays,
        ScenLine::DebtToEquity,
        ScenLine::TaxRate,
        ScenLine::HorizonYears,
    ];

    fn build_default() -> (Sheet, Layout<ScenLine>) {
        let fx = Fixture::default();
        let ctx = fx.context();
        let layout = layout();
        let sheet = build(&ctx, &layout, income::layout().rows(), valuation::layout().rows());
        (sheet, layout)
    }

    #[test]
    fn base_is_midpoint_of_bear_and_bull() {
        let (sheet, layout) = build_default();
        let row = layout.rows().row(ScenLine::Wacc);
        assert_eq!(sheet.get(row, 2).unwrap().as_number(), Some(0.14));
        assert_eq!(sheet.get(row, 4).unwrap().as_number(), Some(0.09));
        let base = sheet.get(row, 3).unwrap().as_formula().unwrap();
        assert_eq!(base.to_formula(SheetKind::Scenarios), format!("=(C{0}+E{0})/2", row + 1));
    }

    #[test]
    fn every_driver_feeds_an_output() {
        let (sheet, layout) = build_default();
        let rows = layout.rows();
        let first_output = rows.row(ScenLine::RevenueCagr);
        for col in 2..=4u16 {
            let referenced: Vec<CellAddress> = sheet
                .cells()
                .filter(|((row, c), _)| *row >= first_output && *c == col)
                .filter_map(|(_, cell)| cell.as_formula())
                .flat_map(|expr| expr.references())
                .collect();
            for driver in DRIVERS {
                assert!(
                    referenced.contains(&rows.addr(driver, col)),
                    "{:?} unused in column {}",
                    driver,
                    col
                );
            }
        }
    }

    #[test]
    fn perpetuity_value_is_guarded() {
        let (sheet, layout) = build_default();
        let rows = layout.rows();
        let text = sheet
            .get(rows.row(ScenLine::PerpetuityEv), 3)
            .unwrap()
            .as_formula()
            .unwrap()
            .to_formula(SheetKind::Scenarios);
        let wacc = rows.addr(ScenLine::Wacc, 3).a1();
        let growth = rows.addr(ScenLine::TerminalGrowth, 3).a1();
        assert!(text.starts_with(&format!("=IF({}>{},MAX(", wacc, growth)), "{}", text);
    }

    #[test]
    fn return_is_guarded() {
        let (sheet, layout) = build_default();
        let rows = layout.rows();
        let cell = sheet.get(rows.row(ScenLine::AnnualReturn), 2).unwrap();
        let text = cell.as_formula().unwrap().to_formula(SheetKind::Scenarios);
        let exit = rows.addr(ScenLine::ExitPrice, 2).a1();
        let entry = rows.addr(ScenLine::EntryPrice, 2).a1();
        let horizon = rows.addr(ScenLine::HorizonYears, 2).a1();
        assert_eq!(text, format!("=IFERROR(({}/{})^(1/{})-1,0)", exit, entry, horizon));
    }
}
