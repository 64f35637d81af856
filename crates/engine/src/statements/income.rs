use finmodel_core::{CellStyle, Expr, Layout, LineKey, NumberFormat, Sheet, SheetKind, Slot, StyleRole};
use serde::Serialize;

use crate::assumptions::{AssumptionKey as A, SourceTier};
use crate::context::{BuildContext, CALC, FIRST_LINE_ROW, HEADER_ROW, INPUT, NOTE_PERCENT, TOTAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IsLine {
    Revenue,
    RevenueGrowth,
    Cogs,
    GrossProfit,
    GrossMargin,
    Sga,
    OtherOpex,
    Ebitda,
    EbitdaMargin,
    Da,
    Ebit,
    EbitMargin,
    Interest,
    PretaxIncome,
    Tax,
    NetIncome,
    NetMargin,
    ReportedEbitda,
    ReportedNetIncome,
}

impl LineKey for IsLine {
    const SHEET: SheetKind = SheetKind::IncomeStatement;
}

const SLOTS: &[Slot<IsLine>] = &[
    Slot::line(IsLine::Revenue, "Revenue"),
    Slot::derived(IsLine::RevenueGrowth, "Growth %"),
    Slot::Blank,
    Slot::line(IsLine::Cogs, "Cost of Goods Sold"),
    Slot::total(IsLine::GrossProfit, "Gross Profit"),
    Slot::derived(IsLine::GrossMargin, "Gross Margin %"),
    Slot::Blank,
    Slot::line(IsLine::Sga, "SG&A Expenses"),
    Slot::line(IsLine::OtherOpex, "Other Operating Expenses"),
    Slot::total(IsLine::Ebitda, "EBITDA"),
    Slot::derived(IsLine::EbitdaMargin, "EBITDA Margin %"),
    Slot::Blank,
    Slot::line(IsLine::Da, "Depreciation & Amortization"),
    Slot::total(IsLine::Ebit, "EBIT"),
    Slot::derived(IsLine::EbitMargin, "EBIT Margin %"),
    Slot::Blank,
    Slot::line(IsLine::Interest, "Interest Expense"),
    Slot::total(IsLine::PretaxIncome, "Pre-tax Income"),
    Slot::line(IsLine::Tax, "Tax"),
    Slot::total(IsLine::NetIncome, "Net Income"),
    Slot::derived(IsLine::NetMargin, "Net Margin %"),
    Slot::Blank,
    Slot::Header("MEMO: REPORTED BASE FIGURES"),
    Slot::derived(IsLine::ReportedEbitda, "Reported EBITDA"),
    Slot::derived(IsLine::ReportedNetIncome, "Reported Net Income"),
];

pub fn layout() -> Layout<IsLine> {
    Layout::new(FIRST_LINE_ROW, SLOTS)
}

pub fn build(ctx: &BuildContext, layout: &Layout<IsLine>) -> Sheet {
    let mut sheet = ctx.new_sheet(SheetKind::IncomeStatement, "Income Statement".to_string());
    ctx.write_period_header(&mut sheet, HEADER_ROW);
    layout.write_labels(&mut sheet, ctx.label_col());

    let rows = layout.rows();
    let a = ctx.assumptions;
    let one = || Expr::num(1.0);

    for period in ctx.axis {
        let col = period.column;
        let at = |key: IsLine| rows.cell(key, col);
        let mut put = |key: IsLine, expr: Expr, style: CellStyle| {
            sheet.formula(rows.row(key), col, expr, style)
        };

        if let Some(prev) = ctx.axis.previous(period) {
            let prior = rows.cell(IsLine::Revenue, prev.column);
            put(IsLine::Revenue, prior.clone() * (one() + a.cell(A::RevenueGrowth)), CALC);
            put(IsLine::RevenueGrowth, (at(IsLine::Revenue) / prior - one()).or_zero(), NOTE_PERCENT);
        }

        put(IsLine::Cogs, -at(IsLine::Revenue) * (one() - a.cell(A::GrossMargin)), CALC);
        put(IsLine::GrossProfit, at(IsLine::Revenue) + at(IsLine::Cogs), TOTAL);
        put(IsLine::Sga, -at(IsLine::Revenue) * a.cell(A::SgaPct), CALC);
        put(IsLine::OtherOpex, -at(IsLine::Revenue) * a.cell(A::OtherOpexPct), CALC);
        put(
            IsLine::Ebitda,
            at(IsLine::GrossProfit) + at(IsLine::Sga) + at(IsLine::OtherOpex),
            TOTAL,
        );
        put(IsLine::Da, -at(IsLine::Revenue) * a.cell(A::DaPct), CALC);
        put(IsLine::Ebit, at(IsLine::Ebitda) + at(IsLine::Da), TOTAL);
        put(IsLine::Interest, -at(IsLine::Revenue) * a.cell(A::InterestPct), CALC);
        put(IsLine::PretaxIncome, at(IsLine::Ebit) + at(IsLine::Interest), TOTAL);
        put(
            IsLine::Tax,
            -Expr::max(at(IsLine::PretaxIncome), Expr::num(0.0)) * a.cell(A::TaxRate),
            CALC,
        );
        put(IsLine::NetIncome, at(IsLine::PretaxIncome) + at(IsLine::Tax), TOTAL);

        for (margin, line) in [
            (IsLine::GrossMargin, IsLine::GrossProfit),
            (IsLine::EbitdaMargin, IsLine::Ebitda),
            (IsLine::EbitMargin, IsLine::Ebit),
            (IsLine::NetMargin, IsLine::NetIncome),
        ] {
            put(margin, Expr::safe_div(at(line), at(IsLine::Revenue)), NOTE_PERCENT);
        }
    }

    let anchor = ctx.axis.first().column;
    sheet.number(rows.row(IsLine::Revenue), anchor, ctx.baseline.revenue.value, INPUT);

    let memo = CellStyle::new(StyleRole::Note, NumberFormat::Integer);
    for (key, figure) in [
        (IsLine::ReportedEbitda, ctx.baseline.ebitda),
        (IsLine::ReportedNetIncome, ctx.baseline.net_income),
    ] {
        if figure.tier == SourceTier::Default {
            sheet.text(rows.row(key), anchor, "n/a", StyleRole::Note);
        } else {
            sheet.number(rows.row(key), anchor, figure.value, memo);
        }
    }

    sheet.freeze_panes(FIRST_LINE_ROW, ctx.value_col());
    sheet
}
