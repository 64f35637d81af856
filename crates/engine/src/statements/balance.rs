use finmodel_core::{
    CellStyle, Expr, Layout, LineKey, NumberFormat, RowMap, Sheet, SheetKind, Slot, StyleRole,
};
use serde::Serialize;

use crate::assumptions::AssumptionKey as A;
use crate::context::{BuildContext, CALC, FIRST_LINE_ROW, HEADER_ROW, INPUT, TOTAL};
use crate::statements::cash_flow::CfLine;
use crate::statements::income::IsLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BsLine {
    Cash,
    Receivables,
    Inventory,
    OtherCurrentAssets,
    TotalCurrentAssets,
    GrossPpe,
    AccumulatedDepreciation,
    NetPpe,
    OtherNonCurrentAssets,
    TotalAssets,
    Payables,
    Accrued,
    ShortTermDebt,
    TotalCurrentLiabilities,
    LongTermDebt,
    OtherNonCurrentLiabilities,
    TotalLiabilities,
    ShareCapital,
    RetainedEarnings,
    TotalEquity,
    TotalLiabilitiesEquity,
    Check,
}

impl LineKey for BsLine {
    const SHEET: SheetKind = SheetKind::BalanceSheet;
}

const SLOTS: &[Slot<BsLine>] = &[
    Slot::Header("ASSETS"),
    Slot::line(BsLine::Cash, "Cash & Equivalents"),
    Slot::line(BsLine::Receivables, "Trade Receivables"),
    Slot::line(BsLine::Inventory, "Inventory"),
    Slot::line(BsLine::OtherCurrentAssets, "Other Current Assets"),
    Slot::total(BsLine::TotalCurrentAssets, "Total Current Assets"),
    Slot::Blank,
    Slot::line(BsLine::GrossPpe, "Gross PP&E"),
    Slot::line(BsLine::AccumulatedDepreciation, "Less: Accumulated Depreciation"),
    Slot::total(BsLine::NetPpe, "Net PP&E"),
    Slot::line(BsLine::OtherNonCurrentAssets, "Other Non-Current Assets"),
    Slot::total(BsLine::TotalAssets, "TOTAL ASSETS"),
    Slot::Blank,
    Slot::Header("LIABILITIES"),
    Slot::line(BsLine::Payables, "Trade Payables"),
    Slot::line(BsLine::Accrued, "Accrued Expenses"),
    Slot::line(BsLine::ShortTermDebt, "Short-term Debt"),
    Slot::total(BsLine::TotalCurrentLiabilities, "Total Current Liabilities"),
    Slot::Blank,
    Slot::line(BsLine::LongTermDebt, "Long-term Debt"),
    Slot::line(BsLine::OtherNonCurrentLiabilities, "Other Non-Current Liabilities"),
    Slot::total(BsLine::TotalLiabilities, "TOTAL LIABILITIES"),
    Slot::Blank,
    Slot::Header("EQUITY"),
    Slot::line(BsLine::ShareCapital, "Share Capital"),
    Slot::line(BsLine::RetainedEarnings, "Retained Earnings"),
    Slot::total(BsLine::TotalEquity, "Total Equity"),
    Slot::Blank,
    Slot::total(BsLine::TotalLiabilitiesEquity, "TOTAL LIABILITIES & EQUITY"),
    Slot::Blank,
    Slot::derived(BsLine::Check, "Balance Check (should be 0)"),
];

/// Period-0 capital items as fractions of the total-asset base.
const ANCHOR_SHARES: [(BsLine, f64); 10] = [
    (BsLine::Cash, 0.10),
    (BsLine::OtherCurrentAssets, 0.05),
    (BsLine::GrossPpe, 0.60),
    (BsLine::AccumulatedDepreciation, -0.20),
    (BsLine::OtherNonCurrentAssets, 0.10),
    (BsLine::Accrued, 0.03),
    (BsLine::ShortTermDebt, 0.05),
    (BsLine::LongTermDebt, 0.25),
    (BsLine::OtherNonCurrentLiabilities, 0.02),
    (BsLine::ShareCapital, 0.20),
];

/// Per-period drift of items with no operating driver.
const DRIFT: [(BsLine, f64); 4] = [
    (BsLine::OtherCurrentAssets, 1.02),
    (BsLine::OtherNonCurrentAssets, 1.01),
    (BsLine::Accrued, 1.02),
    (BsLine::OtherNonCurrentLiabilities, 1.01),
];

pub fn layout() -> Layout<BsLine> {
    Layout::new(FIRST_LINE_ROW, SLOTS)
}

/// Literal anchor value of `key`, if it is a capital item.
pub fn anchor_value(ctx: &BuildContext, key: BsLine) -> Option<f64> {
    ANCHOR_SHARES
        .iter()
        .find(|(line, _)| *line == key)
        .map(|(_, share)| ctx.baseline.total_assets.value * share)
}

pub fn build(
    ctx: &BuildContext,
    layout: &Layout<BsLine>,
    income: &RowMap<IsLine>,
    cash_flow: &RowMap<CfLine>,
) -> Sheet {
    let mut sheet = ctx.new_sheet(SheetKind::BalanceSheet, "Balance Sheet".to_string());
    ctx.write_period_header(&mut sheet, HEADER_ROW);
    layout.write_labels(&mut sheet, ctx.label_col());

    let rows = layout.rows();
    let a = ctx.assumptions;
    let days = Expr::num(ctx.settings.model.days_in_year);

    for period in ctx.axis {
        let col = period.column;
        let at = |key: BsLine| rows.cell(key, col);
        let revenue = income.cell(IsLine::Revenue, col);
        let cogs = income.cell(IsLine::Cogs, col).abs();

        // Working capital follows the income statement in every period
        sheet.formula(
            rows.row(BsLine::Receivables),
            col,
            Expr::safe_div(revenue.clone() * a.cell(A::ReceivableDays), days.clone()),
            CALC,
        );
        sheet.formula(
            rows.row(BsLine::Inventory),
            col,
            Expr::safe_div(cogs.clone() * a.cell(A::InventoryDays), days.clone()),
            CALC,
        );
        sheet.formula(
            rows.row(BsLine::Payables),
            col,
            Expr::safe_div(cogs * a.cell(A::PayableDays), days.clone()),
            CALC,
        );

        match ctx.axis.previous(period) {
            None => {
                for (key, _) in ANCHOR_SHARES {
                    if let Some(value) = anchor_value(ctx, key) {
                        sheet.number(rows.row(key), col, value, INPUT);
                    }
                }
                // Balancing figure: the anchor period ties by construction
                sheet.formula(
                    rows.row(BsLine::RetainedEarnings),
                    col,
                    at(BsLine::TotalAssets) - at(BsLine::TotalLiabilities) - at(BsLine::ShareCapital),
                    CALC,
                );
            }
            Some(prev) => {
                let before = |key: BsLine| rows.cell(key, prev.column);
                let mut put = |key: BsLine, expr: Expr| sheet.formula(rows.row(key), col, expr, CALC);

                put(
                    BsLine::Cash,
                    before(BsLine::Cash) + cash_flow.cell(CfLine::NetChange, col),
                );
                for (key, factor) in DRIFT {
                    put(key, before(key) * Expr::num(factor));
                }
                put(
                    BsLine::GrossPpe,
                    before(BsLine::GrossPpe) + income.cell(IsLine::Revenue, col) * a.cell(A::CapexPct),
                );
                put(
                    BsLine::AccumulatedDepreciation,
                    before(BsLine::AccumulatedDepreciation) + income.cell(IsLine::Da, col),
                );
                put(BsLine::ShortTermDebt, before(BsLine::ShortTermDebt));
                put(
                    BsLine::LongTermDebt,
                    before(BsLine::LongTermDebt) * (Expr::num(1.0) - a.cell(A::DebtAmortization)),
                );
                put(BsLine::ShareCapital, before(BsLine::ShareCapital));

                let net_income = income.cell(IsLine::NetIncome, col);
                put(
                    BsLine::RetainedEarnings,
                    before(BsLine::RetainedEarnings) + net_income.clone()
                        - Expr::max(net_income, Expr::num(0.0)) * a.cell(A::DividendPayout),
                );
            }
        }

        let addr = |key: BsLine| rows.addr(key, col);
        let mut total = |key: BsLine, expr: Expr| sheet.formula(rows.row(key), col, expr, TOTAL);
        total(
            BsLine::TotalCurrentAssets,
            Expr::sum_range(addr(BsLine::Cash), addr(BsLine::OtherCurrentAssets)),
        );
        total(BsLine::NetPpe, at(BsLine::GrossPpe) + at(BsLine::AccumulatedDepreciation));
        total(
            BsLine::TotalAssets,
            at(BsLine::TotalCurrentAssets) + at(BsLine::NetPpe) + at(BsLine::OtherNonCurrentAssets),
        );
        total(
            BsLine::TotalCurrentLiabilities,
            Expr::sum_range(addr(BsLine::Payables), addr(BsLine::ShortTermDebt)),
        );
        total(
            BsLine::TotalLiabilities,
            at(BsLine::TotalCurrentLiabilities)
                + at(BsLine::LongTermDebt)
                + at(BsLine::OtherNonCurrentLiabilities),
        );
        total(BsLine::TotalEquity, at(BsLine::ShareCapital) + at(BsLine::RetainedEarnings));
        total(
            BsLine::TotalLiabilitiesEquity,
            at(BsLine::TotalLiabilities) + at(BsLine::TotalEquity),
        );

        sheet.formula(
            rows.row(BsLine::Check),
            col,
            (at(BsLine::TotalAssets) - at(BsLine::TotalLiabilitiesEquity)).round(0),
            CellStyle::new(StyleRole::Note, NumberFormat::Integer),
        );
    }

    sheet.freeze_panes(FIRST_LINE_ROW, ctx.value_col());
    sheet
}
