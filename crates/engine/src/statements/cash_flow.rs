use finmodel_core::{Expr, Layout, LineKey, RowMap, Sheet, SheetKind, Slot};
use serde::Serialize;

use crate::assumptions::AssumptionKey as A;
use crate::context::{BuildContext, CALC, FIRST_LINE_ROW, HEADER_ROW, INPUT, TOTAL};
use crate::statements::balance::{self, BsLine};
use crate::statements::income::IsLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CfLine {
    NetIncome,
    DaAddBack,
    ChangeReceivables,
    ChangeInventory,
    ChangePayables,
    ChangeOtherWorkingCapital,
    OperatingCashFlow,
    Capex,
    OtherInvesting,
    InvestingCashFlow,
    Dividends,
    ChangeInDebt,
    OtherFinancing,
    FinancingCashFlow,
    NetChange,
    OpeningCash,
    ClosingCash,
}

impl LineKey for CfLine {
    const SHEET: SheetKind = SheetKind::CashFlow;
}

const SLOTS: &[Slot<CfLine>] = &[
    Slot::Header("OPERATING ACTIVITIES"),
    Slot::line(CfLine::NetIncome, "Net Income"),
    Slot::line(CfLine::DaAddBack, "Add: Depreciation & Amortization"),
    Slot::line(CfLine::ChangeReceivables, "Change in Receivables"),
    Slot::line(CfLine::ChangeInventory, "Change in Inventory"),
    Slot::line(CfLine::ChangePayables, "Change in Payables"),
    Slot::line(CfLine::ChangeOtherWorkingCapital, "Change in Other Working Capital"),
    Slot::total(CfLine::OperatingCashFlow, "Cash Flow from Operations"),
    Slot::Blank,
    Slot::Header("INVESTING ACTIVITIES"),
    Slot::line(CfLine::Capex, "Capital Expenditure"),
    Slot::line(CfLine::OtherInvesting, "Other Investing Activities"),
    Slot::total(CfLine::InvestingCashFlow, "Cash Flow from Investing"),
    Slot::Blank,
    Slot::Header("FINANCING ACTIVITIES"),
    Slot::line(CfLine::Dividends, "Dividends Paid"),
    Slot::line(CfLine::ChangeInDebt, "Change in Debt"),
    Slot::line(CfLine::OtherFinancing, "Other Financing Activities"),
    Slot::total(CfLine::FinancingCashFlow, "Cash Flow from Financing"),
    Slot::Blank,
    Slot::total(CfLine::NetChange, "Net Change in Cash"),
    Slot::line(CfLine::OpeningCash, "Opening Cash"),
    Slot::total(CfLine::ClosingCash, "Closing Cash"),
];

/// Balance-sheet movements, zero in the anchor period.
const DELTA_LINES: [CfLine; 7] = [
    CfLine::ChangeReceivables,
    CfLine::ChangeInventory,
    CfLine::ChangePayables,
    CfLine::ChangeOtherWorkingCapital,
    CfLine::OtherInvesting,
    CfLine::ChangeInDebt,
    CfLine::OtherFinancing,
];

/// The working-capital change rows, contiguous on the sheet.
pub const WORKING_CAPITAL_LINES: (CfLine, CfLine) =
    (CfLine::ChangeReceivables, CfLine::ChangeOtherWorkingCapital);

pub fn layout() -> Layout<CfLine> {
    Layout::new(FIRST_LINE_ROW, SLOTS)
}

pub fn build(
    ctx: &BuildContext,
    layout: &Layout<CfLine>,
    income: &RowMap<IsLine>,
    balance_rows: &RowMap<BsLine>,
) -> Sheet {
    let mut sheet = ctx.new_sheet(SheetKind::CashFlow, "Cash Flow Statement".to_string());
    ctx.write_period_header(&mut sheet, HEADER_ROW);
    layout.write_labels(&mut sheet, ctx.label_col());

    let rows = layout.rows();
    let a = ctx.assumptions;

    for period in ctx.axis {
        let col = period.column;
        let at = |key: CfLine| rows.cell(key, col);
        let addr = |key: CfLine| rows.addr(key, col);

        sheet.formula(rows.row(CfLine::NetIncome), col, income.cell(IsLine::NetIncome, col), CALC);
        sheet.formula(rows.row(CfLine::DaAddBack), col, -income.cell(IsLine::Da, col), CALC);
        sheet.formula(
            rows.row(CfLine::Capex),
            col,
            -income.cell(IsLine::Revenue, col) * a.cell(A::CapexPct),
            CALC,
        );
        sheet.formula(
            rows.row(CfLine::Dividends),
            col,
            -Expr::max(income.cell(IsLine::NetIncome, col), Expr::num(0.0)) * a.cell(A::DividendPayout),
            CALC,
        );

        match ctx.axis.previous(period) {
            None => {
                for key in DELTA_LINES {
                    sheet.number(rows.row(key), col, 0.0, CALC);
                }
                let seed = balance::anchor_value(ctx, BsLine::Cash).unwrap_or(0.0);
                sheet.number(rows.row(CfLine::OpeningCash), col, seed, INPUT);
            }
            Some(prev) => {
                let now = |key: BsLine| balance_rows.cell(key, col);
                let before = |key: BsLine| balance_rows.cell(key, prev.column);
                // Asset increases consume cash, liability increases supply it
                let asset = |key: BsLine| before(key) - now(key);
                let liability = |key: BsLine| now(key) - before(key);
                let mut put = |key: CfLine, expr: Expr| sheet.formula(rows.row(key), col, expr, CALC);

                put(CfLine::ChangeReceivables, asset(BsLine::Receivables));
                put(CfLine::ChangeInventory, asset(BsLine::Inventory));
                put(CfLine::ChangePayables, liability(BsLine::Payables));
                put(
                    CfLine::ChangeOtherWorkingCapital,
                    asset(BsLine::OtherCurrentAssets) + liability(BsLine::Accrued),
                );
                put(CfLine::OtherInvesting, asset(BsLine::OtherNonCurrentAssets));
                put(
                    CfLine::ChangeInDebt,
                    now(BsLine::ShortTermDebt) + now(BsLine::LongTermDebt)
                        - (before(BsLine::ShortTermDebt) + before(BsLine::LongTermDebt)),
                );
                put(
                    CfLine::OtherFinancing,
                    liability(BsLine::ShareCapital) + liability(BsLine::OtherNonCurrentLiabilities),
                );
                put(CfLine::OpeningCash, before(BsLine::Cash));
            }
        }

        let mut total = |key: CfLine, expr: Expr| sheet.formula(rows.row(key), col, expr, TOTAL);
        total(
            CfLine::OperatingCashFlow,
            Expr::sum_range(addr(CfLine::NetIncome), addr(CfLine::ChangeOtherWorkingCapital)),
        );
        total(
            CfLine::InvestingCashFlow,
            Expr::sum_range(addr(CfLine::Capex), addr(CfLine::OtherInvesting)),
        );
        total(
            CfLine::FinancingCashFlow,
            Expr::sum_range(addr(CfLine::Dividends), addr(CfLine::OtherFinancing)),
        );
        total(
            CfLine::NetChange,
            at(CfLine::OperatingCashFlow) + at(CfLine::InvestingCashFlow) + at(CfLine::FinancingCashFlow),
        );
        total(CfLine::ClosingCash, at(CfLine::OpeningCash) + at(CfLine::NetChange));
    }

    sheet.freeze_panes(FIRST_LINE_ROW, ctx.value_col());
    sheet
}
