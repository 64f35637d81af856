//! Derived metrics and key ratios, laid out on the Assumptions sheet below the
//! input block. Every value except face value is a live formula over the
//! current-year statements and the assumption cells.

use finmodel_core::{
    CellAddress, CellStyle, Expr, Layout, LineKey, NumberFormat, RowMap, Sheet, SheetKind, Slot,
    StyleRole,
};
use serde::Serialize;

use crate::assumptions::{
    resolve_chain, AssumptionKey as A, AssumptionRegistry, SourceTier, NOTE_COL, SOURCE_COL,
    UNIT_COL, VALUE_COL,
};
use crate::context::BuildContext;
use crate::statements::{BsLine, CfLine, IsLine};
use crate::valuation::scaled;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RatioLine {
    OperatingMargin,
    NetMargin,
    CostOfEquity,
    StockPe,
    PriceToBook,
    Roce,
    Roe,
    BookValue,
    FaceValue,
    DividendYield,
}

impl LineKey for RatioLine {
    const SHEET: SheetKind = SheetKind::Assumptions;
}

impl RatioLine {
    pub fn defined_name(&self) -> &'static str {
        match self {
            RatioLine::OperatingMargin => "Operating_Margin",
            RatioLine::NetMargin => "Net_Margin",
            RatioLine::CostOfEquity => "Cost_Of_Equity",
            RatioLine::StockPe => "Stock_PE",
            RatioLine::PriceToBook => "Price_To_Book",
            RatioLine::Roce => "ROCE",
            RatioLine::Roe => "ROE",
            RatioLine::BookValue => "Book_Value",
            RatioLine::FaceValue => "Face_Value",
            RatioLine::DividendYield => "Dividend_Yield",
        }
    }

    fn format(&self) -> NumberFormat {
        match self {
            RatioLine::StockPe | RatioLine::PriceToBook => NumberFormat::Ratio,
            RatioLine::BookValue | RatioLine::FaceValue => NumberFormat::Currency,
            _ => NumberFormat::Percent,
        }
    }

    fn unit(&self) -> &'static str {
        match self.format() {
            NumberFormat::Ratio => "ratio",
            NumberFormat::Currency => "currency",
            _ => "percent",
        }
    }

    fn note(&self) -> &'static str {
        match self {
            RatioLine::OperatingMargin => "EBIT / revenue, current year",
            RatioLine::NetMargin => "Net income / revenue, current year",
            RatioLine::CostOfEquity => "CAPM: Rf + beta x ERP",
            RatioLine::StockPe => "Current price / earnings per share",
            RatioLine::PriceToBook => "Current price / book value per share",
            RatioLine::Roce => "EBIT / (total assets - current liabilities)",
            RatioLine::Roe => "Net income / total equity",
            RatioLine::BookValue => "Total equity / shares outstanding",
            RatioLine::FaceValue => "Nominal value per share",
            RatioLine::DividendYield => "Dividends per share / current price",
        }
    }
}

const SLOTS: &[Slot<RatioLine>] = &[
    Slot::Header("DERIVED METRICS"),
    Slot::line(RatioLine::OperatingMargin, "Operating Margin"),
    Slot::line(RatioLine::NetMargin, "Net Margin"),
    Slot::line(RatioLine::CostOfEquity, "Cost of Equity"),
    Slot::Blank,
    Slot::Header("KEY RATIOS"),
    Slot::line(RatioLine::StockPe, "Stock P/E"),
    Slot::line(RatioLine::PriceToBook, "Price to Book"),
    Slot::line(RatioLine::Roce, "ROCE"),
    Slot::line(RatioLine::Roe, "ROE"),
    Slot::line(RatioLine::BookValue, "Book Value per Share"),
    Slot::line(RatioLine::FaceValue, "Face Value"),
    Slot::line(RatioLine::DividendYield, "Dividend Yield"),
];

/// One blank row below the assumption inputs.
pub fn layout(assumptions: &AssumptionRegistry) -> Layout<RatioLine> {
    Layout::new(assumptions.end_row() + 1, SLOTS)
}

/// `(name, address)` of every ratio value cell.
pub fn defined_names(rows: &RowMap<RatioLine>) -> Vec<(String, CellAddress)> {
    rows.iter()
        .map(|(key, _)| (key.defined_name().to_string(), rows.addr(key, VALUE_COL)))
        .collect()
}

/// Append both blocks to the Assumptions sheet.
pub fn write(
    ctx: &BuildContext,
    layout: &Layout<RatioLine>,
    sheet: &mut Sheet,
    income: &RowMap<IsLine>,
    balance: &RowMap<BsLine>,
    cash_flow: &RowMap<CfLine>,
) {
    layout.write_labels(sheet, ctx.label_col());
    let rows = layout.rows();
    let a = ctx.assumptions;
    let cur = ctx.axis.last_historical().column;
    let scale = ctx.settings.units.per_share_scale;
    let own = |key: RatioLine| rows.cell(key, VALUE_COL);
    let per_share = |amount: Expr| scaled(Expr::safe_div(amount, a.cell(A::SharesOutstanding)), scale);

    let revenue = income.cell(IsLine::Revenue, cur);
    let ebit = income.cell(IsLine::Ebit, cur);
    let net_income = income.cell(IsLine::NetIncome, cur);
    let equity = balance.cell(BsLine::TotalEquity, cur);
    let price = a.cell(A::CurrentPrice);

    let face_info = ctx.request.financial_data.company_info.face_value;
    let (face_value, face_tier) = resolve_chain(
        "face_value",
        &[(SourceTier::Real, face_info)],
        ctx.settings.defaults.face_value,
    );

    let formulas = [
        (RatioLine::OperatingMargin, Expr::safe_div(ebit.clone(), revenue.clone())),
        (RatioLine::NetMargin, Expr::safe_div(net_income.clone(), revenue)),
        (
            RatioLine::CostOfEquity,
            a.cell(A::RiskFreeRate) + a.cell(A::Beta) * a.cell(A::EquityRiskPremium),
        ),
        (RatioLine::StockPe, Expr::safe_div(price.clone(), per_share(net_income.clone()))),
        (RatioLine::PriceToBook, Expr::safe_div(price.clone(), own(RatioLine::BookValue))),
        (
            RatioLine::Roce,
            Expr::safe_div(
                ebit,
                balance.cell(BsLine::TotalAssets, cur) - balance.cell(BsLine::TotalCurrentLiabilities, cur),
            ),
        ),
        (RatioLine::Roe, Expr::safe_div(net_income, equity.clone())),
        (RatioLine::BookValue, per_share(equity)),
        // Dividends are an outflow on the cash flow statement
        (
            RatioLine::DividendYield,
            Expr::safe_div(per_share(-cash_flow.cell(CfLine::Dividends, cur)), price),
        ),
    ];

    for (key, expr) in formulas {
        let row = rows.row(key);
        sheet.formula(row, VALUE_COL, expr, CellStyle::new(StyleRole::Calc, key.format()));
        sheet.text(row, SOURCE_COL, SourceTier::Derived.label(), StyleRole::Note);
    }
    let face_row = rows.row(RatioLine::FaceValue);
    sheet.number(
        face_row,
        VALUE_COL,
        face_value,
        CellStyle::new(StyleRole::Input, RatioLine::FaceValue.format()),
    );
    sheet.text(face_row, SOURCE_COL, face_tier.label(), StyleRole::Note);

    for (row, item) in layout.items() {
        sheet.text(row, UNIT_COL, item.key.unit(), StyleRole::Label);
        sheet.text(row, NOTE_COL, item.key.note(), StyleRole::Note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::StatementLayouts;
    use crate::test_support::Fixture;

    fn build_with(json: &str) -> (Sheet, Layout<RatioLine>) {
        let fx = Fixture::new(json);
        let ctx = fx.context();
        let statements = StatementLayouts::new();
        let layout = layout(ctx.assumptions);
        let mut sheet = ctx.assumptions.build_sheet(&ctx);
        write(
            &ctx,
            &layout,
            &mut sheet,
            statements.income.rows(),
            statements.balance.rows(),
            statements.cash_flow.rows(),
        );
        (sheet, layout)
    }

    fn formula(sheet: &Sheet, row: u32) -> String {
        sheet
            .get(row, VALUE_COL)
            .and_then(|cell| cell.as_formula())
            .map(|expr| expr.to_formula(SheetKind::Assumptions))
            .unwrap_or_default()
    }

    #[test]
    fn blocks_sit_below_the_inputs() {
        let fx = Fixture::default();
        let layout = layout(&fx.assumptions);
        let market_cap = fx.assumptions.rows().row(A::MarketCap);
        assert_eq!(layout.rows().row(RatioLine::OperatingMargin), market_cap + 3);
        assert_eq!(layout.rows().len(), 10);
    }

    #[test]
    fn ratios_read_the_current_year() {
        let (sheet, layout) = build_with("{}");
        let rows = layout.rows();
        // Last historical year sits in column G
        assert_eq!(
            formula(&sheet, rows.row(RatioLine::OperatingMargin)),
            "=IFERROR(Income_Statement!G19/Income_Statement!G6,0)"
        );
        assert_eq!(
            formula(&sheet, rows.row(RatioLine::CostOfEquity)),
            "=$C$33+$C$35*$C$34"
        );
        assert!(formula(&sheet, rows.row(RatioLine::Roe)).contains("Balance_Sheet!G"));
    }

    #[test]
    fn face_value_is_an_input() {
        let (sheet, layout) = build_with(r#"{"financial_data": {"company_info": {"face_value": "2"}}}"#);
        let cell = sheet.get(layout.rows().row(RatioLine::FaceValue), VALUE_COL).unwrap();
        assert_eq!(cell.as_number(), Some(2.0));
        assert_eq!(cell.style.role, StyleRole::Input);

        let (sheet, layout) = build_with("{}");
        let row = layout.rows().row(RatioLine::FaceValue);
        assert_eq!(sheet.get(row, VALUE_COL).unwrap().as_number(), Some(10.0));
        assert_eq!(sheet.get(row, SOURCE_COL).unwrap().as_text(), Some("Default"));
    }

    #[test]
    fn names_are_unique_and_valid() {
        let fx = Fixture::default();
        let layout = layout(&fx.assumptions);
        let names = crate::names::define_all(defined_names(layout.rows())).unwrap();
        assert_eq!(names.len(), 10);
        assert_eq!(names[0].name, "Operating_Margin");
    }
}
