//! Cover sheet: company caption, headline outputs and navigation links.

use chrono::NaiveDate;
use finmodel_core::{
    Cell, CellRange, CellStyle, Layout, LineKey, NumberFormat, RowMap, Sheet, SheetKind, Slot,
    StyleRole,
};
use serde::Serialize;

use crate::context::BuildContext;
use crate::valuation::ValLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SummaryLine {
    Industry,
    ModelType,
    ForecastPeriod,
    DataSource,
    SharePrice,
    EnterpriseValue,
    EquityValue,
    Wacc,
    Upside,
}

impl LineKey for SummaryLine {
    const SHEET: SheetKind = SheetKind::Summary;
}

const INFO_ROW: u32 = 5;
const NAV_COL_OFFSET: u16 = 3;

const SLOTS: &[Slot<SummaryLine>] = &[
    Slot::Header("COMPANY INFORMATION"),
    Slot::line(SummaryLine::Industry, "Industry"),
    Slot::line(SummaryLine::ModelType, "Model Type"),
    Slot::line(SummaryLine::ForecastPeriod, "Forecast Period"),
    Slot::line(SummaryLine::DataSource, "Data Source"),
    Slot::Blank,
    Slot::Header("KEY OUTPUTS"),
    Slot::total(SummaryLine::SharePrice, "Implied Share Price"),
    Slot::line(SummaryLine::EnterpriseValue, "Enterprise Value"),
    Slot::line(SummaryLine::EquityValue, "Equity Value"),
    Slot::line(SummaryLine::Wacc, "WACC"),
    Slot::line(SummaryLine::Upside, "Upside / (Downside)"),
];

pub fn layout() -> Layout<SummaryLine> {
    Layout::new(INFO_ROW, SLOTS)
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

pub fn build(
    ctx: &BuildContext,
    layout: &Layout<SummaryLine>,
    valuation: &RowMap<ValLine>,
    generated_on: NaiveDate,
) -> Sheet {
    let mut sheet = ctx.new_sheet(SheetKind::Summary, "Financial Model Summary".to_string());
    let label_col = ctx.label_col();
    let val = ctx.value_col();
    let nav_col = label_col + NAV_COL_OFFSET;

    sheet.merge(
        CellRange::row_span(SheetKind::Summary, 1, label_col, nav_col + 1),
        Cell::text(ctx.title(SheetKind::Summary, ctx.company().to_string()), StyleRole::Title),
    );
    sheet.text(2, label_col, "Financial Model Summary", StyleRole::Subtitle);
    sheet.text(
        3,
        label_col,
        format!("Generated: {} | {}", generated_on.format("%d-%b-%Y"), ctx.units()),
        StyleRole::Note,
    );

    layout.write_labels(&mut sheet, label_col);
    let rows = layout.rows();
    let info = &ctx.request.industry_info;
    let data_source = ctx
        .request
        .financial_data
        .data_source
        .as_deref()
        .unwrap_or("Company filings and industry benchmarks");
    let forecast = ctx.axis.forecast();
    let horizon = match (forecast.first(), forecast.last()) {
        (Some(first), Some(last)) => format!("{} years ({} - {})", forecast.len(), first.label, last.label),
        _ => "None".to_string(),
    };
    for (key, text) in [
        (SummaryLine::Industry, or_default(&info.industry_name, "General").to_string()),
        (SummaryLine::ModelType, or_default(&info.model_type, "DCF").to_string()),
        (SummaryLine::ForecastPeriod, horizon),
        (SummaryLine::DataSource, or_default(data_source, "n/a").to_string()),
    ] {
        sheet.text(rows.row(key), val, text, StyleRole::Label);
    }

    let output = |format| CellStyle::new(StyleRole::Output, format);
    let calc = |format| CellStyle::new(StyleRole::Calc, format);
    for (key, line, style) in [
        (SummaryLine::SharePrice, ValLine::SharePrice, output(NumberFormat::Currency)),
        (SummaryLine::EnterpriseValue, ValLine::EnterpriseValue, calc(NumberFormat::Integer)),
        (SummaryLine::EquityValue, ValLine::EquityValue, calc(NumberFormat::Integer)),
        (SummaryLine::Wacc, ValLine::Wacc, calc(NumberFormat::Percent)),
        (SummaryLine::Upside, ValLine::Upside, output(NumberFormat::Percent)),
    ] {
        sheet.formula(rows.row(key), val, valuation.cell(line, val), style);
    }

    sheet.text(INFO_ROW, nav_col, "MODEL NAVIGATION", StyleRole::Section);
    for (i, kind) in SheetKind::ORDER.iter().enumerate() {
        sheet.link(INFO_ROW + 1 + i as u32, nav_col, kind.display_name(), *kind);
    }

    sheet.set_column_width(label_col, 28.0);
    sheet.set_column_width(val, 36.0);
    sheet.set_column_width(nav_col, 24.0);
    sheet
}
