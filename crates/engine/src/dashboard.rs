//! Dashboard: key metrics, chart data and the DCF bridge waterfall.

use finmodel_config::Palette;
use finmodel_core::{
    Cell, CellRange, CellStyle, ChartKind, ChartSeries, ChartSpec, Expr, Layout, LineKey,
    NumberFormat, RowMap, Sheet, SheetKind, Slot, StyleRole,
};
use serde::Serialize;

use crate::context::BuildContext;
use crate::statements::IsLine;
use crate::valuation::ValLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DashLine {
    CurrentRevenue,
    FinalRevenue,
    RevenueCagr,
    CurrentMargin,
    FinalMargin,
    EnterpriseValue,
    EquityValue,
    SharePrice,
    Periods,
    Revenue,
    Ebitda,
    NetIncome,
    EbitdaMargin,
    PvCashFlows,
    PvTerminalValue,
    EnterpriseTotal,
    NetDebt,
    EquityTotal,
}

impl LineKey for DashLine {
    const SHEET: SheetKind = SheetKind::Dashboard;
}

const METRICS_ROW: u32 = 21;
const DATA_ROW: u32 = 39;
const WATERFALL_ROW: u32 = 49;

const METRICS: &[Slot<DashLine>] = &[
    Slot::Header("KEY METRICS SUMMARY"),
    Slot::line(DashLine::CurrentRevenue, "Current Revenue"),
    Slot::line(DashLine::FinalRevenue, "Final-Year Revenue"),
    Slot::line(DashLine::RevenueCagr, "Revenue CAGR"),
    Slot::line(DashLine::CurrentMargin, "Current EBITDA Margin"),
    Slot::line(DashLine::FinalMargin, "Final-Year EBITDA Margin"),
    Slot::line(DashLine::EnterpriseValue, "Enterprise Value"),
    Slot::line(DashLine::EquityValue, "Equity Value"),
    Slot::line(DashLine::SharePrice, "Implied Share Price"),
];

const DATA: &[Slot<DashLine>] = &[
    Slot::Header("CHART DATA"),
    Slot::derived(DashLine::Periods, "Year"),
    Slot::line(DashLine::Revenue, "Revenue"),
    Slot::line(DashLine::Ebitda, "EBITDA"),
    Slot::line(DashLine::NetIncome, "Net Income"),
    Slot::line(DashLine::EbitdaMargin, "EBITDA Margin %"),
];

const WATERFALL: &[Slot<DashLine>] = &[
    Slot::Header("DCF WATERFALL DATA"),
    Slot::Blank,
    Slot::line(DashLine::PvCashFlows, "PV of FCF"),
    Slot::line(DashLine::PvTerminalValue, "+ Terminal Value"),
    Slot::total(DashLine::EnterpriseTotal, "= Enterprise Value"),
    Slot::line(DashLine::NetDebt, "- Net Debt"),
    Slot::total(DashLine::EquityTotal, "= Equity Value"),
];

#[derive(Debug, Clone)]
pub struct DashboardLayout {
    pub metrics: Layout<DashLine>,
    pub data: Layout<DashLine>,
    pub waterfall: Layout<DashLine>,
}

impl DashboardLayout {
    pub fn new() -> Self {
        Self {
            metrics: Layout::new(METRICS_ROW, METRICS),
            data: Layout::new(DATA_ROW, DATA),
            waterfall: Layout::new(WATERFALL_ROW, WATERFALL),
        }
    }
}

impl Default for DashboardLayout {
    fn default() -> Self {
        Self::new()
    }
}

const INTEGER: CellStyle = CellStyle::new(StyleRole::Calc, NumberFormat::Integer);
const PERCENT: CellStyle = CellStyle::new(StyleRole::Calc, NumberFormat::Percent);

pub fn build(
    ctx: &BuildContext,
    layout: &DashboardLayout,
    income: &RowMap<IsLine>,
    valuation: &RowMap<ValLine>,
) -> Sheet {
    let title = format!("{} - Financial Dashboard", ctx.company());
    let mut sheet = ctx.new_sheet(SheetKind::Dashboard, title);
    let label_col = ctx.label_col();
    let val = ctx.value_col();
    for block in [&layout.metrics, &layout.data, &layout.waterfall] {
        block.write_labels(&mut sheet, label_col);
    }

    // Chart data on the statement columns
    let data = layout.data.rows();
    for period in ctx.axis {
        let col = period.column;
        sheet.text(data.row(DashLine::Periods), col, period.label.clone(), StyleRole::Header);
        sheet.formula(data.row(DashLine::Revenue), col, income.cell(IsLine::Revenue, col), INTEGER);
        sheet.formula(data.row(DashLine::Ebitda), col, income.cell(IsLine::Ebitda, col), INTEGER);
        sheet.formula(data.row(DashLine::NetIncome), col, income.cell(IsLine::NetIncome, col), INTEGER);
        sheet.formula(
            data.row(DashLine::EbitdaMargin),
            col,
            Expr::safe_div(data.cell(DashLine::Ebitda, col), data.cell(DashLine::Revenue, col)),
            PERCENT,
        );
    }

    // Key metrics
    let metrics = layout.metrics.rows();
    let current = ctx.axis.last_historical().column;
    let last = ctx.axis.last().column;
    let years = ctx.axis.forecast_years() as f64;
    let output = |format: NumberFormat| CellStyle::new(StyleRole::Output, format);
    let m = |key: DashLine| metrics.cell(key, val);
    for (key, expr, format) in [
        (DashLine::CurrentRevenue, income.cell(IsLine::Revenue, current), NumberFormat::Integer),
        (DashLine::FinalRevenue, income.cell(IsLine::Revenue, last), NumberFormat::Integer),
        (
            DashLine::RevenueCagr,
            ((m(DashLine::FinalRevenue) / m(DashLine::CurrentRevenue)).pow(Expr::num(1.0) / Expr::num(years))
                - Expr::num(1.0))
            .or_zero(),
            NumberFormat::Percent,
        ),
        (DashLine::CurrentMargin, data.cell(DashLine::EbitdaMargin, current), NumberFormat::Percent),
        (DashLine::FinalMargin, data.cell(DashLine::EbitdaMargin, last), NumberFormat::Percent),
        (DashLine::EnterpriseValue, valuation.cell(ValLine::EnterpriseValue, val), NumberFormat::Integer),
        (DashLine::EquityValue, valuation.cell(ValLine::EquityValue, val), NumberFormat::Integer),
        (DashLine::SharePrice, valuation.cell(ValLine::SharePrice, val), NumberFormat::Currency),
    ] {
        sheet.formula(metrics.row(key), val, expr, output(format));
    }
    sheet.merge(
        CellRange::row_span(SheetKind::Dashboard, METRICS_ROW, label_col, val + 1),
        Cell::text("KEY METRICS SUMMARY", StyleRole::Section),
    );

    // Waterfall: an invisible base series lifts each step to its running level
    let waterfall = layout.waterfall.rows();
    let header_row = WATERFALL_ROW + 1;
    let (value, base, up, down) = (val, val + 1, val + 2, val + 3);
    for (col, heading) in [
        (label_col, "Component"),
        (value, "Value"),
        (base, "Base"),
        (up, "Increase"),
        (down, "Decrease"),
    ] {
        sheet.text(header_row, col, heading, StyleRole::Header);
    }
    let w = |key: DashLine, col: u16| waterfall.cell(key, col);
    let zero = || Expr::num(0.0);
    let steps = [
        (
            DashLine::PvCashFlows,
            valuation.cell(ValLine::SumPvFcff, val),
            zero(),
            w(DashLine::PvCashFlows, value),
            zero(),
        ),
        (
            DashLine::PvTerminalValue,
            valuation.cell(ValLine::PvTerminalValueBridge, val),
            w(DashLine::PvCashFlows, base) + w(DashLine::PvCashFlows, up),
            w(DashLine::PvTerminalValue, value),
            zero(),
        ),
        (
            DashLine::EnterpriseTotal,
            valuation.cell(ValLine::EnterpriseValue, val),
            zero(),
            w(DashLine::EnterpriseTotal, value),
            zero(),
        ),
        (
            DashLine::NetDebt,
            valuation.cell(ValLine::NetDebt, val),
            w(DashLine::EnterpriseTotal, value) - Expr::max(w(DashLine::NetDebt, value), zero()),
            Expr::max(-w(DashLine::NetDebt, value), zero()),
            Expr::max(w(DashLine::NetDebt, value), zero()),
        ),
        (
            DashLine::EquityTotal,
            valuation.cell(ValLine::EquityValue, val),
            zero(),
            w(DashLine::EquityTotal, value),
            zero(),
        ),
    ];
    for (key, amount, lift, increase, decrease) in steps {
        let row = waterfall.row(key);
        sheet.formula(row, value, amount, INTEGER);
        sheet.formula(row, base, lift, INTEGER);
        sheet.formula(row, up, increase, INTEGER);
        sheet.formula(row, down, decrease, INTEGER);
    }

    // Charts
    let palette = &ctx.settings.palette;
    let units = ctx.units();
    let (first_col, last_col) = ctx.axis.column_range();
    let periods = CellRange::row_span(SheetKind::Dashboard, data.row(DashLine::Periods), first_col, last_col);
    let series = |name: &str, key: DashLine, color: &str| ChartSeries {
        name: name.to_string(),
        values: CellRange::row_span(SheetKind::Dashboard, data.row(key), first_col, last_col),
        color: Some(Palette::rgb(color)),
    };
    sheet.add_chart(ChartSpec {
        kind: ChartKind::Column,
        title: format!("Revenue & EBITDA ({})", units),
        categories: periods,
        series: vec![
            series("Revenue", DashLine::Revenue, &palette.chart_primary),
            series("EBITDA", DashLine::Ebitda, &palette.chart_secondary),
        ],
        y_format: NumberFormat::Integer,
        anchor: (4, label_col),
    });
    sheet.add_chart(ChartSpec {
        kind: ChartKind::Line,
        title: "EBITDA Margin Trend".to_string(),
        categories: periods,
        series: vec![series("EBITDA Margin", DashLine::EbitdaMargin, &palette.chart_primary)],
        y_format: NumberFormat::Percent,
        anchor: (4, 11),
    });
    sheet.add_chart(ChartSpec {
        kind: ChartKind::Line,
        title: format!("Net Income Trend ({})", units),
        categories: periods,
        series: vec![series("Net Income", DashLine::NetIncome, &palette.chart_secondary)],
        y_format: NumberFormat::Integer,
        anchor: (17, 11),
    });

    let first_step = waterfall.row(DashLine::PvCashFlows);
    let last_step = waterfall.row(DashLine::EquityTotal);
    let column = |col: u16| CellRange::new(SheetKind::Dashboard, first_step, col, last_step, col);
    sheet.add_chart(ChartSpec {
        kind: ChartKind::StackedColumn,
        title: format!("DCF Valuation Bridge ({})", units),
        categories: column(label_col),
        series: vec![
            ChartSeries {
                name: "Base".to_string(),
                values: column(base),
                color: None,
            },
            ChartSeries {
                name: "Increase".to_string(),
                values: column(up),
                color: Some(Palette::rgb(&palette.chart_increase)),
            },
            ChartSeries {
                name: "Decrease".to_string(),
                values: column(down),
                color: Some(Palette::rgb(&palette.chart_decrease)),
            },
        ],
        y_format: NumberFormat::Integer,
        anchor: (31, 11),
    });

    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::income;
    use crate::test_support::Fixture;
    use crate::valuation;

    fn build_default() -> (Sheet, DashboardLayout) {
        let fx = Fixture::default();
        let ctx = fx.context();
        let layout = DashboardLayout::new();
        let sheet = build(&ctx, &layout, income::layout().rows(), valuation::layout().rows());
        (sheet, layout)
    }

    #[test]
    fn blocks_do_not_overlap() {
        let layout = DashboardLayout::new();
        assert!(layout.metrics.end_row() <= DATA_ROW);
        assert!(layout.data.end_row() <= WATERFALL_ROW);
    }

    #[test]
    fn four_charts_with_invisible_waterfall_base() {
        let (sheet, _) = build_default();
        let charts = sheet.charts();
        assert_eq!(charts.len(), 4);
        assert_eq!(charts[0].kind, ChartKind::Column);
        assert_eq!(charts[0].series.len(), 2);
        assert_eq!(charts[3].kind, ChartKind::StackedColumn);
        assert_eq!(charts[3].series[0].color, None);
        assert_eq!(charts[3].series[1].color, Some(0x63BE7B));
    }

    #[test]
    fn chart_data_tracks_income_statement() {
        let (sheet, layout) = build_default();
        let row = layout.data.rows().row(DashLine::Revenue);
        let text = sheet.get(row, 4).unwrap().as_formula().unwrap().to_formula(SheetKind::Dashboard);
        assert_eq!(text, "=Income_Statement!E6");
    }
}
