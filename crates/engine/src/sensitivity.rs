//! Sensitivity grids.
//!
//! Both grids are closed-form proxies over a block of literal constants: every
//! grid cell is an independent formula of its own row and column axis cells,
//! so changing one axis value or one constant recomputes the whole table.

use finmodel_config::Settings;
use finmodel_core::{
    Cell, CellAddress, CellRange, CellStyle, Expr, Layout, LineKey, NumberFormat, Sheet,
    SheetKind, Slot, StyleRole,
};
use serde::Serialize;

use crate::context::{BuildContext, FIRST_LINE_ROW};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SensLine {
    BaseCashFlow,
    BaseRevenue,
    ExitMultiple,
    HorizonYears,
}

impl LineKey for SensLine {
    const SHEET: SheetKind = SheetKind::Sensitivity;
}

const SLOTS: &[Slot<SensLine>] = &[
    Slot::Header("PROXY INPUTS"),
    Slot::line(SensLine::BaseCashFlow, "Base Free Cash Flow"),
    Slot::line(SensLine::BaseRevenue, "Base Revenue"),
    Slot::line(SensLine::ExitMultiple, "Exit EV/EBITDA Multiple"),
    Slot::line(SensLine::HorizonYears, "Projection Horizon (Years)"),
];

/// Placement of one grid on the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    pub title_row: u32,
    /// Row holding the column-axis values
    pub header_row: u32,
    pub first_row: u32,
    pub rows: usize,
    pub cols: usize,
    /// Column holding the row-axis values
    pub axis_col: u16,
}

impl GridGeometry {
    pub fn first_col(&self) -> u16 {
        self.axis_col + 1
    }

    pub fn last_row(&self) -> u32 {
        self.first_row + self.rows as u32 - 1
    }

    pub fn last_col(&self) -> u16 {
        self.first_col() + self.cols as u16 - 1
    }

    /// Row after the grid.
    pub fn end_row(&self) -> u32 {
        self.last_row() + 1
    }

    pub fn values(&self) -> CellRange {
        CellRange::new(
            SheetKind::Sensitivity,
            self.first_row,
            self.first_col(),
            self.last_row(),
            self.last_col(),
        )
    }

    pub fn center(&self) -> (u32, u16) {
        (
            self.first_row + (self.rows / 2) as u32,
            self.first_col() + (self.cols / 2) as u16,
        )
    }
}

#[derive(Debug, Clone)]
pub struct SensitivityLayout {
    pub inputs: Layout<SensLine>,
    pub valuation_grid: GridGeometry,
    pub operating_grid: GridGeometry,
}

impl SensitivityLayout {
    pub fn new(settings: &Settings, axis_col: u16) -> Self {
        let inputs = Layout::new(FIRST_LINE_ROW, SLOTS);
        let s = &settings.sensitivity;
        let valuation_grid = GridGeometry {
            title_row: inputs.end_row() + 1,
            header_row: inputs.end_row() + 3,
            first_row: inputs.end_row() + 4,
            rows: s.wacc_axis.len(),
            cols: s.terminal_growth_axis.len(),
            axis_col,
        };
        let start = valuation_grid.end_row() + 2;
        let operating_grid = GridGeometry {
            title_row: start,
            header_row: start + 2,
            first_row: start + 3,
            rows: s.revenue_growth_axis.len(),
            cols: s.ebitda_margin_axis.len(),
            axis_col,
        };
        Self {
            inputs,
            valuation_grid,
            operating_grid,
        }
    }
}

const AXIS: CellStyle = CellStyle::new(StyleRole::Header, NumberFormat::Percent);
const GRID: CellStyle = CellStyle::new(StyleRole::Calc, NumberFormat::Integer);
const CENTER: CellStyle = CellStyle::new(StyleRole::Output, NumberFormat::Integer);

pub fn build(ctx: &BuildContext, layout: &SensitivityLayout) -> Sheet {
    let mut sheet = ctx.new_sheet(SheetKind::Sensitivity, "Sensitivity Analysis".to_string());
    let settings = &ctx.settings.sensitivity;
    let label_col = ctx.label_col();
    let value_col = ctx.value_col();

    layout.inputs.write_labels(&mut sheet, label_col);
    let inputs = layout.inputs.rows();
    for (key, value, format) in [
        (SensLine::BaseCashFlow, settings.base_cash_flow, NumberFormat::Integer),
        (SensLine::BaseRevenue, settings.base_revenue, NumberFormat::Integer),
        (SensLine::ExitMultiple, settings.exit_multiple, NumberFormat::Ratio),
        (SensLine::HorizonYears, settings.horizon_years, NumberFormat::Integer),
    ] {
        sheet.number(inputs.row(key), value_col, value, CellStyle::new(StyleRole::Input, format));
    }
    let constant = |key: SensLine| inputs.abs(key, value_col);

    // WACC x terminal growth: Gordon growth on the proxy cash flow
    let cash_flow = constant(SensLine::BaseCashFlow);
    write_grid(
        &mut sheet,
        &layout.valuation_grid,
        "WACC vs Terminal Growth: Terminal Value",
        "WACC \\ TG",
        &settings.wacc_axis,
        &settings.terminal_growth_axis,
        |wacc, growth| {
            Expr::if_then(
                wacc.clone().gt(growth.clone()),
                cash_flow.clone() * (Expr::num(1.0) + growth.clone()) / (wacc - growth),
                Expr::num(0.0),
            )
        },
    );

    // Revenue growth x EBITDA margin: exit-multiple enterprise value
    let revenue = constant(SensLine::BaseRevenue);
    let horizon = constant(SensLine::HorizonYears);
    let multiple = constant(SensLine::ExitMultiple);
    write_grid(
        &mut sheet,
        &layout.operating_grid,
        "Revenue Growth vs EBITDA Margin: Enterprise Value",
        "Growth \\ Margin",
        &settings.revenue_growth_axis,
        &settings.ebitda_margin_axis,
        |growth, margin| {
            revenue.clone() * (Expr::num(1.0) + growth).pow(horizon.clone()) * margin * multiple.clone()
        },
    );

    sheet.set_column_width(label_col, 30.0);
    sheet
}

/// Axis literals plus one formula per cell. `cell(row_axis, col_axis)`
/// receives mixed references that stay pinned to the axis row or column.
fn write_grid(
    sheet: &mut Sheet,
    grid: &GridGeometry,
    title: &str,
    corner: &str,
    row_axis: &[f64],
    col_axis: &[f64],
    cell: impl Fn(Expr, Expr) -> Expr,
) {
    sheet.merge(
        CellRange::row_span(SheetKind::Sensitivity, grid.title_row, grid.axis_col, grid.last_col()),
        Cell::text(title, StyleRole::Section),
    );
    sheet.text(grid.header_row, grid.axis_col, corner, StyleRole::Header);
    for (j, value) in col_axis.iter().enumerate() {
        let col = grid.first_col() + j as u16;
        sheet.number(grid.header_row, col, *value, AXIS);
        sheet.set_column_width(col, 12.0);
    }

    let center = grid.center();
    for (i, value) in row_axis.iter().enumerate() {
        let row = grid.first_row + i as u32;
        sheet.number(row, grid.axis_col, *value, AXIS);
        let row_value = Expr::mixed(CellAddress::new(SheetKind::Sensitivity, row, grid.axis_col), true, false);
        for j in 0..col_axis.len() {
            let col = grid.first_col() + j as u16;
            let col_value = Expr::mixed(CellAddress::new(SheetKind::Sensitivity, grid.header_row, col), false, true);
            let style = if (row, col) == center { CENTER } else { GRID };
            sheet.formula(row, col, cell(row_value.clone(), col_value), style);
        }
    }
    if !row_axis.is_empty() && !col_axis.is_empty() {
        sheet.add_color_scale(grid.values());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    fn build_default() -> (Sheet, SensitivityLayout) {
        let fx = Fixture::default();
        let ctx = fx.context();
        let layout = SensitivityLayout::new(ctx.settings, ctx.label_col());
        (build(&ctx, &layout), layout)
    }

    fn formula(sheet: &Sheet, row: u32, col: u16) -> String {
        sheet.get(row, col).unwrap().as_formula().unwrap().to_formula(SheetKind::Sensitivity)
    }

    #[test]
    fn grids_follow_inputs_block() {
        let (_, layout) = build_default();
        assert_eq!(layout.inputs.end_row(), 10);
        assert_eq!(layout.valuation_grid.first_row, 14);
        assert_eq!(layout.valuation_grid.last_row(), 20);
        assert_eq!(layout.operating_grid.title_row, 23);
        assert_eq!(layout.operating_grid.cols, 5);
    }

    #[test]
    fn grid_cells_use_mixed_references() {
        let (sheet, layout) = build_default();
        let g = layout.valuation_grid;
        assert_eq!(
            formula(&sheet, g.first_row, g.first_col()),
            "=IF($B15>C$14,$C$7*(1+C$14)/($B15-C$14),0)"
        );
        let o = layout.operating_grid;
        assert_eq!(
            formula(&sheet, o.first_row + 1, o.first_col() + 2),
            "=$C$8*(1+$B28)^$C$10*E$26*$C$9"
        );
    }

    #[test]
    fn center_cell_is_highlighted_and_grids_are_scaled() {
        let (sheet, layout) = build_default();
        let (row, col) = layout.valuation_grid.center();
        assert_eq!(sheet.get(row, col).unwrap().style.role, StyleRole::Output);
        assert_eq!(sheet.color_scales().len(), 2);
        assert_eq!(sheet.merges().len(), 2);
    }
}
