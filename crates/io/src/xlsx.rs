// Excel export
//
// Writes an assembled FinancialModel as a live workbook: every formula is kept as
// a formula, with its evaluated result cached so viewers that never recalculate
// still show numbers. Assumption cells are published as workbook defined names.

use std::path::Path;
use std::time::Instant;

use rust_xlsxwriter::{
    Chart, ChartFormat, ChartLegendPosition, ChartLine, ChartSolidFill, ChartType, Color,
    ConditionalFormat3ColorScale, Formula, Url, Workbook as XlsxWorkbook, Worksheet, XlsxError,
};
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, info};

use finmodel_config::Settings;
use finmodel_core::{
    CellAddress, CellRange, CellValue, ChartKind, ChartSpec, EvalResult, Sheet, SheetKind,
};
use finmodel_engine::{evaluate_all, FinancialModel};

use crate::xlsx_styles::StyleBook;

/// Chart size in pixels.
const CHART_WIDTH: u32 = 600;
const CHART_HEIGHT: u32 = 300;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write sheet '{sheet}': {source}")]
    Sheet {
        sheet: &'static str,
        #[source]
        source: XlsxError,
    },
    #[error("failed to define name '{name}': {source}")]
    DefinedName {
        name: String,
        #[source]
        source: XlsxError,
    },
    #[error("failed to save {path}: {source}")]
    Save {
        path: String,
        #[source]
        source: XlsxError,
    },
}

/// Export statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportResult {
    pub sheets_exported: usize,
    pub cells_exported: usize,
    pub formulas_exported: usize,
    /// Formulas whose cached result is an error value
    pub formula_errors: usize,
    pub names_defined: usize,
    pub links_exported: usize,
    pub merges_exported: usize,
    pub charts_exported: usize,
    pub color_scales_exported: usize,
    pub export_duration_ms: u128,
}

/// Write `model` to `path`, creating missing parent directories.
pub fn export(model: &FinancialModel, settings: &Settings, path: &Path) -> Result<ExportResult, ExportError> {
    let start_time = Instant::now();
    let mut result = ExportResult::default();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ExportError::CreateDir {
            path: parent.display().to_string(),
            source,
        })?;
    }

    let values = evaluate_all(model);
    let mut styles = StyleBook::new(settings);
    let mut xlsx_workbook = XlsxWorkbook::new();

    for sheet in model.sheets() {
        let name = sheet.name();
        let wrap = |source| ExportError::Sheet { sheet: name, source };
        let worksheet = xlsx_workbook.add_worksheet().set_name(name).map_err(wrap)?;
        export_sheet(sheet, worksheet, &mut styles, &values, &mut result).map_err(wrap)?;
        result.sheets_exported += 1;
        debug!(sheet = name, cells = sheet.cell_count(), "sheet exported");
    }

    for defined in model.defined_names() {
        xlsx_workbook
            .define_name(&defined.name, &format!("={}", defined.reference()))
            .map_err(|source| ExportError::DefinedName {
                name: defined.name.clone(),
                source,
            })?;
        result.names_defined += 1;
    }

    if let Ok(ws) = xlsx_workbook.worksheet_from_index(model.active_sheet().position()) {
        ws.set_active(true);
    }

    xlsx_workbook.save(path).map_err(|source| ExportError::Save {
        path: path.display().to_string(),
        source,
    })?;

    result.export_duration_ms = start_time.elapsed().as_millis();
    info!(
        path = %path.display(),
        sheets = result.sheets_exported,
        cells = result.cells_exported,
        formulas = result.formulas_exported,
        ms = result.export_duration_ms as u64,
        "workbook saved"
    );
    Ok(result)
}

fn export_sheet(
    sheet: &Sheet,
    worksheet: &mut Worksheet,
    styles: &mut StyleBook,
    values: &FxHashMap<CellAddress, EvalResult>,
    result: &mut ExportResult,
) -> Result<(), XlsxError> {
    // Merges first: merge_range() blanks the whole block, then the origin cell
    // is overwritten below with its typed value.
    for range in sheet.merges() {
        let style = sheet
            .get(range.start.row, range.start.col)
            .map(|cell| cell.style)
            .unwrap_or_default();
        worksheet.merge_range(
            range.start.row,
            range.start.col,
            range.end.row,
            range.end.col,
            "",
            styles.format(style),
        )?;
        result.merges_exported += 1;
    }

    for ((row, col), cell) in sheet.cells() {
        let format = styles.format(cell.style);
        match &cell.value {
            CellValue::Text(text) => {
                worksheet.write_string_with_format(row, col, text, format)?;
            }
            CellValue::Number(n) => {
                worksheet.write_number_with_format(row, col, *n, format)?;
            }
            CellValue::Formula(expr) => {
                let mut formula = Formula::new(expr.to_formula(sheet.kind()));
                match values.get(&CellAddress::new(sheet.kind(), row, col)) {
                    Some(Ok(value)) => formula = formula.set_result(value.to_string()),
                    _ => result.formula_errors += 1,
                }
                worksheet.write_formula_with_format(row, col, formula, format)?;
                result.formulas_exported += 1;
            }
            CellValue::Link { text, target } => {
                let url = Url::new(internal_link(*target)).set_text(text);
                worksheet.write_url_with_format(row, col, url, format)?;
                result.links_exported += 1;
            }
        }
        result.cells_exported += 1;
    }

    for (col, width) in sheet.column_widths() {
        worksheet.set_column_width(col, width)?;
    }
    if let Some((row, col)) = sheet.freeze() {
        worksheet.set_freeze_panes(row, col)?;
    }

    for range in sheet.color_scales() {
        let [low, mid, high] = styles.scale_colors();
        let scale = ConditionalFormat3ColorScale::new()
            .set_minimum_color(low)
            .set_midpoint_color(mid)
            .set_maximum_color(high);
        worksheet.add_conditional_format(range.start.row, range.start.col, range.end.row, range.end.col, &scale)?;
        result.color_scales_exported += 1;
    }

    for spec in sheet.charts() {
        let chart = build_chart(spec, styles);
        worksheet.insert_chart(spec.anchor.0, spec.anchor.1, &chart)?;
        result.charts_exported += 1;
    }
    Ok(())
}

/// `internal:Income_Statement!A1`
fn internal_link(target: SheetKind) -> String {
    format!("internal:{}!A1", target.name())
}

fn chart_range(range: &CellRange) -> (&'static str, u32, u16, u32, u16) {
    (
        range.start.sheet.name(),
        range.start.row,
        range.start.col,
        range.end.row,
        range.end.col,
    )
}

fn build_chart(spec: &ChartSpec, styles: &StyleBook) -> Chart {
    let chart_type = match spec.kind {
        ChartKind::Column => ChartType::Column,
        ChartKind::Line => ChartType::Line,
        ChartKind::StackedColumn => ChartType::ColumnStacked,
    };
    let mut chart = Chart::new(chart_type);
    chart.title().set_name(spec.title.as_str());
    chart.set_width(CHART_WIDTH).set_height(CHART_HEIGHT);
    chart.legend().set_position(ChartLegendPosition::Bottom);
    if let Some(code) = styles.num_format(spec.y_format) {
        chart.y_axis().set_num_format(code);
    }

    for series in &spec.series {
        let mut format = ChartFormat::new();
        match (spec.kind, series.color) {
            (_, None) => {
                format.set_no_fill().set_no_border();
            }
            (ChartKind::Line, Some(rgb)) => {
                format.set_line(ChartLine::new().set_color(Color::RGB(rgb)).set_width(2.25));
            }
            (_, Some(rgb)) => {
                format.set_solid_fill(ChartSolidFill::new().set_color(Color::RGB(rgb)));
            }
        }
        chart
            .add_series()
            .set_name(series.name.as_str())
            .set_categories(chart_range(&spec.categories))
            .set_values(chart_range(&series.values))
            .set_format(&mut format);
    }
    if spec.kind == ChartKind::StackedColumn {
        chart.legend().set_hidden();
    }
    chart
}
