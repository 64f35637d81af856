//! Shared per-run state handed to every sheet builder, plus sheet chrome
//! (titles, period headers, column widths) common to all sheets.

use finmodel_config::Settings;
use finmodel_core::{CellStyle, NumberFormat, PeriodAxis, Sheet, SheetKind, StyleRole};

use crate::assumptions::AssumptionRegistry;
use crate::baseline::Baseline;
use crate::input::ModelRequest;

/// Sheet title (B2).
pub const TITLE_ROW: u32 = 1;
/// Company and unit caption (B3).
pub const SUBTITLE_ROW: u32 = 2;
/// Period / column header band (row 5).
pub const HEADER_ROW: u32 = 4;
/// First laid-out line item (row 6).
pub const FIRST_LINE_ROW: u32 = 5;

pub const CALC: CellStyle = CellStyle::new(StyleRole::Calc, NumberFormat::Integer);
pub const TOTAL: CellStyle = CellStyle::new(StyleRole::Total, NumberFormat::Integer);
pub const INPUT: CellStyle = CellStyle::new(StyleRole::Input, NumberFormat::Integer);
pub const PERCENT: CellStyle = CellStyle::new(StyleRole::Calc, NumberFormat::Percent);
pub const INPUT_PERCENT: CellStyle = CellStyle::new(StyleRole::Input, NumberFormat::Percent);
pub const NOTE_PERCENT: CellStyle = CellStyle::new(StyleRole::Note, NumberFormat::Percent);
pub const RATIO: CellStyle = CellStyle::new(StyleRole::Calc, NumberFormat::Ratio);

/// Everything a builder may read. All of it is immutable for the run.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub settings: &'a Settings,
    pub request: &'a ModelRequest,
    pub axis: &'a PeriodAxis,
    pub assumptions: &'a AssumptionRegistry,
    pub baseline: &'a Baseline,
}

impl<'a> BuildContext<'a> {
    pub fn label_col(&self) -> u16 {
        self.settings.model.label_column
    }

    pub fn value_col(&self) -> u16 {
        self.settings.model.first_column
    }

    pub fn company(&self) -> &'a str {
        let name = self.request.company_name.trim();
        if name.is_empty() {
            "Company"
        } else {
            name
        }
    }

    /// Caption such as `₹ Crores`.
    pub fn units(&self) -> String {
        let units = &self.settings.units;
        format!("{} {}", units.currency_symbol, units.unit_label)
    }

    /// Request-supplied title for `kind`, else `default`.
    pub fn title(&self, kind: SheetKind, default: String) -> String {
        self.request
            .model_structure
            .sheet_titles
            .get(&kind)
            .filter(|t| !t.trim().is_empty())
            .cloned()
            .unwrap_or(default)
    }

    /// Fresh sheet with title, caption and the gutter/label widths.
    pub fn new_sheet(&self, kind: SheetKind, default_title: String) -> Sheet {
        let mut sheet = Sheet::new(kind);
        let col = self.label_col();
        sheet.text(TITLE_ROW, col, self.title(kind, default_title), StyleRole::Title);
        sheet.text(
            SUBTITLE_ROW,
            col,
            format!("{} | {}", self.company(), self.units()),
            StyleRole::Subtitle,
        );
        if col > 0 {
            sheet.set_column_width(col - 1, 3.0);
        }
        sheet.set_column_width(col, 34.0);
        sheet
    }

    /// `Fiscal Year | FY2020 | ... | FY2029E` across the axis columns.
    pub fn write_period_header(&self, sheet: &mut Sheet, row: u32) {
        sheet.text(row, self.label_col(), "Fiscal Year", StyleRole::Header);
        for period in self.axis {
            sheet.text(row, period.column, period.label.clone(), StyleRole::Header);
            sheet.set_column_width(period.column, 13.0);
        }
    }
}
