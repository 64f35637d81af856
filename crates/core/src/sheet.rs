//! Sheet grids, row layouts and the immutable row maps later sheets address through.
//!
//! A sheet's layout (which line item sits on which row) is computed from its
//! ordered slot list before any cell is emitted. The resulting [`RowMap`] is
//! frozen: builders of later sheets receive `&RowMap<K>` and can only read it.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::address::{CellAddress, SheetKind};
use crate::cell::{Cell, CellStyle, NumberFormat, StyleRole};
use crate::formula::Expr;

// =============================================================================
// Line items and layouts
// =============================================================================

/// Typed row key of one sheet. Each sheet has its own key enum, so a key can
/// only ever be resolved against the map of the sheet that owns it.
pub trait LineKey: Copy + Eq + Hash + Debug {
    const SHEET: SheetKind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Header,
    Line,
    Total,
    Derived,
}

impl Section {
    pub fn label_role(&self) -> StyleRole {
        match self {
            Section::Header => StyleRole::Section,
            Section::Total => StyleRole::Total,
            Section::Derived => StyleRole::Note,
            Section::Line => StyleRole::Label,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItem<K> {
    pub key: K,
    pub label: &'static str,
    pub section: Section,
}

/// One row of a sheet layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot<K> {
    /// Unaddressable section heading
    Header(&'static str),
    Item(LineItem<K>),
    Blank,
}

impl<K> Slot<K> {
    pub const fn line(key: K, label: &'static str) -> Self {
        Slot::Item(LineItem {
            key,
            label,
            section: Section::Line,
        })
    }

    pub const fn total(key: K, label: &'static str) -> Self {
        Slot::Item(LineItem {
            key,
            label,
            section: Section::Total,
        })
    }

    pub const fn derived(key: K, label: &'static str) -> Self {
        Slot::Item(LineItem {
            key,
            label,
            section: Section::Derived,
        })
    }
}

/// Finalized `line key -> row` table for one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMap<K: LineKey> {
    rows: FxHashMap<K, u32>,
    order: Vec<(K, u32)>,
}

impl<K: LineKey> RowMap<K> {
    pub fn sheet(&self) -> SheetKind {
        K::SHEET
    }

    pub fn get(&self, key: K) -> Option<u32> {
        self.rows.get(&key).copied()
    }

    /// Row of `key`. Every key a builder asks for is laid out by the owning
    /// sheet, so a miss is a construction bug rather than a runtime condition.
    pub fn row(&self, key: K) -> u32 {
        match self.rows.get(&key) {
            Some(row) => *row,
            None => panic!("{:?} is not laid out on {}", key, K::SHEET),
        }
    }

    pub fn addr(&self, key: K, col: u16) -> CellAddress {
        CellAddress::new(K::SHEET, self.row(key), col)
    }

    /// Relative reference to `key` in column `col`.
    pub fn cell(&self, key: K, col: u16) -> Expr {
        Expr::cell(self.addr(key, col))
    }

    /// Absolute reference to `key` in column `col`.
    pub fn abs(&self, key: K, col: u16) -> Expr {
        Expr::abs_cell(self.addr(key, col))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys in row order.
    pub fn iter(&self) -> impl Iterator<Item = (K, u32)> + '_ {
        self.order.iter().copied()
    }
}

/// Slot list pinned to rows, together with its row map.
#[derive(Debug, Clone)]
pub struct Layout<K: LineKey> {
    start_row: u32,
    entries: Vec<(u32, Slot<K>)>,
    rows: RowMap<K>,
}

impl<K: LineKey> Layout<K> {
    /// Assign consecutive rows to `slots` starting at `start_row`.
    pub fn new(start_row: u32, slots: &[Slot<K>]) -> Self {
        let mut rows = FxHashMap::default();
        let mut order = Vec::new();
        let mut entries = Vec::with_capacity(slots.len());
        for (i, slot) in slots.iter().enumerate() {
            let row = start_row + i as u32;
            if let Slot::Item(item) = slot {
                let previous = rows.insert(item.key, row);
                debug_assert!(previous.is_none(), "duplicate line key {:?}", item.key);
                order.push((item.key, row));
            }
            entries.push((row, *slot));
        }
        Self {
            start_row,
            entries,
            rows: RowMap { rows, order },
        }
    }

    pub fn rows(&self) -> &RowMap<K> {
        &self.rows
    }

    pub fn into_rows(self) -> RowMap<K> {
        self.rows
    }

    pub fn items(&self) -> impl Iterator<Item = (u32, &LineItem<K>)> + '_ {
        self.entries.iter().filter_map(|(row, slot)| match slot {
            Slot::Item(item) => Some((*row, item)),
            _ => None,
        })
    }

    /// First row after the layout; `start_row` when there are no slots.
    pub fn end_row(&self) -> u32 {
        self.entries.last().map_or(self.start_row, |(row, _)| row + 1)
    }

    /// Write every header and line label into `col`.
    pub fn write_labels(&self, sheet: &mut Sheet, col: u16) {
        debug_assert_eq!(sheet.kind(), K::SHEET);
        for (row, slot) in &self.entries {
            match slot {
                Slot::Header(label) => sheet.text(*row, col, *label, StyleRole::Section),
                Slot::Item(item) => sheet.text(*row, col, item.label, item.section.label_role()),
                Slot::Blank => {}
            }
        }
    }
}

// =============================================================================
// Ranges and charts
// =============================================================================

/// Rectangular block on one sheet, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    pub fn new(sheet: SheetKind, first_row: u32, first_col: u16, last_row: u32, last_col: u16) -> Self {
        Self {
            start: CellAddress::new(sheet, first_row, first_col),
            end: CellAddress::new(sheet, last_row, last_col),
        }
    }

    /// One row spanning `first_col..=last_col`.
    pub fn row_span(sheet: SheetKind, row: u32, first_col: u16, last_col: u16) -> Self {
        Self::new(sheet, row, first_col, row, last_col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Column,
    Line,
    StackedColumn,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    pub values: CellRange,
    /// Fill color as `RRGGBB`; `None` leaves the series invisible
    pub color: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub categories: CellRange,
    pub series: Vec<ChartSeries>,
    pub y_format: NumberFormat,
    /// Top-left anchor cell (row, col)
    pub anchor: (u32, u16),
}

// =============================================================================
// Sheet grid
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    kind: SheetKind,
    cells: BTreeMap<(u32, u16), Cell>,
    column_widths: BTreeMap<u16, f64>,
    merges: Vec<CellRange>,
    color_scales: Vec<CellRange>,
    charts: Vec<ChartSpec>,
    freeze: Option<(u32, u16)>,
}

impl Sheet {
    pub fn new(kind: SheetKind) -> Self {
        Self {
            kind,
            cells: BTreeMap::new(),
            column_widths: BTreeMap::new(),
            merges: Vec::new(),
            color_scales: Vec::new(),
            charts: Vec::new(),
            freeze: None,
        }
    }

    pub fn kind(&self) -> SheetKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn set(&mut self, row: u32, col: u16, cell: Cell) {
        self.cells.insert((row, col), cell);
    }

    pub fn text(&mut self, row: u32, col: u16, text: impl Into<String>, role: StyleRole) {
        self.set(row, col, Cell::text(text, role));
    }

    pub fn number(&mut self, row: u32, col: u16, value: f64, style: CellStyle) {
        self.set(row, col, Cell::number(value, style));
    }

    pub fn formula(&mut self, row: u32, col: u16, expr: Expr, style: CellStyle) {
        self.set(row, col, Cell::formula(expr, style));
    }

    pub fn link(&mut self, row: u32, col: u16, text: impl Into<String>, target: SheetKind) {
        self.set(row, col, Cell::link(text, target));
    }

    pub fn get(&self, row: u32, col: u16) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn at(&self, addr: CellAddress) -> Option<&Cell> {
        debug_assert_eq!(addr.sheet, self.kind);
        self.get(addr.row, addr.col)
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = ((u32, u16), &Cell)> + '_ {
        self.cells.iter().map(|(k, v)| (*k, v))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Last used row, if any.
    pub fn max_row(&self) -> Option<u32> {
        self.cells.keys().map(|(row, _)| *row).max()
    }

    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.column_widths.insert(col, width);
    }

    pub fn column_widths(&self) -> impl Iterator<Item = (u16, f64)> + '_ {
        self.column_widths.iter().map(|(c, w)| (*c, *w))
    }

    /// Merge a range; the top-left cell supplies content and style.
    pub fn merge(&mut self, range: CellRange, cell: Cell) {
        debug_assert_eq!(range.start.sheet, self.kind);
        self.set(range.start.row, range.start.col, cell);
        self.merges.push(range);
    }

    pub fn merges(&self) -> &[CellRange] {
        &self.merges
    }

    pub fn add_color_scale(&mut self, range: CellRange) {
        self.color_scales.push(range);
    }

    pub fn color_scales(&self) -> &[CellRange] {
        &self.color_scales
    }

    pub fn add_chart(&mut self, chart: ChartSpec) {
        self.charts.push(chart);
    }

    pub fn charts(&self) -> &[ChartSpec] {
        &self.charts
    }

    pub fn freeze_panes(&mut self, row: u32, col: u16) {
        self.freeze = Some((row, col));
    }

    pub fn freeze(&self) -> Option<(u32, u16)> {
        self.freeze
    }
}
