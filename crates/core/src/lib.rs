pub mod address;
pub mod cell;
pub mod eval;
pub mod formula;
pub mod period;
pub mod sheet;

pub use address::{col_to_letter, CellAddress, SheetKind};
pub use cell::{Cell, CellStyle, CellValue, NumberFormat, StyleRole};
pub use eval::{evaluate, CellError, CellLookup, EvalResult};
pub use formula::{Expr, Func, Op};
pub use period::{AxisError, Period, PeriodAxis, PeriodKind, MAX_FORECAST_YEARS};
pub use sheet::{
    CellRange, ChartKind, ChartSeries, ChartSpec, Layout, LineItem, LineKey, RowMap, Section,
    Sheet, Slot,
};
