//! Model cells: a tagged value plus a display style.

use crate::address::SheetKind;
use crate::formula::Expr;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    /// Literal number (anchor values, inputs, axis headers)
    Number(f64),
    Formula(Expr),
    /// In-workbook navigation link to the top of another sheet
    Link { text: String, target: SheetKind },
}

/// Visual role; the writer maps each role to fill/font/border from the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StyleRole {
    Title,
    Subtitle,
    /// Column header band (period labels, table headings)
    Header,
    /// Section divider row (ASSETS, OPERATING ACTIVITIES, ...)
    Section,
    #[default]
    Label,
    /// Editable input (yellow fill, blue font)
    Input,
    Calc,
    Total,
    /// Key result (green fill, bold)
    Output,
    /// Secondary italic text: notes, sources, memo rows
    Note,
    Link,
}

/// Display-format classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NumberFormat {
    #[default]
    General,
    Integer,
    Decimal,
    Currency,
    Percent,
    Ratio,
    /// Plain three-decimal factor, e.g. a discount factor
    Factor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellStyle {
    pub role: StyleRole,
    pub format: NumberFormat,
}

impl CellStyle {
    pub const fn new(role: StyleRole, format: NumberFormat) -> Self {
        Self { role, format }
    }

    pub const fn role(role: StyleRole) -> Self {
        Self {
            role,
            format: NumberFormat::General,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: CellStyle,
}

impl Cell {
    pub fn text(text: impl Into<String>, role: StyleRole) -> Self {
        Self {
            value: CellValue::Text(text.into()),
            style: CellStyle::role(role),
        }
    }

    pub fn number(value: f64, style: CellStyle) -> Self {
        Self {
            value: CellValue::Number(value),
            style,
        }
    }

    pub fn formula(expr: Expr, style: CellStyle) -> Self {
        Self {
            value: CellValue::Formula(expr),
            style,
        }
    }

    pub fn link(text: impl Into<String>, target: SheetKind) -> Self {
        Self {
            value: CellValue::Link {
                text: text.into(),
                target,
            },
            style: CellStyle::role(StyleRole::Link),
        }
    }

    pub fn is_formula(&self) -> bool {
        matches!(self.value, CellValue::Formula(_))
    }

    pub fn as_formula(&self) -> Option<&Expr> {
        match &self.value {
            CellValue::Formula(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self.value {
            CellValue::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            CellValue::Text(s) => Some(s),
            CellValue::Link { text, .. } => Some(text),
            _ => None,
        }
    }
}
