//! Sheet identities and logical cell addresses.

use serde::{Deserialize, Serialize};

/// Every sheet the model can contain. Declaration order is workbook order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetKind {
    Summary,
    Assumptions,
    IncomeStatement,
    BalanceSheet,
    CashFlow,
    Valuation,
    Comparables,
    Sensitivity,
    Scenarios,
    Dashboard,
}

impl SheetKind {
    /// Fixed workbook order.
    pub const ORDER: [SheetKind; 10] = [
        SheetKind::Summary,
        SheetKind::Assumptions,
        SheetKind::IncomeStatement,
        SheetKind::BalanceSheet,
        SheetKind::CashFlow,
        SheetKind::Valuation,
        SheetKind::Comparables,
        SheetKind::Sensitivity,
        SheetKind::Scenarios,
        SheetKind::Dashboard,
    ];

    /// Worksheet tab name. Underscored so formula references never need quoting.
    pub fn name(&self) -> &'static str {
        match self {
            SheetKind::Summary => "Summary",
            SheetKind::Assumptions => "Assumptions",
            SheetKind::IncomeStatement => "Income_Statement",
            SheetKind::BalanceSheet => "Balance_Sheet",
            SheetKind::CashFlow => "Cash_Flow",
            SheetKind::Valuation => "Valuation",
            SheetKind::Comparables => "Comparables",
            SheetKind::Sensitivity => "Sensitivity",
            SheetKind::Scenarios => "Scenarios",
            SheetKind::Dashboard => "Dashboard",
        }
    }

    /// Human-readable name for navigation links.
    pub fn display_name(&self) -> &'static str {
        match self {
            SheetKind::IncomeStatement => "Income Statement",
            SheetKind::BalanceSheet => "Balance Sheet",
            SheetKind::CashFlow => "Cash Flow",
            other => other.name(),
        }
    }

    pub fn position(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for SheetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
pub fn col_to_letter(col: u16) -> String {
    let mut result = String::new();
    let mut n = col as usize;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// A `(sheet, row, column)` triple. Rows and columns are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddress {
    pub sheet: SheetKind,
    pub row: u32,
    pub col: u16,
}

impl CellAddress {
    pub fn new(sheet: SheetKind, row: u32, col: u16) -> Self {
        Self { sheet, row, col }
    }

    /// `B5`-style text without sheet prefix.
    pub fn a1(&self) -> String {
        format!("{}{}", col_to_letter(self.col), self.row + 1)
    }

    /// `$B$5`-style text without sheet prefix.
    pub fn a1_absolute(&self) -> String {
        format!("${}${}", col_to_letter(self.col), self.row + 1)
    }

    /// Same row, different column.
    pub fn with_col(&self, col: u16) -> Self {
        Self { col, ..*self }
    }
}

impl std::fmt::Display for CellAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}!{}", self.sheet.name(), self.a1())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(col_to_letter(0), "A");
        assert_eq!(col_to_letter(2), "C");
        assert_eq!(col_to_letter(25), "Z");
        assert_eq!(col_to_letter(26), "AA");
        assert_eq!(col_to_letter(701), "ZZ");
        assert_eq!(col_to_letter(702), "AAA");
    }

    #[test]
    fn address_text() {
        let addr = CellAddress::new(SheetKind::IncomeStatement, 5, 2);
        assert_eq!(addr.a1(), "C6");
        assert_eq!(addr.a1_absolute(), "$C$6");
        assert_eq!(addr.to_string(), "Income_Statement!C6");
    }

    #[test]
    fn order_matches_positions() {
        for (i, kind) in SheetKind::ORDER.iter().enumerate() {
            assert_eq!(kind.position(), i);
        }
    }
}
