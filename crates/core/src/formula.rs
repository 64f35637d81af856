//! Formula AST and its spreadsheet-text renderer.
//!
//! Builders never write formula text by hand: they compose `Expr` values from
//! resolved addresses, and the renderer produces the text. Rendering is a pure
//! function of the tree, so two runs over identical inputs emit identical text.

use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::address::{col_to_letter, CellAddress, SheetKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    // Comparison
    Gt,
    Lt,
    GtEq,
    LtEq,
}

impl Op {
    fn symbol(&self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Pow => "^",
            Op::Gt => ">",
            Op::Lt => "<",
            Op::GtEq => ">=",
            Op::LtEq => "<=",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Op::Gt | Op::Lt | Op::GtEq | Op::LtEq => 1,
            Op::Add | Op::Sub => 2,
            Op::Mul | Op::Div => 3,
            Op::Pow => 4,
        }
    }

    /// `a op (b op c)` differs from `(a op b) op c`
    fn right_needs_grouping(&self) -> bool {
        !matches!(self, Op::Add | Op::Mul)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Func {
    Sum,
    Max,
    Min,
    Abs,
    Round,
    If,
    IfError,
    Average,
    Median,
    Percentile,
}

impl Func {
    pub fn name(&self) -> &'static str {
        match self {
            Func::Sum => "SUM",
            Func::Max => "MAX",
            Func::Min => "MIN",
            Func::Abs => "ABS",
            Func::Round => "ROUND",
            Func::If => "IF",
            Func::IfError => "IFERROR",
            Func::Average => "AVERAGE",
            Func::Median => "MEDIAN",
            Func::Percentile => "PERCENTILE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Cell reference; `col_abs`/`row_abs` render as `$C` / `$6`
    CellRef {
        addr: CellAddress,
        col_abs: bool,
        row_abs: bool,
    },
    /// Rectangular range on a single sheet
    Range { start: CellAddress, end: CellAddress },
    Neg(Box<Expr>),
    BinaryOp {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Function { func: Func, args: Vec<Expr> },
}

const ATOM: u8 = 6;
const UNARY: u8 = 5;

impl Expr {
    pub fn num(n: f64) -> Self {
        Expr::Number(n)
    }

    /// Relative reference (period-to-period formulas).
    pub fn cell(addr: CellAddress) -> Self {
        Expr::CellRef {
            addr,
            col_abs: false,
            row_abs: false,
        }
    }

    /// Fully absolute reference (assumption cells).
    pub fn abs_cell(addr: CellAddress) -> Self {
        Expr::CellRef {
            addr,
            col_abs: true,
            row_abs: true,
        }
    }

    /// Mixed reference, used by grid cells pinned to an axis row or column.
    pub fn mixed(addr: CellAddress, col_abs: bool, row_abs: bool) -> Self {
        Expr::CellRef {
            addr,
            col_abs,
            row_abs,
        }
    }

    pub fn range(start: CellAddress, end: CellAddress) -> Self {
        debug_assert_eq!(start.sheet, end.sheet);
        Expr::Range { start, end }
    }

    fn binary(op: Op, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn call(func: Func, args: Vec<Expr>) -> Self {
        Expr::Function { func, args }
    }

    pub fn pow(self, exponent: Expr) -> Self {
        Self::binary(Op::Pow, self, exponent)
    }

    pub fn gt(self, rhs: Expr) -> Self {
        Self::binary(Op::Gt, self, rhs)
    }

    pub fn lt(self, rhs: Expr) -> Self {
        Self::binary(Op::Lt, self, rhs)
    }

    pub fn ge(self, rhs: Expr) -> Self {
        Self::binary(Op::GtEq, self, rhs)
    }

    pub fn le(self, rhs: Expr) -> Self {
        Self::binary(Op::LtEq, self, rhs)
    }

    pub fn sum(args: Vec<Expr>) -> Self {
        Self::call(Func::Sum, args)
    }

    pub fn sum_range(start: CellAddress, end: CellAddress) -> Self {
        Self::call(Func::Sum, vec![Expr::range(start, end)])
    }

    pub fn max(a: Expr, b: Expr) -> Self {
        Self::call(Func::Max, vec![a, b])
    }

    pub fn min(a: Expr, b: Expr) -> Self {
        Self::call(Func::Min, vec![a, b])
    }

    pub fn abs(self) -> Self {
        Self::call(Func::Abs, vec![self])
    }

    pub fn round(self, digits: i32) -> Self {
        Self::call(Func::Round, vec![self, Expr::num(digits as f64)])
    }

    pub fn if_then(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Self::call(Func::If, vec![cond, then, otherwise])
    }

    pub fn iferror(self, fallback: Expr) -> Self {
        Self::call(Func::IfError, vec![self, fallback])
    }

    /// `IFERROR(expr, 0)`: an undefined intermediate yields 0 instead of an error.
    pub fn or_zero(self) -> Self {
        self.iferror(Expr::num(0.0))
    }

    /// Guarded division: `IFERROR(num/den, 0)`.
    pub fn safe_div(num: Expr, den: Expr) -> Self {
        (num / den).or_zero()
    }

    pub fn average(start: CellAddress, end: CellAddress) -> Self {
        Self::call(Func::Average, vec![Expr::range(start, end)])
    }

    pub fn median(start: CellAddress, end: CellAddress) -> Self {
        Self::call(Func::Median, vec![Expr::range(start, end)])
    }

    pub fn percentile(start: CellAddress, end: CellAddress, k: f64) -> Self {
        Self::call(Func::Percentile, vec![Expr::range(start, end), Expr::num(k)])
    }

    /// Every cell address the expression reads, ranges expanded, in order of
    /// appearance.
    pub fn references(&self) -> Vec<CellAddress> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs(&self, out: &mut Vec<CellAddress>) {
        match self {
            Expr::Number(_) => {}
            Expr::CellRef { addr, .. } => out.push(*addr),
            Expr::Range { start, end } => {
                for row in start.row..=end.row {
                    for col in start.col..=end.col {
                        out.push(CellAddress::new(start.sheet, row, col));
                    }
                }
            }
            Expr::Neg(inner) => inner.collect_refs(out),
            Expr::BinaryOp { left, right, .. } => {
                left.collect_refs(out);
                right.collect_refs(out);
            }
            Expr::Function { args, .. } => {
                for arg in args {
                    arg.collect_refs(out);
                }
            }
        }
    }

    /// Formula text with leading `=`, as written into a cell on `context`.
    pub fn to_formula(&self, context: SheetKind) -> String {
        format!("={}", self.render(context))
    }

    /// Formula text without the leading `=`.
    pub fn render(&self, context: SheetKind) -> String {
        let mut out = String::new();
        self.write(context, &mut out);
        out
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Number(n) if *n < 0.0 => UNARY,
            Expr::Neg(_) => UNARY,
            Expr::BinaryOp { op, .. } => op.precedence(),
            _ => ATOM,
        }
    }

    fn write(&self, context: SheetKind, out: &mut String) {
        match self {
            Expr::Number(n) => out.push_str(&format_number(*n)),
            Expr::CellRef {
                addr,
                col_abs,
                row_abs,
            } => {
                write_sheet_prefix(addr.sheet, context, out);
                write_cell(addr, *col_abs, *row_abs, out);
            }
            Expr::Range { start, end } => {
                write_sheet_prefix(start.sheet, context, out);
                write_cell(start, false, false, out);
                out.push(':');
                write_cell(end, false, false, out);
            }
            Expr::Neg(inner) => {
                out.push('-');
                if inner.precedence() == ATOM {
                    inner.write(context, out);
                } else {
                    out.push('(');
                    inner.write(context, out);
                    out.push(')');
                }
            }
            Expr::BinaryOp { op, left, right } => {
                let prec = op.precedence();
                let left_group = left.precedence() < prec;
                write_grouped(left, left_group, context, out);
                out.push_str(op.symbol());
                let right_prec = right.precedence();
                let right_group = right_prec < prec
                    || (right_prec == prec && op.right_needs_grouping())
                    || right_prec == UNARY;
                write_grouped(right, right_group, context, out);
            }
            Expr::Function { func, args } => {
                out.push_str(func.name());
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    arg.write(context, out);
                }
                out.push(')');
            }
        }
    }
}

fn write_grouped(expr: &Expr, group: bool, context: SheetKind, out: &mut String) {
    if group {
        out.push('(');
        expr.write(context, out);
        out.push(')');
    } else {
        expr.write(context, out);
    }
}

fn write_sheet_prefix(sheet: SheetKind, context: SheetKind, out: &mut String) {
    if sheet != context {
        out.push_str(sheet.name());
        out.push('!');
    }
}

fn write_cell(addr: &CellAddress, col_abs: bool, row_abs: bool, out: &mut String) {
    if col_abs {
        out.push('$');
    }
    out.push_str(&col_to_letter(addr.col));
    if row_abs {
        out.push('$');
    }
    out.push_str(&(addr.row + 1).to_string());
}

/// Shortest round-tripping decimal; never scientific notation.
fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return "0".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    format!("{}", n)
}

impl Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::binary(Op::Add, self, rhs)
    }
}

impl Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::binary(Op::Sub, self, rhs)
    }
}

impl Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::binary(Op::Mul, self, rhs)
    }
}

impl Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::binary(Op::Div, self, rhs)
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is(row: u32, col: u16) -> CellAddress {
        CellAddress::new(SheetKind::IncomeStatement, row, col)
    }

    fn assumption(row: u32) -> CellAddress {
        CellAddress::new(SheetKind::Assumptions, row, 2)
    }

    #[test]
    fn renders_growth_recurrence() {
        let expr = Expr::cell(is(5, 2)) * (Expr::num(1.0) + Expr::abs_cell(assumption(7)));
        assert_eq!(
            expr.to_formula(SheetKind::IncomeStatement),
            "=C6*(1+Assumptions!$C$8)"
        );
    }

    #[test]
    fn renders_cross_sheet_prefix_only_when_needed() {
        let expr = Expr::cell(is(5, 3));
        assert_eq!(expr.render(SheetKind::IncomeStatement), "D6");
        assert_eq!(expr.render(SheetKind::BalanceSheet), "Income_Statement!D6");
    }

    #[test]
    fn renders_guarded_negation() {
        let revenue = Expr::cell(is(5, 2));
        let margin = Expr::abs_cell(assumption(13));
        let cogs = (-(revenue * (Expr::num(1.0) - margin))).or_zero();
        assert_eq!(
            cogs.render(SheetKind::IncomeStatement),
            "IFERROR(-(C6*(1-Assumptions!$C$14)),0)"
        );
    }

    #[test]
    fn groups_right_operand_of_subtraction() {
        let a = Expr::cell(is(0, 2));
        let b = Expr::cell(is(1, 2));
        let c = Expr::cell(is(2, 2));
        assert_eq!((a.clone() - (b.clone() + c.clone())).render(SheetKind::IncomeStatement), "C1-(C2+C3)");
        assert_eq!(((a.clone() - b.clone()) + c.clone()).render(SheetKind::IncomeStatement), "C1-C2+C3");
        assert_eq!((a.clone() * (b.clone() + c)).render(SheetKind::IncomeStatement), "C1*(C2+C3)");
        assert_eq!((a / b * Expr::num(2.0)).render(SheetKind::IncomeStatement), "C1/C2*2");
    }

    #[test]
    fn renders_negative_literal_in_parens_on_right() {
        let expr = Expr::cell(is(0, 2)) * Expr::num(-0.2);
        assert_eq!(expr.render(SheetKind::IncomeStatement), "C1*(-0.2)");
    }

    #[test]
    fn renders_functions_and_ranges() {
        let expr = Expr::sum_range(is(3, 2), is(7, 2));
        assert_eq!(expr.render(SheetKind::IncomeStatement), "SUM(C4:C8)");
        assert_eq!(expr.render(SheetKind::Dashboard), "SUM(Income_Statement!C4:C8)");
        let rounded = (Expr::cell(is(0, 2)) - Expr::cell(is(1, 2))).round(0);
        assert_eq!(rounded.render(SheetKind::IncomeStatement), "ROUND(C1-C2,0)");
    }

    #[test]
    fn renders_discount_factor() {
        let wacc = Expr::abs_cell(CellAddress::new(SheetKind::Valuation, 17, 2));
        let df = Expr::num(1.0) / (Expr::num(1.0) + wacc).pow(Expr::num(3.0));
        assert_eq!(df.render(SheetKind::Valuation), "1/(1+$C$18)^3");
    }

    #[test]
    fn collects_references_with_ranges_expanded() {
        let expr = Expr::sum_range(is(0, 2), is(2, 2)) + Expr::cell(is(9, 3));
        let refs = expr.references();
        assert_eq!(refs.len(), 4);
        assert_eq!(refs[3], is(9, 3));
    }
}
