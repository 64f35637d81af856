// Formula evaluator - computes an Expr against a cell lookup.
//
// Follows spreadsheet semantics closely enough that a cached result matches
// what a recalculating viewer would show: empty cells read as 0, IF is lazy,
// IFERROR swallows any error in its first argument.

use thiserror::Error;

use crate::address::CellAddress;
use crate::formula::{Expr, Func, Op};

/// Spreadsheet error values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CellError {
    #[error("#DIV/0!")]
    DivZero,
    #[error("#NUM!")]
    Num,
    #[error("#VALUE!")]
    Value,
    #[error("#REF!")]
    Ref,
    #[error("#CIRC!")]
    Cycle,
}

pub type EvalResult = Result<f64, CellError>;

pub trait CellLookup {
    /// Numeric value of a cell. `Ok(None)` for empty or text cells.
    fn value(&mut self, addr: CellAddress) -> Result<Option<f64>, CellError>;
}

pub fn evaluate<L: CellLookup>(expr: &Expr, lookup: &mut L) -> EvalResult {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::CellRef { addr, .. } => Ok(lookup.value(*addr)?.unwrap_or(0.0)),
        // Ranges can't be evaluated directly, only within functions
        Expr::Range { .. } => Err(CellError::Value),
        Expr::Neg(inner) => Ok(-evaluate(inner, lookup)?),
        Expr::BinaryOp { op, left, right } => {
            let l = evaluate(left, lookup)?;
            let r = evaluate(right, lookup)?;
            binary(*op, l, r)
        }
        Expr::Function { func, args } => function(*func, args, lookup),
    }
}

fn binary(op: Op, l: f64, r: f64) -> EvalResult {
    let bool_num = |b: bool| if b { 1.0 } else { 0.0 };
    let result = match op {
        Op::Add => l + r,
        Op::Sub => l - r,
        Op::Mul => l * r,
        Op::Div => {
            if r == 0.0 {
                return Err(CellError::DivZero);
            }
            l / r
        }
        Op::Pow => {
            if l == 0.0 && r < 0.0 {
                return Err(CellError::DivZero);
            }
            l.powf(r)
        }
        Op::Gt => bool_num(l > r),
        Op::Lt => bool_num(l < r),
        Op::GtEq => bool_num(l >= r),
        Op::LtEq => bool_num(l <= r),
    };
    if result.is_finite() {
        Ok(result)
    } else {
        Err(CellError::Num)
    }
}

/// Numbers from the argument list; ranges skip empty and text cells.
fn collect_numbers<L: CellLookup>(args: &[Expr], lookup: &mut L) -> Result<Vec<f64>, CellError> {
    let mut values = Vec::new();
    for arg in args {
        match arg {
            Expr::Range { .. } => {
                for addr in arg.references() {
                    if let Some(v) = lookup.value(addr)? {
                        values.push(v);
                    }
                }
            }
            other => values.push(evaluate(other, lookup)?),
        }
    }
    Ok(values)
}

fn arg<L: CellLookup>(args: &[Expr], i: usize, lookup: &mut L) -> EvalResult {
    match args.get(i) {
        Some(expr) => evaluate(expr, lookup),
        None => Err(CellError::Value),
    }
}

fn function<L: CellLookup>(func: Func, args: &[Expr], lookup: &mut L) -> EvalResult {
    match func {
        Func::Sum => Ok(collect_numbers(args, lookup)?.iter().sum()),
        Func::Max => {
            let values = collect_numbers(args, lookup)?;
            Ok(values.into_iter().reduce(f64::max).unwrap_or(0.0))
        }
        Func::Min => {
            let values = collect_numbers(args, lookup)?;
            Ok(values.into_iter().reduce(f64::min).unwrap_or(0.0))
        }
        Func::Abs => Ok(arg(args, 0, lookup)?.abs()),
        Func::Round => {
            let value = arg(args, 0, lookup)?;
            let digits = arg(args, 1, lookup)?.trunc() as i32;
            let factor = 10f64.powi(digits);
            Ok((value * factor).round() / factor)
        }
        Func::If => {
            let cond = arg(args, 0, lookup)?;
            if cond != 0.0 {
                arg(args, 1, lookup)
            } else if args.len() > 2 {
                arg(args, 2, lookup)
            } else {
                Ok(0.0)
            }
        }
        Func::IfError => match arg(args, 0, lookup) {
            Ok(v) => Ok(v),
            Err(_) => arg(args, 1, lookup),
        },
        Func::Average => {
            let values = collect_numbers(args, lookup)?;
            if values.is_empty() {
                return Err(CellError::DivZero);
            }
            Ok(values.iter().sum::<f64>() / values.len() as f64)
        }
        Func::Median => {
            let mut values = collect_numbers(args, lookup)?;
            if values.is_empty() {
                return Err(CellError::Num);
            }
            values.sort_by(|a, b| a.total_cmp(b));
            let n = values.len();
            if n % 2 == 1 {
                Ok(values[n / 2])
            } else {
                Ok((values[n / 2 - 1] + values[n / 2]) / 2.0)
            }
        }
        Func::Percentile => {
            let (range, k) = match args {
                [range, k] => (range, evaluate(k, lookup)?),
                _ => return Err(CellError::Value),
            };
            if !(0.0..=1.0).contains(&k) {
                return Err(CellError::Num);
            }
            let mut values = collect_numbers(std::slice::from_ref(range), lookup)?;
            if values.is_empty() {
                return Err(CellError::Num);
            }
            values.sort_by(|a, b| a.total_cmp(b));
            // Inclusive interpolation between closest ranks
            let rank = k * (values.len() - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            Ok(values[lo] + (values[hi] - values[lo]) * (rank - lo as f64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::SheetKind;
    use rustc_hash::FxHashMap;

    struct MapLookup(FxHashMap<CellAddress, f64>);

    impl CellLookup for MapLookup {
        fn value(&mut self, addr: CellAddress) -> Result<Option<f64>, CellError> {
            Ok(self.0.get(&addr).copied())
        }
    }

    fn a(row: u32) -> CellAddress {
        CellAddress::new(SheetKind::Comparables, row, 1)
    }

    fn lookup(values: &[f64]) -> MapLookup {
        MapLookup(values.iter().enumerate().map(|(i, v)| (a(i as u32), *v)).collect())
    }

    #[test]
    fn arithmetic_and_empty_cells() {
        let mut l = lookup(&[10.0, 4.0]);
        let expr = Expr::cell(a(0)) * (Expr::num(1.0) + Expr::cell(a(9)));
        assert_eq!(evaluate(&expr, &mut l), Ok(10.0));
        let expr = Expr::cell(a(0)) - Expr::cell(a(1)).pow(Expr::num(2.0));
        assert_eq!(evaluate(&expr, &mut l), Ok(-6.0));
    }

    #[test]
    fn guarded_division_yields_zero() {
        let mut l = lookup(&[10.0]);
        let raw = Expr::cell(a(0)) / Expr::cell(a(5));
        assert_eq!(evaluate(&raw, &mut l), Err(CellError::DivZero));
        let safe = Expr::safe_div(Expr::cell(a(0)), Expr::cell(a(5)));
        assert_eq!(evaluate(&safe, &mut l), Ok(0.0));
    }

    #[test]
    fn if_only_evaluates_taken_branch() {
        let mut l = lookup(&[0.08, 0.10]);
        let w = || Expr::cell(a(0));
        let g = || Expr::cell(a(1));
        let tv = Expr::if_then(
            w().gt(g()),
            Expr::num(100.0) / (w() - g()),
            Expr::num(0.0),
        );
        assert_eq!(evaluate(&tv, &mut l), Ok(0.0));
    }

    #[test]
    fn statistics_over_ranges() {
        let mut l = lookup(&[8.0, 12.0, 10.0, 14.0]);
        let (s, e) = (a(0), a(3));
        assert_eq!(evaluate(&Expr::average(s, e), &mut l), Ok(11.0));
        assert_eq!(evaluate(&Expr::median(s, e), &mut l), Ok(11.0));
        assert_eq!(evaluate(&Expr::percentile(s, e, 0.25), &mut l), Ok(9.5));
        assert_eq!(evaluate(&Expr::percentile(s, e, 0.75), &mut l), Ok(12.5));
        assert_eq!(evaluate(&Expr::sum_range(s, e), &mut l), Ok(44.0));
        assert_eq!(evaluate(&Expr::median(a(10), a(12)), &mut l), Err(CellError::Num));
    }

    #[test]
    fn round_half_away_from_zero() {
        let mut l = lookup(&[]);
        assert_eq!(evaluate(&Expr::num(2.5).round(0), &mut l), Ok(3.0));
        assert_eq!(evaluate(&Expr::num(-2.5).round(0), &mut l), Ok(-3.0));
        assert_eq!(evaluate(&Expr::num(0.1175).round(2), &mut l), Ok(0.12));
    }
}
