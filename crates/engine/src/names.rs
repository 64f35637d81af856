//! Workbook-level defined names (`Revenue_Growth` -> `Assumptions!$C$8`).

use finmodel_core::CellAddress;
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::error::EngineError;

/// Longest name a workbook accepts.
const MAX_NAME_LEN: usize = 255;

/// A name bound to a single absolute cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefinedName {
    pub name: String,
    pub target: CellAddress,
}

impl DefinedName {
    /// Validates `name` before binding it.
    pub fn new(name: impl Into<String>, target: CellAddress) -> Result<Self, EngineError> {
        let name = name.into();
        validate_name(&name).map_err(|reason| EngineError::DefinedName {
            name: name.clone(),
            reason,
        })?;
        Ok(Self { name, target })
    }

    /// `Assumptions!$C$8`
    pub fn reference(&self) -> String {
        format!("{}!{}", self.target.sheet.name(), self.target.a1_absolute())
    }
}

/// Build the full set, rejecting invalid or case-insensitively duplicated names.
pub fn define_all(
    entries: impl IntoIterator<Item = (String, CellAddress)>,
) -> Result<Vec<DefinedName>, EngineError> {
    let mut seen = FxHashSet::default();
    let mut names = Vec::new();
    for (name, target) in entries {
        let defined = DefinedName::new(name, target)?;
        if !seen.insert(defined.name.to_uppercase()) {
            return Err(EngineError::DefinedName {
                name: defined.name,
                reason: "defined more than once".into(),
            });
        }
        names.push(defined);
    }
    Ok(names)
}

/// Rules:
/// - Starts with a letter or underscore
/// - Letters, digits, underscores and interior dots only
/// - Not a cell reference (A1, BC23) or R1C1 token
/// - Not a boolean or a function the model emits
pub fn validate_name(name: &str) -> Result<(), String> {
    let Some(first) = name.chars().next() else {
        return Err("name cannot be empty".into());
    };
    if name.len() > MAX_NAME_LEN {
        return Err(format!("name is longer than {} characters", MAX_NAME_LEN));
    }
    if !first.is_alphabetic() && first != '_' {
        return Err("name must start with a letter or underscore".into());
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        return Err("name can only contain letters, numbers, underscores, and dots".into());
    }
    if name.ends_with('.') || name.contains("..") {
        return Err("dots must separate non-empty parts".into());
    }

    let upper = name.to_uppercase();
    if looks_like_cell_ref(&upper) || looks_like_r1c1(&upper) {
        return Err(format!("'{}' looks like a cell reference", name));
    }
    if upper == "TRUE" || upper == "FALSE" {
        return Err(format!("'{}' is a reserved boolean value", name));
    }
    if RESERVED_FUNCTIONS.contains(&upper.as_str()) {
        return Err(format!("'{}' is a function name", name));
    }
    Ok(())
}

const RESERVED_FUNCTIONS: &[&str] = &[
    "SUM", "AVERAGE", "MEDIAN", "PERCENTILE", "MIN", "MAX", "ABS", "ROUND", "IF", "IFERROR",
    "COUNT", "NPV", "IRR", "PV", "FV", "PMT", "RATE", "INDEX", "MATCH", "VLOOKUP",
];

/// `A1` .. `XFD1048576`
fn looks_like_cell_ref(upper: &str) -> bool {
    let letters = upper.chars().take_while(|c| c.is_ascii_uppercase()).count();
    if letters == 0 || letters > 3 {
        return false;
    }
    let (col, row) = upper.split_at(letters);
    if row.is_empty() || !row.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let col_num = col.bytes().fold(0u32, |acc, b| acc * 26 + (b - b'A' + 1) as u32);
    let row_num = row.parse::<u32>().unwrap_or(0);
    col_num <= 16_384 && (1..=1_048_576).contains(&row_num)
}

/// `R`, `C`, `R1C1`, `R5`, `C12`
fn looks_like_r1c1(upper: &str) -> bool {
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if upper == "R" || upper == "C" {
        return true;
    }
    if let Some(rest) = upper.strip_prefix('R') {
        return match rest.split_once('C') {
            Some((r, c)) => digits(r) && digits(c),
            None => digits(rest),
        };
    }
    upper.strip_prefix('C').is_some_and(digits)
}
