//! Whole-model evaluation.
//!
//! Every formula cell is computed on demand against the assembled sheets and
//! memoized, so evaluating the full model visits each cell once. A cell that is
//! reached again while it is still being computed evaluates to `#CIRC!`.

use finmodel_core::{evaluate, CellAddress, CellError, CellLookup, CellValue, EvalResult};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::model::FinancialModel;

type Cached = Result<Option<f64>, CellError>;

pub struct ModelEvaluator<'a> {
    model: &'a FinancialModel,
    cache: FxHashMap<CellAddress, Cached>,
    visiting: FxHashSet<CellAddress>,
}

impl<'a> ModelEvaluator<'a> {
    pub fn new(model: &'a FinancialModel) -> Self {
        Self {
            model,
            cache: FxHashMap::default(),
            visiting: FxHashSet::default(),
        }
    }

    /// Numeric value of a cell; empty and text cells read as 0.
    pub fn number(&mut self, addr: CellAddress) -> EvalResult {
        Ok(self.value(addr)?.unwrap_or(0.0))
    }

    fn compute(&mut self, addr: CellAddress) -> Cached {
        let model = self.model;
        let Some(cell) = model.sheet(addr.sheet).at(addr) else {
            return Ok(None);
        };
        match &cell.value {
            CellValue::Number(n) => Ok(Some(*n)),
            CellValue::Text(_) | CellValue::Link { .. } => Ok(None),
            CellValue::Formula(expr) => {
                if !self.visiting.insert(addr) {
                    return Err(CellError::Cycle);
                }
                let result = evaluate(expr, self).map(Some);
                self.visiting.remove(&addr);
                result
            }
        }
    }
}

impl CellLookup for ModelEvaluator<'_> {
    fn value(&mut self, addr: CellAddress) -> Result<Option<f64>, CellError> {
        if let Some(hit) = self.cache.get(&addr) {
            return *hit;
        }
        let result = self.compute(addr);
        self.cache.insert(addr, result);
        result
    }
}

/// Result of every formula cell in the model, keyed by address.
pub fn evaluate_all(model: &FinancialModel) -> FxHashMap<CellAddress, EvalResult> {
    let mut evaluator = ModelEvaluator::new(model);
    let mut results = FxHashMap::default();
    for sheet in model.sheets() {
        for ((row, col), cell) in sheet.cells() {
            if cell.is_formula() {
                let addr = CellAddress::new(sheet.kind(), row, col);
                results.insert(addr, evaluator.number(addr));
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use finmodel_config::Settings;
    use finmodel_core::SheetKind;

    use crate::assumptions::AssumptionKey;
    use crate::input::ModelRequest;
    use crate::model::build_model;
    use crate::statements::IsLine;
    use crate::valuation::ValLine;

    fn model(json: &str) -> FinancialModel {
        let request = ModelRequest::from_json(json).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        build_model(&request, &Settings::default(), date).unwrap()
    }

    #[test]
    fn literals_and_references_resolve() {
        let model = model("{}");
        let mut eval = ModelEvaluator::new(&model);
        let growth = model.assumptions.addr(AssumptionKey::RevenueGrowth);
        assert_eq!(eval.number(growth), Ok(0.10));

        let row = model.rows.income.row(IsLine::Revenue);
        let first = model.axis.first().column;
        let anchor = eval.number(CellAddress::new(SheetKind::IncomeStatement, row, first)).unwrap();
        let next = eval.number(CellAddress::new(SheetKind::IncomeStatement, row, first + 1)).unwrap();
        assert!((anchor - 10_000.0).abs() < 1e-9);
        assert!((next - 11_000.0).abs() < 1e-9);
    }

    #[test]
    fn every_formula_evaluates_without_error() {
        let model = model(r#"{"company_name": "Acme", "model_structure": {"forecast_years": 7}}"#);
        let results = evaluate_all(&model);
        assert!(!results.is_empty());
        let failed: Vec<_> = results
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(addr, r)| format!("{} -> {:?}", addr, r))
            .collect();
        assert!(failed.is_empty(), "{failed:#?}");
    }

    #[test]
    fn empty_cells_read_as_zero() {
        let model = model("{}");
        let mut eval = ModelEvaluator::new(&model);
        let blank = CellAddress::new(SheetKind::Valuation, 500, 40);
        assert_eq!(eval.value(blank), Ok(None));
        assert_eq!(eval.number(blank), Ok(0.0));
    }

    #[test]
    fn share_price_is_finite() {
        let model = model("{}");
        let mut eval = ModelEvaluator::new(&model);
        let price = model.rows.valuation.addr(ValLine::SharePrice, 2);
        assert!(eval.number(price).unwrap().is_finite());
    }
}
