//! The three linked statements.
//!
//! All three layouts are finalized before any of the sheets is emitted: the
//! Balance Sheet reads the Cash Flow net-change row and the Cash Flow reads the
//! Balance Sheet, so neither can wait for the other to be built.

pub mod balance;
pub mod cash_flow;
pub mod income;

use finmodel_core::{Layout, Sheet};

pub use balance::BsLine;
pub use cash_flow::CfLine;
pub use income::IsLine;

use crate::context::BuildContext;

#[derive(Debug, Clone)]
pub struct StatementLayouts {
    pub income: Layout<IsLine>,
    pub balance: Layout<BsLine>,
    pub cash_flow: Layout<CfLine>,
}

impl StatementLayouts {
    pub fn new() -> Self {
        Self {
            income: income::layout(),
            balance: balance::layout(),
            cash_flow: cash_flow::layout(),
        }
    }

    /// Income Statement, Balance Sheet, Cash Flow, in workbook order.
    pub fn build(&self, ctx: &BuildContext) -> [Sheet; 3] {
        let is = income::build(ctx, &self.income);
        let bs = balance::build(ctx, &self.balance, self.income.rows(), self.cash_flow.rows());
        let cf = cash_flow::build(ctx, &self.cash_flow, self.income.rows(), self.balance.rows());
        [is, bs, cf]
    }
}

impl Default for StatementLayouts {
    fn default() -> Self {
        Self::new()
    }
}
