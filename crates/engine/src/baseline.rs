//! Base-year figures that anchor the first period of every statement.

use finmodel_config::Settings;
use serde::Serialize;

use crate::assumptions::{resolve_chain, SourceTier};
use crate::input::{normalize_amount, FinancialData};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaseFigure {
    pub value: f64,
    pub tier: SourceTier,
}

impl BaseFigure {
    fn from_chain(key: &str, candidates: &[(SourceTier, Option<f64>)], fallback: f64) -> Self {
        let (value, tier) = resolve_chain(key, candidates, fallback);
        Self { value, tier }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Baseline {
    pub revenue: BaseFigure,
    pub total_assets: BaseFigure,
    /// Reported figure, shown as a memo line only
    pub ebitda: BaseFigure,
    /// Reported figure, shown as a memo line only
    pub net_income: BaseFigure,
}

impl Baseline {
    pub fn resolve(data: &FinancialData, settings: &Settings) -> Self {
        use SourceTier::{Derived, Real};

        let units = &settings.units;
        let defaults = &settings.defaults;
        let normalize = |raw: Option<f64>| raw.map(|v| normalize_amount(v, units));
        let market_cap = normalize(data.company_info.market_cap).filter(|m| *m > 0.0);

        let revenue = BaseFigure::from_chain(
            "base_revenue",
            &[
                (Real, data.real_financials.revenue),
                (Real, normalize(data.income_statement.revenue)),
                (Derived, market_cap.map(|m| m / defaults.price_to_sales)),
            ],
            defaults.base_revenue,
        );

        let total_assets = BaseFigure::from_chain(
            "base_total_assets",
            &[
                (Real, normalize(data.balance_sheet.total_assets)),
                (Derived, market_cap.map(|m| m * defaults.assets_to_market_cap)),
            ],
            revenue.value * defaults.assets_to_revenue,
        );
        // Fallback is a ratio on revenue, not a fixed default
        let total_assets = match total_assets.tier {
            SourceTier::Default => BaseFigure {
                tier: Derived,
                ..total_assets
            },
            _ => total_assets,
        };

        let ebitda = BaseFigure::from_chain(
            "base_ebitda",
            &[
                (Real, data.real_financials.ebitda),
                (Real, normalize(data.income_statement.ebitda)),
            ],
            0.0,
        );
        let net_income = BaseFigure::from_chain(
            "base_net_income",
            &[
                (Real, data.real_financials.net_income),
                (Real, normalize(data.income_statement.net_income)),
            ],
            0.0,
        );

        Self {
            revenue,
            total_assets,
            ebitda,
            net_income,
        }
    }
}
