// Property-based tests for the period axis and formula rendering.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use finmodel_core::*;
use proptest::prelude::*;

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn axis_is_contiguous(
        hist in 1usize..8,
        forecast in 1usize..=MAX_FORECAST_YEARS,
        base_year in 1990i32..2100,
        first_column in 0u16..6,
    ) {
        let axis = PeriodAxis::new(hist, forecast, base_year, first_column).unwrap();
        prop_assert_eq!(axis.len(), hist + forecast);
        prop_assert_eq!(axis.historical().len(), hist);
        prop_assert_eq!(axis.forecast().len(), forecast);

        for (i, period) in axis.iter().enumerate() {
            prop_assert_eq!(period.index, i);
            prop_assert_eq!(period.column, first_column + i as u16);
            prop_assert_eq!(period.is_forecast(), i >= hist);
            prop_assert_eq!(period.label.ends_with('E'), period.is_forecast());
        }
        for pair in axis.iter().collect::<Vec<_>>().windows(2) {
            prop_assert_eq!(pair[1].year, pair[0].year + 1);
            prop_assert_eq!(pair[1].column, pair[0].column + 1);
        }
        prop_assert_eq!(axis.forecast()[0].year, base_year);
    }

    #[test]
    fn axis_rejects_out_of_range_horizon(forecast in (MAX_FORECAST_YEARS + 1)..40usize) {
        prop_assert!(PeriodAxis::new(5, forecast, 2025, 2).is_err());
    }

    #[test]
    fn rendering_is_deterministic(row in 0u32..500, col in 0u16..30, k in -1e6f64..1e6) {
        let addr = CellAddress::new(SheetKind::BalanceSheet, row, col);
        let expr = Expr::safe_div(Expr::cell(addr) * Expr::num(k), Expr::abs_cell(addr.with_col(col + 1)));
        let a = expr.to_formula(SheetKind::CashFlow);
        let b = expr.clone().to_formula(SheetKind::CashFlow);
        prop_assert_eq!(&a, &b);
        prop_assert!(a.starts_with("=IFERROR(Balance_Sheet!"));
    }
}
