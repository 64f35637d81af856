// Sensitivity, comparables and scenario blocks, checked by evaluating the
// emitted formulas against hand-computed values.

use chrono::NaiveDate;
use finmodel_config::Settings;
use finmodel_core::{CellAddress, SheetKind};
use finmodel_engine::comps::CompLine;
use finmodel_engine::scenarios::ScenLine;
use finmodel_engine::statements::IsLine;
use finmodel_engine::valuation::ValLine;
use finmodel_engine::{build_model, AssumptionKey, FinancialModel, ModelEvaluator, ModelRequest};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
}

fn build_with(json: &str, settings: &Settings) -> FinancialModel {
    let request = ModelRequest::from_json(json).unwrap();
    build_model(&request, settings, date()).unwrap()
}

fn value(eval: &mut ModelEvaluator, addr: CellAddress) -> f64 {
    eval.number(addr)
        .unwrap_or_else(|e| panic!("{} evaluated to {}", addr, e))
}

fn assert_close(actual: f64, expected: f64, what: &str) {
    let tolerance = 1e-9 * expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() < tolerance,
        "{}: expected {}, got {}",
        what,
        expected,
        actual
    );
}

#[test]
fn terminal_value_grid_is_zero_where_wacc_does_not_exceed_growth() {
    let mut settings = Settings::default();
    settings.sensitivity.wacc_axis = vec![0.03, 0.05, 0.08];
    settings.sensitivity.terminal_growth_axis = vec![0.03, 0.04, 0.05];
    let model = build_with("{}", &settings);
    let mut eval = ModelEvaluator::new(&model);
    let grid = model.sensitivity.valuation_grid;
    let cash_flow = settings.sensitivity.base_cash_flow;

    for (i, wacc) in settings.sensitivity.wacc_axis.iter().enumerate() {
        for (j, growth) in settings.sensitivity.terminal_growth_axis.iter().enumerate() {
            let addr = CellAddress::new(
                SheetKind::Sensitivity,
                grid.first_row + i as u32,
                grid.first_col() + j as u16,
            );
            let expected = if wacc > growth {
                cash_flow * (1.0 + growth) / (wacc - growth)
            } else {
                0.0
            };
            assert_close(value(&mut eval, addr), expected, &format!("wacc {} growth {}", wacc, growth));
        }
    }

    // 0.05 against 0.04
    let (row, col) = grid.center();
    let center = CellAddress::new(SheetKind::Sensitivity, row, col);
    assert_close(value(&mut eval, center), 104_000.0, "center");
}

#[test]
fn default_grid_centers_match_the_proxy_formulas() {
    let settings = Settings::default();
    let model = build_with("{}", &settings);
    let mut eval = ModelEvaluator::new(&model);
    let s = &settings.sensitivity;

    let (row, col) = model.sensitivity.valuation_grid.center();
    let center = CellAddress::new(SheetKind::Sensitivity, row, col);
    // WACC 11% against terminal growth 3.5%
    assert_close(value(&mut eval, center), 1000.0 * 1.035 / 0.075, "terminal value center");

    let (row, col) = model.sensitivity.operating_grid.center();
    let center = CellAddress::new(SheetKind::Sensitivity, row, col);
    let expected = s.base_revenue * 1.12f64.powf(s.horizon_years) * 0.25 * s.exit_multiple;
    assert_close(value(&mut eval, center), expected, "enterprise value center");
}

const PEERS: &str = r#"{"financial_data": {"peers": [
    {"name": "A", "ev_ebitda": 8, "ev_revenue": 1},
    {"name": "B", "ev_ebitda": 10, "ev_revenue": 2},
    {"name": "C", "ev_ebitda": 12, "ev_revenue": 3},
    {"name": "D", "ev_ebitda": 14, "ev_revenue": 4},
    {"name": "E", "revenue": 500}
]}}"#;

#[test]
fn peer_statistics_skip_blank_multiples() {
    let model = build_with(PEERS, &Settings::default());
    let mut eval = ModelEvaluator::new(&model);
    let comps = &model.rows.comparables;
    // EV/EBITDA and EV/Revenue sit six and seven columns right of the labels
    let ev_ebitda = 1 + 6;
    let ev_revenue = 1 + 7;

    assert_close(value(&mut eval, comps.addr(CompLine::Mean, ev_ebitda)), 11.0, "mean");
    assert_close(value(&mut eval, comps.addr(CompLine::Median, ev_ebitda)), 11.0, "median");
    assert_close(value(&mut eval, comps.addr(CompLine::P25, ev_ebitda)), 9.5, "p25");
    assert_close(value(&mut eval, comps.addr(CompLine::P75, ev_ebitda)), 12.5, "p75");
    assert_close(value(&mut eval, comps.addr(CompLine::P25, ev_revenue)), 1.75, "p25 revenue");
}

#[test]
fn implied_range_applies_peer_multiples_to_the_target() {
    let model = build_with(PEERS, &Settings::default());
    let mut eval = ModelEvaluator::new(&model);
    let comps = &model.rows.comparables;
    let cur = model.axis.last_historical().column;
    let ebitda = value(&mut eval, model.rows.income.addr(IsLine::Ebitda, cur));
    let revenue = value(&mut eval, model.rows.income.addr(IsLine::Revenue, cur));
    let net_debt = value(&mut eval, model.rows.valuation.addr(ValLine::NetDebt, 2));
    let shares = model.assumptions.value(AssumptionKey::SharesOutstanding);

    // Low, mid and high bands in the first three value columns
    for (col, multiple, revenue_multiple) in [(2u16, 9.5, 1.75), (3, 11.0, 2.5), (4, 12.5, 3.25)] {
        let ev = value(&mut eval, comps.addr(CompLine::EvFromEbitda, col));
        assert_close(ev, multiple * ebitda, "ev from ebitda");
        let ev_sales = value(&mut eval, comps.addr(CompLine::EvFromRevenue, col));
        assert_close(ev_sales, revenue_multiple * revenue, "ev from revenue");
        let price = value(&mut eval, comps.addr(CompLine::ImpliedPrice, col));
        assert_close(price, (ev - net_debt) / shares, "implied price");
    }
}

#[test]
fn scenario_cross_check_uses_every_driver() {
    let settings = Settings::default();
    let model = build_with("{}", &settings);
    let mut eval = ModelEvaluator::new(&model);
    let scen = &model.rows.scenarios;

    for col in 2..=4u16 {
        let mut at = |key: ScenLine| value(&mut eval, scen.addr(key, col));
        let growth = at(ScenLine::RevenueGrowth);
        let exit_revenue = at(ScenLine::ExitRevenue);
        let ebitda = at(ScenLine::ExitEbitda);
        let expected_fcf = ebitda * (1.0 - at(ScenLine::TaxRate))
            - exit_revenue * at(ScenLine::CapexPct)
            - exit_revenue * growth / (1.0 + growth) * at(ScenLine::WorkingCapitalDays)
                / settings.model.days_in_year;
        let fcf = at(ScenLine::ExitFcf);
        assert_close(fcf, expected_fcf, "exit free cash flow");

        let (wacc, terminal) = (at(ScenLine::Wacc), at(ScenLine::TerminalGrowth));
        let expected_ev = if wacc > terminal {
            (fcf * (1.0 + terminal) / (wacc - terminal)).max(0.0)
        } else {
            0.0
        };
        assert_close(at(ScenLine::PerpetuityEv), expected_ev, "perpetuity value");

        let de = at(ScenLine::DebtToEquity);
        let ev = at(ScenLine::EnterpriseValue);
        assert_close(at(ScenLine::DebtCapacity), ev * de / (1.0 + de), "debt capacity");
    }
}

#[test]
fn scenario_tax_rate_moves_the_cross_check() {
    let low = build_with("{}", &Settings::default());
    let mut settings = Settings::default();
    settings.scenarios.tax_rate.bear = 0.45;
    let high = build_with("{}", &settings);

    let addr = low.rows.scenarios.addr(ScenLine::ExitFcf, 2);
    let before = ModelEvaluator::new(&low).number(addr).unwrap();
    let after = ModelEvaluator::new(&high).number(addr).unwrap();
    assert!(after < before, "{} !< {}", after, before);
}
