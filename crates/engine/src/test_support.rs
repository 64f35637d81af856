//! Shared fixtures for builder unit tests.

use finmodel_config::Settings;
use finmodel_core::PeriodAxis;

use crate::assumptions::AssumptionRegistry;
use crate::baseline::Baseline;
use crate::context::BuildContext;
use crate::input::ModelRequest;

/// Five historical and five forecast years (FY2020..FY2029E) in columns C..L.
pub struct Fixture {
    pub settings: Settings,
    pub request: ModelRequest,
    pub axis: PeriodAxis,
    pub assumptions: AssumptionRegistry,
    pub baseline: Baseline,
}

impl Fixture {
    pub fn new(json: &str) -> Self {
        Self::with_settings(json, Settings::default())
    }

    pub fn with_settings(json: &str, settings: Settings) -> Self {
        let request = ModelRequest::from_json(json).expect("fixture request");
        let axis = PeriodAxis::new(5, 5, 2025, settings.model.first_column).expect("fixture axis");
        let baseline = Baseline::resolve(&request.financial_data, &settings);
        let assumptions = AssumptionRegistry::resolve(&request, &baseline, &settings);
        Self {
            settings,
            request,
            axis,
            assumptions,
            baseline,
        }
    }

    pub fn context(&self) -> BuildContext<'_> {
        BuildContext {
            settings: &self.settings,
            request: &self.request,
            axis: &self.axis,
            assumptions: &self.assumptions,
            baseline: &self.baseline,
        }
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new("{}")
    }
}
