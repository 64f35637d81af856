//! Period axis: the ordered historical + forecast time dimension shared by every
//! statement sheet.
//!
//! Columns are assigned positionally (`first_column + index`), historical periods
//! first. The axis is immutable once built.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest forecast horizon the model supports.
pub const MAX_FORECAST_YEARS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AxisError {
    #[error("forecast_years must be in 1..={max}, got {got}")]
    ForecastYears { got: usize, max: usize },
    #[error("hist_years must be at least 1")]
    NoHistory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Historical,
    Forecast,
}

/// A single reporting period bound to a worksheet column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub index: usize,
    pub kind: PeriodKind,
    pub year: i32,
    pub label: String,
    /// Zero-based worksheet column
    pub column: u16,
}

impl Period {
    pub fn is_anchor(&self) -> bool {
        self.index == 0
    }

    pub fn is_forecast(&self) -> bool {
        self.kind == PeriodKind::Forecast
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodAxis {
    periods: Vec<Period>,
    hist_years: usize,
}

impl PeriodAxis {
    /// Build the axis.
    ///
    /// Historical years run `base_year - hist_years ..= base_year - 1` and are
    /// labeled `FY{year}`; forecast years run `base_year ..` and are labeled
    /// `FY{year}E`.
    pub fn new(
        hist_years: usize,
        forecast_years: usize,
        base_year: i32,
        first_column: u16,
    ) -> Result<Self, AxisError> {
        if hist_years == 0 {
            return Err(AxisError::NoHistory);
        }
        if forecast_years == 0 || forecast_years > MAX_FORECAST_YEARS {
            return Err(AxisError::ForecastYears {
                got: forecast_years,
                max: MAX_FORECAST_YEARS,
            });
        }

        let mut periods = Vec::with_capacity(hist_years + forecast_years);
        for i in 0..hist_years {
            let year = base_year - hist_years as i32 + i as i32;
            periods.push(Period {
                index: i,
                kind: PeriodKind::Historical,
                year,
                label: format!("FY{}", year),
                column: first_column + i as u16,
            });
        }
        for j in 0..forecast_years {
            let index = hist_years + j;
            let year = base_year + j as i32;
            periods.push(Period {
                index,
                kind: PeriodKind::Forecast,
                year,
                label: format!("FY{}E", year),
                column: first_column + index as u16,
            });
        }

        Ok(Self { periods, hist_years })
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn hist_years(&self) -> usize {
        self.hist_years
    }

    pub fn forecast_years(&self) -> usize {
        self.periods.len() - self.hist_years
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Period> {
        self.periods.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Period> {
        self.periods.get(index)
    }

    pub fn first(&self) -> &Period {
        &self.periods[0]
    }

    pub fn last(&self) -> &Period {
        &self.periods[self.periods.len() - 1]
    }

    /// The period immediately before `period`, or `None` for the anchor.
    pub fn previous(&self, period: &Period) -> Option<&Period> {
        period.index.checked_sub(1).and_then(|i| self.periods.get(i))
    }

    pub fn historical(&self) -> &[Period] {
        &self.periods[..self.hist_years]
    }

    pub fn forecast(&self) -> &[Period] {
        &self.periods[self.hist_years..]
    }

    /// The most recent actual year ("current" in summary metrics).
    pub fn last_historical(&self) -> &Period {
        &self.periods[self.hist_years - 1]
    }

    /// First and last column spanned by the axis.
    pub fn column_range(&self) -> (u16, u16) {
        (self.first().column, self.last().column)
    }
}

impl<'a> IntoIterator for &'a PeriodAxis {
    type Item = &'a Period;
    type IntoIter = std::slice::Iter<'a, Period>;

    fn into_iter(self) -> Self::IntoIter {
        self.periods.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_and_columns() {
        let axis = PeriodAxis::new(5, 3, 2025, 2).unwrap();
        let labels: Vec<_> = axis.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["FY2020", "FY2021", "FY2022", "FY2023", "FY2024", "FY2025E", "FY2026E", "FY2027E"]
        );
        assert_eq!(axis.first().column, 2);
        assert_eq!(axis.last().column, 9);
        assert_eq!(axis.last_historical().label, "FY2024");
        assert_eq!(axis.forecast().len(), 3);
        assert!(axis.forecast().iter().all(|p| p.is_forecast()));
    }

    #[test]
    fn previous_of_anchor_is_none() {
        let axis = PeriodAxis::new(2, 1, 2025, 2).unwrap();
        assert!(axis.previous(axis.first()).is_none());
        assert_eq!(axis.previous(axis.last()).unwrap().index, 1);
    }

    #[test]
    fn rejects_out_of_range_horizon() {
        assert_eq!(
            PeriodAxis::new(5, 0, 2025, 2),
            Err(AxisError::ForecastYears { got: 0, max: 10 })
        );
        assert!(PeriodAxis::new(5, 11, 2025, 2).is_err());
        assert_eq!(PeriodAxis::new(0, 5, 2025, 2), Err(AxisError::NoHistory));
    }
}
