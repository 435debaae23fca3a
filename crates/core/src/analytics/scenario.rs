use crate::domain::portfolio::PortfolioSnapshot;
use crate::error::AnalyticsError;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

pub const RENT_CHANGE_RANGE: RangeInclusive<f64> = -20.0..=20.0;
pub const OCCUPANCY_CHANGE_RANGE: RangeInclusive<f64> = -10.0..=10.0;

/// Uniform percentage shocks. Construct through [`ScenarioInput::new`] so the bounds hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioInput {
    rent_change_pct: f64,
    occupancy_change_pct: f64,
}

impl ScenarioInput {
    /// Rejects (never clamps) values outside their ranges so callers can show the limits.
    pub fn new(rent_change_pct: f64, occupancy_change_pct: f64) -> Result<Self, AnalyticsError> {
        check_range("rent_change_pct", rent_change_pct, &RENT_CHANGE_RANGE)?;
        check_range(
            "occupancy_change_pct",
            occupancy_change_pct,
            &OCCUPANCY_CHANGE_RANGE,
        )?;
        Ok(Self {
            rent_change_pct,
            occupancy_change_pct,
        })
    }

    pub fn rent_change_pct(&self) -> f64 {
        self.rent_change_pct
    }

    pub fn occupancy_change_pct(&self) -> f64 {
        self.occupancy_change_pct
    }
}

/// Wire form of a scenario request; validated with `TryFrom`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScenarioRequest {
    pub rent_change_pct: f64,
    pub occupancy_change_pct: f64,
}

impl TryFrom<ScenarioRequest> for ScenarioInput {
    type Error = AnalyticsError;

    fn try_from(req: ScenarioRequest) -> Result<Self, Self::Error> {
        Self::new(req.rent_change_pct, req.occupancy_change_pct)
    }
}

fn check_range(
    field: &str,
    value: f64,
    range: &RangeInclusive<f64>,
) -> Result<(), AnalyticsError> {
    if value.is_finite() && range.contains(&value) {
        return Ok(());
    }
    Err(AnalyticsError::invalid_input(format!(
        "{field} must be between {} and {} (got {value})",
        range.start(),
        range.end()
    )))
}

/// Annualized revenue delta.
///
/// Both shocks act linearly on the same baseline NOI and are summed; there is no
/// rent × occupancy cross term.
pub fn simulate(baseline: &PortfolioSnapshot, input: &ScenarioInput) -> f64 {
    let noi = baseline.annual_noi;
    noi * (input.rent_change_pct / 100.0) + noi * (input.occupancy_change_pct / 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioResult {
    pub rent_change_pct: f64,
    pub occupancy_change_pct: f64,
    pub baseline_noi: f64,
    pub projected_noi: f64,
    pub revenue_delta: f64,
    /// Produced by the narrative service; passed through untouched.
    pub narrative: String,
}

impl ScenarioResult {
    pub fn new(baseline: &PortfolioSnapshot, input: &ScenarioInput, narrative: String) -> Self {
        let revenue_delta = simulate(baseline, input);
        Self {
            rent_change_pct: input.rent_change_pct,
            occupancy_change_pct: input.occupancy_change_pct,
            baseline_noi: baseline.annual_noi,
            projected_noi: baseline.annual_noi + revenue_delta,
            revenue_delta,
            narrative,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline(noi: f64) -> PortfolioSnapshot {
        PortfolioSnapshot {
            total_units: 100,
            occupied_units: 94,
            occupancy_rate: 94.0,
            average_rent: noi / 12.0 / 100.0,
            annual_noi: noi,
            high_risk_tenants: 0,
        }
    }

    #[test]
    fn shocks_are_summed_linearly() {
        let input = ScenarioInput::new(10.0, -5.0).unwrap();
        let delta = simulate(&baseline(1_000_000.0), &input);
        assert!((delta - 50_000.0).abs() < 1e-6, "delta={delta}");
    }

    #[test]
    fn zero_shock_is_zero_delta() {
        let input = ScenarioInput::new(0.0, 0.0).unwrap();
        assert_eq!(simulate(&baseline(1_000_000.0), &input), 0.0);
        assert_eq!(simulate(&baseline(0.0), &ScenarioInput::new(20.0, 10.0).unwrap()), 0.0);
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(ScenarioInput::new(-20.0, -10.0).is_ok());
        assert!(ScenarioInput::new(20.0, 10.0).is_ok());
    }

    #[test]
    fn out_of_range_input_is_rejected_not_clamped() {
        let err = ScenarioInput::new(20.5, 0.0).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidInput(ref m) if m.contains("rent_change_pct")));

        let err = ScenarioInput::new(0.0, -10.01).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidInput(ref m) if m.contains("occupancy_change_pct")));

        assert!(ScenarioInput::new(f64::NAN, 0.0).is_err());
        assert!(ScenarioInput::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn request_converts_through_validation() {
        let req: ScenarioRequest =
            serde_json::from_value(serde_json::json!({"rent_change_pct": 5, "occupancy_change_pct": -2.5}))
                .unwrap();
        let input = ScenarioInput::try_from(req).unwrap();
        assert_eq!(input.rent_change_pct(), 5.0);
        assert_eq!(input.occupancy_change_pct(), -2.5);

        let bad = ScenarioRequest {
            rent_change_pct: 50.0,
            occupancy_change_pct: 0.0,
        };
        assert!(ScenarioInput::try_from(bad).is_err());
    }

    #[test]
    fn result_carries_projection_and_opaque_narrative() {
        let input = ScenarioInput::new(10.0, -5.0).unwrap();
        let r = ScenarioResult::new(&baseline(1_000_000.0), &input, "  not parsed  ".to_string());
        assert_eq!(r.baseline_noi, 1_000_000.0);
        assert!((r.projected_noi - 1_050_000.0).abs() < 1e-6);
        assert_eq!(r.narrative, "  not parsed  ");
    }
}
