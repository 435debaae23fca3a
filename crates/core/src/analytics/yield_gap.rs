use crate::domain::portfolio::YieldOpportunity;
use crate::domain::records::{UnitRecord, UnitType};
use std::collections::HashMap;

const MONTHS_PER_YEAR: f64 = 12.0;

/// Estimated achievable monthly rent for a unit, independent of its recorded rent.
pub trait MarketRentSource {
    fn estimated_rent(&self, unit: &UnitRecord) -> Option<f64>;
}

/// Externally supplied estimates keyed by unit id (e.g. gathered from the prediction service).
impl MarketRentSource for HashMap<String, f64> {
    fn estimated_rent(&self, unit: &UnitRecord) -> Option<f64> {
        self.get(&unit.unit_id).copied()
    }
}

/// Comparable-rent model: the portfolio median rent per square foot for the unit's type,
/// scaled to the unit's floor area and rounded to whole dollars.
#[derive(Debug, Clone, Default)]
pub struct PeerRentEstimator {
    rent_per_sqft: HashMap<UnitType, f64>,
}

impl PeerRentEstimator {
    pub fn from_units(units: &[UnitRecord]) -> Self {
        let mut samples: HashMap<UnitType, Vec<f64>> = HashMap::new();
        for u in units.iter().filter(|u| u.sqft > 0) {
            samples
                .entry(u.unit_type)
                .or_default()
                .push(u.market_rent / f64::from(u.sqft));
        }

        let rent_per_sqft = samples
            .into_iter()
            .filter_map(|(t, mut v)| median(&mut v).map(|m| (t, m)))
            .collect();
        Self { rent_per_sqft }
    }

    pub fn rent_per_sqft(&self, unit_type: UnitType) -> Option<f64> {
        self.rent_per_sqft.get(&unit_type).copied()
    }
}

impl MarketRentSource for PeerRentEstimator {
    fn estimated_rent(&self, unit: &UnitRecord) -> Option<f64> {
        self.rent_per_sqft(unit.unit_type)
            .map(|ppsf| (ppsf * f64::from(unit.sqft)).round())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct YieldScanOptions {
    /// Opportunities must gain strictly more than this per year.
    pub min_annual_gain: f64,
    pub limit: Option<usize>,
}

/// Underpriced units of `property_id`, largest annual gain first (ties by unit id).
///
/// The unit's recorded rent is the current contracted rent. An empty result means the
/// property is priced at or above market.
pub fn find_opportunities(
    property_id: &str,
    units: &[UnitRecord],
    estimates: &dyn MarketRentSource,
    options: &YieldScanOptions,
) -> Vec<YieldOpportunity> {
    let mut out: Vec<YieldOpportunity> = units
        .iter()
        .filter(|u| u.property_id == property_id)
        .filter_map(|u| {
            let market_rent = estimates.estimated_rent(u).filter(|m| m.is_finite())?;
            if market_rent <= u.market_rent {
                return None;
            }
            let annual_gain = (market_rent - u.market_rent) * MONTHS_PER_YEAR;
            if annual_gain <= options.min_annual_gain {
                return None;
            }
            Some(YieldOpportunity {
                unit_id: u.unit_id.clone(),
                unit_type: u.unit_type,
                current_rent: u.market_rent,
                market_rent,
                annual_gain,
                sqft: u.sqft,
            })
        })
        .collect();

    out.sort_by(|a, b| {
        b.annual_gain
            .partial_cmp(&a.annual_gain)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.unit_id.cmp(&b.unit_id))
    });

    if let Some(limit) = options.limit {
        out.truncate(limit);
    }

    tracing::debug!(property_id, opportunities = out.len(), "yield scan complete");
    out
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
