use crate::analytics::risk;
use crate::domain::portfolio::{PortfolioRollup, PortfolioSnapshot, PropertySummary, RiskTier};
use crate::domain::records::{PropertyRecord, TenantRecord, UnitRecord};
use std::collections::{HashMap, HashSet};

const MONTHS_PER_YEAR: f64 = 12.0;

/// Dashboard headline numbers.
///
/// Every tenant record counts as an occupied unit whether or not its unit reference
/// resolves; resolution only feeds the rent used for risk scoring. The occupied count is
/// capped at the unit count so the rate stays within 0..=100.
pub fn summarize(units: &[UnitRecord], tenants: &[TenantRecord]) -> PortfolioSnapshot {
    let total_units = units.len();
    let occupied_units = tenants.len().min(total_units);
    let monthly_rent: f64 = units.iter().map(|u| u.market_rent).sum();

    let rents = risk::rent_index(units);
    let high_risk_tenants = tenants
        .iter()
        .filter(|t| {
            let rent = risk::resolved_rent(&rents, t);
            risk::assess(rent, t.annual_income, t.credit_score).tier == RiskTier::High
        })
        .count();

    PortfolioSnapshot {
        total_units,
        occupied_units,
        occupancy_rate: percentage(occupied_units, total_units),
        average_rent: mean_rounded(monthly_rent, total_units),
        annual_noi: monthly_rent * MONTHS_PER_YEAR,
        high_risk_tenants,
    }
}

/// One summary per property, in property-file order, followed by any property ids that
/// only appear on unit rows (in first-seen order).
pub fn summarize_properties(
    properties: &[PropertyRecord],
    units: &[UnitRecord],
    tenants: &[TenantRecord],
) -> Vec<PropertySummary> {
    let mut order: Vec<&str> = properties.iter().map(|p| p.property_id.as_str()).collect();
    let mut by_property: HashMap<&str, Vec<&UnitRecord>> = HashMap::new();
    for unit in units {
        let entry = by_property.entry(unit.property_id.as_str()).or_default();
        if entry.is_empty() && !order.contains(&unit.property_id.as_str()) {
            order.push(unit.property_id.as_str());
        }
        entry.push(unit);
    }

    let unit_property: HashMap<&str, &str> = units
        .iter()
        .map(|u| (u.unit_id.as_str(), u.property_id.as_str()))
        .collect();
    let mut tenants_by_property: HashMap<&str, usize> = HashMap::new();
    for tenant in tenants {
        if let Some(&pid) = unit_property.get(tenant.unit_id.as_str()) {
            *tenants_by_property.entry(pid).or_default() += 1;
        }
    }

    let meta: HashMap<&str, &PropertyRecord> = properties
        .iter()
        .map(|p| (p.property_id.as_str(), p))
        .collect();

    let mut seen = HashSet::new();
    order
        .into_iter()
        .filter(|pid| seen.insert(*pid))
        .map(|pid| {
            let units = by_property.get(pid).map(Vec::as_slice).unwrap_or(&[]);
            let unit_count = units.len();
            let monthly_rent: f64 = units.iter().map(|u| u.market_rent).sum();
            let occupied = tenants_by_property
                .get(pid)
                .copied()
                .unwrap_or(0)
                .min(unit_count);
            let record = meta.get(pid);

            PropertySummary {
                property_id: pid.to_string(),
                name: record.map(|p| p.name.clone()).unwrap_or_default(),
                neighborhood: record.map(|p| p.neighborhood.clone()).unwrap_or_default(),
                property_class: record.map(|p| p.property_class.clone()).unwrap_or_default(),
                unit_count,
                occupancy_rate: percentage(occupied, unit_count),
                annual_noi: monthly_rent * MONTHS_PER_YEAR,
                average_rent: mean_rounded(monthly_rent, unit_count),
            }
        })
        .collect()
}

/// Occupancy is unit-weighted; average rent is the plain mean of property averages over
/// properties that have at least one unit.
pub fn roll_up(properties: &[PropertySummary]) -> PortfolioRollup {
    let total_units: usize = properties.iter().map(|p| p.unit_count).sum();
    let weighted_occupancy: f64 = properties
        .iter()
        .map(|p| p.occupancy_rate * p.unit_count as f64)
        .sum();

    let with_units: Vec<&PropertySummary> =
        properties.iter().filter(|p| p.unit_count > 0).collect();
    let rent_of_averages: f64 = with_units.iter().map(|p| p.average_rent).sum();

    PortfolioRollup {
        property_count: properties.len(),
        total_units,
        occupancy_rate: if total_units == 0 {
            0.0
        } else {
            round_to(weighted_occupancy / total_units as f64, 1)
        },
        average_rent: mean_rounded(rent_of_averages, with_units.len()),
        annual_noi: properties.iter().map(|p| p.annual_noi).sum(),
    }
}

/// One-decimal percentage. A non-zero part never rounds down to 0.0.
fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 || part == 0 {
        return 0.0;
    }
    round_to(part as f64 / whole as f64 * 100.0, 1).max(0.1)
}

fn mean_rounded(sum: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    (sum / count as f64).round()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::UnitType;
    use proptest::prelude::*;

    fn unit(id: &str, property: &str, rent: f64) -> UnitRecord {
        UnitRecord {
            unit_id: id.to_string(),
            property_id: property.to_string(),
            unit_type: UnitType::OneBed,
            amenities: String::new(),
            sqft: 750,
            market_rent: rent,
        }
    }

    fn tenant(id: &str, unit_id: &str, income: f64, credit: i32) -> TenantRecord {
        TenantRecord {
            tenant_id: id.to_string(),
            unit_id: unit_id.to_string(),
            name: format!("Tenant {id}"),
            annual_income: income,
            credit_score: credit,
            lease_start: None,
        }
    }

    fn property(id: &str, name: &str) -> PropertyRecord {
        PropertyRecord {
            property_id: id.to_string(),
            name: name.to_string(),
            neighborhood: "Harlem".to_string(),
            property_class: "B".to_string(),
        }
    }

    #[test]
    fn summarizes_dashboard_numbers() {
        let units = vec![
            unit("U1", "P1", 3500.0),
            unit("U2", "P1", 2000.0),
            unit("U3", "P2", 1501.0),
        ];
        let tenants = vec![
            tenant("T1", "U1", 100_000.0, 720),
            tenant("T2", "MISSING", 50_000.0, 700),
        ];

        let s = summarize(&units, &tenants);
        assert_eq!(s.total_units, 3);
        assert_eq!(s.occupied_units, 2);
        assert_eq!(s.occupancy_rate, 66.7);
        assert_eq!(s.average_rent, 2334.0);
        assert_eq!(s.annual_noi, 7001.0 * 12.0);
        // T2's unit does not resolve, so its rent is zero and it scores Low.
        assert_eq!(s.high_risk_tenants, 1);
    }

    #[test]
    fn empty_dataset_is_all_zero() {
        let s = summarize(&[], &[]);
        assert_eq!(s.total_units, 0);
        assert_eq!(s.occupancy_rate, 0.0);
        assert_eq!(s.average_rent, 0.0);
        assert_eq!(s.annual_noi, 0.0);

        let with_tenants_only = summarize(&[], &[tenant("T1", "U1", 1.0, 500)]);
        assert_eq!(with_tenants_only.occupied_units, 0);
        assert_eq!(with_tenants_only.occupancy_rate, 0.0);
    }

    #[test]
    fn more_tenants_than_units_caps_occupancy() {
        let units = vec![unit("U1", "P1", 1000.0)];
        let tenants = vec![
            tenant("T1", "U1", 90_000.0, 700),
            tenant("T2", "U1", 90_000.0, 700),
        ];
        assert_eq!(summarize(&units, &tenants).occupancy_rate, 100.0);
    }

    #[test]
    fn property_summaries_follow_property_file_order() {
        let properties = vec![property("P2", "Lee Court"), property("P9", "Empty Lofts")];
        let units = vec![
            unit("U1", "P1", 1000.0),
            unit("U2", "P2", 3000.0),
            unit("U3", "P2", 3001.0),
        ];
        let tenants = vec![tenant("T1", "U2", 90_000.0, 700)];

        let out = summarize_properties(&properties, &units, &tenants);
        let ids: Vec<_> = out.iter().map(|p| p.property_id.as_str()).collect();
        assert_eq!(ids, vec!["P2", "P9", "P1"]);

        assert_eq!(out[0].name, "Lee Court");
        assert_eq!(out[0].unit_count, 2);
        assert_eq!(out[0].occupancy_rate, 50.0);
        assert_eq!(out[0].average_rent, 3001.0);
        assert_eq!(out[0].annual_noi, 6001.0 * 12.0);

        assert_eq!(out[1].unit_count, 0);
        assert_eq!(out[1].average_rent, 0.0);

        assert_eq!(out[2].name, "");
        assert_eq!(out[2].occupancy_rate, 0.0);
    }

    #[test]
    fn rollup_weights_occupancy_but_not_rent() {
        let summary = |id: &str, units: usize, occ: f64, avg: f64| PropertySummary {
            property_id: id.to_string(),
            name: String::new(),
            neighborhood: String::new(),
            property_class: String::new(),
            unit_count: units,
            occupancy_rate: occ,
            annual_noi: avg * units as f64 * 12.0,
            average_rent: avg,
        };
        let props = vec![
            summary("P1", 10, 100.0, 1000.0),
            summary("P2", 30, 50.0, 3000.0),
            summary("P3", 0, 0.0, 0.0),
        ];

        let r = roll_up(&props);
        assert_eq!(r.property_count, 3);
        assert_eq!(r.total_units, 40);
        assert_eq!(r.occupancy_rate, 62.5);
        assert_eq!(r.average_rent, 2000.0);
        assert_eq!(r.annual_noi, (10_000.0 + 90_000.0) * 12.0);
    }

    #[test]
    fn rollup_of_nothing_is_zero() {
        let r = roll_up(&[]);
        assert_eq!(r.total_units, 0);
        assert_eq!(r.occupancy_rate, 0.0);
        assert_eq!(r.average_rent, 0.0);
    }

    fn units_strategy() -> impl Strategy<Value = Vec<UnitRecord>> {
        prop::collection::vec(0.0f64..20_000.0, 1..3_000).prop_map(|rents| {
            rents
                .into_iter()
                .enumerate()
                .map(|(i, r)| unit(&format!("U{i}"), "P1", r))
                .collect()
        })
    }

    #[test]
    fn single_tenant_in_large_portfolio_is_not_zero_occupancy() {
        let units: Vec<_> = (0..2_500)
            .map(|i| unit(&format!("U{i}"), "P1", 1000.0))
            .collect();
        let s = summarize(&units, &[tenant("T0", "U0", 80_000.0, 700)]);
        assert_eq!(s.occupied_units, 1);
        assert_eq!(s.occupancy_rate, 0.1);
        assert_eq!(percentage(0, 2_500), 0.0);
    }

    proptest! {
        #[test]
        fn occupancy_rate_is_bounded_and_zero_only_when_vacant(
            units in units_strategy(),
            occupied_share in 0.0f64..=1.0,
        ) {
            let occupied = (units.len() as f64 * occupied_share) as usize;
            let tenants: Vec<_> = (0..occupied)
                .map(|i| tenant(&format!("T{i}"), &format!("U{i}"), 80_000.0, 700))
                .collect();

            let s = summarize(&units, &tenants);
            prop_assert!((0.0..=100.0).contains(&s.occupancy_rate));
            prop_assert_eq!(s.occupancy_rate == 0.0, s.occupied_units == 0);
        }

        #[test]
        fn average_rent_reconstructs_total(units in units_strategy()) {
            let s = summarize(&units, &[]);
            let total: f64 = units.iter().map(|u| u.market_rent).sum();
            let n = s.total_units as f64;
            prop_assert!((s.average_rent * n - total).abs() <= 0.5 * n + 1e-6);
        }

        #[test]
        fn summarize_is_idempotent(units in units_strategy()) {
            let tenants = vec![tenant("T0", "U0", 40_000.0, 600)];
            prop_assert_eq!(summarize(&units, &tenants), summarize(&units, &tenants));
        }
    }
}
