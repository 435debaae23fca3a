use crate::domain::portfolio::{RiskAssessment, RiskTier, TenantRisk};
use crate::domain::records::{TenantRecord, UnitRecord};
use chrono::Months;
use std::collections::HashMap;

pub const RENT_BURDEN_LIMIT: f64 = 0.40;
pub const CREDIT_SCORE_FLOOR: i32 = 620;

const BURDEN_POINTS: u32 = 3;
const CREDIT_POINTS: u32 = 2;

pub const REASON_HIGH_BURDEN: &str = "High Rent Burden (>40%)";
pub const REASON_LOW_CREDIT: &str = "Low Credit Score";
pub const REASON_STABLE: &str = "Stable Financials";

/// Scores one tenant from monthly rent, annual income and credit score.
///
/// Non-positive income counts as the maximal rent burden rather than an error. The burden
/// check outranks the credit check, so a tenant failing both reports the burden reason.
pub fn assess(rent: f64, annual_income: f64, credit_score: i32) -> RiskAssessment {
    let mut score = 0;
    if rent_burden(rent, annual_income) > RENT_BURDEN_LIMIT {
        score += BURDEN_POINTS;
    }
    if credit_score < CREDIT_SCORE_FLOOR {
        score += CREDIT_POINTS;
    }

    let (tier, reason) = if score >= BURDEN_POINTS {
        (RiskTier::High, REASON_HIGH_BURDEN)
    } else if score >= CREDIT_POINTS {
        (RiskTier::Medium, REASON_LOW_CREDIT)
    } else {
        (RiskTier::Low, REASON_STABLE)
    };

    RiskAssessment {
        tier,
        reason: reason.to_string(),
    }
}

/// Monthly rent over monthly income; infinite when there is no income.
pub fn rent_burden(rent: f64, annual_income: f64) -> f64 {
    let monthly_income = annual_income / 12.0;
    if monthly_income.is_nan() || monthly_income <= 0.0 {
        return f64::INFINITY;
    }
    rent / monthly_income
}

/// Unit id -> monthly rent lookup. Later duplicates win.
pub fn rent_index(units: &[UnitRecord]) -> HashMap<&str, f64> {
    units
        .iter()
        .map(|u| (u.unit_id.as_str(), u.market_rent))
        .collect()
}

/// Rent for a tenant's unit, zero when the reference does not resolve.
pub fn resolved_rent(rents: &HashMap<&str, f64>, tenant: &TenantRecord) -> f64 {
    rents.get(tenant.unit_id.as_str()).copied().unwrap_or(0.0)
}

/// Tenant list view in source order. Leases are assumed to run twelve months.
pub fn assess_tenants(units: &[UnitRecord], tenants: &[TenantRecord]) -> Vec<TenantRisk> {
    let rents = rent_index(units);
    tenants
        .iter()
        .map(|t| {
            let rent = resolved_rent(&rents, t);
            TenantRisk {
                tenant_id: t.tenant_id.clone(),
                name: t.name.clone(),
                unit_id: t.unit_id.clone(),
                rent,
                annual_income: t.annual_income,
                credit_score: t.credit_score,
                lease_start: t.lease_start,
                lease_end: t
                    .lease_start
                    .and_then(|d| d.checked_add_months(Months::new(12))),
                risk: assess(rent, t.annual_income, t.credit_score),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::UnitType;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    #[test]
    fn high_burden_is_high_risk() {
        let a = assess(3500.0, 100_000.0, 720);
        assert_eq!(a.tier, RiskTier::High);
        assert_eq!(a.reason, REASON_HIGH_BURDEN);
    }

    #[test]
    fn low_credit_is_medium_risk() {
        let a = assess(2000.0, 120_000.0, 600);
        assert_eq!(a.tier, RiskTier::Medium);
        assert_eq!(a.reason, REASON_LOW_CREDIT);
    }

    #[test]
    fn affordable_rent_and_good_credit_is_low_risk() {
        let a = assess(1500.0, 100_000.0, 750);
        assert_eq!(a.tier, RiskTier::Low);
        assert_eq!(a.reason, REASON_STABLE);
    }

    #[test]
    fn burden_reason_wins_when_both_checks_fail() {
        let a = assess(3500.0, 100_000.0, 580);
        assert_eq!(a.tier, RiskTier::High);
        assert_eq!(a.reason, REASON_HIGH_BURDEN);
    }

    #[test]
    fn thresholds_are_strict() {
        // Exactly 40% burden and exactly 620 credit both pass.
        assert_eq!(assess(4000.0, 120_000.0, 620).tier, RiskTier::Low);
    }

    #[test]
    fn zero_or_negative_income_is_maximal_burden() {
        assert_eq!(assess(1200.0, 0.0, 800).tier, RiskTier::High);
        assert_eq!(assess(0.0, 0.0, 800).tier, RiskTier::High);
        assert_eq!(assess(1200.0, -10.0, 800).tier, RiskTier::High);
        assert!(rent_burden(1.0, 0.0).is_infinite());
    }

    #[test]
    fn tenant_list_resolves_rent_and_lease_end() {
        let units = vec![UnitRecord {
            unit_id: "U1".to_string(),
            property_id: "P1".to_string(),
            unit_type: UnitType::OneBed,
            amenities: String::new(),
            sqft: 700,
            market_rent: 3500.0,
        }];
        let tenants = vec![
            TenantRecord {
                tenant_id: "T1".to_string(),
                unit_id: "U1".to_string(),
                name: "Ann Lee".to_string(),
                annual_income: 100_000.0,
                credit_score: 720,
                lease_start: NaiveDate::from_ymd_opt(2025, 2, 28),
            },
            TenantRecord {
                tenant_id: "T2".to_string(),
                unit_id: "GONE".to_string(),
                name: "Bo Kim".to_string(),
                annual_income: 60_000.0,
                credit_score: 700,
                lease_start: None,
            },
        ];

        let rows = assess_tenants(&units, &tenants);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rent, 3500.0);
        assert_eq!(rows[0].risk.tier, RiskTier::High);
        assert_eq!(rows[0].lease_end, NaiveDate::from_ymd_opt(2026, 2, 28));
        assert_eq!(rows[1].rent, 0.0);
        assert_eq!(rows[1].risk.tier, RiskTier::Low);
        assert_eq!(rows[1].lease_end, None);
    }

    proptest! {
        #[test]
        fn raising_rent_never_lowers_the_tier(
            income in 0.0f64..500_000.0,
            credit in 300i32..=850,
            rent_a in 0.0f64..20_000.0,
            rent_b in 0.0f64..20_000.0,
        ) {
            let (lo, hi) = if rent_a <= rent_b { (rent_a, rent_b) } else { (rent_b, rent_a) };
            prop_assert!(assess(lo, income, credit).tier <= assess(hi, income, credit).tier);
        }

        #[test]
        fn dropping_credit_below_floor_never_lowers_the_tier(
            income in 1.0f64..500_000.0,
            rent in 0.0f64..20_000.0,
            above in 620i32..=850,
            below in 300i32..620,
        ) {
            prop_assert!(assess(rent, income, above).tier <= assess(rent, income, below).tier);
        }

        #[test]
        fn assessment_is_deterministic(
            income in -1_000.0f64..500_000.0,
            credit in 300i32..=850,
            rent in 0.0f64..20_000.0,
        ) {
            prop_assert_eq!(assess(rent, income, credit), assess(rent, income, credit));
        }
    }
}
