use crate::domain::records::UnitType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub total_units: usize,
    pub occupied_units: usize,
    /// Percentage, one decimal place.
    pub occupancy_rate: f64,
    /// Whole currency units.
    pub average_rent: f64,
    pub annual_noi: f64,
    pub high_risk_tenants: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySummary {
    pub property_id: String,
    pub name: String,
    pub neighborhood: String,
    pub property_class: String,
    pub unit_count: usize,
    pub occupancy_rate: f64,
    pub annual_noi: f64,
    pub average_rent: f64,
}

/// Portfolio view built from property summaries.
///
/// Occupancy is weighted by unit count while `average_rent` is the plain mean of the
/// per-property averages. Both conventions are relied on by dashboard consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRollup {
    pub property_count: usize,
    pub total_units: usize,
    pub occupancy_rate: f64,
    pub average_rent: f64,
    pub annual_noi: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub tier: RiskTier,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantRisk {
    pub tenant_id: String,
    pub name: String,
    pub unit_id: String,
    pub rent: f64,
    pub annual_income: f64,
    pub credit_score: i32,
    pub lease_start: Option<NaiveDate>,
    pub lease_end: Option<NaiveDate>,
    pub risk: RiskAssessment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldOpportunity {
    pub unit_id: String,
    pub unit_type: UnitType,
    pub current_rent: f64,
    pub market_rent: f64,
    pub annual_gain: f64,
    pub sqft: u32,
}
