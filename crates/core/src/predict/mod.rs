//! Contract with the external rent / churn prediction service.

pub mod http;

use crate::domain::portfolio::RiskTier;
use crate::domain::records::{PropertyRecord, UnitRecord, UnitType};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentFeatures {
    pub neighborhood: String,
    pub property_class: String,
    pub unit_type: UnitType,
    pub sqft: u32,
}

impl RentFeatures {
    pub fn for_unit(unit: &UnitRecord, property: Option<&PropertyRecord>) -> Self {
        Self {
            neighborhood: property.map(|p| p.neighborhood.clone()).unwrap_or_default(),
            property_class: property.map(|p| p.property_class.clone()).unwrap_or_default(),
            unit_type: unit.unit_type,
            sqft: unit.sqft,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RentEstimate {
    /// Monthly rent.
    pub estimated_rent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnFeatures {
    pub income: f64,
    pub credit_score: i32,
    pub market_rent: f64,
    pub sqft: u32,
    pub unit_type: UnitType,
    pub property_class: String,
    pub neighborhood: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChurnPrediction {
    pub risk_level: RiskTier,
    pub churn_probability: f64,
}

#[async_trait::async_trait]
pub trait PredictionClient: Send + Sync {
    fn service_name(&self) -> &'static str;

    async fn predict_rent(&self, features: &RentFeatures) -> Result<RentEstimate>;

    async fn predict_churn(&self, features: &ChurnFeatures) -> Result<ChurnPrediction>;
}

/// Asks the prediction service for every unit of `property_id`, one call per unit.
///
/// The first failing call aborts the collection; retrying is left to the caller.
pub async fn collect_rent_estimates(
    client: &dyn PredictionClient,
    property_id: &str,
    units: &[UnitRecord],
    properties: &[PropertyRecord],
) -> Result<HashMap<String, f64>> {
    let property = properties.iter().find(|p| p.property_id == property_id);
    let mut out = HashMap::new();
    for unit in units.iter().filter(|u| u.property_id == property_id) {
        let estimate = client
            .predict_rent(&RentFeatures::for_unit(unit, property))
            .await?;
        out.insert(unit.unit_id.clone(), estimate.estimated_rent);
    }
    tracing::debug!(
        service = client.service_name(),
        property_id,
        estimates = out.len(),
        "collected rent estimates"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedRent(f64);

    #[async_trait::async_trait]
    impl PredictionClient for FixedRent {
        fn service_name(&self) -> &'static str {
            "fixed"
        }

        async fn predict_rent(&self, features: &RentFeatures) -> Result<RentEstimate> {
            anyhow::ensure!(features.sqft > 0, "sqft must be positive");
            Ok(RentEstimate {
                estimated_rent: self.0,
            })
        }

        async fn predict_churn(&self, _features: &ChurnFeatures) -> Result<ChurnPrediction> {
            anyhow::bail!("not used")
        }
    }

    fn unit(id: &str, property: &str) -> UnitRecord {
        UnitRecord {
            unit_id: id.to_string(),
            property_id: property.to_string(),
            unit_type: UnitType::Studio,
            amenities: String::new(),
            sqft: 500,
            market_rent: 2000.0,
        }
    }

    #[test]
    fn rent_estimate_ignores_extra_response_fields() {
        let v = json!({
            "estimated_rent": 4500,
            "valuation": 4500,
            "formatted_rent": "$4,500",
            "currency": "USD"
        });
        let parsed: RentEstimate = serde_json::from_value(v).unwrap();
        assert_eq!(parsed.estimated_rent, 4500.0);
    }

    #[test]
    fn churn_prediction_maps_risk_level_to_tier() {
        let v = json!({"churn_probability": 0.45, "risk_level": "Medium"});
        let parsed: ChurnPrediction = serde_json::from_value(v).unwrap();
        assert_eq!(parsed.risk_level, RiskTier::Medium);
        assert!(serde_json::from_value::<ChurnPrediction>(json!({
            "churn_probability": 0.1,
            "risk_level": "Unknown"
        }))
        .is_err());
    }

    #[test]
    fn rent_features_pull_property_metadata() {
        let prop = PropertyRecord {
            property_id: "P1".to_string(),
            name: "Lee Court".to_string(),
            neighborhood: "Tribeca".to_string(),
            property_class: "A".to_string(),
        };
        let f = RentFeatures::for_unit(&unit("U1", "P1"), Some(&prop));
        let v = serde_json::to_value(&f).unwrap();
        assert_eq!(
            v,
            json!({"neighborhood": "Tribeca", "property_class": "A", "unit_type": "Studio", "sqft": 500})
        );
    }

    #[tokio::test]
    async fn collects_estimates_for_one_property() {
        let units = vec![unit("U1", "P1"), unit("U2", "P2"), unit("U3", "P1")];
        let out = collect_rent_estimates(&FixedRent(2600.0), "P1", &units, &[])
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.get("U3").copied(), Some(2600.0));
        assert!(!out.contains_key("U2"));
    }
}
