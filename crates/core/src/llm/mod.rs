pub mod anthropic;

use crate::config::Settings;
use crate::domain::portfolio::YieldOpportunity;
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;

pub const OFFLINE_NARRATIVE: &str =
    "Narrative unavailable: no narrative service is configured (offline/demo mode).";

/// Structured facts handed to the narrative service. The returned text is never inspected.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NarrativeContext {
    Scenario {
        rent_change_pct: f64,
        occupancy_change_pct: f64,
        revenue_delta: f64,
    },
    YieldScan {
        property_id: String,
        opportunities: Vec<YieldOpportunity>,
    },
}

impl NarrativeContext {
    pub fn prompt(&self) -> String {
        match self {
            Self::Scenario {
                rent_change_pct,
                occupancy_change_pct,
                revenue_delta,
            } => format!(
                "Sanity-check this portfolio scenario.\n\
                 Proposed rent change: {rent_change_pct:+.1}%\n\
                 Projected occupancy change: {occupancy_change_pct:+.1}%\n\
                 Modeled annual revenue delta: ${revenue_delta:.0}\n\n\
                 Is this realistic given current vacancy trends? Be critical; if the rent \
                 increase exceeds 5%, call out churn risk. Answer in a single paragraph."
            ),
            Self::YieldScan {
                property_id,
                opportunities,
            } => {
                let mut out = format!(
                    "Property {property_id} has {} units priced below estimated market rent.\n",
                    opportunities.len()
                );
                for o in opportunities {
                    let _ = writeln!(
                        out,
                        "- {} ({}, {} sqft): current ${:.0}, market ${:.0}, annual gain ${:.0}",
                        o.unit_id, o.unit_type, o.sqft, o.current_rent, o.market_rent, o.annual_gain
                    );
                }
                out.push_str(
                    "\nSuggest how to capture this gap at renewal without raising churn. \
                     Answer in a single paragraph.",
                );
                out
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    Offline,
}

#[async_trait::async_trait]
pub trait NarrativeClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn narrate(&self, context: &NarrativeContext) -> anyhow::Result<String>;
}

/// Used when no narrative credentials are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineNarrator;

#[async_trait::async_trait]
impl NarrativeClient for OfflineNarrator {
    fn provider(&self) -> Provider {
        Provider::Offline
    }

    async fn narrate(&self, _context: &NarrativeContext) -> anyhow::Result<String> {
        Ok(OFFLINE_NARRATIVE.to_string())
    }
}

pub fn client_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn NarrativeClient>> {
    if settings.anthropic_api_key.is_none() {
        tracing::info!("ANTHROPIC_API_KEY not set; narratives run in offline mode");
        return Ok(Arc::new(OfflineNarrator));
    }
    Ok(Arc::new(anthropic::AnthropicClient::from_settings(settings)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::UnitType;

    #[test]
    fn scenario_prompt_includes_shocks_and_delta() {
        let ctx = NarrativeContext::Scenario {
            rent_change_pct: 10.0,
            occupancy_change_pct: -5.0,
            revenue_delta: 50_000.0,
        };
        let p = ctx.prompt();
        assert!(p.contains("+10.0%"));
        assert!(p.contains("-5.0%"));
        assert!(p.contains("$50000"));
    }

    #[test]
    fn yield_prompt_lists_each_unit() {
        let ctx = NarrativeContext::YieldScan {
            property_id: "PROP_001".to_string(),
            opportunities: vec![YieldOpportunity {
                unit_id: "PROP_001_U004".to_string(),
                unit_type: UnitType::TwoBed,
                current_rent: 2000.0,
                market_rent: 2400.0,
                annual_gain: 4800.0,
                sqft: 1000,
            }],
        };
        let p = ctx.prompt();
        assert!(p.contains("PROP_001_U004 (2BD, 1000 sqft)"));
        assert!(p.contains("annual gain $4800"));
    }

    #[test]
    fn context_serializes_with_kind_tag() {
        let ctx = NarrativeContext::Scenario {
            rent_change_pct: 1.0,
            occupancy_change_pct: 0.0,
            revenue_delta: 10.0,
        };
        let v = serde_json::to_value(&ctx).unwrap();
        assert_eq!(v["kind"], "scenario");
    }

    #[tokio::test]
    async fn offline_narrator_returns_fixed_text() {
        let ctx = NarrativeContext::YieldScan {
            property_id: "P".to_string(),
            opportunities: Vec::new(),
        };
        assert_eq!(OfflineNarrator.narrate(&ctx).await.unwrap(), OFFLINE_NARRATIVE);
    }
}
