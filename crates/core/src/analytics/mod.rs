//! Pure portfolio analytics over parsed records. Nothing here performs I/O.

pub mod aggregate;
pub mod risk;
pub mod scenario;
pub mod yield_gap;

pub use aggregate::{roll_up, summarize, summarize_properties};
pub use risk::{assess, assess_tenants};
pub use scenario::{simulate, ScenarioInput, ScenarioResult};
pub use yield_gap::{find_opportunities, MarketRentSource, PeerRentEstimator, YieldScanOptions};
