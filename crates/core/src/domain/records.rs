use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitType {
    #[serde(rename = "Studio")]
    Studio,
    #[serde(rename = "1BD")]
    OneBed,
    #[serde(rename = "2BD")]
    TwoBed,
    #[serde(rename = "3BD")]
    ThreeBed,
}

impl UnitType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Studio => "Studio",
            Self::OneBed => "1BD",
            Self::TwoBed => "2BD",
            Self::ThreeBed => "3BD",
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitType {
    type Err = String;

    /// Accepts the calibrated spellings (`1BD`) as well as the older bed/bath codes
    /// (`2B1B`, `3B2B`) by looking at the leading bedroom digit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("studio") || s == "0BD" {
            return Ok(Self::Studio);
        }
        match s.chars().next() {
            Some('1') => Ok(Self::OneBed),
            Some('2') => Ok(Self::TwoBed),
            Some('3'..='9') => Ok(Self::ThreeBed),
            _ => Err(format!("unknown unit type: {s:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub unit_id: String,
    pub property_id: String,
    pub unit_type: UnitType,
    pub amenities: String,
    pub sqft: u32,
    /// Monthly rent.
    pub market_rent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantRecord {
    pub tenant_id: String,
    /// Not enforced against the unit set; a dangling reference resolves to zero rent.
    pub unit_id: String,
    pub name: String,
    pub annual_income: f64,
    pub credit_score: i32,
    pub lease_start: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub property_id: String,
    pub name: String,
    pub neighborhood: String,
    pub property_class: String,
}
