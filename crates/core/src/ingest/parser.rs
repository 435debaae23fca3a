//! Delimited record parsing for the unit, tenant and property source files.
//!
//! Two readers are available. [`RecordFormat::LastFieldTolerant`] reads the legacy export,
//! where the amenities column is written unquoted and may contain the delimiter: the rent is
//! taken after the last delimiter, the square footage just before it, the leading columns from
//! fixed positions and whatever is left in between is the amenities text. Leading free-text
//! columns (tenant names) get no such protection, so a delimiter inside a name shifts every
//! later column. Those rows are normally rejected by numeric validation but can slip through
//! misaligned.
//!
//! [`RecordFormat::Quoted`] reads RFC 4180 quoted fields and has no such hazard. Prefer it
//! for any export this system controls.

use crate::domain::records::{PropertyRecord, TenantRecord, UnitRecord, UnitType};
use chrono::NaiveDate;
use std::str::FromStr;
use thiserror::Error;

pub const DELIMITER: char = ',';

const UNIT_FIELDS: usize = 6;
const TENANT_FIELDS: usize = 6;
const PROPERTY_FIELDS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordFormat {
    #[default]
    LastFieldTolerant,
    Quoted,
}

impl FromStr for RecordFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tolerant" | "last_field" | "last-field" => Ok(Self::LastFieldTolerant),
            "quoted" | "csv" => Ok(Self::Quoted),
            other => Err(format!(
                "unknown record format {other:?} (expected `tolerant` or `quoted`)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecord {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("field `{field}` is empty")]
    EmptyField { field: &'static str },

    #[error("field `{field}` is not a valid number: {value:?}")]
    NotNumeric { field: &'static str, value: String },

    #[error("field `{field}` is out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("unknown unit type: {0:?}")]
    UnknownUnitType(String),

    #[error("unreadable row: {0}")]
    Unreadable(String),
}

/// A dropped source row. `line` is 1-based and counts the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub line: usize,
    pub reason: MalformedRecord,
}

/// Accepted records in source order plus the rows that were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub rejected: Vec<RejectedRow>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

pub fn parse_units(text: &str, format: RecordFormat) -> Parsed<UnitRecord> {
    match format {
        RecordFormat::LastFieldTolerant => parse_lines(text, |line| {
            let fields = split_unit_line(line)?;
            let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
            unit_from_fields(&refs)
        }),
        RecordFormat::Quoted => parse_quoted(text, UNIT_FIELDS, unit_from_fields),
    }
}

pub fn parse_tenants(text: &str, format: RecordFormat) -> Parsed<TenantRecord> {
    match format {
        RecordFormat::LastFieldTolerant => parse_lines(text, |line| {
            let fields: Vec<&str> = line.split(DELIMITER).collect();
            tenant_from_fields(&fields)
        }),
        RecordFormat::Quoted => parse_quoted(text, TENANT_FIELDS, tenant_from_fields),
    }
}

pub fn parse_properties(text: &str, format: RecordFormat) -> Parsed<PropertyRecord> {
    match format {
        RecordFormat::LastFieldTolerant => parse_lines(text, |line| {
            let fields: Vec<&str> = line.split(DELIMITER).collect();
            property_from_fields(&fields)
        }),
        RecordFormat::Quoted => parse_quoted(text, PROPERTY_FIELDS, property_from_fields),
    }
}

fn parse_lines<T>(
    text: &str,
    parse_row: impl Fn(&str) -> Result<T, MalformedRecord>,
) -> Parsed<T> {
    let mut out = Parsed::default();
    for (idx, line) in text.lines().enumerate().skip(1) {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        match parse_row(line) {
            Ok(record) => out.records.push(record),
            Err(reason) => out.rejected.push(RejectedRow {
                line: idx + 1,
                reason,
            }),
        }
    }
    out
}

fn parse_quoted<T>(
    text: &str,
    expected: usize,
    parse_row: impl Fn(&[&str]) -> Result<T, MalformedRecord>,
) -> Parsed<T> {
    let mut out = Parsed::default();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    for result in reader.records() {
        match result {
            Ok(record) => {
                let line = record.position().map_or(0, |p| p.line() as usize);
                if record.iter().all(|f| f.trim().is_empty()) {
                    continue;
                }
                let fields: Vec<&str> = record.iter().collect();
                let parsed = if fields.len() == expected {
                    parse_row(&fields)
                } else {
                    Err(MalformedRecord::FieldCount {
                        expected,
                        found: fields.len(),
                    })
                };
                match parsed {
                    Ok(r) => out.records.push(r),
                    Err(reason) => out.rejected.push(RejectedRow { line, reason }),
                }
            }
            Err(err) => {
                let line = err.position().map_or(0, |p| p.line() as usize);
                out.rejected.push(RejectedRow {
                    line,
                    reason: MalformedRecord::Unreadable(err.to_string()),
                });
            }
        }
    }
    out
}

/// Splits `unit_id,property_id,type,amenities...,sqft,market_rent`, letting the amenities
/// text absorb any extra delimiters.
fn split_unit_line(line: &str) -> Result<Vec<String>, MalformedRecord> {
    let found = line.split(DELIMITER).count();
    let field_count = || MalformedRecord::FieldCount {
        expected: UNIT_FIELDS,
        found,
    };
    if found < UNIT_FIELDS {
        return Err(field_count());
    }

    let (rest, rent) = line.rsplit_once(DELIMITER).ok_or_else(field_count)?;
    let (rest, sqft) = rest.rsplit_once(DELIMITER).ok_or_else(field_count)?;
    let mut head = rest.splitn(4, DELIMITER);
    let unit_id = head.next().ok_or_else(field_count)?;
    let property_id = head.next().ok_or_else(field_count)?;
    let unit_type = head.next().ok_or_else(field_count)?;
    let amenities = head.next().ok_or_else(field_count)?;

    Ok(vec![
        unit_id.to_string(),
        property_id.to_string(),
        unit_type.to_string(),
        unquote(amenities),
        sqft.to_string(),
        rent.to_string(),
    ])
}

fn unquote(s: &str) -> String {
    let t = s.trim();
    if t.len() >= 2 && t.starts_with('"') && t.ends_with('"') {
        t[1..t.len() - 1].replace("\"\"", "\"")
    } else {
        t.to_string()
    }
}

fn unit_from_fields(f: &[&str]) -> Result<UnitRecord, MalformedRecord> {
    if f.len() < UNIT_FIELDS {
        return Err(MalformedRecord::FieldCount {
            expected: UNIT_FIELDS,
            found: f.len(),
        });
    }

    let unit_type_raw = required("type", f[2])?;
    let unit_type = unit_type_raw
        .parse::<UnitType>()
        .map_err(|_| MalformedRecord::UnknownUnitType(unit_type_raw.to_string()))?;

    let sqft = parse_whole("sqft", f[4])?;
    if sqft <= 0 || sqft > i64::from(u32::MAX) {
        return Err(MalformedRecord::OutOfRange {
            field: "sqft",
            value: f[4].trim().to_string(),
        });
    }

    let market_rent = parse_non_negative("market_rent", f[5])?;

    Ok(UnitRecord {
        unit_id: required("unit_id", f[0])?.to_string(),
        property_id: required("property_id", f[1])?.to_string(),
        unit_type,
        amenities: f[3].trim().to_string(),
        sqft: sqft as u32,
        market_rent,
    })
}

fn tenant_from_fields(f: &[&str]) -> Result<TenantRecord, MalformedRecord> {
    if f.len() != TENANT_FIELDS {
        return Err(MalformedRecord::FieldCount {
            expected: TENANT_FIELDS,
            found: f.len(),
        });
    }

    let credit_score = parse_whole("credit_score", f[4])?;
    let credit_score = i32::try_from(credit_score).map_err(|_| MalformedRecord::OutOfRange {
        field: "credit_score",
        value: f[4].trim().to_string(),
    })?;

    Ok(TenantRecord {
        tenant_id: required("tenant_id", f[0])?.to_string(),
        unit_id: required("unit_id", f[1])?.to_string(),
        name: f[2].trim().to_string(),
        annual_income: parse_non_negative("income", f[3])?,
        credit_score,
        lease_start: NaiveDate::parse_from_str(f[5].trim(), "%Y-%m-%d").ok(),
    })
}

fn property_from_fields(f: &[&str]) -> Result<PropertyRecord, MalformedRecord> {
    if f.len() != PROPERTY_FIELDS {
        return Err(MalformedRecord::FieldCount {
            expected: PROPERTY_FIELDS,
            found: f.len(),
        });
    }

    Ok(PropertyRecord {
        property_id: required("property_id", f[0])?.to_string(),
        name: f[1].trim().to_string(),
        neighborhood: f[2].trim().to_string(),
        property_class: f[3].trim().to_string(),
    })
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, MalformedRecord> {
    let v = value.trim();
    if v.is_empty() {
        return Err(MalformedRecord::EmptyField { field });
    }
    Ok(v)
}

fn parse_non_negative(field: &'static str, value: &str) -> Result<f64, MalformedRecord> {
    let v = required(field, value)?;
    let n = v.parse::<f64>().map_err(|_| MalformedRecord::NotNumeric {
        field,
        value: v.to_string(),
    })?;
    if !n.is_finite() {
        return Err(MalformedRecord::NotNumeric {
            field,
            value: v.to_string(),
        });
    }
    if n < 0.0 {
        return Err(MalformedRecord::OutOfRange {
            field,
            value: v.to_string(),
        });
    }
    Ok(n)
}

/// Integer field; pandas exports sometimes write these as `700.0`.
fn parse_whole(field: &'static str, value: &str) -> Result<i64, MalformedRecord> {
    let v = required(field, value)?;
    if let Ok(n) = v.parse::<i64>() {
        return Ok(n);
    }
    match v.parse::<f64>() {
        Ok(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => Ok(n as i64),
        _ => Err(MalformedRecord::NotNumeric {
            field,
            value: v.to_string(),
        }),
    }
}
