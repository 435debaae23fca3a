use crate::domain::records::{PropertyRecord, TenantRecord, UnitRecord};
use crate::ingest::parser::{self, Parsed, RecordFormat, RejectedRow};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const UNITS_FILE: &str = "calibrated_units.csv";
pub const TENANTS_FILE: &str = "calibrated_tenants.csv";
pub const PROPERTIES_FILE: &str = "calibrated_properties.csv";

/// Raw row text for each record kind. Implementations only fetch bytes; parsing stays here.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    fn source_name(&self) -> String;

    async fn read_units(&self) -> Result<String>;

    async fn read_tenants(&self) -> Result<String>;

    /// Property metadata is optional; a missing file yields `None`.
    async fn read_properties(&self) -> Result<Option<String>>;
}

#[derive(Debug, Clone)]
pub struct FsRecordSource {
    data_dir: PathBuf,
}

impl FsRecordSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    async fn read_file(&self, name: &str) -> Result<String> {
        let path = self.data_dir.join(name);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }
}

#[async_trait::async_trait]
impl RecordSource for FsRecordSource {
    fn source_name(&self) -> String {
        self.data_dir.display().to_string()
    }

    async fn read_units(&self) -> Result<String> {
        self.read_file(UNITS_FILE).await
    }

    async fn read_tenants(&self) -> Result<String> {
        self.read_file(TENANTS_FILE).await
    }

    async fn read_properties(&self) -> Result<Option<String>> {
        let path = self.data_dir.join(PROPERTIES_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(anyhow::Error::new(e).context(format!("failed to read {}", path.display())))
            }
        }
    }
}

/// Everything one request needs, parsed fresh from the source.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub units: Vec<UnitRecord>,
    pub tenants: Vec<TenantRecord>,
    pub properties: Vec<PropertyRecord>,
}

pub async fn load_dataset(source: &dyn RecordSource, format: RecordFormat) -> Result<Dataset> {
    let name = source.source_name();

    let units = parser::parse_units(&source.read_units().await?, format);
    log_rejected("units", &name, &units);

    let tenants = parser::parse_tenants(&source.read_tenants().await?, format);
    log_rejected("tenants", &name, &tenants);

    let properties = match source.read_properties().await? {
        Some(text) => {
            let parsed = parser::parse_properties(&text, format);
            log_rejected("properties", &name, &parsed);
            parsed.records
        }
        None => Vec::new(),
    };

    tracing::debug!(
        source = %name,
        units = units.records.len(),
        tenants = tenants.records.len(),
        properties = properties.len(),
        "dataset loaded"
    );

    Ok(Dataset {
        units: units.records,
        tenants: tenants.records,
        properties,
    })
}

fn log_rejected<T>(kind: &'static str, source: &str, parsed: &Parsed<T>) {
    if parsed.rejected.is_empty() {
        return;
    }

    // Per-row detail for the first few only; large corrupt files would flood the log.
    for RejectedRow { line, reason } in parsed.rejected.iter().take(10) {
        tracing::warn!(kind, source, line, reason = %reason, "dropping malformed row");
    }
    tracing::warn!(
        kind,
        source,
        accepted = parsed.records.len(),
        rejected = parsed.rejected.len(),
        "malformed rows dropped"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[tokio::test]
    async fn loads_dataset_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            UNITS_FILE,
            "unit_id,property_id,type,amenities,sqft,market_rent\nU1,P1,1BD,\"['Gym', 'View']\",750,3000\nU2,P1,2BD,[],1000,oops\n",
        );
        write(
            dir.path(),
            TENANTS_FILE,
            "tenant_id,unit_id,name,income,credit_score,lease_start\nT1,U1,Ann Lee,90000,700,2025-03-01\n",
        );

        let source = FsRecordSource::new(dir.path());
        let ds = load_dataset(&source, RecordFormat::LastFieldTolerant)
            .await
            .unwrap();
        assert_eq!(ds.units.len(), 1);
        assert_eq!(ds.tenants.len(), 1);
        assert!(ds.properties.is_empty());
    }

    #[tokio::test]
    async fn missing_units_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FsRecordSource::new(dir.path());
        let err = load_dataset(&source, RecordFormat::LastFieldTolerant)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains(UNITS_FILE));
    }
}
