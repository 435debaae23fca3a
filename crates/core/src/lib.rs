pub mod analytics;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod predict;

pub mod config {
    use crate::ingest::parser::RecordFormat;
    use anyhow::Context;
    use std::path::PathBuf;

    const DEFAULT_DATA_DIR: &str = "data";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub data_dir: PathBuf,
        pub record_format: RecordFormat,
        pub prediction_base_url: Option<String>,
        pub prediction_api_key: Option<String>,
        pub prediction_timeout_secs: Option<u64>,
        pub anthropic_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub yield_min_annual_gain: Option<f64>,
        pub yield_max_results: Option<usize>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let record_format = match std::env::var("ASA_RECORD_FORMAT").ok() {
                Some(s) => s
                    .parse::<RecordFormat>()
                    .map_err(|e| anyhow::anyhow!("ASA_RECORD_FORMAT is invalid: {e}"))?,
                None => RecordFormat::default(),
            };

            Ok(Self {
                data_dir: std::env::var("ASA_DATA_DIR")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
                record_format,
                prediction_base_url: non_empty_var("PREDICTION_BASE_URL"),
                prediction_api_key: non_empty_var("PREDICTION_API_KEY"),
                prediction_timeout_secs: std::env::var("PREDICTION_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok()),
                anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                yield_min_annual_gain: std::env::var("YIELD_MIN_ANNUAL_GAIN")
                    .ok()
                    .and_then(|s| s.parse::<f64>().ok()),
                yield_max_results: std::env::var("YIELD_MAX_RESULTS")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok()),
            })
        }

        pub fn require_prediction_base_url(&self) -> anyhow::Result<&str> {
            self.prediction_base_url
                .as_deref()
                .context("PREDICTION_BASE_URL is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }
}
