use crate::config::Settings;
use crate::error::{Service, UpstreamError};
use crate::predict::{ChurnFeatures, ChurnPrediction, PredictionClient, RentEstimate, RentFeatures};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const RENT_PATH: &str = "/predict/rent";
const CHURN_PATH: &str = "/predict/churn";

#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpPredictionClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_prediction_base_url()?.to_string();
        let timeout_secs = settings
            .prediction_timeout_secs
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self::new(
            base_url,
            settings.prediction_api_key.clone(),
            Duration::from_secs(timeout_secs),
        )
    }

    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build prediction http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {api_key}"))?,
            );
        }
        Ok(headers)
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let res = self
            .http
            .post(self.url(path))
            .headers(self.headers()?)
            .json(body)
            .send()
            .await
            .map_err(|e| upstream("request", format!("{path}: {e}"), None))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read prediction service response")?;

        if !status.is_success() {
            return Err(upstream("http", format!("{path}: status={status}"), Some(text)).into());
        }

        decode(path, &text)
    }
}

fn decode<Resp: DeserializeOwned>(path: &str, text: &str) -> Result<Resp> {
    let raw_json = serde_json::from_str::<serde_json::Value>(text).map_err(|e| {
        upstream(
            "decode",
            format!("{path}: response is not JSON: {e}"),
            Some(text.to_string()),
        )
    })?;
    let parsed = serde_json::from_value::<Resp>(raw_json.clone()).map_err(|e| UpstreamError {
        service: Service::Prediction,
        stage: "decode",
        detail: format!("{path}: unexpected response shape: {e}"),
        raw_output: Some(text.to_string()),
        raw_response_json: Some(raw_json),
    })?;
    Ok(parsed)
}

fn upstream(stage: &'static str, detail: String, raw_output: Option<String>) -> UpstreamError {
    let raw_response_json = raw_output
        .as_deref()
        .and_then(|t| serde_json::from_str(t).ok());
    UpstreamError {
        service: Service::Prediction,
        stage,
        detail,
        raw_output,
        raw_response_json,
    }
}

fn validate_rent(estimate: RentEstimate) -> Result<RentEstimate> {
    if !estimate.estimated_rent.is_finite() || estimate.estimated_rent < 0.0 {
        return Err(upstream(
            "validate",
            format!("estimated_rent out of range: {}", estimate.estimated_rent),
            None,
        )
        .into());
    }
    Ok(estimate)
}

fn validate_churn(prediction: ChurnPrediction) -> Result<ChurnPrediction> {
    if !(0.0..=1.0).contains(&prediction.churn_probability) {
        return Err(upstream(
            "validate",
            format!(
                "churn_probability must be between 0 and 1 (got {})",
                prediction.churn_probability
            ),
            None,
        )
        .into());
    }
    Ok(prediction)
}

#[async_trait::async_trait]
impl PredictionClient for HttpPredictionClient {
    fn service_name(&self) -> &'static str {
        "http_prediction"
    }

    async fn predict_rent(&self, features: &RentFeatures) -> Result<RentEstimate> {
        let estimate = self.post_json(RENT_PATH, features).await?;
        validate_rent(estimate)
    }

    async fn predict_churn(&self, features: &ChurnFeatures) -> Result<ChurnPrediction> {
        let prediction = self.post_json(CHURN_PATH, features).await?;
        validate_churn(prediction)
    }
}
