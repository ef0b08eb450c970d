//! JSON/REST client for a hosted regulatory prediction service.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use oncoreg_common::config::ModelConfig;

use crate::capability::{BatchRequest, ModelError, RegulatoryModel, VariantOutcome};

// ── Response check helper ─────────────────────────────────────────────────────

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, ModelError> {
    let status = resp.status().as_u16();
    if status == 429 {
        return Err(ModelError::RateLimitExceeded);
    }
    let body: serde_json::Value = resp.json().await?;
    if status >= 400 {
        let msg = body["error"]["message"]
            .as_str()
            .or_else(|| body["message"].as_str())
            .unwrap_or("unknown API error")
            .to_string();
        return Err(ModelError::ApiError { status, message: msg });
    }
    Ok(body)
}

// ── HTTP client ───────────────────────────────────────────────────────────────

/// Client for the `POST {endpoint}/v1/score` batch scoring API.
pub struct HttpRegulatoryModel {
    pub base_url: String,
    model: String,
    api_key: Option<String>,
    max_batch: usize,
    client: reqwest::Client,
}

impl HttpRegulatoryModel {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent("oncoreg/0.1")
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            model: "regulatory-lfc-v1".to_string(),
            api_key,
            max_batch: 256,
            client,
        })
    }

    /// Build a client from the pipeline configuration, resolving the API key
    /// through its environment fallback.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ModelError> {
        Self::new(
            config.endpoint.clone(),
            config.resolved_api_key(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Select a served model version other than the default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Cap batch sizes below the service default of 256.
    pub fn with_max_batch_size(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch.max(1);
        self
    }
}

#[async_trait]
impl RegulatoryModel for HttpRegulatoryModel {
    async fn predict_batch(&self, batch: BatchRequest) -> Result<Vec<VariantOutcome>, ModelError> {
        let url = format!("{}/v1/score", self.base_url.trim_end_matches('/'));
        let expected = batch.items.len();
        let body = serde_json::json!({
            "model":            &self.model,
            "reference_tissue": &batch.reference_tissue,
            "variants":         &batch.items,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.header("x-api-key", key);
        }

        let resp = request.send().await?;
        let json = check_response_status(resp).await?;

        let results: Vec<VariantOutcome> = serde_json::from_value(json["results"].clone())?;
        if results.len() != expected {
            return Err(ModelError::ShapeMismatch { expected, got: results.len() });
        }
        debug!(n = results.len(), tissue = %batch.reference_tissue, "Batch scored");
        Ok(results)
    }

    fn model_id(&self) -> &str { &self.model }
    fn max_batch_size(&self) -> usize { self.max_batch }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
