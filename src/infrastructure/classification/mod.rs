use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::error::{AppError, Result};
use crate::domain::naics::{AnalysisQuery, RelevantSectorSet, SectorGroups};
use crate::infrastructure::response::retain_two_digit_codes;

/// Maps a business description to the sectors worth counting.
#[async_trait]
pub trait ClassificationGateway {
    async fn classify(&self, query: &AnalysisQuery) -> Result<RelevantSectorSet>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest<'a> {
    pub user_description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_threshold: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResponse {
    #[serde(default)]
    pub relevant_two_digit_codes: Vec<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Calls a remote `relevant-naics` endpoint.
pub struct HttpClassificationGateway {
    client: reqwest::Client,
    endpoint: String,
    groups: SectorGroups,
}

impl HttpClassificationGateway {
    pub fn new(endpoint: impl Into<String>, timeout: Duration, groups: SectorGroups) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            groups,
        })
    }
}

#[async_trait]
impl ClassificationGateway for HttpClassificationGateway {
    async fn classify(&self, query: &AnalysisQuery) -> Result<RelevantSectorSet> {
        let body = ClassifyRequest {
            user_description: &query.description,
            size_threshold: Some(query.size_threshold),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Classification(format!("Request timed out: {}", e))
                } else {
                    AppError::Classification(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            AppError::Classification(format!("Failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            warn!(status = %status, "Classification gateway returned an error");
            return Err(AppError::Classification(error_message(&text)));
        }

        let codes = parse_classify_response(&text)?;
        debug!(codes = ?codes, "Classification gateway responded");
        Ok(RelevantSectorSet::from_codes(codes, &self.groups))
    }
}

/// Prefer the `error` field of a JSON error body, else the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Decode a success body into its two-digit codes.
pub fn parse_classify_response(body: &str) -> Result<Vec<String>> {
    let response: ClassifyResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Classification(format!("Unparseable response: {}", e)))?;
    Ok(retain_two_digit_codes(response.relevant_two_digit_codes))
}
