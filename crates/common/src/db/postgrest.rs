//! PostgREST client for the hosted case table
//!
//! Talks to `{url}/rest/v1/{table}` with the project's anonymous key. Only
//! reads are issued.

use super::{CaseQuery, CaseStore};
use crate::config::StorageConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::record::CaseRecord;
use async_trait::async_trait;
use std::time::Instant;

pub struct PostgrestStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl PostgrestStore {
    /// Create a new client for the configured table
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/rest/v1/{}",
                config.url.trim_end_matches('/'),
                config.table
            ),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn make_request(&self, query: &CaseQuery) -> Result<Vec<CaseRecord>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&query.to_params())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    AppError::StorageUnavailable {
                        message: e.to_string(),
                    }
                } else {
                    AppError::HttpClient(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response.json::<Vec<CaseRecord>>().await?)
    }
}

#[async_trait]
impl CaseStore for PostgrestStore {
    async fn fetch(&self, query: &CaseQuery) -> Result<Vec<CaseRecord>> {
        let start = Instant::now();
        let result = self.make_request(query).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(rows) => {
                tracing::debug!(
                    rows = rows.len(),
                    latency_ms = elapsed.as_millis() as u64,
                    "Storage query completed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    latency_ms = elapsed.as_millis() as u64,
                    "Storage query failed"
                );
            }
        }
        metrics::record_storage_query(elapsed.as_secs_f64(), self.name(), result.is_ok());

        result
    }

    async fn ping(&self) -> Result<()> {
        self.fetch(&CaseQuery::new().range(0, 0)).await.map(|_| ())
    }

    fn name(&self) -> &'static str {
        "postgrest"
    }
}
