//! Sources of policy records.
//!
//! The controller only sees the [`PolicyStore`] trait: something that returns
//! the full record list, or a coarser profile-based subset of it, or fails.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue, AUTHORIZATION};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::types::{PolicyRecord, SearchCriteria};

#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Every policy record
    async fn fetch_all(&self) -> Result<Vec<PolicyRecord>>;

    /// Records whose description or eligibility mentions the profession.
    /// Without a profession this is the same as [`PolicyStore::fetch_all`].
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<PolicyRecord>>;
}

fn profession_term(criteria: &SearchCriteria) -> Option<&str> {
    criteria
        .profession
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
}

/// Store backed by a vector held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryPolicyStore {
    records: Vec<PolicyRecord>,
}

impl MemoryPolicyStore {
    pub fn new(records: Vec<PolicyRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[PolicyRecord] {
        &self.records
    }

    /// Case-insensitive substring match, like `ilike '%term%'`
    fn matching(&self, criteria: &SearchCriteria) -> Vec<PolicyRecord> {
        let term = match profession_term(criteria) {
            Some(term) => term.to_lowercase(),
            None => return self.records.clone(),
        };
        self.records
            .iter()
            .filter(|r| {
                r.description.to_lowercase().contains(&term)
                    || r.eligibility.to_lowercase().contains(&term)
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn fetch_all(&self) -> Result<Vec<PolicyRecord>> {
        Ok(self.records.clone())
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<PolicyRecord>> {
        Ok(self.matching(criteria))
    }
}

/// Store that reads a JSON array of records from disk on every request
#[derive(Debug, Clone)]
pub struct FilePolicyStore {
    path: PathBuf,
}

impl FilePolicyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<MemoryPolicyStore> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let records: Vec<PolicyRecord> = serde_json::from_str(&contents)?;
        tracing::debug!(path = %self.path.display(), count = records.len(), "loaded policy file");
        Ok(MemoryPolicyStore::new(records))
    }
}

#[async_trait]
impl PolicyStore for FilePolicyStore {
    async fn fetch_all(&self) -> Result<Vec<PolicyRecord>> {
        self.load().await?.fetch_all().await
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<PolicyRecord>> {
        self.load().await?.search(criteria).await
    }
}

/// Store backed by a hosted table exposed through a PostgREST-style API
#[derive(Debug, Clone)]
pub struct HttpPolicyStore {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPolicyStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let invalid = |_: InvalidHeaderValue| Error::Config("API key contains invalid header characters".to_string());
            headers.insert("apikey", HeaderValue::from_str(key).map_err(invalid)?);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key)).map_err(invalid)?,
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        let endpoint = format!(
            "{}/rest/v1/{}",
            config.base_url.as_str().trim_end_matches('/'),
            config.table
        );
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get(&self, query: &[(&str, String)]) -> Result<Vec<PolicyRecord>> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(query)
            .send()
            .await
            .map_err(|source| Error::Http {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|source| Error::Http {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        if !status.is_success() {
            tracing::warn!(endpoint = %self.endpoint, status = status.as_u16(), "policy store rejected request");
            return Err(Error::Api {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let records: Vec<PolicyRecord> = serde_json::from_str(&body)?;
        tracing::debug!(endpoint = %self.endpoint, count = records.len(), "fetched policies");
        Ok(records)
    }
}

#[async_trait]
impl PolicyStore for HttpPolicyStore {
    async fn fetch_all(&self) -> Result<Vec<PolicyRecord>> {
        self.get(&[("select", "*".to_string())]).await
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<PolicyRecord>> {
        let term = match profession_term(criteria) {
            Some(term) => term,
            None => return self.fetch_all().await,
        };
        // PostgREST reserves these inside or=(...) filters
        let term: String = term.chars().filter(|c| !matches!(c, ',' | '(' | ')')).collect();
        let filter = format!(
            "(description.ilike.%{term}%,eligibility.ilike.%{term}%)",
            term = term
        );
        self.get(&[("select", "*".to_string()), ("or", filter)]).await
    }
}
