use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::{HealthGovResponse, KnowledgeEntry, KnowledgeResults, MedlineResponse};

/// Looks a query up in the medical catalogs the assistant quotes from.
#[async_trait]
pub trait MedicalKnowledge: Send + Sync {
    async fn search(&self, query: &str) -> KnowledgeResults;
}

/// MedlinePlus and Health.gov search endpoints over HTTP.
pub struct HttpMedicalKnowledge {
    client: Client,
    medline_url: String,
    medline_key: String,
    health_gov_url: String,
}

impl HttpMedicalKnowledge {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.chatbot_timeout())
            .build()
            .context("failed to build medical knowledge HTTP client")?;

        Ok(Self {
            client,
            medline_url: config.medline_api_url.clone(),
            medline_key: config.medline_api_key.clone(),
            health_gov_url: config.healthgov_api_url.clone(),
        })
    }

    async fn search_medline_plus(&self, query: &str) -> Result<Vec<KnowledgeEntry>> {
        if self.medline_url.is_empty() {
            return Err(anyhow!("MedlinePlus API not configured"));
        }

        let response = self
            .client
            .get(&self.medline_url)
            .query(&[("query", query)])
            .header("API-Key", &self.medline_key)
            .header(header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Error from MedlinePlus API: {}", status));
        }

        let body: MedlineResponse = response.json().await?;
        Ok(body
            .result
            .into_iter()
            .map(|hit| KnowledgeEntry {
                title: hit.title,
                summary: hit.snippet,
                url: hit.url,
            })
            .collect())
    }

    async fn search_health_gov(&self, query: &str) -> Result<Vec<KnowledgeEntry>> {
        if self.health_gov_url.is_empty() {
            return Err(anyhow!("Health.gov API not configured"));
        }

        let response = self
            .client
            .get(&self.health_gov_url)
            .query(&[("query", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Error from Health.gov API: {}", status));
        }

        let body: HealthGovResponse = response.json().await?;
        Ok(body
            .items
            .into_iter()
            .map(|item| KnowledgeEntry {
                title: item.title,
                summary: item.description,
                url: item.url,
            })
            .collect())
    }
}

#[async_trait]
impl MedicalKnowledge for HttpMedicalKnowledge {
    async fn search(&self, query: &str) -> KnowledgeResults {
        debug!("Searching medical catalogs for: {}", query);

        let (medline, health_gov) =
            tokio::join!(self.search_medline_plus(query), self.search_health_gov(query));

        KnowledgeResults {
            medline_plus: medline
                .map_err(|e| warn!("MedlinePlus lookup failed: {}", e))
                .ok(),
            health_gov: health_gov
                .map_err(|e| warn!("Health.gov lookup failed: {}", e))
                .ok(),
        }
    }
}
