use anyhow::Context;
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

/// Lookup of writer schemas by registry id.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn schema_by_id(&self, id: u32) -> Result<String, anyhow::Error>;
}

/// Browsing the registry by subject.
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    async fn subjects(&self) -> Result<Vec<String>, anyhow::Error>;

    /// Latest registered version of the subject.
    async fn schema_by_subject(&self, subject: &str) -> Result<SubjectSchema, anyhow::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSchema {
    pub subject: String,
    pub version: i32,
    pub id: u32,
    pub schema: String,
}

#[derive(Deserialize)]
struct SchemaResponse {
    schema: String,
}

/// Confluent compatible schema registry client. Schemas never change for a given id,
/// so each one is fetched once.
pub struct SchemaRegistry {
    client: reqwest::Client,
    base_url: String,
    cache: Mutex<HashMap<u32, String>>,
}

impl SchemaRegistry {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("While creating schema registry http client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, anyhow::Error> {
        self.client
            .get(url)
            .send()
            .await
            .with_context(|| format!("While requesting {}", url))?
            .error_for_status()
            .with_context(|| format!("Schema registry rejected {}", url))?
            .json()
            .await
            .with_context(|| format!("While parsing response of {}", url))
    }
}

/// `{base}/subjects/{subject}/versions/latest` with the subject escaped as one path segment.
fn latest_version_url(base_url: &str, subject: &str) -> Result<Url, anyhow::Error> {
    let mut url = Url::parse(base_url)
        .with_context(|| format!("Invalid schema registry url {}", base_url))?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("Schema registry url {} can't have a path", base_url))?
        .pop_if_empty()
        .extend(["subjects", subject, "versions", "latest"]);

    Ok(url)
}

#[async_trait]
impl SchemaCatalog for SchemaRegistry {
    async fn subjects(&self) -> Result<Vec<String>, anyhow::Error> {
        let url = format!("{}/subjects", self.base_url);
        self.get_json(&url).await
    }

    async fn schema_by_subject(&self, subject: &str) -> Result<SubjectSchema, anyhow::Error> {
        let url = latest_version_url(&self.base_url, subject)?;
        let schema: SubjectSchema = self.get_json(url.as_str()).await?;
        info!("Retrieved schema {} version {} of subject {}", schema.id, schema.version, subject);

        Ok(schema)
    }
}

#[async_trait]
impl SchemaSource for SchemaRegistry {
    async fn schema_by_id(&self, id: u32) -> Result<String, anyhow::Error> {
        let mut cache = self.cache.lock().await;
        if let Some(schema) = cache.get(&id) {
            return Ok(schema.clone());
        }

        let url = format!("{}/schemas/ids/{}", self.base_url, id);
        let response: SchemaResponse = self.get_json(&url).await?;

        info!("Retrieved schema with id {}", id);
        cache.insert(id, response.schema.clone());

        Ok(response.schema)
    }
}
