use anyhow::Context;
use config::Config;
use kafka_control::models::{AclsFile, ResourceAcls, Topic, TopicsFile};
use serde::de::DeserializeOwned;
use tracing::info;

/// Reads a desired-state file. The format follows the extension (yaml, json, toml...).
fn load_file<T: DeserializeOwned>(path: &str) -> Result<T, anyhow::Error> {
    Config::builder()
        .add_source(config::File::with_name(path))
        .build()
        .with_context(|| format!("While reading {}", path))?
        .try_deserialize()
        .with_context(|| format!("While deserializing {}", path))
}

pub fn load_acls_file(path: &str) -> Result<Vec<ResourceAcls>, anyhow::Error> {
    let file: AclsFile = load_file(path)?;
    let acls = file
        .to_resource_acls()
        .with_context(|| format!("While converting ACLs from {}", path))?;
    info!("Loaded {} ACL resources from {}", acls.len(), path);

    Ok(acls)
}

pub fn load_topics_file(path: &str) -> Result<Vec<Topic>, anyhow::Error> {
    let file: TopicsFile = load_file(path)?;
    info!("Loaded {} topics from {}", file.topics.len(), path);

    Ok(file.topics)
}
