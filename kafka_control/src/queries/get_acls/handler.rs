use crate::cluster::KafkaCluster;
use crate::models::ResourceAcls;
use anyhow::Context;
use tracing::info;

#[tracing::instrument(skip_all)]
pub async fn get_acls(cluster: &dyn KafkaCluster) -> Result<Vec<ResourceAcls>, anyhow::Error> {
    let acls = cluster.list_acls().await.context("While listing ACLs")?;
    info!("Found ACLs for {} resources", acls.len());

    Ok(acls)
}
