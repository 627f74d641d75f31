use crate::cluster::KafkaCluster;
use crate::error::ValidationError;
use crate::models::{AclDiff, ResourceAcls};
use crate::queries::get_acls::get_acls;
use crate::reconcile::{diff_acls, find_duplicate_acl};
use tracing::info;

/// Validates the desired ACLs and compares them with the ACLs on the cluster.
#[tracing::instrument(skip_all)]
pub async fn get_acls_diff(
    cluster: &dyn KafkaCluster,
    desired: &[ResourceAcls],
) -> Result<AclDiff, anyhow::Error> {
    if let Some(duplicate) = find_duplicate_acl(desired) {
        return Err(ValidationError::DuplicateAcl(duplicate).into());
    }

    let existing = get_acls(cluster).await?;
    let diff = diff_acls(desired, &existing);
    info!(
        "ACL sets to create: {}, to delete: {}",
        diff.to_create.len(),
        diff.to_delete.len()
    );

    Ok(diff)
}
