use crate::cluster::KafkaCluster;
use crate::models::AclDiff;
use anyhow::Context;
use tracing::{info, warn};

/// Deletes then creates, one broker call per entry. The first failure stops the run,
/// changes made before it stay in place.
#[tracing::instrument(skip_all)]
pub async fn apply_acls_diff(cluster: &dyn KafkaCluster, diff: &AclDiff) -> Result<(), anyhow::Error> {
    for acls in &diff.to_delete {
        for entry in &acls.entries {
            let description = acls.resource.describe_entry(entry);
            let deleted = cluster
                .delete_acl(&acls.resource, entry)
                .await
                .with_context(|| format!("While deleting ACL {}", description))?;

            if deleted == 0 {
                warn!("No ACL could be matched by the filter, no ACL was deleted. {}", description);
            } else {
                info!("Deleted ACL: {}", description);
            }
        }
    }

    for acls in &diff.to_create {
        for entry in &acls.entries {
            let description = acls.resource.describe_entry(entry);
            cluster
                .create_acl(&acls.resource, entry)
                .await
                .with_context(|| format!("While creating ACL {}", description))?;

            info!("Created ACL: {}", description);
        }
    }

    Ok(())
}
