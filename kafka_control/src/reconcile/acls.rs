use crate::models::{AccessControlEntry, AclDiff, AclResource, ResourceAcls, ResourceKind};
use crate::reconcile::{diff, Matched, Reconcilable};
use std::collections::HashSet;
use std::convert::Infallible;
use tracing::warn;

impl Reconcilable for ResourceAcls {
    type Key = AclResource;
    type Alteration = Infallible;

    fn key(&self) -> Self::Key {
        self.resource.clone()
    }

    fn merge(&mut self, other: Self) {
        for entry in other.entries {
            if !self.contains(&entry) {
                self.entries.push(entry)
            }
        }
    }

    fn reconcile(desired: &Self, existing: &Self) -> Matched<Self, Infallible> {
        if desired.has_same_entries(existing) {
            return Matched::unchanged();
        }

        let to_create = missing_entries(desired, existing);
        let to_delete = missing_entries(existing, desired);

        Matched {
            create: fragment(&desired.resource, to_create),
            delete: fragment(&existing.resource, to_delete),
            alter: None,
        }
    }
}

fn missing_entries(from: &ResourceAcls, other: &ResourceAcls) -> Vec<AccessControlEntry> {
    from.entries
        .iter()
        .filter(|entry| !other.contains(entry))
        .cloned()
        .collect()
}

fn fragment(resource: &AclResource, entries: Vec<AccessControlEntry>) -> Option<ResourceAcls> {
    if entries.is_empty() {
        return None;
    }

    Some(ResourceAcls::new(resource.clone(), entries))
}

pub fn diff_acls(desired: &[ResourceAcls], existing: &[ResourceAcls]) -> AclDiff {
    let reconciliation = diff(desired, existing);

    AclDiff {
        to_create: reconciliation.to_create,
        to_delete: reconciliation.to_delete,
    }
}

/// Describes the first entry declared twice for the same resource kind and name.
/// Pattern type isn't part of the comparison.
pub fn find_duplicate_acl(resources: &[ResourceAcls]) -> Option<String> {
    let mut seen: HashSet<(ResourceKind, &str, &AccessControlEntry)> = HashSet::new();
    for acls in resources {
        for entry in &acls.entries {
            if !seen.insert((acls.resource.kind, acls.resource.name.as_str(), entry)) {
                return Some(acls.resource.describe_entry(entry));
            }
        }
    }

    None
}

pub fn validate_acls(resources: &[ResourceAcls]) -> bool {
    match find_duplicate_acl(resources) {
        Some(duplicate) => {
            warn!("Duplicate ACL: {}", duplicate);
            false
        }
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AclOperation, AclPermission, PatternType};

    fn entry(principal: &str, operation: AclOperation) -> AccessControlEntry {
        AccessControlEntry {
            principal: principal.to_owned(),
            host: "*".to_owned(),
            operation,
            permission: AclPermission::Allow,
        }
    }

    fn topic_acls(
        name: &str,
        pattern_type: PatternType,
        entries: Vec<AccessControlEntry>,
    ) -> ResourceAcls {
        ResourceAcls::new(
            AclResource::new(ResourceKind::Topic, name, pattern_type),
            entries,
        )
    }

    fn fixture() -> Vec<ResourceAcls> {
        vec![
            topic_acls(
                "payments",
                PatternType::Literal,
                vec![
                    entry("User:billing", AclOperation::Read),
                    entry("User:gateway", AclOperation::Write),
                ],
            ),
            topic_acls(
                "orders",
                PatternType::Literal,
                vec![entry("User:shop", AclOperation::Write)],
            ),
            ResourceAcls::new(
                AclResource::new(ResourceKind::ConsumerGroup, "billing", PatternType::Literal),
                vec![entry("User:billing", AclOperation::Read)],
            ),
        ]
    }

    #[test]
    fn identical_sets_produce_empty_diff() {
        let diff = diff_acls(&fixture(), &fixture());

        assert!(diff.is_empty());
    }

    #[test]
    fn removed_resource_is_deleted() {
        let existing = fixture();
        let desired = vec![existing[0].clone(), existing[2].clone()];

        let diff = diff_acls(&desired, &existing);

        assert!(diff.to_create.is_empty());
        assert_eq!(diff.to_delete, vec![existing[1].clone()]);
    }

    #[test]
    fn pattern_type_change_replaces_whole_set() {
        let existing = fixture();
        let mut desired = existing.clone();
        desired[1].resource.pattern_type = PatternType::Prefixed;

        let diff = diff_acls(&desired, &existing);

        assert_eq!(diff.to_create, vec![desired[1].clone()]);
        assert_eq!(diff.to_delete, vec![existing[1].clone()]);
    }

    #[test]
    fn entry_changes_produce_fragments() {
        let existing = fixture();
        let mut desired = existing.clone();
        desired[0].entries = vec![
            entry("User:billing", AclOperation::Read),
            entry("User:audit", AclOperation::Describe),
        ];

        let diff = diff_acls(&desired, &existing);

        assert_eq!(
            diff.to_create,
            vec![topic_acls(
                "payments",
                PatternType::Literal,
                vec![entry("User:audit", AclOperation::Describe)]
            )]
        );
        assert_eq!(
            diff.to_delete,
            vec![topic_acls(
                "payments",
                PatternType::Literal,
                vec![entry("User:gateway", AclOperation::Write)]
            )]
        );
    }

    #[test]
    fn emptied_set_deletes_all_entries() {
        let existing = fixture();
        let mut desired = existing.clone();
        desired[1].entries.clear();

        let diff = diff_acls(&desired, &existing);

        assert!(diff.to_create.is_empty());
        assert_eq!(diff.to_delete, vec![existing[1].clone()]);
    }

    #[test]
    fn split_declarations_of_one_resource_are_merged() {
        let existing = fixture();
        let mut desired = existing.clone();
        let gateway = desired[0].entries.pop().unwrap();
        desired.push(topic_acls("payments", PatternType::Literal, vec![gateway]));

        let diff = diff_acls(&desired, &existing);

        assert!(diff.is_empty());
    }

    #[test]
    fn duplicate_entries_fail_validation() {
        let mut resources = fixture();
        resources.push(topic_acls(
            "payments",
            PatternType::Prefixed,
            vec![entry("User:billing", AclOperation::Read)],
        ));

        assert!(!validate_acls(&resources));
        assert!(find_duplicate_acl(&resources)
            .unwrap()
            .contains("Principal: User:billing"));
    }

    #[test]
    fn same_entry_on_different_kinds_is_valid() {
        let resources = vec![
            ResourceAcls::new(
                AclResource::new(ResourceKind::Topic, "billing", PatternType::Literal),
                vec![entry("User:billing", AclOperation::Read)],
            ),
            ResourceAcls::new(
                AclResource::new(ResourceKind::ConsumerGroup, "billing", PatternType::Literal),
                vec![entry("User:billing", AclOperation::Read)],
            ),
        ];

        assert!(validate_acls(&resources));
    }
}
