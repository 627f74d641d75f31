use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

macro_rules! named_enum {
    ($name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ValidationError::UnknownName {
                        kind: $kind,
                        name: s.to_owned(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
pub enum ResourceKind {
    Cluster,
    ConsumerGroup,
    Topic,
    TransactionalId,
}

named_enum!(ResourceKind, "resource kind" {
    Cluster => "Cluster",
    ConsumerGroup => "ConsumerGroup",
    Topic => "Topic",
    TransactionalId => "TransactionalId",
});

/// How a resource name matches. `Unknown` is what a broker reports for a type it can't name.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
pub enum PatternType {
    Literal,
    Prefixed,
    Any,
    Unknown,
}

named_enum!(PatternType, "pattern type" {
    Literal => "Literal",
    Prefixed => "Prefixed",
    Any => "Any",
    Unknown => "Unknown",
});

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
pub enum AclOperation {
    Unknown,
    Any,
    All,
    Read,
    Write,
    Create,
    Delete,
    Alter,
    Describe,
    ClusterAction,
    DescribeConfigs,
    AlterConfigs,
    IdempotentWrite,
}

named_enum!(AclOperation, "operation" {
    Unknown => "Unknown",
    Any => "Any",
    All => "All",
    Read => "Read",
    Write => "Write",
    Create => "Create",
    Delete => "Delete",
    Alter => "Alter",
    Describe => "Describe",
    ClusterAction => "ClusterAction",
    DescribeConfigs => "DescribeConfigs",
    AlterConfigs => "AlterConfigs",
    IdempotentWrite => "IdempotentWrite",
});

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
pub enum AclPermission {
    Unknown,
    Any,
    Deny,
    Allow,
}

named_enum!(AclPermission, "permission type" {
    Unknown => "Unknown",
    Any => "Any",
    Deny => "Deny",
    Allow => "Allow",
});

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct AccessControlEntry {
    pub principal: String,
    pub host: String,
    pub operation: AclOperation,
    pub permission: AclPermission,
}

/// Identity of an ACL set. Two sets describe the same resource only when all three fields match.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
pub struct AclResource {
    pub kind: ResourceKind,
    pub name: String,
    pub pattern_type: PatternType,
}

impl AclResource {
    pub fn new(kind: ResourceKind, name: impl Into<String>, pattern_type: PatternType) -> Self {
        Self {
            kind,
            name: name.into(),
            pattern_type,
        }
    }

    pub fn describe_entry(&self, entry: &AccessControlEntry) -> String {
        format!(
            "Resource Type: {}, Resource Name: {}, Pattern Type: {}, Principal: {}, Operation: {}, Permission Type: {}, Host: {}",
            self.kind,
            self.name,
            self.pattern_type,
            entry.principal,
            entry.operation,
            entry.permission,
            entry.host
        )
    }
}

/// All entries bound to one resource. Entry order carries no meaning.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceAcls {
    #[serde(flatten)]
    pub resource: AclResource,
    pub entries: Vec<AccessControlEntry>,
}

impl ResourceAcls {
    pub fn new(resource: AclResource, entries: Vec<AccessControlEntry>) -> Self {
        Self { resource, entries }
    }

    pub fn contains(&self, entry: &AccessControlEntry) -> bool {
        self.entries.contains(entry)
    }

    pub fn has_same_entries(&self, other: &ResourceAcls) -> bool {
        self.entries.iter().all(|entry| other.contains(entry))
            && other.entries.iter().all(|entry| self.contains(entry))
    }
}

impl PartialEq for ResourceAcls {
    fn eq(&self, other: &Self) -> bool {
        self.resource == other.resource && self.has_same_entries(other)
    }
}

impl Eq for ResourceAcls {}

/// Groups flat bindings by resource identity, keeping the order resources were first seen in.
pub fn group_acl_bindings<I>(bindings: I) -> Vec<ResourceAcls>
where
    I: IntoIterator<Item = (AclResource, AccessControlEntry)>,
{
    let mut grouped: Vec<ResourceAcls> = vec![];
    for (resource, entry) in bindings {
        match grouped.iter_mut().find(|acls| acls.resource == resource) {
            Some(acls) => {
                if !acls.contains(&entry) {
                    acls.entries.push(entry)
                }
            }
            None => grouped.push(ResourceAcls::new(resource, vec![entry])),
        }
    }

    grouped
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct AclDiff {
    pub to_create: Vec<ResourceAcls>,
    pub to_delete: Vec<ResourceAcls>,
}

impl AclDiff {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }
}

/// Declarative ACL file layout: one list of resource groups per resource kind.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclsFile {
    #[serde(default)]
    pub cluster: Vec<AclGroup>,
    #[serde(default, alias = "consumergroup")]
    pub consumer_group: Vec<AclGroup>,
    #[serde(default)]
    pub topic: Vec<AclGroup>,
    #[serde(default)]
    pub transactional_id: Vec<AclGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclGroup {
    pub name: String,
    #[serde(
        default,
        alias = "resourcePatternType",
        alias = "resourcepatterntype",
        skip_serializing_if = "Option::is_none"
    )]
    pub pattern_type: Option<String>,
    #[serde(default, alias = "acls")]
    pub acl: Vec<AclDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclDefinition {
    pub principal: String,
    pub host: String,
    pub operation: String,
    #[serde(alias = "action", alias = "permissionType", alias = "permissiontype")]
    pub permission: String,
}

impl AclsFile {
    fn groups(&self) -> [(ResourceKind, &Vec<AclGroup>); 4] {
        [
            (ResourceKind::Cluster, &self.cluster),
            (ResourceKind::ConsumerGroup, &self.consumer_group),
            (ResourceKind::Topic, &self.topic),
            (ResourceKind::TransactionalId, &self.transactional_id),
        ]
    }

    fn groups_mut(&mut self, kind: ResourceKind) -> &mut Vec<AclGroup> {
        match kind {
            ResourceKind::Cluster => &mut self.cluster,
            ResourceKind::ConsumerGroup => &mut self.consumer_group,
            ResourceKind::Topic => &mut self.topic,
            ResourceKind::TransactionalId => &mut self.transactional_id,
        }
    }

    pub fn to_resource_acls(&self) -> Result<Vec<ResourceAcls>, ValidationError> {
        let mut resources = vec![];
        for (kind, groups) in self.groups() {
            for group in groups {
                let pattern_type = match group.pattern_type.as_deref() {
                    Some(pattern_type) => pattern_type.parse()?,
                    // Brokers store an unspecified pattern type as literal.
                    None => PatternType::Literal,
                };
                let entries = group
                    .acl
                    .iter()
                    .map(|definition| {
                        Ok(AccessControlEntry {
                            principal: definition.principal.clone(),
                            host: definition.host.clone(),
                            operation: definition.operation.parse()?,
                            permission: definition.permission.parse()?,
                        })
                    })
                    .collect::<Result<Vec<_>, ValidationError>>()?;

                resources.push(ResourceAcls::new(
                    AclResource::new(kind, group.name.clone(), pattern_type),
                    entries,
                ));
            }
        }

        Ok(resources)
    }

    pub fn from_resource_acls(resources: &[ResourceAcls]) -> Self {
        let mut file = AclsFile::default();
        for acls in resources {
            let pattern_type = match acls.resource.pattern_type {
                PatternType::Unknown => None,
                pattern_type => Some(pattern_type.to_string()),
            };
            let acl = acls
                .entries
                .iter()
                .map(|entry| AclDefinition {
                    principal: entry.principal.clone(),
                    host: entry.host.clone(),
                    operation: entry.operation.to_string(),
                    permission: entry.permission.to_string(),
                })
                .collect();

            file.groups_mut(acls.resource.kind).push(AclGroup {
                name: acls.resource.name.clone(),
                pattern_type,
                acl,
            });
        }

        file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(principal: &str, operation: AclOperation) -> AccessControlEntry {
        AccessControlEntry {
            principal: principal.to_owned(),
            host: "*".to_owned(),
            operation,
            permission: AclPermission::Allow,
        }
    }

    #[test]
    fn file_form_round_trips_every_resource_kind() {
        let resources = vec![
            ResourceAcls::new(
                AclResource::new(ResourceKind::Cluster, "kafka-cluster", PatternType::Literal),
                vec![entry("User:admin", AclOperation::ClusterAction)],
            ),
            ResourceAcls::new(
                AclResource::new(ResourceKind::ConsumerGroup, "billing-", PatternType::Prefixed),
                vec![entry("User:billing", AclOperation::Read)],
            ),
            ResourceAcls::new(
                AclResource::new(ResourceKind::Topic, "payments", PatternType::Literal),
                vec![
                    entry("User:billing", AclOperation::Read),
                    entry("User:gateway", AclOperation::Write),
                ],
            ),
            ResourceAcls::new(
                AclResource::new(ResourceKind::TransactionalId, "tx-1", PatternType::Literal),
                vec![entry("User:gateway", AclOperation::Write)],
            ),
        ];

        let file = AclsFile::from_resource_acls(&resources);

        assert_eq!(file.topic[0].pattern_type.as_deref(), Some("Literal"));
        assert_eq!(file.to_resource_acls().unwrap(), resources);
    }

    #[test]
    fn missing_pattern_type_is_literal() {
        let file = AclsFile {
            topic: vec![AclGroup {
                name: "payments".to_owned(),
                pattern_type: None,
                acl: vec![AclDefinition {
                    principal: "User:billing".to_owned(),
                    host: "*".to_owned(),
                    operation: "Read".to_owned(),
                    permission: "Allow".to_owned(),
                }],
            }],
            ..Default::default()
        };

        let resources = file.to_resource_acls().unwrap();

        assert_eq!(resources[0].resource.pattern_type, PatternType::Literal);
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let file = AclsFile {
            topic: vec![AclGroup {
                name: "payments".to_owned(),
                pattern_type: None,
                acl: vec![AclDefinition {
                    principal: "User:billing".to_owned(),
                    host: "*".to_owned(),
                    operation: "Fly".to_owned(),
                    permission: "Allow".to_owned(),
                }],
            }],
            ..Default::default()
        };

        let error = file.to_resource_acls().unwrap_err();

        assert!(matches!(
            error,
            ValidationError::UnknownName { kind: "operation", .. }
        ));
    }

    #[test]
    fn bindings_are_grouped_in_first_seen_order() {
        let payments = AclResource::new(ResourceKind::Topic, "payments", PatternType::Literal);
        let orders = AclResource::new(ResourceKind::Topic, "orders", PatternType::Literal);

        let grouped = group_acl_bindings(vec![
            (payments.clone(), entry("User:a", AclOperation::Read)),
            (orders.clone(), entry("User:a", AclOperation::Read)),
            (payments.clone(), entry("User:b", AclOperation::Write)),
            (payments.clone(), entry("User:a", AclOperation::Read)),
        ]);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].resource, payments);
        assert_eq!(grouped[0].entries.len(), 2);
        assert_eq!(grouped[1].resource, orders);
    }

    #[test]
    fn entry_order_does_not_matter_for_equality() {
        let resource = AclResource::new(ResourceKind::Topic, "payments", PatternType::Literal);
        let left = ResourceAcls::new(
            resource.clone(),
            vec![entry("User:a", AclOperation::Read), entry("User:b", AclOperation::Write)],
        );
        let right = ResourceAcls::new(
            resource,
            vec![entry("User:b", AclOperation::Write), entry("User:a", AclOperation::Read)],
        );

        assert_eq!(left, right);
    }
}
