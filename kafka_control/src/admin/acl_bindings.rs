//! ACL administration. rdkafka has no safe wrapper for the ACL admin API yet,
//! so these functions drive librdkafka directly through `rdkafka::bindings`.
//! Every function blocks until the broker answers or the timeout passes.

use crate::admin::AdminWrapper;
use crate::models::{
    AccessControlEntry, AclOperation, AclPermission, AclResource, PatternType, ResourceKind,
};
use anyhow::{bail, Context};
use rdkafka::bindings as rdsys;
use rdkafka::bindings::{
    rd_kafka_AclOperation_t as NativeOperation, rd_kafka_AclPermissionType_t as NativePermission,
    rd_kafka_ResourcePatternType_t as NativePatternType,
    rd_kafka_ResourceType_t as NativeResourceType,
};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::time::Duration;
use tracing::{debug, warn};

const ERROR_BUFFER_SIZE: usize = 512;

struct Queue(*mut rdsys::rd_kafka_queue_t);

impl Drop for Queue {
    fn drop(&mut self) {
        unsafe { rdsys::rd_kafka_queue_destroy(self.0) }
    }
}

struct Event(*mut rdsys::rd_kafka_event_t);

impl Drop for Event {
    fn drop(&mut self) {
        unsafe { rdsys::rd_kafka_event_destroy(self.0) }
    }
}

struct Options(*mut rdsys::rd_kafka_AdminOptions_t);

impl Drop for Options {
    fn drop(&mut self) {
        unsafe { rdsys::rd_kafka_AdminOptions_destroy(self.0) }
    }
}

/// Owned binding or binding filter, both share the same native type.
struct Binding(*mut rdsys::rd_kafka_AclBinding_t);

impl Drop for Binding {
    fn drop(&mut self) {
        unsafe { rdsys::rd_kafka_AclBinding_destroy(self.0) }
    }
}

#[derive(Copy, Clone)]
enum BindingKind {
    Binding,
    Filter,
}

struct Request {
    client: *mut rdsys::rd_kafka_t,
    queue: Queue,
    options: Options,
    timeout: Duration,
}

impl Request {
    fn new(admin: &AdminWrapper) -> Result<Self, anyhow::Error> {
        let client = admin.inner().native_ptr();
        let queue = Queue(unsafe { rdsys::rd_kafka_queue_new(client) });
        let options = Options(unsafe {
            rdsys::rd_kafka_AdminOptions_new(client, rdsys::rd_kafka_admin_op_t::RD_KAFKA_ADMIN_OP_ANY)
        });

        let timeout = admin.operation_timeout();
        let mut error_buffer = [0 as c_char; ERROR_BUFFER_SIZE];
        let code = unsafe {
            rdsys::rd_kafka_AdminOptions_set_request_timeout(
                options.0,
                timeout_millis(timeout),
                error_buffer.as_mut_ptr(),
                ERROR_BUFFER_SIZE,
            )
        };
        if code != rdsys::rd_kafka_resp_err_t::RD_KAFKA_RESP_ERR_NO_ERROR {
            bail!(
                "Invalid admin request timeout: {}",
                unsafe { c_string(error_buffer.as_ptr()) }
            )
        }

        Ok(Self {
            client,
            queue,
            options,
            timeout,
        })
    }

    fn wait(&self, operation: &str) -> Result<Event, anyhow::Error> {
        // Leave the broker side timeout some room to report first.
        let poll_timeout = self.timeout + Duration::from_secs(1);
        let event = unsafe { rdsys::rd_kafka_queue_poll(self.queue.0, timeout_millis(poll_timeout)) };
        if event.is_null() {
            bail!("Timed out waiting for {} result", operation)
        }

        let event = Event(event);
        let code = unsafe { rdsys::rd_kafka_event_error(event.0) };
        if code != rdsys::rd_kafka_resp_err_t::RD_KAFKA_RESP_ERR_NO_ERROR {
            let message = unsafe { c_string(rdsys::rd_kafka_event_error_string(event.0)) };
            bail!("{} failed: {}", operation, message)
        }

        Ok(event)
    }
}

pub fn describe_acls(
    admin: &AdminWrapper,
) -> Result<Vec<(AclResource, AccessControlEntry)>, anyhow::Error> {
    let filter = match_all_filter()?;
    let request = Request::new(admin)?;
    unsafe {
        rdsys::rd_kafka_DescribeAcls(
            request.client,
            filter.0,
            request.options.0,
            request.queue.0,
        )
    };

    let event = request.wait("DescribeAcls")?;
    let result = unsafe { rdsys::rd_kafka_event_DescribeAcls_result(event.0) };
    if result.is_null() {
        bail!("Unexpected event type for DescribeAcls")
    }

    let mut count = 0;
    let acls = unsafe { rdsys::rd_kafka_DescribeAcls_result_acls(result, &mut count) };
    let mut bindings = Vec::with_capacity(count);
    for index in 0..count {
        let acl = unsafe { *acls.add(index) };
        match unsafe { read_binding(acl) } {
            Some(binding) => bindings.push(binding),
            None => warn!("Skipping ACL bound to an unsupported resource type"),
        }
    }

    debug!("Described {} ACL bindings", bindings.len());
    Ok(bindings)
}

pub fn create_acl(
    admin: &AdminWrapper,
    resource: &AclResource,
    entry: &AccessControlEntry,
) -> Result<(), anyhow::Error> {
    let binding = new_binding(resource, entry, BindingKind::Binding)?;
    let request = Request::new(admin)?;
    let mut bindings = [binding.0];
    unsafe {
        rdsys::rd_kafka_CreateAcls(
            request.client,
            bindings.as_mut_ptr(),
            bindings.len(),
            request.options.0,
            request.queue.0,
        )
    };

    let event = request.wait("CreateAcls")?;
    let result = unsafe { rdsys::rd_kafka_event_CreateAcls_result(event.0) };
    if result.is_null() {
        bail!("Unexpected event type for CreateAcls")
    }

    let mut count = 0;
    let results = unsafe { rdsys::rd_kafka_CreateAcls_result_acls(result, &mut count) };
    for index in 0..count {
        let error = unsafe { rdsys::rd_kafka_acl_result_error(*results.add(index)) };
        if !error.is_null() {
            let message = unsafe { c_string(rdsys::rd_kafka_error_string(error)) };
            bail!("Broker rejected ACL: {}", message)
        }
    }

    Ok(())
}

/// Deletes every binding matching the entry exactly and returns how many were removed.
pub fn delete_acl(
    admin: &AdminWrapper,
    resource: &AclResource,
    entry: &AccessControlEntry,
) -> Result<usize, anyhow::Error> {
    let filter = new_binding(resource, entry, BindingKind::Filter)?;
    let request = Request::new(admin)?;
    let mut filters = [filter.0];
    unsafe {
        rdsys::rd_kafka_DeleteAcls(
            request.client,
            filters.as_mut_ptr(),
            filters.len(),
            request.options.0,
            request.queue.0,
        )
    };

    let event = request.wait("DeleteAcls")?;
    let result = unsafe { rdsys::rd_kafka_event_DeleteAcls_result(event.0) };
    if result.is_null() {
        bail!("Unexpected event type for DeleteAcls")
    }

    let mut count = 0;
    let responses = unsafe { rdsys::rd_kafka_DeleteAcls_result_responses(result, &mut count) };
    let mut deleted = 0;
    for index in 0..count {
        let response = unsafe { *responses.add(index) };
        let error = unsafe { rdsys::rd_kafka_DeleteAcls_result_response_error(response) };
        if !error.is_null() {
            let message = unsafe { c_string(rdsys::rd_kafka_error_string(error)) };
            bail!("Broker failed to delete ACL: {}", message)
        }

        let mut matched = 0;
        unsafe { rdsys::rd_kafka_DeleteAcls_result_response_matching_acls(response, &mut matched) };
        deleted += matched;
    }

    Ok(deleted)
}

fn new_binding(
    resource: &AclResource,
    entry: &AccessControlEntry,
    kind: BindingKind,
) -> Result<Binding, anyhow::Error> {
    let resource_type = native_resource_type(resource.kind);
    let name = CString::new(resource.name.as_str()).context("Resource name contains a nul byte")?;
    let principal = CString::new(entry.principal.as_str()).context("Principal contains a nul byte")?;
    let host = CString::new(entry.host.as_str()).context("Host contains a nul byte")?;
    let pattern_type = native_pattern_type(resource.pattern_type);
    let operation = native_operation(entry.operation);
    let permission = native_permission(entry.permission);

    let mut error_buffer = [0 as c_char; ERROR_BUFFER_SIZE];
    let pointer = unsafe {
        match kind {
            BindingKind::Binding => rdsys::rd_kafka_AclBinding_new(
                resource_type,
                name.as_ptr(),
                pattern_type,
                principal.as_ptr(),
                host.as_ptr(),
                operation,
                permission,
                error_buffer.as_mut_ptr(),
                ERROR_BUFFER_SIZE,
            ),
            BindingKind::Filter => rdsys::rd_kafka_AclBindingFilter_new(
                resource_type,
                name.as_ptr(),
                pattern_type,
                principal.as_ptr(),
                host.as_ptr(),
                operation,
                permission,
                error_buffer.as_mut_ptr(),
                ERROR_BUFFER_SIZE,
            ),
        }
    };

    if pointer.is_null() {
        bail!(
            "Invalid ACL {}: {}",
            resource.describe_entry(entry),
            unsafe { c_string(error_buffer.as_ptr()) }
        )
    }

    Ok(Binding(pointer))
}

fn match_all_filter() -> Result<Binding, anyhow::Error> {
    let mut error_buffer = [0 as c_char; ERROR_BUFFER_SIZE];
    let pointer = unsafe {
        rdsys::rd_kafka_AclBindingFilter_new(
            NativeResourceType::RD_KAFKA_RESOURCE_ANY,
            ptr::null(),
            NativePatternType::RD_KAFKA_RESOURCE_PATTERN_ANY,
            ptr::null(),
            ptr::null(),
            NativeOperation::RD_KAFKA_ACL_OPERATION_ANY,
            NativePermission::RD_KAFKA_ACL_PERMISSION_TYPE_ANY,
            error_buffer.as_mut_ptr(),
            ERROR_BUFFER_SIZE,
        )
    };
    if pointer.is_null() {
        bail!("Invalid ACL filter: {}", unsafe { c_string(error_buffer.as_ptr()) })
    }

    Ok(Binding(pointer))
}

unsafe fn read_binding(
    acl: *const rdsys::rd_kafka_AclBinding_t,
) -> Option<(AclResource, AccessControlEntry)> {
    let kind = resource_kind(rdsys::rd_kafka_AclBinding_restype(acl))?;
    let resource = AclResource {
        kind,
        name: c_string(rdsys::rd_kafka_AclBinding_name(acl)),
        pattern_type: pattern_type(rdsys::rd_kafka_AclBinding_resource_pattern_type(acl)),
    };
    let entry = AccessControlEntry {
        principal: c_string(rdsys::rd_kafka_AclBinding_principal(acl)),
        host: c_string(rdsys::rd_kafka_AclBinding_host(acl)),
        operation: operation(rdsys::rd_kafka_AclBinding_operation(acl)),
        permission: permission(rdsys::rd_kafka_AclBinding_permission_type(acl)),
    };

    Some((resource, entry))
}

unsafe fn c_string(pointer: *const c_char) -> String {
    if pointer.is_null() {
        return String::new();
    }

    CStr::from_ptr(pointer).to_string_lossy().into_owned()
}

fn timeout_millis(timeout: Duration) -> c_int {
    timeout.as_millis().min(c_int::MAX as u128) as c_int
}

fn native_resource_type(kind: ResourceKind) -> NativeResourceType {
    match kind {
        ResourceKind::Cluster => NativeResourceType::RD_KAFKA_RESOURCE_BROKER,
        ResourceKind::ConsumerGroup => NativeResourceType::RD_KAFKA_RESOURCE_GROUP,
        ResourceKind::Topic => NativeResourceType::RD_KAFKA_RESOURCE_TOPIC,
        ResourceKind::TransactionalId => NativeResourceType::RD_KAFKA_RESOURCE_TRANSACTIONAL_ID,
    }
}

fn resource_kind(native: NativeResourceType) -> Option<ResourceKind> {
    match native {
        NativeResourceType::RD_KAFKA_RESOURCE_BROKER => Some(ResourceKind::Cluster),
        NativeResourceType::RD_KAFKA_RESOURCE_GROUP => Some(ResourceKind::ConsumerGroup),
        NativeResourceType::RD_KAFKA_RESOURCE_TOPIC => Some(ResourceKind::Topic),
        NativeResourceType::RD_KAFKA_RESOURCE_TRANSACTIONAL_ID => {
            Some(ResourceKind::TransactionalId)
        }
        _ => None,
    }
}

fn native_pattern_type(pattern_type: PatternType) -> NativePatternType {
    match pattern_type {
        PatternType::Prefixed => NativePatternType::RD_KAFKA_RESOURCE_PATTERN_PREFIXED,
        PatternType::Any => NativePatternType::RD_KAFKA_RESOURCE_PATTERN_ANY,
        PatternType::Literal | PatternType::Unknown => {
            NativePatternType::RD_KAFKA_RESOURCE_PATTERN_LITERAL
        }
    }
}

fn pattern_type(native: NativePatternType) -> PatternType {
    match native {
        NativePatternType::RD_KAFKA_RESOURCE_PATTERN_LITERAL => PatternType::Literal,
        NativePatternType::RD_KAFKA_RESOURCE_PATTERN_PREFIXED => PatternType::Prefixed,
        NativePatternType::RD_KAFKA_RESOURCE_PATTERN_ANY => PatternType::Any,
        _ => PatternType::Unknown,
    }
}

fn native_operation(operation: AclOperation) -> NativeOperation {
    match operation {
        AclOperation::Unknown => NativeOperation::RD_KAFKA_ACL_OPERATION_UNKNOWN,
        AclOperation::Any => NativeOperation::RD_KAFKA_ACL_OPERATION_ANY,
        AclOperation::All => NativeOperation::RD_KAFKA_ACL_OPERATION_ALL,
        AclOperation::Read => NativeOperation::RD_KAFKA_ACL_OPERATION_READ,
        AclOperation::Write => NativeOperation::RD_KAFKA_ACL_OPERATION_WRITE,
        AclOperation::Create => NativeOperation::RD_KAFKA_ACL_OPERATION_CREATE,
        AclOperation::Delete => NativeOperation::RD_KAFKA_ACL_OPERATION_DELETE,
        AclOperation::Alter => NativeOperation::RD_KAFKA_ACL_OPERATION_ALTER,
        AclOperation::Describe => NativeOperation::RD_KAFKA_ACL_OPERATION_DESCRIBE,
        AclOperation::ClusterAction => NativeOperation::RD_KAFKA_ACL_OPERATION_CLUSTER_ACTION,
        AclOperation::DescribeConfigs => NativeOperation::RD_KAFKA_ACL_OPERATION_DESCRIBE_CONFIGS,
        AclOperation::AlterConfigs => NativeOperation::RD_KAFKA_ACL_OPERATION_ALTER_CONFIGS,
        AclOperation::IdempotentWrite => NativeOperation::RD_KAFKA_ACL_OPERATION_IDEMPOTENT_WRITE,
    }
}

fn operation(native: NativeOperation) -> AclOperation {
    match native {
        NativeOperation::RD_KAFKA_ACL_OPERATION_ANY => AclOperation::Any,
        NativeOperation::RD_KAFKA_ACL_OPERATION_ALL => AclOperation::All,
        NativeOperation::RD_KAFKA_ACL_OPERATION_READ => AclOperation::Read,
        NativeOperation::RD_KAFKA_ACL_OPERATION_WRITE => AclOperation::Write,
        NativeOperation::RD_KAFKA_ACL_OPERATION_CREATE => AclOperation::Create,
        NativeOperation::RD_KAFKA_ACL_OPERATION_DELETE => AclOperation::Delete,
        NativeOperation::RD_KAFKA_ACL_OPERATION_ALTER => AclOperation::Alter,
        NativeOperation::RD_KAFKA_ACL_OPERATION_DESCRIBE => AclOperation::Describe,
        NativeOperation::RD_KAFKA_ACL_OPERATION_CLUSTER_ACTION => AclOperation::ClusterAction,
        NativeOperation::RD_KAFKA_ACL_OPERATION_DESCRIBE_CONFIGS => AclOperation::DescribeConfigs,
        NativeOperation::RD_KAFKA_ACL_OPERATION_ALTER_CONFIGS => AclOperation::AlterConfigs,
        NativeOperation::RD_KAFKA_ACL_OPERATION_IDEMPOTENT_WRITE => AclOperation::IdempotentWrite,
        _ => AclOperation::Unknown,
    }
}

fn native_permission(permission: AclPermission) -> NativePermission {
    match permission {
        AclPermission::Unknown => NativePermission::RD_KAFKA_ACL_PERMISSION_TYPE_UNKNOWN,
        AclPermission::Any => NativePermission::RD_KAFKA_ACL_PERMISSION_TYPE_ANY,
        AclPermission::Deny => NativePermission::RD_KAFKA_ACL_PERMISSION_TYPE_DENY,
        AclPermission::Allow => NativePermission::RD_KAFKA_ACL_PERMISSION_TYPE_ALLOW,
    }
}

fn permission(native: NativePermission) -> AclPermission {
    match native {
        NativePermission::RD_KAFKA_ACL_PERMISSION_TYPE_ANY => AclPermission::Any,
        NativePermission::RD_KAFKA_ACL_PERMISSION_TYPE_DENY => AclPermission::Deny,
        NativePermission::RD_KAFKA_ACL_PERMISSION_TYPE_ALLOW => AclPermission::Allow,
        _ => AclPermission::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unspecified_pattern_type_is_sent_as_literal() {
        assert_eq!(
            native_pattern_type(PatternType::Unknown),
            NativePatternType::RD_KAFKA_RESOURCE_PATTERN_LITERAL
        );
        assert_eq!(
            pattern_type(NativePatternType::RD_KAFKA_RESOURCE_PATTERN_MATCH),
            PatternType::Unknown
        );
    }

    #[test]
    fn operations_map_both_ways() {
        for value in [
            AclOperation::Read,
            AclOperation::Write,
            AclOperation::ClusterAction,
            AclOperation::IdempotentWrite,
        ] {
            assert_eq!(operation(native_operation(value)), value);
        }
    }

    #[test]
    fn every_resource_kind_maps_both_ways() {
        for kind in [
            ResourceKind::Cluster,
            ResourceKind::ConsumerGroup,
            ResourceKind::Topic,
            ResourceKind::TransactionalId,
        ] {
            assert_eq!(resource_kind(native_resource_type(kind)), Some(kind));
        }
        assert_eq!(
            native_resource_type(ResourceKind::TransactionalId),
            NativeResourceType::RD_KAFKA_RESOURCE_TRANSACTIONAL_ID
        );
        assert_eq!(resource_kind(NativeResourceType::RD_KAFKA_RESOURCE_ANY), None);
    }
}
