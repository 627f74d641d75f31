pub mod get_acls;
pub mod get_acls_diff;
pub mod get_cluster_status;
pub mod get_schemas;
pub mod get_topics;
pub mod get_topics_diff;
pub mod read_messages;
