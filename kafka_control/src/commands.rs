pub mod produce_messages;
pub mod set_acls;
pub mod set_topics;
