mod acl;
mod message;
mod metadata;
mod topic;

pub use acl::*;
pub use message::*;
pub use metadata::*;
pub use topic::*;
