mod acl_bindings;
mod admin_wrapper;

pub use acl_bindings::*;
pub use admin_wrapper::*;
