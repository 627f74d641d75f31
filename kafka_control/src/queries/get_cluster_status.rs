mod handler;
mod response;

pub use handler::*;
pub use response::*;
