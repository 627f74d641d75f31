mod handler;
mod models;
mod receiver;
mod request;
mod response;

pub use handler::*;
pub use models::*;
pub use receiver::*;
pub use request::*;
pub use response::*;
