mod consumer_settings;
mod consumer_wrapper;

pub use consumer_settings::*;
pub use consumer_wrapper::*;
