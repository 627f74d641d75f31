mod producer_wrapper;

pub use producer_wrapper::*;
