mod client;
mod rdkafka_cluster;

pub use client::*;
pub use rdkafka_cluster::*;
