pub mod app_config;
pub mod desired_state;
pub mod metrics_server;
pub mod shutdown;
pub mod startup;
