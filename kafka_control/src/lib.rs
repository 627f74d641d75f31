#![allow(clippy::too_many_arguments)]

pub mod admin;
pub mod cluster;
pub mod codec;
pub mod commands;
pub mod connection_settings;
pub mod consumer;
pub mod error;
pub mod lag_scraper;
pub mod models;
pub mod producer;
pub mod queries;
pub mod reconcile;
