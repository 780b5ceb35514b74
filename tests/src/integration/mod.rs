//! Cross-crate integration tests.

pub mod commands;
pub mod config_sync;
pub mod provisioning;
pub mod remote_services;
pub mod scenarios;
