//! HTTP routes for Artel

pub mod clans;
pub mod health;

pub use clans::handle_clans_request;
pub use health::{health_check, readiness_check, version_info};
