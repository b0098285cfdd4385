//! Artel - clan service for Siberia Life
//!
//! Clans are member-run communities: a profile, a member roster with roles,
//! an admission workflow for closed clans, and an activity feed. This crate
//! serves the REST API over MongoDB; identity records are owned by the
//! platform's identity service and only read (and counter-bumped) here.

pub mod auth;
pub mod clans;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{ArtelError, Result};
