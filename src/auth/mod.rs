//! Authentication and authorization for Artel
//!
//! Provides:
//! - JWT bearer token validation (issuance lives in the identity service)
//! - Capability checks for clan operations

pub mod capability;
pub mod jwt;

pub use capability::{is_allowed, Capability};
pub use jwt::{extract_token_from_header, Claims, JwtValidator};
