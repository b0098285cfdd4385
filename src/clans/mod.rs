//! Clan domain
//!
//! The pure cores (`workflow`, `feed`) mutate a loaded [`ClanDoc`] in
//! memory; [`registry`] wraps them with persistence, capability checks,
//! and identity joins.
//!
//! [`ClanDoc`]: crate::db::schemas::ClanDoc

pub mod feed;
pub mod query;
pub mod registry;
pub mod slug;
pub mod workflow;

pub use query::ClanQuery;
pub use registry::{ClanRegistry, CreateClanInput, UpdateClanInput};
pub use workflow::{JoinOutcome, Resolution};
