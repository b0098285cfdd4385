//! User document schema
//!
//! Identity records are owned by the platform's identity service; this
//! service reads them for authorization and profile joins, and only ever
//! writes counter increments (`stats.posts`).

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// Platform-wide account tier
///
/// The tiers are not a strict ladder: `business` unlocks commerce features,
/// not everything `pro` has. Clan founding is reserved for `pro` and `admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular account
    #[default]
    Participant,
    /// Paid tier with cosmetic perks
    Vip,
    /// Paid tier with creator features (incl. clan founding)
    Pro,
    /// Organization account
    Business,
    /// Platform administrator
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserRole::Participant => "participant",
            UserRole::Vip => "vip",
            UserRole::Pro => "pro",
            UserRole::Business => "business",
            UserRole::Admin => "admin",
        };
        write!(f, "{}", s)
    }
}

/// Denormalized activity counters shown on the profile page
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserStats {
    #[serde(default)]
    pub friends: i64,
    #[serde(default)]
    pub followers: i64,
    #[serde(default)]
    pub events: i64,
    #[serde(default)]
    pub reviews: i64,
    #[serde(default)]
    pub posts: i64,
}

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Public display name
    pub display_name: String,

    /// Avatar image reference (opaque URL, storage is external)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// Account tier
    #[serde(default)]
    pub role: UserRole,

    /// Platform token balance (never touched by this service)
    #[serde(default)]
    pub tokens: i64,

    /// Home city
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    /// Activity counters
    #[serde(default)]
    pub stats: UserStats,
}

impl UserDoc {
    /// Create a new user document
    pub fn new(display_name: String, role: UserRole) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            display_name,
            avatar: None,
            role,
            tokens: 0,
            city: None,
            stats: UserStats::default(),
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "role": 1 },
                Some(IndexOptions::builder().name("role_index".to_string()).build()),
            ),
            (
                doc! { "metadata.is_deleted": 1 },
                Some(
                    IndexOptions::builder()
                        .name("is_deleted_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&UserRole::Pro).unwrap(), "\"pro\"");
        assert_eq!(
            serde_json::from_str::<UserRole>("\"business\"").unwrap(),
            UserRole::Business
        );
    }

    #[test]
    fn test_new_user_defaults() {
        let user = UserDoc::new("Мария".to_string(), UserRole::Participant);
        assert_eq!(user.tokens, 0);
        assert_eq!(user.stats.posts, 0);
        assert!(user._id.is_none());
        assert!(!user.metadata.is_deleted);
    }
}
