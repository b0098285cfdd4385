//! Clan document schema
//!
//! A clan is a single MongoDB document carrying its profile, the member
//! roster, the pending admission queue, and the activity feed as embedded
//! arrays. Every mutation loads the document, changes it in memory, and
//! writes it back whole; single-document atomicity is the consistency
//! boundary.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for clans
pub const CLAN_COLLECTION: &str = "clans";

// Field limits (characters, not bytes; names and posts are mostly Cyrillic)
pub const NAME_MIN_CHARS: usize = 3;
pub const NAME_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 2000;
pub const CITY_MAX_CHARS: usize = 100;
pub const TAGS_MAX: usize = 20;
pub const TAG_MAX_CHARS: usize = 30;
pub const POST_TITLE_MAX_CHARS: usize = 150;
pub const POST_CONTENT_MAX_CHARS: usize = 2000;
pub const COMMENT_MAX_CHARS: usize = 1000;
pub const REQUEST_MESSAGE_MAX_CHARS: usize = 500;

/// Role within a clan roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClanRole {
    Leader,
    Moderator,
    Member,
}

/// How new members get in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionPolicy {
    /// Joining inserts into the roster immediately
    #[default]
    Open,
    /// Joining files a request the leader must approve
    Closed,
}

/// Clan lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClanStatus {
    #[default]
    Active,
    Archived,
}

/// Admission request state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Declined,
}

/// What kind of entry sits in the activity feed
///
/// `Event` is produced by the events subsystem and only read here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Post,
    Event,
    MemberJoined,
    Change,
}

/// Fixed platform category labels (stored and served as-is)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClanCategory {
    #[serde(rename = "Спорт и отдых")]
    Sport,
    #[serde(rename = "Творчество")]
    Art,
    #[serde(rename = "Музыка")]
    Music,
    #[serde(rename = "Путешествия")]
    Travel,
    #[serde(rename = "Технологии")]
    Tech,
    #[serde(rename = "Бизнес")]
    Business,
    #[serde(rename = "Образование")]
    Education,
    #[serde(rename = "Авто и мото")]
    Motor,
    #[serde(rename = "Игры")]
    Games,
    #[serde(rename = "Другое")]
    Other,
}

impl ClanCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClanCategory::Sport => "Спорт и отдых",
            ClanCategory::Art => "Творчество",
            ClanCategory::Music => "Музыка",
            ClanCategory::Travel => "Путешествия",
            ClanCategory::Tech => "Технологии",
            ClanCategory::Business => "Бизнес",
            ClanCategory::Education => "Образование",
            ClanCategory::Motor => "Авто и мото",
            ClanCategory::Games => "Игры",
            ClanCategory::Other => "Другое",
        }
    }

    /// Parse a label coming from a query string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Спорт и отдых" => Some(ClanCategory::Sport),
            "Творчество" => Some(ClanCategory::Art),
            "Музыка" => Some(ClanCategory::Music),
            "Путешествия" => Some(ClanCategory::Travel),
            "Технологии" => Some(ClanCategory::Tech),
            "Бизнес" => Some(ClanCategory::Business),
            "Образование" => Some(ClanCategory::Education),
            "Авто и мото" => Some(ClanCategory::Motor),
            "Игры" => Some(ClanCategory::Games),
            "Другое" => Some(ClanCategory::Other),
            _ => None,
        }
    }
}

/// One roster entry
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RosterMember {
    pub user_id: ObjectId,
    pub role: ClanRole,
    pub joined_at: DateTime,
}

/// Pending (or resolved) admission request, embedded in the clan
///
/// Resolved requests stay in the queue with a flipped status, so a second
/// resolution attempt finds no pending request and fails.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MembershipRequest {
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub requested_at: DateTime,
}

/// One comment under an activity entry
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ActivityComment {
    pub id: ObjectId,
    pub author_id: ObjectId,
    pub content: String,
    pub created_at: DateTime,
}

/// One entry in the append-only activity feed
///
/// System-generated entries carry no title and no author.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ActivityEntry {
    pub id: ObjectId,
    pub kind: ActivityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<ObjectId>,
    pub created_at: DateTime,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub comments: Vec<ActivityComment>,
}

/// External profile links
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SocialLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
}

/// Clan document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ClanDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Display name, unique across clans
    pub name: String,

    /// URL identifier derived from the name, unique across clans
    pub slug: String,

    pub description: String,

    /// Logo image reference (opaque URL)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,

    /// Cover image reference (opaque URL)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,

    /// Current leader; always mirrored by exactly one `leader` roster entry
    pub leader_id: ObjectId,

    /// Member roster, including the leader
    #[serde(default)]
    pub members: Vec<RosterMember>,

    /// Denormalized roster size, recomputed on every roster change
    #[serde(default)]
    pub member_count: i64,

    /// Admission policy
    #[serde(default)]
    pub clan_type: AdmissionPolicy,

    /// Hidden clans are excluded from public listings
    #[serde(default = "default_true")]
    pub is_visible: bool,

    /// Verification badge, set by moderation tooling
    #[serde(default)]
    pub is_verified: bool,

    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,

    pub category: ClanCategory,

    pub city: String,

    #[serde(default)]
    pub links: SocialLinks,

    /// Admission queue (pending and resolved)
    #[serde(default)]
    pub requests: Vec<MembershipRequest>,

    /// Append-only activity feed, stored in insertion order
    #[serde(default)]
    pub activity: Vec<ActivityEntry>,

    #[serde(default)]
    pub status: ClanStatus,

    /// Externally influenced rating; sortable, never mutated here
    #[serde(default)]
    pub rating: f64,
}

fn default_true() -> bool {
    true
}

impl ClanDoc {
    /// Create a new clan with its founder as sole member and leader
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        slug: String,
        description: String,
        category: ClanCategory,
        city: String,
        clan_type: AdmissionPolicy,
        leader_id: ObjectId,
    ) -> Self {
        let now = DateTime::now();
        Self {
            _id: None,
            metadata: Metadata::new(),
            name,
            slug,
            description,
            logo: None,
            cover: None,
            leader_id,
            members: vec![RosterMember {
                user_id: leader_id,
                role: ClanRole::Leader,
                joined_at: now,
            }],
            member_count: 1,
            clan_type,
            is_visible: true,
            is_verified: false,
            tags: Vec::new(),
            category,
            city,
            links: SocialLinks::default(),
            requests: Vec::new(),
            activity: Vec::new(),
            status: ClanStatus::Active,
            rating: 0.0,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.status == ClanStatus::Archived
    }

    pub fn member(&self, user_id: &ObjectId) -> Option<&RosterMember> {
        self.members.iter().find(|m| &m.user_id == user_id)
    }

    pub fn is_member(&self, user_id: &ObjectId) -> bool {
        self.member(user_id).is_some()
    }

    pub fn is_leader(&self, user_id: &ObjectId) -> bool {
        &self.leader_id == user_id
    }

    /// The pending request filed by this user, if any
    pub fn pending_request(&self, user_id: &ObjectId) -> Option<&MembershipRequest> {
        self.requests
            .iter()
            .find(|r| &r.user_id == user_id && r.status == RequestStatus::Pending)
    }

    /// Recompute `member_count` from the roster; call after every roster change
    pub fn recount_members(&mut self) {
        self.member_count = self.members.len() as i64;
    }
}

impl IntoIndexes for ClanDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "slug": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("slug_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "name": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("name_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "status": 1, "rating": -1 },
                Some(
                    IndexOptions::builder()
                        .name("status_rating_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "category": 1 },
                Some(
                    IndexOptions::builder()
                        .name("category_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "tags": 1 },
                Some(IndexOptions::builder().name("tags_index".to_string()).build()),
            ),
            (
                doc! { "city": 1 },
                Some(IndexOptions::builder().name("city_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for ClanDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_clan() -> ClanDoc {
        ClanDoc::new(
            "Сибирские волки".to_string(),
            "sibirskie-volki".to_string(),
            "Клуб любителей зимних походов".to_string(),
            ClanCategory::Sport,
            "Новосибирск".to_string(),
            AdmissionPolicy::Open,
            ObjectId::new(),
        )
    }

    #[test]
    fn test_new_clan_has_leader_in_roster() {
        let clan = sample_clan();
        assert_eq!(clan.members.len(), 1);
        assert_eq!(clan.member_count, 1);
        assert_eq!(clan.members[0].role, ClanRole::Leader);
        assert_eq!(clan.members[0].user_id, clan.leader_id);
        assert!(clan.is_leader(&clan.leader_id));
        assert!(clan.is_member(&clan.leader_id));
    }

    #[test]
    fn test_new_clan_starts_active_and_visible() {
        let clan = sample_clan();
        assert_eq!(clan.status, ClanStatus::Active);
        assert!(clan.is_visible);
        assert!(!clan.is_verified);
        assert!(clan.activity.is_empty());
        assert!(clan.requests.is_empty());
    }

    #[test]
    fn test_category_labels_round_trip() {
        for cat in [
            ClanCategory::Sport,
            ClanCategory::Art,
            ClanCategory::Music,
            ClanCategory::Travel,
            ClanCategory::Tech,
            ClanCategory::Business,
            ClanCategory::Education,
            ClanCategory::Motor,
            ClanCategory::Games,
            ClanCategory::Other,
        ] {
            assert_eq!(ClanCategory::parse(cat.as_str()), Some(cat));
        }
        assert_eq!(ClanCategory::parse("Спорт и отдых"), Some(ClanCategory::Sport));
        assert_eq!(ClanCategory::parse("не категория"), None);
    }

    #[test]
    fn test_category_serializes_to_label() {
        let json = serde_json::to_string(&ClanCategory::Sport).unwrap();
        assert_eq!(json, "\"Спорт и отдых\"");
    }

    #[test]
    fn test_pending_request_ignores_resolved() {
        let mut clan = sample_clan();
        let user = ObjectId::new();
        clan.requests.push(MembershipRequest {
            id: ObjectId::new(),
            user_id: user,
            status: RequestStatus::Declined,
            message: None,
            requested_at: DateTime::now(),
        });
        assert!(clan.pending_request(&user).is_none());

        clan.requests.push(MembershipRequest {
            id: ObjectId::new(),
            user_id: user,
            status: RequestStatus::Pending,
            message: Some("Хочу к вам".to_string()),
            requested_at: DateTime::now(),
        });
        assert!(clan.pending_request(&user).is_some());
    }

    #[test]
    fn test_recount_members() {
        let mut clan = sample_clan();
        clan.members.push(RosterMember {
            user_id: ObjectId::new(),
            role: ClanRole::Member,
            joined_at: DateTime::now(),
        });
        clan.recount_members();
        assert_eq!(clan.member_count, 2);
    }
}
