//! Database schemas for Artel
//!
//! Defines MongoDB document structures for users and clans.

mod clan;
mod metadata;
mod user;

pub use clan::{
    ActivityComment, ActivityEntry, ActivityKind, AdmissionPolicy, ClanCategory, ClanDoc,
    ClanRole, ClanStatus, MembershipRequest, RequestStatus, RosterMember, SocialLinks,
    CITY_MAX_CHARS, CLAN_COLLECTION, COMMENT_MAX_CHARS, DESCRIPTION_MAX_CHARS, NAME_MAX_CHARS,
    NAME_MIN_CHARS, POST_CONTENT_MAX_CHARS, POST_TITLE_MAX_CHARS, REQUEST_MESSAGE_MAX_CHARS,
    TAGS_MAX, TAG_MAX_CHARS,
};
pub use metadata::Metadata;
pub use user::{UserDoc, UserRole, UserStats, USER_COLLECTION};
