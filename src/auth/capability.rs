//! Capability checks for clan operations
//!
//! The single authorization decision point: every handler asks
//! [`is_allowed`] instead of re-deriving role rules inline. Platform roles
//! are not a strict ladder (business does not imply pro), so the policy is
//! an explicit match rather than ordered levels.

use bson::oid::ObjectId;

use crate::db::schemas::{ClanDoc, UserRole};

/// What an actor wants to do to a clan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Found a new clan
    CreateClan,
    /// Edit profile, archive, resolve requests, kick, change roles,
    /// transfer leadership
    ManageClan,
    /// Author a post in the activity feed
    PostActivity,
    /// Comment under an activity entry
    CommentActivity,
}

/// Decide whether `actor` may exercise `capability`.
///
/// `clan` is `None` only for [`Capability::CreateClan`], which has no target
/// yet. Management is reserved for the clan leader and platform admins;
/// posting and commenting require current membership, admins included.
pub fn is_allowed(
    actor_id: &ObjectId,
    actor_role: UserRole,
    clan: Option<&ClanDoc>,
    capability: Capability,
) -> bool {
    match capability {
        Capability::CreateClan => matches!(actor_role, UserRole::Pro | UserRole::Admin),
        Capability::ManageClan => match clan {
            Some(c) => actor_role == UserRole::Admin || c.is_leader(actor_id),
            None => false,
        },
        Capability::PostActivity | Capability::CommentActivity => match clan {
            Some(c) => c.is_member(actor_id),
            None => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{AdmissionPolicy, ClanCategory, ClanRole, RosterMember};
    use bson::DateTime;

    fn sample_clan() -> ClanDoc {
        ClanDoc::new(
            "Hikers".to_string(),
            "hikers".to_string(),
            "We hike".to_string(),
            ClanCategory::Sport,
            "Novosibirsk".to_string(),
            AdmissionPolicy::Open,
            ObjectId::new(),
        )
    }

    #[test]
    fn test_create_clan_matrix() {
        let id = ObjectId::new();
        for (role, expected) in [
            (UserRole::Participant, false),
            (UserRole::Vip, false),
            (UserRole::Pro, true),
            (UserRole::Business, false),
            (UserRole::Admin, true),
        ] {
            assert_eq!(
                is_allowed(&id, role, None, Capability::CreateClan),
                expected,
                "role {:?}",
                role
            );
        }
    }

    #[test]
    fn test_leader_manages_own_clan() {
        let clan = sample_clan();
        let leader = clan.leader_id;
        assert!(is_allowed(
            &leader,
            UserRole::Pro,
            Some(&clan),
            Capability::ManageClan
        ));
    }

    #[test]
    fn test_plain_member_cannot_manage() {
        let mut clan = sample_clan();
        let member = ObjectId::new();
        clan.members.push(RosterMember {
            user_id: member,
            role: ClanRole::Member,
            joined_at: DateTime::now(),
        });
        assert!(!is_allowed(
            &member,
            UserRole::Pro,
            Some(&clan),
            Capability::ManageClan
        ));
    }

    #[test]
    fn test_admin_manages_any_clan() {
        let clan = sample_clan();
        let admin = ObjectId::new();
        assert!(is_allowed(
            &admin,
            UserRole::Admin,
            Some(&clan),
            Capability::ManageClan
        ));
    }

    #[test]
    fn test_posting_requires_membership() {
        let clan = sample_clan();
        let outsider = ObjectId::new();
        assert!(!is_allowed(
            &outsider,
            UserRole::Pro,
            Some(&clan),
            Capability::PostActivity
        ));
        // Even an admin must be on the roster to author posts
        assert!(!is_allowed(
            &outsider,
            UserRole::Admin,
            Some(&clan),
            Capability::CommentActivity
        ));
        assert!(is_allowed(
            &clan.leader_id,
            UserRole::Pro,
            Some(&clan),
            Capability::PostActivity
        ));
    }

    #[test]
    fn test_missing_clan_denies_everything_but_create() {
        let id = ObjectId::new();
        assert!(!is_allowed(&id, UserRole::Admin, None, Capability::ManageClan));
        assert!(!is_allowed(&id, UserRole::Admin, None, Capability::PostActivity));
    }
}
