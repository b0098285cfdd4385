//! Clan membership workflow
//!
//! Pure mutations on a `ClanDoc` held in memory; persistence and
//! authorization live in the registry. Every roster change recomputes
//! `member_count` before returning, so any state the caller persists keeps
//! the roster invariants.

use bson::{oid::ObjectId, DateTime};

use crate::clans::feed;
use crate::db::schemas::{
    ActivityKind, AdmissionPolicy, ClanDoc, ClanRole, MembershipRequest, RequestStatus,
    RosterMember, REQUEST_MESSAGE_MAX_CHARS,
};
use crate::types::{ArtelError, Result};

/// What a join attempt resulted in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Open clan: the user is now on the roster
    Joined,
    /// Closed clan: a pending request was filed
    Requested,
}

/// Leader's verdict on a membership request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Approve,
    Decline,
}

fn insert_member(clan: &mut ClanDoc, user_id: ObjectId) {
    clan.members.push(RosterMember {
        user_id,
        role: ClanRole::Member,
        joined_at: DateTime::now(),
    });
    clan.recount_members();
    feed::push_system_entry(clan, ActivityKind::MemberJoined, "Новый участник в клане");
}

/// Join an open clan directly, or file a request against a closed one.
pub fn join(clan: &mut ClanDoc, user_id: ObjectId, message: Option<String>) -> Result<JoinOutcome> {
    if clan.is_archived() {
        return Err(ArtelError::Conflict("Клан в архиве".into()));
    }
    if clan.is_member(&user_id) {
        return Err(ArtelError::Conflict("Вы уже состоите в клане".into()));
    }

    match clan.clan_type {
        AdmissionPolicy::Open => {
            insert_member(clan, user_id);
            Ok(JoinOutcome::Joined)
        }
        AdmissionPolicy::Closed => {
            if clan.pending_request(&user_id).is_some() {
                return Err(ArtelError::Conflict("Заявка уже подана".into()));
            }
            if let Some(ref msg) = message {
                if msg.chars().count() > REQUEST_MESSAGE_MAX_CHARS {
                    return Err(ArtelError::Validation("Сообщение слишком длинное".into()));
                }
            }
            clan.requests.push(MembershipRequest {
                id: ObjectId::new(),
                user_id,
                status: RequestStatus::Pending,
                message,
                requested_at: DateTime::now(),
            });
            Ok(JoinOutcome::Requested)
        }
    }
}

/// Resolve a pending membership request.
///
/// A resolved request stays in the queue with its flipped status, so a
/// second resolution of the same id fails with Conflict.
pub fn resolve_request(
    clan: &mut ClanDoc,
    request_id: &ObjectId,
    resolution: Resolution,
) -> Result<ObjectId> {
    let idx = clan
        .requests
        .iter()
        .position(|r| &r.id == request_id)
        .ok_or_else(|| ArtelError::NotFound("Заявка не найдена".into()))?;

    if clan.requests[idx].status != RequestStatus::Pending {
        return Err(ArtelError::Conflict("Заявка уже рассмотрена".into()));
    }

    let user_id = clan.requests[idx].user_id;
    match resolution {
        Resolution::Approve => {
            // Approving a request from someone who joined in the meantime
            // (e.g. after the clan flipped to open) must not duplicate them.
            if clan.is_member(&user_id) {
                return Err(ArtelError::Conflict("Пользователь уже в клане".into()));
            }
            clan.requests[idx].status = RequestStatus::Approved;
            insert_member(clan, user_id);
        }
        Resolution::Decline => {
            clan.requests[idx].status = RequestStatus::Declined;
        }
    }

    Ok(user_id)
}

/// Leave a clan. The leader must transfer leadership first.
pub fn leave(clan: &mut ClanDoc, user_id: &ObjectId) -> Result<()> {
    if !clan.is_member(user_id) {
        return Err(ArtelError::Conflict("Вы не состоите в клане".into()));
    }
    if clan.is_leader(user_id) {
        return Err(ArtelError::Conflict(
            "Лидер не может покинуть клан, сначала передайте лидерство".into(),
        ));
    }

    clan.members.retain(|m| &m.user_id != user_id);
    clan.recount_members();
    Ok(())
}

/// Remove a member from the roster. The leader cannot be kicked.
pub fn kick(clan: &mut ClanDoc, target_id: &ObjectId) -> Result<()> {
    if !clan.is_member(target_id) {
        return Err(ArtelError::NotFound("Участник не найден".into()));
    }
    if clan.is_leader(target_id) {
        return Err(ArtelError::Conflict("Лидера нельзя исключить".into()));
    }

    clan.members.retain(|m| &m.user_id != target_id);
    clan.recount_members();
    Ok(())
}

/// Toggle a member between `member` and `moderator`.
///
/// The `leader` role is reserved for [`transfer_leadership`].
pub fn set_role(clan: &mut ClanDoc, target_id: &ObjectId, role: ClanRole) -> Result<()> {
    if role == ClanRole::Leader {
        return Err(ArtelError::Validation(
            "Роль лидера назначается только передачей лидерства".into(),
        ));
    }
    if clan.is_leader(target_id) {
        return Err(ArtelError::Conflict("У лидера нельзя изменить роль".into()));
    }

    let member = clan
        .members
        .iter_mut()
        .find(|m| &m.user_id == target_id)
        .ok_or_else(|| ArtelError::NotFound("Участник не найден".into()))?;

    member.role = role;
    Ok(())
}

/// Hand leadership to another roster member.
///
/// The previous leader stays on the roster as a plain member, keeping the
/// "exactly one leader entry" invariant.
pub fn transfer_leadership(clan: &mut ClanDoc, new_leader_id: ObjectId) -> Result<()> {
    if clan.is_leader(&new_leader_id) {
        return Err(ArtelError::Conflict("Пользователь уже лидер клана".into()));
    }
    if !clan.is_member(&new_leader_id) {
        return Err(ArtelError::NotFound("Участник не найден".into()));
    }

    let old_leader_id = clan.leader_id;
    for m in clan.members.iter_mut() {
        if m.user_id == old_leader_id {
            m.role = ClanRole::Member;
        } else if m.user_id == new_leader_id {
            m.role = ClanRole::Leader;
        }
    }
    clan.leader_id = new_leader_id;
    clan.recount_members();
    feed::push_system_entry(clan, ActivityKind::Post, "Лидерство передано");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{AdmissionPolicy, ClanCategory, ClanStatus};

    fn clan_with_policy(policy: AdmissionPolicy) -> ClanDoc {
        ClanDoc::new(
            "Hikers".to_string(),
            "hikers".to_string(),
            "We hike".to_string(),
            ClanCategory::Sport,
            "Novosibirsk".to_string(),
            policy,
            ObjectId::new(),
        )
    }

    fn assert_invariants(clan: &ClanDoc) {
        assert_eq!(clan.member_count, clan.members.len() as i64);
        let leaders: Vec<_> = clan
            .members
            .iter()
            .filter(|m| m.role == ClanRole::Leader)
            .collect();
        assert_eq!(leaders.len(), 1);
        assert_eq!(leaders[0].user_id, clan.leader_id);
    }

    #[test]
    fn test_join_open_clan() {
        let mut clan = clan_with_policy(AdmissionPolicy::Open);
        let user = ObjectId::new();

        let outcome = join(&mut clan, user, None).unwrap();
        assert_eq!(outcome, JoinOutcome::Joined);
        assert!(clan.is_member(&user));
        assert_eq!(clan.member_count, 2);
        assert_eq!(
            clan.activity.last().unwrap().kind,
            ActivityKind::MemberJoined
        );
        assert_invariants(&clan);
    }

    #[test]
    fn test_join_twice_conflicts() {
        let mut clan = clan_with_policy(AdmissionPolicy::Open);
        let user = ObjectId::new();
        join(&mut clan, user, None).unwrap();

        assert!(matches!(
            join(&mut clan, user, None),
            Err(ArtelError::Conflict(_))
        ));
        assert_eq!(clan.member_count, 2);
    }

    #[test]
    fn test_join_archived_clan_conflicts() {
        let mut clan = clan_with_policy(AdmissionPolicy::Open);
        clan.status = ClanStatus::Archived;

        assert!(matches!(
            join(&mut clan, ObjectId::new(), None),
            Err(ArtelError::Conflict(_))
        ));
    }

    #[test]
    fn test_join_closed_clan_files_request() {
        let mut clan = clan_with_policy(AdmissionPolicy::Closed);
        let user = ObjectId::new();

        let outcome = join(&mut clan, user, Some("Хочу к вам".to_string())).unwrap();
        assert_eq!(outcome, JoinOutcome::Requested);
        // Closed clan: roster unchanged until approval
        assert!(!clan.is_member(&user));
        assert_eq!(clan.member_count, 1);
        assert_eq!(clan.requests.len(), 1);
        assert_eq!(clan.requests[0].status, RequestStatus::Pending);

        // Second request while the first is pending
        assert!(matches!(
            join(&mut clan, user, None),
            Err(ArtelError::Conflict(_))
        ));
        assert_eq!(clan.requests.len(), 1);
    }

    #[test]
    fn test_approve_request_inserts_member() {
        let mut clan = clan_with_policy(AdmissionPolicy::Closed);
        let user = ObjectId::new();
        join(&mut clan, user, None).unwrap();
        let request_id = clan.requests[0].id;

        let approved = resolve_request(&mut clan, &request_id, Resolution::Approve).unwrap();
        assert_eq!(approved, user);
        assert!(clan.is_member(&user));
        assert_eq!(clan.member(&user).unwrap().role, ClanRole::Member);
        assert_eq!(clan.member_count, 2);
        assert_eq!(clan.requests[0].status, RequestStatus::Approved);
        assert_eq!(
            clan.activity.last().unwrap().kind,
            ActivityKind::MemberJoined
        );
        assert_invariants(&clan);
    }

    #[test]
    fn test_decline_request_leaves_roster_alone() {
        let mut clan = clan_with_policy(AdmissionPolicy::Closed);
        let user = ObjectId::new();
        join(&mut clan, user, None).unwrap();
        let request_id = clan.requests[0].id;

        resolve_request(&mut clan, &request_id, Resolution::Decline).unwrap();
        assert!(!clan.is_member(&user));
        assert_eq!(clan.member_count, 1);
        assert_eq!(clan.requests[0].status, RequestStatus::Declined);

        // Declined user may file a fresh request
        assert_eq!(join(&mut clan, user, None).unwrap(), JoinOutcome::Requested);
        assert_eq!(clan.requests.len(), 2);
    }

    #[test]
    fn test_resolving_twice_conflicts() {
        let mut clan = clan_with_policy(AdmissionPolicy::Closed);
        join(&mut clan, ObjectId::new(), None).unwrap();
        let request_id = clan.requests[0].id;

        resolve_request(&mut clan, &request_id, Resolution::Approve).unwrap();
        assert!(matches!(
            resolve_request(&mut clan, &request_id, Resolution::Approve),
            Err(ArtelError::Conflict(_))
        ));
        assert_eq!(clan.member_count, 2);
    }

    #[test]
    fn test_resolving_unknown_request_not_found() {
        let mut clan = clan_with_policy(AdmissionPolicy::Closed);
        assert!(matches!(
            resolve_request(&mut clan, &ObjectId::new(), Resolution::Approve),
            Err(ArtelError::NotFound(_))
        ));
    }

    #[test]
    fn test_member_can_leave() {
        let mut clan = clan_with_policy(AdmissionPolicy::Open);
        let user = ObjectId::new();
        join(&mut clan, user, None).unwrap();

        leave(&mut clan, &user).unwrap();
        assert!(!clan.is_member(&user));
        assert_eq!(clan.member_count, 1);
        assert_invariants(&clan);
    }

    #[test]
    fn test_leader_cannot_leave() {
        let mut clan = clan_with_policy(AdmissionPolicy::Open);
        let leader = clan.leader_id;

        assert!(matches!(
            leave(&mut clan, &leader),
            Err(ArtelError::Conflict(_))
        ));
        assert!(clan.is_member(&leader));
    }

    #[test]
    fn test_non_member_leave_conflicts() {
        let mut clan = clan_with_policy(AdmissionPolicy::Open);
        assert!(matches!(
            leave(&mut clan, &ObjectId::new()),
            Err(ArtelError::Conflict(_))
        ));
    }

    #[test]
    fn test_kick_member() {
        let mut clan = clan_with_policy(AdmissionPolicy::Open);
        let user = ObjectId::new();
        join(&mut clan, user, None).unwrap();

        kick(&mut clan, &user).unwrap();
        assert!(!clan.is_member(&user));
        assert_eq!(clan.member_count, 1);
    }

    #[test]
    fn test_kick_leader_conflicts() {
        let mut clan = clan_with_policy(AdmissionPolicy::Open);
        let leader = clan.leader_id;
        assert!(matches!(kick(&mut clan, &leader), Err(ArtelError::Conflict(_))));
    }

    #[test]
    fn test_kick_non_member_not_found() {
        let mut clan = clan_with_policy(AdmissionPolicy::Open);
        assert!(matches!(
            kick(&mut clan, &ObjectId::new()),
            Err(ArtelError::NotFound(_))
        ));
    }

    #[test]
    fn test_promote_and_demote() {
        let mut clan = clan_with_policy(AdmissionPolicy::Open);
        let user = ObjectId::new();
        join(&mut clan, user, None).unwrap();

        set_role(&mut clan, &user, ClanRole::Moderator).unwrap();
        assert_eq!(clan.member(&user).unwrap().role, ClanRole::Moderator);

        set_role(&mut clan, &user, ClanRole::Member).unwrap();
        assert_eq!(clan.member(&user).unwrap().role, ClanRole::Member);
        assert_invariants(&clan);
    }

    #[test]
    fn test_set_role_leader_rejected() {
        let mut clan = clan_with_policy(AdmissionPolicy::Open);
        let user = ObjectId::new();
        join(&mut clan, user, None).unwrap();

        assert!(matches!(
            set_role(&mut clan, &user, ClanRole::Leader),
            Err(ArtelError::Validation(_))
        ));
    }

    #[test]
    fn test_set_role_on_leader_conflicts() {
        let mut clan = clan_with_policy(AdmissionPolicy::Open);
        let leader = clan.leader_id;
        assert!(matches!(
            set_role(&mut clan, &leader, ClanRole::Moderator),
            Err(ArtelError::Conflict(_))
        ));
    }

    #[test]
    fn test_transfer_leadership() {
        let mut clan = clan_with_policy(AdmissionPolicy::Open);
        let old_leader = clan.leader_id;
        let new_leader = ObjectId::new();
        join(&mut clan, new_leader, None).unwrap();

        transfer_leadership(&mut clan, new_leader).unwrap();
        assert_eq!(clan.leader_id, new_leader);
        assert_eq!(clan.member(&new_leader).unwrap().role, ClanRole::Leader);
        assert_eq!(clan.member(&old_leader).unwrap().role, ClanRole::Member);
        assert_eq!(clan.activity.last().unwrap().kind, ActivityKind::Post);
        assert_invariants(&clan);

        // The old leader can now leave
        leave(&mut clan, &old_leader).unwrap();
        assert_invariants(&clan);
    }

    #[test]
    fn test_transfer_to_non_member_not_found() {
        let mut clan = clan_with_policy(AdmissionPolicy::Open);
        assert!(matches!(
            transfer_leadership(&mut clan, ObjectId::new()),
            Err(ArtelError::NotFound(_))
        ));
    }

    #[test]
    fn test_transfer_to_current_leader_conflicts() {
        let mut clan = clan_with_policy(AdmissionPolicy::Open);
        let leader = clan.leader_id;
        assert!(matches!(
            transfer_leadership(&mut clan, leader),
            Err(ArtelError::Conflict(_))
        ));
    }
}
