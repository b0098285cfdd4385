//! Clan registry
//!
//! Mongo-backed service tying the pieces together: every operation loads
//! the clan document, asks the capability check, applies the pure
//! workflow/feed mutation, and writes the document back whole. Reads attach
//! identity summaries for display.

use std::collections::HashMap;

use bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{is_allowed, Capability};
use crate::clans::feed;
use crate::clans::query::ClanQuery;
use crate::clans::slug::slugify;
use crate::clans::workflow::{self, JoinOutcome, Resolution};
use crate::db::schemas::{
    ActivityKind, AdmissionPolicy, ClanCategory, ClanDoc, ClanRole, ClanStatus, RequestStatus,
    SocialLinks, UserDoc, UserRole, CITY_MAX_CHARS, CLAN_COLLECTION, DESCRIPTION_MAX_CHARS,
    NAME_MAX_CHARS, NAME_MIN_CHARS, TAGS_MAX, TAG_MAX_CHARS, USER_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{ArtelError, Result};

// ============================================================================
// Inputs
// ============================================================================

/// Fields accepted when founding a clan
#[derive(Debug, Default)]
pub struct CreateClanInput {
    pub name: String,
    pub description: String,
    pub category: String,
    pub city: String,
    pub clan_type: Option<AdmissionPolicy>,
    pub tags: Vec<String>,
    pub logo: Option<String>,
    pub cover: Option<String>,
    pub links: Option<SocialLinks>,
}

/// Fields accepted when editing a clan profile; all optional
///
/// `logo` and `cover` are doubly optional: the outer `None` means
/// "leave as is", `Some(None)` clears the image.
#[derive(Debug, Default)]
pub struct UpdateClanInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub clan_type: Option<AdmissionPolicy>,
    pub tags: Option<Vec<String>>,
    pub logo: Option<Option<String>>,
    pub cover: Option<Option<String>>,
    pub links: Option<SocialLinks>,
    pub is_visible: Option<bool>,
}

// ============================================================================
// Read models
// ============================================================================

/// Identity summary attached to rosters, requests, and activity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub role: UserRole,
}

impl UserSummary {
    fn from_doc(user: &UserDoc) -> Self {
        Self {
            id: user._id.map(|o| o.to_hex()).unwrap_or_default(),
            display_name: user.display_name.clone(),
            avatar: user.avatar.clone(),
            role: user.role,
        }
    }

    /// Placeholder for identities that have since been soft-deleted
    fn unknown(id: &ObjectId) -> Self {
        Self {
            id: id.to_hex(),
            display_name: "Удалённый пользователь".to_string(),
            avatar: None,
            role: UserRole::Participant,
        }
    }
}

/// Compact clan representation for list views
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanSummary {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(rename = "type")]
    pub clan_type: AdmissionPolicy,
    pub category: ClanCategory,
    pub city: String,
    pub tags: Vec<String>,
    pub member_count: i64,
    pub rating: f64,
    pub is_verified: bool,
    pub status: ClanStatus,
}

impl ClanSummary {
    fn from_doc(clan: &ClanDoc) -> Self {
        Self {
            id: clan._id.map(|o| o.to_hex()).unwrap_or_default(),
            name: clan.name.clone(),
            slug: clan.slug.clone(),
            description: clan.description.clone(),
            logo: clan.logo.clone(),
            clan_type: clan.clan_type,
            category: clan.category,
            city: clan.city.clone(),
            tags: clan.tags.clone(),
            member_count: clan.member_count,
            rating: clan.rating,
            is_verified: clan.is_verified,
            status: clan.status,
        }
    }
}

/// One roster entry with its identity summary
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub user: UserSummary,
    pub role: ClanRole,
    pub joined_at: String,
}

/// One membership request with its requester summary
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestView {
    pub id: String,
    pub user: UserSummary,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub requested_at: String,
}

/// One comment with its author summary
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub author: UserSummary,
    pub content: String,
    pub created_at: String,
}

/// One activity entry with author and comment summaries
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<UserSummary>,
    pub created_at: String,
    pub likes: i64,
    pub comments: Vec<CommentView>,
}

/// Full clan view with joined identities, served by the single-clan read
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanView {
    #[serde(flatten)]
    pub summary: ClanSummary,
    pub cover: Option<String>,
    pub links: SocialLinks,
    pub is_visible: bool,
    pub leader: UserSummary,
    pub members: Vec<MemberView>,
    pub activity: Vec<ActivityView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Page of clans plus pagination totals
#[derive(Debug, Serialize)]
pub struct ClanPage {
    pub clans: Vec<ClanSummary>,
    pub total: u64,
    pub page: u32,
    pub pages: u32,
}

// ============================================================================
// Registry
// ============================================================================

/// Mongo-backed clan service
#[derive(Clone)]
pub struct ClanRegistry {
    clans: MongoCollection<ClanDoc>,
    users: MongoCollection<UserDoc>,
}

impl ClanRegistry {
    /// Open the clan and user collections (indexes applied on open)
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            clans: mongo.collection::<ClanDoc>(CLAN_COLLECTION).await?,
            users: mongo.collection::<UserDoc>(USER_COLLECTION).await?,
        })
    }

    // ------------------------------------------------------------------
    // Actor / clan loading
    // ------------------------------------------------------------------

    /// Load the acting identity. The stored role is authoritative; token
    /// claims are advisory only.
    pub async fn load_actor(&self, actor_id: &ObjectId) -> Result<UserDoc> {
        self.users
            .find_one(doc! { "_id": actor_id })
            .await?
            .ok_or_else(|| ArtelError::NotFound("Пользователь не найден".into()))
    }

    async fn load_clan(&self, clan_id: &ObjectId) -> Result<ClanDoc> {
        self.clans
            .find_one(doc! { "_id": clan_id })
            .await?
            .ok_or_else(|| ArtelError::NotFound("Клан не найден".into()))
    }

    async fn persist(&self, clan: ClanDoc) -> Result<()> {
        let id = clan
            ._id
            .ok_or_else(|| ArtelError::Internal("Clan document without id".into()))?;
        self.clans.replace_one(doc! { "_id": id }, clan).await?;
        Ok(())
    }

    async fn require(&self, actor: &UserDoc, clan: Option<&ClanDoc>, cap: Capability) -> Result<()> {
        let actor_id = actor
            ._id
            .ok_or_else(|| ArtelError::Internal("User document without id".into()))?;
        if is_allowed(&actor_id, actor.role, clan, cap) {
            Ok(())
        } else {
            Err(ArtelError::Forbidden("Недостаточно прав".into()))
        }
    }

    // ------------------------------------------------------------------
    // Clan record management
    // ------------------------------------------------------------------

    /// Found a new clan; the creator becomes leader and sole member.
    pub async fn create(&self, actor_id: &ObjectId, input: CreateClanInput) -> Result<ClanView> {
        let actor = self.load_actor(actor_id).await?;
        self.require(&actor, None, Capability::CreateClan).await?;

        let name = input.name.trim().to_string();
        let description = input.description.trim().to_string();
        let city = input.city.trim().to_string();
        validate_name(&name)?;
        validate_description(&description)?;
        validate_city(&city)?;
        let tags = validate_tags(input.tags)?;
        let category = ClanCategory::parse(&input.category)
            .ok_or_else(|| ArtelError::Validation("Неизвестная категория".into()))?;

        let slug = slugify(&name);
        if slug.is_empty() {
            return Err(ArtelError::Validation(
                "Название не содержит допустимых символов".into(),
            ));
        }
        self.ensure_slug_free(&slug, None).await?;

        let mut clan = ClanDoc::new(
            name,
            slug,
            description,
            category,
            city,
            input.clan_type.unwrap_or_default(),
            *actor_id,
        );
        clan.tags = tags;
        clan.logo = input.logo;
        clan.cover = input.cover;
        if let Some(links) = input.links {
            clan.links = links;
        }
        feed::push_system_entry(&mut clan, ActivityKind::Post, "Клан создан");

        let id = self.clans.insert_one(clan).await?;
        info!(clan = %id, leader = %actor_id, "clan created");

        self.get(&id.to_hex()).await
    }

    /// List clans matching a query, with pagination totals.
    pub async fn list(&self, query: &ClanQuery) -> Result<ClanPage> {
        let filter = query.to_filter();
        let total = self.clans.count(filter.clone()).await?;

        let options = FindOptions::builder()
            .sort(query.to_sort())
            .skip(query.skip())
            .limit(query.limit as i64)
            .build();

        let docs = self.clans.find_many(filter, Some(options)).await?;
        let clans = docs.iter().map(ClanSummary::from_doc).collect();
        let pages = page_count(total, query.limit);

        Ok(ClanPage {
            clans,
            total,
            page: query.page,
            pages,
        })
    }

    /// Fetch one clan by ObjectId hex or slug, with identities joined.
    pub async fn get(&self, id_or_slug: &str) -> Result<ClanView> {
        let filter = match ObjectId::parse_str(id_or_slug) {
            Ok(oid) => doc! { "_id": oid },
            Err(_) => doc! { "slug": id_or_slug },
        };

        let clan = self
            .clans
            .find_one(filter)
            .await?
            .ok_or_else(|| ArtelError::NotFound("Клан не найден".into()))?;

        self.build_view(clan).await
    }

    /// Edit the clan profile. Renaming recomputes and re-checks the slug.
    pub async fn update(
        &self,
        actor_id: &ObjectId,
        clan_id: &ObjectId,
        input: UpdateClanInput,
    ) -> Result<ClanView> {
        let actor = self.load_actor(actor_id).await?;
        let mut clan = self.load_clan(clan_id).await?;
        self.require(&actor, Some(&clan), Capability::ManageClan).await?;

        let old_slug = clan.slug.clone();
        let changed = apply_update(&mut clan, input)?;
        if clan.slug != old_slug {
            self.ensure_slug_free(&clan.slug, clan._id.as_ref()).await?;
        }

        // A body carrying no effective change must not pollute the feed
        if !changed {
            return self.build_view(clan).await;
        }

        feed::push_system_entry(&mut clan, ActivityKind::Change, "Информация о клане обновлена");
        self.persist(clan.clone()).await?;

        self.build_view(clan).await
    }

    /// Archive a clan. The record stays fetchable by id or slug but drops
    /// out of the default listing.
    pub async fn archive(&self, actor_id: &ObjectId, clan_id: &ObjectId) -> Result<()> {
        let actor = self.load_actor(actor_id).await?;
        let mut clan = self.load_clan(clan_id).await?;
        self.require(&actor, Some(&clan), Capability::ManageClan).await?;

        if clan.is_archived() {
            return Err(ArtelError::Conflict("Клан уже в архиве".into()));
        }

        clan.status = ClanStatus::Archived;
        self.persist(clan).await?;
        info!(clan = %clan_id, actor = %actor_id, "clan archived");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Membership workflow
    // ------------------------------------------------------------------

    /// Join an open clan, or file a request against a closed one.
    pub async fn join(
        &self,
        actor_id: &ObjectId,
        clan_id: &ObjectId,
        message: Option<String>,
    ) -> Result<JoinOutcome> {
        // Actor must exist even though no capability applies to joining
        self.load_actor(actor_id).await?;
        let mut clan = self.load_clan(clan_id).await?;

        let outcome = workflow::join(&mut clan, *actor_id, message)?;
        self.persist(clan).await?;
        info!(clan = %clan_id, user = %actor_id, ?outcome, "join processed");
        Ok(outcome)
    }

    /// Approve or decline a pending membership request.
    pub async fn resolve_request(
        &self,
        actor_id: &ObjectId,
        clan_id: &ObjectId,
        request_id: &ObjectId,
        resolution: Resolution,
    ) -> Result<()> {
        let actor = self.load_actor(actor_id).await?;
        let mut clan = self.load_clan(clan_id).await?;
        self.require(&actor, Some(&clan), Capability::ManageClan).await?;

        let user_id = workflow::resolve_request(&mut clan, request_id, resolution)?;
        self.persist(clan).await?;
        info!(
            clan = %clan_id, request = %request_id, user = %user_id,
            ?resolution, "membership request resolved"
        );
        Ok(())
    }

    /// Pending requests with requester summaries, for the approval UI.
    pub async fn list_requests(
        &self,
        actor_id: &ObjectId,
        clan_id: &ObjectId,
    ) -> Result<Vec<RequestView>> {
        let actor = self.load_actor(actor_id).await?;
        let clan = self.load_clan(clan_id).await?;
        self.require(&actor, Some(&clan), Capability::ManageClan).await?;

        let pending: Vec<_> = clan
            .requests
            .iter()
            .filter(|r| r.status == RequestStatus::Pending)
            .collect();
        let users = self
            .summaries_for(pending.iter().map(|r| r.user_id))
            .await?;

        Ok(pending
            .into_iter()
            .map(|r| RequestView {
                id: r.id.to_hex(),
                user: users
                    .get(&r.user_id)
                    .cloned()
                    .unwrap_or_else(|| UserSummary::unknown(&r.user_id)),
                status: r.status,
                message: r.message.clone(),
                requested_at: r.requested_at.try_to_rfc3339_string().unwrap_or_default(),
            })
            .collect())
    }

    /// Leave a clan (the leader must transfer leadership first).
    pub async fn leave(&self, actor_id: &ObjectId, clan_id: &ObjectId) -> Result<()> {
        self.load_actor(actor_id).await?;
        let mut clan = self.load_clan(clan_id).await?;

        workflow::leave(&mut clan, actor_id)?;
        self.persist(clan).await?;
        info!(clan = %clan_id, user = %actor_id, "member left");
        Ok(())
    }

    /// Remove a member from the roster.
    pub async fn kick(
        &self,
        actor_id: &ObjectId,
        clan_id: &ObjectId,
        target_id: &ObjectId,
    ) -> Result<()> {
        let actor = self.load_actor(actor_id).await?;
        let mut clan = self.load_clan(clan_id).await?;
        self.require(&actor, Some(&clan), Capability::ManageClan).await?;

        workflow::kick(&mut clan, target_id)?;
        self.persist(clan).await?;
        info!(clan = %clan_id, target = %target_id, actor = %actor_id, "member kicked");
        Ok(())
    }

    /// Toggle a member between `member` and `moderator`.
    pub async fn set_role(
        &self,
        actor_id: &ObjectId,
        clan_id: &ObjectId,
        target_id: &ObjectId,
        role: ClanRole,
    ) -> Result<()> {
        let actor = self.load_actor(actor_id).await?;
        let mut clan = self.load_clan(clan_id).await?;
        self.require(&actor, Some(&clan), Capability::ManageClan).await?;

        workflow::set_role(&mut clan, target_id, role)?;
        self.persist(clan).await?;
        Ok(())
    }

    /// Hand leadership to another roster member.
    pub async fn transfer_leadership(
        &self,
        actor_id: &ObjectId,
        clan_id: &ObjectId,
        new_leader_id: &ObjectId,
    ) -> Result<()> {
        let actor = self.load_actor(actor_id).await?;
        let mut clan = self.load_clan(clan_id).await?;
        self.require(&actor, Some(&clan), Capability::ManageClan).await?;

        workflow::transfer_leadership(&mut clan, *new_leader_id)?;
        self.persist(clan).await?;
        info!(
            clan = %clan_id, from = %actor_id, to = %new_leader_id,
            "leadership transferred"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Activity feed
    // ------------------------------------------------------------------

    /// Author a post in the clan feed; bumps the author's post counter.
    pub async fn add_post(
        &self,
        actor_id: &ObjectId,
        clan_id: &ObjectId,
        title: &str,
        content: &str,
    ) -> Result<ObjectId> {
        let actor = self.load_actor(actor_id).await?;
        let mut clan = self.load_clan(clan_id).await?;
        self.require(&actor, Some(&clan), Capability::PostActivity).await?;

        let post_id = feed::add_post(&mut clan, *actor_id, title, content)?;
        self.persist(clan).await?;

        // Profile counter; failure here must not fail the post itself
        if let Err(e) = self
            .users
            .update_one(doc! { "_id": actor_id }, doc! { "$inc": { "stats.posts": 1 } })
            .await
        {
            warn!(user = %actor_id, error = %e, "failed to bump post counter");
        }

        Ok(post_id)
    }

    /// Comment under an activity entry.
    pub async fn add_comment(
        &self,
        actor_id: &ObjectId,
        clan_id: &ObjectId,
        activity_id: &ObjectId,
        content: &str,
    ) -> Result<ObjectId> {
        let actor = self.load_actor(actor_id).await?;
        let mut clan = self.load_clan(clan_id).await?;
        self.require(&actor, Some(&clan), Capability::CommentActivity)
            .await?;

        let comment_id = feed::add_comment(&mut clan, activity_id, *actor_id, content)?;
        self.persist(clan).await?;
        Ok(comment_id)
    }

    // ------------------------------------------------------------------
    // Joins
    // ------------------------------------------------------------------

    async fn summaries_for(
        &self,
        ids: impl Iterator<Item = ObjectId>,
    ) -> Result<HashMap<ObjectId, UserSummary>> {
        let ids: Vec<ObjectId> = ids.collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = self
            .users
            .find_many(doc! { "_id": { "$in": ids } }, None)
            .await?;

        Ok(users
            .iter()
            .filter_map(|u| u._id.map(|id| (id, UserSummary::from_doc(u))))
            .collect())
    }

    async fn build_view(&self, clan: ClanDoc) -> Result<ClanView> {
        let mut ids: Vec<ObjectId> = clan.members.iter().map(|m| m.user_id).collect();
        for entry in &clan.activity {
            if let Some(author) = entry.author_id {
                ids.push(author);
            }
            ids.extend(entry.comments.iter().map(|c| c.author_id));
        }
        ids.sort();
        ids.dedup();
        let users = self.summaries_for(ids.into_iter()).await?;

        let summary_for =
            |id: &ObjectId| users.get(id).cloned().unwrap_or_else(|| UserSummary::unknown(id));

        let members = clan
            .members
            .iter()
            .map(|m| MemberView {
                user: summary_for(&m.user_id),
                role: m.role,
                joined_at: m.joined_at.try_to_rfc3339_string().unwrap_or_default(),
            })
            .collect();

        let activity = feed::newest_first(&clan)
            .into_iter()
            .map(|entry| ActivityView {
                id: entry.id.to_hex(),
                kind: entry.kind,
                title: entry.title.clone(),
                content: entry.content.clone(),
                author: entry.author_id.as_ref().map(&summary_for),
                created_at: entry.created_at.try_to_rfc3339_string().unwrap_or_default(),
                likes: entry.likes,
                comments: entry
                    .comments
                    .iter()
                    .map(|c| CommentView {
                        id: c.id.to_hex(),
                        author: summary_for(&c.author_id),
                        content: c.content.clone(),
                        created_at: c.created_at.try_to_rfc3339_string().unwrap_or_default(),
                    })
                    .collect(),
            })
            .collect();

        let leader = summary_for(&clan.leader_id);
        Ok(ClanView {
            cover: clan.cover.clone(),
            links: clan.links.clone(),
            is_visible: clan.is_visible,
            leader,
            members,
            activity,
            created_at: clan
                .metadata
                .created_at
                .map(|d| d.try_to_rfc3339_string().unwrap_or_default()),
            summary: ClanSummary::from_doc(&clan),
        })
    }

    async fn ensure_slug_free(&self, slug: &str, exclude: Option<&ObjectId>) -> Result<()> {
        let mut filter = doc! { "slug": slug };
        if let Some(id) = exclude {
            filter.insert("_id", doc! { "$ne": id });
        }
        if self.clans.find_one(filter).await?.is_some() {
            return Err(ArtelError::Conflict(
                "Клан с таким названием уже существует".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Profile edits
// ============================================================================

/// Apply profile edits in memory, reporting whether anything changed.
/// Renaming recomputes the slug; the caller re-checks slug uniqueness
/// before persisting.
fn apply_update(clan: &mut ClanDoc, input: UpdateClanInput) -> Result<bool> {
    let mut changed = false;

    if let Some(name) = input.name {
        let name = name.trim().to_string();
        validate_name(&name)?;
        if name != clan.name {
            let slug = slugify(&name);
            if slug.is_empty() {
                return Err(ArtelError::Validation(
                    "Название не содержит допустимых символов".into(),
                ));
            }
            clan.name = name;
            clan.slug = slug;
            changed = true;
        }
    }
    if let Some(description) = input.description {
        let description = description.trim().to_string();
        validate_description(&description)?;
        if description != clan.description {
            clan.description = description;
            changed = true;
        }
    }
    if let Some(category) = input.category {
        let category = ClanCategory::parse(&category)
            .ok_or_else(|| ArtelError::Validation("Неизвестная категория".into()))?;
        if category != clan.category {
            clan.category = category;
            changed = true;
        }
    }
    if let Some(city) = input.city {
        let city = city.trim().to_string();
        validate_city(&city)?;
        if city != clan.city {
            clan.city = city;
            changed = true;
        }
    }
    if let Some(clan_type) = input.clan_type {
        if clan_type != clan.clan_type {
            clan.clan_type = clan_type;
            changed = true;
        }
    }
    if let Some(tags) = input.tags {
        let tags = validate_tags(tags)?;
        if tags != clan.tags {
            clan.tags = tags;
            changed = true;
        }
    }
    if let Some(logo) = input.logo {
        if logo != clan.logo {
            clan.logo = logo;
            changed = true;
        }
    }
    if let Some(cover) = input.cover {
        if cover != clan.cover {
            clan.cover = cover;
            changed = true;
        }
    }
    if let Some(links) = input.links {
        if links != clan.links {
            clan.links = links;
            changed = true;
        }
    }
    if let Some(is_visible) = input.is_visible {
        if is_visible != clan.is_visible {
            clan.is_visible = is_visible;
            changed = true;
        }
    }

    Ok(changed)
}

// ============================================================================
// Validation helpers
// ============================================================================

fn validate_name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if len < NAME_MIN_CHARS {
        return Err(ArtelError::Validation("Название слишком короткое".into()));
    }
    if len > NAME_MAX_CHARS {
        return Err(ArtelError::Validation("Название слишком длинное".into()));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<()> {
    if description.is_empty() {
        return Err(ArtelError::Validation("Описание обязательно".into()));
    }
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(ArtelError::Validation("Описание слишком длинное".into()));
    }
    Ok(())
}

fn validate_city(city: &str) -> Result<()> {
    if city.is_empty() {
        return Err(ArtelError::Validation("Город обязателен".into()));
    }
    if city.chars().count() > CITY_MAX_CHARS {
        return Err(ArtelError::Validation("Название города слишком длинное".into()));
    }
    Ok(())
}

fn validate_tags(tags: Vec<String>) -> Result<Vec<String>> {
    let tags: Vec<String> = tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    if tags.len() > TAGS_MAX {
        return Err(ArtelError::Validation("Слишком много тегов".into()));
    }
    for tag in &tags {
        if tag.chars().count() > TAG_MAX_CHARS {
            return Err(ArtelError::Validation("Тег слишком длинный".into()));
        }
    }
    Ok(tags)
}

fn page_count(total: u64, limit: u32) -> u32 {
    if limit == 0 {
        return 0;
    }
    ((total as f64) / (limit as f64)).ceil() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 20), 0);
        assert_eq!(page_count(1, 20), 1);
        assert_eq!(page_count(20, 20), 1);
        assert_eq!(page_count(21, 20), 2);
        assert_eq!(page_count(100, 0), 0);
    }

    #[test]
    fn test_validate_name_bounds() {
        assert!(validate_name("ab").is_err());
        assert!(validate_name("abc").is_ok());
        assert!(validate_name(&"я".repeat(NAME_MAX_CHARS)).is_ok());
        assert!(validate_name(&"я".repeat(NAME_MAX_CHARS + 1)).is_err());
    }

    #[test]
    fn test_validate_tags_trims_and_limits() {
        let tags = validate_tags(vec![" hiking ".to_string(), "".to_string()]).unwrap();
        assert_eq!(tags, vec!["hiking"]);

        let too_many: Vec<String> = (0..TAGS_MAX + 1).map(|i| format!("t{}", i)).collect();
        assert!(validate_tags(too_many).is_err());

        assert!(validate_tags(vec!["x".repeat(TAG_MAX_CHARS + 1)]).is_err());
    }

    #[test]
    fn test_validate_description() {
        assert!(validate_description("").is_err());
        assert!(validate_description("Мы ходим в горы").is_ok());
        assert!(validate_description(&"о".repeat(DESCRIPTION_MAX_CHARS + 1)).is_err());
    }

    fn sample_clan() -> ClanDoc {
        ClanDoc::new(
            "Сибирские волки".to_string(),
            "sibirskie-volki".to_string(),
            "Мы ходим в горы".to_string(),
            ClanCategory::Travel,
            "Томск".to_string(),
            AdmissionPolicy::Open,
            ObjectId::new(),
        )
    }

    #[test]
    fn test_apply_update_empty_input_is_noop() {
        let mut clan = sample_clan();
        let changed = apply_update(&mut clan, UpdateClanInput::default()).unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_apply_update_same_values_not_a_change() {
        let mut clan = sample_clan();
        let input = UpdateClanInput {
            name: Some(clan.name.clone()),
            description: Some(clan.description.clone()),
            city: Some(clan.city.clone()),
            is_visible: Some(clan.is_visible),
            ..Default::default()
        };
        assert!(!apply_update(&mut clan, input).unwrap());
    }

    #[test]
    fn test_apply_update_rename_recomputes_slug() {
        let mut clan = sample_clan();
        let input = UpdateClanInput {
            name: Some("Таёжный союз".to_string()),
            ..Default::default()
        };
        assert!(apply_update(&mut clan, input).unwrap());
        assert_eq!(clan.name, "Таёжный союз");
        assert_eq!(clan.slug, "tayozhnyy-soyuz");
    }

    #[test]
    fn test_apply_update_clears_logo() {
        let mut clan = sample_clan();
        clan.logo = Some("logo.png".to_string());
        let input = UpdateClanInput {
            logo: Some(None),
            ..Default::default()
        };
        assert!(apply_update(&mut clan, input).unwrap());
        assert!(clan.logo.is_none());
    }

    #[test]
    fn test_apply_update_rejects_bad_category() {
        let mut clan = sample_clan();
        let input = UpdateClanInput {
            category: Some("Нет такой".to_string()),
            ..Default::default()
        };
        assert!(apply_update(&mut clan, input).is_err());
    }

    // Mongo-touching paths are exercised through the pure workflow/feed
    // cores; integration tests require a running MongoDB instance.
}
