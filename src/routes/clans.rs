//! HTTP routes for the clan API
//!
//! REST surface under /api/clans:
//! - GET    /api/clans                                  - list with filters
//! - POST   /api/clans                                  - create (pro/admin)
//! - GET    /api/clans/:idOrSlug                        - single clan
//! - PUT    /api/clans/:id                              - update profile
//! - DELETE /api/clans/:id                              - archive
//! - POST   /api/clans/:id/join                         - join or request
//! - GET    /api/clans/:id/requests                     - pending requests
//! - PUT    /api/clans/:id/requests/:requestId          - approve/decline
//! - DELETE /api/clans/:id/leave                        - leave
//! - DELETE /api/clans/:id/members/:userId              - kick
//! - PUT    /api/clans/:id/members/:userId/role         - promote/demote
//! - PUT    /api/clans/:id/transfer-leadership          - transfer
//! - POST   /api/clans/:id/posts                        - author a post
//! - POST   /api/clans/:id/activities/:activityId/comments - comment
//!
//! Every response is the standard envelope; all field names camelCase.

use bson::oid::ObjectId;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::auth::extract_token_from_header;
use crate::clans::registry::{ClanPage, CreateClanInput, UpdateClanInput};
use crate::clans::workflow::{JoinOutcome, Resolution};
use crate::clans::ClanQuery;
use crate::db::schemas::{AdmissionPolicy, ClanRole, SocialLinks};
use crate::server::AppState;
use crate::types::{ArtelError, Result};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Request bodies above this size are rejected outright
const MAX_BODY_BYTES: usize = 64 * 1024;

// =============================================================================
// Response envelope
// =============================================================================

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub pages: u32,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<Pagination>,
}

fn envelope<T: Serialize>(status: StatusCode, body: &ApiResponse<T>) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|e| {
        warn!("Failed to serialize response: {}", e);
        r#"{"success":false,"code":"internal","message":"Serialization error"}"#.to_string()
    });

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

fn ok_data<T: Serialize>(data: T) -> Response<Full<Bytes>> {
    envelope(
        StatusCode::OK,
        &ApiResponse {
            success: true,
            data: Some(data),
            message: None,
            code: None,
            pagination: None,
        },
    )
}

fn ok_message<T: Serialize>(data: Option<T>, message: &str) -> Response<Full<Bytes>> {
    envelope(
        StatusCode::OK,
        &ApiResponse {
            success: true,
            data,
            message: Some(message.to_string()),
            code: None,
            pagination: None,
        },
    )
}

fn created<T: Serialize>(data: T, message: &str) -> Response<Full<Bytes>> {
    envelope(
        StatusCode::CREATED,
        &ApiResponse {
            success: true,
            data: Some(data),
            message: Some(message.to_string()),
            code: None,
            pagination: None,
        },
    )
}

/// Map an error to its HTTP status and machine-readable code
fn error_parts(err: &ArtelError) -> (StatusCode, &'static str) {
    match err {
        ArtelError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        ArtelError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
        ArtelError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
        ArtelError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        ArtelError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        ArtelError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
        ArtelError::Http(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        ArtelError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    }
}

pub fn error_response(err: &ArtelError) -> Response<Full<Bytes>> {
    let (status, code) = error_parts(err);
    if status.is_server_error() {
        warn!("Request failed: {}", err);
    }
    envelope::<()>(
        status,
        &ApiResponse {
            success: false,
            data: None,
            message: Some(err.to_string()),
            code: Some(code.to_string()),
            pagination: None,
        },
    )
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateClanRequest {
    name: String,
    description: String,
    category: String,
    city: String,
    #[serde(rename = "type")]
    clan_type: Option<AdmissionPolicy>,
    #[serde(default)]
    tags: Vec<String>,
    logo: Option<String>,
    cover: Option<String>,
    links: Option<SocialLinks>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UpdateClanRequest {
    name: Option<String>,
    description: Option<String>,
    category: Option<String>,
    city: Option<String>,
    #[serde(rename = "type")]
    clan_type: Option<AdmissionPolicy>,
    tags: Option<Vec<String>>,
    /// Absent = keep, `null` = clear, string = replace
    #[serde(default, deserialize_with = "double_option")]
    logo: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    cover: Option<Option<String>>,
    links: Option<SocialLinks>,
    is_visible: Option<bool>,
}

/// Distinguish an absent field from an explicit `null`
fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Default)]
struct JoinRequest {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResolveRequestBody {
    status: String,
}

#[derive(Debug, Deserialize)]
struct SetRoleRequest {
    role: ClanRole,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferRequest {
    new_leader_id: String,
}

#[derive(Debug, Deserialize)]
struct PostRequest {
    title: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CommentRequest {
    content: String,
}

// =============================================================================
// Helpers
// =============================================================================

/// Read and deserialize a JSON body, with a size cap
async fn parse_json_body<T: DeserializeOwned>(req: Request<Incoming>) -> Result<T> {
    let body = req
        .collect()
        .await
        .map_err(|e| ArtelError::Http(format!("Failed to read body: {}", e)))?
        .to_bytes();

    if body.len() > MAX_BODY_BYTES {
        return Err(ArtelError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&body).map_err(|e| ArtelError::Http(format!("Invalid JSON: {}", e)))
}

/// Resolve the acting user id from the Authorization header
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<ObjectId> {
    let header = headers.get("Authorization").and_then(|h| h.to_str().ok());
    let token = extract_token_from_header(header)
        .ok_or_else(|| ArtelError::Unauthorized("Missing bearer token".into()))?;

    let claims = state.jwt.validate_token(token)?;
    ObjectId::parse_str(&claims.sub)
        .map_err(|_| ArtelError::Unauthorized("Invalid token subject".into()))
}

fn parse_oid(s: &str) -> Result<ObjectId> {
    ObjectId::parse_str(s).map_err(|_| ArtelError::Validation("Некорректный идентификатор".into()))
}

// =============================================================================
// Dispatch
// =============================================================================

/// Route /api/clans requests; `path` is the full request path.
pub async fn handle_clans_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<BoxBody> {
    let subpath = path
        .strip_prefix("/api/clans")
        .unwrap_or("")
        .trim_matches('/')
        .to_string();
    let segments: Vec<&str> = if subpath.is_empty() {
        Vec::new()
    } else {
        subpath.split('/').collect()
    };
    let method = req.method().clone();

    let result = match (&method, segments.as_slice()) {
        (&Method::GET, []) => handle_list(req, &state).await,
        (&Method::POST, []) => handle_create(req, &state).await,
        (&Method::GET, [id_or_slug]) => handle_get(&state, id_or_slug).await,
        (&Method::PUT, [id]) => handle_update(req, &state, id).await,
        (&Method::DELETE, [id]) => handle_archive(req, &state, id).await,
        (&Method::POST, [id, "join"]) => handle_join(req, &state, id).await,
        (&Method::GET, [id, "requests"]) => handle_list_requests(req, &state, id).await,
        (&Method::PUT, [id, "requests", request_id]) => {
            handle_resolve_request(req, &state, id, request_id).await
        }
        (&Method::DELETE, [id, "leave"]) => handle_leave(req, &state, id).await,
        (&Method::DELETE, [id, "members", user_id]) => {
            handle_kick(req, &state, id, user_id).await
        }
        (&Method::PUT, [id, "members", user_id, "role"]) => {
            handle_set_role(req, &state, id, user_id).await
        }
        (&Method::PUT, [id, "transfer-leadership"]) => {
            handle_transfer(req, &state, id).await
        }
        (&Method::POST, [id, "posts"]) => handle_add_post(req, &state, id).await,
        (&Method::POST, [id, "activities", activity_id, "comments"]) => {
            handle_add_comment(req, &state, id, activity_id).await
        }
        _ => Err(ArtelError::NotFound(format!(
            "No route for {} {}",
            method, path
        ))),
    };

    let response = match result {
        Ok(resp) => resp,
        Err(e) => error_response(&e),
    };
    to_boxed(response)
}

fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

// =============================================================================
// Handlers
// =============================================================================

async fn handle_list(req: Request<Incoming>, state: &AppState) -> Result<Response<Full<Bytes>>> {
    let query = ClanQuery::from_query_string(req.uri().query());
    let page: ClanPage = state.registry()?.list(&query).await?;

    Ok(envelope(
        StatusCode::OK,
        &ApiResponse {
            success: true,
            data: Some(page.clans),
            message: None,
            code: None,
            pagination: Some(Pagination {
                total: page.total,
                page: page.page,
                pages: page.pages,
            }),
        },
    ))
}

async fn handle_create(req: Request<Incoming>, state: &AppState) -> Result<Response<Full<Bytes>>> {
    let actor = authenticate(state, req.headers())?;
    let body: CreateClanRequest = parse_json_body(req).await?;

    let view = state
        .registry()?
        .create(
            &actor,
            CreateClanInput {
                name: body.name,
                description: body.description,
                category: body.category,
                city: body.city,
                clan_type: body.clan_type,
                tags: body.tags,
                logo: body.logo,
                cover: body.cover,
                links: body.links,
            },
        )
        .await?;

    Ok(created(view, "Клан создан"))
}

async fn handle_get(state: &AppState, id_or_slug: &str) -> Result<Response<Full<Bytes>>> {
    let view = state.registry()?.get(id_or_slug).await?;
    Ok(ok_data(view))
}

async fn handle_update(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<Full<Bytes>>> {
    let actor = authenticate(state, req.headers())?;
    let clan_id = parse_oid(id)?;
    let body: UpdateClanRequest = parse_json_body(req).await?;

    let view = state
        .registry()?
        .update(
            &actor,
            &clan_id,
            UpdateClanInput {
                name: body.name,
                description: body.description,
                category: body.category,
                city: body.city,
                clan_type: body.clan_type,
                tags: body.tags,
                logo: body.logo,
                cover: body.cover,
                links: body.links,
                is_visible: body.is_visible,
            },
        )
        .await?;

    Ok(ok_message(Some(view), "Информация о клане обновлена"))
}

async fn handle_archive(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<Full<Bytes>>> {
    let actor = authenticate(state, req.headers())?;
    let clan_id = parse_oid(id)?;

    state.registry()?.archive(&actor, &clan_id).await?;
    Ok(ok_message::<()>(None, "Клан перемещён в архив"))
}

async fn handle_join(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<Full<Bytes>>> {
    let actor = authenticate(state, req.headers())?;
    let clan_id = parse_oid(id)?;
    // Body is optional for open clans
    let body: JoinRequest = parse_json_body(req).await.unwrap_or_default();

    let outcome = state.registry()?.join(&actor, &clan_id, body.message).await?;
    let (status_label, message) = match outcome {
        JoinOutcome::Joined => ("joined", "Вы вступили в клан"),
        JoinOutcome::Requested => ("requested", "Заявка отправлена"),
    };

    Ok(ok_message(
        Some(serde_json::json!({ "status": status_label })),
        message,
    ))
}

async fn handle_list_requests(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<Full<Bytes>>> {
    let actor = authenticate(state, req.headers())?;
    let clan_id = parse_oid(id)?;

    let requests = state.registry()?.list_requests(&actor, &clan_id).await?;
    Ok(ok_data(requests))
}

async fn handle_resolve_request(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
    request_id: &str,
) -> Result<Response<Full<Bytes>>> {
    let actor = authenticate(state, req.headers())?;
    let clan_id = parse_oid(id)?;
    let request_id = parse_oid(request_id)?;
    let body: ResolveRequestBody = parse_json_body(req).await?;

    let resolution = match body.status.as_str() {
        "approved" => Resolution::Approve,
        "declined" => Resolution::Decline,
        other => {
            return Err(ArtelError::Validation(format!(
                "Недопустимый статус заявки: {}",
                other
            )))
        }
    };

    state
        .registry()?
        .resolve_request(&actor, &clan_id, &request_id, resolution)
        .await?;

    let message = match resolution {
        Resolution::Approve => "Заявка одобрена",
        Resolution::Decline => "Заявка отклонена",
    };
    Ok(ok_message::<()>(None, message))
}

async fn handle_leave(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<Full<Bytes>>> {
    let actor = authenticate(state, req.headers())?;
    let clan_id = parse_oid(id)?;

    state.registry()?.leave(&actor, &clan_id).await?;
    Ok(ok_message::<()>(None, "Вы покинули клан"))
}

async fn handle_kick(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
    user_id: &str,
) -> Result<Response<Full<Bytes>>> {
    let actor = authenticate(state, req.headers())?;
    let clan_id = parse_oid(id)?;
    let target = parse_oid(user_id)?;

    state.registry()?.kick(&actor, &clan_id, &target).await?;
    Ok(ok_message::<()>(None, "Участник исключён из клана"))
}

async fn handle_set_role(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
    user_id: &str,
) -> Result<Response<Full<Bytes>>> {
    let actor = authenticate(state, req.headers())?;
    let clan_id = parse_oid(id)?;
    let target = parse_oid(user_id)?;
    let body: SetRoleRequest = parse_json_body(req).await?;

    state
        .registry()?
        .set_role(&actor, &clan_id, &target, body.role)
        .await?;
    Ok(ok_message::<()>(None, "Роль участника изменена"))
}

async fn handle_transfer(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<Full<Bytes>>> {
    let actor = authenticate(state, req.headers())?;
    let clan_id = parse_oid(id)?;
    let body: TransferRequest = parse_json_body(req).await?;
    let new_leader = parse_oid(&body.new_leader_id)?;

    state
        .registry()?
        .transfer_leadership(&actor, &clan_id, &new_leader)
        .await?;
    Ok(ok_message::<()>(None, "Лидерство передано"))
}

async fn handle_add_post(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<Full<Bytes>>> {
    let actor = authenticate(state, req.headers())?;
    let clan_id = parse_oid(id)?;
    let body: PostRequest = parse_json_body(req).await?;

    let post_id = state
        .registry()?
        .add_post(&actor, &clan_id, &body.title, &body.content)
        .await?;

    Ok(created(
        serde_json::json!({ "id": post_id.to_hex() }),
        "Запись опубликована",
    ))
}

async fn handle_add_comment(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
    activity_id: &str,
) -> Result<Response<Full<Bytes>>> {
    let actor = authenticate(state, req.headers())?;
    let clan_id = parse_oid(id)?;
    let activity_id = parse_oid(activity_id)?;
    let body: CommentRequest = parse_json_body(req).await?;

    let comment_id = state
        .registry()?
        .add_comment(&actor, &clan_id, &activity_id, &body.content)
        .await?;

    Ok(created(
        serde_json::json!({ "id": comment_id.to_hex() }),
        "Комментарий добавлен",
    ))
}
