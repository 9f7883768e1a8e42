//! Buyer application routes - thin glue over the action engine.
//!
//! Handlers parse payloads, resolve the entity, and hand off to
//! `domains::buyer::actions`. No business rules live here.
//!
//! Authentication is upstream's job: the gateway injects the verified
//! principal as `x-user-id` / `x-user-email` / `x-user-roles` headers and
//! the `AuthedActor` extractor rebuilds the `Actor` from them.

use axum::{
    async_trait,
    extract::{Extension, FromRequestParts, Path, Query},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::common::{Actor, BuyerId, UserId};
use crate::domains::buyer::actions::{
    approve_by_token, auto_register, check_email, run_action, AuthMode, AutoRegisterRequest,
    BuyerAction,
};
use crate::domains::buyer::data::BuyerData;
use crate::domains::buyer::errors::ActionError;
use crate::domains::buyer::models::{Buyer, BuyerProfile};
use crate::kernel::BaseBuyerStore;
use crate::server::app::AppState;

// ============================================================================
// Error mapping
// ============================================================================

/// Boundary error: everything a handler can answer with.
pub enum ApiError {
    /// Missing/garbled identity headers.
    Auth(String),
    /// User-correctable condition outside the engine (e.g., duplicate
    /// application).
    Alert(String),
    /// Authenticated but lacking the required role.
    Forbidden(String),
    Action(ActionError),
}

impl From<ActionError> for ApiError {
    fn from(e: ActionError) -> Self {
        ApiError::Action(e)
    }
}

impl From<crate::kernel::StoreError> for ApiError {
    fn from(e: crate::kernel::StoreError) -> Self {
        ApiError::Action(ActionError::Store(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Auth(m) => (StatusCode::UNAUTHORIZED, m.clone()),
            ApiError::Alert(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
            ApiError::Action(e) => {
                let status = match e {
                    ActionError::InvalidAction { .. } | ActionError::Validation { .. } => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    ActionError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                    ActionError::NotFound => StatusCode::NOT_FOUND,
                    ActionError::DomainNotRegistered(_) => StatusCode::METHOD_NOT_ALLOWED,
                    ActionError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, e.to_string())
            }
        };

        if status.is_server_error() {
            warn!(%status, %message, "request failed");
        }

        (status, Json(json!({ "errors": [message] }))).into_response()
    }
}

// ============================================================================
// Actor extraction
// ============================================================================

/// The already-authenticated principal, rebuilt from gateway headers.
pub struct AuthedActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for AuthedActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| -> Option<String> {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let id = header("x-user-id")
            .and_then(|v| UserId::parse(&v).ok())
            .ok_or_else(|| ApiError::Auth("authentication required".into()))?;
        let email = header("x-user-email")
            .ok_or_else(|| ApiError::Auth("authentication required".into()))?;
        let roles = header("x-user-roles").unwrap_or_default();

        Ok(AuthedActor(Actor {
            id,
            email,
            admin: roles.split(',').any(|r| r.trim() == "admin"),
            buyer: roles.split(',').any(|r| r.trim() == "buyer"),
        }))
    }
}

fn require_admin(actor: &Actor) -> Result<(), ApiError> {
    if actor.admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden("administrator role required".into()))
    }
}

fn buyer_json(buyer: &Buyer) -> Json<serde_json::Value> {
    Json(json!({ "buyer": BuyerData::from(buyer) }))
}

// ============================================================================
// Applicant endpoints
// ============================================================================

/// POST /buyers - start an application and submit it.
pub async fn create_buyer(
    Extension(state): Extension<AppState>,
    AuthedActor(actor): AuthedActor,
    Json(profile): Json<BuyerProfile>,
) -> Result<impl IntoResponse, ApiError> {
    if state.deps.store.find_by_user(actor.id).await?.is_some() {
        return Err(ApiError::Alert(
            "Your buyer application is already initiated".into(),
        ));
    }

    let buyer = Buyer::new(actor.id, profile);
    state.deps.store.insert(&buyer).await?;

    let outcome = run_action(&state.deps, buyer, BuyerAction::Submit, AuthMode::Actor(&actor)).await?;
    Ok((StatusCode::CREATED, buyer_json(&outcome.buyer)))
}

/// PUT /buyers/:id - revise profile fields and re-submit.
pub async fn update_buyer(
    Extension(state): Extension<AppState>,
    AuthedActor(actor): AuthedActor,
    Path(id): Path<BuyerId>,
    Json(profile): Json<BuyerProfile>,
) -> Result<impl IntoResponse, ApiError> {
    let mut buyer = state
        .deps
        .store
        .find_by_user(actor.id)
        .await?
        .filter(|b| b.id == id)
        .ok_or(ActionError::NotFound)?;

    buyer.apply_profile(profile);
    let outcome = run_action(&state.deps, buyer, BuyerAction::Submit, AuthMode::Actor(&actor)).await?;
    Ok((StatusCode::CREATED, buyer_json(&outcome.buyer)))
}

/// GET /buyers/:id
pub async fn show_buyer(
    Extension(state): Extension<AppState>,
    AuthedActor(actor): AuthedActor,
    Path(id): Path<BuyerId>,
) -> Result<impl IntoResponse, ApiError> {
    let buyer = find_visible(&state, &actor, id).await?;
    Ok(buyer_json(&buyer))
}

/// GET /buyers/:id/can_buy
pub async fn can_buy(
    Extension(state): Extension<AppState>,
    AuthedActor(actor): AuthedActor,
    Path(id): Path<BuyerId>,
) -> Result<impl IntoResponse, ApiError> {
    let buyer = find_visible(&state, &actor, id).await?;
    Ok(Json(json!(buyer.approved())))
}

/// GET /buyers/my_buyer
pub async fn my_buyer(
    Extension(state): Extension<AppState>,
    AuthedActor(actor): AuthedActor,
) -> Result<impl IntoResponse, ApiError> {
    let buyers: Vec<BuyerData> = state
        .deps
        .store
        .find_by_user(actor.id)
        .await?
        .iter()
        .map(BuyerData::from)
        .collect();
    Ok(Json(json!({ "buyers": buyers })))
}

/// Admins see any application; applicants only their own.
async fn find_visible(state: &AppState, actor: &Actor, id: BuyerId) -> Result<Buyer, ApiError> {
    let buyer = state
        .deps
        .store
        .find_by_id(id)
        .await?
        .ok_or(ActionError::NotFound)?;

    if !actor.admin && buyer.user_id != actor.id {
        return Err(ActionError::NotFound.into());
    }
    Ok(buyer)
}

// ============================================================================
// Administrative endpoints
// ============================================================================

#[derive(Deserialize)]
pub struct AssignPayload {
    pub assignee: AssigneeParams,
}

#[derive(Deserialize)]
pub struct AssigneeParams {
    pub user_id: UserId,
    pub user_email: String,
}

#[derive(Deserialize)]
pub struct DecisionPayload {
    pub response: String,
}

async fn run_admin_action(
    state: &AppState,
    actor: &Actor,
    id: BuyerId,
    action: BuyerAction,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(actor)?;

    let buyer = state
        .deps
        .store
        .find_by_id(id)
        .await?
        .ok_or(ActionError::NotFound)?;

    run_action(&state.deps, buyer, action, AuthMode::Actor(actor)).await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /buyers/:id/assign
pub async fn assign_buyer(
    Extension(state): Extension<AppState>,
    AuthedActor(actor): AuthedActor,
    Path(id): Path<BuyerId>,
    Json(payload): Json<AssignPayload>,
) -> Result<impl IntoResponse, ApiError> {
    run_admin_action(
        &state,
        &actor,
        id,
        BuyerAction::Assign {
            assignee_id: payload.assignee.user_id,
            assignee_email: payload.assignee.user_email,
        },
    )
    .await
}

/// POST /buyers/:id/approve
pub async fn approve_buyer_admin(
    Extension(state): Extension<AppState>,
    AuthedActor(actor): AuthedActor,
    Path(id): Path<BuyerId>,
    Json(payload): Json<DecisionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    run_admin_action(
        &state,
        &actor,
        id,
        BuyerAction::Approve {
            response: payload.response,
        },
    )
    .await
}

/// POST /buyers/:id/decline
pub async fn decline_buyer(
    Extension(state): Extension<AppState>,
    AuthedActor(actor): AuthedActor,
    Path(id): Path<BuyerId>,
    Json(payload): Json<DecisionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    run_admin_action(
        &state,
        &actor,
        id,
        BuyerAction::Decline {
            response: payload.response,
        },
    )
    .await
}

/// POST /buyers/:id/deactivate
pub async fn deactivate_buyer(
    Extension(state): Extension<AppState>,
    AuthedActor(actor): AuthedActor,
    Path(id): Path<BuyerId>,
) -> Result<impl IntoResponse, ApiError> {
    run_admin_action(&state, &actor, id, BuyerAction::Deactivate).await
}

/// GET /buyers/:id/events - audit trail, oldest first.
pub async fn buyer_events(
    Extension(state): Extension<AppState>,
    AuthedActor(actor): AuthedActor,
    Path(id): Path<BuyerId>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&actor)?;

    state
        .deps
        .store
        .find_by_id(id)
        .await?
        .ok_or(ActionError::NotFound)?;

    let events = state.deps.store.events_for(id).await?;
    Ok(Json(json!({ "events": events })))
}

/// GET /buyers/stats
pub async fn stats(
    Extension(state): Extension<AppState>,
    AuthedActor(actor): AuthedActor,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&actor)?;
    let stats = state.deps.store.stats().await?;
    Ok(Json(json!(stats)))
}

// ============================================================================
// Unauthenticated collection endpoints
// ============================================================================

#[derive(Deserialize)]
pub struct ApproveBuyerPayload {
    pub manager_approval_token: String,
}

/// POST /buyers/approve_buyer - manager approval via emailed token.
/// Authenticates by possession of the secret, not by session.
pub async fn approve_buyer(
    Extension(state): Extension<AppState>,
    Json(payload): Json<ApproveBuyerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    approve_by_token(&state.deps, &payload.manager_approval_token).await?;
    Ok(Json(json!({ "message": "manager approved" })))
}

#[derive(Deserialize)]
pub struct AutoRegisterPayload {
    pub email: String,
    pub user_id: UserId,
    pub name: String,
}

/// POST /buyers/auto_register - trusted-service shortcut.
pub async fn auto_register_buyer(
    Extension(state): Extension<AppState>,
    AuthedActor(actor): AuthedActor,
    Json(payload): Json<AutoRegisterPayload>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&actor)?;

    let buyer = auto_register(
        &state.deps,
        AutoRegisterRequest {
            email: payload.email,
            user_id: payload.user_id,
            name: payload.name,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, buyer_json(&buyer)))
}

#[derive(Deserialize)]
pub struct CheckEmailQuery {
    pub email: String,
}

/// GET /buyers/check_email?email=...
pub async fn check_email_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<CheckEmailQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let valid = check_email(&state.deps, &query.email).await?;
    Ok(Json(json!({ "valid": valid })))
}
