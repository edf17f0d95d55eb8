use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    common::PageRequest,
    error::AppResult,
    middleware::{Client, CurrentUser},
    models::{AuditEntry, UserFilter, audit::actions},
    services::{audit, user},
    utils::success_to_api_response,
};

use super::model::{CreateUserRequest, DeactivateResponse, UpdateUserRequest, UserListQuery};

#[axum::debug_handler]
pub async fn me(actor: CurrentUser) -> impl IntoResponse {
    (StatusCode::OK, success_to_api_response(actor.0))
}

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    actor: CurrentUser,
    Query(query): Query<UserListQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = UserFilter {
        role: query.role.as_deref().map(user::parse_role).transpose()?,
        active: query.active.as_deref() != Some("false"),
        search: query.search.clone().filter(|s| !s.trim().is_empty()),
    };
    let page = PageRequest::from(&query.page_query());

    let users = user::list(&state, &actor, filter, page).await?;
    Ok((StatusCode::OK, success_to_api_response(users)))
}

#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    actor: CurrentUser,
    Client(meta): Client,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let created = user::create(&state, &actor, req.into()).await?;

    audit::emit(
        &state.repos.audit_logs,
        AuditEntry::new(actions::USER_CREATE, actor.id, &meta)
            .target("User", created.id)
            .details(&serde_json::json!({ "email": created.email, "role": created.role })),
    );
    Ok((StatusCode::CREATED, success_to_api_response(created)))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let found = user::get(&state, &actor, id).await?;
    Ok((StatusCode::OK, success_to_api_response(found)))
}

#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    actor: CurrentUser,
    Client(meta): Client,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let updated = user::update(&state, &actor, id, req.into()).await?;

    audit::emit(
        &state.repos.audit_logs,
        AuditEntry::new(actions::USER_UPDATE, actor.id, &meta)
            .target("User", updated.id)
            .details(&serde_json::json!({ "role": updated.role, "isActive": updated.is_active })),
    );
    Ok((StatusCode::OK, success_to_api_response(updated)))
}

#[axum::debug_handler]
pub async fn deactivate_user(
    State(state): State<AppState>,
    actor: CurrentUser,
    Client(meta): Client,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let deactivated = user::deactivate(&state, &actor, id).await?;

    audit::emit(
        &state.repos.audit_logs,
        AuditEntry::new(actions::USER_DEACTIVATE, actor.id, &meta).target("User", deactivated.id),
    );
    Ok((
        StatusCode::OK,
        success_to_api_response(DeactivateResponse {
            id: deactivated.id,
            is_active: deactivated.is_active,
        }),
    ))
}
