use axum::{
    body::Bytes,
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::{
    AppState,
    error::{AppError, AppResult},
    middleware::Client,
    services::{auth, password_reset, token},
    utils::success_to_api_response,
};

use super::model::{
    ForgotPasswordRequest, LoginRequest, MessageResponse, RefreshTokenRequest,
    ResetPasswordRequest, SessionResponse,
};

const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// 请求体优先，其次 `x-refresh-token` 头；请求体可以为空
fn refresh_token_from(headers: &HeaderMap, body: &Bytes) -> Option<String> {
    serde_json::from_slice::<RefreshTokenRequest>(body)
        .ok()
        .and_then(|req| req.refresh_token)
        .or_else(|| {
            headers
                .get(REFRESH_TOKEN_HEADER)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        })
        .filter(|t| !t.trim().is_empty())
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Client(meta): Client,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let (tokens, user) = auth::login(&state, &req.email, &req.password, &meta).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response(SessionResponse { tokens, user }),
    ))
}

#[axum::debug_handler]
pub async fn refresh(
    State(state): State<AppState>,
    Client(meta): Client,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let refresh_token = refresh_token_from(&headers, &body)
        .ok_or_else(|| AppError::Validation("Refresh token required".to_string()))?;

    let (tokens, user) = token::rotate_refresh(&state, &refresh_token, &meta).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response(SessionResponse { tokens, user }),
    ))
}

#[axum::debug_handler]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> AppResult<impl IntoResponse> {
    let message = password_reset::request_reset(&state, &req.email).await?;
    Ok((StatusCode::OK, success_to_api_response(MessageResponse { message })))
}

#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<impl IntoResponse> {
    let message = password_reset::consume_reset(&state, &req.token, &req.password).await?;
    Ok((StatusCode::OK, success_to_api_response(MessageResponse { message })))
}

#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let refresh_token = refresh_token_from(&headers, &body);
    auth::logout(&state, refresh_token.as_deref()).await;
    (
        StatusCode::OK,
        success_to_api_response(MessageResponse {
            message: "Logged out.",
        }),
    )
}
