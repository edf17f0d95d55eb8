use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::database::StoreError;
use crate::utils::{error_codes, error_to_api_response};

/// 应用错误
///
/// 领域层统一返回这个类型，由 [`IntoResponse`] 映射成 HTTP 状态码和对外消息。
/// 5xx 的细节只写日志，不返回给调用方。
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Access token required")]
    MissingToken,

    /// 访问令牌签名错误或格式错误
    #[error("Invalid token")]
    TokenInvalid,

    /// 刷新令牌不存在或已吊销
    #[error("Invalid or expired refresh token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("User not found")]
    UserNotFound,

    #[error("Account is deactivated")]
    AccountInactive,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid or expired reset token")]
    InvalidOrExpiredToken,

    #[error("Already processed")]
    AlreadyProcessed,

    #[error("Payroll already exists for this month/year")]
    DuplicatePayroll,

    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, i32) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR),
            AppError::InvalidCredentials
            | AppError::MissingToken
            | AppError::TokenInvalid
            | AppError::InvalidToken
            | AppError::UserNotFound => (StatusCode::UNAUTHORIZED, error_codes::AUTH_FAILED),
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, error_codes::TOKEN_EXPIRED),
            AppError::AccountInactive => (StatusCode::FORBIDDEN, error_codes::ACCOUNT_INACTIVE),
            AppError::InsufficientPermissions => {
                (StatusCode::FORBIDDEN, error_codes::PERMISSION_DENIED)
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
            AppError::InvalidOrExpiredToken => {
                (StatusCode::BAD_REQUEST, error_codes::INVALID_RESET_TOKEN)
            }
            AppError::AlreadyProcessed => (StatusCode::BAD_REQUEST, error_codes::ALREADY_PROCESSED),
            AppError::DuplicatePayroll | AppError::Conflict(_) => {
                (StatusCode::CONFLICT, error_codes::CONFLICT)
            }
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, error_codes::RATE_LIMIT),
            AppError::Store(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };

        (status, error_to_api_response::<()>(code, message)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
