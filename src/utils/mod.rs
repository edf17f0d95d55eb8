use axum::Json;
use bcrypt::{hash, verify};
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::common::ApiResponse;

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), cost)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

/// 生成 `bytes` 字节的随机令牌，十六进制编码
pub fn generate_opaque_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// 令牌入库前统一做 SHA-256
pub fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// 邮箱统一小写、去空白
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 基本格式检查：本地部分和域名非空，域名带点
pub fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: error_codes::SUCCESS,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code,
        msg,
        resp_data: None,
    })
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const CONFLICT: i32 = 1001;
    pub const AUTH_FAILED: i32 = 1002;
    pub const PERMISSION_DENIED: i32 = 1003;
    pub const NOT_FOUND: i32 = 1004;
    pub const RATE_LIMIT: i32 = 1005;
    pub const TOKEN_EXPIRED: i32 = 1006;
    pub const ACCOUNT_INACTIVE: i32 = 1007;
    pub const INVALID_RESET_TOKEN: i32 = 1008;
    pub const ALREADY_PROCESSED: i32 = 1009;
    pub const INTERNAL_ERROR: i32 = 5000;
}
