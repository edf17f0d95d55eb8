use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    pub password_reset_ttl_secs: u64,
    pub bcrypt_cost: u32,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    /// 部署在反向代理之后时才信任 x-real-ip / x-forwarded-for
    pub trust_proxy: bool,
    pub server_host: String,
    pub server_port: u16,
    pub frontend_url: String,
    pub upload_dir: String,
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
    pub mail_from: String,
    pub currency: String,
}

/// 读取可选环境变量，解析失败时回退到默认值
fn var_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// 令牌有效期上限，十年
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

fn ttl_or(key: &str, default: u64) -> u64 {
    var_or(key, default).min(MAX_TTL_SECS)
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            access_token_ttl_secs: ttl_or("ACCESS_TOKEN_TTL_SECS", 15 * 60),
            refresh_token_ttl_secs: ttl_or("REFRESH_TOKEN_TTL_SECS", 7 * 24 * 3600),
            password_reset_ttl_secs: ttl_or("PASSWORD_RESET_TTL_SECS", 30 * 60),
            bcrypt_cost: var_or("BCRYPT_COST", bcrypt::DEFAULT_COST),
            rate_limit_window_secs: var_or("RATE_LIMIT_WINDOW", 60),
            rate_limit_requests: var_or("RATE_LIMIT_REQUESTS", 100),
            trust_proxy: var_or("TRUST_PROXY", false),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            server_port: var_or("SERVER_PORT", 3000),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into()),
            mail_api_url: env::var("MAIL_API_URL").ok().filter(|v| !v.is_empty()),
            mail_api_key: env::var("MAIL_API_KEY").ok().filter(|v| !v.is_empty()),
            mail_from: env::var("MAIL_FROM").unwrap_or_else(|_| "noreply@company.com".into()),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "INR".into()),
        })
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_ttl_secs)
    }

    /// 登录和刷新共用同一个有效期
    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_ttl_secs)
    }

    pub fn password_reset_ttl(&self) -> Duration {
        Duration::from_secs(self.password_reset_ttl_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    /// 工资单 PDF 存放目录
    pub fn payroll_document_dir(&self) -> PathBuf {
        PathBuf::from(&self.upload_dir).join("payroll")
    }
}
