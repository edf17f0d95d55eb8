//! 邮件发送
//!
//! 未配置 `MAIL_API_URL` 时使用 [`LogMailer`]，只写日志。

use async_trait::async_trait;
use serde::Serialize;

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail api rejected message with status {0}")]
    Rejected(u16),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError>;
}

/// 只记录日志的邮件实现
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email(&self, to: &str, subject: &str, _html: &str) -> Result<(), MailError> {
        tracing::info!(to, subject, "Mail transport not configured, message logged only");
        Ok(())
    }
}

#[derive(Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// 通过 HTTP 邮件网关发送
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: String, api_key: Option<String>, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        let mut request = self.client.post(&self.endpoint).json(&OutgoingMail {
            from: &self.from,
            to,
            subject,
            html,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(MailError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}

/// 按配置选择实现
pub fn from_config(config: &Config) -> std::sync::Arc<dyn Mailer> {
    match &config.mail_api_url {
        Some(url) => std::sync::Arc::new(HttpMailer::new(
            url.clone(),
            config.mail_api_key.clone(),
            config.mail_from.clone(),
        )),
        None => std::sync::Arc::new(LogMailer),
    }
}

/// 插入 HTML 正文前转义
fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

pub fn password_reset_email(reset_link: &str, expiry_minutes: u64) -> (String, String) {
    let reset_link = escape_html(reset_link);
    (
        "Password Reset - Employee Management".to_string(),
        format!(
            "<p>You requested a password reset.</p>\
             <p><a href=\"{reset_link}\">Reset your password</a></p>\
             <p>Link expires in {expiry_minutes} minutes.</p>\
             <p>If you did not request this, ignore this email.</p>"
        ),
    )
}

pub fn welcome_email(email: &str, name: &str, temp_password: &str) -> (String, String) {
    let (email, name, temp_password) = (
        escape_html(email),
        escape_html(name),
        escape_html(temp_password),
    );
    (
        "Welcome - Employee Management".to_string(),
        format!(
            "<p>Hi {name},</p>\
             <p>Your account has been created. Please login and change your password.</p>\
             <p>Email: {email}</p>\
             <p>Temporary password: {temp_password}</p>"
        ),
    )
}
