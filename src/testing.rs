//! 测试夹具：内存存储、记录型邮件、临时目录里的工资条

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::AppState;
use crate::config::Config;
use crate::database::Repositories;
use crate::database::memory::MemoryStore;
use crate::models::{Leave, LeaveStatus, LeaveType, NewUser, Payroll, Role, User, UserUpdate};
use crate::services::document::{DocumentError, DocumentGenerator, PdfSlipGenerator};
use crate::services::mailer::{MailError, Mailer};
use crate::services::token::generate_access_token;
use crate::utils::hash_password;

pub const TEST_PASSWORD: &str = "Password@123";

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/workforce_test".into(),
        redis_url: "redis://127.0.0.1:1/".into(),
        jwt_secret: "test-secret-that-is-long-enough-for-hs256".into(),
        access_token_ttl_secs: 900,
        refresh_token_ttl_secs: 7 * 24 * 3600,
        password_reset_ttl_secs: 1800,
        bcrypt_cost: 4,
        rate_limit_window_secs: 60,
        rate_limit_requests: 100,
        trust_proxy: false,
        server_host: "127.0.0.1".into(),
        server_port: 0,
        frontend_url: "http://localhost:3000".into(),
        upload_dir: std::env::temp_dir()
            .join(format!("workforce-test-{}", Uuid::new_v4()))
            .to_string_lossy()
            .into_owned(),
        mail_api_url: None,
        mail_api_key: None,
        mail_from: "noreply@company.com".into(),
        currency: "INR".into(),
    }
}

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

/// 让后台任务跑完
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Rejected(503));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

struct FailingDocuments;

#[async_trait]
impl DocumentGenerator for FailingDocuments {
    async fn generate_salary_slip(
        &self,
        _payroll: &Payroll,
        _employee: &User,
    ) -> Result<String, DocumentError> {
        Err(std::io::Error::other("disk full").into())
    }

    async fn read(&self, _path: &str) -> Result<Option<Vec<u8>>, DocumentError> {
        Ok(None)
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    upload_dir: PathBuf,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(false, false)
    }

    pub fn with_failing_mailer() -> Self {
        Self::build(true, false)
    }

    pub fn with_failing_documents() -> Self {
        Self::build(false, true)
    }

    fn build(fail_mail: bool, fail_documents: bool) -> Self {
        let config = test_config();
        let upload_dir = PathBuf::from(&config.upload_dir);
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer {
            sent: Mutex::default(),
            fail: fail_mail,
        });
        let documents: Arc<dyn DocumentGenerator> = if fail_documents {
            Arc::new(FailingDocuments)
        } else {
            Arc::new(PdfSlipGenerator::new(&upload_dir))
        };

        let state = AppState {
            config: Arc::new(config),
            repos: Repositories::from_store(store.clone()),
            mailer: mailer.clone(),
            documents,
        };
        Self {
            state,
            store,
            mailer,
            upload_dir,
        }
    }

    pub fn router(&self) -> Router {
        crate::routes::create_router(self.state.clone())
    }

    /// 创建用户，密码为 [`TEST_PASSWORD`]，工号为 `EMP-<邮箱前缀>`
    pub async fn user(&self, email: &str, role: Role) -> User {
        let local = email.split('@').next().unwrap_or(email);
        self.state
            .repos
            .users
            .insert(NewUser {
                name: local.to_string(),
                email: email.to_string(),
                password_hash: hash_password(TEST_PASSWORD, 4).unwrap(),
                role,
                employee_code: Some(format!("EMP-{local}")),
                department: Some("Engineering".into()),
                designation: None,
            })
            .await
            .unwrap()
    }

    pub async fn deactivate(&self, user_id: Uuid) {
        let update = UserUpdate {
            is_active: Some(false),
            ..UserUpdate::default()
        };
        self.state
            .repos
            .users
            .update(user_id, &update)
            .await
            .unwrap();
    }

    pub fn bearer(&self, user: &User) -> String {
        let (token, _) = generate_access_token(user, &self.state.config).unwrap();
        format!("Bearer {token}")
    }

    pub async fn approved_leave(&self, employee_id: Uuid, from: &str, to: &str) -> Leave {
        let now = Utc::now();
        let leave = Leave {
            id: Uuid::new_v4(),
            employee_id,
            leave_type: LeaveType::Earned,
            from_date: date(from),
            to_date: date(to),
            reason: None,
            status: LeaveStatus::Approved,
            approved_by: None,
            approved_at: Some(now),
            rejection_reason: None,
            conflict_detected: false,
            created_at: now,
            updated_at: now,
        };
        self.store.put_leave(leave.clone());
        leave
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}
