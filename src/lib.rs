use std::sync::Arc;

use config::Config;
use database::Repositories;
use services::{document::DocumentGenerator, mailer::Mailer};

pub mod common;
pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

#[cfg(test)]
mod testing;

/// 请求间共享的只读状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repos: Repositories,
    pub mailer: Arc<dyn Mailer>,
    pub documents: Arc<dyn DocumentGenerator>,
}
