#![allow(dead_code)]

use async_trait::async_trait;
use loadtest_client::session::{HttpReply, HttpSession, MultipartFile};
use loadtest_client::TaskError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Get(String),
    Post { path: String, file: MultipartFile },
}

/// In-memory session: records every call and answers with a fixed status per path.
#[derive(Clone, Default)]
pub struct RecordingSession {
    calls: Arc<Mutex<Vec<Recorded>>>,
    statuses: HashMap<String, u16>,
    broken: bool,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `status` for `path` (query string ignored). Unlisted paths get 200.
    pub fn with_status(mut self, path: &str, status: u16) -> Self {
        self.statuses.insert(path.to_string(), status);
        self
    }

    /// Every call fails at the transport level.
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().clone()
    }

    fn answer(&self, path: &str) -> Result<HttpReply, TaskError> {
        if self.broken {
            return Err(TaskError::Transport("connection refused".into()));
        }
        let bare = path.split('?').next().unwrap_or(path);
        let status = self.statuses.get(bare).copied().unwrap_or(200);
        Ok(HttpReply { status })
    }
}

#[async_trait]
impl HttpSession for RecordingSession {
    async fn get(&self, path: &str) -> Result<HttpReply, TaskError> {
        self.calls.lock().push(Recorded::Get(path.to_string()));
        self.answer(path)
    }

    async fn post_multipart(
        &self,
        path: &str,
        file: MultipartFile,
    ) -> Result<HttpReply, TaskError> {
        self.calls.lock().push(Recorded::Post {
            path: path.to_string(),
            file,
        });
        self.answer(path)
    }
}

/// Accepts every call and never answers.
#[derive(Clone, Default)]
pub struct StalledSession;

#[async_trait]
impl HttpSession for StalledSession {
    async fn get(&self, _path: &str) -> Result<HttpReply, TaskError> {
        std::future::pending().await
    }

    async fn post_multipart(
        &self,
        _path: &str,
        _file: MultipartFile,
    ) -> Result<HttpReply, TaskError> {
        std::future::pending().await
    }
}

pub fn setup_logger() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info,loadtest_client=debug")
        .with_test_writer()
        .try_init();
}
