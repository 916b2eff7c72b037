//! HTTP seam between scenario tasks and the wire.
//!
//! Tasks only see [`HttpSession`]; the load run uses [`ReqwestSession`], tests
//! can substitute a recording implementation.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::TaskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
}

/// One file part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartFile {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait HttpSession: Send + Sync {
    /// `path` is relative to the target host and may carry a query string.
    async fn get(&self, path: &str) -> Result<HttpReply, TaskError>;

    async fn post_multipart(&self, path: &str, file: MultipartFile)
        -> Result<HttpReply, TaskError>;
}

/// reqwest-backed session. One per simulated user, so each user keeps its own
/// connection pool and cookie-less state.
pub struct ReqwestSession {
    client: reqwest::Client,
    base: String,
}

impl ReqwestSession {
    pub fn new(host: &str, timeout: Option<Duration>) -> Result<Self, TaskError> {
        let parsed = Url::parse(host)
            .map_err(|e| TaskError::Config(format!("invalid host {:?}: {}", host, e)))?;

        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

#[async_trait]
impl HttpSession for ReqwestSession {
    async fn get(&self, path: &str) -> Result<HttpReply, TaskError> {
        let url = self.url(path);
        debug!("GET {}", url);
        let resp = self.client.get(url).send().await?;
        let status = resp.status().as_u16();
        // drain the body so the connection goes back to the pool
        let _ = resp.bytes().await?;
        Ok(HttpReply { status })
    }

    async fn post_multipart(
        &self,
        path: &str,
        file: MultipartFile,
    ) -> Result<HttpReply, TaskError> {
        let url = self.url(path);
        debug!("POST {} ({} bytes)", url, file.bytes.len());
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;
        let form = Form::new().part(file.field, part);

        let resp = self.client.post(url).multipart(form).send().await?;
        let status = resp.status().as_u16();
        let _ = resp.bytes().await?;
        Ok(HttpReply { status })
    }
}
