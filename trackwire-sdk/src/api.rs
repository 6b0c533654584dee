//! Interfaces to the external REST tier.
//!
//! Persistence lives outside this subsystem. The traits here are the only
//! way the realtime layer talks to it: every mutation returns the canonical
//! persisted record, awaited *before* any event is emitted. [`HttpApi`] is
//! the production implementation against the tracker's REST API.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ApiError;
use crate::types::{CommentNode, CommentSnapshot, IssueSnapshot, IssueStatus};

/// Fields accepted when creating an issue.
#[derive(Debug, Clone, Serialize)]
pub struct IssueDraft {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<i64>,
}

/// Partial update for an issue. Only set fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IssuePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IssueStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_developer: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_tester: Option<i64>,
}

/// Issue persistence collaborator.
#[async_trait]
pub trait IssueApi: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<IssueSnapshot>, ApiError>;
    async fn create(&self, draft: &IssueDraft) -> Result<IssueSnapshot, ApiError>;
    async fn update(&self, id: i64, patch: &IssuePatch) -> Result<IssueSnapshot, ApiError>;
    async fn delete(&self, id: i64) -> Result<(), ApiError>;
}

/// Comment persistence collaborator.
///
/// `fetch_thread` returns the fully nested tree; the comment view re-fetches
/// it on every change instead of patching incrementally.
#[async_trait]
pub trait CommentApi: Send + Sync {
    async fn fetch_thread(&self, issue_id: i64) -> Result<Vec<CommentNode>, ApiError>;
    async fn create(
        &self,
        issue_id: i64,
        content: &str,
        parent_comment_id: Option<i64>,
    ) -> Result<CommentSnapshot, ApiError>;
    async fn update(&self, id: i64, content: &str) -> Result<CommentSnapshot, ApiError>;
    async fn delete(&self, id: i64) -> Result<(), ApiError>;
}

/// reqwest-backed implementation of both collaborator traits.
pub struct HttpApi {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl HttpApi {
    /// `base_url` is the REST tier's origin, e.g. `http://127.0.0.1:5000`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            token: token.into(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(ApiError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

fn transport(e: reqwest::Error) -> ApiError {
    ApiError::Transport(e.to_string())
}

fn decode(e: reqwest::Error) -> ApiError {
    ApiError::Decode(e.to_string())
}

#[async_trait]
impl IssueApi for HttpApi {
    async fn fetch_all(&self) -> Result<Vec<IssueSnapshot>, ApiError> {
        let resp = self
            .http
            .get(self.url("/api/issues"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport)?;
        Self::check(resp).await?.json().await.map_err(decode)
    }

    async fn create(&self, draft: &IssueDraft) -> Result<IssueSnapshot, ApiError> {
        let resp = self
            .http
            .post(self.url("/api/issues"))
            .bearer_auth(&self.token)
            .json(draft)
            .send()
            .await
            .map_err(transport)?;
        Self::check(resp).await?.json().await.map_err(decode)
    }

    async fn update(&self, id: i64, patch: &IssuePatch) -> Result<IssueSnapshot, ApiError> {
        let resp = self
            .http
            .patch(self.url(&format!("/api/issues/{id}")))
            .bearer_auth(&self.token)
            .json(patch)
            .send()
            .await
            .map_err(transport)?;
        Self::check(resp).await?.json().await.map_err(decode)
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let resp = self
            .http
            .delete(self.url(&format!("/api/issues/{id}")))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport)?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct CommentBody<'a> {
    issue_id: i64,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_comment_id: Option<i64>,
}

#[async_trait]
impl CommentApi for HttpApi {
    async fn fetch_thread(&self, issue_id: i64) -> Result<Vec<CommentNode>, ApiError> {
        let resp = self
            .http
            .get(self.url(&format!("/api/comments/issue/{issue_id}")))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport)?;
        Self::check(resp).await?.json().await.map_err(decode)
    }

    async fn create(
        &self,
        issue_id: i64,
        content: &str,
        parent_comment_id: Option<i64>,
    ) -> Result<CommentSnapshot, ApiError> {
        let resp = self
            .http
            .post(self.url("/api/comments"))
            .bearer_auth(&self.token)
            .json(&CommentBody {
                issue_id,
                content,
                parent_comment_id,
            })
            .send()
            .await
            .map_err(transport)?;
        Self::check(resp).await?.json().await.map_err(decode)
    }

    async fn update(&self, id: i64, content: &str) -> Result<CommentSnapshot, ApiError> {
        let resp = self
            .http
            .patch(self.url(&format!("/api/comments/{id}")))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(transport)?;
        Self::check(resp).await?.json().await.map_err(decode)
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let resp = self
            .http
            .delete(self.url(&format!("/api/comments/{id}")))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport)?;
        Self::check(resp).await?;
        Ok(())
    }
}
