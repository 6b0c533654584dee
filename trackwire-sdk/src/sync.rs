//! Mutation flow: REST first, emit and apply on success.
//!
//! The views here are the only place mutations meet the realtime socket.
//! Each mutation awaits the REST collaborator and touches the store and the
//! [`EventSink`] exclusively inside the `Ok` branch, so an event for a
//! mutation that never persisted cannot be emitted. There is no code path
//! for it, not just a convention against it.
//!
//! The local application never waits for the broadcast to round-trip: the
//! originator updates its own view from the REST response and the gateway
//! excludes it from the fanout.

use std::sync::Arc;

use crate::api::{CommentApi, IssueApi, IssueDraft, IssuePatch};
use crate::client::RealtimeClient;
use crate::error::ApiError;
use crate::event::{ClientEvent, ServerEvent};
use crate::store::{CommentThreadStore, IssueListStore};
use crate::types::{CommentNode, CommentSnapshot, IssueSnapshot};

/// Where successful mutations publish their events. [`RealtimeClient`] is
/// the production sink; tests substitute a recording one.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ClientEvent);
}

impl EventSink for RealtimeClient {
    fn emit(&self, event: ClientEvent) {
        RealtimeClient::emit(self, event);
    }
}

/// The issue list page: bulk load, optimistic local mutations, peer merge.
pub struct IssueListView {
    store: IssueListStore,
    api: Arc<dyn IssueApi>,
    sink: Arc<dyn EventSink>,
}

impl IssueListView {
    pub fn new(api: Arc<dyn IssueApi>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            store: IssueListStore::new(),
            api,
            sink,
        }
    }

    /// Bulk load, on mount and after a reconnect.
    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        let issues = self.api.fetch_all().await?;
        self.store.load(issues);
        Ok(())
    }

    pub async fn create_issue(&mut self, draft: IssueDraft) -> Result<IssueSnapshot, ApiError> {
        let issue = self.api.create(&draft).await?;
        self.store.upsert(issue.clone());
        self.sink.emit(ClientEvent::IssueCreated(issue.clone()));
        Ok(issue)
    }

    pub async fn update_issue(
        &mut self,
        id: i64,
        patch: IssuePatch,
    ) -> Result<IssueSnapshot, ApiError> {
        let issue = self.api.update(id, &patch).await?;
        self.store.upsert(issue.clone());
        self.sink.emit(ClientEvent::IssueUpdated(issue.clone()));
        Ok(issue)
    }

    pub async fn delete_issue(&mut self, id: i64) -> Result<(), ApiError> {
        self.api.delete(id).await?;
        self.store.remove(id);
        self.sink.emit(ClientEvent::IssueDeleted { id });
        Ok(())
    }

    /// Typing indicators are ephemeral view state, not mutations; they go
    /// straight to the sink with no REST gate.
    pub fn set_typing(&self, issue_id: i64, is_typing: bool) {
        self.sink.emit(ClientEvent::TypingChanged {
            issue_id,
            is_typing,
        });
    }

    /// Merge a relayed peer event into the list.
    pub fn apply_remote(&mut self, event: &ServerEvent) {
        self.store.apply_event(event);
    }

    pub fn store(&self) -> &IssueListStore {
        &self.store
    }
}

/// One issue's comment thread: re-fetches the whole tree on any change,
/// its own included, instead of patching incrementally.
pub struct CommentThreadView {
    store: CommentThreadStore,
    api: Arc<dyn CommentApi>,
    sink: Arc<dyn EventSink>,
}

impl CommentThreadView {
    pub fn new(issue_id: i64, api: Arc<dyn CommentApi>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            store: CommentThreadStore::new(issue_id),
            api,
            sink,
        }
    }

    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        let thread = self.api.fetch_thread(self.store.issue_id()).await?;
        self.store.load(thread);
        Ok(())
    }

    pub async fn post_comment(
        &mut self,
        content: &str,
        parent_comment_id: Option<i64>,
    ) -> Result<CommentSnapshot, ApiError> {
        let comment = self
            .api
            .create(self.store.issue_id(), content, parent_comment_id)
            .await?;
        self.sink.emit(ClientEvent::CommentCreated(comment.clone()));
        self.refresh().await?;
        Ok(comment)
    }

    pub async fn edit_comment(
        &mut self,
        id: i64,
        content: &str,
    ) -> Result<CommentSnapshot, ApiError> {
        let comment = self.api.update(id, content).await?;
        self.sink.emit(ClientEvent::CommentUpdated(comment.clone()));
        self.refresh().await?;
        Ok(comment)
    }

    pub async fn delete_comment(&mut self, id: i64) -> Result<(), ApiError> {
        self.api.delete(id).await?;
        self.sink.emit(ClientEvent::CommentDeleted {
            id,
            issue_id: self.store.issue_id(),
        });
        self.refresh().await?;
        Ok(())
    }

    /// Handle a relayed peer event. Returns whether a re-fetch happened.
    pub async fn handle_remote(&mut self, event: &ServerEvent) -> Result<bool, ApiError> {
        if !self.store.needs_refresh(event) {
            return Ok(false);
        }
        self.refresh().await?;
        Ok(true)
    }

    pub fn thread(&self) -> &[CommentNode] {
        self.store.thread()
    }

    pub fn store(&self) -> &CommentThreadStore {
        &self.store
    }
}
