//! Issue list reconciliation.
//!
//! The list is newest-first and keyed by issue id. All merges go through
//! [`IssueListStore::upsert`] / [`IssueListStore::remove`]: an event about an
//! id we already hold replaces that entry in place, an event about an unknown
//! id inserts at the head, and removing an unknown id is a no-op. That
//! discipline makes the store converge regardless of how the local-success
//! and peer-broadcast paths interleave, and tolerates a reconnect-triggered
//! re-fetch racing a peer event.
//!
//! Events about the same id arriving out of causal order are applied as
//! received (an update after a delete re-inserts the snapshot). There is no
//! per-entity version number to discard stale updates: last write by
//! arrival order wins.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::event::ServerEvent;
use crate::types::IssueSnapshot;

/// View state for an issue list page: ordered snapshots, who is online, and
/// who is typing on which issue.
#[derive(Debug, Default)]
pub struct IssueListStore {
    issues: Vec<IssueSnapshot>,
    online: HashSet<i64>,
    typing: HashMap<i64, BTreeSet<String>>,
}

impl IssueListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list with a bulk-fetch result. The only operation
    /// allowed to do so; presence and typing state are left untouched.
    pub fn load(&mut self, issues: Vec<IssueSnapshot>) {
        self.issues = issues;
    }

    /// Insert or replace by id. Existing entries keep their position; new
    /// ids go to the head of the list.
    pub fn upsert(&mut self, issue: IssueSnapshot) {
        match self.issues.iter_mut().find(|i| i.id == issue.id) {
            Some(slot) => *slot = issue,
            None => self.issues.insert(0, issue),
        }
    }

    /// Remove by id. Unknown ids are a no-op.
    pub fn remove(&mut self, id: i64) {
        self.issues.retain(|i| i.id != id);
    }

    pub fn set_online(&mut self, user_id: i64) {
        self.online.insert(user_id);
    }

    pub fn set_offline(&mut self, user_id: i64) {
        self.online.remove(&user_id);
    }

    /// Track who is typing on which issue. When the last typist of an issue
    /// stops, the issue's key is dropped entirely, so "is anyone typing on
    /// X" is answered by key presence.
    pub fn set_typing(&mut self, issue_id: i64, email: &str, is_typing: bool) {
        if is_typing {
            self.typing.entry(issue_id).or_default().insert(email.to_string());
        } else if let Some(set) = self.typing.get_mut(&issue_id) {
            set.remove(email);
            if set.is_empty() {
                self.typing.remove(&issue_id);
            }
        }
    }

    /// Apply a relayed peer event. Comment events do not touch this view.
    pub fn apply_event(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::IssueCreated { issue, .. } | ServerEvent::IssueUpdated { issue, .. } => {
                self.upsert(issue.clone());
            }
            ServerEvent::IssueDeleted { id, .. } => self.remove(*id),
            ServerEvent::PresenceOnline { user_id, .. } => self.set_online(*user_id),
            ServerEvent::PresenceOffline { user_id, .. } => self.set_offline(*user_id),
            ServerEvent::TypingChanged {
                issue_id,
                user_email,
                is_typing,
                ..
            } => self.set_typing(*issue_id, user_email, *is_typing),
            ServerEvent::CommentCreated { .. }
            | ServerEvent::CommentUpdated { .. }
            | ServerEvent::CommentDeleted { .. } => {}
        }
    }

    pub fn issues(&self) -> &[IssueSnapshot] {
        &self.issues
    }

    pub fn online_users(&self) -> &HashSet<i64> {
        &self.online
    }

    pub fn is_online(&self, user_id: i64) -> bool {
        self.online.contains(&user_id)
    }

    /// Emails currently typing on an issue, `None` when nobody is.
    pub fn typing_on(&self, issue_id: i64) -> Option<&BTreeSet<String>> {
        self.typing.get(&issue_id)
    }

    pub fn is_anyone_typing(&self, issue_id: i64) -> bool {
        self.typing.contains_key(&issue_id)
    }
}
