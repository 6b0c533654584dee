//! Comment thread reconciliation.
//!
//! Comments nest (replies under replies), and patching a tree incrementally
//! under concurrent edits is more failure-prone than it is worth at comment
//! volumes. So this store never merges events into the tree: any comment
//! event for its issue, self-originated or peer, marks the thread stale,
//! and the owning view re-fetches the whole tree from the bulk-fetch
//! collaborator. Contrast with the flat issue list, which merges in place.

use crate::event::ServerEvent;
use crate::types::CommentNode;

/// View state for one issue's comment thread.
#[derive(Debug)]
pub struct CommentThreadStore {
    issue_id: i64,
    thread: Vec<CommentNode>,
}

impl CommentThreadStore {
    pub fn new(issue_id: i64) -> Self {
        Self {
            issue_id,
            thread: Vec::new(),
        }
    }

    pub fn issue_id(&self) -> i64 {
        self.issue_id
    }

    /// Replace the thread with a fresh fetch result.
    pub fn load(&mut self, thread: Vec<CommentNode>) {
        self.thread = thread;
    }

    /// Whether this event obliges a re-fetch: any comment kind addressed to
    /// this store's issue. Events for other issues and non-comment kinds are
    /// ignored.
    pub fn needs_refresh(&self, event: &ServerEvent) -> bool {
        event.comment_issue_id() == Some(self.issue_id)
    }

    pub fn thread(&self) -> &[CommentNode] {
        &self.thread
    }

    /// Total comment count across the whole tree.
    pub fn count(&self) -> usize {
        self.thread.iter().map(CommentNode::count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CommentSnapshot;

    fn comment(id: i64, issue_id: i64, parent: Option<i64>) -> CommentSnapshot {
        CommentSnapshot {
            id,
            issue_id,
            content: format!("comment {id}"),
            user_id: Some(1),
            parent_comment_id: parent,
            user_name: None,
            user_email: None,
            user_role: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn any_comment_kind_for_this_issue_triggers_refresh() {
        let store = CommentThreadStore::new(3);
        let by = "peer@example.com".to_string();

        let created = ServerEvent::CommentCreated {
            comment: comment(10, 3, Some(5)),
            originator_email: by.clone(),
        };
        let updated = ServerEvent::CommentUpdated {
            comment: comment(10, 3, Some(5)),
            originator_email: by.clone(),
        };
        let deleted = ServerEvent::CommentDeleted {
            id: 10,
            issue_id: 3,
            originator_email: by,
        };

        assert!(store.needs_refresh(&created));
        assert!(store.needs_refresh(&updated));
        assert!(store.needs_refresh(&deleted));
    }

    #[test]
    fn other_issues_and_other_kinds_are_ignored() {
        let store = CommentThreadStore::new(3);
        let other_issue = ServerEvent::CommentCreated {
            comment: comment(10, 4, None),
            originator_email: "peer@example.com".to_string(),
        };
        let presence = ServerEvent::PresenceOnline {
            user_id: 1,
            user_email: "peer@example.com".to_string(),
        };
        assert!(!store.needs_refresh(&other_issue));
        assert!(!store.needs_refresh(&presence));
    }

    #[test]
    fn count_walks_nested_replies() {
        let mut store = CommentThreadStore::new(3);
        store.load(vec![
            CommentNode {
                comment: comment(5, 3, None),
                replies: vec![CommentNode {
                    comment: comment(6, 3, Some(5)),
                    replies: vec![CommentNode {
                        comment: comment(7, 3, Some(6)),
                        replies: vec![],
                    }],
                }],
            },
            CommentNode {
                comment: comment(8, 3, None),
                replies: vec![],
            },
        ]);
        assert_eq!(store.count(), 4);
    }
}
