//! The domain-event wire protocol.
//!
//! Every frame on the realtime socket is a JSON object of the shape
//! `{ "kind": <tag>, "payload": { ... } }` with nine possible kinds.
//! Clients emit the seven mutation/typing kinds ([`ClientEvent`]); the
//! gateway stamps the originator identity onto every relayed frame and is
//! the only producer of the two presence kinds ([`ServerEvent`]).
//!
//! Originator fields come from the authenticated connection, never from the
//! client payload: they simply are not part of [`ClientEvent`], so a frame
//! that tries to carry them (or to forge a presence kind) fails the tagged
//! parse at the relay boundary and is dropped as malformed.

use serde::{Deserialize, Serialize};

use crate::types::{CommentSnapshot, IssueSnapshot};

/// The nine event kinds, used as subscription keys and for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    IssueCreated,
    IssueUpdated,
    IssueDeleted,
    CommentCreated,
    CommentUpdated,
    CommentDeleted,
    PresenceOnline,
    PresenceOffline,
    TypingChanged,
}

impl EventKind {
    /// The wire tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::IssueCreated => "issue:created",
            EventKind::IssueUpdated => "issue:updated",
            EventKind::IssueDeleted => "issue:deleted",
            EventKind::CommentCreated => "comment:created",
            EventKind::CommentUpdated => "comment:updated",
            EventKind::CommentDeleted => "comment:deleted",
            EventKind::PresenceOnline => "presence:online",
            EventKind::PresenceOffline => "presence:offline",
            EventKind::TypingChanged => "typing:changed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event as emitted by a client, before the gateway stamps it.
///
/// Only emitted after the corresponding REST mutation succeeded; the relay
/// does not re-validate payloads. Presence kinds are deliberately absent:
/// the gateway derives presence from the connection lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum ClientEvent {
    #[serde(rename = "issue:created")]
    IssueCreated(IssueSnapshot),
    #[serde(rename = "issue:updated")]
    IssueUpdated(IssueSnapshot),
    #[serde(rename = "issue:deleted")]
    IssueDeleted { id: i64 },
    #[serde(rename = "comment:created")]
    CommentCreated(CommentSnapshot),
    #[serde(rename = "comment:updated")]
    CommentUpdated(CommentSnapshot),
    #[serde(rename = "comment:deleted")]
    CommentDeleted { id: i64, issue_id: i64 },
    #[serde(rename = "typing:changed")]
    TypingChanged { issue_id: i64, is_typing: bool },
}

impl ClientEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ClientEvent::IssueCreated(_) => EventKind::IssueCreated,
            ClientEvent::IssueUpdated(_) => EventKind::IssueUpdated,
            ClientEvent::IssueDeleted { .. } => EventKind::IssueDeleted,
            ClientEvent::CommentCreated(_) => EventKind::CommentCreated,
            ClientEvent::CommentUpdated(_) => EventKind::CommentUpdated,
            ClientEvent::CommentDeleted { .. } => EventKind::CommentDeleted,
            ClientEvent::TypingChanged { .. } => EventKind::TypingChanged,
        }
    }
}

/// An event as relayed by the gateway, originator stamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum ServerEvent {
    #[serde(rename = "issue:created")]
    IssueCreated {
        #[serde(flatten)]
        issue: IssueSnapshot,
        originator_email: String,
    },
    #[serde(rename = "issue:updated")]
    IssueUpdated {
        #[serde(flatten)]
        issue: IssueSnapshot,
        originator_email: String,
    },
    #[serde(rename = "issue:deleted")]
    IssueDeleted { id: i64, originator_email: String },
    #[serde(rename = "comment:created")]
    CommentCreated {
        #[serde(flatten)]
        comment: CommentSnapshot,
        originator_email: String,
    },
    #[serde(rename = "comment:updated")]
    CommentUpdated {
        #[serde(flatten)]
        comment: CommentSnapshot,
        originator_email: String,
    },
    #[serde(rename = "comment:deleted")]
    CommentDeleted {
        id: i64,
        issue_id: i64,
        originator_email: String,
    },
    #[serde(rename = "presence:online")]
    PresenceOnline { user_id: i64, user_email: String },
    #[serde(rename = "presence:offline")]
    PresenceOffline { user_id: i64, user_email: String },
    #[serde(rename = "typing:changed")]
    TypingChanged {
        issue_id: i64,
        user_id: i64,
        user_email: String,
        is_typing: bool,
    },
}

impl ServerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ServerEvent::IssueCreated { .. } => EventKind::IssueCreated,
            ServerEvent::IssueUpdated { .. } => EventKind::IssueUpdated,
            ServerEvent::IssueDeleted { .. } => EventKind::IssueDeleted,
            ServerEvent::CommentCreated { .. } => EventKind::CommentCreated,
            ServerEvent::CommentUpdated { .. } => EventKind::CommentUpdated,
            ServerEvent::CommentDeleted { .. } => EventKind::CommentDeleted,
            ServerEvent::PresenceOnline { .. } => EventKind::PresenceOnline,
            ServerEvent::PresenceOffline { .. } => EventKind::PresenceOffline,
            ServerEvent::TypingChanged { .. } => EventKind::TypingChanged,
        }
    }

    /// The issue a comment event belongs to, `None` for non-comment kinds.
    pub fn comment_issue_id(&self) -> Option<i64> {
        match self {
            ServerEvent::CommentCreated { comment, .. }
            | ServerEvent::CommentUpdated { comment, .. } => Some(comment.issue_id),
            ServerEvent::CommentDeleted { issue_id, .. } => Some(*issue_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IssueStatus;

    fn snapshot(id: i64) -> IssueSnapshot {
        IssueSnapshot {
            id,
            title: "Fix login bug".to_string(),
            description: "Session cookie is dropped on refresh".to_string(),
            status: IssueStatus::Open,
            created_by: Some(1),
            assigned_to: None,
            assigned_developer: None,
            assigned_tester: None,
            ai_summary: None,
            created_at: None,
        }
    }

    #[test]
    fn client_event_wire_shape() {
        let ev = ClientEvent::IssueCreated(snapshot(42));
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["kind"], "issue:created");
        assert_eq!(json["payload"]["id"], 42);
        assert_eq!(json["payload"]["title"], "Fix login bug");
    }

    #[test]
    fn server_event_flattens_originator_into_payload() {
        let ev = ServerEvent::IssueUpdated {
            issue: snapshot(7),
            originator_email: "dev@example.com".to_string(),
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["kind"], "issue:updated");
        assert_eq!(json["payload"]["id"], 7);
        assert_eq!(json["payload"]["originator_email"], "dev@example.com");
    }

    #[test]
    fn server_event_round_trip() {
        let ev = ServerEvent::TypingChanged {
            issue_id: 7,
            user_id: 3,
            user_email: "qa@example.com".to_string(),
            is_typing: true,
        };
        let json = serde_json::to_string(&ev).unwrap();
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);
    }

    #[test]
    fn clients_cannot_emit_presence_kinds() {
        // Presence is derived from the connection lifecycle on the server;
        // a frame claiming it must fail the ClientEvent parse.
        let forged = r#"{"kind":"presence:online","payload":{"user_id":9,"user_email":"x@y"}}"#;
        assert!(serde_json::from_str::<ClientEvent>(forged).is_err());
    }

    #[test]
    fn malformed_payload_is_a_parse_error() {
        let missing_fields = r#"{"kind":"issue:deleted","payload":{}}"#;
        assert!(serde_json::from_str::<ClientEvent>(missing_fields).is_err());
    }
}
