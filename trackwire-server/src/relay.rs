//! The event relay: stamp, then fan out.
//!
//! The relay is a dumb, low-latency fanout. It attaches the originator
//! identity taken from the authenticated connection (never from the
//! payload) and forwards the frame to every *other* member of the room. It
//! does not validate payload business rules; the REST tier already did,
//! before the client chose to emit. Stamping and fanout are synchronous:
//! nothing here suspends.

use trackwire_sdk::event::{ClientEvent, ServerEvent};
use trackwire_sdk::types::Identity;

use crate::server::SharedState;

/// Attach the originator to a client event.
pub fn stamp(event: ClientEvent, who: &Identity) -> ServerEvent {
    match event {
        ClientEvent::IssueCreated(issue) => ServerEvent::IssueCreated {
            issue,
            originator_email: who.email.clone(),
        },
        ClientEvent::IssueUpdated(issue) => ServerEvent::IssueUpdated {
            issue,
            originator_email: who.email.clone(),
        },
        ClientEvent::IssueDeleted { id } => ServerEvent::IssueDeleted {
            id,
            originator_email: who.email.clone(),
        },
        ClientEvent::CommentCreated(comment) => ServerEvent::CommentCreated {
            comment,
            originator_email: who.email.clone(),
        },
        ClientEvent::CommentUpdated(comment) => ServerEvent::CommentUpdated {
            comment,
            originator_email: who.email.clone(),
        },
        ClientEvent::CommentDeleted { id, issue_id } => ServerEvent::CommentDeleted {
            id,
            issue_id,
            originator_email: who.email.clone(),
        },
        ClientEvent::TypingChanged {
            issue_id,
            is_typing,
        } => ServerEvent::TypingChanged {
            issue_id,
            user_id: who.id,
            user_email: who.email.clone(),
            is_typing,
        },
    }
}

/// Forward an event to every member of `room` except `except`. Peers whose
/// outbound queue is full or whose socket is gone are skipped; fanout never
/// blocks.
pub fn broadcast(state: &SharedState, room: &str, except: &str, event: &ServerEvent) {
    let frame = match serde_json::to_string(event) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::error!("failed to serialize {} for fanout: {e}", event.kind());
            return;
        }
    };
    let members = state.room_members(room);
    let connections = state.connections.lock().unwrap();
    for session in &members {
        if session == except {
            continue;
        }
        if let Some(entry) = connections.get(session) {
            let _ = entry.tx.try_send(frame.clone());
        }
    }
}

/// Push an event to a single session (used for the presence roster replay).
pub fn send_to(state: &SharedState, session_id: &str, event: &ServerEvent) {
    let Ok(frame) = serde_json::to_string(event) else {
        return;
    };
    if let Some(entry) = state.connections.lock().unwrap().get(session_id) {
        let _ = entry.tx.try_send(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackwire_sdk::types::{CommentSnapshot, IssueSnapshot, IssueStatus, Role};

    fn alice() -> Identity {
        Identity {
            id: 1,
            email: "alice@example.com".to_string(),
            role: Role::Manager,
        }
    }

    fn issue(id: i64) -> IssueSnapshot {
        IssueSnapshot {
            id,
            title: "t".to_string(),
            description: String::new(),
            status: IssueStatus::Open,
            created_by: None,
            assigned_to: None,
            assigned_developer: None,
            assigned_tester: None,
            ai_summary: None,
            created_at: None,
        }
    }

    #[test]
    fn mutation_events_get_the_originator_email() {
        let stamped = stamp(ClientEvent::IssueCreated(issue(42)), &alice());
        assert_eq!(
            stamped,
            ServerEvent::IssueCreated {
                issue: issue(42),
                originator_email: "alice@example.com".to_string(),
            }
        );

        let stamped = stamp(
            ClientEvent::CommentDeleted { id: 5, issue_id: 3 },
            &alice(),
        );
        assert_eq!(
            stamped,
            ServerEvent::CommentDeleted {
                id: 5,
                issue_id: 3,
                originator_email: "alice@example.com".to_string(),
            }
        );
    }

    #[test]
    fn typing_gets_the_full_identity() {
        let stamped = stamp(
            ClientEvent::TypingChanged {
                issue_id: 7,
                is_typing: true,
            },
            &alice(),
        );
        assert_eq!(
            stamped,
            ServerEvent::TypingChanged {
                issue_id: 7,
                user_id: 1,
                user_email: "alice@example.com".to_string(),
                is_typing: true,
            }
        );
    }

    #[test]
    fn comment_snapshot_passes_through_unchanged() {
        let comment = CommentSnapshot {
            id: 9,
            issue_id: 3,
            content: "looks good".to_string(),
            user_id: Some(1),
            parent_comment_id: Some(5),
            user_name: None,
            user_email: None,
            user_role: None,
            created_at: None,
            updated_at: None,
        };
        match stamp(ClientEvent::CommentCreated(comment.clone()), &alice()) {
            ServerEvent::CommentCreated {
                comment: relayed,
                originator_email,
            } => {
                assert_eq!(relayed, comment);
                assert_eq!(originator_email, "alice@example.com");
            }
            other => panic!("unexpected stamp result: {other:?}"),
        }
    }
}
