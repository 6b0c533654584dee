//! Client-side reconciliation state machines.
//!
//! Each list view owns one store and feeds it three input streams: the
//! initial bulk fetch, the results of its own successful REST mutations, and
//! peer events relayed by the gateway. The merge rules are order-independent
//! per entity id, so the streams need no coordination beyond the UI event
//! loop that serializes them.
//!
//! The two stores deliberately use different strategies: issues are a flat
//! list and merge incrementally by upsert-by-id; comments form a recursive
//! tree and re-fetch wholesale on any change. Do not unify them; see the
//! module docs of each.

pub mod comments;
pub mod issues;

pub use comments::CommentThreadStore;
pub use issues::IssueListStore;
