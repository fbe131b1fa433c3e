//! Core types shared across the deskbot workspace:
//! - **Configuration** (`config`) - layered load from file, environment, and overrides
//! - **Sessions** (`session`) - per-user conversation state behind a swappable store
//! - **Known issues** (`known_issues`) - lookup seam for error-code triage

pub mod config;
pub mod known_issues;
pub mod session;

pub use known_issues::{EmptyKnownIssueIndex, KnownIssue, KnownIssueIndex, StaticKnownIssueIndex};
pub use session::{InMemorySessionStore, SessionState, SessionStore};
