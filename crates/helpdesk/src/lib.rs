//! Helpdesk Integration - outbound ticket API and credential access
//!
//! This crate wraps the helpdesk service's ticket API for deskbot:
//! - **Secrets** (`secrets`) - credential retrieval behind `SecretAccessor`
//! - **Client** (`client`) - fetch/create/note/comments via `TicketService`
//!
//! Every outbound call authenticates with an API token fetched from the
//! secret accessor (cached per-process) and carries a bounded request
//! timeout. Failures map onto a small taxonomy the conversation layer can
//! render: not-found, timeout, upstream, transport.

pub mod client;
pub mod secrets;

pub use client::{Comment, HelpdeskError, NewTicket, Ticket, TicketService, ZendeskClient};
pub use secrets::{EnvSecretAccessor, GoogleSecretManagerAccessor, SecretAccessor, SecretError};
