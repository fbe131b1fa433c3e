//! Chat Integration - webhook event handling for the helpdesk bot
//!
//! This crate provides the chat-platform interface for deskbot:
//! - **Events** (`events`) - inbound webhook event model + mention stripping
//! - **Cards** (`cards`) - static menu, prompts, and text/card payloads
//! - **Commands** (`commands`) - slash commands, admin commands, menu shortcuts
//! - **Router** (`router`) - priority dispatch + the per-user state machine
//!
//! # Architecture
//!
//! ```text
//! Chat Event → ConversationRouter → SessionStore / TicketService
//!                    ↓
//!              Card / Text Response
//! ```
//!
//! # Key Types
//!
//! - `ChatEvent` - one inbound webhook event (ephemeral)
//! - `ConversationRouter` - maps one event to exactly one response
//! - `MessageRoute` - the testable priority classification of a message
//! - `ChatResponse` - text or card payload in the platform wire shape

pub mod cards;
pub mod commands;
pub mod events;
pub mod router;

pub use cards::ChatResponse;
pub use events::ChatEvent;
pub use router::{classify_message, ConversationRouter, MessageRoute};
