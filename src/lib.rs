//! Chatview - channel state reconciliation for chat front-ends.
//!
//! This crate keeps a UI-facing projection of a chat channel in sync with an
//! external chat client: a pure reducer over channel actions, cursor-based
//! pagination with jump-to-message, optimistic sends and reactions, event
//! dispatch with throttled state copies, message-list normalization, and a
//! de-duplicated channel list.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the reducer, services and controllers.
pub mod application;
/// Domain layer containing entities, events, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing configuration, logging and adapters.
pub mod infrastructure;

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = "chatview";
