//! In-memory chat client adapters.

mod channel;
mod client;

pub use channel::{DEFAULT_WATCH_LIMIT, InMemoryChannel, Operation};
pub use client::InMemoryClient;
