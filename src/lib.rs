//! Agent TUI — terminal chat client with persistent conversation history.

pub mod config;
pub mod error;
pub mod llm;
pub mod session;
pub mod store;
pub mod tui;
pub mod user;
