//! pollroom
//!
//! Real-time classroom polling: teachers open timed multiple-choice polls,
//! students join by name and answer, and everyone shares a chat room.
//! One in-memory session per process, served over WebSocket.

pub mod chat;
pub mod cli;
pub mod config;
pub mod ledger;
pub mod logging;
pub mod polls;
pub mod protocol;
pub mod roster;
pub mod server;
pub mod session;

/// Current wall-clock time in unix milliseconds
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
