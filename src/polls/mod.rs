//! Polling Module
//!
//! Multiple-choice polls for the classroom session: at most one poll is
//! active at a time and every poll closes on its own after its time limit.

pub mod engine;
pub mod types;

pub use engine::{PollEngine, PollEngineStats};
pub use types::{
    NewPoll, Poll, PollError, PollOption, DEFAULT_MAX_OPTIONS, DEFAULT_TIME_LIMIT_SECS,
};
