//! Poll Engine
//!
//! Owns the poll history and its single-active-poll rule. Polls are only
//! ever appended and deactivated; nothing reorders or removes them.

use super::types::{NewPoll, Poll, PollError, DEFAULT_MAX_OPTIONS, DEFAULT_TIME_LIMIT_SECS};
use tracing::info;
use uuid::Uuid;

/// Poll engine for one classroom session
#[derive(Debug)]
pub struct PollEngine {
    /// Every poll ever created, in creation order
    history: Vec<Poll>,
    /// Time limit applied when a request has none
    default_time_limit: u64,
    /// Upper bound on options per poll
    max_options: usize,
}

impl Default for PollEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PollEngine {
    /// Create a new poll engine
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
            default_time_limit: DEFAULT_TIME_LIMIT_SECS,
            max_options: DEFAULT_MAX_OPTIONS,
        }
    }

    /// Override the default time limit (seconds)
    pub fn with_default_time_limit(mut self, secs: u64) -> Self {
        self.default_time_limit = secs;
        self
    }

    /// Override the per-poll option cap
    pub fn with_max_options(mut self, max_options: usize) -> Self {
        self.max_options = max_options;
        self
    }

    /// Open a new poll, closing whatever poll is currently active.
    ///
    /// The caller is responsible for scheduling the auto-close after
    /// `poll.time_limit` seconds (see [`PollEngine::expire_poll`]).
    pub fn create_poll(&mut self, request: NewPoll) -> Result<Poll, PollError> {
        request.validate(self.max_options)?;

        for poll in self.history.iter_mut().filter(|p| p.is_active) {
            poll.close();
            info!(poll_id = %poll.id, "poll closed by newer poll");
        }

        let poll = Poll {
            id: Uuid::new_v4().to_string(),
            question: request.question.clone(),
            options: request.build_options(),
            is_active: true,
            time_limit: request.resolved_time_limit(self.default_time_limit),
            created_at: crate::now_ms(),
            correct_set: request.correct_option.is_some(),
            correct_option: request.correct_option,
        };
        self.history.push(poll.clone());

        info!(
            poll_id = %poll.id,
            options = poll.options.len(),
            time_limit = poll.time_limit,
            "poll opened"
        );
        Ok(poll)
    }

    /// Timer-driven close. Returns true if the poll was found and still
    /// active; a poll already closed by a newer one is left alone.
    pub fn expire_poll(&mut self, poll_id: &str) -> bool {
        let Some(poll) = self.history.iter_mut().find(|p| p.id == poll_id) else {
            return false;
        };
        let closed = poll.close();
        if closed {
            info!(poll_id = %poll_id, votes = poll.total_votes(), "poll expired");
        }
        closed
    }

    /// Get a poll only if it matches `poll_id` and is still active
    pub fn active_poll(&self, poll_id: &str) -> Option<&Poll> {
        self.history
            .iter()
            .find(|p| p.id == poll_id && p.is_active)
    }

    pub(crate) fn active_poll_mut(&mut self, poll_id: &str) -> Option<&mut Poll> {
        self.history
            .iter_mut()
            .find(|p| p.id == poll_id && p.is_active)
    }

    /// The currently active poll, if any
    pub fn current(&self) -> Option<&Poll> {
        self.history.iter().find(|p| p.is_active)
    }

    /// Get a poll by ID regardless of state
    pub fn get_poll(&self, poll_id: &str) -> Option<&Poll> {
        self.history.iter().find(|p| p.id == poll_id)
    }

    /// Full history, oldest first
    pub fn history(&self) -> &[Poll] {
        &self.history
    }

    /// Get poll statistics
    pub fn get_stats(&self) -> PollEngineStats {
        PollEngineStats {
            total_polls: self.history.len(),
            active_poll_id: self.current().map(|p| p.id.clone()),
            total_votes: self.history.iter().map(|p| p.total_votes() as usize).sum(),
        }
    }
}

/// Statistics for the poll engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollEngineStats {
    /// Total number of polls in history
    pub total_polls: usize,
    /// ID of the active poll, if any
    pub active_poll_id: Option<String>,
    /// Total answers recorded across all polls
    pub total_votes: usize,
}
