//! Answer Ledger
//!
//! Admission control for student answers: one answer per student per
//! poll, only while the poll is active. All checks run before anything is
//! mutated, so a rejected answer leaves tallies and roster untouched.

use crate::polls::PollEngine;
use crate::protocol::ConnectionId;
use crate::roster::Roster;
use tracing::debug;

/// Why an answer was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    #[error("no active poll with that id")]
    NoActivePoll,
    #[error("connection has not joined as a student")]
    UnknownStudent,
    #[error("Already answered")]
    AlreadyAnswered,
    #[error("poll has no such option")]
    UnknownOption,
}

/// Acknowledgement of an accepted answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub poll_id: String,
}

/// Record `connection`'s answer to `poll_id`.
///
/// Checks, in order: the poll is active, the connection is a student, the
/// student has not answered this poll, the option exists.
pub fn submit_answer(
    polls: &mut PollEngine,
    roster: &mut Roster,
    connection: &ConnectionId,
    poll_id: &str,
    option_id: i64,
) -> Result<Ack, AnswerError> {
    let poll = polls
        .active_poll_mut(poll_id)
        .ok_or(AnswerError::NoActivePoll)?;
    let student = roster
        .get_mut(connection)
        .ok_or(AnswerError::UnknownStudent)?;
    if student.has_answered(poll_id) {
        return Err(AnswerError::AlreadyAnswered);
    }
    let option = usize::try_from(option_id)
        .ok()
        .and_then(|id| poll.option_mut(id))
        .ok_or(AnswerError::UnknownOption)?;

    option.record_vote(&student.name);
    student.mark_answered(poll_id);

    debug!(
        connection = %connection,
        poll_id = %poll_id,
        option_id,
        "answer recorded"
    );
    Ok(Ack {
        poll_id: poll_id.to_string(),
    })
}
