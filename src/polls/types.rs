//! Poll Types
//!
//! Poll and option records as they are broadcast to clients, plus the
//! request a teacher sends to open a new poll.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Seconds a poll stays open when the request does not say otherwise
pub const DEFAULT_TIME_LIMIT_SECS: u64 = 60;

/// Upper bound on options per poll
pub const DEFAULT_MAX_OPTIONS: usize = 50;

/// Poll option/choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    /// Position of the option within its poll (0-based, stable)
    pub id: usize,
    /// Option text/label
    pub text: String,
    /// Number of answers recorded for this option
    pub votes: u32,
    /// Names of the students who picked this option, in answer order
    pub voters: Vec<String>,
    /// Whether this is the teacher's marked answer
    #[serde(default)]
    pub is_correct: bool,
}

impl PollOption {
    /// Create a new option with no votes
    pub fn new(id: usize, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            votes: 0,
            voters: Vec::new(),
            is_correct: false,
        }
    }

    /// Mark as the correct answer
    pub fn correct(mut self) -> Self {
        self.is_correct = true;
        self
    }

    /// Record one answer. `votes` and `voters` move together.
    pub(crate) fn record_vote(&mut self, voter: &str) {
        self.votes += 1;
        self.voters.push(voter.to_string());
    }
}

/// A poll in the session history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    /// Poll ID (uuid)
    pub id: String,
    /// Question shown to students
    pub question: String,
    /// Options in the order the teacher supplied them
    pub options: Vec<PollOption>,
    /// Whether the poll still accepts answers
    pub is_active: bool,
    /// Seconds until the poll closes on its own
    pub time_limit: u64,
    /// When the poll was created (Unix ms)
    pub created_at: i64,
    /// Whether the request carried a non-null `correctOption`. A request
    /// that omits the key gets `false`, not `true`.
    pub correct_set: bool,
    /// The requested correct option, verbatim
    pub correct_option: Option<i64>,
}

impl Poll {
    /// Look up an option by its index
    pub fn option(&self, option_id: usize) -> Option<&PollOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    pub(crate) fn option_mut(&mut self, option_id: usize) -> Option<&mut PollOption> {
        self.options.iter_mut().find(|o| o.id == option_id)
    }

    /// Deactivate the poll. Returns true only on the active -> closed edge.
    pub fn close(&mut self) -> bool {
        let was_active = self.is_active;
        self.is_active = false;
        was_active
    }

    /// Total answers across all options
    pub fn total_votes(&self) -> u32 {
        self.options.iter().map(|o| o.votes).sum()
    }

    /// How long after creation the poll expires
    pub fn time_limit_duration(&self) -> Duration {
        Duration::from_secs(self.time_limit)
    }
}

/// Errors for malformed poll requests
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("poll question is required")]
    EmptyQuestion,
    #[error("poll must have at least one option")]
    NoOptions,
    #[error("poll cannot have more than {0} options")]
    TooManyOptions(usize),
}

/// Request to open a new poll (`create-poll` payload)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPoll {
    /// Question text
    pub question: String,
    /// Option labels, in display order
    pub options: Vec<String>,
    /// Index of the correct option, if the poll has one
    #[serde(default)]
    pub correct_option: Option<i64>,
    /// Seconds the poll stays open; missing or non-positive means default
    #[serde(default)]
    pub time_limit: Option<i64>,
}

impl NewPoll {
    /// Create a new poll request
    pub fn new<I, S>(question: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            question: question.into(),
            options: options.into_iter().map(Into::into).collect(),
            correct_option: None,
            time_limit: None,
        }
    }

    /// Set the correct option
    pub fn with_correct_option(mut self, index: i64) -> Self {
        self.correct_option = Some(index);
        self
    }

    /// Set the time limit in seconds
    pub fn with_time_limit(mut self, seconds: i64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    /// Time limit to apply, falling back to `default_secs`
    pub fn resolved_time_limit(&self, default_secs: u64) -> u64 {
        match self.time_limit {
            Some(secs) if secs > 0 => secs as u64,
            _ => default_secs,
        }
    }

    /// Validate the request
    pub fn validate(&self, max_options: usize) -> Result<(), PollError> {
        if self.question.trim().is_empty() {
            return Err(PollError::EmptyQuestion);
        }
        if self.options.is_empty() {
            return Err(PollError::NoOptions);
        }
        if self.options.len() > max_options {
            return Err(PollError::TooManyOptions(max_options));
        }
        Ok(())
    }

    /// Build the option list, marking the correct one if it is in range
    pub(crate) fn build_options(&self) -> Vec<PollOption> {
        self.options
            .iter()
            .enumerate()
            .map(|(index, text)| {
                let option = PollOption::new(index, text.as_str());
                if self.correct_option == Some(index as i64) {
                    option.correct()
                } else {
                    option
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_poll_builder() {
        let request = NewPoll::new("2+2?", ["3", "4"])
            .with_correct_option(1)
            .with_time_limit(30);

        assert_eq!(request.question, "2+2?");
        assert_eq!(request.options, vec!["3", "4"]);
        assert_eq!(request.correct_option, Some(1));
        assert_eq!(request.resolved_time_limit(60), 30);
    }

    #[test]
    fn test_time_limit_falls_back_on_falsy_values() {
        assert_eq!(NewPoll::new("q", ["a"]).resolved_time_limit(60), 60);
        assert_eq!(
            NewPoll::new("q", ["a"]).with_time_limit(0).resolved_time_limit(60),
            60
        );
        assert_eq!(
            NewPoll::new("q", ["a"]).with_time_limit(-5).resolved_time_limit(45),
            45
        );
    }

    #[test]
    fn test_build_options_marks_correct_index() {
        let options = NewPoll::new("q", ["a", "b", "c"])
            .with_correct_option(2)
            .build_options();

        assert_eq!(options.len(), 3);
        assert_eq!(options[0].id, 0);
        assert_eq!(options[2].text, "c");
        assert!(!options[0].is_correct);
        assert!(!options[1].is_correct);
        assert!(options[2].is_correct);
    }

    #[test]
    fn test_build_options_out_of_range_correct_marks_none() {
        let options = NewPoll::new("q", ["a", "b"])
            .with_correct_option(7)
            .build_options();
        assert!(options.iter().all(|o| !o.is_correct));
    }

    #[test]
    fn test_validate() {
        assert_eq!(
            NewPoll::new("  ", ["a"]).validate(50),
            Err(PollError::EmptyQuestion)
        );
        assert_eq!(
            NewPoll::new("q", Vec::<String>::new()).validate(50),
            Err(PollError::NoOptions)
        );
        assert_eq!(
            NewPoll::new("q", ["a", "b", "c"]).validate(2),
            Err(PollError::TooManyOptions(2))
        );
        assert!(NewPoll::new("q", ["a", "b"]).validate(50).is_ok());
    }

    #[test]
    fn test_option_record_vote_keeps_counter_in_step() {
        let mut option = PollOption::new(0, "A");
        option.record_vote("ana");
        option.record_vote("ben");
        assert_eq!(option.votes, 2);
        assert_eq!(option.voters, vec!["ana", "ben"]);
    }

    #[test]
    fn test_poll_serializes_camel_case() {
        let request = NewPoll::new("q", ["a"]).with_correct_option(0);
        let poll = Poll {
            id: "p1".to_string(),
            question: request.question.clone(),
            options: request.build_options(),
            is_active: true,
            time_limit: 60,
            created_at: 1_700_000_000_000,
            correct_set: true,
            correct_option: Some(0),
        };

        let json = serde_json::to_value(&poll).unwrap();
        assert_eq!(json["isActive"], true);
        assert_eq!(json["timeLimit"], 60);
        assert_eq!(json["correctSet"], true);
        assert_eq!(json["options"][0]["isCorrect"], true);
        assert_eq!(json["options"][0]["voters"], serde_json::json!([]));
    }

    #[test]
    fn test_new_poll_deserializes_null_fields() {
        let request: NewPoll = serde_json::from_str(
            r#"{"question":"q","options":["a","b"],"correctOption":null,"timeLimit":null}"#,
        )
        .unwrap();
        assert_eq!(request.correct_option, None);
        assert_eq!(request.time_limit, None);
    }
}
