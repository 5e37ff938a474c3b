//! Wire protocol
//!
//! Every WebSocket text frame is one JSON object of the form
//! `{"event": "<name>", "data": <payload>}`. Events without a payload
//! leave out `data`.

use crate::chat::ChatMessage;
use crate::polls::{NewPoll, Poll};
use crate::roster::Student;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Opaque handle for one client connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Allocate a fresh connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ConnectionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Role a connection took when it joined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Teacher,
    Student,
}

/// `join-student` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinStudent {
    pub name: String,
}

/// `submit-answer` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswer {
    pub poll_id: String,
    pub option_id: i64,
}

/// `remove-student` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveStudent {
    pub id: ConnectionId,
}

/// Events sent by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    JoinTeacher,
    JoinStudent(JoinStudent),
    CreatePoll(NewPoll),
    SubmitAnswer(SubmitAnswer),
    RemoveStudent(RemoveStudent),
    SendMessage(Map<String, Value>),
}

impl ClientEvent {
    /// Parse one text frame
    pub fn parse(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }

    /// Event name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinTeacher => "join-teacher",
            Self::JoinStudent(_) => "join-student",
            Self::CreatePoll(_) => "create-poll",
            Self::SubmitAnswer(_) => "submit-answer",
            Self::RemoveStudent(_) => "remove-student",
            Self::SendMessage(_) => "send-message",
        }
    }
}

/// Events sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Full poll history, oldest first
    PollHistory(Vec<Poll>),
    /// Full roster
    StudentsList(Vec<Student>),
    /// Full chat history, oldest first
    ChatHistory(Vec<ChatMessage>),
    /// One freshly posted chat message
    NewMessage(ChatMessage),
    NameTaken,
    /// ID of the poll the answer was recorded for
    AnswerSuccess(String),
    /// Human-readable reason
    AnswerError(String),
    Kicked,
}

impl ServerEvent {
    /// Serialize to JSON text for WebSocket transmission
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Event name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::PollHistory(_) => "poll-history",
            Self::StudentsList(_) => "students-list",
            Self::ChatHistory(_) => "chat-history",
            Self::NewMessage(_) => "new-message",
            Self::NameTaken => "name-taken",
            Self::AnswerSuccess(_) => "answer-success",
            Self::AnswerError(_) => "answer-error",
            Self::Kicked => "kicked",
        }
    }
}
