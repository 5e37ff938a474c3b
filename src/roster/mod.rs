//! Student Roster
//!
//! Tracks the students connected to the session, keyed by connection.
//! Names are unique among connected students only; a name is free again
//! as soon as its holder leaves or is kicked.

use crate::protocol::ConnectionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

/// A connected student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Connection the student joined on
    pub id: ConnectionId,
    /// Display name (unique among connected students)
    pub name: String,
    /// Polls this student has answered
    #[serde(with = "answered_map")]
    pub answered: BTreeSet<String>,
}

impl Student {
    /// Create a student with no answers
    pub fn new(id: ConnectionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            answered: BTreeSet::new(),
        }
    }

    /// Check if the student has answered a poll
    pub fn has_answered(&self, poll_id: &str) -> bool {
        self.answered.contains(poll_id)
    }

    /// Record an answer. Returns false if the poll was already answered.
    pub(crate) fn mark_answered(&mut self, poll_id: &str) -> bool {
        self.answered.insert(poll_id.to_string())
    }
}

/// Roster errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    #[error("name '{0}' is already taken")]
    NameTaken(String),
}

/// Connected students, in join order
#[derive(Debug, Default)]
pub struct Roster {
    students: Vec<Student>,
}

impl Roster {
    /// Create an empty roster
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff no connected student uses `name` (exact, case-sensitive)
    pub fn is_name_available(&self, name: &str) -> bool {
        !self.students.iter().any(|s| s.name == name)
    }

    /// Register a student on `id`.
    ///
    /// A connection that joins again under a free name replaces its
    /// previous entry (and starts with no answers).
    pub fn join(&mut self, id: ConnectionId, name: &str) -> Result<Student, RosterError> {
        if !self.is_name_available(name) {
            return Err(RosterError::NameTaken(name.to_string()));
        }

        let student = Student::new(id, name);
        match self.students.iter_mut().find(|s| s.id == student.id) {
            Some(existing) => *existing = student.clone(),
            None => self.students.push(student.clone()),
        }

        info!(connection = %student.id, name = %student.name, "student joined");
        Ok(student)
    }

    /// Remove a student. No-op if absent.
    pub fn remove(&mut self, id: &ConnectionId) -> Option<Student> {
        self.take(id, "student left")
    }

    /// Remove a student at the teacher's request. The caller tells the
    /// transport to drop the connection.
    pub fn kick(&mut self, id: &ConnectionId) -> Option<Student> {
        self.take(id, "student kicked")
    }

    fn take(&mut self, id: &ConnectionId, reason: &'static str) -> Option<Student> {
        let index = self.students.iter().position(|s| &s.id == id)?;
        let student = self.students.remove(index);
        info!(connection = %id, name = %student.name, "{}", reason);
        Some(student)
    }

    /// Get a student by connection
    pub fn get(&self, id: &ConnectionId) -> Option<&Student> {
        self.students.iter().find(|s| &s.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &ConnectionId) -> Option<&mut Student> {
        self.students.iter_mut().find(|s| &s.id == id)
    }

    /// Snapshot of all students, in join order
    pub fn list(&self) -> Vec<Student> {
        self.students.clone()
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}

/// `answered` goes over the wire as `{ "<pollId>": true, ... }`
mod answered_map {
    use serde::de::Deserializer;
    use serde::ser::{SerializeMap, Serializer};
    use serde::Deserialize;
    use std::collections::{BTreeMap, BTreeSet};

    pub fn serialize<S: Serializer>(set: &BTreeSet<String>, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(set.len()))?;
        for poll_id in set {
            map.serialize_entry(poll_id, &true)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeSet<String>, D::Error> {
        let map = BTreeMap::<String, bool>::deserialize(deserializer)?;
        Ok(map
            .into_iter()
            .filter_map(|(poll_id, answered)| answered.then_some(poll_id))
            .collect())
    }
}
