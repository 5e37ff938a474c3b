//! Session Coordinator
//!
//! One classroom session: the roster, poll engine, and chat log, plus the
//! rules for which client sees what after each event. Handlers never touch
//! the network. They return [`Effect`]s that the session actor carries out.

pub mod actor;

pub use actor::{SessionCommand, SessionError, SessionHandle};

use crate::chat::{ChatLog, DEFAULT_CHAT_HISTORY};
use crate::ledger::{self, AnswerError};
use crate::polls::{NewPoll, PollEngine, DEFAULT_MAX_OPTIONS, DEFAULT_TIME_LIMIT_SECS};
use crate::protocol::{ClientEvent, ConnectionId, Role, ServerEvent};
use crate::roster::{Roster, RosterError};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::debug;

/// Who receives an emitted event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Every open connection
    All,
    /// Connections that joined as teacher
    Teachers,
    /// A single connection
    Connection(ConnectionId),
}

/// Side effect requested by a session handler
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send `event` to `audience`
    Emit { audience: Audience, event: ServerEvent },
    /// Add `connection` to the audience for `role`
    Subscribe { connection: ConnectionId, role: Role },
    /// Take `connection` out of the audience for `role`
    Unsubscribe { connection: ConnectionId, role: Role },
    /// Post an expiry for `poll_id` back to the session after `after`
    ScheduleClose { poll_id: String, after: Duration },
    /// Close the transport for `connection`
    Disconnect { connection: ConnectionId },
}

impl Effect {
    fn emit(audience: Audience, event: ServerEvent) -> Self {
        Self::Emit { audience, event }
    }
}

/// Session tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Poll time limit when a request has none (seconds)
    pub default_time_limit_secs: u64,
    /// Chat messages kept for late joiners
    pub chat_history_limit: usize,
    /// Upper bound on options per poll
    pub max_options: usize,
    /// Ignore create-poll / remove-student from non-teacher connections
    pub enforce_teacher_role: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            default_time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            chat_history_limit: DEFAULT_CHAT_HISTORY,
            max_options: DEFAULT_MAX_OPTIONS,
            enforce_teacher_role: false,
        }
    }
}

/// Point-in-time counters for health reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    pub students: usize,
    pub teachers: usize,
    pub polls: usize,
    pub active_poll_id: Option<String>,
    pub total_votes: usize,
    pub chat_messages: usize,
}

/// Classroom session state
#[derive(Debug)]
pub struct Session {
    roster: Roster,
    polls: PollEngine,
    chat: ChatLog,
    roles: HashMap<ConnectionId, HashSet<Role>>,
    options: SessionOptions,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl Session {
    /// Create an empty session
    pub fn new(options: SessionOptions) -> Self {
        Self {
            roster: Roster::new(),
            polls: PollEngine::new()
                .with_default_time_limit(options.default_time_limit_secs)
                .with_max_options(options.max_options),
            chat: ChatLog::new(options.chat_history_limit),
            roles: HashMap::new(),
            options,
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn polls(&self) -> &PollEngine {
        &self.polls
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    /// Whether `connection` has joined as `role`. A connection may hold both.
    pub fn has_role(&self, connection: &ConnectionId, role: Role) -> bool {
        self.roles
            .get(connection)
            .is_some_and(|roles| roles.contains(&role))
    }

    /// Name pre-check for the HTTP endpoint
    pub fn is_name_available(&self, name: &str) -> bool {
        self.roster.is_name_available(name)
    }

    pub fn stats(&self) -> SessionStats {
        let polls = self.polls.get_stats();
        SessionStats {
            students: self.roster.len(),
            teachers: self
                .roles
                .values()
                .filter(|roles| roles.contains(&Role::Teacher))
                .count(),
            polls: polls.total_polls,
            active_poll_id: polls.active_poll_id,
            total_votes: polls.total_votes,
            chat_messages: self.chat.len(),
        }
    }

    /// Apply one inbound client event
    pub fn handle(&mut self, connection: &ConnectionId, event: ClientEvent) -> Vec<Effect> {
        match event {
            ClientEvent::JoinTeacher => self.join_teacher(connection),
            ClientEvent::JoinStudent(join) => self.join_student(connection, &join.name),
            ClientEvent::CreatePoll(request) => self.create_poll(connection, request),
            ClientEvent::SubmitAnswer(answer) => {
                self.submit_answer(connection, &answer.poll_id, answer.option_id)
            }
            ClientEvent::RemoveStudent(target) => self.remove_student(connection, &target.id),
            ClientEvent::SendMessage(fields) => self.send_message(fields),
        }
    }

    /// Transport reports the connection is gone
    pub fn disconnect(&mut self, connection: &ConnectionId) -> Vec<Effect> {
        self.roles.remove(connection);
        self.roster.remove(connection);
        vec![self.roster_to_teachers()]
    }

    /// Poll timer fired
    pub fn expire_poll(&mut self, poll_id: &str) -> Vec<Effect> {
        if self.polls.expire_poll(poll_id) {
            vec![self.history_to_all()]
        } else {
            Vec::new()
        }
    }

    fn join_teacher(&mut self, connection: &ConnectionId) -> Vec<Effect> {
        self.grant(connection, Role::Teacher);
        let to_self = Audience::Connection(connection.clone());
        vec![
            Effect::Subscribe {
                connection: connection.clone(),
                role: Role::Teacher,
            },
            Effect::emit(
                to_self.clone(),
                ServerEvent::PollHistory(self.polls.history().to_vec()),
            ),
            Effect::emit(to_self.clone(), ServerEvent::StudentsList(self.roster.list())),
            Effect::emit(to_self, ServerEvent::ChatHistory(self.chat.history())),
        ]
    }

    fn join_student(&mut self, connection: &ConnectionId, name: &str) -> Vec<Effect> {
        let to_self = Audience::Connection(connection.clone());
        match self.roster.join(connection.clone(), name) {
            Err(RosterError::NameTaken(name)) => {
                debug!(connection = %connection, name = %name, "join rejected: name taken");
                vec![Effect::emit(to_self, ServerEvent::NameTaken)]
            }
            Ok(_) => {
                self.grant(connection, Role::Student);
                vec![
                    Effect::Subscribe {
                        connection: connection.clone(),
                        role: Role::Student,
                    },
                    Effect::emit(
                        to_self.clone(),
                        ServerEvent::PollHistory(self.polls.history().to_vec()),
                    ),
                    Effect::emit(to_self, ServerEvent::ChatHistory(self.chat.history())),
                    self.roster_to_teachers(),
                ]
            }
        }
    }

    fn create_poll(&mut self, connection: &ConnectionId, request: NewPoll) -> Vec<Effect> {
        if !self.may_control(connection) {
            debug!(connection = %connection, "create-poll ignored: not a teacher");
            return Vec::new();
        }
        match self.polls.create_poll(request) {
            Ok(poll) => vec![
                self.history_to_all(),
                Effect::ScheduleClose {
                    after: poll.time_limit_duration(),
                    poll_id: poll.id,
                },
            ],
            Err(err) => {
                debug!(connection = %connection, error = %err, "create-poll ignored");
                Vec::new()
            }
        }
    }

    fn submit_answer(
        &mut self,
        connection: &ConnectionId,
        poll_id: &str,
        option_id: i64,
    ) -> Vec<Effect> {
        let to_self = Audience::Connection(connection.clone());
        match ledger::submit_answer(
            &mut self.polls,
            &mut self.roster,
            connection,
            poll_id,
            option_id,
        ) {
            Ok(ack) => vec![
                self.history_to_all(),
                Effect::emit(to_self, ServerEvent::AnswerSuccess(ack.poll_id)),
                self.roster_to_teachers(),
            ],
            Err(AnswerError::AlreadyAnswered) => vec![Effect::emit(
                to_self,
                ServerEvent::AnswerError(AnswerError::AlreadyAnswered.to_string()),
            )],
            Err(err) => {
                debug!(connection = %connection, poll_id = %poll_id, error = %err, "answer ignored");
                Vec::new()
            }
        }
    }

    fn remove_student(&mut self, connection: &ConnectionId, target: &ConnectionId) -> Vec<Effect> {
        if !self.may_control(connection) {
            debug!(connection = %connection, "remove-student ignored: not a teacher");
            return Vec::new();
        }
        if self.roster.kick(target).is_none() {
            return Vec::new();
        }
        self.revoke(target, Role::Student);
        vec![
            Effect::Unsubscribe {
                connection: target.clone(),
                role: Role::Student,
            },
            Effect::emit(Audience::Connection(target.clone()), ServerEvent::Kicked),
            Effect::Disconnect {
                connection: target.clone(),
            },
            self.roster_to_teachers(),
        ]
    }

    fn send_message(&mut self, fields: Map<String, Value>) -> Vec<Effect> {
        let message = self.chat.post(fields);
        vec![Effect::emit(Audience::All, ServerEvent::NewMessage(message))]
    }

    fn may_control(&self, connection: &ConnectionId) -> bool {
        !self.options.enforce_teacher_role || self.has_role(connection, Role::Teacher)
    }

    fn grant(&mut self, connection: &ConnectionId, role: Role) {
        self.roles.entry(connection.clone()).or_default().insert(role);
    }

    fn revoke(&mut self, connection: &ConnectionId, role: Role) {
        if let Some(roles) = self.roles.get_mut(connection) {
            roles.remove(&role);
            if roles.is_empty() {
                self.roles.remove(connection);
            }
        }
    }

    fn history_to_all(&self) -> Effect {
        Effect::emit(
            Audience::All,
            ServerEvent::PollHistory(self.polls.history().to_vec()),
        )
    }

    fn roster_to_teachers(&self) -> Effect {
        Effect::emit(Audience::Teachers, ServerEvent::StudentsList(self.roster.list()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{JoinStudent, RemoveStudent, SubmitAnswer};
    use serde_json::json;

    fn conn(id: &str) -> ConnectionId {
        ConnectionId::from(id)
    }

    fn join_student(name: &str) -> ClientEvent {
        ClientEvent::JoinStudent(JoinStudent {
            name: name.to_string(),
        })
    }

    fn answer(poll_id: &str, option_id: i64) -> ClientEvent {
        ClientEvent::SubmitAnswer(SubmitAnswer {
            poll_id: poll_id.to_string(),
            option_id,
        })
    }

    fn kick(id: &str) -> ClientEvent {
        ClientEvent::RemoveStudent(RemoveStudent { id: conn(id) })
    }

    fn emitted(effects: &[Effect]) -> Vec<(Audience, &'static str)> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Emit { audience, event } => Some((audience.clone(), event.name())),
                _ => None,
            })
            .collect()
    }

    fn open_poll(session: &mut Session, teacher: &ConnectionId) -> String {
        session.handle(
            teacher,
            ClientEvent::CreatePoll(NewPoll::new("Q", ["A", "B"]).with_time_limit(1)),
        );
        session.polls().current().unwrap().id.clone()
    }

    #[test]
    fn test_join_teacher_snapshot() {
        let mut session = Session::default();
        let teacher = conn("t1");
        let effects = session.handle(&teacher, ClientEvent::JoinTeacher);

        assert_eq!(
            effects[0],
            Effect::Subscribe {
                connection: teacher.clone(),
                role: Role::Teacher
            }
        );
        let to_self = Audience::Connection(teacher.clone());
        assert_eq!(
            emitted(&effects),
            vec![
                (to_self.clone(), "poll-history"),
                (to_self.clone(), "students-list"),
                (to_self, "chat-history"),
            ]
        );
        assert!(session.has_role(&teacher, Role::Teacher));
    }

    #[test]
    fn test_join_student_snapshot_and_roster_broadcast() {
        let mut session = Session::default();
        let ana = conn("s1");
        let effects = session.handle(&ana, join_student("Ana"));

        let to_self = Audience::Connection(ana.clone());
        assert_eq!(
            emitted(&effects),
            vec![
                (to_self.clone(), "poll-history"),
                (to_self, "chat-history"),
                (Audience::Teachers, "students-list"),
            ]
        );
        assert!(effects.contains(&Effect::Subscribe {
            connection: ana.clone(),
            role: Role::Student
        }));
        assert_eq!(session.roster().len(), 1);
    }

    #[test]
    fn test_name_taken_only_to_requester() {
        let mut session = Session::default();
        session.handle(&conn("s1"), join_student("Ana"));
        let effects = session.handle(&conn("s2"), join_student("Ana"));

        assert_eq!(
            effects,
            vec![Effect::Emit {
                audience: Audience::Connection(conn("s2")),
                event: ServerEvent::NameTaken
            }]
        );
        assert!(!session.has_role(&conn("s2"), Role::Student));
    }

    #[test]
    fn test_rejoin_under_own_name_is_taken() {
        let mut session = Session::default();
        let ana = conn("s1");
        session.handle(&conn("t1"), ClientEvent::JoinTeacher);
        session.handle(&ana, join_student("Ana"));
        let poll_id = open_poll(&mut session, &conn("t1"));
        session.handle(&ana, answer(&poll_id, 0));

        let effects = session.handle(&ana, join_student("Ana"));
        assert_eq!(
            effects,
            vec![Effect::Emit {
                audience: Audience::Connection(ana.clone()),
                event: ServerEvent::NameTaken
            }]
        );
        let student = session.roster().get(&ana).unwrap();
        assert_eq!(student.name, "Ana");
        assert!(student.has_answered(&poll_id));
        assert!(session.has_role(&ana, Role::Student));
    }

    #[test]
    fn test_teacher_can_also_join_as_student() {
        let mut session = Session::new(SessionOptions {
            enforce_teacher_role: true,
            ..SessionOptions::default()
        });
        let teacher = conn("t1");
        session.handle(&teacher, ClientEvent::JoinTeacher);
        let effects = session.handle(&teacher, join_student("Teach"));
        assert!(effects.contains(&Effect::Subscribe {
            connection: teacher.clone(),
            role: Role::Student
        }));

        assert!(session.has_role(&teacher, Role::Teacher));
        assert!(session.has_role(&teacher, Role::Student));
        assert_eq!(session.stats().teachers, 1);

        session.handle(&conn("s1"), join_student("Ana"));
        assert!(!session.handle(&teacher, kick("s1")).is_empty());
        open_poll(&mut session, &teacher);
        assert_eq!(session.polls().history().len(), 1);

        // Kicking the teacher's own student entry leaves it a teacher
        session.handle(&teacher, kick("t1"));
        assert!(session.has_role(&teacher, Role::Teacher));
        assert!(!session.has_role(&teacher, Role::Student));
    }

    #[test]
    fn test_name_reusable_after_disconnect() {
        let mut session = Session::default();
        session.handle(&conn("s1"), join_student("Ana"));
        assert!(!session.is_name_available("Ana"));

        let effects = session.disconnect(&conn("s1"));
        assert_eq!(emitted(&effects), vec![(Audience::Teachers, "students-list")]);
        assert!(session.is_name_available("Ana"));

        let effects = session.handle(&conn("s2"), join_student("Ana"));
        assert!(!emitted(&effects).contains(&(Audience::Connection(conn("s2")), "name-taken")));
    }

    #[test]
    fn test_create_poll_broadcasts_and_schedules_close() {
        let mut session = Session::default();
        let effects = session.handle(
            &conn("t1"),
            ClientEvent::CreatePoll(NewPoll::new("Q", ["A", "B"]).with_time_limit(5)),
        );
        let poll_id = session.polls().current().unwrap().id.clone();

        assert_eq!(emitted(&effects), vec![(Audience::All, "poll-history")]);
        assert!(effects.contains(&Effect::ScheduleClose {
            poll_id,
            after: Duration::from_secs(5)
        }));
    }

    #[test]
    fn test_invalid_poll_request_is_silent() {
        let mut session = Session::default();
        let effects = session.handle(
            &conn("t1"),
            ClientEvent::CreatePoll(NewPoll::new("", ["A"])),
        );
        assert!(effects.is_empty());
        assert!(session.polls().history().is_empty());
    }

    #[test]
    fn test_submit_answer_effects() {
        let mut session = Session::default();
        let teacher = conn("t1");
        let ana = conn("s1");
        session.handle(&teacher, ClientEvent::JoinTeacher);
        session.handle(&ana, join_student("Ana"));
        let poll_id = open_poll(&mut session, &teacher);

        let effects = session.handle(&ana, answer(&poll_id, 0));
        assert_eq!(
            emitted(&effects),
            vec![
                (Audience::All, "poll-history"),
                (Audience::Connection(ana.clone()), "answer-success"),
                (Audience::Teachers, "students-list"),
            ]
        );
        assert!(effects.contains(&Effect::Emit {
            audience: Audience::Connection(ana.clone()),
            event: ServerEvent::AnswerSuccess(poll_id.clone())
        }));

        let effects = session.handle(&ana, answer(&poll_id, 1));
        assert_eq!(
            effects,
            vec![Effect::Emit {
                audience: Audience::Connection(ana),
                event: ServerEvent::AnswerError("Already answered".to_string())
            }]
        );

        let poll = session.polls().get_poll(&poll_id).unwrap();
        assert_eq!(poll.total_votes(), 1);
    }

    #[test]
    fn test_other_answer_failures_are_silent() {
        let mut session = Session::default();
        let teacher = conn("t1");
        let ana = conn("s1");
        session.handle(&ana, join_student("Ana"));
        let poll_id = open_poll(&mut session, &teacher);

        assert!(session.handle(&ana, answer(&poll_id, 5)).is_empty());
        assert!(session.handle(&ana, answer("unknown", 0)).is_empty());
        assert!(session.handle(&conn("ghost"), answer(&poll_id, 0)).is_empty());
        assert_eq!(session.polls().get_poll(&poll_id).unwrap().total_votes(), 0);
    }

    #[test]
    fn test_expire_poll_broadcasts_once() {
        let mut session = Session::default();
        let poll_id = open_poll(&mut session, &conn("t1"));

        let effects = session.expire_poll(&poll_id);
        assert_eq!(emitted(&effects), vec![(Audience::All, "poll-history")]);
        assert!(session.polls().current().is_none());

        assert!(session.expire_poll(&poll_id).is_empty());
    }

    #[test]
    fn test_expire_superseded_poll_is_silent() {
        let mut session = Session::default();
        let first = open_poll(&mut session, &conn("t1"));
        let second = open_poll(&mut session, &conn("t1"));

        assert!(session.expire_poll(&first).is_empty());
        assert_eq!(session.polls().current().map(|p| p.id.clone()), Some(second));
    }

    #[test]
    fn test_kick_student() {
        let mut session = Session::default();
        let teacher = conn("t1");
        let ana = conn("s1");
        session.handle(&teacher, ClientEvent::JoinTeacher);
        session.handle(&ana, join_student("Ana"));

        let effects = session.handle(&teacher, kick("s1"));
        assert_eq!(
            effects[0],
            Effect::Unsubscribe {
                connection: ana.clone(),
                role: Role::Student
            }
        );
        assert_eq!(
            effects[1],
            Effect::Emit {
                audience: Audience::Connection(ana.clone()),
                event: ServerEvent::Kicked
            }
        );
        assert_eq!(effects[2], Effect::Disconnect { connection: ana.clone() });
        assert_eq!(
            effects[3],
            Effect::Emit {
                audience: Audience::Teachers,
                event: ServerEvent::StudentsList(Vec::new())
            }
        );
        assert!(session.roster().is_empty());
        assert!(session.is_name_available("Ana"));
    }

    #[test]
    fn test_kick_unknown_student_is_noop() {
        let mut session = Session::default();
        assert!(session.handle(&conn("t1"), kick("nobody")).is_empty());
    }

    #[test]
    fn test_kick_without_role_check_by_default() {
        let mut session = Session::default();
        session.handle(&conn("s1"), join_student("Ana"));
        session.handle(&conn("s2"), join_student("Ben"));

        let effects = session.handle(&conn("s2"), kick("s1"));
        assert!(!effects.is_empty());
        assert_eq!(session.roster().len(), 1);
    }

    #[test]
    fn test_enforce_teacher_role() {
        let mut session = Session::new(SessionOptions {
            enforce_teacher_role: true,
            ..SessionOptions::default()
        });
        let teacher = conn("t1");
        session.handle(&teacher, ClientEvent::JoinTeacher);
        session.handle(&conn("s1"), join_student("Ana"));
        session.handle(&conn("s2"), join_student("Ben"));

        assert!(session.handle(&conn("s2"), kick("s1")).is_empty());
        assert!(session
            .handle(&conn("s2"), ClientEvent::CreatePoll(NewPoll::new("Q", ["A"])))
            .is_empty());
        assert_eq!(session.roster().len(), 2);
        assert!(session.polls().history().is_empty());

        assert!(!session.handle(&teacher, kick("s1")).is_empty());
        open_poll(&mut session, &teacher);
        assert_eq!(session.polls().history().len(), 1);
    }

    #[test]
    fn test_send_message_broadcasts_to_all() {
        let mut session = Session::default();
        let mut fields = Map::new();
        fields.insert("text".to_string(), json!("hello"));

        let effects = session.handle(&conn("s1"), ClientEvent::SendMessage(fields));
        assert_eq!(emitted(&effects), vec![(Audience::All, "new-message")]);
        assert_eq!(session.chat().len(), 1);
    }

    #[test]
    fn test_teacher_disconnect_still_refreshes_roster() {
        let mut session = Session::default();
        let teacher = conn("t1");
        session.handle(&teacher, ClientEvent::JoinTeacher);

        let effects = session.disconnect(&teacher);
        assert_eq!(emitted(&effects), vec![(Audience::Teachers, "students-list")]);
        assert!(!session.has_role(&teacher, Role::Teacher));
    }

    #[test]
    fn test_stats() {
        let mut session = Session::default();
        let teacher = conn("t1");
        session.handle(&teacher, ClientEvent::JoinTeacher);
        session.handle(&conn("s1"), join_student("Ana"));
        let poll_id = open_poll(&mut session, &teacher);
        session.handle(&conn("s1"), answer(&poll_id, 1));

        let stats = session.stats();
        assert_eq!(stats.students, 1);
        assert_eq!(stats.teachers, 1);
        assert_eq!(stats.polls, 1);
        assert_eq!(stats.active_poll_id, Some(poll_id));
        assert_eq!(stats.total_votes, 1);
        assert_eq!(stats.chat_messages, 0);
    }
}
