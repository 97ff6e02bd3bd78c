use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::feedback::state::{required, FeedbackComment};
use crate::machine::{MachineEvent, ParseError};

/// The closed set of feedback event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    AddFeedback,
    Approve,
    Reject,
    AddComment,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [Self::AddFeedback, Self::Approve, Self::Reject, Self::AddComment];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddFeedback => "ADD_FEEDBACK",
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
            Self::AddComment => "ADD_COMMENT",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseError::UnknownKind(s.to_string()))
    }
}

/// Payload of `ADD_FEEDBACK`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFeedback {
    pub id: String,
    pub feedback: String,
    pub author_id: String,
    pub subject_id: String,
}

impl AddFeedback {
    pub(crate) fn validate(&self) -> Result<(), String> {
        required("id", &self.id)?;
        required("authorId", &self.author_id)?;
        required("subjectId", &self.subject_id)
    }
}

/// Payload of `ADD_COMMENT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddComment {
    pub comment: FeedbackComment,
}

/// Events accepted by the feedback machine. Each variant carries its own payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackEvent {
    AddFeedback(AddFeedback),
    Approve,
    Reject,
    AddComment(AddComment),
}

impl FeedbackEvent {
    pub fn add_feedback(
        id: impl Into<String>,
        feedback: impl Into<String>,
        author_id: impl Into<String>,
        subject_id: impl Into<String>,
    ) -> Self {
        Self::AddFeedback(AddFeedback {
            id: id.into(),
            feedback: feedback.into(),
            author_id: author_id.into(),
            subject_id: subject_id.into(),
        })
    }

    pub fn add_comment(author_id: impl Into<String>, comment: impl Into<String>) -> Self {
        Self::AddComment(AddComment {
            comment: FeedbackComment::new(author_id, comment),
        })
    }
}

impl MachineEvent for FeedbackEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        match self {
            Self::AddFeedback(_) => EventKind::AddFeedback,
            Self::Approve => EventKind::Approve,
            Self::Reject => EventKind::Reject,
            Self::AddComment(_) => EventKind::AddComment,
        }
    }

    fn to_payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::AddFeedback(payload) => serde_json::to_value(payload),
            Self::Approve | Self::Reject => Ok(Value::Object(serde_json::Map::new())),
            Self::AddComment(payload) => serde_json::to_value(payload),
        }
    }

    fn parse(kind: &str, payload: Value) -> Result<Self, ParseError> {
        let kind: EventKind = kind.parse()?;

        match kind {
            EventKind::AddFeedback => decode(kind, payload).map(Self::AddFeedback),
            EventKind::Approve => empty(kind, payload).map(|()| Self::Approve),
            EventKind::Reject => empty(kind, payload).map(|()| Self::Reject),
            EventKind::AddComment => decode(kind, payload).map(Self::AddComment),
        }
    }
}

fn decode<T: DeserializeOwned>(kind: EventKind, payload: Value) -> Result<T, ParseError> {
    serde_json::from_value(payload).map_err(|error| ParseError::Malformed {
        kind: kind.to_string(),
        reason: error.to_string(),
    })
}

// Kinds without payload accept a missing payload or an object, whose fields are ignored.
fn empty(kind: EventKind, payload: Value) -> Result<(), ParseError> {
    match payload {
        Value::Null | Value::Object(_) => Ok(()),
        other => Err(ParseError::Malformed {
            kind: kind.to_string(),
            reason: format!("expected no payload, found {}", other),
        }),
    }
}
