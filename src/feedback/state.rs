use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// The states of the feedback machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackState {
    NoFeedback,
    Submitted,
    Approved,
    /// Terminal: no event is accepted anymore.
    Rejected,
}

impl FeedbackState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoFeedback => "NO_FEEDBACK",
            Self::Submitted => "SUBMITTED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl Display for FeedbackState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The feedback aggregate context. It only exists once `ADD_FEEDBACK` has been accepted, so the
/// machine context is `Option<Feedback>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub author_id: String,
    pub subject_id: String,
    pub feedback: String,
    pub comments: Vec<FeedbackComment>,
}

impl Feedback {
    /// Checks the fields that are set once, at creation.
    pub(crate) fn validate(&self) -> Result<(), String> {
        required("id", &self.id)?;
        required("authorId", &self.author_id)?;
        required("subjectId", &self.subject_id)?;
        self.comments.iter().try_for_each(FeedbackComment::validate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackComment {
    pub author_id: String,
    pub comment: String,
}

impl FeedbackComment {
    pub fn new(author_id: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            author_id: author_id.into(),
            comment: comment.into(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        required("comment.authorId", &self.author_id)
    }
}

pub(crate) fn required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("missing required field `{}`", field))
    } else {
        Ok(())
    }
}
