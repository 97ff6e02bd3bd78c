use crate::feedback::event::{EventKind, FeedbackEvent};
use crate::feedback::state::{Feedback, FeedbackState};
use crate::machine::{MachineEvent, ParseError, Rejected, StateMachine};
use crate::types::SequenceNumber;

/// The feedback state machine.
///
/// | state       | event        | next state  |
/// |-------------|--------------|-------------|
/// | NO_FEEDBACK | ADD_FEEDBACK | SUBMITTED   |
/// | SUBMITTED   | APPROVE      | APPROVED    |
/// | SUBMITTED   | REJECT       | REJECTED    |
/// | APPROVED    | ADD_COMMENT  | APPROVED    |
///
/// Every other pair is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackMachine;

impl StateMachine for FeedbackMachine {
    const NAME: &'static str = "FEEDBACK";

    type State = FeedbackState;
    type Context = Option<Feedback>;
    type Event = FeedbackEvent;

    fn initial_state() -> FeedbackState {
        FeedbackState::NoFeedback
    }

    fn transition(
        state: FeedbackState,
        context: &Option<Feedback>,
        event: &FeedbackEvent,
    ) -> Result<(FeedbackState, Option<Feedback>), Rejected<FeedbackState>> {
        match (state, context, event) {
            (FeedbackState::NoFeedback, None, FeedbackEvent::AddFeedback(payload)) => {
                payload
                    .validate()
                    .map_err(|reason| ParseError::malformed(EventKind::AddFeedback, reason))?;

                let feedback = Feedback {
                    id: payload.id.clone(),
                    author_id: payload.author_id.clone(),
                    subject_id: payload.subject_id.clone(),
                    feedback: payload.feedback.clone(),
                    comments: vec![],
                };

                Ok((FeedbackState::Submitted, Some(feedback)))
            }
            (FeedbackState::Submitted, Some(_), FeedbackEvent::Approve) => {
                Ok((FeedbackState::Approved, context.clone()))
            }
            (FeedbackState::Submitted, Some(_), FeedbackEvent::Reject) => {
                Ok((FeedbackState::Rejected, context.clone()))
            }
            (FeedbackState::Approved, Some(feedback), FeedbackEvent::AddComment(payload)) => {
                payload
                    .comment
                    .validate()
                    .map_err(|reason| ParseError::malformed(EventKind::AddComment, reason))?;

                // The previous context may already be held by a caller: append on a copy.
                let mut next = feedback.clone();
                next.comments.push(payload.comment.clone());

                Ok((FeedbackState::Approved, Some(next)))
            }
            (state, _, event) => Err(Rejected::NoTransition {
                state,
                kind: event.kind().to_string(),
            }),
        }
    }

    fn aggregate_id(context: &Option<Feedback>) -> Option<&str> {
        context.as_ref().map(|feedback| feedback.id.as_str())
    }

    fn validate(state: FeedbackState, context: &Option<Feedback>, version: SequenceNumber) -> Result<(), String> {
        let expected: SequenceNumber = match (state, context) {
            (FeedbackState::NoFeedback, None) => 0,
            (FeedbackState::NoFeedback, Some(_)) => {
                return Err("a NO_FEEDBACK context must be empty".to_string());
            }
            (_, None) => return Err(format!("a {} context must carry the feedback", state)),
            (FeedbackState::Submitted, Some(feedback)) | (FeedbackState::Rejected, Some(feedback)) => {
                feedback.validate()?;
                if !feedback.comments.is_empty() {
                    return Err(format!("comments can only be added while APPROVED, found them in {}", state));
                }
                if state == FeedbackState::Submitted {
                    1
                } else {
                    2
                }
            }
            (FeedbackState::Approved, Some(feedback)) => {
                feedback.validate()?;
                SequenceNumber::try_from(feedback.comments.len())
                    .ok()
                    .and_then(|comments| comments.checked_add(2))
                    .ok_or_else(|| "too many comments".to_string())?
            }
        };

        if version == expected {
            Ok(())
        } else {
            Err(format!("version {} does not match {} (expected {})", version, state, expected))
        }
    }
}
