use serde_json::json;

use feedback_es::feedback::{Feedback, FeedbackActor, FeedbackComment, FeedbackEvent, FeedbackState};
use feedback_es::{Actor, MachineEvent, ParseError, RawCommand, Rejected, SendError};

use crate::observers::{add_comment, add_feedback, CapturingObserver, FailingObserver};

#[tokio::test]
async fn add_feedback_submits_test() {
    let mut actor: FeedbackActor = Actor::create();

    let snapshot = actor.send(add_feedback()).await.unwrap();

    assert_eq!(snapshot.machine_state(), FeedbackState::Submitted);
    assert_eq!(snapshot.version(), 1);
    assert_eq!(
        snapshot.context(),
        &Some(Feedback {
            id: "f1".to_string(),
            author_id: "a1".to_string(),
            subject_id: "s1".to_string(),
            feedback: "Great!".to_string(),
            comments: vec![],
        })
    );
}

#[tokio::test]
async fn approved_feedback_cannot_be_rejected_test() {
    let mut actor: FeedbackActor = Actor::create();
    actor.send(add_feedback()).await.unwrap();

    let snapshot = actor.send(FeedbackEvent::Approve).await.unwrap();
    assert_eq!(snapshot.machine_state(), FeedbackState::Approved);

    let result = actor.send(FeedbackEvent::Reject).await;
    assert!(matches!(
        result,
        Err(SendError::Rejected(Rejected::NoTransition {
            state: FeedbackState::Approved,
            ref kind,
        })) if kind == "REJECT"
    ));
    assert_eq!(actor.state(), FeedbackState::Approved);
    assert_eq!(actor.version(), 2);
}

#[tokio::test]
async fn comment_on_approved_feedback_test() {
    let mut actor: FeedbackActor = Actor::create();
    actor.send(add_feedback()).await.unwrap();
    actor.send(FeedbackEvent::Approve).await.unwrap();

    let snapshot = actor.send(add_comment()).await.unwrap();

    assert_eq!(snapshot.machine_state(), FeedbackState::Approved);
    assert_eq!(snapshot.version(), 3);
    assert_eq!(
        snapshot.context().as_ref().unwrap().comments,
        vec![FeedbackComment::new("a2", "I agree!")]
    );
}

#[tokio::test]
async fn rejected_feedback_accepts_no_comment_test() {
    let mut actor: FeedbackActor = Actor::create();
    actor.send(add_feedback()).await.unwrap();

    let snapshot = actor.send(FeedbackEvent::Reject).await.unwrap();
    assert_eq!(snapshot.machine_state(), FeedbackState::Rejected);

    let result = actor.send(add_comment()).await;
    assert!(matches!(result, Err(SendError::Rejected(Rejected::NoTransition { .. }))));
    assert_eq!(actor.current_snapshot(), snapshot);
}

#[tokio::test]
async fn observer_sees_every_accepted_transition_in_order_test() {
    let observer = CapturingObserver::default();
    let mut actor: FeedbackActor<CapturingObserver> = Actor::with_observer(observer.clone());

    actor.send(add_feedback()).await.unwrap();
    // Rejected: not observed.
    let _ = actor.send(add_comment()).await.unwrap_err();
    actor.send(FeedbackEvent::Approve).await.unwrap();
    let last = actor.send(add_comment()).await.unwrap();

    let transitions = observer.transitions();
    assert_eq!(transitions.len(), 3);

    let kinds: Vec<&str> = transitions.iter().map(|(event, _)| event.kind.as_str()).collect();
    assert_eq!(kinds, vec!["ADD_FEEDBACK", "APPROVE", "ADD_COMMENT"]);

    for (index, (event, snapshot)) in transitions.iter().enumerate() {
        let expected = i32::try_from(index).unwrap() + 1;
        assert_eq!(event.event_store_id, "FEEDBACK");
        assert_eq!(event.aggregate_id.as_deref(), Some("f1"));
        assert_eq!(event.sequence_number, expected);
        assert_eq!(snapshot.version(), expected);
    }

    assert_eq!(transitions[2].1, last);
}

#[tokio::test]
async fn event_wire_shape_test() {
    let observer = CapturingObserver::default();
    let mut actor: FeedbackActor<CapturingObserver> = Actor::with_observer(observer.clone());
    actor.send(add_feedback()).await.unwrap();

    let event = observer.events().remove(0);
    let value = serde_json::to_value(&event).unwrap();

    assert_eq!(value["eventStoreId"], json!("FEEDBACK"));
    assert_eq!(value["aggregateId"], json!("f1"));
    assert_eq!(value["sequenceNumber"], json!(1));
    assert_eq!(value["type"], json!("ADD_FEEDBACK"));
    assert_eq!(
        value["payload"],
        json!({ "id": "f1", "feedback": "Great!", "authorId": "a1", "subjectId": "s1" })
    );
    assert!(value["timestamp"].is_string());

    let decoded: feedback_es::Event = serde_json::from_value(value).unwrap();
    assert_eq!(decoded, event);
}

#[tokio::test]
async fn failing_observer_does_not_roll_back_test() {
    let mut actor: FeedbackActor<FailingObserver> = Actor::with_observer(FailingObserver);

    let error = actor.send(add_feedback()).await.unwrap_err();

    assert!(error.advanced());
    match error {
        SendError::Store { snapshot, .. } => {
            assert_eq!(snapshot.machine_state(), FeedbackState::Submitted);
            assert_eq!(snapshot.version(), 1);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(actor.state(), FeedbackState::Submitted);
    assert_eq!(actor.version(), 1);
}

#[tokio::test]
async fn raw_commands_test() {
    let mut actor: FeedbackActor = Actor::create();

    let command = RawCommand::new(
        "ADD_FEEDBACK",
        json!({ "id": "f1", "feedback": "Great!", "authorId": "a1", "subjectId": "s1" }),
    );
    actor.send_command(command).await.unwrap();

    // Payload of the wrong kind.
    let command = RawCommand::new("APPROVE", json!("yes"));
    let result = actor.send_command(command).await;
    assert!(matches!(
        result,
        Err(SendError::Rejected(Rejected::Invalid(ParseError::Malformed { .. })))
    ));

    let command: RawCommand = serde_json::from_value(json!({ "type": "APPROVE" })).unwrap();
    let snapshot = actor.send_command(command).await.unwrap();
    assert_eq!(snapshot.machine_state(), FeedbackState::Approved);
    assert_eq!(snapshot.version(), 2);
}

#[tokio::test]
async fn add_feedback_with_empty_id_is_rejected_test() {
    let mut actor: FeedbackActor = Actor::create();
    let event = FeedbackEvent::add_feedback("", "Great!", "a1", "s1");
    assert_eq!(event.kind().to_string(), "ADD_FEEDBACK");

    let result = actor.send(event).await;

    assert!(matches!(result, Err(SendError::Rejected(Rejected::Invalid(_)))));
    assert_eq!(actor.state(), FeedbackState::NoFeedback);
}

#[tokio::test]
async fn current_snapshot_is_a_copy_test() {
    let mut actor: FeedbackActor = Actor::create();
    actor.send(add_feedback()).await.unwrap();

    let first = actor.current_snapshot();
    let mut context = actor.current_snapshot().into_context();
    if let Some(feedback) = context.as_mut() {
        feedback.comments.push(FeedbackComment::new("x", "tampered"));
    }

    assert_eq!(actor.current_snapshot(), first);
    assert!(actor.context().as_ref().unwrap().comments.is_empty());
}

#[tokio::test]
async fn attach_keeps_state_test() {
    let mut actor: FeedbackActor = Actor::create();
    actor.send(add_feedback()).await.unwrap();
    let before = actor.current_snapshot();

    let observer = CapturingObserver::default();
    let mut actor: FeedbackActor<CapturingObserver> = actor.attach(observer.clone());
    assert_eq!(actor.current_snapshot(), before);

    actor.send(FeedbackEvent::Approve).await.unwrap();
    assert_eq!(observer.events().len(), 1);
    assert_eq!(observer.events()[0].sequence_number, 2);

    let last = actor.stop();
    assert_eq!(last.version(), 2);
}
