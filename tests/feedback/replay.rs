use serde_json::json;

use feedback_es::feedback::{FeedbackActor, FeedbackEvent, FeedbackMachine, FeedbackState};
use feedback_es::{replay, Actor, Event, ReplayError, ReplayPolicy, Replayer, SequenceGap};

use crate::observers::{add_comment, add_feedback, CapturingObserver};

async fn live_history() -> (FeedbackActor<CapturingObserver>, Vec<Event>) {
    let observer = CapturingObserver::default();
    let mut actor: FeedbackActor<CapturingObserver> = Actor::with_observer(observer.clone());

    actor.send(add_feedback()).await.unwrap();
    actor.send(FeedbackEvent::Approve).await.unwrap();
    actor.send(add_comment()).await.unwrap();

    let events = observer.events();
    (actor, events)
}

#[tokio::test]
async fn replay_matches_the_live_actor_test() {
    let (live, events) = live_history().await;

    let replayed: FeedbackActor = replay(&events).unwrap();

    assert_eq!(replayed.current_snapshot(), live.current_snapshot());
    assert_eq!(replayed.state(), FeedbackState::Approved);
    assert_eq!(replayed.version(), 3);
}

#[tokio::test]
async fn replay_is_deterministic_test() {
    let (_, events) = live_history().await;

    let first: FeedbackActor = replay(&events).unwrap();
    let second: FeedbackActor = replay(events.clone()).unwrap();

    assert_eq!(first.current_snapshot(), second.current_snapshot());
}

#[tokio::test]
async fn replay_from_snapshot_plus_tail_test() {
    let (live, events) = live_history().await;

    // Snapshot taken after the first event; the whole history is handed over as the tail.
    let mut partial: FeedbackActor = Actor::create();
    let snapshot = partial.send(add_feedback()).await.unwrap();

    let replayed = Replayer::default().replay_from::<FeedbackMachine, _>(snapshot, &events).unwrap();

    assert!(replayed.skipped().is_empty());
    assert_eq!(replayed.actor().current_snapshot(), live.current_snapshot());
}

#[tokio::test]
async fn replay_from_an_invalid_snapshot_fails_test() {
    let (_, events) = live_history().await;

    let forged = feedback_es::Snapshot::new(FeedbackState::Approved, None, 2);
    let result = Replayer::default().replay_from::<FeedbackMachine, _>(forged, &events);

    assert!(matches!(result, Err(ReplayError::Restore(_))));
}

#[tokio::test]
async fn unknown_kinds_follow_the_policy_test() {
    let (live, mut events) = live_history().await;

    let mut unknown = events[2].clone();
    unknown.kind = "ARCHIVE".to_string();
    unknown.payload = json!({});
    unknown.sequence_number = 4;
    events.push(unknown);

    let result = Replayer::new(ReplayPolicy::FailFast).replay::<FeedbackMachine, _>(&events);
    assert!(matches!(result, Err(ReplayError::Rejected { sequence_number: 4, .. })));

    let replayed = Replayer::new(ReplayPolicy::SkipAndLog)
        .replay::<FeedbackMachine, _>(&events)
        .unwrap();
    assert_eq!(replayed.skipped().len(), 1);
    assert_eq!(replayed.skipped()[0].kind, "ARCHIVE");
    assert_eq!(replayed.actor().state(), live.state());
    assert_eq!(replayed.actor().context(), live.context());
    // The skipped event still takes its place in the history.
    assert_eq!(replayed.actor().version(), 4);
}

#[tokio::test]
async fn gaps_follow_the_policy_test() {
    let (_, mut events) = live_history().await;
    events.remove(1);

    let result = Replayer::new(ReplayPolicy::FailFast).replay::<FeedbackMachine, _>(&events);
    assert!(matches!(
        result,
        Err(ReplayError::OutOfSequence {
            expected: 2,
            found: 3,
            ..
        })
    ));

    let result = replay::<FeedbackMachine, _>(&events[1..]);
    assert!(matches!(
        result,
        Err(ReplayError::OutOfSequence {
            expected: 1,
            found: 3,
            ..
        })
    ));

    let (_, mut events) = live_history().await;
    events.swap(1, 2);
    events.remove(1);
    events[1].sequence_number = 5;

    // ADD_FEEDBACK at 1, APPROVE at 5: 2 to 4 are missing but the rest still applies.
    let replayed = Replayer::new(ReplayPolicy::SkipAndLog)
        .replay::<FeedbackMachine, _>(&events)
        .unwrap();
    assert_eq!(replayed.gaps(), &[SequenceGap { expected: 2, found: 5 }]);
    assert!(replayed.skipped().is_empty());
    assert_eq!(replayed.actor().state(), FeedbackState::Approved);
    assert_eq!(replayed.actor().version(), 5);
}

#[tokio::test]
async fn foreign_stream_events_are_refused_test() {
    let (_, mut events) = live_history().await;
    events[0].event_store_id = "INVOICE".to_string();

    let result = replay::<FeedbackMachine, _>(&events);

    assert!(matches!(result, Err(ReplayError::Rejected { sequence_number: 1, .. })));
}

#[tokio::test]
async fn replayed_actor_keeps_accepting_events_test() {
    let (_, events) = live_history().await;
    let mut replayed: FeedbackActor = replay(&events).unwrap();

    let snapshot = replayed.send(FeedbackEvent::add_comment("a3", "Me too")).await.unwrap();

    assert_eq!(snapshot.version(), 4);
    assert_eq!(snapshot.context().as_ref().unwrap().comments.len(), 2);
}
