use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use feedback_es::feedback::{FeedbackEvent, FeedbackMachine, FeedbackSnapshot};
use feedback_es::store::StoreError;
use feedback_es::{Event, TransitionObserver};

/// Records every transition it is notified of.
#[derive(Clone, Default)]
pub struct CapturingObserver {
    transitions: Arc<Mutex<Vec<(Event, FeedbackSnapshot)>>>,
}

impl CapturingObserver {
    pub fn transitions(&self) -> MutexGuard<'_, Vec<(Event, FeedbackSnapshot)>> {
        self.transitions.lock().unwrap()
    }

    pub fn events(&self) -> Vec<Event> {
        self.transitions().iter().map(|(event, _)| event.clone()).collect()
    }
}

#[async_trait]
impl TransitionObserver<FeedbackMachine> for CapturingObserver {
    async fn on_transition(&self, event: &Event, snapshot: &FeedbackSnapshot) -> Result<(), StoreError> {
        self.transitions.lock().unwrap().push((event.clone(), snapshot.clone()));
        Ok(())
    }
}

/// Fails on every transition, like a store that is down.
#[derive(Clone, Default)]
pub struct FailingObserver;

#[async_trait]
impl TransitionObserver<FeedbackMachine> for FailingObserver {
    async fn on_transition(&self, _event: &Event, _snapshot: &FeedbackSnapshot) -> Result<(), StoreError> {
        Err(StoreError::Backend("store is down".into()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

pub fn add_feedback() -> FeedbackEvent {
    FeedbackEvent::add_feedback("f1", "Great!", "a1", "s1")
}

pub fn add_comment() -> FeedbackEvent {
    FeedbackEvent::add_comment("a2", "I agree!")
}
