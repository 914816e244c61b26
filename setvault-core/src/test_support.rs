//! Test helpers for asserting on emitted log events.

use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::Registry;

/// Events captured while a closure ran
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs {
    events: Vec<(Level, String)>,
}

impl CapturedLogs {
    /// True if an event at `level` has a message containing `needle`
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.events
            .iter()
            .any(|(l, message)| *l == level && message.contains(needle))
    }

    /// Number of events at `level`
    pub fn count(&self, level: Level) -> usize {
        self.events.iter().filter(|(l, _)| *l == level).count()
    }
}

struct CaptureLayer {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events
            .lock()
            .unwrap()
            .push((*event.metadata().level(), visitor.0));
    }
}

/// Run `f` with a subscriber that records every event on this thread
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, CapturedLogs) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = Registry::default().with(CaptureLayer {
        events: Arc::clone(&events),
    });
    let result = tracing::subscriber::with_default(subscriber, f);
    let events = events.lock().unwrap().clone();
    (result, CapturedLogs { events })
}
