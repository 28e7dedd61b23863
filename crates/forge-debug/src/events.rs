use crate::{HitContext, ResumeAction, SuspensionKind, ToolCallHitContext};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DebugEvent {
    BreakpointsChanged,
    BreakpointHit(HitContext),
    ToolCallBreakpointHit(ToolCallHitContext),
    Resumed {
        action: ResumeAction,
        target: SuspensionKind,
    },
}

impl DebugEvent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::BreakpointsChanged => "breakpoints_changed",
            Self::BreakpointHit(_) => "breakpoint_hit",
            Self::ToolCallBreakpointHit(_) => "tool_call_breakpoint_hit",
            Self::Resumed { .. } => "resumed",
        }
    }
}

pub trait DebugEventObserver: Send + Sync {
    fn on_event(&self, event: &DebugEvent);
}

impl<F> DebugEventObserver for F
where
    F: Fn(&DebugEvent) + Send + Sync,
{
    fn on_event(&self, event: &DebugEvent) {
        self(event);
    }
}

pub type SharedDebugEventObserver = Arc<dyn DebugEventObserver>;
pub type DebugEventSender = mpsc::UnboundedSender<DebugEvent>;
pub type DebugEventReceiver = mpsc::UnboundedReceiver<DebugEvent>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

enum Subscriber {
    Observer(SharedDebugEventObserver),
    Channel(DebugEventSender),
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, Arc<Subscriber>)>>,
}

/// Publish/subscribe channel shared by every notification kind.
///
/// Subscribers are snapshotted before delivery, so an observer may call back into
/// the registry or the resume controller from inside `on_event`.
#[derive(Clone, Default)]
pub struct DebugEventBus {
    inner: Arc<BusInner>,
}

impl DebugEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: SharedDebugEventObserver) -> SubscriptionId {
        self.insert(Subscriber::Observer(observer))
    }

    /// Streams every later event, in publish order, to the returned receiver.
    pub fn channel(&self) -> (SubscriptionId, DebugEventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (self.insert(Subscriber::Channel(tx)), rx)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut guard = self
            .inner
            .subscribers
            .lock()
            .expect("debug event bus mutex poisoned");
        let before = guard.len();
        guard.retain(|(existing, _)| *existing != id);
        guard.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .expect("debug event bus mutex poisoned")
            .len()
    }

    pub fn publish(&self, event: DebugEvent) {
        let subscribers: Vec<Arc<Subscriber>> = self
            .inner
            .subscribers
            .lock()
            .expect("debug event bus mutex poisoned")
            .iter()
            .map(|(_, subscriber)| subscriber.clone())
            .collect();

        for subscriber in subscribers {
            match subscriber.as_ref() {
                Subscriber::Observer(observer) => observer.on_event(&event),
                Subscriber::Channel(sender) => {
                    let _ = sender.send(event.clone());
                }
            }
        }
    }

    fn insert(&self, subscriber: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        self.inner
            .subscribers
            .lock()
            .expect("debug event bus mutex poisoned")
            .push((id, Arc::new(subscriber)));
        id
    }
}

/// Observer that keeps every event it sees.
#[derive(Clone, Default)]
pub struct BufferedObserver {
    inner: Arc<Mutex<Vec<DebugEvent>>>,
}

impl BufferedObserver {
    pub fn snapshot(&self) -> Vec<DebugEvent> {
        let guard = self.inner.lock().expect("buffered observer mutex poisoned");
        guard.clone()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.snapshot().iter().map(DebugEvent::label).collect()
    }

    pub fn count(&self, label: &str) -> usize {
        self.snapshot()
            .iter()
            .filter(|event| event.label() == label)
            .count()
    }
}

impl DebugEventObserver for BufferedObserver {
    fn on_event(&self, event: &DebugEvent) {
        let mut guard = self.inner.lock().expect("buffered observer mutex poisoned");
        guard.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observer_and_channel_subscribers_both_receive_events() {
        let bus = DebugEventBus::new();
        let buffered = BufferedObserver::default();
        bus.subscribe(Arc::new(buffered.clone()));
        let (_id, mut rx) = bus.channel();

        bus.publish(DebugEvent::BreakpointsChanged);

        assert_eq!(buffered.labels(), vec!["breakpoints_changed"]);
        let streamed = rx.try_recv().expect("channel should receive one event");
        assert_eq!(streamed, DebugEvent::BreakpointsChanged);
    }

    #[test]
    fn unsubscribed_observer_stops_receiving() {
        let bus = DebugEventBus::new();
        let buffered = BufferedObserver::default();
        let id = bus.subscribe(Arc::new(buffered.clone()));
        bus.publish(DebugEvent::BreakpointsChanged);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(DebugEvent::BreakpointsChanged);

        assert_eq!(buffered.snapshot().len(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn closure_observer_may_publish_reentrantly() {
        let bus = DebugEventBus::new();
        let buffered = BufferedObserver::default();
        bus.subscribe(Arc::new(buffered.clone()));
        let inner_bus = bus.clone();
        bus.subscribe(Arc::new(move |event: &DebugEvent| {
            if matches!(event, DebugEvent::BreakpointsChanged) {
                inner_bus.publish(DebugEvent::Resumed {
                    action: ResumeAction::Continue,
                    target: SuspensionKind::Iteration,
                });
            }
        }));

        bus.publish(DebugEvent::BreakpointsChanged);

        assert_eq!(buffered.labels(), vec!["breakpoints_changed", "resumed"]);
    }

    #[test]
    fn resumed_event_serializes_with_kind_tag() {
        let value = serde_json::to_value(DebugEvent::Resumed {
            action: ResumeAction::Step,
            target: SuspensionKind::ToolCall,
        })
        .expect("event should serialize");
        assert_eq!(value["kind"], "resumed");
        assert_eq!(value["action"], "step");
        assert_eq!(value["target"], "tool_call");
    }
}
