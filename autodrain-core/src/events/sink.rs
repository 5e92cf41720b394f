//! Fan-in of worker output into one observable stream.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use autodrain_sdk::objects::LogLevel;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};

use super::types::{Event, EventKind};

/// Per-subscriber buffer. A subscriber that falls further behind skips the
/// oldest events.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// How attached observers share the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkMode {
    /// The most recently attached observer is the only one served; attaching
    /// ends the previous subscription.
    #[default]
    Exclusive,
    /// Every attached observer receives every event.
    FanOut,
}

struct SinkInner {
    tx: broadcast::Sender<Event>,
    running: AtomicBool,
    mode: SinkMode,
    generation: watch::Sender<u64>,
}

/// Cheaply cloneable handle shared by the orchestrator, the workers and the
/// transport.
#[derive(Clone)]
pub struct EventSink {
    inner: Arc<SinkInner>,
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new(SinkMode::default(), DEFAULT_EVENT_BUFFER)
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("mode", &self.inner.mode)
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl EventSink {
    pub fn new(mode: SinkMode, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        let (generation, _) = watch::channel(0);
        Self {
            inner: Arc::new(SinkInner {
                tx,
                running: AtomicBool::new(false),
                mode,
                generation,
            }),
        }
    }

    /// Forward `event` to the attached observers and the process log.
    ///
    /// Without observers the event is dropped.
    pub fn publish(&self, event: Event) {
        let worker = event.worker.map(|w| w.0);
        match event.level {
            LogLevel::Error => error!(worker, "{}", event.message),
            LogLevel::Warn => warn!(worker, "{}", event.message),
            LogLevel::Info | LogLevel::Success => info!(worker, "{}", event.message),
        }
        if let EventKind::Status { running } = event.kind {
            self.inner.running.store(running, Ordering::SeqCst);
        }
        let _ = self.inner.tx.send(event);
    }

    /// Subscribe. The first item yielded is a status snapshot.
    pub fn attach(&self) -> EventSubscription {
        let rx = self.inner.tx.subscribe();
        let generation = match self.inner.mode {
            SinkMode::FanOut => None,
            SinkMode::Exclusive => {
                let mut mine = 0;
                self.inner.generation.send_modify(|g| {
                    *g += 1;
                    mine = *g;
                });
                Some((self.inner.generation.subscribe(), mine))
            }
        };
        EventSubscription {
            rx,
            snapshot: Some(Event::status(self.last_running())),
            generation,
        }
    }

    /// Number of live subscriptions, including superseded ones not yet
    /// dropped.
    pub fn observer_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }

    /// Running flag carried by the last published status event.
    pub fn last_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn mode(&self) -> SinkMode {
        self.inner.mode
    }
}

/// An attached observer. Dropping it detaches.
pub struct EventSubscription {
    rx: broadcast::Receiver<Event>,
    snapshot: Option<Event>,
    generation: Option<(watch::Receiver<u64>, u64)>,
}

impl EventSubscription {
    /// Next event, or `None` once this subscription was superseded by a
    /// newer observer or the sink is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        if let Some(snapshot) = self.snapshot.take() {
            return Some(snapshot);
        }
        loop {
            tokio::select! {
                biased;

                _ = superseded(&mut self.generation) => return None,

                received = self.rx.recv() => match received {
                    Ok(event) => return Some(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event subscriber lagged, dropping oldest events");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
            }
        }
    }

    pub fn is_superseded(&self) -> bool {
        self.generation
            .as_ref()
            .is_some_and(|(rx, mine)| *rx.borrow() != *mine)
    }
}

async fn superseded(generation: &mut Option<(watch::Receiver<u64>, u64)>) {
    match generation {
        Some((rx, mine)) => {
            let mine = *mine;
            let _ = rx.wait_for(|current| *current != mine).await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::WorkerId;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_first_item_is_status_snapshot() {
        let sink = EventSink::default();
        sink.publish(Event::status(true));
        let mut sub = sink.attach();
        let first = sub.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::Status { running: true });
    }

    #[tokio::test]
    async fn test_events_without_observer_are_dropped() {
        let sink = EventSink::default();
        sink.publish(Event::info("nobody listening"));
        let mut sub = sink.attach();
        let _snapshot = sub.recv().await;
        sink.publish(Event::info("heard"));
        assert_eq!(sub.recv().await.unwrap().message, "heard");
    }

    #[tokio::test]
    async fn test_exclusive_attach_supersedes_previous() {
        let sink = EventSink::new(SinkMode::Exclusive, 16);
        let mut first = sink.attach();
        let _ = first.recv().await;
        let mut second = sink.attach();
        let _ = second.recv().await;

        sink.publish(Event::info("hello").from_worker(WorkerId(1)));
        assert!(first.is_superseded());
        assert!(first.recv().await.is_none());
        let got = second.recv().await.unwrap();
        assert_eq!(got.worker, Some(WorkerId(1)));
    }

    #[tokio::test]
    async fn test_fan_out_delivers_to_all() {
        let sink = EventSink::new(SinkMode::FanOut, 16);
        let mut a = sink.attach();
        let mut b = sink.attach();
        let _ = a.recv().await;
        let _ = b.recv().await;
        sink.publish(Event::success("sent"));
        assert_eq!(a.recv().await.unwrap().message, "sent");
        assert_eq!(b.recv().await.unwrap().message, "sent");
        assert_eq!(sink.observer_count(), 2);
        drop(a);
        assert_eq!(sink.observer_count(), 1);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_keeps_receiving() {
        let sink = EventSink::new(SinkMode::FanOut, 2);
        let mut sub = sink.attach();
        let _ = sub.recv().await;
        for i in 0..5 {
            sink.publish(Event::info(format!("event {i}")));
        }
        let next = timeout(Duration::from_secs(1), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.message, "event 3");
    }

    #[tokio::test]
    async fn test_status_updates_mirror() {
        let sink = EventSink::default();
        assert!(!sink.last_running());
        sink.publish(Event::status(true));
        assert!(sink.last_running());
    }
}
