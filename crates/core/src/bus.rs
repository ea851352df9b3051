//! In-process publish/subscribe bus for process updates.
//!
//! The `UpdateBus` fans out [`Event`]s to any number of subscribers over a
//! `tokio::sync::broadcast` channel. Publishing never blocks: a subscriber
//! that falls behind loses the oldest events instead of stalling the
//! pipeline, and there is no replay for late subscribers.

use rp_protocol::{BusSettings, Event, LogSeverity, ProcessId};
use std::fmt::Display;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tracing::{debug, error, info, warn};

/// Broadcasts process events to subscribers.
#[derive(Clone)]
pub struct UpdateBus {
    tx: broadcast::Sender<Event>,
}

impl Default for UpdateBus {
    fn default() -> Self {
        Self::from_settings(&BusSettings::default())
    }
}

impl UpdateBus {
    /// Create a bus buffering at most `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn from_settings(settings: &BusSettings) -> Self {
        Self::new(settings.capacity)
    }

    /// Publish an event to every current subscriber.
    ///
    /// Fire-and-forget: having no subscribers is not an error. Live log
    /// lines are mirrored to `tracing`.
    pub fn publish(&self, event: Event) {
        if let Event::LiveLog(line) = &event {
            let process_id = line.process_id.as_str();
            match line.severity {
                LogSeverity::Debug => debug!(process_id, "{}", line.message),
                LogSeverity::Info => info!(process_id, "{}", line.message),
                LogSeverity::Warning => warn!(process_id, "{}", line.message),
                LogSeverity::Error => error!(process_id, "{}", line.message),
            }
        }

        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Raw receiver over every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Events of a single process, ending after its terminal status update.
    ///
    /// The subscription is registered before this returns, so no event
    /// published after the call is missed.
    pub fn subscribe_process(&self, process_id: ProcessId) -> Pin<Box<dyn Stream<Item = Event> + Send>> {
        let mut rx = self.tx.subscribe();

        Box::pin(async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if event.process_id() != &process_id {
                            continue;
                        }
                        let terminal = event.is_terminal();
                        yield event;
                        if terminal {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(process_id = %process_id, skipped, "process subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Run `handler` on its own task for every published event.
    ///
    /// Handler errors are logged and a panicking handler call is contained;
    /// either way the subscription keeps receiving. The handler stops when
    /// the returned [`Subscription`] is unsubscribed or dropped.
    pub fn subscribe_with<F, E>(&self, handler: F) -> Subscription
    where
        F: Fn(Event) -> Result<(), E> + Send + 'static,
        E: Display,
    {
        let mut rx = self.tx.subscribe();

        let task = tokio::spawn(async move {
            loop {
                let event = match rx.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "bus subscriber lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                match std::panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(error = %e, "bus subscriber failed to handle event"),
                    Err(_) => error!("bus subscriber panicked while handling event"),
                }
            }
        });

        Subscription { task: Some(task) }
    }
}

/// Handle of a [`UpdateBus::subscribe_with`] subscription.
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.abort();
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.abort();
    }
}
