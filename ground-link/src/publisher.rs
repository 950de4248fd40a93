//! Latest-message cell plus fan-out to connected observers.
//!
//! The control loop replaces the current message whenever it has a new frame;
//! an independent broadcast task pushes whatever is current to every observer
//! on its own period. The two sides share only the message cell and the
//! observer set, and neither lock is held while the other is taken.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use flight_protocol::{SensorData, ServerMessage};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info};

use crate::error::LinkError;

/// Frames buffered per observer before it is considered lagging
pub const OBSERVER_QUEUE_DEPTH: usize = 4;

pub type ObserverId = u64;

/// Counts from one broadcast cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Observers whose queue was full; they miss this frame only
    pub lagging: usize,
    /// Observers removed because their receiver was gone
    pub dropped: usize,
}

#[derive(Debug, Default)]
pub struct TelemetryPublisher {
    current: Mutex<Option<Arc<str>>>,
    observers: Mutex<HashMap<ObserverId, mpsc::Sender<Arc<str>>>>,
    next_id: AtomicU64,
}

impl TelemetryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize `data` and make it the current message.
    pub fn publish(&self, data: SensorData) -> Result<(), LinkError> {
        let json = serde_json::to_string(&ServerMessage::SensorData(data))
            .map_err(LinkError::Serialize)?;
        self.publish_text(Arc::from(json));
        Ok(())
    }

    /// Replace the current message with already-serialized text.
    pub fn publish_text(&self, text: Arc<str>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(text);
    }

    /// The message observers will receive next cycle, if any.
    pub fn current(&self) -> Option<Arc<str>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register a new observer and return its id and message stream.
    pub fn connect(&self) -> (ObserverId, mpsc::Receiver<Arc<str>>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(OBSERVER_QUEUE_DEPTH);
        let count = {
            let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
            observers.insert(id, tx);
            observers.len()
        };
        info!("Observer {id} connected ({count} connected)");
        (id, rx)
    }

    pub fn disconnect(&self, id: ObserverId) {
        let (removed, count) = {
            let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
            (observers.remove(&id).is_some(), observers.len())
        };
        if removed {
            info!("Observer {id} disconnected ({count} connected)");
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Send the current message to every observer once.
    pub fn broadcast_once(&self) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let Some(message) = self.current() else {
            return report;
        };

        let targets: Vec<(ObserverId, mpsc::Sender<Arc<str>>)> = {
            let observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
            observers
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };
        if targets.is_empty() {
            return report;
        }

        let mut failed = Vec::new();
        for (id, tx) in targets {
            match tx.try_send(message.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => report.lagging += 1,
                Err(TrySendError::Closed(_)) => failed.push(id),
            }
        }

        if !failed.is_empty() {
            {
                let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
                for id in &failed {
                    observers.remove(id);
                }
            }
            for id in &failed {
                debug!("Dropped observer {id} after failed delivery");
            }
            report.dropped = failed.len();
        }
        report
    }

    /// Broadcast on a fixed period until the task is aborted.
    pub async fn run_broadcast_loop(self: Arc<Self>, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.broadcast_once();
        }
    }
}
