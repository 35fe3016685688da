use std::{
    collections::VecDeque,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::RwLock;
use tokio::{runtime::Handle, sync::mpsc};
use tracing::info;

use super::{
    ActivityEntry, ActivityListener, ActivityStatus, DeliveryRecord, Details, EventType,
};

pub const DEFAULT_CAPACITY: usize = 10_000;
pub const DEFAULT_LISTENER_BUFFER: usize = 10;

type ListenerTx = mpsc::Sender<Arc<ActivityEntry>>;

#[derive(Debug)]
struct LogState {
    entries: VecDeque<Arc<ActivityEntry>>,
    listeners: Vec<ListenerTx>,
}

/// Bounded, append-only audit trail with live fan-out.
///
/// Holds at most `capacity` entries; appending to a full log evicts the oldest
/// one. Every appended entry is also offered to each registered listener with
/// a non-blocking send. A slow listener loses entries, it never slows the
/// caller down.
#[derive(Debug)]
pub struct ActivityLog {
    state: RwLock<LogState>,
    capacity: usize,
    listener_buffer: usize,
    /// Broadcasts skipped because a listener was full or gone.
    dropped: Arc<AtomicU64>,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl ActivityLog {
    /// Capacity is clamped to at least one entry.
    pub fn new(capacity: usize) -> Self {
        Self::with_listener_buffer(capacity, DEFAULT_LISTENER_BUFFER)
    }

    pub fn with_listener_buffer(
        capacity: usize,
        listener_buffer: usize,
    ) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: RwLock::new(LogState {
                entries: VecDeque::with_capacity(capacity.min(1024)),
                listeners: Vec::new(),
            }),
            capacity,
            listener_buffer: listener_buffer.max(1),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records an operation with no duration.
    pub fn log(
        &self,
        event_type: EventType,
        topic_arn: &str,
        status: ActivityStatus,
        details: Details,
    ) {
        self.append(
            ActivityEntry::new(event_type, status)
                .with_topic(topic_arn)
                .with_details(details),
        );
    }

    pub fn log_with_duration(
        &self,
        event_type: EventType,
        topic_arn: &str,
        status: ActivityStatus,
        details: Details,
        duration: Duration,
    ) {
        self.append(
            ActivityEntry::new(event_type, status)
                .with_topic(topic_arn)
                .with_details(details)
                .with_duration(duration),
        );
    }

    pub fn log_delivery(
        &self,
        record: DeliveryRecord,
    ) {
        self.append(record.into());
    }

    /// Records a failed operation together with its error text.
    pub fn log_error(
        &self,
        event_type: EventType,
        topic_arn: &str,
        message_id: &str,
        error: &dyn fmt::Display,
        details: Details,
    ) {
        self.append(
            ActivityEntry::new(event_type, ActivityStatus::Failed)
                .with_topic(topic_arn)
                .with_message(message_id)
                .with_details(details)
                .with_error(error.to_string()),
        );
    }

    /// Stores `entry` and broadcasts it.
    ///
    /// The broadcast runs in a detached task when a runtime is available and
    /// inline otherwise; `try_send` never blocks either way.
    pub fn append(
        &self,
        entry: ActivityEntry,
    ) {
        let entry = Arc::new(entry);

        let listeners = {
            let mut state = self.state.write();
            if state.entries.len() >= self.capacity {
                state.entries.pop_front();
            }
            state.entries.push_back(entry.clone());
            state.listeners.clone()
        };

        info!(
            event = %entry.event_type,
            topic = entry.topic_arn.as_deref().unwrap_or(""),
            status = %entry.status,
            duration_ms = entry.duration_ms(),
            "activity"
        );

        if listeners.is_empty() {
            return;
        }

        match Handle::try_current() {
            Ok(handle) => {
                let dropped = self.dropped.clone();
                handle.spawn(async move {
                    dropped.fetch_add(broadcast(&listeners, &entry), Ordering::Relaxed);
                });
            }
            Err(_) => {
                self.dropped
                    .fetch_add(broadcast(&listeners, &entry), Ordering::Relaxed);
            }
        }
    }

    /// Snapshot of the whole buffer, oldest first.
    pub fn entries(&self) -> Vec<Arc<ActivityEntry>> {
        self.state.read().entries.iter().cloned().collect()
    }

    pub fn entries_by_topic(
        &self,
        topic_arn: &str,
    ) -> Vec<Arc<ActivityEntry>> {
        self.filter(|e| e.topic_arn.as_deref() == Some(topic_arn))
    }

    pub fn entries_by_event_type(
        &self,
        event_type: EventType,
    ) -> Vec<Arc<ActivityEntry>> {
        self.filter(|e| e.event_type == event_type)
    }

    pub fn entries_by_status(
        &self,
        status: ActivityStatus,
    ) -> Vec<Arc<ActivityEntry>> {
        self.filter(|e| e.status == status)
    }

    /// Registers a new live listener.
    pub fn subscribe(&self) -> ActivityListener {
        let (tx, rx) = mpsc::channel(self.listener_buffer);
        self.state.write().listeners.push(tx);
        ActivityListener { inner: rx }
    }

    /// Drops every stored entry. Listeners stay registered.
    pub fn clear(&self) {
        self.state.write().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn listener_count(&self) -> usize {
        self.state.read().listeners.len()
    }

    /// Total broadcasts skipped because a listener was full or gone.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn filter<F>(
        &self,
        pred: F,
    ) -> Vec<Arc<ActivityEntry>>
    where
        F: Fn(&ActivityEntry) -> bool,
    {
        self.state
            .read()
            .entries
            .iter()
            .filter(|e| pred(e))
            .cloned()
            .collect()
    }
}

/// Offers `entry` to each listener. Returns how many were skipped.
fn broadcast(
    listeners: &[ListenerTx],
    entry: &Arc<ActivityEntry>,
) -> u64 {
    listeners
        .iter()
        .filter(|tx| tx.try_send(entry.clone()).is_err())
        .count() as u64
}

////////////////////////////////////////////////////////////////////////////////
// Trait implementations for ActivityLog
////////////////////////////////////////////////////////////////////////////////

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
