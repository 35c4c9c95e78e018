//! # Event Bus System
//!
//! Broadcasts upload lifecycle events from the drive client to any number of
//! observers using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: [`CoreEvent`] wrapping domain-specific [`UploadEvent`]s
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐   emit    ┌───────────┐   subscribe   ┌────────────┐
//! │ Upload session ├──────────>│ EventBus  ├──────────────>│ Subscriber │
//! └────────────────┘           │ (broadcast│               └────────────┘
//! ┌────────────────┐   emit    │  channel) │   subscribe   ┌────────────┐
//! │ Upload session ├──────────>│           ├──────────────>│ Subscriber │
//! └────────────────┘           └───────────┘               └────────────┘
//! ```
//!
//! Emitting never blocks an upload. With no subscribers the event is dropped.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, EventStream, UploadEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = EventStream::new(event_bus.subscribe())
//!     .filter(|event| matches!(event, CoreEvent::Upload(UploadEvent::Completed { .. })));
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = stream.recv().await {
//!         println!("{}", event.description());
//!     }
//! });
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   Progress events are the usual casualty; this is non-fatal.
//! - **`RecvError::Closed`**: All senders have been dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Chunked upload session events
    Upload(UploadEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Upload(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Upload(UploadEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Upload(UploadEvent::Abandoned { .. }) => EventSeverity::Warning,
            CoreEvent::Upload(UploadEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Upload(UploadEvent::SessionCreated { .. }) => EventSeverity::Info,
            CoreEvent::Upload(UploadEvent::Progress { .. }) => EventSeverity::Debug,
        }
    }

    /// Returns the upload session the event belongs to.
    pub fn session_id(&self) -> &str {
        match self {
            CoreEvent::Upload(e) => e.session_id(),
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Upload Events
// ============================================================================

/// Events emitted by a chunked upload session.
///
/// `session_id` is a client-side identifier generated per session. The
/// server-issued upload URL is never carried on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum UploadEvent {
    /// The server accepted the session and issued an upload URL.
    SessionCreated {
        session_id: String,
        file_name: String,
        total_bytes: u64,
    },
    /// A chunk was acknowledged by the server.
    Progress {
        session_id: String,
        file_name: String,
        uploaded_bytes: u64,
        total_bytes: u64,
        /// Progress percentage (0-100).
        percent: f64,
    },
    /// The server finalised the item.
    Completed {
        session_id: String,
        file_name: String,
        /// Identifier of the finalised item, when the response carried one.
        item_id: Option<String>,
        total_bytes: u64,
    },
    /// The session failed after creation (chunk rejected, retries exhausted,
    /// source read error).
    Failed {
        session_id: String,
        file_name: String,
        uploaded_bytes: u64,
        message: String,
    },
    /// The source ended before the declared size was reached.
    Abandoned {
        session_id: String,
        file_name: String,
        uploaded_bytes: u64,
        total_bytes: u64,
        /// Whether the best-effort DELETE of the upload URL succeeded.
        cleaned_up: bool,
    },
}

impl UploadEvent {
    fn description(&self) -> &str {
        match self {
            UploadEvent::SessionCreated { .. } => "Upload session created",
            UploadEvent::Progress { .. } => "Upload in progress",
            UploadEvent::Completed { .. } => "Upload completed successfully",
            UploadEvent::Failed { .. } => "Upload failed",
            UploadEvent::Abandoned { .. } => "Upload abandoned",
        }
    }

    fn session_id(&self) -> &str {
        match self {
            UploadEvent::SessionCreated { session_id, .. }
            | UploadEvent::Progress { session_id, .. }
            | UploadEvent::Completed { session_id, .. }
            | UploadEvent::Failed { session_id, .. }
            | UploadEvent::Abandoned { session_id, .. } => session_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all future events.
    /// Past events are not replayed.
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventSeverity, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let failures = EventStream::new(event_bus.subscribe())
///     .filter(|event| event.severity() >= EventSeverity::Warning);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(session: &str, uploaded: u64) -> CoreEvent {
        CoreEvent::Upload(UploadEvent::Progress {
            session_id: session.to_string(),
            file_name: "video.mp4".to_string(),
            uploaded_bytes: uploaded,
            total_bytes: 100,
            percent: uploaded as f64,
        })
    }

    #[tokio::test]
    async fn test_event_bus_creation() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(progress("s-1", 10)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Upload(UploadEvent::SessionCreated {
            session_id: "s-1".to_string(),
            file_name: "video.mp4".to_string(),
            total_bytes: 100,
        });

        assert_eq!(bus.emit(event.clone()).unwrap(), 2);
        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Upload(UploadEvent::Completed { .. })));

        bus.emit(progress("s-1", 50)).ok();
        let completed = CoreEvent::Upload(UploadEvent::Completed {
            session_id: "s-1".to_string(),
            file_name: "video.mp4".to_string(),
            item_id: Some("item-1".to_string()),
            total_bytes: 100,
        });
        bus.emit(completed.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), completed);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(progress("s-1", i * 20)).ok();
        }

        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity_and_description() {
        let failed = CoreEvent::Upload(UploadEvent::Failed {
            session_id: "s-1".to_string(),
            file_name: "video.mp4".to_string(),
            uploaded_bytes: 40,
            message: "service returned 409".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);
        assert_eq!(failed.description(), "Upload failed");
        assert_eq!(failed.session_id(), "s-1");

        let abandoned = CoreEvent::Upload(UploadEvent::Abandoned {
            session_id: "s-2".to_string(),
            file_name: "video.mp4".to_string(),
            uploaded_bytes: 40,
            total_bytes: 100,
            cleaned_up: true,
        });
        assert_eq!(abandoned.severity(), EventSeverity::Warning);
        assert_eq!(progress("s-1", 1).severity(), EventSeverity::Debug);
    }

    #[tokio::test]
    async fn test_concurrent_sessions_share_bus() {
        let bus = EventBus::new(100);
        let mut sub = bus.subscribe();

        let handles: Vec<_> = ["s-1", "s-2"]
            .into_iter()
            .map(|session| {
                let bus = bus.clone();
                tokio::spawn(async move {
                    for i in 0..10 {
                        bus.emit(progress(session, i * 10)).ok();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let mut count = 0;
        while sub.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 20);
    }

    #[test]
    fn test_event_serialization() {
        let event = progress("s-9", 50);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Upload\""));
        assert!(json.contains("\"event\":\"Progress\""));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[tokio::test]
    async fn test_try_recv_empty_then_event() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());

        bus.emit(progress("s-1", 10)).ok();
        let received = stream.try_recv().unwrap().unwrap();
        assert_eq!(received, progress("s-1", 10));
    }
}
