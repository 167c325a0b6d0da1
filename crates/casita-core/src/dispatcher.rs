//! Named-signal dispatcher used by the integrations.
//!
//! Discovery bridges and refresh plumbing communicate through named
//! signals rather than direct references, so a subscriber set up before
//! a sender exists still receives everything sent later.

use std::sync::Arc;

use tokio::sync::broadcast;

/// Default channel capacity for the dispatcher.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Metadata attached to every dispatched signal.
#[derive(Debug, Clone)]
pub struct SignalMeta {
    /// Component that sent the signal.
    pub source: String,
    /// Unix timestamp of the send.
    pub timestamp: i64,
}

impl SignalMeta {
    /// Metadata stamped with the current time.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Payload carried by a signal.
#[derive(Debug, Clone)]
pub enum SignalPayload {
    /// A batch of vendor identifiers, used by discovery signals.
    Ids(Vec<String>),
    /// Arbitrary structured data.
    Json(serde_json::Value),
}

impl SignalPayload {
    /// Identifier batch, if this payload carries one.
    pub fn ids(&self) -> Option<&[String]> {
        match self {
            SignalPayload::Ids(ids) => Some(ids),
            SignalPayload::Json(_) => None,
        }
    }

    /// Structured data, if this payload carries it.
    pub fn json(&self) -> Option<&serde_json::Value> {
        match self {
            SignalPayload::Ids(_) => None,
            SignalPayload::Json(value) => Some(value),
        }
    }
}

/// Broadcast dispatcher for named signals.
///
/// Signals are distributed to every subscriber. A subscriber that falls
/// behind loses the oldest buffered signals and keeps receiving newer
/// ones.
#[derive(Clone)]
pub struct Dispatcher {
    /// Broadcast channel sender
    tx: broadcast::Sender<(String, SignalPayload, SignalMeta)>,
    /// Dispatcher name for identification
    name: String,
}

impl Dispatcher {
    /// Create a dispatcher with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a dispatcher with the specified capacity.
    ///
    /// The capacity determines how many signals are buffered for slow
    /// subscribers.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            name: "default".to_string(),
        }
    }

    /// Create a dispatcher with a name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            tx: broadcast::channel(DEFAULT_CHANNEL_CAPACITY).0,
            name: name.into(),
        }
    }

    /// Get the name of this dispatcher.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Send a signal with a default source.
    ///
    /// The signal goes to all subscribers. If there are none, it is
    /// discarded. Returns `true` if at least one subscriber existed.
    pub async fn send(&self, signal: impl Into<String>, payload: SignalPayload) -> bool {
        self.send_from(signal, payload, "system").await
    }

    /// Send a signal with a custom source.
    pub async fn send_from(
        &self,
        signal: impl Into<String>,
        payload: SignalPayload,
        source: impl Into<String>,
    ) -> bool {
        let meta = SignalMeta::new(source);
        self.tx.send((signal.into(), payload, meta)).is_ok()
    }

    /// Subscribe to every signal.
    pub fn subscribe_all(&self) -> SignalReceiver {
        SignalReceiver {
            rx: self.tx.subscribe(),
        }
    }

    /// Subscribe to one named signal.
    ///
    /// Signals with other names are skipped inside the subscription, so
    /// the caller only ever sees the name it asked for.
    pub fn subscribe(&self, signal: impl Into<String>) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            signal: signal.into(),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver for all signals from the dispatcher.
pub struct SignalReceiver {
    rx: broadcast::Receiver<(String, SignalPayload, SignalMeta)>,
}

impl SignalReceiver {
    /// Receive the next signal.
    ///
    /// Returns `None` if the dispatcher is closed.
    pub async fn recv(&mut self) -> Option<(String, SignalPayload, SignalMeta)> {
        match self.rx.recv().await {
            Ok(signal) => Some(signal),
            Err(broadcast::error::RecvError::Lagged(_)) => {
                // Missed some signals, pick up from whatever is buffered
                self.rx.try_recv().ok()
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Try to receive a signal without blocking.
    pub fn try_recv(&mut self) -> Option<(String, SignalPayload, SignalMeta)> {
        self.rx.try_recv().ok()
    }
}

/// Receiver for one named signal.
pub struct Subscription {
    rx: broadcast::Receiver<(String, SignalPayload, SignalMeta)>,
    signal: String,
}

impl Subscription {
    /// Name this subscription listens for.
    pub fn signal(&self) -> &str {
        &self.signal
    }

    /// Receive the next matching signal.
    ///
    /// Returns `None` if the dispatcher is closed.
    pub async fn recv(&mut self) -> Option<(SignalPayload, SignalMeta)> {
        loop {
            match self.rx.recv().await {
                Ok((name, payload, meta)) => {
                    if name == self.signal {
                        return Some((payload, meta));
                    }
                    // Different signal, keep waiting
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // Missed some signals, keep receiving newer ones
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive a matching signal without blocking.
    pub fn try_recv(&mut self) -> Option<(SignalPayload, SignalMeta)> {
        while let Ok((name, payload, meta)) = self.rx.try_recv() {
            if name == self.signal {
                return Some((payload, meta));
            }
            // Keep draining buffered signals
        }
        None
    }
}

/// Shared dispatcher handle.
pub type SharedDispatcher = Arc<Dispatcher>;
