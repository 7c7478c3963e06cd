use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::protocol::ServerEvent;

/// Outbound half of one connection. Sending never blocks; events for a
/// connection that has gone away are dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    id: Uuid,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { id: Uuid::new_v4(), tx }, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn emit(&self, event: ServerEvent) {
        if self.tx.send(event).is_err() {
            debug!("Dropping event for closed connection {}", self.id);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Every open connection, used for status broadcasts
#[derive(Debug, Clone, Default)]
pub struct ConnectionHub {
    sinks: Arc<DashMap<Uuid, EventSink>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, sink: EventSink) {
        self.sinks.insert(sink.id(), sink);
    }

    pub fn unregister(&self, id: Uuid) {
        self.sinks.remove(&id);
    }

    pub fn broadcast(&self, event: &ServerEvent) {
        self.sinks.retain(|_, sink| !sink.is_closed());
        for sink in self.sinks.iter() {
            sink.emit(event.clone());
        }
    }

    pub fn connection_count(&self) -> usize {
        self.sinks.len()
    }
}
