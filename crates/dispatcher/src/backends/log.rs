//! LogBackend - logs outgoing packets via tracing

use contracts::{Backend, Header, Payload};
use tracing::info;

/// Transmit-only backend for debugging. Never receives anything.
pub struct LogBackend {
    name: String,
    send_count: u64,
}

impl LogBackend {
    /// Create a new LogBackend with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            send_count: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn send_count(&self) -> u64 {
        self.send_count
    }
}

impl Backend for LogBackend {
    fn update(&mut self) {}

    fn is_packet_available(&self) -> bool {
        false
    }

    fn packet_header(&self) -> Option<Header> {
        None
    }

    fn packet_payload(&self) -> Option<&Payload> {
        None
    }

    fn drop_packet(&mut self) {}

    fn send_packet(&mut self, header: &Header, payload: &Payload) {
        self.send_count += 1;
        info!(
            backend = %self.name,
            %header,
            len = payload.len(),
            "packet sent"
        );
    }
}
