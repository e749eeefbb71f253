//! Entry - one outstanding outgoing message and its lifecycle state

use std::fmt;
use std::time::Duration;

use contracts::{Header, PacketType, Payload};

/// Handler for the terminal answer to a request.
///
/// Receives a `Response`, `NegativeResponse` or synthesized `Timeout` header.
pub type ResponseCallback = Box<dyn FnOnce(&Header, &Payload) + Send>;

/// What the sender expects back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Fire-and-forget, waits for the transport acknowledge only
    Default,
    /// Waits for a response and reports it to a callback
    Callback,
}

/// Lifecycle state of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Not transmitted yet
    TransmissionPending,
    /// Transmitted to the backend, acknowledge outstanding
    WaitForAck,
    /// Acknowledged or delivered locally, response outstanding
    WaitForResponse,
}

/// Outstanding message owned by the dispatcher queue
pub struct Entry {
    pub(crate) header: Header,
    pub(crate) payload: Payload,
    pub(crate) state: EntryState,
    pub(crate) tries: u8,
    pub(crate) deadline: Option<Duration>,
    callback: Option<ResponseCallback>,
}

impl Entry {
    /// Fire-and-forget entry
    pub fn new(header: Header, payload: Payload) -> Self {
        Self {
            header,
            payload,
            state: EntryState::TransmissionPending,
            tries: 0,
            deadline: None,
            callback: None,
        }
    }

    /// Entry whose terminal answer is handed to `callback`
    pub fn with_callback(header: Header, payload: Payload, callback: ResponseCallback) -> Self {
        Self {
            callback: Some(callback),
            ..Self::new(header, payload)
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn kind(&self) -> EntryKind {
        if self.callback.is_some() {
            EntryKind::Callback
        } else {
            EntryKind::Default
        }
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    /// Retransmissions so far
    pub fn tries(&self) -> u8 {
        self.tries
    }

    /// Absolute time at which the current wait expires
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub(crate) fn is_expired(&self, now: Duration) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Consume the entry, handing the answer to its callback.
    ///
    /// Returns whether a callback was invoked.
    pub(crate) fn complete(self, header: &Header, payload: &Payload) -> bool {
        match self.callback {
            Some(callback) => {
                callback(header, payload);
                true
            }
            None => false,
        }
    }

    /// Consume the entry, reporting a `Timeout` built from its own header.
    pub(crate) fn time_out(self) -> bool {
        let Entry {
            header,
            payload,
            callback,
            ..
        } = self;

        match callback {
            Some(callback) => {
                callback(&header.with_type(PacketType::Timeout), &payload);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("header", &self.header)
            .field("payload", &self.payload)
            .field("kind", &self.kind())
            .field("state", &self.state)
            .field("tries", &self.tries)
            .field("deadline", &self.deadline)
            .finish()
    }
}
