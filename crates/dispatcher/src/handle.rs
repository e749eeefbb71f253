//! DispatcherHandle - enqueue messages from outside the polling context
//!
//! The queue itself is owned by the dispatcher and only touched inside
//! `update()`. Handles push submissions into an unbounded channel that is
//! drained at the start of the next send phase.

use tokio::sync::mpsc;
use tracing::trace;

use contracts::{ComponentId, Header, PacketIdentifier, Payload};

use crate::entry::Entry;
use crate::error::DispatcherError;

/// Work handed over to the dispatcher
pub(crate) enum Submission {
    /// Request or event, goes to the tail
    Message(Entry),
    /// Response, goes to the head
    Response(Entry),
}

impl Submission {
    fn header(&self) -> Header {
        match self {
            Self::Message(entry) | Self::Response(entry) => entry.header,
        }
    }
}

/// Cloneable sender side of a dispatcher queue
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: mpsc::UnboundedSender<Submission>,
}

impl DispatcherHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Submission>) -> Self {
        Self { tx }
    }

    /// Queue a fire-and-forget request or event
    pub fn add_message(
        &self,
        header: Header,
        payload: impl Into<Payload>,
    ) -> Result<(), DispatcherError> {
        self.submit(Submission::Message(Entry::new(header, payload.into())))
    }

    /// Queue a request whose answer is handed to `callback`
    pub fn add_message_with_callback<F>(
        &self,
        header: Header,
        payload: impl Into<Payload>,
        callback: F,
    ) -> Result<(), DispatcherError>
    where
        F: FnOnce(&Header, &Payload) + Send + 'static,
    {
        let entry = Entry::with_callback(header, payload.into(), Box::new(callback));
        self.submit(Submission::Message(entry))
    }

    /// Queue a response, ahead of everything already queued
    pub fn add_response(
        &self,
        header: Header,
        payload: impl Into<Payload>,
    ) -> Result<(), DispatcherError> {
        self.submit(Submission::Response(Entry::new(header, payload.into())))
    }

    /// Publish an event from `source`
    pub fn add_event(
        &self,
        source: ComponentId,
        packet_identifier: PacketIdentifier,
        payload: impl Into<Payload>,
    ) -> Result<(), DispatcherError> {
        self.add_message(Header::event(source, packet_identifier), payload)
    }

    /// Whether the owning dispatcher is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn submit(&self, submission: Submission) -> Result<(), DispatcherError> {
        let header = submission.header();
        trace!(%header, "submission queued");
        self.tx
            .send(submission)
            .map_err(|_| DispatcherError::Closed { header })
    }
}

impl std::fmt::Debug for DispatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}
