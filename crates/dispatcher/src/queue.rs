//! EntryQueue - ordered collection of outstanding messages
//!
//! Requests and events are appended at the tail, responses are prepended at
//! the head. A locally produced response is therefore always visited before
//! the request entries it may answer, which keeps a component from
//! re-entering its own pending request through an on-board loop.

use std::collections::VecDeque;
use std::time::Duration;

use contracts::{Header, PacketType, Payload};
use tracing::trace;

use crate::entry::{Entry, EntryKind, EntryState};

/// Result of matching an inbound packet against the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomingMatch {
    /// A fire-and-forget entry got its acknowledge (or answer) and was removed
    Acknowledged,
    /// A callback entry was acknowledged and now waits for its response
    AwaitingResponse,
    /// A callback entry received its response and was removed
    ResponseDelivered,
    /// No entry was waiting for this packet
    Unmatched,
}

impl IncomingMatch {
    #[inline]
    pub fn is_match(self) -> bool {
        self != Self::Unmatched
    }
}

/// Ordered outstanding-message queue
#[derive(Debug, Default)]
pub struct EntryQueue {
    entries: VecDeque<Entry>,
}

impl EntryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a request or event at the tail
    pub fn append(&mut self, entry: Entry) {
        self.entries.push_back(entry);
    }

    /// Add a response at the head
    pub fn prepend(&mut self, entry: Entry) {
        self.entries.push_front(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Head-to-tail iteration
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Drop every entry without notifying anybody
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Entry> {
        self.entries.get_mut(index)
    }

    pub(crate) fn remove(&mut self, index: usize) -> Option<Entry> {
        self.entries.remove(index)
    }

    /// Match an inbound acknowledge or response against the queue.
    ///
    /// The first fitting, eligible entry wins and the scan stops there.
    /// `response_deadline` is stored on callback entries that move to
    /// `WaitForResponse`.
    pub fn handle_incoming(
        &mut self,
        header: &Header,
        payload: &Payload,
        response_deadline: Option<Duration>,
    ) -> IncomingMatch {
        for index in 0..self.entries.len() {
            let entry = &mut self.entries[index];
            if !header.fits(&entry.header) {
                continue;
            }

            match (entry.kind(), entry.state) {
                (EntryKind::Default, EntryState::WaitForAck) => {
                    trace!(%header, "acknowledge completes entry");
                    self.entries.remove(index);
                    return IncomingMatch::Acknowledged;
                }
                (EntryKind::Callback, EntryState::WaitForAck | EntryState::WaitForResponse) => {
                    if header.packet_type == PacketType::Request && header.is_acknowledge {
                        // duplicate acks keep the running response deadline
                        if entry.state == EntryState::WaitForAck {
                            trace!(%header, "request acknowledged, waiting for response");
                            entry.state = EntryState::WaitForResponse;
                            entry.deadline = response_deadline;
                        }
                        return IncomingMatch::AwaitingResponse;
                    }
                    if header.packet_type.is_response() && !header.is_acknowledge {
                        if let Some(entry) = self.entries.remove(index) {
                            entry.complete(header, payload);
                        }
                        return IncomingMatch::ResponseDelivered;
                    }
                }
                _ => {}
            }
        }

        IncomingMatch::Unmatched
    }

    /// Index of the first request after `index` that was already sent and is
    /// answered by `response`.
    pub(crate) fn find_pending_request(&self, index: usize, response: &Header) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, candidate)| {
                candidate.header.packet_type == PacketType::Request
                    && candidate.state != EntryState::TransmissionPending
                    && response.fits(&candidate.header)
            })
            .map(|(position, _)| position)
    }
}
