//! LoopbackBackend - in-memory transport between dispatchers of one process

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{Backend, Header, Payload};
use tracing::trace;

type Mailbox = Arc<Mutex<VecDeque<(Header, Payload)>>>;

fn lock(mailbox: &Mailbox) -> MutexGuard<'_, VecDeque<(Header, Payload)>> {
    mailbox.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Backend whose packets land in a peer's in-memory mailbox.
///
/// Two backends created by [`pair`](Self::pair) are cross-wired, a backend
/// created by [`new`](Self::new) is detached and only records what it sends.
pub struct LoopbackBackend {
    name: String,
    inbox: Mailbox,
    peer: Option<Mailbox>,
    current: Option<(Header, Payload)>,
    recording: bool,
    sent: Vec<(Header, Payload)>,
    send_count: u64,
    drop_every: Option<u64>,
    lost: u64,
}

impl LoopbackBackend {
    /// Detached backend
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inbox: Mailbox::default(),
            peer: None,
            current: None,
            recording: true,
            sent: Vec::new(),
            send_count: 0,
            drop_every: None,
            lost: 0,
        }
    }

    /// Two backends delivering into each other
    pub fn pair(a: impl Into<String>, b: impl Into<String>) -> (Self, Self) {
        let mut left = Self::new(a);
        let mut right = Self::new(b);
        left.peer = Some(Arc::clone(&right.inbox));
        right.peer = Some(Arc::clone(&left.inbox));
        (left, right)
    }

    /// Lose every `n`-th transmitted packet (`n >= 2`, smaller values disable loss)
    pub fn drop_every(mut self, n: u64) -> Self {
        self.drop_every = (n >= 2).then_some(n);
        self
    }

    /// Keep a copy of every transmitted packet, on by default
    pub fn recording(mut self, enabled: bool) -> Self {
        self.recording = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a packet as if it had arrived from the wire
    pub fn inject(&self, header: Header, payload: impl Into<Payload>) {
        lock(&self.inbox).push_back((header, payload.into()));
    }

    /// Packets transmitted so far, oldest first
    pub fn sent(&self) -> &[(Header, Payload)] {
        &self.sent
    }

    /// Drain the transmit history, counters are kept
    pub fn take_sent(&mut self) -> Vec<(Header, Payload)> {
        std::mem::take(&mut self.sent)
    }

    pub fn send_count(&self) -> u64 {
        self.send_count
    }

    /// Packets swallowed by the simulated loss
    pub fn lost_count(&self) -> u64 {
        self.lost
    }

    /// Packets waiting in the inbox, the current one excluded
    pub fn pending(&self) -> usize {
        lock(&self.inbox).len()
    }
}

impl Backend for LoopbackBackend {
    fn update(&mut self) {
        if self.current.is_none() {
            self.current = lock(&self.inbox).pop_front();
        }
    }

    fn is_packet_available(&self) -> bool {
        self.current.is_some()
    }

    fn packet_header(&self) -> Option<Header> {
        self.current.as_ref().map(|(header, _)| *header)
    }

    fn packet_payload(&self) -> Option<&Payload> {
        self.current.as_ref().map(|(_, payload)| payload)
    }

    fn drop_packet(&mut self) {
        self.current = lock(&self.inbox).pop_front();
    }

    fn send_packet(&mut self, header: &Header, payload: &Payload) {
        self.send_count += 1;
        if self.recording {
            self.sent.push((*header, payload.clone()));
        }

        if self
            .drop_every
            .is_some_and(|n| self.send_count % n == 0)
        {
            self.lost += 1;
            trace!(backend = %self.name, %header, "packet lost");
            return;
        }

        if let Some(peer) = &self.peer {
            lock(peer).push_back((*header, payload.clone()));
        }
    }
}

impl std::fmt::Debug for LoopbackBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackBackend")
            .field("name", &self.name)
            .field("connected", &self.peer.is_some())
            .field("send_count", &self.send_count)
            .field("lost", &self.lost)
            .finish()
    }
}
