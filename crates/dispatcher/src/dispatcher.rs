//! Dispatcher - one receive-and-drain cycle per `update()`
//!
//! The receive phase empties the backend, delivers inbound action calls to
//! the postman and matches acknowledges/responses against the queue. The
//! send phase walks the queue once, transmitting pending entries,
//! retransmitting expired ones and escalating exhausted ones to `Timeout`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info_span, instrument, trace, warn, Span};

use contracts::{
    Backend, Clock, ComponentId, DispatcherConfig, Header, NodeBlueprint, PacketIdentifier,
    PacketType, Payload, Postman, SystemClock,
};

use crate::entry::{Entry, EntryKind, EntryState};
use crate::error::DispatcherError;
use crate::handle::{DispatcherHandle, Submission};
use crate::metrics::{DispatcherMetrics, MetricsSnapshot};
use crate::queue::{EntryQueue, IncomingMatch};

static EMPTY_PAYLOAD: Payload = Payload::empty();

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder<B, P, C = SystemClock> {
    backend: B,
    postman: P,
    clock: C,
    config: DispatcherConfig,
    metrics: Option<Arc<DispatcherMetrics>>,
    span: Option<Span>,
}

impl<B: Backend, P: Postman> DispatcherBuilder<B, P> {
    pub fn new(backend: B, postman: P) -> Self {
        Self {
            backend,
            postman,
            clock: SystemClock::new(),
            config: DispatcherConfig::default(),
            metrics: None,
            span: None,
        }
    }
}

impl<B: Backend, P: Postman, C: Clock> DispatcherBuilder<B, P, C> {
    /// Timing and retry policy
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the time source
    pub fn clock<C2: Clock>(self, clock: C2) -> DispatcherBuilder<B, P, C2> {
        DispatcherBuilder {
            backend: self.backend,
            postman: self.postman,
            clock,
            config: self.config,
            metrics: self.metrics,
            span: self.span,
        }
    }

    /// Share metrics with an exporter
    pub fn metrics(mut self, metrics: Arc<DispatcherMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Parent span for everything the dispatcher logs
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn build(self) -> Result<Dispatcher<B, P, C>, DispatcherError> {
        if self.config.ack_timeout_ms == 0 {
            return Err(DispatcherError::invalid_config(
                "ack_timeout_ms",
                "must be > 0",
            ));
        }
        if self.config.response_timeout_ms == Some(0) {
            return Err(DispatcherError::invalid_config(
                "response_timeout_ms",
                "must be > 0 when set",
            ));
        }

        let (tx, inbox) = mpsc::unbounded_channel();

        Ok(Dispatcher {
            backend: self.backend,
            postman: self.postman,
            clock: self.clock,
            entries: EntryQueue::new(),
            config: self.config,
            metrics: self.metrics.unwrap_or_default(),
            span: self.span.unwrap_or_else(|| info_span!("dispatcher")),
            tx,
            inbox,
        })
    }
}

/// Routes requests, responses and events between local components and the
/// backend.
///
/// Not reentrant: the owner calls [`update`](Self::update) from one place,
/// typically its main loop.
pub struct Dispatcher<B, P, C = SystemClock> {
    backend: B,
    postman: P,
    clock: C,
    entries: EntryQueue,
    config: DispatcherConfig,
    metrics: Arc<DispatcherMetrics>,
    span: Span,
    tx: mpsc::UnboundedSender<Submission>,
    inbox: mpsc::UnboundedReceiver<Submission>,
}

impl<B: Backend, P: Postman> Dispatcher<B, P> {
    /// Dispatcher with default timing and the system clock
    pub fn new(backend: B, postman: P) -> Self {
        let (tx, inbox) = mpsc::unbounded_channel();
        Self {
            backend,
            postman,
            clock: SystemClock::new(),
            entries: EntryQueue::new(),
            config: DispatcherConfig::default(),
            metrics: Arc::default(),
            span: info_span!("dispatcher"),
            tx,
            inbox,
        }
    }

    pub fn builder(backend: B, postman: P) -> DispatcherBuilder<B, P> {
        DispatcherBuilder::new(backend, postman)
    }
}

impl<B: Backend, P: Postman, C: Clock> Dispatcher<B, P, C> {
    /// Queue a fire-and-forget request or event at the tail
    pub fn add_message(&mut self, header: Header, payload: impl Into<Payload>) {
        self.entries.append(Entry::new(header, payload.into()));
    }

    /// Queue a request at the tail, its answer goes to `callback`
    pub fn add_message_with_callback<F>(
        &mut self,
        header: Header,
        payload: impl Into<Payload>,
        callback: F,
    ) where
        F: FnOnce(&Header, &Payload) + Send + 'static,
    {
        self.entries.append(Entry::with_callback(
            header,
            payload.into(),
            Box::new(callback),
        ));
    }

    /// Queue a response at the head
    pub fn add_response(&mut self, header: Header, payload: impl Into<Payload>) {
        self.entries.prepend(Entry::new(header, payload.into()));
    }

    /// Publish an event from `source`
    pub fn add_event(
        &mut self,
        source: ComponentId,
        packet_identifier: PacketIdentifier,
        payload: impl Into<Payload>,
    ) {
        self.add_message(Header::event(source, packet_identifier), payload);
    }

    /// Sender usable from callbacks, postman handlers or other tasks
    pub fn handle(&self) -> DispatcherHandle {
        DispatcherHandle::new(self.tx.clone())
    }

    /// Outstanding entries, head to tail
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every outstanding entry. Callbacks are not invoked.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            debug!(parent: &self.span, dropped = self.entries.len(), "queue cleared");
        }
        self.entries.clear();
        self.metrics.set_queue_len(0);
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<DispatcherMetrics> {
        &self.metrics
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn postman(&self) -> &P {
        &self.postman
    }

    pub fn postman_mut(&mut self) -> &mut P {
        &mut self.postman
    }

    /// Tear down, handing back the collaborators
    pub fn into_parts(self) -> (B, P) {
        (self.backend, self.postman)
    }

    /// Run one receive phase followed by one send phase
    pub fn update(&mut self) {
        let span = self.span.clone();
        let _enter = span.enter();

        let now = self.clock.now();
        self.receive(now);
        self.collect_submissions();
        self.send(now);

        self.metrics.set_queue_len(self.entries.len());
    }

    fn receive(&mut self, now: Duration) {
        self.backend.update();

        while self.backend.is_packet_available() {
            match self.backend.packet_header() {
                Some(header) => {
                    self.metrics.inc_packets_received();
                    let payload = self.backend.packet_payload().unwrap_or(&EMPTY_PAYLOAD);
                    trace!(%header, len = payload.len(), "packet received");

                    let acknowledge = if header.is_action_call() {
                        let info = self.postman.deliver_packet(&header, payload);
                        if !info.is_ok() {
                            self.metrics.inc_delivery_failures();
                            debug!(%header, result = ?info, "inbound packet not delivered");
                        }
                        info.is_ok() && !header.is_event()
                    } else {
                        let response_deadline = self.config.response_timeout().map(|t| now + t);
                        let outcome =
                            self.entries
                                .handle_incoming(&header, payload, response_deadline);
                        match outcome {
                            IncomingMatch::ResponseDelivered => {
                                self.metrics.inc_responses_delivered()
                            }
                            IncomingMatch::Unmatched => {
                                self.metrics.inc_unmatched();
                                debug!(%header, "no entry waiting for packet");
                            }
                            IncomingMatch::Acknowledged | IncomingMatch::AwaitingResponse => {}
                        }

                        !header.is_acknowledge
                            && !header.is_event()
                            && (outcome.is_match()
                                || self.postman.is_component_available(header.destination))
                    };

                    if acknowledge {
                        self.backend.send_header(&header.acknowledge());
                        self.metrics.inc_acks_sent();
                    }
                }
                None => warn!("backend reported a packet without header"),
            }

            self.backend.drop_packet();
        }
    }

    fn collect_submissions(&mut self) {
        while let Ok(submission) = self.inbox.try_recv() {
            match submission {
                Submission::Message(entry) => self.entries.append(entry),
                Submission::Response(entry) => self.entries.prepend(entry),
            }
        }
    }

    fn send(&mut self, now: Duration) {
        let mut index = 0;
        while index < self.entries.len() {
            if self.process_entry(index, now) {
                index += 1;
            }
        }
    }

    /// Advance the entry at `index`. Returns `false` if it left the queue.
    fn process_entry(&mut self, index: usize, now: Duration) -> bool {
        let Some(entry) = self.entries.get(index) else {
            return false;
        };
        let header = entry.header;
        let state = entry.state;
        let expired = entry.is_expired(now);

        match state {
            EntryState::TransmissionPending => self.transmit(index, header, now),
            EntryState::WaitForAck if expired => self.retransmit(index, now),
            EntryState::WaitForResponse if expired => {
                warn!(%header, "no response, giving up");
                self.give_up(index);
                false
            }
            EntryState::WaitForAck | EntryState::WaitForResponse => true,
        }
    }

    fn transmit(&mut self, index: usize, header: Header, now: Duration) -> bool {
        if header.is_event() {
            if let Some(entry) = self.entries.get(index) {
                let info = self.postman.deliver_packet(&entry.header, &entry.payload);
                trace!(%header, result = ?info, "event published");
                self.backend.send_packet(&entry.header, &entry.payload);
                self.metrics.inc_packets_sent();
            }
            self.entries.remove(index);
            return false;
        }

        if self.postman.is_component_available(header.destination) {
            return self.transmit_local(index, header, now);
        }

        let ack_timeout = self.config.ack_timeout();
        if let Some(entry) = self.entries.get_mut(index) {
            self.backend.send_packet(&entry.header, &entry.payload);
            self.metrics.inc_packets_sent();
            entry.state = EntryState::WaitForAck;
            entry.deadline = Some(now + ack_timeout);
        }
        true
    }

    /// Destination lives on this node. The backend still sees the packet.
    fn transmit_local(&mut self, index: usize, header: Header, now: Duration) -> bool {
        if let Some(entry) = self.entries.get(index) {
            self.backend.send_packet(&entry.header, &entry.payload);
            self.metrics.inc_packets_sent();
        }

        if header.packet_type == PacketType::Request {
            let response_timeout = self.config.response_timeout();
            let Some(entry) = self.entries.get_mut(index) else {
                return false;
            };
            let info = self.postman.deliver_packet(&entry.header, &entry.payload);
            if !info.is_ok() {
                self.metrics.inc_delivery_failures();
                debug!(%header, result = ?info, "local delivery failed");
            }

            if entry.kind() == EntryKind::Callback {
                entry.state = EntryState::WaitForResponse;
                entry.deadline = response_timeout.map(|t| now + t);
                return true;
            }
            self.entries.remove(index);
            return false;
        }

        match self.entries.find_pending_request(index, &header) {
            Some(position) => {
                if let (Some(request), Some(response)) =
                    (self.entries.remove(position), self.entries.get(index))
                {
                    if request.complete(&response.header, &response.payload) {
                        self.metrics.inc_responses_delivered();
                    }
                }
            }
            None => {
                self.metrics.inc_unmatched();
                debug!(%header, "response has no pending request");
            }
        }
        self.entries.remove(index);
        false
    }

    /// Acknowledge wait expired
    fn retransmit(&mut self, index: usize, now: Duration) -> bool {
        let max_retries = self.config.max_retries;
        let ack_timeout = self.config.ack_timeout();
        let Some(entry) = self.entries.get_mut(index) else {
            return false;
        };

        if entry.tries >= max_retries {
            warn!(header = %entry.header, tries = entry.tries, "no acknowledge, giving up");
            self.give_up(index);
            return false;
        }

        self.backend.send_packet(&entry.header, &entry.payload);
        entry.tries += 1;
        entry.deadline = Some(now + ack_timeout);
        self.metrics.inc_packets_sent();
        self.metrics.inc_retransmissions();
        debug!(header = %entry.header, tries = entry.tries, "retransmitted");
        true
    }

    fn give_up(&mut self, index: usize) {
        if let Some(entry) = self.entries.remove(index) {
            self.metrics.inc_timeouts();
            entry.time_out();
        }
    }
}

/// Convenience function to create a dispatcher from a node blueprint
#[instrument(
    name = "dispatcher_create",
    skip(blueprint, backend, postman),
    fields(node = %blueprint.node.name)
)]
pub fn create_dispatcher<B: Backend, P: Postman>(
    blueprint: &NodeBlueprint,
    backend: B,
    postman: P,
) -> Result<Dispatcher<B, P>, DispatcherError> {
    DispatcherBuilder::new(backend, postman)
        .config(blueprint.dispatcher.clone())
        .span(info_span!("dispatcher", node = %blueprint.node.name))
        .build()
}
