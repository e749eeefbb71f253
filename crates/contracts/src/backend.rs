//! Backend trait - transport abstraction polled by the dispatcher

use crate::{Header, Payload};

static EMPTY_PAYLOAD: Payload = Payload::empty();

/// Transport the dispatcher polls and pushes packets through.
///
/// All calls are synchronous and must not block. Transmission is
/// fire-and-forget: transport failures are not reported back, the
/// dispatcher recovers from lost packets through its own retransmission.
pub trait Backend {
    /// Pump the transport
    fn update(&mut self);

    /// Whether an inbound packet is waiting to be processed
    fn is_packet_available(&self) -> bool;

    /// Header of the current inbound packet
    ///
    /// `None` when no packet is available.
    fn packet_header(&self) -> Option<Header>;

    /// Payload of the current inbound packet
    fn packet_payload(&self) -> Option<&Payload>;

    /// Discard the current inbound packet so that the next call to
    /// [`is_packet_available`](Self::is_packet_available) reflects the
    /// following one.
    fn drop_packet(&mut self);

    /// Transmit a packet
    fn send_packet(&mut self, header: &Header, payload: &Payload);

    /// Transmit a header with an empty payload
    fn send_header(&mut self, header: &Header) {
        self.send_packet(header, &EMPTY_PAYLOAD);
    }
}

impl<T: Backend + ?Sized> Backend for &mut T {
    fn update(&mut self) {
        (**self).update()
    }

    fn is_packet_available(&self) -> bool {
        (**self).is_packet_available()
    }

    fn packet_header(&self) -> Option<Header> {
        (**self).packet_header()
    }

    fn packet_payload(&self) -> Option<&Payload> {
        (**self).packet_payload()
    }

    fn drop_packet(&mut self) {
        (**self).drop_packet()
    }

    fn send_packet(&mut self, header: &Header, payload: &Payload) {
        (**self).send_packet(header, payload)
    }

    fn send_header(&mut self, header: &Header) {
        (**self).send_header(header)
    }
}

impl<T: Backend + ?Sized> Backend for Box<T> {
    fn update(&mut self) {
        (**self).update()
    }

    fn is_packet_available(&self) -> bool {
        (**self).is_packet_available()
    }

    fn packet_header(&self) -> Option<Header> {
        (**self).packet_header()
    }

    fn packet_payload(&self) -> Option<&Payload> {
        (**self).packet_payload()
    }

    fn drop_packet(&mut self) {
        (**self).drop_packet()
    }

    fn send_packet(&mut self, header: &Header, payload: &Payload) {
        (**self).send_packet(header, payload)
    }

    fn send_header(&mut self, header: &Header) {
        (**self).send_header(header)
    }
}
