//! Header - routing metadata of a single packet
//!
//! Headers are small `Copy` values. The only correlation between an outgoing
//! message and an incoming acknowledge/response is [`header_fits`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of a component, local or remote
pub type ComponentId = u8;

/// Correlates a request with its acknowledge and response.
///
/// Scoped to the (source, destination) pair.
pub type PacketIdentifier = u8;

/// Destination address of events. Events have no specific addressee.
pub const EVENT_DESTINATION: ComponentId = 0;

/// Packet type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketType {
    /// Action call or event
    Request,
    /// Positive answer to a request
    Response,
    /// Negative answer to a request
    NegativeResponse,
    /// Never sent on the wire, synthesized when retries are exhausted
    Timeout,
}

impl PacketType {
    /// `Response` or `NegativeResponse`
    #[inline]
    pub fn is_response(self) -> bool {
        matches!(self, Self::Response | Self::NegativeResponse)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Request => "REQUEST",
            Self::Response => "RESPONSE",
            Self::NegativeResponse => "NEGATIVE_RESPONSE",
            Self::Timeout => "TIMEOUT",
        }
    }
}

/// Routing metadata of one packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Header {
    pub packet_type: PacketType,
    pub is_acknowledge: bool,
    /// `0` marks an event
    pub destination: ComponentId,
    pub source: ComponentId,
    pub packet_identifier: PacketIdentifier,
}

impl Header {
    pub const fn new(
        packet_type: PacketType,
        is_acknowledge: bool,
        destination: ComponentId,
        source: ComponentId,
        packet_identifier: PacketIdentifier,
    ) -> Self {
        Self {
            packet_type,
            is_acknowledge,
            destination,
            source,
            packet_identifier,
        }
    }

    /// Action call from `source` to `destination`
    pub const fn request(
        destination: ComponentId,
        source: ComponentId,
        packet_identifier: PacketIdentifier,
    ) -> Self {
        Self::new(
            PacketType::Request,
            false,
            destination,
            source,
            packet_identifier,
        )
    }

    /// Event published by `source`
    pub const fn event(source: ComponentId, packet_identifier: PacketIdentifier) -> Self {
        Self::request(EVENT_DESTINATION, source, packet_identifier)
    }

    pub const fn response(
        destination: ComponentId,
        source: ComponentId,
        packet_identifier: PacketIdentifier,
    ) -> Self {
        Self::new(
            PacketType::Response,
            false,
            destination,
            source,
            packet_identifier,
        )
    }

    pub const fn negative_response(
        destination: ComponentId,
        source: ComponentId,
        packet_identifier: PacketIdentifier,
    ) -> Self {
        Self::new(
            PacketType::NegativeResponse,
            false,
            destination,
            source,
            packet_identifier,
        )
    }

    /// Addressed to nobody in particular
    #[inline]
    pub fn is_event(&self) -> bool {
        self.destination == EVENT_DESTINATION
    }

    /// Inbound request that has to be handed to the postman
    #[inline]
    pub fn is_action_call(&self) -> bool {
        self.packet_type == PacketType::Request && !self.is_acknowledge
    }

    /// See [`header_fits`]
    #[inline]
    pub fn fits(&self, entry: &Header) -> bool {
        header_fits(self, entry)
    }

    /// Acknowledge for this header: source and destination swapped,
    /// acknowledge flag set, type and identifier kept.
    pub fn acknowledge(&self) -> Header {
        Header {
            packet_type: self.packet_type,
            is_acknowledge: true,
            destination: self.source,
            source: self.destination,
            packet_identifier: self.packet_identifier,
        }
    }

    /// Same header with another packet type
    pub fn with_type(self, packet_type: PacketType) -> Header {
        Header {
            packet_type,
            ..self
        }
    }
}

/// `true` iff `candidate` answers the message described by `entry`.
///
/// The responder swaps source and destination and echoes the identifier. No
/// other field participates.
#[inline]
pub fn header_fits(candidate: &Header, entry: &Header) -> bool {
    candidate.source == entry.destination
        && candidate.destination == entry.source
        && candidate.packet_identifier == entry.packet_identifier
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} {}->{} #{}",
            self.packet_type.as_str(),
            if self.is_acknowledge { "(ACK)" } else { "" },
            self.source,
            self.destination,
            self.packet_identifier
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fits_requires_swap_and_identifier() {
        let request = Header::request(5, 1, 7);

        assert!(header_fits(&Header::response(1, 5, 7), &request));
        assert!(header_fits(&request.acknowledge(), &request));

        // not swapped
        assert!(!header_fits(&Header::response(5, 1, 7), &request));
        // other identifier
        assert!(!header_fits(&Header::response(1, 5, 8), &request));
        // other peer
        assert!(!header_fits(&Header::response(1, 6, 7), &request));
    }

    #[test]
    fn test_header_fits_ignores_type_and_ack_flag() {
        let request = Header::request(5, 1, 7);
        let timeout = Header::new(PacketType::Timeout, true, 1, 5, 7);
        assert!(timeout.fits(&request));
    }

    #[test]
    fn test_acknowledge_construction() {
        let inbound = Header::response(1, 10, 0x10);
        let ack = inbound.acknowledge();

        assert_eq!(ack, Header::new(PacketType::Response, true, 10, 1, 0x10));
        assert!(ack.fits(&inbound));
    }

    #[test]
    fn test_event_and_action_call_classification() {
        let event = Header::event(2, 0x21);
        assert!(event.is_event());
        assert!(event.is_action_call());

        let ack = Header::request(5, 1, 7).acknowledge();
        assert!(!ack.is_action_call());
        assert!(!Header::response(1, 5, 7).is_action_call());
    }

    #[test]
    fn test_is_response() {
        assert!(PacketType::Response.is_response());
        assert!(PacketType::NegativeResponse.is_response());
        assert!(!PacketType::Request.is_response());
        assert!(!PacketType::Timeout.is_response());
    }

    #[test]
    fn test_with_type_keeps_routing() {
        let timeout = Header::request(5, 1, 7).with_type(PacketType::Timeout);
        assert_eq!(timeout.packet_type, PacketType::Timeout);
        assert_eq!(
            (timeout.destination, timeout.source, timeout.packet_identifier),
            (5, 1, 7)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Header::request(5, 1, 7).to_string(), "REQUEST 1->5 #7");
        assert_eq!(
            Header::request(5, 1, 7).acknowledge().to_string(),
            "REQUEST(ACK) 5->1 #7"
        );
    }

    #[test]
    fn test_serde() {
        let header = Header::negative_response(3, 4, 9);
        let json = serde_json::to_string(&header).unwrap();
        assert!(json.contains("\"negative_response\""));

        let parsed: Header = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, header);
    }
}
