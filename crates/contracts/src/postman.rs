//! Postman trait - local delivery oracle

use crate::{ComponentId, Header, Payload};

/// Outcome of a local delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliverInfo {
    /// A local component accepted the packet
    Ok,
    /// The component rejected the packet
    Error,
    /// No local component with the destination id
    NoComponent,
    /// The component does not implement the requested action
    NoAction,
}

impl DeliverInfo {
    #[inline]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

/// Decides whether a component lives on this node and performs the actual
/// action call or event dispatch.
pub trait Postman {
    /// Deliver a request or event to local application code
    fn deliver_packet(&mut self, header: &Header, payload: &Payload) -> DeliverInfo;

    /// `true` iff `component` lives on this node
    fn is_component_available(&self, component: ComponentId) -> bool;
}

impl<T: Postman + ?Sized> Postman for &mut T {
    fn deliver_packet(&mut self, header: &Header, payload: &Payload) -> DeliverInfo {
        (**self).deliver_packet(header, payload)
    }

    fn is_component_available(&self, component: ComponentId) -> bool {
        (**self).is_component_available(component)
    }
}

impl<T: Postman + ?Sized> Postman for Box<T> {
    fn deliver_packet(&mut self, header: &Header, payload: &Payload) -> DeliverInfo {
        (**self).deliver_packet(header, payload)
    }

    fn is_component_available(&self, component: ComponentId) -> bool {
        (**self).is_component_available(component)
    }
}
