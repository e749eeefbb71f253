//! ComponentPostman - closure-backed local delivery

use std::collections::HashMap;

use contracts::{ComponentId, DeliverInfo, Header, Payload, Postman};
use tracing::trace;

/// Action handler of one local component
pub type ActionHandler = Box<dyn FnMut(&Header, &Payload) -> DeliverInfo + Send>;

/// Event listener of one local component
pub type EventListener = Box<dyn FnMut(&Header, &Payload) + Send>;

/// Postman that routes action calls to a per-component handler and fans
/// events out to every listener.
///
/// Handlers that want to answer capture a
/// [`DispatcherHandle`](crate::DispatcherHandle) and queue the response
/// through it.
#[derive(Default)]
pub struct ComponentPostman {
    handlers: HashMap<ComponentId, ActionHandler>,
    listeners: Vec<(ComponentId, EventListener)>,
}

impl ComponentPostman {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the action handler of `component`, replacing any previous one
    pub fn register<F>(&mut self, component: ComponentId, handler: F)
    where
        F: FnMut(&Header, &Payload) -> DeliverInfo + Send + 'static,
    {
        self.handlers.insert(component, Box::new(handler));
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_component<F>(mut self, component: ComponentId, handler: F) -> Self
    where
        F: FnMut(&Header, &Payload) -> DeliverInfo + Send + 'static,
    {
        self.register(component, handler);
        self
    }

    /// Let `component` observe all events
    pub fn subscribe<F>(&mut self, component: ComponentId, listener: F)
    where
        F: FnMut(&Header, &Payload) + Send + 'static,
    {
        self.listeners.push((component, Box::new(listener)));
    }

    /// Components with an action handler or event listener
    pub fn components(&self) -> Vec<ComponentId> {
        let mut ids: Vec<_> = self
            .handlers
            .keys()
            .copied()
            .chain(self.listeners.iter().map(|(id, _)| *id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

impl Postman for ComponentPostman {
    fn deliver_packet(&mut self, header: &Header, payload: &Payload) -> DeliverInfo {
        if header.is_event() {
            for (component, listener) in &mut self.listeners {
                trace!(component = *component, %header, "event delivered");
                listener(header, payload);
            }
            return if self.listeners.is_empty() {
                DeliverInfo::NoComponent
            } else {
                DeliverInfo::Ok
            };
        }

        if let Some(handler) = self.handlers.get_mut(&header.destination) {
            return handler(header, payload);
        }
        if self.is_component_available(header.destination) {
            DeliverInfo::NoAction
        } else {
            DeliverInfo::NoComponent
        }
    }

    fn is_component_available(&self, component: ComponentId) -> bool {
        self.handlers.contains_key(&component)
            || self.listeners.iter().any(|(id, _)| *id == component)
    }
}

impl std::fmt::Debug for ComponentPostman {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentPostman")
            .field("components", &self.components())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_action_call_reaches_its_component() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        let mut postman = ComponentPostman::new()
            .with_component(1, move |header: &Header, _: &Payload| {
                seen.lock().unwrap().push(header.packet_identifier);
                DeliverInfo::Ok
            })
            .with_component(2, |_: &Header, _: &Payload| DeliverInfo::Error);

        assert_eq!(
            postman.deliver_packet(&Header::request(1, 9, 4), &Payload::empty()),
            DeliverInfo::Ok
        );
        assert_eq!(
            postman.deliver_packet(&Header::request(2, 9, 5), &Payload::empty()),
            DeliverInfo::Error
        );
        assert_eq!(
            postman.deliver_packet(&Header::request(3, 9, 6), &Payload::empty()),
            DeliverInfo::NoComponent
        );
        assert_eq!(*calls.lock().unwrap(), vec![4]);
    }

    #[test]
    fn test_events_fan_out_to_all_listeners() {
        let count = Arc::new(Mutex::new(0));
        let mut postman = ComponentPostman::new();
        for component in [1, 2] {
            let count = Arc::clone(&count);
            postman.subscribe(component, move |_: &Header, _: &Payload| {
                *count.lock().unwrap() += 1;
            });
        }

        let info = postman.deliver_packet(&Header::event(9, 1), &Payload::empty());
        assert_eq!(info, DeliverInfo::Ok);
        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[test]
    fn test_listener_only_component_has_no_actions() {
        let mut postman = ComponentPostman::new();
        postman.subscribe(4, |_: &Header, _: &Payload| {});

        assert!(postman.is_component_available(4));
        assert_eq!(
            postman.deliver_packet(&Header::request(4, 9, 1), &Payload::empty()),
            DeliverInfo::NoAction
        );
        assert_eq!(postman.components(), vec![4]);
    }

    #[test]
    fn test_event_without_listeners() {
        let mut postman = ComponentPostman::new();
        assert_eq!(
            postman.deliver_packet(&Header::event(9, 1), &Payload::empty()),
            DeliverInfo::NoComponent
        );
    }
}
