//! Input event router.
//!
//! Pointer and touch input are folded into one gesture stream. Only one
//! physical contact drives a gesture at a time, so a handler never sees two
//! starts without an end, or a move or end for a gesture it was not started
//! on.

use reach_core::{
    GestureEvent, GestureHandler, GestureKind, InputFamily, Point, RawInput, TouchPhase,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Contact {
    Pointer,
    Touch(u64),
}

impl Contact {
    fn family(self) -> InputFamily {
        match self {
            Contact::Pointer => InputFamily::Pointer,
            Contact::Touch(_) => InputFamily::Touch,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveContact {
    contact: Contact,
    /// Whether a subscriber received this contact's start
    delivered: bool,
}

/// Handler handles registered for one trial. Release with [`InputRouter::unsubscribe`].
#[must_use = "subscriptions stay registered until passed to InputRouter::unsubscribe"]
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription {
    handles: Vec<HandlerId>,
}

impl Subscription {
    pub fn handles(&self) -> &[HandlerId] {
        &self.handles
    }
}

/// Live handle count readable after the router itself is gone
#[derive(Debug, Clone, Default)]
pub struct HandlerGauge(Arc<AtomicUsize>);

impl HandlerGauge {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn set(&self, live: usize) {
        self.0.store(live, Ordering::SeqCst);
    }
}

const FAMILIES: [InputFamily; 2] = [InputFamily::Pointer, InputFamily::Touch];
const KINDS: [GestureKind; 3] = [GestureKind::Start, GestureKind::Move, GestureKind::End];

#[derive(Debug, Default)]
pub struct InputRouter {
    cursor: Point,
    active: Option<ActiveContact>,
    handlers: HashMap<HandlerId, (InputFamily, GestureKind)>,
    gauge: HandlerGauge,
    next_id: u64,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler handle for every gesture kind of both input families
    pub fn subscribe(&mut self) -> Subscription {
        let mut handles = Vec::with_capacity(FAMILIES.len() * KINDS.len());
        for family in FAMILIES {
            for kind in KINDS {
                let id = HandlerId(self.next_id);
                self.next_id += 1;
                self.handlers.insert(id, (family, kind));
                handles.push(id);
            }
        }
        self.gauge.set(self.handlers.len());
        // A contact already down belongs to nobody subscribed now.
        if let Some(active) = self.active.as_mut() {
            active.delivered = false;
        }
        debug!(handles = handles.len(), "gesture handlers registered");
        Subscription { handles }
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) {
        for id in &subscription.handles {
            self.handlers.remove(id);
        }
        self.gauge.set(self.handlers.len());
        debug!(
            handles = subscription.handles.len(),
            remaining = self.handlers.len(),
            "gesture handlers removed"
        );
    }

    /// Number of live handler handles
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn gauge(&self) -> HandlerGauge {
        self.gauge.clone()
    }

    pub fn is_subscribed(&self, family: InputFamily, kind: GestureKind) -> bool {
        self.handlers.values().any(|&entry| entry == (family, kind))
    }

    /// Whether a press or touch is currently held
    pub fn contact_active(&self) -> bool {
        self.active.is_some()
    }

    /// Normalises raw input without delivering it anywhere
    pub fn normalize(&mut self, raw: RawInput) -> Option<GestureEvent> {
        self.route(raw).map(|(event, _)| event)
    }

    /// Normalises `raw` and hands the result to `handler` if a matching handle is
    /// registered. Returns the delivered event.
    pub fn dispatch<H: GestureHandler + ?Sized>(
        &mut self,
        raw: RawInput,
        handler: &mut H,
    ) -> Option<GestureEvent> {
        let (event, started_here) = self.route(raw)?;
        if !self.is_subscribed(event.family, event.kind) {
            return None;
        }
        match event.kind {
            GestureKind::Start => {
                if let Some(active) = self.active.as_mut() {
                    active.delivered = true;
                }
            }
            GestureKind::Move | GestureKind::End => {
                if !started_here {
                    trace!(?event, "dropping event for a gesture started elsewhere");
                    return None;
                }
            }
        }
        event.deliver(handler);
        Some(event)
    }

    /// Returns the gesture event and whether its start went to a subscriber
    fn route(&mut self, raw: RawInput) -> Option<(GestureEvent, bool)> {
        match raw {
            RawInput::PointerMoved(position) => {
                self.cursor = position;
                self.continue_contact(Contact::Pointer, GestureKind::Move, position)
            }
            RawInput::PointerPressed => self.begin_contact(Contact::Pointer, self.cursor),
            RawInput::PointerReleased => {
                self.continue_contact(Contact::Pointer, GestureKind::End, self.cursor)
            }
            RawInput::Touch {
                id,
                phase,
                position,
            } => {
                let contact = Contact::Touch(id);
                match phase {
                    TouchPhase::Started => self.begin_contact(contact, position),
                    TouchPhase::Moved => {
                        self.continue_contact(contact, GestureKind::Move, position)
                    }
                    TouchPhase::Ended | TouchPhase::Cancelled => {
                        self.continue_contact(contact, GestureKind::End, position)
                    }
                }
            }
        }
    }

    fn begin_contact(&mut self, contact: Contact, position: Point) -> Option<(GestureEvent, bool)> {
        if let Some(active) = self.active {
            trace!(?contact, busy = ?active.contact, "ignoring second contact");
            return None;
        }
        self.active = Some(ActiveContact {
            contact,
            delivered: false,
        });
        Some((
            GestureEvent::new(GestureKind::Start, contact.family(), position),
            false,
        ))
    }

    fn continue_contact(
        &mut self,
        contact: Contact,
        kind: GestureKind,
        position: Point,
    ) -> Option<(GestureEvent, bool)> {
        let active = self.active.filter(|a| a.contact == contact)?;
        if kind == GestureKind::End {
            self.active = None;
        }
        Some((
            GestureEvent::new(kind, contact.family(), position),
            active.delivered,
        ))
    }
}
