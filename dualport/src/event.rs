use std::sync::atomic::{AtomicU8, Ordering};

/// Events exchanged between interrupt handlers, the dispatcher, and the protocol engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// Startup finished
    Ready,
    /// A complete frame is waiting in the active transport's receive buffer
    FrameReceived,
    /// The received frame was accepted and must be executed
    Execute,
    /// The response frame left the active transport
    FrameSent,
}

mod raw {
    pub(super) const EMPTY: u8 = 0;
    pub(super) const READY: u8 = 1;
    pub(super) const FRAME_RECEIVED: u8 = 2;
    pub(super) const EXECUTE: u8 = 3;
    pub(super) const FRAME_SENT: u8 = 4;
}

impl Event {
    fn to_raw(self) -> u8 {
        match self {
            Event::Ready => raw::READY,
            Event::FrameReceived => raw::FRAME_RECEIVED,
            Event::Execute => raw::EXECUTE,
            Event::FrameSent => raw::FRAME_SENT,
        }
    }

    fn from_raw(value: u8) -> Option<Self> {
        match value {
            raw::READY => Some(Event::Ready),
            raw::FRAME_RECEIVED => Some(Event::FrameReceived),
            raw::EXECUTE => Some(Event::Execute),
            raw::FRAME_SENT => Some(Event::FrameSent),
            _ => None,
        }
    }
}

/// Single-slot event queue shared between interrupt context and the poll loop
///
/// Every operation is one atomic instruction, so a post from an interrupt
/// handler can never tear a concurrent take from the poll loop. A post
/// replaces whatever the slot held.
#[derive(Debug, Default)]
pub struct EventSlot {
    slot: AtomicU8,
}

impl EventSlot {
    /// Create an empty slot
    pub const fn new() -> Self {
        Self {
            slot: AtomicU8::new(raw::EMPTY),
        }
    }

    /// Post an event, returning the event it displaced
    pub fn post(&self, event: Event) -> Option<Event> {
        Event::from_raw(self.slot.swap(event.to_raw(), Ordering::AcqRel))
    }

    /// Consume the pending event, leaving the slot empty
    pub fn take(&self) -> Option<Event> {
        Event::from_raw(self.slot.swap(raw::EMPTY, Ordering::AcqRel))
    }

    /// Observe the pending event without consuming it
    pub fn peek(&self) -> Option<Event> {
        Event::from_raw(self.slot.load(Ordering::Acquire))
    }

    /// Put back a value previously returned by [`EventSlot::take`]
    ///
    /// Restoring `None` empties the slot.
    pub fn restore(&self, saved: Option<Event>) {
        let value = saved.map(Event::to_raw).unwrap_or(raw::EMPTY);
        self.slot.store(value, Ordering::Release);
    }
}
