//! Single-in-flight send gate.
//!
//! At most one send may be outstanding per session. A caller acquires a
//! [`SendPermit`] before handing a frame to the transport; the gate re-opens
//! when the permit is dropped, whatever the outcome of the send.

use std::sync::atomic::{AtomicBool, Ordering};

/// Open/closed flag guarding outgoing sends.
#[derive(Debug)]
pub struct SendGate {
    in_flight: AtomicBool,
}

impl SendGate {
    /// Create an open gate.
    pub fn new() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
        }
    }

    /// Close the gate for the duration of one send.
    ///
    /// Returns `None` if another send already holds it.
    pub fn try_acquire(&self) -> Option<SendPermit<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SendPermit { gate: self })
    }

    /// Check whether a send could start right now.
    pub fn is_open(&self) -> bool {
        !self.in_flight.load(Ordering::Acquire)
    }

    /// Force the gate open.
    pub fn reopen(&self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

impl Default for SendGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof that the gate is held. Re-opens it on drop.
#[derive(Debug)]
pub struct SendPermit<'a> {
    gate: &'a SendGate,
}

impl Drop for SendPermit<'_> {
    fn drop(&mut self) {
        self.gate.reopen();
    }
}
