//! Reentrancy Gate - Echo suppression.
//!
//! When the widget reports a change, the bridge pushes it to the host. A host
//! that binds that output straight back into the bridge's inputs would make
//! the bridge see "inputs changed" and reset its state from them, throwing
//! away what the widget just reported. The gate closes that loop:
//!
//! ```text
//! widget onChange → raise() → notify host → host writes inputs
//!                                              → input event ignored (suppressed)
//! next microtask → hold released → gate open again
//! ```
//!
//! Suppression is coarse: every input-driven refresh is ignored while the gate
//! is held, echo or not.
//!
//! Holds are counted. Overlapping changes keep the gate suppressed until the
//! last hold is released.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use log::trace;

/// Observable gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    #[default]
    Open,
    Suppressed,
}

/// Two-state suppression flag shared by a bridge and its deferred releases.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyGate {
    holds: Rc<Cell<usize>>,
}

impl ReentrancyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress input refresh until the returned hold is released.
    #[must_use = "the gate opens again as soon as the hold is dropped"]
    pub fn raise(&self) -> GateHold {
        self.holds.set(self.holds.get() + 1);
        trace!("gate raised ({} holds)", self.holds.get());
        GateHold {
            holds: Rc::downgrade(&self.holds),
        }
    }

    pub fn state(&self) -> GateState {
        if self.holds.get() == 0 {
            GateState::Open
        } else {
            GateState::Suppressed
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.state() == GateState::Suppressed
    }
}

/// One outstanding suppression. Releases on drop.
#[derive(Debug)]
pub struct GateHold {
    holds: Weak<Cell<usize>>,
}

impl GateHold {
    /// Lower this hold now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for GateHold {
    fn drop(&mut self) {
        if let Some(holds) = self.holds.upgrade() {
            holds.set(holds.get().saturating_sub(1));
            trace!("gate hold released ({} left)", holds.get());
        }
    }
}
