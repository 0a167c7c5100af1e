//! Change Relay - Widget changes back to the host.
//!
//! The interactive widget calls `onChange` with its full state. The relay:
//!
//! 1. raises the reentrancy gate
//! 2. replaces the bridge state verbatim (no merge)
//! 3. notifies `configuration_changed` then `state_changed`, inside the host zone
//! 4. re-renders the widget outside the host zone
//! 5. schedules the gate release on the next microtask (or task)
//!
//! Nothing is surfaced to the widget. A failing re-render is logged by
//! `BridgeCore::render`.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, trace};

use crate::props::Cleanup;
use crate::types::PivotState;
use crate::zone::Task;

use super::{BridgeCore, BridgeMode, GateRelease};

/// Host observer of widget changes.
pub(crate) type Handler = Rc<dyn Fn(&PivotState)>;

/// Outward notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Channel {
    /// Something worth persisting.
    ConfigurationChanged,
    /// Something worth observing.
    StateChanged,
}

#[derive(Default)]
struct Subscribers {
    next_id: usize,
    configuration: Vec<(usize, Handler)>,
    state: Vec<(usize, Handler)>,
}

impl Subscribers {
    fn list_mut(&mut self, channel: Channel) -> &mut Vec<(usize, Handler)> {
        match channel {
            Channel::ConfigurationChanged => &mut self.configuration,
            Channel::StateChanged => &mut self.state,
        }
    }

    fn list(&self, channel: Channel) -> &[(usize, Handler)] {
        match channel {
            Channel::ConfigurationChanged => &self.configuration,
            Channel::StateChanged => &self.state,
        }
    }
}

/// Observer lists of one bridge.
#[derive(Default)]
pub(crate) struct Observers {
    inner: Rc<RefCell<Subscribers>>,
}

impl Observers {
    /// Register `handler` on `channel`. The returned cleanup unsubscribes it.
    pub(crate) fn subscribe(&self, channel: Channel, handler: Handler) -> Cleanup {
        let id = {
            let mut subs = self.inner.borrow_mut();
            let id = subs.next_id;
            subs.next_id += 1;
            subs.list_mut(channel).push((id, handler));
            id
        };

        let inner = Rc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.borrow_mut().list_mut(channel).retain(|(i, _)| *i != id);
            }
        })
    }

    #[cfg(test)]
    pub(crate) fn count(&self, channel: Channel) -> usize {
        self.inner.borrow().list(channel).len()
    }

    fn snapshot(&self, channel: Channel) -> Vec<Handler> {
        self.inner
            .borrow()
            .list(channel)
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect()
    }

    /// Deliver `state` on both channels.
    ///
    /// Handlers may subscribe, unsubscribe or call back into the bridge.
    pub(crate) fn notify(&self, state: &PivotState) {
        for handler in self.snapshot(Channel::ConfigurationChanged) {
            handler(state);
        }
        for handler in self.snapshot(Channel::StateChanged) {
            handler(state);
        }
    }
}

impl BridgeCore {
    pub(super) fn relay_change(&self, state: PivotState) {
        if self.mode != BridgeMode::Interactive {
            debug!("change callback on a display bridge ignored");
            return;
        }
        if self.is_torn_down() {
            debug!("widget change after teardown ignored");
            return;
        }
        trace!("relaying widget change: {state:?}");

        let hold = self.gate.raise();
        *self.state.borrow_mut() = state;

        let payload = self.state();
        self.zone.run_inside(&mut || self.observers.notify(&payload));

        self.render();

        let release: Task = Box::new(move || hold.release());
        match self.options.gate_release {
            GateRelease::Microtask => self.zone.queue_microtask(release),
            GateRelease::Task => self.zone.queue_task(release),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter(count: &Rc<Cell<usize>>) -> Handler {
        let count = count.clone();
        Rc::new(move |_: &PivotState| count.set(count.get() + 1))
    }

    #[test]
    fn test_notify_reaches_both_channels() {
        let observers = Observers::default();
        let configuration = Rc::new(Cell::new(0));
        let state = Rc::new(Cell::new(0));

        let _a = observers.subscribe(Channel::ConfigurationChanged, counter(&configuration));
        let _b = observers.subscribe(Channel::StateChanged, counter(&state));

        observers.notify(&PivotState::default());
        assert_eq!(configuration.get(), 1);
        assert_eq!(state.get(), 1);
    }

    #[test]
    fn test_configuration_channel_fires_first() {
        let observers = Observers::default();
        let order: Rc<RefCell<Vec<Channel>>> = Rc::new(RefCell::new(Vec::new()));

        let o = order.clone();
        let _s = observers.subscribe(
            Channel::StateChanged,
            Rc::new(move |_: &PivotState| o.borrow_mut().push(Channel::StateChanged)),
        );
        let o = order.clone();
        let _c = observers.subscribe(
            Channel::ConfigurationChanged,
            Rc::new(move |_: &PivotState| o.borrow_mut().push(Channel::ConfigurationChanged)),
        );

        observers.notify(&PivotState::default());
        assert_eq!(
            *order.borrow(),
            vec![Channel::ConfigurationChanged, Channel::StateChanged]
        );
    }

    #[test]
    fn test_cleanup_unsubscribes() {
        let observers = Observers::default();
        let count = Rc::new(Cell::new(0));

        let cleanup = observers.subscribe(Channel::StateChanged, counter(&count));
        let _other = observers.subscribe(Channel::StateChanged, counter(&count));
        assert_eq!(observers.count(Channel::StateChanged), 2);

        cleanup();
        assert_eq!(observers.count(Channel::StateChanged), 1);

        observers.notify(&PivotState::default());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_unsubscribe_during_notify() {
        let observers = Rc::new(Observers::default());
        let count = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<Cleanup>>> = Rc::new(RefCell::new(None));

        let s = slot.clone();
        let c = count.clone();
        let cleanup = observers.subscribe(
            Channel::ConfigurationChanged,
            Rc::new(move |_: &PivotState| {
                c.set(c.get() + 1);
                if let Some(cleanup) = s.borrow_mut().take() {
                    cleanup();
                }
            }),
        );
        *slot.borrow_mut() = Some(cleanup);

        observers.notify(&PivotState::default());
        observers.notify(&PivotState::default());
        assert_eq!(count.get(), 1);
        assert_eq!(observers.count(Channel::ConfigurationChanged), 0);
    }

    #[test]
    fn test_cleanup_after_observers_dropped() {
        let observers = Observers::default();
        let cleanup = observers.subscribe(Channel::StateChanged, Rc::new(|_: &PivotState| {}));
        drop(observers);
        cleanup();
    }
}
