//! Bridge - Host ↔ embedded widget state synchronization.
//!
//! One mechanism, two shells:
//!
//! - [`PivotTable`] - read-only display, no feedback path
//! - [`PivotTableUi`] - interactive, widget changes flow back to the host
//!
//! # Flow
//!
//! ```text
//! on_ready(target) → MountController::attach → project(state) → widget.render
//!                                                                     │
//!       (interactive) widget onChange(S) ─→ relay: gate.raise ─→ state = S
//!                                              → notify host (inside zone)
//!                                              → re-render (outside zone)
//!                                              → release gate next microtask
//! ```
//!
//! # Reentrancy
//!
//! No `RefCell` borrow is held across a call into the widget or a host
//! observer. A render requested while one is running is coalesced into a
//! single follow-up render of the latest state, and a teardown requested from
//! inside a render completes once that render returns. A request whose state
//! equals the one being rendered is dropped, so a widget that reports its
//! state on every paint settles after one render.

mod display;
mod interactive;
mod relay;

pub use display::PivotTable;
pub use interactive::PivotTableUi;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::{debug, error, trace, warn};

use crate::gate::{GateState, ReentrancyGate};
use crate::mount::{MountController, MountTarget, RenderEnvironment};
use crate::props::{project, project_interactive, Cleanup, OnChange, PropertyBag};
use crate::types::{AggregatorName, PivotConfig, PivotState};
use crate::widget::PivotWidget;
use crate::zone::HostZone;

use relay::Observers;

// =============================================================================
// Options
// =============================================================================

/// Which bridge flavour this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeMode {
    /// Read-only display: no change callback, no outputs.
    Display,
    /// Bidirectional editor.
    Interactive,
}

/// When the gate opens again after a widget change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateRelease {
    /// Next microtask: tightest window that still covers same-tick reactions.
    #[default]
    Microtask,
    /// Next task.
    Task,
}

/// Bridge configuration.
#[derive(Debug, Clone, Default)]
pub struct BridgeOptions {
    pub environment: RenderEnvironment,
    pub gate_release: GateRelease,
    /// Aggregator applied when host inputs leave it unset.
    pub default_aggregator: AggregatorName,
}

impl BridgeOptions {
    pub fn with_environment(mut self, environment: RenderEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_gate_release(mut self, release: GateRelease) -> Self {
        self.gate_release = release;
        self
    }

    pub fn with_default_aggregator(mut self, name: impl Into<AggregatorName>) -> Self {
        self.default_aggregator = name.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Mounted,
    TornDown,
}

// =============================================================================
// Core
// =============================================================================

pub(crate) struct BridgeCore {
    mode: BridgeMode,
    options: BridgeOptions,
    zone: Rc<dyn HostZone>,
    widget: RefCell<Box<dyn PivotWidget>>,
    mount: RefCell<MountController>,
    state: RefCell<PivotState>,
    gate: ReentrancyGate,
    observers: Observers,
    phase: Cell<Phase>,
    rendering: Cell<bool>,
    /// State handed to the widget by the render in progress.
    rendering_state: RefCell<Option<PivotState>>,
    render_pending: Cell<bool>,
    unmount_pending: Cell<bool>,
    this: Weak<BridgeCore>,
}

impl BridgeCore {
    fn is_torn_down(&self) -> bool {
        self.phase.get() == Phase::TornDown
    }

    fn on_ready(&self, target: Option<MountTarget>) {
        if self.is_torn_down() {
            warn!("on_ready after teardown ignored");
            return;
        }
        if !self.mount.borrow_mut().attach(target) {
            return;
        }
        debug!("{:?} bridge mounted", self.mode);
        self.phase.set(Phase::Mounted);
        self.render();
    }

    fn configuration_input(&self, config: PivotConfig) {
        if self.is_torn_down() {
            debug!("configuration input after teardown ignored");
            return;
        }
        if self.gate.is_suppressed() {
            trace!("configuration input suppressed while widget change propagates");
            return;
        }

        {
            let defaults = &self.options.default_aggregator;
            let mut state = self.state.borrow_mut();
            match self.mode {
                BridgeMode::Display => *state = config.with_host_defaults(defaults),
                // Inputs override; fields only the widget manages survive.
                BridgeMode::Interactive => {
                    state.merge(config);
                    if state.aggregator_name.is_none() {
                        state.aggregator_name = Some(defaults.clone());
                    }
                }
            }
        }
        self.render();
    }

    fn update_state(&self, partial: PivotConfig) {
        if self.is_torn_down() {
            debug!("update_state after teardown ignored");
            return;
        }
        self.state.borrow_mut().merge(partial);
        self.render();
    }

    fn state(&self) -> PivotState {
        self.state.borrow().clone()
    }

    fn change_callback(&self) -> OnChange {
        let core = self.this.clone();
        Rc::new(move |state: PivotState| match core.upgrade() {
            Some(core) => core.relay_change(state),
            None => debug!("widget change after bridge was dropped"),
        })
    }

    fn build_props(&self) -> PropertyBag {
        let state = self.state.borrow();
        match self.mode {
            BridgeMode::Display => project(&state),
            BridgeMode::Interactive => project_interactive(&state, self.change_callback()),
        }
    }

    /// Render the current state outside host detection.
    fn render(&self) {
        if self.phase.get() != Phase::Mounted {
            trace!("render skipped: bridge not mounted");
            return;
        }
        if self.rendering.get() {
            let unchanged = self.rendering_state.borrow().as_ref() == Some(&*self.state.borrow());
            if unchanged {
                trace!("render skipped: state unchanged since this render began");
            } else {
                self.render_pending.set(true);
            }
            return;
        }

        self.rendering.set(true);
        loop {
            self.render_pending.set(false);

            let Some(target) = self.mount.borrow().target().cloned() else {
                break;
            };
            *self.rendering_state.borrow_mut() = Some(self.state());
            let mut props = Some(self.build_props());
            let mut outcome = Ok(());
            self.zone.run_outside(&mut || {
                if let Some(props) = props.take() {
                    outcome = self.widget.borrow_mut().render(&target, props);
                }
            });

            if let Err(e) = outcome {
                error!("pivot widget failed to render into `{target}`: {e}");
            }
            if !self.render_pending.get() || self.phase.get() != Phase::Mounted {
                break;
            }
        }
        self.rendering.set(false);
        self.rendering_state.borrow_mut().take();

        if self.unmount_pending.replace(false) {
            self.detach();
        }
    }

    fn teardown(&self) {
        if self.is_torn_down() {
            return;
        }
        debug!("{:?} bridge teardown", self.mode);
        self.phase.set(Phase::TornDown);

        if self.rendering.get() {
            // Finished by render() once the widget returns.
            self.unmount_pending.set(true);
            return;
        }
        self.detach();
    }

    fn detach(&self) {
        let mut widget = self.widget.borrow_mut();
        self.mount.borrow_mut().detach(|target| {
            if let Err(e) = widget.unmount(target) {
                error!("pivot widget failed to unmount from `{target}`: {e}");
            }
        });
    }
}

impl Drop for BridgeCore {
    fn drop(&mut self) {
        if !self.is_torn_down() {
            self.teardown();
        }
    }
}

// =============================================================================
// PivotBridge
// =============================================================================

/// The shared bridge mechanism behind [`PivotTable`] and [`PivotTableUi`].
///
/// Single-threaded: the bridge is neither `Send` nor `Sync`.
pub struct PivotBridge {
    core: Rc<BridgeCore>,
}

impl PivotBridge {
    pub fn new(
        mode: BridgeMode,
        widget: impl PivotWidget + 'static,
        zone: Rc<dyn HostZone>,
        options: BridgeOptions,
    ) -> Self {
        let environment = options.environment;
        let core = Rc::new_cyclic(|this| BridgeCore {
            mode,
            options,
            zone,
            widget: RefCell::new(Box::new(widget)),
            mount: RefCell::new(MountController::new(environment)),
            state: RefCell::new(PivotState::default()),
            gate: ReentrancyGate::new(),
            observers: Observers::default(),
            phase: Cell::new(Phase::Created),
            rendering: Cell::new(false),
            rendering_state: RefCell::new(None),
            render_pending: Cell::new(false),
            unmount_pending: Cell::new(false),
            this: this.clone(),
        });
        Self { core }
    }

    pub fn mode(&self) -> BridgeMode {
        self.core.mode
    }

    /// Host view is ready: attach `target` and render.
    ///
    /// An absent target is logged and leaves the bridge waiting for another
    /// `on_ready`.
    pub fn on_ready(&self, target: Option<MountTarget>) {
        self.core.on_ready(target);
    }

    /// Host inputs changed. Ignored while the reentrancy gate is suppressed.
    pub fn on_configuration_input(&self, config: PivotConfig) {
        self.core.configuration_input(config);
    }

    /// Unmount the widget and release the target. Idempotent.
    pub fn on_teardown(&self) {
        self.core.teardown();
    }

    /// Merge present fields of `partial` into the state; re-render if mounted.
    pub fn update_state(&self, partial: PivotConfig) {
        self.core.update_state(partial);
    }

    /// Snapshot of the current state.
    pub fn get_state(&self) -> PivotState {
        self.core.state()
    }

    pub fn is_mounted(&self) -> bool {
        self.core.phase.get() == Phase::Mounted
    }

    pub fn is_torn_down(&self) -> bool {
        self.core.is_torn_down()
    }

    pub fn gate_state(&self) -> GateState {
        self.core.gate.state()
    }

    /// Subscribe to "configuration changed" (something to persist).
    pub fn on_configuration_changed<F>(&self, handler: F) -> Cleanup
    where
        F: Fn(&PivotState) + 'static,
    {
        self.core.observers.subscribe(relay::Channel::ConfigurationChanged, Rc::new(handler))
    }

    /// Subscribe to "state changed" (something to observe).
    pub fn on_state_changed<F>(&self, handler: F) -> Cleanup
    where
        F: Fn(&PivotState) + 'static,
    {
        self.core.observers.subscribe(relay::Channel::StateChanged, Rc::new(handler))
    }

    pub(crate) fn downgrade(&self) -> WeakBridge {
        WeakBridge {
            core: Rc::downgrade(&self.core),
        }
    }
}

impl AsRef<PivotBridge> for PivotBridge {
    fn as_ref(&self) -> &PivotBridge {
        self
    }
}

/// Non-owning bridge handle for host bindings.
#[derive(Clone)]
pub(crate) struct WeakBridge {
    core: Weak<BridgeCore>,
}

impl WeakBridge {
    pub(crate) fn on_configuration_input(&self, config: PivotConfig) -> bool {
        match self.core.upgrade() {
            Some(core) => {
                core.configuration_input(config);
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
