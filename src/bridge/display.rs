//! Read-only pivot table.
//!
//! Renders whatever configuration the host supplies. The widget gets no
//! change callback, so nothing ever flows back.

use std::rc::Rc;

use crate::gate::GateState;
use crate::mount::MountTarget;
use crate::types::{PivotConfig, PivotState};
use crate::widget::PivotWidget;
use crate::zone::HostZone;

use super::{BridgeMode, BridgeOptions, PivotBridge};

/// Display bridge: host configuration in, rendered table out.
pub struct PivotTable {
    bridge: PivotBridge,
}

impl PivotTable {
    pub fn new(widget: impl PivotWidget + 'static, zone: Rc<dyn HostZone>) -> Self {
        Self::with_options(widget, zone, BridgeOptions::default())
    }

    pub fn with_options(
        widget: impl PivotWidget + 'static,
        zone: Rc<dyn HostZone>,
        options: BridgeOptions,
    ) -> Self {
        Self {
            bridge: PivotBridge::new(BridgeMode::Display, widget, zone, options),
        }
    }

    pub fn on_ready(&self, target: Option<MountTarget>) {
        self.bridge.on_ready(target);
    }

    /// Replace the rendered configuration with `config` (host defaults applied).
    pub fn on_configuration_input(&self, config: PivotConfig) {
        self.bridge.on_configuration_input(config);
    }

    pub fn on_teardown(&self) {
        self.bridge.on_teardown();
    }

    pub fn update_state(&self, partial: PivotConfig) {
        self.bridge.update_state(partial);
    }

    pub fn get_state(&self) -> PivotState {
        self.bridge.get_state()
    }

    pub fn is_mounted(&self) -> bool {
        self.bridge.is_mounted()
    }

    pub fn is_torn_down(&self) -> bool {
        self.bridge.is_torn_down()
    }

    /// Always open: a display bridge never raises the gate.
    pub fn gate_state(&self) -> GateState {
        self.bridge.gate_state()
    }

    pub fn bridge(&self) -> &PivotBridge {
        &self.bridge
    }
}

impl AsRef<PivotBridge> for PivotTable {
    fn as_ref(&self) -> &PivotBridge {
        &self.bridge
    }
}
