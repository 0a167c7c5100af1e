//! Interactive pivot table.
//!
//! The user reshapes the table inside the widget; every change comes back
//! through `onChange`, replaces the bridge state and is announced to the host
//! on two channels:
//!
//! - `configuration_changed` - the new configuration, to persist
//! - `state_changed` - the same payload, to observe
//!
//! Host inputs merge over the current state, so keys only the widget manages
//! survive an input refresh.

use std::rc::Rc;

use crate::gate::GateState;
use crate::mount::MountTarget;
use crate::props::Cleanup;
use crate::types::{PivotConfig, PivotState};
use crate::widget::PivotWidget;
use crate::zone::HostZone;

use super::{BridgeMode, BridgeOptions, PivotBridge};

/// Bidirectional bridge around an interactive pivot widget.
pub struct PivotTableUi {
    bridge: PivotBridge,
}

impl PivotTableUi {
    pub fn new(widget: impl PivotWidget + 'static, zone: Rc<dyn HostZone>) -> Self {
        Self::with_options(widget, zone, BridgeOptions::default())
    }

    pub fn with_options(
        widget: impl PivotWidget + 'static,
        zone: Rc<dyn HostZone>,
        options: BridgeOptions,
    ) -> Self {
        Self {
            bridge: PivotBridge::new(BridgeMode::Interactive, widget, zone, options),
        }
    }

    pub fn on_ready(&self, target: Option<MountTarget>) {
        self.bridge.on_ready(target);
    }

    /// Merge host inputs over the current state and re-render.
    ///
    /// Ignored while a widget change is still propagating.
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

    pub fn gate_state(&self) -> GateState {
        self.bridge.gate_state()
    }

    pub fn on_configuration_changed<F>(&self, handler: F) -> Cleanup
    where
        F: Fn(&PivotState) + 'static,
    {
        self.bridge.on_configuration_changed(handler)
    }

    pub fn on_state_changed<F>(&self, handler: F) -> Cleanup
    where
        F: Fn(&PivotState) + 'static,
    {
        self.bridge.on_state_changed(handler)
    }

    pub fn bridge(&self) -> &PivotBridge {
        &self.bridge
    }
}

impl AsRef<PivotBridge> for PivotTableUi {
    fn as_ref(&self) -> &PivotBridge {
        &self.bridge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use serde_json::json;

    use crate::bridge::{BridgeMode, GateRelease};
    use crate::props::ON_CHANGE_KEY;
    use crate::widget::{RecordingWidget, WidgetProbe};
    use crate::zone::DirectZone;

    fn table_ui(target: &str) -> (PivotTableUi, WidgetProbe, Rc<DirectZone>) {
        let (widget, probe) = RecordingWidget::new();
        let zone = Rc::new(DirectZone::new());
        let ui = PivotTableUi::new(widget, zone.clone());
        ui.on_ready(Some(MountTarget::new(target)));
        (ui, probe, zone)
    }

    #[test]
    fn test_bag_carries_callback() {
        let (ui, probe, _zone) = table_ui("ui-callback");
        assert_eq!(ui.bridge().mode(), BridgeMode::Interactive);
        assert!(probe.last_keys().contains(&ON_CHANGE_KEY.to_string()));

        let renders = probe.renders();
        assert_eq!(renders.len(), 1);
        assert_eq!(renders[0].target.id(), "ui-callback");
    }

    #[test]
    fn test_change_replaces_state() {
        let (ui, probe, _zone) = table_ui("ui-replace");
        ui.on_configuration_input(PivotConfig::new().with_rows(["A"]).with_vals(["Sales"]));

        let reported = PivotConfig::new().with_cols(["B"]);
        assert!(probe.emit_change(reported.clone()));
        assert_eq!(ui.get_state(), reported);
    }

    #[test]
    fn test_change_notifies_and_rerenders_once() {
        let (ui, probe, _zone) = table_ui("ui-notify");
        let configurations: Rc<RefCell<Vec<PivotState>>> = Rc::new(RefCell::new(Vec::new()));
        let states: Rc<RefCell<Vec<PivotState>>> = Rc::new(RefCell::new(Vec::new()));

        let c = configurations.clone();
        let _c = ui.on_configuration_changed(move |s| c.borrow_mut().push(s.clone()));
        let s = states.clone();
        let _s = ui.on_state_changed(move |st| s.borrow_mut().push(st.clone()));

        let before = probe.render_count();
        let reported = PivotConfig::new().with_rows(["A"]).with_cols(["B"]);
        probe.emit_change(reported.clone());

        assert_eq!(*configurations.borrow(), vec![reported.clone()]);
        assert_eq!(*states.borrow(), vec![reported]);
        assert_eq!(probe.render_count(), before + 1);
    }

    #[test]
    fn test_relay_render_failure_still_notifies_and_releases() {
        let (ui, probe, zone) = table_ui("ui-relay-render-failure");
        let configurations = Rc::new(RefCell::new(Vec::<PivotState>::new()));
        let states = Rc::new(RefCell::new(Vec::<PivotState>::new()));
        let c = configurations.clone();
        let _c = ui.on_configuration_changed(move |s| c.borrow_mut().push(s.clone()));
        let s = states.clone();
        let _s = ui.on_state_changed(move |st| s.borrow_mut().push(st.clone()));

        let renders = probe.render_count();
        probe.fail_renders(Some("canvas lost"));
        let reported = PivotConfig::new().with_rows(["A"]);
        assert!(probe.emit_change(reported.clone()));

        assert_eq!(*configurations.borrow(), vec![reported.clone()]);
        assert_eq!(*states.borrow(), vec![reported.clone()]);
        assert_eq!(ui.get_state(), reported);
        assert_eq!(probe.render_count(), renders);
        assert_eq!(ui.gate_state(), GateState::Suppressed);

        zone.flush();
        assert_eq!(ui.gate_state(), GateState::Open);
    }

    #[test]
    fn test_gate_suppresses_until_flush() {
        let (ui, probe, zone) = table_ui("ui-gate");
        probe.emit_change(PivotConfig::new().with_rows(["A"]));
        assert_eq!(ui.gate_state(), GateState::Suppressed);

        ui.on_configuration_input(PivotConfig::new().with_rows(["Z"]));
        assert_eq!(ui.get_state().rows, Some(vec!["A".to_string()]));

        zone.flush();
        assert_eq!(ui.gate_state(), GateState::Open);

        ui.on_configuration_input(PivotConfig::new().with_rows(["Z"]));
        assert_eq!(ui.get_state().rows, Some(vec!["Z".to_string()]));
    }

    #[test]
    fn test_task_release_outlives_microtasks() {
        let (widget, probe) = RecordingWidget::new();
        let zone = Rc::new(DirectZone::new());
        let options = BridgeOptions::default().with_gate_release(GateRelease::Task);
        let ui = PivotTableUi::with_options(widget, zone.clone(), options);
        ui.on_ready(Some(MountTarget::new("ui-task-release")));

        probe.emit_change(PivotConfig::new().with_rows(["A"]));
        assert_eq!(ui.gate_state(), GateState::Suppressed);

        zone.flush();
        assert_eq!(ui.gate_state(), GateState::Open);
    }

    #[test]
    fn test_input_merge_keeps_widget_keys() {
        let (ui, probe, zone) = table_ui("ui-merge");
        probe.emit_change(
            PivotConfig::new()
                .with_rows(["A"])
                .with_extra("tableOptions", json!({"clickCallback": null})),
        );
        zone.flush();

        ui.on_configuration_input(PivotConfig::new().with_cols(["B"]));

        let state = ui.get_state();
        assert_eq!(state.rows, Some(vec!["A".to_string()]));
        assert_eq!(state.cols, Some(vec!["B".to_string()]));
        assert!(state.extra.contains_key("tableOptions"));
    }

    #[test]
    fn test_overlapping_changes_hold_gate() {
        let (ui, probe, zone) = table_ui("ui-overlap");
        probe.emit_change(PivotConfig::new().with_rows(["A"]));
        probe.emit_change(PivotConfig::new().with_rows(["B"]));

        assert_eq!(zone.flush(), 2);
        assert_eq!(ui.gate_state(), GateState::Open);
        assert_eq!(ui.get_state().rows, Some(vec!["B".to_string()]));
    }

    #[test]
    fn test_change_after_teardown_ignored() {
        let (ui, probe, _zone) = table_ui("ui-after-teardown");
        let callback = probe.last_props().and_then(|props| props.on_change());
        ui.on_teardown();

        if let Some(on_change) = callback {
            on_change(PivotConfig::new().with_rows(["A"]));
        }
        assert_eq!(ui.get_state().rows, None);
        assert_eq!(ui.gate_state(), GateState::Open);
    }
}
