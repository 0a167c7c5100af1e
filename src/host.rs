//! Host bindings - Wiring bridges to reactive host state.
//!
//! The host keeps its pivot configuration in spark-signals. These helpers turn
//! signal changes into bridge lifecycle events and widget changes back into
//! signal writes.
//!
//! # Pattern
//!
//! Same as every reactive binding in the crate:
//!
//! 1. Create an `effect_scope(false)`
//! 2. Run the effect inside `scope.run()`
//! 3. Return `Box::new(move || scope.stop())` as the Cleanup
//!
//! ```ignore
//! let config = signal(PivotConfig::new().with_rows(["Name"]));
//! let ui = PivotTableUi::new(widget, zone);
//! let _stop = bind_two_way(&ui, config.clone());
//!
//! // user drags a field → config now holds the widget's state,
//! // and the echo back into the bridge is suppressed.
//! ```
//!
//! Bindings hold the bridge weakly; dropping the bridge leaves them inert.

use log::trace;
use spark_signals::{effect, effect_scope, Signal};

use crate::bridge::{PivotBridge, PivotTableUi};
use crate::props::Cleanup;
use crate::types::{PivotConfig, PivotState};

/// Forward every value of `input` to the bridge's `on_configuration_input`.
///
/// Runs once immediately with the current value.
pub fn bind_inputs<B: AsRef<PivotBridge>>(bridge: &B, input: Signal<PivotConfig>) -> Cleanup {
    let bridge = bridge.as_ref().downgrade();
    let scope = effect_scope(false);

    scope.run(move || {
        let _effect_cleanup = effect(move || {
            let config = input.get();
            if !bridge.on_configuration_input(config) {
                trace!("input binding outlived its bridge");
            }
        });
    });

    Box::new(move || {
        scope.stop();
    })
}

/// Write every `state_changed` payload into `output`.
pub fn bind_outputs(bridge: &PivotTableUi, output: Signal<Option<PivotState>>) -> Cleanup {
    bridge.on_state_changed(move |state| {
        output.set(Some(state.clone()));
    })
}

/// Bind one configuration signal both ways.
///
/// Widget changes are written back into `config`; the resulting input event is
/// absorbed by the reentrancy gate instead of resetting the widget.
pub fn bind_two_way(bridge: &PivotTableUi, config: Signal<PivotConfig>) -> Cleanup {
    let inputs = bind_inputs(bridge, config.clone());
    let outputs = bridge.on_configuration_changed(move |state| {
        config.set(state.clone());
    });

    Box::new(move || {
        outputs();
        inputs();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use spark_signals::signal;

    use crate::gate::GateState;
    use crate::mount::MountTarget;
    use crate::widget::RecordingWidget;
    use crate::zone::{DirectZone, HostZone, SignalZone};

    #[test]
    fn test_inputs_follow_signal() {
        let (widget, probe) = RecordingWidget::new();
        let ui = PivotTableUi::new(widget, Rc::new(DirectZone::new()));
        ui.on_ready(Some(MountTarget::new("host-inputs")));

        let config = signal(PivotConfig::new().with_rows(["A"]));
        let stop = bind_inputs(&ui, config.clone());
        assert_eq!(ui.get_state().rows, Some(vec!["A".to_string()]));

        config.set(PivotConfig::new().with_rows(["B"]));
        assert_eq!(ui.get_state().rows, Some(vec!["B".to_string()]));
        let renders = probe.render_count();

        stop();
        config.set(PivotConfig::new().with_rows(["C"]));
        assert_eq!(ui.get_state().rows, Some(vec!["B".to_string()]));
        assert_eq!(probe.render_count(), renders);
    }

    #[test]
    fn test_outputs_receive_widget_state() {
        let (widget, probe) = RecordingWidget::new();
        let ui = PivotTableUi::new(widget, Rc::new(DirectZone::new()));
        ui.on_ready(Some(MountTarget::new("host-outputs")));

        let output = signal(None::<PivotState>);
        let _stop = bind_outputs(&ui, output.clone());

        let reported = PivotConfig::new().with_cols(["B"]);
        probe.emit_change(reported.clone());
        assert_eq!(output.get(), Some(reported));
    }

    #[test]
    fn test_two_way_echo_is_suppressed() {
        let (widget, probe) = RecordingWidget::new();
        let zone = Rc::new(SignalZone::new());
        let ui = PivotTableUi::new(widget, zone.clone());
        ui.on_ready(Some(MountTarget::new("host-echo")));

        let config = signal(PivotConfig::new().with_rows(["Name"]));
        let _stop = bind_two_way(&ui, config.clone());
        let renders = probe.render_count();
        let passes = zone.detection_passes();

        let reported = PivotConfig::new().with_rows(["City"]).with_cols(["Gender"]);
        probe.emit_change(reported.clone());

        assert_eq!(config.get(), reported);
        assert_eq!(ui.get_state(), reported);
        assert_eq!(ui.gate_state(), GateState::Suppressed);
        assert_eq!(probe.render_count(), renders + 1);
        assert_eq!(zone.detection_passes(), passes + 1);

        zone.flush();
        assert_eq!(ui.gate_state(), GateState::Open);

        config.set(PivotConfig::new().with_rows(["Age"]));
        assert_eq!(ui.get_state().rows, Some(vec!["Age".to_string()]));
    }

    #[test]
    fn test_binding_outlives_bridge() {
        let (widget, _probe) = RecordingWidget::new();
        let ui = PivotTableUi::new(widget, Rc::new(DirectZone::new()));
        let config = signal(PivotConfig::new());
        let _stop = bind_inputs(&ui, config.clone());

        drop(ui);
        config.set(PivotConfig::new().with_rows(["A"]));
    }

    #[test]
    fn test_cleanup_stops_outputs() {
        let (widget, probe) = RecordingWidget::new();
        let ui = PivotTableUi::new(widget, Rc::new(DirectZone::new()));
        ui.on_ready(Some(MountTarget::new("host-outputs-stop")));

        let writes = Rc::new(Cell::new(0));
        let output = signal(None::<PivotState>);
        let w = writes.clone();
        let watched = output.clone();
        let _watch = effect(move || {
            let _ = watched.get();
            w.set(w.get() + 1);
        });
        let initial = writes.get();

        let stop = bind_outputs(&ui, output);
        stop();
        probe.emit_change(PivotConfig::new().with_rows(["A"]));
        assert_eq!(writes.get(), initial);
    }
}
