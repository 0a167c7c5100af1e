//! Recording widget - a stand-in for the real pivot widget.
//!
//! Records every render and unmount, can be told to fail, and lets the caller
//! play the user's part by firing the last `onChange` it received.
//!
//! ```ignore
//! let (widget, probe) = RecordingWidget::new();
//! let ui = PivotTableUi::new(widget, zone);
//! ui.on_ready(Some(MountTarget::new("pivot")));
//!
//! probe.emit_change(PivotConfig::new().with_rows(["A"]));
//! assert_eq!(probe.render_count(), 2);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::WidgetError;
use crate::mount::MountTarget;
use crate::props::PropertyBag;
use crate::types::PivotState;

use super::PivotWidget;

/// One recorded render call.
#[derive(Clone, Debug)]
pub struct RenderCall {
    pub target: MountTarget,
    pub props: PropertyBag,
}

#[derive(Default)]
struct Recording {
    renders: Vec<RenderCall>,
    unmounts: Vec<MountTarget>,
    fail_render: Option<String>,
    fail_unmount: Option<String>,
    emit_during_render: Option<PivotState>,
}

/// Widget half: moved into the bridge.
pub struct RecordingWidget {
    recording: Rc<RefCell<Recording>>,
}

/// Observer half: kept by the test or host.
#[derive(Clone)]
pub struct WidgetProbe {
    recording: Rc<RefCell<Recording>>,
}

impl RecordingWidget {
    pub fn new() -> (Self, WidgetProbe) {
        let recording = Rc::new(RefCell::new(Recording::default()));
        (
            Self { recording: recording.clone() },
            WidgetProbe { recording },
        )
    }
}

impl PivotWidget for RecordingWidget {
    fn render(&mut self, target: &MountTarget, props: PropertyBag) -> Result<(), WidgetError> {
        let emit = {
            let mut rec = self.recording.borrow_mut();
            if let Some(reason) = &rec.fail_render {
                return Err(WidgetError::Render(reason.clone()));
            }
            rec.renders.push(RenderCall {
                target: target.clone(),
                props: props.clone(),
            });
            rec.emit_during_render.take()
        };

        // Borrow released: the callback re-enters the bridge.
        if let (Some(state), Some(on_change)) = (emit, props.on_change()) {
            on_change(state);
        }
        Ok(())
    }

    fn unmount(&mut self, target: &MountTarget) -> Result<(), WidgetError> {
        let mut rec = self.recording.borrow_mut();
        rec.unmounts.push(target.clone());
        match &rec.fail_unmount {
            Some(reason) => Err(WidgetError::Unmount(reason.clone())),
            None => Ok(()),
        }
    }
}

impl WidgetProbe {
    /// Number of successful renders so far.
    pub fn render_count(&self) -> usize {
        self.recording.borrow().renders.len()
    }

    /// Number of unmount calls so far (failed ones included).
    pub fn unmount_count(&self) -> usize {
        self.recording.borrow().unmounts.len()
    }

    pub fn renders(&self) -> Vec<RenderCall> {
        self.recording.borrow().renders.clone()
    }

    pub fn last_props(&self) -> Option<PropertyBag> {
        self.recording.borrow().renders.last().map(|call| call.props.clone())
    }

    /// Sorted keys of the last rendered bag.
    pub fn last_keys(&self) -> Vec<String> {
        self.last_props()
            .map(|props| props.keys().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Make every following render fail with `reason` (`None` to recover).
    pub fn fail_renders(&self, reason: Option<&str>) {
        self.recording.borrow_mut().fail_render = reason.map(str::to_string);
    }

    /// Make every following unmount fail with `reason` (`None` to recover).
    pub fn fail_unmounts(&self, reason: Option<&str>) {
        self.recording.borrow_mut().fail_unmount = reason.map(str::to_string);
    }

    /// Fire `onChange` from inside the next render, like a widget that
    /// normalizes its state on first paint.
    pub fn emit_during_next_render(&self, state: PivotState) {
        self.recording.borrow_mut().emit_during_render = Some(state);
    }

    /// Act as the user: invoke the last received `onChange` with `state`.
    ///
    /// Returns false when no callback has been received (display bridge, or
    /// nothing rendered yet).
    pub fn emit_change(&self, state: PivotState) -> bool {
        let callback = self.last_props().and_then(|props| props.on_change());
        match callback {
            Some(on_change) => {
                on_change(state);
                true
            }
            None => false,
        }
    }
}
