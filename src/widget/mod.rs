//! Embedded widget boundary.
//!
//! The pivot widget is a black box: it accepts a [`PropertyBag`], draws itself
//! into a [`MountTarget`], and (when interactive) reports its full state back
//! through the bag's `onChange` callback. Anything implementing
//! [`PivotWidget`] can be plugged into a bridge.
//!
//! - [`RecordingWidget`] - stub that records what it was given and lets the
//!   caller fire `onChange` on demand

mod recording;

pub use recording::{RecordingWidget, RenderCall, WidgetProbe};

use crate::error::WidgetError;
use crate::mount::MountTarget;
use crate::props::PropertyBag;

/// Capability interface of the embedded pivot widget.
pub trait PivotWidget {
    /// Render (or re-render) into `target` from `props`.
    ///
    /// May invoke the bag's `onChange` callback synchronously.
    fn render(&mut self, target: &MountTarget, props: PropertyBag) -> Result<(), WidgetError>;

    /// Tear down the render tree attached to `target`.
    fn unmount(&mut self, target: &MountTarget) -> Result<(), WidgetError>;
}

impl<W: PivotWidget + ?Sized> PivotWidget for Box<W> {
    fn render(&mut self, target: &MountTarget, props: PropertyBag) -> Result<(), WidgetError> {
        (**self).render(target, props)
    }

    fn unmount(&mut self, target: &MountTarget) -> Result<(), WidgetError> {
        (**self).unmount(target)
    }
}
