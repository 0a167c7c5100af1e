//! # spark-pivot
//!
//! Host bridge for an embedded pivot-table widget.
//!
//! A reactive host owns a pivot configuration; a third-party widget renders it
//! into a mount target and, when interactive, reports the user's edits. The
//! bridge sits between the two and keeps them in sync without feedback loops.
//!
//! ## Architecture
//!
//! ```text
//! host lifecycle ─→ MountController ─→ project(state) ─→ widget.render  (outside zone)
//!                                                          │
//!                         host observers ←─ relay ←─ onChange(S)     (inside zone)
//!                                               │
//!                                      ReentrancyGate (echo suppression)
//! ```
//!
//! ## Modules
//!
//! - [`types`] - `PivotConfig`, selector names, datasets
//! - [`props`] - configuration → widget property bag
//! - [`mount`] - mount targets and their controller
//! - [`gate`] - reentrancy gate
//! - [`zone`] - host scheduling (detection isolation, microtasks)
//! - [`bridge`] - `PivotTable` and `PivotTableUi`
//! - [`widget`] - the widget capability and a recording stand-in
//! - [`host`] - spark-signals bindings
//! - [`error`] - mount and widget errors

pub mod bridge;
pub mod error;
pub mod gate;
pub mod host;
pub mod mount;
pub mod props;
pub mod types;
pub mod widget;
pub mod zone;

// Re-export commonly used items
pub use types::*;

pub use bridge::{BridgeMode, BridgeOptions, GateRelease, PivotBridge, PivotTable, PivotTableUi};

pub use error::{MountError, WidgetError};

pub use gate::{GateHold, GateState, ReentrancyGate};

pub use host::{bind_inputs, bind_outputs, bind_two_way};

pub use mount::{claimed_target_count, MountController, MountTarget, RenderEnvironment};

pub use props::{project, project_interactive, Cleanup, OnChange, Prop, PropertyBag, ON_CHANGE_KEY};

pub use widget::{PivotWidget, RecordingWidget, RenderCall, WidgetProbe};

pub use zone::{DirectZone, HostZone, SignalZone, Task, TaskQueue};
