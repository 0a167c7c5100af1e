//! Error types.
//!
//! None of these cross the bridge boundary: the bridge logs them and carries on.

use thiserror::Error;

/// Why a mount target could not be attached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountError {
    #[error("mount target is not available yet")]
    MissingTarget,

    #[error("no interactive render environment; mount skipped")]
    ServerEnvironment,

    #[error("mount target `{0}` is already claimed by another bridge")]
    TargetInUse(String),

    #[error("bridge is already attached to `{attached}`, refusing `{requested}`")]
    AlreadyAttached { attached: String, requested: String },
}

/// Failure reported by an embedded widget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidgetError {
    #[error("render failed: {0}")]
    Render(String),

    #[error("unmount failed: {0}")]
    Unmount(String),
}
