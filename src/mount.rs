//! Mount Controller - Binding a bridge to its mount target.
//!
//! A [`MountTarget`] is the node the embedded widget draws into. The host
//! hands it over once its view is ready; the controller claims it, and on
//! teardown unmounts the widget's render tree and releases it again.
//!
//! # Lifecycle
//!
//! ```text
//! attach(Some(target)) → claimed → detach(unmount) → released
//!        │
//!        └─ None / Server env / target in use → logged, stays detached
//! ```
//!
//! - `attach` never fails loudly. A missing target just means "not ready yet".
//! - `detach` is idempotent and safe without a prior `attach`.
//! - Dropping the controller releases a still-claimed target.
//!
//! Targets are claimed in a per-thread registry so two bridges can never draw
//! into the same node.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;

use log::{debug, warn};

use crate::error::MountError;

// =============================================================================
// Mount Target
// =============================================================================

/// Handle to the node an embedded widget renders into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MountTarget {
    id: String,
}

impl MountTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether some bridge currently holds this target.
    pub fn is_claimed(&self) -> bool {
        CLAIMED_TARGETS.with(|claimed| claimed.borrow().contains(&self.id))
    }
}

impl fmt::Display for MountTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Where the bridge is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderEnvironment {
    /// A real, interactive node tree.
    #[default]
    Interactive,
    /// Server-side render pass: there is nothing to mount into.
    Server,
}

// =============================================================================
// Target Registry
// =============================================================================

thread_local! {
    /// Ids of targets currently attached to a bridge.
    static CLAIMED_TARGETS: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

fn claim(target: &MountTarget) -> Result<(), MountError> {
    CLAIMED_TARGETS.with(|claimed| {
        if claimed.borrow_mut().insert(target.id.clone()) {
            Ok(())
        } else {
            Err(MountError::TargetInUse(target.id.clone()))
        }
    })
}

fn release(target: &MountTarget) {
    CLAIMED_TARGETS.with(|claimed| {
        claimed.borrow_mut().remove(&target.id);
    });
}

/// Number of targets currently claimed on this thread.
pub fn claimed_target_count() -> usize {
    CLAIMED_TARGETS.with(|claimed| claimed.borrow().len())
}

// =============================================================================
// Mount Controller
// =============================================================================

/// Owns the mount target of one bridge.
pub struct MountController {
    environment: RenderEnvironment,
    target: Option<MountTarget>,
}

impl MountController {
    pub fn new(environment: RenderEnvironment) -> Self {
        Self {
            environment,
            target: None,
        }
    }

    pub fn environment(&self) -> RenderEnvironment {
        self.environment
    }

    pub fn target(&self) -> Option<&MountTarget> {
        self.target.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.target.is_some()
    }

    /// Claim `target`, reporting why it could not be attached.
    ///
    /// Re-attaching the target already held is a no-op.
    pub fn try_attach(&mut self, target: Option<MountTarget>) -> Result<(), MountError> {
        if self.environment == RenderEnvironment::Server {
            return Err(MountError::ServerEnvironment);
        }
        let target = target.ok_or(MountError::MissingTarget)?;

        if let Some(attached) = &self.target {
            if *attached == target {
                return Ok(());
            }
            return Err(MountError::AlreadyAttached {
                attached: attached.id.clone(),
                requested: target.id,
            });
        }

        claim(&target)?;
        debug!("mount target `{target}` attached");
        self.target = Some(target);
        Ok(())
    }

    /// Claim `target`; logs and returns false instead of failing.
    pub fn attach(&mut self, target: Option<MountTarget>) -> bool {
        match self.try_attach(target) {
            Ok(()) => true,
            Err(MountError::ServerEnvironment) => {
                debug!("server render environment, skipping mount");
                false
            }
            Err(e) => {
                warn!("pivot bridge not mounted: {e}");
                false
            }
        }
    }

    /// Unmount the render tree and release the target.
    ///
    /// `unmount` runs only when a target is held. Returns whether anything was
    /// detached; calling again (or before any attach) is a no-op.
    pub fn detach<F: FnOnce(&MountTarget)>(&mut self, unmount: F) -> bool {
        let Some(target) = self.target.take() else {
            return false;
        };

        unmount(&target);
        release(&target);
        debug!("mount target `{target}` detached");
        true
    }
}

impl Drop for MountController {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            release(&target);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
