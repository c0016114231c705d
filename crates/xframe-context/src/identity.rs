//! Locating the target window from a sentinel.
//!
//! A sentinel's depth indexes the frame's ancestors counted from the top, so
//! depth 0 is the top-level page. Resolution only reads parent links.

use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use xframe_window::{WindowId, WindowRef};

use crate::config::ContextConfig;
use crate::error::{ContextError, Result};
use crate::sentinel::Sentinel;

/// Who this frame is and which ancestor it talks to.
#[derive(Clone)]
pub struct Identity {
    sentinel: Sentinel,
    ancestors: Vec<WindowRef>,
    target: WindowRef,
}

impl Identity {
    pub fn sentinel(&self) -> &Sentinel {
        &self.sentinel
    }

    pub fn depth(&self) -> usize {
        self.sentinel.depth()
    }

    /// Parents of the frame, top-most first.
    pub fn ancestors(&self) -> &[WindowRef] {
        &self.ancestors
    }

    /// The one window this frame exchanges protocol messages with.
    pub fn target(&self) -> &WindowRef {
        &self.target
    }

    pub fn target_id(&self) -> WindowId {
        self.target.id()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ancestors: Vec<WindowId> = self.ancestors.iter().map(|w| w.id()).collect();
        f.debug_struct("Identity")
            .field("sentinel", &self.sentinel)
            .field("ancestors", &ancestors)
            .field("target", &self.target.id())
            .finish()
    }
}

/// Collect the parents of `window`, top-most first.
///
/// The walk stops at a window with no parent or whose parent is itself.
/// More than `max_hops` parents fails with
/// [`ContextError::AncestorChainTooDeep`].
pub fn ancestor_chain(window: &WindowRef, max_hops: usize) -> Result<Vec<WindowRef>> {
    let mut chain = VecDeque::new();
    let mut current = Rc::clone(window);

    while let Some(parent) = current.parent() {
        if parent.id() == current.id() {
            break;
        }
        if chain.len() >= max_hops {
            return Err(ContextError::AncestorChainTooDeep { max: max_hops });
        }
        chain.push_front(Rc::clone(&parent));
        current = parent;
    }

    Ok(chain.into())
}

/// Parse `sentinel` and locate the target window among `window`'s ancestors.
///
/// Read-only: nothing is installed or posted.
pub fn resolve_identity(
    window: &WindowRef,
    sentinel: &str,
    config: &ContextConfig,
) -> Result<Identity> {
    let sentinel = Sentinel::parse(sentinel)?;
    let ancestors = ancestor_chain(window, config.max_ancestor_depth)?;

    let target = ancestors
        .get(sentinel.depth())
        .cloned()
        .ok_or(ContextError::InvalidDepth {
            depth: sentinel.depth(),
            ancestors: ancestors.len(),
        })?;

    tracing::debug!(
        depth = sentinel.depth(),
        ancestors = ancestors.len(),
        target = %target.id(),
        "resolved target window"
    );

    Ok(Identity {
        sentinel,
        ancestors,
        target,
    })
}
