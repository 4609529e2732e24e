//! Completion tracking.
//!
//! The tracker holds the set of nodes a pipeline needs and a one-shot action.
//! After every registration the coordinator calls `notify`; the first time
//! every required node is bound the action runs synchronously and the tracker
//! moves to a terminal state. Later notifications are no-ops until the tracker
//! is re-armed for a new pipeline lifetime.

use crate::pipeline::error::{GraphError, GraphResult};
use crate::pipeline::graph::Pipeline;
use crate::pipeline::id::NodeId;
use crate::pipeline::registry::EntityRegistry;
use crate::pipeline::topology::TopologySource;
use crate::pipeline::visibility::DeviceVisibility;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Everything a completion action may touch, borrowed from the coordinator
/// for the duration of one build.
pub struct BuildContext<'a> {
    pub registry: &'a mut EntityRegistry,
    pub pipeline: &'a mut Pipeline,
    pub topology: &'a dyn TopologySource,
    pub visibility: &'a mut dyn DeviceVisibility,
}

/// One-shot callback run when the required set is bound.
pub type CompletionAction = Box<dyn FnOnce(&mut BuildContext<'_>) -> GraphResult<()> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerState {
    /// No action installed.
    Idle,
    /// Armed, waiting for the last required registration.
    Waiting,
    /// Action ran and succeeded.
    Complete,
    /// Action ran and returned an error.
    Failed,
}

impl TrackerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TrackerState::Complete | TrackerState::Failed)
    }
}

impl fmt::Display for TrackerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerState::Idle => write!(f, "Idle"),
            TrackerState::Waiting => write!(f, "Waiting"),
            TrackerState::Complete => write!(f, "Complete"),
            TrackerState::Failed => write!(f, "Failed"),
        }
    }
}

pub struct CompletionTracker {
    required: BTreeSet<NodeId>,
    state: TrackerState,
    action: Option<CompletionAction>,
}

impl fmt::Debug for CompletionTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionTracker")
            .field("required", &self.required)
            .field("state", &self.state)
            .field("armed", &self.action.is_some())
            .finish()
    }
}

impl CompletionTracker {
    pub fn new(required: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            required: required.into_iter().collect(),
            state: TrackerState::Idle,
            action: None,
        }
    }

    pub fn required(&self) -> &BTreeSet<NodeId> {
        &self.required
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Required nodes that are not bound yet.
    pub fn missing(&self, registry: &EntityRegistry) -> Vec<NodeId> {
        self.required
            .iter()
            .copied()
            .filter(|&node| !registry.is_bound(node))
            .collect()
    }

    pub fn is_satisfied(&self, registry: &EntityRegistry) -> bool {
        self.required.iter().all(|&node| registry.is_bound(node))
    }

    /// Install the action. Only legal from `Idle`.
    pub fn arm(&mut self, action: CompletionAction) -> GraphResult<()> {
        if self.state != TrackerState::Idle {
            return Err(GraphError::InvalidTrackerState {
                operation: "arm",
                state: self.state,
            });
        }
        self.action = Some(action);
        self.state = TrackerState::Waiting;
        Ok(())
    }

    /// Install a fresh action after the previous one has run.
    pub fn rearm(&mut self, action: CompletionAction) -> GraphResult<()> {
        if !self.state.is_terminal() {
            return Err(GraphError::InvalidTrackerState {
                operation: "rearm",
                state: self.state,
            });
        }
        self.action = Some(action);
        self.state = TrackerState::Waiting;
        tracing::debug!("Completion tracker re-armed");
        Ok(())
    }

    /// Run the action if it is armed and the required set is bound.
    ///
    /// Returns `Ok(true)` when the action ran and succeeded, `Ok(false)` when
    /// nothing happened. An action error moves the tracker to `Failed` and is
    /// passed through.
    pub fn notify(&mut self, ctx: &mut BuildContext<'_>) -> GraphResult<bool> {
        if self.state != TrackerState::Waiting {
            return Ok(false);
        }
        if !self.is_satisfied(ctx.registry) {
            tracing::trace!(
                "Waiting for {} more entities",
                self.missing(ctx.registry).len()
            );
            return Ok(false);
        }

        let Some(action) = self.action.take() else {
            return Err(GraphError::InvalidTrackerState {
                operation: "notify",
                state: self.state,
            });
        };

        tracing::info!(
            "All {} required entities bound, running completion",
            self.required.len()
        );
        match action(ctx) {
            Ok(()) => {
                self.state = TrackerState::Complete;
                Ok(true)
            }
            Err(e) => {
                self.state = TrackerState::Failed;
                Err(e)
            }
        }
    }
}
