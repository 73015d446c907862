//! Transition guard.
//!
//! Explicit state machine for the project-switch suppression window. `begin`,
//! `end` and `clear` are its only mutators.
//!
//! 项目切换抑制窗口的显式状态机。

use crate::ids::ProjectId;

/// Why a probe was started. Only the probe started by `begin` may publish
/// while a transition window is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOrigin {
    Transition,
    Push,
    Poll,
}

/// Identifies the project selection a probe was started for. A result whose
/// ticket is no longer current is discarded on arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTicket {
    pub project_id: ProjectId,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginOutcome {
    Started(TransitionTicket),
    /// Switching to the project already selected is a no-op.
    AlreadyCurrent,
}

#[derive(Debug, Default)]
pub struct TransitionGuard {
    current: Option<ProjectId>,
    transitioning: Option<ProjectId>,
    generation: u64,
}

impl TransitionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, project_id: &ProjectId) -> BeginOutcome {
        if self.current.as_ref() == Some(project_id) {
            return BeginOutcome::AlreadyCurrent;
        }

        self.generation += 1;
        self.current = Some(project_id.clone());
        self.transitioning = Some(project_id.clone());

        #[cfg(feature = "tracing")]
        tracing::debug!(project_id = %project_id, generation = self.generation, "transition begin");

        BeginOutcome::Started(TransitionTicket {
            project_id: project_id.clone(),
            generation: self.generation,
        })
    }

    /// Close the window opened for `project_id`. Returns false when the
    /// window belongs to another project or is already closed.
    pub fn end(&mut self, project_id: &ProjectId) -> bool {
        if self.transitioning.as_ref() != Some(project_id) {
            return false;
        }
        self.transitioning = None;

        #[cfg(feature = "tracing")]
        tracing::debug!(project_id = %project_id, generation = self.generation, "transition end");

        true
    }

    /// Forget the selection entirely. Every outstanding ticket becomes stale.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.current = None;
        self.transitioning = None;
    }

    pub fn is_active(&self) -> bool {
        self.transitioning.is_some()
    }

    pub fn current(&self) -> Option<&ProjectId> {
        self.current.as_ref()
    }

    /// Ticket for probes started outside `begin` (push, poll).
    pub fn ticket(&self) -> Option<TransitionTicket> {
        self.current.as_ref().map(|project_id| TransitionTicket {
            project_id: project_id.clone(),
            generation: self.generation,
        })
    }

    pub fn is_current(&self, ticket: &TransitionTicket) -> bool {
        ticket.generation == self.generation && self.current.as_ref() == Some(&ticket.project_id)
    }

    /// Whether a probe result may be published right now.
    pub fn admits(&self, ticket: &TransitionTicket, origin: ProbeOrigin) -> bool {
        self.is_current(ticket) && (origin == ProbeOrigin::Transition || !self.is_active())
    }

    /// Whether an unsolicited refresh (push or poll tick) for `project_id`
    /// may start a probe right now.
    pub fn accepts_refresh(&self, project_id: &ProjectId) -> bool {
        !self.is_active() && self.current.as_ref() == Some(project_id)
    }
}
