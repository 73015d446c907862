//! The closed set of screens the renderer may show.
//! 渲染层可以展示的封闭界面集合。

use serde::{Deserialize, Serialize};

use crate::ids::ProjectId;
use crate::ports::ProbeError;
use crate::project::Stage;

/// Resolved UI mode. Exactly one variant is active at any time and only the
/// [`StateResolver`](crate::readiness::StateResolver) produces values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "display_component", rename_all = "snake_case")]
pub enum DisplayState {
    Login,
    CreateProject,
    NeedIntegration,
    SetupProcessing {
        stage: Stage,
        message: String,
        progress_percent: u8,
    },
    IntegrationDisabled,
    Dashboard,
    Error {
        message: String,
    },
}

impl DisplayState {
    /// Terminal states need no further polling: nothing the backend does on
    /// its own moves the project out of them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DisplayState::SetupProcessing { .. })
    }

    pub fn component(&self) -> DisplayComponent {
        match self {
            DisplayState::Login => DisplayComponent::Login,
            DisplayState::CreateProject => DisplayComponent::CreateProject,
            DisplayState::NeedIntegration => DisplayComponent::NeedIntegration,
            DisplayState::SetupProcessing { .. } => DisplayComponent::SetupProcessing,
            DisplayState::IntegrationDisabled => DisplayComponent::IntegrationDisabled,
            DisplayState::Dashboard => DisplayComponent::Dashboard,
            DisplayState::Error { .. } => DisplayComponent::Error,
        }
    }
}

/// Wire name of a screen as used by the combined decision RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayComponent {
    Login,
    CreateProject,
    NeedIntegration,
    IntegrationDisabled,
    SetupProcessing,
    Dashboard,
    Error,
}

impl DisplayComponent {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayComponent::Login => "login",
            DisplayComponent::CreateProject => "create_project",
            DisplayComponent::NeedIntegration => "need_integration",
            DisplayComponent::IntegrationDisabled => "integration_disabled",
            DisplayComponent::SetupProcessing => "setup_processing",
            DisplayComponent::Dashboard => "dashboard",
            DisplayComponent::Error => "error",
        }
    }
}

impl std::str::FromStr for DisplayComponent {
    type Err = ProbeError;

    /// Unknown backend shapes fail fast instead of falling through to a
    /// default screen.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "login" => Ok(DisplayComponent::Login),
            "create_project" => Ok(DisplayComponent::CreateProject),
            "need_integration" => Ok(DisplayComponent::NeedIntegration),
            "integration_disabled" => Ok(DisplayComponent::IntegrationDisabled),
            "setup_processing" => Ok(DisplayComponent::SetupProcessing),
            "dashboard" => Ok(DisplayComponent::Dashboard),
            "error" => Ok(DisplayComponent::Error),
            other => Err(ProbeError::InvariantViolation(format!(
                "unknown display component: {other}"
            ))),
        }
    }
}

/// The single observable value exposed to the renderer boundary.
///
/// `is_resolving` is true until the first authoritative value for the
/// current project is known; the renderer shows nothing while it is set and
/// `display` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadinessView {
    pub project: Option<ProjectId>,
    pub display: Option<DisplayState>,
    pub is_resolving: bool,
}

impl ReadinessView {
    pub fn resolving() -> Self {
        Self {
            project: None,
            display: None,
            is_resolving: true,
        }
    }
}
