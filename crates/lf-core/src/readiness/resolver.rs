//! State resolver.
//!
//! 纯函数：把最新已知的项目属性映射为唯一的界面状态。

use crate::display::DisplayState;
use crate::ports::{Identity, ProbeError};
use crate::project::{ProjectSnapshot, StageCatalog};

/// What the identity read told us about the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    /// A session existed but the backend rejected it.
    Expired,
    SignedIn(Identity),
    /// The identity read itself failed after retries.
    Unavailable(ProbeError),
}

impl AuthState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthState::SignedIn(identity) => Some(identity),
            _ => None,
        }
    }
}

/// Whether the page being shown requires a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouteKind {
    #[default]
    Protected,
    Public,
}

/// Everything the resolver looks at. `probe` is the final outcome of the
/// status probe for the selected project, after retries.
#[derive(Debug, Clone, Copy)]
pub struct ResolverInput<'a> {
    pub auth: &'a AuthState,
    pub route: RouteKind,
    pub has_projects: bool,
    pub probe: Option<&'a Result<ProjectSnapshot, ProbeError>>,
}

/// Pure decision function. Never fails: unrecoverable problems become
/// [`DisplayState::Error`].
#[derive(Debug, Clone)]
pub struct StateResolver {
    catalog: StageCatalog,
}

impl StateResolver {
    pub fn new(catalog: StageCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    /// Evaluate the rules in fixed priority order; the first match wins.
    pub fn resolve(&self, input: &ResolverInput<'_>) -> DisplayState {
        if let AuthState::Unavailable(err) = input.auth {
            return DisplayState::Error {
                message: err.to_string(),
            };
        }

        if input.auth.identity().is_none() {
            return match input.route {
                RouteKind::Protected => DisplayState::Login,
                // Public pages render their own content.
                RouteKind::Public => DisplayState::Dashboard,
            };
        }

        if !input.has_projects {
            return DisplayState::CreateProject;
        }

        let snapshot = match input.probe {
            Some(Ok(snapshot)) => snapshot,
            Some(Err(ProbeError::AuthExpired)) => return DisplayState::Login,
            Some(Err(err)) => {
                return DisplayState::Error {
                    message: err.to_string(),
                }
            }
            None => {
                return DisplayState::Error {
                    message: "no project selected".to_string(),
                }
            }
        };

        self.resolve_project(snapshot)
    }

    fn resolve_project(&self, snapshot: &ProjectSnapshot) -> DisplayState {
        let integration = snapshot.integration;
        if !integration.active {
            return if integration.ever_had {
                DisplayState::IntegrationDisabled
            } else {
                DisplayState::NeedIntegration
            };
        }

        let ready = self.catalog.ready_stage();
        let still_processing = snapshot.stage < ready
            // The stage may reach "done" before the first artifact is
            // visible; artifacts are authoritative at the ready stage.
            || (snapshot.stage == ready && !snapshot.output_exists);

        if still_processing {
            return DisplayState::SetupProcessing {
                stage: snapshot.stage,
                message: snapshot
                    .message
                    .clone()
                    .unwrap_or_else(|| self.catalog.message(snapshot.stage)),
                progress_percent: self.catalog.progress_percent(snapshot.stage),
            };
        }

        DisplayState::Dashboard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{IntegrationSummary, Stage};

    fn resolver() -> StateResolver {
        StateResolver::new(StageCatalog::new(
            6,
            10,
            (1..=7).map(|n| format!("step {n}")).collect(),
        ))
    }

    fn signed_in() -> AuthState {
        AuthState::SignedIn(Identity {
            user_id: "u-1".into(),
            email: "test@example.com".into(),
        })
    }

    fn snapshot(stage: u32, output: bool, active: bool, ever: bool) -> ProjectSnapshot {
        ProjectSnapshot::new(
            Stage::new(stage),
            output,
            IntegrationSummary {
                active,
                ever_had: ever,
            },
        )
    }

    fn resolve_with(auth: &AuthState, probe: Result<ProjectSnapshot, ProbeError>) -> DisplayState {
        resolver().resolve(&ResolverInput {
            auth,
            route: RouteKind::Protected,
            has_projects: true,
            probe: Some(&probe),
        })
    }

    #[test]
    fn signed_out_is_login_regardless_of_project_data() {
        let probe = Ok(snapshot(9, true, true, true));
        let state = resolver().resolve(&ResolverInput {
            auth: &AuthState::SignedOut,
            route: RouteKind::Protected,
            has_projects: true,
            probe: Some(&probe),
        });
        assert_eq!(state, DisplayState::Login);
    }

    #[test]
    fn expired_session_is_login() {
        let state = resolver().resolve(&ResolverInput {
            auth: &AuthState::Expired,
            route: RouteKind::Protected,
            has_projects: true,
            probe: None,
        });
        assert_eq!(state, DisplayState::Login);
    }

    #[test]
    fn unavailable_identity_is_error_not_login() {
        let state = resolver().resolve(&ResolverInput {
            auth: &AuthState::Unavailable(ProbeError::transient("connection refused")),
            route: RouteKind::Protected,
            has_projects: false,
            probe: None,
        });
        assert!(matches!(state, DisplayState::Error { .. }));
    }

    #[test]
    fn public_route_does_not_require_login() {
        let state = resolver().resolve(&ResolverInput {
            auth: &AuthState::SignedOut,
            route: RouteKind::Public,
            has_projects: false,
            probe: None,
        });
        assert_eq!(state, DisplayState::Dashboard);
    }

    #[test]
    fn no_projects_is_create_project() {
        let state = resolver().resolve(&ResolverInput {
            auth: &signed_in(),
            route: RouteKind::Protected,
            has_projects: false,
            probe: None,
        });
        assert_eq!(state, DisplayState::CreateProject);
    }

    #[test]
    fn early_stage_is_processing() {
        let state = resolve_with(&signed_in(), Ok(snapshot(2, false, true, true)));
        assert_eq!(
            state,
            DisplayState::SetupProcessing {
                stage: Stage::new(2),
                message: "step 3".into(),
                progress_percent: 28,
            }
        );
    }

    #[test]
    fn ready_stage_without_output_is_still_processing() {
        let state = resolve_with(&signed_in(), Ok(snapshot(6, false, true, true)));
        assert!(matches!(
            state,
            DisplayState::SetupProcessing { stage, .. } if stage == Stage::new(6)
        ));
    }

    #[test]
    fn ready_stage_with_output_is_dashboard() {
        let state = resolve_with(&signed_in(), Ok(snapshot(6, true, true, true)));
        assert_eq!(state, DisplayState::Dashboard);
    }

    #[test]
    fn past_ready_stage_is_dashboard() {
        let state = resolve_with(&signed_in(), Ok(snapshot(7, false, true, true)));
        assert_eq!(state, DisplayState::Dashboard);
    }

    #[test]
    fn disabled_integration_is_distinguished_from_never_integrated() {
        assert_eq!(
            resolve_with(&signed_in(), Ok(snapshot(9, true, false, true))),
            DisplayState::IntegrationDisabled
        );
        assert_eq!(
            resolve_with(&signed_in(), Ok(snapshot(0, false, false, false))),
            DisplayState::NeedIntegration
        );
    }

    #[test]
    fn server_message_overrides_catalog_label() {
        let probe = snapshot(3, false, true, true).with_message(Some("Almost there".into()));
        let state = resolve_with(&signed_in(), Ok(probe));
        assert!(matches!(
            state,
            DisplayState::SetupProcessing { ref message, .. } if message == "Almost there"
        ));
    }

    #[test]
    fn probe_failures_map_to_terminal_states() {
        assert_eq!(
            resolve_with(&signed_in(), Err(ProbeError::AuthExpired)),
            DisplayState::Login
        );
        assert!(matches!(
            resolve_with(&signed_in(), Err(ProbeError::transient("timed out"))),
            DisplayState::Error { .. }
        ));
        assert!(matches!(
            resolve_with(
                &signed_in(),
                Err(ProbeError::InvariantViolation("stage 42".into()))
            ),
            DisplayState::Error { ref message } if message.contains("stage 42")
        ));
    }

    #[test]
    fn resolving_twice_yields_identical_state() {
        let auth = signed_in();
        let inputs = [
            Ok(snapshot(0, false, true, false)),
            Ok(snapshot(6, false, true, true)),
            Ok(snapshot(6, true, true, true)),
            Ok(snapshot(4, true, false, true)),
            Err(ProbeError::transient("reset")),
        ];
        for probe in inputs {
            let first = resolve_with(&auth, probe.clone());
            let second = resolve_with(&auth, probe);
            assert_eq!(first, second);
        }
    }
}
