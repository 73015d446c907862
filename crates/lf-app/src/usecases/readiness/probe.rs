//! Point-in-time read of a project's lifecycle attributes.
//! 项目生命周期属性的时间点读取。

use std::sync::Arc;
use std::time::Duration;

use lf_core::display::DisplayComponent;
use lf_core::ports::{
    DisplayDecisionPort, Identity, IntegrationPort, OutputExistencePort, ProbeError,
    ProjectStatusPort, RemoteDecision,
};
use lf_core::{IntegrationSummary, ProjectId, ProjectSnapshot, Stage, StageCatalog};
use tracing::{debug, info_span, Instrument};

use super::retry::RetryPolicy;

/// Reads stage, output existence and integration state for one project.
///
/// ## Behavior / 行为
/// - Uses the combined decision RPC when one is wired, otherwise issues the
///   three reads concurrently.
/// - Every attempt is bounded by `timeout`; an attempt that exceeds it is a
///   [`ProbeError::Transient`].
/// - Never writes to the backend.
pub struct StatusProbe {
    status: Arc<dyn ProjectStatusPort>,
    output: Arc<dyn OutputExistencePort>,
    integrations: Arc<dyn IntegrationPort>,
    decision: Option<Arc<dyn DisplayDecisionPort>>,
    catalog: StageCatalog,
    timeout: Duration,
    retry: RetryPolicy,
}

impl StatusProbe {
    pub fn new(
        status: Arc<dyn ProjectStatusPort>,
        output: Arc<dyn OutputExistencePort>,
        integrations: Arc<dyn IntegrationPort>,
        catalog: StageCatalog,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            status,
            output,
            integrations,
            decision: None,
            catalog,
            timeout,
            retry,
        }
    }

    /// Prefer the server-side combined decision over the multi-query path.
    pub fn with_decision(mut self, decision: Option<Arc<dyn DisplayDecisionPort>>) -> Self {
        self.decision = decision;
        self
    }

    pub fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    /// One attempt, bounded by the probe timeout.
    pub async fn probe(
        &self,
        identity: &Identity,
        project_id: &ProjectId,
    ) -> Result<ProjectSnapshot, ProbeError> {
        let span = info_span!(
            "usecase.readiness.probe",
            project_id = %project_id,
            combined = self.decision.is_some()
        );

        async {
            let snapshot = tokio::time::timeout(self.timeout, self.probe_once(identity, project_id))
                .await
                .map_err(|_| {
                    ProbeError::Transient(format!(
                        "no response within {} ms",
                        self.timeout.as_millis()
                    ))
                })??;

            debug!(
                stage = snapshot.stage.value(),
                output_exists = snapshot.output_exists,
                integration_active = snapshot.integration.active,
                ever_had_integration = snapshot.integration.ever_had,
                "probe completed"
            );
            Ok(snapshot)
        }
        .instrument(span)
        .await
    }

    /// [`probe`](Self::probe) under the bounded retry policy. Only transient
    /// failures are retried.
    pub async fn probe_with_retry(
        &self,
        identity: &Identity,
        project_id: &ProjectId,
    ) -> Result<ProjectSnapshot, ProbeError> {
        self.retry
            .run("status_probe", || self.probe(identity, project_id))
            .await
    }

    async fn probe_once(
        &self,
        identity: &Identity,
        project_id: &ProjectId,
    ) -> Result<ProjectSnapshot, ProbeError> {
        match &self.decision {
            Some(decision) => {
                let remote = decision
                    .check_display_state(&identity.email, project_id)
                    .await?;
                map_decision(&self.catalog, remote)
            }
            None => self.probe_multi(project_id).await,
        }
    }

    async fn probe_multi(&self, project_id: &ProjectId) -> Result<ProjectSnapshot, ProbeError> {
        let (status, output_exists, records) = futures::try_join!(
            self.status.get_project_status(project_id),
            self.output.has_any_output(project_id),
            self.integrations.list_integrations(project_id),
        )?;

        let stage = self.catalog.parse_json(&status.stage)?;
        Ok(ProjectSnapshot::new(
            stage,
            output_exists,
            IntegrationSummary::from_records(&records),
        ))
    }
}

/// Map the combined RPC answer into attributes.
///
/// The answer is turned into a snapshot, not a display state, so the
/// resolver stays the only producer of display states.
pub fn map_decision(
    catalog: &StageCatalog,
    decision: RemoteDecision,
) -> Result<ProjectSnapshot, ProbeError> {
    let component: DisplayComponent = decision.display_component.parse()?;
    let stage = |fallback: Stage| -> Result<Stage, ProbeError> {
        match &decision.project_status {
            Some(raw) if !raw.is_null() => catalog.parse_json(raw),
            _ => Ok(fallback),
        }
    };

    match component {
        DisplayComponent::Login => Err(ProbeError::AuthExpired),
        DisplayComponent::CreateProject => Err(ProbeError::InvariantViolation(
            "selected project is not listed for this user".to_string(),
        )),
        DisplayComponent::NeedIntegration => Ok(ProjectSnapshot::new(
            stage(Stage::new(0))?,
            decision.has_messages.unwrap_or(false),
            IntegrationSummary {
                active: false,
                ever_had: false,
            },
        )),
        DisplayComponent::IntegrationDisabled => Ok(ProjectSnapshot::new(
            stage(Stage::new(0))?,
            decision.has_messages.unwrap_or(false),
            IntegrationSummary {
                active: false,
                ever_had: true,
            },
        )),
        DisplayComponent::SetupProcessing => {
            let raw = decision.project_status.as_ref().ok_or_else(|| {
                ProbeError::InvariantViolation("setup_processing without project_status".into())
            })?;
            Ok(ProjectSnapshot::new(
                catalog.parse_json(raw)?,
                decision.has_messages.unwrap_or(false),
                IntegrationSummary {
                    active: true,
                    ever_had: true,
                },
            )
            .with_message(decision.processing_message.clone()))
        }
        DisplayComponent::Dashboard => Ok(ProjectSnapshot::new(
            stage(catalog.ready_stage())?,
            true,
            IntegrationSummary {
                active: true,
                ever_had: true,
            },
        )),
        DisplayComponent::Error => Err(ProbeError::Transient(
            decision
                .message
                .unwrap_or_else(|| "backend reported an error".to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lf_core::config::ReadinessConfig;
    use lf_core::ports::ProjectStatusRecord;
    use lf_core::IntegrationRecord;
    use mockall::mock;
    use serde_json::json;

    mock! {
        pub Status {}

        #[async_trait]
        impl ProjectStatusPort for Status {
            async fn get_project_status(
                &self,
                project_id: &ProjectId,
            ) -> Result<ProjectStatusRecord, ProbeError>;
        }
    }

    mock! {
        pub Output {}

        #[async_trait]
        impl OutputExistencePort for Output {
            async fn has_any_output(&self, project_id: &ProjectId) -> Result<bool, ProbeError>;
        }
    }

    mock! {
        pub Integrations {}

        #[async_trait]
        impl IntegrationPort for Integrations {
            async fn list_integrations(
                &self,
                project_id: &ProjectId,
            ) -> Result<Vec<IntegrationRecord>, ProbeError>;
        }
    }

    mock! {
        pub Decision {}

        #[async_trait]
        impl DisplayDecisionPort for Decision {
            async fn check_display_state(
                &self,
                user_email: &str,
                project_id: &ProjectId,
            ) -> Result<RemoteDecision, ProbeError>;
        }
    }

    fn catalog() -> StageCatalog {
        ReadinessConfig::with_defaults(Default::default()).stage_catalog()
    }

    fn identity() -> Identity {
        Identity {
            user_id: "u-1".into(),
            email: "owner@example.com".into(),
        }
    }

    fn decision(component: &str) -> RemoteDecision {
        RemoteDecision {
            display_component: component.to_string(),
            project_status: None,
            progress_percentage: None,
            has_messages: None,
            processing_message: None,
            message: None,
        }
    }

    fn probe_with(
        status: MockStatus,
        output: MockOutput,
        integrations: MockIntegrations,
    ) -> StatusProbe {
        StatusProbe::new(
            Arc::new(status),
            Arc::new(output),
            Arc::new(integrations),
            catalog(),
            Duration::from_secs(10),
            RetryPolicy::new(3, Duration::from_millis(500), Duration::from_secs(4)),
        )
    }

    #[tokio::test]
    async fn multi_query_combines_the_three_reads() {
        let mut status = MockStatus::new();
        status
            .expect_get_project_status()
            .times(1)
            .returning(|_| Ok(ProjectStatusRecord { stage: json!("6") }));
        let mut output = MockOutput::new();
        output.expect_has_any_output().times(1).returning(|_| Ok(false));
        let mut integrations = MockIntegrations::new();
        integrations
            .expect_list_integrations()
            .times(1)
            .returning(|_| Ok(vec![IntegrationRecord { active: true }]));

        let snapshot = probe_with(status, output, integrations)
            .probe(&identity(), &ProjectId::from("58"))
            .await
            .unwrap();

        assert_eq!(snapshot.stage, Stage::new(6));
        assert!(!snapshot.output_exists);
        assert!(snapshot.integration.active);
        assert!(snapshot.integration.ever_had);
    }

    #[tokio::test]
    async fn out_of_domain_stage_is_an_invariant_violation() {
        let mut status = MockStatus::new();
        status
            .expect_get_project_status()
            .returning(|_| Ok(ProjectStatusRecord { stage: json!(99) }));
        let mut output = MockOutput::new();
        output.expect_has_any_output().returning(|_| Ok(true));
        let mut integrations = MockIntegrations::new();
        integrations.expect_list_integrations().returning(|_| Ok(vec![]));

        let err = probe_with(status, output, integrations)
            .probe(&identity(), &ProjectId::from("58"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::InvariantViolation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_reads_time_out_as_transient() {
        struct Hanging;

        #[async_trait]
        impl ProjectStatusPort for Hanging {
            async fn get_project_status(
                &self,
                _project_id: &ProjectId,
            ) -> Result<ProjectStatusRecord, ProbeError> {
                std::future::pending().await
            }
        }

        let mut output = MockOutput::new();
        output.expect_has_any_output().returning(|_| Ok(true));
        let mut integrations = MockIntegrations::new();
        integrations.expect_list_integrations().returning(|_| Ok(vec![]));

        let probe = StatusProbe::new(
            Arc::new(Hanging),
            Arc::new(output),
            Arc::new(integrations),
            catalog(),
            Duration::from_secs(10),
            RetryPolicy::new(1, Duration::ZERO, Duration::ZERO),
        );

        let err = probe
            .probe(&identity(), &ProjectId::from("58"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Transient(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_then_succeed() {
        let mut status = MockStatus::new();
        let mut seq = mockall::Sequence::new();
        status
            .expect_get_project_status()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(ProbeError::transient("503")));
        status
            .expect_get_project_status()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ProjectStatusRecord { stage: json!(7) }));
        let mut output = MockOutput::new();
        output.expect_has_any_output().returning(|_| Ok(true));
        let mut integrations = MockIntegrations::new();
        integrations
            .expect_list_integrations()
            .returning(|_| Ok(vec![IntegrationRecord { active: true }]));

        let snapshot = probe_with(status, output, integrations)
            .probe_with_retry(&identity(), &ProjectId::from("58"))
            .await
            .unwrap();

        assert_eq!(snapshot.stage, Stage::new(7));
    }

    #[tokio::test]
    async fn combined_decision_is_preferred_when_wired() {
        let mut decision_port = MockDecision::new();
        decision_port
            .expect_check_display_state()
            .withf(|email, id| email == "owner@example.com" && id.as_str() == "58")
            .times(1)
            .returning(|_, _| {
                Ok(RemoteDecision {
                    project_status: Some(json!(3)),
                    has_messages: Some(false),
                    processing_message: Some("Crunching".into()),
                    ..decision("setup_processing")
                })
            });

        let probe = probe_with(MockStatus::new(), MockOutput::new(), MockIntegrations::new())
            .with_decision(Some(Arc::new(decision_port)));

        let snapshot = probe
            .probe(&identity(), &ProjectId::from("58"))
            .await
            .unwrap();

        assert_eq!(snapshot.stage, Stage::new(3));
        assert!(!snapshot.output_exists);
        assert_eq!(snapshot.message.as_deref(), Some("Crunching"));
    }

    #[test]
    fn decision_mapping_covers_every_component() {
        let catalog = catalog();

        assert_eq!(
            map_decision(&catalog, decision("login")),
            Err(ProbeError::AuthExpired)
        );
        assert!(matches!(
            map_decision(&catalog, decision("create_project")),
            Err(ProbeError::InvariantViolation(_))
        ));
        assert!(matches!(
            map_decision(&catalog, decision("error")),
            Err(ProbeError::Transient(_))
        ));
        assert!(matches!(
            map_decision(&catalog, decision("teapot")),
            Err(ProbeError::InvariantViolation(_))
        ));

        let need = map_decision(&catalog, decision("need_integration")).unwrap();
        assert_eq!(need.integration, IntegrationSummary::default());

        let disabled = map_decision(&catalog, decision("integration_disabled")).unwrap();
        assert!(!disabled.integration.active);
        assert!(disabled.integration.ever_had);

        let dashboard = map_decision(&catalog, decision("dashboard")).unwrap();
        assert_eq!(dashboard.stage, catalog.ready_stage());
        assert!(dashboard.output_exists);
    }

    #[test]
    fn setup_processing_requires_a_stage() {
        assert!(matches!(
            map_decision(&catalog(), decision("setup_processing")),
            Err(ProbeError::InvariantViolation(_))
        ));
    }
}
