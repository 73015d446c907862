use async_trait::async_trait;
use lf_core::ports::{DisplayDecisionPort, RemoteDecision};
use lf_core::{ProbeError, ProjectId};
use serde_json::{json, Value};

use super::SupabaseBackend;

const FUNCTION: &str = "check_project_display_state";

#[async_trait]
impl DisplayDecisionPort for SupabaseBackend {
    async fn check_display_state(
        &self,
        user_email: &str,
        project_id: &ProjectId,
    ) -> Result<RemoteDecision, ProbeError> {
        // The function takes a bigint; non-numeric ids are passed through.
        let project: Value = project_id
            .as_str()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(project_id.as_str()));

        let request = self.rpc(FUNCTION).json(&json!({
            "p_user_email": user_email,
            "p_project_id": project,
        }));
        self.fetch(FUNCTION, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::client::tests::backend_for;
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn posts_email_and_numeric_project_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/rpc/check_project_display_state")
            .match_body(Matcher::Json(json!({
                "p_user_email": "owner@example.com",
                "p_project_id": 58,
            })))
            .with_status(200)
            .with_body(
                r#"{"display_component":"setup_processing","project_status":"3","has_messages":false,"processing_message":"Processing engagement metrics"}"#,
            )
            .create_async()
            .await;

        let decision = backend_for(&server, "token")
            .check_display_state("owner@example.com", &ProjectId::from("58"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(decision.display_component, "setup_processing");
        assert_eq!(decision.project_status, Some(json!("3")));
        assert_eq!(decision.has_messages, Some(false));
    }
}
