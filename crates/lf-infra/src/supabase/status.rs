use async_trait::async_trait;
use lf_core::ports::{ProjectStatusPort, ProjectStatusRecord};
use lf_core::{ProbeError, ProjectId};
use serde::Deserialize;
use serde_json::Value;

use super::SupabaseBackend;

#[derive(Debug, Deserialize)]
struct StatusRow {
    #[serde(default)]
    status: Value,
}

#[async_trait]
impl ProjectStatusPort for SupabaseBackend {
    async fn get_project_status(
        &self,
        project_id: &ProjectId,
    ) -> Result<ProjectStatusRecord, ProbeError> {
        let request = self.rest("Projeto").query(&[
            ("select", "status".to_string()),
            ("id", format!("eq.{project_id}")),
        ]);
        let rows: Vec<StatusRow> = self.fetch("get_project_status", request).await?;

        rows.into_iter()
            .next()
            .map(|row| ProjectStatusRecord { stage: row.status })
            .ok_or_else(|| ProbeError::InvariantViolation(format!("project {project_id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::super::client::tests::backend_for;
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn reads_raw_status_column() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/Projeto")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.58".into()))
            .with_status(200)
            .with_body(r#"[{"status":"6"}]"#)
            .create_async()
            .await;

        let record = backend_for(&server, "token")
            .get_project_status(&ProjectId::from("58"))
            .await
            .unwrap();
        assert_eq!(record.stage, json!("6"));
    }

    #[tokio::test]
    async fn missing_row_is_an_invariant_violation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/Projeto")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let err = backend_for(&server, "token")
            .get_project_status(&ProjectId::from("58"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn server_errors_are_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/Projeto")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let err = backend_for(&server, "token")
            .get_project_status(&ProjectId::from("58"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
