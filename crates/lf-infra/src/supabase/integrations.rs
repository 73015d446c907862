use async_trait::async_trait;
use lf_core::ports::IntegrationPort;
use lf_core::{IntegrationRecord, ProbeError, ProjectId};
use serde::Deserialize;

use super::SupabaseBackend;

#[derive(Debug, Deserialize)]
struct IntegrationRow {
    #[serde(default)]
    ativo: Option<bool>,
}

#[async_trait]
impl IntegrationPort for SupabaseBackend {
    async fn list_integrations(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<IntegrationRecord>, ProbeError> {
        let request = self.rest("Integrações").query(&[
            ("select", "ativo".to_string()),
            ("PROJETO id", format!("eq.{project_id}")),
        ]);
        let rows: Vec<IntegrationRow> = self.fetch("list_integrations", request).await?;

        Ok(rows
            .into_iter()
            .map(|row| IntegrationRecord {
                active: row.ativo.unwrap_or(false),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::client::tests::backend_for;
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn null_flag_counts_as_inactive() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/rest/v1/Integra".to_string()))
            .match_query(Matcher::UrlEncoded("PROJETO id".into(), "eq.58".into()))
            .with_status(200)
            .with_body(r#"[{"ativo":true},{"ativo":null}]"#)
            .create_async()
            .await;

        let records = backend_for(&server, "token")
            .list_integrations(&ProjectId::from("58"))
            .await
            .unwrap();

        assert_eq!(
            records,
            vec![
                IntegrationRecord { active: true },
                IntegrationRecord { active: false },
            ]
        );
    }
}
