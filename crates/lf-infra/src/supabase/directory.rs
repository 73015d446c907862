use async_trait::async_trait;
use lf_core::ports::{Identity, ProjectDirectoryPort, ProjectSummary};
use lf_core::{ProbeError, ProjectId};
use serde::Deserialize;
use serde_json::Value;

use super::SupabaseBackend;

#[derive(Debug, Deserialize)]
struct ProjectRow {
    id: Value,
    #[serde(rename = "Project name", default)]
    name: Option<String>,
}

/// Project ids are numeric in the table but opaque to the engine.
pub(super) fn project_id_from(raw: &Value) -> Result<ProjectId, ProbeError> {
    match raw {
        Value::Number(n) => Ok(ProjectId::from_string(n.to_string())),
        Value::String(s) if !s.is_empty() => Ok(ProjectId::from(s.as_str())),
        other => Err(ProbeError::InvariantViolation(format!(
            "unrecognized project id: {other}"
        ))),
    }
}

#[async_trait]
impl ProjectDirectoryPort for SupabaseBackend {
    async fn list_projects(&self, owner: &Identity) -> Result<Vec<ProjectSummary>, ProbeError> {
        let request = self.rest("Projeto").query(&[
            ("select", "id,\"Project name\"".to_string()),
            ("user", format!("eq.{}", owner.email)),
            ("order", "id.asc".to_string()),
        ]);
        let rows: Vec<ProjectRow> = self.fetch("list_projects", request).await?;

        rows.into_iter()
            .map(|row| {
                Ok(ProjectSummary {
                    id: project_id_from(&row.id)?,
                    name: row.name.unwrap_or_else(|| "Unnamed Project".to_string()),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::client::tests::backend_for;
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn lists_projects_owned_by_user() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/Projeto")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("user".into(), "eq.owner@example.com".into()),
                Matcher::UrlEncoded("select".into(), "id,\"Project name\"".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"id":58,"Project name":"Liftlio"},{"id":"117","Project name":null}]"#)
            .create_async()
            .await;

        let owner = Identity {
            user_id: "u-1".into(),
            email: "owner@example.com".into(),
        };
        let projects = backend_for(&server, "token")
            .list_projects(&owner)
            .await
            .unwrap();

        assert_eq!(
            projects,
            vec![
                ProjectSummary {
                    id: ProjectId::from("58"),
                    name: "Liftlio".into(),
                },
                ProjectSummary {
                    id: ProjectId::from("117"),
                    name: "Unnamed Project".into(),
                },
            ]
        );
    }

    #[test]
    fn project_ids_must_be_numbers_or_strings() {
        assert!(project_id_from(&Value::Bool(true)).is_err());
        assert_eq!(
            project_id_from(&serde_json::json!(7)).unwrap(),
            ProjectId::from("7")
        );
    }
}
