use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use lf_core::ports::SelectionStorePort;
use lf_core::ProjectId;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

const FILE_NAME: &str = "selection.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoredSelection {
    project_id: ProjectId,
}

/// Last selected project, persisted as JSON in the state directory.
pub struct FileSelectionStore {
    path: PathBuf,
}

impl FileSelectionStore {
    /// Store the selection in `selection.json` under `state_dir`.
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write to a sibling temp file, then rename over the target.
    async fn atomic_write(&self, content: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create state dir failed: {}", dir.display()))?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .await
            .with_context(|| format!("write temp selection failed: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path).await.with_context(|| {
            format!(
                "rename temp selection failed: {} -> {}",
                tmp_path.display(),
                self.path.display()
            )
        })?;
        Ok(())
    }
}

#[async_trait]
impl SelectionStorePort for FileSelectionStore {
    async fn load_selection(&self) -> Result<Option<ProjectId>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("read selection failed: {}", self.path.display()))
            }
        };

        match serde_json::from_str::<StoredSelection>(&content) {
            Ok(stored) => Ok(Some(stored.project_id)),
            Err(err) => {
                // A damaged file only costs the remembered choice.
                warn!(path = %self.path.display(), error = %err, "ignoring unreadable selection file");
                Ok(None)
            }
        }
    }

    async fn save_selection(&self, project_id: &ProjectId) -> Result<()> {
        let content = serde_json::to_string_pretty(&StoredSelection {
            project_id: project_id.clone(),
        })
        .context("serialize selection failed")?;
        self.atomic_write(&content).await
    }
}
