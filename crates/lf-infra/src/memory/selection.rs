use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use lf_core::ports::SelectionStorePort;
use lf_core::ProjectId;

/// Remembered selection that lives as long as the process.
#[derive(Debug, Default)]
pub struct InMemorySelectionStore {
    selected: Mutex<Option<ProjectId>>,
}

impl InMemorySelectionStore {
    pub fn new(initial: Option<ProjectId>) -> Self {
        Self {
            selected: Mutex::new(initial),
        }
    }
}

#[async_trait]
impl SelectionStorePort for InMemorySelectionStore {
    async fn load_selection(&self) -> anyhow::Result<Option<ProjectId>> {
        let selected = self
            .selected
            .lock()
            .map_err(|_| anyhow!("selection lock poisoned"))?;
        Ok(selected.clone())
    }

    async fn save_selection(&self, project_id: &ProjectId) -> anyhow::Result<()> {
        let mut selected = self
            .selected
            .lock()
            .map_err(|_| anyhow!("selection lock poisoned"))?;
        *selected = Some(project_id.clone());
        Ok(())
    }
}
