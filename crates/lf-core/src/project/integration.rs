use serde::{Deserialize, Serialize};

/// One configured data-source connection for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationRecord {
    pub active: bool,
}

/// What the client needs to know about a project's integrations.
///
/// "Ever had one" is tracked separately from "has an active one now": a
/// project whose integration was disabled has already been onboarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntegrationSummary {
    pub active: bool,
    pub ever_had: bool,
}

impl IntegrationSummary {
    pub fn from_records(records: &[IntegrationRecord]) -> Self {
        Self {
            active: records.iter().any(|r| r.active),
            ever_had: !records.is_empty(),
        }
    }

    /// Fold in history from earlier reads. Once a project has had an
    /// integration it stays onboarded, even after its rows are deleted.
    pub fn remembering(self, seen_before: bool) -> Self {
        Self {
            ever_had: self.ever_had || seen_before,
            ..self
        }
    }
}
