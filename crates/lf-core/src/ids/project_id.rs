use serde::{Deserialize, Serialize};

use super::id_macro::impl_id;

/// Opaque, stable identifier of a monitored project.
///
/// The backend stores numeric keys, but the client never does arithmetic on
/// them, so they travel as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl_id!(ProjectId);

impl From<i64> for ProjectId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_string_ids_compare_equal() {
        assert_eq!(ProjectId::from(58), ProjectId::from("58"));
    }

    #[test]
    fn serializes_transparently() {
        let id = ProjectId::from("117");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"117\"");
    }
}
