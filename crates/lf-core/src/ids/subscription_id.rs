use serde::{Deserialize, Serialize};

use super::id_macro::impl_id;

/// Handle identifier returned by a realtime subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(String);

impl_id!(SubscriptionId);
