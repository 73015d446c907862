use async_trait::async_trait;
use lf_core::ports::{Identity, IdentityPort};
use lf_core::ProbeError;
use serde::Deserialize;

use super::SupabaseBackend;

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[async_trait]
impl IdentityPort for SupabaseBackend {
    async fn current_identity(&self) -> Result<Option<Identity>, ProbeError> {
        if !self.has_session() {
            return Ok(None);
        }

        let user: AuthUser = self.fetch("current_identity", self.auth_user()).await?;
        let email = user
            .email
            .filter(|email| !email.is_empty())
            .ok_or_else(|| {
                ProbeError::InvariantViolation("authenticated user has no email".to_string())
            })?;

        Ok(Some(Identity {
            user_id: user.id,
            email,
        }))
    }
}
