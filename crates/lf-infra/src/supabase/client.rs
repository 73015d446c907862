use std::time::Duration;

use lf_core::config::BackendConfig;
use lf_core::ProbeError;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("backend base url is not configured")]
    MissingBaseUrl,

    #[error("backend api key is not configured")]
    MissingApiKey,

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP access to the hosted backend. Implements every read port.
pub struct SupabaseBackend {
    http: Client,
    base_url: String,
    api_key: String,
    access_token: String,
}

impl SupabaseBackend {
    /// `request_timeout` bounds each HTTP exchange; the probe applies its
    /// own per-attempt timeout on top.
    pub fn new(config: &BackendConfig, request_timeout: Duration) -> Result<Self, SupabaseError> {
        if config.base_url.trim().is_empty() {
            return Err(SupabaseError::MissingBaseUrl);
        }
        if config.api_key.trim().is_empty() {
            return Err(SupabaseError::MissingApiKey);
        }

        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
        })
    }

    /// Whether a user session token is configured at all.
    pub(crate) fn has_session(&self) -> bool {
        !self.access_token.is_empty()
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = if self.access_token.is_empty() {
            &self.api_key
        } else {
            &self.access_token
        };
        request
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    pub(crate) fn rest(&self, table: &str) -> RequestBuilder {
        self.authorize(self.http.get(format!("{}/rest/v1/{table}", self.base_url)))
    }

    pub(crate) fn rpc(&self, function: &str) -> RequestBuilder {
        self.authorize(
            self.http
                .post(format!("{}/rest/v1/rpc/{function}", self.base_url)),
        )
    }

    pub(crate) fn auth_user(&self) -> RequestBuilder {
        self.authorize(self.http.get(format!("{}/auth/v1/user", self.base_url)))
    }

    /// Send and decode a JSON body, mapping failures onto [`ProbeError`].
    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T, ProbeError> {
        let response = request.send().await.map_err(|err| {
            ProbeError::Transient(format!("{operation}: request failed: {err}"))
        })?;
        let response = check_status(operation, response).await?;
        response.json::<T>().await.map_err(|err| {
            ProbeError::InvariantViolation(format!("{operation}: unexpected response body: {err}"))
        })
    }
}

async fn check_status(operation: &str, response: Response) -> Result<Response, ProbeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!(operation, status = status.as_u16(), body = %body, "backend request rejected");
    Err(map_status(operation, status, &body))
}

fn map_status(operation: &str, status: StatusCode, body: &str) -> ProbeError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProbeError::AuthExpired,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            ProbeError::Transient(format!("{operation}: {status}"))
        }
        status if status.is_server_error() => ProbeError::Transient(format!("{operation}: {status}")),
        status => ProbeError::InvariantViolation(format!("{operation}: {status}: {body}")),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn backend_for(server: &mockito::ServerGuard, access_token: &str) -> SupabaseBackend {
        SupabaseBackend::new(
            &BackendConfig {
                base_url: server.url(),
                api_key: "anon-key".to_string(),
                access_token: access_token.to_string(),
                prefer_combined_decision: true,
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn status_codes_map_onto_probe_errors() {
        assert_eq!(
            map_status("op", StatusCode::UNAUTHORIZED, ""),
            ProbeError::AuthExpired
        );
        assert!(map_status("op", StatusCode::BAD_GATEWAY, "").is_retryable());
        assert!(map_status("op", StatusCode::TOO_MANY_REQUESTS, "").is_retryable());
        assert!(matches!(
            map_status("op", StatusCode::BAD_REQUEST, "column missing"),
            ProbeError::InvariantViolation(_)
        ));
    }

    #[test]
    fn missing_configuration_is_rejected() {
        let config = BackendConfig {
            base_url: String::new(),
            api_key: "key".into(),
            access_token: String::new(),
            prefer_combined_decision: true,
        };
        assert!(matches!(
            SupabaseBackend::new(&config, Duration::from_secs(1)),
            Err(SupabaseError::MissingBaseUrl)
        ));
    }
}
