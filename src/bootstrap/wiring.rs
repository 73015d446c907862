//! # Dependency Injection / 依赖注入模块
//!
//! ## Responsibilities / 职责
//!
//! - Create infra implementations for the engine's ports / 创建端口的 infra 实现
//! - Group them into [`ReadinessDeps`] / 将其组装为 `ReadinessDeps`
//!
//! This is the only place that depends on lf-infra and lf-app together.
//! It assembles; it never decides what the engine should show.
//! 仅用于"组装"，不用于"决策"。

use std::sync::Arc;
use std::time::Duration;

use lf_app::ReadinessDeps;
use lf_core::ports::DisplayDecisionPort;
use lf_core::ReadinessConfig;
use lf_infra::memory::{InMemoryBackend, InMemorySelectionStore};
use lf_infra::realtime::{DisabledRealtime, InMemoryRealtimeHub};
use lf_infra::selection::FileSelectionStore;
use lf_infra::supabase::{SupabaseBackend, SupabaseError};
use lf_infra::SystemClock;

/// Result type for wiring operations
pub type WiringResult<T> = Result<T, WiringError>;

/// Errors during dependency injection
/// 依赖注入错误
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("Backend initialization failed: {0}")]
    Backend(#[from] SupabaseError),
}

/// Wire the hosted backend over HTTP.
///
/// There is no websocket transport, so pushes never arrive and polling is
/// the only refresh path.
pub fn wire_http(config: &ReadinessConfig) -> WiringResult<ReadinessDeps> {
    let request_timeout = Duration::from_millis(config.timing.probe_timeout_ms);
    let backend = Arc::new(SupabaseBackend::new(&config.backend, request_timeout)?);
    let decision: Arc<dyn DisplayDecisionPort> = backend.clone();

    tracing::info!(
        state_dir = %config.state_dir.display(),
        combined_decision = config.backend.prefer_combined_decision,
        "wired hosted backend"
    );

    Ok(ReadinessDeps {
        identity: backend.clone(),
        directory: backend.clone(),
        selection: Arc::new(FileSelectionStore::new(&config.state_dir)),
        status: backend.clone(),
        output: backend.clone(),
        integrations: backend,
        decision: Some(decision),
        realtime: Arc::new(DisabledRealtime),
        clock: Arc::new(SystemClock),
    })
}

/// In-process backend plus the handles the demo script drives.
pub struct DemoWiring {
    pub deps: ReadinessDeps,
    pub backend: Arc<InMemoryBackend>,
}

/// Wire the in-memory backend with a live realtime hub.
pub fn wire_demo() -> DemoWiring {
    let hub = Arc::new(InMemoryRealtimeHub::new());
    let backend = Arc::new(InMemoryBackend::new().with_realtime(hub.clone()));

    let deps = ReadinessDeps {
        identity: backend.clone(),
        directory: backend.clone(),
        selection: Arc::new(InMemorySelectionStore::default()),
        status: backend.clone(),
        output: backend.clone(),
        integrations: backend.clone(),
        decision: None,
        realtime: hub,
        clock: Arc::new(SystemClock),
    };

    DemoWiring { deps, backend }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_http_wiring_requires_base_url() {
        let config = ReadinessConfig::with_defaults(PathBuf::from("/tmp/liftlio"));
        let result = wire_http(&config);
        assert!(matches!(
            result,
            Err(WiringError::Backend(SupabaseError::MissingBaseUrl))
        ));
    }

    #[test]
    fn test_http_wiring_with_backend_settings() {
        let mut config = ReadinessConfig::with_defaults(PathBuf::from("/tmp/liftlio"));
        config.backend.base_url = "https://demo.supabase.co".into();
        config.backend.api_key = "anon".into();

        let deps = wire_http(&config).unwrap();
        assert!(deps.decision.is_some());
    }

    #[tokio::test]
    async fn test_demo_wiring_shares_one_backend() {
        let wiring = wire_demo();
        wiring.backend.sign_in("demo@liftlio.com");

        let identity = wiring.deps.identity.current_identity().await.unwrap();
        assert_eq!(identity.map(|i| i.email), Some("demo@liftlio.com".to_string()));
    }
}
