//! # Readiness Dependencies / 就绪引擎依赖
//!
//! Parameter grouping for engine construction. Not a builder: no build
//! steps, no hidden defaults.

use std::sync::Arc;

use lf_core::ports::*;

/// Ports the readiness engine reads from.
/// 就绪引擎读取的端口。
pub struct ReadinessDeps {
    // Session / 会话
    pub identity: Arc<dyn IdentityPort>,
    pub directory: Arc<dyn ProjectDirectoryPort>,
    pub selection: Arc<dyn SelectionStorePort>,

    // Project status reads / 项目状态读取
    pub status: Arc<dyn ProjectStatusPort>,
    pub output: Arc<dyn OutputExistencePort>,
    pub integrations: Arc<dyn IntegrationPort>,
    /// Combined server-side decision, when the backend provides one.
    pub decision: Option<Arc<dyn DisplayDecisionPort>>,

    // Push notifications / 推送通知
    pub realtime: Arc<dyn RealtimePort>,

    // System / 系统
    pub clock: Arc<dyn ClockPort>,
}
