//! Readiness use cases: probing, caching, push, polling and the engine
//! that ties them together.
//! 就绪用例：探测、缓存、推送、轮询以及把它们串起来的引擎。

mod cache;
mod debounce;
mod engine;
mod polling;
mod probe;
mod push;
mod retry;

pub use cache::{CacheEntry, CacheGuard, CacheKey};
pub use debounce::Debouncer;
pub use engine::{EngineError, ReadinessEngine, ReadinessHandle};
pub use polling::PollingFallback;
pub use probe::{map_decision, StatusProbe};
pub use push::{PushEvent, PushNotice, RealtimePushListener};
pub use retry::RetryPolicy;
