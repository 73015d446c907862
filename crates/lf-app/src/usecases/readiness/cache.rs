//! Per-project memoized probe results with a TTL and in-flight dedup.
//! 带 TTL 和并发去重的按项目探测结果缓存。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use lf_core::ports::{ClockPort, ProbeError};
use lf_core::{IntegrationSummary, ProjectId, ProjectSnapshot, Stage};
use tokio::sync::Mutex;
use tracing::debug;

type ProbeResult = Result<ProjectSnapshot, ProbeError>;
type SharedProbe = Shared<BoxFuture<'static, ProbeResult>>;

/// Cache lookup key. `stage` is the last stage known for the project, or
/// `None` when nothing is known yet. It only narrows which stored entry
/// counts as fresh; in-flight probes are shared per project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub project_id: ProjectId,
    pub stage: Option<Stage>,
}

impl CacheKey {
    pub fn new(project_id: ProjectId, stage: Option<Stage>) -> Self {
        Self { project_id, stage }
    }
}

/// Immutable once stored; a changed attribute produces a new entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub project_id: ProjectId,
    pub stage: Stage,
    pub output_exists: bool,
    pub integration: IntegrationSummary,
    pub message: Option<String>,
    pub computed_at_ms: i64,
}

impl CacheEntry {
    pub fn from_snapshot(project_id: ProjectId, snapshot: &ProjectSnapshot, now_ms: i64) -> Self {
        Self {
            project_id,
            stage: snapshot.stage,
            output_exists: snapshot.output_exists,
            integration: snapshot.integration,
            message: snapshot.message.clone(),
            computed_at_ms: now_ms,
        }
    }

    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot::new(self.stage, self.output_exists, self.integration)
            .with_message(self.message.clone())
    }

    fn is_fresh(&self, now_ms: i64, ttl: Duration) -> bool {
        let age = now_ms.saturating_sub(self.computed_at_ms);
        age >= 0 && (age as u128) < ttl.as_millis()
    }
}

/// Memoized probe results keyed by `(project, stage)`.
///
/// - At most one probe is outstanding per project, whatever stage hint the
///   callers pass; concurrent callers await the same result.
/// - TTL expiry is checked on read, never swept.
/// - `invalidate` wins over a probe that is still running: its result is
///   handed to the callers already waiting but not stored.
pub struct CacheGuard {
    ttl: Duration,
    clock: Arc<dyn ClockPort>,
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<ProjectId, CacheEntry>,
    in_flight: HashMap<ProjectId, InFlight>,
    epochs: HashMap<ProjectId, u64>,
    next_flight: u64,
}

struct InFlight {
    id: u64,
    future: SharedProbe,
}

impl CacheGuard {
    /// Create a cache whose entries live for `ttl`.
    /// 创建条目有效期为 `ttl` 的缓存。
    pub fn new(ttl: Duration, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            ttl,
            clock,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Fresh entry for the project, if its stage matches `stage` (any stage
    /// when `None`).
    /// 获取未过期且阶段匹配的条目。
    pub async fn get(&self, project_id: &ProjectId, stage: Option<Stage>) -> Option<CacheEntry> {
        let now = self.clock.now_ms();
        let inner = self.inner.lock().await;
        inner.fresh(project_id, stage, now, self.ttl).cloned()
    }

    /// Store an entry, replacing whatever the project had.
    /// 存入条目，替换该项目已有的条目。
    pub async fn put(&self, entry: CacheEntry) {
        let mut inner = self.inner.lock().await;
        inner.entries.insert(entry.project_id.clone(), entry);
    }

    /// Drop the project's entry and detach its in-flight probes.
    /// 删除项目条目并分离其进行中的探测。
    pub async fn invalidate(&self, project_id: &ProjectId) {
        let mut inner = self.inner.lock().await;
        inner.entries.remove(project_id);
        inner.in_flight.remove(project_id);
        *inner.epochs.entry(project_id.clone()).or_insert(0) += 1;
        debug!(project_id = %project_id, "cache invalidated");
    }

    /// Last stage seen for the project, regardless of TTL.
    pub async fn known_stage(&self, project_id: &ProjectId) -> Option<Stage> {
        let inner = self.inner.lock().await;
        inner.entries.get(project_id).map(|entry| entry.stage)
    }

    /// Return a fresh entry for `key`, joining or starting a probe otherwise.
    ///
    /// With `bypass_ttl` the stored entry is ignored, but an outstanding
    /// probe for the same project is still joined.
    pub async fn get_or_probe<F>(&self, key: CacheKey, bypass_ttl: bool, probe: F) -> ProbeResult
    where
        F: FnOnce() -> BoxFuture<'static, ProbeResult>,
    {
        let shared = {
            let now = self.clock.now_ms();
            let mut inner = self.inner.lock().await;

            if !bypass_ttl {
                if let Some(entry) = inner.fresh(&key.project_id, key.stage, now, self.ttl) {
                    debug!(project_id = %key.project_id, "cache hit");
                    return Ok(entry.snapshot());
                }
            }

            match inner.in_flight.get(&key.project_id) {
                Some(flight) => {
                    debug!(project_id = %key.project_id, "joining in-flight probe");
                    flight.future.clone()
                }
                None => {
                    let flight_id = inner.next_flight;
                    inner.next_flight += 1;
                    let epoch = inner.epoch(&key.project_id);

                    let future = self.settle(key.clone(), flight_id, epoch, probe());
                    inner.in_flight.insert(
                        key.project_id,
                        InFlight {
                            id: flight_id,
                            future: future.clone(),
                        },
                    );
                    future
                }
            }
        };

        shared.await
    }

    /// Wrap a probe so that whoever drives it to completion also retires the
    /// in-flight slot and stores the result.
    fn settle(
        &self,
        key: CacheKey,
        flight_id: u64,
        epoch: u64,
        probe: BoxFuture<'static, ProbeResult>,
    ) -> SharedProbe {
        let inner = self.inner.clone();
        let clock = self.clock.clone();

        async move {
            let result = probe.await;

            let mut inner = inner.lock().await;
            if inner
                .in_flight
                .get(&key.project_id)
                .is_some_and(|flight| flight.id == flight_id)
            {
                inner.in_flight.remove(&key.project_id);
            }
            if let Ok(snapshot) = &result {
                if inner.epoch(&key.project_id) == epoch {
                    let entry =
                        CacheEntry::from_snapshot(key.project_id.clone(), snapshot, clock.now_ms());
                    inner.entries.insert(key.project_id.clone(), entry);
                } else {
                    debug!(project_id = %key.project_id, "probe result outlived invalidation, not stored");
                }
            }
            result
        }
        .boxed()
        .shared()
    }
}

impl Inner {
    fn fresh(
        &self,
        project_id: &ProjectId,
        stage: Option<Stage>,
        now_ms: i64,
        ttl: Duration,
    ) -> Option<&CacheEntry> {
        self.entries.get(project_id).filter(|entry| {
            entry.is_fresh(now_ms, ttl) && stage.map_or(true, |stage| stage == entry.stage)
        })
    }

    fn epoch(&self, project_id: &ProjectId) -> u64 {
        self.epochs.get(project_id).copied().unwrap_or(0)
    }
}
