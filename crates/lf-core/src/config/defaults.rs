//! Default values for [`ReadinessConfig`](super::ReadinessConfig).

pub const READY_STAGE: u32 = 6;
pub const MAX_STAGE: u32 = 10;

pub const STAGE_LABELS: [&str; 7] = [
    "Starting project setup",
    "Connecting to YouTube API",
    "Analyzing channel and videos",
    "Processing engagement metrics",
    "Analyzing comments with AI",
    "Generating insights and reports",
    "Finalizing initial processing",
];

pub const CACHE_TTL_MS: u64 = 30_000;
pub const POLL_INTERVAL_MS: u64 = 5_000;
pub const PROBE_TIMEOUT_MS: u64 = 10_000;
pub const TRANSITION_SETTLE_MS: u64 = 500;
pub const PUSH_DEBOUNCE_MS: u64 = 250;

pub const RETRY_MAX_ATTEMPTS: u32 = 3;
pub const RETRY_BASE_DELAY_MS: u64 = 500;
pub const RETRY_MAX_DELAY_MS: u64 = 4_000;

pub const PREFER_COMBINED_DECISION: bool = true;
