//! # Readiness configuration DTO
//!
//! ## Responsibilities / 职责
//!
//! - Define configuration data structures / 定义配置数据结构
//! - Provide TOML → DTO mapping / 提供 TOML → DTO 的映射
//!
//! Missing keys take the values in [`defaults`]. Values are not range
//! checked here; the engine clamps what it must.

pub mod defaults;

use std::path::PathBuf;

use crate::project::StageCatalog;

/// Stage domain settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageConfig {
    pub ready_stage: u32,
    pub max_stage: u32,
    pub labels: Vec<String>,
}

/// Timing knobs, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingConfig {
    pub cache_ttl_ms: u64,
    pub poll_interval_ms: u64,
    pub probe_timeout_ms: u64,
    pub transition_settle_ms: u64,
    pub push_debounce_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

/// Backend connection facts. Empty strings are valid: they mean "not set".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: String,
    pub access_token: String,
    pub prefer_combined_decision: bool,
}

/// Application configuration DTO
/// 应用配置 DTO
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessConfig {
    pub stages: StageConfig,
    pub timing: TimingConfig,
    pub retry: RetryConfig,
    pub backend: BackendConfig,
    /// Directory for session state such as the last selected project.
    pub state_dir: PathBuf,
}

fn table_u64(value: &toml::Value, section: &str, key: &str, default: u64) -> u64 {
    value
        .get(section)
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_integer())
        .map(|v| v.max(0) as u64)
        .unwrap_or(default)
}

fn table_str(value: &toml::Value, section: &str, key: &str) -> String {
    value
        .get(section)
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

impl ReadinessConfig {
    /// Create ReadinessConfig from TOML value
    /// 从 TOML 值创建 ReadinessConfig
    pub fn from_toml(toml_value: &toml::Value) -> anyhow::Result<Self> {
        let labels = match toml_value.get("stages").and_then(|s| s.get("labels")) {
            Some(toml::Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| anyhow::anyhow!("stages.labels must contain strings"))
                })
                .collect::<anyhow::Result<Vec<_>>>()?,
            Some(_) => anyhow::bail!("stages.labels must be an array"),
            None => default_labels(),
        };

        Ok(Self {
            stages: StageConfig {
                ready_stage: table_u64(
                    toml_value,
                    "stages",
                    "ready_stage",
                    u64::from(defaults::READY_STAGE),
                ) as u32,
                max_stage: table_u64(
                    toml_value,
                    "stages",
                    "max_stage",
                    u64::from(defaults::MAX_STAGE),
                ) as u32,
                labels,
            },
            timing: TimingConfig {
                cache_ttl_ms: table_u64(toml_value, "timing", "cache_ttl_ms", defaults::CACHE_TTL_MS),
                poll_interval_ms: table_u64(
                    toml_value,
                    "timing",
                    "poll_interval_ms",
                    defaults::POLL_INTERVAL_MS,
                ),
                probe_timeout_ms: table_u64(
                    toml_value,
                    "timing",
                    "probe_timeout_ms",
                    defaults::PROBE_TIMEOUT_MS,
                ),
                transition_settle_ms: table_u64(
                    toml_value,
                    "timing",
                    "transition_settle_ms",
                    defaults::TRANSITION_SETTLE_MS,
                ),
                push_debounce_ms: table_u64(
                    toml_value,
                    "timing",
                    "push_debounce_ms",
                    defaults::PUSH_DEBOUNCE_MS,
                ),
            },
            retry: RetryConfig {
                max_attempts: table_u64(
                    toml_value,
                    "retry",
                    "max_attempts",
                    u64::from(defaults::RETRY_MAX_ATTEMPTS),
                ) as u32,
                base_delay_ms: table_u64(
                    toml_value,
                    "retry",
                    "base_delay_ms",
                    defaults::RETRY_BASE_DELAY_MS,
                ),
                max_delay_ms: table_u64(
                    toml_value,
                    "retry",
                    "max_delay_ms",
                    defaults::RETRY_MAX_DELAY_MS,
                ),
            },
            backend: BackendConfig {
                base_url: table_str(toml_value, "backend", "base_url"),
                api_key: table_str(toml_value, "backend", "api_key"),
                access_token: table_str(toml_value, "backend", "access_token"),
                prefer_combined_decision: toml_value
                    .get("backend")
                    .and_then(|b| b.get("prefer_combined_decision"))
                    .and_then(|v| v.as_bool())
                    .unwrap_or(defaults::PREFER_COMBINED_DECISION),
            },
            state_dir: PathBuf::from(table_str(toml_value, "session", "state_dir")),
        })
    }

    /// Configuration with every default applied and no backend set.
    pub fn with_defaults(state_dir: PathBuf) -> Self {
        Self {
            stages: StageConfig {
                ready_stage: defaults::READY_STAGE,
                max_stage: defaults::MAX_STAGE,
                labels: default_labels(),
            },
            timing: TimingConfig {
                cache_ttl_ms: defaults::CACHE_TTL_MS,
                poll_interval_ms: defaults::POLL_INTERVAL_MS,
                probe_timeout_ms: defaults::PROBE_TIMEOUT_MS,
                transition_settle_ms: defaults::TRANSITION_SETTLE_MS,
                push_debounce_ms: defaults::PUSH_DEBOUNCE_MS,
            },
            retry: RetryConfig {
                max_attempts: defaults::RETRY_MAX_ATTEMPTS,
                base_delay_ms: defaults::RETRY_BASE_DELAY_MS,
                max_delay_ms: defaults::RETRY_MAX_DELAY_MS,
            },
            backend: BackendConfig {
                base_url: String::new(),
                api_key: String::new(),
                access_token: String::new(),
                prefer_combined_decision: defaults::PREFER_COMBINED_DECISION,
            },
            state_dir,
        }
    }

    pub fn stage_catalog(&self) -> StageCatalog {
        StageCatalog::new(
            self.stages.ready_stage,
            self.stages.max_stage,
            self.stages.labels.clone(),
        )
    }
}

fn default_labels() -> Vec<String> {
    defaults::STAGE_LABELS.iter().map(|s| s.to_string()).collect()
}
