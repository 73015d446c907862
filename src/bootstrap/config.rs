//! # Configuration Loader / 配置加载器
//!
//! ## Responsibilities / 职责
//!
//! - Read TOML configuration files / 读取 TOML 配置文件
//! - Apply environment overrides for backend secrets / 应用后端密钥的环境变量覆盖
//! - Pick a state directory when none is configured / 未配置时选择状态目录
//!
//! Range checks belong to the engine, not here.

use std::path::{Path, PathBuf};

use anyhow::Context;
use lf_core::ReadinessConfig;

pub const ENV_API_KEY: &str = "LIFTLIO_API_KEY";
pub const ENV_ACCESS_TOKEN: &str = "LIFTLIO_ACCESS_TOKEN";
pub const ENV_BASE_URL: &str = "LIFTLIO_BASE_URL";

const APP_DIR_NAME: &str = "liftlio";

/// Bootstrap configuration errors
/// 启动配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no platform data directory is available; set [session] state_dir")]
    NoDataDir,

    #[error("environment variable {0} is set but empty")]
    EmptyOverride(&'static str),
}

/// Load configuration from a TOML file
/// 从 TOML 文件加载配置
///
/// Missing sections and keys fall back to the built-in defaults.
///
/// # Errors / 错误
///
/// - File cannot be read / 无法读取文件
/// - Content is not valid TOML / 内容不是有效的 TOML
/// - `stages.labels` is not an array of strings / 标签不是字符串数组
pub fn load_config(config_path: impl AsRef<Path>) -> anyhow::Result<ReadinessConfig> {
    let config_path = config_path.as_ref();
    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let toml_value: toml::Value =
        toml::from_str(&content).context("Failed to parse config as TOML")?;
    ReadinessConfig::from_toml(&toml_value)
        .with_context(|| format!("Invalid config file: {}", config_path.display()))
}

/// Apply `LIFTLIO_*` overrides from the process environment.
pub fn apply_env_overrides(config: &mut ReadinessConfig) -> Result<(), ConfigError> {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides from `lookup`. An override that is present but blank is
/// rejected rather than silently clearing the file value.
pub fn apply_overrides<F>(config: &mut ReadinessConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let targets: [(&'static str, &mut String); 3] = [
        (ENV_API_KEY, &mut config.backend.api_key),
        (ENV_ACCESS_TOKEN, &mut config.backend.access_token),
        (ENV_BASE_URL, &mut config.backend.base_url),
    ];

    for (key, target) in targets {
        if let Some(value) = lookup(key) {
            let value = value.trim();
            if value.is_empty() {
                return Err(ConfigError::EmptyOverride(key));
            }
            *target = value.to_string();
        }
    }
    Ok(())
}

/// Platform data directory for this application, e.g.
/// `~/.local/share/liftlio` on Linux.
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or(ConfigError::NoDataDir)
}

/// Fill in `state_dir` when the config leaves it empty.
pub fn resolve_state_dir(config: &mut ReadinessConfig) -> Result<(), ConfigError> {
    if config.state_dir.as_os_str().is_empty() {
        config.state_dir = app_data_dir()?.join("state");
    }
    Ok(())
}
