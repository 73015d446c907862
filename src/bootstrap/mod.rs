//! Application shell: configuration, logging and dependency wiring.
//! 应用外壳：配置、日志与依赖组装。

pub mod config;
pub mod demo;
pub mod tracing;
pub mod wiring;

pub use config::{apply_env_overrides, load_config, resolve_state_dir, ConfigError};
pub use wiring::{wire_demo, wire_http, DemoWiring, WiringError};
