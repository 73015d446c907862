//! Pipeline stages and the catalog that gives them meaning.
//! 流水线阶段以及解释阶段含义的目录。

use serde::{Deserialize, Serialize};

use crate::ports::ProbeError;

/// Integer marker of backend pipeline progress for a project.
/// 项目后端流水线进度标记。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stage(u32);

impl Stage {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the processing screen's step list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStep {
    pub number: u32,
    pub label: String,
    pub active: bool,
    pub completed: bool,
}

/// Stage domain: which stage means "ingested", the highest stage the backend
/// may report, and the human readable label of each processing step.
///
/// 阶段域：哪个阶段表示"摄取完成"、后端可能上报的最大阶段以及每个步骤的标签。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCatalog {
    ready_stage: Stage,
    max_stage: Stage,
    labels: Vec<String>,
}

const FALLBACK_MESSAGE: &str = "Processing...";

impl StageCatalog {
    pub fn new(ready_stage: u32, max_stage: u32, labels: Vec<String>) -> Self {
        Self {
            ready_stage: Stage(ready_stage),
            max_stage: Stage(max_stage.max(ready_stage)),
            labels,
        }
    }

    pub fn ready_stage(&self) -> Stage {
        self.ready_stage
    }

    pub fn max_stage(&self) -> Stage {
        self.max_stage
    }

    /// Number of steps shown while processing. Never zero.
    pub fn total_stages(&self) -> u32 {
        if self.labels.is_empty() {
            self.ready_stage.0.max(1)
        } else {
            self.labels.len() as u32
        }
    }

    pub fn message(&self, stage: Stage) -> String {
        self.labels
            .get(stage.0 as usize)
            .cloned()
            .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
    }

    /// `stage / total_stages * 100`, clamped to 100.
    pub fn progress_percent(&self, stage: Stage) -> u8 {
        let percent = u64::from(stage.0) * 100 / u64::from(self.total_stages());
        percent.min(100) as u8
    }

    pub fn steps(&self, stage: Stage) -> Vec<StageStep> {
        self.labels
            .iter()
            .enumerate()
            .map(|(index, label)| {
                let index = index as u32;
                StageStep {
                    number: index + 1,
                    label: label.clone(),
                    active: index == stage.0,
                    completed: index < stage.0,
                }
            })
            .collect()
    }

    /// Check a numeric stage reported by the backend against the known domain.
    pub fn validate(&self, raw: i64) -> Result<Stage, ProbeError> {
        if raw < 0 || raw > i64::from(self.max_stage.0) {
            return Err(ProbeError::InvariantViolation(format!(
                "stage {raw} outside known domain 0..={}",
                self.max_stage
            )));
        }
        Ok(Stage(raw as u32))
    }

    /// Parse a stage from the backend's JSON representation.
    ///
    /// The project table stores the stage as text (`"6"`), realtime payloads
    /// and RPC responses carry it as a number. Anything else is rejected.
    pub fn parse_json(&self, raw: &serde_json::Value) -> Result<Stage, ProbeError> {
        let numeric = match raw {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        match numeric {
            Some(value) => self.validate(value),
            None => Err(ProbeError::InvariantViolation(format!(
                "unrecognized stage value: {raw}"
            ))),
        }
    }
}
