use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{ExecutionResult, Strategy};
use crate::orchestrator::{ExecutionReport, RunState};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing store at {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Strategy ID is required")]
    MissingId,

    #[error("strategy '{0}' already exists")]
    AlreadyExists(String),

    #[error("strategy '{0}' not found")]
    NotFound(String),

    #[error("only the creator of strategy '{id}' ({creator}) may modify it, not {caller}")]
    NotCreator {
        id: String,
        creator: String,
        caller: String,
    },
}

/// Lifecycle of a stored strategy, driven by its latest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyStatus {
    /// Stored, never run.
    #[default]
    Pending,
    /// Last run completed every step.
    Active,
    /// Last run aborted on a failed step.
    Failed,
    /// Last run was paused between steps.
    Paused,
}

/// One finished run, as kept in a strategy's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub run_id: Uuid,
    pub state: RunState,
    pub results: Vec<ExecutionResult>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredStrategy {
    pub strategy: Strategy,
    pub creator: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: StrategyStatus,
    /// Step index a resume should start from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step: Option<usize>,
    #[serde(default)]
    pub history: Vec<RunRecord>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    strategies: BTreeMap<String, StoredStrategy>,
}

fn default_store_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".yield-flow")
}

/// Strategies and their run history, kept as one JSON file.
///
/// Every mutation is written through immediately.
pub struct StrategyStore {
    path: PathBuf,
    data: StoreFile,
}

impl StrategyStore {
    /// Path of the store file inside `dir` (default `~/.yield-flow`).
    pub fn path(dir: Option<&Path>) -> PathBuf {
        dir.map(Path::to_path_buf)
            .unwrap_or_else(default_store_dir)
            .join("strategies.json")
    }

    /// Load the store, or start empty if the file does not exist yet.
    pub fn open(dir: Option<&Path>) -> Result<Self, StoreError> {
        let path = Self::path(dir);
        if !path.exists() {
            return Ok(StrategyStore {
                path,
                data: StoreFile::default(),
            });
        }
        let contents = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
            action: "reading",
            path: path.clone(),
            source,
        })?;
        let data = serde_json::from_str(&contents).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        Ok(StrategyStore { path, data })
    }

    pub fn file(&self) -> &Path {
        &self.path
    }

    /// Add a new strategy owned by `creator`. Returns the new total.
    pub fn store(&mut self, strategy: Strategy, creator: &str) -> Result<usize, StoreError> {
        if strategy.id.trim().is_empty() {
            return Err(StoreError::MissingId);
        }
        if self.data.strategies.contains_key(&strategy.id) {
            return Err(StoreError::AlreadyExists(strategy.id));
        }
        let id = strategy.id.clone();
        self.data.strategies.insert(
            id,
            StoredStrategy {
                strategy,
                creator: creator.to_string(),
                created_at: Utc::now(),
                status: StrategyStatus::Pending,
                next_step: None,
                history: Vec::new(),
            },
        );
        self.save()?;
        Ok(self.total())
    }

    /// Replace a strategy's document. Creator, creation time and run
    /// history are preserved.
    pub fn update(&mut self, strategy: Strategy, caller: &str) -> Result<(), StoreError> {
        let entry = self.owned_mut(&strategy.id, caller)?;
        entry.strategy = strategy;
        entry.next_step = None;
        self.save()
    }

    /// Remove a strategy. Returns the new total.
    pub fn delete(&mut self, id: &str, caller: &str) -> Result<usize, StoreError> {
        self.owned_mut(id, caller)?;
        self.data.strategies.remove(id);
        self.save()?;
        Ok(self.total())
    }

    pub fn get(&self, id: &str) -> Option<&StoredStrategy> {
        self.data.strategies.get(id)
    }

    pub fn by_creator(&self, creator: &str) -> Vec<&StoredStrategy> {
        self.data
            .strategies
            .values()
            .filter(|s| s.creator == creator)
            .collect()
    }

    pub fn all(&self) -> Vec<&StoredStrategy> {
        self.data.strategies.values().collect()
    }

    pub fn total(&self) -> usize {
        self.data.strategies.len()
    }

    /// Append a run to the strategy's history and update its status.
    pub fn record_run(&mut self, id: &str, report: &ExecutionReport) -> Result<(), StoreError> {
        let entry = self
            .data
            .strategies
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        entry.status = match report.state {
            RunState::Completed => StrategyStatus::Active,
            RunState::Aborted { .. } => StrategyStatus::Failed,
            RunState::Paused { .. } => StrategyStatus::Paused,
            _ => entry.status,
        };
        entry.next_step = report.next_step();
        entry.history.push(RunRecord {
            run_id: report.run_id,
            state: report.state,
            results: report.results.clone(),
            finished_at: report.finished_at,
        });
        self.save()
    }

    fn owned_mut(&mut self, id: &str, caller: &str) -> Result<&mut StoredStrategy, StoreError> {
        let entry = self
            .data
            .strategies
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if entry.creator != caller {
            return Err(StoreError::NotCreator {
                id: id.to_string(),
                creator: entry.creator.clone(),
                caller: caller.to_string(),
            });
        }
        Ok(entry)
    }

    fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                action: "creating store dir",
                path: parent.to_path_buf(),
                source,
            })?;
        }

        // Write atomically: tmp then rename
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&self.data).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&tmp, json).map_err(|source| StoreError::Io {
            action: "writing",
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            action: "renaming store into",
            path: self.path.clone(),
            source,
        })
    }
}
