//! In-process table
//!
//! Behaves like the hosted table: assigns ids and timestamps, returns rows
//! newest first, merges partial updates server-side. Optionally persists to
//! a JSON file so that separate CLI runs see the same data.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::RemoteStore;
use crate::error::{SyncError, SyncResult};
use crate::models::Entity;

/// A table held in memory, newest row first
#[derive(Debug)]
pub struct MemoryTable<E> {
    rows: Mutex<Vec<E>>,
    /// Errors to return from the next calls, in order
    failures: Mutex<VecDeque<SyncError>>,
    path: Option<PathBuf>,
}

impl<E: Entity> Default for MemoryTable<E> {
    fn default() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            path: None,
        }
    }
}

impl<E: Entity> MemoryTable<E> {
    /// Create an empty, unpersisted table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table seeded with rows (any order)
    pub fn with_rows(rows: Vec<E>) -> Self {
        Self {
            rows: Mutex::new(sorted(rows)),
            ..Self::default()
        }
    }

    /// Create a table that persists to a JSON file
    ///
    /// Existing rows are loaded if the file exists.
    pub fn with_path(path: PathBuf) -> Result<Self> {
        let rows = if path.exists() {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read table file {:?}", path))?;
            let rows: Vec<E> = serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse table file {:?}", path))?;
            sorted(rows)
        } else {
            Vec::new()
        };

        Ok(Self {
            rows: Mutex::new(rows),
            failures: Mutex::new(VecDeque::new()),
            path: Some(path),
        })
    }

    /// Make the next call fail with the given error
    pub async fn fail_next(&self, error: SyncError) {
        self.failures.lock().await.push_back(error);
    }

    /// Number of rows currently stored
    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }

    async fn injected_failure(&self) -> SyncResult<()> {
        match self.failures.lock().await.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn persist(&self, rows: &[E]) -> SyncResult<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(rows)
            .map_err(|e| SyncError::RemoteUnavailable(format!("serialize {}: {}", E::TABLE, e)))?;
        atomic_write(path, &json).map_err(|e| SyncError::RemoteUnavailable(format!("{:#}", e)))
    }
}

#[async_trait]
impl<E: Entity> RemoteStore<E> for MemoryTable<E> {
    async fn list(&self) -> SyncResult<Vec<E>> {
        self.injected_failure().await?;
        Ok(self.rows.lock().await.clone())
    }

    async fn insert(&self, draft: &E::Draft) -> SyncResult<E> {
        self.injected_failure().await?;

        let mut fields = to_object(draft)?;
        let now = Value::String(Utc::now().to_rfc3339());
        fields.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        fields.insert("created_at".into(), now.clone());
        fields.insert("updated_at".into(), now);
        let entity: E = from_object(fields)?;

        let mut rows = self.rows.lock().await;
        let mut next = Vec::with_capacity(rows.len() + 1);
        next.push(entity.clone());
        next.extend(rows.iter().cloned());
        self.persist(&next)?;
        *rows = next;

        debug!("{}: inserted {}", E::TABLE, entity.id());
        Ok(entity)
    }

    async fn update(&self, id: &str, patch: &E::Patch) -> SyncResult<E> {
        self.injected_failure().await?;

        let mut rows = self.rows.lock().await;
        let pos = rows
            .iter()
            .position(|e| e.id() == id)
            .ok_or_else(|| SyncError::NotFound(format!("{} {}", E::TABLE, id)))?;

        let mut fields = to_object(&rows[pos])?;
        fields.extend(to_object(patch)?);
        fields.insert("updated_at".into(), Value::String(Utc::now().to_rfc3339()));
        let entity: E = from_object(fields)?;

        let mut next = rows.clone();
        next[pos] = entity.clone();
        self.persist(&next)?;
        *rows = next;

        debug!("{}: updated {}", E::TABLE, id);
        Ok(entity)
    }

    async fn remove(&self, id: &str) -> SyncResult<()> {
        self.injected_failure().await?;

        let mut rows = self.rows.lock().await;
        if !rows.iter().any(|e| e.id() == id) {
            return Err(SyncError::NotFound(format!("{} {}", E::TABLE, id)));
        }

        let next: Vec<E> = rows.iter().filter(|e| e.id() != id).cloned().collect();
        self.persist(&next)?;
        *rows = next;

        debug!("{}: removed {}", E::TABLE, id);
        Ok(())
    }
}

/// Newest first; the sort is stable so equal timestamps keep their order
fn sorted<E: Entity>(mut rows: Vec<E>) -> Vec<E> {
    rows.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    rows
}

fn to_object<T: serde::Serialize>(value: &T) -> SyncResult<Map<String, Value>> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(SyncError::ValidationRejected(format!(
            "expected an object, got {}",
            other
        ))),
        Err(e) => Err(SyncError::ValidationRejected(e.to_string())),
    }
}

fn from_object<E: Entity>(fields: Map<String, Value>) -> SyncResult<E> {
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| SyncError::ValidationRejected(format!("{}: {}", E::TABLE, e)))
}

/// Write to a temp file, then rename over the target
fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)
        .with_context(|| format!("Failed to create temp file {:?}", temp_path))?;
    file.write_all(data)
        .with_context(|| format!("Failed to write to temp file {:?}", temp_path))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync temp file {:?}", temp_path))?;

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, path))?;

    Ok(())
}
