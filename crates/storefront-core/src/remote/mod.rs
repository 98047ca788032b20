//! Remote store adapters
//!
//! A remote store is a hosted table holding the source of truth for one
//! entity type. Two adapters implement the same contract:
//!
//! - `RestTable`: a PostgREST-style HTTP API (the hosted database)
//! - `MemoryTable`: an in-process table, optionally backed by a JSON file,
//!   used for local development and tests
//!
//! Which one is used is decided by `Config::backend`.
//!
//! ## Contract
//!
//! - `list` returns entities newest first (by `created_at`)
//! - `insert` returns the server-materialized entity, id and timestamps included
//! - `update` returns the full post-update entity, not a diff
//! - `remove` succeeds only if the id existed

mod memory;
mod rest;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::{Backend, Config};
use crate::error::SyncResult;
use crate::models::Entity;

pub use memory::MemoryTable;
pub use rest::{RestClient, RestTable};

/// List/insert/update/remove against one remote table
#[async_trait]
pub trait RemoteStore<E: Entity>: Send + Sync {
    /// All entities, newest first
    async fn list(&self) -> SyncResult<Vec<E>>;

    /// Create an entity; the server assigns the id
    async fn insert(&self, draft: &E::Draft) -> SyncResult<E>;

    /// Apply a partial update and return the whole updated entity
    async fn update(&self, id: &str, patch: &E::Patch) -> SyncResult<E>;

    /// Delete by id
    async fn remove(&self, id: &str) -> SyncResult<()>;
}

/// Shared handle to a remote store
pub type SharedStore<E> = Arc<dyn RemoteStore<E>>;

/// Build the configured adapter for an entity type
pub fn connect<E: Entity>(config: &Config) -> Result<SharedStore<E>> {
    match config.backend {
        Backend::Live => {
            let client = RestClient::from_config(config)?;
            Ok(Arc::new(RestTable::<E>::new(client)))
        }
        Backend::Mock => {
            let path = config.mock_table_path(E::TABLE);
            let table = MemoryTable::<E>::with_path(path.clone())
                .with_context(|| format!("Failed to open mock table {:?}", path))?;
            Ok(Arc::new(table))
        }
    }
}
