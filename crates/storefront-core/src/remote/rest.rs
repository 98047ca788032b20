//! PostgREST adapter
//!
//! Talks to a hosted table over HTTP using PostgREST conventions:
//! filters as `column=eq.value` query parameters, `Prefer:
//! return=representation` to get rows back from writes, and the API key
//! sent both as `apikey` and as a bearer token.

use std::marker::PhantomData;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::RemoteStore;
use crate::config::Config;
use crate::error::{SyncError, SyncResult};
use crate::models::Entity;

/// Ask PostgREST to return affected rows
const RETURN_REPRESENTATION: &str = "return=representation";

/// HTTP client for the hosted database
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestClient {
    /// Create a client for the given project URL and key
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Create a client from the `backend_url` / `backend_key` settings
    pub fn from_config(config: &Config) -> Result<Self> {
        let Some(ref url) = config.backend_url else {
            bail!(
                "Backend URL not configured. Set it with:\n  \
                 storefront config set backend_url https://your-project.example.co"
            );
        };
        let Some(ref key) = config.backend_key else {
            bail!(
                "Backend key not configured. Set it with:\n  \
                 storefront config set backend_key <key>"
            );
        };

        Ok(Self::new(url, key, config.request_timeout())?)
    }

    /// Base project URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Select rows matching `column=eq.value` filters
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, &str)],
    ) -> SyncResult<Vec<T>> {
        let mut query: Vec<(String, String)> = vec![("select".into(), "*".into())];
        query.extend(
            filters
                .iter()
                .map(|(col, val)| (col.to_string(), format!("eq.{}", val))),
        );

        debug!("GET {} {:?}", table, filters);
        let response = self
            .request(Method::GET, table)
            .query(&query)
            .send()
            .await?;
        read_json(response).await
    }

    /// All rows, newest first
    pub async fn select_newest_first<T: DeserializeOwned>(&self, table: &str) -> SyncResult<Vec<T>> {
        debug!("GET {} ordered by created_at desc", table);
        let response = self
            .request(Method::GET, table)
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await?;
        read_json(response).await
    }

    /// Insert one row and return what the server stored
    pub async fn insert_returning<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> SyncResult<T> {
        debug!("POST {}", table);
        let response = self
            .request(Method::POST, table)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(body)
            .send()
            .await?;
        let rows: Vec<T> = read_json(response).await?;
        rows.into_iter().next().ok_or_else(|| {
            SyncError::RemoteUnavailable(format!("insert into {} returned no row", table))
        })
    }

    /// Update the row with the given id and return it
    pub async fn update_returning<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
        body: &B,
    ) -> SyncResult<T> {
        debug!("PATCH {} id={}", table, id);
        let response = self
            .request(Method::PATCH, table)
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(body)
            .send()
            .await?;
        let rows: Vec<T> = read_json(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SyncError::NotFound(format!("{} {}", table, id)))
    }

    /// Delete the row with the given id
    pub async fn delete(&self, table: &str, id: &str) -> SyncResult<()> {
        debug!("DELETE {} id={}", table, id);
        let response = self
            .request(Method::DELETE, table)
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", RETURN_REPRESENTATION)
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = read_json(response).await?;
        if rows.is_empty() {
            return Err(SyncError::NotFound(format!("{} {}", table, id)));
        }
        Ok(())
    }
}

/// Decode a success body, or classify the failure
async fn read_json<T: DeserializeOwned>(response: Response) -> SyncResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let reason = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            }
        });

    Err(SyncError::from_status(status.as_u16(), reason))
}

/// A remote table for one entity type
pub struct RestTable<E> {
    client: RestClient,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> RestTable<E> {
    pub fn new(client: RestClient) -> Self {
        Self {
            client,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<E: Entity> RemoteStore<E> for RestTable<E> {
    async fn list(&self) -> SyncResult<Vec<E>> {
        self.client.select_newest_first(E::TABLE).await
    }

    async fn insert(&self, draft: &E::Draft) -> SyncResult<E> {
        self.client.insert_returning(E::TABLE, draft).await
    }

    async fn update(&self, id: &str, patch: &E::Patch) -> SyncResult<E> {
        self.client.update_returning(E::TABLE, id, patch).await
    }

    async fn remove(&self, id: &str) -> SyncResult<()> {
        self.client.delete(E::TABLE, id).await
    }
}
