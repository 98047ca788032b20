//! Operator authorization
//!
//! There is one way to become an operator: the server-side `user_roles`
//! table says so. `Authorizer::authorize` maps an authenticated user id to
//! a `Role`, and the resulting `Session` is passed explicitly to whatever
//! needs to check it.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{Backend, Config};
use crate::error::{SyncError, SyncResult};
use crate::remote::RestClient;

/// Remote table holding role assignments
pub const ROLES_TABLE: &str = "user_roles";

/// What a user is allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May edit the catalog and manage submissions
    Admin,
    /// Everyone else
    Customer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Customer => f.write_str("customer"),
        }
    }
}

/// One row of the roles table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub user_id: String,
    pub role: String,
}

/// Resolves a user id to a role
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, user_id: &str) -> SyncResult<Role>;
}

/// Shared handle to an authorizer
pub type SharedAuthorizer = Arc<dyn Authorizer>;

fn role_from_rows<'a>(rows: impl IntoIterator<Item = &'a str>) -> Role {
    if rows.into_iter().any(|r| r.eq_ignore_ascii_case("admin")) {
        Role::Admin
    } else {
        Role::Customer
    }
}

/// Role lookup against the hosted `user_roles` table
pub struct RoleTable {
    client: RestClient,
}

impl RoleTable {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Authorizer for RoleTable {
    async fn authorize(&self, user_id: &str) -> SyncResult<Role> {
        let rows: Vec<RoleAssignment> = self
            .client
            .select(ROLES_TABLE, &[("user_id", user_id)])
            .await?;
        let role = role_from_rows(rows.iter().map(|r| r.role.as_str()));
        debug!("user {} resolved to {}", user_id, role);
        Ok(role)
    }
}

/// Role assignments held locally, for the mock backend
#[derive(Debug, Clone, Default)]
pub struct StaticRoles {
    roles: HashMap<String, Role>,
}

impl StaticRoles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_admin(mut self, user_id: impl Into<String>) -> Self {
        self.roles.insert(user_id.into(), Role::Admin);
        self
    }

    pub fn role_of(&self, user_id: &str) -> Role {
        self.roles.get(user_id).copied().unwrap_or(Role::Customer)
    }

    /// Load assignments from a JSON file of `RoleAssignment` rows
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read roles file {:?}", path))?;
        let rows: Vec<RoleAssignment> = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse roles file {:?}", path))?;

        let mut by_user: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            by_user.entry(row.user_id).or_default().push(row.role);
        }
        let roles = by_user
            .into_iter()
            .map(|(user, rows)| {
                let role = role_from_rows(rows.iter().map(String::as_str));
                (user, role)
            })
            .collect();

        Ok(Self { roles })
    }

    /// Write assignments as `RoleAssignment` rows
    pub fn save(&self, path: &Path) -> Result<()> {
        let rows: Vec<RoleAssignment> = self
            .roles
            .iter()
            .map(|(user, role)| RoleAssignment {
                user_id: user.clone(),
                role: role.to_string(),
            })
            .collect();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&rows)?)
            .with_context(|| format!("Failed to write roles file {:?}", path))?;
        Ok(())
    }
}

#[async_trait]
impl Authorizer for StaticRoles {
    async fn authorize(&self, user_id: &str) -> SyncResult<Role> {
        Ok(self.role_of(user_id))
    }
}

/// Build the configured authorizer
///
/// The mock backend keeps its roles in `mock/user_roles.json`; on first use
/// that file is seeded with the configured `user_id` as admin.
pub fn connect(config: &Config) -> Result<SharedAuthorizer> {
    match config.backend {
        Backend::Live => Ok(Arc::new(RoleTable::new(RestClient::from_config(config)?))),
        Backend::Mock => {
            let path = config.mock_table_path(ROLES_TABLE);
            if path.exists() {
                let roles = StaticRoles::load(&path)?;
                if let Some(hint) = missing_admin_hint(&roles, config, &path) {
                    warn!("{}", hint);
                }
                return Ok(Arc::new(roles));
            }

            let mut roles = StaticRoles::new();
            if let Some(ref user_id) = config.user_id {
                info!("Seeding mock roles with {} as admin", user_id);
                roles = roles.with_admin(user_id.clone());
            }
            roles.save(&path)?;
            Ok(Arc::new(roles))
        }
    }
}

/// Hint for a configured mock user the existing roles file does not make admin
fn missing_admin_hint(roles: &StaticRoles, config: &Config, path: &Path) -> Option<String> {
    let user_id = config.user_id.as_deref()?;
    if roles.role_of(user_id) == Role::Admin {
        return None;
    }
    Some(format!(
        "Mock user {} is not an admin. Add {{\"user_id\": \"{}\", \"role\": \"admin\"}} to {:?}",
        user_id, user_id, path
    ))
}

/// An authenticated user and their role, for the lifetime of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: String,
    role: Role,
}

impl Session {
    /// Resolve the user's role and start a session
    pub async fn establish(authorizer: &dyn Authorizer, user_id: &str) -> SyncResult<Self> {
        if user_id.trim().is_empty() {
            return Err(SyncError::Unauthorized("no user id".to_string()));
        }
        let role = authorizer.authorize(user_id).await?;
        Ok(Self {
            user_id: user_id.to_string(),
            role,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail unless this session belongs to an operator
    pub fn require_admin(&self) -> SyncResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(SyncError::Unauthorized(format!(
                "user {} is not an admin",
                self.user_id
            )))
        }
    }
}
