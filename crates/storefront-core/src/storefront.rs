//! Unified entry point
//!
//! `Storefront` wires the configured backend into one controller per table,
//! plus the authorizer and the notifier.
//!
//! ## Usage
//!
//! ```ignore
//! let mut shop = Storefront::open().await?;
//! let session = shop.session().await?;
//!
//! shop.add_product(&session, &ProductDraft::new("Face Cream", price)).await?;
//! for product in shop.catalog().items().iter() { ... }
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::auth::{self, Session, SharedAuthorizer};
use crate::config::Config;
use crate::controller::SyncController;
use crate::error::SyncResult;
use crate::ingress::IngressState;
use crate::models::{
    Product, ProductDraft, ProductPatch, Submission, SubmissionPatch, SubmissionStatus,
};
use crate::notify::{self, Newsletter, SharedNotifier};
use crate::remote::{self, SharedStore};

/// Catalog and submissions for one storefront
pub struct Storefront {
    config: Config,
    catalog: SyncController<Product>,
    submissions: SyncController<Submission>,
    submission_store: SharedStore<Submission>,
    authorizer: SharedAuthorizer,
    /// `None` when email is not configured for the live backend
    notifier: Option<SharedNotifier>,
}

impl Storefront {
    /// Open with the default configuration
    pub async fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config).await
    }

    /// Connect every adapter for `config` and load both tables
    ///
    /// Load failures do not fail the open; the affected controller comes up
    /// empty and reports the error through `last_load_error`.
    pub async fn open_with_config(config: Config) -> Result<Self> {
        let product_store = remote::connect::<Product>(&config)
            .context("Failed to connect product table")?;
        let submission_store = remote::connect::<Submission>(&config)
            .context("Failed to connect submission table")?;
        let authorizer = auth::connect(&config).context("Failed to connect role lookup")?;
        let notifier = notify::connect(&config)
            .inspect_err(|e| warn!("Newsletter disabled: {:#}", e))
            .ok();

        let catalog = SyncController::open(product_store).await;
        let submissions = SyncController::open(submission_store.clone()).await;

        info!(
            "Opened {} storefront ({} backend): {} products, {} submissions",
            config.store_name,
            config.backend,
            catalog.len(),
            submissions.len()
        );

        Ok(Self {
            config,
            catalog,
            submissions,
            submission_store,
            authorizer,
            notifier,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Session for the configured `user_id`
    pub async fn session(&self) -> Result<Session> {
        let user_id = self
            .config
            .user_id
            .as_deref()
            .context("No user_id configured. Set one with: storefront config set user_id <ID>")?;
        Ok(self.establish_session(user_id).await?)
    }

    /// Session for an arbitrary authenticated user
    pub async fn establish_session(&self, user_id: &str) -> SyncResult<Session> {
        Session::establish(self.authorizer.as_ref(), user_id).await
    }

    /// Re-list both tables
    pub async fn refresh(&mut self) {
        self.catalog.refresh().await;
        self.submissions.refresh().await;
    }

    // ==================== Catalog ====================

    /// Catalog controller; readable by anyone
    pub fn catalog(&self) -> &SyncController<Product> {
        &self.catalog
    }

    pub async fn add_product(&mut self, session: &Session, draft: &ProductDraft) -> SyncResult<Product> {
        session.require_admin()?;
        self.catalog.insert(draft).await
    }

    pub async fn update_product(
        &mut self,
        session: &Session,
        id: &str,
        patch: &ProductPatch,
    ) -> SyncResult<Product> {
        session.require_admin()?;
        self.catalog.update(id, patch).await
    }

    pub async fn delete_product(&mut self, session: &Session, id: &str) -> SyncResult<()> {
        session.require_admin()?;
        self.catalog.remove(id).await
    }

    // ==================== Submissions ====================

    /// Submission controller; customer details, so operators only
    pub fn submissions(&self, session: &Session) -> SyncResult<&SyncController<Submission>> {
        session.require_admin()?;
        Ok(&self.submissions)
    }

    pub async fn set_submission_status(
        &mut self,
        session: &Session,
        id: &str,
        status: SubmissionStatus,
    ) -> SyncResult<Submission> {
        session.require_admin()?;
        self.submissions
            .update(id, &SubmissionPatch::status(status))
            .await
    }

    pub async fn set_submission_notes(
        &mut self,
        session: &Session,
        id: &str,
        notes: &str,
    ) -> SyncResult<Submission> {
        session.require_admin()?;
        self.submissions
            .update(id, &SubmissionPatch::notes(notes))
            .await
    }

    pub async fn delete_submission(&mut self, session: &Session, id: &str) -> SyncResult<()> {
        session.require_admin()?;
        self.submissions.remove(id).await
    }

    // ==================== Side channels ====================

    /// Newsletter sender; fails when email is not configured
    pub fn newsletter(&self) -> Result<Newsletter> {
        let notifier = match self.notifier {
            Some(ref notifier) => notifier.clone(),
            // Rebuild to report why
            None => notify::connect(&self.config).context("Failed to set up email")?,
        };
        Ok(Newsletter::new(notifier, &self.config))
    }

    /// Handler state for the ingress server, sharing this storefront's adapters
    pub fn ingress_state(&self) -> Result<IngressState> {
        Ok(IngressState {
            submissions: self.submission_store.clone(),
            newsletter: Arc::new(self.newsletter()?),
        })
    }
}
