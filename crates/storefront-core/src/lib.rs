//! Storefront Core Library
//!
//! Back-office core for a small online store: a product catalog and the
//! customer form submissions, both held in a hosted database and mirrored
//! locally for the operator.
//!
//! # Architecture
//!
//! - **Remote store**: list/insert/update/remove against one hosted table,
//!   live over HTTP or mocked in-process
//! - **Mirror**: the last confirmed server state, newest first
//! - **Controller**: the only writer of the mirror; reads fail soft,
//!   writes fail loud
//!
//! # Quick Start
//!
//! ```text
//! let mut shop = Storefront::open().await?;
//! let session = shop.session().await?;
//!
//! // Add a product
//! let draft = ProductDraft::new("Face Cream", "499".parse()?);
//! shop.add_product(&session, &draft).await?;
//!
//! // Read the catalog
//! let products = shop.catalog().items();
//! ```
//!
//! # Modules
//!
//! - `storefront`: Unified entry point
//! - `remote`: Remote store adapters
//! - `mirror`: Local mirror cache
//! - `controller`: Synchronization controller
//! - `auth`: Role lookup and sessions
//! - `ingress`: HTTP endpoints for forms and newsletter signups
//! - `notify`: Email side-channel
//! - `models`, `price`, `error`, `config`

pub mod auth;
pub mod config;
pub mod controller;
pub mod error;
pub mod ingress;
pub mod mirror;
pub mod models;
pub mod notify;
pub mod price;
pub mod remote;
pub mod storefront;

pub use auth::{Authorizer, Role, Session};
pub use config::{Backend, Config};
pub use controller::{Snapshot, SyncController, SyncState};
pub use error::{SyncError, SyncResult};
pub use ingress::IngressState;
pub use mirror::Mirror;
pub use models::{
    Entity, NewSubmission, Product, ProductDraft, ProductPatch, Submission, SubmissionPatch,
    SubmissionStatus,
};
pub use notify::{Newsletter, NotifyError, Subscriber};
pub use price::{Price, PriceError};
pub use remote::{MemoryTable, RemoteStore, RestClient, RestTable, SharedStore};
pub use storefront::Storefront;
