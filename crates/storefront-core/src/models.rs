//! Data models for the storefront
//!
//! Defines the synchronized entity types: catalog products and customer
//! form submissions, together with their insert drafts and partial patches.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::price::Price;

/// A record type mirrored from a remote table
///
/// Ids are opaque and assigned by the server. `Draft` is what an insert
/// sends, `Patch` is what an update sends (absent fields are left alone).
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Remote table name
    const TABLE: &'static str;

    /// Insert payload
    type Draft: Serialize + Send + Sync + 'static;

    /// Partial update payload
    type Patch: Serialize + Send + Sync + 'static;

    /// Server-assigned identifier
    fn id(&self) -> &str;

    /// Creation time, used for newest-first ordering
    fn created_at(&self) -> DateTime<Utc>;
}

/// A product in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    /// Unique identifier
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    /// Display name
    pub name: String,
    /// Category label
    #[serde(default)]
    pub category: String,
    /// Selling price
    pub price: Price,
    /// Price before discount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Price>,
    /// Image reference (URL or asset path)
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Short marketing label ("New", "Bestseller")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// Size or shade variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// When this product was created
    pub created_at: DateTime<Utc>,
    /// When this product was last updated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Discount percentage against the original price, if any
    pub fn discount_percent(&self) -> Option<u8> {
        self.original_price.and_then(|o| self.price.discount_from(o))
    }

    /// Whether the product can currently be ordered
    pub fn in_stock(&self) -> bool {
        self.stock.map_or(true, |s| s > 0)
    }
}

impl Entity for Product {
    const TABLE: &'static str = "products";
    type Draft = ProductDraft;
    type Patch = ProductPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Fields for a product that does not exist yet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProductDraft {
    pub name: String,
    pub category: String,
    pub price: Price,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Price>,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl ProductDraft {
    /// Create a draft with the required fields
    pub fn new(name: impl Into<String>, price: Price) -> Self {
        Self {
            name: name.into(),
            price,
            ..Self::default()
        }
    }
}

/// A partial product update; only `Some` fields are sent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl ProductPatch {
    /// Patch that only changes the price
    pub fn price(price: Price) -> Self {
        Self {
            price: Some(price),
            ..Self::default()
        }
    }

    /// True when the patch would not change anything
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Processing status of a submission
///
/// The set is open-ended: statuses written by other tools are preserved
/// verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubmissionStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
    Other(String),
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Processing => "processing",
            SubmissionStatus::Completed => "completed",
            SubmissionStatus::Cancelled => "cancelled",
            SubmissionStatus::Other(s) => s,
        }
    }
}

impl From<String> for SubmissionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => SubmissionStatus::Pending,
            "processing" => SubmissionStatus::Processing,
            "completed" => SubmissionStatus::Completed,
            "cancelled" => SubmissionStatus::Cancelled,
            _ => SubmissionStatus::Other(s),
        }
    }
}

impl From<&str> for SubmissionStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<SubmissionStatus> for String {
    fn from(status: SubmissionStatus) -> Self {
        match status {
            SubmissionStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer form submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    /// Form category tag ("order", "contact", "consultation")
    pub form_type: String,
    pub form_name: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    /// Free-form order payload
    #[serde(default)]
    pub order_details: Value,
    /// Free-form extra fields
    #[serde(default)]
    pub additional_data: Value,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Submission {
    const TABLE: &'static str = "form_submissions";
    type Draft = NewSubmission;
    type Patch = SubmissionPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Insert payload for a submission; always starts out pending
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewSubmission {
    pub form_type: String,
    pub form_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    pub order_details: Value,
    pub additional_data: Value,
    pub status: SubmissionStatus,
}

impl NewSubmission {
    pub fn new(form_type: impl Into<String>, form_name: impl Into<String>) -> Self {
        Self {
            form_type: form_type.into(),
            form_name: form_name.into(),
            customer_name: None,
            customer_email: None,
            customer_phone: None,
            delivery_address: None,
            order_details: Value::Object(Default::default()),
            additional_data: Value::Object(Default::default()),
            status: SubmissionStatus::Pending,
        }
    }
}

/// Operator edits to a submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SubmissionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SubmissionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SubmissionPatch {
    pub fn status(status: impl Into<SubmissionStatus>) -> Self {
        Self {
            status: Some(status.into()),
            notes: None,
        }
    }

    pub fn notes(notes: impl Into<String>) -> Self {
        Self {
            status: None,
            notes: Some(notes.into()),
        }
    }
}

/// Accept ids as strings or numbers; hosted tables use either
fn opaque_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or numeric id, got {}",
            other
        ))),
    }
}
