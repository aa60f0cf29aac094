//! The PR offer entity and its supporting types.
//!
//! A `PrOffer` records a product-for-content barter between a brand and a
//! creator. All mutation goes through the lifecycle transition function in
//! [`crate::lifecycle`]; nothing here changes an offer's status directly.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::status::OfferStatus;

/// Newtype for offer identifiers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct OfferId(pub Uuid);

impl OfferId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OfferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for OfferId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Newtype for brand identifiers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BrandId(pub Uuid);

impl fmt::Display for BrandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for BrandId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Newtype for creator identifiers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CreatorId(pub Uuid);

impl fmt::Display for CreatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CreatorId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Newtype for carrier tracking numbers to prevent mixing with other strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackingNumber(pub String);

impl fmt::Display for TrackingNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TrackingNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TrackingNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Where the brand ships the product. Supplied by the creator at acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Returns true if the fields a carrier needs are all present.
    pub fn is_complete(&self) -> bool {
        ![&self.recipient, &self.line1, &self.city, &self.postal_code, &self.country]
            .iter()
            .any(|field| field.trim().is_empty())
    }
}

/// Creator sizing information, supplied alongside the shipping address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizePreferences {
    #[serde(default)]
    pub clothing: Option<String>,
    #[serde(default)]
    pub shoe: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One deliverable the brand requires (e.g. "1 reel", platform "instagram").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deliverable {
    pub description: String,
    #[serde(default)]
    pub platform: Option<String>,
}

/// A content submission as supplied by the creator, before timestamping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSubmissionDraft {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub platform: String,
}

/// A recorded content submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSubmission {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub platform: String,
    pub submitted_at: DateTime<Utc>,
}

/// The central offer entity.
///
/// `status` is the single source of truth for which actions are valid.
/// Per-transition timestamps are each set exactly once by the transition
/// that reaches the corresponding status and are immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrOffer {
    pub id: OfferId,
    pub brand_id: BrandId,
    pub creator_id: CreatorId,
    pub status: OfferStatus,

    pub offer_title: String,
    pub products_offered: String,
    #[serde(default)]
    pub products_value: Option<Decimal>,
    pub deliverables_required: Vec<Deliverable>,
    #[serde(default)]
    pub mandatory_requirements: Option<String>,
    /// Days after product receipt by which content is due.
    pub content_deadline_days: u32,
    /// Category tags used for matching; not enforced after creation.
    #[serde(default)]
    pub target_categories: BTreeSet<String>,

    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub size_preferences: Option<SizePreferences>,
    #[serde(default)]
    pub tracking_number: Option<TrackingNumber>,
    #[serde(default)]
    pub content_submissions: Vec<ContentSubmission>,
    #[serde(default)]
    pub declined_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub product_received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content_submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub declined_at: Option<DateTime<Utc>>,
}

impl PrOffer {
    /// Create a new pending offer from a validated draft.
    pub fn new(draft: OfferDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: OfferId::new(),
            brand_id: draft.brand_id,
            creator_id: draft.creator_id,
            status: OfferStatus::Pending,
            offer_title: draft.offer_title,
            products_offered: draft.products_offered,
            products_value: draft.products_value,
            deliverables_required: draft.deliverables_required,
            mandatory_requirements: draft.mandatory_requirements,
            content_deadline_days: draft.content_deadline_days,
            target_categories: draft.target_categories,
            shipping_address: None,
            size_preferences: None,
            tracking_number: None,
            content_submissions: Vec::new(),
            declined_reason: None,
            created_at: now,
            accepted_at: None,
            shipped_at: None,
            product_received_at: None,
            content_submitted_at: None,
            completed_at: None,
            declined_at: None,
        }
    }

    /// When content is due: `content_deadline_days` after product receipt.
    /// None until receipt is confirmed.
    pub fn content_deadline(&self) -> Option<DateTime<Utc>> {
        self.product_received_at
            .map(|received| received + Duration::days(i64::from(self.content_deadline_days)))
    }
}

/// Creation payload for a new offer. `brand_id` comes from the authenticated
/// session, everything else from the request body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OfferDraft {
    pub brand_id: BrandId,
    pub creator_id: CreatorId,
    pub offer_title: String,
    pub products_offered: String,
    #[serde(default)]
    pub products_value: Option<Decimal>,
    pub deliverables_required: Vec<Deliverable>,
    #[serde(default)]
    pub mandatory_requirements: Option<String>,
    pub content_deadline_days: u32,
    #[serde(default)]
    pub target_categories: BTreeSet<String>,
}

/// Reasons a draft is rejected at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("offer_title must not be empty")]
    EmptyTitle,
    #[error("products_offered must not be empty")]
    EmptyProducts,
    #[error("deliverables_required must not be empty")]
    NoDeliverables,
    #[error("content_deadline_days must be at least 1")]
    ZeroDeadline,
}

impl OfferDraft {
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.offer_title.trim().is_empty() {
            return Err(DraftError::EmptyTitle);
        }
        if self.products_offered.trim().is_empty() {
            return Err(DraftError::EmptyProducts);
        }
        if self.deliverables_required.is_empty() {
            return Err(DraftError::NoDeliverables);
        }
        if self.content_deadline_days == 0 {
            return Err(DraftError::ZeroDeadline);
        }
        Ok(())
    }
}
