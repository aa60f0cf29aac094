//! Repository abstraction for offer persistence.
//!
//! This module defines the `OfferRepository` trait that abstracts storage
//! operations for offers and creator profiles. Implementations provide
//! different backends (in-memory, SQLite).
//!
//! The update path is a compare-and-swap conditioned on the offer's prior
//! status - the single-writer-per-offer guarantee. A swap that matches zero
//! rows surfaces `RepositoryError::Stale`, never a silent overwrite.

mod memory;
mod sqlite;

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

use async_trait::async_trait;
use thiserror::Error;

use prbridge_core::{BrandId, CreatorId, CreatorProfile, OfferId, OfferStatus, PrOffer};

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("offer not found")]
    NotFound,

    /// The compare-and-swap found the offer in a different status than the
    /// caller observed.
    #[error("offer state has changed: expected {expected}, found {actual}")]
    Stale {
        expected: OfferStatus,
        actual: OfferStatus,
    },

    #[error("{operation} failed: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RepositoryError {
    pub fn storage(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Storage {
            operation,
            message: message.into(),
        }
    }
}

/// Repository trait for persisting offers and creator matching profiles.
#[async_trait]
pub trait OfferRepository: Send + Sync {
    /// Insert a freshly created offer.
    async fn insert(&self, offer: &PrOffer) -> Result<(), RepositoryError>;

    /// Fetch an offer by id, `None` if unknown.
    async fn get(&self, id: &OfferId) -> Result<Option<PrOffer>, RepositoryError>;

    /// Persist an updated offer if and only if it is still in `expected`
    /// status. Zero rows affected means someone got there first.
    async fn update_where_status(
        &self,
        offer: &PrOffer,
        expected: OfferStatus,
    ) -> Result<(), RepositoryError>;

    /// All offers created by a brand, newest first.
    async fn list_for_brand(&self, brand_id: &BrandId) -> Result<Vec<PrOffer>, RepositoryError>;

    /// All offers addressed to a creator, newest first.
    async fn list_for_creator(
        &self,
        creator_id: &CreatorId,
    ) -> Result<Vec<PrOffer>, RepositoryError>;

    /// Every offer, for the status dashboard.
    async fn list_all(&self) -> Result<Vec<PrOffer>, RepositoryError>;

    /// Register or replace a creator's matching profile.
    async fn upsert_creator_profile(
        &self,
        profile: &CreatorProfile,
    ) -> Result<(), RepositoryError>;

    /// All registered creator profiles, for matching.
    async fn creator_profiles(&self) -> Result<Vec<CreatorProfile>, RepositoryError>;
}
