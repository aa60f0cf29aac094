//! In-memory implementation of `OfferRepository`.
//!
//! Offers live in a `HashMap` behind a `RwLock`; everything is lost on
//! restart. Used by tests and as a scratch backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use prbridge_core::{BrandId, CreatorId, CreatorProfile, OfferId, OfferStatus, PrOffer};

use super::{OfferRepository, RepositoryError};

/// In-memory offer repository.
#[derive(Default)]
pub struct InMemoryRepository {
    offers: RwLock<HashMap<OfferId, PrOffer>>,
    profiles: RwLock<HashMap<CreatorId, CreatorProfile>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OfferRepository for InMemoryRepository {
    async fn insert(&self, offer: &PrOffer) -> Result<(), RepositoryError> {
        let mut offers = self.offers.write().await;
        offers.insert(offer.id, offer.clone());
        Ok(())
    }

    async fn get(&self, id: &OfferId) -> Result<Option<PrOffer>, RepositoryError> {
        let offers = self.offers.read().await;
        Ok(offers.get(id).cloned())
    }

    async fn update_where_status(
        &self,
        offer: &PrOffer,
        expected: OfferStatus,
    ) -> Result<(), RepositoryError> {
        let mut offers = self.offers.write().await;
        let current = offers.get(&offer.id).ok_or(RepositoryError::NotFound)?;
        if current.status != expected {
            return Err(RepositoryError::Stale {
                expected,
                actual: current.status,
            });
        }
        offers.insert(offer.id, offer.clone());
        Ok(())
    }

    async fn list_for_brand(&self, brand_id: &BrandId) -> Result<Vec<PrOffer>, RepositoryError> {
        let offers = self.offers.read().await;
        let mut matching: Vec<PrOffer> = offers
            .values()
            .filter(|offer| offer.brand_id == *brand_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn list_for_creator(
        &self,
        creator_id: &CreatorId,
    ) -> Result<Vec<PrOffer>, RepositoryError> {
        let offers = self.offers.read().await;
        let mut matching: Vec<PrOffer> = offers
            .values()
            .filter(|offer| offer.creator_id == *creator_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn list_all(&self) -> Result<Vec<PrOffer>, RepositoryError> {
        let offers = self.offers.read().await;
        let mut all: Vec<PrOffer> = offers.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn upsert_creator_profile(
        &self,
        profile: &CreatorProfile,
    ) -> Result<(), RepositoryError> {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.creator_id, profile.clone());
        Ok(())
    }

    async fn creator_profiles(&self) -> Result<Vec<CreatorProfile>, RepositoryError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.values().cloned().collect())
    }
}
