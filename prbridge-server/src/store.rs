//! Offer store: the apply loop tying transitions, persistence, and effects
//! together.
//!
//! This is the main entry point for mutating an offer. It:
//! 1. Loads the offer and checks the caller is a party to it
//! 2. Checks the caller's `expected_status` against what is stored
//! 3. Runs the pure transition function
//! 4. Persists the result with a compare-and-swap on the prior status
//! 5. Executes effects (only after the swap committed)
//! 6. Drains follow-up system actions through the same loop
//!
//! Effects never run for a transition that failed to commit, so a retried
//! request that loses the swap produces no duplicate notifications.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use prbridge_core::{
    matched_creators, transition, Actor, BrandId, CreatorId, CreatorProfile, MatchedCreators,
    OfferAction, OfferDraft, OfferId, OfferStatus, PrOffer, TransitionError,
};

use crate::error::ApiError;
use crate::interpreter::{execute_effects, EffectContext};
use crate::notify::Notifier;
use crate::repository::OfferRepository;

pub struct OfferStore {
    repository: Arc<dyn OfferRepository>,
    notifier: Arc<dyn Notifier>,
}

impl OfferStore {
    pub fn new(repository: Arc<dyn OfferRepository>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// Create a new pending offer from a validated draft.
    pub async fn create(&self, draft: OfferDraft) -> Result<PrOffer, ApiError> {
        draft.validate()?;
        let offer = PrOffer::new(draft, Utc::now());
        self.repository.insert(&offer).await?;
        info!(offer_id = %offer.id, brand_id = %offer.brand_id, "offer created");
        Ok(offer)
    }

    pub async fn get(&self, id: &OfferId) -> Result<PrOffer, ApiError> {
        self.repository.get(id).await?.ok_or(ApiError::NotFound)
    }

    pub async fn list_for_brand(&self, brand_id: &BrandId) -> Result<Vec<PrOffer>, ApiError> {
        Ok(self.repository.list_for_brand(brand_id).await?)
    }

    pub async fn list_for_creator(
        &self,
        creator_id: &CreatorId,
    ) -> Result<Vec<PrOffer>, ApiError> {
        Ok(self.repository.list_for_creator(creator_id).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<PrOffer>, ApiError> {
        Ok(self.repository.list_all().await?)
    }

    pub async fn upsert_creator_profile(&self, profile: &CreatorProfile) -> Result<(), ApiError> {
        Ok(self.repository.upsert_creator_profile(profile).await?)
    }

    pub async fn matched_creators(
        &self,
        target_categories: &BTreeSet<String>,
    ) -> Result<MatchedCreators, ApiError> {
        let profiles = self.repository.creator_profiles().await?;
        Ok(matched_creators(target_categories, profiles))
    }

    /// Apply a lifecycle action for an authenticated party.
    ///
    /// `acting_party` is the session's party id; it must match the offer
    /// side the actor role claims. Pass `None` only from trusted internal
    /// callers (tests, system jobs).
    pub async fn apply(
        &self,
        id: &OfferId,
        actor: Actor,
        acting_party: Option<Uuid>,
        action: OfferAction,
        expected_status: Option<OfferStatus>,
    ) -> Result<PrOffer, ApiError> {
        let mut offer = self.repository.get(id).await?.ok_or(ApiError::NotFound)?;

        if let Some(party_id) = acting_party {
            let owner = match actor {
                Actor::Brand => offer.brand_id.0,
                Actor::Creator => offer.creator_id.0,
                Actor::System => party_id,
            };
            if owner != party_id {
                return Err(ApiError::Forbidden(
                    "not a party to this offer".to_string(),
                ));
            }
        }

        if let Some(expected) = expected_status {
            if expected != offer.status {
                return Err(TransitionError::Stale {
                    expected,
                    actual: offer.status,
                }
                .into());
            }
        }

        // Apply loop: the requested action, then any follow-up system
        // actions produced by its effects.
        let mut pending = vec![(actor, action)];
        while let Some((actor, action)) = pending.pop() {
            info!(
                offer_id = %offer.id,
                status = %offer.status,
                actor = %actor,
                action = %action.log_summary(),
                "applying lifecycle action"
            );

            let prior = offer.status;
            let result = transition(&offer, actor, &action, Utc::now())?;
            self.repository
                .update_where_status(&result.offer, prior)
                .await?;
            offer = result.offer;

            let ctx = EffectContext {
                offer: &offer,
                notifier: self.notifier.as_ref(),
            };
            let follow_ups = execute_effects(&ctx, result.effects).await;
            for follow_up in follow_ups.into_iter().rev() {
                pending.push((Actor::System, follow_up));
            }
        }

        info!(offer_id = %offer.id, status = %offer.status, "lifecycle action committed");
        Ok(offer)
    }
}
