//! Effect interpreter.
//!
//! The boundary between the pure lifecycle transition and the impure world.
//! Effects are executed sequentially after the status swap has been
//! persisted; failures are logged and never abort the remaining effects.
//! `AdvanceLifecycle` effects are returned to the store's apply loop rather
//! than executed here, keeping this module free of transition logic.

use tracing::{error, info, warn};

use prbridge_core::{Actor, Effect, LogLevel, OfferAction, PrOffer};

use crate::notify::{Notification, Notifier};

/// Context needed to execute effects for one offer.
pub struct EffectContext<'a> {
    pub offer: &'a PrOffer,
    pub notifier: &'a dyn Notifier,
}

/// Execute effects and collect follow-up lifecycle actions.
pub async fn execute_effects(ctx: &EffectContext<'_>, effects: Vec<Effect>) -> Vec<OfferAction> {
    let mut follow_ups = Vec::new();

    for effect in effects {
        match effect {
            Effect::Notify { recipient, notice } => {
                let recipient_id = match recipient {
                    Actor::Brand => ctx.offer.brand_id.0,
                    Actor::Creator => ctx.offer.creator_id.0,
                    Actor::System => {
                        warn!("dropping notification addressed to the system actor");
                        continue;
                    }
                };
                let notification = Notification {
                    recipient_role: recipient,
                    recipient_id,
                    offer_id: ctx.offer.id,
                    summary: notice.summary(),
                    notice,
                };
                if let Err(err) = ctx.notifier.deliver(notification).await {
                    error!(
                        offer_id = %ctx.offer.id,
                        "notification delivery failed: {:#}", err
                    );
                }
            }

            Effect::AdvanceLifecycle { action } => follow_ups.push(action),

            Effect::Log { level, message } => match level {
                LogLevel::Info => info!(offer_id = %ctx.offer.id, "{}", message),
                LogLevel::Warn => warn!(offer_id = %ctx.offer.id, "{}", message),
                LogLevel::Error => error!(offer_id = %ctx.offer.id, "{}", message),
            },
        }
    }

    follow_ups
}
