//! Pure state transition function for the offer lifecycle.
//!
//! The transition function takes the current offer, the acting party, and an
//! action, and returns the updated offer plus a list of effects. It has NO
//! side effects and is the sole authority on whether a transition is legal.
//!
//! The `TRANSITIONS` table is the single declarative source of truth for
//! which actions exist, from which status, by which actor; everything else
//! (API availability, dashboards, clients) derives from it.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::lifecycle::action::{ActionKind, Actor, OfferAction};
use crate::lifecycle::effect::{Effect, LogLevel, Notice};
use crate::offer::{ContentSubmission, PrOffer};
use crate::status::OfferStatus;

/// One row of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: OfferStatus,
    pub action: ActionKind,
    pub actor: Actor,
    pub to: OfferStatus,
}

/// The complete transition graph. Order mirrors the lifecycle.
pub const TRANSITIONS: [TransitionRule; 8] = [
    TransitionRule {
        from: OfferStatus::Pending,
        action: ActionKind::Accept,
        actor: Actor::Creator,
        to: OfferStatus::Accepted,
    },
    TransitionRule {
        from: OfferStatus::Pending,
        action: ActionKind::Decline,
        actor: Actor::Creator,
        to: OfferStatus::Declined,
    },
    TransitionRule {
        from: OfferStatus::Accepted,
        action: ActionKind::MarkAwaitingShipment,
        actor: Actor::System,
        to: OfferStatus::AwaitingShipment,
    },
    TransitionRule {
        from: OfferStatus::AwaitingShipment,
        action: ActionKind::Ship,
        actor: Actor::Brand,
        to: OfferStatus::Shipped,
    },
    TransitionRule {
        from: OfferStatus::Shipped,
        action: ActionKind::ConfirmReceipt,
        actor: Actor::Creator,
        to: OfferStatus::ProductReceived,
    },
    TransitionRule {
        from: OfferStatus::ProductReceived,
        action: ActionKind::StartContent,
        actor: Actor::Creator,
        to: OfferStatus::ContentInProgress,
    },
    TransitionRule {
        from: OfferStatus::ContentInProgress,
        action: ActionKind::SubmitContent,
        actor: Actor::Creator,
        to: OfferStatus::ContentSubmitted,
    },
    TransitionRule {
        from: OfferStatus::ContentSubmitted,
        action: ActionKind::Complete,
        actor: Actor::Brand,
        to: OfferStatus::Completed,
    },
];

/// Look up the rule for an action from a given status.
pub fn rule_for(status: OfferStatus, action: ActionKind) -> Option<&'static TransitionRule> {
    TRANSITIONS
        .iter()
        .find(|rule| rule.from == status && rule.action == action)
}

/// Actions the given actor may take from the given status.
///
/// This is what clients use to decide which controls to show; it replaces
/// per-view switches on the status string.
pub fn allowed_actions(status: OfferStatus, actor: Actor) -> Vec<ActionKind> {
    TRANSITIONS
        .iter()
        .filter(|rule| rule.from == status && rule.actor == actor)
        .map(|rule| rule.action)
        .collect()
}

/// Why a transition was rejected. Wire messages match the observed client
/// error strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("offer is closed")]
    Closed,

    #[error("invalid transition: cannot {action} an offer in status {status}")]
    InvalidTransition {
        status: OfferStatus,
        action: ActionKind,
    },

    #[error("not authorized for this transition: {action} is a {required} action")]
    NotAuthorized {
        action: ActionKind,
        required: Actor,
    },

    #[error("missing required data: {0}")]
    MissingData(&'static str),

    #[error("offer state has changed: expected {expected}, found {actual}")]
    Stale {
        expected: OfferStatus,
        actual: OfferStatus,
    },
}

/// Result of a successful transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    /// The offer with the new status and any payload fields applied.
    pub offer: PrOffer,
    /// Effects to execute after the new state is persisted.
    pub effects: Vec<Effect>,
}

/// Pure transition function.
///
/// Rejection order is deterministic: terminal state, then unknown edge,
/// then actor mismatch, then payload validation. Payload fields and the
/// status always change together in the returned offer - the caller persists
/// both or neither.
pub fn transition(
    offer: &PrOffer,
    actor: Actor,
    action: &OfferAction,
    now: DateTime<Utc>,
) -> Result<TransitionResult, TransitionError> {
    if offer.status.is_terminal() {
        return Err(TransitionError::Closed);
    }

    let kind = action.kind();
    let rule = rule_for(offer.status, kind).ok_or(TransitionError::InvalidTransition {
        status: offer.status,
        action: kind,
    })?;

    if actor != rule.actor {
        return Err(TransitionError::NotAuthorized {
            action: kind,
            required: rule.actor,
        });
    }

    let mut updated = offer.clone();
    updated.status = rule.to;
    let mut effects = Vec::new();

    match action {
        OfferAction::Accept {
            shipping_address,
            size_preferences,
        } => {
            if !shipping_address.is_complete() {
                return Err(TransitionError::MissingData("shipping_address"));
            }
            updated.shipping_address = Some(shipping_address.clone());
            updated.size_preferences = Some(size_preferences.clone());
            updated.accepted_at = Some(now);
            effects.push(Effect::AdvanceLifecycle {
                action: OfferAction::MarkAwaitingShipment,
            });
        }

        OfferAction::Decline { reason } => {
            updated.declined_reason = reason.clone();
            updated.declined_at = Some(now);
            effects.push(Effect::Notify {
                recipient: Actor::Brand,
                notice: Notice::OfferDeclined {
                    offer_id: updated.id,
                    offer_title: updated.offer_title.clone(),
                    reason: reason.clone(),
                },
            });
        }

        OfferAction::MarkAwaitingShipment => {
            if updated.shipping_address.is_none() {
                return Err(TransitionError::MissingData("shipping_address"));
            }
            effects.push(Effect::Notify {
                recipient: Actor::Brand,
                notice: Notice::ReadyToShip {
                    offer_id: updated.id,
                    offer_title: updated.offer_title.clone(),
                },
            });
        }

        OfferAction::Ship { tracking_number } => {
            updated.tracking_number = tracking_number.clone();
            updated.shipped_at = Some(now);
            effects.push(Effect::Notify {
                recipient: Actor::Creator,
                notice: Notice::ProductShipped {
                    offer_id: updated.id,
                    offer_title: updated.offer_title.clone(),
                    tracking_number: tracking_number.clone(),
                },
            });
        }

        OfferAction::ConfirmReceipt => {
            updated.product_received_at = Some(now);
            let due = updated
                .content_deadline()
                .map(|d| d.to_rfc3339())
                .unwrap_or_default();
            effects.push(Effect::Log {
                level: LogLevel::Info,
                message: format!("content deadline clock started, due {}", due),
            });
        }

        OfferAction::StartContent => {
            effects.push(Effect::Log {
                level: LogLevel::Info,
                message: "creator started working on content".to_string(),
            });
        }

        OfferAction::SubmitContent { submissions } => {
            if submissions.is_empty() {
                return Err(TransitionError::MissingData("content_urls"));
            }
            if submissions.iter().any(|s| s.url.trim().is_empty()) {
                return Err(TransitionError::MissingData("content url"));
            }
            for draft in submissions {
                updated.content_submissions.push(ContentSubmission {
                    url: draft.url.clone(),
                    kind: draft.kind.clone(),
                    platform: draft.platform.clone(),
                    submitted_at: now,
                });
            }
            updated.content_submitted_at = Some(now);
            effects.push(Effect::Notify {
                recipient: Actor::Brand,
                notice: Notice::ContentSubmitted {
                    offer_id: updated.id,
                    offer_title: updated.offer_title.clone(),
                    submission_count: submissions.len(),
                },
            });
        }

        OfferAction::Complete => {
            if updated.content_submissions.is_empty() {
                return Err(TransitionError::MissingData("content_submissions"));
            }
            updated.completed_at = Some(now);
            effects.push(Effect::Notify {
                recipient: Actor::Creator,
                notice: Notice::OfferCompleted {
                    offer_id: updated.id,
                    offer_title: updated.offer_title.clone(),
                },
            });
            effects.push(Effect::Notify {
                recipient: Actor::Brand,
                notice: Notice::CollaborationUpsell {
                    offer_id: updated.id,
                },
            });
        }
    }

    Ok(TransitionResult {
        offer: updated,
        effects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offer::{
        BrandId, ContentSubmissionDraft, CreatorId, Deliverable, OfferDraft, ShippingAddress,
        SizePreferences, TrackingNumber,
    };
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn pending_offer() -> PrOffer {
        PrOffer::new(
            OfferDraft {
                brand_id: BrandId(Uuid::new_v4()),
                creator_id: CreatorId(Uuid::new_v4()),
                offer_title: "Spring skincare launch".to_string(),
                products_offered: "Cleanser set".to_string(),
                products_value: None,
                deliverables_required: vec![Deliverable {
                    description: "1 reel".to_string(),
                    platform: Some("instagram".to_string()),
                }],
                mandatory_requirements: None,
                content_deadline_days: 14,
                target_categories: BTreeSet::from(["Skincare & Beauty".to_string()]),
            },
            Utc::now(),
        )
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            recipient: "Dana Lee".to_string(),
            line1: "1 Main St".to_string(),
            line2: None,
            city: "Springfield".to_string(),
            region: None,
            postal_code: "12345".to_string(),
            country: "US".to_string(),
        }
    }

    fn accept_action() -> OfferAction {
        OfferAction::Accept {
            shipping_address: address(),
            size_preferences: SizePreferences::default(),
        }
    }

    fn submission() -> ContentSubmissionDraft {
        ContentSubmissionDraft {
            url: "https://example.com/post/1".to_string(),
            kind: "reel".to_string(),
            platform: "instagram".to_string(),
        }
    }

    /// Apply an action, then drain any AdvanceLifecycle follow-ups the way
    /// the server's apply loop does.
    fn apply_chained(
        offer: &PrOffer,
        actor: Actor,
        action: OfferAction,
    ) -> Result<(PrOffer, Vec<Effect>), TransitionError> {
        let mut all_effects = Vec::new();
        let mut current = offer.clone();
        let mut pending = vec![(actor, action)];
        while let Some((actor, action)) = pending.pop() {
            let result = transition(&current, actor, &action, Utc::now())?;
            current = result.offer;
            for effect in result.effects {
                if let Effect::AdvanceLifecycle { action } = effect {
                    pending.push((Actor::System, action));
                } else {
                    all_effects.push(effect);
                }
            }
        }
        Ok((current, all_effects))
    }

    /// Walk a fresh offer to the given status through the happy path.
    fn offer_in(status: OfferStatus) -> PrOffer {
        let mut offer = pending_offer();
        let steps: &[(Actor, OfferAction)] = &[
            (Actor::Creator, accept_action()),
            (
                Actor::Brand,
                OfferAction::Ship {
                    tracking_number: Some(TrackingNumber::from("1Z999")),
                },
            ),
            (Actor::Creator, OfferAction::ConfirmReceipt),
            (Actor::Creator, OfferAction::StartContent),
            (
                Actor::Creator,
                OfferAction::SubmitContent {
                    submissions: vec![submission()],
                },
            ),
            (Actor::Brand, OfferAction::Complete),
        ];
        for (actor, action) in steps {
            if offer.status == status {
                return offer;
            }
            let (next, _) = apply_chained(&offer, *actor, action.clone()).unwrap();
            offer = next;
        }
        assert_eq!(offer.status, status, "requested status not on happy path");
        offer
    }

    #[test]
    fn test_accept_records_address_and_advances_to_awaiting_shipment() {
        let offer = pending_offer();
        let (updated, effects) = apply_chained(&offer, Actor::Creator, accept_action()).unwrap();

        assert_eq!(updated.status, OfferStatus::AwaitingShipment);
        assert_eq!(updated.shipping_address, Some(address()));
        assert!(updated.size_preferences.is_some());
        assert!(updated.accepted_at.is_some());
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Notify {
                recipient: Actor::Brand,
                notice: Notice::ReadyToShip { .. }
            }
        )));
    }

    #[test]
    fn test_accept_with_incomplete_address_is_missing_data() {
        let offer = pending_offer();
        let mut bad = address();
        bad.postal_code = " ".to_string();
        let result = transition(
            &offer,
            Actor::Creator,
            &OfferAction::Accept {
                shipping_address: bad,
                size_preferences: SizePreferences::default(),
            },
            Utc::now(),
        );
        assert_eq!(
            result.unwrap_err(),
            TransitionError::MissingData("shipping_address")
        );
    }

    #[test]
    fn test_decline_records_reason_and_notifies_brand() {
        let offer = pending_offer();
        let result = transition(
            &offer,
            Actor::Creator,
            &OfferAction::Decline {
                reason: Some("not aligned".to_string()),
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(result.offer.status, OfferStatus::Declined);
        assert_eq!(result.offer.declined_reason.as_deref(), Some("not aligned"));
        assert!(result.offer.declined_at.is_some());
        assert!(matches!(
            &result.effects[0],
            Effect::Notify {
                recipient: Actor::Brand,
                notice: Notice::OfferDeclined { .. }
            }
        ));
    }

    #[test]
    fn test_decline_only_reachable_from_pending() {
        let offer = offer_in(OfferStatus::AwaitingShipment);
        let result = transition(
            &offer,
            Actor::Creator,
            &OfferAction::Decline { reason: None },
            Utc::now(),
        );
        assert_eq!(
            result.unwrap_err(),
            TransitionError::InvalidTransition {
                status: OfferStatus::AwaitingShipment,
                action: ActionKind::Decline,
            }
        );
    }

    #[test]
    fn test_ship_sets_tracking_and_timestamp_atomically() {
        let offer = offer_in(OfferStatus::AwaitingShipment);
        let result = transition(
            &offer,
            Actor::Brand,
            &OfferAction::Ship {
                tracking_number: Some(TrackingNumber::from("1Z999")),
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(result.offer.status, OfferStatus::Shipped);
        assert_eq!(
            result.offer.tracking_number,
            Some(TrackingNumber::from("1Z999"))
        );
        assert!(result.offer.shipped_at.is_some());
    }

    #[test]
    fn test_ship_without_tracking_still_succeeds() {
        let offer = offer_in(OfferStatus::AwaitingShipment);
        let result = transition(
            &offer,
            Actor::Brand,
            &OfferAction::Ship {
                tracking_number: None,
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(result.offer.status, OfferStatus::Shipped);
        assert!(result.offer.tracking_number.is_none());
    }

    #[test]
    fn test_confirm_receipt_starts_deadline_clock() {
        let offer = offer_in(OfferStatus::Shipped);
        let now = Utc::now();
        let result = transition(&offer, Actor::Creator, &OfferAction::ConfirmReceipt, now).unwrap();

        assert_eq!(result.offer.status, OfferStatus::ProductReceived);
        assert_eq!(result.offer.product_received_at, Some(now));
        assert_eq!(
            result.offer.content_deadline(),
            Some(now + chrono::Duration::days(14))
        );
    }

    #[test]
    fn test_submit_content_with_no_urls_is_missing_data() {
        let offer = offer_in(OfferStatus::ContentInProgress);
        let result = transition(
            &offer,
            Actor::Creator,
            &OfferAction::SubmitContent {
                submissions: vec![],
            },
            Utc::now(),
        );
        assert_eq!(
            result.unwrap_err(),
            TransitionError::MissingData("content_urls")
        );
    }

    #[test]
    fn test_submit_content_appends_and_notifies_brand() {
        let offer = offer_in(OfferStatus::ContentInProgress);
        let result = transition(
            &offer,
            Actor::Creator,
            &OfferAction::SubmitContent {
                submissions: vec![submission()],
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(result.offer.status, OfferStatus::ContentSubmitted);
        assert_eq!(result.offer.content_submissions.len(), 1);
        assert!(result.offer.content_submitted_at.is_some());
        assert!(matches!(
            &result.effects[0],
            Effect::Notify {
                recipient: Actor::Brand,
                notice: Notice::ContentSubmitted {
                    submission_count: 1,
                    ..
                }
            }
        ));
    }

    #[test]
    fn test_complete_notifies_creator_and_sends_upsell() {
        let offer = offer_in(OfferStatus::ContentSubmitted);
        let result = transition(&offer, Actor::Brand, &OfferAction::Complete, Utc::now()).unwrap();

        assert_eq!(result.offer.status, OfferStatus::Completed);
        assert!(result.offer.completed_at.is_some());
        assert!(result.effects.iter().any(|e| matches!(
            e,
            Effect::Notify {
                recipient: Actor::Creator,
                notice: Notice::OfferCompleted { .. }
            }
        )));
        assert!(result.effects.iter().any(|e| matches!(
            e,
            Effect::Notify {
                recipient: Actor::Brand,
                notice: Notice::CollaborationUpsell { .. }
            }
        )));
    }

    #[test]
    fn test_terminal_states_reject_everything_as_closed() {
        for terminal in [OfferStatus::Completed, OfferStatus::Declined] {
            let offer = match terminal {
                OfferStatus::Completed => offer_in(OfferStatus::Completed),
                _ => {
                    let (declined, _) = apply_chained(
                        &pending_offer(),
                        Actor::Creator,
                        OfferAction::Decline { reason: None },
                    )
                    .unwrap();
                    declined
                }
            };
            let result = transition(
                &offer,
                Actor::Creator,
                &OfferAction::SubmitContent {
                    submissions: vec![submission()],
                },
                Utc::now(),
            );
            assert_eq!(result.unwrap_err(), TransitionError::Closed);
        }
    }

    #[test]
    fn test_accept_after_decline_is_closed() {
        let (declined, _) = apply_chained(
            &pending_offer(),
            Actor::Creator,
            OfferAction::Decline { reason: None },
        )
        .unwrap();
        let result = transition(&declined, Actor::Creator, &accept_action(), Utc::now());
        assert_eq!(result.unwrap_err(), TransitionError::Closed);
    }

    #[test]
    fn test_out_of_order_transition_is_invalid() {
        let offer = pending_offer();
        let result = transition(
            &offer,
            Actor::Brand,
            &OfferAction::Ship {
                tracking_number: None,
            },
            Utc::now(),
        );
        assert_eq!(
            result.unwrap_err(),
            TransitionError::InvalidTransition {
                status: OfferStatus::Pending,
                action: ActionKind::Ship,
            }
        );
    }

    #[test]
    fn test_actor_mismatch_is_not_authorized() {
        let offer = pending_offer();
        let result = transition(&offer, Actor::Brand, &accept_action(), Utc::now());
        assert_eq!(
            result.unwrap_err(),
            TransitionError::NotAuthorized {
                action: ActionKind::Accept,
                required: Actor::Creator,
            }
        );
    }

    /// Retrying a transition once the offer is already in the target state
    /// must fail with a state error, never re-apply side effects.
    #[test]
    fn test_repeat_transition_is_a_state_error() {
        let shipped = offer_in(OfferStatus::Shipped);
        let result = transition(
            &shipped,
            Actor::Brand,
            &OfferAction::Ship {
                tracking_number: Some(TrackingNumber::from("1Z999")),
            },
            Utc::now(),
        );
        assert!(matches!(
            result.unwrap_err(),
            TransitionError::InvalidTransition { .. }
        ));
    }

    #[test]
    fn test_allowed_actions_follow_the_table() {
        assert_eq!(
            allowed_actions(OfferStatus::Pending, Actor::Creator),
            vec![ActionKind::Accept, ActionKind::Decline]
        );
        assert!(allowed_actions(OfferStatus::Pending, Actor::Brand).is_empty());
        assert_eq!(
            allowed_actions(OfferStatus::AwaitingShipment, Actor::Brand),
            vec![ActionKind::Ship]
        );
        assert!(allowed_actions(OfferStatus::Completed, Actor::Brand).is_empty());
        assert!(allowed_actions(OfferStatus::Declined, Actor::Creator).is_empty());
    }

    #[test]
    fn test_every_status_except_terminals_has_an_outgoing_edge() {
        for status in OfferStatus::ALL {
            let has_edge = TRANSITIONS.iter().any(|rule| rule.from == status);
            assert_eq!(has_edge, !status.is_terminal(), "status {}", status);
        }
    }

    // =========================================================================
    // Property-based tests
    // =========================================================================

    fn arb_actor() -> impl Strategy<Value = Actor> {
        prop_oneof![
            Just(Actor::Brand),
            Just(Actor::Creator),
            Just(Actor::System)
        ]
    }

    fn arb_action() -> impl Strategy<Value = OfferAction> {
        prop_oneof![
            Just(accept_action()),
            any::<Option<String>>().prop_map(|reason| OfferAction::Decline { reason }),
            Just(OfferAction::MarkAwaitingShipment),
            proptest::option::of("[A-Z0-9]{6,10}")
                .prop_map(|t| OfferAction::Ship {
                    tracking_number: t.map(TrackingNumber::from)
                }),
            Just(OfferAction::ConfirmReceipt),
            Just(OfferAction::StartContent),
            proptest::collection::vec(Just(submission()), 0..3)
                .prop_map(|submissions| OfferAction::SubmitContent { submissions }),
            Just(OfferAction::Complete),
        ]
    }

    proptest! {
        /// Property: any sequence of attempted actions observes a valid path
        /// through the transition graph, with no status ever repeated and
        /// terminal states absorbing.
        #[test]
        fn transitions_follow_the_graph(
            attempts in proptest::collection::vec((arb_actor(), arb_action()), 0..30)
        ) {
            let mut offer = pending_offer();
            let mut visited = vec![offer.status];

            for (actor, action) in attempts {
                let was_terminal = offer.status.is_terminal();
                match apply_chained(&offer, actor, action) {
                    Ok((next, _)) => {
                        prop_assert!(!was_terminal, "terminal state allowed a transition");
                        // Every observed hop must be an edge in the table;
                        // accept chains through Accepted in one call.
                        let direct = TRANSITIONS
                            .iter()
                            .any(|r| r.from == offer.status && r.to == next.status);
                        let via_accept = offer.status == OfferStatus::Pending
                            && next.status == OfferStatus::AwaitingShipment;
                        prop_assert!(
                            direct || via_accept,
                            "no edge from {} to {}", offer.status, next.status
                        );
                        if via_accept {
                            visited.push(OfferStatus::Accepted);
                        }
                        prop_assert!(
                            !visited.contains(&next.status),
                            "status {} repeated", next.status
                        );
                        visited.push(next.status);
                        offer = next;
                    }
                    Err(TransitionError::Closed) => {
                        prop_assert!(was_terminal);
                    }
                    Err(_) => {}
                }
            }

            // Declined can only ever follow Pending.
            if let Some(pos) = visited.iter().position(|s| *s == OfferStatus::Declined) {
                prop_assert_eq!(visited[pos - 1], OfferStatus::Pending);
            }
        }
    }
}
