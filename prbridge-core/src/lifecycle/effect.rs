//! Effects (side effects as data).
//!
//! Effects describe what should happen as a result of a committed transition.
//! They are pure data - the server's interpreter executes them after the
//! status swap has been persisted. This separation keeps the transition
//! function testable without any I/O.

use serde::{Deserialize, Serialize};

use crate::lifecycle::action::{Actor, OfferAction};
use crate::offer::{OfferId, TrackingNumber};

/// All effects a transition can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Notify one side of the offer about what just happened.
    Notify { recipient: Actor, notice: Notice },

    /// Apply a follow-up system action in the same apply loop.
    ///
    /// Used for the `accepted -> awaiting_shipment` advance, which has no
    /// endpoint of its own: the client sees a single atomic accept.
    AdvanceLifecycle { action: OfferAction },

    /// Log a message (for debugging/tracing).
    Log { level: LogLevel, message: String },
}

/// Log level for `Effect::Log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Content of a counterparty notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Creator accepted and the address is on file: ship the product.
    ReadyToShip {
        offer_id: OfferId,
        offer_title: String,
    },

    /// Creator declined a pending offer.
    OfferDeclined {
        offer_id: OfferId,
        offer_title: String,
        reason: Option<String>,
    },

    /// Brand marked the product shipped.
    ProductShipped {
        offer_id: OfferId,
        offer_title: String,
        tracking_number: Option<TrackingNumber>,
    },

    /// Creator submitted content; it is now visible to the brand.
    ContentSubmitted {
        offer_id: OfferId,
        offer_title: String,
        submission_count: usize,
    },

    /// Brand signed off; the collaboration is done.
    OfferCompleted {
        offer_id: OfferId,
        offer_title: String,
    },

    /// Completion CTA: suggest converting the collaboration into a paid one.
    CollaborationUpsell { offer_id: OfferId },
}

impl Notice {
    /// One-line human-readable summary, used by notifiers and logging.
    pub fn summary(&self) -> String {
        match self {
            Self::ReadyToShip { offer_title, .. } => {
                format!("\"{}\" was accepted - ship the product", offer_title)
            }
            Self::OfferDeclined {
                offer_title,
                reason,
                ..
            } => match reason {
                Some(reason) => format!("\"{}\" was declined: {}", offer_title, reason),
                None => format!("\"{}\" was declined", offer_title),
            },
            Self::ProductShipped {
                offer_title,
                tracking_number,
                ..
            } => match tracking_number {
                Some(tracking) => {
                    format!("\"{}\" shipped (tracking {})", offer_title, tracking)
                }
                None => format!("\"{}\" shipped", offer_title),
            },
            Self::ContentSubmitted {
                offer_title,
                submission_count,
                ..
            } => format!(
                "{} content submission(s) for \"{}\" are ready for review",
                submission_count, offer_title
            ),
            Self::OfferCompleted { offer_title, .. } => {
                format!("\"{}\" is complete", offer_title)
            }
            Self::CollaborationUpsell { .. } => {
                "Keep the momentum going with a paid collaboration".to_string()
            }
        }
    }
}
