//! Actions that drive offer lifecycle transitions.
//!
//! Actions are the inputs to the pure transition function: what a party
//! asked the system to do, with whatever payload that step requires.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::offer::{ContentSubmissionDraft, ShippingAddress, SizePreferences, TrackingNumber};

/// Who is performing an action.
///
/// `System` covers transitions the service chains itself (the advance to
/// awaiting-shipment after a successful accept); it is never derivable from
/// a client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Brand,
    Creator,
    System,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Brand => "brand",
            Self::Creator => "creator",
            Self::System => "system",
        };
        write!(f, "{}", name)
    }
}

/// Payload-free identity of an action, used by the transition table and in
/// error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Accept,
    Decline,
    MarkAwaitingShipment,
    Ship,
    ConfirmReceipt,
    StartContent,
    SubmitContent,
    Complete,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Decline => "decline",
            Self::MarkAwaitingShipment => "mark_awaiting_shipment",
            Self::Ship => "ship",
            Self::ConfirmReceipt => "confirm_receipt",
            Self::StartContent => "start_content",
            Self::SubmitContent => "submit_content",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A lifecycle action with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferAction {
    /// Creator accepts; address and sizes are supplied atomically with the
    /// transition.
    Accept {
        shipping_address: ShippingAddress,
        size_preferences: SizePreferences,
    },

    /// Creator declines a pending offer.
    Decline { reason: Option<String> },

    /// System advance once the address is on file; chained after `Accept`.
    MarkAwaitingShipment,

    /// Brand marks the product shipped, optionally with a tracking number.
    Ship {
        tracking_number: Option<TrackingNumber>,
    },

    /// Creator confirms the product arrived; starts the content-deadline
    /// clock.
    ConfirmReceipt,

    /// Creator flags that content work has begun. Informational only.
    StartContent,

    /// Creator submits content; at least one entry is required.
    SubmitContent {
        submissions: Vec<ContentSubmissionDraft>,
    },

    /// Brand signs off on the submitted content. Terminal.
    Complete,
}

impl OfferAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Accept { .. } => ActionKind::Accept,
            Self::Decline { .. } => ActionKind::Decline,
            Self::MarkAwaitingShipment => ActionKind::MarkAwaitingShipment,
            Self::Ship { .. } => ActionKind::Ship,
            Self::ConfirmReceipt => ActionKind::ConfirmReceipt,
            Self::StartContent => ActionKind::StartContent,
            Self::SubmitContent { .. } => ActionKind::SubmitContent,
            Self::Complete => ActionKind::Complete,
        }
    }

    /// A summary of the action suitable for logging.
    ///
    /// Avoids logging address and sizing details.
    pub fn log_summary(&self) -> String {
        match self {
            Self::Accept { .. } => "Accept { address: <redacted> }".to_string(),
            Self::Decline { reason } => {
                format!("Decline {{ reason_given: {} }}", reason.is_some())
            }
            Self::MarkAwaitingShipment => "MarkAwaitingShipment".to_string(),
            Self::Ship { tracking_number } => format!(
                "Ship {{ tracking: {} }}",
                tracking_number
                    .as_ref()
                    .map(|t| t.0.as_str())
                    .unwrap_or("none")
            ),
            Self::ConfirmReceipt => "ConfirmReceipt".to_string(),
            Self::StartContent => "StartContent".to_string(),
            Self::SubmitContent { submissions } => {
                format!("SubmitContent {{ count: {} }}", submissions.len())
            }
            Self::Complete => "Complete".to_string(),
        }
    }
}
