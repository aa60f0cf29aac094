//! Offer lifecycle status and its presentation view.
//!
//! The status enum is the single source of truth for where an offer sits in
//! its lifecycle. Wire names match the snake_case strings the REST payloads
//! carry. `status_view` is the one shared presentation lookup; callers must
//! not switch on status strings themselves.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a PR offer.
///
/// The progression is linear from `Pending` through `Completed`, with
/// `Declined` as the only branch (reachable solely from `Pending`).
/// `Completed` and `Declined` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Accepted,
    AwaitingShipment,
    Shipped,
    ProductReceived,
    ContentInProgress,
    ContentSubmitted,
    Completed,
    Declined,
}

impl OfferStatus {
    /// All statuses in lifecycle order, terminal states last.
    pub const ALL: [OfferStatus; 9] = [
        OfferStatus::Pending,
        OfferStatus::Accepted,
        OfferStatus::AwaitingShipment,
        OfferStatus::Shipped,
        OfferStatus::ProductReceived,
        OfferStatus::ContentInProgress,
        OfferStatus::ContentSubmitted,
        OfferStatus::Completed,
        OfferStatus::Declined,
    ];

    /// The wire name for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::AwaitingShipment => "awaiting_shipment",
            Self::Shipped => "shipped",
            Self::ProductReceived => "product_received",
            Self::ContentInProgress => "content_in_progress",
            Self::ContentSubmitted => "content_submitted",
            Self::Completed => "completed",
            Self::Declined => "declined",
        }
    }

    /// Parse from a wire status string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "awaiting_shipment" => Some(Self::AwaitingShipment),
            "shipped" => Some(Self::Shipped),
            "product_received" => Some(Self::ProductReceived),
            "content_in_progress" => Some(Self::ContentInProgress),
            "content_submitted" => Some(Self::ContentSubmitted),
            "completed" => Some(Self::Completed),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }

    /// Returns true if no further transition is possible from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Declined)
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Presentation metadata for a status: label, color token, icon name.
///
/// Color and icon names are the design-system tokens the clients render;
/// they are data here so every surface shows the same thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub label: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
}

/// The shared status-to-presentation lookup.
pub fn status_view(status: OfferStatus) -> StatusView {
    match status {
        OfferStatus::Pending => StatusView {
            label: "Pending",
            color: "orange",
            icon: "clock-circle",
        },
        OfferStatus::Accepted => StatusView {
            label: "Accepted",
            color: "blue",
            icon: "check-circle",
        },
        OfferStatus::AwaitingShipment => StatusView {
            label: "Awaiting Shipment",
            color: "gold",
            icon: "inbox",
        },
        OfferStatus::Shipped => StatusView {
            label: "Shipped",
            color: "geekblue",
            icon: "car",
        },
        OfferStatus::ProductReceived => StatusView {
            label: "Product Received",
            color: "cyan",
            icon: "gift",
        },
        OfferStatus::ContentInProgress => StatusView {
            label: "Content In Progress",
            color: "purple",
            icon: "edit",
        },
        OfferStatus::ContentSubmitted => StatusView {
            label: "Content Submitted",
            color: "magenta",
            icon: "file-done",
        },
        OfferStatus::Completed => StatusView {
            label: "Completed",
            color: "green",
            icon: "trophy",
        },
        OfferStatus::Declined => StatusView {
            label: "Declined",
            color: "red",
            icon: "close-circle",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_all_statuses() {
        for status in OfferStatus::ALL {
            assert_eq!(OfferStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OfferStatus::parse("unknown"), None);
    }

    #[test]
    fn test_only_completed_and_declined_are_terminal() {
        let terminal: Vec<_> = OfferStatus::ALL
            .iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, [&OfferStatus::Completed, &OfferStatus::Declined]);
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&OfferStatus::AwaitingShipment).unwrap();
        assert_eq!(json, "\"awaiting_shipment\"");
        let back: OfferStatus = serde_json::from_str("\"product_received\"").unwrap();
        assert_eq!(back, OfferStatus::ProductReceived);
    }

    #[test]
    fn test_status_view_is_distinct_per_status() {
        let mut labels = std::collections::HashSet::new();
        for status in OfferStatus::ALL {
            assert!(labels.insert(status_view(status).label));
        }
    }
}
