//! Status dashboard data: offers per lifecycle state.

use serde::Serialize;

use prbridge_core::{status_view, OfferStatus, PrOffer};

/// Summary served by `GET /status`.
#[derive(Debug, Serialize)]
pub struct StatusData {
    pub total: usize,
    pub statuses: Vec<StatusCount>,
}

#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: OfferStatus,
    pub label: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
    pub count: usize,
}

impl StatusData {
    pub fn from_offers(offers: &[PrOffer]) -> Self {
        let statuses = OfferStatus::ALL
            .iter()
            .map(|&status| {
                let view = status_view(status);
                StatusCount {
                    status,
                    label: view.label,
                    color: view.color,
                    icon: view.icon,
                    count: offers.iter().filter(|o| o.status == status).count(),
                }
            })
            .collect();
        Self {
            total: offers.len(),
            statuses,
        }
    }
}
