//! Offer lifecycle service.
//!
//! The server owns the offer lifecycle controller: every status transition
//! is validated by the pure transition function in `prbridge-core`,
//! persisted with a compare-and-swap on the prior status, and only then
//! allowed to produce side effects.

pub mod config;
pub mod error;
pub mod interpreter;
pub mod notify;
pub mod payments;
pub mod repository;
pub mod routes;
pub mod session;
pub mod status;
pub mod store;

pub use error::ApiError;
pub use routes::app_router;
pub use store::OfferStore;

use payments::StripeClient;
use session::SessionStore;

/// Shared application state handed to every handler.
pub struct AppState {
    pub store: OfferStore,
    pub sessions: SessionStore,
    /// Present only when a Stripe key is configured; payment endpoints
    /// return 503 otherwise.
    pub stripe: Option<StripeClient>,
}
