//! Domain model and lifecycle rules for PR-offer collaborations.
//!
//! This crate is pure: no I/O, no clocks (callers pass `now`), no storage.
//! The server crate persists offers and interprets effects; the CLI drives
//! the server over HTTP.

pub mod lifecycle;
pub mod matching;
pub mod offer;
pub mod status;

pub use lifecycle::{
    allowed_actions, transition, ActionKind, Actor, Effect, LogLevel, Notice, OfferAction,
    TransitionError, TransitionResult, TransitionRule, TRANSITIONS,
};
pub use matching::{matched_creators, CreatorProfile, MatchedCreators};
pub use offer::{
    BrandId, ContentSubmission, ContentSubmissionDraft, CreatorId, Deliverable, DraftError,
    OfferDraft, OfferId, PrOffer, ShippingAddress, SizePreferences, TrackingNumber,
};
pub use status::{status_view, OfferStatus, StatusView};
