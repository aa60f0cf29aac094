//! Offer lifecycle state machine.
//!
//! The design separates:
//! - **Actions**: what a party asked for (`OfferAction`)
//! - **Effects**: what to do after the change commits (`Effect`)
//! - **Transition**: pure function `(offer, actor, action) -> (offer, effects)`
//!
//! The server's store persists the transition result with a compare-and-swap
//! on the prior status, then interprets the effects.

pub mod action;
pub mod effect;
pub mod transition;

pub use action::*;
pub use effect::*;
pub use transition::*;
