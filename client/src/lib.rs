//! Client side of the subscription service: plan catalog, the caller's
//! subscription, limit checks and the upgrade flow.

pub mod api;
pub mod catalog;
pub mod errors;
pub mod evaluator;
pub mod flight;
pub mod session;
pub mod state;
pub mod upgrade;

#[cfg(test)]
mod testing;

pub use api::{HttpSubscriptionApi, SubscriptionApi};
pub use session::Session;
pub use upgrade::{UpgradeOutcome, UpgradeStatus};
