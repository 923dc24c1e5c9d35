use std::sync::Arc;

use api_subs::{
    dtos::sub::UpgradeForm,
    models::sub::{BillingCycle, PlanType, UserSubscription},
};
use common::error::{AppError, Res};
use dashmap::DashMap;

use crate::{api::SubscriptionApi, errors::ErrorState, state::SubscriptionState};

/// Per-caller upgrade state: `Idle -> Upgrading -> Active | Failed`.
///
/// `Active` and `Failed` are terminal for one attempt; a new upgrade may
/// start from either, exactly as from `Idle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeStatus {
    Idle,
    Upgrading { target: PlanType },
    Active { plan: PlanType },
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub enum UpgradeOutcome {
    /// The service confirmed the move and the new subscription is in place.
    Upgraded(Arc<UserSubscription>),
    /// The caller is already on the requested tier; nothing was sent.
    AlreadyOnTier(Arc<UserSubscription>),
    /// No caller id was given; nothing was sent.
    NoCaller,
}

pub struct UpgradeFlow {
    api: Arc<dyn SubscriptionApi>,
    state: Arc<SubscriptionState>,
    errors: ErrorState,
    statuses: DashMap<String, UpgradeStatus>,
}

impl UpgradeFlow {
    pub fn new(
        api: Arc<dyn SubscriptionApi>,
        state: Arc<SubscriptionState>,
        errors: ErrorState,
    ) -> Self {
        Self {
            api,
            state,
            errors,
            statuses: DashMap::new(),
        }
    }

    pub fn status(&self, caller_id: &str) -> UpgradeStatus {
        match self.statuses.get(caller_id).map(|s| s.value().clone()) {
            // an attempt whose future was dropped never reached a verdict
            Some(UpgradeStatus::Upgrading { .. }) if !self.state.is_busy(caller_id) => {
                UpgradeStatus::Idle
            }
            Some(status) => status,
            None => UpgradeStatus::Idle,
        }
    }

    /// Moves `caller_id` to `target`.
    ///
    /// A second call for the same caller while an upgrade or a subscription
    /// load is outstanding fails with `AppError::Conflict`. When nothing is
    /// loaded for the caller, the subscription and usage are fetched first
    /// so a same-tier request never reaches the service. On a remote failure
    /// the previous subscription is left exactly as it was.
    pub async fn upgrade(
        &self,
        caller_id: &str,
        target: PlanType,
        payment_method: &str,
        billing_cycle: BillingCycle,
    ) -> Res<UpgradeOutcome> {
        let caller_id = caller_id.trim();
        if caller_id.is_empty() {
            log::debug!("No caller id, skipping upgrade");
            return Ok(UpgradeOutcome::NoCaller);
        }

        let _guard = self.state.claim(caller_id).ok_or_else(|| {
            log::warn!("Rejected concurrent upgrade for {}", caller_id);
            AppError::Conflict(format!("An upgrade is already in progress for {}", caller_id))
        })?;

        let current = match self.state.current_for(caller_id).await {
            Some(current) => current,
            None => match self.state.refresh(caller_id).await {
                Ok(current) => current,
                Err(e) => {
                    self.finish(caller_id, UpgradeStatus::Failed {
                        reason: e.display_message(),
                    });
                    return Err(e);
                }
            },
        };
        if current.plan_type == target {
            log::info!("{} is already on the {} plan", caller_id, target);
            return Ok(UpgradeOutcome::AlreadyOnTier(current));
        }

        self.finish(caller_id, UpgradeStatus::Upgrading { target });
        let form = UpgradeForm {
            user_id: caller_id.to_string(),
            plan_type: target,
            payment_method: payment_method.to_string(),
            billing_cycle,
        };

        match self.api.upgrade(&form).await {
            Ok(subscription) => {
                let subscription = self.state.replace_subscription(subscription).await;
                self.finish(caller_id, UpgradeStatus::Active {
                    plan: subscription.plan_type,
                });
                self.errors.clear().await;
                log::info!("Upgraded {} to {}", caller_id, subscription.plan_type);
                Ok(UpgradeOutcome::Upgraded(subscription))
            }
            Err(e) => {
                self.finish(caller_id, UpgradeStatus::Failed {
                    reason: e.display_message(),
                });
                self.errors.record("Failed to upgrade subscription", &e).await;
                Err(e)
            }
        }
    }

    /// Stores `status` for `caller_id` and forgets settled attempts of
    /// other callers.
    fn finish(&self, caller_id: &str, status: UpgradeStatus) {
        self.statuses
            .retain(|caller, _| caller == caller_id || self.state.is_busy(caller));
        self.statuses.insert(caller_id.to_string(), status);
    }
}
