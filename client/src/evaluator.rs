use std::sync::Arc;

use api_subs::models::sub::{LimitAction, LimitCheck, PlanLimits, Usage, UsageEvent};
use common::error::Res;

use crate::{
    api::SubscriptionApi, catalog::PlanCatalog, errors::ErrorState, state::SubscriptionState,
};

/// Answers "may the caller do this?" and reports completed actions.
///
/// The service is the authority for `check_limits`; the cached catalog and
/// usage mirror only back the local helpers.
pub struct LimitEvaluator {
    api: Arc<dyn SubscriptionApi>,
    catalog: Arc<PlanCatalog>,
    state: Arc<SubscriptionState>,
    errors: ErrorState,
}

impl LimitEvaluator {
    pub fn new(
        api: Arc<dyn SubscriptionApi>,
        catalog: Arc<PlanCatalog>,
        state: Arc<SubscriptionState>,
        errors: ErrorState,
    ) -> Self {
        Self {
            api,
            catalog,
            state,
            errors,
        }
    }

    pub async fn check_limits(&self, caller_id: &str, action: &str) -> LimitCheck {
        let action = match action.parse::<LimitAction>() {
            Ok(action) => action,
            Err(_) => {
                log::warn!("Refusing limit check for unsupported action '{}'", action);
                return LimitCheck::denied(format!("Unsupported action: {}", action));
            }
        };

        let caller_id = caller_id.trim();
        if caller_id.is_empty() {
            return LimitCheck::denied("Sign in to use this feature");
        }

        match self.api.validate_limits(caller_id, action).await {
            Ok(check) => check,
            Err(e) => {
                self.errors.record("Error checking plan limits", &e).await;
                LimitCheck::denied("Error checking limits")
            }
        }
    }

    /// Reports a completed action. The local mirror only moves once the
    /// service has accepted the event; a failure never undoes the action
    /// that triggered it.
    ///
    /// Returns the updated mirror, or `None` when nothing was mirrored
    /// (empty caller, or no subscription loaded for this caller).
    pub async fn increment_usage(&self, caller_id: &str, event: &str) -> Res<Option<Usage>> {
        let event = match event.parse::<UsageEvent>() {
            Ok(event) => event,
            Err(e) => {
                self.errors.record("Refusing usage report", &e).await;
                return Err(e);
            }
        };

        let caller_id = caller_id.trim();
        if caller_id.is_empty() {
            log::debug!("No caller id, skipping usage report");
            return Ok(None);
        }

        match self.api.increment_usage(caller_id, event).await {
            Ok(()) => Ok(self.state.record_usage(caller_id, event).await),
            Err(e) => {
                self.errors.record("Error incrementing usage", &e).await;
                Err(e)
            }
        }
    }

    /// Limits of the current plan. `None` when nothing is loaded or the tier
    /// is missing from the catalog.
    pub async fn current_limits(&self) -> Option<PlanLimits> {
        let tier = self.state.current_tier().await?;
        let limits = self.catalog.plan_limits(tier).await;
        if limits.is_none() {
            log::warn!("Plan '{}' is not in the catalog, treating as no access", tier);
        }
        limits
    }

    pub async fn has_feature(&self, feature: &str) -> bool {
        self.current_limits()
            .await
            .is_some_and(|limits| limits.has_feature(feature))
    }

    /// Evaluates `action` against cached limits and the usage mirror.
    /// Denied while usage for the loaded subscription is unknown.
    pub async fn local_check(&self, action: &str) -> LimitCheck {
        let action = match action.parse::<LimitAction>() {
            Ok(action) => action,
            Err(_) => return LimitCheck::denied(format!("Unsupported action: {}", action)),
        };
        let Some(tier) = self.state.current_tier().await else {
            return LimitCheck::denied("No subscription loaded");
        };
        let Some(limits) = self.current_limits().await else {
            return LimitCheck::denied(format!("Plan '{}' is unavailable", tier));
        };
        let Some(usage) = self.state.known_usage().await else {
            return LimitCheck::denied("Usage is not loaded");
        };
        limits.check(tier, action, &usage)
    }
}
