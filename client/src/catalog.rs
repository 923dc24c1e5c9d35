use std::sync::Arc;

use api_subs::models::sub::{PlanLimits, PlanType, SubscriptionPlan};
use common::error::{AppError, Res};
use tokio::sync::RwLock;

use crate::{api::SubscriptionApi, errors::ErrorState, flight::SingleFlight};

const LOAD_KEY: &str = "plans";

/// Session-wide, read-only snapshot of the plans on offer.
pub struct PlanCatalog {
    api: Arc<dyn SubscriptionApi>,
    plans: RwLock<Arc<Vec<SubscriptionPlan>>>,
    errors: ErrorState,
    flights: SingleFlight,
}

impl PlanCatalog {
    pub fn new(api: Arc<dyn SubscriptionApi>, errors: ErrorState) -> Self {
        Self {
            api,
            plans: RwLock::new(Arc::new(Vec::new())),
            errors,
            flights: SingleFlight::new(),
        }
    }

    /// Fetches the plan list and swaps it in whole. On failure the previous
    /// catalog stays and the error is recorded. Returns the number of plans.
    pub async fn load_plans(&self) -> Res<usize> {
        let _guard = self
            .flights
            .try_acquire(LOAD_KEY)
            .ok_or_else(|| AppError::Conflict("Plans are already loading".to_string()))?;

        match self.api.fetch_plans().await {
            Ok(plans) => {
                let count = plans.len();
                *self.plans.write().await = Arc::new(plans);
                self.errors.clear().await;
                log::info!("Loaded {} subscription plans", count);
                Ok(count)
            }
            Err(e) => {
                self.errors.record("Failed to load plans", &e).await;
                Err(e)
            }
        }
    }

    pub async fn plans(&self) -> Arc<Vec<SubscriptionPlan>> {
        Arc::clone(&*self.plans.read().await)
    }

    pub async fn find_plan(&self, tier: PlanType) -> Option<SubscriptionPlan> {
        self.plans
            .read()
            .await
            .iter()
            .find(|plan| plan.plan_type == tier)
            .cloned()
    }

    /// Display features of `tier`; empty when the tier is not in the catalog.
    pub async fn plan_features(&self, tier: PlanType) -> Vec<String> {
        self.find_plan(tier)
            .await
            .map(|plan| plan.features)
            .unwrap_or_default()
    }

    pub async fn plan_limits(&self, tier: PlanType) -> Option<PlanLimits> {
        self.find_plan(tier).await.map(|plan| plan.limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, plans};

    #[tokio::test]
    async fn find_plan_after_load() {
        let api = Arc::new(FakeApi::new(plans(5, 1000)));
        let catalog = PlanCatalog::new(api, ErrorState::new());

        assert!(catalog.find_plan(PlanType::Basic).await.is_none());
        assert_eq!(catalog.load_plans().await.unwrap(), 2);

        for plan in plans(5, 1000) {
            let found = catalog.find_plan(plan.plan_type).await.unwrap();
            assert_eq!(found.limits, plan.limits);
            assert_eq!(found.features, plan.features);
        }
        assert_eq!(
            catalog.plan_limits(PlanType::Pro).await.unwrap().max_links,
            1000
        );
    }

    #[tokio::test]
    async fn missing_tier_is_not_found() {
        let only_basic = plans(5, 1000)
            .into_iter()
            .filter(|p| p.plan_type == PlanType::Basic)
            .collect();
        let catalog = PlanCatalog::new(Arc::new(FakeApi::new(only_basic)), ErrorState::new());
        catalog.load_plans().await.unwrap();

        assert!(catalog.find_plan(PlanType::Pro).await.is_none());
        assert!(catalog.plan_features(PlanType::Pro).await.is_empty());
        assert!(catalog.plan_limits(PlanType::Pro).await.is_none());
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_catalog() {
        let api = Arc::new(FakeApi::new(plans(5, 1000)));
        let errors = ErrorState::new();
        let catalog = PlanCatalog::new(api.clone(), errors.clone());
        catalog.load_plans().await.unwrap();
        let before = catalog.plans().await;

        api.set_failing(true);
        assert!(catalog.load_plans().await.is_err());
        assert_eq!(catalog.plans().await, before);
        assert!(errors.get().await.is_some());

        api.set_failing(false);
        catalog.load_plans().await.unwrap();
        assert!(errors.get().await.is_none());
    }

    #[tokio::test]
    async fn reload_replaces_rather_than_merges() {
        let api = Arc::new(FakeApi::new(plans(5, 1000)));
        let catalog = PlanCatalog::new(api.clone(), ErrorState::new());
        catalog.load_plans().await.unwrap();

        api.set_plans(plans(5, 1000).into_iter().take(1).collect());
        assert_eq!(catalog.load_plans().await.unwrap(), 1);
        assert_eq!(catalog.plans().await.len(), 1);
    }
}
