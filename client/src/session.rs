use std::sync::Arc;

use api_subs::models::sub::UserSubscription;
use common::{env_config::ClientConfig, error::Res};

use crate::{
    api::{HttpSubscriptionApi, SubscriptionApi},
    catalog::PlanCatalog,
    errors::ErrorState,
    evaluator::LimitEvaluator,
    state::SubscriptionState,
    upgrade::UpgradeFlow,
};

/// Everything a signed-in view needs, wired to one API and one error slot.
pub struct Session {
    pub catalog: Arc<PlanCatalog>,
    pub subscription: Arc<SubscriptionState>,
    pub limits: Arc<LimitEvaluator>,
    pub upgrades: Arc<UpgradeFlow>,
    errors: ErrorState,
}

impl Session {
    pub fn new(api: Arc<dyn SubscriptionApi>) -> Self {
        let errors = ErrorState::new();
        let catalog = Arc::new(PlanCatalog::new(api.clone(), errors.clone()));
        let subscription = Arc::new(SubscriptionState::new(api.clone(), errors.clone()));
        let limits = Arc::new(LimitEvaluator::new(
            api.clone(),
            catalog.clone(),
            subscription.clone(),
            errors.clone(),
        ));
        let upgrades = Arc::new(UpgradeFlow::new(api, subscription.clone(), errors.clone()));

        Session {
            catalog,
            subscription,
            limits,
            upgrades,
            errors,
        }
    }

    pub fn connect(config: ClientConfig) -> Res<Self> {
        log::info!("Connecting to subscription API at {}", config.backend_url);
        let api = HttpSubscriptionApi::new(config)?;
        Ok(Self::new(Arc::new(api)))
    }

    /// Loads the catalog, then the caller's subscription.
    pub async fn start(&self, caller_id: &str) -> Res<Option<Arc<UserSubscription>>> {
        self.catalog.load_plans().await?;
        self.subscription.load_subscription(caller_id).await
    }

    pub async fn last_error(&self) -> Option<String> {
        self.errors.get().await
    }

    pub async fn clear_error(&self) {
        self.errors.clear().await;
    }
}
