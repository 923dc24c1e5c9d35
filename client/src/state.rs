use std::sync::Arc;

use api_subs::models::sub::{PlanType, Usage, UsageEvent, UserSubscription};
use common::error::{AppError, Res};
use tokio::sync::RwLock;

use crate::{
    api::SubscriptionApi,
    errors::ErrorState,
    flight::{FlightGuard, SingleFlight},
};

/// Subscription and usage are always stored and replaced together.
#[derive(Clone)]
struct Snapshot {
    subscription: Arc<UserSubscription>,
    /// `None` until usage has been fetched for the subscription's owner.
    usage: Option<Usage>,
}

/// The caller's current plan assignment and local usage mirror.
///
/// Loads and upgrades for one caller share a single in-flight slot, so a
/// slow load can never land on top of a newer upgrade.
pub struct SubscriptionState {
    api: Arc<dyn SubscriptionApi>,
    current: RwLock<Option<Snapshot>>,
    errors: ErrorState,
    flights: SingleFlight,
}

impl SubscriptionState {
    pub fn new(api: Arc<dyn SubscriptionApi>, errors: ErrorState) -> Self {
        Self {
            api,
            current: RwLock::new(None),
            errors,
            flights: SingleFlight::new(),
        }
    }

    /// Fetches the caller's subscription and usage.
    ///
    /// An empty `caller_id` returns `Ok(None)` without touching anything.
    /// On failure the previously loaded state is kept and the error is
    /// recorded.
    pub async fn load_subscription(&self, caller_id: &str) -> Res<Option<Arc<UserSubscription>>> {
        let caller_id = caller_id.trim();
        if caller_id.is_empty() {
            log::debug!("No caller id, skipping subscription load");
            return Ok(None);
        }

        let _guard = self.claim(caller_id).ok_or_else(|| {
            AppError::Conflict(format!("Subscription for {} is busy", caller_id))
        })?;
        self.refresh(caller_id).await.map(Some)
    }

    /// Claims the caller's in-flight slot. `None` while a load or an
    /// upgrade for the same caller is outstanding.
    pub(crate) fn claim(&self, caller_id: &str) -> Option<FlightGuard> {
        self.flights.try_acquire(caller_id)
    }

    pub(crate) fn is_busy(&self, caller_id: &str) -> bool {
        self.flights.is_in_flight(caller_id)
    }

    /// Fetch and swap. The caller must hold the slot from `claim`.
    pub(crate) async fn refresh(&self, caller_id: &str) -> Res<Arc<UserSubscription>> {
        let fetched: Res<(UserSubscription, Usage)> = async {
            let subscription = self.api.fetch_subscription(caller_id).await?;
            let usage = self.api.fetch_usage(caller_id).await?;
            Ok((subscription, usage))
        }
        .await;

        match fetched {
            Ok((subscription, usage)) => {
                let subscription = Arc::new(subscription);
                *self.current.write().await = Some(Snapshot {
                    subscription: Arc::clone(&subscription),
                    usage: Some(usage),
                });
                self.errors.clear().await;
                log::info!(
                    "Loaded {} subscription for {}",
                    subscription.plan_type,
                    caller_id
                );
                Ok(subscription)
            }
            Err(e) => {
                self.errors.record("Failed to load subscription", &e).await;
                Err(e)
            }
        }
    }

    pub async fn current(&self) -> Option<Arc<UserSubscription>> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|snapshot| Arc::clone(&snapshot.subscription))
    }

    /// The loaded subscription, if it belongs to `caller_id`.
    pub(crate) async fn current_for(&self, caller_id: &str) -> Option<Arc<UserSubscription>> {
        self.current()
            .await
            .filter(|subscription| subscription.user_id == caller_id)
    }

    pub async fn current_tier(&self) -> Option<PlanType> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|snapshot| snapshot.subscription.plan_type)
    }

    /// Usage mirror; zero when nothing is known.
    pub async fn usage(&self) -> Usage {
        self.known_usage().await.unwrap_or_default()
    }

    /// Usage mirror, or `None` when it was never fetched for the loaded
    /// subscription.
    pub async fn known_usage(&self) -> Option<Usage> {
        self.current
            .read()
            .await
            .as_ref()
            .and_then(|snapshot| snapshot.usage)
    }

    pub async fn is_on_tier(&self, tier: PlanType) -> bool {
        self.current_tier().await == Some(tier)
    }

    /// True on Basic and when no subscription is loaded.
    pub async fn is_basic_user(&self) -> bool {
        matches!(self.current_tier().await, None | Some(PlanType::Basic))
    }

    /// Swaps in `subscription` as a unit. Usage carries over only when the
    /// new record belongs to the same caller; otherwise it becomes unknown.
    pub(crate) async fn replace_subscription(
        &self,
        subscription: UserSubscription,
    ) -> Arc<UserSubscription> {
        let subscription = Arc::new(subscription);
        let mut current = self.current.write().await;
        let usage = current
            .as_ref()
            .filter(|snapshot| snapshot.subscription.user_id == subscription.user_id)
            .and_then(|snapshot| snapshot.usage);
        *current = Some(Snapshot {
            subscription: Arc::clone(&subscription),
            usage,
        });
        subscription
    }

    /// Advances the local mirror after the service accepted `event`.
    /// Ignored when the loaded subscription belongs to someone else or its
    /// usage is unknown.
    pub(crate) async fn record_usage(&self, caller_id: &str, event: UsageEvent) -> Option<Usage> {
        let mut current = self.current.write().await;
        let usage = current
            .as_mut()
            .filter(|snapshot| snapshot.subscription.user_id == caller_id)?
            .usage
            .as_mut()?;
        match event {
            UsageEvent::LinkCreated => usage.links_created += 1,
            UsageEvent::LinkClicked => usage.clicks_this_month += 1,
        }
        Some(*usage)
    }
}
