use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use api_subs::{
    dtos::sub::UpgradeForm,
    models::sub::{
        BillingCycle, LimitAction, LimitCheck, PlanType, SubscriptionPlan, SubscriptionStatus,
        Usage, UsageEvent, UserSubscription,
    },
    services::sub::default_plans,
};
use async_trait::async_trait;
use chrono::Utc;
use common::error::{AppError, Res};
use tokio::sync::Notify;

use crate::api::SubscriptionApi;

/// The stock plans with `max_links` overridden per tier.
pub fn plans(basic_max_links: u64, pro_max_links: u64) -> Vec<SubscriptionPlan> {
    default_plans()
        .into_iter()
        .map(|mut plan| {
            plan.limits.max_links = match plan.plan_type {
                PlanType::Basic => basic_max_links,
                PlanType::Pro => pro_max_links,
            };
            plan
        })
        .collect()
}

fn basic_subscription(user_id: &str) -> UserSubscription {
    let now = Utc::now();
    UserSubscription {
        id: format!("sub-{}", user_id),
        user_id: user_id.to_string(),
        plan_type: PlanType::Basic,
        billing_cycle: BillingCycle::Monthly,
        status: SubscriptionStatus::Active,
        plan_expires: None,
        auto_renew: true,
        created_at: now,
        updated_at: now,
    }
}

/// In-process `SubscriptionApi` with switchable failures and call counting.
#[derive(Default)]
pub struct FakeApi {
    plans: Mutex<Vec<SubscriptionPlan>>,
    subscriptions: Mutex<HashMap<String, UserSubscription>>,
    usage: Mutex<HashMap<String, Usage>>,
    failing: AtomicBool,
    calls: AtomicUsize,
    upgrade_calls: AtomicUsize,
    upgrade_gate: Option<Arc<Notify>>,
    usage_gate: Option<Arc<Notify>>,
}

impl FakeApi {
    pub fn new(plans: Vec<SubscriptionPlan>) -> Self {
        Self {
            plans: Mutex::new(plans),
            ..Self::default()
        }
    }

    /// Makes every upgrade wait for a notification on the returned handle.
    pub fn hold_upgrades(&mut self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.upgrade_gate = Some(gate.clone());
        gate
    }

    /// Makes every usage fetch wait for a notification on the returned handle.
    pub fn hold_usage_fetches(&mut self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.usage_gate = Some(gate.clone());
        gate
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_plans(&self, plans: Vec<SubscriptionPlan>) {
        *self.plans.lock().unwrap() = plans;
    }

    pub fn set_links_created(&self, user_id: &str, links_created: u64) {
        self.usage
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .links_created = links_created;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn upgrade_calls(&self) -> usize {
        self.upgrade_calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Res<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Upstream {
                status: 500,
                detail: "Subscription service unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn subscription(&self, user_id: &str) -> UserSubscription {
        self.subscriptions
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_insert_with(|| basic_subscription(user_id))
            .clone()
    }

    fn usage_of(&self, user_id: &str) -> Usage {
        self.usage
            .lock()
            .unwrap()
            .get(user_id)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SubscriptionApi for FakeApi {
    async fn fetch_plans(&self) -> Res<Vec<SubscriptionPlan>> {
        self.enter()?;
        Ok(self.plans.lock().unwrap().clone())
    }

    async fn fetch_subscription(&self, user_id: &str) -> Res<UserSubscription> {
        self.enter()?;
        Ok(self.subscription(user_id))
    }

    async fn fetch_usage(&self, user_id: &str) -> Res<Usage> {
        if let Some(gate) = &self.usage_gate {
            gate.notified().await;
        }
        self.enter()?;
        Ok(self.usage_of(user_id))
    }

    async fn upgrade(&self, form: &UpgradeForm) -> Res<UserSubscription> {
        self.upgrade_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.upgrade_gate {
            gate.notified().await;
        }
        self.enter()?;

        let mut subscription = self.subscription(&form.user_id);
        if subscription.plan_type == form.plan_type {
            return Ok(subscription);
        }
        subscription.plan_type = form.plan_type;
        subscription.billing_cycle = form.billing_cycle;
        subscription.updated_at = Utc::now();
        self.subscriptions
            .lock()
            .unwrap()
            .insert(form.user_id.clone(), subscription.clone());
        Ok(subscription)
    }

    async fn validate_limits(&self, user_id: &str, action: LimitAction) -> Res<LimitCheck> {
        self.enter()?;
        let tier = self.subscription(user_id).plan_type;
        let limits = self
            .plans
            .lock()
            .unwrap()
            .iter()
            .find(|plan| plan.plan_type == tier)
            .map(|plan| plan.limits.clone())
            .ok_or_else(|| AppError::NotFound(format!("Plan '{}' is not offered", tier)))?;
        Ok(limits.check(tier, action, &self.usage_of(user_id)))
    }

    async fn increment_usage(&self, user_id: &str, event: UsageEvent) -> Res<()> {
        self.enter()?;
        let mut usage = self.usage.lock().unwrap();
        let counters = usage.entry(user_id.to_string()).or_default();
        match event {
            UsageEvent::LinkCreated => counters.links_created += 1,
            UsageEvent::LinkClicked => counters.clicks_this_month += 1,
        }
        Ok(())
    }
}
