use chrono::{Months, Utc};
use common::error::{AppError, Res};
use dashmap::DashMap;
use uuid::Uuid;

use crate::{
    dtos::sub::UpgradeForm,
    models::sub::{
        BillingCycle, LimitAction, LimitCheck, PlanLimits, PlanType, SubscriptionPlan,
        SubscriptionStatus, Usage, UsageEvent, UserSubscription,
    },
};

/// The plans offered by the service.
pub fn default_plans() -> Vec<SubscriptionPlan> {
    let now = Utc::now();
    vec![
        SubscriptionPlan {
            id: Uuid::new_v4().to_string(),
            name: "Basic".to_string(),
            plan_type: PlanType::Basic,
            price_monthly: 0.0,
            price_yearly: 0.0,
            limits: PlanLimits {
                max_links: 5,
                max_clicks_per_month: 1000,
                analytics_retention_days: 30,
                custom_domains: false,
                ads_free: false,
                api_access: false,
            },
            features: [
                "Up to 5 shortened links",
                "Basic analytics (30 days)",
                "Standard support",
                "QR code generation",
            ]
            .map(String::from)
            .to_vec(),
            is_active: true,
            created_at: now,
        },
        SubscriptionPlan {
            id: Uuid::new_v4().to_string(),
            name: "Pro".to_string(),
            plan_type: PlanType::Pro,
            price_monthly: 9.99,
            price_yearly: 99.99,
            limits: PlanLimits {
                max_links: 100,
                max_clicks_per_month: 100_000,
                analytics_retention_days: 365,
                custom_domains: true,
                ads_free: true,
                api_access: true,
            },
            features: [
                "Up to 100 shortened links",
                "Advanced analytics (365 days)",
                "Priority support",
                "Custom domains",
                "Ad-free experience",
                "API access",
                "Advanced QR code styling",
                "Bulk operations",
            ]
            .map(String::from)
            .to_vec(),
            is_active: true,
            created_at: now,
        },
    ]
}

#[derive(Debug, Clone)]
struct Account {
    subscription: UserSubscription,
    usage: Usage,
}

impl Account {
    fn new(user_id: &str) -> Self {
        let now = Utc::now();
        Account {
            subscription: UserSubscription {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                plan_type: PlanType::Basic,
                billing_cycle: BillingCycle::Monthly,
                status: SubscriptionStatus::Active,
                plan_expires: None,
                auto_renew: true,
                created_at: now,
                updated_at: now,
            },
            usage: Usage::default(),
        }
    }
}

/// In-memory subscriptions and usage counters, keyed by user id.
///
/// Callers without a record get a Basic subscription on first touch.
pub struct SubscriptionStore {
    plans: Vec<SubscriptionPlan>,
    accounts: DashMap<String, Account>,
}

impl SubscriptionStore {
    pub fn new(plans: Vec<SubscriptionPlan>) -> Self {
        Self {
            plans,
            accounts: DashMap::new(),
        }
    }

    pub fn plans(&self) -> &[SubscriptionPlan] {
        &self.plans
    }

    fn plan(&self, plan_type: PlanType) -> Res<&SubscriptionPlan> {
        self.plans
            .iter()
            .find(|p| p.plan_type == plan_type && p.is_active)
            .ok_or_else(|| AppError::NotFound(format!("Plan '{}' is not offered", plan_type)))
    }

    fn account(&self, user_id: &str) -> Res<dashmap::mapref::one::RefMut<'_, String, Account>> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AppError::BadRequest("user_id must not be empty".to_string()));
        }
        Ok(self
            .accounts
            .entry(user_id.to_string())
            .or_insert_with(|| {
                log::info!("Creating default basic subscription for {}", user_id);
                Account::new(user_id)
            }))
    }

    pub fn current(&self, user_id: &str) -> Res<UserSubscription> {
        Ok(self.account(user_id)?.subscription.clone())
    }

    pub fn usage(&self, user_id: &str) -> Res<Usage> {
        Ok(self.account(user_id)?.usage)
    }

    /// Moves the caller to `form.plan_type` once payment is confirmed.
    /// Nothing is written when confirmation fails, and a caller already on
    /// the requested tier gets the stored record back without being charged.
    pub fn upgrade(&self, form: &UpgradeForm) -> Res<UserSubscription> {
        let plan = self.plan(form.plan_type)?;
        let mut account = self.account(&form.user_id)?;
        if account.subscription.plan_type == plan.plan_type {
            log::info!(
                "User {} is already on the {} plan",
                account.subscription.user_id,
                plan.plan_type
            );
            return Ok(account.subscription.clone());
        }

        super::pay::confirm_payment(plan, &form.payment_method, form.billing_cycle)?;
        let now = Utc::now();
        let plan_expires = if plan.price_for(form.billing_cycle) > 0.0 {
            let months = match form.billing_cycle {
                BillingCycle::Monthly => Months::new(1),
                BillingCycle::Yearly => Months::new(12),
            };
            now.checked_add_months(months)
        } else {
            None
        };

        let subscription = UserSubscription {
            plan_type: plan.plan_type,
            billing_cycle: form.billing_cycle,
            status: SubscriptionStatus::Active,
            plan_expires,
            updated_at: now,
            ..account.subscription.clone()
        };
        account.subscription = subscription.clone();

        log::info!(
            "User {} now on {} plan ({})",
            subscription.user_id,
            subscription.plan_type,
            subscription.billing_cycle.as_str()
        );
        Ok(subscription)
    }

    pub fn validate_limits(&self, user_id: &str, action: &str) -> Res<LimitCheck> {
        let action = action.parse::<LimitAction>()?;
        let (plan_type, usage) = {
            let account = self.account(user_id)?;
            (account.subscription.plan_type, account.usage)
        };
        let plan = self.plan(plan_type)?;
        Ok(plan.limits.check(plan_type, action, &usage))
    }

    /// Applies a usage event atomically and returns the new counters.
    pub fn increment_usage(&self, user_id: &str, action: &str) -> Res<Usage> {
        let event = action.parse::<UsageEvent>()?;
        let mut account = self.account(user_id)?;
        match event {
            UsageEvent::LinkCreated => account.usage.links_created += 1,
            UsageEvent::LinkClicked => account.usage.clicks_this_month += 1,
        }
        Ok(account.usage)
    }
}

impl Default for SubscriptionStore {
    fn default() -> Self {
        Self::new(default_plans())
    }
}
