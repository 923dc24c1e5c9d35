use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Basic,
    Pro,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Basic => "basic",
            PlanType::Pro => "pro",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(PlanType::Basic),
            "pro" => Ok(PlanType::Pro),
            other => Err(AppError::BadRequest(format!("Unknown plan type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Yearly,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Pending,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub max_links: u64,
    pub max_clicks_per_month: u64,
    pub analytics_retention_days: u64,
    pub custom_domains: bool,
    pub ads_free: bool,
    pub api_access: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: String,
    pub name: String,
    pub plan_type: PlanType,
    pub price_monthly: f64,
    pub price_yearly: f64,
    pub limits: PlanLimits,
    pub features: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSubscription {
    pub id: String,
    pub user_id: String,
    pub plan_type: PlanType,
    #[serde(default)]
    pub billing_cycle: BillingCycle,
    #[serde(default)]
    pub status: SubscriptionStatus,
    pub plan_expires: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub auto_renew: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Counters for the current subscription period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub links_created: u64,
    pub clicks_this_month: u64,
}

/// Actions whose permission depends on the caller's plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitAction {
    CreateLink,
    AccessAnalytics,
    CustomDomain,
    ApiAccess,
}

impl LimitAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitAction::CreateLink => "create_link",
            LimitAction::AccessAnalytics => "access_analytics",
            LimitAction::CustomDomain => "custom_domain",
            LimitAction::ApiAccess => "api_access",
        }
    }
}

impl FromStr for LimitAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create_link" => Ok(LimitAction::CreateLink),
            "access_analytics" => Ok(LimitAction::AccessAnalytics),
            "custom_domain" => Ok(LimitAction::CustomDomain),
            "api_access" => Ok(LimitAction::ApiAccess),
            other => Err(AppError::BadRequest(format!("Unsupported action: {}", other))),
        }
    }
}

/// Completed actions that advance a usage counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageEvent {
    LinkCreated,
    LinkClicked,
}

impl UsageEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageEvent::LinkCreated => "link_created",
            UsageEvent::LinkClicked => "link_clicked",
        }
    }
}

impl FromStr for UsageEvent {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "link_created" => Ok(UsageEvent::LinkCreated),
            "link_clicked" => Ok(UsageEvent::LinkClicked),
            other => Err(AppError::BadRequest(format!("Unsupported action: {}", other))),
        }
    }
}

/// Outcome of a limit check, as sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitCheck {
    pub allowed: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_usage: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u64>,
}

impl LimitCheck {
    pub fn allowed(message: impl Into<String>) -> Self {
        Self {
            allowed: true,
            message: message.into(),
            current_usage: None,
            limit: None,
            retention_days: None,
        }
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            ..Self::allowed(message)
        }
    }

    fn with_usage(mut self, current_usage: u64, limit: u64) -> Self {
        self.current_usage = Some(current_usage);
        self.limit = Some(limit);
        self
    }
}

impl PlanLimits {
    /// Sentinel for "no cap". Kept numeric so comparisons stay uniform.
    pub const UNLIMITED: u64 = u64::MAX;

    pub fn is_unlimited(value: u64) -> bool {
        value == Self::UNLIMITED
    }

    /// Decides whether `action` is permitted for a caller on `plan` with the
    /// given usage.
    pub fn check(&self, plan: PlanType, action: LimitAction, usage: &Usage) -> LimitCheck {
        match action {
            LimitAction::CreateLink => {
                if usage.links_created >= self.max_links {
                    let message = match plan {
                        PlanType::Basic => format!(
                            "You've reached your link limit of {}. Upgrade to Pro for more links.",
                            self.max_links
                        ),
                        PlanType::Pro => format!(
                            "You've reached your Pro plan limit of {} links.",
                            self.max_links
                        ),
                    };
                    LimitCheck::denied(message).with_usage(usage.links_created, self.max_links)
                } else {
                    LimitCheck::allowed("Action allowed")
                        .with_usage(usage.links_created, self.max_links)
                }
            }
            LimitAction::AccessAnalytics => {
                let mut check = LimitCheck::allowed(format!(
                    "Analytics ({} days) available",
                    self.analytics_retention_days
                ));
                check.retention_days = Some(self.analytics_retention_days);
                check
            }
            LimitAction::CustomDomain => {
                if self.custom_domains {
                    LimitCheck::allowed("Custom domains available")
                } else {
                    LimitCheck::denied("Custom domains are available with the Pro plan")
                }
            }
            LimitAction::ApiAccess => {
                if self.api_access {
                    LimitCheck::allowed("API access available")
                } else {
                    LimitCheck::denied("API access is available with the Pro plan")
                }
            }
        }
    }

    /// Boolean feature lookup by name; unknown features are never granted.
    pub fn has_feature(&self, feature: &str) -> bool {
        match feature {
            "custom_domains" => self.custom_domains,
            "api_access" => self.api_access,
            "ads_free" => self.ads_free,
            _ => false,
        }
    }
}

impl SubscriptionPlan {
    pub fn price_for(&self, cycle: BillingCycle) -> f64 {
        match cycle {
            BillingCycle::Monthly => self.price_monthly,
            BillingCycle::Yearly => self.price_yearly,
        }
    }

    /// Amount saved per year by paying yearly, never negative.
    pub fn yearly_savings(&self) -> f64 {
        if self.price_monthly <= 0.0 {
            return 0.0;
        }
        let cents = (self.price_monthly * 12.0 * 100.0).round() - (self.price_yearly * 100.0).round();
        (cents.max(0.0)) / 100.0
    }
}

fn default_true() -> bool {
    true
}
