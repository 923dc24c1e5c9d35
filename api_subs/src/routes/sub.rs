use actix_web::{Responder, get, post, web};
use common::{error::Res, http::Success};

use crate::{
    dtos::sub::{IncrementUsageResponse, UpgradeForm, UsageForm},
    services::sub::SubscriptionStore,
};

/// Lists every plan on offer.
///
/// # Output
/// - Success: JSON array of plans, each with `plan_type`, prices,
///   `features` and `limits`.
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch(`${backendUrl}/api/subscription/plans`);
/// const plans = await response.json();
/// // [{ plan_type: "basic", price_monthly: 0, limits: { max_links: 5, ... } }, ...]
/// ```
#[get("/plans")]
pub async fn get_plans(store: web::Data<SubscriptionStore>) -> Res<impl Responder> {
    Success::ok(store.plans())
}

/// Returns the caller's current subscription, creating a Basic one if the
/// caller has none yet.
#[get("/current/{user_id}")]
pub async fn get_current(
    store: web::Data<SubscriptionStore>,
    user_id: web::Path<String>,
) -> Res<impl Responder> {
    let subscription = store.current(&user_id)?;
    Success::ok(subscription)
}

/// Returns the caller's usage counters for the current period.
#[get("/usage/{user_id}")]
pub async fn get_usage(
    store: web::Data<SubscriptionStore>,
    user_id: web::Path<String>,
) -> Res<impl Responder> {
    let usage = store.usage(&user_id)?;
    Success::ok(usage)
}

/// Moves the caller to another plan.
///
/// # Input
/// Urlencoded form fields `user_id`, `plan_type`, `payment_method`
/// (default `card`) and `billing_cycle` (default `monthly`). Moving to the
/// tier the caller is already on returns the stored record unchanged.
///
/// # Output
/// - Success: the new subscription record
/// - Error: `{ "detail": "..." }` with 400 when payment is refused
///
/// # Frontend Example
/// ```javascript
/// const formData = new FormData();
/// formData.append('user_id', userId);
/// formData.append('plan_type', 'pro');
/// formData.append('payment_method', 'card');
/// formData.append('billing_cycle', 'yearly');
/// const response = await fetch(`${backendUrl}/api/subscription/upgrade`, {
///   method: 'POST',
///   body: new URLSearchParams(formData)
/// });
/// ```
#[post("/upgrade")]
pub async fn post_upgrade(
    store: web::Data<SubscriptionStore>,
    form: web::Form<UpgradeForm>,
) -> Res<impl Responder> {
    let subscription = store.upgrade(&form)?;
    Success::ok(subscription)
}

/// Decides whether `action` is allowed under the caller's plan.
///
/// Returns `{ allowed, message }` plus `current_usage`/`limit` for
/// counted actions and `retention_days` for analytics.
#[post("/validate-limits")]
pub async fn post_validate_limits(
    store: web::Data<SubscriptionStore>,
    form: web::Form<UsageForm>,
) -> Res<impl Responder> {
    let check = store.validate_limits(&form.user_id, &form.action)?;
    Success::ok(check)
}

/// Advances the caller's usage counter for a completed action.
#[post("/increment-usage")]
pub async fn post_increment_usage(
    store: web::Data<SubscriptionStore>,
    form: web::Form<UsageForm>,
) -> Res<impl Responder> {
    let usage = store.increment_usage(&form.user_id, &form.action)?;
    log::debug!("Usage for {} is now {:?}", form.user_id, usage);
    Success::ok(IncrementUsageResponse {
        success: true,
        message: "Usage incremented".to_string(),
    })
}
