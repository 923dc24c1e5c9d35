use common::error::{AppError, Res};

use crate::models::sub::{BillingCycle, SubscriptionPlan};

/// Payment methods the checkout accepts.
pub const SUPPORTED_PAYMENT_METHODS: [&str; 2] = ["card", "paypal"];

/// Confirms that `payment_method` can be charged for `plan` on `cycle`.
/// Free plans need no payment and always confirm.
pub fn confirm_payment(
    plan: &SubscriptionPlan,
    payment_method: &str,
    cycle: BillingCycle,
) -> Res<()> {
    let amount = plan.price_for(cycle);
    if amount <= 0.0 {
        return Ok(());
    }

    let method = payment_method.trim().to_lowercase();
    if !SUPPORTED_PAYMENT_METHODS.contains(&method.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Unsupported payment method: {}",
            payment_method
        )));
    }

    log::info!(
        "Charged {:.2} via {} for {} plan ({})",
        amount,
        method,
        plan.plan_type,
        cycle.as_str()
    );
    Ok(())
}
