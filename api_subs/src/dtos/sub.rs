use serde::{Deserialize, Serialize};

use crate::models::sub::{BillingCycle, PlanType};

/// Form body of `POST /subscription/upgrade`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeForm {
    pub user_id: String,
    pub plan_type: PlanType,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    #[serde(default)]
    pub billing_cycle: BillingCycle,
}

/// Form body shared by `validate-limits` and `increment-usage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageForm {
    pub user_id: String,
    pub action: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IncrementUsageResponse {
    pub success: bool,
    pub message: String,
}

/// Error payload returned on any non-success status.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

fn default_payment_method() -> String {
    "card".to_string()
}
