use api_subs::{
    dtos::sub::UpgradeForm,
    models::sub::{LimitAction, LimitCheck, SubscriptionPlan, Usage, UsageEvent, UserSubscription},
};
use async_trait::async_trait;
use common::{
    env_config::ClientConfig,
    error::{AppError, Res},
};
use log::{debug, warn};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

/// Remote authority for plans, subscriptions and usage.
///
/// Every method is a single round-trip with no retry.
#[async_trait]
pub trait SubscriptionApi: Send + Sync {
    async fn fetch_plans(&self) -> Res<Vec<SubscriptionPlan>>;

    async fn fetch_subscription(&self, user_id: &str) -> Res<UserSubscription>;

    async fn fetch_usage(&self, user_id: &str) -> Res<Usage>;

    async fn upgrade(&self, form: &UpgradeForm) -> Res<UserSubscription>;

    async fn validate_limits(&self, user_id: &str, action: LimitAction) -> Res<LimitCheck>;

    async fn increment_usage(&self, user_id: &str, event: UsageEvent) -> Res<()>;
}

/// `SubscriptionApi` over the service's HTTP JSON interface.
pub struct HttpSubscriptionApi {
    client: Client,
    config: ClientConfig,
}

impl HttpSubscriptionApi {
    pub fn new(config: ClientConfig) -> Res<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(HttpSubscriptionApi { client, config })
    }

    /// `<backend>/api/<prefix>/<user_id>` with the id percent-encoded.
    fn user_endpoint(&self, prefix: &str, user_id: &str) -> Res<url::Url> {
        let mut url = url::Url::parse(&self.config.endpoint(prefix))
            .map_err(|e| AppError::Internal(format!("Invalid endpoint {}: {}", prefix, e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal(format!("Endpoint {} cannot take a path", prefix)))?
            .push(user_id);
        Ok(url)
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Res<Response> {
        let url = self.config.endpoint(path);
        debug!("POST {}", url);
        Ok(self.client.post(url).form(form).send().await?)
    }
}

/// Decodes a success body, or turns the `{detail}` error payload into
/// `AppError::Upstream`.
async fn read_json<T: DeserializeOwned>(response: Response) -> Res<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.json::<serde_json::Value>().await.ok();
    let detail = body
        .as_ref()
        .and_then(|v| v.get("detail").or_else(|| v.get("error")))
        .and_then(|d| d.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed with status {}", status));

    warn!("Subscription API answered {}: {}", status, detail);
    Err(AppError::Upstream {
        status: status.as_u16(),
        detail,
    })
}

#[async_trait]
impl SubscriptionApi for HttpSubscriptionApi {
    async fn fetch_plans(&self) -> Res<Vec<SubscriptionPlan>> {
        let url = self.config.endpoint("subscription/plans");
        debug!("GET {}", url);
        read_json(self.client.get(url).send().await?).await
    }

    async fn fetch_subscription(&self, user_id: &str) -> Res<UserSubscription> {
        let url = self.user_endpoint("subscription/current", user_id)?;
        debug!("GET {}", url);
        read_json(self.client.get(url).send().await?).await
    }

    async fn fetch_usage(&self, user_id: &str) -> Res<Usage> {
        let url = self.user_endpoint("subscription/usage", user_id)?;
        debug!("GET {}", url);
        read_json(self.client.get(url).send().await?).await
    }

    async fn upgrade(&self, form: &UpgradeForm) -> Res<UserSubscription> {
        let response = self
            .post_form(
                "subscription/upgrade",
                &[
                    ("user_id", form.user_id.as_str()),
                    ("plan_type", form.plan_type.as_str()),
                    ("payment_method", form.payment_method.as_str()),
                    ("billing_cycle", form.billing_cycle.as_str()),
                ],
            )
            .await?;
        read_json(response).await
    }

    async fn validate_limits(&self, user_id: &str, action: LimitAction) -> Res<LimitCheck> {
        let response = self
            .post_form(
                "subscription/validate-limits",
                &[("user_id", user_id), ("action", action.as_str())],
            )
            .await?;
        read_json(response).await
    }

    async fn increment_usage(&self, user_id: &str, event: UsageEvent) -> Res<()> {
        let response = self
            .post_form(
                "subscription/increment-usage",
                &[("user_id", user_id), ("action", event.as_str())],
            )
            .await?;
        let _: serde_json::Value = read_json(response).await?;
        Ok(())
    }
}
