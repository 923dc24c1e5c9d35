use actix_web::{App, http::StatusCode, test, web};
use api_subs::{
    dtos::sub::{ErrorDetail, IncrementUsageResponse},
    models::sub::{LimitCheck, PlanType, SubscriptionPlan, Usage, UserSubscription},
    services::sub::SubscriptionStore,
};

macro_rules! app {
    () => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(SubscriptionStore::default()))
                .service(web::scope("/api").service(api_subs::mount_subs())),
        )
        .await
    };
}

#[actix_web::test]
async fn plans_are_listed_with_limits() {
    let app = app!();
    let req = test::TestRequest::get()
        .uri("/api/subscription/plans")
        .to_request();
    let plans: Vec<SubscriptionPlan> = test::call_and_read_body_json(&app, req).await;

    assert_eq!(plans.len(), 2);
    let basic = plans.iter().find(|p| p.plan_type == PlanType::Basic).unwrap();
    assert_eq!(basic.limits.max_links, 5);
    let pro = plans.iter().find(|p| p.plan_type == PlanType::Pro).unwrap();
    assert_eq!(pro.limits.max_links, 100);
    assert!(pro.limits.ads_free);
}

#[actix_web::test]
async fn current_defaults_to_basic() {
    let app = app!();
    let req = test::TestRequest::get()
        .uri("/api/subscription/current/alice")
        .to_request();
    let sub: UserSubscription = test::call_and_read_body_json(&app, req).await;
    assert_eq!(sub.user_id, "alice");
    assert_eq!(sub.plan_type, PlanType::Basic);
}

#[actix_web::test]
async fn usage_flow_hits_the_basic_limit() {
    let app = app!();

    for _ in 0..5 {
        let req = test::TestRequest::post()
            .uri("/api/subscription/increment-usage")
            .set_form([("user_id", "bob"), ("action", "link_created")])
            .to_request();
        let body: IncrementUsageResponse = test::call_and_read_body_json(&app, req).await;
        assert!(body.success);
    }

    let req = test::TestRequest::get()
        .uri("/api/subscription/usage/bob")
        .to_request();
    let usage: Usage = test::call_and_read_body_json(&app, req).await;
    assert_eq!(usage.links_created, 5);

    let req = test::TestRequest::post()
        .uri("/api/subscription/validate-limits")
        .set_form([("user_id", "bob"), ("action", "create_link")])
        .to_request();
    let check: LimitCheck = test::call_and_read_body_json(&app, req).await;
    assert!(!check.allowed);
    assert!(!check.message.is_empty());
    assert_eq!(check.limit, Some(5));
}

#[actix_web::test]
async fn upgrade_replaces_plan() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/subscription/upgrade")
        .set_form([
            ("user_id", "carol"),
            ("plan_type", "pro"),
            ("payment_method", "card"),
            ("billing_cycle", "yearly"),
        ])
        .to_request();
    let sub: UserSubscription = test::call_and_read_body_json(&app, req).await;
    assert_eq!(sub.plan_type, PlanType::Pro);
    assert!(sub.plan_expires.is_some());

    let req = test::TestRequest::get()
        .uri("/api/subscription/current/carol")
        .to_request();
    let current: UserSubscription = test::call_and_read_body_json(&app, req).await;
    assert_eq!(current, sub);
}

#[actix_web::test]
async fn repeated_upgrade_to_same_tier_is_a_noop() {
    let app = app!();
    let upgrade = |payment_method: &'static str| {
        test::TestRequest::post()
            .uri("/api/subscription/upgrade")
            .set_form([
                ("user_id", "frank"),
                ("plan_type", "pro"),
                ("payment_method", payment_method),
            ])
            .to_request()
    };

    let first: UserSubscription = test::call_and_read_body_json(&app, upgrade("card")).await;
    let second: UserSubscription = test::call_and_read_body_json(&app, upgrade("paypal")).await;
    assert_eq!(second, first);
    assert_eq!(second.updated_at, first.updated_at);
    assert_eq!(second.plan_expires, first.plan_expires);
}

#[actix_web::test]
async fn multipart_bodies_are_rejected_with_detail() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/subscription/validate-limits")
        .insert_header((
            "content-type",
            "multipart/form-data; boundary=----linkabet",
        ))
        .set_payload(
            "------linkabet\r\nContent-Disposition: form-data; name=\"user_id\"\r\n\r\ngina\r\n------linkabet--\r\n",
        )
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: ErrorDetail = test::read_body_json(res).await;
    assert!(!body.detail.is_empty());
}

#[actix_web::test]
async fn refused_payment_returns_detail() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/subscription/upgrade")
        .set_form([
            ("user_id", "dave"),
            ("plan_type", "pro"),
            ("payment_method", "seashells"),
        ])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: ErrorDetail = test::read_body_json(res).await;
    assert!(body.detail.contains("Unsupported payment method"));
}

#[actix_web::test]
async fn malformed_form_and_unknown_action_are_bad_requests() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/subscription/upgrade")
        .set_form([("user_id", "erin"), ("plan_type", "platinum")])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(res).await;
    assert!(body["detail"].is_string());

    let req = test::TestRequest::post()
        .uri("/api/subscription/validate-limits")
        .set_form([("user_id", "erin"), ("action", "time_travel")])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
