mod cors;

use actix_web::{
    App, HttpServer,
    web::{self},
};
use api_subs::services::sub::SubscriptionStore;
use common::env_config::Config;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let origin = config.cors_allowed_origin.clone();

    // init logger
    if config.console_logging_enabled {
        if let Err(e) = logger::setup(&config.log_level, config.log_file.as_deref()) {
            eprintln!("Failed to set up logger: {}", e);
        }
    }

    // one store and one request budget shared by every worker
    let store = web::Data::new(SubscriptionStore::default());
    let limiter = limiter::global_middleware(config.rate_limit_per_second);

    log::info!(
        "Starting subscription service on {}:{} ({}, {} workers)",
        config.server_host,
        config.server_port,
        config.environment,
        config.num_workers
    );
    if !config.is_production() {
        log::debug!("{} plans on offer", store.plans().len());
    }

    HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .wrap(limiter.clone()) // 3rd
            .wrap(logger::middleware()) // 2nd
            .wrap(cors::middleware(&origin)) // 1st
            .service(web::scope("/api").service(api_subs::mount_subs()))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
