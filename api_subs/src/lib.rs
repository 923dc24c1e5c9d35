use actix_web::web::{self};
use common::error::AppError;

pub mod routes {
    pub mod sub;
}

pub mod services {
    pub(crate) mod pay;
    pub mod sub;
}

pub mod dtos {
    pub mod sub;
}

pub mod models {
    pub mod sub;
}

/// Routes under `/subscription`.
///
/// POST bodies must be `application/x-www-form-urlencoded`; multipart
/// `FormData` is rejected with a 400 `{detail}`.
pub fn mount_subs() -> actix_web::Scope {
    // malformed forms get the same `{detail}` body as every other error
    let form_config = web::FormConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into());
    let path_config = web::PathConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into());

    web::scope("/subscription")
        .app_data(form_config)
        .app_data(path_config)
        .service(routes::sub::get_plans)
        .service(routes::sub::get_current)
        .service(routes::sub::get_usage)
        .service(routes::sub::post_upgrade)
        .service(routes::sub::post_validate_limits)
        .service(routes::sub::post_increment_usage)
}
