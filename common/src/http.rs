use actix_web::HttpResponse;
use serde::Serialize;

use super::error::Res;

/// `200 OK` with a JSON body; errors go through `AppError` instead.
pub struct Success;
impl Success {
    pub fn ok<T: Serialize>(body: T) -> Res<HttpResponse> {
        Ok(HttpResponse::Ok().json(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{body::to_bytes, http::StatusCode};

    #[actix_web::test]
    async fn borrowed_body_is_serialized_eagerly() {
        let plans = vec!["basic".to_string(), "pro".to_string()];
        let res = Success::ok(plans.as_slice()).unwrap();
        drop(plans);

        assert_eq!(res.status(), StatusCode::OK);
        let bytes = to_bytes(res.into_body()).await.unwrap();
        assert_eq!(&bytes[..], br#"["basic","pro"]"#);
    }
}
