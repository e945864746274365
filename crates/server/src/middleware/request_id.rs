//! Correlation IDs.
//!
//! A caller-supplied `x-request-id` is kept; otherwise a UUID v4 is minted.
//! The ID lands on the `http_request` span, the Sentry scope and the response.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Header carrying the correlation ID.
pub static REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// The caller's ID, if it is usable as a header value on the way back out.
fn incoming_id(headers: &HeaderMap) -> Option<HeaderValue> {
    headers
        .get(&REQUEST_ID)
        .filter(|value| !value.is_empty() && value.to_str().is_ok())
        .cloned()
}

pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let id = incoming_id(request.headers()).unwrap_or_else(|| {
        HeaderValue::try_from(Uuid::new_v4().to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
    });
    let id_str = id.to_str().unwrap_or_default().to_owned();

    tracing::Span::current().record("request_id", id_str.as_str());
    sentry::configure_scope(|scope| scope.set_tag("request_id", &id_str));

    let mut response = next.run(request).await;
    response.headers_mut().insert(REQUEST_ID.clone(), id);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incoming_id_ignores_blank() {
        let mut headers = HeaderMap::new();
        assert!(incoming_id(&headers).is_none());

        headers.insert(REQUEST_ID.clone(), HeaderValue::from_static(""));
        assert!(incoming_id(&headers).is_none());

        headers.insert(REQUEST_ID.clone(), HeaderValue::from_static("abc-123"));
        assert_eq!(incoming_id(&headers).unwrap(), "abc-123");
    }
}
