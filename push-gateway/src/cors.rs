use crate::config::CorsConfig;
use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_HEADERS, CONTENT_LENGTH, HeaderMap, HeaderValue,
    ORIGIN, VARY,
};
use hyper::{Response, StatusCode};
use shared::http::full_body;
use std::convert::Infallible;

const ALLOWED_METHODS: &str = "POST, OPTIONS";

/// Cross-origin policy for the notification endpoint.
///
/// Without an explicit origin list the request's `Origin` is reflected back,
/// so any browser origin may call the endpoint.
#[derive(Clone, Debug)]
pub struct Cors {
    allowed_origins: Option<Vec<String>>,
    max_age_secs: Option<u64>,
}

impl Cors {
    pub fn new(config: &CorsConfig) -> Self {
        Self {
            allowed_origins: config.allowed_origins.clone(),
            max_age_secs: config.max_age_secs,
        }
    }

    /// Returns the origin to echo in `Access-Control-Allow-Origin`, if any.
    fn allowed_origin<'a>(&self, request_headers: &'a HeaderMap) -> Option<&'a HeaderValue> {
        let origin = request_headers.get(ORIGIN)?;
        match &self.allowed_origins {
            None => Some(origin),
            Some(allowed) => {
                let origin_str = origin.to_str().ok()?;
                allowed
                    .iter()
                    .any(|candidate| candidate == origin_str)
                    .then_some(origin)
            }
        }
    }

    /// Adds CORS headers to an actual (non-preflight) response.
    pub fn apply(&self, request_headers: &HeaderMap, response_headers: &mut HeaderMap) {
        if let Some(origin) = self.allowed_origin(request_headers) {
            response_headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
            response_headers.append(VARY, HeaderValue::from_static("Origin"));
        }
    }

    /// Answers an `OPTIONS` preflight with 204 and an empty body.
    pub fn preflight(&self, request_headers: &HeaderMap) -> Response<BoxBody<Bytes, Infallible>> {
        let mut response = Response::new(full_body(Bytes::new()));
        *response.status_mut() = StatusCode::NO_CONTENT;

        let headers = response.headers_mut();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        self.apply(request_headers, headers);
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );

        if let Some(requested) = request_headers.get(ACCESS_CONTROL_REQUEST_HEADERS) {
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
            headers.append(
                VARY,
                HeaderValue::from_static("Access-Control-Request-Headers"),
            );
        }

        if let Some(max_age) = self.max_age_secs {
            headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(max_age));
        }

        response
    }
}
