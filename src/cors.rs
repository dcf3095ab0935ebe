//! Permissive cross-origin headers for the sync endpoint.

use http::{
    header::{
        ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    },
    HeaderMap, HeaderValue, Response, StatusCode,
};

use crate::body::Body;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type";

/// Lets any origin read the response.
pub fn allow_any_origin(headers: &mut HeaderMap) {
    headers.insert(
        ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
}

/// Answers a CORS preflight. The request body is never read.
pub fn preflight() -> Result<Response<Body>, http::Error> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ORIGIN)
        .header(ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS)
        .header(ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS)
        .body(Body::empty())
}
