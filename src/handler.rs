//! The counter sync endpoint.
//!
//! [`echo`] is the whole endpoint logic as a pure function of the request.
//! [`CounterSync`] mounts it (and the CORS preflight) on a path so it can be
//! served by [`Server`](crate::Server) or composed into another [`App`].

use headers::HeaderMapExt;
use http::{
    header::{ALLOW, CACHE_CONTROL},
    HeaderValue, Method, Request, Response, StatusCode,
};

use crate::{
    body::Body,
    cors,
    counter::Count,
    form::{Form, FormValue},
    App, DEFAULT_MAX_BODY_SIZE,
};

pub const DEFAULT_PATH: &str = "/counter/sync";
pub const HEALTH_PATH: &str = "/healthz";

/// Name of the form field holding the counter.
pub const COUNT_FIELD: &str = "count";

/// Echoes the `count` form field back as plain text.
///
/// A missing, empty or non-numeric field echoes `0`. Only a body that is not
/// form data at all is rejected, with `400 bad request`.
pub fn echo(req: Request<Body>) -> Result<Response<Body>, http::Error> {
    let form = match Form::from_request(req) {
        Ok(form) => form,
        Err(err) => {
            tracing::debug!(error = %err, "rejecting counter sync body");
            return plain_text(StatusCode::BAD_REQUEST, "bad request");
        }
    };

    let count = match form.get(COUNT_FIELD) {
        Some(FormValue::Text(text)) => Count::parse(text),
        Some(FormValue::File { .. }) | None => Count::ZERO,
    };

    let mut res = plain_text(StatusCode::OK, count.to_string())?;
    cors::allow_any_origin(res.headers_mut());
    Ok(res)
}

fn plain_text(status: StatusCode, body: impl Into<Body>) -> Result<Response<Body>, http::Error> {
    let mut res = Response::builder().status(status).body(body.into())?;
    res.headers_mut()
        .typed_insert(headers::ContentType::text_utf8());
    Ok(res)
}

fn method_not_allowed(allow: &'static str) -> Result<Response<Body>, http::Error> {
    let mut res = plain_text(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")?;
    res.headers_mut()
        .insert(ALLOW, HeaderValue::from_static(allow));
    Ok(res)
}

/// Serves [`echo`] and its CORS preflight on one path, plus a liveness probe.
///
/// ```no_run
/// # use counter_echo::{CounterSync, Server};
/// fn main() -> std::io::Result<()> {
///     Server::bind("0.0.0.0:4444")?.serve(CounterSync::default())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct CounterSync {
    path: String,
    max_body_size: u64,
    powered_by: Option<HeaderValue>,
}

impl Default for CounterSync {
    fn default() -> Self {
        CounterSync {
            path: DEFAULT_PATH.to_string(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            powered_by: None,
        }
    }
}

impl CounterSync {
    pub fn at(path: impl Into<String>) -> Self {
        CounterSync {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Declared bodies above this size are refused on `Expect: 100-continue`.
    pub fn max_body_size(self, max_body_size: u64) -> Self {
        CounterSync {
            max_body_size,
            ..self
        }
    }

    /// Adds an `X-Powered-By` header to successful echoes.
    pub fn powered_by(self, powered_by: HeaderValue) -> Self {
        CounterSync {
            powered_by: Some(powered_by),
            ..self
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl App for CounterSync {
    type Error = http::Error;

    fn handle(&self, req: Request<Body>) -> Result<Response<Body>, Self::Error> {
        match (req.method(), req.uri().path()) {
            (&Method::POST, path) if path == self.path => {
                let mut res = echo(req)?;
                if let (Some(powered_by), true) = (&self.powered_by, res.status().is_success()) {
                    res.headers_mut().insert("x-powered-by", powered_by.clone());
                }
                Ok(res)
            }
            (&Method::OPTIONS, path) if path == self.path => cors::preflight(),
            (_, path) if path == self.path => method_not_allowed(cors::ALLOW_METHODS),

            (&Method::GET, HEALTH_PATH) => {
                let mut res = plain_text(StatusCode::OK, "ok")?;
                res.headers_mut().insert(
                    CACHE_CONTROL,
                    HeaderValue::from_static("no-cache, no-store, must-revalidate"),
                );
                Ok(res)
            }
            (_, HEALTH_PATH) => method_not_allowed("GET"),

            // Everything else belongs to whatever serves the static assets
            _ => plain_text(StatusCode::NOT_FOUND, "not found"),
        }
    }

    fn should_continue(&self, req: &Request<()>) -> StatusCode {
        match req.headers().typed_get::<headers::ContentLength>() {
            Some(len) if len.0 > self.max_body_size => StatusCode::EXPECTATION_FAILED,
            _ => StatusCode::CONTINUE,
        }
    }
}
