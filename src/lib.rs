//! A stateless counter echo endpoint.
//!
//! `POST /counter/sync` with a form field `count` answers with that number as
//! plain text, falling back to `0` when the field is missing or not numeric.
//! `OPTIONS /counter/sync` answers the CORS preflight.
//!
//! The endpoint logic is the pure function [`echo`]. [`CounterSync`] mounts it
//! on a path as an [`App`], and [`Server`] is a small synchronous HTTP/1.1
//! server that hosts any [`App`] on a pool of worker threads.
//!
//! ```no_run
//! use counter_echo::{CounterSync, Server};
//!
//! fn main() -> std::io::Result<()> {
//!     Server::bind("0.0.0.0:4444")?.serve(CounterSync::default())
//! }
//! ```

pub mod body;
pub mod config;
pub mod cors;
pub mod counter;
pub mod form;
pub mod handler;
#[cfg(feature = "multipart")]
mod multipart;
mod request;
mod response;
pub mod server;

use std::{
    error::Error,
    io::{self, BufRead, BufReader, BufWriter, Write},
    net::TcpStream,
};

pub use body::Body;
pub use config::Config;
pub use counter::Count;
pub use form::{Form, FormError, FormValue};
pub use handler::{echo, CounterSync};
use headers::{HeaderMapExt, HeaderValue};
pub use http::{header, Method, Request, Response, StatusCode, Uri, Version};
pub use request::ParseError;
use request::Framing;
use response::Outcome;
pub use server::Server;

/// Default limit for request bodies, in bytes.
pub const DEFAULT_MAX_BODY_SIZE: u64 = 64 * 1024;

/// Maps [`Request`]s to [`Response`]s.
///
/// Usually you don't need to manually implement this trait, as its `Fn` implementation might suffice
/// most of the needs.
///
/// ```no_run
/// # use std::convert::Infallible;
/// # use counter_echo::{Body, Request, Response, Server, StatusCode};
/// fn app(req: Request<Body>) -> Result<Response<Body>, Infallible> {
///     Ok(Response::builder().status(StatusCode::OK).body(Body::empty()).unwrap())
/// }
///
/// fn main() -> std::io::Result<()> {
///     Server::bind("0.0.0.0:4444")?.serve(app)
/// }
/// ```
///
/// Implement it to decide on `Expect: 100-continue` before the body is read, see
/// [`App::should_continue`].
pub trait App {
    type Error: Into<Box<dyn Error + Send + Sync>>;

    fn handle(&self, request: Request<Body>) -> Result<Response<Body>, Self::Error>;

    /// Called with the request head when the client waits for `100 Continue`.
    ///
    /// Any other status is sent as the final response and the body is never read.
    fn should_continue(&self, _: &Request<()>) -> StatusCode {
        StatusCode::CONTINUE
    }
}

impl<F, Err> App for F
where
    F: Fn(Request<Body>) -> Result<Response<Body>, Err>,
    F: Sync + Send,
    F: Clone,
    Err: Into<Box<dyn Error + Send + Sync>>,
{
    type Error = Err;

    fn handle(&self, request: Request<Body>) -> Result<Response<Body>, Self::Error> {
        self(request)
    }
}

pub(crate) fn serve_stream<A: App>(stream: TcpStream, app: A, max_body_size: u64) -> io::Result<()> {
    let reader = BufReader::new(stream.try_clone()?);
    let writer = BufWriter::new(stream);
    serve(reader, writer, &app, max_body_size)
}

pub(crate) fn serve<A: App>(
    mut reader: impl BufRead,
    mut writer: impl Write,
    app: &A,
    max_body_size: u64,
) -> io::Result<()> {
    loop {
        let (head, framing) = match request::parse_head(&mut reader) {
            Ok(head) => head,
            Err(ParseError::ConnectionClosed) => break,
            Err(err) => return reject(err, &mut writer),
        };

        let asks_for_close = head
            .headers()
            .typed_get::<headers::Connection>()
            .filter(|conn| conn.contains("close"))
            .is_some();

        let asks_for_keep_alive = head
            .headers()
            .typed_get::<headers::Connection>()
            .filter(|conn| conn.contains("keep-alive"))
            .is_some();

        let version = head.version();

        let demands_close = match version {
            Version::HTTP_09 => true,
            Version::HTTP_10 => !asks_for_keep_alive,
            _ => asks_for_close,
        };

        let expects_continue = head
            .headers()
            .typed_get::<headers::Expect>()
            .filter(|expect| expect == &headers::Expect::CONTINUE)
            .is_some();

        if expects_continue && framing != Framing::Empty {
            match app.should_continue(&head) {
                status @ StatusCode::CONTINUE => {
                    let res = Response::builder().status(status).body(Body::empty());
                    response::write_response(res.map_err(to_io)?, &mut writer)?;
                    writer.flush()?;
                }
                status => {
                    // The body was never read, so the connection can't be reused
                    let res = Response::builder()
                        .status(status)
                        .version(version)
                        .header(header::CONNECTION, "close")
                        .body(Body::empty());
                    response::write_response(res.map_err(to_io)?, &mut writer)?;
                    writer.flush()?;
                    break;
                }
            };
        }

        let body = match request::read_body(&mut reader, framing, max_body_size) {
            Ok(body) => body,
            Err(err) => return reject(err, &mut writer),
        };

        let req = head.map(|()| body);
        let method = req.method().clone();
        let path = req.uri().path().to_owned();

        let mut res = app.handle(req).map_err(to_io)?;

        *res.version_mut() = version;

        if demands_close {
            res.headers_mut()
                .insert(header::CONNECTION, HeaderValue::from_static("close"));
        } else if version == Version::HTTP_10 {
            // HTTP/1.0 clients assume the connection closes unless told otherwise
            res.headers_mut()
                .insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        }

        tracing::debug!(%method, %path, status = res.status().as_u16(), "handled request");

        match response::write_response(res, &mut writer)? {
            Outcome::KeepAlive if !demands_close => writer.flush()?,
            Outcome::KeepAlive | Outcome::Close => break,
        }
    }

    writer.flush()
}

/// Answers a request that could not be read and gives up on the connection.
fn reject(err: ParseError, writer: &mut impl Write) -> io::Result<()> {
    let status = err.status();
    let reason = status.canonical_reason().unwrap_or_default().to_lowercase();

    let res = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CONNECTION, "close")
        .body(Body::from(reason));

    // The peer may already be gone, the parse error is what matters
    if let Ok(res) = res {
        response::write_response(res, writer)
            .and_then(|_| writer.flush())
            .ok();
    }

    Err(io::Error::new(io::ErrorKind::InvalidData, err))
}

fn to_io(err: impl Into<Box<dyn Error + Send + Sync>>) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}
