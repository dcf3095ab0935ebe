use std::io::{self, BufRead, Read};

use headers::HeaderMapExt;
use http::{Method, Request, StatusCode, Version};
use thiserror::Error;

use crate::body::Body;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("io error")]
    Io(#[from] io::Error),
    #[error("invalid request")]
    Invalid(#[from] httparse::Error),
    #[error("incomplete request")]
    IncompleteRequest,
    #[error("request head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },
    #[error("unsupported http version: {0}")]
    UnsupportedHttpVersion(u8),
    #[error("invalid Transfer-Encoding header")]
    InvalidTransferEncoding,
    #[error("invalid header")]
    InvalidHeader(#[from] headers::Error),
    #[error("invalid chunk size")]
    InvalidChunkSize,
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: u64 },
    #[error("failed to parse http request")]
    Unknown,
}

impl ParseError {
    /// Status sent back before the connection is dropped.
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            ParseError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ParseError::HeadTooLarge { .. } => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            ParseError::UnsupportedHttpVersion(_) => StatusCode::HTTP_VERSION_NOT_SUPPORTED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// How the body following a request head is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    Empty,
    Length(u64),
    Chunked,
}

/// Upper bound for the request line plus headers.
pub(crate) const MAX_HEAD_SIZE: usize = 8 * 1024;

pub(crate) fn parse_head(stream: &mut impl BufRead) -> Result<(Request<()>, Framing), ParseError> {
    let mut buf = Vec::with_capacity(800);

    loop {
        // One byte past the limit is enough to tell an oversized head apart
        let remaining = (MAX_HEAD_SIZE + 1 - buf.len()) as u64;
        if stream.by_ref().take(remaining).read_until(b'\n', &mut buf)? == 0 {
            break;
        }

        if buf.len() > MAX_HEAD_SIZE {
            return Err(ParseError::HeadTooLarge {
                limit: MAX_HEAD_SIZE,
            });
        }

        match buf.as_slice() {
            [.., b'\r', b'\n', b'\r', b'\n'] => break,
            [.., b'\n', b'\n'] => break,
            // Tolerate stray empty lines between pipelined requests
            [b'\r', b'\n'] | [b'\n'] => buf.clear(),
            _ => continue,
        }
    }

    if buf.is_empty() {
        return Err(ParseError::ConnectionClosed);
    }

    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut req = httparse::Request::new(&mut headers);
    if req.parse(&buf)?.is_partial() {
        return Err(ParseError::IncompleteRequest);
    }

    let method = req
        .method
        .map(|method| method.as_bytes())
        .ok_or(ParseError::IncompleteRequest)?;

    let path = req.path.ok_or(ParseError::IncompleteRequest)?;

    let version = match req.version.ok_or(ParseError::IncompleteRequest)? {
        0 => Version::HTTP_10,
        1 => Version::HTTP_11,
        version => return Err(ParseError::UnsupportedHttpVersion(version)),
    };

    let request = Request::builder()
        .method(Method::from_bytes(method).map_err(|_| ParseError::IncompleteRequest)?)
        .uri(path)
        .version(version);

    let request = req
        .headers
        .iter()
        .fold(request, |builder, header| builder.header(header.name, header.value));

    let headers = request.headers_ref().ok_or(ParseError::Unknown)?;

    let framing = if let Some(encoding) = headers.typed_try_get::<headers::TransferEncoding>()? {
        if !encoding.is_chunked() {
            // https://datatracker.ietf.org/doc/html/rfc2616#section-3.6
            return Err(ParseError::InvalidTransferEncoding);
        }
        Framing::Chunked
    } else if let Some(len) = headers.typed_try_get::<headers::ContentLength>()? {
        Framing::Length(len.0)
    } else {
        Framing::Empty
    };

    let head = request.body(()).map_err(|_| ParseError::Unknown)?;

    Ok((head, framing))
}

/// Reads the whole body announced by `framing`, refusing anything over `limit` bytes.
pub(crate) fn read_body(
    stream: &mut impl BufRead,
    framing: Framing,
    limit: u64,
) -> Result<Body, ParseError> {
    match framing {
        Framing::Empty => Ok(Body::empty()),
        Framing::Length(len) if len > limit => Err(ParseError::BodyTooLarge { limit }),
        Framing::Length(len) => {
            let mut buf = vec![0_u8; len as usize];
            stream.read_exact(&mut buf)?;
            Ok(Body::from(buf))
        }
        Framing::Chunked => read_chunked(stream, limit).map(Body::from),
    }
}

fn read_chunked(stream: &mut impl BufRead, limit: u64) -> Result<Vec<u8>, ParseError> {
    let mut body = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        if stream.read_until(b'\n', &mut line)? == 0 {
            return Err(ParseError::IncompleteRequest);
        }

        let size = match httparse::parse_chunk_size(&line) {
            Ok(httparse::Status::Complete((_pos, size))) => size,
            Ok(httparse::Status::Partial) | Err(_) => return Err(ParseError::InvalidChunkSize),
        };

        if size == 0 {
            break;
        }

        if size > limit - body.len() as u64 {
            return Err(ParseError::BodyTooLarge { limit });
        }

        let start = body.len();
        body.resize(start + size as usize, 0);
        stream.read_exact(&mut body[start..])?;

        line.clear();
        stream.read_until(b'\n', &mut line)?;
    }

    // Trailers are read and discarded
    loop {
        line.clear();
        if stream.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if matches!(line.as_slice(), b"\r\n" | b"\n") {
            break;
        }
    }

    Ok(body)
}
