use std::io::{self, Write};

use headers::HeaderMapExt;
use http::{Response, StatusCode};

use crate::body::Body;

pub(crate) enum Outcome {
    KeepAlive,
    Close,
}

/// Statuses that must never carry a message body.
fn is_bodyless(status: StatusCode) -> bool {
    status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
}

pub(crate) fn write_response(res: Response<Body>, stream: &mut impl Write) -> io::Result<Outcome> {
    let (parts, body) = res.into_parts();

    let outcome = match parts.headers.typed_get::<headers::Connection>() {
        Some(conn) if conn.contains("close") => Outcome::Close,
        _ => Outcome::KeepAlive,
    };

    stream.write_all(format!("{:?} {}\r\n", parts.version, parts.status).as_bytes())?;

    for (name, val) in parts.headers.iter() {
        stream.write_all(&[format!("{name}: ").as_bytes(), val.as_bytes(), b"\r\n"].concat())?;
    }

    if is_bodyless(parts.status) {
        stream.write_all(b"\r\n")?;
        return Ok(outcome);
    }

    if !parts.headers.contains_key(http::header::CONTENT_LENGTH) {
        stream.write_all(format!("content-length: {}\r\n", body.len()).as_bytes())?;
    }

    stream.write_all(b"\r\n")?;
    stream.write_all(body.as_bytes())?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn written(res: Response<Body>) -> Vec<u8> {
        let mut output: Cursor<Vec<u8>> = Cursor::new(Vec::new());
        write_response(res, &mut output).unwrap();
        output.into_inner()
    }

    #[test]
    fn writes_responses_without_bodies() {
        let res = Response::builder()
            .status(StatusCode::OK)
            .header("some", "header")
            .body(Body::empty())
            .unwrap();

        assert_eq!(
            written(res),
            b"HTTP/1.1 200 OK\r\nsome: header\r\ncontent-length: 0\r\n\r\n"
        );
    }

    #[test]
    fn writes_responses_with_bodies() {
        let res = Response::builder()
            .status(StatusCode::OK)
            .body(Body::from("42"))
            .unwrap();

        assert_eq!(
            written(res),
            b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\n42"
        );
    }

    #[test]
    fn omits_body_and_length_for_no_content() {
        let res = Response::builder()
            .status(StatusCode::NO_CONTENT)
            .header("access-control-allow-origin", "*")
            .body(Body::from("dropped"))
            .unwrap();

        assert_eq!(
            written(res),
            b"HTTP/1.1 204 No Content\r\naccess-control-allow-origin: *\r\n\r\n"
        );
    }

    #[test]
    fn writes_interim_continue() {
        let res = Response::builder()
            .status(StatusCode::CONTINUE)
            .body(Body::empty())
            .unwrap();

        assert_eq!(written(res), b"HTTP/1.1 100 Continue\r\n\r\n");
    }

    #[test]
    fn reports_close_when_asked() {
        let res = Response::builder()
            .header("connection", "close")
            .body(Body::empty())
            .unwrap();

        let mut output = Vec::new();
        let outcome = write_response(res, &mut output).unwrap();

        assert!(matches!(outcome, Outcome::Close));
    }
}
