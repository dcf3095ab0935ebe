use std::io::{Cursor, Read};

use http::{header::CONTENT_TYPE, Request};
use multipart::server::{HttpRequest, Multipart};

use crate::{
    body::Body,
    form::{FormError, FormValue},
};

struct MultipartRequest(Request<Body>);

impl HttpRequest for MultipartRequest {
    type Body = Cursor<Vec<u8>>;

    fn multipart_boundary(&self) -> Option<&str> {
        let content_type = self.0.headers().get(CONTENT_TYPE)?.to_str().ok()?;

        // Parameters follow the media type, the name is case-insensitive
        content_type
            .split(';')
            .skip(1)
            .filter_map(|param| param.split_once('='))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("boundary"))
            .map(|(_, value)| value.trim().trim_matches('"'))
            .filter(|boundary| !boundary.is_empty())
    }

    fn body(self) -> Self::Body {
        self.0.into_body().into_reader()
    }
}

/// Reads every part of a `multipart/form-data` body into form fields.
pub(crate) fn read_fields(req: Request<Body>) -> Result<Vec<(String, FormValue)>, FormError> {
    let mut multipart =
        Multipart::from_request(MultipartRequest(req)).map_err(|_| FormError::MissingBoundary)?;

    let mut fields = Vec::new();

    while let Some(mut field) = multipart.read_entry()? {
        let name = field.headers.name.to_string();

        let value = match field.headers.filename.take() {
            Some(filename) => FormValue::File { filename },
            None => {
                let mut buf = Vec::new();
                field.data.read_to_end(&mut buf)?;
                FormValue::Text(String::from_utf8_lossy(&buf).into_owned())
            }
        };

        fields.push((name, value));
    }

    Ok(fields)
}
