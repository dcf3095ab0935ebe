//! Form-data extraction from request bodies.
//!
//! Both `application/x-www-form-urlencoded` and `multipart/form-data` bodies
//! are understood (the latter with the `multipart` feature). Anything else,
//! including a request without a `Content-Type`, is not form data.

use std::io;

use http::{header::CONTENT_TYPE, Request};
use thiserror::Error;

use crate::body::Body;

const URLENCODED: &str = "application/x-www-form-urlencoded";
#[cfg(feature = "multipart")]
const MULTIPART: &str = "multipart/form-data";

#[derive(Error, Debug)]
pub enum FormError {
    #[error("missing Content-Type header")]
    MissingContentType,
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
    #[error("missing multipart boundary")]
    MissingBoundary,
    #[error("malformed form body")]
    Io(#[from] io::Error),
}

/// The value of one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    /// An uploaded file. Only multipart bodies produce these.
    File { filename: String },
}

impl FormValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(text) => Some(text),
            FormValue::File { .. } => None,
        }
    }
}

/// Fields of a form body, in the order they were submitted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Form {
    fields: Vec<(String, FormValue)>,
}

impl Form {
    pub fn from_request(req: Request<Body>) -> Result<Self, FormError> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .ok_or(FormError::MissingContentType)?;

        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();

        if media_type.eq_ignore_ascii_case(URLENCODED) {
            return Ok(Form::from_urlencoded(req.body().as_bytes()));
        }

        #[cfg(feature = "multipart")]
        {
            if media_type.eq_ignore_ascii_case(MULTIPART) {
                return crate::multipart::read_fields(req).map(|fields| Form { fields });
            }
        }

        Err(FormError::UnsupportedContentType(media_type.to_owned()))
    }

    pub fn from_urlencoded(body: &[u8]) -> Self {
        form_urlencoded::parse(body)
            .map(|(name, value)| (name.into_owned(), FormValue::Text(value.into_owned())))
            .collect()
    }

    /// First value submitted under `name`.
    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, FormValue)> for Form {
    fn from_iter<T: IntoIterator<Item = (String, FormValue)>>(iter: T) -> Self {
        Form {
            fields: iter.into_iter().collect(),
        }
    }
}
