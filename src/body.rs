use std::io::Cursor;

/// A fully buffered HTTP message body.
///
/// Request bodies are read completely (up to the configured limit) before the
/// [`App`](crate::App) sees them, and responses are always small, so there is
/// no streaming variant.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Body(Vec<u8>);

impl Body {
    pub fn empty() -> Self {
        Body(Vec::new())
    }

    pub fn len(&self) -> u64 {
        self.0.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn into_reader(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.0)
    }
}

impl From<Vec<u8>> for Body {
    fn from(body: Vec<u8>) -> Self {
        Body(body)
    }
}

impl From<&[u8]> for Body {
    fn from(body: &[u8]) -> Self {
        body.to_vec().into()
    }
}

impl From<&str> for Body {
    fn from(body: &str) -> Self {
        body.as_bytes().to_vec().into()
    }
}

impl From<String> for Body {
    fn from(body: String) -> Self {
        body.into_bytes().into()
    }
}

impl From<()> for Body {
    fn from(_: ()) -> Self {
        Body::empty()
    }
}
