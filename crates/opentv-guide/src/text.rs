//! Text helpers shared by the encoders.

use std::borrow::Cow;

/// How field values are inserted into encoded documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Escaping {
    /// Insert values as-is (byte-for-byte compatible output).
    #[default]
    Verbatim,
    /// Escape `&`, `<`, `>`, `"` and `'` as XML entities.
    Xml,
}

impl Escaping {
    /// Applies the escaping mode to `value`.
    #[must_use]
    pub fn apply<'a>(self, value: &'a str) -> Cow<'a, str> {
        match self {
            Self::Verbatim => Cow::Borrowed(value),
            Self::Xml => quick_xml::escape::escape(value),
        }
    }
}

/// Joins a base URL and a relative path with exactly one `/` between them.
#[must_use]
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
