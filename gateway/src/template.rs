//! Stored URL templates and page size resolution.

use std::fmt;

/// Row bound for one gateway call. Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EffectivePageSize(usize);

impl EffectivePageSize {
    /// The caller's limit when it is present and positive, otherwise `default`.
    ///
    /// A zero `default` is lifted to 1.
    pub fn resolve(requested: Option<i64>, default: usize) -> Self {
        match requested {
            Some(limit) if limit > 0 => {
                EffectivePageSize(usize::try_from(limit).unwrap_or(usize::MAX))
            }
            _ => EffectivePageSize(default.max(1)),
        }
    }

    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for EffectivePageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A catalog item's upstream URL, possibly carrying a page size placeholder.
#[derive(Debug, Clone, Copy)]
pub struct UrlTemplate<'a> {
    raw: &'a str,
    placeholder: &'a str,
}

/// The URL actually sent upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    pub url: String,
    /// Whether the upstream received a size hint through the placeholder.
    pub has_placeholder: bool,
}

impl<'a> UrlTemplate<'a> {
    pub fn new(raw: &'a str, placeholder: &'a str) -> Self {
        UrlTemplate { raw, placeholder }
    }

    pub fn has_placeholder(&self) -> bool {
        !self.placeholder.is_empty() && self.raw.contains(self.placeholder)
    }

    /// Replaces every placeholder occurrence with the page size.
    ///
    /// Templates without the placeholder are returned untouched; no query
    /// parameters are ever added.
    pub fn resolve(&self, page_size: EffectivePageSize) -> ResolvedUrl {
        if self.has_placeholder() {
            ResolvedUrl {
                url: self.raw.replace(self.placeholder, &page_size.to_string()),
                has_placeholder: true,
            }
        } else {
            ResolvedUrl {
                url: self.raw.to_string(),
                has_placeholder: false,
            }
        }
    }
}
