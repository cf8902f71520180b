//! Page identifiers
//!
//! A slug is the site-relative path of a page with no leading or trailing
//! slash, no query or fragment, and percent-escapes decoded. Equality is
//! equality of that normalized form.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Normalize a raw path-like string.
    pub fn new(raw: &str) -> Self {
        let path = raw
            .split('#')
            .next()
            .unwrap_or("")
            .split('?')
            .next()
            .unwrap_or("");
        let decoded = percent_decode_str(path).decode_utf8_lossy();

        let mut segments: Vec<&str> = Vec::new();
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }
        Slug(segments.join("/"))
    }

    /// Slug of the page a URL points at.
    pub fn from_url(url: &Url) -> Self {
        Slug::new(url.path())
    }

    /// Resolve `href` against `base` and take the slug of the result.
    pub fn resolve(base: &Url, href: &str) -> Result<Self, url::ParseError> {
        Ok(Slug::from_url(&base.join(href)?))
    }

    /// Slug used as a key inside one stacked-notes session. The site root
    /// becomes `index` and folder pages become `{folder}/index`, so they
    /// cannot collide with a sibling page of the same name.
    pub fn for_stack(url: &Url) -> Self {
        let slug = Slug::from_url(url);
        if slug.is_empty() {
            Slug("index".to_string())
        } else if url.path().ends_with('/') {
            Slug(format!("{}/index", slug.0))
        } else {
            slug
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Site-absolute path for this slug. `index` pages map to their folder.
    pub fn path(&self) -> String {
        if self.0 == "index" {
            "/".to_string()
        } else if let Some(folder) = self.0.strip_suffix("/index") {
            format!("/{}/", folder)
        } else {
            format!("/{}", self.0)
        }
    }

    pub fn to_url(&self, base: &Url) -> Result<Url, url::ParseError> {
        base.join(&self.path())
    }

    /// True if the first path segment is `segment`.
    pub fn starts_with_segment(&self, segment: &str) -> bool {
        self.0.split('/').next() == Some(segment)
    }

    /// True if any path segment equals `segment`.
    pub fn has_segment(&self, segment: &str) -> bool {
        self.0.split('/').any(|s| s == segment)
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Slug {
    fn from(raw: &str) -> Self {
        Slug::new(raw)
    }
}

impl From<String> for Slug {
    fn from(raw: String) -> Self {
        Slug::new(&raw)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
