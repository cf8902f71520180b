//! Canonical hash: the URL token for one open stacked note
//!
//! `encode` escapes every `_` as `%5F`, substitutes every `.` with a literal
//! marker and base64-encodes the result without padding. Escaping keeps the
//! marker unambiguous, so a slug that itself contains the marker text still
//! round-trips; slugs without `_` encode exactly as before. `decode` reverses
//! it and fails closed: any malformed token, a bare `_` outside a marker, or
//! a slug outside the allowed character set decodes to nothing.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::error::HashError;
use crate::slug::Slug;

const DOT_MARKER: &str = "___DOT___";
const UNDERSCORE_ESCAPE: &str = "%5F";

const ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    NO_PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

static ALLOWED: OnceLock<Regex> = OnceLock::new();

fn allowed() -> &'static Regex {
    ALLOWED.get_or_init(|| Regex::new(r"^[a-zA-Z0-9/._\-]+$").expect("static pattern"))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalHash(String);

impl CanonicalHash {
    pub fn encode(slug: &Slug) -> Self {
        let marked = slug
            .as_str()
            .replace('_', UNDERSCORE_ESCAPE)
            .replace('.', DOT_MARKER);
        CanonicalHash(ENGINE.encode(marked.as_bytes()))
    }

    pub fn try_decode(token: &str) -> Result<Slug, HashError> {
        let bytes = ENGINE
            .decode(token.trim())
            .map_err(|e| HashError::InvalidBase64(e.to_string()))?;
        let marked = String::from_utf8(bytes).map_err(|_| HashError::InvalidUtf8)?;
        let unmarked = marked.replace(DOT_MARKER, ".");
        if unmarked.contains('_') {
            return Err(HashError::DisallowedCharacters(unmarked));
        }
        let raw = unmarked.replace(UNDERSCORE_ESCAPE, "_");
        if !allowed().is_match(&raw) {
            return Err(HashError::DisallowedCharacters(raw));
        }
        Ok(Slug::new(&raw))
    }

    /// Decode, treating every failure as "absent".
    pub fn decode(token: &str) -> Option<Slug> {
        match Self::try_decode(token) {
            Ok(slug) => Some(slug),
            Err(err) => {
                tracing::warn!(token, %err, "skipping undecodable stacked note");
                None
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
