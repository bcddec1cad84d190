//! Parsing of platform-issued identification codes.
//!
//! A code has the shape `notify:user:<identity>:<secret>[@domain]`. The
//! `@domain` suffix is cosmetic and is stripped before the segments are
//! counted; the identity segment is the key under which access tokens are
//! cached.

use std::fmt;
use std::str::FromStr;

/// Prefix every identification code must start with.
pub const CODE_PREFIX: &str = "notify:user:";

/// Number of colon-delimited segments in a well-formed code.
const SEGMENT_COUNT: usize = 4;

/// Errors produced when an identification code is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// The code does not start with [`CODE_PREFIX`].
    #[error("identification code must look like notify:user:<id>:<secret>[@domain]")]
    MissingPrefix,

    /// The code (with any `@domain` suffix removed) has the wrong number of segments.
    #[error("identification code must have 4 colon-separated segments, found {0}")]
    SegmentCount(usize),

    /// The identity segment is empty.
    #[error("identification code has an empty identity segment")]
    EmptyIdentity,
}

/// A decomposed identification code.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityCode {
    identity: String,
    secret: String,
    domain: Option<String>,
    source_code: String,
}

impl IdentityCode {
    /// Parses and validates a raw identification code.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] if the prefix is missing, the segment count is
    /// not four after stripping the domain, or the identity segment is empty.
    pub fn parse(raw: &str) -> Result<Self, FormatError> {
        if !raw.starts_with(CODE_PREFIX) {
            return Err(FormatError::MissingPrefix);
        }

        let (body, domain) = match raw.split_once('@') {
            Some((body, domain)) => (body, Some(domain)),
            None => (raw, None),
        };

        let segments: Vec<&str> = body.split(':').collect();
        if segments.len() != SEGMENT_COUNT {
            return Err(FormatError::SegmentCount(segments.len()));
        }
        if segments[2].is_empty() {
            return Err(FormatError::EmptyIdentity);
        }

        Ok(Self {
            identity: segments[2].to_string(),
            secret: segments[3].to_string(),
            domain: domain.filter(|d| !d.is_empty()).map(str::to_string),
            source_code: raw.to_string(),
        })
    }

    /// The stable identity key (third segment).
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The secret segment. Only ever sent to the platform as part of the
    /// untouched source code during exchange.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// The optional `@domain` suffix, without the `@`.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// The original, unmodified code as supplied by the caller.
    pub fn source_code(&self) -> &str {
        &self.source_code
    }
}

impl FromStr for IdentityCode {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for IdentityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityCode")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .field("domain", &self.domain)
            .finish()
    }
}
