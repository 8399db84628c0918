//! Entity identifiers and the cursor codec.
//!
//! Every entity is keyed by a random UUID. The same value doubles as the
//! pagination cursor, so the only way to turn client input into an
//! [`Identifier`] is [`CursorCodec::parse`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Length of the canonical `8-4-4-4-12` rendering.
const CANONICAL_LEN: usize = 36;

/// Byte offsets of the group separators in the canonical rendering.
const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// Rejected input is echoed back in errors, truncated to this many chars.
const MAX_ECHOED_CHARS: usize = 40;

/// Opaque identifier of a stored entity.
///
/// Wraps a UUID so that raw strings cannot be passed where a validated
/// cursor is expected. Ordering follows the UUID byte order, which matches
/// the order PostgreSQL applies to `uuid` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(Uuid);

impl Identifier {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID, for binding into queries.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for Identifier {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for Identifier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CursorCodec::parse(s)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        CursorCodec::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Converts between cursor tokens and identifiers.
pub struct CursorCodec;

impl CursorCodec {
    /// Parse a cursor token.
    ///
    /// Only the canonical hyphenated form is accepted (hex digits of either
    /// case). Simple, braced and URN renderings are rejected even though
    /// they name a valid UUID.
    pub fn parse(raw: &str) -> DomainResult<Identifier> {
        if !is_canonical(raw) {
            return Err(invalid_cursor(raw));
        }

        Uuid::try_parse(raw)
            .map(Identifier)
            .map_err(|_| invalid_cursor(raw))
    }

    /// Render an identifier as a cursor token.
    pub fn render(id: &Identifier) -> String {
        id.to_string()
    }
}

fn is_canonical(raw: &str) -> bool {
    raw.len() == CANONICAL_LEN
        && raw.bytes().enumerate().all(|(i, b)| {
            if HYPHEN_POSITIONS.contains(&i) {
                b == b'-'
            } else {
                b.is_ascii_hexdigit()
            }
        })
}

fn invalid_cursor(raw: &str) -> DomainError {
    let echoed: String = raw.chars().take(MAX_ECHOED_CHARS).collect();
    DomainError::InvalidCursor(format!(
        "'{}' is not a hyphenated UUID (8-4-4-4-12 hex digits)",
        echoed
    ))
}
