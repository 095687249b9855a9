//! Persisted split records and their identifiers.

use chrono::{DateTime, Utc};
use rand::{Rng, rng};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;
use url::Url;

use crate::split::{SplitMode, SplitOutcome, SplitRequest};

const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
/// Length of a base62-encoded 128-bit value (62^22 > 2^128).
pub const SPLIT_ID_LEN: usize = 22;
const SPLIT_ID_MAX_LEN: usize = 64;

/// Opaque identifier of a split record.
///
/// Freshly generated ids carry 128 bits from the thread-local CSPRNG, rendered as
/// 22 base62 characters. Parsing accepts any non-empty ASCII alphanumeric token up to
/// 64 characters, so links minted by older generators still resolve.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SplitId(String);

impl SplitId {
    pub fn generate() -> Self {
        let value: u128 = rng().random();
        Self(encode_base62(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn encode_base62(mut value: u128) -> String {
    let mut buf = [b'0'; SPLIT_ID_LEN];
    for slot in buf.iter_mut().rev() {
        *slot = BASE62_ALPHABET[(value % 62) as usize];
        value /= 62;
    }
    // Alphabet is ASCII
    buf.iter().map(|b| *b as char).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid split id: {0:?}")]
pub struct SplitIdError(pub String);

impl FromStr for SplitId {
    type Err = SplitIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && s.len() <= SPLIT_ID_MAX_LEN
            && s.chars().all(|c| c.is_ascii_alphanumeric());
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(SplitIdError(s.to_string()))
        }
    }
}

impl Display for SplitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for SplitId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SplitId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SplitId::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// The persisted outcome of one split request.
///
/// Immutable once created. Field names on the wire are camelCase; the payment link is
/// not stored and is derived with [`PaymentLinkBase::link`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitRecord {
    pub id: SplitId,
    pub total_amount: f64,
    pub people_count: u32,
    pub split_amount: f64,
    pub split_mode: SplitMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<f64>>,
    pub created_at: DateTime<Utc>,
}

impl SplitRecord {
    pub fn new(
        id: SplitId,
        request: &SplitRequest,
        outcome: SplitOutcome,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            total_amount: request.total_amount,
            people_count: request.people_count,
            split_amount: outcome.split_amount,
            split_mode: request.split_mode,
            tip_percentage: request
                .tip_percentage
                .filter(|_| request.split_mode == SplitMode::Tip),
            details: outcome.details,
            created_at,
        }
    }
}

/// Public base URL under which `/pay/{id}` pages are served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLinkBase(Url);

impl PaymentLinkBase {
    pub fn new(url: Url) -> Self {
        Self(url)
    }

    /// Builds `{base}/pay/{id}`.
    pub fn link(&self, id: &SplitId) -> String {
        format!("{}/pay/{}", self.0.as_str().trim_end_matches('/'), id)
    }
}
