use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fmt::Display;

use crate::split::SplitMode;

/// A validated-shape split request, as handed to the calculator.
///
/// Numeric ranges and share sums are not checked here; see
/// [`validate_and_compute`](crate::split::validate_and_compute).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitRequest {
    pub total_amount: f64,
    pub people_count: u32,
    #[serde(default)]
    pub split_mode: SplitMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares: Option<Vec<f64>>,
}

impl SplitRequest {
    pub fn equal(total_amount: f64, people_count: u32) -> Self {
        Self {
            total_amount,
            people_count,
            split_mode: SplitMode::Equal,
            tip_percentage: None,
            shares: None,
        }
    }

    pub fn tip(total_amount: f64, people_count: u32, tip_percentage: f64) -> Self {
        Self {
            split_mode: SplitMode::Tip,
            tip_percentage: Some(tip_percentage),
            ..Self::equal(total_amount, people_count)
        }
    }

    pub fn percentage(total_amount: f64, people_count: u32, shares: Vec<f64>) -> Self {
        Self {
            split_mode: SplitMode::Percentage,
            shares: Some(shares),
            ..Self::equal(total_amount, people_count)
        }
    }

    pub fn custom(total_amount: f64, people_count: u32, shares: Vec<f64>) -> Self {
        Self {
            split_mode: SplitMode::Custom,
            shares: Some(shares),
            ..Self::equal(total_amount, people_count)
        }
    }
}

/// A numeric field as clients actually send it: either a JSON number or a string
/// such as `"100"`, `"$12.50"` or `"1,000"`.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NumericInputError {
    #[error("Invalid number format")]
    InvalidFormat,
    #[error("Number must be finite")]
    NotFinite,
    #[error("Expected a whole number")]
    NotWhole,
    #[error("Number out of range")]
    OutOfRange,
}

static NON_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\d\.\-]+").expect("valid regex"));

impl NumericInput {
    /// Returns `true` for inputs a form would consider "not filled in": blank strings.
    pub fn is_blank(&self) -> bool {
        matches!(self, NumericInput::Text(s) if s.trim().is_empty())
    }

    pub fn to_f64(&self) -> Result<f64, NumericInputError> {
        let value = match self {
            NumericInput::Number(n) => *n,
            NumericInput::Text(s) => match s.trim().parse::<f64>() {
                Ok(value) => value,
                Err(_) => {
                    // Drop currency symbols, thousands separators and whitespace
                    let cleaned = NON_NUMERIC.replace_all(s, "");
                    cleaned
                        .parse::<f64>()
                        .map_err(|_| NumericInputError::InvalidFormat)?
                }
            },
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(NumericInputError::NotFinite)
        }
    }

    /// Interprets the input as a participant count.
    ///
    /// Fractional counts are rejected rather than truncated. Zero and negative
    /// values are passed through as `0` so that range checks report them uniformly.
    pub fn to_count(&self) -> Result<u32, NumericInputError> {
        let value = self.to_f64()?;
        if value.fract() != 0.0 {
            return Err(NumericInputError::NotWhole);
        }
        if value <= 0.0 {
            return Ok(0);
        }
        if value > u32::MAX as f64 {
            return Err(NumericInputError::OutOfRange);
        }
        Ok(value as u32)
    }
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        NumericInput::Number(value)
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        NumericInput::Text(value.to_string())
    }
}

impl Display for NumericInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericInput::Number(n) => write!(f, "{n}"),
            NumericInput::Text(s) => write!(f, "{s}"),
        }
    }
}

impl<'de> Deserialize<'de> for NumericInput {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(NumericInput::Number(n)),
            Raw::Text(s) => Ok(NumericInput::Text(s)),
        }
    }
}

impl Serialize for NumericInput {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            NumericInput::Number(n) => serializer.serialize_f64(*n),
            NumericInput::Text(s) => serializer.serialize_str(s),
        }
    }
}
