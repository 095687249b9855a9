use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

/// The algorithm used to divide a bill among participants.
///
/// Serialized in lowercase (`"equal"`, `"percentage"`, `"custom"`, `"tip"`), which is the
/// form both the HTTP body and the persisted record use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// Everyone pays `total / people`.
    #[default]
    Equal,
    /// Each participant pays a percentage of the total; percentages must sum to 100.
    Percentage,
    /// Each participant pays an absolute amount; amounts must sum to the total.
    Custom,
    /// Everyone pays an equal share of the total plus a tip.
    Tip,
}

impl SplitMode {
    pub fn variants() -> &'static [SplitMode] {
        &[
            SplitMode::Equal,
            SplitMode::Percentage,
            SplitMode::Custom,
            SplitMode::Tip,
        ]
    }

    /// Whether this mode takes a per-participant `shares` list and yields `details`.
    pub fn uses_shares(&self) -> bool {
        matches!(self, SplitMode::Percentage | SplitMode::Custom)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SplitMode::Equal => "equal",
            SplitMode::Percentage => "percentage",
            SplitMode::Custom => "custom",
            SplitMode::Tip => "tip",
        }
    }
}

impl Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown split mode: {0}")]
pub struct UnknownSplitMode(pub String);

impl FromStr for SplitMode {
    type Err = UnknownSplitMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SplitMode::variants()
            .iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| UnknownSplitMode(s.to_string()))
    }
}
