//! Split arithmetic.
//!
//! All computation is done in `f64` with no rounding; rounding for display is a separate
//! concern handled by [`format_amount`].

use serde::{Deserialize, Serialize};

use crate::split::{SplitMode, SplitRequest};

/// Percentage shares must sum to 100 within this tolerance.
pub const PERCENTAGE_TOLERANCE: f64 = 0.1;
/// Custom shares must sum to the total amount within this tolerance.
pub const CUSTOM_TOLERANCE: f64 = 0.0001;
/// Decimal places used when rendering amounts.
pub const DISPLAY_DECIMALS: usize = 4;

/// Errors produced while validating or computing a split.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SplitError {
    /// The total, participant count, tip or shares are missing, malformed or out of range.
    #[error("{0}")]
    InvalidInput(String),
    /// Percentage or custom shares do not add up to their target.
    #[error("Shares sum to {sum}, expected {target} (tolerance {tolerance})")]
    ValidationFailed {
        sum: f64,
        target: f64,
        tolerance: f64,
    },
}

impl SplitError {
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        SplitError::InvalidInput(message.into())
    }
}

/// The result of a split computation.
///
/// For [`SplitMode::Percentage`] and [`SplitMode::Custom`], `split_amount` is the average
/// `total / people`, and the amount each participant actually owes is in `details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitOutcome {
    pub split_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<f64>>,
}

/// Computes the split for the given inputs.
///
/// Only the total and participant count are checked here. Share sums are not: use
/// [`validate_and_compute`] for anything that will be persisted.
pub fn compute(
    total_amount: f64,
    people_count: u32,
    mode: SplitMode,
    tip_percentage: Option<f64>,
    shares: Option<&[f64]>,
) -> Result<SplitOutcome, SplitError> {
    if !total_amount.is_finite() || total_amount <= 0.0 {
        return Err(SplitError::invalid("Invalid total amount"));
    }
    if people_count == 0 {
        return Err(SplitError::invalid("Invalid people count"));
    }
    let people = f64::from(people_count);

    let outcome = match mode {
        SplitMode::Equal => SplitOutcome {
            split_amount: total_amount / people,
            details: None,
        },
        SplitMode::Tip => {
            let tip = tip_percentage.unwrap_or(0.0);
            SplitOutcome {
                split_amount: total_amount * (1.0 + tip / 100.0) / people,
                details: None,
            }
        }
        SplitMode::Percentage => {
            let shares = shares.ok_or_else(|| SplitError::invalid("Shares are required"))?;
            SplitOutcome {
                split_amount: total_amount / people,
                details: Some(
                    shares
                        .iter()
                        .map(|share| total_amount * share / 100.0)
                        .collect(),
                ),
            }
        }
        SplitMode::Custom => {
            let shares = shares.ok_or_else(|| SplitError::invalid("Shares are required"))?;
            SplitOutcome {
                split_amount: total_amount / people,
                details: Some(shares.to_vec()),
            }
        }
    };
    Ok(outcome)
}

/// Validates a request and computes its split, failing closed.
///
/// Checks, in order:
/// - total amount is finite and positive, participant count is at least one;
/// - tip percentage, when given, is finite and non-negative;
/// - shares (percentage/custom modes) are present, one per participant, finite and non-negative;
/// - shares sum to 100 (percentage) or to the total amount (custom) within tolerance;
/// - every resulting amount is finite.
pub fn validate_and_compute(request: &SplitRequest) -> Result<SplitOutcome, SplitError> {
    let total = request.total_amount;
    if !total.is_finite() || total <= 0.0 {
        return Err(SplitError::invalid("Invalid total amount"));
    }
    if request.people_count == 0 {
        return Err(SplitError::invalid("Invalid people count"));
    }

    if let Some(tip) = request.tip_percentage {
        if !tip.is_finite() || tip < 0.0 {
            return Err(SplitError::invalid("Invalid tip percentage"));
        }
    }

    if request.split_mode.uses_shares() {
        let shares = request
            .shares
            .as_deref()
            .ok_or_else(|| SplitError::invalid("Shares are required"))?;
        if shares.len() != request.people_count as usize {
            return Err(SplitError::invalid(format!(
                "Expected {} shares, got {}",
                request.people_count,
                shares.len()
            )));
        }
        if shares.iter().any(|share| !share.is_finite() || *share < 0.0) {
            return Err(SplitError::invalid("Invalid share value"));
        }

        let sum: f64 = shares.iter().sum();
        let (target, tolerance) = match request.split_mode {
            SplitMode::Percentage => (100.0, PERCENTAGE_TOLERANCE),
            _ => (total, CUSTOM_TOLERANCE),
        };
        if (sum - target).abs() > tolerance {
            return Err(SplitError::ValidationFailed {
                sum,
                target,
                tolerance,
            });
        }
    }

    let outcome = compute(
        total,
        request.people_count,
        request.split_mode,
        request.tip_percentage,
        request.shares.as_deref(),
    )?;
    // Non-finite amounts do not survive JSON encoding
    let amounts_finite = outcome.split_amount.is_finite()
        && outcome
            .details
            .as_ref()
            .is_none_or(|details| details.iter().all(|amount| amount.is_finite()));
    if !amounts_finite {
        return Err(SplitError::invalid("Amount out of range"));
    }
    Ok(outcome)
}

/// A request that passed [`validate_and_compute`], paired with its outcome.
///
/// This is the only input the record store accepts, so an inconsistent split cannot be
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSplit {
    request: SplitRequest,
    outcome: SplitOutcome,
}

impl ValidatedSplit {
    pub fn new(request: SplitRequest) -> Result<Self, SplitError> {
        let outcome = validate_and_compute(&request)?;
        Ok(Self { request, outcome })
    }

    pub fn request(&self) -> &SplitRequest {
        &self.request
    }

    pub fn outcome(&self) -> &SplitOutcome {
        &self.outcome
    }
}

/// Renders an amount the way the payment page shows it: fixed to four decimals.
pub fn format_amount(amount: f64) -> String {
    format!("{:.*}", DISPLAY_DECIMALS, amount)
}
