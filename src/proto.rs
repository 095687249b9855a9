//! Wire types for the split HTTP API.
//!
//! Request bodies are deliberately lenient about number encoding (JSON numbers or numeric
//! strings), since form-driven clients send both. Responses use camelCase field names and
//! the `{success, data}` / `{error}` envelopes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::record::{SplitId, SplitRecord};
use crate::split::{NumericInput, SplitError, SplitMode, SplitRequest};

pub const MISSING_REQUIRED: &str = "Total amount and people count are required";

/// Body of `POST /api/split`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSplitBody {
    #[serde(default)]
    pub total_amount: Option<NumericInput>,
    #[serde(default)]
    pub people_count: Option<NumericInput>,
    #[serde(default)]
    pub split_mode: Option<String>,
    #[serde(default)]
    pub tip_percentage: Option<NumericInput>,
    #[serde(default)]
    pub shares: Option<Vec<NumericInput>>,
}

fn present(input: Option<NumericInput>) -> Option<NumericInput> {
    input.filter(|value| !value.is_blank())
}

impl TryFrom<CreateSplitBody> for SplitRequest {
    type Error = SplitError;

    /// Parses the wire shape. Range and sum checks are left to
    /// [`validate_and_compute`](crate::split::validate_and_compute).
    fn try_from(body: CreateSplitBody) -> Result<Self, Self::Error> {
        let (Some(total), Some(people)) = (present(body.total_amount), present(body.people_count))
        else {
            return Err(SplitError::invalid(MISSING_REQUIRED));
        };
        let total_amount = total
            .to_f64()
            .map_err(|_| SplitError::invalid("Invalid total amount"))?;
        let people_count = people
            .to_count()
            .map_err(|_| SplitError::invalid("Invalid people count"))?;

        let split_mode = match body.split_mode.as_deref().map(str::trim) {
            None | Some("") => SplitMode::default(),
            Some(mode) => SplitMode::from_str(mode).map_err(|e| SplitError::invalid(e.to_string()))?,
        };

        let tip_percentage = present(body.tip_percentage)
            .map(|tip| tip.to_f64())
            .transpose()
            .map_err(|_| SplitError::invalid("Invalid tip percentage"))?;

        let shares = body
            .shares
            .map(|shares| {
                shares
                    .iter()
                    .map(NumericInput::to_f64)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()
            .map_err(|_| SplitError::invalid("Invalid share value"))?;

        Ok(SplitRequest {
            total_amount,
            people_count,
            split_mode,
            tip_percentage,
            shares,
        })
    }
}

/// `{ "success": true, "data": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// `data` of a successful `POST /api/split`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSplitData {
    pub request_id: SplitId,
    pub split_amount: f64,
    pub currency: String,
    pub payment_link: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<f64>>,
}

/// `data` of `GET /api/split/{id}`: the stored record plus derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitView {
    #[serde(flatten)]
    pub record: SplitRecord,
    pub currency: String,
    pub payment_link: String,
    /// `splitAmount` rounded for display, e.g. `"33.3333"`.
    pub display_amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new<S: Into<String>>(error: S) -> Self {
        Self {
            error: error.into(),
        }
    }
}
