//! The split service: validation, persistence and link construction behind one handle.
//!
//! [`SplitService`] is what the HTTP handlers hold as state. It owns the record store
//! (and through it the backing store handle), the public base URL used for payment links,
//! and the currency label reported to clients.

use tracing::instrument;

use crate::proto::{CreatedSplitData, SplitView};
use crate::record::PaymentLinkBase;
use crate::split::{SplitError, SplitRequest, ValidatedSplit, format_amount};
use crate::store::{KeyValueStore, SplitRecordStore, StoreError};

pub const DEFAULT_CURRENCY: &str = "ETH";

/// Everything that can go wrong while creating a split.
#[derive(Debug, thiserror::Error)]
pub enum CreateSplitError {
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct SplitService<S> {
    records: SplitRecordStore<S>,
    links: PaymentLinkBase,
    currency: String,
}

impl<S> SplitService<S> {
    pub fn new(records: SplitRecordStore<S>, links: PaymentLinkBase) -> Self {
        Self {
            records,
            links,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    pub fn with_currency<C: Into<String>>(mut self, currency: C) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}

impl<S: KeyValueStore + Sync> SplitService<S> {
    /// Validates the request, persists a record and returns what the client needs to share it.
    ///
    /// Nothing is written when validation fails.
    #[instrument(skip_all, err, fields(split_mode = %request.split_mode, people = request.people_count))]
    pub async fn create_split(
        &self,
        request: SplitRequest,
    ) -> Result<CreatedSplitData, CreateSplitError> {
        let split = ValidatedSplit::new(request)?;
        let record = self.records.create(&split).await?;
        Ok(CreatedSplitData {
            payment_link: self.links.link(&record.id),
            request_id: record.id,
            split_amount: record.split_amount,
            currency: self.currency.clone(),
            created_at: record.created_at,
            details: record.details,
        })
    }

    /// Resolves a payment link id to its record.
    #[instrument(skip_all, err, fields(id = %id))]
    pub async fn get_split(&self, id: &str) -> Result<SplitView, StoreError> {
        let record = self.records.get(id).await?;
        Ok(SplitView {
            payment_link: self.links.link(&record.id),
            display_amount: format_amount(record.split_amount),
            currency: self.currency.clone(),
            record,
        })
    }
}
