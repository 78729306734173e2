use crate::auth::CredentialVerifier;
use crate::consistency::{list_after_write, PollPolicy};
use crate::errors::{Result, ServiceError};
use crate::export;
use crate::metrics::{DELIVERIES_RECORDED, DELIVERIES_REJECTED, EMPTY_BUCKETS, LOGINS};
use crate::models::{
    DeliveryRequest, DeliveryResponse, LoginRequest, LoginResponse, RecordsQuery,
    SetInitialRequest, SetInitialResponse, SuccessResponse,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use water_ledger::{
    DateRange, DeliveryRecord, InventoryStatus, KvStore, Ledger, RecordLimit, RecordQuery,
};

pub struct DeliveryService {
    pub ledger: Ledger,
    pub query: RecordQuery,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub default_limit: usize,
    pub poll: PollPolicy,
}

impl DeliveryService {
    pub fn new(
        store: Arc<dyn KvStore>,
        verifier: Arc<dyn CredentialVerifier>,
        default_limit: usize,
        poll: PollPolicy,
    ) -> Self {
        DeliveryService {
            ledger: Ledger::new(store.clone()),
            query: RecordQuery::new(store),
            verifier,
            default_limit,
            poll,
        }
    }

    /// Service over a ledger built elsewhere (custom clock, test stores)
    pub fn with_ledger(
        ledger: Ledger,
        query: RecordQuery,
        verifier: Arc<dyn CredentialVerifier>,
        default_limit: usize,
        poll: PollPolicy,
    ) -> Self {
        DeliveryService {
            ledger,
            query,
            verifier,
            default_limit,
            poll,
        }
    }

    pub async fn record_delivery(&self, request: DeliveryRequest) -> Result<DeliveryResponse> {
        let result = self
            .ledger
            .record_delivery(
                request.normal_water,
                request.nongfu_water,
                request.empty_buckets,
            )
            .await
            .map_err(ServiceError::from);

        match result {
            Ok(outcome) => {
                DELIVERIES_RECORDED.inc();
                EMPTY_BUCKETS.set(outcome.current_empty_buckets);
                Ok(DeliveryResponse::from(outcome))
            }
            Err(err) => {
                DELIVERIES_REJECTED
                    .with_label_values(&[err.error_type()])
                    .inc();
                Err(err)
            }
        }
    }

    pub async fn list_records(&self, params: RecordsQuery) -> Result<Vec<DeliveryRecord>> {
        let (limit, range) = self.parse_listing(&params)?;
        let after = parse_token(params.after.as_deref())?;

        let records = list_after_write(&self.query, limit, &range, after, self.poll).await?;
        Ok(records)
    }

    /// Same selection as `list_records`, rendered as a CSV document
    pub async fn export_records(&self, params: RecordsQuery) -> Result<Vec<u8>> {
        let (limit, range) = self.parse_listing(&params)?;
        let records = self.query.list_records(limit, &range).await?;

        let csv = export::render_csv(&records)
            .map_err(|e| ServiceError::Internal(format!("CSV export failed: {}", e)))?;
        info!(count = records.len(), "Exported delivery records");
        Ok(csv)
    }

    pub async fn get_status(&self) -> Result<InventoryStatus> {
        Ok(self.ledger.get_status().await?)
    }

    pub async fn clear_all(&self) -> Result<SuccessResponse> {
        let removed = self.ledger.clear_all().await?;
        warn!(removed, "All delivery data cleared");
        EMPTY_BUCKETS.set(0);
        Ok(SuccessResponse { success: true })
    }

    pub async fn set_initial(&self, request: SetInitialRequest) -> Result<SetInitialResponse> {
        let status = self.ledger.set_initial_buckets(request.empty_buckets).await?;
        EMPTY_BUCKETS.set(status.empty_buckets);
        Ok(SetInitialResponse::from(status))
    }

    pub fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        if self.verifier.verify(&request.username, &request.password) {
            LOGINS.with_label_values(&["success"]).inc();
            info!(username = %request.username, "Login succeeded");
            Ok(LoginResponse {
                success: true,
                message: "Login successful".to_string(),
            })
        } else {
            LOGINS.with_label_values(&["failure"]).inc();
            warn!(username = %request.username, "Login rejected");
            Err(ServiceError::Unauthenticated)
        }
    }

    fn parse_listing(&self, params: &RecordsQuery) -> Result<(RecordLimit, DateRange)> {
        let limit = RecordLimit::parse(params.limit.as_deref(), self.default_limit);
        let start = parse_day("startDate", params.start_date.as_deref())?;
        let end = parse_day("endDate", params.end_date.as_deref())?;

        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(ServiceError::MalformedRequest(format!(
                    "startDate {} cannot be later than endDate {}",
                    start, end
                )));
            }
        }

        Ok((limit, DateRange::new(start, end)))
    }
}

fn parse_day(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                ServiceError::MalformedRequest(format!("{} must be YYYY-MM-DD, got {:?}", field, value))
            }),
    }
}

fn parse_token(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|parsed| Some(parsed.with_timezone(&Utc)))
            .map_err(|_| {
                ServiceError::MalformedRequest(format!("after must be an RFC 3339 timestamp, got {:?}", value))
            }),
    }
}
