use serde::{Deserialize, Serialize};
use water_ledger::{DeliveryOutcome, DeliveryRecord, InventoryStatus};

/// Delivery submission from the form
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRequest {
    pub normal_water: i64,
    pub nongfu_water: i64,
    pub empty_buckets: i64, // Empties collected during this delivery
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResponse {
    pub success: bool,
    pub record: DeliveryRecord,
    pub current_empty_buckets: i64,
}

impl From<DeliveryOutcome> for DeliveryResponse {
    fn from(outcome: DeliveryOutcome) -> Self {
        DeliveryResponse {
            success: true,
            record: outcome.record,
            current_empty_buckets: outcome.current_empty_buckets,
        }
    }
}

/// Seed request; a missing value seeds zero
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetInitialRequest {
    #[serde(default)]
    pub empty_buckets: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetInitialResponse {
    pub success: bool,
    pub empty_buckets: i64,
}

impl From<InventoryStatus> for SetInitialResponse {
    fn from(status: InventoryStatus) -> Self {
        SetInitialResponse {
            success: true,
            empty_buckets: status.empty_buckets,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Query string of `GET /api/records`.
///
/// Values are kept raw so that bad input degrades the way the form expects
/// (a junk `limit` means the default, not an error).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsQuery {
    pub limit: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Read-after-write token: the `timestamp` of a record just created
    pub after: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}
