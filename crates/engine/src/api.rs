use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{BatchResponse, FieldMap, ItemResult, LeadId, PartitionId};

/// Error surfaced by a `LeadApi` implementation.
///
/// The engine never inspects it beyond its description: transport detail
/// stays with the implementation, the description ends up in the affected
/// position's failure message (or the run's error message for the submit
/// call itself).
#[derive(Debug, Clone)]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

// ---------------------------------------------------------------------------
// Lookup / update response shapes
// ---------------------------------------------------------------------------

/// An existing platform lead returned by a key lookup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadMatch {
    pub id: LeadId,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Remaining lead fields as the platform returned them.
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl LeadMatch {
    /// Timestamp used to rank matches: last modification, falling back to
    /// creation, falling back to the Unix epoch when the platform returned
    /// neither.
    pub fn last_touched(&self) -> DateTime<Utc> {
        self.updated_at
            .or(self.created_at)
            .unwrap_or(DateTime::UNIX_EPOCH)
    }
}

/// Result of a find-by-key lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct LookupResponse {
    pub success: bool,
    #[serde(default)]
    pub result: Vec<LeadMatch>,
}

/// Result of an update-by-key call.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateResponse {
    pub success: bool,
    #[serde(default)]
    pub result: Option<Vec<ItemResult>>,
}

// ---------------------------------------------------------------------------
// The API seam
// ---------------------------------------------------------------------------

/// The remote lead API the engine reconciles against.
///
/// Implementations own transport, auth, and any retry policy. Calls block
/// until the platform answers; the engine is a deterministic sequential
/// pipeline over them.
pub trait LeadApi {
    /// Upsert leads in submission order. Returns one response per
    /// fixed-size chunk, in chunk order.
    fn sync_leads(
        &self,
        leads: &[FieldMap],
        partition: PartitionId,
    ) -> Result<Vec<BatchResponse>, ApiError>;

    /// Upsert a single lead.
    fn sync_one(&self, lead: &FieldMap, partition: PartitionId)
        -> Result<BatchResponse, ApiError>;

    /// Find existing leads by natural key. A `None` key field means the
    /// implementation's default lookup field (email).
    fn find_by_key(
        &self,
        key_value: &str,
        key_field: Option<&str>,
        partition: PartitionId,
    ) -> Result<LookupResponse, ApiError>;

    /// Update one existing lead addressed by `key_field`/`key_value`. The
    /// lead map already carries the target identifier.
    fn update_by_key(
        &self,
        lead: &FieldMap,
        key_field: &str,
        key_value: &str,
        partition: PartitionId,
    ) -> Result<UpdateResponse, ApiError>;
}
