use serde::{Deserialize, Serialize};

/// One lead's field values, keyed by platform field name.
///
/// Keys keep insertion order (`preserve_order`), but the engine never relies
/// on it: positional correlation always goes through the lead's index in the
/// submitted slice.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Platform-assigned lead identifier.
pub type LeadId = i64;

/// Lead partition the run is scoped to.
pub type PartitionId = i64;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Original CSV representation of the submitted leads, aligned by position.
///
/// `rows[i]` is the source row for lead `i`. Positions past the end of
/// `rows` have no source row and are silently skipped during failure
/// re-export. Read-only for the whole run.
#[derive(Debug, Clone)]
pub struct CsvSidecar {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Response wire shapes
// ---------------------------------------------------------------------------

/// Reason attached to a skipped item result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reason {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

/// One item outcome inside a chunk-success response, in submission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemResult {
    pub status: String,
    #[serde(default)]
    pub id: Option<LeadId>,
    /// Only populated for skipped items, and even then not always; a skipped
    /// item with no reasons is a valid outcome of its own.
    #[serde(default)]
    pub reasons: Option<Vec<Reason>>,
}

/// Top-level error attached to a batch response.
///
/// `partition: false` on the very first response means the requested
/// partition does not exist and nothing was processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    #[serde(default)]
    pub partition: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// One unit of the response sequence, covering one fixed-size chunk of the
/// submitted leads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success: bool,
    #[serde(default)]
    pub result: Option<Vec<ItemResult>>,
    #[serde(default)]
    pub error: Option<ResponseError>,
}

impl BatchResponse {
    /// Per-item results when this chunk's call succeeded, `None` when the
    /// chunk failed as a unit.
    pub fn items(&self) -> Option<&[ItemResult]> {
        if self.success {
            self.result.as_deref()
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Final outcome for one input position.
///
/// Exactly one outcome exists per position once classification (and, when
/// enabled, duplicate resolution) has run. This is the engine's central
/// accounting invariant.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The platform created or updated the lead.
    Passed {
        id: Option<LeadId>,
        note: Option<String>,
    },
    /// Skipped because more than one existing lead matched the lookup key.
    Duplicate {
        id: Option<LeadId>,
        message: String,
    },
    /// Rejected, or covered by a failed chunk.
    Failed { message: String },
}

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

/// A lead the platform accepted, with its assigned identifier.
#[derive(Debug, Clone, Serialize)]
pub struct PassedLead {
    pub lead: FieldMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<LeadId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A lead left in the ambiguous-duplicate state (resolution disabled).
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateLead {
    pub lead: FieldMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<LeadId>,
    pub message: String,
}

/// A lead the run could not create or update.
#[derive(Debug, Clone, Serialize)]
pub struct FailedLead {
    pub lead: FieldMap,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Summary + Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    PartialFailure,
    TotalFailure,
    /// An external call itself failed; infrastructure problem, not a
    /// per-lead business rejection.
    Error,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::PartialFailure => write!(f, "partial_failure"),
            Self::TotalFailure => write!(f, "total_failure"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Bucket counts for user-facing messaging.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub passed: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub total: usize,
}

/// Everything a formatting layer needs to render the run's result.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub message: String,
    pub summary: RunSummary,
    pub passed: Vec<PassedLead>,
    pub duplicates: Vec<DuplicateLead>,
    pub failed: Vec<FailedLead>,
    /// Original CSV rows for failed positions, serialized as one CSV blob.
    /// Only present on failure outcomes when a sidecar was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_export: Option<String>,
}

impl RunReport {
    /// Report for an error raised by the submit call itself, before any
    /// per-lead outcome exists.
    pub fn infra_error(message: impl Into<String>, total: usize) -> Self {
        Self {
            status: RunStatus::Error,
            message: message.into(),
            summary: RunSummary {
                passed: 0,
                duplicates: 0,
                failed: 0,
                total,
            },
            passed: Vec::new(),
            duplicates: Vec::new(),
            failed: Vec::new(),
            failed_export: None,
        }
    }

    /// Report for a run the platform rejected before per-item processing
    /// (capability error, e.g. an unknown partition). Nothing was
    /// classified, so the whole input counts as failed.
    pub fn rejected(message: impl Into<String>, total: usize) -> Self {
        Self {
            status: RunStatus::TotalFailure,
            message: message.into(),
            summary: RunSummary {
                passed: 0,
                duplicates: 0,
                failed: total,
                total,
            },
            passed: Vec::new(),
            duplicates: Vec::new(),
            failed: Vec::new(),
            failed_export: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_failure_has_no_items() {
        let response = BatchResponse {
            success: false,
            result: None,
            error: None,
        };
        assert!(response.items().is_none());

        // success=false wins even if a result list is present
        let response = BatchResponse {
            success: false,
            result: Some(vec![]),
            error: None,
        };
        assert!(response.items().is_none());
    }

    #[test]
    fn item_result_deserializes_without_optional_fields() {
        let item: ItemResult = serde_json::from_str(r#"{"status":"created","id":311}"#).unwrap();
        assert_eq!(item.status, "created");
        assert_eq!(item.id, Some(311));
        assert!(item.reasons.is_none());

        let item: ItemResult = serde_json::from_str(r#"{"status":"skipped"}"#).unwrap();
        assert!(item.id.is_none());
        assert!(item.reasons.is_none());
    }

    #[test]
    fn run_status_serializes_snake_case() {
        let json = serde_json::to_value(RunStatus::PartialFailure).unwrap();
        assert_eq!(json.as_str(), Some("partial_failure"));
        assert_eq!(RunStatus::TotalFailure.to_string(), "total_failure");
    }
}
