// src/models/ingest_job.rs
// DOCUMENTATION: Persisted state of one CSV upload
// PURPOSE: Track the validate -> apply lifecycle and its outcome

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle status of an ingest job
/// DOCUMENTATION: validated -> completed | completed_with_errors | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Validated,
    Completed,
    CompletedWithErrors,
    Failed,
}

impl IngestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStatus::Validated => "validated",
            IngestStatus::Completed => "completed",
            IngestStatus::CompletedWithErrors => "completed_with_errors",
            IngestStatus::Failed => "failed",
        }
    }

    /// Only validated jobs can be applied
    pub fn can_apply(&self) -> bool {
        matches!(self, IngestStatus::Validated)
    }

    /// Final status once every row has been attempted
    pub fn from_outcome(failed_rows: usize) -> Self {
        if failed_rows > 0 {
            IngestStatus::CompletedWithErrors
        } else {
            IngestStatus::Completed
        }
    }
}

impl fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "validated" => Ok(IngestStatus::Validated),
            "completed" => Ok(IngestStatus::Completed),
            "completed_with_errors" => Ok(IngestStatus::CompletedWithErrors),
            "failed" => Ok(IngestStatus::Failed),
            other => Err(format!("unknown ingest status '{}'", other)),
        }
    }
}

/// One validation or apply problem, pinned to a data row and a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestIssue {
    /// 1-based data row number (header excluded); 0 for file-level issues
    pub row: usize,
    pub field: String,
    pub message: String,
}

impl IngestIssue {
    pub fn new(row: usize, field: &str, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for IngestIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {} [{}]: {}", self.row, self.field, self.message)
    }
}

/// Ingest job summary as stored in ingest_jobs (row payload excluded)
#[derive(Debug, Clone, FromRow)]
pub struct IngestJobRecord {
    pub id: Uuid,
    pub filename: String,
    pub status: String,
    pub total_rows: i32,
    pub valid_rows: i32,
    pub errors: Json<Vec<IngestIssue>>,
    pub warnings: Json<Vec<IngestIssue>>,
    pub created_count: i32,
    pub updated_count: i32,
    pub failed_count: i32,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub applied_at: Option<DateTime<Utc>>,
}

/// Ingest job as exposed by the admin API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestJob {
    pub id: Uuid,
    pub filename: String,
    pub status: IngestStatus,
    pub total_rows: i32,
    pub valid_rows: i32,
    pub errors: Vec<IngestIssue>,
    pub warnings: Vec<IngestIssue>,
    pub created_count: i32,
    pub updated_count: i32,
    pub failed_count: i32,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub applied_at: Option<DateTime<Utc>>,
}

impl IngestJobRecord {
    pub fn into_job(self) -> IngestJob {
        let status = self.status.parse().unwrap_or_else(|e| {
            log::warn!("Ingest job {} has {}; treating as failed", self.id, e);
            IngestStatus::Failed
        });

        IngestJob {
            id: self.id,
            filename: self.filename,
            status,
            total_rows: self.total_rows,
            valid_rows: self.valid_rows,
            errors: self.errors.0,
            warnings: self.warnings.0,
            created_count: self.created_count,
            updated_count: self.updated_count,
            failed_count: self.failed_count,
            created_by: self.created_by,
            created_at: self.created_at,
            applied_at: self.applied_at,
        }
    }
}

/// Response of POST /api/admin/ingest/{id}/apply
#[derive(Debug, Serialize)]
pub struct IngestApplyResponse {
    #[serde(flatten)]
    pub job: IngestJob,
    /// Rows folded into an existing near-duplicate (also counted as updated)
    pub merged_count: usize,
}

/// Query string of POST /api/admin/ingest
#[derive(Debug, Deserialize)]
pub struct IngestUploadQuery {
    pub filename: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            IngestStatus::Validated,
            IngestStatus::Completed,
            IngestStatus::CompletedWithErrors,
            IngestStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<IngestStatus>().unwrap(), status);
        }
        assert!("pending".parse::<IngestStatus>().is_err());
    }

    #[test]
    fn test_only_validated_jobs_apply() {
        assert!(IngestStatus::Validated.can_apply());
        assert!(!IngestStatus::Completed.can_apply());
        assert!(!IngestStatus::CompletedWithErrors.can_apply());
        assert!(!IngestStatus::Failed.can_apply());
    }

    #[test]
    fn test_status_from_outcome() {
        assert_eq!(IngestStatus::from_outcome(0), IngestStatus::Completed);
        assert_eq!(
            IngestStatus::from_outcome(2),
            IngestStatus::CompletedWithErrors
        );
    }

    #[test]
    fn test_issue_display_names_row_and_field() {
        let issue = IngestIssue::new(4, "latitude", "must be between -90 and 90");
        assert_eq!(
            issue.to_string(),
            "row 4 [latitude]: must be between -90 and 90"
        );
    }
}
