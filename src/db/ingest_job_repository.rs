// src/db/ingest_job_repository.rs
// DOCUMENTATION: Ingest job persistence
// PURPOSE: Store validation reports and record apply outcomes

use crate::errors::AtlasError;
use crate::ingest::{ApplyOutcome, ValidationReport};
use crate::models::{IngestIssue, IngestJob, IngestJobRecord, IngestStatus};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

const JOB_COLUMNS: &str = r#"
    id, filename, status, total_rows, valid_rows, errors, warnings,
    created_count, updated_count, failed_count, created_by, created_at, applied_at
"#;

fn db_error(context: &str, e: sqlx::Error) -> AtlasError {
    log::error!("{}: {}", context, e);
    AtlasError::DatabaseError(e.to_string())
}

pub struct IngestJobRepository;

impl IngestJobRepository {
    /// Persist a validation report as a `validated` job
    pub async fn create(
        pool: &PgPool,
        filename: &str,
        report: &ValidationReport,
        created_by: Option<&str>,
    ) -> Result<IngestJob, AtlasError> {
        let rows = serde_json::to_value(&report.rows)
            .map_err(|e| AtlasError::InternalError(format!("serialize rows: {}", e)))?;

        let sql = format!(
            r#"
            INSERT INTO ingest_jobs (
                filename, status, total_rows, valid_rows, errors, warnings, rows, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            JOB_COLUMNS
        );

        let record = sqlx::query_as::<_, IngestJobRecord>(&sql)
            .bind(filename)
            .bind(IngestStatus::Validated.as_str())
            .bind(report.total_rows as i32)
            .bind(report.valid_rows() as i32)
            .bind(Json(&report.errors))
            .bind(Json(&report.warnings))
            .bind(Json(rows))
            .bind(created_by)
            .fetch_one(pool)
            .await
            .map_err(|e| db_error("Failed to store ingest job", e))?;

        Ok(record.into_job())
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> Result<IngestJob, AtlasError> {
        let sql = format!("SELECT {} FROM ingest_jobs WHERE id = $1", JOB_COLUMNS);
        let record = sqlx::query_as::<_, IngestJobRecord>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| db_error("Failed to fetch ingest job", e))?
            .ok_or_else(|| AtlasError::NotFound(format!("ingest job '{}'", id)))?;

        Ok(record.into_job())
    }

    /// Stored row payload of a job
    pub async fn rows(pool: &PgPool, id: Uuid) -> Result<Vec<Value>, AtlasError> {
        let (rows,): (Json<Vec<Value>>,) =
            sqlx::query_as("SELECT rows FROM ingest_jobs WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await
                .map_err(|e| db_error("Failed to load ingest rows", e))?
                .ok_or_else(|| AtlasError::NotFound(format!("ingest job '{}'", id)))?;

        Ok(rows.0)
    }

    /// Latest jobs first
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<IngestJob>, AtlasError> {
        let sql = format!(
            "SELECT {} FROM ingest_jobs ORDER BY created_at DESC LIMIT $1",
            JOB_COLUMNS
        );
        let records = sqlx::query_as::<_, IngestJobRecord>(&sql)
            .bind(limit)
            .fetch_all(pool)
            .await
            .map_err(|e| db_error("Failed to list ingest jobs", e))?;

        Ok(records.into_iter().map(IngestJobRecord::into_job).collect())
    }

    /// Claim a validated job for apply
    /// DOCUMENTATION: Moves validated -> failed atomically so a concurrent
    /// apply of the same job sees a conflict; `finish` writes the real status
    pub async fn claim_for_apply(pool: &PgPool, id: Uuid) -> Result<bool, AtlasError> {
        let result = sqlx::query(
            "UPDATE ingest_jobs SET status = $1 WHERE id = $2 AND status = $3",
        )
        .bind(IngestStatus::Failed.as_str())
        .bind(id)
        .bind(IngestStatus::Validated.as_str())
        .execute(pool)
        .await
        .map_err(|e| db_error("Failed to claim ingest job", e))?;

        Ok(result.rows_affected() == 1)
    }

    /// Record the apply outcome; apply errors are appended to validation errors
    pub async fn finish(
        pool: &PgPool,
        id: Uuid,
        status: IngestStatus,
        outcome: &ApplyOutcome,
        errors: &[IngestIssue],
    ) -> Result<IngestJob, AtlasError> {
        let sql = format!(
            r#"
            UPDATE ingest_jobs
            SET status = $1,
                created_count = $2,
                updated_count = $3,
                failed_count = $4,
                errors = $5,
                applied_at = NOW()
            WHERE id = $6
            RETURNING {}
            "#,
            JOB_COLUMNS
        );

        let record = sqlx::query_as::<_, IngestJobRecord>(&sql)
            .bind(status.as_str())
            .bind(outcome.created as i32)
            .bind(outcome.updated as i32)
            .bind(outcome.failed as i32)
            .bind(Json(errors))
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(|e| db_error("Failed to record ingest outcome", e))?;

        Ok(record.into_job())
    }

    pub async fn count_pending(pool: &PgPool) -> Result<i64, AtlasError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM ingest_jobs WHERE status = $1")
                .bind(IngestStatus::Validated.as_str())
                .fetch_one(pool)
                .await
                .map_err(|e| db_error("Failed to count pending jobs", e))?;
        Ok(count)
    }
}
