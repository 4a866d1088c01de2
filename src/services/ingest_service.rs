// src/services/ingest_service.rs
// DOCUMENTATION: Two-phase CSV ingest (validate, then apply)
// PURPOSE: Persist validation reports as jobs and apply them exactly once

use crate::db::IngestJobRepository;
use crate::errors::AtlasError;
use crate::ingest::{apply_rows, validate_csv, ApplyOutcome, IngestStore, PgIngestStore};
use crate::models::{IngestApplyResponse, IngestIssue, IngestJob, IngestStatus};
use crate::services::SearchCache;
use serde_json::Value;
use sqlx::PgPool;
use std::time::Instant;
use uuid::Uuid;

/// Jobs returned by the admin listing
pub const RECENT_JOB_LIMIT: i64 = 50;

const DEFAULT_FILENAME: &str = "upload.csv";
const MAX_FILENAME_LEN: usize = 255;

pub struct IngestService;

impl IngestService {
    /// Validate an uploaded CSV and store the report as a job
    /// DOCUMENTATION: Nothing is written to places here; rejected rows stay
    /// in the job's error list
    pub async fn upload(
        pool: &PgPool,
        max_bytes: usize,
        filename: Option<&str>,
        body: &str,
        created_by: &str,
    ) -> Result<IngestJob, AtlasError> {
        if body.len() > max_bytes {
            return Err(AtlasError::InvalidInput(format!(
                "CSV is {} bytes; the limit is {} bytes",
                body.len(),
                max_bytes
            )));
        }

        let report = validate_csv(body).map_err(AtlasError::InvalidInput)?;
        let filename = clean_filename(filename);

        log::info!(
            "Validated {}: {} rows, {} valid, {} errors, {} warnings",
            filename,
            report.total_rows,
            report.valid_rows(),
            report.errors.len(),
            report.warnings.len()
        );

        IngestJobRepository::create(pool, &filename, &report, Some(created_by)).await
    }

    /// Apply a validated job
    /// DOCUMENTATION: A job applies once; any later attempt is a 409
    pub async fn apply(
        pool: &PgPool,
        cache: &SearchCache,
        id: Uuid,
    ) -> Result<IngestApplyResponse, AtlasError> {
        let mut jobs = PgJobStore { pool };
        let mut places = PgIngestStore::new(pool);
        let applied = apply_job(&mut jobs, &mut places, id).await?;
        cache.clear().await;
        Ok(applied)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<IngestJob>, AtlasError> {
        IngestJobRepository::list_recent(pool, RECENT_JOB_LIMIT).await
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> Result<IngestJob, AtlasError> {
        IngestJobRepository::get(pool, id).await
    }
}

/// Job persistence used by the apply step
#[allow(async_fn_in_trait)]
pub trait JobStore {
    async fn load(&mut self, id: Uuid) -> Result<IngestJob, AtlasError>;

    /// Move a validated job out of `validated`; false when another apply won
    async fn claim(&mut self, id: Uuid) -> Result<bool, AtlasError>;

    async fn rows(&mut self, id: Uuid) -> Result<Vec<Value>, AtlasError>;

    async fn finish(
        &mut self,
        id: Uuid,
        status: IngestStatus,
        outcome: &ApplyOutcome,
        errors: &[IngestIssue],
    ) -> Result<IngestJob, AtlasError>;
}

pub struct PgJobStore<'a> {
    pool: &'a PgPool,
}

impl JobStore for PgJobStore<'_> {
    async fn load(&mut self, id: Uuid) -> Result<IngestJob, AtlasError> {
        IngestJobRepository::get(self.pool, id).await
    }

    async fn claim(&mut self, id: Uuid) -> Result<bool, AtlasError> {
        IngestJobRepository::claim_for_apply(self.pool, id).await
    }

    async fn rows(&mut self, id: Uuid) -> Result<Vec<Value>, AtlasError> {
        IngestJobRepository::rows(self.pool, id).await
    }

    async fn finish(
        &mut self,
        id: Uuid,
        status: IngestStatus,
        outcome: &ApplyOutcome,
        errors: &[IngestIssue],
    ) -> Result<IngestJob, AtlasError> {
        IngestJobRepository::finish(self.pool, id, status, outcome, errors).await
    }
}

/// Claim the job, run its rows through `places` and record the outcome
pub async fn apply_job<J: JobStore, S: IngestStore>(
    jobs: &mut J,
    places: &mut S,
    id: Uuid,
) -> Result<IngestApplyResponse, AtlasError> {
    let job = jobs.load(id).await?;
    if !job.status.can_apply() {
        return Err(AtlasError::Conflict(format!(
            "ingest job {} is already {}",
            id, job.status
        )));
    }
    if !jobs.claim(id).await? {
        return Err(AtlasError::Conflict(format!(
            "ingest job {} is being applied",
            id
        )));
    }

    let started = Instant::now();
    let rows = jobs.rows(id).await?;
    let outcome = apply_rows(places, &rows).await;

    let rejected = (job.total_rows - job.valid_rows).max(0) as usize;
    let status = outcome.status(rejected);

    let mut errors = job.errors;
    errors.extend(outcome.errors.iter().cloned());

    let finished = jobs.finish(id, status, &outcome, &errors).await?;

    log::info!(
        "Applied ingest job {} in {:?}: {} created, {} updated ({} merged), {} failed -> {}",
        id,
        started.elapsed(),
        outcome.created,
        outcome.updated,
        outcome.merged,
        outcome.failed,
        status
    );

    Ok(IngestApplyResponse {
        job: finished,
        merged_count: outcome.merged,
    })
}

/// Base name of the uploaded file, bounded in length
fn clean_filename(raw: Option<&str>) -> String {
    let name = raw
        .map(str::trim)
        .and_then(|n| n.rsplit(['/', '\\']).next())
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_FILENAME);

    name.chars().take(MAX_FILENAME_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::apply::tests::MemoryStore;
    use chrono::Utc;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryJobs {
        jobs: HashMap<Uuid, (IngestJob, Vec<Value>)>,
        lose_claim: bool,
    }

    impl MemoryJobs {
        fn insert(&mut self, csv: &str) -> Uuid {
            let report = validate_csv(csv).unwrap();
            let id = Uuid::new_v4();
            let job = IngestJob {
                id,
                filename: "places.csv".into(),
                status: IngestStatus::Validated,
                total_rows: report.total_rows as i32,
                valid_rows: report.valid_rows() as i32,
                errors: report.errors.clone(),
                warnings: report.warnings.clone(),
                created_count: 0,
                updated_count: 0,
                failed_count: 0,
                created_by: None,
                created_at: Utc::now(),
                applied_at: None,
            };
            let rows = report
                .rows
                .iter()
                .map(|r| serde_json::to_value(r).unwrap())
                .collect();
            self.jobs.insert(id, (job, rows));
            id
        }

        fn entry(&mut self, id: Uuid) -> Result<&mut (IngestJob, Vec<Value>), AtlasError> {
            self.jobs
                .get_mut(&id)
                .ok_or_else(|| AtlasError::NotFound(id.to_string()))
        }
    }

    impl JobStore for MemoryJobs {
        async fn load(&mut self, id: Uuid) -> Result<IngestJob, AtlasError> {
            Ok(self.entry(id)?.0.clone())
        }

        async fn claim(&mut self, id: Uuid) -> Result<bool, AtlasError> {
            if self.lose_claim {
                return Ok(false);
            }
            let (job, _) = self.entry(id)?;
            if job.status != IngestStatus::Validated {
                return Ok(false);
            }
            job.status = IngestStatus::Failed;
            Ok(true)
        }

        async fn rows(&mut self, id: Uuid) -> Result<Vec<Value>, AtlasError> {
            Ok(self.entry(id)?.1.clone())
        }

        async fn finish(
            &mut self,
            id: Uuid,
            status: IngestStatus,
            outcome: &ApplyOutcome,
            errors: &[IngestIssue],
        ) -> Result<IngestJob, AtlasError> {
            let (job, _) = self.entry(id)?;
            job.status = status;
            job.created_count = outcome.created as i32;
            job.updated_count = outcome.updated as i32;
            job.failed_count = outcome.failed as i32;
            job.errors = errors.to_vec();
            job.applied_at = Some(Utc::now());
            Ok(job.clone())
        }
    }

    const CSV: &str = "name,type,city,country,latitude,longitude\n\
        Bark Park,dog park,Lisbon,Portugal,38.7139,-9.1604\n\
        Cafe Lola,cafe,Lisbon,Portugal,38.7200,-9.1400\n";

    #[tokio::test]
    async fn test_apply_job_runs_once() {
        let mut jobs = MemoryJobs::default();
        let mut places = MemoryStore::default();
        let id = jobs.insert(CSV);

        let applied = apply_job(&mut jobs, &mut places, id).await.unwrap();
        assert_eq!(applied.job.status, IngestStatus::Completed);
        assert_eq!(applied.job.created_count, 2);
        assert!(applied.job.applied_at.is_some());

        let err = apply_job(&mut jobs, &mut places, id).await.unwrap_err();
        assert!(matches!(err, AtlasError::Conflict(_)), "{:?}", err);
        assert_eq!(jobs.jobs[&id].0.created_count, 2);
    }

    #[tokio::test]
    async fn test_apply_job_lost_claim_is_conflict() {
        let mut jobs = MemoryJobs::default();
        let mut places = MemoryStore::default();
        let id = jobs.insert(CSV);
        jobs.lose_claim = true;

        let err = apply_job(&mut jobs, &mut places, id).await.unwrap_err();
        assert!(matches!(err, AtlasError::Conflict(_)), "{:?}", err);
        assert_eq!(jobs.jobs[&id].0.status, IngestStatus::Validated);
    }

    #[tokio::test]
    async fn test_apply_job_counts_rejected_rows() {
        let mut jobs = MemoryJobs::default();
        let mut places = MemoryStore::default();
        let id = jobs.insert(
            "name,type,city,country,latitude,longitude\n\
             Bark Park,dog park,Lisbon,Portugal,38.7139,-9.1604\n\
             Lost Place,park,Lisbon,Portugal,123.4,-9.1\n",
        );

        let applied = apply_job(&mut jobs, &mut places, id).await.unwrap();
        assert_eq!(applied.job.status, IngestStatus::CompletedWithErrors);
        assert_eq!(applied.job.created_count, 1);
        assert_eq!(applied.job.errors.len(), 1);
        assert_eq!(applied.job.errors[0].field, "latitude");
    }

    #[tokio::test]
    async fn test_apply_job_missing_is_not_found() {
        let mut jobs = MemoryJobs::default();
        let mut places = MemoryStore::default();
        let err = apply_job(&mut jobs, &mut places, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AtlasError::NotFound(_)));
    }

    #[test]
    fn test_clean_filename() {
        assert_eq!(clean_filename(None), "upload.csv");
        assert_eq!(clean_filename(Some("  ")), "upload.csv");
        assert_eq!(clean_filename(Some("berlin.csv")), "berlin.csv");
        assert_eq!(clean_filename(Some("../../etc/places.csv")), "places.csv");
        assert_eq!(clean_filename(Some("C:\\data\\lisbon.csv")), "lisbon.csv");
    }

    #[test]
    fn test_clean_filename_is_bounded() {
        let long = "a".repeat(400);
        assert_eq!(clean_filename(Some(&long)).len(), MAX_FILENAME_LEN);
    }
}
