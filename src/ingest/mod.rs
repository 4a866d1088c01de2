// src/ingest/mod.rs
// DOCUMENTATION: CSV ingestion pipeline
// PURPOSE: Parse -> validate -> persist job -> apply

pub mod apply;
pub mod csv_reader;
pub mod dedupe;
pub mod slug;
pub mod validate;

pub use apply::{apply_rows, ApplyOutcome, IngestStore, PgIngestStore};
pub use slug::{place_slug, slugify};
pub use validate::{validate_csv, IngestRow, ValidationReport};
