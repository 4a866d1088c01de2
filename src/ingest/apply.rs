// src/ingest/apply.rs
// DOCUMENTATION: Apply step of the CSV importer
// PURPOSE: Resolve countries/cities, dedupe, and upsert validated rows

use crate::db::{CityRepository, PlaceRepository};
use crate::errors::AtlasError;
use crate::ingest::dedupe::{find_duplicate, PlaceCandidate};
use crate::ingest::validate::IngestRow;
use crate::models::{IngestIssue, IngestStatus, NewPlace};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

/// Storage operations needed by the apply step
#[allow(async_fn_in_trait)]
pub trait IngestStore {
    /// Country id for `slug`, inserting it when new
    async fn upsert_country(&mut self, name: &str, slug: &str) -> Result<Uuid, AtlasError>;

    /// City id for `slug`, creating it under `country_id` when new
    async fn find_or_create_city(
        &mut self,
        name: &str,
        slug: &str,
        country_id: Option<Uuid>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Uuid, AtlasError>;

    /// Active places of a city, for duplicate detection
    async fn place_candidates(&mut self, city_id: Uuid) -> Result<Vec<PlaceCandidate>, AtlasError>;

    /// Insert or update by slug; true when the row was inserted
    async fn upsert_place(&mut self, place: &NewPlace) -> Result<(Uuid, bool), AtlasError>;

    /// Merge imported values into an existing place, keeping its name and slug
    async fn merge_into_place(&mut self, id: Uuid, place: &NewPlace) -> Result<(), AtlasError>;
}

/// What happened to one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Created,
    Updated,
    /// Matched a nearby place with a similar name
    Merged,
}

/// Counts and per-row failures of one apply run
#[derive(Debug, Default, Clone, Serialize)]
pub struct ApplyOutcome {
    pub created: usize,
    pub updated: usize,
    pub merged: usize,
    pub failed: usize,
    pub errors: Vec<IngestIssue>,
}

impl ApplyOutcome {
    /// Final job status; rows rejected during validation count as failures
    pub fn status(&self, rejected_at_validation: usize) -> IngestStatus {
        IngestStatus::from_outcome(self.failed + rejected_at_validation)
    }

    fn record(&mut self, action: RowAction) {
        match action {
            RowAction::Created => self.created += 1,
            RowAction::Updated => self.updated += 1,
            RowAction::Merged => {
                self.merged += 1;
                self.updated += 1;
            }
        }
    }

    fn fail(&mut self, issue: IngestIssue) {
        log::warn!("Ingest {}", issue);
        self.failed += 1;
        self.errors.push(issue);
    }
}

/// Lookups resolved once per job
#[derive(Default)]
struct ResolutionCache {
    countries: HashMap<String, Uuid>,
    cities: HashMap<String, Uuid>,
    candidates: HashMap<Uuid, Vec<PlaceCandidate>>,
}

/// Apply stored rows one by one; a failing row is recorded and skipped
pub async fn apply_rows<S: IngestStore>(store: &mut S, rows: &[Value]) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();
    let mut cache = ResolutionCache::default();

    for (idx, value) in rows.iter().enumerate() {
        let row_number = value
            .get("row")
            .and_then(Value::as_u64)
            .map(|r| r as usize)
            .unwrap_or(idx + 1);

        let row: IngestRow = match serde_json::from_value(value.clone()) {
            Ok(row) => row,
            Err(e) => {
                outcome.fail(IngestIssue::new(
                    row_number,
                    "row",
                    format!("stored row is unreadable: {}", e),
                ));
                continue;
            }
        };

        let issues = row.check();
        if !issues.is_empty() {
            outcome.failed += 1;
            for issue in issues {
                log::warn!("Ingest {}", issue);
                outcome.errors.push(issue);
            }
            continue;
        }

        match apply_row(store, &row, &mut cache).await {
            Ok(action) => {
                log::debug!("Ingest row {} ({}): {:?}", row.row, row.slug, action);
                outcome.record(action);
            }
            Err(e) => outcome.fail(IngestIssue::new(row.row, "row", e.to_string())),
        }
    }

    log::info!(
        "Ingest apply finished: {} created, {} updated ({} merged), {} failed",
        outcome.created,
        outcome.updated,
        outcome.merged,
        outcome.failed
    );

    outcome
}

async fn apply_row<S: IngestStore>(
    store: &mut S,
    row: &IngestRow,
    cache: &mut ResolutionCache,
) -> Result<RowAction, AtlasError> {
    let country_id = match (row.country.as_deref(), row.country_slug()) {
        (Some(name), Some(slug)) => match cache.countries.get(&slug) {
            Some(id) => Some(*id),
            None => {
                let id = store.upsert_country(name, &slug).await?;
                cache.countries.insert(slug, id);
                Some(id)
            }
        },
        _ => None,
    };

    let city_slug = row.city_slug();
    let city_id = match cache.cities.get(&city_slug) {
        Some(id) => *id,
        None => {
            let id = store
                .find_or_create_city(&row.city, &city_slug, country_id, row.latitude, row.longitude)
                .await?;
            cache.cities.insert(city_slug, id);
            id
        }
    };

    if !cache.candidates.contains_key(&city_id) {
        let candidates = store.place_candidates(city_id).await?;
        cache.candidates.insert(city_id, candidates);
    }
    let candidates = cache.candidates.entry(city_id).or_default();
    let place = row.to_new_place(city_id);

    let slug_known = candidates.iter().any(|c| c.slug == row.slug);
    if !slug_known {
        if let Some(dup) = find_duplicate(
            &row.name,
            &row.slug,
            row.latitude,
            row.longitude,
            &candidates[..],
        ) {
            log::info!(
                "Row {} '{}' matches existing place '{}' ({:.0} m, similarity {:.2})",
                row.row,
                row.name,
                dup.slug,
                dup.distance_m,
                dup.similarity
            );
            store.merge_into_place(dup.id, &place).await?;
            return Ok(RowAction::Merged);
        }
    }

    let (id, created) = store.upsert_place(&place).await?;
    if !slug_known {
        candidates.push(PlaceCandidate {
            id,
            slug: row.slug.clone(),
            name: row.name.clone(),
            latitude: row.latitude,
            longitude: row.longitude,
        });
    }

    Ok(if created {
        RowAction::Created
    } else {
        RowAction::Updated
    })
}

/// PostgreSQL-backed store
pub struct PgIngestStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgIngestStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl IngestStore for PgIngestStore<'_> {
    async fn upsert_country(&mut self, name: &str, slug: &str) -> Result<Uuid, AtlasError> {
        let country = CityRepository::upsert_country(self.pool, name, slug).await?;
        Ok(country.id)
    }

    async fn find_or_create_city(
        &mut self,
        name: &str,
        slug: &str,
        country_id: Option<Uuid>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Uuid, AtlasError> {
        CityRepository::find_or_create_city(self.pool, name, slug, country_id, latitude, longitude)
            .await
    }

    async fn place_candidates(&mut self, city_id: Uuid) -> Result<Vec<PlaceCandidate>, AtlasError> {
        PlaceRepository::candidates_in_city(self.pool, city_id).await
    }

    async fn upsert_place(&mut self, place: &NewPlace) -> Result<(Uuid, bool), AtlasError> {
        PlaceRepository::upsert_by_slug(self.pool, place).await
    }

    async fn merge_into_place(&mut self, id: Uuid, place: &NewPlace) -> Result<(), AtlasError> {
        PlaceRepository::merge_import(self.pool, id, place).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ingest::validate::validate_csv;

    #[derive(Default)]
    pub(crate) struct MemoryStore {
        countries: HashMap<String, Uuid>,
        cities: HashMap<String, (Uuid, Option<Uuid>)>,
        places: Vec<(Uuid, NewPlace)>,
        fail_slug: Option<String>,
    }

    impl MemoryStore {
        fn place_by_slug(&self, slug: &str) -> Option<&NewPlace> {
            self.places.iter().find(|(_, p)| p.slug == slug).map(|(_, p)| p)
        }
    }

    impl IngestStore for MemoryStore {
        async fn upsert_country(&mut self, _name: &str, slug: &str) -> Result<Uuid, AtlasError> {
            Ok(*self
                .countries
                .entry(slug.to_string())
                .or_insert_with(Uuid::new_v4))
        }

        async fn find_or_create_city(
            &mut self,
            _name: &str,
            slug: &str,
            country_id: Option<Uuid>,
            _latitude: f64,
            _longitude: f64,
        ) -> Result<Uuid, AtlasError> {
            Ok(self
                .cities
                .entry(slug.to_string())
                .or_insert_with(|| (Uuid::new_v4(), country_id))
                .0)
        }

        async fn place_candidates(
            &mut self,
            city_id: Uuid,
        ) -> Result<Vec<PlaceCandidate>, AtlasError> {
            Ok(self
                .places
                .iter()
                .filter(|(_, p)| p.city_id == city_id)
                .map(|(id, p)| PlaceCandidate {
                    id: *id,
                    slug: p.slug.clone(),
                    name: p.name.clone(),
                    latitude: p.latitude,
                    longitude: p.longitude,
                })
                .collect())
        }

        async fn upsert_place(&mut self, place: &NewPlace) -> Result<(Uuid, bool), AtlasError> {
            if self.fail_slug.as_deref() == Some(place.slug.as_str()) {
                return Err(AtlasError::DatabaseError("connection reset".into()));
            }
            if let Some((id, existing)) = self.places.iter_mut().find(|(_, p)| p.slug == place.slug)
            {
                *existing = place.clone();
                return Ok((*id, false));
            }
            let id = Uuid::new_v4();
            self.places.push((id, place.clone()));
            Ok((id, true))
        }

        async fn merge_into_place(&mut self, id: Uuid, place: &NewPlace) -> Result<(), AtlasError> {
            let (_, existing) = self
                .places
                .iter_mut()
                .find(|(pid, _)| *pid == id)
                .ok_or_else(|| AtlasError::NotFound(id.to_string()))?;
            existing.latitude = place.latitude;
            existing.longitude = place.longitude;
            existing.description = place.description.clone().or(existing.description.take());
            Ok(())
        }
    }

    fn rows_of(csv: &str) -> (Vec<Value>, usize) {
        let report = validate_csv(csv).unwrap();
        let rows = report
            .rows
            .iter()
            .map(|r| serde_json::to_value(r).unwrap())
            .collect();
        (rows, report.invalid_rows())
    }

    const CSV: &str = "name,type,city,country,latitude,longitude,description\n\
        Bark Park,dog park,Lisbon,Portugal,38.7139,-9.1604,Fenced\n\
        Cafe Lola,cafe,Lisbon,Portugal,38.7200,-9.1400,Water bowls\n\
        Praia do Cao,beach,Cascais,Portugal,38.6970,-9.4210,\n";

    #[tokio::test]
    async fn test_same_csv_twice_updates_instead_of_duplicating() {
        let mut store = MemoryStore::default();
        let (rows, _) = rows_of(CSV);

        let first = apply_rows(&mut store, &rows).await;
        assert_eq!(first.created, 3);
        assert_eq!(first.updated, 0);
        assert_eq!(first.status(0), IngestStatus::Completed);

        let second = apply_rows(&mut store, &rows).await;
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 3);
        assert_eq!(store.places.len(), 3);
        assert_eq!(store.countries.len(), 1);
        assert_eq!(store.cities.len(), 2);
    }

    #[tokio::test]
    async fn test_near_duplicate_updates_existing_place() {
        let mut store = MemoryStore::default();
        let (seed, _) = rows_of(
            "name,type,city,country,latitude,longitude\n\
             Jardim da Estrela,park,Lisbon,Portugal,38.7139,-9.1604\n",
        );
        apply_rows(&mut store, &seed).await;

        // ~30 m away, one letter different
        let (rows, _) = rows_of(
            "name,type,city,country,latitude,longitude,description\n\
             Jardim de Estrela,park,Lisbon,Portugal,38.71417,-9.1604,Big lawn\n",
        );
        let outcome = apply_rows(&mut store, &rows).await;

        assert_eq!(outcome.created, 0);
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.merged, 1);
        assert_eq!(store.places.len(), 1);
        let place = store.place_by_slug("jardim-da-estrela-lisbon").unwrap();
        assert_eq!(place.description.as_deref(), Some("Big lawn"));
    }

    #[tokio::test]
    async fn test_tampered_row_rejected_with_row_and_field() {
        let mut store = MemoryStore::default();
        let (mut rows, _) = rows_of(CSV);
        rows[1]["latitude"] = serde_json::json!(123.4);

        let outcome = apply_rows(&mut store, &rows).await;
        assert_eq!(outcome.created, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.errors[0].row, 2);
        assert_eq!(outcome.errors[0].field, "latitude");
        assert_eq!(outcome.status(0), IngestStatus::CompletedWithErrors);
    }

    #[tokio::test]
    async fn test_unreadable_row_recorded() {
        let mut store = MemoryStore::default();
        let rows = vec![serde_json::json!({"row": 7, "name": "No type"})];
        let outcome = apply_rows(&mut store, &rows).await;
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.errors[0].row, 7);
    }

    #[tokio::test]
    async fn test_store_failure_skips_row_and_continues() {
        let mut store = MemoryStore {
            fail_slug: Some("cafe-lola-lisbon".into()),
            ..Default::default()
        };
        let (rows, _) = rows_of(CSV);
        let outcome = apply_rows(&mut store, &rows).await;

        assert_eq!(outcome.created, 2);
        assert_eq!(outcome.failed, 1);
        assert!(outcome.errors[0].message.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_rows_rejected_at_validation_mark_job_with_errors() {
        let mut store = MemoryStore::default();
        let (rows, rejected) = rows_of(
            "name,type,city,country,latitude,longitude\n\
             Good,park,Lisbon,Portugal,38.7,-9.1\n\
             Bad,park,Lisbon,Portugal,123.4,-9.1\n",
        );
        assert_eq!(rejected, 1);

        let outcome = apply_rows(&mut store, &rows).await;
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.status(rejected), IngestStatus::CompletedWithErrors);
    }

    #[tokio::test]
    async fn test_empty_job_completes() {
        let mut store = MemoryStore::default();
        let outcome = apply_rows(&mut store, &[]).await;
        assert_eq!(outcome.created + outcome.updated + outcome.failed, 0);
        assert_eq!(outcome.status(0), IngestStatus::Completed);
    }
}
