// src/ingest/validate.rs
// DOCUMENTATION: Per-row schema checks for place CSV uploads
// PURPOSE: Turn raw CSV text into typed rows plus an error/warning report

use crate::ingest::csv_reader::{parse_csv, CsvRecord, CsvTable};
use crate::ingest::dedupe::{find_duplicate, PlaceCandidate, SeenSlugs};
use crate::ingest::slug::{place_slug, slugify};
use crate::models::{IngestIssue, NewPlace, PlaceType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

const MAX_NAME_LEN: usize = 200;
const MAX_CITY_LEN: usize = 120;
const MAX_COUNTRY_LEN: usize = 120;
const MAX_PHONE_LEN: usize = 64;

/// Columns that must be present in the header
pub const REQUIRED_COLUMNS: [&str; 5] = ["name", "type", "city", "latitude", "longitude"];

/// A validated CSV row, stored as JSON on the ingest job until applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestRow {
    /// 1-based data row number in the uploaded file
    pub row: usize,
    pub slug: String,
    pub name: String,
    #[serde(rename = "type")]
    pub place_type: PlaceType,
    pub city: String,
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub dog_policy: Option<String>,
    pub rating: Option<f32>,
    pub image_url: Option<String>,
}

impl IngestRow {
    /// Shape checks repeated at apply time on rows read back from storage
    pub fn check(&self) -> Vec<IngestIssue> {
        let mut issues = Vec::new();

        if self.name.trim().is_empty() || self.name.chars().count() > MAX_NAME_LEN {
            issues.push(IngestIssue::new(self.row, "name", "invalid name"));
        }
        if self.city.trim().is_empty() || self.city.chars().count() > MAX_CITY_LEN {
            issues.push(IngestIssue::new(self.row, "city", "invalid city"));
        }
        if self
            .country
            .as_deref()
            .is_some_and(|c| c.chars().count() > MAX_COUNTRY_LEN)
        {
            issues.push(IngestIssue::new(self.row, "country", "invalid country"));
        }
        if self
            .phone
            .as_deref()
            .is_some_and(|p| p.chars().count() > MAX_PHONE_LEN)
        {
            issues.push(IngestIssue::new(self.row, "phone", "invalid phone"));
        }
        if !(-90.0..=90.0).contains(&self.latitude) || !self.latitude.is_finite() {
            issues.push(IngestIssue::new(
                self.row,
                "latitude",
                "must be between -90 and 90",
            ));
        }
        if !(-180.0..=180.0).contains(&self.longitude) || !self.longitude.is_finite() {
            issues.push(IngestIssue::new(
                self.row,
                "longitude",
                "must be between -180 and 180",
            ));
        }
        if let Some(rating) = self.rating {
            if !(0.0..=5.0).contains(&rating) {
                issues.push(IngestIssue::new(self.row, "rating", "must be between 0 and 5"));
            }
        }
        if self.slug.is_empty() || self.slug != place_slug(&self.name, &self.city) {
            issues.push(IngestIssue::new(
                self.row,
                "slug",
                "does not match name and city",
            ));
        }

        issues
    }

    pub fn to_new_place(&self, city_id: Uuid) -> NewPlace {
        NewPlace {
            name: self.name.clone(),
            slug: self.slug.clone(),
            place_type: self.place_type,
            city_id,
            latitude: self.latitude,
            longitude: self.longitude,
            address: self.address.clone(),
            phone: self.phone.clone(),
            website: self.website.clone(),
            description: self.description.clone(),
            short_description: self.short_description.clone(),
            amenities: self.amenities.clone(),
            dog_policy: self.dog_policy.clone(),
            rating: self.rating,
            image_url: self.image_url.clone(),
        }
    }

    pub fn city_slug(&self) -> String {
        slugify(&self.city)
    }

    pub fn country_slug(&self) -> Option<String> {
        self.country
            .as_deref()
            .map(slugify)
            .filter(|s| !s.is_empty())
    }
}

/// Outcome of validating one upload
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub total_rows: usize,
    pub rows: Vec<IngestRow>,
    pub errors: Vec<IngestIssue>,
    pub warnings: Vec<IngestIssue>,
}

impl ValidationReport {
    pub fn valid_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of data rows that were rejected
    pub fn invalid_rows(&self) -> usize {
        self.total_rows - self.rows.len()
    }
}

/// Resolved header positions
struct Columns {
    name: usize,
    place_type: usize,
    city: usize,
    latitude: usize,
    longitude: usize,
    country: Option<usize>,
    address: Option<usize>,
    phone: Option<usize>,
    website: Option<usize>,
    description: Option<usize>,
    short_description: Option<usize>,
    amenities: Option<usize>,
    dog_policy: Option<usize>,
    rating: Option<usize>,
    image_url: Option<usize>,
}

impl Columns {
    fn resolve(table: &CsvTable) -> Result<Self, String> {
        let required = |names: &[&str]| {
            table
                .column(names)
                .ok_or_else(|| format!("missing required column '{}'", names[0]))
        };

        Ok(Columns {
            name: required(&["name"])?,
            place_type: required(&["type", "place_type", "category"])?,
            city: required(&["city"])?,
            latitude: required(&["latitude", "lat"])?,
            longitude: required(&["longitude", "lng", "lon"])?,
            country: table.column(&["country"]),
            address: table.column(&["address"]),
            phone: table.column(&["phone"]),
            website: table.column(&["website", "url"]),
            description: table.column(&["description"]),
            short_description: table.column(&["short_description", "shortdescription"]),
            amenities: table.column(&["amenities"]),
            dog_policy: table.column(&["dog_policy", "dogpolicy"]),
            rating: table.column(&["rating"]),
            image_url: table.column(&["image_url", "imageurl", "image"]),
        })
    }
}

fn cell(record: &CsvRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| record.cells.get(i))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_coordinate(
    raw: Option<String>,
    row: usize,
    field: &str,
    limit: f64,
    errors: &mut Vec<IngestIssue>,
) -> Option<f64> {
    let Some(raw) = raw else {
        errors.push(IngestIssue::new(row, field, "is required"));
        return None;
    };

    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && (-limit..=limit).contains(&v) => Some(v),
        Ok(v) => {
            errors.push(IngestIssue::new(
                row,
                field,
                format!("{} is out of range (must be between -{} and {})", v, limit, limit),
            ));
            None
        }
        Err(_) => {
            errors.push(IngestIssue::new(
                row,
                field,
                format!("'{}' is not a number", raw),
            ));
            None
        }
    }
}

fn checked_url(
    raw: Option<String>,
    row: usize,
    field: &str,
    warnings: &mut Vec<IngestIssue>,
) -> Option<String> {
    let raw = raw?;
    let candidate = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.clone()
    } else if raw.starts_with("www.") {
        format!("https://{}", raw)
    } else {
        raw.clone()
    };

    if validator::validate_url(candidate.as_str()) {
        Some(candidate)
    } else {
        warnings.push(IngestIssue::new(
            row,
            field,
            format!("'{}' is not a valid URL; value dropped", raw),
        ));
        None
    }
}

/// Split an amenities cell on ';' or '|'
pub fn parse_amenities(raw: Option<String>) -> Vec<String> {
    raw.map(|v| {
        v.split(|c| c == ';' || c == '|')
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

fn validate_record(
    record: &CsvRecord,
    columns: &Columns,
    header_len: usize,
    errors: &mut Vec<IngestIssue>,
    warnings: &mut Vec<IngestIssue>,
) -> Option<IngestRow> {
    let row = record.row;
    let error_count = errors.len();

    if record.cells.len() != header_len {
        warnings.push(IngestIssue::new(
            row,
            "row",
            format!(
                "has {} cells but header has {}",
                record.cells.len(),
                header_len
            ),
        ));
    }

    let name = cell(record, Some(columns.name));
    match &name {
        None => errors.push(IngestIssue::new(row, "name", "is required")),
        Some(n) if n.chars().count() > MAX_NAME_LEN => errors.push(IngestIssue::new(
            row,
            "name",
            format!("must be at most {} characters", MAX_NAME_LEN),
        )),
        Some(n) if slugify(n).is_empty() => errors.push(IngestIssue::new(
            row,
            "name",
            "must contain at least one letter or digit",
        )),
        _ => {}
    }

    let place_type = match cell(record, Some(columns.place_type)) {
        None => {
            errors.push(IngestIssue::new(row, "type", "is required"));
            None
        }
        Some(raw) => match raw.parse::<PlaceType>() {
            Ok(t) => Some(t),
            Err(msg) => {
                errors.push(IngestIssue::new(row, "type", msg));
                None
            }
        },
    };

    let city = cell(record, Some(columns.city));
    match &city {
        None => errors.push(IngestIssue::new(row, "city", "is required")),
        Some(c) if c.chars().count() > MAX_CITY_LEN || slugify(c).is_empty() => {
            errors.push(IngestIssue::new(row, "city", "is not a valid city name"))
        }
        _ => {}
    }

    let latitude = parse_coordinate(
        cell(record, Some(columns.latitude)),
        row,
        "latitude",
        90.0,
        errors,
    );
    let longitude = parse_coordinate(
        cell(record, Some(columns.longitude)),
        row,
        "longitude",
        180.0,
        errors,
    );

    if latitude == Some(0.0) && longitude == Some(0.0) {
        warnings.push(IngestIssue::new(
            row,
            "latitude",
            "coordinates are 0,0; check the geocoding",
        ));
    }

    let rating = match cell(record, columns.rating) {
        None => None,
        Some(raw) => match raw.parse::<f32>() {
            Ok(v) if (0.0..=5.0).contains(&v) => Some(v),
            Ok(v) => {
                errors.push(IngestIssue::new(
                    row,
                    "rating",
                    format!("{} is out of range (must be between 0 and 5)", v),
                ));
                None
            }
            Err(_) => {
                errors.push(IngestIssue::new(
                    row,
                    "rating",
                    format!("'{}' is not a number", raw),
                ));
                None
            }
        },
    };

    let country = cell(record, columns.country);
    match &country {
        None => warnings.push(IngestIssue::new(
            row,
            "country",
            "missing; city will be created without a country",
        )),
        Some(c) if c.chars().count() > MAX_COUNTRY_LEN => errors.push(IngestIssue::new(
            row,
            "country",
            format!("must be at most {} characters", MAX_COUNTRY_LEN),
        )),
        _ => {}
    }

    let phone = cell(record, columns.phone);
    if phone
        .as_deref()
        .is_some_and(|p| p.chars().count() > MAX_PHONE_LEN)
    {
        errors.push(IngestIssue::new(
            row,
            "phone",
            format!("must be at most {} characters", MAX_PHONE_LEN),
        ));
    }

    let website = checked_url(cell(record, columns.website), row, "website", warnings);
    let image_url = checked_url(cell(record, columns.image_url), row, "image_url", warnings);

    if errors.len() > error_count {
        return None;
    }

    let (name, place_type, city, latitude, longitude) =
        (name?, place_type?, city?, latitude?, longitude?);

    Some(IngestRow {
        row,
        slug: place_slug(&name, &city),
        name,
        place_type,
        city,
        country,
        latitude,
        longitude,
        address: cell(record, columns.address),
        phone,
        website,
        description: cell(record, columns.description),
        short_description: cell(record, columns.short_description),
        amenities: parse_amenities(cell(record, columns.amenities)),
        dog_policy: cell(record, columns.dog_policy),
        rating,
        image_url,
    })
}

/// Validate a whole upload
/// DOCUMENTATION: Err only for file-level problems (unreadable CSV, missing
/// required columns); row problems land in the report
pub fn validate_csv(input: &str) -> Result<ValidationReport, String> {
    let table = parse_csv(input)?;
    let columns = Columns::resolve(&table)?;
    let header_len = table.headers.len();

    let mut report = ValidationReport {
        total_rows: table.records.len(),
        ..Default::default()
    };

    let mut seen = SeenSlugs::default();
    let mut by_city: HashMap<String, Vec<(usize, PlaceCandidate)>> = HashMap::new();

    for record in &table.records {
        let Some(row) = validate_record(
            record,
            &columns,
            header_len,
            &mut report.errors,
            &mut report.warnings,
        ) else {
            continue;
        };

        if let Some(first) = seen.first_row(&row.slug, row.row) {
            report.errors.push(IngestIssue::new(
                row.row,
                "name",
                format!("duplicate of row {} (same name and city)", first),
            ));
            continue;
        }

        let city_rows = by_city.entry(row.city_slug()).or_default();
        let candidates: Vec<PlaceCandidate> = city_rows.iter().map(|(_, c)| c.clone()).collect();
        if let Some(dup) = find_duplicate(
            &row.name,
            &row.slug,
            row.latitude,
            row.longitude,
            &candidates,
        ) {
            if let Some((other_row, _)) = city_rows.iter().find(|(_, c)| c.slug == dup.slug) {
                report.warnings.push(IngestIssue::new(
                    row.row,
                    "name",
                    format!(
                        "possible duplicate of row {} ({:.0} m apart, similar name)",
                        other_row, dup.distance_m
                    ),
                ));
            }
        }

        city_rows.push((
            row.row,
            PlaceCandidate {
                id: Uuid::nil(),
                slug: row.slug.clone(),
                name: row.name.clone(),
                latitude: row.latitude,
                longitude: row.longitude,
            },
        ));

        report.rows.push(row);
    }

    log::info!(
        "CSV validated: {} rows, {} valid, {} errors, {} warnings",
        report.total_rows,
        report.valid_rows(),
        report.errors.len(),
        report.warnings.len()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "name,type,city,country,latitude,longitude,website,amenities,rating";

    fn csv(rows: &[&str]) -> String {
        let mut out = String::from(HEADER);
        for r in rows {
            out.push('\n');
            out.push_str(r);
        }
        out
    }

    #[test]
    fn test_valid_rows_are_typed() {
        let report = validate_csv(&csv(&[
            "Bark Park,dog park,Lisbon,Portugal,38.7139,-9.1604,https://bark.pt,water bowls; shade|fenced,4.5",
        ]))
        .unwrap();

        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert_eq!(report.valid_rows(), 1);
        let row = &report.rows[0];
        assert_eq!(row.slug, "bark-park-lisbon");
        assert_eq!(row.place_type, PlaceType::DogPark);
        assert_eq!(row.amenities, vec!["water bowls", "shade", "fenced"]);
        assert_eq!(row.rating, Some(4.5));
        assert!(row.check().is_empty());
    }

    #[test]
    fn test_out_of_range_latitude_names_row_and_field() {
        let report = validate_csv(&csv(&[
            "Good Place,park,Lisbon,Portugal,38.7,-9.1,,,",
            "Bad Place,park,Lisbon,Portugal,123.4,-9.1,,,",
        ]))
        .unwrap();

        assert_eq!(report.total_rows, 2);
        assert_eq!(report.valid_rows(), 1);
        assert_eq!(report.errors.len(), 1);
        let err = &report.errors[0];
        assert_eq!(err.row, 2);
        assert_eq!(err.field, "latitude");
        assert!(err.message.contains("123.4"));
    }

    #[test]
    fn test_multiple_errors_on_one_row() {
        let report = validate_csv(&csv(&[",spaceship,Lisbon,Portugal,abc,200,,,9"])).unwrap();
        let fields: Vec<&str> = report.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"type"));
        assert!(fields.contains(&"latitude"));
        assert!(fields.contains(&"longitude"));
        assert!(fields.contains(&"rating"));
        assert!(report.rows.is_empty());
    }

    #[test]
    fn test_overlong_country_and_phone_rejected() {
        let long_country = "Republica".repeat(17);
        let long_phone = "+351 ".repeat(16);
        let report = validate_csv(&format!(
            "name,type,city,country,latitude,longitude,phone\n\
             Bark Park,park,Lisbon,{},38.7,-9.1,\n\
             Cafe Lola,cafe,Lisbon,Portugal,38.7,-9.1,{}\n\
             Dog Beach,beach,Lisbon,Portugal,38.7,-9.2,+351 912 345 678",
            long_country, long_phone
        ))
        .unwrap();

        assert_eq!(report.valid_rows(), 1);
        assert_eq!(report.rows[0].phone.as_deref(), Some("+351 912 345 678"));
        let issues: Vec<(usize, &str)> = report
            .errors
            .iter()
            .map(|e| (e.row, e.field.as_str()))
            .collect();
        assert_eq!(issues, vec![(1, "country"), (2, "phone")]);

        let mut stored = report.rows[0].clone();
        stored.phone = Some(long_phone);
        stored.country = Some(long_country);
        let fields: Vec<String> = stored.check().into_iter().map(|i| i.field).collect();
        assert_eq!(fields, vec!["country", "phone"]);
    }

    #[test]
    fn test_missing_required_column_rejects_file() {
        let err = validate_csv("name,type,city,latitude\nA,park,Lisbon,1").unwrap_err();
        assert!(err.contains("longitude"));
    }

    #[test]
    fn test_header_aliases_accepted() {
        let report = validate_csv("Name,Category,City,Lat,Lng\nA,park,Lisbon,38.7,-9.1").unwrap();
        assert_eq!(report.valid_rows(), 1);
    }

    #[test]
    fn test_invalid_website_dropped_with_warning() {
        let report = validate_csv(&csv(&[
            "Cafe Lola,cafe,Porto,Portugal,41.15,-8.61,not a url,,",
        ]))
        .unwrap();
        assert_eq!(report.valid_rows(), 1);
        assert!(report.rows[0].website.is_none());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.field == "website" && w.row == 1));
    }

    #[test]
    fn test_www_website_gets_scheme() {
        let report =
            validate_csv(&csv(&["Cafe Lola,cafe,Porto,Portugal,41.15,-8.61,www.lola.pt,,"])).unwrap();
        assert_eq!(report.rows[0].website.as_deref(), Some("https://www.lola.pt"));
    }

    #[test]
    fn test_duplicate_slug_in_file_is_error() {
        let report = validate_csv(&csv(&[
            "Bark Park,park,Lisbon,Portugal,38.70,-9.10,,,",
            "Other,park,Lisbon,Portugal,38.80,-9.20,,,",
            "bark park!,park,lisbon,Portugal,38.75,-9.15,,,",
        ]))
        .unwrap();
        assert_eq!(report.valid_rows(), 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row, 3);
        assert!(report.errors[0].message.contains("row 1"));
    }

    #[test]
    fn test_nearby_similar_rows_warn() {
        let report = validate_csv(&csv(&[
            "Jardim da Estrela,park,Lisbon,Portugal,38.7139,-9.1604,,,",
            "Jardim de Estrela,park,Lisbon,Portugal,38.71417,-9.1604,,,",
        ]))
        .unwrap();
        assert_eq!(report.valid_rows(), 2);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.row == 2 && w.message.contains("possible duplicate of row 1")));
    }

    #[test]
    fn test_missing_country_and_null_island_warn() {
        let report = validate_csv("name,type,city,latitude,longitude\nA,park,Nowhere,0,0").unwrap();
        assert_eq!(report.valid_rows(), 1);
        assert!(report.warnings.iter().any(|w| w.field == "country"));
        assert!(report.warnings.iter().any(|w| w.message.contains("0,0")));
    }

    #[test]
    fn test_short_row_warns_and_reads_empty_cells() {
        let report = validate_csv(&csv(&["A,park,Lisbon,Portugal,38.7,-9.1"])).unwrap();
        assert_eq!(report.valid_rows(), 1);
        assert!(report.warnings.iter().any(|w| w.field == "row"));
    }

    #[test]
    fn test_check_catches_tampered_rows() {
        let report = validate_csv(&csv(&["A,park,Lisbon,Portugal,38.7,-9.1,,,"])).unwrap();
        let mut row = report.rows[0].clone();
        row.latitude = 91.0;
        row.slug = "something-else".into();
        let issues = row.check();
        assert!(issues.iter().any(|i| i.field == "latitude"));
        assert!(issues.iter().any(|i| i.field == "slug"));
    }
}
