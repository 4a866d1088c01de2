// src/ingest/dedupe.rs
// DOCUMENTATION: Proximity + name-similarity duplicate detection
// PURPOSE: Keep re-imported venues with slightly different names from
// becoming second records

use crate::ingest::slug::normalize_name;
use crate::services::geo;
use std::collections::HashMap;
use uuid::Uuid;

/// Maximum distance between two records of the same venue
pub const DUPLICATE_DISTANCE_M: f64 = 75.0;

/// Minimum Sørensen–Dice similarity of normalized names
pub const DUPLICATE_NAME_SIMILARITY: f64 = 0.7;

/// Existing place considered during dedupe
#[derive(Debug, Clone)]
pub struct PlaceCandidate {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Candidate that matched, with the measured distance and similarity
#[derive(Debug, Clone)]
pub struct DuplicateMatch {
    pub id: Uuid,
    pub slug: String,
    pub distance_m: f64,
    pub similarity: f64,
}

fn bigrams(s: &str) -> Vec<(char, char)> {
    let chars: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Sørensen–Dice coefficient over character bigrams of normalized names
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_name(a);
    let b = normalize_name(b);

    if a == b {
        return 1.0;
    }

    let a_grams = bigrams(&a);
    let b_grams = bigrams(&b);
    if a_grams.is_empty() || b_grams.is_empty() {
        return 0.0;
    }

    let mut remaining = b_grams.clone();
    let mut shared = 0usize;
    for gram in &a_grams {
        if let Some(pos) = remaining.iter().position(|g| g == gram) {
            remaining.swap_remove(pos);
            shared += 1;
        }
    }

    (2 * shared) as f64 / (a_grams.len() + b_grams.len()) as f64
}

/// Nearest candidate within the distance threshold, accepted only when its
/// name is similar enough and its slug differs from the incoming one
pub fn find_duplicate(
    name: &str,
    slug: &str,
    latitude: f64,
    longitude: f64,
    candidates: &[PlaceCandidate],
) -> Option<DuplicateMatch> {
    let origin = geo::point(latitude, longitude);

    let nearest = candidates
        .iter()
        .filter(|c| c.slug != slug)
        .map(|c| (c, geo::distance_m(origin, geo::point(c.latitude, c.longitude))))
        .filter(|(_, d)| *d <= DUPLICATE_DISTANCE_M)
        .min_by(|a, b| a.1.total_cmp(&b.1))?;

    let (candidate, distance_m) = nearest;
    let similarity = name_similarity(name, &candidate.name);
    if similarity < DUPLICATE_NAME_SIMILARITY {
        return None;
    }

    Some(DuplicateMatch {
        id: candidate.id,
        slug: candidate.slug.clone(),
        distance_m,
        similarity,
    })
}

/// First row number seen per slug inside one upload
#[derive(Debug, Default)]
pub struct SeenSlugs {
    slugs: HashMap<String, usize>,
}

impl SeenSlugs {
    /// Record `row` for `slug`; returns the earlier row when the slug repeats
    pub fn first_row(&mut self, slug: &str, row: usize) -> Option<usize> {
        match self.slugs.get(slug) {
            Some(&first) => Some(first),
            None => {
                self.slugs.insert(slug.to_string(), row);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, lat: f64, lng: f64) -> PlaceCandidate {
        PlaceCandidate {
            id: Uuid::new_v4(),
            slug: crate::ingest::slug::place_slug(name, "Lisbon"),
            name: name.to_string(),
            latitude: lat,
            longitude: lng,
        }
    }

    #[test]
    fn test_similarity_identical_and_disjoint() {
        assert_eq!(name_similarity("Bark Park", "bark park!"), 1.0);
        assert!(name_similarity("Bark Park", "Zzyzx") < 0.1);
    }

    #[test]
    fn test_similarity_typo_is_high() {
        let s = name_similarity("Jardim da Estrela", "Jardim de Estrela");
        assert!(s >= DUPLICATE_NAME_SIMILARITY, "got {}", s);
    }

    #[test]
    fn test_duplicate_found_nearby_with_similar_name() {
        let existing = vec![
            candidate("Jardim da Estrela", 38.7139, -9.1604),
            candidate("Cafe Dog", 38.7200, -9.1500),
        ];
        // ~30 m north of the first candidate
        let m = find_duplicate(
            "Jardim de Estrela",
            "jardim-de-estrela-lisbon",
            38.71417,
            -9.1604,
            &existing,
        )
        .unwrap();
        assert_eq!(m.id, existing[0].id);
        assert!(m.distance_m < DUPLICATE_DISTANCE_M);
    }

    #[test]
    fn test_no_duplicate_when_far() {
        let existing = vec![candidate("Jardim da Estrela", 38.7139, -9.1604)];
        assert!(find_duplicate("Jardim da Estrela 2", "x", 38.7300, -9.1604, &existing).is_none());
    }

    #[test]
    fn test_no_duplicate_when_names_differ() {
        let existing = vec![candidate("Jardim da Estrela", 38.7139, -9.1604)];
        assert!(find_duplicate("Vet Clinic Central", "x", 38.7139, -9.1604, &existing).is_none());
    }

    #[test]
    fn test_same_slug_is_not_a_duplicate_match() {
        let existing = vec![candidate("Jardim da Estrela", 38.7139, -9.1604)];
        let slug = existing[0].slug.clone();
        assert!(find_duplicate("Jardim da Estrela", &slug, 38.7139, -9.1604, &existing).is_none());
    }

    #[test]
    fn test_seen_slugs() {
        let mut seen = SeenSlugs::default();
        assert_eq!(seen.first_row("a", 1), None);
        assert_eq!(seen.first_row("b", 2), None);
        assert_eq!(seen.first_row("a", 5), Some(1));
    }
}
