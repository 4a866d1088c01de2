// src/services/itinerary_service.rs
// DOCUMENTATION: Multi-day dog-friendly itineraries
// PURPOSE: AI plan restricted to known places, with a deterministic fallback

use crate::config::Config;
use crate::db::{CityRepository, PlaceRepository};
use crate::errors::AtlasError;
use crate::models::{
    DaySlot, ItineraryDay, ItineraryRequest, ItineraryResponse, ItinerarySource, ItineraryStop,
    Place, PlaceType,
};
use crate::services::{GeminiClient, GeminiPlan};
use std::collections::{HashMap, HashSet};

/// Places offered to the model
const MAX_AI_CANDIDATES: usize = 60;

pub struct ItineraryService;

impl ItineraryService {
    pub async fn plan(
        pool: &sqlx::PgPool,
        http: &reqwest::Client,
        config: &Config,
        req: ItineraryRequest,
    ) -> Result<ItineraryResponse, AtlasError> {
        let interests = parse_interests(&req.interests)?;
        let city = CityRepository::get_city_by_slug(pool, req.city.trim()).await?;
        let candidates = PlaceRepository::list_in_city(pool, city.id, &interests).await?;

        if candidates.is_empty() {
            return Err(AtlasError::NotFound(format!(
                "dog-friendly places in '{}' matching the interests",
                city.slug
            )));
        }

        if !config.gemini_api_key.is_empty() {
            let gemini = GeminiClient::new(http, &config.gemini_api_key, &config.gemini_model);
            let offered = &candidates[..candidates.len().min(MAX_AI_CANDIDATES)];

            match gemini.plan(&city.name, req.days, offered).await {
                Ok(plan) => {
                    let title = plan.title.clone();
                    let days = from_ai_plan(plan, offered, req.days);
                    if days.iter().any(|d| !d.stops.is_empty()) {
                        log::info!("AI itinerary for {} ({} days)", city.slug, req.days);
                        return Ok(ItineraryResponse {
                            city: city.summary(),
                            source: ItinerarySource::Ai,
                            title,
                            days,
                        });
                    }
                    log::warn!("AI itinerary for {} used no known places", city.slug);
                }
                Err(e) => log::warn!("AI itinerary failed, using fallback: {}", e),
            }
        }

        Ok(ItineraryResponse {
            city: city.summary(),
            source: ItinerarySource::Fallback,
            title: None,
            days: fallback_plan(&candidates, req.days),
        })
    }
}

/// Interest strings as place types; unknown names are rejected
fn parse_interests(raw: &[String]) -> Result<Vec<PlaceType>, AtlasError> {
    let mut types = Vec::new();
    for name in raw.iter().filter(|n| !n.trim().is_empty()) {
        let t = name.parse::<PlaceType>().map_err(AtlasError::InvalidInput)?;
        if !types.contains(&t) {
            types.push(t);
        }
    }
    Ok(types)
}

/// Keep only stops naming an offered place, each used once, within the day range
fn from_ai_plan(plan: GeminiPlan, offered: &[Place], days: u8) -> Vec<ItineraryDay> {
    let by_slug: HashMap<&str, &Place> = offered.iter().map(|p| (p.slug.as_str(), p)).collect();
    let mut used = HashSet::new();
    let mut result: Vec<ItineraryDay> = (1..=days)
        .map(|day| ItineraryDay {
            day,
            stops: Vec::new(),
        })
        .collect();

    for (idx, ai_day) in plan.days.into_iter().enumerate() {
        let day = ai_day.day.or_else(|| u8::try_from(idx + 1).ok());
        let Some(target) = day
            .and_then(|d| usize::from(d).checked_sub(1))
            .and_then(|i| result.get_mut(i))
        else {
            log::debug!("Dropping AI day {:?} outside 1..={}", day, days);
            continue;
        };

        for (pos, stop) in ai_day.stops.into_iter().enumerate() {
            let Some(place) = by_slug.get(stop.slug.trim()) else {
                log::debug!("Dropping unknown slug '{}' from AI plan", stop.slug);
                continue;
            };
            if !used.insert(place.id) {
                continue;
            }

            let slot = stop
                .slot
                .as_deref()
                .and_then(|s| s.parse::<DaySlot>().ok())
                .unwrap_or(DaySlot::ALL[pos.min(DaySlot::ALL.len() - 1)]);

            target.stops.push(ItineraryStop {
                slot,
                place: place.to_response(),
                note: stop.note.filter(|n| !n.trim().is_empty()),
            });
        }
    }

    result
}

fn fits_slot(slot: DaySlot, place_type: PlaceType) -> bool {
    match slot {
        DaySlot::Morning => place_type.is_outdoor(),
        DaySlot::Midday => matches!(place_type, PlaceType::Cafe | PlaceType::Restaurant),
        DaySlot::Evening => matches!(place_type, PlaceType::Bar | PlaceType::Restaurant),
    }
}

/// Deterministic plan over best-rated-first candidates
/// DOCUMENTATION: Each slot takes the best unused place of its preferred types;
/// gaps are filled with other types first, then any unused place
fn fallback_plan(candidates: &[Place], days: u8) -> Vec<ItineraryDay> {
    let mut used = vec![false; candidates.len()];

    let mut take = |pred: &dyn Fn(&Place) -> bool| -> Option<usize> {
        let idx = candidates
            .iter()
            .enumerate()
            .find(|(i, p)| !used[*i] && pred(p))
            .map(|(i, _)| i)?;
        used[idx] = true;
        Some(idx)
    };

    (1..=days)
        .map(|day| {
            let stops = DaySlot::ALL
                .iter()
                .filter_map(|&slot| {
                    take(&|p| fits_slot(slot, p.place_type))
                        .or_else(|| take(&|p| !p.place_type.is_outdoor() && !p.place_type.is_food()))
                        .or_else(|| take(&|_| true))
                        .map(|idx| ItineraryStop {
                            slot,
                            place: candidates[idx].to_response(),
                            note: None,
                        })
                })
                .collect();
            ItineraryDay { day, stops }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{GeminiDay, GeminiStop};
    use chrono::Utc;
    use uuid::Uuid;

    fn place(slug: &str, place_type: PlaceType) -> Place {
        Place {
            id: Uuid::new_v4(),
            name: slug.to_string(),
            slug: slug.to_string(),
            place_type,
            city_id: Uuid::nil(),
            city_name: "Lisbon".into(),
            city_slug: "lisbon".into(),
            country_name: Some("Portugal".into()),
            latitude: 38.72,
            longitude: -9.14,
            address: None,
            phone: None,
            website: None,
            description: None,
            short_description: None,
            amenities: vec![],
            dog_policy: None,
            rating: None,
            review_count: 0,
            image_url: None,
            is_verified: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn slugs(day: &ItineraryDay) -> Vec<(&str, DaySlot)> {
        day.stops
            .iter()
            .map(|s| (s.place.slug.as_str(), s.slot))
            .collect()
    }

    #[test]
    fn test_fallback_fills_slots_by_type() {
        let candidates = vec![
            place("bar-1", PlaceType::Bar),
            place("cafe-1", PlaceType::Cafe),
            place("park-1", PlaceType::Park),
            place("beach-1", PlaceType::Beach),
            place("resto-1", PlaceType::Restaurant),
            place("bar-2", PlaceType::Bar),
        ];

        let days = fallback_plan(&candidates, 2);
        assert_eq!(
            slugs(&days[0]),
            vec![
                ("park-1", DaySlot::Morning),
                ("cafe-1", DaySlot::Midday),
                ("bar-1", DaySlot::Evening)
            ]
        );
        assert_eq!(
            slugs(&days[1]),
            vec![
                ("beach-1", DaySlot::Morning),
                ("resto-1", DaySlot::Midday),
                ("bar-2", DaySlot::Evening)
            ]
        );
    }

    #[test]
    fn test_fallback_never_reuses_places() {
        let candidates = vec![
            place("park-1", PlaceType::Park),
            place("vet-1", PlaceType::Vet),
        ];
        let days = fallback_plan(&candidates, 3);

        let all: Vec<&str> = days
            .iter()
            .flat_map(|d| d.stops.iter().map(|s| s.place.slug.as_str()))
            .collect();
        assert_eq!(all, vec!["park-1", "vet-1"]);
        assert_eq!(days.len(), 3);
        assert!(days[1].stops.is_empty());
    }

    #[test]
    fn test_fallback_gap_prefers_other_types() {
        let candidates = vec![
            place("park-1", PlaceType::Park),
            place("park-2", PlaceType::Park),
            place("store-1", PlaceType::PetStore),
        ];
        let days = fallback_plan(&candidates, 1);
        assert_eq!(
            slugs(&days[0]),
            vec![
                ("park-1", DaySlot::Morning),
                ("store-1", DaySlot::Midday),
                ("park-2", DaySlot::Evening)
            ]
        );
    }

    #[test]
    fn test_ai_plan_drops_unknown_and_repeated_slugs() {
        let offered = vec![place("a", PlaceType::Park), place("b", PlaceType::Cafe)];
        let plan = GeminiPlan {
            title: Some("Trip".into()),
            days: vec![
                GeminiDay {
                    day: Some(1),
                    stops: vec![
                        GeminiStop {
                            slot: Some("morning".into()),
                            slug: "a".into(),
                            note: Some("Go early".into()),
                        },
                        GeminiStop {
                            slot: Some("midday".into()),
                            slug: "made-up".into(),
                            note: None,
                        },
                    ],
                },
                GeminiDay {
                    day: Some(2),
                    stops: vec![
                        GeminiStop {
                            slot: None,
                            slug: "a".into(),
                            note: None,
                        },
                        GeminiStop {
                            slot: Some("lunch".into()),
                            slug: "b".into(),
                            note: None,
                        },
                    ],
                },
                GeminiDay {
                    day: Some(9),
                    stops: vec![],
                },
            ],
        };

        let days = from_ai_plan(plan, &offered, 2);
        assert_eq!(days.len(), 2);
        assert_eq!(slugs(&days[0]), vec![("a", DaySlot::Morning)]);
        assert_eq!(days[0].stops[0].note.as_deref(), Some("Go early"));
        assert_eq!(slugs(&days[1]), vec![("b", DaySlot::Midday)]);
    }

    #[test]
    fn test_ai_plan_with_hundreds_of_unnumbered_days() {
        let offered = vec![place("a", PlaceType::Park), place("b", PlaceType::Cafe)];
        let mut ai_days: Vec<GeminiDay> = (0..300)
            .map(|_| GeminiDay {
                day: None,
                stops: vec![],
            })
            .collect();
        ai_days[1].stops.push(GeminiStop {
            slot: None,
            slug: "b".into(),
            note: None,
        });
        ai_days[299].stops.push(GeminiStop {
            slot: None,
            slug: "a".into(),
            note: None,
        });
        let plan = GeminiPlan {
            title: None,
            days: ai_days,
        };

        let days = from_ai_plan(plan, &offered, 3);
        assert_eq!(days.len(), 3);
        assert!(days[0].stops.is_empty());
        assert_eq!(slugs(&days[1]), vec![("b", DaySlot::Morning)]);
        assert!(days[2].stops.is_empty());
    }

    #[test]
    fn test_parse_interests() {
        let types = parse_interests(&["Coffee".into(), "cafe".into(), " ".into(), "dog park".into()])
            .unwrap();
        assert_eq!(types, vec![PlaceType::Cafe, PlaceType::DogPark]);
        assert!(parse_interests(&["casino".into()]).is_err());
    }
}
