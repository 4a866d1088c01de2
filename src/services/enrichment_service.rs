// src/services/enrichment_service.rs
// DOCUMENTATION: Photo enrichment for places without an image
// PURPOSE: Query image providers in order, throttled by a shared rate limiter

use crate::config::Config;
use crate::db::{PhotoRepository, PlaceRepository};
use crate::errors::AtlasError;
use crate::models::{CreatePhotoRequest, Place};
use crate::services::{FoundImage, ImageProvider, SearchCache};
use chrono::Utc;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::{BTreeMap, HashSet};
use std::num::NonZeroU32;
use std::time::Instant;

const DEFAULT_ENRICH_LIMIT: i64 = 50;
const MAX_ENRICH_LIMIT: i64 = 500;

/// Body of POST /api/admin/enrich
#[derive(Debug, Default, Deserialize)]
pub struct EnrichRequest {
    /// City slug
    pub city: Option<String>,
    pub limit: Option<i64>,
    /// Provider names in lookup order; defaults to every configured provider
    pub providers: Option<Vec<String>>,
}

/// Enrichment statistics
/// DOCUMENTATION: Tracks results of one enrichment run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichStats {
    pub providers: Vec<String>,
    pub places_scanned: u32,
    pub places_enriched: u32,
    pub places_missed: u32,
    pub api_requests: u32,
    /// Hits per provider
    pub by_provider: BTreeMap<String, u32>,
    pub errors: Vec<String>,
    pub duration_ms: u64,
    pub started_at: String,
    pub completed_at: Option<String>,
}

impl EnrichStats {
    pub fn new(providers: &[ImageProvider]) -> Self {
        Self {
            providers: providers.iter().map(|p| p.as_str().to_string()).collect(),
            places_scanned: 0,
            places_enriched: 0,
            places_missed: 0,
            api_requests: 0,
            by_provider: BTreeMap::new(),
            errors: Vec::new(),
            duration_ms: 0,
            started_at: Utc::now().to_rfc3339(),
            completed_at: None,
        }
    }

    pub fn complete(&mut self, duration_ms: u64) {
        self.duration_ms = duration_ms;
        self.completed_at = Some(Utc::now().to_rfc3339());
    }
}

/// Limiter shared by every outbound enrichment call
pub fn build_rate_limiter(requests_per_second: u32) -> DefaultDirectRateLimiter {
    let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_second(rate))
}

/// Providers to query, in order
/// DOCUMENTATION: Unknown names are rejected; unconfigured ones are dropped
pub fn resolve_providers(
    requested: Option<&[String]>,
    config: &Config,
) -> Result<Vec<ImageProvider>, AtlasError> {
    let wanted: Vec<ImageProvider> = match requested {
        Some(names) if !names.is_empty() => names
            .iter()
            .map(|n| n.parse::<ImageProvider>())
            .collect::<Result<_, _>>()
            .map_err(AtlasError::InvalidInput)?,
        _ => ImageProvider::DEFAULT_ORDER.to_vec(),
    };

    let mut seen = HashSet::new();
    let providers: Vec<ImageProvider> = wanted
        .into_iter()
        .filter(|p| seen.insert(*p))
        .filter(|p| {
            let configured = p.is_configured(config);
            if !configured {
                log::info!("Skipping {}: no API key configured", p);
            }
            configured
        })
        .collect();

    if providers.is_empty() {
        return Err(AtlasError::InvalidInput(
            "none of the requested image providers is configured".to_string(),
        ));
    }
    Ok(providers)
}

pub struct EnrichmentService;

impl EnrichmentService {
    /// Find and store a primary photo for places that have none
    /// DOCUMENTATION: A failing provider or place is recorded and skipped;
    /// a provider that reports a rate limit is dropped for the rest of the run
    pub async fn enrich(
        pool: &PgPool,
        http: &reqwest::Client,
        config: &Config,
        limiter: &DefaultDirectRateLimiter,
        cache: &SearchCache,
        req: EnrichRequest,
    ) -> Result<EnrichStats, AtlasError> {
        let start_time = Instant::now();
        let mut providers = resolve_providers(req.providers.as_deref(), config)?;
        let limit = req
            .limit
            .unwrap_or(DEFAULT_ENRICH_LIMIT)
            .clamp(1, MAX_ENRICH_LIMIT);
        let mut stats = EnrichStats::new(&providers);

        let places = PlaceRepository::missing_images(pool, req.city.as_deref(), limit).await?;
        log::info!(
            "Enriching {} places with providers {:?}",
            places.len(),
            stats.providers
        );

        for place in &places {
            stats.places_scanned += 1;

            let mut hit = None;
            let mut exhausted = Vec::new();
            for provider in &providers {
                limiter.until_ready().await;
                stats.api_requests += 1;

                match provider.find_image(http, config, place).await {
                    Ok(Some(image)) => {
                        hit = Some((*provider, image));
                        break;
                    }
                    Ok(None) => log::debug!("{}: no image for {}", provider, place.slug),
                    Err(AtlasError::RateLimitExceeded) => {
                        stats
                            .errors
                            .push(format!("{}: rate limited, disabled for this run", provider));
                        exhausted.push(*provider);
                    }
                    Err(e) => stats.errors.push(format!("{} ({}): {}", place.slug, provider, e)),
                }
            }
            providers.retain(|p| !exhausted.contains(p));

            match hit {
                Some((provider, image)) => match store_image(pool, place, provider, image).await {
                    Ok(()) => {
                        stats.places_enriched += 1;
                        *stats.by_provider.entry(provider.to_string()).or_insert(0) += 1;
                    }
                    Err(e) => {
                        log::error!("Failed to store image for {}: {}", place.slug, e);
                        stats.errors.push(format!("{}: {}", place.slug, e));
                        stats.places_missed += 1;
                    }
                },
                None => stats.places_missed += 1,
            }

            if providers.is_empty() {
                log::warn!("Every image provider is rate limited; stopping early");
                break;
            }
        }

        if stats.places_enriched > 0 {
            cache.clear().await;
        }

        stats.complete(start_time.elapsed().as_millis() as u64);
        log::info!(
            "Enrichment finished: {} scanned, {} enriched, {} missed, {} requests in {} ms",
            stats.places_scanned,
            stats.places_enriched,
            stats.places_missed,
            stats.api_requests,
            stats.duration_ms
        );

        Ok(stats)
    }
}

/// Save the image as the place's primary photo (also sets places.image_url)
async fn store_image(
    pool: &PgPool,
    place: &Place,
    provider: ImageProvider,
    image: FoundImage,
) -> Result<(), AtlasError> {
    let display_order = PhotoRepository::next_display_order(pool, place.id).await?;
    let photo = PhotoRepository::create_photo(
        pool,
        &CreatePhotoRequest {
            place_id: place.id,
            url: image.url,
            thumbnail_url: image.thumbnail_url,
            source: provider.as_str().to_string(),
            source_ref: image.source_ref,
            attribution: image.attribution,
            width: image.width,
            height: image.height,
            is_primary: false,
            display_order,
        },
    )
    .await?;

    PhotoRepository::set_primary_photo(pool, place.id, photo.id).await?;
    log::debug!("Stored {} photo {} for {}", provider, photo.id, place.slug);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_providers_are_configured_ones() {
        let mut config = Config::for_tests();
        assert_eq!(
            resolve_providers(None, &config).unwrap(),
            vec![ImageProvider::Wikimedia]
        );

        config.unsplash_access_key = "key".into();
        assert_eq!(
            resolve_providers(None, &config).unwrap(),
            vec![ImageProvider::Unsplash, ImageProvider::Wikimedia]
        );
    }

    #[test]
    fn test_requested_order_kept_without_duplicates() {
        let mut config = Config::for_tests();
        config.pexels_api_key = "key".into();
        let names = vec!["wikimedia".to_string(), "pexels".into(), "Wikimedia".into()];
        assert_eq!(
            resolve_providers(Some(&names), &config).unwrap(),
            vec![ImageProvider::Wikimedia, ImageProvider::Pexels]
        );
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let names = vec!["flickr".to_string()];
        assert!(matches!(
            resolve_providers(Some(&names), &Config::for_tests()),
            Err(AtlasError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_only_unconfigured_providers_rejected() {
        let names = vec!["unsplash".to_string()];
        assert!(resolve_providers(Some(&names), &Config::for_tests()).is_err());
    }

    #[test]
    fn test_rate_limiter_allows_first_request() {
        let limiter = build_rate_limiter(2);
        assert!(limiter.check().is_ok());
        let zero = build_rate_limiter(0);
        assert!(zero.check().is_ok());
    }

    #[test]
    fn test_stats_complete() {
        let mut stats = EnrichStats::new(&[ImageProvider::Wikimedia]);
        assert!(stats.completed_at.is_none());
        stats.complete(12);
        assert_eq!(stats.duration_ms, 12);
        assert!(stats.completed_at.is_some());
        assert_eq!(stats.providers, vec!["wikimedia"]);
    }
}
