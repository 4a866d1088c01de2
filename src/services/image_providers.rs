// src/services/image_providers.rs
// DOCUMENTATION: Photo lookup across external image sources
// PURPOSE: One entry point per provider returning the best matching image

use crate::config::Config;
use crate::errors::AtlasError;
use crate::models::Place;
use crate::services::GooglePlacesClient;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

const UNSPLASH_SEARCH_URL: &str = "https://api.unsplash.com/search/photos";
const PEXELS_SEARCH_URL: &str = "https://api.pexels.com/v1/search";
const WIKIMEDIA_API_URL: &str = "https://commons.wikimedia.org/w/api.php";
const WIKIMEDIA_USER_AGENT: &str = "DogAtlas/0.1 (photo enrichment)";

/// Image found for a place
#[derive(Debug, Clone, PartialEq)]
pub struct FoundImage {
    pub url: String,
    pub thumbnail_url: Option<String>,
    /// Provider-side identifier, unique per provider
    pub source_ref: String,
    pub attribution: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

/// Supported image sources, in default lookup order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageProvider {
    Google,
    Unsplash,
    Pexels,
    Wikimedia,
}

impl ImageProvider {
    pub const DEFAULT_ORDER: [ImageProvider; 4] = [
        ImageProvider::Google,
        ImageProvider::Unsplash,
        ImageProvider::Pexels,
        ImageProvider::Wikimedia,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageProvider::Google => "google",
            ImageProvider::Unsplash => "unsplash",
            ImageProvider::Pexels => "pexels",
            ImageProvider::Wikimedia => "wikimedia",
        }
    }

    /// Wikimedia needs no key; the others need one configured
    pub fn is_configured(&self, config: &Config) -> bool {
        match self {
            ImageProvider::Google => !config.google_places_api_key.is_empty(),
            ImageProvider::Unsplash => !config.unsplash_access_key.is_empty(),
            ImageProvider::Pexels => !config.pexels_api_key.is_empty(),
            ImageProvider::Wikimedia => true,
        }
    }

    /// Search text sent to the provider
    /// DOCUMENTATION: Place-specific sources get the place name; stock photo
    /// sources get a dog-friendly description of the venue type
    pub fn query_for(&self, place: &Place) -> String {
        match self {
            ImageProvider::Google | ImageProvider::Wikimedia => {
                format!("{} {}", place.name, place.city_name)
            }
            ImageProvider::Unsplash | ImageProvider::Pexels => {
                format!("dog {}", place.place_type.as_str().replace('_', " "))
            }
        }
    }

    /// Look up one image for `place`
    pub async fn find_image(
        &self,
        http: &Client,
        config: &Config,
        place: &Place,
    ) -> Result<Option<FoundImage>, AtlasError> {
        let query = self.query_for(place);
        match self {
            ImageProvider::Google => {
                let google = GooglePlacesClient::new(http, &config.google_places_api_key);
                let Some(candidate) = google
                    .find_place(&query, place.latitude, place.longitude)
                    .await?
                else {
                    return Ok(None);
                };

                Ok(candidate
                    .photos
                    .and_then(|photos| photos.into_iter().next())
                    .map(|photo| FoundImage {
                        url: google.full_photo_url(&photo.photo_reference),
                        thumbnail_url: Some(google.thumbnail_url(&photo.photo_reference)),
                        source_ref: format!("{}:{}", candidate.place_id, photo.photo_reference),
                        attribution: photo
                            .html_attributions
                            .and_then(|a| a.into_iter().next()),
                        width: photo.width,
                        height: photo.height,
                    }))
            }
            ImageProvider::Unsplash => {
                let request = http
                    .get(UNSPLASH_SEARCH_URL)
                    .header(
                        "Authorization",
                        format!("Client-ID {}", config.unsplash_access_key),
                    )
                    .query(&[
                        ("query", query.as_str()),
                        ("per_page", "1"),
                        ("orientation", "landscape"),
                    ]);
                let body: UnsplashSearch = fetch_json(*self, request).await?;
                Ok(unsplash_image(body))
            }
            ImageProvider::Pexels => {
                let request = http
                    .get(PEXELS_SEARCH_URL)
                    .header("Authorization", config.pexels_api_key.as_str())
                    .query(&[
                        ("query", query.as_str()),
                        ("per_page", "1"),
                        ("orientation", "landscape"),
                    ]);
                let body: PexelsSearch = fetch_json(*self, request).await?;
                Ok(pexels_image(body))
            }
            ImageProvider::Wikimedia => {
                let request = http
                    .get(WIKIMEDIA_API_URL)
                    .header("User-Agent", WIKIMEDIA_USER_AGENT)
                    .query(&[
                        ("action", "query"),
                        ("format", "json"),
                        ("generator", "search"),
                        ("gsrsearch", query.as_str()),
                        ("gsrnamespace", "6"),
                        ("gsrlimit", "1"),
                        ("prop", "imageinfo"),
                        ("iiprop", "url|size|extmetadata"),
                        ("iiurlwidth", "400"),
                    ]);
                let body: Value = fetch_json(*self, request).await?;
                Ok(wikimedia_image(&body))
            }
        }
    }
}

impl fmt::Display for ImageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" | "google_places" => Ok(ImageProvider::Google),
            "unsplash" => Ok(ImageProvider::Unsplash),
            "pexels" => Ok(ImageProvider::Pexels),
            "wikimedia" | "wikipedia" | "commons" => Ok(ImageProvider::Wikimedia),
            other => Err(format!("unknown image provider '{}'", other)),
        }
    }
}

async fn send_checked(provider: ImageProvider, request: RequestBuilder) -> Result<Response, AtlasError> {
    let response = request.send().await.map_err(|e| {
        log::error!("{} request failed: {}", provider, e);
        AtlasError::ExternalApiError(format!("{} request failed: {}", provider, e))
    })?;

    match response.status() {
        s if s.is_success() => Ok(response),
        StatusCode::TOO_MANY_REQUESTS => {
            log::warn!("{} rate limit reached", provider);
            Err(AtlasError::RateLimitExceeded)
        }
        s => {
            log::error!("{} API error {}", provider, s);
            Err(AtlasError::ExternalApiError(format!("{} API error {}", provider, s)))
        }
    }
}

async fn fetch_json<T: serde::de::DeserializeOwned>(
    provider: ImageProvider,
    request: RequestBuilder,
) -> Result<T, AtlasError> {
    send_checked(provider, request)
        .await?
        .json()
        .await
        .map_err(|e| {
            log::error!("Failed to parse {} response: {}", provider, e);
            AtlasError::ExternalApiError(format!("{} parse error: {}", provider, e))
        })
}

#[derive(Debug, Deserialize)]
struct UnsplashSearch {
    #[serde(default)]
    results: Vec<UnsplashPhoto>,
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    id: String,
    width: Option<i32>,
    height: Option<i32>,
    urls: UnsplashUrls,
    user: Option<UnsplashUser>,
}

#[derive(Debug, Deserialize)]
struct UnsplashUrls {
    regular: String,
    small: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UnsplashUser {
    name: String,
}

fn unsplash_image(body: UnsplashSearch) -> Option<FoundImage> {
    body.results.into_iter().next().map(|photo| FoundImage {
        url: photo.urls.regular,
        thumbnail_url: photo.urls.small,
        source_ref: photo.id,
        attribution: photo.user.map(|u| format!("{} on Unsplash", u.name)),
        width: photo.width,
        height: photo.height,
    })
}

#[derive(Debug, Deserialize)]
struct PexelsSearch {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

#[derive(Debug, Deserialize)]
struct PexelsPhoto {
    id: u64,
    width: Option<i32>,
    height: Option<i32>,
    photographer: Option<String>,
    src: PexelsSrc,
}

#[derive(Debug, Deserialize)]
struct PexelsSrc {
    large: String,
    medium: Option<String>,
}

fn pexels_image(body: PexelsSearch) -> Option<FoundImage> {
    body.photos.into_iter().next().map(|photo| FoundImage {
        url: photo.src.large,
        thumbnail_url: photo.src.medium,
        source_ref: photo.id.to_string(),
        attribution: photo.photographer.map(|p| format!("{} on Pexels", p)),
        width: photo.width,
        height: photo.height,
    })
}

/// First image page of a Commons search; `pages` is keyed by page id
fn wikimedia_image(body: &Value) -> Option<FoundImage> {
    let pages = body.pointer("/query/pages")?.as_object()?;

    pages.values().find_map(|page| {
        let info = page.get("imageinfo")?.as_array()?.first()?;
        let url = info.get("url")?.as_str()?.to_string();
        let title = page.get("title").and_then(Value::as_str).unwrap_or(url.as_str());
        let artist = info
            .pointer("/extmetadata/Artist/value")
            .and_then(Value::as_str)
            .map(strip_tags)
            .filter(|a| !a.is_empty());

        Some(FoundImage {
            thumbnail_url: info
                .get("thumburl")
                .and_then(Value::as_str)
                .map(str::to_string),
            source_ref: title.to_string(),
            attribution: Some(match artist {
                Some(artist) => format!("{} via Wikimedia Commons", artist),
                None => "Wikimedia Commons".to_string(),
            }),
            width: info.get("width").and_then(Value::as_i64).map(|w| w as i32),
            height: info.get("height").and_then(Value::as_i64).map(|h| h as i32),
            url,
        })
    })
}

/// Commons artist fields are HTML fragments
fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_names_parse() {
        assert_eq!("Unsplash".parse::<ImageProvider>().unwrap(), ImageProvider::Unsplash);
        assert_eq!("commons".parse::<ImageProvider>().unwrap(), ImageProvider::Wikimedia);
        assert!("flickr".parse::<ImageProvider>().is_err());
        for p in ImageProvider::DEFAULT_ORDER {
            assert_eq!(p.as_str().parse::<ImageProvider>().unwrap(), p);
        }
    }

    #[test]
    fn test_only_keyed_providers_configured() {
        let mut config = Config::for_tests();
        assert!(!ImageProvider::Google.is_configured(&config));
        assert!(!ImageProvider::Unsplash.is_configured(&config));
        assert!(ImageProvider::Wikimedia.is_configured(&config));

        config.pexels_api_key = "key".into();
        assert!(ImageProvider::Pexels.is_configured(&config));
    }

    #[test]
    fn test_unsplash_parsing() {
        let body: UnsplashSearch = serde_json::from_value(json!({
            "total": 1,
            "results": [{
                "id": "u1",
                "width": 3000,
                "height": 2000,
                "urls": {"regular": "https://images.unsplash.com/r", "small": "https://images.unsplash.com/s"},
                "user": {"name": "Ana"}
            }]
        }))
        .unwrap();

        let image = unsplash_image(body).unwrap();
        assert_eq!(image.source_ref, "u1");
        assert_eq!(image.url, "https://images.unsplash.com/r");
        assert_eq!(image.attribution.as_deref(), Some("Ana on Unsplash"));
    }

    #[test]
    fn test_pexels_empty_is_none() {
        let body: PexelsSearch = serde_json::from_value(json!({"photos": []})).unwrap();
        assert!(pexels_image(body).is_none());
    }

    #[test]
    fn test_pexels_parsing() {
        let body: PexelsSearch = serde_json::from_value(json!({
            "photos": [{
                "id": 42,
                "width": 1200,
                "height": 800,
                "photographer": "Joan",
                "src": {"large": "https://images.pexels.com/l", "medium": "https://images.pexels.com/m"}
            }]
        }))
        .unwrap();
        let image = pexels_image(body).unwrap();
        assert_eq!(image.source_ref, "42");
        assert_eq!(image.thumbnail_url.as_deref(), Some("https://images.pexels.com/m"));
    }

    #[test]
    fn test_wikimedia_parsing() {
        let body = json!({
            "query": {"pages": {"123": {
                "pageid": 123,
                "title": "File:Tiergarten.jpg",
                "imageinfo": [{
                    "url": "https://upload.wikimedia.org/t.jpg",
                    "thumburl": "https://upload.wikimedia.org/thumb/t.jpg",
                    "width": 2048,
                    "height": 1536,
                    "extmetadata": {"Artist": {"value": "<a href=\"//commons\">Jane Doe</a>"}}
                }]
            }}}
        });

        let image = wikimedia_image(&body).unwrap();
        assert_eq!(image.source_ref, "File:Tiergarten.jpg");
        assert_eq!(image.width, Some(2048));
        assert_eq!(
            image.attribution.as_deref(),
            Some("Jane Doe via Wikimedia Commons")
        );
    }

    #[test]
    fn test_wikimedia_without_results() {
        assert!(wikimedia_image(&json!({"batchcomplete": ""})).is_none());
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<span><a href='x'>A B</a></span> "), "A B");
    }
}
