// src/services/google_places_client.rs
// DOCUMENTATION: Google Places API client
// PURPOSE: Find a place by name near its coordinates and build photo URLs

use crate::errors::AtlasError;
use reqwest::Client;
use serde::Deserialize;

const GOOGLE_PLACES_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";
const PHOTO_MAX_WIDTH: i32 = 1200;
const THUMBNAIL_MAX_WIDTH: i32 = 400;
/// Location bias radius for Find Place, in meters
const LOCATION_BIAS_M: u32 = 2000;

/// Google Places API client
/// DOCUMENTATION: Shares the application's reqwest client
pub struct GooglePlacesClient<'a> {
    client: &'a Client,
    api_key: &'a str,
    base_url: &'a str,
}

/// Response from Find Place From Text
#[derive(Debug, Deserialize)]
pub struct FindPlaceResponse {
    #[serde(default)]
    pub candidates: Vec<GoogleCandidate>,
    pub status: String,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleCandidate {
    pub place_id: String,
    pub name: Option<String>,
    /// Photos are only present when requested in `fields`
    pub photos: Option<Vec<GooglePhoto>>,
}

/// Photo from Google Places
/// DOCUMENTATION: Place photo data structure
#[derive(Debug, Clone, Deserialize)]
pub struct GooglePhoto {
    /// Photo reference (used to fetch actual photo)
    pub photo_reference: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    /// HTML attributions (required by Google)
    pub html_attributions: Option<Vec<String>>,
}

impl<'a> GooglePlacesClient<'a> {
    pub fn new(client: &'a Client, api_key: &'a str) -> Self {
        Self {
            client,
            api_key,
            base_url: GOOGLE_PLACES_BASE_URL,
        }
    }

    /// Best candidate for `name` biased towards the given point
    pub async fn find_place(
        &self,
        name: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<GoogleCandidate>, AtlasError> {
        let url = format!("{}/findplacefromtext/json", self.base_url);
        let bias = format!("circle:{}@{},{}", LOCATION_BIAS_M, latitude, longitude);

        log::debug!("Google Find Place: '{}' near {},{}", name, latitude, longitude);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("input", name),
                ("inputtype", "textquery"),
                ("fields", "place_id,name,photos"),
                ("locationbias", bias.as_str()),
                ("key", self.api_key),
            ])
            .send()
            .await
            .map_err(|e| {
                log::error!("Google Places API request failed: {}", e);
                AtlasError::ExternalApiError(format!("Google request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            log::error!("Google Places API error {}", status);
            return Err(AtlasError::ExternalApiError(format!(
                "Google API error {}",
                status
            )));
        }

        let api_response: FindPlaceResponse = response.json().await.map_err(|e| {
            log::error!("Failed to parse Google Places response: {}", e);
            AtlasError::ExternalApiError(format!("Google parse error: {}", e))
        })?;

        first_candidate(api_response)
    }

    /// Photo URL from a photo reference
    pub fn photo_url(&self, photo_reference: &str, max_width: i32) -> String {
        format!(
            "{}/photo?maxwidth={}&photoreference={}&key={}",
            self.base_url, max_width, photo_reference, self.api_key
        )
    }

    pub fn full_photo_url(&self, photo_reference: &str) -> String {
        self.photo_url(photo_reference, PHOTO_MAX_WIDTH)
    }

    pub fn thumbnail_url(&self, photo_reference: &str) -> String {
        self.photo_url(photo_reference, THUMBNAIL_MAX_WIDTH)
    }
}

/// Map the API status onto a result
fn first_candidate(response: FindPlaceResponse) -> Result<Option<GoogleCandidate>, AtlasError> {
    match response.status.as_str() {
        "OK" | "ZERO_RESULTS" => Ok(response.candidates.into_iter().next()),
        "OVER_QUERY_LIMIT" => {
            log::error!("Google Places API quota exceeded");
            Err(AtlasError::RateLimitExceeded)
        }
        other => {
            let msg = response
                .error_message
                .unwrap_or_else(|| format!("Unknown status: {}", other));
            log::error!("Google Places API status {}: {}", other, msg);
            Err(AtlasError::ExternalApiError(msg))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> FindPlaceResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_first_candidate_with_photo() {
        let response = parse(json!({
            "status": "OK",
            "candidates": [{
                "place_id": "abc",
                "name": "Tiergarten",
                "photos": [{
                    "photo_reference": "ref-1",
                    "width": 4000,
                    "height": 3000,
                    "html_attributions": ["<a href=\"x\">Someone</a>"]
                }]
            }]
        }));

        let candidate = first_candidate(response).unwrap().unwrap();
        assert_eq!(candidate.place_id, "abc");
        assert_eq!(candidate.photos.unwrap()[0].photo_reference, "ref-1");
    }

    #[test]
    fn test_zero_results_is_none() {
        let response = parse(json!({"status": "ZERO_RESULTS", "candidates": []}));
        assert!(first_candidate(response).unwrap().is_none());
    }

    #[test]
    fn test_quota_maps_to_rate_limit() {
        let response = parse(json!({"status": "OVER_QUERY_LIMIT"}));
        assert!(matches!(
            first_candidate(response),
            Err(AtlasError::RateLimitExceeded)
        ));
    }

    #[test]
    fn test_denied_carries_message() {
        let response = parse(json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        }));
        match first_candidate(response) {
            Err(AtlasError::ExternalApiError(msg)) => assert!(msg.contains("API key")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_photo_urls() {
        let http = Client::new();
        let client = GooglePlacesClient::new(&http, "KEY");
        let url = client.full_photo_url("ref");
        assert!(url.contains("maxwidth=1200"));
        assert!(url.contains("photoreference=ref"));
        assert!(url.ends_with("key=KEY"));
        assert!(client.thumbnail_url("ref").contains("maxwidth=400"));
    }
}
