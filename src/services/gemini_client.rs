// src/services/gemini_client.rs
// DOCUMENTATION: Gemini generateContent client
// PURPOSE: Ask the model for a JSON itinerary over a fixed list of places

use crate::errors::AtlasError;
use crate::models::Place;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Itinerary as returned by the model
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeminiPlan {
    pub title: Option<String>,
    #[serde(default)]
    pub days: Vec<GeminiDay>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeminiDay {
    pub day: Option<u8>,
    #[serde(default)]
    pub stops: Vec<GeminiStop>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeminiStop {
    pub slot: Option<String>,
    pub slug: String,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<GenerateCandidate>,
}

#[derive(Debug, Deserialize)]
struct GenerateCandidate {
    content: Option<GenerateContent>,
}

#[derive(Debug, Deserialize)]
struct GenerateContent {
    #[serde(default)]
    parts: Vec<GeneratePart>,
}

#[derive(Debug, Deserialize)]
struct GeneratePart {
    text: Option<String>,
}

pub struct GeminiClient<'a> {
    client: &'a Client,
    api_key: &'a str,
    model: &'a str,
}

impl<'a> GeminiClient<'a> {
    pub fn new(client: &'a Client, api_key: &'a str, model: &'a str) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }

    pub async fn plan(
        &self,
        city: &str,
        days: u8,
        candidates: &[Place],
    ) -> Result<GeminiPlan, AtlasError> {
        let url = format!("{}/{}:generateContent", GEMINI_BASE_URL, self.model);
        let body = json!({
            "contents": [{"parts": [{"text": build_prompt(city, days, candidates)}]}],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.4
            }
        });

        log::debug!("Gemini itinerary request: {} days in {}", days, city);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                log::error!("Gemini request failed: {}", e);
                AtlasError::ExternalApiError(format!("Gemini request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            log::error!("Gemini API error {}", status);
            return Err(AtlasError::ExternalApiError(format!(
                "Gemini API error {}",
                status
            )));
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| {
            log::error!("Failed to parse Gemini response: {}", e);
            AtlasError::ExternalApiError(format!("Gemini parse error: {}", e))
        })?;

        let text = generated
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .ok_or_else(|| AtlasError::ExternalApiError("Gemini returned no text".to_string()))?;

        parse_plan(&text)
    }
}

/// Prompt listing the only places the model may use
pub fn build_prompt(city: &str, days: u8, candidates: &[Place]) -> String {
    let mut prompt = format!(
        "Plan a {} day dog-friendly itinerary in {}.\n\
         Use only places from this list, each at most once, referenced by slug.\n\
         Each day has up to three stops with slot \"morning\", \"midday\" or \"evening\".\n\
         Prefer parks, beaches and trails in the morning, cafes and restaurants at midday,\n\
         bars and restaurants in the evening.\n\
         Answer with JSON only: {{\"title\": string, \"days\": [{{\"day\": number, \
         \"stops\": [{{\"slot\": string, \"slug\": string, \"note\": string}}]}}]}}\n\n\
         Places (slug | name | type | rating):\n",
        days, city
    );

    for place in candidates {
        prompt.push_str(&format!(
            "{} | {} | {} | {}\n",
            place.slug,
            place.name,
            place.place_type,
            place
                .rating
                .map(|r| format!("{:.1}", r))
                .unwrap_or_else(|| "-".to_string())
        ));
    }

    prompt
}

/// Parse the model's JSON, tolerating a markdown code fence around it
pub fn parse_plan(text: &str) -> Result<GeminiPlan, AtlasError> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(unfenced).map_err(|e| {
        log::warn!("Gemini answer is not a valid plan: {}", e);
        AtlasError::ExternalApiError(format!("Gemini answer unreadable: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let plan = parse_plan(
            r#"{"title":"Paws in Lisbon","days":[{"day":1,"stops":[{"slot":"morning","slug":"a-lisbon","note":"Shade"}]}]}"#,
        )
        .unwrap();
        assert_eq!(plan.title.as_deref(), Some("Paws in Lisbon"));
        assert_eq!(plan.days[0].stops[0].slug, "a-lisbon");
    }

    #[test]
    fn test_parse_fenced_json() {
        let plan = parse_plan("```json\n{\"days\": []}\n```").unwrap();
        assert!(plan.days.is_empty());
        assert!(plan.title.is_none());
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(parse_plan("Sure! Here is your plan").is_err());
    }
}
