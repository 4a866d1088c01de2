// src/models/itinerary.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::{CitySummary, PlaceResponse};

/// Body of POST /api/itinerary
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ItineraryRequest {
    /// City slug
    #[validate(length(min = 1))]
    pub city: String,

    #[validate(range(min = 1, max = 7))]
    pub days: u8,

    /// Place types to focus on (aliases accepted)
    #[serde(default)]
    pub interests: Vec<String>,
}

/// Part of the day a stop is planned for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaySlot {
    Morning,
    Midday,
    Evening,
}

impl DaySlot {
    pub const ALL: [DaySlot; 3] = [DaySlot::Morning, DaySlot::Midday, DaySlot::Evening];

    pub fn as_str(&self) -> &'static str {
        match self {
            DaySlot::Morning => "morning",
            DaySlot::Midday => "midday",
            DaySlot::Evening => "evening",
        }
    }
}

impl fmt::Display for DaySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DaySlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Ok(DaySlot::Morning),
            "midday" | "noon" | "lunch" | "afternoon" => Ok(DaySlot::Midday),
            "evening" | "night" | "dinner" => Ok(DaySlot::Evening),
            other => Err(format!("unknown slot '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItineraryStop {
    pub slot: DaySlot,
    pub place: PlaceResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItineraryDay {
    pub day: u8,
    pub stops: Vec<ItineraryStop>,
}

/// Who produced the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItinerarySource {
    Ai,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItineraryResponse {
    pub city: CitySummary,
    pub source: ItinerarySource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub days: Vec<ItineraryDay>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_bounds() {
        let mut req = ItineraryRequest {
            city: "lisbon".into(),
            days: 0,
            interests: vec![],
        };
        assert!(req.validate().is_err());
        req.days = 7;
        assert!(req.validate().is_ok());
        req.days = 8;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_slot_aliases() {
        assert_eq!("Lunch".parse::<DaySlot>().unwrap(), DaySlot::Midday);
        assert_eq!("night".parse::<DaySlot>().unwrap(), DaySlot::Evening);
        assert!("brunch".parse::<DaySlot>().is_err());
    }
}
