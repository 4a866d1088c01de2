// src/services/mod.rs
// DOCUMENTATION: Services module organization
// PURPOSE: Re-export service components

pub mod admin_service;
pub mod auth_service;
pub mod cache;
pub mod city_service;
pub mod enrichment_service;
pub mod favorite_service;
pub mod gemini_client;
pub mod geo;
pub mod google_places_client;
pub mod image_providers;
pub mod ingest_service;
pub mod itinerary_service;
pub mod photo_service;
pub mod place_service;
pub mod review_service;

pub use admin_service::*;
pub use auth_service::*;
pub use cache::*;
pub use city_service::*;
pub use enrichment_service::*;
pub use favorite_service::*;
pub use gemini_client::*;
pub use google_places_client::*;
pub use image_providers::*;
pub use ingest_service::*;
pub use itinerary_service::*;
pub use photo_service::*;
pub use place_service::*;
pub use review_service::*;
