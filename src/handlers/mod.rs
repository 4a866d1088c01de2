// src/handlers/mod.rs
// DOCUMENTATION: Handlers module organization
// PURPOSE: Re-export handler components

pub mod admin;
pub mod auth;
pub mod cities;
pub mod extractors;
pub mod favorites;
pub mod health;
pub mod itinerary;
pub mod places;
pub mod reviews;

pub use admin::config as admin_config;
pub use auth::config as auth_config;
pub use cities::config as cities_config;
pub use favorites::config as favorites_config;
pub use health::config as health_config;
pub use itinerary::config as itinerary_config;
pub use places::config as places_config;
pub use reviews::config as reviews_config;

use actix_web::web;

/// Every JSON API route, mounted under /api
pub fn api_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(places_config)
            .configure(reviews_config)
            .configure(cities_config)
            .configure(favorites_config)
            .configure(auth_config)
            .configure(itinerary_config)
            .configure(admin_config),
    );
}
