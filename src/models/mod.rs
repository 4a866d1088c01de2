// src/models/mod.rs
// DOCUMENTATION: Models module organization
// PURPOSE: Re-export model components

pub mod city;
pub mod favorite;
pub mod ingest_job;
pub mod itinerary;
pub mod photo;
pub mod place;
pub mod review;
pub mod user;

pub use city::*;
pub use favorite::*;
pub use ingest_job::*;
pub use itinerary::*;
pub use photo::*;
pub use place::*;
pub use review::*;
pub use user::*;
