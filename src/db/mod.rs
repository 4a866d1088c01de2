// src/db/mod.rs
// DOCUMENTATION: Database module organization
// PURPOSE: Re-export database components

pub mod city_repository;
pub mod favorite_repository;
pub mod ingest_job_repository;
pub mod photo_repository;
pub mod place_repository;
pub mod review_repository;
pub mod user_repository;

pub use city_repository::*;
pub use favorite_repository::*;
pub use ingest_job_repository::*;
pub use photo_repository::*;
pub use place_repository::*;
pub use review_repository::*;
pub use user_repository::*;
