// src/main.rs
// DOCUMENTATION: Application entry point
// PURPOSE: Initialize config, database, shared state and start HTTP server

mod config;
mod db;
mod errors;
mod handlers;
mod ingest;
mod models;
mod services;

use actix_web::{middleware::Logger, web, App, HttpServer};
use config::Config;
use services::{build_rate_limiter, start_cleanup_task, JwtService, SearchCache};
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Timeout for outbound HTTP calls (providers, Google, Gemini)
const HTTP_CLIENT_TIMEOUT_SECS: u64 = 20;
const CACHE_CLEANUP_INTERVAL_SECS: u64 = 300;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // 1. Load configuration (reads .env)
    let config = Config::from_env();

    // 2. Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        let log_level = if !config.log_level.is_empty() {
            &config.log_level
        } else {
            "info,actix_web=info,sqlx=warn"
        };
        std::env::set_var("RUST_LOG", log_level);
    }
    env_logger::init();

    if let Err(e) = config.validate() {
        log::error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    log::info!("Starting dogatlas...");
    log::info!("Environment: {}", config.environment);
    log::info!(
        "Server Address: {}:{}",
        config.server_address,
        config.server_port
    );

    // 3. Initialize database connection pool (runs migrations)
    let pool = match config::init_db_pool(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    // 4. Search cache with background cleanup
    let cache = Arc::new(SearchCache::new(config.search_cache_ttl_seconds));
    start_cleanup_task(cache.clone(), CACHE_CLEANUP_INTERVAL_SECS);
    log::info!(
        "Initialized search cache (TTL: {}s)",
        config.search_cache_ttl_seconds
    );

    // 5. Outbound HTTP client, enrichment rate limiter and session tokens
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_CLIENT_TIMEOUT_SECS))
        .build()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let limiter = web::Data::new(build_rate_limiter(config.enrich_requests_per_second));
    let jwt = JwtService::from_config(&config);
    log::info!(
        "Enrichment limited to {} requests/s",
        config.enrich_requests_per_second
    );

    // 6. Start HTTP server
    let server_addr = format!("{}:{}", config.server_address, config.server_port);
    let max_csv_bytes = config.max_csv_bytes;

    HttpServer::new(move || {
        App::new()
            // Application state
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(cache.clone()))
            .app_data(web::Data::new(http.clone()))
            .app_data(web::Data::new(jwt.clone()))
            .app_data(limiter.clone())
            // CSV uploads arrive as plain-text bodies
            .app_data(web::PayloadConfig::new(max_csv_bytes))
            .app_data(web::JsonConfig::default().limit(256 * 1024))
            // Middleware
            .wrap(Logger::default())
            .wrap(actix_web::middleware::Compress::default())
            // Routes
            .configure(handlers::health_config)
            .configure(handlers::api_config)
    })
    .bind(&server_addr)?
    .run()
    .await
}
