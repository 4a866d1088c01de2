// src/bin/ingest.rs
// DOCUMENTATION: Command-line CSV importer
// PURPOSE: Upload a CSV to a running server, print the validation report
// and optionally apply the job
//
// Usage: ingest <places.csv> [--apply]
// Env: ADMIN_TOKEN (required), DOGATLAS_API_URL (default http://localhost:8080)

use anyhow::{bail, Context, Result};
use dotenv::dotenv;
use reqwest::Client;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::process;
use std::time::{Duration, Instant};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

/// Issues listed before the output is truncated
const MAX_ISSUES_SHOWN: usize = 25;

#[derive(Debug, Deserialize)]
struct Issue {
    row: usize,
    field: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Job {
    id: String,
    filename: String,
    status: String,
    total_rows: i32,
    valid_rows: i32,
    #[serde(default)]
    errors: Vec<Issue>,
    #[serde(default)]
    warnings: Vec<Issue>,
    #[serde(default)]
    created_count: i32,
    #[serde(default)]
    updated_count: i32,
    #[serde(default)]
    failed_count: i32,
    #[serde(default)]
    merged_count: usize,
}

struct IngestClient {
    base_url: String,
    admin_token: String,
    client: Client,
}

impl IngestClient {
    fn new(base_url: String, admin_token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            admin_token,
            client,
        })
    }

    async fn check_service_health(&self) -> bool {
        match self.client.get(format!("{}/health", self.base_url)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn upload(&self, filename: &str, csv: String) -> Result<Job> {
        let response = self
            .client
            .post(format!("{}/api/admin/ingest", self.base_url))
            .query(&[("filename", filename)])
            .header("X-Admin-Token", &self.admin_token)
            .header("Content-Type", "text/csv")
            .body(csv)
            .send()
            .await
            .context("upload request failed")?;

        read_job(response).await
    }

    async fn apply(&self, job_id: &str) -> Result<Job> {
        let response = self
            .client
            .post(format!("{}/api/admin/ingest/{}/apply", self.base_url, job_id))
            .header("X-Admin-Token", &self.admin_token)
            .send()
            .await
            .context("apply request failed")?;

        read_job(response).await
    }
}

async fn read_job(response: reqwest::Response) -> Result<Job> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        bail!("HTTP {} - {}", status, body);
    }
    response
        .json::<Job>()
        .await
        .context("failed to parse response JSON")
}

fn print_issues(title: &str, color: &str, issues: &[Issue]) {
    if issues.is_empty() {
        return;
    }
    println!("\n{}{}{} ({}){}", BOLD, color, title, issues.len(), RESET);
    for issue in issues.iter().take(MAX_ISSUES_SHOWN) {
        println!("  row {:>5}  {:<18} {}", issue.row, issue.field, issue.message);
    }
    if issues.len() > MAX_ISSUES_SHOWN {
        println!("  ... {} more", issues.len() - MAX_ISSUES_SHOWN);
    }
}

fn print_report(job: &Job) {
    println!("\n{}Validation report for {}{}", BOLD, job.filename, RESET);
    println!("──────────────────────────────────────────────");
    println!("  Job:        {}", job.id);
    println!("  Rows:       {}", job.total_rows);
    println!("  Valid:      {}{}{}", GREEN, job.valid_rows, RESET);
    println!(
        "  Rejected:   {}{}{}",
        RED,
        job.total_rows - job.valid_rows,
        RESET
    );
    print_issues("Errors", RED, &job.errors);
    print_issues("Warnings", YELLOW, &job.warnings);
}

fn print_outcome(job: &Job, elapsed: Duration) {
    let color = if job.status == "completed" { GREEN } else { YELLOW };
    println!("\n{}Apply finished: {}{}{}", BOLD, color, job.status, RESET);
    println!("  • Created: {}{}{}", GREEN, job.created_count, RESET);
    println!(
        "  • Updated: {} ({} merged into near-duplicates)",
        job.updated_count, job.merged_count
    );
    println!("  • Failed:  {}{}{}", RED, job.failed_count, RESET);
    println!("  • Duration: {:.1}s", elapsed.as_secs_f64());
}

async fn run() -> Result<bool> {
    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: ingest <places.csv> [--apply]");
    };
    let apply = args.any(|a| a == "--apply");

    let admin_token = env::var("ADMIN_TOKEN").context("ADMIN_TOKEN must be set")?;
    let base_url =
        env::var("DOGATLAS_API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

    let csv = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("cannot read {}", path))?;
    let filename = Path::new(&path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.csv")
        .to_string();

    let client = IngestClient::new(base_url, admin_token)?;

    println!("{}Checking service status...{}", CYAN, RESET);
    if !client.check_service_health().await {
        bail!("service unavailable at {}", client.base_url);
    }

    let job = client.upload(&filename, csv).await?;
    print_report(&job);

    if !apply {
        println!("\nRe-run with --apply to import job {}", job.id);
        return Ok(job.errors.is_empty());
    }
    if job.valid_rows == 0 {
        println!("\n{}Nothing to apply.{}", YELLOW, RESET);
        return Ok(false);
    }

    let started = Instant::now();
    let applied = client.apply(&job.id).await?;
    print_outcome(&applied, started.elapsed());

    Ok(applied.status == "completed")
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    match run().await {
        Ok(true) => {}
        Ok(false) => process::exit(2),
        Err(e) => {
            eprintln!("{}error:{} {:#}", RED, RESET, e);
            process::exit(1);
        }
    }
}
