mod candidates;
mod config;
mod db;
mod errors;
mod extraction;
mod jobs;
mod llm_client;
mod models;
mod parsing;
mod qa;
mod routes;
mod state;
mod storage;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::candidates::store::{CandidateStore, PgCandidateStore};
use crate::config::Config;
use crate::db::create_pool;
use crate::jobs::{run_sweeper, run_worker, JobQueue, RedisJobQueue};
use crate::llm_client::LlmClient;
use crate::parsing::ResumeParser;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{BlobStore, S3BlobStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let candidates: Arc<dyn CandidateStore> = Arc::new(PgCandidateStore::new(db));

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let blobs: Arc<dyn BlobStore> = Arc::new(S3BlobStore::new(s3, config.s3_bucket.clone()));
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize LLM client
    let llm = LlmClient::new(&config.llm)?;
    info!("LLM client initialized (models: {})", llm.models().join(" -> "));

    // Rows left mid-parse by a worker that died are failed on a timer
    let stalled_after = chrono::Duration::from_std(config.stalled_job_after)?;
    tokio::spawn(run_sweeper(candidates.clone(), stalled_after));

    // Background parse workers, each with its own queue connection
    let parser = ResumeParser::new(llm.clone());
    for worker_id in 0..config.worker_concurrency {
        let queue: Arc<dyn JobQueue> = Arc::new(RedisJobQueue::connect(&redis).await?);
        tokio::spawn(run_worker(
            worker_id,
            queue,
            blobs.clone(),
            candidates.clone(),
            parser.clone(),
        ));
    }
    info!("Spawned {} parse worker(s)", config.worker_concurrency);

    // Build app state
    let state = AppState {
        candidates,
        blobs,
        jobs: Arc::new(RedisJobQueue::connect(&redis).await?),
        llm,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict allowed origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "resume-api-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets by path, not by virtual host.
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
