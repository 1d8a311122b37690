//! Application entry point for fizzboxd.
//!
//! Initializes all components and runs the diary publisher until Ctrl+C.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use dotenv::dotenv;
use fizzboxd::config::Config;
use fizzboxd::delivery::discord_channel_delivery::DiscordChannelDelivery;
use fizzboxd::feed::letterboxd_platform::LetterboxdPlatform;
use fizzboxd::logging::setup_logging;
use fizzboxd::repository::Repository;
use fizzboxd::service::Services;
use fizzboxd::task::diary_feed_publisher::DiaryFeedPublisher;
use log::debug;
use log::info;
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let init_start = Instant::now();
    let (config, _log_guard) = load_config()?;

    let repo = setup_database(&config, init_start).await?;
    let services = setup_services(&config, repo.clone())?;
    let publisher = setup_publisher(&config, &services, init_start).await?;

    run(init_start).await?;

    publisher.stop().await?;
    info!("Closing database...");
    repo.close().await;
    info!("bye");
    Ok(())
}

fn load_config() -> Result<(Arc<Config>, WorkerGuard)> {
    debug!("Loading configuration...");
    let mut config = Config::new();
    config.load()?;
    config.require_discord_token()?;
    let config = Arc::new(config);
    let guard = setup_logging(&config)?;
    info!("Starting fizzboxd...");
    Ok((config, guard))
}

async fn setup_database(config: &Config, init_start: Instant) -> Result<Arc<Repository>> {
    debug!("Setting up Database...");
    let repo = Arc::new(Repository::new(&config.db_url, &config.db_path).await?);

    info!("Running database migrations...");
    repo.run_migrations().await?;
    info!(
        "Database setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );

    Ok(repo)
}

fn setup_services(config: &Config, repo: Arc<Repository>) -> Result<Arc<Services>> {
    debug!("Setting up Services...");
    let platform = Arc::new(LetterboxdPlatform::new(
        &config.feed_base_url,
        config.fetch_timeout,
    )?);
    let delivery = Arc::new(DiscordChannelDelivery::new(
        &config.discord_api_url,
        config.require_discord_token()?,
        config.delivery_timeout,
    ));
    Ok(Arc::new(Services::new(
        repo,
        platform,
        delivery,
        config.entry_limit,
    )))
}

async fn setup_publisher(
    config: &Config,
    services: &Services,
    init_start: Instant,
) -> Result<Arc<DiaryFeedPublisher>> {
    debug!("Setting up Publisher...");

    let publisher = DiaryFeedPublisher::new(
        services.diary_feed.clone(),
        config.poll_interval,
        config.fetch_concurrency,
    );
    publisher.start().await?;

    info!(
        "Publisher setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );
    Ok(publisher)
}

async fn run(init_start: Instant) -> Result<()> {
    info!(
        "fizzboxd is up in {:.2}s. Press Ctrl+C to stop.",
        init_start.elapsed().as_secs_f64()
    );

    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down.");

    Ok(())
}
