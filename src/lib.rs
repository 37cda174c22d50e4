pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod models;
pub mod services;
pub mod state;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use state::AppState;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key, value)?;
        }
        let (layer, task) = builder.build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    match cli.command {
        None | Some(Commands::Serve) => serve(config, prometheus_handle).await,

        Some(Commands::Init) => {
            if Config::create_default_if_missing()? {
                println!("✓ Config file created. Edit config.toml and run again.");
            } else {
                println!("config.toml already exists.");
            }
            Ok(())
        }

        Some(Commands::Cleanup) => {
            let stats = services::cleanup_temp_uploads(
                Path::new(&config.general.upload_temp_dir),
                Duration::from_secs(config.maintenance.max_age_minutes * 60),
            )
            .await?;
            println!(
                "Cleanup complete. Removed {} file(s), kept {}.",
                stats.removed, stats.kept
            );
            Ok(())
        }
    }
}

async fn serve(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!(
        "FaceGate v{} starting ({:?} backend)...",
        env!("CARGO_PKG_VERSION"),
        config.backend
    );

    let port = config.server.port;
    let cleanup_cron = config.maintenance.auto_cleanup_cron.clone();

    let state = AppState::from_config(config, prometheus_handle).await?;

    let scheduler = if let Some(cron) = cleanup_cron {
        Some(start_cleanup_scheduler(&cron, state.clone()).await?)
    } else {
        None
    };

    let app = api::router(state);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let server_handle = tokio::spawn(async move {
        info!("🌐 Web Server running at http://0.0.0.0:{port}");
        if let Err(e) = axum::serve(listener, app).await {
            error!("Web server error: {}", e);
        }
    });

    info!("Service running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    server_handle.abort();
    if let Some(mut scheduler) = scheduler {
        if let Err(e) = scheduler.shutdown().await {
            warn!("Scheduler shutdown error: {}", e);
        }
    }
    info!("Service stopped");

    Ok(())
}

async fn start_cleanup_scheduler(
    cron: &str,
    state: Arc<AppState>,
) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job_state = state;
    let job = Job::new_async(cron, move |_id, _scheduler| {
        let state = job_state.clone();
        Box::pin(async move {
            if let Err(e) =
                services::cleanup_temp_uploads(state.uploads.dir(), state.upload_max_age()).await
            {
                error!("Scheduled cleanup failed: {}", e);
            }
        })
    })
    .context("Invalid cleanup cron expression")?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    info!("Automatic upload cleanup scheduled ({cron})");

    Ok(scheduler)
}
