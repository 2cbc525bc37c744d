mod cli;
mod config;
mod database;
mod error;
mod server;
mod timing;

use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use r2d2_sqlite::SqliteConnectionManager;
use tokio::{net::TcpListener, sync::watch};
use tracing::{error, info, warn};

use cli::Args;
use config::{Config, LogFormat};
use database::sqlite::ScheduleStore;
use error::StartupError;
use server::server::Server;
use timing::{local_now::ZonedClock, monitor::StatusMonitor};

fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let subscriber = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => subscriber.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => subscriber.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let config = match args.load_config() {
        Ok(config) => config,
        Err(err) => {
            init_tracing(LogFormat::default());
            error!(error = %err, "could not load configuration");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "startup failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), StartupError> {
    let clock = ZonedClock::from_name(config.timezone.as_deref())?;
    let options = config.status_options();

    let manager = SqliteConnectionManager::file(&config.database);
    let pool = r2d2::Pool::builder().build(manager)?;
    let store = ScheduleStore::setup(Arc::new(pool))?;

    if store.is_empty()? {
        let defaults = config.default_schedule()?;
        if !defaults.is_empty() {
            info!(days = defaults.len(), "seeding default operating hours");
            store.replace_schedule(&defaults)?;
        }
    }
    let schedule = store.load_schedule()?;
    if schedule.is_empty() {
        warn!("no operating hours configured, status will read as unset");
    }

    let (schedule_tx, schedule_rx) = watch::channel(Arc::new(schedule));
    let monitor = StatusMonitor::spawn(
        schedule_rx,
        Arc::new(clock),
        options,
        config.refresh_interval(),
    );
    let server = Server::setup(
        store,
        Arc::new(schedule_tx),
        monitor.subscribe(),
        Arc::new(clock),
        options,
    );

    let listener = TcpListener::bind(&config.bind).await?;
    info!(
        bind = %config.bind,
        database = %config.database,
        timezone = ?clock.timezone(),
        interval_secs = config.refresh_interval_secs,
        "listening"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(error = %err, "could not accept connection");
                    continue;
                }
            },
            _ = &mut shutdown => {
                info!(status = %monitor.latest().label, "shutting down");
                break;
            }
        };
        let io = TokioIo::new(stream);
        let server_clone = server.clone();
        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(io, server_clone)
                .await
            {
                warn!(%peer, error = %err, "connection error");
            }
        });
    }

    monitor.shutdown();
    Ok(())
}
