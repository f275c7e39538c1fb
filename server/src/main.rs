use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use hyper::Request;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpListener;
use tower::ServiceExt;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use server::database::SqliteAdminStore;
use server::security::ClientAddr;
use server::{AppState, service_stack};
use shared::config::load_config;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Parser)]
#[command(name = "chapel-server", about = "Chapel CMS admin auth and rate limiting API")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    let store = SqliteAdminStore::connect_lazy(&config.database)
        .context("Failed to configure identity store")?;

    // The server still starts without a store; logins then go through the
    // fallback admin, if one is configured.
    if let Err(e) = store.migrate().await {
        warn!("Identity store not ready at startup: {}", e);
    }

    let bootstrap = config.auth.bootstrap_admin.clone();
    let addr = config.server.addr();
    let state = AppState::new(config, Arc::new(store))?;

    match state.auth.bootstrap(bootstrap.as_ref()).await {
        Ok(Some(admin)) => info!("Created initial super admin {}", admin.email),
        Ok(None) => {}
        Err(e) => warn!("Skipped admin bootstrap: {}", e),
    }

    let limits = state.limits.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            limits.cleanup().await;
            for (class, stats) in limits.stats().await {
                if stats.exhausted_keys > 0 {
                    info!(
                        "Rate limit {}: {} of {} clients at the ceiling",
                        class, stats.exhausted_keys, stats.tracked_keys
                    );
                }
            }
        }
    });

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!(
        "Listening on http://{} ({:?})",
        addr, state.config.server.environment
    );

    let svc = service_stack(state);

    let accept_loop = async move {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let io = TokioIo::new(stream);
            let svc = svc.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |mut req: Request<Incoming>| {
                    req.extensions_mut().insert(ClientAddr(peer));
                    svc.clone().oneshot(req)
                });

                if let Err(err) = http1::Builder::new()
                    .timer(TokioTimer::new())
                    .serve_connection(io, service)
                    .await
                {
                    warn!("Error serving connection from {}: {:?}", peer, err);
                }
            });
        }
    };

    tokio::select! {
        _ = accept_loop => {}
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
    }

    info!("Server stopped");
    Ok(())
}
