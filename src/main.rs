/*****************************************************************************************
 *
 *  comet – Long-polling publish/subscribe relay
 *  --------------------------------------------
 *
 *  GET /sub holds the connection, GET /pub notifies and closes every held one.
 *
 *****************************************************************************************/

use clap::Parser;
use tokio::net::TcpListener;
use axum::serve;

use tracing_subscriber::FmtSubscriber;

use comet_relay::app;
use comet_relay::cli::Args;
use comet_relay::config::AppConfig;
use comet_relay::errors::StartupError;
use comet_relay::services::registry_service::RegistryHandle;
use comet_relay::state::AppState;

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    //
    // ────────────────────────────────────────────────────────
    //  Load configuration (config.json + command line)
    // ────────────────────────────────────────────────────────
    //
    let args = Args::parse();
    let cfg = AppConfig::resolve(&args)?;

    //
    // ────────────────────────────────────────────────────────
    //  Configure logging
    // ────────────────────────────────────────────────────────
    //
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cfg.level_filter())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
    }

    tracing::info!("Starting comet…");
    tracing::debug!("Loaded configuration: {:?}", cfg);

    //
    // ────────────────────────────────────────────────────────
    //  Start the registry task
    // ────────────────────────────────────────────────────────
    //
    let (registry, registry_task) = RegistryHandle::spawn();

    //
    // ────────────────────────────────────────────────────────
    //  Build Axum app
    // ────────────────────────────────────────────────────────
    //
    let app = app::build_app(AppState::new(registry.clone(), &cfg));

    //
    // ────────────────────────────────────────────────────────
    //  Bind server and start listening
    // ────────────────────────────────────────────────────────
    //
    let addr = cfg.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    tracing::info!("Listening on http://{}", addr);

    #[cfg(unix)]
    tokio::spawn(log_hangups());

    serve(listener, app)
        .with_graceful_shutdown(shutdown(registry))
        .await
        .map_err(StartupError::Serve)?;

    registry_task.abort();
    tracing::info!("Goodbye.");
    Ok(())
}

//
// ─────────────────────────────────────────────────────────────
//  Graceful shutdown handler
// ─────────────────────────────────────────────────────────────
//
async fn shutdown(registry: RegistryHandle) {
    wait_for_termination().await;

    // Held subscribers would otherwise keep the graceful shutdown waiting forever.
    let closed = registry.close_all().await;
    tracing::warn!("Shutdown requested: closed {} pending subscribers", closed);
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};

    let ctrl_c = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = ctrl_c => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("SIGTERM handler unavailable: {e}");
            let _ = ctrl_c.await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn log_hangups() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("SIGHUP handler unavailable: {e}");
            return;
        }
    };

    while hup.recv().await.is_some() {
        tracing::info!("HUP received");
    }
}
