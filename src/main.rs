use quakeflow::{
    config::Config,
    engine::DashboardEngine,
    live::LiveFeedClient,
    snapshot::{snapshot_poll_task, HttpSnapshotFetcher, SnapshotSource},
    ui::{self, UiViews},
    views::LogViews,
};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let config = Config::from_env()?;

    // Logs go to stderr so the alternate-screen UI owns stdout
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.rust_log.clone()),
    )
    .target(env_logger::Target::Stderr)
    .init();

    log::info!("🚀 Starting Quakeflow...");
    log::info!("📊 Configuration:");
    log::info!("   API URL: {}", config.api_url);
    log::info!("   Live feed: {}", config.ws_url);
    log::info!("   Snapshot interval: {}s", config.snapshot_interval.as_secs());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ui_views = Arc::new(UiViews::default());
    let engine = if config.headless {
        let views = Arc::new(LogViews);
        Arc::new(Mutex::new(DashboardEngine::new(
            views.clone(),
            views.clone(),
            views,
        )))
    } else {
        Arc::new(Mutex::new(DashboardEngine::new(
            ui_views.clone(),
            ui_views.clone(),
            ui_views.clone(),
        )))
    };

    let fetcher: Arc<dyn SnapshotSource> =
        Arc::new(HttpSnapshotFetcher::new(config.snapshot_url())?);
    let poll_engine = engine.clone();
    let poll_shutdown = shutdown_rx.clone();
    let snapshot_interval = config.snapshot_interval;
    tokio::spawn(async move {
        snapshot_poll_task(fetcher, poll_engine, snapshot_interval, poll_shutdown).await;
    });

    let (live, conn_rx) = LiveFeedClient::new(
        config.ws_url.clone(),
        config.reconnect_base,
        config.reconnect_max,
    );
    let live_engine = engine.clone();
    let live_shutdown = shutdown_rx.clone();
    let live_handle = tokio::spawn(async move {
        live.run(live_engine, live_shutdown).await;
    });

    log::info!("✅ Tasks started, opening dashboard");

    if config.headless {
        tokio::signal::ctrl_c().await?;
        log::info!("Received Ctrl-C, shutting down");
    } else if let Err(e) = ui::run_ui(ui_views, engine, conn_rx).await {
        log::error!("❌ UI error: {}", e);
    }

    let _ = shutdown_tx.send(true);
    let _ = live_handle.await;
    log::info!("Quakeflow stopped");

    Ok(())
}
