use cv_management_backend::{
    build_router,
    config::{get_config, init_config},
    database::pool::{create_pool, run_migrations},
    AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SYNC_TICK: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    run_migrations(&pool).await?;
    info!("Database migrations applied");

    let app_state = AppState::new(pool)?;

    if app_state.sheet_sync_service.is_configured() {
        let sync = app_state.sheet_sync_service.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SYNC_TICK);
            loop {
                ticker.tick().await;
                match sync.run_if_due().await {
                    Ok(Some(report)) => info!(
                        synced = report.synced,
                        updated = report.updated,
                        "scheduled sheet sync done"
                    ),
                    Ok(None) => {}
                    Err(e) => tracing::error!(error = ?e, "Sheet sync worker error"),
                }
            }
        });
    } else {
        info!("SHEET_CSV_URL not set; sheet sync worker disabled");
    }

    let app = build_router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
