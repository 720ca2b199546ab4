// GT-Cal API Server

use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gt_cal::{app_state::AppState, calendar_interface::create_calendar_router, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;

    let app = Router::new()
        .merge(create_calendar_router(app_state.calendar.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = config.server_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("GT-Cal server listening on http://{}", addr);
    info!("  GET    /api/events");
    info!("  POST   /api/events");
    info!("  PUT    /api/events/{{id}}");
    info!("  DELETE /api/events/{{id}}");
    info!("  POST   /api/events/{{id}}/like|attend|comment");
    info!("  GET    /api/discussions/event/{{eventId}}");
    info!("  POST   /api/discussions/event/{{eventId}}");
    info!("  POST   /api/discussions/{{discussionId}}/replies");

    axum::serve(listener, app).await?;

    Ok(())
}
