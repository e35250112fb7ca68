// Threadline server

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use threadline::{api::create_router, app_state::AppState, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("threadline=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let addr = config.server_address();

    // Initialize application state
    let app_state = AppState::new(config).await?;
    let app = create_router(app_state);

    info!("Threadline listening on http://{}", addr);
    info!("  POST   /api/v1/users/register | login | logout | refreshtokens");
    info!("  GET    /api/v1/posts/{{username}}  /api/v1/replies/{{postId}}");
    info!("  POST   /api/v1/likes/toggle-like  /api/v1/followers/toggle-follow");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
