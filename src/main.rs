use std::sync::Arc;

use groupcast::directory::GroupDirectory;
use groupcast::groups::{self, topic::TopicStore, GroupRegistry};
use groupcast::AppState;
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("groupcast=info")),
        )
        .init();

    let directory = Arc::new(GroupDirectory::load()?);

    let db_url =
        dotenv::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:groupcast.db?mode=rwc".to_owned());
    let pool = SqlitePoolOptions::new().max_connections(16).connect(&db_url).await?;
    let topic = TopicStore::new(pool);
    topic.init().await?;

    // One consumer per group known at startup; groups that appear later do
    // not get one.
    let registry = Arc::new(GroupRegistry::new());
    for group_id in directory.group_ids() {
        let group = registry.group(group_id).await;
        tokio::spawn(groups::topic::run_consumer(topic.clone(), group_id, group));
    }

    let state = AppState { directory, registry, topic };
    let app = groups::router().with_state(state).layer(CorsLayer::permissive());

    let addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "groupcast listening");
    axum::serve(listener, app).await?;
    Ok(())
}
