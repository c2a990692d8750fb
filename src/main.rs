use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use timetable::config::{Config, StoreBackend};
use timetable::db::SqliteScheduleStore;
use timetable::error::AppError;
use timetable::firestore::FirestoreStore;
use timetable::router;
use timetable::state::AppState;
use timetable::store::ScheduleStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "timetable=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store: Arc<dyn ScheduleStore> = match config.store {
        StoreBackend::Firestore => {
            let firestore = config
                .firestore
                .clone()
                .ok_or_else(|| AppError::Config("Firestore settings missing".to_string()))?;
            info!("using Firestore project {}", firestore.project_id);
            Arc::new(FirestoreStore::new(firestore)?)
        }
        StoreBackend::Sqlite => {
            info!("using SQLite database {}", config.database_url);
            Arc::new(SqliteScheduleStore::connect(&config.database_url).await?)
        }
    };

    let state = AppState { store };
    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
