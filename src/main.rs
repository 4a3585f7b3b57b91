//! Rover store utility

use rover_store::{
    config::AppConfig, database::Database, errors::RoverError, schema::rover_migrations,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), RoverError> {
    #[cfg(feature = "dotenvy")]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load configuration, preferring environment variables over config files
    let config = AppConfig::load()?;

    let db = Database::connect(&config.database).await?;

    let log = rover_migrations()?;
    db.migrate(&log).await?;

    for status in db.migration_status(&log).await? {
        match status.applied_at {
            Some(applied_at) => info!("Migration {} applied at {}", status.name, applied_at),
            None => warn!("Migration {} is pending", status.name),
        }
    }

    for (id, rover) in db.list_rovers().await? {
        match rover.tile() {
            Ok(tile) => info!("Rover {}: {} in tile {}", id, rover, tile),
            Err(e) => warn!("Rover {}: {} ({})", id, rover, e),
        }
    }

    Ok(())
}
