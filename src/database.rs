// src/database.rs
mod models;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, error, info};

use crate::{
    config::DatabaseConfig,
    errors::RoverError,
    models::Rover,
    schema::{AppliedMigration, MigrationLog, MigrationStatus},
};
use models::RoverRow;

/// PostgreSQL store for rover records
///
/// Storage errors are returned as [`RoverError::Persistence`] without
/// retrying.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with pool settings from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, RoverError> {
        config.validate()?;
        info!(
            "Connecting to database: max_connections={}, acquire_timeout={:?}",
            config.max_connections, config.acquire_timeout
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| {
                error!("Failed to connect to database: {}", e);
                e
            })?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending migrations in order, one transaction each
    ///
    /// Returns the number of migrations applied.
    pub async fn migrate(&self, log: &MigrationLog) -> Result<usize, RoverError> {
        self.create_migration_table().await?;

        let applied = self.applied_migrations().await?;
        let names: Vec<&str> = applied.iter().map(|a| a.name.as_str()).collect();
        let pending = log.plan(names.as_slice())?;

        if pending.is_empty() {
            info!("Schema is up to date ({} migrations)", applied.len());
            return Ok(0);
        }

        for migration in pending {
            info!("Applying migration {}", migration.name);
            let mut tx = self.pool.begin().await?;

            for operation in &migration.operations {
                let sql = operation.to_sql();
                debug!("Executing: {}", sql);
                sqlx::query(&sql).execute(&mut *tx).await?;
            }

            sqlx::query("INSERT INTO schema_migrations (name) VALUES ($1)")
                .bind(migration.name)
                .execute(&mut *tx)
                .await?;

            tx.commit().await.map_err(|e| {
                error!("Failed to commit migration {}: {}", migration.name, e);
                e
            })?;
        }

        info!("Applied {} migrations", pending.len());
        Ok(pending.len())
    }

    /// Applied and pending state of every migration in `log`
    ///
    /// Read-only: a database never migrated reports everything pending.
    pub async fn migration_status(
        &self,
        log: &MigrationLog,
    ) -> Result<Vec<MigrationStatus>, RoverError> {
        let applied = if self.migration_table_exists().await? {
            self.applied_migrations().await?
        } else {
            Vec::new()
        };
        Ok(log.status(&applied)?)
    }

    async fn migration_table_exists(&self) -> Result<bool, RoverError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT to_regclass('schema_migrations') IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create table `schema_migrations`, rows kept in application order
    async fn create_migration_table(&self) -> Result<(), RoverError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn applied_migrations(&self) -> Result<Vec<AppliedMigration>, RoverError> {
        let applied = sqlx::query_as::<_, AppliedMigration>(
            "SELECT name, applied_at FROM schema_migrations ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(applied)
    }

    /// Insert rover, returning its id
    pub async fn insert_rover(&self, rover: &Rover) -> Result<i64, RoverError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO rovers (latitude, longitude, direction)
            VALUES ($1::numeric, $2::numeric, $3)
            RETURNING id",
        )
        .bind(rover.latitude.to_string())
        .bind(rover.longitude.to_string())
        .bind(rover.direction.degrees())
        .fetch_one(&self.pool)
        .await?;

        debug!("Inserted rover {}: {}", id, rover);
        Ok(id)
    }

    pub async fn get_rover(&self, id: i64) -> Result<Option<Rover>, RoverError> {
        let row = sqlx::query_as::<_, RoverRow>(
            "SELECT id, latitude::text AS latitude, longitude::text AS longitude, direction
            FROM rovers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| <(i64, Rover)>::try_from(row).map(|(_, rover)| rover))
            .transpose()
    }

    pub async fn list_rovers(&self) -> Result<Vec<(i64, Rover)>, RoverError> {
        let rows = sqlx::query_as::<_, RoverRow>(
            "SELECT id, latitude::text AS latitude, longitude::text AS longitude, direction
            FROM rovers ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(<(i64, Rover)>::try_from).collect()
    }

    pub async fn update_rover(&self, id: i64, rover: &Rover) -> Result<(), RoverError> {
        let result = sqlx::query(
            "UPDATE rovers
            SET latitude = $2::numeric, longitude = $3::numeric, direction = $4
            WHERE id = $1",
        )
        .bind(id)
        .bind(rover.latitude.to_string())
        .bind(rover.longitude.to_string())
        .bind(rover.direction.degrees())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RoverError::RoverNotFound(id));
        }
        Ok(())
    }

    pub async fn delete_rover(&self, id: i64) -> Result<(), RoverError> {
        let result = sqlx::query("DELETE FROM rovers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RoverError::RoverNotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_to_rover() {
        let row = RoverRow {
            id: 7,
            latitude: "40.71280000".to_string(),
            longitude: "-74.00600000".to_string(),
            direction: 0.0,
        };
        let (id, rover) = <(i64, Rover)>::try_from(row).unwrap();
        assert_eq!(id, 7);
        assert_eq!(rover.render(), "[(40.71280000,-74.00600000),0.0]");
    }

    #[test]
    fn row_with_invalid_decimal() {
        let row = RoverRow {
            id: 1,
            latitude: "1.123456789".to_string(),
            longitude: "0".to_string(),
            direction: 0.0,
        };
        assert!(matches!(
            <(i64, Rover)>::try_from(row),
            Err(RoverError::Validation {
                field: "latitude",
                ..
            })
        ));
    }
}
