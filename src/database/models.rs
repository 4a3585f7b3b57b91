// src/database/models.rs
use crate::{
    errors::RoverError,
    models::{Heading, Rover},
};

/// Rover row with decimals read back as text, so no precision is lost
#[derive(Debug, sqlx::FromRow)]
pub(super) struct RoverRow {
    pub id: i64,
    pub latitude: String,
    pub longitude: String,
    pub direction: f64,
}

impl TryFrom<RoverRow> for (i64, Rover) {
    type Error = RoverError;

    fn try_from(row: RoverRow) -> Result<Self, Self::Error> {
        let rover = Rover::new(
            row.latitude
                .parse()
                .map_err(|e| RoverError::validation("latitude", e))?,
            row.longitude
                .parse()
                .map_err(|e| RoverError::validation("longitude", e))?,
            Heading::try_from(row.direction).map_err(|e| RoverError::validation("direction", e))?,
        );
        Ok((row.id, rover))
    }
}
