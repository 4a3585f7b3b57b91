//! Schema history for stored records
//!
//! Every change to a stored table is an [`Operation`] inside a named
//! [`Migration`]. Each migration names the one before it, and the whole
//! chain is checked when a [`MigrationLog`] is built, so migrations are
//! applied strictly in order and never skipped.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::errors::MigrationError;

/// Column type of a stored field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Auto-incrementing primary key
    AutoId,
    /// Fixed-point decimal with `max_digits` total and `decimal_places` after the point
    Decimal { max_digits: u32, decimal_places: u32 },
    /// Double precision float
    Float,
}

impl FieldType {
    /// Whether every value of `self` fits into `new` without loss
    pub fn widens_to(&self, new: &FieldType) -> bool {
        match (self, new) {
            (
                FieldType::Decimal {
                    max_digits: old_digits,
                    decimal_places: old_places,
                },
                FieldType::Decimal {
                    max_digits,
                    decimal_places,
                },
            ) => {
                decimal_places >= old_places
                    && max_digits.saturating_sub(*decimal_places)
                        >= old_digits.saturating_sub(*old_places)
            }
            (old, new) => old == new,
        }
    }
}

impl fmt::Display for FieldType {
    /// PostgreSQL column type
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::AutoId => f.write_str("BIGSERIAL"),
            FieldType::Decimal {
                max_digits,
                decimal_places,
            } => write!(f, "NUMERIC({}, {})", max_digits, decimal_places),
            FieldType::Float => f.write_str("DOUBLE PRECISION"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub field_type: FieldType,
}

impl Field {
    pub const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self { name, field_type }
    }

    fn column_sql(&self) -> String {
        match self.field_type {
            FieldType::AutoId => format!("{} {} PRIMARY KEY", self.name, self.field_type),
            _ => format!("{} {} NOT NULL", self.name, self.field_type),
        }
    }
}

/// Single change to the stored schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateTable {
        table: &'static str,
        fields: Vec<Field>,
    },
    AlterField {
        table: &'static str,
        field: &'static str,
        field_type: FieldType,
    },
}

impl Operation {
    /// PostgreSQL statement performing the operation
    pub fn to_sql(&self) -> String {
        match self {
            Operation::CreateTable { table, fields } => {
                let columns: Vec<String> = fields.iter().map(Field::column_sql).collect();
                format!(
                    "CREATE TABLE IF NOT EXISTS {} ({})",
                    table,
                    columns.join(", ")
                )
            }
            Operation::AlterField {
                table,
                field,
                field_type,
            } => format!(
                "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
                table, field, field_type
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub name: &'static str,
    /// Migration this one builds on, `None` only for the first
    pub depends_on: Option<&'static str>,
    pub operations: Vec<Operation>,
}

/// Tables and their fields after some prefix of the migration log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaState {
    tables: BTreeMap<&'static str, Vec<Field>>,
}

impl SchemaState {
    pub fn field(&self, table: &str, field: &str) -> Option<&Field> {
        self.tables.get(table)?.iter().find(|f| f.name == field)
    }

    pub fn fields(&self, table: &str) -> Option<&[Field]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    /// Apply one operation
    ///
    /// Returns `false` when an altered field was narrowed, i.e. stored values
    /// may no longer fit.
    pub fn apply(&mut self, operation: &Operation) -> Result<bool, MigrationError> {
        match operation {
            Operation::CreateTable { table, fields } => {
                if self.tables.contains_key(table) {
                    return Err(MigrationError::TableExists(table.to_string()));
                }
                self.tables.insert(*table, fields.clone());
                Ok(true)
            }
            Operation::AlterField {
                table,
                field,
                field_type,
            } => {
                let fields = self
                    .tables
                    .get_mut(table)
                    .ok_or_else(|| MigrationError::UnknownTable(table.to_string()))?;
                let existing = fields.iter_mut().find(|f| f.name == *field).ok_or_else(|| {
                    MigrationError::UnknownField {
                        table: table.to_string(),
                        field: field.to_string(),
                    }
                })?;

                let widens = existing.field_type.widens_to(field_type);
                if !widens {
                    warn!(
                        "Altering {}.{} from {} to {} may not preserve stored values",
                        table, field, existing.field_type, field_type
                    );
                }
                existing.field_type = *field_type;
                Ok(widens)
            }
        }
    }
}

/// State of one migration against a database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub name: &'static str,
    pub depends_on: Option<&'static str>,
    /// `None` while pending
    pub applied_at: Option<DateTime<Utc>>,
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// Record of a migration already applied to a database
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AppliedMigration {
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// Ordered, validated chain of migrations
#[derive(Debug, Clone)]
pub struct MigrationLog {
    migrations: Vec<Migration>,
}

impl MigrationLog {
    pub fn new(migrations: Vec<Migration>) -> Result<Self, MigrationError> {
        let mut names = HashSet::new();
        let mut state = SchemaState::default();
        let mut previous: Option<&'static str> = None;

        for migration in &migrations {
            if !names.insert(migration.name) {
                return Err(MigrationError::DuplicateName(migration.name.to_string()));
            }
            if migration.depends_on != previous {
                return Err(MigrationError::BrokenChain {
                    name: migration.name.to_string(),
                    expected: previous.map(str::to_string),
                    found: migration.depends_on.map(str::to_string),
                });
            }
            for operation in &migration.operations {
                state.apply(operation)?;
            }
            previous = Some(migration.name);
        }

        Ok(Self { migrations })
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Schema after every migration has been applied
    pub fn final_state(&self) -> Result<SchemaState, MigrationError> {
        self.state_after(self.migrations.len())
    }

    /// Schema after the first `count` migrations
    pub fn state_after(&self, count: usize) -> Result<SchemaState, MigrationError> {
        let mut state = SchemaState::default();
        for migration in self.migrations.iter().take(count) {
            for operation in &migration.operations {
                state.apply(operation)?;
            }
        }
        Ok(state)
    }

    /// Migrations still to apply, given names already applied in order
    ///
    /// The applied names must be exactly a prefix of the log.
    pub fn plan<S: AsRef<str>>(&self, applied: &[S]) -> Result<&[Migration], MigrationError> {
        for (idx, name) in applied.iter().enumerate() {
            let name = name.as_ref();
            match self.migrations.get(idx) {
                Some(expected) if expected.name == name => {}
                _ if !self.migrations.iter().any(|m| m.name == name) => {
                    return Err(MigrationError::UnknownApplied(name.to_string()));
                }
                Some(expected) => {
                    return Err(MigrationError::OutOfOrder {
                        expected: expected.name.to_string(),
                        found: name.to_string(),
                    });
                }
                None => {
                    return Err(MigrationError::BeyondLog {
                        name: name.to_string(),
                        position: idx + 1,
                    });
                }
            }
        }
        Ok(&self.migrations[applied.len()..])
    }

    pub fn status(&self, applied: &[AppliedMigration]) -> Result<Vec<MigrationStatus>, MigrationError> {
        self.plan(applied.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().as_slice())?;

        Ok(self
            .migrations
            .iter()
            .enumerate()
            .map(|(idx, migration)| MigrationStatus {
                name: migration.name,
                depends_on: migration.depends_on,
                applied_at: applied.get(idx).map(|a| a.applied_at),
            })
            .collect())
    }
}

/// Table holding rover records
pub const ROVERS_TABLE: &str = "rovers";

/// History of the rover table
pub fn rover_migrations() -> Result<MigrationLog, MigrationError> {
    MigrationLog::new(vec![
        Migration {
            name: "0001_create_rovers",
            depends_on: None,
            operations: vec![Operation::CreateTable {
                table: ROVERS_TABLE,
                fields: vec![
                    Field::new("id", FieldType::AutoId),
                    Field::new(
                        "latitude",
                        FieldType::Decimal {
                            max_digits: 9,
                            decimal_places: 6,
                        },
                    ),
                    Field::new(
                        "longitude",
                        FieldType::Decimal {
                            max_digits: 9,
                            decimal_places: 6,
                        },
                    ),
                    Field::new("direction", FieldType::Float),
                ],
            }],
        },
        Migration {
            name: "0002_widen_rover_coordinates",
            depends_on: Some("0001_create_rovers"),
            operations: vec![
                Operation::AlterField {
                    table: ROVERS_TABLE,
                    field: "latitude",
                    field_type: FieldType::Decimal {
                        max_digits: 11,
                        decimal_places: 8,
                    },
                },
                Operation::AlterField {
                    table: ROVERS_TABLE,
                    field: "longitude",
                    field_type: FieldType::Decimal {
                        max_digits: 11,
                        decimal_places: 8,
                    },
                },
            ],
        },
    ])
}
