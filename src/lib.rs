//! Rover position records with exact decimal coordinates
//!
//! A [`models::Rover`] holds latitude and longitude as fixed-point decimals
//! (11 digits, 8 decimal places) and a compass heading. Records are stored
//! in PostgreSQL through [`database::Database`], whose table layout is
//! evolved by the ordered migration log in [`schema`].

pub mod config;
pub mod database;
pub mod errors;
pub mod models;
pub mod schema;
pub mod terrain;
