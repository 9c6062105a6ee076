//! # Pulse Store
//!
//! Read side of the feedback database. Rows are written by the intake service;
//! this crate only answers "everything created since a cutoff".

pub mod sqlite;

pub use sqlite::{SqliteFeedbackStore, SqliteSession};
