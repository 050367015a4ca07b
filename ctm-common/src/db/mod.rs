//! Database schema, models and queries
//!
//! Query functions take a `&mut SqliteConnection` so the same code runs on a
//! pooled connection or inside a transaction.

pub mod clos;
pub mod courses;
pub mod credit_rows;
pub mod curricula;
pub mod init;
pub mod ksec;
pub mod models;
pub mod ylo;

pub use init::init_database;
pub use models::*;
