//! # Curriculum Table Manager Common Library
//!
//! Shared code for the curriculum manager including:
//! - Record models and queries for both database copies
//! - Typed PLO tags and K/S/E/C codes
//! - Aggregate recomputation (PLO totals, YLO pruning, CLO coverage)
//! - The editable/snapshot mirror with promote and restore jobs
//! - Bulk saves for the credit table, course lists, catalogue and CLOs
//! - Configuration loading

pub mod access;
pub mod aggregate;
pub mod bloom;
pub mod catalogue;
pub mod clo_editor;
pub mod codes;
pub mod config;
pub mod course_list;
pub mod credit_table;
pub mod db;
pub mod error;
pub mod mirror;
pub mod password;

pub use access::AccessMode;
pub use error::{Error, Result};
pub use mirror::{Mirror, StoreKind};
