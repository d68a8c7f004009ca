//! # MMTL Common Library
//!
//! Shared code for the multimessenger timeline services:
//! - Record schemas (GW events, raw pair events, correlated results)
//! - CSV ingestion and field coercion
//! - Database connector and collection queries
//! - Session token signing
//! - Bootstrap configuration loading

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod models;
pub mod pagination;
pub mod session;
pub mod time;

pub use error::{Error, Result};
pub use models::{CorrelatedResult, RawAllEvent, RawGwEvent};
