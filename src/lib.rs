//! Railbird - poker tournament schedule ingestion and compliance tracking.
//!
//! Ingests tournament pages from a schedule site, stores the raw HTML with
//! version history, parses pages into structured tournament records, and
//! reconciles observed games against recurring-schedule templates.

pub mod blobstore;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod repository;
pub mod schedule;
