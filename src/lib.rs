//! `pangan-ingest` library crate.
//!
//! The binary (`pangan`) is a thin wrapper around this library so that:
//!
//! - the whole ingestion flow is testable without network or processes
//! - the portal client and the store sit behind traits that tests replace

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod io;
pub mod report;
pub mod store;
