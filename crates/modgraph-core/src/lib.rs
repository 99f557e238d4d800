//! Core types, configuration, and error handling for modgraph.
//!
//! This crate provides the shared foundation used by the other modgraph crates:
//! - [`ModgraphError`]: unified error type using `thiserror` and `miette`
//! - [`ModgraphConfig`]: configuration loaded from `.modgraph.toml`
//! - [`OutputFormat`]: how command results are printed

mod config;
mod error;
mod types;

pub use config::{
    HistoryConfig, MetricsConfig, ModgraphConfig, OutputConfig, RankingConfig, ScanConfig,
};
pub use error::ModgraphError;
pub use types::OutputFormat;

/// A convenience `Result` type for modgraph operations.
pub type Result<T> = std::result::Result<T, ModgraphError>;
