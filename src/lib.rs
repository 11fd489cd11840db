//! ImpactForge: carbon and water footprint dashboard for food products
//!
//! Loads a product catalog and a lifecycle-impact reference table with Polars,
//! joins them, derives a per-portion carbon metric, summarises the selected
//! food category and groups every product into impact archetypes with
//! K-Means clustering.

pub mod app;
pub mod cli;
pub mod data;
pub mod error;
pub mod filter;
pub mod model;
pub mod report;
pub mod session;
pub mod stats;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{load_cached, load_merged, DataSources, MergedTable, PORTION_FACTOR};
pub use error::{ClusterSkip, LoadError};
pub use filter::CategoryFilter;
pub use model::{cluster_table, fit_kmeans, ClusterOutcome, ClusterParams, KMeansModel};
pub use session::{DashboardView, Session};
pub use stats::ImpactSummary;

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
