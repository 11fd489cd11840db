//! Error types for loading the datasets and for degraded clustering

use std::path::PathBuf;

use polars::prelude::PolarsError;

/// Failure to produce the merged table.
///
/// Any of these halts the pipeline before a data view is rendered.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// File missing or content the CSV reader rejects
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    /// A required column is absent from the header
    #[error("{} has no column named '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    /// The reference table lists an ingredient more than once
    #[error("{} lists ingredient '{name}' more than once", path.display())]
    DuplicateIngredient { path: PathBuf, name: String },

    /// Join or derived-column computation failed
    #[error("failed to merge datasets: {0}")]
    Merge(#[source] PolarsError),
}

/// Why the clustering stage produced no labels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClusterSkip {
    #[error("only {distinct} distinct feature vectors, need at least {required}")]
    TooFewDistinctPoints { distinct: usize, required: usize },
}
