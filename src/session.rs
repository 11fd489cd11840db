//! One dashboard session: shared cached data, session-local clustering and views

use std::cell::OnceCell;
use std::sync::Arc;

use tracing::debug;

use crate::data::{load_cached, DataSources, MergedTable};
use crate::error::LoadError;
use crate::filter::CategoryFilter;
use crate::model::{cluster_table, ClusterOutcome, ClusterParams};
use crate::stats::ImpactSummary;

/// Everything the presentation layer needs for one category selection
#[derive(Debug)]
pub struct DashboardView<'a> {
    pub filter: CategoryFilter,
    /// Selector options, excluding the "all" entry
    pub categories: Vec<String>,
    /// Rows of the selected category
    pub filtered: MergedTable,
    pub summary: ImpactSummary,
    /// Clustering of the full table, independent of `filter`
    pub clusters: &'a ClusterOutcome,
    pub full_table: &'a MergedTable,
}

/// A user session over the merged table.
///
/// The table is shared through the process-wide load cache. Cluster labels
/// are computed once per session; filtered views and statistics are
/// recomputed for every selection and never shared.
#[derive(Debug)]
pub struct Session {
    table: Arc<MergedTable>,
    params: ClusterParams,
    clusters: OnceCell<ClusterOutcome>,
}

impl Session {
    pub fn open(sources: &DataSources, params: ClusterParams) -> Result<Self, LoadError> {
        Ok(Self::with_table(load_cached(sources)?, params))
    }

    pub fn with_table(table: Arc<MergedTable>, params: ClusterParams) -> Self {
        Self {
            table,
            params,
            clusters: OnceCell::new(),
        }
    }

    pub fn table(&self) -> &MergedTable {
        &self.table
    }

    /// Cluster the full table on first use, then reuse the result
    pub fn clusters(&self) -> crate::Result<&ClusterOutcome> {
        if let Some(outcome) = self.clusters.get() {
            return Ok(outcome);
        }

        let outcome = cluster_table(&self.table, &self.params)?;
        Ok(self.clusters.get_or_init(|| outcome))
    }

    /// Build the view for one category selection
    pub fn view(&self, filter: &CategoryFilter) -> crate::Result<DashboardView<'_>> {
        let filtered = filter.apply(&self.table)?;
        let summary = ImpactSummary::from_table(&filtered)?;
        debug!(
            category = %filter,
            rows = filtered.height(),
            "built dashboard view"
        );

        Ok(DashboardView {
            filter: filter.clone(),
            categories: self.table.categories()?,
            filtered,
            summary,
            clusters: self.clusters()?,
            full_table: &self.table,
        })
    }
}
