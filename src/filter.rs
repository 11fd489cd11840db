//! Category selection over the merged table

use std::fmt;
use std::str::FromStr;

use polars::prelude::*;

use crate::data::{MergedTable, CATEGORY};

/// Text that selects every category
pub const ALL_CATEGORIES: &str = "all";

/// The category chosen in the selector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    /// No filtering
    #[default]
    All,
    /// Rows whose category equals this value exactly
    Only(String),
}

impl CategoryFilter {
    /// Restrict `table` to the selected category.
    ///
    /// The source table is left untouched; a category with no rows yields an
    /// empty table with the same columns.
    pub fn apply(&self, table: &MergedTable) -> crate::Result<MergedTable> {
        match self {
            CategoryFilter::All => Ok(table.clone()),
            CategoryFilter::Only(category) => {
                let frame = table
                    .frame()
                    .clone()
                    .lazy()
                    .filter(col(CATEGORY).eq(lit(category.as_str())))
                    .collect()?;
                Ok(MergedTable::new(frame))
            }
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, CategoryFilter::All)
    }

    pub fn matches(&self, category: &str) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(selected) => selected == category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(ALL_CATEGORIES) {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Only(s.to_string()))
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str(ALL_CATEGORIES),
            CategoryFilter::Only(category) => f.write_str(category),
        }
    }
}
