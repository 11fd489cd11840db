//! Data loading and merging of the product catalog with the impact reference table using Polars

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::LoadError;

/// Portion size in kilograms applied to per-kilogram impacts
pub const PORTION_FACTOR: f64 = 0.1;

pub const PRODUCT_NAME: &str = "product_name";
pub const CATEGORY: &str = "category";
pub const INGREDIENTS_TEXT: &str = "ingredients_text";
pub const INGREDIENT_NAME: &str = "ingredient_name";
pub const CO2_EQ_PER_KG: &str = "co2_eq_per_kg";
pub const WATER_FOOTPRINT_PER_KG: &str = "water_footprint_per_kg";
pub const IMPACT_CO2_TOTAL: &str = "impact_co2_total";

pub const DEFAULT_PRODUCTS_PATH: &str = "openfoodfacts_simule.csv";
pub const DEFAULT_IMPACTS_PATH: &str = "agribalyse_simule.csv";

const PRODUCT_COLUMNS: [&str; 3] = [PRODUCT_NAME, CATEGORY, INGREDIENTS_TEXT];
const IMPACT_COLUMNS: [&str; 3] = [INGREDIENT_NAME, CO2_EQ_PER_KG, WATER_FOOTPRINT_PER_KG];

/// The two input files. Also the key of the process-wide load cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataSources {
    /// Product catalog CSV
    pub products: PathBuf,
    /// Lifecycle-impact reference CSV
    pub impacts: PathBuf,
}

impl DataSources {
    pub fn new(products: impl Into<PathBuf>, impacts: impl Into<PathBuf>) -> Self {
        Self {
            products: products.into(),
            impacts: impacts.into(),
        }
    }
}

impl Default for DataSources {
    fn default() -> Self {
        Self::new(DEFAULT_PRODUCTS_PATH, DEFAULT_IMPACTS_PATH)
    }
}

/// Product catalog left-joined with impact data, one row per product.
///
/// Impact columns are `Float64` and may be null for products whose
/// ingredient text has no exact match in the reference table.
#[derive(Debug, Clone)]
pub struct MergedTable {
    frame: DataFrame,
}

impl MergedTable {
    pub fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Distinct non-null categories in order of first appearance
    pub fn categories(&self) -> crate::Result<Vec<String>> {
        let mut seen = HashSet::new();
        Ok(self
            .category_values()?
            .into_iter()
            .flatten()
            .filter(|category| seen.insert(category.clone()))
            .collect())
    }

    pub fn product_names(&self) -> crate::Result<Vec<Option<String>>> {
        self.str_column(PRODUCT_NAME)
    }

    pub fn category_values(&self) -> crate::Result<Vec<Option<String>>> {
        self.str_column(CATEGORY)
    }

    pub fn co2_per_kg(&self) -> crate::Result<Vec<Option<f64>>> {
        self.f64_column(CO2_EQ_PER_KG)
    }

    pub fn water_per_kg(&self) -> crate::Result<Vec<Option<f64>>> {
        self.f64_column(WATER_FOOTPRINT_PER_KG)
    }

    /// Per-portion carbon impact (`co2_eq_per_kg * PORTION_FACTOR`)
    pub fn impact_totals(&self) -> crate::Result<Vec<Option<f64>>> {
        self.f64_column(IMPACT_CO2_TOTAL)
    }

    fn f64_column(&self, name: &str) -> crate::Result<Vec<Option<f64>>> {
        Ok(self.frame.column(name)?.f64()?.into_iter().collect())
    }

    fn str_column(&self, name: &str) -> crate::Result<Vec<Option<String>>> {
        Ok(self
            .frame
            .column(name)?
            .str()?
            .into_iter()
            .map(|value| value.map(str::to_owned))
            .collect())
    }
}

/// Load both CSV files and left-join the catalog onto the reference table
///
/// # Arguments
/// * `sources` - Paths of the product catalog and the impact reference table
///
/// # Returns
/// * `MergedTable` with `impact_co2_total` derived for every row
#[tracing::instrument(skip_all, fields(products = %sources.products.display(), impacts = %sources.impacts.display()))]
pub fn load_merged(sources: &DataSources) -> Result<MergedTable, LoadError> {
    let products = read_csv(&sources.products)?;
    require_columns(&products, &sources.products, &PRODUCT_COLUMNS)?;

    let impacts = read_csv(&sources.impacts)?;
    require_columns(&impacts, &sources.impacts, &IMPACT_COLUMNS)?;

    let impacts = impacts
        .lazy()
        .with_columns([
            col(INGREDIENT_NAME).cast(DataType::String),
            // A "NaN" cell is missing data, not a number
            col(CO2_EQ_PER_KG)
                .cast(DataType::Float64)
                .fill_nan(lit(NULL)),
            col(WATER_FOOTPRINT_PER_KG)
                .cast(DataType::Float64)
                .fill_nan(lit(NULL)),
        ])
        .collect()
        .map_err(LoadError::Merge)?;
    ensure_unique_ingredients(&impacts, &sources.impacts)?;

    debug!(
        products = products.height(),
        ingredients = impacts.height(),
        "parsed input tables"
    );

    // Exact, case-sensitive key match; the left side keeps its row order.
    let frame = products
        .lazy()
        .with_columns([
            col(PRODUCT_NAME).cast(DataType::String),
            col(CATEGORY).cast(DataType::String),
            col(INGREDIENTS_TEXT).cast(DataType::String),
        ])
        .left_join(impacts.lazy(), col(INGREDIENTS_TEXT), col(INGREDIENT_NAME))
        .with_column((col(CO2_EQ_PER_KG) * lit(PORTION_FACTOR)).alias(IMPACT_CO2_TOTAL))
        .collect()
        .map_err(LoadError::Merge)?;

    info!(rows = frame.height(), "merged catalog with impact data");
    Ok(MergedTable::new(frame))
}

static LOAD_CACHE: OnceLock<Mutex<HashMap<DataSources, Arc<MergedTable>>>> = OnceLock::new();

/// Load the merged table once per process for a given pair of files.
///
/// Failed loads are not cached.
pub fn load_cached(sources: &DataSources) -> Result<Arc<MergedTable>, LoadError> {
    let cache = LOAD_CACHE.get_or_init(Default::default);
    let mut entries = cache.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(table) = entries.get(sources) {
        debug!("merged table served from load cache");
        return Ok(Arc::clone(table));
    }

    let table = Arc::new(load_merged(sources)?);
    entries.insert(sources.clone(), Arc::clone(&table));
    Ok(table)
}

fn read_csv(path: &Path) -> Result<DataFrame, LoadError> {
    LazyCsvReader::new(path)
        .finish()
        .and_then(|frame| frame.collect())
        .map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn require_columns(
    frame: &DataFrame,
    path: &Path,
    columns: &[&'static str],
) -> Result<(), LoadError> {
    match columns.iter().find(|column| frame.column(column).is_err()) {
        Some(column) => Err(LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: *column,
        }),
        None => Ok(()),
    }
}

fn ensure_unique_ingredients(impacts: &DataFrame, path: &Path) -> Result<(), LoadError> {
    let names = impacts
        .column(INGREDIENT_NAME)
        .and_then(|series| series.str())
        .map_err(LoadError::Merge)?;

    let mut seen = HashSet::new();
    for name in names.into_iter().flatten() {
        if !seen.insert(name) {
            return Err(LoadError::DuplicateIngredient {
                path: path.to_path_buf(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}
