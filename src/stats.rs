//! Descriptive statistics over the filtered table

use crate::data::{MergedTable, IMPACT_CO2_TOTAL, PORTION_FACTOR, WATER_FOOTPRINT_PER_KG};
use polars::prelude::ChunkAgg;

/// Displayed in place of a metric that has no underlying value
pub const NO_DATA: &str = "no data";

/// Mean impacts per portion over a (possibly filtered) table
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactSummary {
    /// Rows in the table, matched or not
    pub rows: usize,
    /// Rows with a non-null `impact_co2_total`
    pub rows_with_impact: usize,
    /// Mean of `impact_co2_total` in kg CO2e, nulls dropped
    pub mean_co2_total: Option<f64>,
    /// Mean of `water_footprint_per_kg` scaled to one portion, in litres
    pub mean_water_per_portion: Option<f64>,
}

impl ImpactSummary {
    pub fn from_table(table: &MergedTable) -> crate::Result<Self> {
        let frame = table.frame();
        let totals = frame.column(IMPACT_CO2_TOTAL)?.f64()?;
        let water = frame.column(WATER_FOOTPRINT_PER_KG)?.f64()?;

        Ok(Self {
            rows: table.height(),
            rows_with_impact: totals.len() - totals.null_count(),
            mean_co2_total: totals.mean(),
            mean_water_per_portion: water.mean().map(|water| water * PORTION_FACTOR),
        })
    }

    pub fn carbon_display(&self) -> String {
        format_carbon(self.mean_co2_total)
    }

    pub fn water_display(&self) -> String {
        format_water(self.mean_water_per_portion)
    }
}

pub fn format_carbon(mean: Option<f64>) -> String {
    match mean {
        Some(mean) => format!("{:.3} kg CO2e", mean),
        None => NO_DATA.to_string(),
    }
}

pub fn format_water(mean: Option<f64>) -> String {
    match mean {
        Some(mean) => format!("{:.1} Litres", mean),
        None => NO_DATA.to_string(),
    }
}

/// Legend text for the histogram's mean marker
pub fn mean_marker_label(mean: f64) -> String {
    format!("Mean: {:.2}", mean)
}
