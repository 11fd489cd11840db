//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;

use crate::data::{DataSources, DEFAULT_IMPACTS_PATH, DEFAULT_PRODUCTS_PATH};
use crate::filter::CategoryFilter;

/// Carbon and water footprint dashboard for food products
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the product catalog CSV
    #[arg(short, long, default_value = DEFAULT_PRODUCTS_PATH)]
    pub products: PathBuf,

    /// Path to the lifecycle-impact reference CSV
    #[arg(short, long, default_value = DEFAULT_IMPACTS_PATH)]
    pub impacts: PathBuf,

    /// Food category to analyse, or "all"
    #[arg(short, long, default_value = "all")]
    pub category: CategoryFilter,

    /// Directory for the chart PNG files
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Maximum rows shown in the data table (all rows when omitted)
    #[arg(long)]
    pub rows: Option<usize>,

    /// Prompt for categories repeatedly instead of rendering once
    #[arg(long)]
    pub interactive: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn sources(&self) -> DataSources {
        DataSources::new(&self.products, &self.impacts)
    }
}

/// What the user typed at the interactive prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Select(CategoryFilter),
    Quit,
    Unknown(String),
}

/// Interpret a prompt line against the selector options.
///
/// Accepts `0` or `all` for every category, a 1-based index into
/// `categories`, an exact category name, or `q`/`quit`.
pub fn parse_selection(input: &str, categories: &[String]) -> Selection {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") || input.eq_ignore_ascii_case("quit") {
        return Selection::Quit;
    }

    if let Ok(index) = input.parse::<usize>() {
        return match index {
            0 => Selection::Select(CategoryFilter::All),
            i if i <= categories.len() => {
                Selection::Select(CategoryFilter::Only(categories[i - 1].clone()))
            }
            _ => Selection::Unknown(input.to_string()),
        };
    }

    if let Some(category) = categories.iter().find(|c| c.as_str() == input) {
        return Selection::Select(CategoryFilter::Only(category.clone()));
    }

    match input.parse::<CategoryFilter>() {
        Ok(CategoryFilter::All) => Selection::Select(CategoryFilter::All),
        _ => Selection::Unknown(input.to_string()),
    }
}
