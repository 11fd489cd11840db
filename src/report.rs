//! Text rendering of the dashboard: header, selector, metrics, archetypes and data table

use std::io::Write;

use crate::model::ClusterOutcome;
use crate::session::DashboardView;
use crate::stats::{mean_marker_label, NO_DATA};
use crate::viz::ChartFiles;

pub const TITLE: &str = "Environmental Footprint Analysis";
pub const SUBTITLE: &str = "Statistical workflow prototype for UMR ITAP - INRAE";
pub const BANNER: &str = "This dashboard compares the carbon impact of products and identifies \
archetypes through machine learning.";
pub const CALLOUT: &str = "Doctoral perspectives: this workflow will be extended with Bayesian \
inference methods for precise recipe estimation.";

const MISSING_CELL: &str = "n/a";

/// Rendering switches
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Cap on data-table rows; `None` prints all of them
    pub max_rows: Option<usize>,
}

/// Write the full dashboard for one view
pub fn render_dashboard<W: Write>(
    out: &mut W,
    view: &DashboardView<'_>,
    charts: &ChartFiles,
    options: &ReportOptions,
) -> crate::Result<()> {
    render_header(out)?;
    render_selector(out, view)?;
    render_distribution(out, view, charts)?;
    render_clusters(out, view.clusters, charts)?;
    render_callout(out)?;
    render_table(out, view, options)?;
    Ok(())
}

fn render_header<W: Write>(out: &mut W) -> crate::Result<()> {
    let width = TITLE.len().max(SUBTITLE.len()) + 4;
    writeln!(out, "╔{}╗", "═".repeat(width))?;
    writeln!(out, "║{:^width$}║", TITLE)?;
    writeln!(out, "║{:^width$}║", SUBTITLE)?;
    writeln!(out, "╚{}╝", "═".repeat(width))?;
    writeln!(out)?;
    writeln!(out, "ℹ  {}", BANNER)?;
    writeln!(out)?;
    Ok(())
}

fn render_selector<W: Write>(out: &mut W, view: &DashboardView<'_>) -> crate::Result<()> {
    writeln!(out, "=== Analysis Parameters ===")?;
    writeln!(out, "Filter by food category:")?;
    let marker = |selected: bool| if selected { '>' } else { ' ' };
    writeln!(out, "  {} all", marker(view.filter.is_all()))?;
    for category in &view.categories {
        writeln!(
            out,
            "  {} {}",
            marker(!view.filter.is_all() && view.filter.matches(category)),
            category
        )?;
    }
    writeln!(out)?;
    Ok(())
}

fn render_distribution<W: Write>(
    out: &mut W,
    view: &DashboardView<'_>,
    charts: &ChartFiles,
) -> crate::Result<()> {
    writeln!(out, "=== Distribution & Benchmarking ===")?;
    writeln!(
        out,
        "Products in selection: {} ({} with impact data)",
        view.summary.rows, view.summary.rows_with_impact
    )?;

    match (&charts.histogram, view.summary.mean_co2_total) {
        (Some(path), Some(mean)) => {
            writeln!(out, "Histogram: {} ({})", path.display(), mean_marker_label(mean))?
        }
        (None, Some(mean)) => writeln!(out, "Histogram: not drawn ({})", mean_marker_label(mean))?,
        (_, None) => writeln!(out, "Histogram: {}", NO_DATA)?,
    }

    writeln!(out, "Mean carbon impact:   {}", view.summary.carbon_display())?;
    writeln!(out, "Mean water footprint: {}", view.summary.water_display())?;
    writeln!(out)?;
    Ok(())
}

fn render_clusters<W: Write>(
    out: &mut W,
    clusters: &ClusterOutcome,
    charts: &ChartFiles,
) -> crate::Result<()> {
    writeln!(out, "=== Clustering (Archetypes) ===")?;

    let model = match clusters {
        ClusterOutcome::Fitted(model) => model,
        ClusterOutcome::Skipped(reason) => {
            writeln!(out, "Clustering skipped: {}", reason)?;
            writeln!(out)?;
            return Ok(());
        }
    };

    match &charts.scatter {
        Some(path) => writeln!(out, "Scatter plot: {}", path.display())?,
        None => writeln!(out, "Scatter plot: not drawn")?,
    }

    let total = model.labels.len().max(1) as f64;
    writeln!(
        out,
        "  {:>7} | {:>10} | {:>8} | {:>9}",
        "Cluster", "Products", "CO2e/kg", "Water/kg"
    )?;
    writeln!(out, "  {:-<7}-|-{:-<10}-|-{:-<8}-|-{:-<9}", "", "", "", "")?;
    for profile in model.profiles() {
        let share = profile.size as f64 / total * 100.0;
        writeln!(
            out,
            "  {:>7} | {:>10} | {:>8} | {:>9}",
            profile.cluster,
            format!("{} ({:.0}%)", profile.size, share),
            format_cell(profile.mean_co2_per_kg, 2),
            format_cell(profile.mean_water_per_kg, 1),
        )?;
    }
    writeln!(
        out,
        "Silhouette score (sample): {:.3}",
        model.compute_silhouette_sample(100)
    )?;
    writeln!(out, "Within-cluster sum of squares: {:.2}", model.inertia)?;
    writeln!(out)?;
    Ok(())
}

fn render_callout<W: Write>(out: &mut W) -> crate::Result<()> {
    writeln!(out, "┃ {}", CALLOUT)?;
    writeln!(out)?;
    Ok(())
}

fn render_table<W: Write>(
    out: &mut W,
    view: &DashboardView<'_>,
    options: &ReportOptions,
) -> crate::Result<()> {
    writeln!(out, "=== Detailed Data View ===")?;
    if view.filtered.is_empty() {
        writeln!(out, "{}", NO_DATA)?;
        return Ok(());
    }

    let names = view.filtered.product_names()?;
    let categories = view.filtered.category_values()?;
    let impacts = view.filtered.impact_totals()?;

    let rows: Vec<[String; 3]> = names
        .into_iter()
        .zip(categories)
        .zip(impacts)
        .map(|((name, category), impact)| {
            [
                name.unwrap_or_else(|| MISSING_CELL.to_string()),
                category.unwrap_or_else(|| MISSING_CELL.to_string()),
                format_cell(impact, 3),
            ]
        })
        .collect();

    let headers = ["product_name", "category", "impact_co2_total"];
    let widths: Vec<usize> = (0..3)
        .map(|i| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(headers[i].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    writeln!(
        out,
        "{:<w0$} | {:<w1$} | {:>w2$}",
        headers[0],
        headers[1],
        headers[2],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2]
    )?;
    writeln!(
        out,
        "{}-|-{}-|-{}",
        "-".repeat(widths[0]),
        "-".repeat(widths[1]),
        "-".repeat(widths[2])
    )?;

    let shown = options.max_rows.unwrap_or(rows.len()).min(rows.len());
    for row in &rows[..shown] {
        writeln!(
            out,
            "{:<w0$} | {:<w1$} | {:>w2$}",
            row[0],
            row[1],
            row[2],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2]
        )?;
    }
    if shown < rows.len() {
        writeln!(out, "... {} more rows", rows.len() - shown)?;
    }
    Ok(())
}

fn format_cell(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(value) => format!("{:.*}", precision, value),
        None => MISSING_CELL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MergedTable;
    use crate::filter::CategoryFilter;
    use crate::model::ClusterParams;
    use crate::session::Session;
    use polars::prelude::*;
    use std::sync::Arc;

    fn create_test_session(rows: usize) -> Session {
        let co2 = [Some(2.0), Some(60.0), Some(0.5), None, Some(27.0), Some(3.2)];
        let water = [Some(50.0), Some(1500.0), Some(30.0), None, Some(900.0), Some(4000.0)];
        let totals: Vec<Option<f64>> = co2.iter().map(|c| c.map(|c| c * 0.1)).collect();
        let frame = df!(
            "product_name" => &["Apple", "Steak", "Pear", "Mystery", "Cheese", "Rice"][..rows],
            "category" => &["Fruit", "Meat", "Fruit", "Snack", "Dairy", "Cereal"][..rows],
            "co2_eq_per_kg" => &co2[..rows],
            "water_footprint_per_kg" => &water[..rows],
            "impact_co2_total" => &totals[..rows],
        )
        .unwrap();
        Session::with_table(Arc::new(MergedTable::new(frame)), ClusterParams::default())
    }

    fn render(session: &Session, filter: CategoryFilter, options: ReportOptions) -> String {
        let view = session.view(&filter).unwrap();
        let mut out = Vec::new();
        render_dashboard(&mut out, &view, &ChartFiles::default(), &options).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_render_full_dashboard_sections_in_order() {
        let session = create_test_session(6);
        let text = render(&session, CategoryFilter::All, ReportOptions::default());

        let order = [
            TITLE,
            BANNER,
            "=== Analysis Parameters ===",
            "=== Distribution & Benchmarking ===",
            "=== Clustering (Archetypes) ===",
            CALLOUT,
            "=== Detailed Data View ===",
        ];
        let positions: Vec<usize> = order.iter().map(|s| text.find(s).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        assert!(text.contains("  > all"));
        assert!(text.contains("Silhouette score"));
        assert!(text.contains("Mystery"));
        assert!(text.contains("n/a"));
    }

    #[test]
    fn test_render_marks_selected_category_and_metrics() {
        let session = create_test_session(6);
        let text = render(
            &session,
            CategoryFilter::Only("Fruit".to_string()),
            ReportOptions::default(),
        );

        assert!(text.contains("  > Fruit"));
        assert!(text.contains("    all"));
        assert!(text.contains("Mean carbon impact:   0.125 kg CO2e"));
        assert!(text.contains("Mean water footprint: 4.0 Litres"));
        assert!(!text.contains("Steak"));
    }

    #[test]
    fn test_render_empty_selection_shows_no_data() {
        let session = create_test_session(6);
        let text = render(
            &session,
            CategoryFilter::Only("Seafood".to_string()),
            ReportOptions::default(),
        );

        assert!(text.contains("Histogram: no data"));
        assert!(text.contains("Mean carbon impact:   no data"));
        assert!(text.ends_with("=== Detailed Data View ===\nno data\n"));
    }

    #[test]
    fn test_render_skipped_clustering() {
        let session = create_test_session(2);
        let text = render(&session, CategoryFilter::All, ReportOptions::default());

        assert!(text.contains("Clustering skipped: only 2 distinct feature vectors"));
        assert!(!text.contains("Silhouette"));
    }

    #[test]
    fn test_archetype_table_columns_line_up() {
        let session = create_test_session(6);
        let text = render(&session, CategoryFilter::All, ReportOptions::default());

        let start = text.find("  Cluster |").unwrap();
        let table: Vec<&str> = text[start..].lines().take(5).collect();
        let separators = |line: &str| -> Vec<usize> {
            line.char_indices()
                .filter(|&(_, c)| c == '|')
                .map(|(i, _)| i)
                .collect()
        };

        let header = separators(table[0]);
        assert_eq!(header.len(), 3);
        for line in &table[1..] {
            assert_eq!(separators(line), header, "misaligned row: {line:?}");
        }
        assert!(table[2..].iter().any(|line| line.contains("%)")));
    }

    #[test]
    fn test_render_truncates_table() {
        let session = create_test_session(6);
        let text = render(
            &session,
            CategoryFilter::All,
            ReportOptions { max_rows: Some(2) },
        );

        assert!(text.contains("... 4 more rows"));
        assert!(!text.contains("Rice"));
    }
}
