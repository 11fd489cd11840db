//! Chart rendering with Plotters: impact histogram and cluster scatter

use std::ops::Range;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use tracing::{debug, info, warn};

use crate::data::{CO2_EQ_PER_KG, WATER_FOOTPRINT_PER_KG};
use crate::model::KMeansModel;
use crate::session::DashboardView;
use crate::stats::mean_marker_label;

/// Brand colour of the histogram bars and density curve
const IMPACT_GREEN: RGBColor = RGBColor(0x00, 0xa3, 0x88);

/// Viridis samples; clusters take evenly spaced entries
const VIRIDIS: [RGBColor; 5] = [
    RGBColor(68, 1, 84),
    RGBColor(59, 82, 139),
    RGBColor(33, 145, 140),
    RGBColor(94, 201, 98),
    RGBColor(253, 231, 37),
];

pub const HISTOGRAM_FILE: &str = "impact_histogram.png";
pub const SCATTER_FILE: &str = "cluster_scatter.png";

const KDE_GRID_POINTS: usize = 200;

/// PNG files written for one dashboard view; `None` where the widget had no data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartFiles {
    pub histogram: Option<PathBuf>,
    pub scatter: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// One product in the cluster scatter, raw (not standardized) values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterPoint {
    pub co2_per_kg: f64,
    pub water_per_kg: f64,
    pub cluster: usize,
}

/// Sturges' rule, at least one bin
pub fn auto_bin_count(n_values: usize) -> usize {
    if n_values < 2 {
        return 1;
    }
    (n_values as f64).log2().ceil() as usize + 1
}

/// Equal-width bins spanning the values; the last bin is closed on the right
pub fn histogram_bins(values: &[f64], n_bins: usize) -> Vec<HistogramBin> {
    let Some((min, max)) = min_max(values) else {
        return Vec::new();
    };

    if min == max || n_bins == 0 {
        return vec![HistogramBin {
            start: min - 0.5,
            end: max + 0.5,
            count: values.len(),
        }];
    }

    let width = (max - min) / n_bins as f64;
    let mut bins: Vec<HistogramBin> = (0..n_bins)
        .map(|i| HistogramBin {
            start: min + i as f64 * width,
            end: min + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();

    for &value in values {
        let index = (((value - min) / width).floor() as usize).min(n_bins - 1);
        bins[index].count += 1;
    }

    bins
}

/// Gaussian kernel density estimate with Scott's bandwidth.
///
/// Returns `(x, density)` pairs on a grid extending three bandwidths past the
/// data; empty when fewer than two distinct values exist.
pub fn gaussian_kde(values: &[f64], grid_points: usize) -> Vec<(f64, f64)> {
    let n = values.len();
    if n < 2 || grid_points < 2 {
        return Vec::new();
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std = variance.sqrt();
    if std <= 0.0 {
        return Vec::new();
    }

    let bandwidth = std * (n as f64).powf(-0.2);
    let Some((min, max)) = min_max(values) else {
        return Vec::new();
    };
    let start = min - 3.0 * bandwidth;
    let step = (max + 3.0 * bandwidth - start) / (grid_points - 1) as f64;
    let norm = 1.0 / (n as f64 * bandwidth * (2.0 * std::f64::consts::PI).sqrt());

    (0..grid_points)
        .map(|i| {
            let x = start + i as f64 * step;
            let density = values
                .iter()
                .map(|v| (-0.5 * ((x - v) / bandwidth).powi(2)).exp())
                .sum::<f64>()
                * norm;
            (x, density)
        })
        .collect()
}

/// Plot range covering the values with 5% padding
pub fn axis_range(values: &[f64]) -> Range<f64> {
    match min_max(values) {
        None => 0.0..1.0,
        Some((min, max)) if min == max => (min - 1.0)..(max + 1.0),
        Some((min, max)) => {
            let pad = (max - min) * 0.05;
            (min - pad)..(max + pad)
        }
    }
}

/// Colour of a cluster label out of `n_clusters`
pub fn cluster_color(cluster: usize, n_clusters: usize) -> RGBColor {
    if n_clusters <= 1 {
        return VIRIDIS[0];
    }
    let index = cluster.min(n_clusters - 1) * (VIRIDIS.len() - 1) / (n_clusters - 1);
    VIRIDIS[index]
}

/// Products with both raw features present, paired with their label.
///
/// Zero-filled rows still carry a label but are not drawn.
pub fn scatter_points(
    co2: &[Option<f64>],
    water: &[Option<f64>],
    model: &KMeansModel,
) -> Vec<ScatterPoint> {
    co2.iter()
        .zip(water.iter())
        .zip(model.labels.iter())
        .filter_map(|((co2, water), &cluster)| {
            Some(ScatterPoint {
                co2_per_kg: (*co2)?,
                water_per_kg: (*water)?,
                cluster,
            })
        })
        .collect()
}

/// Histogram of per-portion carbon impact with a density curve and mean marker
pub fn draw_impact_histogram(values: &[f64], mean: f64, output_path: &Path) -> crate::Result<()> {
    let bins = histogram_bins(values, auto_bin_count(values.len()));
    let bin_width = bins.first().map_or(1.0, |bin| bin.end - bin.start);
    let density_scale = values.len() as f64 * bin_width;
    let kde: Vec<(f64, f64)> = gaussian_kde(values, KDE_GRID_POINTS)
        .into_iter()
        .map(|(x, density)| (x, density * density_scale))
        .collect();

    let max_count = bins.iter().map(|bin| bin.count).max().unwrap_or(1) as f64;
    let max_kde = kde.iter().map(|&(_, y)| y).fold(0.0, f64::max);
    let y_max = max_count.max(max_kde) * 1.1;

    let mut x_extent: Vec<f64> = bins.iter().flat_map(|bin| [bin.start, bin.end]).collect();
    x_extent.extend(kde.first().map(|&(x, _)| x));
    x_extent.extend(kde.last().map(|&(x, _)| x));
    x_extent.push(mean);

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Distribution of impacts (cleaned data)", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(axis_range(&x_extent), 0f64..y_max.max(1.0))?;

    chart
        .configure_mesh()
        .x_desc("impact_co2_total (kg CO2e per portion)")
        .y_desc("Count")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart
        .draw_series(bins.iter().map(|bin| {
            Rectangle::new(
                [(bin.start, 0.0), (bin.end, bin.count as f64)],
                IMPACT_GREEN.mix(0.6).filled(),
            )
        }))?
        .label("Products")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], IMPACT_GREEN.filled()));

    if !kde.is_empty() {
        chart.draw_series(LineSeries::new(kde, IMPACT_GREEN.stroke_width(2)))?;
    }

    chart
        .draw_series(LineSeries::new(
            vec![(mean, 0.0), (mean, y_max)],
            RED.stroke_width(2),
        ))?
        .label(mean_marker_label(mean))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    debug!(bins = bins.len(), path = %output_path.display(), "histogram drawn");

    Ok(())
}

/// Scatter of raw CO2 vs water per kilogram, coloured by cluster
pub fn draw_cluster_scatter(
    points: &[ScatterPoint],
    n_clusters: usize,
    output_path: &Path,
) -> crate::Result<()> {
    let co2: Vec<f64> = points.iter().map(|p| p.co2_per_kg).collect();
    let water: Vec<f64> = points.iter().map(|p| p.water_per_kg).collect();

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Identification of impact profiles", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(axis_range(&co2), axis_range(&water))?;

    chart
        .configure_mesh()
        .x_desc(CO2_EQ_PER_KG)
        .y_desc(WATER_FOOTPRINT_PER_KG)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for cluster in 0..n_clusters {
        let color = cluster_color(cluster, n_clusters);
        chart
            .draw_series(
                points
                    .iter()
                    .filter(|p| p.cluster == cluster)
                    .map(|p| Circle::new((p.co2_per_kg, p.water_per_kg), 7, color.filled())),
            )?
            .label(format!("Cluster {}", cluster))
            .legend(move |(x, y)| Circle::new((x + 5, y), 5, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    debug!(points = points.len(), path = %output_path.display(), "cluster scatter drawn");

    Ok(())
}

/// Write both charts for a dashboard view into `output_dir`.
///
/// A chart that fails to draw is logged and left out of the result; the
/// rest of the dashboard still renders.
pub fn render_charts(view: &DashboardView<'_>, output_dir: &Path) -> crate::Result<ChartFiles> {
    let mut files = ChartFiles::default();

    let impacts: Vec<f64> = view.filtered.impact_totals()?.into_iter().flatten().collect();
    if let Some(mean) = view.summary.mean_co2_total {
        let path = output_dir.join(HISTOGRAM_FILE);
        match draw_impact_histogram(&impacts, mean, &path) {
            Ok(()) => files.histogram = Some(path),
            Err(err) => warn!(path = %path.display(), error = %err, "histogram not drawn"),
        }
    }

    if let Some(model) = view.clusters.model() {
        let points = scatter_points(
            &view.full_table.co2_per_kg()?,
            &view.full_table.water_per_kg()?,
            model,
        );
        if !points.is_empty() {
            let path = output_dir.join(SCATTER_FILE);
            match draw_cluster_scatter(&points, model.n_clusters, &path) {
                Ok(()) => files.scatter = Some(path),
                Err(err) => warn!(path = %path.display(), error = %err, "cluster scatter not drawn"),
            }
        }
    }

    info!(
        histogram = files.histogram.is_some(),
        scatter = files.scatter.is_some(),
        "charts rendered"
    );
    Ok(files)
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((min, max)) => Some((min.min(v), max.max(v))),
        })
}
