//! K-Means clustering of carbon/water profiles into impact archetypes
//!
//! Clustering always runs on the full merged table. Labels group rows but
//! carry no meaning of their own: with different input data the same
//! archetype can come out under a different integer.

use std::collections::HashSet;

use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::{Distance, L2Dist};
use ndarray::{s, Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::data::MergedTable;
use crate::error::ClusterSkip;

/// K-Means settings
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterParams {
    /// Number of archetypes
    pub n_clusters: usize,
    /// Seed of the centroid initialisation RNG
    pub seed: u64,
    /// Independent initialisations; the lowest inertia wins
    pub n_runs: usize,
    /// Maximum Lloyd iterations per run
    pub max_iters: u64,
    /// Convergence tolerance on centroid movement
    pub tolerance: f64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            n_clusters: 3,
            seed: 42,
            n_runs: 10,
            max_iters: 300,
            tolerance: 1e-4,
        }
    }
}

/// Z-score scaler fitted on the full dataset (population standard deviation)
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    /// Standard deviation per column, 1.0 where the column is constant
    pub scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(features: &Array2<f64>) -> Self {
        let n_features = features.ncols();
        if features.nrows() == 0 {
            return Self {
                mean: Array1::zeros(n_features),
                scale: Array1::ones(n_features),
            };
        }

        let mean = features
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));
        let scale = features
            .std_axis(Axis(0), 0.0)
            .mapv(|std| if std > 0.0 { std } else { 1.0 });

        Self { mean, scale }
    }

    pub fn transform(&self, features: &Array2<f64>) -> Array2<f64> {
        (features - &self.mean) / &self.scale
    }
}

/// Mean raw impacts of one cluster
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterProfile {
    pub cluster: usize,
    pub size: usize,
    pub mean_co2_per_kg: Option<f64>,
    pub mean_water_per_kg: Option<f64>,
}

/// Fitted K-Means result over the full table
#[derive(Debug, Clone)]
pub struct KMeansModel {
    /// Number of clusters
    pub n_clusters: usize,
    /// Cluster label per row of the full table
    pub labels: Array1<usize>,
    /// Cluster centroids in standardized space
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squares of the selected run
    pub inertia: f64,
    /// Scaler fitted on the raw features
    pub scaler: StandardScaler,
    /// Standardized features the model was fitted on
    pub features: Array2<f64>,
    /// Raw features with missing values zero-filled
    pub raw_features: Array2<f64>,
}

impl KMeansModel {
    /// Rows per cluster, indexed by label
    pub fn cluster_sizes(&self) -> Vec<usize> {
        self.labels
            .iter()
            .fold(vec![0; self.n_clusters], |mut sizes, &label| {
                if let Some(size) = sizes.get_mut(label) {
                    *size += 1;
                }
                sizes
            })
    }

    /// Mean raw CO2 and water per cluster, in label order
    pub fn profiles(&self) -> Vec<ClusterProfile> {
        let mut sums = vec![(0usize, 0.0, 0.0); self.n_clusters];
        for (row, &label) in self.raw_features.outer_iter().zip(self.labels.iter()) {
            if let Some(entry) = sums.get_mut(label) {
                entry.0 += 1;
                entry.1 += row[0];
                entry.2 += row[1];
            }
        }

        sums.into_iter()
            .enumerate()
            .map(|(cluster, (size, co2, water))| {
                let mean = |sum: f64| (size > 0).then(|| sum / size as f64);
                ClusterProfile {
                    cluster,
                    size,
                    mean_co2_per_kg: mean(co2),
                    mean_water_per_kg: mean(water),
                }
            })
            .collect()
    }

    /// Mean silhouette coefficient over the first `sample_size` rows.
    ///
    /// A point alone in its cluster scores 0.
    pub fn compute_silhouette_sample(&self, sample_size: usize) -> f64 {
        let n_samples = self.features.nrows().min(sample_size);
        if n_samples < 2 {
            return 0.0;
        }

        let sample = self.features.slice(s![..n_samples, ..]);
        let labels = self.labels.slice(s![..n_samples]);
        let mean = |(sum, count): (f64, usize)| (count > 0).then(|| sum / count as f64);

        let total: f64 = sample
            .outer_iter()
            .zip(labels.iter())
            .enumerate()
            .map(|(i, (point, &own))| {
                // (distance sum, count) towards each cluster, the point itself excluded
                let mut towards = vec![(0.0, 0usize); self.n_clusters];
                for (j, (other, &label)) in sample.outer_iter().zip(labels.iter()).enumerate() {
                    if let Some(acc) = towards.get_mut(label).filter(|_| i != j) {
                        acc.0 += L2Dist.distance(point, other);
                        acc.1 += 1;
                    }
                }

                let nearest_other = towards
                    .iter()
                    .enumerate()
                    .filter(|&(cluster, _)| cluster != own)
                    .filter_map(|(_, &acc)| mean(acc))
                    .reduce(f64::min);

                match (towards.get(own).copied().and_then(mean), nearest_other) {
                    (Some(a), Some(b)) if a.max(b) > 0.0 => (b - a) / a.max(b),
                    _ => 0.0,
                }
            })
            .sum();

        total / n_samples as f64
    }
}

/// Result of the clustering stage
#[derive(Debug, Clone)]
pub enum ClusterOutcome {
    Fitted(KMeansModel),
    /// Input too small for the requested number of clusters
    Skipped(ClusterSkip),
}

impl ClusterOutcome {
    pub fn model(&self) -> Option<&KMeansModel> {
        match self {
            ClusterOutcome::Fitted(model) => Some(model),
            ClusterOutcome::Skipped(_) => None,
        }
    }
}

/// CO2 and water per kilogram for every row, missing values as zero
pub fn feature_matrix(table: &MergedTable) -> crate::Result<Array2<f64>> {
    let co2 = table.co2_per_kg()?;
    let water = table.water_per_kg()?;

    let values: Vec<f64> = co2
        .iter()
        .zip(water.iter())
        .flat_map(|(co2, water)| [co2.unwrap_or(0.0), water.unwrap_or(0.0)])
        .collect();

    Ok(Array2::from_shape_vec((co2.len(), 2), values)?)
}

/// Cluster every row of the full table, or explain why that is impossible
pub fn cluster_table(table: &MergedTable, params: &ClusterParams) -> crate::Result<ClusterOutcome> {
    let raw_features = feature_matrix(table)?;

    let distinct = count_distinct_rows(&raw_features);
    if distinct < params.n_clusters {
        let skip = ClusterSkip::TooFewDistinctPoints {
            distinct,
            required: params.n_clusters,
        };
        warn!(%skip, "clustering skipped");
        return Ok(ClusterOutcome::Skipped(skip));
    }

    Ok(ClusterOutcome::Fitted(fit_kmeans(&raw_features, params)?))
}

/// Fit K-Means on raw features after z-score standardization
///
/// # Arguments
/// * `raw_features` - One row per product, columns CO2 and water per kg
/// * `params` - Cluster count, seed and restart settings
///
/// # Returns
/// * Fitted `KMeansModel` from the lowest-inertia run
pub fn fit_kmeans(raw_features: &Array2<f64>, params: &ClusterParams) -> crate::Result<KMeansModel> {
    if params.n_clusters == 0 {
        anyhow::bail!("Number of clusters must be at least 1");
    }

    if raw_features.nrows() < params.n_clusters {
        anyhow::bail!(
            "Number of data points ({}) must be at least equal to number of clusters ({})",
            raw_features.nrows(),
            params.n_clusters
        );
    }

    let scaler = StandardScaler::fit(raw_features);
    let features = scaler.transform(raw_features);
    debug!(mean = ?scaler.mean, scale = ?scaler.scale, "standardized features");

    let dataset = DatasetBase::from(features.clone());
    let rng = StdRng::seed_from_u64(params.seed);

    let model = KMeans::params_with(params.n_clusters, rng, L2Dist)
        .n_runs(params.n_runs)
        .max_n_iterations(params.max_iters)
        .tolerance(params.tolerance)
        .fit(&dataset)?;

    let labels: Array1<usize> = model.predict(&features);
    let centroids = model.centroids().clone();
    // linfa reports the per-sample mean; the dashboard shows the sum
    let inertia = model.inertia() * features.nrows() as f64;

    info!(
        clusters = params.n_clusters,
        rows = features.nrows(),
        inertia,
        "fitted k-means"
    );

    Ok(KMeansModel {
        n_clusters: params.n_clusters,
        labels,
        centroids,
        inertia,
        scaler,
        features,
        raw_features: raw_features.clone(),
    })
}

fn count_distinct_rows(features: &Array2<f64>) -> usize {
    features
        .outer_iter()
        // Adding 0.0 folds -0.0 onto 0.0
        .map(|row| row.iter().map(|value| (value + 0.0).to_bits()).collect::<Vec<_>>())
        .collect::<HashSet<_>>()
        .len()
}
