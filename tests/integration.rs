//! Integration tests for ImpactForge

use std::fs;
use std::sync::Arc;

use impactforge::{
    cluster_table, load_merged, CategoryFilter, ClusterParams, DataSources, ImpactSummary,
    LoadError, MergedTable, Session,
};
use tempfile::{tempdir, TempDir};

/// Write a catalog and reference table into a temporary directory
fn create_test_sources(products: &[&str], impacts: &[&str]) -> (TempDir, DataSources) {
    let dir = tempdir().unwrap();
    let products_path = dir.path().join("openfoodfacts_simule.csv");
    let impacts_path = dir.path().join("agribalyse_simule.csv");
    fs::write(&products_path, products.join("\n")).unwrap();
    fs::write(&impacts_path, impacts.join("\n")).unwrap();
    (dir, DataSources::new(products_path, impacts_path))
}

/// Ten products, two of them in "Meat", one without impact data
fn create_ten_product_sources() -> (TempDir, DataSources) {
    create_test_sources(
        &[
            "product_name,category,ingredients_text",
            "Apple,Fruit,apple",
            "Pear,Fruit,pear",
            "Banana,Fruit,banana",
            "Steak,Meat,beef",
            "Lamb chop,Meat,lamb",
            "Brie,Dairy,milk",
            "Rice bowl,Cereal,rice",
            "Lentil soup,Legume,lentils",
            "Chocolate bar,Snack,cocoa",
            "Mystery snack,Snack,unobtainium",
        ],
        &[
            "ingredient_name,co2_eq_per_kg,water_footprint_per_kg",
            "apple,0.4,80.0",
            "pear,0.5,90.0",
            "banana,0.9,300.0",
            "beef,60.0,1500.0",
            "lamb,24.0,1200.0",
            "milk,3.2,600.0",
            "rice,4.0,2500.0",
            "lentils,0.9,1200.0",
            "cocoa,19.0,17000.0",
        ],
    )
}

#[test]
fn test_apple_scenario() {
    let (_dir, sources) = create_test_sources(
        &["product_name,category,ingredients_text", "Apple,Fruit,apple"],
        &[
            "ingredient_name,co2_eq_per_kg,water_footprint_per_kg",
            "apple,2.0,50.0",
        ],
    );

    let table = load_merged(&sources).unwrap();
    assert!((table.impact_totals().unwrap()[0].unwrap() - 0.2).abs() < 1e-12);

    let all = CategoryFilter::All.apply(&table).unwrap();
    let summary = ImpactSummary::from_table(&all).unwrap();
    assert_eq!(summary.carbon_display(), "0.200 kg CO2e");
    assert_eq!(summary.water_display(), "5.0 Litres");
}

#[test]
fn test_unmatched_ingredient_excluded_from_means_but_clustered_as_zero() {
    let (_dir, sources) = create_ten_product_sources();
    let table = load_merged(&sources).unwrap();

    assert_eq!(table.height(), 10);
    assert_eq!(table.co2_per_kg().unwrap()[9], None);
    assert_eq!(table.impact_totals().unwrap()[9], None);

    let snacks = CategoryFilter::Only("Snack".to_string()).apply(&table).unwrap();
    let summary = ImpactSummary::from_table(&snacks).unwrap();
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.rows_with_impact, 1);
    assert!((summary.mean_co2_total.unwrap() - 1.9).abs() < 1e-12);

    let outcome = cluster_table(&table, &ClusterParams::default()).unwrap();
    let model = outcome.model().unwrap();
    assert_eq!(model.raw_features.row(9).to_vec(), vec![0.0, 0.0]);
    assert_eq!(model.labels.len(), 10);
}

#[test]
fn test_two_of_ten_selected() {
    let (_dir, sources) = create_ten_product_sources();
    let session = Session::open(&sources, ClusterParams::default()).unwrap();

    let view = session
        .view(&CategoryFilter::Only("Meat".to_string()))
        .unwrap();

    assert_eq!(view.summary.rows, 2);
    assert!((view.summary.mean_co2_total.unwrap() - 4.2).abs() < 1e-9);
    assert!((view.summary.mean_water_per_portion.unwrap() - 135.0).abs() < 1e-9);

    let model = view.clusters.model().unwrap();
    assert_eq!(model.labels.len(), 10);
    assert!(model.labels.iter().all(|&label| label < 3));
    assert_eq!(model.cluster_sizes().iter().sum::<usize>(), 10);
}

#[test]
fn test_all_filter_is_identity() {
    let (_dir, sources) = create_ten_product_sources();
    let table = load_merged(&sources).unwrap();

    let all = CategoryFilter::All.apply(&table).unwrap();
    assert!(all.frame().equals_missing(table.frame()));

    let none = CategoryFilter::Only("Seafood".to_string()).apply(&table).unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_clustering_is_reproducible() {
    let (_dir, sources) = create_ten_product_sources();
    let table = Arc::new(load_merged(&sources).unwrap());

    let first = Session::with_table(Arc::clone(&table), ClusterParams::default());
    let second = Session::with_table(table, ClusterParams::default());

    assert_eq!(
        first.clusters().unwrap().model().unwrap().labels,
        second.clusters().unwrap().model().unwrap().labels
    );
}

#[test]
fn test_load_failure_halts_session() {
    let dir = tempdir().unwrap();
    let sources = DataSources::new(
        dir.path().join("openfoodfacts_simule.csv"),
        dir.path().join("agribalyse_simule.csv"),
    );

    let err = Session::open(&sources, ClusterParams::default()).unwrap_err();
    assert!(matches!(err, LoadError::Read { .. }));
}

#[test]
fn test_tiny_catalog_degrades_clustering() {
    let (_dir, sources) = create_test_sources(
        &[
            "product_name,category,ingredients_text",
            "Apple,Fruit,apple",
            "Apple juice,Drink,apple",
        ],
        &[
            "ingredient_name,co2_eq_per_kg,water_footprint_per_kg",
            "apple,2.0,50.0",
        ],
    );
    let table: MergedTable = load_merged(&sources).unwrap();

    let outcome = cluster_table(&table, &ClusterParams::default()).unwrap();
    assert!(outcome.model().is_none());
}

#[test]
fn test_nan_reference_cells_are_treated_as_missing() {
    let (_dir, sources) = create_test_sources(
        &[
            "product_name,category,ingredients_text",
            "Apple,Fruit,apple",
            "Steak,Meat,beef",
            "Rice bowl,Cereal,rice",
            "Broken bar,Snack,d",
            "Brie,Dairy,milk",
        ],
        &[
            "ingredient_name,co2_eq_per_kg,water_footprint_per_kg",
            "apple,2.0,50.0",
            "beef,60.0,1500.0",
            "rice,4.0,2500.0",
            "d,NaN,50.0",
            "milk,3.2,600.0",
        ],
    );
    let table = Arc::new(load_merged(&sources).unwrap());
    assert_eq!(table.impact_totals().unwrap()[3], None);

    let outcome = cluster_table(&table, &ClusterParams::default()).unwrap();
    let model = outcome.model().unwrap();
    assert_eq!(model.raw_features.row(3).to_vec(), vec![0.0, 50.0]);
    assert!(model.inertia.is_finite());

    let session = Session::with_table(table, ClusterParams::default());
    let snacks = session
        .view(&CategoryFilter::Only("Snack".to_string()))
        .unwrap();
    assert_eq!(snacks.summary.rows_with_impact, 0);
    assert_eq!(snacks.summary.carbon_display(), "no data");
    assert_eq!(snacks.summary.water_display(), "5.0 Litres");

    let all = session.view(&CategoryFilter::All).unwrap();
    assert_eq!(all.summary.rows_with_impact, 4);
    assert!((all.summary.mean_co2_total.unwrap() - 1.73).abs() < 1e-9);
}
