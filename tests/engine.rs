use approx::assert_abs_diff_eq;
use tabsight::engine::{
    classify_with_forest, classify_with_lda, classify_with_tree, extract_lda, extract_pca,
    weighted_sum, ForestConfig, LdaConfig, PcaConfig, TreeConfig, WeightedSumConfig,
};
use tabsight::model_selection::k_fold;
use tabsight::{
    DataTable, DecisionTree, FeatureSet, Init, LabelEncoding, Table, TabsightError, Trig,
    Validation,
};

/// Three well separated flower-like groups plus a free-text column.
fn flowers() -> DataTable {
    let groups = [("setosa", 1.4, 0.2), ("versicolor", 4.3, 1.3), ("virginica", 5.6, 2.1)];
    let mut rows = Vec::new();
    for i in 0..8 {
        for (name, length, width) in groups {
            let jitter = (i as f64 - 3.5) * 0.04;
            rows.push(vec![
                format!("{:.3}", length + jitter),
                format!("{:.3}", width - jitter / 2.0),
                format!("note {i}"),
                name.to_string(),
            ]);
        }
    }
    DataTable::new(
        vec![
            "petal_length".into(),
            "petal_width".into(),
            "comment".into(),
            "Label".into(),
        ],
        rows,
    )
    .unwrap()
}

fn numeric_column(table: &DataTable, name: &str) -> Vec<f64> {
    let c = table.column_index(name).unwrap();
    table.column(c).map(|v| v.parse().unwrap()).collect()
}

#[test]
fn feature_set_drops_text_columns() {
    let table = flowers();
    let data = FeatureSet::from_table(&table).unwrap();
    assert_eq!(data.names, vec!["petal_length", "petal_width"]);
    assert_eq!(data.class_column, Some(3));
    assert_eq!(data.n_samples(), 24);
}

#[test]
fn label_encoding_is_evenly_spaced() {
    let encoding = LabelEncoding::fit(&["A", "B", "C", "A"]);
    assert_abs_diff_eq!(encoding.encode("A").unwrap(), 0.0);
    assert_abs_diff_eq!(encoding.encode("B").unwrap(), 0.5);
    assert_abs_diff_eq!(encoding.encode("C").unwrap(), 1.0);
}

#[test]
fn tree_memorizes_training_rows() {
    let data = FeatureSet::from_table(&flowers()).unwrap();
    let mut tree = DecisionTree::new();
    tree.fit(&data.features, &data.labels).unwrap();
    assert_abs_diff_eq!(tree.score(&data.features, &data.labels).unwrap(), 1.0);
}

#[test]
fn tree_engine_matches_labels() {
    let mut table = flowers();
    let config = TreeConfig {
        validation: Validation::KFold { k: 3 },
        ..Default::default()
    };
    let summary = classify_with_tree(&mut table, &config).unwrap();
    assert_abs_diff_eq!(summary.accuracy, 1.0);

    let predicted = table.column_index(&summary.column_name).unwrap();
    for row in 0..table.n_rows() {
        assert_eq!(table.cell(row, predicted), table.cell(row, 3));
    }
}

#[test]
fn forest_is_reproducible_for_a_seed() {
    let config = ForestConfig {
        n_trees: 7,
        sample_ratio: 0.8,
        seed: 9,
        ..Default::default()
    };
    let mut first = flowers();
    let mut second = flowers();
    let a = classify_with_forest(&mut first, &config).unwrap();
    let b = classify_with_forest(&mut second, &config).unwrap();

    assert_eq!(a.accuracy, b.accuracy);
    assert!((0.0..=1.0).contains(&a.accuracy));
    let ca = first.column_index(&a.column_name).unwrap();
    let cb = second.column_index(&b.column_name).unwrap();
    assert!(first.column(ca).eq(second.column(cb)));
}

#[test]
fn lda_classifier_and_projection() {
    let mut table = flowers();
    let summary = classify_with_lda(&mut table, &LdaConfig::default()).unwrap();
    assert!(summary.accuracy > 0.9);

    let projection = extract_lda(&mut table, &LdaConfig::default()).unwrap();
    let name = &projection.column_names[0];
    assert!(name.starts_with("LDA1 "));
    assert!(name.contains("*petal_length"));

    let values = numeric_column(&table, name);
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    assert_abs_diff_eq!(min, 0.0);
    assert_abs_diff_eq!(max, 1.0);
}

/// Incomes in the tens of thousands, a rent column that barely moves and a
/// column that never changes.
fn incomes() -> DataTable {
    let mut rows = Vec::new();
    for i in 0..20 {
        let rent = format!("{}", 1200 + (i % 7) * 15);
        rows.push(vec![format!("{}", 50000 + i * 300), rent.clone(), "1".into(), "low".into()]);
        rows.push(vec![format!("{}", 70000 + i * 500), rent, "1".into(), "high".into()]);
    }
    DataTable::new(
        vec!["salary".into(), "rent".into(), "const".into(), "class".into()],
        rows,
    )
    .unwrap()
}

#[test]
fn lda_handles_constant_column_at_large_scale() {
    let mut table = incomes();
    let before = table.n_columns();

    let summary = classify_with_lda(&mut table, &LdaConfig::default()).unwrap();
    assert!(summary.accuracy > 0.9);
    assert_eq!(table.n_columns(), before + 1);

    let projection = extract_lda(&mut table, &LdaConfig::default()).unwrap();
    assert_eq!(table.n_columns(), before + 2);
    let values = numeric_column(&table, &projection.column_names[0]);
    assert!(values.iter().all(|v| v.is_finite()));
}

#[test]
fn constant_projection_does_not_divide_by_zero() {
    let mut table =
        DataTable::from_records(["a", "class"], [["2", "x"], ["2", "y"], ["2", "x"]]).unwrap();
    let summary = extract_pca(&mut table, &PcaConfig::default()).unwrap();
    let values = numeric_column(&table, &summary.column_names[0]);
    assert!(values.iter().all(|&v| v == 0.0));
}

#[test]
fn pca_without_normalization_keeps_scale() {
    let mut table = flowers();
    let config = PcaConfig {
        normalize: false,
        ..Default::default()
    };
    let summary = extract_pca(&mut table, &config).unwrap();
    let values = numeric_column(&table, "PCA1");
    let spread = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
        - values.iter().cloned().fold(f64::INFINITY, f64::min);
    assert!(spread > 1.0);
    assert!(summary.explained_variance_ratio[0] > 0.9);
}

#[test]
fn weighted_sum_with_trig_and_random_start() {
    let mut table = flowers();
    let config = WeightedSumConfig {
        init: Init::RandomRange { min: -1.0, max: 1.0 },
        clamp: Some((-2.0, 2.0)),
        trig: Trig::Atan,
        adaptive: true,
        max_iterations: 50,
        ..Default::default()
    };
    let summary = weighted_sum(&mut table, &config).unwrap();
    assert!(summary.column_name.starts_with("atan("));
    assert!(summary.fit.iterations <= 50);
    assert!(summary.fit.coefficients.iter().all(|c| (-2.0..=2.0).contains(c)));
    assert_eq!(numeric_column(&table, &summary.column_name).len(), 24);
}

#[test]
fn empty_table_is_refused() {
    let mut table = DataTable::new(vec!["a".into(), "class".into()], Vec::new()).unwrap();
    assert!(matches!(
        classify_with_tree(&mut table, &TreeConfig::default()),
        Err(TabsightError::EmptyDataset)
    ));
    assert!(matches!(
        extract_pca(&mut table, &PcaConfig::default()),
        Err(TabsightError::EmptyDataset)
    ));
}

#[test]
fn malformed_cell_surfaces_from_table_prediction() {
    let training = DataTable::from_records(
        ["x", "class"],
        [["0.1", "A"], ["0.2", "A"], ["0.8", "B"], ["0.9", "B"]],
    )
    .unwrap();
    let data = FeatureSet::from_table(&training).unwrap();
    let mut tree = DecisionTree::new();
    tree.fit(&data.features, &data.labels).unwrap();

    let scoring = DataTable::from_records(["x", "class"], [["0.15", "?"], ["bad", "?"]]).unwrap();
    match tree.predict_table(&scoring, &[0]) {
        Err(TabsightError::MalformedInstance { row, column, value }) => {
            assert_eq!((row, column), (1, 0));
            assert_eq!(value, "bad");
        }
        other => panic!("expected MalformedInstance, got {other:?}"),
    }
}

#[test]
fn kfold_last_fold_takes_remainder() {
    let sizes: Vec<usize> = k_fold(101, 5, 42)
        .unwrap()
        .iter()
        .map(|split| split.test.len())
        .collect();
    assert_eq!(sizes, vec![20, 20, 20, 20, 21]);
}
