use tabsight::engine::{
    classify_with_forest, classify_with_knn, classify_with_lda, classify_with_tree, weighted_sum,
    ClassifierSummary, ForestConfig, KnnConfig, LdaConfig, TreeConfig, WeightedSumConfig,
};
use tabsight::{DataTable, Distance, FeatureSet, Init, RandomForest, Table, Trig, Validation};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("=== Classification on a string table ===\n");

    let mut table = DataTable::from_records(
        ["sepal_length", "sepal_width", "petal_length", "petal_width", "class"],
        [
            ["5.1", "3.5", "1.4", "0.2", "setosa"],
            ["4.9", "3.0", "1.4", "0.2", "setosa"],
            ["4.7", "3.2", "1.3", "0.2", "setosa"],
            ["5.0", "3.6", "1.4", "0.2", "setosa"],
            ["5.4", "3.9", "1.7", "0.4", "setosa"],
            ["7.0", "3.2", "4.7", "1.4", "versicolor"],
            ["6.4", "3.2", "4.5", "1.5", "versicolor"],
            ["6.9", "3.1", "4.9", "1.5", "versicolor"],
            ["5.5", "2.3", "4.0", "1.3", "versicolor"],
            ["6.5", "2.8", "4.6", "1.5", "versicolor"],
            ["6.3", "3.3", "6.0", "2.5", "virginica"],
            ["5.8", "2.7", "5.1", "1.9", "virginica"],
            ["7.1", "3.0", "5.9", "2.1", "virginica"],
            ["6.3", "2.9", "5.6", "1.8", "virginica"],
            ["6.5", "3.0", "5.8", "2.2", "virginica"],
        ],
    )?;
    println!("{} rows, {} columns\n", table.n_rows(), table.n_columns());

    let tree = classify_with_tree(
        &mut table,
        &TreeConfig {
            validation: Validation::KFold { k: 5 },
            ..Default::default()
        },
    )?;
    report(&tree);

    let forest = classify_with_forest(
        &mut table,
        &ForestConfig {
            n_trees: 25,
            sample_ratio: 0.8,
            ..Default::default()
        },
    )?;
    report(&forest);

    let knn = classify_with_knn(
        &mut table,
        &KnnConfig {
            k: 3,
            metric: Distance::Manhattan,
            ..Default::default()
        },
    )?;
    report(&knn);

    let lda = classify_with_lda(&mut table, &LdaConfig::default())?;
    report(&lda);

    let sum = weighted_sum(
        &mut table,
        &WeightedSumConfig {
            columns: Some(vec![2, 3]),
            init: Init::RandomRange { min: 0.0, max: 1.0 },
            trig: Trig::Identity,
            adaptive: true,
            ..Default::default()
        },
    )?;
    println!(
        "{:<40} separability {:.3} after {} iterations",
        sum.column_name, sum.fit.objective, sum.fit.iterations
    );

    println!("\n=== One forest tree ===");
    let data = FeatureSet::from_table(&table)?;
    let mut forest = RandomForest::new(3, 42).feature_names(data.names.clone());
    forest.fit(&data.features, &data.labels)?;
    if let Some(first) = forest.trees().first() {
        print!("{first}");
    }

    Ok(())
}

fn report(summary: &ClassifierSummary) {
    println!(
        "{:<40} accuracy {:>6.1}%",
        summary.column_name,
        summary.accuracy_percent()
    );
    if let Some(cv) = &summary.validation {
        for fold in &cv.folds {
            println!(
                "    fold {}: train {} / test {} -> {:.3}",
                fold.fold, fold.n_train, fold.n_test, fold.score
            );
        }
    }
}
