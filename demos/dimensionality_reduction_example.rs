use ndarray::array;
use tabsight::engine::{extract_lda, extract_pca, LdaConfig, PcaConfig};
use tabsight::{DataTable, Matrix, Table, LDA, PCA};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("=== Dimensionality Reduction Techniques Comparison ===\n");

    let x = array![
        [5.1, 3.5, 1.4, 0.2],
        [4.9, 3.0, 1.4, 0.2],
        [4.7, 3.2, 1.3, 0.2],
        [5.4, 3.9, 1.7, 0.4],
        [7.0, 3.2, 4.7, 1.4],
        [6.4, 3.2, 4.5, 1.5],
        [5.5, 2.3, 4.0, 1.3],
        [6.5, 2.8, 4.6, 1.5],
        [6.3, 3.3, 6.0, 2.5],
        [7.1, 3.0, 5.9, 2.1]
    ];
    let y = ["setosa", "setosa", "setosa", "setosa", "versicolor", "versicolor", "versicolor", "versicolor", "virginica", "virginica"];

    println!("Original data shape: {} samples, {} features\n", x.nrows(), x.ncols());

    println!("=== Principal Component Analysis (PCA) ===");
    for n_components in [1, 2, 3] {
        match reconstruction_error(&x, n_components) {
            Ok(mse) => println!("{n_components} components: reconstruction MSE {mse:.6}"),
            Err(e) => println!("PCA with {n_components} components failed: {e}"),
        }
    }

    println!("\n=== Linear Discriminant Analysis (LDA) ===");
    let mut lda = LDA::new().n_components(2);
    let projected = lda.fit_transform(&x, &y)?;
    println!("Projected shape: {:?}", projected.shape());
    if let Some(ratio) = &lda.explained_variance_ratio {
        println!("Discriminant ratio: {:?}", ratio.to_vec());
    }
    let names: Vec<String> = (1..=x.ncols()).map(|i| format!("f{i}")).collect();
    println!("First direction: {}", lda.describe_component(0, &names)?);
    println!("Training accuracy: {:.1}%", lda.score(&x, &y)? * 100.0);

    println!("\n=== Writing columns into a table ===");
    let mut table = to_table(&x, &y)?;
    let pca = extract_pca(
        &mut table,
        &PcaConfig {
            n_components: 2,
            ..Default::default()
        },
    )?;
    let lda = extract_lda(&mut table, &LdaConfig::default())?;
    println!("Added columns: {:?} and {:?}", pca.column_names, lda.column_names);
    for row in 0..table.n_rows() {
        println!("{:?}", table.row(row));
    }

    Ok(())
}

fn reconstruction_error(x: &Matrix, n_components: usize) -> tabsight::Result<f64> {
    let mut pca = PCA::new().n_components(n_components);
    let projected = pca.fit_transform(x)?;
    let reconstructed = pca.inverse_transform(&projected)?;
    Ok((x - &reconstructed).mapv(|d| d * d).mean().unwrap_or(0.0))
}

fn to_table(x: &Matrix, y: &[&str]) -> tabsight::Result<DataTable> {
    let mut names: Vec<String> = (1..=x.ncols()).map(|i| format!("f{i}")).collect();
    names.push("class".to_string());
    let rows = x
        .outer_iter()
        .zip(y)
        .map(|(row, label)| {
            let mut cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            cells.push(label.to_string());
            cells
        })
        .collect();
    DataTable::new(names, rows)
}
