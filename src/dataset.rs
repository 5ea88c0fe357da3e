//! Adapter between string-celled tables and the numeric algorithms.
//!
//! A [`Table`] is the read side: rows of string cells, column names, and a
//! class column. A [`ColumnSink`] is the write side: it accepts one new named
//! column per algorithm run. [`FeatureSet`] is the numeric view every
//! algorithm starts from.

use crate::error::{Result, TabsightError};
use crate::Matrix;
use ndarray::Axis;

/// Decimal places used when writing numbers back into a table.
pub const DECIMALS: usize = 4;

/// Read-only access to a table of string cells.
pub trait Table {
    fn n_rows(&self) -> usize;

    fn n_columns(&self) -> usize;

    fn column_name(&self, column: usize) -> &str;

    fn cell(&self, row: usize, column: usize) -> &str;

    /// Index of the class column, matched case-insensitively against
    /// "class" or "label".
    fn class_column(&self) -> Option<usize> {
        resolve_class_column((0..self.n_columns()).map(|c| self.column_name(c)))
    }
}

/// Receives computed columns aligned to the rows of a [`Table`].
pub trait ColumnSink {
    /// Return `base`, or `base` with a numeric suffix if it is already taken.
    fn unique_column_name(&self, base: &str) -> String;

    /// Append one column. `values` holds one formatted cell per row.
    fn append_column(&mut self, name: String, values: Vec<String>) -> Result<()>;
}

pub fn resolve_class_column<'a, I>(names: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().position(|name| {
        let name = name.trim();
        name.eq_ignore_ascii_case("class") || name.eq_ignore_ascii_case("label")
    })
}

/// Parse a cell as a finite number. Blank, text, NaN and infinities are all
/// treated as non-numeric.
pub fn parse_cell(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Format a computed value for the sink.
pub fn format_value(value: f64) -> String {
    if value.is_finite() {
        format!("{:.*}", DECIMALS, value)
    } else {
        "NaN".to_string()
    }
}

/// Columns (other than `exclude`) whose every cell parses as a number.
pub fn numeric_columns<T: Table + ?Sized>(table: &T, exclude: Option<usize>) -> Vec<usize> {
    (0..table.n_columns())
        .filter(|&c| Some(c) != exclude)
        .filter(|&c| (0..table.n_rows()).all(|r| parse_cell(table.cell(r, c)).is_some()))
        .collect()
}

/// `EmptyDataset` when the table has no rows or no columns.
pub fn check_not_empty<T: Table + ?Sized>(table: &T) -> Result<()> {
    if table.n_rows() == 0 || table.n_columns() == 0 {
        return Err(TabsightError::EmptyDataset);
    }
    Ok(())
}

/// In-memory table that is both a [`Table`] and a [`ColumnSink`].
#[derive(Clone, Debug, Default)]
pub struct DataTable {
    names: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl DataTable {
    pub fn new(names: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        for row in &rows {
            if row.len() != names.len() {
                return Err(TabsightError::DimensionMismatch {
                    expected: names.len(),
                    actual: row.len(),
                });
            }
        }
        Ok(Self { names, rows })
    }

    /// Build a table from anything that yields strings, e.g. nested arrays of
    /// `&str`.
    pub fn from_records<N, R, C>(names: N, rows: R) -> Result<Self>
    where
        N: IntoIterator,
        N::Item: Into<String>,
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let names = names.into_iter().map(Into::into).collect();
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        Self::new(names, rows)
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn row(&self, row: usize) -> &[String] {
        &self.rows[row]
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// All cells of one column, top to bottom.
    pub fn column(&self, column: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |row| row[column].as_str())
    }
}

impl Table for DataTable {
    fn n_rows(&self) -> usize {
        self.rows.len()
    }

    fn n_columns(&self) -> usize {
        self.names.len()
    }

    fn column_name(&self, column: usize) -> &str {
        &self.names[column]
    }

    fn cell(&self, row: usize, column: usize) -> &str {
        &self.rows[row][column]
    }
}

impl ColumnSink for DataTable {
    fn unique_column_name(&self, base: &str) -> String {
        if !self.names.iter().any(|n| n == base) {
            return base.to_string();
        }
        (2..)
            .map(|i| format!("{base}_{i}"))
            .find(|candidate| !self.names.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    fn append_column(&mut self, name: String, values: Vec<String>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(TabsightError::DimensionMismatch {
                expected: self.rows.len(),
                actual: values.len(),
            });
        }
        self.names.push(name);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }
}

/// Numeric view of a table: parsed feature columns plus the class labels.
#[derive(Clone, Debug)]
pub struct FeatureSet {
    pub features: Matrix,
    /// Source column index of each feature.
    pub columns: Vec<usize>,
    pub names: Vec<String>,
    /// One class name per row; empty when no class column was used.
    pub labels: Vec<String>,
    pub class_column: Option<usize>,
}

impl FeatureSet {
    /// Numeric features plus labels from the table's own class column.
    pub fn from_table<T: Table + ?Sized>(table: &T) -> Result<Self> {
        check_not_empty(table)?;
        let class_column = table.class_column().ok_or(TabsightError::NoClassColumn)?;
        Self::extract(table, Some(class_column))
    }

    /// Keep every column (except the class column) that parses as numeric in
    /// all rows. Columns that fail are dropped, not coerced.
    pub fn extract<T: Table + ?Sized>(table: &T, class_column: Option<usize>) -> Result<Self> {
        check_not_empty(table)?;
        let columns = numeric_columns(table, class_column);
        if columns.is_empty() {
            return Err(TabsightError::InvalidParameter(
                "no numeric feature columns".to_string(),
            ));
        }
        Self::with_columns(table, &columns, class_column)
    }

    /// Use exactly `columns`. Cells that do not parse become NaN so callers
    /// can write a sentinel for that row instead of failing the column.
    pub fn with_columns<T: Table + ?Sized>(
        table: &T,
        columns: &[usize],
        class_column: Option<usize>,
    ) -> Result<Self> {
        check_not_empty(table)?;
        if let Some(&bad) = columns
            .iter()
            .chain(class_column.iter())
            .find(|&&c| c >= table.n_columns())
        {
            return Err(TabsightError::InvalidParameter(format!(
                "column {bad} out of range for {} columns",
                table.n_columns()
            )));
        }

        let n_rows = table.n_rows();
        let features = Matrix::from_shape_fn((n_rows, columns.len()), |(r, j)| {
            parse_cell(table.cell(r, columns[j])).unwrap_or(f64::NAN)
        });
        let names = columns
            .iter()
            .map(|&c| table.column_name(c).to_string())
            .collect();
        let labels = match class_column {
            Some(c) => (0..n_rows)
                .map(|r| table.cell(r, c).trim().to_string())
                .collect(),
            None => Vec::new(),
        };

        Ok(Self {
            features,
            columns: columns.to_vec(),
            names,
            labels,
            class_column,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Features and labels of the rows at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> (Matrix, Vec<String>) {
        let features = self.features.select(Axis(0), indices);
        let labels = indices.iter().map(|&i| self.labels[i].clone()).collect();
        (features, labels)
    }
}

/// Map from class name to an evenly spaced value in `[0, 1]`, in first-seen
/// order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelEncoding {
    classes: Vec<String>,
}

impl LabelEncoding {
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut classes: Vec<String> = Vec::new();
        for label in labels {
            let label = label.as_ref();
            if !classes.iter().any(|c| c == label) {
                classes.push(label.to_string());
            }
        }
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn index_of(&self, class: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == class)
    }

    pub fn class_name(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    /// Scalar for the class at `index`. A single class encodes as 0.
    pub fn value(&self, index: usize) -> f64 {
        if self.classes.len() <= 1 {
            0.0
        } else {
            index as f64 / (self.classes.len() - 1) as f64
        }
    }

    pub fn encode(&self, class: &str) -> Option<f64> {
        self.index_of(class).map(|i| self.value(i))
    }

    /// Class indices for `labels`; unseen classes are an error.
    pub fn transform<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>> {
        labels
            .iter()
            .map(|label| {
                self.index_of(label.as_ref()).ok_or_else(|| {
                    TabsightError::InvalidParameter(format!(
                        "unknown class {:?}",
                        label.as_ref()
                    ))
                })
            })
            .collect()
    }
}
