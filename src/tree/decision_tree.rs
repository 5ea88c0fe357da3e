use crate::dataset::{parse_cell, LabelEncoding, Table};
use crate::error::{Result, TabsightError};
use crate::metrics::accuracy;
use crate::vote::VoteTally;
use crate::Matrix;
use ndarray::ArrayView1;
use std::fmt::{self, Write};

/// Impurity measure minimized by the splits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Criterion {
    #[default]
    Gini,
    Entropy,
}

impl Criterion {
    fn impurity(&self, counts: &[usize], total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let n = total as f64;
        match self {
            Criterion::Gini => {
                1.0 - counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum::<f64>()
            }
            Criterion::Entropy => counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    -p * p.log2()
                })
                .sum(),
        }
    }
}

/// Split thresholds need a total order, so NaN and infinities are refused
/// with the first offending cell.
pub(crate) fn check_finite<I>(x: &Matrix, rows: I) -> Result<()>
where
    I: IntoIterator<Item = usize>,
{
    for i in rows {
        if let Some((j, value)) = x.row(i).iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(TabsightError::MalformedInstance {
                row: i,
                column: j,
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

/// `row[feature] <= threshold` sends a row left, anything else right.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitRule {
    pub feature: usize,
    pub threshold: f64,
}

impl SplitRule {
    pub fn goes_left(&self, row: ArrayView1<f64>) -> bool {
        row[self.feature] <= self.threshold
    }

    /// Display text such as `petal_width <= 0.8000`.
    pub fn question(&self, feature_names: &[String]) -> String {
        match feature_names.get(self.feature) {
            Some(name) => format!("{name} <= {:.4}", self.threshold),
            None => format!("x[{}] <= {:.4}", self.feature, self.threshold),
        }
    }
}

/// One node of the arena. Index 0 is the root.
#[derive(Clone, Debug, PartialEq)]
pub enum TreeNode {
    Leaf {
        class: usize,
        /// Training rows that reached this leaf.
        case_count: usize,
    },
    Split {
        rule: SplitRule,
        left: usize,
        right: usize,
    },
}

/// CART-style classification tree grown on threshold splits.
#[derive(Clone, Debug)]
pub struct DecisionTree {
    pub encoding: Option<LabelEncoding>,
    nodes: Vec<TreeNode>,
    n_features: usize,
    feature_names: Vec<String>,
    criterion: Criterion,
    max_depth: Option<usize>,
    min_samples_split: usize,
}

struct Candidate {
    rule: SplitRule,
    gain: f64,
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            encoding: None,
            nodes: Vec::new(),
            n_features: 0,
            feature_names: Vec::new(),
            criterion: Criterion::Gini,
            max_depth: None,
            min_samples_split: 2,
        }
    }

    pub fn criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Subsets with fewer rows than this become leaves.
    pub fn min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Names used when rendering split questions.
    pub fn feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = names;
        self
    }

    pub fn fit<S: AsRef<str>>(&mut self, x: &Matrix, y: &[S]) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(TabsightError::DimensionMismatch {
                expected: x.nrows(),
                actual: y.len(),
            });
        }
        let encoding = LabelEncoding::fit(y);
        let targets = encoding.transform(y)?;
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.fit_indices(x, &targets, encoding, &indices)
    }

    /// Grow the tree on the rows at `indices` (repeats allowed). `targets`
    /// holds a class index into `encoding` for every row of `x`.
    pub(crate) fn fit_indices(
        &mut self,
        x: &Matrix,
        targets: &[usize],
        encoding: LabelEncoding,
        indices: &[usize],
    ) -> Result<()> {
        if indices.is_empty() || x.ncols() == 0 {
            return Err(TabsightError::EmptyDataset);
        }
        if !self.feature_names.is_empty() && self.feature_names.len() != x.ncols() {
            return Err(TabsightError::DimensionMismatch {
                expected: x.ncols(),
                actual: self.feature_names.len(),
            });
        }
        check_finite(x, indices.iter().copied())?;

        let mut nodes = Vec::new();
        self.build(x, targets, encoding.len(), indices, 0, &mut nodes);

        self.nodes = nodes;
        self.n_features = x.ncols();
        self.encoding = Some(encoding);

        log::debug!(
            "decision tree grown on {} rows: {} nodes, {} leaves, depth {}",
            indices.len(),
            self.nodes.len(),
            self.n_leaves(),
            self.depth()
        );
        Ok(())
    }

    fn build(
        &self,
        x: &Matrix,
        targets: &[usize],
        n_classes: usize,
        indices: &[usize],
        depth: usize,
        nodes: &mut Vec<TreeNode>,
    ) -> usize {
        let majority = indices
            .iter()
            .map(|&i| targets[i])
            .collect::<VoteTally<usize>>()
            .into_winner()
            .unwrap_or(0);
        let leaf = TreeNode::Leaf {
            class: majority,
            case_count: indices.len(),
        };

        let pure = indices
            .split_first()
            .is_none_or(|(&first, rest)| rest.iter().all(|&i| targets[i] == targets[first]));
        let too_small = indices.len() < self.min_samples_split.max(2);
        let too_deep = self.max_depth.is_some_and(|d| depth >= d);

        let candidate = if pure || too_small || too_deep {
            None
        } else {
            self.best_split(x, targets, n_classes, indices)
        };
        let Some(Candidate { rule, .. }) = candidate else {
            nodes.push(leaf);
            return nodes.len() - 1;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            indices.iter().copied().partition(|&i| rule.goes_left(x.row(i)));
        if left_rows.is_empty() || right_rows.is_empty() {
            nodes.push(leaf);
            return nodes.len() - 1;
        }

        let id = nodes.len();
        nodes.push(leaf);
        let left = self.build(x, targets, n_classes, &left_rows, depth + 1, nodes);
        let right = self.build(x, targets, n_classes, &right_rows, depth + 1, nodes);
        nodes[id] = TreeNode::Split { rule, left, right };
        id
    }

    /// Best `(feature, threshold)` by impurity reduction. Thresholds are
    /// midpoints between consecutive distinct values. Ties keep the lowest
    /// feature, then the lowest threshold.
    fn best_split(
        &self,
        x: &Matrix,
        targets: &[usize],
        n_classes: usize,
        indices: &[usize],
    ) -> Option<Candidate> {
        let total = indices.len();
        let mut parent_counts = vec![0usize; n_classes];
        for &i in indices {
            parent_counts[targets[i]] += 1;
        }
        let parent = self.criterion.impurity(&parent_counts, total);

        let mut best: Option<Candidate> = None;
        let mut column: Vec<(f64, usize)> = Vec::with_capacity(total);

        for feature in 0..x.ncols() {
            column.clear();
            column.extend(indices.iter().map(|&i| (x[[i, feature]], targets[i])));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_counts = vec![0usize; n_classes];
            for pos in 0..total - 1 {
                let (value, class) = column[pos];
                left_counts[class] += 1;
                let next = column[pos + 1].0;
                if next <= value {
                    continue;
                }

                let n_left = pos + 1;
                let n_right = total - n_left;
                let right_counts: Vec<usize> = parent_counts
                    .iter()
                    .zip(&left_counts)
                    .map(|(p, l)| p - l)
                    .collect();
                let weighted = (n_left as f64 * self.criterion.impurity(&left_counts, n_left)
                    + n_right as f64 * self.criterion.impurity(&right_counts, n_right))
                    / total as f64;
                let gain = parent - weighted;

                if best.as_ref().is_none_or(|b| gain > b.gain) {
                    let mut threshold = (value + next) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(Candidate {
                        rule: SplitRule { feature, threshold },
                        gain,
                    });
                }
            }
        }

        best
    }

    fn fitted(&self) -> Result<&LabelEncoding> {
        self.encoding
            .as_ref()
            .ok_or(TabsightError::NotFitted("DecisionTree"))
    }

    /// Walk from the root, asking `goes_left` at every split, and return the
    /// class of the leaf reached.
    fn walk<F>(&self, mut goes_left: F) -> Result<usize>
    where
        F: FnMut(&SplitRule) -> Result<bool>,
    {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { class, .. } => return Ok(*class),
                TreeNode::Split { rule, left, right } => {
                    idx = if goes_left(rule)? { *left } else { *right };
                }
            }
        }
    }

    pub(crate) fn predict_class(&self, row: ArrayView1<f64>) -> Result<usize> {
        self.fitted()?;
        if row.len() != self.n_features {
            return Err(TabsightError::DimensionMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        self.walk(|rule| Ok(rule.goes_left(row)))
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> Result<&str> {
        let class = self.predict_class(row)?;
        Ok(self.fitted()?.class_name(class).unwrap_or_default())
    }

    pub fn predict(&self, x: &Matrix) -> Result<Vec<String>> {
        x.outer_iter()
            .map(|row| self.predict_row(row).map(str::to_string))
            .collect()
    }

    /// Class index for raw row `row` of `table`. Feature `j` of the tree
    /// reads table column `columns[j]`; only cells on the path are parsed.
    pub(crate) fn predict_table_row_class<T: Table + ?Sized>(
        &self,
        table: &T,
        row: usize,
        columns: &[usize],
    ) -> Result<usize> {
        self.fitted()?;
        if columns.len() != self.n_features {
            return Err(TabsightError::DimensionMismatch {
                expected: self.n_features,
                actual: columns.len(),
            });
        }
        self.walk(|rule| {
            let column = columns[rule.feature];
            let cell = table.cell(row, column);
            let value = parse_cell(cell).ok_or_else(|| TabsightError::MalformedInstance {
                row,
                column,
                value: cell.to_string(),
            })?;
            Ok(value <= rule.threshold)
        })
    }

    /// Predict every row of `table` from its string cells.
    ///
    /// # Errors
    ///
    /// `MalformedInstance` for the first row whose split attribute does not
    /// parse as a number.
    pub fn predict_table<T: Table + ?Sized>(
        &self,
        table: &T,
        columns: &[usize],
    ) -> Result<Vec<String>> {
        let encoding = self.fitted()?;
        (0..table.n_rows())
            .map(|row| {
                self.predict_table_row_class(table, row, columns)
                    .map(|class| encoding.class_name(class).unwrap_or_default().to_string())
            })
            .collect()
    }

    pub fn score<S: AsRef<str>>(&self, x: &Matrix, y: &[S]) -> Result<f64> {
        let predictions = self.predict(x)?;
        accuracy(y, &predictions)
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }

    fn render(&self, out: &mut String, idx: usize, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        match &self.nodes[idx] {
            TreeNode::Leaf { class, case_count } => {
                let name = self
                    .encoding
                    .as_ref()
                    .and_then(|e| e.class_name(*class))
                    .unwrap_or("?");
                writeln!(out, "{pad}{name} ({case_count})")
            }
            TreeNode::Split { rule, left, right } => {
                writeln!(out, "{pad}{}?", rule.question(&self.feature_names))?;
                self.render(out, *left, indent + 1)?;
                self.render(out, *right, indent + 1)
            }
        }
    }
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Indented rendering: each split shows its question, the `<=` branch
/// first, and each leaf shows its class with the training-case count.
impl fmt::Display for DecisionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nodes.is_empty() {
            return writeln!(f, "(unfitted tree)");
        }
        let mut out = String::new();
        self.render(&mut out, 0, 0)?;
        f.write_str(&out)
    }
}
