use std::collections::BTreeMap;

use super::error::{PipelineError, Result};
use super::filter::{require_columns, FilteredView};
use super::model::Value;

pub const DEFAULT_HISTOGRAM_BINS: usize = 30;

/// Tukey whisker factor (1.5 × IQR).
const WHISKER_IQR: f64 = 1.5;

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

/// `describe()`-style summary of one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; NaN for fewer than two values.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Summaries of every numeric column of the view, in header order.
/// Columns without any value in the view are skipped.
pub fn describe(view: &FilteredView<'_>) -> Vec<ColumnSummary> {
    view.dataset()
        .numeric_columns()
        .into_iter()
        .filter_map(|column| {
            let mut values = view.numeric_values(&column);
            if values.is_empty() {
                return None;
            }
            values.sort_by(f64::total_cmp);
            let n = values.len();
            let mean = values.iter().sum::<f64>() / n as f64;
            let std = if n > 1 {
                (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
            } else {
                f64::NAN
            };
            Some(ColumnSummary {
                count: n,
                mean,
                std,
                min: values[0],
                q25: quantile_sorted(&values, 0.25),
                median: quantile_sorted(&values, 0.5),
                q75: quantile_sorted(&values, 0.75),
                max: values[n - 1],
                column,
            })
        })
        .collect()
}

/// Linear-interpolated quantile of ascending `values` (pandas default).
fn quantile_sorted(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let pos = q * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    values[lo] + (values[hi] - values[lo]) * (pos - lo as f64)
}

// ---------------------------------------------------------------------------
// Value counts
// ---------------------------------------------------------------------------

/// Occurrences of each non-null value of `column`, most frequent first
/// (ties by ascending value).
pub fn value_counts(view: &FilteredView<'_>, column: &str) -> Result<Vec<(Value, usize)>> {
    require_columns(view.dataset(), &[column])?;
    let mut counts: BTreeMap<Value, usize> = BTreeMap::new();
    for row in view.rows() {
        let v = row.get(column);
        if !v.is_null() {
            *counts.entry(v.clone()).or_default() += 1;
        }
    }
    let mut out: Vec<(Value, usize)> = counts.into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(out)
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `bins + 1` ascending bin edges.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn bin_width(&self) -> f64 {
        match self.edges.as_slice() {
            [a, b, ..] => b - a,
            _ => 0.0,
        }
    }

    /// Centre of bin `i`.
    pub fn center(&self, i: usize) -> f64 {
        (self.edges[i] + self.edges[i + 1]) / 2.0
    }
}

/// Equal-width bins over `[min, max]`; the last bin is closed on the right.
/// A constant series is binned over `[v - 0.5, v + 0.5]`.
pub fn histogram(values: &[f64], bins: usize) -> Result<Histogram> {
    let bins = bins.max(1);
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Err(PipelineError::InsufficientData {
            operation: "histogram",
            needed: 1,
            found: 0,
        });
    }
    let mut lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();

    let mut counts = vec![0usize; bins];
    for v in finite {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Ok(Histogram { edges, counts })
}

// ---------------------------------------------------------------------------
// Box plot summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

/// Quartiles and Tukey whiskers of `target` per value of `group_by`.
/// Groups with no numeric target values are omitted.
pub fn box_summary(
    view: &FilteredView<'_>,
    group_by: &str,
    target: &str,
) -> Result<BTreeMap<Value, BoxSummary>> {
    let dataset = view.dataset();
    require_columns(dataset, &[group_by, target])?;
    if !dataset.is_numeric(target) {
        return Err(PipelineError::NotNumeric {
            column: target.to_string(),
        });
    }

    let mut groups: BTreeMap<Value, Vec<f64>> = BTreeMap::new();
    for row in view.rows() {
        if let Some(v) = row.get(target).as_f64() {
            groups.entry(row.get(group_by).clone()).or_default().push(v);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, mut values)| {
            values.sort_by(f64::total_cmp);
            let q1 = quantile_sorted(&values, 0.25);
            let q3 = quantile_sorted(&values, 0.75);
            let iqr = q3 - q1;
            let (lo_fence, hi_fence) = (q1 - WHISKER_IQR * iqr, q3 + WHISKER_IQR * iqr);
            let inside = values.iter().copied().filter(|v| (lo_fence..=hi_fence).contains(v));
            let lower_whisker = inside.clone().fold(f64::INFINITY, f64::min);
            let upper_whisker = inside.fold(f64::NEG_INFINITY, f64::max);
            let outliers = values
                .iter()
                .copied()
                .filter(|v| !(lo_fence..=hi_fence).contains(v))
                .collect();
            let summary = BoxSummary {
                lower_whisker,
                q1,
                median: quantile_sorted(&values, 0.5),
                q3,
                upper_whisker,
                outliers,
            };
            (key, summary)
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Pearson correlation of two numeric columns over rows where both are present.
pub fn correlation(view: &FilteredView<'_>, a: &str, b: &str) -> Result<f64> {
    let dataset = view.dataset();
    require_columns(dataset, &[a, b])?;
    for column in [a, b] {
        if !dataset.is_numeric(column) {
            return Err(PipelineError::NotNumeric {
                column: column.to_string(),
            });
        }
    }

    let pairs: Vec<(f64, f64)> = view
        .rows()
        .filter_map(|row| Some((row.get(a).as_f64()?, row.get(b).as_f64()?)))
        .collect();
    if pairs.len() < 2 {
        return Err(PipelineError::InsufficientData {
            operation: "correlation",
            needed: 2,
            found: pairs.len(),
        });
    }
    Ok(pearson(&pairs))
}

fn pearson(pairs: &[(f64, f64)]) -> f64 {
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let cov: f64 = pairs.iter().map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();
    let var_x: f64 = pairs.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    let var_y: f64 = pairs.iter().map(|(_, y)| (y - mean_y).powi(2)).sum();

    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// `None` where a pair has fewer than two complete rows.
    pub values: Vec<Vec<Option<f64>>>,
}

/// Pairwise correlations of all numeric columns.
pub fn correlation_matrix(view: &FilteredView<'_>) -> Result<CorrelationMatrix> {
    let columns = view.dataset().numeric_columns();
    if columns.len() < 2 {
        return Err(PipelineError::InsufficientData {
            operation: "correlation matrix",
            needed: 2,
            found: columns.len(),
        });
    }

    let n = columns.len();
    let mut values = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            // Diagonal is exactly 1 unless the column is constant.
            let r = match correlation(view, &columns[i], &columns[j]) {
                Ok(r) if i == j => Some(if r == 0.0 { 0.0 } else { 1.0 }),
                Ok(r) => Some(r),
                Err(e) if e.is_insufficient_data() => None,
                Err(e) => return Err(e),
            };
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    Ok(CorrelationMatrix { columns, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Dataset, Record};

    fn table(rows: &[(&str, Option<f64>, Option<f64>)]) -> Dataset {
        let records = rows
            .iter()
            .map(|(g, x, y)| {
                Record::from_iter([
                    ("g", Value::from(*g)),
                    ("x", x.map(Value::Float).unwrap_or(Value::Null)),
                    ("y", y.map(Value::Float).unwrap_or(Value::Null)),
                ])
            })
            .collect();
        Dataset::from_records(vec!["g".into(), "x".into(), "y".into()], records)
    }

    #[test]
    fn describe_matches_pandas() {
        let ds = table(&[
            ("a", Some(1.0), None),
            ("a", Some(2.0), None),
            ("b", Some(3.0), None),
            ("b", Some(4.0), Some(7.0)),
        ]);
        let summary = describe(&FilteredView::all(&ds));
        assert_eq!(summary.len(), 2);
        let x = &summary[0];
        assert_eq!(x.column, "x");
        assert_eq!(x.count, 4);
        assert_eq!(x.mean, 2.5);
        assert!((x.std - 1.2909944).abs() < 1e-6);
        assert_eq!((x.min, x.q25, x.median, x.q75, x.max), (1.0, 1.75, 2.5, 3.25, 4.0));
        assert_eq!(summary[1].count, 1);
        assert!(summary[1].std.is_nan());
    }

    #[test]
    fn value_counts_most_frequent_first() {
        let ds = table(&[("b", None, None), ("a", None, None), ("b", None, None), ("c", None, None)]);
        let counts = value_counts(&FilteredView::all(&ds), "g").unwrap();
        assert_eq!(
            counts,
            vec![(Value::from("b"), 2), (Value::from("a"), 1), (Value::from("c"), 1)]
        );
    }

    #[test]
    fn histogram_closes_last_bin() {
        let h = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 4).unwrap();
        assert_eq!(h.edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(h.counts, vec![1, 1, 1, 2]);
        assert_eq!(h.bin_width(), 1.0);
        assert_eq!(h.center(0), 0.5);
    }

    #[test]
    fn histogram_of_constant_values() {
        let h = histogram(&[2.0, 2.0], 2).unwrap();
        assert_eq!(h.edges, vec![1.5, 2.0, 2.5]);
        assert_eq!(h.counts.iter().sum::<usize>(), 2);
    }

    #[test]
    fn histogram_of_nothing_is_insufficient() {
        assert!(histogram(&[], DEFAULT_HISTOGRAM_BINS)
            .unwrap_err()
            .is_insufficient_data());
    }

    #[test]
    fn box_summary_flags_outliers() {
        let ds = table(&[
            ("a", Some(1.0), None),
            ("a", Some(2.0), None),
            ("a", Some(3.0), None),
            ("a", Some(4.0), None),
            ("a", Some(100.0), None),
            ("b", None, None),
        ]);
        let boxes = box_summary(&FilteredView::all(&ds), "g", "x").unwrap();
        assert_eq!(boxes.len(), 1);
        let a = &boxes[&Value::from("a")];
        assert_eq!((a.q1, a.median, a.q3), (2.0, 3.0, 4.0));
        assert_eq!(a.upper_whisker, 4.0);
        assert_eq!(a.lower_whisker, 1.0);
        assert_eq!(a.outliers, vec![100.0]);
    }

    #[test]
    fn correlation_uses_complete_pairs() {
        let ds = table(&[
            ("a", Some(1.0), Some(2.0)),
            ("a", Some(2.0), Some(4.0)),
            ("a", Some(3.0), None),
            ("a", Some(4.0), Some(8.0)),
        ]);
        let r = correlation(&FilteredView::all(&ds), "x", "y").unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_needs_two_pairs() {
        let ds = table(&[("a", Some(1.0), Some(2.0)), ("a", Some(2.0), None)]);
        let err = correlation(&FilteredView::all(&ds), "x", "y").unwrap_err();
        assert_eq!(
            err,
            PipelineError::InsufficientData {
                operation: "correlation",
                needed: 2,
                found: 1
            }
        );
    }

    #[test]
    fn correlation_matrix_marks_sparse_pairs() {
        let ds = table(&[("a", Some(1.0), Some(2.0)), ("a", Some(2.0), None), ("b", Some(3.0), None)]);
        let m = correlation_matrix(&FilteredView::all(&ds)).unwrap();
        assert_eq!(m.columns, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(m.values[0][0], Some(1.0));
        assert_eq!(m.values[0][1], None);
        assert_eq!(m.values[1][1], None);
    }
}
