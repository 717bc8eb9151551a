use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroUsize;

use serde::Deserialize;

use super::error::{PipelineError, Result};
use super::filter::{require_columns, FilteredView};
use super::model::Value;

// ---------------------------------------------------------------------------
// Reduction kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    Sum,
    Mean,
    Min,
    Max,
    Count,
}

impl Reduction {
    pub const ALL: [Reduction; 5] = [
        Reduction::Sum,
        Reduction::Mean,
        Reduction::Min,
        Reduction::Max,
        Reduction::Count,
    ];

    fn reduce(self, values: &[f64], rows: usize) -> Reduced {
        if self == Reduction::Count {
            return Reduced::Value(rows as f64);
        }
        if values.is_empty() {
            return Reduced::NoData;
        }
        let v = match self {
            Reduction::Sum => values.iter().sum(),
            Reduction::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Reduction::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Reduction::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Reduction::Count => rows as f64,
        };
        Reduced::Value(v)
    }
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reduction::Sum => "sum",
            Reduction::Mean => "mean",
            Reduction::Min => "min",
            Reduction::Max => "max",
            Reduction::Count => "count",
        };
        write!(f, "{s}")
    }
}

/// A reduced group value. `NoData` marks a group whose target values were all
/// missing, so charts never show a fake zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reduced {
    Value(f64),
    NoData,
}

impl Reduced {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Reduced::Value(v) => Some(*v),
            Reduced::NoData => None,
        }
    }
}

impl fmt::Display for Reduced {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reduced::Value(v) => write!(f, "{v:.4}"),
            Reduced::NoData => write!(f, "no data"),
        }
    }
}

/// Group key → reduced value, ascending by key.
pub type GroupedSeries = BTreeMap<Value, Reduced>;

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Group the view by `group_by` and reduce `target` within each group.
///
/// `Count` counts rows regardless of the target's values. The other reductions
/// skip missing values and need a numeric target column.
pub fn aggregate(
    view: &FilteredView<'_>,
    group_by: &str,
    target: &str,
    reduction: Reduction,
) -> Result<GroupedSeries> {
    let dataset = view.dataset();
    require_columns(dataset, &[group_by, target])?;
    if reduction != Reduction::Count && !dataset.is_numeric(target) && !dataset.distinct(target).is_empty() {
        return Err(PipelineError::NotNumeric {
            column: target.to_string(),
        });
    }

    let mut groups: BTreeMap<Value, (Vec<f64>, usize)> = BTreeMap::new();
    for row in view.rows() {
        let (values, rows) = groups.entry(row.get(group_by).clone()).or_default();
        *rows += 1;
        if let Some(v) = row.get(target).as_f64() {
            values.push(v);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, (values, rows))| (key, reduction.reduce(&values, rows)))
        .collect())
}

/// The `n` groups with the largest values, ties broken by ascending key.
/// Groups without data rank after every value, so the result always holds
/// `min(n, groups)` entries.
pub fn top_n(series: &GroupedSeries, n: NonZeroUsize) -> Vec<(Value, Reduced)> {
    let mut entries: Vec<(Value, Reduced)> =
        series.iter().map(|(k, r)| (k.clone(), *r)).collect();
    // Keys arrive ascending, so a stable sort on value alone keeps ties ordered.
    entries.sort_by(|(_, a), (_, b)| match (a, b) {
        (Reduced::Value(a), Reduced::Value(b)) => b.total_cmp(a),
        (Reduced::Value(_), Reduced::NoData) => Ordering::Less,
        (Reduced::NoData, Reduced::Value(_)) => Ordering::Greater,
        (Reduced::NoData, Reduced::NoData) => Ordering::Equal,
    });
    entries.truncate(n.get());
    entries
}
