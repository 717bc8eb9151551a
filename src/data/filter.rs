use std::collections::BTreeSet;

use serde::Deserialize;

use super::error::{PipelineError, Result};
use super::model::{Dataset, Record, Value};

// ---------------------------------------------------------------------------
// Selection: which state / crop / years the user picked
// ---------------------------------------------------------------------------

/// Names of the columns the selectors refer to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilterColumns {
    pub state: String,
    pub crop: String,
    pub year: String,
}

impl Default for FilterColumns {
    fn default() -> Self {
        Self {
            state: "State".to_string(),
            crop: "Crop".to_string(),
            year: "year".to_string(),
        }
    }
}

/// A conjunction of predicates over the selector columns.
///
/// * `state` / `crop`: `None` → no constraint, `Some(v)` → equality.
/// * `years`: `None` → no constraint, `Some(set)` → membership. An empty set
///   matches nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub state: Option<Value>,
    pub crop: Option<Value>,
    pub years: Option<BTreeSet<Value>>,
}

impl Selection {
    /// Columns this selection actually references.
    pub fn referenced_columns<'a>(&self, columns: &'a FilterColumns) -> Vec<&'a str> {
        let mut out = Vec::new();
        if self.state.is_some() {
            out.push(columns.state.as_str());
        }
        if self.crop.is_some() {
            out.push(columns.crop.as_str());
        }
        if self.years.is_some() {
            out.push(columns.year.as_str());
        }
        out
    }

    fn matches(&self, row: &Record, columns: &FilterColumns) -> bool {
        if let Some(state) = &self.state {
            if row.get(&columns.state) != state {
                return false;
            }
        }
        if let Some(crop) = &self.crop {
            if row.get(&columns.crop) != crop {
                return false;
            }
        }
        if let Some(years) = &self.years {
            if !years.contains(row.get(&columns.year)) {
                return false;
            }
        }
        true
    }
}

/// Fail with `SchemaMismatch` on the first column the dataset lacks.
pub fn require_columns(dataset: &Dataset, columns: &[&str]) -> Result<()> {
    match columns.iter().find(|c| !dataset.has_column(c)) {
        Some(missing) => Err(PipelineError::schema_mismatch(
            missing,
            &dataset.column_names,
        )),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Filtered view
// ---------------------------------------------------------------------------

/// Rows of a dataset passing a selection, in source order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// The whole dataset as a view.
    pub fn all(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            indices: (0..dataset.len()).collect(),
        }
    }

    /// A view over explicit row indices (e.g. cached from an earlier filter).
    pub fn from_indices(dataset: &'a Dataset, mut indices: Vec<usize>) -> Self {
        indices.retain(|&i| i < dataset.len());
        indices.sort_unstable();
        indices.dedup();
        Self { dataset, indices }
    }

    /// Keep the rows of this view that also pass `selection`.
    pub fn refine(&self, columns: &FilterColumns, selection: &Selection) -> Result<Self> {
        require_columns(self.dataset, &selection.referenced_columns(columns))?;
        let indices = self
            .indices
            .iter()
            .copied()
            .filter(|&i| selection.matches(&self.dataset.rows[i], columns))
            .collect();
        Ok(Self {
            dataset: self.dataset,
            indices,
        })
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn into_indices(self) -> Vec<usize> {
        self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a Record> + '_ {
        let dataset = self.dataset;
        self.indices.iter().map(move |&i| &dataset.rows[i])
    }

    /// Non-missing numeric values of `column` within the view.
    pub fn numeric_values(&self, column: &str) -> Vec<f64> {
        self.dataset.numeric_values(column, &self.indices)
    }
}

/// Return the rows of `dataset` where `State == state AND Crop == crop AND year ∈ years`.
///
/// Values not present in the dataset simply yield an empty view; a referenced
/// column missing from the dataset is a `SchemaMismatch`.
pub fn filter<'a>(
    dataset: &'a Dataset,
    columns: &FilterColumns,
    selection: &Selection,
) -> Result<FilteredView<'a>> {
    FilteredView::all(dataset).refine(columns, selection)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let rows = vec![
            Record::from_iter([
                ("State", Value::from("A")),
                ("Crop", Value::from("Rice")),
                ("year", Value::Integer(2020)),
                ("yield", Value::Integer(10)),
            ]),
            Record::from_iter([
                ("State", Value::from("A")),
                ("Crop", Value::from("Rice")),
                ("year", Value::Integer(2021)),
                ("yield", Value::Integer(20)),
            ]),
            Record::from_iter([
                ("State", Value::from("B")),
                ("Crop", Value::from("Rice")),
                ("year", Value::Integer(2020)),
                ("yield", Value::Integer(5)),
            ]),
        ];
        Dataset::from_records(
            vec!["State".into(), "Crop".into(), "year".into(), "yield".into()],
            rows,
        )
    }

    fn years(ys: &[i64]) -> Option<BTreeSet<Value>> {
        Some(ys.iter().map(|&y| Value::Integer(y)).collect())
    }

    fn select(state: &str, crop: &str, ys: &[i64]) -> Selection {
        Selection {
            state: Some(Value::from(state)),
            crop: Some(Value::from(crop)),
            years: years(ys),
        }
    }

    #[test]
    fn filters_by_state_crop_and_years() {
        let ds = sample();
        let view = filter(&ds, &FilterColumns::default(), &select("A", "Rice", &[2020, 2021])).unwrap();
        assert_eq!(view.indices(), &[0, 1]);
        for row in view.rows() {
            assert!(ds.rows.contains(row));
        }
    }

    #[test]
    fn all_years_equals_no_year_predicate() {
        let ds = sample();
        let cols = FilterColumns::default();
        let with_all = filter(&ds, &cols, &select("A", "Rice", &[2020, 2021])).unwrap();
        let mut no_years = select("A", "Rice", &[]);
        no_years.years = None;
        let without = filter(&ds, &cols, &no_years).unwrap();
        assert_eq!(with_all.indices(), without.indices());
    }

    #[test]
    fn empty_year_set_matches_nothing() {
        let ds = sample();
        let view = filter(&ds, &FilterColumns::default(), &select("A", "Rice", &[])).unwrap();
        assert!(view.is_empty());
    }

    #[test]
    fn unknown_state_yields_empty_view() {
        let ds = sample();
        let view = filter(&ds, &FilterColumns::default(), &select("Z", "Rice", &[2020])).unwrap();
        assert!(view.is_empty());
    }

    #[test]
    fn filter_is_idempotent() {
        let ds = sample();
        let cols = FilterColumns::default();
        let sel = select("A", "Rice", &[2020]);
        let once = filter(&ds, &cols, &sel).unwrap();
        let twice = once.refine(&cols, &sel).unwrap();
        assert_eq!(once.indices(), twice.indices());
    }

    #[test]
    fn missing_column_is_schema_mismatch() {
        let ds = sample();
        let cols = FilterColumns {
            year: "Year".to_string(),
            ..FilterColumns::default()
        };
        let err = filter(&ds, &cols, &select("A", "Rice", &[2020])).unwrap_err();
        assert_eq!(
            err,
            PipelineError::SchemaMismatch {
                column: "Year".to_string(),
                available: ds.column_names.clone(),
            }
        );
    }

    #[test]
    fn unreferenced_missing_column_is_ignored() {
        let ds = sample();
        let cols = FilterColumns {
            crop: "Crop_Type".to_string(),
            ..FilterColumns::default()
        };
        let sel = Selection {
            state: Some(Value::from("B")),
            ..Selection::default()
        };
        let view = filter(&ds, &cols, &sel).unwrap();
        assert_eq!(view.indices(), &[2]);
    }
}
