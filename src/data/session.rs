use super::aggregate::{aggregate, top_n};
use super::error::Result;
use super::filter::{filter, require_columns, FilterColumns, FilteredView, Selection};
use super::loader::{self, LoadOptions, Source};
use super::model::{Dataset, Value};
use super::regression::LinearModel;
use super::request::{Request, Response};

// ---------------------------------------------------------------------------
// Session – one loaded dataset and the columns its selectors use
// ---------------------------------------------------------------------------

/// Owns the dataset snapshot for one dashboard session. Read-only after
/// construction; every request is answered from scratch.
#[derive(Debug, Clone)]
pub struct Session {
    source: Source,
    dataset: Dataset,
    columns: FilterColumns,
}

impl Session {
    /// Load the dataset once and check that `required` columns exist.
    pub fn open(
        source: Source,
        options: &LoadOptions,
        columns: FilterColumns,
        required: &[String],
    ) -> Result<Self> {
        let dataset = loader::load(&source, options)?;
        Self::from_dataset(source, dataset, columns, required)
    }

    /// Wrap an already-loaded dataset, validating `required` columns.
    pub fn from_dataset(
        source: Source,
        dataset: Dataset,
        columns: FilterColumns,
        required: &[String],
    ) -> Result<Self> {
        let required: Vec<&str> = required.iter().map(String::as_str).collect();
        if let Err(e) = require_columns(&dataset, &required) {
            log::warn!("Schema check failed for {source}: {e}");
            return Err(e);
        }
        Ok(Self {
            source,
            dataset,
            columns,
        })
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn columns(&self) -> &FilterColumns {
        &self.columns
    }

    /// Distinct non-null values of a column, for selector widgets.
    pub fn distinct(&self, column: &str) -> Vec<Value> {
        self.dataset.distinct(column)
    }

    /// Validate user-chosen columns before an operation uses them.
    pub fn require(&self, columns: &[&str]) -> Result<()> {
        require_columns(&self.dataset, columns)
    }

    pub fn filter(&self, selection: &Selection) -> Result<FilteredView<'_>> {
        filter(&self.dataset, &self.columns, selection)
    }

    /// Single entry point for the presentation layer.
    pub fn handle(&self, request: &Request) -> Result<Response<'_>> {
        match request {
            Request::Filter(selection) => {
                let view = self.filter(selection)?;
                Ok(if view.is_empty() {
                    Response::Empty
                } else {
                    Response::Rows(view)
                })
            }
            Request::Aggregate {
                selection,
                group_by,
                target,
                reduction,
            } => {
                self.require(&[group_by.as_str(), target.as_str()])?;
                let view = self.filter(selection)?;
                if view.is_empty() {
                    return Ok(Response::Empty);
                }
                Ok(Response::Series(aggregate(&view, group_by, target, *reduction)?))
            }
            Request::TopN {
                selection,
                group_by,
                target,
                reduction,
                n,
            } => {
                self.require(&[group_by.as_str(), target.as_str()])?;
                let view = self.filter(selection)?;
                if view.is_empty() {
                    return Ok(Response::Empty);
                }
                let series = aggregate(&view, group_by, target, *reduction)?;
                Ok(Response::Ranked(top_n(&series, *n)))
            }
            Request::Fit {
                selection,
                features,
                target,
            } => Ok(Response::Model(self.fit(selection, features, target)?)),
        }
    }

    /// Fit `target` on `features` over the rows passing `selection`.
    pub fn fit(
        &self,
        selection: &Selection,
        features: &[String],
        target: &str,
    ) -> Result<LinearModel> {
        let view = self.filter(selection)?;
        LinearModel::fit(&view, features, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::{Reduced, Reduction};
    use crate::data::error::PipelineError;
    use crate::data::loader::read_csv;
    use std::num::NonZeroUsize;

    const CSV: &str = "State,Crop,year,Yield,Annual_rainfall\n\
                       A,Rice,2020,10,100\n\
                       A,Rice,2021,20,210\n\
                       B,Rice,2020,5,40\n\
                       A,Wheat,2020,7,80\n";

    fn session() -> Session {
        let dataset = read_csv(CSV.as_bytes(), "inline").unwrap();
        Session::from_dataset(
            Source::Url("inline".to_string()),
            dataset,
            FilterColumns::default(),
            &["State".to_string(), "Crop".to_string(), "year".to_string()],
        )
        .unwrap()
    }

    fn rice_in(state: &str) -> Selection {
        Selection {
            state: Some(Value::from(state)),
            crop: Some(Value::from("Rice")),
            years: None,
        }
    }

    #[test]
    fn missing_required_column_fails_at_start() {
        let dataset = read_csv(CSV.as_bytes(), "inline").unwrap();
        let err = Session::from_dataset(
            Source::Url("inline".to_string()),
            dataset,
            FilterColumns::default(),
            &["MGNREGA_Demand".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
    }

    #[test]
    fn filter_request_returns_rows_or_empty() {
        let s = session();
        match s.handle(&Request::Filter(rice_in("A"))).unwrap() {
            Response::Rows(view) => assert_eq!(view.indices(), &[0, 1]),
            other => panic!("unexpected {other:?}"),
        }
        assert!(s.handle(&Request::Filter(rice_in("Z"))).unwrap().is_empty());
    }

    #[test]
    fn aggregate_request_groups_filtered_rows() {
        let s = session();
        let request = Request::Aggregate {
            selection: rice_in("A"),
            group_by: "year".to_string(),
            target: "Yield".to_string(),
            reduction: Reduction::Mean,
        };
        let Response::Series(series) = s.handle(&request).unwrap() else {
            panic!("expected a series");
        };
        assert_eq!(series[&Value::Integer(2020)], Reduced::Value(10.0));
        assert_eq!(series[&Value::Integer(2021)], Reduced::Value(20.0));
    }

    #[test]
    fn aggregate_request_checks_columns_even_when_empty() {
        let s = session();
        let request = Request::Aggregate {
            selection: rice_in("Z"),
            group_by: "year".to_string(),
            target: "MGNREGA_Demand".to_string(),
            reduction: Reduction::Sum,
        };
        assert!(matches!(
            s.handle(&request),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn top_n_request_ranks_states() {
        let s = session();
        let request = Request::TopN {
            selection: Selection::default(),
            group_by: "State".to_string(),
            target: "Yield".to_string(),
            reduction: Reduction::Sum,
            n: NonZeroUsize::new(1).unwrap(),
        };
        let Response::Ranked(ranked) = s.handle(&request).unwrap() else {
            panic!("expected a ranking");
        };
        assert_eq!(ranked, vec![(Value::from("A"), Reduced::Value(37.0))]);
    }

    #[test]
    fn fit_request_over_whole_dataset() {
        let s = session();
        let request = Request::Fit {
            selection: Selection::default(),
            features: vec!["Annual_rainfall".to_string()],
            target: "Yield".to_string(),
        };
        let Response::Model(model) = s.handle(&request).unwrap() else {
            panic!("expected a model");
        };
        assert_eq!(model.samples(), 4);
        assert_eq!(model.features(), &["Annual_rainfall".to_string()]);
    }

    #[test]
    fn fit_reports_the_rows_it_actually_had() {
        let s = session();
        let features = vec!["Annual_rainfall".to_string()];
        assert_eq!(
            s.fit(&rice_in("B"), &features, "Yield").unwrap_err(),
            PipelineError::InsufficientData {
                operation: "regression",
                needed: 2,
                found: 1,
            }
        );
        let model = s.fit(&rice_in("A"), &features, "Yield").unwrap();
        assert_eq!(model.samples(), 2);
        assert!((model.coefficients()[0] - 10.0 / 110.0).abs() < 1e-9);
    }
}
