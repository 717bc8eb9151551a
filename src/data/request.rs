use std::num::NonZeroUsize;

use super::aggregate::{GroupedSeries, Reduced, Reduction};
use super::filter::{FilteredView, Selection};
use super::model::Value;
use super::regression::LinearModel;

/// One pipeline operation requested by the presentation layer.
///
/// Every variant carries its own selection; nothing is cached between
/// requests.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Filter(Selection),
    Aggregate {
        selection: Selection,
        group_by: String,
        target: String,
        reduction: Reduction,
    },
    TopN {
        selection: Selection,
        group_by: String,
        target: String,
        reduction: Reduction,
        n: NonZeroUsize,
    },
    /// Fit over the rows of `selection` (the default selection is the whole dataset).
    Fit {
        selection: Selection,
        features: Vec<String>,
        target: String,
    },
}

#[derive(Debug, Clone)]
pub enum Response<'a> {
    Rows(FilteredView<'a>),
    /// The selection matched no rows. Not an error.
    Empty,
    Series(GroupedSeries),
    Ranked(Vec<(Value, Reduced)>),
    Model(LinearModel),
}

impl Response<'_> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Response::Empty)
    }
}
