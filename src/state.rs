use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroUsize;

use crate::color::ColorMap;
use crate::config::DashboardConfig;
use crate::data::aggregate::{GroupedSeries, Reduced, Reduction};
use crate::data::error::PipelineError;
use crate::data::filter::Selection;
use crate::data::loader::Source;
use crate::data::model::Value;
use crate::data::regression::LinearModel;
use crate::data::request::{Request, Response};
use crate::data::session::Session;

// ---------------------------------------------------------------------------
// Widget settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    Line,
    Bar,
    Histogram,
    Scatter,
    Box,
    Heatmap,
}

impl PlotKind {
    pub const ALL: [PlotKind; 6] = [
        PlotKind::Line,
        PlotKind::Bar,
        PlotKind::Histogram,
        PlotKind::Scatter,
        PlotKind::Box,
        PlotKind::Heatmap,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PlotKind::Line => "Line Plot",
            PlotKind::Bar => "Bar Plot",
            PlotKind::Histogram => "Histogram",
            PlotKind::Scatter => "Scatter Plot",
            PlotKind::Box => "Box Plot",
            PlotKind::Heatmap => "Correlation Heatmap",
        }
    }

    /// Whether the plot reads the Y-axis column.
    pub fn uses_y(self) -> bool {
        !matches!(self, PlotKind::Histogram | PlotKind::Heatmap)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotSettings {
    pub kind: PlotKind,
    pub x_column: Option<String>,
    pub y_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationSettings {
    pub group_by: Option<String>,
    pub target: Option<String>,
    pub reduction: Reduction,
    pub top_n: usize,
}

/// Result of a recomputation, with the empty-selection state kept apart from errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Derived<T> {
    Empty,
    Ready(T),
    Failed(PipelineError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationOutcome {
    pub series: GroupedSeries,
    pub top: Vec<(Value, Reduced)>,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Loaded session (None until a load succeeds).
    pub session: Option<Session>,

    /// Fatal load failure; nothing else is rendered while set.
    pub load_error: Option<String>,

    /// Current state / crop / year selection.
    pub selection: Selection,

    /// Indices of rows passing the current selection (recomputed on every change).
    pub visible_indices: Vec<usize>,

    /// Error raised by the current selection (e.g. a missing column).
    pub selection_error: Option<PipelineError>,

    pub plot: PlotSettings,
    pub aggregation: AggregationSettings,
    pub aggregation_result: Derived<AggregationOutcome>,

    /// Yield predictor fitted once per session over the full dataset.
    pub model: Option<Result<LinearModel, PipelineError>>,
    pub predictor_inputs: BTreeMap<String, f64>,

    /// Colour per group key of the aggregation.
    pub color_map: Option<ColorMap>,

    pub show_dataset: bool,
    pub show_statistics: bool,
    pub show_predictor: bool,

    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        let top_n = config.top_n.max(1);
        Self {
            config,
            session: None,
            load_error: None,
            selection: Selection::default(),
            visible_indices: Vec::new(),
            selection_error: None,
            plot: PlotSettings {
                kind: PlotKind::Line,
                x_column: None,
                y_column: None,
            },
            aggregation: AggregationSettings {
                group_by: None,
                target: None,
                reduction: Reduction::Mean,
                top_n,
            },
            aggregation_result: Derived::Empty,
            model: None,
            predictor_inputs: BTreeMap::new(),
            color_map: None,
            show_dataset: true,
            show_statistics: false,
            show_predictor: false,
            status_message: None,
        }
    }

    /// Load a source with one blocking attempt. Failure is fatal for the session.
    pub fn load(&mut self, source: Source) {
        let result = Session::open(
            source,
            &self.config.load_options(),
            self.config.columns.clone(),
            &self.config.required_columns(),
        );
        match result {
            Ok(session) => self.set_session(session),
            Err(e) => {
                log::error!("Failed to load dataset: {e}");
                self.session = None;
                self.load_error = Some(e.to_string());
            }
        }
    }

    /// Ingest a newly loaded session: reset selectors, fit the predictor.
    pub fn set_session(&mut self, session: Session) {
        let dataset = session.dataset();
        let columns = session.columns();

        // Every year selected is no year predicate, so rows without a year stay in.
        self.selection = Selection::default();

        let numeric = dataset.numeric_columns();
        let first_measure = numeric.iter().find(|c| **c != columns.year).cloned();
        let year = dataset
            .has_column(&columns.year)
            .then(|| columns.year.clone());

        self.plot.x_column = year.clone().or_else(|| dataset.column_names.first().cloned());
        self.plot.y_column = first_measure.clone();
        self.aggregation.group_by = year;
        self.aggregation.target = first_measure;

        let predictor = &self.config.predictor;
        let fit = session.fit(&Selection::default(), &predictor.features, &predictor.target);
        if let Err(e) = &fit {
            log::warn!("Yield predictor unavailable: {e}");
        }
        self.model = Some(fit);
        self.predictor_inputs = predictor
            .features
            .iter()
            .filter(|f| dataset.is_numeric(f))
            .map(|f| {
                let values = dataset.numeric_values(f, &(0..dataset.len()).collect::<Vec<_>>());
                let mean = if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                };
                (f.clone(), mean)
            })
            .collect();

        self.session = Some(session);
        self.load_error = None;
        self.status_message = None;
        self.refresh();
    }

    /// Recompute every derived view from scratch after any widget change.
    pub fn refresh(&mut self) {
        let Some(session) = &self.session else {
            return;
        };

        match session.handle(&Request::Filter(self.selection.clone())) {
            Ok(Response::Rows(view)) => {
                self.visible_indices = view.into_indices();
                self.selection_error = None;
            }
            Ok(_) => {
                self.visible_indices.clear();
                self.selection_error = None;
            }
            Err(e) => {
                self.visible_indices.clear();
                self.selection_error = Some(e);
            }
        }

        self.aggregation_result = Self::run_aggregation(session, &self.selection, &self.aggregation);
        self.color_map = match (&self.aggregation.group_by, &self.aggregation_result) {
            (Some(col), Derived::Ready(outcome)) => {
                let keys: Vec<Value> = outcome.series.keys().cloned().collect();
                Some(ColorMap::new(col, &keys))
            }
            _ => None,
        };
    }

    fn run_aggregation(
        session: &Session,
        selection: &Selection,
        settings: &AggregationSettings,
    ) -> Derived<AggregationOutcome> {
        let (Some(group_by), Some(target)) = (&settings.group_by, &settings.target) else {
            return Derived::Empty;
        };
        let n = NonZeroUsize::new(settings.top_n).unwrap_or(NonZeroUsize::MIN);

        let series = match session.handle(&Request::Aggregate {
            selection: selection.clone(),
            group_by: group_by.clone(),
            target: target.clone(),
            reduction: settings.reduction,
        }) {
            Ok(Response::Series(series)) => series,
            Ok(_) => return Derived::Empty,
            Err(e) => return Derived::Failed(e),
        };
        let top = match session.handle(&Request::TopN {
            selection: selection.clone(),
            group_by: group_by.clone(),
            target: target.clone(),
            reduction: settings.reduction,
            n,
        }) {
            Ok(Response::Ranked(top)) => top,
            Ok(_) => Vec::new(),
            Err(e) => return Derived::Failed(e),
        };
        Derived::Ready(AggregationOutcome { series, top })
    }

    /// Point prediction from the current predictor inputs.
    pub fn prediction(&self) -> Option<Result<f64, PipelineError>> {
        match self.model.as_ref()? {
            Ok(model) => Some(model.predict(&self.predictor_inputs)),
            Err(e) => Some(Err(e.clone())),
        }
    }

    pub fn set_state(&mut self, state: Option<Value>) {
        self.selection.state = state;
        self.refresh();
    }

    pub fn set_crop(&mut self, crop: Option<Value>) {
        self.selection.crop = crop;
        self.refresh();
    }

    /// Toggle a single year. Leaving "every year" starts from the full set of
    /// distinct years, and collecting them all again drops the predicate.
    pub fn toggle_year(&mut self, year: &Value) {
        let all = self.all_years();
        let years = self
            .selection
            .years
            .get_or_insert_with(|| all.iter().cloned().collect());
        if !years.remove(year) {
            years.insert(year.clone());
        }
        if all.iter().all(|y| years.contains(y)) {
            self.selection.years = None;
        }
        self.refresh();
    }

    /// Select every year, including rows whose year is missing.
    pub fn select_all_years(&mut self) {
        self.selection.years = None;
        self.refresh();
    }

    /// Whether `year` passes the current year selection.
    pub fn year_selected(&self, year: &Value) -> bool {
        self.selection
            .years
            .as_ref()
            .map_or(true, |years| years.contains(year))
    }

    /// Distinct non-missing years of the loaded dataset.
    pub fn all_years(&self) -> Vec<Value> {
        self.session
            .as_ref()
            .map(|s| s.distinct(&s.columns().year))
            .unwrap_or_default()
    }

    /// Deselect every year.
    pub fn select_no_years(&mut self) {
        self.selection.years = Some(BTreeSet::new());
        self.refresh();
    }
}
