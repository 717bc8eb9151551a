use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::aggregate::Reduced;
use crate::data::filter::FilteredView;
use crate::data::stats::{describe, value_counts};
use crate::state::{AppState, Derived};

use super::{empty_label, error_label};

const ROW_HEIGHT: f32 = 18.0;
const MAX_TABLE_HEIGHT: f32 = 280.0;

/// Rows of the current selection.
pub fn dataset_table(ui: &mut Ui, state: &AppState) {
    let Some(session) = &state.session else {
        return;
    };
    let dataset = session.dataset();
    ui.heading("Dataset");
    if state.visible_indices.is_empty() {
        empty_label(ui);
        return;
    }

    let columns = &dataset.column_names;
    ui.push_id("dataset_table", |ui: &mut Ui| {
        egui::ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .columns(Column::auto().at_least(60.0), columns.len())
                .max_scroll_height(MAX_TABLE_HEIGHT)
                .header(ROW_HEIGHT + 4.0, |mut header| {
                    for col in columns {
                        header.col(|ui: &mut Ui| {
                            ui.strong(col);
                        });
                    }
                })
                .body(|body| {
                    body.rows(ROW_HEIGHT, state.visible_indices.len(), |mut row| {
                        let record = &dataset.rows[state.visible_indices[row.index()]];
                        for col in columns {
                            row.col(|ui: &mut Ui| {
                                ui.label(record.get(col).to_string());
                            });
                        }
                    });
                });
        });
    });
}

/// `describe()` of the numeric columns plus counts of a categorical column.
pub fn statistics_table(ui: &mut Ui, state: &AppState) {
    let Some(session) = &state.session else {
        return;
    };
    ui.heading("Descriptive Statistics");
    let view = FilteredView::from_indices(session.dataset(), state.visible_indices.clone());
    if view.is_empty() {
        empty_label(ui);
        return;
    }

    let summaries = describe(&view);
    if summaries.is_empty() {
        ui.label("No numeric columns in the selection.");
    } else {
        let header = ["column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"];
        ui.push_id("describe_table", |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .columns(Column::auto().at_least(60.0), header.len())
                .header(ROW_HEIGHT + 4.0, |mut row| {
                    for h in header {
                        row.col(|ui: &mut Ui| {
                            ui.strong(h);
                        });
                    }
                })
                .body(|mut body| {
                    for s in &summaries {
                        body.row(ROW_HEIGHT, |mut row| {
                            row.col(|ui: &mut Ui| {
                                ui.label(&s.column);
                            });
                            row.col(|ui: &mut Ui| {
                                ui.label(s.count.to_string());
                            });
                            for v in [s.mean, s.std, s.min, s.q25, s.median, s.q75, s.max] {
                                row.col(|ui: &mut Ui| {
                                    ui.label(format_number(v));
                                });
                            }
                        });
                    }
                });
        });
    }

    // Counts of the first categorical column that is not a selector.
    let columns = session.columns();
    let categorical = session.dataset().categorical_columns();
    let Some(column) = categorical
        .iter()
        .find(|c| **c != columns.state && **c != columns.crop)
        .or_else(|| categorical.first())
    else {
        return;
    };
    ui.add_space(8.0);
    ui.strong(format!("Value counts of {column}"));
    match value_counts(&view, column) {
        Ok(counts) => {
            ui.push_id("value_counts", |ui: &mut Ui| {
                egui::Grid::new("value_counts_grid").striped(true).show(ui, |ui: &mut Ui| {
                    for (value, count) in counts.iter().take(20) {
                        ui.label(value.to_string());
                        ui.label(count.to_string());
                        ui.end_row();
                    }
                });
            });
        }
        Err(e) => error_label(ui, &e),
    }
}

/// Grouped series and its top-N ranking.
pub fn aggregation_table(ui: &mut Ui, state: &AppState) {
    let Derived::Ready(outcome) = &state.aggregation_result else {
        return;
    };
    ui.strong(format!("Top {}", state.aggregation.top_n));
    ui.push_id("top_n_table", |ui: &mut Ui| {
        egui::Grid::new("top_n_grid").striped(true).show(ui, |ui: &mut Ui| {
            for (rank, (key, value)) in outcome.top.iter().enumerate() {
                ui.label(format!("{}.", rank + 1));
                ui.label(RichText::new(key.to_string()).strong());
                match value {
                    Reduced::Value(v) => ui.label(format_number(*v)),
                    Reduced::NoData => ui.weak("no data"),
                };
                ui.end_row();
            }
        });
    });
}

fn format_number(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.4}")
    }
}

#[cfg(test)]
mod tests {
    use super::format_number;

    #[test]
    fn numbers_drop_trailing_zeros_for_integers() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(2.5), "2.5000");
        assert_eq!(format_number(f64::NAN), "NaN");
    }
}
