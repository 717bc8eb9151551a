pub mod panels;
pub mod plot;
pub mod predictor;
pub mod tables;

use eframe::egui::{Color32, RichText, Ui};

use crate::data::error::PipelineError;

/// Show a pipeline error the way the dashboard words it to users.
pub fn error_label(ui: &mut Ui, error: &PipelineError) {
    let text = if error.is_insufficient_data() {
        format!("Not enough data: {error}")
    } else {
        error.to_string()
    };
    ui.label(RichText::new(text).color(Color32::RED));
}

/// Explicit empty-result state, distinct from errors.
pub fn empty_label(ui: &mut Ui) {
    ui.label(RichText::new("No rows match the current selection.").italics());
}
