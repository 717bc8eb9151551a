use eframe::egui::{self, RichText, Ui};

use crate::state::AppState;

use super::error_label;

/// Yield predictor: one input per model feature and the point prediction.
pub fn predictor_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Yield Predictor");

    let model = match &state.model {
        Some(Ok(model)) => model.clone(),
        Some(Err(e)) => {
            error_label(ui, e);
            return;
        }
        None => {
            ui.label("No model fitted.");
            return;
        }
    };

    ui.label(format!(
        "Linear regression of {} on {} rows (intercept {:.4})",
        model.target(),
        model.samples(),
        model.intercept()
    ));

    egui::Grid::new("predictor_inputs")
        .num_columns(3)
        .striped(true)
        .show(ui, |ui: &mut Ui| {
            for (feature, coef) in model.features().iter().zip(model.coefficients()) {
                ui.label(feature);
                let value = state.predictor_inputs.entry(feature.clone()).or_insert(0.0);
                ui.add(egui::DragValue::new(value).speed(1.0));
                ui.label(RichText::new(format!("× {coef:.4}")).weak());
                ui.end_row();
            }
        });

    match state.prediction() {
        Some(Ok(y)) => {
            ui.label(RichText::new(format!("Predicted {}: {y:.2}", model.target())).strong());
        }
        Some(Err(e)) => error_label(ui, &e),
        None => {}
    }
}
