use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::state::AppState;
use crate::ui::{panels, plot, predictor, tables};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DashboardApp {
    pub state: AppState,
}

impl DashboardApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // A failed load renders nothing but the error.
        if let Some(err) = &self.state.load_error {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.centered_and_justified(|ui: &mut Ui| {
                    ui.label(
                        RichText::new(format!("Could not load the dataset.\n\n{err}"))
                            .color(Color32::RED)
                            .heading(),
                    );
                });
            });
            return;
        }

        if self.state.session.is_none() {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.centered_and_justified(|ui: &mut Ui| {
                    ui.heading("Open a dataset to begin  (File → Open…)");
                });
            });
            return;
        }

        // ---- Left side panel: selectors ----
        egui::SidePanel::left("selection_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: charts and tables ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| {
                    plot::main_chart(ui, &self.state);
                    ui.separator();
                    plot::aggregation_chart(ui, &self.state);
                    tables::aggregation_table(ui, &self.state);

                    if self.state.show_dataset {
                        ui.separator();
                        tables::dataset_table(ui, &self.state);
                    }
                    if self.state.show_statistics {
                        ui.separator();
                        tables::statistics_table(ui, &self.state);
                    }
                    if self.state.show_predictor {
                        ui.separator();
                        predictor::predictor_panel(ui, &mut self.state);
                    }
                });
        });
    }
}
