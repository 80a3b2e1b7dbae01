use std::path::Path;

use chrono::Local;
use eframe::egui::{self, Align, Color32, Context, Layout, RichText};
use tracing::{info, warn};

use crate::config::MatrixConfig;
use crate::corpus::LinkGraph;
use crate::export::{ExportTarget, save_png};
use crate::matrix::RenderOptions;
use crate::visualize::Visualization;

use super::super::interaction::{HOVER_WINDOW_SECS, HoverState, PointerCoalescer};
use super::super::{Notice, ViewModel};

impl ViewModel {
    pub(in crate::app) fn new(vis: Visualization, config: MatrixConfig) -> Self {
        Self {
            show_folder_overlay: vis.options.folder_overlay,
            alpha: vis.options.alpha,
            smoothing: config.smoothing,
            vis,
            config,
            texture: None,
            viewport: None,
            coalescer: PointerCoalescer::new(HOVER_WINDOW_SECS),
            hover: HoverState::Hidden,
            selected: None,
            search: String::new(),
            notice: None,
            render_dirty: false,
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        vault: &Path,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("vault-matrix");
                    ui.separator();
                    ui.label(format!("vault: {}", vault.display()));
                    ui.label(format!("documents: {}", self.vis.graph.document_count()));
                    ui.label(format!("links: {}", self.vis.matrix.link_count()));

                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload vault"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if ui
                        .add_enabled(self.viewport.is_some(), egui::Button::new("Reset view"))
                        .on_hover_text("Fit the whole matrix into the view again.")
                        .clicked()
                        && let Some(viewport) = self.viewport.as_mut()
                    {
                        viewport.reset();
                    }
                    if ui
                        .add_enabled(!self.vis.raster.is_empty(), egui::Button::new("Save image"))
                        .on_hover_text("Write the matrix as a PNG into the export folder.")
                        .clicked()
                    {
                        self.save_image();
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if is_loading {
                            ui.spinner();
                            ui.label("reloading...");
                        }
                        if let Some(viewport) = &self.viewport {
                            ui.label(format!("zoom: {:.0}%", viewport.chased_scale() * 100.0));
                        }
                    });
                });
            });

        if self.notice.is_some() {
            egui::TopBottomPanel::bottom("notice")
                .resizable(false)
                .show(ctx, |ui| self.draw_notice(ui));
        }

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_matrix(ui));
    }

    fn draw_notice(&mut self, ui: &mut egui::Ui) {
        let Some(notice) = &self.notice else {
            return;
        };

        let mut dismissed = false;
        ui.horizontal(|ui| {
            match notice {
                Notice::Info(text) => {
                    ui.label(text.as_str());
                }
                Notice::Error(text) => {
                    ui.label(RichText::new(text.as_str()).color(Color32::from_rgb(235, 110, 95)));
                }
            }
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                dismissed = ui.small_button("Dismiss").clicked();
            });
        });

        if dismissed {
            self.notice = None;
        }
    }

    pub(in crate::app) fn set_selected(&mut self, selected: Option<usize>) {
        if self.selected == selected {
            return;
        }

        self.selected = selected.filter(|&index| index < self.vis.graph.document_count());
    }

    pub(in crate::app) fn close_viewport(&mut self) {
        if let Some(viewport) = self.viewport.as_mut() {
            viewport.close();
        }
        self.coalescer.clear();
        self.hover = HoverState::Hidden;
    }

    /// The loaded configuration with the panel's current tuning applied, so a
    /// reload keeps what was adjusted here.
    pub(in crate::app) fn live_config(&self) -> MatrixConfig {
        MatrixConfig {
            show_folder_overlay: self.show_folder_overlay,
            alpha: self.alpha,
            smoothing: self.smoothing,
            ..self.config.clone()
        }
    }

    pub(in crate::app) fn render_options(&self) -> RenderOptions {
        RenderOptions {
            folder_overlay: self.show_folder_overlay,
            alpha: self.alpha,
            ..self.vis.options
        }
    }

    fn save_image(&mut self) {
        self.apply_render_changes();

        let target = ExportTarget {
            vault_root: &self.vis.graph.root,
            folder: &self.config.export_folder_path,
            name_prefix: &self.config.export_name_prefix,
        };

        self.notice = Some(match save_png(&self.vis.raster, &target, Local::now()) {
            Ok(path) => {
                info!(path = %path.display(), "exported matrix image");
                Notice::Info(format!("Saved {}", path.display()))
            }
            Err(error) => {
                warn!(%error, "matrix export failed");
                Notice::Error(format!("Could not save image: {error}"))
            }
        });
    }
}

#[cfg(test)]
pub(in crate::app) mod tests {
    use std::fs;
    use std::ops::ControlFlow;

    use super::*;
    use crate::config::Smoothing;
    use crate::matrix::AlphaMapping;
    use crate::visualize::build_visualization;

    pub(in crate::app) fn model(config: MatrixConfig) -> (tempfile::TempDir, ViewModel) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("x")).unwrap();
        fs::write(dir.path().join("x/a.md"), "[[b]]").unwrap();
        fs::write(dir.path().join("b.md"), "[[a]]").unwrap();

        let vis = build_visualization(dir.path(), &config, |_| ControlFlow::Continue(()))
            .unwrap()
            .unwrap();
        (dir, ViewModel::new(vis, config))
    }

    #[test]
    fn reload_config_keeps_panel_tuning() {
        let (dir, mut model) = model(MatrixConfig::default());
        model.show_folder_overlay = false;
        model.alpha = AlphaMapping {
            gain: 0.4,
            offset: 0.5,
        };
        model.smoothing = Smoothing {
            accel: 0.6,
            drag: 0.3,
        };

        let config = model.live_config();
        assert!(!config.show_folder_overlay);
        assert_eq!(config.alpha, model.alpha);
        assert_eq!(config.smoothing, model.smoothing);
        assert_eq!(config.export_name_prefix, "adj");

        let vis = build_visualization(dir.path(), &config, |_| ControlFlow::Continue(()))
            .unwrap()
            .unwrap();
        let reloaded = ViewModel::new(vis, config);
        assert!(!reloaded.show_folder_overlay);
        assert_eq!(reloaded.alpha, model.alpha);
        assert_eq!(reloaded.smoothing, model.smoothing);
        assert_eq!(reloaded.vis.options, reloaded.render_options());
    }
}
