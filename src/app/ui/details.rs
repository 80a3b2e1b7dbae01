use eframe::egui::{RichText, Ui};

use crate::corpus::LinkGraph;
use crate::matrix::folder_color;
use crate::util::folder_label;

use super::super::ViewModel;
use super::super::interaction::HoverState;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Details");
        ui.add_space(6.0);

        ui.label(RichText::new("Hovered link").strong());
        match &self.hover {
            HoverState::Visible { label, .. } => {
                ui.label(label.as_str());
            }
            HoverState::Hidden => {
                ui.label("Point at a filled cell to see the link it stands for.");
            }
        }

        ui.separator();

        let Some(selected) = self.selected else {
            ui.label("Click a link or search for a document to select it.");
            return;
        };

        let graph = &self.vis.graph;
        let Some(document) = graph.documents().get(selected) else {
            ui.label("Selected document no longer exists in the vault snapshot.");
            return;
        };

        ui.label(RichText::new(document.display_name.as_str()).strong());
        ui.small(document.path.as_str());
        ui.add_space(6.0);

        ui.label(format!("Index: {selected}"));
        ui.label(format!("Outgoing links: {}", graph.outgoing_count(selected)));
        ui.label(format!("Incoming links: {}", graph.incoming_count(selected)));
        ui.label(format!("Activity: {:.2}", self.vis.activity.get(selected)));

        ui.separator();
        ui.label(RichText::new("Folder squares").strong());
        let mut any = false;
        for square in self.vis.squares.containing(selected) {
            any = true;
            let folder = graph
                .documents()
                .get(square.start)
                .map(|first| folder_label(&first.path, square.depth))
                .unwrap_or_default();
            ui.label(
                RichText::new(format!(
                    "depth {}: {folder}  (documents {}..={}, {} total)",
                    square.depth,
                    square.start,
                    square.end,
                    square.len()
                ))
                .color(folder_color(square.depth)),
            );
        }
        if !any {
            ui.label("Not inside any folder square.");
        }

        if ui.button("Clear selection").clicked() {
            self.set_selected(None);
        }
    }
}
