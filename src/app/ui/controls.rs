use eframe::egui::{self, Key, Response, Ui};
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::corpus::LinkGraph;
use crate::util::fuzzy_match_score;

use super::super::ViewModel;

const SLIDER_KEY_BASE_RATE: f32 = 10.0;
const SLIDER_KEY_ACCEL_PER_SEC: f32 = 9.0;
const SLIDER_KEY_ACCEL_MAX: f32 = 40.0;
const SEARCH_RESULT_LIMIT: usize = 40;
/// Slider bounds, kept inside what `Smoothing::is_valid` accepts.
const SMOOTHING_ACCEL_RANGE: (f32, f32) = (0.05, 1.5);
const SMOOTHING_DRAG_RANGE: (f32, f32) = (0.05, 0.95);

/// How long an arrow key has been held on a slider, and in which direction.
#[derive(Clone, Copy, Default)]
struct SliderKeyHold {
    direction: i8,
    secs: f32,
}

impl SliderKeyHold {
    /// The hold after another frame with `direction` pressed. Reversing starts over.
    fn next(self, direction: i8, delta_time: f32) -> Self {
        let secs = if self.direction == direction { self.secs } else { 0.0 };
        Self {
            direction,
            secs: secs + delta_time,
        }
    }
}

fn slider_key_accel_multiplier(hold_secs: f32) -> f32 {
    let ramp = hold_secs * SLIDER_KEY_ACCEL_PER_SEC;
    (1.0 + ramp + ramp * ramp * 0.15).min(SLIDER_KEY_ACCEL_MAX)
}

/// Arrow keys held on a focused slider move it faster the longer they are held.
fn apply_slider_arrow_acceleration(
    ui: &Ui,
    response: &Response,
    value: &mut f32,
    min: f32,
    max: f32,
) -> bool {
    let state_id = response.id.with("arrow_key_hold");
    let (delta_time, direction) = ui.input(|input| {
        let up = input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp);
        let down = input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown);
        (input.stable_dt.min(0.1), up as i8 - down as i8)
    });

    if !response.has_focus() || direction == 0 {
        ui.ctx().data_mut(|data| data.remove::<SliderKeyHold>(state_id));
        return false;
    }

    let hold = ui
        .ctx()
        .data(|data| data.get_temp::<SliderKeyHold>(state_id))
        .unwrap_or_default()
        .next(direction, delta_time);
    ui.ctx().data_mut(|data| data.insert_temp(state_id, hold));

    let step = ((max - min) / 200.0).max(0.0005);
    let speed = SLIDER_KEY_BASE_RATE * slider_key_accel_multiplier(hold.secs);
    let old_value = *value;
    *value = (*value + direction as f32 * step * speed * delta_time).clamp(min, max);
    ui.ctx().request_repaint();
    (*value - old_value).abs() > f32::EPSILON
}

/// Adds a tuning slider with arrow-key acceleration.
fn tuning_slider(ui: &mut Ui, value: &mut f32, min: f32, max: f32, text: &str, hover: &str) -> SliderChange {
    let response = ui
        .add(
            egui::Slider::new(&mut *value, min..=max)
                .text(text)
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text(hover);
    if response.hovered() {
        response.request_focus();
    }

    let keyed = apply_slider_arrow_acceleration(ui, &response, value, min, max);
    SliderChange {
        changed: response.changed() || keyed,
        settled: !response.dragged() && (response.changed() || keyed || response.drag_stopped()),
    }
}

#[derive(Clone, Copy)]
struct SliderChange {
    changed: bool,
    /// The value is not being dragged anymore, so expensive work may run.
    settled: bool,
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Matrix Controls");
        ui.separator();
        ui.add_space(4.0);

        if ui
            .checkbox(&mut self.show_folder_overlay, "Folder squares")
            .on_hover_text("Outline the documents of every folder, colored by depth.")
            .changed()
        {
            self.render_dirty = true;
        }

        ui.collapsing("Link opacity", |ui| {
            let gain = tuning_slider(
                ui,
                &mut self.alpha.gain,
                0.05,
                1.0,
                "Gain",
                "How much a row's link activity adds to its opacity.",
            );
            let offset = tuning_slider(
                ui,
                &mut self.alpha.offset,
                0.0,
                1.0,
                "Offset",
                "Opacity of links from the least active documents.",
            );
            if gain.settled || offset.settled {
                self.render_dirty = true;
            }
            if ui.button("Restore defaults").clicked() {
                self.alpha = self.config.alpha;
                self.render_dirty = true;
            }
        });

        ui.collapsing("Camera smoothing", |ui| {
            let accel = tuning_slider(
                ui,
                &mut self.smoothing.accel,
                SMOOTHING_ACCEL_RANGE.0,
                SMOOTHING_ACCEL_RANGE.1,
                "Acceleration",
                "How strongly the camera is pulled toward its target.",
            );
            let drag = tuning_slider(
                ui,
                &mut self.smoothing.drag,
                SMOOTHING_DRAG_RANGE.0,
                SMOOTHING_DRAG_RANGE.1,
                "Drag",
                "How much of the camera's speed is lost every tick.",
            );
            if accel.changed || drag.changed {
                self.apply_smoothing();
            }
        });

        ui.separator();
        ui.label("Search documents")
            .on_hover_text("Fuzzy match against document names, then click one to select it.");
        ui.text_edit_singleline(&mut self.search);
        self.draw_search_results(ui);
    }

    /// Hands the slider values to the camera, falling back to the last
    /// accepted constants when they would stall it.
    pub(in crate::app) fn apply_smoothing(&mut self) {
        let accepted = match self.viewport.as_mut() {
            Some(viewport) => viewport.set_smoothing(self.smoothing),
            None => self.smoothing.is_valid(),
        };
        if !accepted {
            self.smoothing = self.config.smoothing;
            if let Some(viewport) = self.viewport.as_mut() {
                viewport.set_smoothing(self.smoothing);
            }
        }
    }

    fn draw_search_results(&mut self, ui: &mut Ui) {
        let query = self.search.trim();
        if query.is_empty() {
            return;
        }

        let matcher = SkimMatcherV2::default();
        let mut matches = self
            .vis
            .graph
            .documents()
            .iter()
            .filter_map(|document| {
                fuzzy_match_score(&matcher, &document.display_name, query)
                    .map(|score| (score, document.index))
            })
            .collect::<Vec<_>>();
        matches.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        if matches.is_empty() {
            ui.label("No matching documents.");
            return;
        }

        let total = matches.len();
        let mut clicked = None;
        egui::ScrollArea::vertical()
            .id_salt("search_results_scroll")
            .max_height(360.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for &(_, index) in matches.iter().take(SEARCH_RESULT_LIMIT) {
                    let Some(document) = self.vis.graph.documents().get(index) else {
                        continue;
                    };
                    let selected = self.selected == Some(index);
                    if ui
                        .selectable_label(selected, document.display_name.as_str())
                        .on_hover_text(document.path.as_str())
                        .clicked()
                    {
                        clicked = Some(index);
                    }
                }
            });
        if total > SEARCH_RESULT_LIMIT {
            ui.small(format!("{} more matches", total - SEARCH_RESULT_LIMIT));
        }

        if let Some(index) = clicked {
            self.set_selected(Some(index));
        }
    }
}
