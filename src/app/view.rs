use eframe::egui::{
    Align2, Color32, Context, FontId, PointerButton, Rect, Sense, Stroke, TextureOptions, Ui,
    pos2, vec2,
};
use tracing::{debug, info, warn};

use crate::util::open_document;

use super::interaction::{HoverState, NavigationRequest, click_target, hover_state};
use super::viewport::ViewportController;
use super::{Notice, ViewModel};

const HIGHLIGHT_FILL: Color32 = Color32::from_rgba_premultiplied(40, 40, 40, 40);
const HOVER_STROKE: Color32 = Color32::from_gray(240);

impl ViewModel {
    /// Repaints the cached raster if an overlay or alpha setting changed.
    pub(in crate::app) fn apply_render_changes(&mut self) {
        if !self.render_dirty {
            return;
        }
        self.render_dirty = false;

        self.vis.rerender(self.render_options());
        if let Some(texture) = self.texture.as_mut() {
            texture.set(self.vis.raster.to_color_image(), TextureOptions::NEAREST);
        }
        debug!("matrix raster repainted");
    }

    fn ensure_texture(&mut self, ctx: &Context) {
        self.apply_render_changes();
        if self.texture.is_none() {
            self.texture = Some(ctx.load_texture(
                "adjacency_matrix",
                self.vis.raster.to_color_image(),
                TextureOptions::NEAREST,
            ));
        }
    }

    pub(in crate::app) fn draw_matrix(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, self.vis.options.background);

        if self.vis.raster.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No markdown documents in this vault",
                FontId::proportional(16.0),
                Color32::from_gray(180),
            );
            return;
        }

        let max_side = ui.input(|input| input.max_texture_side);
        let raster_side = self.vis.raster.width().max(self.vis.raster.height());
        if raster_side > max_side {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                format!(
                    "The matrix is {raster_side}px wide, above the {max_side}px texture limit.\n\
                     Lower cell_scale or use Save image."
                ),
                FontId::proportional(15.0),
                Color32::from_gray(200),
            );
            return;
        }

        self.ensure_texture(ui.ctx());

        let now = ui.input(|input| input.time);
        let raster_size = vec2(self.vis.raster.width() as f32, self.vis.raster.height() as f32);
        let smoothing = self.smoothing;
        let viewport = self
            .viewport
            .get_or_insert_with(|| ViewportController::open(rect, raster_size, smoothing, now));
        if !viewport.is_running() {
            return;
        }
        viewport.set_view_rect(rect);

        if response.dragged_by(PointerButton::Primary) {
            viewport.drag_by(response.drag_delta());
        }

        if response.hovered() {
            let scroll = ui.input(|input| input.raw_scroll_delta.y);
            if scroll.abs() > f32::EPSILON
                && let Some(pointer) = response.hover_pos()
            {
                viewport.zoom_at(pointer, if scroll > 0.0 { 1 } else { -1 });
            }
        }

        if response.clicked_by(PointerButton::Secondary) {
            viewport.reset();
        }

        viewport.advance(now);

        let cell_scale = self.vis.cell_scale();
        let sample = match response.hover_pos() {
            Some(pointer) => self.coalescer.offer(pointer, now),
            None => {
                self.coalescer.clear();
                self.hover = HoverState::Hidden;
                None
            }
        };
        if let Some(pointer) = sample {
            self.hover = hover_state(
                viewport.inverse(),
                pointer,
                cell_scale,
                &self.vis.matrix,
                &self.vis.graph.documents,
            );
        }

        let navigation = if response.clicked_by(PointerButton::Primary) {
            response
                .interact_pointer_pos()
                .and_then(|pointer| click_target(viewport.inverse(), pointer, cell_scale, &self.vis.matrix))
        } else {
            None
        };

        if let Some(texture) = &self.texture {
            painter.image(
                texture.id(),
                viewport.raster_rect(),
                Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        let forward = viewport.forward();
        let side = raster_size.x;
        if let Some(selected) = self.selected {
            let offset = selected as f32 * cell_scale;
            let column = Rect::from_min_size(pos2(offset, 0.0), vec2(cell_scale, side));
            let row = Rect::from_min_size(pos2(0.0, offset), vec2(side, cell_scale));
            painter.rect_filled(forward.apply_rect(column), 0.0, HIGHLIGHT_FILL);
            painter.rect_filled(forward.apply_rect(row), 0.0, HIGHLIGHT_FILL);
        }

        if let HoverState::Visible { from, to, label } = &self.hover {
            let cell = Rect::from_min_size(
                pos2(*from as f32 * cell_scale, *to as f32 * cell_scale),
                vec2(cell_scale, cell_scale),
            );
            let cell = forward.apply_rect(cell);
            let stroke = Stroke::new(1.0, HOVER_STROKE);
            painter.line_segment([cell.left_top(), cell.right_top()], stroke);
            painter.line_segment([cell.right_top(), cell.right_bottom()], stroke);
            painter.line_segment([cell.right_bottom(), cell.left_bottom()], stroke);
            painter.line_segment([cell.left_bottom(), cell.left_top()], stroke);

            if let Some(pointer) = response.hover_pos() {
                painter.text(
                    pointer + vec2(14.0, 14.0),
                    Align2::LEFT_TOP,
                    label,
                    FontId::proportional(13.0),
                    HOVER_STROKE,
                );
            }
        }

        if !viewport.is_settled() || self.coalescer.has_pending() {
            ui.ctx().request_repaint_after(viewport.tick_interval());
        }

        if let Some(request) = navigation {
            self.navigate(request);
        }
    }

    fn navigate(&mut self, request: NavigationRequest) {
        self.set_selected(Some(request.document));

        let Some(command) = self.config.open_command.as_deref() else {
            return;
        };
        let Some(path) = self.vis.graph.absolute_path(request.document) else {
            return;
        };

        match open_document(command, &path) {
            Ok(()) => info!(path = %path.display(), "opened document"),
            Err(error) => {
                warn!(path = %path.display(), error = %format!("{error:#}"), "failed to open document");
                self.notice = Some(Notice::Error(format!("{error:#}")));
            }
        }
    }
}
