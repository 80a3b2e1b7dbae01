use eframe::egui::Pos2;

use crate::corpus::Document;
use crate::matrix::AdjacencyMatrix;

use super::viewport::ViewTransform;

/// Pointer samples closer together than this are coalesced.
pub(crate) const HOVER_WINDOW_SECS: f64 = 0.025;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum HoverState {
    #[default]
    Hidden,
    Visible {
        from: usize,
        to: usize,
        label: String,
    },
}

/// Request to open the source document of a clicked link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct NavigationRequest {
    pub document: usize,
}

/// Signed cell indices under a screen point; `i` runs along x, `j` along y.
///
/// Uses the `round(v / scale - 0.5)` cell-center addressing, so the result
/// can be negative or past the matrix edge.
pub(crate) fn cell_at(inverse: ViewTransform, pointer: Pos2, cell_scale: f32) -> Option<(i64, i64)> {
    if cell_scale.is_nan() || cell_scale <= 0.0 {
        return None;
    }

    let raster = inverse.apply(pointer);
    let i = (raster.x / cell_scale - 0.5).round();
    let j = (raster.y / cell_scale - 0.5).round();
    (i.is_finite() && j.is_finite()).then_some((i as i64, j as i64))
}

/// The linked cell under the pointer, if there is one.
pub(crate) fn linked_cell(
    inverse: ViewTransform,
    pointer: Pos2,
    cell_scale: f32,
    matrix: &AdjacencyMatrix,
) -> Option<(usize, usize)> {
    let (i, j) = cell_at(inverse, pointer, cell_scale)?;
    let from = usize::try_from(i).ok()?;
    let to = usize::try_from(j).ok()?;
    matrix.get(from, to).then_some((from, to))
}

pub(crate) fn hover_state(
    inverse: ViewTransform,
    pointer: Pos2,
    cell_scale: f32,
    matrix: &AdjacencyMatrix,
    documents: &[Document],
) -> HoverState {
    let Some((from, to)) = linked_cell(inverse, pointer, cell_scale, matrix) else {
        return HoverState::Hidden;
    };
    let (Some(source), Some(target)) = (documents.get(from), documents.get(to)) else {
        return HoverState::Hidden;
    };

    HoverState::Visible {
        from,
        to,
        label: link_label(source, target),
    }
}

/// Clicking a link always navigates to its source document.
pub(crate) fn click_target(
    inverse: ViewTransform,
    pointer: Pos2,
    cell_scale: f32,
    matrix: &AdjacencyMatrix,
) -> Option<NavigationRequest> {
    linked_cell(inverse, pointer, cell_scale, matrix).map(|(from, _)| NavigationRequest { document: from })
}

pub(crate) fn link_label(source: &Document, target: &Document) -> String {
    format!("{} → {}", source.display_name, target.display_name)
}

/// Keeps only the newest pointer sample per coalescing window.
#[derive(Clone, Debug)]
pub(crate) struct PointerCoalescer {
    window: f64,
    last_emitted: Option<f64>,
    pending: Option<Pos2>,
}

impl PointerCoalescer {
    pub fn new(window: f64) -> Self {
        Self {
            window,
            last_emitted: None,
            pending: None,
        }
    }

    /// Records `pointer`, replacing any unprocessed sample, and returns the
    /// sample to process now, if the window has elapsed.
    pub fn offer(&mut self, pointer: Pos2, now: f64) -> Option<Pos2> {
        self.pending = Some(pointer);
        self.poll(now)
    }

    pub fn poll(&mut self, now: f64) -> Option<Pos2> {
        let ready = self
            .last_emitted
            .is_none_or(|last| now - last >= self.window);
        if !ready {
            return None;
        }

        let pointer = self.pending.take()?;
        self.last_emitted = Some(now);
        Some(pointer)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::PathBuf;

    use eframe::egui::{pos2, vec2};

    use super::*;
    use crate::corpus::{LinkGraph, VaultGraph};
    use crate::matrix::build_matrix;

    fn graph() -> VaultGraph {
        let documents = ["Alpha", "Beta", "Gamma"]
            .iter()
            .enumerate()
            .map(|(index, name)| Document {
                index,
                path: format!("{name}.md"),
                display_name: (*name).to_owned(),
            })
            .collect();
        VaultGraph::new(
            PathBuf::new(),
            documents,
            vec![HashSet::from([1]), HashSet::new(), HashSet::new()],
        )
    }

    fn screen_of_cell(transform: ViewTransform, i: usize, j: usize, scale: f32) -> Pos2 {
        transform.apply(pos2((i as f32 + 0.5) * scale, (j as f32 + 0.5) * scale))
    }

    #[test]
    fn hovering_a_link_names_both_ends() {
        let graph = graph();
        let matrix = build_matrix(&graph);
        let forward = ViewTransform {
            scale: 2.0,
            offset: vec2(30.0, 10.0),
        };
        let pointer = screen_of_cell(forward, 0, 1, 8.0);

        let hover = hover_state(forward.inverse(), pointer, 8.0, &matrix, graph.documents());
        assert_eq!(
            hover,
            HoverState::Visible {
                from: 0,
                to: 1,
                label: "Alpha → Beta".to_owned(),
            }
        );
    }

    #[test]
    fn click_opens_the_source_document() {
        let graph = graph();
        let matrix = build_matrix(&graph);
        let forward = ViewTransform::IDENTITY;

        let pointer = screen_of_cell(forward, 0, 1, 4.0);
        assert_eq!(
            click_target(forward.inverse(), pointer, 4.0, &matrix),
            Some(NavigationRequest { document: 0 })
        );

        let unlinked = screen_of_cell(forward, 1, 0, 4.0);
        assert_eq!(click_target(forward.inverse(), unlinked, 4.0, &matrix), None);
    }

    #[test]
    fn out_of_range_pointer_hides_hover() {
        let graph = graph();
        let matrix = build_matrix(&graph);
        let inverse = ViewTransform::IDENTITY.inverse();

        for pointer in [pos2(-20.0, 5.0), pos2(5.0, -20.0), pos2(500.0, 5.0), pos2(5.0, 500.0)] {
            assert_eq!(
                hover_state(inverse, pointer, 4.0, &matrix, graph.documents()),
                HoverState::Hidden
            );
            assert_eq!(click_target(inverse, pointer, 4.0, &matrix), None);
        }
        assert_eq!(cell_at(inverse, pos2(1.0, 1.0), 0.0), None);
        assert_eq!(cell_at(inverse, pos2(f32::NAN, 1.0), 4.0), None);
    }

    #[test]
    fn cell_addressing_uses_cell_centers() {
        let inverse = ViewTransform::IDENTITY.inverse();
        assert_eq!(cell_at(inverse, pos2(1.0, 9.0), 4.0), Some((0, 2)));
        assert_eq!(cell_at(inverse, pos2(7.9, 4.1), 4.0), Some((1, 1)));
        assert_eq!(cell_at(inverse, pos2(-3.0, 2.0), 4.0), Some((-1, 0)));
    }

    #[test]
    fn coalescer_keeps_latest_sample_per_window() {
        let mut coalescer = PointerCoalescer::new(0.025);
        assert_eq!(coalescer.offer(pos2(1.0, 1.0), 0.0), Some(pos2(1.0, 1.0)));
        assert_eq!(coalescer.offer(pos2(2.0, 2.0), 0.01), None);
        assert_eq!(coalescer.offer(pos2(3.0, 3.0), 0.02), None);
        assert!(coalescer.has_pending());
        assert_eq!(coalescer.poll(0.03), Some(pos2(3.0, 3.0)));
        assert_eq!(coalescer.poll(0.08), None);

        assert_eq!(coalescer.offer(pos2(4.0, 4.0), 0.035), None);
        coalescer.clear();
        assert_eq!(coalescer.poll(0.2), None);
    }
}
