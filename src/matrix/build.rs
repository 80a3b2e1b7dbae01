use std::ops::ControlFlow;

use crate::corpus::LinkGraph;

/// Rows evaluated between two progress reports.
pub const ROW_CHUNK: usize = 64;

/// Square 0/1 matrix where `get(i, j)` is true when document `i` links to `j`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdjacencyMatrix {
    size: usize,
    cells: Vec<u8>,
}

impl AdjacencyMatrix {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, from: usize, to: usize) -> bool {
        from < self.size && to < self.size && self.cells[from * self.size + to] == 1
    }

    pub fn row(&self, from: usize) -> &[u8] {
        if from >= self.size {
            return &[];
        }
        &self.cells[from * self.size..(from + 1) * self.size]
    }

    pub fn row_sums(&self) -> Vec<u32> {
        (0..self.size)
            .map(|row| self.row(row).iter().map(|&cell| u32::from(cell)).sum())
            .collect()
    }

    pub fn column_sum(&self, to: usize) -> u32 {
        (0..self.size).map(|row| u32::from(self.get(row, to))).sum()
    }

    pub fn link_count(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell == 1).count()
    }
}

/// Builds the full matrix. Cost is N² calls to [`LinkGraph::is_linked`], so
/// the total is only O(N²) when that predicate is O(1).
pub fn build_matrix<G: LinkGraph + ?Sized>(graph: &G) -> AdjacencyMatrix {
    match try_build_matrix(graph, ROW_CHUNK, |_, _| ControlFlow::Continue(())) {
        Some(matrix) => matrix,
        None => AdjacencyMatrix::default(),
    }
}

/// Builds the matrix in chunks of `chunk_rows` rows, calling `on_chunk` with
/// `(rows_done, total_rows)` after each chunk.
///
/// Returns `None` when `on_chunk` breaks, i.e. the request was superseded.
pub fn try_build_matrix<G, F>(graph: &G, chunk_rows: usize, mut on_chunk: F) -> Option<AdjacencyMatrix>
where
    G: LinkGraph + ?Sized,
    F: FnMut(usize, usize) -> ControlFlow<()>,
{
    let size = graph.document_count();
    let chunk_rows = chunk_rows.max(1);
    let mut cells = Vec::with_capacity(size * size);

    for from in 0..size {
        cells.extend((0..size).map(|to| u8::from(graph.is_linked(from, to))));

        let done = from + 1;
        if (done % chunk_rows == 0 || done == size) && on_chunk(done, size).is_break() {
            return None;
        }
    }

    Some(AdjacencyMatrix { size, cells })
}

/// Row sums normalized by the largest row sum.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowActivity(Vec<f32>);

impl RowActivity {
    /// All-zero when no document links anywhere, never NaN.
    pub fn from_matrix(matrix: &AdjacencyMatrix) -> Self {
        let sums = matrix.row_sums();
        let max = sums.iter().copied().max().unwrap_or(0);
        if max == 0 {
            return Self(vec![0.0; sums.len()]);
        }

        let max = max as f32;
        Self(sums.into_iter().map(|sum| sum as f32 / max).collect())
    }

    pub fn get(&self, row: usize) -> f32 {
        self.0.get(row).copied().unwrap_or(0.0)
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::PathBuf;

    use proptest::prelude::*;

    use super::*;
    use crate::corpus::{Document, VaultGraph};

    fn graph(targets: Vec<HashSet<usize>>) -> VaultGraph {
        let documents = (0..targets.len())
            .map(|index| Document {
                index,
                path: format!("note-{index}.md"),
                display_name: format!("note-{index}"),
            })
            .collect();
        VaultGraph::new(PathBuf::from("/vault"), documents, targets)
    }

    #[test]
    fn single_link_between_three_documents() {
        let graph = graph(vec![HashSet::from([1]), HashSet::new(), HashSet::new()]);
        let matrix = build_matrix(&graph);

        let rows = (0..3).map(|row| matrix.row(row).to_vec()).collect::<Vec<_>>();
        assert_eq!(rows, vec![vec![0, 1, 0], vec![0, 0, 0], vec![0, 0, 0]]);
        assert_eq!(matrix.row_sums(), vec![1, 0, 0]);
        assert_eq!(RowActivity::from_matrix(&matrix).values(), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn empty_graph_builds_empty_matrix() {
        let matrix = build_matrix(&graph(Vec::new()));
        assert!(matrix.is_empty());
        assert!(matrix.row(0).is_empty());
        assert!(RowActivity::from_matrix(&matrix).values().is_empty());
    }

    #[test]
    fn unlinked_documents_have_zero_activity() {
        let matrix = build_matrix(&graph(vec![HashSet::new(); 4]));
        let activity = RowActivity::from_matrix(&matrix);
        assert_eq!(activity.values(), &[0.0; 4]);
        assert!(activity.values().iter().all(|value| value.is_finite()));
    }

    #[test]
    fn self_links_are_kept() {
        let matrix = build_matrix(&graph(vec![HashSet::from([0]), HashSet::new()]));
        assert!(matrix.get(0, 0));
        assert_eq!(matrix.column_sum(0), 1);
    }

    #[test]
    fn out_of_range_lookups_are_false() {
        let matrix = build_matrix(&graph(vec![HashSet::from([0])]));
        assert!(!matrix.get(0, 5));
        assert!(!matrix.get(5, 0));
    }

    #[test]
    fn progress_reports_every_chunk_and_can_stop() {
        let graph = graph(vec![HashSet::new(); 10]);
        let mut reports = Vec::new();
        let matrix = try_build_matrix(&graph, 4, |done, total| {
            reports.push((done, total));
            ControlFlow::Continue(())
        });
        assert!(matrix.is_some());
        assert_eq!(reports, vec![(4, 10), (8, 10), (10, 10)]);

        let stopped = try_build_matrix(&graph, 4, |_, _| ControlFlow::Break(()));
        assert!(stopped.is_none());
    }

    fn arbitrary_targets() -> impl Strategy<Value = Vec<HashSet<usize>>> {
        (0usize..24).prop_flat_map(|size| {
            prop::collection::vec(
                prop::collection::hash_set(0..size.max(1), 0..(size / 2 + 1)),
                size,
            )
        })
    }

    proptest! {
        #[test]
        fn matrix_is_square_binary_and_idempotent(targets in arbitrary_targets()) {
            let graph = graph(targets);
            let first = build_matrix(&graph);
            let second = build_matrix(&graph);

            prop_assert_eq!(first.size(), graph.documents.len());
            for row in 0..first.size() {
                prop_assert_eq!(first.row(row).len(), first.size());
                prop_assert!(first.row(row).iter().all(|&cell| cell <= 1));
            }
            prop_assert_eq!(first, second);
        }

        #[test]
        fn activity_is_normalized(targets in arbitrary_targets()) {
            let matrix = build_matrix(&graph(targets));
            let activity = RowActivity::from_matrix(&matrix);

            prop_assert!(activity.values().iter().all(|value| (0.0..=1.0).contains(value)));
            let max = activity.values().iter().copied().fold(0.0_f32, f32::max);
            if matrix.link_count() > 0 {
                prop_assert!((max - 1.0).abs() < 1e-6);
            } else {
                prop_assert_eq!(max, 0.0);
            }
        }
    }
}
