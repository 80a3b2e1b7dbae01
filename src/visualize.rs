use std::ops::ControlFlow;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::MatrixConfig;
use crate::corpus::{LinkGraph, VaultGraph, collect_vault};
use crate::matrix::{
    AdjacencyMatrix, FolderSquares, ROW_CHUNK, Raster, RenderOptions, RowActivity, decompose,
    render, try_build_matrix,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Collecting,
    Matrix,
    Folders,
    Rendering,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Collecting => "Reading vault",
            Self::Matrix => "Building adjacency matrix",
            Self::Folders => "Decomposing folders",
            Self::Rendering => "Rendering matrix",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildEvent {
    Stage(Stage),
    Rows { done: usize, total: usize },
}

/// Everything the viewer needs for one point-in-time snapshot of a vault.
pub struct Visualization {
    pub graph: VaultGraph,
    pub matrix: AdjacencyMatrix,
    pub activity: RowActivity,
    pub squares: FolderSquares,
    pub options: RenderOptions,
    pub raster: Raster,
}

impl Visualization {
    pub fn cell_scale(&self) -> f32 {
        self.options.cell_scale as f32
    }

    /// Repaints the cached raster after a render option changed.
    pub fn rerender(&mut self, options: RenderOptions) {
        if options == self.options {
            return;
        }

        self.options = options;
        self.raster = render(&self.matrix, &self.activity, Some(&self.squares), &self.options);
    }
}

pub fn render_options(config: &MatrixConfig, document_count: usize) -> RenderOptions {
    RenderOptions {
        cell_scale: config.cell_scale_for(document_count),
        foreground: config.foreground,
        background: config.background,
        alpha: config.alpha,
        folder_overlay: config.show_folder_overlay,
    }
}

fn document_paths(graph: &VaultGraph) -> Vec<&str> {
    graph
        .documents()
        .iter()
        .map(|document| document.path.as_str())
        .collect()
}

/// Collects the vault and builds the matrix, squares and raster.
///
/// `report` is called at every stage and after every row chunk; returning
/// `Break` abandons the build and yields `Ok(None)`.
pub fn build_visualization<F>(
    vault: &Path,
    config: &MatrixConfig,
    mut report: F,
) -> Result<Option<Visualization>>
where
    F: FnMut(BuildEvent) -> ControlFlow<()>,
{
    if report(BuildEvent::Stage(Stage::Collecting)).is_break() {
        return Ok(None);
    }
    let graph = collect_vault(vault)
        .with_context(|| format!("failed to collect vault {}", vault.display()))?;

    if report(BuildEvent::Stage(Stage::Matrix)).is_break() {
        return Ok(None);
    }
    let Some(matrix) = try_build_matrix(&graph, ROW_CHUNK, |done, total| {
        report(BuildEvent::Rows { done, total })
    }) else {
        info!("matrix build superseded");
        return Ok(None);
    };

    if report(BuildEvent::Stage(Stage::Folders)).is_break() {
        return Ok(None);
    }
    let activity = RowActivity::from_matrix(&matrix);
    let squares = decompose(&document_paths(&graph));

    if report(BuildEvent::Stage(Stage::Rendering)).is_break() {
        return Ok(None);
    }
    let options = render_options(config, graph.document_count());
    let raster = render(&matrix, &activity, Some(&squares), &options);

    info!(
        documents = graph.document_count(),
        links = matrix.link_count(),
        squares = squares.square_count(),
        width = raster.width(),
        "visualization ready"
    );

    Ok(Some(Visualization {
        graph,
        matrix,
        activity,
        squares,
        options,
        raster,
    }))
}
