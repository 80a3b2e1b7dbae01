mod build;
mod raster;
mod squares;

pub use build::{AdjacencyMatrix, ROW_CHUNK, RowActivity, build_matrix, try_build_matrix};
pub use raster::{AlphaMapping, Raster, RenderOptions, folder_color, render};
pub use squares::{FolderSquares, decompose, folder_components};
