use eframe::egui::{Color32, ColorImage};

use super::build::{AdjacencyMatrix, RowActivity};
use super::squares::FolderSquares;

/// Stroke colors for folder squares, cycled by depth.
pub const FOLDER_PALETTE: [Color32; 6] = [
    Color32::from_rgb(235, 219, 178),
    Color32::from_rgb(142, 192, 124),
    Color32::from_rgb(250, 189, 47),
    Color32::from_rgb(211, 134, 155),
    Color32::from_rgb(131, 165, 152),
    Color32::from_rgb(254, 128, 25),
];

pub fn folder_color(depth: usize) -> Color32 {
    FOLDER_PALETTE[depth.saturating_sub(1) % FOLDER_PALETTE.len()]
}

/// Maps a row's activity to the opacity of its linked cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlphaMapping {
    pub gain: f32,
    pub offset: f32,
}

impl AlphaMapping {
    pub const DEFAULT: Self = Self {
        gain: 1.0 / 1.5,
        offset: 1.0 / 3.0,
    };

    /// True when every activity in [0, 1] maps into (0, 1].
    pub fn is_valid(self) -> bool {
        let low = self.offset;
        let high = self.gain + self.offset;
        [low, high]
            .iter()
            .all(|alpha| alpha.is_finite() && *alpha > 0.0 && *alpha <= 1.0)
    }

    pub fn alpha(self, activity: f32) -> f32 {
        let activity = if activity.is_finite() {
            activity.clamp(0.0, 1.0)
        } else {
            0.0
        };
        (activity * self.gain + self.offset).clamp(f32::EPSILON, 1.0)
    }
}

impl Default for AlphaMapping {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderOptions {
    pub cell_scale: u32,
    pub foreground: Color32,
    pub background: Color32,
    pub alpha: AlphaMapping,
    pub folder_overlay: bool,
}

/// Opaque pixel buffer holding the painted matrix.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Raster {
    width: usize,
    height: usize,
    pixels: Vec<Color32>,
}

impl Raster {
    fn filled(width: usize, height: usize, color: Color32) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Color32> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|pixel| pixel.to_array()).collect()
    }

    pub fn to_color_image(&self) -> ColorImage {
        ColorImage::from_rgba_unmultiplied([self.width, self.height], &self.to_rgba_bytes())
    }

    fn fill_rect(&mut self, x: usize, y: usize, width: usize, height: usize, color: Color32) {
        let x_end = (x + width).min(self.width);
        let y_end = (y + height).min(self.height);
        for row in y.min(y_end)..y_end {
            let offset = row * self.width;
            self.pixels[offset + x.min(x_end)..offset + x_end].fill(color);
        }
    }

    fn stroke_rect(&mut self, x: usize, y: usize, side: usize, thickness: usize, color: Color32) {
        let thickness = thickness.min(side.div_ceil(2)).max(1);
        self.fill_rect(x, y, side, thickness, color);
        self.fill_rect(x, y + side.saturating_sub(thickness), side, thickness, color);
        self.fill_rect(x, y, thickness, side, color);
        self.fill_rect(x + side.saturating_sub(thickness), y, thickness, side, color);
    }
}

/// Paints the matrix once into a raster of `(N * scale)²` pixels.
///
/// Cell `(i, j)` covers columns `i * scale..` and rows `j * scale..`.
/// Linked cells are the foreground composited over the background at the
/// opacity given by `options.alpha` for row `i`.
pub fn render(
    matrix: &AdjacencyMatrix,
    activity: &RowActivity,
    squares: Option<&FolderSquares>,
    options: &RenderOptions,
) -> Raster {
    let scale = options.cell_scale.max(1) as usize;
    let side = matrix.size() * scale;
    let mut raster = Raster::filled(side, side, options.background);

    for from in 0..matrix.size() {
        let alpha = options.alpha.alpha(activity.get(from));
        let linked_color = blend_color(options.background, options.foreground, alpha);

        for (to, &cell) in matrix.row(from).iter().enumerate() {
            if cell == 1 {
                raster.fill_rect(from * scale, to * scale, scale, scale, linked_color);
            }
        }
    }

    if options.folder_overlay
        && let Some(squares) = squares
    {
        let thickness = (scale / 8).max(1);
        for level in squares.levels() {
            for square in level {
                raster.stroke_rect(
                    square.start * scale,
                    square.start * scale,
                    square.len() * scale,
                    thickness,
                    folder_color(square.depth),
                );
            }
        }
    }

    raster
}

pub fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;
    let mix = |a: u8, b: u8| ((a as f32 * inverse) + (b as f32 * amount)).round() as u8;

    Color32::from_rgb(
        mix(base.r(), overlay.r()),
        mix(base.g(), overlay.g()),
        mix(base.b(), overlay.b()),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::PathBuf;

    use super::*;
    use crate::corpus::{Document, VaultGraph};
    use crate::matrix::{build_matrix, decompose};

    const BACKGROUND: Color32 = Color32::from_rgb(10, 10, 10);
    const FOREGROUND: Color32 = Color32::from_rgb(250, 100, 40);

    fn options(scale: u32, folder_overlay: bool) -> RenderOptions {
        RenderOptions {
            cell_scale: scale,
            foreground: FOREGROUND,
            background: BACKGROUND,
            alpha: AlphaMapping::DEFAULT,
            folder_overlay,
        }
    }

    fn matrix(targets: Vec<HashSet<usize>>) -> AdjacencyMatrix {
        let documents = (0..targets.len())
            .map(|index| Document {
                index,
                path: format!("{index}.md"),
                display_name: index.to_string(),
            })
            .collect();
        build_matrix(&VaultGraph::new(PathBuf::new(), documents, targets))
    }

    #[test]
    fn empty_matrix_renders_zero_sized_raster() {
        let matrix = matrix(Vec::new());
        let raster = render(&matrix, &RowActivity::from_matrix(&matrix), None, &options(4, true));
        assert!(raster.is_empty());
        assert!(raster.to_rgba_bytes().is_empty());
    }

    #[test]
    fn linked_cells_use_source_column_and_target_row() {
        let matrix = matrix(vec![HashSet::from([1]), HashSet::new()]);
        let activity = RowActivity::from_matrix(&matrix);
        let raster = render(&matrix, &activity, None, &options(2, false));

        assert_eq!((raster.width(), raster.height()), (4, 4));
        let linked = blend_color(BACKGROUND, FOREGROUND, 1.0);
        assert_eq!(raster.pixel(0, 2), Some(linked));
        assert_eq!(raster.pixel(1, 3), Some(linked));
        assert_eq!(raster.pixel(2, 0), Some(BACKGROUND));
        assert_eq!(raster.pixel(0, 0), Some(BACKGROUND));
        assert_eq!(raster.pixel(4, 0), None);
    }

    #[test]
    fn quieter_rows_are_dimmer() {
        let matrix = matrix(vec![HashSet::from([0, 1]), HashSet::from([0]), HashSet::new()]);
        let activity = RowActivity::from_matrix(&matrix);
        let raster = render(&matrix, &activity, None, &options(1, false));

        let busy = raster.pixel(0, 0).unwrap();
        let quiet = raster.pixel(1, 0).unwrap();
        assert!(busy.r() > quiet.r());
        assert_eq!(quiet, blend_color(BACKGROUND, FOREGROUND, 2.0 / 3.0));
    }

    #[test]
    fn folder_squares_are_stroked_on_the_diagonal() {
        let matrix = matrix(vec![HashSet::new(); 3]);
        let activity = RowActivity::from_matrix(&matrix);
        let squares = decompose(&["x/a.md", "x/b.md", "y/c.md"]);
        let raster = render(&matrix, &activity, Some(&squares), &options(4, true));

        let color = folder_color(1);
        assert_eq!(raster.pixel(0, 0), Some(color));
        assert_eq!(raster.pixel(7, 7), Some(color));
        assert_eq!(raster.pixel(3, 3), Some(BACKGROUND));
        assert_eq!(raster.pixel(8, 8), Some(color));
        assert_eq!(raster.pixel(11, 0), Some(BACKGROUND));

        let hidden = render(&matrix, &activity, Some(&squares), &options(4, false));
        assert_eq!(hidden.pixel(0, 0), Some(BACKGROUND));
    }

    #[test]
    fn alpha_mapping_stays_in_unit_interval() {
        let mapping = AlphaMapping::DEFAULT;
        assert!(mapping.is_valid());
        assert!((mapping.alpha(0.0) - 1.0 / 3.0).abs() < 1e-6);
        assert!((mapping.alpha(1.0) - 1.0).abs() < 1e-6);
        assert!(mapping.alpha(f32::NAN) > 0.0);
        assert!(!AlphaMapping { gain: 1.0, offset: 0.5 }.is_valid());
        assert!(!AlphaMapping { gain: 0.5, offset: 0.0 }.is_valid());
    }

    #[test]
    fn palette_cycles_with_depth() {
        assert_eq!(folder_color(1), FOLDER_PALETTE[0]);
        assert_eq!(folder_color(FOLDER_PALETTE.len() + 1), FOLDER_PALETTE[0]);
    }
}
