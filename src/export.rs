use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use image::{ImageFormat, RgbaImage};
use thiserror::Error;
use tracing::{info, warn};

use crate::corpus::join_vault_path;
use crate::matrix::Raster;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export folder {} does not exist", .0.display())]
    MissingFolder(PathBuf),
    #[error("export path {} is not a folder", .0.display())]
    NotAFolder(PathBuf),
    #[error("export folder {0:?} points outside the vault")]
    OutsideVault(String),
    #[error("the matrix is empty, there is no image to save")]
    EmptyImage,
    #[error("failed to encode PNG")]
    Encode(#[from] image::ImageError),
    #[error("failed to write {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where and under which name exported images go.
#[derive(Clone, Debug)]
pub struct ExportTarget<'a> {
    pub vault_root: &'a Path,
    pub folder: &'a str,
    pub name_prefix: &'a str,
}

pub fn encode_png(raster: &Raster) -> Result<Vec<u8>, ExportError> {
    if raster.is_empty() {
        return Err(ExportError::EmptyImage);
    }

    let (Ok(width), Ok(height)) = (u32::try_from(raster.width()), u32::try_from(raster.height()))
    else {
        return Err(ExportError::EmptyImage);
    };
    let image = RgbaImage::from_raw(width, height, raster.to_rgba_bytes()).ok_or(ExportError::EmptyImage)?;

    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// `"{prefix} {YYYYMMDDHHMMSS}.png"`, or just the timestamp without a prefix.
pub fn export_file_name(prefix: &str, at: DateTime<Local>) -> String {
    let stamp = at.format("%Y%m%d%H%M%S");
    let prefix = prefix.trim();
    if prefix.is_empty() {
        format!("{stamp}.png")
    } else {
        format!("{prefix} {stamp}.png")
    }
}

/// Checks that the configured folder exists inside the vault.
pub fn resolve_export_folder(vault_root: &Path, folder: &str) -> Result<PathBuf, ExportError> {
    if folder.split(['/', '\\']).any(|part| part == "..") {
        return Err(ExportError::OutsideVault(folder.to_owned()));
    }

    let path = join_vault_path(vault_root, &folder.replace('\\', "/"));
    match fs::metadata(&path) {
        Ok(metadata) if metadata.is_dir() => Ok(path),
        Ok(_) => Err(ExportError::NotAFolder(path)),
        Err(_) => Err(ExportError::MissingFolder(path)),
    }
}

/// Writes the raster as a PNG and returns the written path.
///
/// The folder is validated before anything is encoded, and the bytes go to a
/// `.part` file that is renamed into place, so a failed export leaves no PNG
/// behind.
pub fn save_png(
    raster: &Raster,
    target: &ExportTarget<'_>,
    at: DateTime<Local>,
) -> Result<PathBuf, ExportError> {
    let folder = resolve_export_folder(target.vault_root, target.folder)?;
    let bytes = encode_png(raster)?;

    let file_name = export_file_name(target.name_prefix, at);
    let destination = unique_destination(&folder, &file_name);
    let partial = destination.with_extension("png.part");

    let write_result = fs::write(&partial, &bytes).and_then(|()| fs::rename(&partial, &destination));
    if let Err(source) = write_result {
        if let Err(error) = fs::remove_file(&partial)
            && error.kind() != io::ErrorKind::NotFound
        {
            warn!(path = %partial.display(), %error, "failed to clean up partial export");
        }
        return Err(ExportError::Io {
            path: destination,
            source,
        });
    }

    info!(path = %destination.display(), bytes = bytes.len(), "saved matrix image");
    Ok(destination)
}

fn unique_destination(folder: &Path, file_name: &str) -> PathBuf {
    let candidate = folder.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let stem = file_name.trim_end_matches(".png");
    (1..)
        .map(|counter| folder.join(format!("{stem} ({counter}).png")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}
