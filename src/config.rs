use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use eframe::egui::Color32;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::matrix::AlphaMapping;

/// File looked up in the vault root when no `--config` is given.
pub const VAULT_CONFIG_FILE: &str = ".vault-matrix.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid color {0:?}, expected #rrggbb or hsl(h, s%, l%)")]
    InvalidColor(String),
}

/// Config file contents as written by the user, before validation.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    pub foreground_color: Option<String>,
    pub background_color: Option<String>,
    pub cell_scale: Option<i64>,
    pub show_folder_overlay: Option<bool>,
    pub export_name_prefix: Option<String>,
    pub export_folder_path: Option<String>,
    pub alpha_gain: Option<f32>,
    pub alpha_offset: Option<f32>,
    pub smoothing_accel: Option<f32>,
    pub smoothing_drag: Option<f32>,
    pub open_command: Option<String>,
}

/// Damped-spring constants of the camera chase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Smoothing {
    pub accel: f32,
    pub drag: f32,
}

impl Smoothing {
    pub const DEFAULT: Self = Self {
        accel: 0.9,
        drag: 0.2,
    };

    pub fn is_valid(self) -> bool {
        self.accel > 0.0 && self.accel <= 1.5 && self.drag > 0.0 && self.drag < 1.0
    }
}

impl Default for Smoothing {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatrixConfig {
    pub foreground: Color32,
    pub background: Color32,
    /// Explicit cell side length; `None` picks a size-tiered default.
    pub cell_scale: Option<u32>,
    pub show_folder_overlay: bool,
    pub export_name_prefix: String,
    pub export_folder_path: String,
    pub alpha: AlphaMapping,
    pub smoothing: Smoothing,
    pub open_command: Option<String>,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            foreground: hsl_to_color(214.0, 84.0, 57.0),
            background: hsl_to_color(20.0, 17.0, 3.0),
            cell_scale: None,
            show_folder_overlay: true,
            export_name_prefix: "adj".to_owned(),
            export_folder_path: "/".to_owned(),
            alpha: AlphaMapping::DEFAULT,
            smoothing: Smoothing::DEFAULT,
            open_command: None,
        }
    }
}

/// Values given on the command line; they win over the config file.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub cell_scale: Option<i64>,
    pub hide_folders: bool,
    pub export_folder_path: Option<String>,
}

impl MatrixConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw = toml::from_str::<RawConfig>(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_raw(raw))
    }

    /// Loads `explicit` if given, else the vault's config file if present,
    /// else defaults.
    pub fn resolve(explicit: Option<&Path>, vault: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let in_vault = vault.join(VAULT_CONFIG_FILE);
        if in_vault.is_file() {
            Self::load(&in_vault)
        } else {
            Ok(Self::default())
        }
    }

    /// Validates every field, keeping the default for anything invalid.
    pub fn from_raw(raw: RawConfig) -> Self {
        let defaults = Self::default();

        let foreground = recover_color("foreground_color", raw.foreground_color, defaults.foreground);
        let background = recover_color("background_color", raw.background_color, defaults.background);

        let alpha = AlphaMapping {
            gain: raw.alpha_gain.unwrap_or(defaults.alpha.gain),
            offset: raw.alpha_offset.unwrap_or(defaults.alpha.offset),
        };
        let alpha = if alpha.is_valid() {
            alpha
        } else {
            warn!(
                gain = alpha.gain,
                offset = alpha.offset,
                "alpha mapping leaves (0, 1], using default"
            );
            defaults.alpha
        };

        let smoothing = Smoothing {
            accel: raw.smoothing_accel.unwrap_or(defaults.smoothing.accel),
            drag: raw.smoothing_drag.unwrap_or(defaults.smoothing.drag),
        };
        let smoothing = if smoothing.is_valid() {
            smoothing
        } else {
            warn!(
                accel = smoothing.accel,
                drag = smoothing.drag,
                "smoothing constants out of range, using default"
            );
            defaults.smoothing
        };

        Self {
            foreground,
            background,
            cell_scale: raw.cell_scale.and_then(validate_cell_scale),
            show_folder_overlay: raw
                .show_folder_overlay
                .unwrap_or(defaults.show_folder_overlay),
            export_name_prefix: raw
                .export_name_prefix
                .unwrap_or(defaults.export_name_prefix),
            export_folder_path: raw
                .export_folder_path
                .unwrap_or(defaults.export_folder_path),
            alpha,
            smoothing,
            open_command: raw
                .open_command
                .filter(|command| !command.trim().is_empty()),
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(scale) = overrides.cell_scale {
            self.cell_scale = validate_cell_scale(scale).or(self.cell_scale);
        }
        if overrides.hide_folders {
            self.show_folder_overlay = false;
        }
        if let Some(folder) = &overrides.export_folder_path {
            self.export_folder_path = folder.clone();
        }
    }

    pub fn cell_scale_for(&self, document_count: usize) -> u32 {
        self.cell_scale
            .unwrap_or_else(|| default_cell_scale(document_count))
    }
}

/// Smaller cells for bigger vaults, so the raster stays a manageable size.
pub fn default_cell_scale(document_count: usize) -> u32 {
    match document_count {
        0..50 => 16,
        50..100 => 8,
        100..200 => 4,
        _ => 2,
    }
}

fn validate_cell_scale(value: i64) -> Option<u32> {
    match u32::try_from(value) {
        Ok(scale) if (1..=256).contains(&scale) => Some(scale),
        _ => {
            warn!(value, "cell_scale must be an integer in 1..=256, using default");
            None
        }
    }
}

fn recover_color(field: &str, value: Option<String>, fallback: Color32) -> Color32 {
    let Some(value) = value else {
        return fallback;
    };

    parse_color(&value).unwrap_or_else(|error| {
        warn!(field, %error, "using default color");
        fallback
    })
}

pub fn parse_color(value: &str) -> Result<Color32, ConfigError> {
    let trimmed = value.trim();
    let invalid = || ConfigError::InvalidColor(value.to_owned());

    if let Some(hex) = trimmed.strip_prefix('#') {
        let digits = match hex.len() {
            3 => hex.chars().flat_map(|digit| [digit, digit]).collect::<String>(),
            6 => hex.to_owned(),
            _ => return Err(invalid()),
        };
        let channel = |range: std::ops::Range<usize>| {
            digits
                .get(range)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
        };
        return match (channel(0..2), channel(2..4), channel(4..6)) {
            (Some(r), Some(g), Some(b)) => Ok(Color32::from_rgb(r, g, b)),
            _ => Err(invalid()),
        };
    }

    let lowered = trimmed.to_ascii_lowercase();
    if let Some(inner) = lowered
        .strip_prefix("hsl(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts = inner
            .split(',')
            .map(|part| part.trim().trim_end_matches('%').trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        return match parts.as_slice() {
            [h, s, l] if (0.0..=100.0).contains(s) && (0.0..=100.0).contains(l) => {
                Ok(hsl_to_color(*h, *s, *l))
            }
            _ => Err(invalid()),
        };
    }

    Err(invalid())
}

/// `h` in degrees, `s` and `l` in percent.
pub fn hsl_to_color(h: f32, s: f32, l: f32) -> Color32 {
    let l = l / 100.0;
    let a = s * l.min(1.0 - l) / 100.0;
    let channel = |n: f32| {
        let k = (n + h / 30.0).rem_euclid(12.0);
        let value = l - a * (k - 3.0).min(9.0 - k).clamp(-1.0, 1.0);
        (value * 255.0).round().clamp(0.0, 255.0) as u8
    };
    Color32::from_rgb(channel(0.0), channel(8.0), channel(4.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiered_default_scale() {
        assert_eq!(default_cell_scale(0), 16);
        assert_eq!(default_cell_scale(49), 16);
        assert_eq!(default_cell_scale(50), 8);
        assert_eq!(default_cell_scale(150), 4);
        assert_eq!(default_cell_scale(5000), 2);
    }

    #[test]
    fn invalid_cell_scale_falls_back_to_tier() {
        let config = MatrixConfig::from_raw(RawConfig {
            cell_scale: Some(-3),
            ..RawConfig::default()
        });
        assert_eq!(config.cell_scale, None);
        assert_eq!(config.cell_scale_for(120), 4);

        let config = MatrixConfig::from_raw(RawConfig {
            cell_scale: Some(6),
            ..RawConfig::default()
        });
        assert_eq!(config.cell_scale_for(120), 6);
    }

    #[test]
    fn parses_hex_and_hsl_colors() {
        assert_eq!(parse_color("#fe6825").unwrap(), Color32::from_rgb(254, 104, 37));
        assert_eq!(parse_color("#abc").unwrap(), Color32::from_rgb(0xaa, 0xbb, 0xcc));
        assert_eq!(parse_color("hsl(0, 100%, 50%)").unwrap(), Color32::from_rgb(255, 0, 0));
        assert_eq!(parse_color("HSL(120, 100%, 25%)").unwrap(), Color32::from_rgb(0, 128, 0));
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("hsl(1, 2)").is_err());
        assert!(parse_color("orange").is_err());
    }

    #[test]
    fn bad_values_keep_defaults() {
        let config = MatrixConfig::from_raw(RawConfig {
            foreground_color: Some("not a color".to_owned()),
            alpha_gain: Some(2.0),
            smoothing_drag: Some(1.5),
            open_command: Some("  ".to_owned()),
            ..RawConfig::default()
        });
        let defaults = MatrixConfig::default();
        assert_eq!(config.foreground, defaults.foreground);
        assert_eq!(config.alpha, AlphaMapping::DEFAULT);
        assert_eq!(config.smoothing, Smoothing::DEFAULT);
        assert_eq!(config.open_command, None);
    }

    #[test]
    fn loads_toml_and_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.toml");
        fs::write(
            &path,
            "background_color = \"#000000\"\ncell_scale = 3\nshow_folder_overlay = false\nexport_name_prefix = \"links\"\n",
        )
        .unwrap();

        let config = MatrixConfig::load(&path).unwrap();
        assert_eq!(config.background, Color32::from_rgb(0, 0, 0));
        assert_eq!(config.cell_scale, Some(3));
        assert!(!config.show_folder_overlay);
        assert_eq!(config.export_name_prefix, "links");
        assert_eq!(config.export_folder_path, "/");

        fs::write(&path, "colour = \"#000000\"\n").unwrap();
        assert!(matches!(
            MatrixConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            MatrixConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn resolve_prefers_vault_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            MatrixConfig::resolve(None, dir.path()).unwrap(),
            MatrixConfig::default()
        );

        fs::write(dir.path().join(VAULT_CONFIG_FILE), "cell_scale = 5\n").unwrap();
        let config = MatrixConfig::resolve(None, dir.path()).unwrap();
        assert_eq!(config.cell_scale, Some(5));
    }

    #[test]
    fn overrides_win_over_file_values() {
        let mut config = MatrixConfig {
            cell_scale: Some(8),
            ..MatrixConfig::default()
        };
        config.apply_overrides(&ConfigOverrides {
            cell_scale: Some(0),
            hide_folders: true,
            export_folder_path: Some("exports".to_owned()),
        });
        assert_eq!(config.cell_scale, Some(8));
        assert!(!config.show_folder_overlay);
        assert_eq!(config.export_folder_path, "exports");
    }
}
