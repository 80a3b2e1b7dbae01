mod app;
mod config;
mod corpus;
mod export;
mod matrix;
mod util;
mod visualize;

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::Local;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{ConfigOverrides, MatrixConfig};
use export::ExportTarget;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Vault folder holding the markdown documents.
    #[arg(default_value = ".")]
    vault: PathBuf,

    /// Configuration file, instead of `<vault>/.vault-matrix.toml`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pixels per matrix cell.
    #[arg(long)]
    cell_scale: Option<i64>,

    /// Do not outline folder squares.
    #[arg(long)]
    no_folders: bool,

    /// Vault-relative folder that receives exported images.
    #[arg(long)]
    export_folder: Option<String>,

    /// Write the matrix image and exit without opening a window.
    #[arg(long)]
    export_only: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn export_only(vault: &Path, config: &MatrixConfig) -> Result<()> {
    let vis = visualize::build_visualization(vault, config, |_| ControlFlow::Continue(()))?
        .context("matrix build was interrupted")?;

    let target = ExportTarget {
        vault_root: &vis.graph.root,
        folder: &config.export_folder_path,
        name_prefix: &config.export_name_prefix,
    };
    let path = export::save_png(&vis.raster, &target, Local::now())?;
    println!("{}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = MatrixConfig::resolve(args.config.as_deref(), &args.vault)
        .context("failed to load configuration")?;
    config.apply_overrides(&ConfigOverrides {
        cell_scale: args.cell_scale,
        hide_folders: args.no_folders,
        export_folder_path: args.export_folder.clone(),
    });
    info!(vault = %args.vault.display(), "starting");

    if args.export_only {
        return export_only(&args.vault, &config);
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    let vault = args.vault;
    eframe::run_native(
        "vault-matrix",
        options,
        Box::new(move |cc| Ok(Box::new(app::MatrixApp::new(cc, vault, config)))),
    )
    .map_err(|error| anyhow!("failed to run the viewer: {error}"))
}
