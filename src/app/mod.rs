use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use eframe::egui::{self, Context, TextureHandle};
use tracing::{debug, error, info};

use crate::config::{MatrixConfig, Smoothing};
use crate::matrix::AlphaMapping;
use crate::visualize::{BuildEvent, Stage, Visualization, build_visualization};

mod interaction;
mod ui;
mod view;
mod viewport;

use interaction::{HoverState, PointerCoalescer};
use viewport::ViewportController;

const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct MatrixApp {
    vault: PathBuf,
    config: MatrixConfig,
    state: AppState,
    reload: Option<LoadHandle>,
}

enum AppState {
    Loading(LoadHandle),
    Ready(Box<ViewModel>),
    Error(String),
}

enum LoadEvent {
    Progress(BuildEvent),
    Finished(Result<Visualization, String>),
}

enum LoadStatus {
    Pending,
    Done(Result<Visualization, String>),
}

/// Receiving end of a background build. Dropping it cancels the build at
/// its next progress report.
struct LoadHandle {
    rx: Receiver<LoadEvent>,
    config: MatrixConfig,
    stage: Stage,
    rows: Option<(usize, usize)>,
}

impl LoadHandle {
    fn spawn(vault: PathBuf, config: MatrixConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        let build_config = config.clone();

        thread::spawn(move || {
            let result = build_visualization(&vault, &build_config, |event| {
                if tx.send(LoadEvent::Progress(event)).is_ok() {
                    ControlFlow::Continue(())
                } else {
                    ControlFlow::Break(())
                }
            });

            let result = match result {
                Ok(Some(vis)) => Ok(vis),
                Ok(None) => {
                    debug!(vault = %vault.display(), "discarding superseded build");
                    return;
                }
                Err(error) => Err(format!("{error:#}")),
            };
            let _ = tx.send(LoadEvent::Finished(result));
        });

        Self {
            rx,
            config,
            stage: Stage::Collecting,
            rows: None,
        }
    }

    fn poll(&mut self) -> LoadStatus {
        loop {
            match self.rx.try_recv() {
                Ok(LoadEvent::Progress(BuildEvent::Stage(stage))) => self.stage = stage,
                Ok(LoadEvent::Progress(BuildEvent::Rows { done, total })) => {
                    self.rows = Some((done, total));
                }
                Ok(LoadEvent::Finished(result)) => return LoadStatus::Done(result),
                Err(TryRecvError::Empty) => return LoadStatus::Pending,
                Err(TryRecvError::Disconnected) => {
                    return LoadStatus::Done(Err("Background load worker disconnected".to_owned()));
                }
            }
        }
    }

    /// Fraction of matrix rows built so far, once the matrix stage started.
    fn row_fraction(&self) -> Option<f32> {
        self.rows
            .filter(|(_, total)| *total > 0)
            .map(|(done, total)| done as f32 / total as f32)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Notice {
    Info(String),
    Error(String),
}

struct ViewModel {
    vis: Visualization,
    config: MatrixConfig,
    texture: Option<TextureHandle>,
    viewport: Option<ViewportController>,
    coalescer: PointerCoalescer,
    hover: HoverState,
    selected: Option<usize>,
    search: String,
    notice: Option<Notice>,
    show_folder_overlay: bool,
    alpha: AlphaMapping,
    smoothing: Smoothing,
    render_dirty: bool,
}

impl MatrixApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, vault: PathBuf, config: MatrixConfig) -> Self {
        let state = AppState::Loading(LoadHandle::spawn(vault.clone(), config.clone()));
        Self {
            vault,
            config,
            state,
            reload: None,
        }
    }

    fn start_load(&self) -> AppState {
        info!(vault = %self.vault.display(), "loading vault");
        AppState::Loading(LoadHandle::spawn(self.vault.clone(), self.config.clone()))
    }

    fn finish_load(result: Result<Visualization, String>, config: MatrixConfig) -> AppState {
        match result {
            Ok(vis) => AppState::Ready(Box::new(ViewModel::new(vis, config))),
            Err(message) => {
                error!(%message, "failed to load vault");
                AppState::Error(message)
            }
        }
    }
}

fn draw_progress(ui: &mut egui::Ui, handle: &LoadHandle) {
    ui.label(handle.stage.label());
    if let Some(fraction) = handle.row_fraction()
        && handle.stage == Stage::Matrix
    {
        ui.add(
            egui::ProgressBar::new(fraction)
                .desired_width(280.0)
                .show_percentage(),
        );
    }
}

impl eframe::App for MatrixApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        if ctx.input(|input| input.viewport().close_requested())
            && let AppState::Ready(model) = &mut self.state
        {
            model.close_viewport();
        }

        match &mut self.state {
            AppState::Loading(handle) => {
                if let LoadStatus::Done(result) = handle.poll() {
                    transition = Some((result, handle.config.clone()));
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading vault link matrix...");
                        ui.add_space(8.0);
                        ui.spinner();
                        ui.add_space(8.0);
                        draw_progress(ui, handle);
                    });
                });
                ctx.request_repaint_after(LOAD_POLL_INTERVAL);
            }
            AppState::Error(error) => {
                let mut retry = false;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to build the vault link matrix");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
                if retry {
                    self.state = self.start_load();
                    return;
                }
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload.is_some();
                model.show(ctx, &self.vault, &mut reload_requested, is_reloading);

                if reload_requested && self.reload.is_none() {
                    info!(vault = %self.vault.display(), "reloading vault");
                    self.reload = Some(LoadHandle::spawn(self.vault.clone(), model.live_config()));
                }

                if let Some(handle) = self.reload.as_mut() {
                    if let LoadStatus::Done(result) = handle.poll() {
                        transition = Some((result, handle.config.clone()));
                    } else {
                        ctx.request_repaint_after(LOAD_POLL_INTERVAL);
                    }
                }
            }
        }

        if let Some((result, config)) = transition {
            if let AppState::Ready(model) = &mut self.state {
                model.close_viewport();
            }
            self.reload = None;
            self.state = Self::finish_load(result, config);
        }
    }
}
