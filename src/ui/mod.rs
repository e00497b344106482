use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eframe::egui::{
    self, Align, Color32, Frame, Layout, Margin, RichText, Rounding, Sense, Stroke, Vec2,
    ViewportCommand,
};
use log::{debug, error, warn};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::{Mutex, mpsc};

use crate::engine::LauncherEngine;
use crate::engine::models::{ArtifactKind, Manifest};
use crate::engine::state::{AppState, UserAction};
use crate::env;
use crate::networking::NetworkClient;
use crate::process::ProcessLauncher;
use crate::storage::StorageManager;
use crate::updater::{self, UpdateStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ThemePalette {
    bg: Color32,
    panel: Color32,
    surface: Color32,
    border: Color32,
    border_strong: Color32,
    text_primary: Color32,
    text_muted: Color32,
    accent: Color32,
    accent_soft: Color32,
    accent_glow: Color32,
    info: Color32,
    warning: Color32,
    danger: Color32,
}

const PALETTE: ThemePalette = ThemePalette {
    bg: Color32::from_rgb(11, 14, 19),
    panel: Color32::from_rgb(17, 22, 29),
    surface: Color32::from_rgb(24, 31, 39),
    border: Color32::from_rgb(45, 57, 72),
    border_strong: Color32::from_rgb(63, 79, 97),
    text_primary: Color32::from_rgb(228, 235, 244),
    text_muted: Color32::from_rgb(167, 182, 197),
    accent: Color32::from_rgb(92, 219, 195),
    accent_soft: Color32::from_rgb(63, 140, 125),
    accent_glow: Color32::from_rgb(151, 239, 217),
    info: Color32::from_rgb(122, 186, 255),
    warning: Color32::from_rgb(246, 195, 111),
    danger: Color32::from_rgb(239, 117, 117),
};

fn tint(color: Color32, alpha: u8) -> Color32 {
    Color32::from_rgba_premultiplied(color.r(), color.g(), color.b(), alpha)
}

fn section_frame(colors: &ThemePalette) -> Frame {
    Frame::none()
        .fill(colors.surface)
        .stroke(Stroke::new(1.0, colors.border))
        .rounding(Rounding::same(14.0))
        .inner_margin(Margin::same(14.0))
}

fn badge_frame(color: Color32) -> Frame {
    Frame::none()
        .fill(tint(color, 32))
        .stroke(Stroke::new(1.0, color))
        .rounding(Rounding::same(999.0))
        .inner_margin(Margin::symmetric(10.0, 4.0))
}

fn primary_cta_button(
    label: impl Into<egui::WidgetText>,
    colors: &ThemePalette,
    min_width: f32,
) -> egui::Button<'_> {
    egui::Button::new(label)
        .fill(colors.accent_soft)
        .stroke(Stroke::new(1.0, colors.accent))
        .min_size(Vec2::new(min_width, 34.0))
}

fn apply_theme(ctx: &egui::Context, colors: &ThemePalette) {
    let mut visuals = egui::Visuals::dark();
    visuals.panel_fill = colors.bg;
    visuals.window_fill = visuals.panel_fill;
    visuals.override_text_color = Some(colors.text_primary);
    visuals.hyperlink_color = colors.accent_glow;
    visuals.widgets.inactive.bg_fill = colors.surface;
    visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, colors.border_strong);
    visuals.widgets.hovered.bg_fill = colors.accent_soft;
    visuals.widgets.hovered.bg_stroke = Stroke::new(1.3, colors.accent);
    visuals.widgets.active.bg_fill = colors.accent;
    visuals.widgets.active.bg_stroke = Stroke::new(1.5, colors.accent_glow);
    visuals.selection.bg_fill = colors.accent;
    visuals.window_rounding = Rounding::same(14.0);
    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();
    style.spacing.item_spacing = Vec2::new(10.0, 10.0);
    style.spacing.button_padding = Vec2::new(14.0, 8.0);
    ctx.set_style(style);
}

fn build_runtime() -> Arc<Runtime> {
    match Runtime::new() {
        Ok(rt) => Arc::new(rt),
        Err(err) => {
            warn!(
                "ui: failed to create multithreaded runtime ({}); trying single-threaded runtime",
                err
            );
            match Builder::new_current_thread().enable_all().build() {
                Ok(rt) => Arc::new(rt),
                Err(fallback_err) => {
                    error!(
                        "ui: failed to create any Tokio runtime ({}); terminating launcher",
                        fallback_err
                    );
                    std::process::exit(1);
                }
            }
        }
    }
}

#[derive(Debug)]
enum UpdaterUpdate {
    Status(UpdateStatus),
}

pub struct LauncherApp {
    runtime: Arc<Runtime>,
    engine: Arc<Mutex<LauncherEngine>>,
    reconcile_in_flight: Arc<AtomicBool>,
    updates_rx: mpsc::UnboundedReceiver<AppState>,
    updates_tx: mpsc::UnboundedSender<AppState>,
    state: AppState,
    staged_manifest: Option<Manifest>,
    launcher_version: &'static str,
    window_hidden: bool,
    updater_status: UpdateStatus,
    updater_updates_rx: mpsc::UnboundedReceiver<UpdaterUpdate>,
    updater_updates_tx: mpsc::UnboundedSender<UpdaterUpdate>,
}

impl LauncherApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let runtime = build_runtime();

        let engine = LauncherEngine::new(
            StorageManager::new(),
            NetworkClient::new(),
            ProcessLauncher::new(),
        );
        let reconcile_in_flight = engine.in_flight_flag();
        let engine = Arc::new(Mutex::new(engine));
        let (tx, rx) = mpsc::unbounded_channel();
        let (updater_tx, updater_rx) = mpsc::unbounded_channel();

        // Kick off the first reconciliation pass immediately.
        let bootstrap_engine = engine.clone();
        let bootstrap_tx = tx.clone();
        runtime.spawn(async move {
            let mut locked = bootstrap_engine.lock().await;
            locked.reconcile(&bootstrap_tx).await;
        });

        let app = Self {
            runtime,
            engine,
            reconcile_in_flight,
            updates_rx: rx,
            updates_tx: tx,
            state: AppState::Initialising,
            staged_manifest: None,
            launcher_version: env!("CARGO_PKG_VERSION"),
            window_hidden: false,
            updater_status: UpdateStatus::UpToDate,
            updater_updates_rx: updater_rx,
            updater_updates_tx: updater_tx,
        };

        app.start_updater_check();
        app
    }

    fn trigger_action(&self, action: UserAction) {
        // Update requests queued behind the engine lock would rerun the
        // moment the current pass finishes; drop them instead.
        if matches!(action, UserAction::CheckForUpdates)
            && self.reconcile_in_flight.load(Ordering::SeqCst)
        {
            debug!("ui: reconciliation already in flight, dropping request");
            return;
        }
        let engine = self.engine.clone();
        let tx = self.updates_tx.clone();
        self.runtime.spawn(async move {
            let mut locked = engine.lock().await;
            locked.handle_action(action, &tx).await;
        });
    }

    fn start_updater_check(&self) {
        let tx = self.updater_updates_tx.clone();
        let current_version = self.launcher_version.to_owned();
        self.runtime.spawn(async move {
            match updater::check_for_updates(&current_version).await {
                Ok(status) => {
                    let _ = tx.send(UpdaterUpdate::Status(status));
                }
                Err(err) => {
                    warn!("updater: check failed: {err}");
                    let _ = tx.send(UpdaterUpdate::Status(UpdateStatus::CheckFailed(err)));
                }
            }
        });
    }

    fn sync_state(&mut self, ctx: &egui::Context) {
        while let Ok(state) = self.updates_rx.try_recv() {
            match state {
                AppState::ManifestStaged { manifest } => {
                    self.staged_manifest = Some(manifest);
                }
                AppState::Ready { manifest } => {
                    self.staged_manifest = Some(manifest.clone());
                    self.state = AppState::Ready { manifest };
                }
                AppState::Playing => {
                    self.state = AppState::Playing;
                    if !self.window_hidden {
                        self.window_hidden = true;
                        ctx.send_viewport_cmd(ViewportCommand::Visible(false));
                    }
                }
                AppState::GameExited => {
                    ctx.send_viewport_cmd(ViewportCommand::Close);
                }
                other => {
                    self.state = other;
                }
            }
        }
    }

    fn sync_updater_updates(&mut self) {
        while let Ok(UpdaterUpdate::Status(status)) = self.updater_updates_rx.try_recv() {
            self.updater_status = status;
        }
    }

    fn busy(&self) -> bool {
        matches!(
            self.state,
            AppState::Initialising
                | AppState::Reconciling
                | AppState::Downloading { .. }
                | AppState::Extracting { .. }
        )
    }

    fn render_title_bar(&self, ctx: &egui::Context, colors: &ThemePalette) {
        egui::TopBottomPanel::top("title_bar")
            .frame(
                Frame::none()
                    .fill(colors.panel)
                    .stroke(Stroke::new(1.0, colors.border))
                    .inner_margin(Margin::symmetric(14.0, 10.0)),
            )
            .show(ctx, |ui| {
                let bar_rect = ui.max_rect();
                ui.horizontal(|ui| {
                    ui.heading(RichText::new("Karanten").color(colors.accent));
                    ui.label(RichText::new("Launcher").color(colors.text_muted));
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let close_btn = egui::Button::new(RichText::new("✕").strong())
                            .fill(colors.surface)
                            .stroke(Stroke::new(1.0, colors.border_strong))
                            .min_size(Vec2::new(30.0, 26.0));
                        if ui.add(close_btn).clicked() {
                            ctx.send_viewport_cmd(ViewportCommand::Close);
                        }
                    });
                });
                // The window is borderless; the title row doubles as the
                // drag handle.
                let response = ui.interact(bar_rect, ui.id().with("drag"), Sense::drag());
                if response.drag_started() {
                    ctx.send_viewport_cmd(ViewportCommand::StartDrag);
                }
            });
    }

    fn render_footer(&self, ctx: &egui::Context, colors: &ThemePalette) {
        egui::TopBottomPanel::bottom("bottom_bar")
            .frame(
                Frame::none()
                    .fill(colors.panel)
                    .stroke(Stroke::new(1.0, colors.border))
                    .inner_margin(Margin::symmetric(14.0, 8.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let folder_btn = egui::Button::new("Open install folder")
                        .fill(colors.surface)
                        .stroke(Stroke::new(1.0, colors.border_strong));
                    if ui.add(folder_btn).clicked()
                        && let Err(err) = open::that(env::default_app_dir())
                    {
                        warn!("ui: failed to open install folder: {err}");
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        badge_frame(colors.border_strong).show(ui, |ui| {
                            ui.label(
                                RichText::new(format!("v{}", self.launcher_version))
                                    .color(colors.text_primary)
                                    .small(),
                            );
                        });
                        if let UpdateStatus::UpdateAvailable {
                            latest_version,
                            url,
                        } = &self.updater_status
                        {
                            ui.add_space(8.0);
                            let update_btn = egui::Button::new(
                                RichText::new(format!("Update {latest_version} available"))
                                    .color(colors.text_primary)
                                    .small(),
                            )
                            .fill(colors.info)
                            .stroke(Stroke::new(1.0, colors.accent_glow));
                            if ui.add(update_btn).clicked() {
                                ui.output_mut(|o| {
                                    o.open_url = Some(egui::output::OpenUrl {
                                        url: url.clone(),
                                        new_tab: true,
                                    });
                                });
                            }
                        }
                    });
                });
            });
    }

    fn render_versions(&self, ui: &mut egui::Ui, colors: &ThemePalette) {
        let Some(manifest) = &self.staged_manifest else {
            return;
        };
        ui.horizontal(|ui| {
            for kind in ArtifactKind::ALL {
                let version = manifest.version_of(kind).unwrap_or("-");
                badge_frame(colors.border_strong).show(ui, |ui| {
                    ui.label(
                        RichText::new(format!("{} {version}", kind.label()))
                            .color(colors.text_muted)
                            .small(),
                    );
                });
            }
        });
    }

    fn render_status(&mut self, ui: &mut egui::Ui, colors: &ThemePalette) {
        section_frame(colors).show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("Status").color(colors.text_muted));
                ui.add_space(6.0);
                let (label, color) = match &self.state {
                    AppState::Ready { .. } => ("Ready", colors.accent),
                    AppState::Playing => ("Running", colors.info),
                    AppState::Error(_) => ("Attention", colors.danger),
                    AppState::Downloading { .. } | AppState::Extracting { .. } => {
                        ("Updating", colors.warning)
                    }
                    _ => ("Working", colors.text_muted),
                };
                badge_frame(color).show(ui, |ui| {
                    ui.label(RichText::new(label).color(color).strong());
                });
            });
            ui.add_space(6.0);

            match &self.state {
                AppState::Initialising | AppState::Reconciling => {
                    ui.horizontal(|ui| {
                        ui.add(egui::Spinner::new());
                        ui.label("Checking for updates...");
                    });
                }
                AppState::Downloading {
                    file,
                    progress,
                    speed,
                } => {
                    ui.label(format!("Downloading {file}"));
                    ui.add(
                        egui::ProgressBar::new(*progress)
                            .fill(colors.accent)
                            .rounding(Rounding::same(10.0))
                            .desired_height(22.0)
                            .text(format!("{:.0}% · {speed}", progress * 100.0)),
                    );
                }
                AppState::Extracting { file } => {
                    ui.horizontal(|ui| {
                        ui.add(egui::Spinner::new());
                        ui.label(format!("Extracting {file}"));
                    });
                }
                AppState::Ready { .. } => {
                    ui.label(RichText::new("Everything is up to date.").strong());
                }
                AppState::Playing => {
                    ui.label("Game is running.");
                }
                AppState::Error(msg) => {
                    ui.colored_label(colors.danger, format!("Update failed: {msg}"));
                }
                AppState::ManifestStaged { .. } | AppState::GameExited => {}
            }

            ui.add_space(4.0);
            self.render_versions(ui, colors);
            ui.add_space(8.0);

            ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
                let start_enabled = matches!(self.state, AppState::Ready { .. });
                let start_label = RichText::new("Start")
                    .color(if start_enabled {
                        colors.text_primary
                    } else {
                        colors.text_muted
                    })
                    .strong();
                let start_btn = primary_cta_button(start_label, colors, 120.0);
                if ui.add_enabled(start_enabled, start_btn).clicked() {
                    self.trigger_action(UserAction::LaunchGame);
                }
                if matches!(self.state, AppState::Error(_)) {
                    ui.add_space(8.0);
                    let retry_btn = egui::Button::new("Retry")
                        .fill(colors.surface)
                        .stroke(Stroke::new(1.0, colors.border_strong))
                        .min_size(Vec2::new(100.0, 32.0));
                    if ui.add(retry_btn).clicked() {
                        self.trigger_action(UserAction::CheckForUpdates);
                    }
                }
            });
        });
    }
}

impl eframe::App for LauncherApp {
    fn update(&mut self, ctx: &eframe::egui::Context, _frame: &mut eframe::Frame) {
        self.sync_state(ctx);
        self.sync_updater_updates();
        let colors = PALETTE;
        apply_theme(ctx, &colors);

        self.render_title_bar(ctx, &colors);
        self.render_footer(ctx, &colors);

        egui::CentralPanel::default()
            .frame(
                Frame::none()
                    .fill(colors.bg)
                    .inner_margin(Margin::symmetric(14.0, 12.0)),
            )
            .show(ctx, |ui| {
                self.render_status(ui, &colors);
            });

        // Background tasks push states without user input; keep draining.
        if self.busy() || matches!(self.state, AppState::Playing) {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
