use super::autoscale::{AutoScaleLog, AutoScaleState, AutoScaledModel};
use super::loading::LoadOutcome;
use super::route::{Location, NavigateTo};
use super::settings::GallerySettings;
use bevy::camera::visibility::RenderLayers;
use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::{EguiContexts, PrimaryEguiContext, egui};

pub(super) const OVERLAY_RENDER_LAYER: usize = 31;

#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct OverlayState {
    pub(super) show_overlay: bool,
    pub(super) show_diagnostics: bool,
}

impl OverlayState {
    pub(super) fn from_settings(settings: &GallerySettings) -> Self {
        Self {
            show_overlay: settings.debug.show_overlay,
            show_diagnostics: settings.debug.show_diagnostics,
        }
    }
}

pub(super) fn spawn_overlay_camera(mut commands: Commands) {
    commands.spawn((
        Name::new("OverlayCamera"),
        Camera2d,
        Camera {
            order: 1,
            clear_color: ClearColorConfig::None,
            ..default()
        },
        RenderLayers::layer(OVERLAY_RENDER_LAYER),
        PrimaryEguiContext,
    ));
}

pub(super) fn toggle_diagnostics(keys: Res<ButtonInput<KeyCode>>, mut overlay: ResMut<OverlayState>) {
    if keys.just_pressed(KeyCode::F1) {
        overlay.show_diagnostics = !overlay.show_diagnostics;
    }
    if keys.just_pressed(KeyCode::F2) {
        overlay.show_overlay = !overlay.show_overlay;
    }
}

fn outcome_text(outcome: &LoadOutcome) -> String {
    match outcome {
        LoadOutcome::Pending => "loading".to_string(),
        LoadOutcome::Ready => "ready".to_string(),
        LoadOutcome::Failed(err) => format!("failed: {err}"),
    }
}

pub(super) fn overlay_ui(
    mut contexts: EguiContexts,
    overlay: Res<OverlayState>,
    location: Res<Location>,
    log: Res<AutoScaleLog>,
    diagnostics: Res<DiagnosticsStore>,
    models: Query<(&AutoScaledModel, Option<&AutoScaleState>)>,
    mut navigate: MessageWriter<NavigateTo>,
) {
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    if overlay.show_overlay {
        egui::TopBottomPanel::top("portal_gallery_top_bar")
            .frame(egui::Frame::NONE.inner_margin(egui::Margin::same(8)))
            .show_separator_line(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(location.path()).monospace());
                    if location.active_panel().is_some() && ui.link("< back").clicked() {
                        navigate.write(NavigateTo::root());
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.small("double-click a frame to enter, Esc to leave, F1 diagnostics");
                    });
                });
            });
    }

    if !overlay.show_diagnostics {
        return;
    }

    egui::Window::new("Diagnostics")
        .default_width(360.0)
        .show(ctx, |ui| {
            let fps = diagnostics
                .get(&FrameTimeDiagnosticsPlugin::FPS)
                .and_then(|fps| fps.smoothed());
            match fps {
                Some(fps) => ui.label(format!("FPS: {fps:.1}")),
                None => ui.label("FPS: -"),
            };

            ui.separator();
            ui.heading("Models");
            egui::Grid::new("portal_gallery_models")
                .striped(true)
                .show(ui, |ui| {
                    for (model, state) in &models {
                        ui.label(&model.src);
                        match state {
                            Some(state) => {
                                ui.label(outcome_text(&state.outcome));
                                ui.label(format!("scale {:.4}", state.scale));
                            }
                            None => {
                                ui.label("queued");
                                ui.label("");
                            }
                        }
                        ui.end_row();
                    }
                });

            ui.separator();
            ui.heading("Auto-scale log");
            if log.len() == 0 {
                ui.small("no measurements yet");
            }
            egui::ScrollArea::vertical().max_height(200.0).show(ui, |ui| {
                for record in log.records() {
                    ui.label(format!(
                        "{}  max {:.4}  target {}  scale {:.4}",
                        record.src, record.max_extent, record.target_size, record.scale
                    ));
                }
            });
        });
}
