mod autoscale;
mod bounds;
mod camera;
mod cli;
mod damping;
mod error;
mod labels;
mod loading;
mod mesh;
mod panel;
mod portal;
mod route;
mod settings;
mod ui;

use anyhow::Context;
use autoscale::{AutoScaleLog, measure_ready_scene, sync_model_requests, track_model_failures};
use bevy::app::HierarchyPropagatePlugin;
use bevy::camera::CameraUpdateSystems;
use bevy::camera::visibility::RenderLayers;
use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::pbr::MaterialPlugin;
use bevy::prelude::*;
use bevy::ui::UiSystems;
use bevy::window::{PresentMode, WindowResolution};
use bevy_egui::{EguiGlobalSettings, EguiPlugin, EguiPrimaryContextPass};
use bevy_panorbit_camera::PanOrbitCameraPlugin;
use camera::{rig_camera, spawn_gallery_camera};
use cli::{CliOptions, parse_cli_options};
use labels::position_panel_labels;
use loading::{AppState, poll_font_loads, start_font_loads};
use panel::{apply_portal_overlays, spawn_gallery, sync_hover_cursor, update_portal_blend};
use portal::{PortalMaterial, resize_portal_targets, sync_portal_projection};
use route::{Location, NavigateTo, ROOT_PATH, apply_navigation, navigate_back_on_escape};
use settings::{GallerySettings, load_settings_or_default, write_settings};
use ui::{OverlayState, overlay_ui, spawn_overlay_camera, toggle_diagnostics};

const CONFIG_PATH: &str = "config/gallery.ron";

// Problems found before the app started, reported once logging is up.
#[derive(Resource, Debug, Default)]
struct StartupReport {
    config_error: Option<String>,
}

fn report_startup(report: Res<StartupReport>, location: Res<Location>) {
    if let Some(err) = &report.config_error {
        warn!("using built-in gallery config: {err}");
    }
    info!(route = location.path(), "gallery starting");
}

pub fn run() -> anyhow::Result<()> {
    let cli = parse_cli_options();
    if cli.write_default_config {
        write_settings(&cli.config_path, &GallerySettings::default())
            .with_context(|| format!("writing default config to {}", cli.config_path.display()))?;
        println!("wrote {}", cli.config_path.display());
        return Ok(());
    }

    run_gallery(cli);
    Ok(())
}

fn run_gallery(cli: CliOptions) {
    let (settings, config_error) = load_settings_or_default(&cli.config_path);
    let location = Location::new(cli.initial_route.as_deref().unwrap_or(ROOT_PATH));

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: settings.window.title.clone(),
                resolution: WindowResolution::new(settings.window.width, settings.window.height),
                present_mode: PresentMode::AutoVsync,
                ..default()
            }),
            ..default()
        }))
        .add_plugins((
            MeshPickingPlugin,
            MaterialPlugin::<PortalMaterial>::default(),
            HierarchyPropagatePlugin::<RenderLayers>::new(PostUpdate),
            EguiPlugin::default(),
            PanOrbitCameraPlugin,
            FrameTimeDiagnosticsPlugin::default(),
        ))
        .insert_resource(EguiGlobalSettings {
            auto_create_primary_context: false,
            enable_cursor_icon_updates: false,
            ..default()
        })
        .insert_resource(ClearColor(settings.background_color()))
        .insert_resource(AutoScaleLog::with_capacity(settings.autoscale.log_capacity))
        .insert_resource(OverlayState::from_settings(&settings))
        .insert_resource(StartupReport {
            config_error: config_error.map(|err| err.to_string()),
        })
        .insert_resource(settings)
        .insert_resource(location)
        .init_state::<AppState>()
        .add_message::<NavigateTo>()
        .add_observer(measure_ready_scene)
        .add_systems(
            Startup,
            (
                report_startup,
                spawn_gallery_camera,
                spawn_overlay_camera,
                start_font_loads,
            ),
        )
        .add_systems(Update, poll_font_loads.run_if(in_state(AppState::Loading)))
        .add_systems(OnEnter(AppState::Gallery), spawn_gallery)
        .add_systems(
            Update,
            (
                (navigate_back_on_escape, apply_navigation).chain(),
                (update_portal_blend, apply_portal_overlays).chain(),
                rig_camera,
            )
                .chain(),
        )
        .add_systems(
            Update,
            (
                sync_hover_cursor,
                sync_model_requests,
                track_model_failures,
                resize_portal_targets,
                sync_portal_projection,
                toggle_diagnostics,
            ),
        )
        // The orbit controller moves the camera in PostUpdate, before CameraUpdateSystems.
        .add_systems(
            PostUpdate,
            position_panel_labels
                .after(CameraUpdateSystems)
                .before(UiSystems::Prepare),
        )
        .add_systems(EguiPrimaryContextPass, overlay_ui)
        .run();
}
