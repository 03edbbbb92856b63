use super::panel::Panel;
use super::route::Location;
use super::settings::{CameraSettings, GallerySettings};
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::prelude::*;
use bevy_panorbit_camera::PanOrbitCamera;
use std::f32::consts::{PI, TAU};

const MIN_RADIUS: f32 = 0.05;

#[derive(Component)]
pub(super) struct GalleryCamera;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct LookAt {
    pub(super) eye: Vec3,
    pub(super) target: Vec3,
}

// Last goal handed to the orbit controller. Only a changed goal is re-issued.
#[derive(Component, Debug, Default, Clone, Copy)]
pub(super) struct CameraRig {
    last: Option<LookAt>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct OrbitGoal {
    pub(super) focus: Vec3,
    pub(super) yaw: f32,
    pub(super) pitch: f32,
    pub(super) radius: f32,
}

pub(super) fn rig_look_at(active: Option<&GlobalTransform>, settings: &CameraSettings) -> LookAt {
    match active {
        Some(frame) => LookAt {
            eye: frame.transform_point(Vec3::from_array(settings.focus_eye_offset)),
            target: frame.transform_point(Vec3::from_array(settings.focus_target_offset)),
        },
        None => LookAt {
            eye: Vec3::from_array(settings.idle_position),
            target: Vec3::from_array(settings.idle_focus),
        },
    }
}

fn nearest_angle(current: f32, target: f32) -> f32 {
    let mut delta = (target - current) % TAU;
    if delta > PI {
        delta -= TAU;
    } else if delta < -PI {
        delta += TAU;
    }
    current + delta
}

// Yaw is measured from +Z toward +X, pitch up from the horizon.
pub(super) fn orbit_goal(look: LookAt, pitch_limits: (f32, f32), current_yaw: f32) -> OrbitGoal {
    let offset = look.eye - look.target;
    let radius = offset.length();
    let (yaw, pitch) = if radius < MIN_RADIUS {
        (current_yaw, 0.0)
    } else {
        (
            offset.x.atan2(offset.z),
            (offset.y / radius).clamp(-1.0, 1.0).asin(),
        )
    };

    OrbitGoal {
        focus: look.target,
        yaw: nearest_angle(current_yaw, yaw),
        pitch: pitch.clamp(pitch_limits.0, pitch_limits.1),
        radius: radius.max(MIN_RADIUS),
    }
}

pub(super) fn orbit_camera(settings: &CameraSettings, focus: Vec3) -> PanOrbitCamera {
    let (pitch_lower, pitch_upper) = settings.pitch_limits();
    PanOrbitCamera {
        focus,
        target_focus: focus,
        pitch_lower_limit: Some(pitch_lower),
        pitch_upper_limit: Some(pitch_upper),
        zoom_lower_limit: MIN_RADIUS,
        orbit_smoothness: settings.smoothness,
        pan_smoothness: settings.smoothness,
        zoom_smoothness: settings.smoothness,
        ..default()
    }
}

pub(super) fn spawn_gallery_camera(mut commands: Commands, settings: Res<GallerySettings>) {
    let camera = &settings.camera;
    let start = Vec3::from_array(camera.start_position);
    let focus = Vec3::from_array(camera.idle_focus);

    commands.spawn((
        Name::new("GalleryCamera"),
        GalleryCamera,
        CameraRig::default(),
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: camera.fov_degrees.to_radians(),
            ..default()
        }),
        Tonemapping::None,
        IsDefaultUiCamera,
        Transform::from_translation(start).looking_at(focus, Vec3::Y),
        orbit_camera(camera, focus),
    ));
}

pub(super) fn rig_camera(
    location: Res<Location>,
    settings: Res<GallerySettings>,
    panels: Query<(&Panel, &GlobalTransform)>,
    mut cameras: Query<(&mut CameraRig, &mut PanOrbitCamera), With<GalleryCamera>>,
) {
    let active = panels
        .iter()
        .find(|(panel, _)| location.is_active(&panel.id))
        .map(|(_, transform)| transform);
    let look = rig_look_at(active, &settings.camera);

    for (mut rig, mut orbit) in &mut cameras {
        // The controller overwrites its targets from the transform on its first update.
        if !orbit.initialized || rig.last == Some(look) {
            continue;
        }
        let goal = orbit_goal(look, settings.camera.pitch_limits(), orbit.target_yaw);
        orbit.target_focus = goal.focus;
        orbit.target_yaw = goal.yaw;
        orbit.target_pitch = goal.pitch;
        orbit.target_radius = goal.radius;
        rig.last = Some(look);
        debug!(focus = ?goal.focus, radius = goal.radius, "camera retargeted");
    }
}
