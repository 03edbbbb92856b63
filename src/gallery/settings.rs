use super::error::ConfigError;
use bevy::prelude::*;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub(super) const GOLDEN_RATIO: f32 = 1.618_033_9;

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct GallerySettings {
    pub(super) window: WindowSettings,
    pub(super) background: String,
    pub(super) camera: CameraSettings,
    pub(super) portal: PortalSettings,
    pub(super) autoscale: AutoScaleSettings,
    pub(super) fonts: FontSettings,
    pub(super) debug: DebugSettings,
    pub(super) panels: Vec<PanelDefinition>,
}

impl Default for GallerySettings {
    fn default() -> Self {
        Self {
            window: WindowSettings::default(),
            background: "#f0f0f0".to_string(),
            camera: CameraSettings::default(),
            portal: PortalSettings::default(),
            autoscale: AutoScaleSettings::default(),
            fonts: FontSettings::default(),
            debug: DebugSettings::default(),
            panels: default_panels(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct WindowSettings {
    pub(super) title: String,
    pub(super) width: u32,
    pub(super) height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "portal gallery".to_string(),
            width: 1600,
            height: 900,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct CameraSettings {
    pub(super) fov_degrees: f32,
    pub(super) start_position: [f32; 3],
    pub(super) idle_position: [f32; 3],
    pub(super) idle_focus: [f32; 3],
    // Frame-local eye and look-at point while a panel is focused.
    pub(super) focus_eye_offset: [f32; 3],
    pub(super) focus_target_offset: [f32; 3],
    pub(super) smoothness: f32,
    pub(super) min_polar_degrees: f32,
    pub(super) max_polar_degrees: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            start_position: [0.0, 0.0, 20.0],
            idle_position: [0.0, 0.0, 2.0],
            idle_focus: [0.0, 0.0, 0.0],
            focus_eye_offset: [0.0, 0.5, 0.25],
            focus_target_offset: [0.0, 0.0, -2.0],
            smoothness: 0.5,
            min_polar_degrees: 0.0,
            max_polar_degrees: 90.0,
        }
    }
}

impl CameraSettings {
    // Polar angles are measured from +Y, orbit pitch from the horizon.
    pub(super) fn pitch_limits(&self) -> (f32, f32) {
        (
            (90.0 - self.max_polar_degrees).to_radians(),
            (90.0 - self.min_polar_degrees).to_radians(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct PortalSettings {
    pub(super) width: f32,
    pub(super) height: f32,
    pub(super) corner_radius: f32,
    pub(super) corner_segments: u32,
    pub(super) blend_smooth_time: f32,
    pub(super) double_click_secs: f32,
    pub(super) ambient_brightness: f32,
    pub(super) light_position: [f32; 3],
    pub(super) light_illuminance: f32,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: GOLDEN_RATIO,
            corner_radius: 0.1,
            corner_segments: 16,
            blend_smooth_time: 0.2,
            double_click_secs: 0.35,
            ambient_brightness: 400.0,
            light_position: [0.0, 0.0, 5.0],
            light_illuminance: 6_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct AutoScaleSettings {
    pub(super) default_target_size: f32,
    pub(super) log_capacity: usize,
}

impl Default for AutoScaleSettings {
    fn default() -> Self {
        Self {
            default_target_size: 1.2,
            log_capacity: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct FontSettings {
    pub(super) regular: String,
    pub(super) medium: String,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            regular: "fonts/Inter-Regular.ttf".to_string(),
            medium: "fonts/Inter-Medium.ttf".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct DebugSettings {
    pub(super) show_overlay: bool,
    pub(super) show_diagnostics: bool,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            show_overlay: true,
            show_diagnostics: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct PanelDefinition {
    pub(super) id: String,
    pub(super) name: String,
    pub(super) author: String,
    pub(super) background: String,
    pub(super) position: [f32; 3],
    pub(super) rotation: [f32; 3],
    pub(super) model: ModelDefinition,
}

impl Default for PanelDefinition {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            author: String::new(),
            background: "#ffffff".to_string(),
            position: [0.0; 3],
            rotation: [0.0; 3],
            model: ModelDefinition::default(),
        }
    }
}

impl PanelDefinition {
    pub(super) fn transform(&self) -> Transform {
        Transform::from_translation(Vec3::from_array(self.position)).with_rotation(
            Quat::from_euler(
                EulerRot::XYZ,
                self.rotation[0],
                self.rotation[1],
                self.rotation[2],
            ),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct ModelDefinition {
    pub(super) src: String,
    pub(super) target_size: Option<f32>,
    pub(super) position: [f32; 3],
}

impl Default for ModelDefinition {
    fn default() -> Self {
        Self {
            src: String::new(),
            target_size: None,
            position: [0.0; 3],
        }
    }
}

pub(super) fn default_panels() -> Vec<PanelDefinition> {
    let author = "Omar Faruq Tawsif".to_string();
    vec![
        PanelDefinition {
            id: "01".to_string(),
            name: "pick\nles".to_string(),
            author: author.clone(),
            background: "#e4cdac".to_string(),
            position: [-1.15, 0.0, 0.0],
            rotation: [0.0, 0.5, 0.0],
            model: ModelDefinition {
                src: "models/wenbo1.glb".to_string(),
                target_size: Some(1.2),
                position: [0.0, -0.7, -2.0],
            },
        },
        PanelDefinition {
            id: "02".to_string(),
            name: "tea".to_string(),
            author: author.clone(),
            model: ModelDefinition {
                src: "models/wenbo2.glb".to_string(),
                target_size: Some(1.2),
                position: [0.0, 0.0, -2.5],
            },
            ..default()
        },
        PanelDefinition {
            id: "03".to_string(),
            name: "still".to_string(),
            author,
            background: "#d1d1ca".to_string(),
            position: [1.15, 0.0, 0.0],
            rotation: [0.0, -0.5, 0.0],
            model: ModelDefinition {
                src: "models/wenbo3.glb".to_string(),
                target_size: Some(1.2),
                position: [0.0, -0.8, -4.0],
            },
        },
    ]
}

pub(super) fn parse_color(hex: &str) -> Result<Color, ConfigError> {
    Srgba::hex(hex)
        .map(Color::from)
        .map_err(|err| ConfigError::Invalid(format!("bad colour '{hex}': {err}")))
}

impl GallerySettings {
    pub(super) fn target_size_for(&self, model: &ModelDefinition) -> f32 {
        model
            .target_size
            .unwrap_or(self.autoscale.default_target_size)
    }

    pub(super) fn background_color(&self) -> Color {
        parse_color(&self.background).unwrap_or(Color::WHITE)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.panels.is_empty() {
            return Err(ConfigError::Invalid("config has no panels".to_string()));
        }

        let mut seen = HashSet::new();
        for panel in &self.panels {
            let id = panel.id.as_str();
            if id.is_empty() {
                return Err(ConfigError::Invalid("panel id must not be empty".to_string()));
            }
            if id.contains(|c: char| c == '/' || c.is_whitespace()) {
                return Err(ConfigError::Invalid(format!(
                    "panel id '{id}' must not contain '/' or whitespace"
                )));
            }
            if !seen.insert(id.to_string()) {
                return Err(ConfigError::Invalid(format!("duplicate panel id '{id}'")));
            }
            parse_color(&panel.background)?;

            let target = self.target_size_for(&panel.model);
            if !(target.is_finite() && target > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "panel '{id}': target size must be > 0, got {target}"
                )));
            }
        }

        parse_color(&self.background)?;

        let positive = [
            ("portal.blend_smooth_time", self.portal.blend_smooth_time),
            ("portal.double_click_secs", self.portal.double_click_secs),
            ("portal.width", self.portal.width),
            ("portal.height", self.portal.height),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a finite value > 0, got {value}"
                )));
            }
        }
        if !(0.0..1.0).contains(&self.camera.smoothness) {
            return Err(ConfigError::Invalid(format!(
                "camera.smoothness must be in [0, 1), got {}",
                self.camera.smoothness
            )));
        }

        let (min_polar, max_polar) = (
            self.camera.min_polar_degrees,
            self.camera.max_polar_degrees,
        );
        if !(0.0..=180.0).contains(&min_polar)
            || !(0.0..=180.0).contains(&max_polar)
            || min_polar > max_polar
        {
            return Err(ConfigError::Invalid(format!(
                "polar range must satisfy 0 <= min <= max <= 180, got [{min_polar}, {max_polar}]"
            )));
        }
        if !(1.0..=179.0).contains(&self.camera.fov_degrees) {
            return Err(ConfigError::Invalid(format!(
                "fov_degrees must be in [1, 179], got {}",
                self.camera.fov_degrees
            )));
        }

        Ok(())
    }
}

pub(super) fn load_settings(path: &Path) -> Result<GallerySettings, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings =
        ron::de::from_str::<GallerySettings>(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    settings.validate()?;
    Ok(settings)
}

pub(super) fn write_settings(path: &Path, settings: &GallerySettings) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let content = ron::ser::to_string_pretty(settings, PrettyConfig::new())?;
    fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

// The error is handed back so it can be logged once logging is up.
pub(super) fn load_settings_or_default(path: &Path) -> (GallerySettings, Option<ConfigError>) {
    if !path.exists() {
        return (GallerySettings::default(), None);
    }

    match load_settings(path) {
        Ok(settings) => (settings, None),
        Err(err) => (GallerySettings::default(), Some(err)),
    }
}
