use super::camera::GalleryCamera;
use super::loading::GalleryFonts;
use super::panel::Panel;
use super::settings::PanelDefinition;
use bevy::prelude::*;
use bevy::text::LineHeight;
use bevy::window::PrimaryWindow;

const LABEL_COLOR: Color = Color::BLACK;
const NAME_LINE_HEIGHT: f32 = 0.8;
const MIN_FONT_PX: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LabelAnchor {
    TopLeft,
    TopRight,
}

#[derive(Component, Debug, Clone, Copy)]
pub(super) struct PanelLabel {
    pub(super) panel: Entity,
    pub(super) local: Vec3,
    pub(super) world_size: f32,
    pub(super) anchor: LabelAnchor,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct LabelSpec {
    pub(super) text: String,
    pub(super) local: Vec3,
    pub(super) world_size: f32,
    pub(super) anchor: LabelAnchor,
    pub(super) medium: bool,
}

pub(super) fn label_specs(definition: &PanelDefinition) -> [LabelSpec; 3] {
    [
        LabelSpec {
            text: definition.name.clone(),
            local: Vec3::new(-0.375, 0.715, 0.01),
            world_size: 0.3,
            anchor: LabelAnchor::TopLeft,
            medium: true,
        },
        LabelSpec {
            text: format!("/{}", definition.id),
            local: Vec3::new(0.4, -0.659, 0.01),
            world_size: 0.1,
            anchor: LabelAnchor::TopRight,
            medium: false,
        },
        LabelSpec {
            text: definition.author.clone(),
            local: Vec3::new(0.0, -0.677, 0.01),
            world_size: 0.04,
            anchor: LabelAnchor::TopRight,
            medium: false,
        },
    ]
}

pub(super) fn spawn_panel_labels(
    commands: &mut Commands,
    panel: Entity,
    definition: &PanelDefinition,
    fonts: &GalleryFonts,
) {
    for spec in label_specs(definition) {
        let font = if spec.medium {
            fonts.medium.handle_or_default()
        } else {
            fonts.regular.handle_or_default()
        };
        let line_height = if spec.medium {
            LineHeight::RelativeToFont(NAME_LINE_HEIGHT)
        } else {
            LineHeight::default()
        };
        let justify = match spec.anchor {
            LabelAnchor::TopLeft => Justify::Left,
            LabelAnchor::TopRight => Justify::Right,
        };

        commands.spawn((
            Name::new(format!("Label{}", definition.id)),
            PanelLabel {
                panel,
                local: spec.local,
                world_size: spec.world_size,
                anchor: spec.anchor,
            },
            Text::new(spec.text),
            TextFont {
                font,
                font_size: MIN_FONT_PX,
                ..default()
            },
            TextColor(LABEL_COLOR),
            line_height,
            TextLayout::new_with_justify(justify),
            Node {
                position_type: PositionType::Absolute,
                ..default()
            },
            Pickable::IGNORE,
            Visibility::Hidden,
        ));
    }
}

// Logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct LabelPlacement {
    pub(super) left: Option<f32>,
    pub(super) right: Option<f32>,
    pub(super) top: f32,
    pub(super) font_px: f32,
}

pub(super) fn place_label(
    anchor: LabelAnchor,
    screen: Vec2,
    font_px: f32,
    viewport_width: f32,
) -> LabelPlacement {
    let font_px = font_px.round().max(MIN_FONT_PX);
    match anchor {
        LabelAnchor::TopLeft => LabelPlacement {
            left: Some(screen.x),
            right: None,
            top: screen.y,
            font_px,
        },
        LabelAnchor::TopRight => LabelPlacement {
            left: None,
            right: Some(viewport_width - screen.x),
            top: screen.y,
            font_px,
        },
    }
}

pub(super) fn position_panel_labels(
    cameras: Query<(&Camera, &Transform), With<GalleryCamera>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    panels: Query<&GlobalTransform, With<Panel>>,
    mut labels: Query<(&PanelLabel, &mut Node, &mut TextFont, &mut Visibility)>,
) {
    let Ok((camera, camera_transform)) = cameras.single() else {
        return;
    };
    // Unparented camera: its local transform is already this frame's pose.
    let camera_transform = GlobalTransform::from(*camera_transform);
    let Ok(window) = windows.single() else {
        return;
    };

    for (label, mut node, mut font, mut visibility) in &mut labels {
        let projected = panels.get(label.panel).ok().and_then(|panel| {
            let anchor = panel.transform_point(label.local);
            let top = panel.transform_point(label.local + Vec3::Y * label.world_size);
            let anchor_px = camera.world_to_viewport(&camera_transform, anchor).ok()?;
            let top_px = camera.world_to_viewport(&camera_transform, top).ok()?;
            Some((anchor_px, anchor_px.distance(top_px)))
        });

        let Some((screen, size_px)) = projected else {
            visibility.set_if_neq(Visibility::Hidden);
            continue;
        };

        let placement = place_label(label.anchor, screen, size_px, window.width());
        node.left = placement.left.map_or(Val::Auto, px);
        node.right = placement.right.map_or(Val::Auto, px);
        node.top = px(placement.top);
        if font.font_size != placement.font_px {
            font.font_size = placement.font_px;
        }
        visibility.set_if_neq(Visibility::Inherited);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::settings::default_panels;

    #[test]
    fn captions_follow_panel_definition() {
        let specs = label_specs(&default_panels()[0]);
        assert_eq!(specs[0].text, "pick\nles");
        assert_eq!(specs[1].text, "/01");
        assert_eq!(specs[2].text, "Omar Faruq Tawsif");
        assert!(specs[0].medium);
        assert_eq!(specs[0].anchor, LabelAnchor::TopLeft);
        assert_eq!(specs[2].world_size, 0.04);
    }

    #[test]
    fn id_and_author_hang_from_their_top_right_corner() {
        let specs = label_specs(&default_panels()[1]);
        assert_eq!(specs[1].anchor, LabelAnchor::TopRight);
        assert_eq!(specs[2].anchor, LabelAnchor::TopRight);
    }

    #[test]
    fn top_left_label_starts_at_point() {
        let placement = place_label(LabelAnchor::TopLeft, Vec2::new(100.0, 50.0), 31.6, 800.0);
        assert_eq!(placement.left, Some(100.0));
        assert_eq!(placement.right, None);
        assert_eq!(placement.top, 50.0);
        assert_eq!(placement.font_px, 32.0);
    }

    #[test]
    fn top_right_label_ends_at_point() {
        let placement = place_label(LabelAnchor::TopRight, Vec2::new(600.0, 300.0), 20.0, 800.0);
        assert_eq!(placement.right, Some(200.0));
        assert_eq!(placement.left, None);
        assert_eq!(placement.top, 300.0);
    }

    #[test]
    fn tiny_text_keeps_a_minimum_size() {
        let placement = place_label(LabelAnchor::TopLeft, Vec2::ZERO, 0.2, 800.0);
        assert_eq!(placement.font_px, MIN_FONT_PX);
    }
}
