use super::autoscale::AutoScaledModel;
use super::camera::GalleryCamera;
use super::damping::SmoothDamped;
use super::labels::spawn_panel_labels;
use super::loading::GalleryFonts;
use super::mesh::build_rounded_plane_mesh;
use super::portal::{
    PortalMaterial, PortalOverlay, PortalSpawn, overlay_alpha, spawn_portal, spawn_portal_content,
};
use super::route::{Location, NavigateTo, PanelId};
use super::settings::{GallerySettings, PanelDefinition, parse_color};
use bevy::picking::hover::DirectlyHovered;
use bevy::prelude::*;
use bevy::window::{CursorIcon, PrimaryWindow, SystemCursorIcon};

// Layer 0 is the gallery itself.
pub(super) const FIRST_PORTAL_LAYER: usize = 1;

#[derive(Component, Debug, Clone)]
#[require(Transform, Visibility, DirectlyHovered, PortalBlend, ClickTracker)]
pub(super) struct Panel {
    pub(super) id: PanelId,
}

// 0 closed, 1 fills the view.
#[derive(Component, Debug, Clone, Copy, Default)]
pub(super) struct PortalBlend(pub(super) SmoothDamped);

impl PortalBlend {
    pub(super) fn value(&self) -> f32 {
        self.0.value
    }
}

#[derive(Component, Debug, Clone, Copy, Default)]
pub(super) struct ClickTracker {
    last_click: Option<f64>,
}

impl ClickTracker {
    // A completed pair is consumed.
    pub(super) fn register(&mut self, now: f64, window_secs: f64) -> bool {
        match self.last_click {
            Some(last) if now - last <= window_secs => {
                self.last_click = None;
                true
            }
            _ => {
                self.last_click = Some(now);
                false
            }
        }
    }
}

pub(super) fn click_navigation(
    panel: &Panel,
    tracker: &mut ClickTracker,
    now: f64,
    window_secs: f64,
) -> Option<NavigateTo> {
    tracker
        .register(now, window_secs)
        .then(|| NavigateTo::item(&panel.id))
}

pub(super) fn on_panel_click(
    mut click: On<Pointer<Click>>,
    time: Res<Time>,
    settings: Res<GallerySettings>,
    mut panels: Query<(&Panel, &mut ClickTracker)>,
    mut navigate: MessageWriter<NavigateTo>,
) {
    if click.button != PointerButton::Primary {
        return;
    }
    let Ok((panel, mut tracker)) = panels.get_mut(click.entity) else {
        return;
    };
    click.propagate(false);

    let window_secs = f64::from(settings.portal.double_click_secs);
    if let Some(request) = click_navigation(panel, &mut tracker, time.elapsed_secs_f64(), window_secs)
    {
        info!(id = %panel.id, "panel double-clicked");
        navigate.write(request);
    }
}

pub(super) fn sync_hover_cursor(
    mut commands: Commands,
    panels: Query<&DirectlyHovered, With<Panel>>,
    windows: Query<(Entity, Option<&CursorIcon>), With<PrimaryWindow>>,
) {
    let Ok((window, current)) = windows.single() else {
        return;
    };
    let wanted = if panels.iter().any(DirectlyHovered::get) {
        CursorIcon::from(SystemCursorIcon::Pointer)
    } else {
        CursorIcon::default()
    };
    if current != Some(&wanted) {
        commands.entity(window).insert(wanted);
    }
}

pub(super) fn update_portal_blend(
    time: Res<Time>,
    location: Res<Location>,
    settings: Res<GallerySettings>,
    mut panels: Query<(&Panel, &mut PortalBlend)>,
) {
    let dt = time.delta_secs();
    for (panel, mut blend) in &mut panels {
        let target = if location.is_active(&panel.id) {
            1.0
        } else {
            0.0
        };
        blend
            .0
            .step(target, settings.portal.blend_smooth_time, dt);
    }
}

pub(super) fn apply_portal_overlays(
    panels: Query<&PortalBlend>,
    mut overlays: Query<(&PortalOverlay, &mut ImageNode, &mut Visibility)>,
) {
    for (overlay, mut image, mut visibility) in &mut overlays {
        let blend = panels.get(overlay.panel).map_or(0.0, PortalBlend::value);
        match overlay_alpha(blend) {
            Some(alpha) => {
                image.color = Color::WHITE.with_alpha(alpha);
                visibility.set_if_neq(Visibility::Inherited);
            }
            None => {
                visibility.set_if_neq(Visibility::Hidden);
            }
        }
    }
}

fn spawn_panel(
    commands: &mut Commands,
    settings: &GallerySettings,
    definition: &PanelDefinition,
    layer: usize,
    surface: Handle<Mesh>,
    fonts: &GalleryFonts,
) -> Entity {
    let panel = commands
        .spawn((
            Name::new(format!("Panel{}", definition.id)),
            Panel {
                id: PanelId::new(definition.id.clone()),
            },
            Mesh3d(surface),
            definition.transform(),
        ))
        .observe(on_panel_click)
        .id();

    let content = spawn_portal_content(commands, panel, layer, &settings.portal);
    commands.spawn((
        Name::new(format!("Model{}", definition.id)),
        AutoScaledModel::new(
            definition.model.src.clone(),
            settings.target_size_for(&definition.model),
        ),
        Transform::from_translation(Vec3::from_array(definition.model.position)),
        ChildOf(content),
    ));

    spawn_panel_labels(commands, panel, definition, fonts);
    panel
}

pub(super) fn spawn_gallery(
    mut commands: Commands,
    settings: Res<GallerySettings>,
    fonts: Res<GalleryFonts>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut images: ResMut<Assets<Image>>,
    mut materials: ResMut<Assets<PortalMaterial>>,
    cameras: Query<(Entity, &Projection), With<GalleryCamera>>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let Ok((camera, projection)) = cameras.single() else {
        error!("gallery camera missing, cannot build portals");
        return;
    };
    let target_size = windows
        .single()
        .map(|window| UVec2::new(window.physical_width(), window.physical_height()))
        .unwrap_or(UVec2::ONE);

    let portal = &settings.portal;
    let surface = meshes.add(build_rounded_plane_mesh(
        portal.width,
        portal.height,
        portal.corner_radius,
        portal.corner_segments,
    ));

    for (index, definition) in settings.panels.iter().enumerate() {
        let layer = FIRST_PORTAL_LAYER + index;
        let clear_color = parse_color(&definition.background).unwrap_or(Color::WHITE);
        let panel = spawn_panel(
            &mut commands,
            &settings,
            definition,
            layer,
            surface.clone(),
            &fonts,
        );
        let material = spawn_portal(
            &mut commands,
            &mut images,
            &mut materials,
            camera,
            projection,
            portal,
            PortalSpawn {
                panel,
                layer,
                clear_color,
                target_size,
            },
        );
        commands.entity(panel).insert(MeshMaterial3d(material));
        info!(id = %definition.id, layer, "panel spawned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::route::apply_navigation;
    use approx::assert_relative_eq;
    use bevy::camera::NormalizedRenderTarget;
    use bevy::picking::backend::HitData;
    use bevy::picking::pointer::{Location as PointerLocation, PointerId};
    use std::time::Duration;

    const WINDOW: f64 = 0.35;

    #[test]
    fn single_click_does_nothing() {
        let mut tracker = ClickTracker::default();
        assert!(!tracker.register(1.0, WINDOW));
    }

    #[test]
    fn two_quick_clicks_make_a_double_click() {
        let mut tracker = ClickTracker::default();
        assert!(!tracker.register(1.0, WINDOW));
        assert!(tracker.register(1.2, WINDOW));
    }

    #[test]
    fn slow_clicks_restart_the_pair() {
        let mut tracker = ClickTracker::default();
        assert!(!tracker.register(1.0, WINDOW));
        assert!(!tracker.register(2.0, WINDOW));
        assert!(tracker.register(2.1, WINDOW));
    }

    #[test]
    fn triple_click_opens_once() {
        let mut tracker = ClickTracker::default();
        let opened: Vec<bool> = [0.0, 0.1, 0.2]
            .into_iter()
            .map(|t| tracker.register(t, WINDOW))
            .collect();
        assert_eq!(opened, vec![false, true, false]);
    }

    #[test]
    fn double_click_on_panel_two_routes_to_it() {
        let panel = Panel {
            id: PanelId::new("02"),
        };
        let mut tracker = ClickTracker::default();
        assert_eq!(click_navigation(&panel, &mut tracker, 5.0, WINDOW), None);
        assert_eq!(
            click_navigation(&panel, &mut tracker, 5.2, WINDOW),
            Some(NavigateTo("/item/02".to_string()))
        );
    }

    fn blend_app() -> App {
        let mut app = App::new();
        app.add_message::<NavigateTo>()
            .init_resource::<Location>()
            .insert_resource(GallerySettings::default())
            .insert_resource(Time::<()>::default())
            .add_systems(Update, (apply_navigation, update_portal_blend).chain());
        app
    }

    fn advance(app: &mut App, seconds: f32) {
        let frames = (seconds * 60.0).round() as usize;
        for _ in 0..frames {
            app.world_mut()
                .resource_mut::<Time>()
                .advance_by(Duration::from_secs_f32(1.0 / 60.0));
            app.update();
        }
    }

    #[test]
    fn routed_panel_blends_in_and_others_stay_closed() {
        let mut app = blend_app();
        let two = app
            .world_mut()
            .spawn(Panel {
                id: PanelId::new("02"),
            })
            .id();
        let three = app
            .world_mut()
            .spawn(Panel {
                id: PanelId::new("03"),
            })
            .id();

        app.world_mut()
            .write_message(NavigateTo::item(&PanelId::new("02")));
        advance(&mut app, 0.2);

        let open = app.world().get::<PortalBlend>(two).unwrap().value();
        assert!(open > 0.0 && open < 1.0, "blend after 0.2s was {open}");
        assert_eq!(app.world().get::<PortalBlend>(three).unwrap().value(), 0.0);

        advance(&mut app, 3.0);
        assert_relative_eq!(app.world().get::<PortalBlend>(two).unwrap().value(), 1.0);

        app.world_mut().write_message(NavigateTo::root());
        advance(&mut app, 3.0);
        assert_eq!(app.world().get::<PortalBlend>(two).unwrap().value(), 0.0);
    }

    #[derive(Resource, Default)]
    struct ClicksReachingParent(usize);

    fn primary_click(panel: Entity) -> Pointer<Click> {
        Pointer::new(
            PointerId::Mouse,
            PointerLocation {
                target: NormalizedRenderTarget::None {
                    width: 1,
                    height: 1,
                },
                position: Vec2::ZERO,
            },
            Click {
                button: PointerButton::Primary,
                hit: HitData::new(Entity::PLACEHOLDER, 0.0, None, None),
                duration: Duration::ZERO,
            },
            panel,
        )
    }

    #[test]
    fn double_click_observer_routes_and_stops_propagation() {
        let mut app = blend_app();
        app.init_resource::<ClicksReachingParent>();
        let parent = app
            .world_mut()
            .spawn_empty()
            .observe(
                |_: On<Pointer<Click>>, mut clicks: ResMut<ClicksReachingParent>| clicks.0 += 1,
            )
            .id();
        let panel = app
            .world_mut()
            .spawn((
                Panel {
                    id: PanelId::new("02"),
                },
                ChildOf(parent),
            ))
            .observe(on_panel_click)
            .id();

        app.world_mut().trigger(primary_click(panel));
        app.update();
        assert_eq!(app.world().resource::<Location>().path(), "/");

        app.world_mut().trigger(primary_click(panel));
        app.update();
        assert_eq!(app.world().resource::<Location>().path(), "/item/02");
        assert_eq!(app.world().resource::<ClicksReachingParent>().0, 0);
    }
}
