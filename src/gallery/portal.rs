use super::camera::GalleryCamera;
use super::settings::PortalSettings;
use bevy::app::Propagate;
use bevy::camera::RenderTarget;
use bevy::camera::visibility::RenderLayers;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::mesh::MeshVertexBufferLayoutRef;
use bevy::pbr::{Material, MaterialPipeline, MaterialPipelineKey};
use bevy::prelude::*;
use bevy::render::render_resource::{
    AsBindGroup, Extent3d, RenderPipelineDescriptor, SpecializedMeshPipelineError, TextureFormat,
};
use bevy::shader::ShaderRef;
use bevy::window::PrimaryWindow;

pub(super) const PORTAL_SHADER_PATH: &str = "shaders/portal.wgsl";
const OVERLAY_Z_INDEX: i32 = 10;
const OVERLAY_MIN_ALPHA: f32 = 0.002;

#[derive(Asset, TypePath, AsBindGroup, Debug, Clone)]
pub(super) struct PortalMaterial {
    #[texture(0)]
    #[sampler(1)]
    pub(super) view: Handle<Image>,
}

impl Material for PortalMaterial {
    fn fragment_shader() -> ShaderRef {
        PORTAL_SHADER_PATH.into()
    }

    fn specialize(
        _pipeline: &MaterialPipeline,
        descriptor: &mut RenderPipelineDescriptor,
        _layout: &MeshVertexBufferLayoutRef,
        _key: MaterialPipelineKey<Self>,
    ) -> Result<(), SpecializedMeshPipelineError> {
        draw_both_faces(descriptor);
        Ok(())
    }
}

// The window into the nested scene stays visible from behind the panel.
fn draw_both_faces(descriptor: &mut RenderPipelineDescriptor) {
    descriptor.primitive.cull_mode = None;
}

// Off-screen camera rendering one panel's nested scene.
#[derive(Component, Debug, Clone)]
pub(super) struct PortalView {
    pub(super) image: Handle<Image>,
}

#[derive(Component, Debug, Clone, Copy)]
pub(super) struct PortalOverlay {
    pub(super) panel: Entity,
}

pub(super) fn portal_image(size: UVec2) -> Image {
    Image::new_target_texture(
        size.x.max(1),
        size.y.max(1),
        TextureFormat::Rgba8UnormSrgb,
        None,
    )
}

pub(super) struct PortalSpawn {
    pub(super) panel: Entity,
    pub(super) layer: usize,
    pub(super) clear_color: Color,
    pub(super) target_size: UVec2,
}

// Returns the material for the panel surface.
pub(super) fn spawn_portal(
    commands: &mut Commands,
    images: &mut Assets<Image>,
    materials: &mut Assets<PortalMaterial>,
    camera: Entity,
    projection: &Projection,
    portal: &PortalSettings,
    spawn: PortalSpawn,
) -> Handle<PortalMaterial> {
    let image = images.add(portal_image(spawn.target_size));

    let view = commands
        .spawn((
            Name::new(format!("PortalCamera{}", spawn.layer)),
            PortalView {
                image: image.clone(),
            },
            Camera3d::default(),
            Camera {
                order: -(spawn.layer as isize),
                clear_color: ClearColorConfig::Custom(spawn.clear_color),
                ..default()
            },
            RenderTarget::Image(image.clone().into()),
            projection.clone(),
            Tonemapping::None,
            AmbientLight {
                brightness: portal.ambient_brightness,
                ..default()
            },
            RenderLayers::layer(spawn.layer),
            Transform::default(),
        ))
        .id();
    commands.entity(camera).add_child(view);

    commands.spawn((
        Name::new(format!("PortalOverlay{}", spawn.layer)),
        PortalOverlay { panel: spawn.panel },
        ImageNode {
            image: image.clone(),
            color: Color::WHITE.with_alpha(0.0),
            ..default()
        },
        Node {
            position_type: PositionType::Absolute,
            left: px(0.0),
            top: px(0.0),
            width: percent(100.0),
            height: percent(100.0),
            ..default()
        },
        GlobalZIndex(OVERLAY_Z_INDEX),
        Pickable::IGNORE,
        Visibility::Hidden,
    ));

    materials.add(PortalMaterial { view: image })
}

// Everything below the returned root renders on `layer` only.
pub(super) fn spawn_portal_content(
    commands: &mut Commands,
    panel: Entity,
    layer: usize,
    portal: &PortalSettings,
) -> Entity {
    let light_position = Vec3::from_array(portal.light_position);
    let content = commands
        .spawn((
            Name::new(format!("PortalContent{layer}")),
            Propagate(RenderLayers::layer(layer)),
            Transform::default(),
            Visibility::default(),
            ChildOf(panel),
        ))
        .id();
    commands.spawn((
        DirectionalLight {
            illuminance: portal.light_illuminance,
            ..default()
        },
        Transform::from_translation(light_position).looking_at(Vec3::ZERO, Vec3::Y),
        ChildOf(content),
    ));
    content
}

pub(super) fn resize_portal_targets(
    windows: Query<&Window, With<PrimaryWindow>>,
    views: Query<&PortalView>,
    mut images: ResMut<Assets<Image>>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let size = UVec2::new(window.physical_width().max(1), window.physical_height().max(1));

    for view in &views {
        let needs_resize = images
            .get(&view.image)
            .is_some_and(|image| image.size() != size);
        if !needs_resize {
            continue;
        }
        if let Some(image) = images.get_mut(&view.image) {
            image.resize(Extent3d {
                width: size.x,
                height: size.y,
                depth_or_array_layers: 1,
            });
        }
    }
}

pub(super) fn sync_portal_projection(
    main: Query<&Projection, (With<GalleryCamera>, Changed<Projection>)>,
    mut views: Query<&mut Projection, (With<PortalView>, Without<GalleryCamera>)>,
) {
    let Ok(projection) = main.single() else {
        return;
    };
    for mut view_projection in &mut views {
        *view_projection = projection.clone();
    }
}

pub(super) fn overlay_alpha(blend: f32) -> Option<f32> {
    let blend = blend.clamp(0.0, 1.0);
    (blend > OVERLAY_MIN_ALPHA).then_some(blend)
}
