use bevy::camera::primitives::{Aabb, MeshAabb};
use bevy::math::Affine3A;
use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Bounds {
    min: Vec3,
    max: Vec3,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Bounds {
    pub(super) const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub(super) fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub(super) fn include_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub(super) fn include_aabb(&mut self, aabb: &Aabb, transform: &Affine3A) {
        let min = Vec3::from(aabb.min());
        let max = Vec3::from(aabb.max());
        for corner in 0..8 {
            let local = Vec3::new(
                if corner & 1 == 0 { min.x } else { max.x },
                if corner & 2 == 0 { min.y } else { max.y },
                if corner & 4 == 0 { min.z } else { max.z },
            );
            self.include_point(transform.transform_point3(local));
        }
    }

    pub(super) fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub(super) fn max_extent(&self) -> f32 {
        self.size().max_element()
    }
}

// Measured in `root`'s local space: the root's own transform is left out.
pub(super) fn measure_hierarchy(
    root: Entity,
    nodes: &Query<(Option<&Children>, Option<&Transform>, Option<&Mesh3d>)>,
    meshes: &Assets<Mesh>,
) -> Bounds {
    let mut bounds = Bounds::EMPTY;
    let mut stack = vec![(root, Affine3A::IDENTITY)];

    while let Some((entity, parent_to_root)) = stack.pop() {
        let Ok((children, _, mesh)) = nodes.get(entity) else {
            continue;
        };

        if let Some(aabb) = mesh
            .and_then(|mesh| meshes.get(&mesh.0))
            .and_then(|mesh| mesh.compute_aabb())
        {
            bounds.include_aabb(&aabb, &parent_to_root);
        }

        let Some(children) = children else {
            continue;
        };
        for child in children.iter() {
            let local = nodes
                .get(child)
                .ok()
                .and_then(|(_, transform, _)| transform.copied())
                .unwrap_or_default();
            stack.push((child, parent_to_root * local.compute_affine()));
        }
    }

    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bevy::ecs::system::RunSystemOnce;

    #[test]
    fn empty_bounds_have_zero_extent() {
        assert!(Bounds::EMPTY.is_empty());
        assert_eq!(Bounds::EMPTY.max_extent(), 0.0);
    }

    #[test]
    fn single_point_is_degenerate() {
        let mut bounds = Bounds::EMPTY;
        bounds.include_point(Vec3::new(1.0, 2.0, 3.0));
        assert!(!bounds.is_empty());
        assert_eq!(bounds.max_extent(), 0.0);
    }

    #[test]
    fn rotated_box_grows_its_bounds() {
        let aabb = Aabb::from_min_max(Vec3::splat(-0.5), Vec3::splat(0.5));
        let mut bounds = Bounds::EMPTY;
        bounds.include_aabb(
            &aabb,
            &Affine3A::from_rotation_y(std::f32::consts::FRAC_PI_4),
        );
        assert_relative_eq!(bounds.size().x, 2.0_f32.sqrt(), epsilon = 1e-5);
        assert_relative_eq!(bounds.size().y, 1.0, epsilon = 1e-5);
    }

    fn spawn_model(world: &mut World, root_scale: f32) -> Entity {
        let cube = world
            .resource_mut::<Assets<Mesh>>()
            .add(Cuboid::new(1.0, 2.0, 0.5));
        let root = world
            .spawn(Transform::from_scale(Vec3::splat(root_scale)))
            .id();
        let node = world
            .spawn((Transform::from_scale(Vec3::splat(2.0)), ChildOf(root)))
            .id();
        world.spawn((
            Mesh3d(cube),
            Transform::from_xyz(1.0, 0.0, 0.0),
            ChildOf(node),
        ));
        root
    }

    fn measure(world: &mut World, root: Entity) -> Bounds {
        world
            .run_system_once(
                move |nodes: Query<(Option<&Children>, Option<&Transform>, Option<&Mesh3d>)>,
                      meshes: Res<Assets<Mesh>>| {
                    measure_hierarchy(root, &nodes, &meshes)
                },
            )
            .unwrap()
    }

    #[test]
    fn hierarchy_composes_child_transforms() {
        let mut world = World::new();
        world.init_resource::<Assets<Mesh>>();
        let root = spawn_model(&mut world, 1.0);

        let bounds = measure(&mut world, root);
        // Cube 1 x 2 x 0.5 scaled by two.
        assert_relative_eq!(bounds.size().x, 2.0, epsilon = 1e-5);
        assert_relative_eq!(bounds.size().y, 4.0, epsilon = 1e-5);
        assert_relative_eq!(bounds.size().z, 1.0, epsilon = 1e-5);
        assert_relative_eq!(bounds.max_extent(), 4.0, epsilon = 1e-5);
    }

    #[test]
    fn root_scale_does_not_affect_measurement() {
        let mut world = World::new();
        world.init_resource::<Assets<Mesh>>();
        let small = spawn_model(&mut world, 1.0);
        let large = spawn_model(&mut world, 7.5);

        let a = measure(&mut world, small);
        let b = measure(&mut world, large);
        assert_relative_eq!(a.max_extent(), b.max_extent(), epsilon = 1e-5);
    }

    #[test]
    fn hierarchy_without_meshes_is_empty() {
        let mut world = World::new();
        world.init_resource::<Assets<Mesh>>();
        let root = world.spawn(Transform::default()).id();
        world.spawn((Transform::default(), ChildOf(root)));

        assert!(measure(&mut world, root).is_empty());
    }
}
