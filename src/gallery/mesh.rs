use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use std::f32::consts::FRAC_PI_2;

// Counter-clockwise seen from +Z, starting at the top-right corner.
pub(super) fn rounded_rect_outline(width: f32, height: f32, radius: f32, segments: u32) -> Vec<Vec2> {
    let half = Vec2::new(width * 0.5, height * 0.5);
    let radius = radius.clamp(0.0, half.min_element());
    let segments = segments.max(1);

    let corners = [
        Vec2::new(half.x - radius, half.y - radius),
        Vec2::new(-half.x + radius, half.y - radius),
        Vec2::new(-half.x + radius, -half.y + radius),
        Vec2::new(half.x - radius, -half.y + radius),
    ];

    let mut outline = Vec::with_capacity(corners.len() * (segments as usize + 1));
    for (quadrant, center) in corners.into_iter().enumerate() {
        let start = quadrant as f32 * FRAC_PI_2;
        for step in 0..=segments {
            let angle = start + FRAC_PI_2 * step as f32 / segments as f32;
            outline.push(center + Vec2::from_angle(angle) * radius);
        }
    }
    outline
}

pub(super) fn build_rounded_plane_mesh(width: f32, height: f32, radius: f32, segments: u32) -> Mesh {
    let outline = rounded_rect_outline(width, height, radius, segments);

    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(outline.len() + 1);
    let mut uvs: Vec<[f32; 2]> = Vec::with_capacity(outline.len() + 1);
    let mut indices: Vec<u32> = Vec::with_capacity(outline.len() * 3);

    let uv = |point: Vec2| [point.x / width + 0.5, 0.5 - point.y / height];

    positions.push([0.0, 0.0, 0.0]);
    uvs.push(uv(Vec2::ZERO));
    for point in &outline {
        positions.push([point.x, point.y, 0.0]);
        uvs.push(uv(*point));
    }

    let rim = outline.len() as u32;
    for i in 0..rim {
        let next = (i + 1) % rim;
        indices.extend_from_slice(&[0, i + 1, next + 1]);
    }

    let normals = vec![[0.0, 0.0, 1.0]; positions.len()];

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}
