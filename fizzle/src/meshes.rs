//! Procedural geometry.
//!
//! The `*_mesh` functions only build [`MeshData`] on the CPU. The matching
//! `create_*` functions upload it into a new [`Renderable`].

use crate::graphics::{DrawMode, Graphics};
use crate::renderable::{MeshData, MeshError, Renderable};
use nalgebra::{Vector2, Vector3};
use std::f32::consts::{PI, TAU};

/// Appends a quad given counter-clockwise (seen from the front) corners:
/// bottom left, bottom right, top right, top left.
///
/// `face` is the (normal, tangent) pair used when an edge has zero length.
fn push_quad(
    mesh: &mut MeshData,
    corners: [Vector3<f32>; 4],
    face: (Vector3<f32>, Vector3<f32>),
) {
    let [bl, br, _, tl] = corners;
    let (face_normal, face_tangent) = face;
    let tangent = (br - bl).try_normalize(f32::EPSILON).unwrap_or(face_tangent);
    let normal = tangent
        .cross(&(tl - bl))
        .try_normalize(f32::EPSILON)
        .unwrap_or(face_normal);
    let base = mesh.positions.len() as u32;

    let uvs = [
        Vector2::new(0.0, 0.0),
        Vector2::new(1.0, 0.0),
        Vector2::new(1.0, 1.0),
        Vector2::new(0.0, 1.0),
    ];
    for (corner, uv) in corners.into_iter().zip(uvs) {
        mesh.positions.push(corner);
        mesh.normals.push(normal);
        mesh.uvs.push(uv);
        mesh.tangents.push(tangent);
    }

    mesh.indices
        .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
}

/// Axis aligned box between two corners.
///
/// Every face has its own four vertices so normals stay flat: 24 vertices,
/// 36 indices.
pub fn cube_mesh(x0: f32, y0: f32, z0: f32, x1: f32, y1: f32, z1: f32) -> MeshData {
    let v = Vector3::new;
    let (x, y, z) = (Vector3::x(), Vector3::y(), Vector3::z());
    let mut mesh = MeshData::default();

    // +Z, -Z
    push_quad(&mut mesh, [v(x0, y0, z1), v(x1, y0, z1), v(x1, y1, z1), v(x0, y1, z1)], (z, x));
    push_quad(&mut mesh, [v(x1, y0, z0), v(x0, y0, z0), v(x0, y1, z0), v(x1, y1, z0)], (-z, -x));
    // +X, -X
    push_quad(&mut mesh, [v(x1, y0, z1), v(x1, y0, z0), v(x1, y1, z0), v(x1, y1, z1)], (x, -z));
    push_quad(&mut mesh, [v(x0, y0, z0), v(x0, y0, z1), v(x0, y1, z1), v(x0, y1, z0)], (-x, z));
    // +Y, -Y
    push_quad(&mut mesh, [v(x0, y1, z1), v(x1, y1, z1), v(x1, y1, z0), v(x0, y1, z0)], (y, x));
    push_quad(&mut mesh, [v(x0, y0, z0), v(x1, y0, z0), v(x1, y0, z1), v(x0, y0, z1)], (-y, x));

    mesh
}

pub fn create_cube(
    gfx: &Graphics,
    x0: f32,
    y0: f32,
    z0: f32,
    x1: f32,
    y1: f32,
    z1: f32,
) -> Result<Renderable, MeshError> {
    Renderable::from_mesh(gfx, &cube_mesh(x0, y0, z0, x1, y1, z1))
}

/// UV sphere centered on the origin. `rings` is clamped to at least 2 and
/// `sectors` to at least 3.
pub fn sphere_mesh(radius: f32, rings: u32, sectors: u32) -> MeshData {
    let rings = rings.max(2);
    let sectors = sectors.max(3);
    let mut mesh = MeshData::default();

    for r in 0..=rings {
        let v = r as f32 / rings as f32;
        let theta = v * PI;
        for s in 0..=sectors {
            let u = s as f32 / sectors as f32;
            let phi = u * TAU;

            let normal = Vector3::new(phi.cos() * theta.sin(), theta.cos(), phi.sin() * theta.sin());
            mesh.positions.push(normal * radius);
            mesh.normals.push(normal);
            mesh.uvs.push(Vector2::new(u, v));
            mesh.tangents.push(Vector3::new(-phi.sin(), 0.0, phi.cos()));
        }
    }

    let row = sectors + 1;
    for r in 0..rings {
        for s in 0..sectors {
            let i0 = r * row + s;
            let i1 = i0 + row;
            mesh.indices
                .extend_from_slice(&[i0, i0 + 1, i1, i0 + 1, i1 + 1, i1]);
        }
    }

    mesh
}

pub fn create_sphere(
    gfx: &Graphics,
    radius: f32,
    rings: u32,
    sectors: u32,
) -> Result<Renderable, MeshError> {
    Renderable::from_mesh(gfx, &sphere_mesh(radius, rings, sectors))
}

/// Quad in the XY plane facing +Z. Used as the full-screen composite quad
/// with `(-1, -1)`..`(1, 1)`.
pub fn plane_xy_mesh(x0: f32, y0: f32, x1: f32, y1: f32) -> MeshData {
    let mut mesh = MeshData::default();
    push_quad(
        &mut mesh,
        [
            Vector3::new(x0, y0, 0.0),
            Vector3::new(x1, y0, 0.0),
            Vector3::new(x1, y1, 0.0),
            Vector3::new(x0, y1, 0.0),
        ],
        (Vector3::z(), Vector3::x()),
    );
    mesh
}

pub fn create_plane_xy(
    gfx: &Graphics,
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
) -> Result<Renderable, MeshError> {
    Renderable::from_mesh(gfx, &plane_xy_mesh(x0, y0, x1, y1))
}

/// Quad in the XZ plane facing +Y.
pub fn plane_xz_mesh(x0: f32, z0: f32, x1: f32, z1: f32) -> MeshData {
    let mut mesh = MeshData::default();
    push_quad(
        &mut mesh,
        [
            Vector3::new(x0, 0.0, z1),
            Vector3::new(x1, 0.0, z1),
            Vector3::new(x1, 0.0, z0),
            Vector3::new(x0, 0.0, z0),
        ],
        (Vector3::y(), Vector3::x()),
    );
    mesh
}

pub fn create_plane_xz(
    gfx: &Graphics,
    x0: f32,
    z0: f32,
    x1: f32,
    z1: f32,
) -> Result<Renderable, MeshError> {
    Renderable::from_mesh(gfx, &plane_xz_mesh(x0, z0, x1, z1))
}

/// The 12 edges of a box as line segments.
pub fn wire_cube_mesh(x0: f32, y0: f32, z0: f32, x1: f32, y1: f32, z1: f32) -> MeshData {
    let positions = vec![
        Vector3::new(x0, y0, z0),
        Vector3::new(x1, y0, z0),
        Vector3::new(x1, y1, z0),
        Vector3::new(x0, y1, z0),
        Vector3::new(x0, y0, z1),
        Vector3::new(x1, y0, z1),
        Vector3::new(x1, y1, z1),
        Vector3::new(x0, y1, z1),
    ];
    let indices = vec![
        0, 1, 1, 2, 2, 3, 3, 0, // back
        4, 5, 5, 6, 6, 7, 7, 4, // front
        0, 4, 1, 5, 2, 6, 3, 7, // sides
    ];

    MeshData {
        positions,
        indices,
        mode: DrawMode::Lines,
        ..MeshData::default()
    }
}

pub fn create_wire_cube(
    gfx: &Graphics,
    x0: f32,
    y0: f32,
    z0: f32,
    x1: f32,
    y1: f32,
    z1: f32,
) -> Result<Renderable, MeshError> {
    Renderable::from_mesh(gfx, &wire_cube_mesh(x0, y0, z0, x1, y1, z1))
}

/// Plane a wire circle is drawn in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CirclePlane {
    XY,
    XZ,
    YZ,
}

/// Closed circle outline around the origin, `segments` clamped to at least 3.
pub fn wire_circle_mesh(radius: f32, segments: u32, plane: CirclePlane) -> MeshData {
    let segments = segments.max(3);
    let positions = (0..segments)
        .map(|i| {
            let angle = i as f32 / segments as f32 * TAU;
            let (a, b) = (angle.cos() * radius, angle.sin() * radius);
            match plane {
                CirclePlane::XY => Vector3::new(a, b, 0.0),
                CirclePlane::XZ => Vector3::new(a, 0.0, b),
                CirclePlane::YZ => Vector3::new(0.0, a, b),
            }
        })
        .collect();
    let indices = (0..segments)
        .flat_map(|i| [i, (i + 1) % segments])
        .collect();

    MeshData {
        positions,
        indices,
        mode: DrawMode::Lines,
        ..MeshData::default()
    }
}

pub fn create_wire_circle(
    gfx: &Graphics,
    radius: f32,
    segments: u32,
    plane: CirclePlane,
) -> Result<Renderable, MeshError> {
    Renderable::from_mesh(gfx, &wire_circle_mesh(radius, segments, plane))
}

/// A single line segment.
pub fn line_mesh(start: Vector3<f32>, end: Vector3<f32>) -> MeshData {
    MeshData {
        positions: vec![start, end],
        indices: vec![0, 1],
        mode: DrawMode::Lines,
        ..MeshData::default()
    }
}

pub fn create_line(
    gfx: &Graphics,
    start: Vector3<f32>,
    end: Vector3<f32>,
) -> Result<Renderable, MeshError> {
    Renderable::from_mesh(gfx, &line_mesh(start, end))
}
