use crate::graphics::{Buffer, BufferTarget, BufferUsage, DataType, DrawMode, Graphics, GraphicsError};
use crate::renderable::{
    AttributeBuffer, AttributeLengthErr, DestroyedErr, EmptyErr, IndexOutOfRangeErr, MeshError, NonFiniteErr,
    RenderableCore,
};
use fizzle_utils::BoundingRect;
use nalgebra::{SVector, Vector2, Vector3};
use snafu::ensure;
use tracing::trace;

const FLOAT_SIZE: i32 = size_of::<f32>() as i32;

/// Decoded geometry as handed over by a mesh importer or a generator.
///
/// Optional attributes are either empty or exactly one entry per position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vector3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub uvs: Vec<Vector2<f32>>,
    pub tangents: Vec<Vector3<f32>>,
    pub bone_ids: Vec<[u32; 4]>,
    pub bone_weights: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
    pub mode: DrawMode,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Triangles, or line segments for [`DrawMode::Lines`].
    pub fn face_count(&self) -> u32 {
        let per_face = match self.mode {
            DrawMode::Triangles => 3,
            DrawMode::Lines => 2,
        };
        (self.indices.len() / per_face) as u32
    }

    pub fn bounding_rect(&self) -> BoundingRect {
        BoundingRect::from_points(&self.positions)
    }

    pub fn validate(&self) -> Result<(), MeshError> {
        let vertices = self.positions.len();
        ensure!(vertices > 0 && !self.indices.is_empty(), EmptyErr);

        let optional = [
            ("normals", self.normals.len()),
            ("uvs", self.uvs.len()),
            ("tangents", self.tangents.len()),
            ("bone ids", self.bone_ids.len()),
            ("bone weights", self.bone_weights.len()),
        ];
        for (attribute, len) in optional {
            ensure!(
                len == 0 || len == vertices,
                AttributeLengthErr {
                    attribute,
                    expected: vertices,
                    actual: len,
                }
            );
        }

        let finite = [
            ("positions", all_finite(&self.positions)),
            ("normals", all_finite(&self.normals)),
            ("uvs", all_finite(&self.uvs)),
            ("tangents", all_finite(&self.tangents)),
            ("bone weights", self.bone_weights.iter().flatten().all(|w| w.is_finite())),
        ];
        for (attribute, finite) in finite {
            ensure!(finite, NonFiniteErr { attribute });
        }

        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertices) {
            return IndexOutOfRangeErr { index, vertices }.fail();
        }

        Ok(())
    }

    /// Floats per vertex in the interleaved buffer: position, normal, uv, tangent.
    fn interleaved_components(&self) -> (usize, usize, usize) {
        let normals = if self.normals.is_empty() { 0 } else { 3 };
        let uvs = if self.uvs.is_empty() { 0 } else { 2 };
        let tangents = if self.tangents.is_empty() { 0 } else { 3 };
        (normals, uvs, tangents)
    }

    fn interleave(&self) -> Vec<f32> {
        let (normals, uvs, tangents) = self.interleaved_components();
        let stride = 3 + normals + uvs + tangents;
        let mut data = Vec::with_capacity(stride * self.positions.len());

        for (i, position) in self.positions.iter().enumerate() {
            data.extend_from_slice(position.as_slice());
            if let Some(normal) = self.normals.get(i) {
                data.extend_from_slice(normal.as_slice());
            }
            if let Some(uv) = self.uvs.get(i) {
                data.extend_from_slice(uv.as_slice());
            }
            if let Some(tangent) = self.tangents.get(i) {
                data.extend_from_slice(tangent.as_slice());
            }
        }

        data
    }

    /// Validates the data and replaces the core's buffers with it. A core
    /// that was destroyed has no vertex array left and is refused.
    ///
    /// Position, normal, uv and tangent share one interleaved buffer in that
    /// order. Bone ids and weights get buffers of their own.
    pub fn upload(&self, gfx: &Graphics, core: &mut RenderableCore) -> Result<(), MeshError> {
        self.validate()?;
        ensure!(core.vao().is_some(), DestroyedErr);
        core.release_buffers(gfx);

        let result = self.upload_buffers(gfx, core);
        gfx.bind_vertex_array(None);

        // every created buffer is already recorded in the core
        if let Err(err) = result {
            core.release_buffers(gfx);
            return Err(err.into());
        }

        trace!(
            "Uploaded mesh with {} vertices and {} indices",
            self.positions.len(),
            self.indices.len()
        );
        Ok(())
    }

    fn upload_buffers(&self, gfx: &Graphics, core: &mut RenderableCore) -> Result<(), GraphicsError> {
        gfx.bind_vertex_array(core.vao());

        let (normals, uvs, tangents) = self.interleaved_components();
        let stride = (3 + normals + uvs + tangents) as i32 * FLOAT_SIZE;

        let interleaved = self.interleave();
        let vbo = new_buffer(gfx, BufferTarget::Array, bytemuck::cast_slice(&interleaved))?;
        let attribute = |components: usize, offset: usize| {
            (components > 0).then_some(AttributeBuffer {
                buffer: vbo,
                components: components as i32,
                data_type: DataType::Float,
                stride,
                offset: offset as i32 * FLOAT_SIZE,
            })
        };
        core.vertices = attribute(3, 0);
        core.normals = attribute(normals, 3);
        core.uvs = attribute(uvs, 3 + normals);
        core.tangents = attribute(tangents, 3 + normals + uvs);

        if !self.bone_ids.is_empty() {
            let data = bytemuck::cast_slice(&self.bone_ids);
            let buffer = new_buffer(gfx, BufferTarget::Array, data)?;
            core.bone_ids = Some(AttributeBuffer::packed(buffer, 4, DataType::UnsignedInt));
        }
        if !self.bone_weights.is_empty() {
            let data = bytemuck::cast_slice(&self.bone_weights);
            let buffer = new_buffer(gfx, BufferTarget::Array, data)?;
            core.bone_weights = Some(AttributeBuffer::packed(buffer, 4, DataType::Float));
        }

        let data = bytemuck::cast_slice(&self.indices);
        let ebo = new_buffer(gfx, BufferTarget::ElementArray, data)?;
        core.elements = Some(ebo);
        core.element_count = self.indices.len() as u32;
        core.invalidate_vao();

        Ok(())
    }
}

fn all_finite<const D: usize>(values: &[SVector<f32, D>]) -> bool {
    values.iter().all(|v| v.iter().all(|c| c.is_finite()))
}

fn new_buffer(gfx: &Graphics, target: BufferTarget, data: &[u8]) -> Result<Buffer, GraphicsError> {
    let buffer = gfx.create_buffer()?;
    gfx.bind_buffer(target, Some(buffer));
    gfx.buffer_data(target, data, BufferUsage::StaticDraw);
    Ok(buffer)
}
