use crate::graphics::{Buffer, BufferTarget, DataType, Graphics, GraphicsError, Program, VertexArray};
use crate::material::Material;
use crate::renderable::Skeleton;
use crate::shader::{ShaderProgram, names};
use itertools::Itertools;
use std::cell::Cell;
use std::rc::Rc;
use tracing::trace;

/// Where one vertex attribute lives inside a GPU buffer.
///
/// Several attributes may alias the same buffer (interleaved layout), each
/// with its own byte offset into the shared stride.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttributeBuffer {
    pub buffer: Buffer,
    pub components: i32,
    pub data_type: DataType,
    /// Bytes between consecutive vertices. 0 means tightly packed.
    pub stride: i32,
    /// Byte offset of the first element.
    pub offset: i32,
}

impl AttributeBuffer {
    pub fn packed(buffer: Buffer, components: i32, data_type: DataType) -> Self {
        Self {
            buffer,
            components,
            data_type,
            stride: 0,
            offset: 0,
        }
    }
}

/// GPU payload of a renderable that can be shared between instances.
///
/// The core exclusively owns its buffers and vertex array. Textures in the
/// material are only referenced and never released from here.
#[derive(Debug)]
pub struct RenderableCore {
    pub shader: Option<Rc<ShaderProgram>>,
    pub skeleton: Option<Skeleton>,
    pub material: Material,

    pub vertices: Option<AttributeBuffer>,
    pub normals: Option<AttributeBuffer>,
    pub uvs: Option<AttributeBuffer>,
    pub tangents: Option<AttributeBuffer>,
    pub bone_ids: Option<AttributeBuffer>,
    pub bone_weights: Option<AttributeBuffer>,

    pub elements: Option<Buffer>,
    pub element_count: u32,

    vao: Option<VertexArray>,
    /// Program the vertex array's attribute pointers were configured for.
    vao_program: Cell<Option<Program>>,
}

impl RenderableCore {
    /// Creates an empty core. The vertex array is allocated right away.
    pub fn new(gfx: &Graphics) -> Result<Self, GraphicsError> {
        let vao = gfx.create_vertex_array()?;
        trace!("Allocated core vertex array #{}", vao.id());

        Ok(Self {
            shader: None,
            skeleton: None,
            material: Material::default(),
            vertices: None,
            normals: None,
            uvs: None,
            tangents: None,
            bone_ids: None,
            bone_weights: None,
            elements: None,
            element_count: 0,
            vao: Some(vao),
            vao_program: Cell::new(None),
        })
    }

    pub fn vao(&self) -> Option<VertexArray> {
        self.vao
    }

    pub fn is_vao_initialized(&self) -> bool {
        self.vao_program.get().is_some()
    }

    /// Forces the attribute pointers to be set up again on the next draw.
    pub fn invalidate_vao(&self) {
        self.vao_program.set(None);
    }

    /// Nothing to draw: either never uploaded or already destroyed.
    pub fn is_drawable(&self) -> bool {
        self.vao.is_some() && self.vertices.is_some() && self.element_count > 0
    }

    /// Binds the vertex array and, the first time a program is seen, points
    /// every attribute the shader declares at its buffer. Attributes the
    /// shader does not declare are skipped.
    pub fn bind_attributes(&self, gfx: &Graphics, shader: &ShaderProgram) {
        gfx.bind_vertex_array(self.vao);
        gfx.bind_buffer(BufferTarget::ElementArray, self.elements);

        if self.vao_program.get() == Some(shader.program()) {
            return;
        }

        let attributes = [
            (names::VERTEX_POSITION, self.vertices, false),
            (names::VERTEX_NORMAL, self.normals, false),
            (names::VERTEX_UV_0, self.uvs, false),
            (names::VERTEX_TANGENT, self.tangents, false),
            (names::VERTEX_BONE_IDS, self.bone_ids, true),
            (names::VERTEX_BONE_WEIGHTS, self.bone_weights, false),
        ];

        for (name, attribute, integer) in attributes {
            let Some(attribute) = attribute else {
                continue;
            };
            let Some(location) = shader.attrib_location(gfx, name) else {
                continue;
            };

            gfx.bind_buffer(BufferTarget::Array, Some(attribute.buffer));
            gfx.enable_vertex_attrib_array(location);
            if integer {
                gfx.vertex_attrib_int_pointer(
                    location,
                    attribute.components,
                    attribute.data_type,
                    attribute.stride,
                    attribute.offset,
                );
            } else {
                gfx.vertex_attrib_pointer(
                    location,
                    attribute.components,
                    attribute.data_type,
                    false,
                    attribute.stride,
                    attribute.offset,
                );
            }
        }

        self.vao_program.set(Some(shader.program()));
    }

    /// Every distinct buffer this core owns.
    pub fn buffers(&self) -> Vec<Buffer> {
        [
            self.vertices,
            self.normals,
            self.uvs,
            self.tangents,
            self.bone_ids,
            self.bone_weights,
        ]
        .into_iter()
        .flatten()
        .map(|attribute| attribute.buffer)
        .chain(self.elements)
        .unique()
        .collect()
    }

    /// Deletes the buffers but keeps the vertex array for a new upload.
    pub fn release_buffers(&mut self, gfx: &Graphics) {
        for buffer in self.buffers() {
            gfx.delete_buffer(buffer);
        }

        self.vertices = None;
        self.normals = None;
        self.uvs = None;
        self.tangents = None;
        self.bone_ids = None;
        self.bone_weights = None;
        self.elements = None;
        self.element_count = 0;
        self.vao_program.set(None);
    }

    /// Releases every GPU object owned by the core. Textures are left alone.
    ///
    /// The core stays valid but empty afterwards, so instances still holding
    /// it simply stop drawing.
    pub fn destroy(&mut self, gfx: &Graphics) {
        self.release_buffers(gfx);
        if let Some(vao) = self.vao.take() {
            gfx.delete_vertex_array(vao);
        }
    }
}
