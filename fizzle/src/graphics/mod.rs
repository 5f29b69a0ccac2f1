//! The graphics provider boundary.
//!
//! Every renderer and renderable talks to the GPU exclusively through
//! [`GraphicsProvider`]. Handles are plain copyable ids so backends can be
//! swapped without touching the rendering core.

mod headless;

#[cfg(feature = "gl")]
mod gl;

pub use headless::{AttribPointer, Call, HeadlessGraphics, UniformValue};

#[cfg(feature = "gl")]
pub use gl::GlGraphics;

use bitflags::bitflags;
use snafu::Snafu;
use std::fmt::{Display, Formatter};
use std::num::NonZeroU32;

macro_rules! graphics_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub NonZeroU32);

            impl $name {
                pub fn id(self) -> u32 {
                    self.0.get()
                }
            }
        )*
    };
}

graphics_handle! {
    Buffer,
    VertexArray,
    Texture,
    Framebuffer,
    Renderbuffer,
    Shader,
    Program,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub(crate)))]
pub enum GraphicsError {
    #[snafu(display("Couldn't initialize the graphics backend: {reason}"))]
    Initialization { reason: String },

    #[snafu(display("Failed to create {kind}: {message}"))]
    ObjectCreation { kind: &'static str, message: String },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    StaticDraw,
    DynamicDraw,
    StreamDraw,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Float,
    UnsignedInt,
    Int,
    UnsignedByte,
}

impl DataType {
    pub fn size(self) -> usize {
        match self {
            DataType::Float | DataType::UnsignedInt | DataType::Int => 4,
            DataType::UnsignedByte => 1,
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DrawMode {
    #[default]
    Triangles,
    Lines,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    DepthTest,
    CullFace,
    Blend,
    PolygonOffsetFill,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Face {
    Front,
    Back,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgb8,
    Rgba8,
    Rgba16F,
    Rgba32F,
    Depth24,
    Depth32F,
}

impl TextureFormat {
    pub fn is_depth(self) -> bool {
        matches!(self, TextureFormat::Depth24 | TextureFormat::Depth32F)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureWrap {
    Repeat,
    ClampToEdge,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureParameter {
    MinFilter(TextureFilter),
    MagFilter(TextureFilter),
    WrapS(TextureWrap),
    WrapT(TextureWrap),
    /// Turns a depth texture into a shadow sampler (`sampler2DShadow`).
    CompareRefToTexture(bool),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Attachment {
    Color(u32),
    Depth,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    Complete,
    IncompleteAttachment,
    MissingAttachment,
    Unsupported,
    Other(u32),
}

impl Display for FramebufferStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FramebufferStatus::Complete => write!(f, "complete"),
            FramebufferStatus::IncompleteAttachment => write!(f, "incomplete attachment"),
            FramebufferStatus::MissingAttachment => write!(f, "missing attachment"),
            FramebufferStatus::Unsupported => write!(f, "unsupported"),
            FramebufferStatus::Other(code) => write!(f, "status {code:#x}"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Geometry,
    Fragment,
}

impl Display for ShaderStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
        };
        f.write_str(name)
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ClearMask: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// Every graphics operation the rendering core needs.
///
/// Object creation can fail and reports a [`GraphicsError`]. All other calls
/// are fire-and-forget: GPU-level errors are not propagated per call.
pub trait GraphicsProvider {
    fn create_buffer(&self) -> Result<Buffer, GraphicsError>;
    fn delete_buffer(&self, buffer: Buffer);
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Buffer>);
    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage);

    fn create_vertex_array(&self) -> Result<VertexArray, GraphicsError>;
    fn delete_vertex_array(&self, vao: VertexArray);
    fn bind_vertex_array(&self, vao: Option<VertexArray>);
    fn enable_vertex_attrib_array(&self, location: u32);
    /// Float attribute. `stride` and `offset` are in bytes.
    fn vertex_attrib_pointer(
        &self,
        location: u32,
        components: i32,
        data_type: DataType,
        normalized: bool,
        stride: i32,
        offset: i32,
    );
    /// Integer attribute (bone ids). `stride` and `offset` are in bytes.
    fn vertex_attrib_int_pointer(
        &self,
        location: u32,
        components: i32,
        data_type: DataType,
        stride: i32,
        offset: i32,
    );

    fn create_texture(&self) -> Result<Texture, GraphicsError>;
    fn delete_texture(&self, texture: Texture);
    /// Selects texture unit `unit` (0-based) for the following texture calls.
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, texture: Option<Texture>);
    fn tex_image_2d(&self, format: TextureFormat, width: u32, height: u32, pixels: Option<&[u8]>);
    fn tex_parameter(&self, parameter: TextureParameter);
    fn generate_mipmap(&self);

    fn create_framebuffer(&self) -> Result<Framebuffer, GraphicsError>;
    fn delete_framebuffer(&self, framebuffer: Framebuffer);
    fn bind_framebuffer(&self, framebuffer: Option<Framebuffer>);
    fn framebuffer_texture_2d(&self, attachment: Attachment, texture: Option<Texture>);
    fn create_renderbuffer(&self) -> Result<Renderbuffer, GraphicsError>;
    fn delete_renderbuffer(&self, renderbuffer: Renderbuffer);
    fn bind_renderbuffer(&self, renderbuffer: Option<Renderbuffer>);
    fn renderbuffer_storage(&self, format: TextureFormat, width: u32, height: u32);
    fn framebuffer_renderbuffer(&self, attachment: Attachment, renderbuffer: Option<Renderbuffer>);
    /// An empty slice disables color output for the bound framebuffer.
    fn draw_buffers(&self, attachments: &[Attachment]);
    fn check_framebuffer_status(&self) -> FramebufferStatus;

    fn create_shader(&self, stage: ShaderStage) -> Result<Shader, GraphicsError>;
    fn delete_shader(&self, shader: Shader);
    fn shader_source(&self, shader: Shader, source: &str);
    fn compile_shader(&self, shader: Shader);
    fn shader_compile_status(&self, shader: Shader) -> bool;
    fn shader_info_log(&self, shader: Shader) -> String;

    fn create_program(&self) -> Result<Program, GraphicsError>;
    fn delete_program(&self, program: Program);
    fn attach_shader(&self, program: Program, shader: Shader);
    fn link_program(&self, program: Program);
    fn program_link_status(&self, program: Program) -> bool;
    fn program_info_log(&self, program: Program) -> String;
    fn use_program(&self, program: Option<Program>);
    fn get_uniform_location(&self, program: Program, name: &str) -> Option<UniformLocation>;
    fn get_attrib_location(&self, program: Program, name: &str) -> Option<u32>;

    fn uniform_i32(&self, location: UniformLocation, value: i32);
    fn uniform_f32(&self, location: UniformLocation, value: f32);
    fn uniform_vec3(&self, location: UniformLocation, value: [f32; 3]);
    fn uniform_vec4(&self, location: UniformLocation, value: [f32; 4]);
    /// Column-major matrix.
    fn uniform_mat4(&self, location: UniformLocation, value: &[f32; 16]);
    /// Consecutive column-major matrices starting at `location`.
    fn uniform_mat4_array(&self, location: UniformLocation, values: &[[f32; 16]]);

    fn enable(&self, capability: Capability);
    fn disable(&self, capability: Capability);
    fn cull_face(&self, face: Face);
    fn blend_func(&self, src: BlendFactor, dst: BlendFactor);
    fn depth_mask(&self, write: bool);
    fn polygon_offset(&self, factor: f32, units: f32);
    fn viewport(&self, x: i32, y: i32, width: u32, height: u32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&self, mask: ClearMask);

    /// Indexed draw over `u32` indices of the bound element buffer. `offset` is in bytes.
    fn draw_elements(&self, mode: DrawMode, count: u32, offset: u32);
    fn draw_arrays(&self, mode: DrawMode, first: u32, count: u32);
}

pub type Graphics = dyn GraphicsProvider;

/// Converts a nalgebra matrix to the flat column-major layout uniform uploads use.
pub fn mat4_to_array(matrix: &nalgebra::Matrix4<f32>) -> [f32; 16] {
    let mut out = [0.0; 16];
    out.copy_from_slice(matrix.as_slice());
    out
}
