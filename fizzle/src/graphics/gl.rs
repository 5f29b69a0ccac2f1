//! OpenGL 3.3 core backend on top of `glow`.
//!
//! All calls are forwarded to the context as-is. The context must be current
//! on the calling thread for the whole lifetime of [`GlGraphics`].

use crate::graphics::{
    Attachment, BlendFactor, Buffer, BufferTarget, BufferUsage, Capability, ClearMask, DataType,
    DrawMode, Face, Framebuffer, FramebufferStatus, GraphicsError, GraphicsProvider,
    InitializationErr, ObjectCreationErr, Program, Renderbuffer, Shader, ShaderStage, Texture,
    TextureFilter, TextureFormat, TextureParameter, TextureWrap, UniformLocation, VertexArray,
};
use glow::HasContext;
use snafu::ensure;
use std::ffi::c_void;
use tracing::{debug, info};

const REQUIRED_VERSION: (u32, u32) = (3, 3);

pub struct GlGraphics {
    gl: glow::Context,
}

impl GlGraphics {
    /// Loads GL function pointers through `loader` (usually the windowing
    /// library's `get_proc_address`) and checks the context version.
    ///
    /// # Safety
    /// A GL context must be current on this thread, and `loader` must return
    /// valid function pointers for it.
    pub unsafe fn new<F>(loader: F) -> Result<Self, GraphicsError>
    where
        F: FnMut(&str) -> *const c_void,
    {
        let gl = unsafe { glow::Context::from_loader_function(loader) };
        Self::from_context(gl)
    }

    pub fn from_context(gl: glow::Context) -> Result<Self, GraphicsError> {
        let version = gl.version();
        debug!("GL context version: {version:?}");

        ensure!(
            (version.major, version.minor) >= REQUIRED_VERSION,
            InitializationErr {
                reason: format!(
                    "OpenGL {}.{} is required, the context reports {}.{}",
                    REQUIRED_VERSION.0, REQUIRED_VERSION.1, version.major, version.minor
                ),
            }
        );

        info!(
            "Using OpenGL {}.{} ({})",
            version.major, version.minor, version.vendor_info
        );
        Ok(Self { gl })
    }

    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

fn creation_error(kind: &'static str) -> impl FnOnce(String) -> GraphicsError {
    move |message| ObjectCreationErr { kind, message }.build()
}

fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn buffer_usage(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::StaticDraw => glow::STATIC_DRAW,
        BufferUsage::DynamicDraw => glow::DYNAMIC_DRAW,
        BufferUsage::StreamDraw => glow::STREAM_DRAW,
    }
}

fn data_type(ty: DataType) -> u32 {
    match ty {
        DataType::Float => glow::FLOAT,
        DataType::UnsignedInt => glow::UNSIGNED_INT,
        DataType::Int => glow::INT,
        DataType::UnsignedByte => glow::UNSIGNED_BYTE,
    }
}

fn draw_mode(mode: DrawMode) -> u32 {
    match mode {
        DrawMode::Triangles => glow::TRIANGLES,
        DrawMode::Lines => glow::LINES,
    }
}

fn capability(cap: Capability) -> u32 {
    match cap {
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::CullFace => glow::CULL_FACE,
        Capability::Blend => glow::BLEND,
        Capability::PolygonOffsetFill => glow::POLYGON_OFFSET_FILL,
    }
}

fn blend_factor(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::Zero => glow::ZERO,
        BlendFactor::One => glow::ONE,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
    }
}

/// (internal format, format, pixel type)
fn texture_format(format: TextureFormat) -> (u32, u32, u32) {
    match format {
        TextureFormat::Rgb8 => (glow::RGB8, glow::RGB, glow::UNSIGNED_BYTE),
        TextureFormat::Rgba8 => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
        TextureFormat::Rgba16F => (glow::RGBA16F, glow::RGBA, glow::FLOAT),
        TextureFormat::Rgba32F => (glow::RGBA32F, glow::RGBA, glow::FLOAT),
        TextureFormat::Depth24 => (
            glow::DEPTH_COMPONENT24,
            glow::DEPTH_COMPONENT,
            glow::UNSIGNED_INT,
        ),
        TextureFormat::Depth32F => (glow::DEPTH_COMPONENT32F, glow::DEPTH_COMPONENT, glow::FLOAT),
    }
}

fn texture_filter(filter: TextureFilter) -> i32 {
    let value = match filter {
        TextureFilter::Nearest => glow::NEAREST,
        TextureFilter::Linear => glow::LINEAR,
        TextureFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    };
    value as i32
}

fn texture_wrap(wrap: TextureWrap) -> i32 {
    let value = match wrap {
        TextureWrap::Repeat => glow::REPEAT,
        TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
    };
    value as i32
}

fn attachment(attachment: Attachment) -> u32 {
    match attachment {
        Attachment::Color(n) => glow::COLOR_ATTACHMENT0 + n,
        Attachment::Depth => glow::DEPTH_ATTACHMENT,
    }
}

fn shader_stage(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Geometry => glow::GEOMETRY_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

fn native_location(location: UniformLocation) -> glow::NativeUniformLocation {
    glow::NativeUniformLocation(location.0)
}

impl GraphicsProvider for GlGraphics {
    fn create_buffer(&self) -> Result<Buffer, GraphicsError> {
        let buffer = unsafe { self.gl.create_buffer() }.map_err(creation_error("buffer"))?;
        Ok(Buffer(buffer.0))
    }

    fn delete_buffer(&self, buffer: Buffer) {
        unsafe { self.gl.delete_buffer(glow::NativeBuffer(buffer.0)) }
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Buffer>) {
        let buffer = buffer.map(|b| glow::NativeBuffer(b.0));
        unsafe { self.gl.bind_buffer(buffer_target(target), buffer) }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(buffer_target(target), data, buffer_usage(usage))
        }
    }

    fn create_vertex_array(&self) -> Result<VertexArray, GraphicsError> {
        let vao = unsafe { self.gl.create_vertex_array() }.map_err(creation_error("vertex array"))?;
        Ok(VertexArray(vao.0))
    }

    fn delete_vertex_array(&self, vao: VertexArray) {
        unsafe { self.gl.delete_vertex_array(glow::NativeVertexArray(vao.0)) }
    }

    fn bind_vertex_array(&self, vao: Option<VertexArray>) {
        let vao = vao.map(|v| glow::NativeVertexArray(v.0));
        unsafe { self.gl.bind_vertex_array(vao) }
    }

    fn enable_vertex_attrib_array(&self, location: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(location) }
    }

    fn vertex_attrib_pointer(
        &self,
        location: u32,
        components: i32,
        ty: DataType,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        unsafe {
            self.gl.vertex_attrib_pointer_f32(
                location,
                components,
                data_type(ty),
                normalized,
                stride,
                offset,
            )
        }
    }

    fn vertex_attrib_int_pointer(
        &self,
        location: u32,
        components: i32,
        ty: DataType,
        stride: i32,
        offset: i32,
    ) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_i32(location, components, data_type(ty), stride, offset)
        }
    }

    fn create_texture(&self) -> Result<Texture, GraphicsError> {
        let texture = unsafe { self.gl.create_texture() }.map_err(creation_error("texture"))?;
        Ok(Texture(texture.0))
    }

    fn delete_texture(&self, texture: Texture) {
        unsafe { self.gl.delete_texture(glow::NativeTexture(texture.0)) }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn bind_texture(&self, texture: Option<Texture>) {
        let texture = texture.map(|t| glow::NativeTexture(t.0));
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, texture) }
    }

    fn tex_image_2d(&self, format: TextureFormat, width: u32, height: u32, pixels: Option<&[u8]>) {
        let (internal, format, ty) = texture_format(format);
        unsafe {
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal as i32,
                width as i32,
                height as i32,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(pixels),
            )
        }
    }

    fn tex_parameter(&self, parameter: TextureParameter) {
        let (name, value) = match parameter {
            TextureParameter::MinFilter(f) => (glow::TEXTURE_MIN_FILTER, texture_filter(f)),
            TextureParameter::MagFilter(f) => (glow::TEXTURE_MAG_FILTER, texture_filter(f)),
            TextureParameter::WrapS(w) => (glow::TEXTURE_WRAP_S, texture_wrap(w)),
            TextureParameter::WrapT(w) => (glow::TEXTURE_WRAP_T, texture_wrap(w)),
            TextureParameter::CompareRefToTexture(enabled) => {
                let mode = if enabled {
                    glow::COMPARE_REF_TO_TEXTURE
                } else {
                    glow::NONE
                };
                (glow::TEXTURE_COMPARE_MODE, mode as i32)
            }
        };
        unsafe { self.gl.tex_parameter_i32(glow::TEXTURE_2D, name, value) }
    }

    fn generate_mipmap(&self) {
        unsafe { self.gl.generate_mipmap(glow::TEXTURE_2D) }
    }

    fn create_framebuffer(&self) -> Result<Framebuffer, GraphicsError> {
        let fb = unsafe { self.gl.create_framebuffer() }.map_err(creation_error("framebuffer"))?;
        Ok(Framebuffer(fb.0))
    }

    fn delete_framebuffer(&self, framebuffer: Framebuffer) {
        unsafe { self.gl.delete_framebuffer(glow::NativeFramebuffer(framebuffer.0)) }
    }

    fn bind_framebuffer(&self, framebuffer: Option<Framebuffer>) {
        let fb = framebuffer.map(|f| glow::NativeFramebuffer(f.0));
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, fb) }
    }

    fn framebuffer_texture_2d(&self, attach: Attachment, texture: Option<Texture>) {
        let texture = texture.map(|t| glow::NativeTexture(t.0));
        unsafe {
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                attachment(attach),
                glow::TEXTURE_2D,
                texture,
                0,
            )
        }
    }

    fn create_renderbuffer(&self) -> Result<Renderbuffer, GraphicsError> {
        let rb = unsafe { self.gl.create_renderbuffer() }.map_err(creation_error("renderbuffer"))?;
        Ok(Renderbuffer(rb.0))
    }

    fn delete_renderbuffer(&self, renderbuffer: Renderbuffer) {
        unsafe {
            self.gl
                .delete_renderbuffer(glow::NativeRenderbuffer(renderbuffer.0))
        }
    }

    fn bind_renderbuffer(&self, renderbuffer: Option<Renderbuffer>) {
        let rb = renderbuffer.map(|r| glow::NativeRenderbuffer(r.0));
        unsafe { self.gl.bind_renderbuffer(glow::RENDERBUFFER, rb) }
    }

    fn renderbuffer_storage(&self, format: TextureFormat, width: u32, height: u32) {
        let (internal, _, _) = texture_format(format);
        unsafe {
            self.gl
                .renderbuffer_storage(glow::RENDERBUFFER, internal, width as i32, height as i32)
        }
    }

    fn framebuffer_renderbuffer(&self, attach: Attachment, renderbuffer: Option<Renderbuffer>) {
        let rb = renderbuffer.map(|r| glow::NativeRenderbuffer(r.0));
        unsafe {
            self.gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                attachment(attach),
                glow::RENDERBUFFER,
                rb,
            )
        }
    }

    fn draw_buffers(&self, attachments: &[Attachment]) {
        if attachments.is_empty() {
            unsafe {
                self.gl.draw_buffer(glow::NONE);
                self.gl.read_buffer(glow::NONE);
            }
            return;
        }
        let buffers: Vec<u32> = attachments.iter().copied().map(attachment).collect();
        unsafe { self.gl.draw_buffers(&buffers) }
    }

    fn check_framebuffer_status(&self) -> FramebufferStatus {
        let status = unsafe { self.gl.check_framebuffer_status(glow::FRAMEBUFFER) };
        match status {
            glow::FRAMEBUFFER_COMPLETE => FramebufferStatus::Complete,
            glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => FramebufferStatus::IncompleteAttachment,
            glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => FramebufferStatus::MissingAttachment,
            glow::FRAMEBUFFER_UNSUPPORTED => FramebufferStatus::Unsupported,
            other => FramebufferStatus::Other(other),
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<Shader, GraphicsError> {
        let shader = unsafe { self.gl.create_shader(shader_stage(stage)) }
            .map_err(creation_error("shader"))?;
        Ok(Shader(shader.0))
    }

    fn delete_shader(&self, shader: Shader) {
        unsafe { self.gl.delete_shader(glow::NativeShader(shader.0)) }
    }

    fn shader_source(&self, shader: Shader, source: &str) {
        unsafe { self.gl.shader_source(glow::NativeShader(shader.0), source) }
    }

    fn compile_shader(&self, shader: Shader) {
        unsafe { self.gl.compile_shader(glow::NativeShader(shader.0)) }
    }

    fn shader_compile_status(&self, shader: Shader) -> bool {
        unsafe { self.gl.get_shader_compile_status(glow::NativeShader(shader.0)) }
    }

    fn shader_info_log(&self, shader: Shader) -> String {
        unsafe { self.gl.get_shader_info_log(glow::NativeShader(shader.0)) }
    }

    fn create_program(&self) -> Result<Program, GraphicsError> {
        let program = unsafe { self.gl.create_program() }.map_err(creation_error("program"))?;
        Ok(Program(program.0))
    }

    fn delete_program(&self, program: Program) {
        unsafe { self.gl.delete_program(glow::NativeProgram(program.0)) }
    }

    fn attach_shader(&self, program: Program, shader: Shader) {
        unsafe {
            self.gl
                .attach_shader(glow::NativeProgram(program.0), glow::NativeShader(shader.0))
        }
    }

    fn link_program(&self, program: Program) {
        unsafe { self.gl.link_program(glow::NativeProgram(program.0)) }
    }

    fn program_link_status(&self, program: Program) -> bool {
        unsafe { self.gl.get_program_link_status(glow::NativeProgram(program.0)) }
    }

    fn program_info_log(&self, program: Program) -> String {
        unsafe { self.gl.get_program_info_log(glow::NativeProgram(program.0)) }
    }

    fn use_program(&self, program: Option<Program>) {
        let program = program.map(|p| glow::NativeProgram(p.0));
        unsafe { self.gl.use_program(program) }
    }

    fn get_uniform_location(&self, program: Program, name: &str) -> Option<UniformLocation> {
        unsafe {
            self.gl
                .get_uniform_location(glow::NativeProgram(program.0), name)
        }
        .map(|location| UniformLocation(location.0))
    }

    fn get_attrib_location(&self, program: Program, name: &str) -> Option<u32> {
        unsafe { self.gl.get_attrib_location(glow::NativeProgram(program.0), name) }
    }

    fn uniform_i32(&self, location: UniformLocation, value: i32) {
        unsafe { self.gl.uniform_1_i32(Some(&native_location(location)), value) }
    }

    fn uniform_f32(&self, location: UniformLocation, value: f32) {
        unsafe { self.gl.uniform_1_f32(Some(&native_location(location)), value) }
    }

    fn uniform_vec3(&self, location: UniformLocation, [x, y, z]: [f32; 3]) {
        unsafe { self.gl.uniform_3_f32(Some(&native_location(location)), x, y, z) }
    }

    fn uniform_vec4(&self, location: UniformLocation, [x, y, z, w]: [f32; 4]) {
        unsafe {
            self.gl
                .uniform_4_f32(Some(&native_location(location)), x, y, z, w)
        }
    }

    fn uniform_mat4(&self, location: UniformLocation, value: &[f32; 16]) {
        unsafe {
            self.gl
                .uniform_matrix_4_f32_slice(Some(&native_location(location)), false, value)
        }
    }

    fn uniform_mat4_array(&self, location: UniformLocation, values: &[[f32; 16]]) {
        let flat: &[f32] = bytemuck::cast_slice(values);
        unsafe {
            self.gl
                .uniform_matrix_4_f32_slice(Some(&native_location(location)), false, flat)
        }
    }

    fn enable(&self, cap: Capability) {
        unsafe { self.gl.enable(capability(cap)) }
    }

    fn disable(&self, cap: Capability) {
        unsafe { self.gl.disable(capability(cap)) }
    }

    fn cull_face(&self, face: Face) {
        let face = match face {
            Face::Front => glow::FRONT,
            Face::Back => glow::BACK,
        };
        unsafe { self.gl.cull_face(face) }
    }

    fn blend_func(&self, src: BlendFactor, dst: BlendFactor) {
        unsafe { self.gl.blend_func(blend_factor(src), blend_factor(dst)) }
    }

    fn depth_mask(&self, write: bool) {
        unsafe { self.gl.depth_mask(write) }
    }

    fn polygon_offset(&self, factor: f32, units: f32) {
        unsafe { self.gl.polygon_offset(factor, units) }
    }

    fn viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        unsafe { self.gl.viewport(x, y, width as i32, height as i32) }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { self.gl.clear_color(r, g, b, a) }
    }

    fn clear(&self, mask: ClearMask) {
        let mut bits = 0;
        if mask.contains(ClearMask::COLOR) {
            bits |= glow::COLOR_BUFFER_BIT;
        }
        if mask.contains(ClearMask::DEPTH) {
            bits |= glow::DEPTH_BUFFER_BIT;
        }
        if mask.contains(ClearMask::STENCIL) {
            bits |= glow::STENCIL_BUFFER_BIT;
        }
        unsafe { self.gl.clear(bits) }
    }

    fn draw_elements(&self, mode: DrawMode, count: u32, offset: u32) {
        unsafe {
            self.gl.draw_elements(
                draw_mode(mode),
                count as i32,
                glow::UNSIGNED_INT,
                offset as i32,
            )
        }
    }

    fn draw_arrays(&self, mode: DrawMode, first: u32, count: u32) {
        unsafe { self.gl.draw_arrays(draw_mode(mode), first as i32, count as i32) }
    }
}
