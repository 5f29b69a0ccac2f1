use crate::graphics::{
    Attachment, BlendFactor, Buffer, BufferTarget, BufferUsage, Capability, ClearMask, DataType,
    DrawMode, Face, Framebuffer, FramebufferStatus, GraphicsError, GraphicsProvider,
    ObjectCreationErr, Program, Renderbuffer, Shader, ShaderStage, Texture, TextureFormat,
    TextureParameter, UniformLocation, VertexArray,
};
use snafu::{OptionExt, ensure};
use std::cell::RefCell;
use std::collections::HashMap;
use std::num::NonZeroU32;
use tracing::{trace, warn};

/// A value uploaded to a uniform location.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    I32(i32),
    F32(f32),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4([f32; 16]),
}

/// State change or draw recorded by [`HeadlessGraphics`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    UseProgram(Option<Program>),
    BindFramebuffer(Option<Framebuffer>),
    Enable(Capability),
    Disable(Capability),
    CullFace(Face),
    BlendFunc(BlendFactor, BlendFactor),
    DepthMask(bool),
    PolygonOffset {
        factor: f32,
        units: f32,
    },
    Viewport {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    Clear(ClearMask),
    BindTexture {
        unit: u32,
        texture: Option<Texture>,
    },
    Uniform {
        program: Option<Program>,
        location: UniformLocation,
        value: UniformValue,
    },
    Draw {
        mode: DrawMode,
        count: u32,
        program: Option<Program>,
        vertex_array: Option<VertexArray>,
    },
}

/// Attribute pointer recorded on a vertex array.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttribPointer {
    pub location: u32,
    pub buffer: Option<Buffer>,
    pub components: i32,
    pub data_type: DataType,
    pub integer: bool,
    pub stride: i32,
    pub offset: i32,
}

#[derive(Debug, Copy, Clone, Default)]
struct TextureInfo {
    format: Option<TextureFormat>,
    width: u32,
    height: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum AttachedObject {
    Texture(Texture),
    Renderbuffer(Renderbuffer),
}

#[derive(Debug, Default)]
struct FramebufferInfo {
    attachments: HashMap<Attachment, AttachedObject>,
    draw_buffers: Vec<Attachment>,
}

#[derive(Debug)]
struct ShaderInfo {
    stage: ShaderStage,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramInfo {
    shaders: Vec<Shader>,
    linked: bool,
    log: String,
    uniforms: HashMap<String, u32>,
    attributes: HashMap<String, u32>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    buffers: HashMap<Buffer, usize>,
    vertex_arrays: HashMap<VertexArray, Vec<AttribPointer>>,
    textures: HashMap<Texture, TextureInfo>,
    framebuffers: HashMap<Framebuffer, FramebufferInfo>,
    renderbuffers: HashMap<Renderbuffer, (u32, u32)>,
    shaders: HashMap<Shader, ShaderInfo>,
    programs: HashMap<Program, ProgramInfo>,

    array_buffer: Option<Buffer>,
    element_buffer: Option<Buffer>,
    vertex_array: Option<VertexArray>,
    active_unit: u32,
    unit_textures: HashMap<u32, Texture>,
    framebuffer: Option<Framebuffer>,
    renderbuffer: Option<Renderbuffer>,
    program: Option<Program>,

    force_incomplete: bool,
    /// Allocations left before object creation starts failing.
    allocation_budget: Option<usize>,
    calls: Vec<Call>,
}

impl State {
    fn allocate(&mut self, kind: &'static str) -> Result<NonZeroU32, GraphicsError> {
        if let Some(budget) = &mut self.allocation_budget {
            ensure!(
                *budget > 0,
                ObjectCreationErr {
                    kind,
                    message: "allocation budget exhausted",
                }
            );
            *budget -= 1;
        }

        self.next_id = self.next_id.checked_add(1).unwrap_or(0);
        NonZeroU32::new(self.next_id).context(ObjectCreationErr {
            kind,
            message: "handle space exhausted",
        })
    }

    fn bound_texture(&self) -> Option<Texture> {
        self.unit_textures.get(&self.active_unit).copied()
    }

    fn attached_size(&self, object: AttachedObject) -> Option<(u32, u32)> {
        match object {
            AttachedObject::Texture(texture) => self
                .textures
                .get(&texture)
                .map(|info| (info.width, info.height)),
            AttachedObject::Renderbuffer(rb) => self.renderbuffers.get(&rb).copied(),
        }
    }

    fn attach(&mut self, attachment: Attachment, object: Option<AttachedObject>) {
        let Some(fb) = self.framebuffer else {
            warn!("Attachment {attachment:?} requested without a bound framebuffer");
            return;
        };
        let Some(info) = self.framebuffers.get_mut(&fb) else {
            return;
        };
        match object {
            Some(object) => {
                info.attachments.insert(attachment, object);
            }
            None => {
                info.attachments.remove(&attachment);
            }
        }
    }
}

/// A graphics backend that keeps no GPU state at all.
///
/// Every state change, uniform upload and draw call is appended to an
/// inspectable call log. Objects are tracked so leaks and completeness can
/// be asserted, and shader "compilation" scans the GLSL for `uniform`
/// declarations (plus vertex stage `in` declarations) so that a uniform a
/// shader does not declare has no location, exactly like a real driver.
#[derive(Debug, Default)]
pub struct HeadlessGraphics {
    state: RefCell<State>,
}

impl HeadlessGraphics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every framebuffer report [`FramebufferStatus::Unsupported`].
    pub fn force_incomplete_framebuffers(&self, incomplete: bool) {
        self.state.borrow_mut().force_incomplete = incomplete;
    }

    /// Lets the next `budget` object creations succeed and fails every one
    /// after that. `None` lifts the limit.
    pub fn fail_allocations_after(&self, budget: Option<usize>) {
        self.state.borrow_mut().allocation_budget = budget;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn draw_calls(&self) -> Vec<Call> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Draw { .. }))
            .cloned()
            .collect()
    }

    pub fn draw_count(&self) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Draw { .. }))
            .count()
    }

    /// Last value uploaded to the named uniform while `program` was in use.
    pub fn uniform(&self, program: Program, name: &str) -> Option<UniformValue> {
        let state = self.state.borrow();
        let location = *state.programs.get(&program)?.uniforms.get(name)?;
        state.calls.iter().rev().find_map(|call| match call {
            Call::Uniform {
                program: Some(p),
                location: UniformLocation(l),
                value,
            } if *p == program && *l == location => Some(value.clone()),
            _ => None,
        })
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.state.borrow().vertex_arrays.len()
    }

    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.state.borrow().framebuffers.len()
    }

    pub fn live_renderbuffers(&self) -> usize {
        self.state.borrow().renderbuffers.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn buffer_len(&self, buffer: Buffer) -> Option<usize> {
        self.state.borrow().buffers.get(&buffer).copied()
    }

    pub fn texture_size(&self, texture: Texture) -> Option<(u32, u32)> {
        let state = self.state.borrow();
        let info = state.textures.get(&texture)?;
        Some((info.width, info.height))
    }

    pub fn texture_format(&self, texture: Texture) -> Option<TextureFormat> {
        self.state.borrow().textures.get(&texture)?.format
    }

    pub fn vertex_attribs(&self, vao: VertexArray) -> Vec<AttribPointer> {
        self.state
            .borrow()
            .vertex_arrays
            .get(&vao)
            .cloned()
            .unwrap_or_default()
    }

    pub fn framebuffer_draw_buffers(&self, framebuffer: Framebuffer) -> Vec<Attachment> {
        self.state
            .borrow()
            .framebuffers
            .get(&framebuffer)
            .map(|info| info.draw_buffers.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }

    fn record_uniform(&self, location: UniformLocation, value: UniformValue) {
        let mut state = self.state.borrow_mut();
        let program = state.program;
        state.calls.push(Call::Uniform {
            program,
            location,
            value,
        });
    }
}

fn strip_comments(source: &str) -> String {
    source
        .lines()
        .map(|line| line.split("//").next().unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Splits `NAME[N]` into the name and its array length (1 when not an array).
fn parse_declarator(declarator: &str) -> Option<(String, u32)> {
    let declarator = declarator.trim();
    if declarator.is_empty() {
        return None;
    }
    match declarator.split_once('[') {
        Some((name, rest)) => {
            let len = rest.trim_end_matches(']').trim().parse().ok()?;
            Some((name.trim().to_string(), len))
        }
        None => Some((declarator.to_string(), 1)),
    }
}

const PRECISIONS: [&str; 3] = ["lowp", "mediump", "highp"];

/// Declarations following `keyword` in the given GLSL, in source order.
fn scan_declarations(source: &str, keyword: &str) -> Vec<(String, u32)> {
    let mut found = Vec::new();
    for statement in strip_comments(source).split(';') {
        let tokens: Vec<&str> = statement.split_whitespace().collect();
        let Some(pos) = tokens.iter().position(|t| *t == keyword) else {
            continue;
        };
        let rest: Vec<&str> = tokens[pos + 1..]
            .iter()
            .copied()
            .filter(|t| !PRECISIONS.contains(t))
            .collect();
        // type followed by one or more comma separated declarators
        let Some((_, declarators)) = rest.split_first() else {
            continue;
        };
        if declarators.iter().any(|t| t.contains('(') || t.contains('{')) {
            continue;
        }
        for declarator in declarators.join(" ").split(',') {
            if let Some(decl) = parse_declarator(declarator) {
                found.push(decl);
            }
        }
    }
    found
}

impl GraphicsProvider for HeadlessGraphics {
    fn create_buffer(&self) -> Result<Buffer, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let buffer = Buffer(state.allocate("buffer")?);
        state.buffers.insert(buffer, 0);
        trace!("Created buffer #{}", buffer.id());
        Ok(buffer)
    }

    fn delete_buffer(&self, buffer: Buffer) {
        let mut state = self.state.borrow_mut();
        if state.buffers.remove(&buffer).is_none() {
            warn!("Deleted unknown buffer #{}", buffer.id());
        }
        if state.array_buffer == Some(buffer) {
            state.array_buffer = None;
        }
        if state.element_buffer == Some(buffer) {
            state.element_buffer = None;
        }
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Buffer>) {
        let mut state = self.state.borrow_mut();
        match target {
            BufferTarget::Array => state.array_buffer = buffer,
            BufferTarget::ElementArray => state.element_buffer = buffer,
        }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], _usage: BufferUsage) {
        let mut state = self.state.borrow_mut();
        let bound = match target {
            BufferTarget::Array => state.array_buffer,
            BufferTarget::ElementArray => state.element_buffer,
        };
        match bound.and_then(|b| state.buffers.get_mut(&b)) {
            Some(len) => *len = data.len(),
            None => warn!("Buffer data uploaded to {target:?} without a bound buffer"),
        }
    }

    fn create_vertex_array(&self) -> Result<VertexArray, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let vao = VertexArray(state.allocate("vertex array")?);
        state.vertex_arrays.insert(vao, Vec::new());
        Ok(vao)
    }

    fn delete_vertex_array(&self, vao: VertexArray) {
        let mut state = self.state.borrow_mut();
        if state.vertex_arrays.remove(&vao).is_none() {
            warn!("Deleted unknown vertex array #{}", vao.id());
        }
        if state.vertex_array == Some(vao) {
            state.vertex_array = None;
        }
    }

    fn bind_vertex_array(&self, vao: Option<VertexArray>) {
        self.state.borrow_mut().vertex_array = vao;
    }

    fn enable_vertex_attrib_array(&self, _location: u32) {}

    fn vertex_attrib_pointer(
        &self,
        location: u32,
        components: i32,
        data_type: DataType,
        _normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        let mut state = self.state.borrow_mut();
        let buffer = state.array_buffer;
        let vao = state.vertex_array;
        if let Some(attribs) = vao.and_then(|vao| state.vertex_arrays.get_mut(&vao)) {
            attribs.retain(|a| a.location != location);
            attribs.push(AttribPointer {
                location,
                buffer,
                components,
                data_type,
                integer: false,
                stride,
                offset,
            });
        }
    }

    fn vertex_attrib_int_pointer(
        &self,
        location: u32,
        components: i32,
        data_type: DataType,
        stride: i32,
        offset: i32,
    ) {
        let mut state = self.state.borrow_mut();
        let buffer = state.array_buffer;
        let vao = state.vertex_array;
        if let Some(attribs) = vao.and_then(|vao| state.vertex_arrays.get_mut(&vao)) {
            attribs.retain(|a| a.location != location);
            attribs.push(AttribPointer {
                location,
                buffer,
                components,
                data_type,
                integer: true,
                stride,
                offset,
            });
        }
    }

    fn create_texture(&self) -> Result<Texture, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let texture = Texture(state.allocate("texture")?);
        state.textures.insert(texture, TextureInfo::default());
        trace!("Created texture #{}", texture.id());
        Ok(texture)
    }

    fn delete_texture(&self, texture: Texture) {
        let mut state = self.state.borrow_mut();
        if state.textures.remove(&texture).is_none() {
            warn!("Deleted unknown texture #{}", texture.id());
        }
        state.unit_textures.retain(|_, t| *t != texture);
    }

    fn active_texture(&self, unit: u32) {
        self.state.borrow_mut().active_unit = unit;
    }

    fn bind_texture(&self, texture: Option<Texture>) {
        let mut state = self.state.borrow_mut();
        let unit = state.active_unit;
        match texture {
            Some(texture) => state.unit_textures.insert(unit, texture),
            None => state.unit_textures.remove(&unit),
        };
        state.calls.push(Call::BindTexture { unit, texture });
    }

    fn tex_image_2d(&self, format: TextureFormat, width: u32, height: u32, _pixels: Option<&[u8]>) {
        let mut state = self.state.borrow_mut();
        let Some(texture) = state.bound_texture() else {
            warn!("Texture image specified without a bound texture");
            return;
        };
        if let Some(info) = state.textures.get_mut(&texture) {
            *info = TextureInfo {
                format: Some(format),
                width,
                height,
            };
        }
    }

    fn tex_parameter(&self, _parameter: TextureParameter) {}

    fn generate_mipmap(&self) {}

    fn create_framebuffer(&self) -> Result<Framebuffer, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let fb = Framebuffer(state.allocate("framebuffer")?);
        state.framebuffers.insert(fb, FramebufferInfo::default());
        Ok(fb)
    }

    fn delete_framebuffer(&self, framebuffer: Framebuffer) {
        let mut state = self.state.borrow_mut();
        if state.framebuffers.remove(&framebuffer).is_none() {
            warn!("Deleted unknown framebuffer #{}", framebuffer.id());
        }
        if state.framebuffer == Some(framebuffer) {
            state.framebuffer = None;
        }
    }

    fn bind_framebuffer(&self, framebuffer: Option<Framebuffer>) {
        let mut state = self.state.borrow_mut();
        state.framebuffer = framebuffer;
        state.calls.push(Call::BindFramebuffer(framebuffer));
    }

    fn framebuffer_texture_2d(&self, attachment: Attachment, texture: Option<Texture>) {
        self.state
            .borrow_mut()
            .attach(attachment, texture.map(AttachedObject::Texture));
    }

    fn create_renderbuffer(&self) -> Result<Renderbuffer, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let rb = Renderbuffer(state.allocate("renderbuffer")?);
        state.renderbuffers.insert(rb, (0, 0));
        Ok(rb)
    }

    fn delete_renderbuffer(&self, renderbuffer: Renderbuffer) {
        let mut state = self.state.borrow_mut();
        if state.renderbuffers.remove(&renderbuffer).is_none() {
            warn!("Deleted unknown renderbuffer #{}", renderbuffer.id());
        }
        if state.renderbuffer == Some(renderbuffer) {
            state.renderbuffer = None;
        }
    }

    fn bind_renderbuffer(&self, renderbuffer: Option<Renderbuffer>) {
        self.state.borrow_mut().renderbuffer = renderbuffer;
    }

    fn renderbuffer_storage(&self, _format: TextureFormat, width: u32, height: u32) {
        let mut state = self.state.borrow_mut();
        let Some(rb) = state.renderbuffer else {
            warn!("Renderbuffer storage requested without a bound renderbuffer");
            return;
        };
        if let Some(size) = state.renderbuffers.get_mut(&rb) {
            *size = (width, height);
        }
    }

    fn framebuffer_renderbuffer(&self, attachment: Attachment, renderbuffer: Option<Renderbuffer>) {
        self.state
            .borrow_mut()
            .attach(attachment, renderbuffer.map(AttachedObject::Renderbuffer));
    }

    fn draw_buffers(&self, attachments: &[Attachment]) {
        let mut state = self.state.borrow_mut();
        let Some(fb) = state.framebuffer else {
            return;
        };
        if let Some(info) = state.framebuffers.get_mut(&fb) {
            info.draw_buffers = attachments.to_vec();
        }
    }

    fn check_framebuffer_status(&self) -> FramebufferStatus {
        let state = self.state.borrow();
        let Some(fb) = state.framebuffer else {
            return FramebufferStatus::Complete;
        };
        if state.force_incomplete {
            return FramebufferStatus::Unsupported;
        }
        let Some(info) = state.framebuffers.get(&fb) else {
            return FramebufferStatus::Other(0);
        };
        if info.attachments.is_empty() {
            return FramebufferStatus::MissingAttachment;
        }

        let all_sized = info.attachments.values().all(|object| {
            state
                .attached_size(*object)
                .is_some_and(|(w, h)| w > 0 && h > 0)
        });
        if all_sized {
            FramebufferStatus::Complete
        } else {
            FramebufferStatus::IncompleteAttachment
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<Shader, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let shader = Shader(state.allocate("shader")?);
        state.shaders.insert(
            shader,
            ShaderInfo {
                stage,
                source: String::new(),
                compiled: false,
                log: String::new(),
            },
        );
        Ok(shader)
    }

    fn delete_shader(&self, shader: Shader) {
        self.state.borrow_mut().shaders.remove(&shader);
    }

    fn shader_source(&self, shader: Shader, source: &str) {
        if let Some(info) = self.state.borrow_mut().shaders.get_mut(&shader) {
            info.source = source.to_string();
        }
    }

    fn compile_shader(&self, shader: Shader) {
        if let Some(info) = self.state.borrow_mut().shaders.get_mut(&shader) {
            info.compiled = info.source.contains("void main");
            info.log = if info.compiled {
                String::new()
            } else {
                format!("ERROR: 0:1: {} stage has no entry point 'main'", info.stage)
            };
        }
    }

    fn shader_compile_status(&self, shader: Shader) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .is_some_and(|info| info.compiled)
    }

    fn shader_info_log(&self, shader: Shader) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|info| info.log.clone())
            .unwrap_or_default()
    }

    fn create_program(&self) -> Result<Program, GraphicsError> {
        let mut state = self.state.borrow_mut();
        let program = Program(state.allocate("program")?);
        state.programs.insert(program, ProgramInfo::default());
        Ok(program)
    }

    fn delete_program(&self, program: Program) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program);
        if state.program == Some(program) {
            state.program = None;
        }
    }

    fn attach_shader(&self, program: Program, shader: Shader) {
        if let Some(info) = self.state.borrow_mut().programs.get_mut(&program) {
            info.shaders.push(shader);
        }
    }

    fn link_program(&self, program: Program) {
        let mut state = self.state.borrow_mut();
        let Some(attached) = state.programs.get(&program).map(|p| p.shaders.clone()) else {
            return;
        };

        let stages: Vec<&ShaderInfo> = attached
            .iter()
            .filter_map(|s| state.shaders.get(s))
            .collect();
        let has_vertex = stages.iter().any(|s| s.stage == ShaderStage::Vertex);
        let has_fragment = stages.iter().any(|s| s.stage == ShaderStage::Fragment);
        let all_compiled = stages.len() == attached.len() && stages.iter().all(|s| s.compiled);

        let mut uniforms = HashMap::new();
        let mut attributes = HashMap::new();
        let mut next_uniform = 0;
        for stage in &stages {
            for (name, len) in scan_declarations(&stage.source, "uniform") {
                if uniforms.contains_key(&name) {
                    continue;
                }
                uniforms.insert(name.clone(), next_uniform);
                if len > 1 {
                    for i in 0..len {
                        uniforms.insert(format!("{name}[{i}]"), next_uniform + i);
                    }
                } else {
                    uniforms.insert(format!("{name}[0]"), next_uniform);
                }
                next_uniform += len;
            }
            if stage.stage == ShaderStage::Vertex {
                for (name, _) in scan_declarations(&stage.source, "in") {
                    let next = attributes.len() as u32;
                    attributes.entry(name).or_insert(next);
                }
            }
        }

        let (linked, log) = match (all_compiled, has_vertex && has_fragment) {
            (false, _) => (false, "ERROR: attached shader is not compiled".to_string()),
            (true, false) => (
                false,
                "ERROR: program needs a vertex and a fragment stage".to_string(),
            ),
            (true, true) => (true, String::new()),
        };

        if let Some(info) = state.programs.get_mut(&program) {
            info.linked = linked;
            info.log = log;
            info.uniforms = uniforms;
            info.attributes = attributes;
        }
    }

    fn program_link_status(&self, program: Program) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|info| info.linked)
    }

    fn program_info_log(&self, program: Program) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|info| info.log.clone())
            .unwrap_or_default()
    }

    fn use_program(&self, program: Option<Program>) {
        let mut state = self.state.borrow_mut();
        state.program = program;
        state.calls.push(Call::UseProgram(program));
    }

    fn get_uniform_location(&self, program: Program, name: &str) -> Option<UniformLocation> {
        let state = self.state.borrow();
        let info = state.programs.get(&program).filter(|p| p.linked)?;
        info.uniforms.get(name).copied().map(UniformLocation)
    }

    fn get_attrib_location(&self, program: Program, name: &str) -> Option<u32> {
        let state = self.state.borrow();
        let info = state.programs.get(&program).filter(|p| p.linked)?;
        info.attributes.get(name).copied()
    }

    fn uniform_i32(&self, location: UniformLocation, value: i32) {
        self.record_uniform(location, UniformValue::I32(value));
    }

    fn uniform_f32(&self, location: UniformLocation, value: f32) {
        self.record_uniform(location, UniformValue::F32(value));
    }

    fn uniform_vec3(&self, location: UniformLocation, value: [f32; 3]) {
        self.record_uniform(location, UniformValue::Vec3(value));
    }

    fn uniform_vec4(&self, location: UniformLocation, value: [f32; 4]) {
        self.record_uniform(location, UniformValue::Vec4(value));
    }

    fn uniform_mat4(&self, location: UniformLocation, value: &[f32; 16]) {
        self.record_uniform(location, UniformValue::Mat4(*value));
    }

    fn uniform_mat4_array(&self, location: UniformLocation, values: &[[f32; 16]]) {
        for (i, value) in values.iter().enumerate() {
            self.record_uniform(
                UniformLocation(location.0 + i as u32),
                UniformValue::Mat4(*value),
            );
        }
    }

    fn enable(&self, capability: Capability) {
        self.record(Call::Enable(capability));
    }

    fn disable(&self, capability: Capability) {
        self.record(Call::Disable(capability));
    }

    fn cull_face(&self, face: Face) {
        self.record(Call::CullFace(face));
    }

    fn blend_func(&self, src: BlendFactor, dst: BlendFactor) {
        self.record(Call::BlendFunc(src, dst));
    }

    fn depth_mask(&self, write: bool) {
        self.record(Call::DepthMask(write));
    }

    fn polygon_offset(&self, factor: f32, units: f32) {
        self.record(Call::PolygonOffset { factor, units });
    }

    fn viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        self.record(Call::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn clear_color(&self, _r: f32, _g: f32, _b: f32, _a: f32) {}

    fn clear(&self, mask: ClearMask) {
        self.record(Call::Clear(mask));
    }

    fn draw_elements(&self, mode: DrawMode, count: u32, _offset: u32) {
        let mut state = self.state.borrow_mut();
        let program = state.program;
        let vertex_array = state.vertex_array;
        state.calls.push(Call::Draw {
            mode,
            count,
            program,
            vertex_array,
        });
    }

    fn draw_arrays(&self, mode: DrawMode, _first: u32, count: u32) {
        let mut state = self.state.borrow_mut();
        let program = state.program;
        let vertex_array = state.vertex_array;
        state.calls.push(Call::Draw {
            mode,
            count,
            program,
            vertex_array,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = "#version 330 core
        uniform mat4 MVP_MATRIX;
        uniform mat4 BONES[4]; // skinning
        in vec3 VERTEX_POSITION;
        in vec2 VERTEX_UV_0;
        void main() { gl_Position = MVP_MATRIX * vec4(VERTEX_POSITION, 1.0); }";
    const FS: &str = "#version 330 core
        uniform highp vec4 MATERIAL_DIFFUSE, MATERIAL_SPECULAR;
        out vec4 color;
        void main() { color = MATERIAL_DIFFUSE; }";

    fn link(gfx: &HeadlessGraphics, vs: &str, fs: &str) -> Program {
        let program = gfx.create_program().unwrap();
        for (stage, source) in [(ShaderStage::Vertex, vs), (ShaderStage::Fragment, fs)] {
            let shader = gfx.create_shader(stage).unwrap();
            gfx.shader_source(shader, source);
            gfx.compile_shader(shader);
            gfx.attach_shader(program, shader);
        }
        gfx.link_program(program);
        program
    }

    #[test]
    fn declared_uniforms_get_locations() {
        let gfx = HeadlessGraphics::new();
        let program = link(&gfx, VS, FS);

        assert!(gfx.program_link_status(program));
        assert!(gfx.get_uniform_location(program, "MVP_MATRIX").is_some());
        assert!(gfx.get_uniform_location(program, "MATERIAL_SPECULAR").is_some());
        assert!(gfx.get_uniform_location(program, "MATERIAL_SHININESS").is_none());
        assert_eq!(gfx.get_attrib_location(program, "VERTEX_POSITION"), Some(0));
        assert_eq!(gfx.get_attrib_location(program, "VERTEX_UV_0"), Some(1));
        assert_eq!(gfx.get_attrib_location(program, "color"), None);
    }

    #[test]
    fn array_uniforms_are_contiguous() {
        let gfx = HeadlessGraphics::new();
        let program = link(&gfx, VS, FS);

        let base = gfx.get_uniform_location(program, "BONES").unwrap();
        let third = gfx.get_uniform_location(program, "BONES[2]").unwrap();
        assert_eq!(base, gfx.get_uniform_location(program, "BONES[0]").unwrap());
        assert_eq!(third.0, base.0 + 2);
        assert!(gfx.get_uniform_location(program, "BONES[4]").is_none());
    }

    #[test]
    fn missing_main_fails_compilation_and_link() {
        let gfx = HeadlessGraphics::new();
        let program = link(&gfx, "uniform mat4 X;", FS);

        assert!(!gfx.program_link_status(program));
        assert!(gfx.get_uniform_location(program, "X").is_none());
    }

    #[test]
    fn framebuffer_completeness_follows_attachments() {
        let gfx = HeadlessGraphics::new();
        let fb = gfx.create_framebuffer().unwrap();
        gfx.bind_framebuffer(Some(fb));
        assert_eq!(gfx.check_framebuffer_status(), FramebufferStatus::MissingAttachment);

        let tex = gfx.create_texture().unwrap();
        gfx.framebuffer_texture_2d(Attachment::Color(0), Some(tex));
        assert_eq!(
            gfx.check_framebuffer_status(),
            FramebufferStatus::IncompleteAttachment
        );

        gfx.bind_texture(Some(tex));
        gfx.tex_image_2d(TextureFormat::Rgba8, 4, 4, None);
        assert_eq!(gfx.check_framebuffer_status(), FramebufferStatus::Complete);

        gfx.force_incomplete_framebuffers(true);
        assert_eq!(gfx.check_framebuffer_status(), FramebufferStatus::Unsupported);
    }

    #[test]
    fn uniform_query_reads_last_upload() {
        let gfx = HeadlessGraphics::new();
        let program = link(&gfx, VS, FS);
        let location = gfx.get_uniform_location(program, "MATERIAL_DIFFUSE").unwrap();

        gfx.use_program(Some(program));
        gfx.uniform_vec4(location, [1.0, 0.0, 0.0, 1.0]);
        gfx.uniform_vec4(location, [0.0, 1.0, 0.0, 1.0]);

        assert_eq!(
            gfx.uniform(program, "MATERIAL_DIFFUSE"),
            Some(UniformValue::Vec4([0.0, 1.0, 0.0, 1.0]))
        );
        assert_eq!(gfx.uniform(program, "MATERIAL_SPECULAR"), None);
    }

    #[test]
    fn allocation_budget_fails_later_creations() {
        let gfx = HeadlessGraphics::new();
        gfx.fail_allocations_after(Some(1));

        assert!(gfx.create_buffer().is_ok());
        assert!(matches!(
            gfx.create_texture(),
            Err(GraphicsError::ObjectCreation { kind: "texture", .. })
        ));
        assert_eq!(gfx.live_textures(), 0);

        gfx.fail_allocations_after(None);
        assert!(gfx.create_texture().is_ok());
    }
}
