//! Deferred shading: scene geometry goes into a G-buffer first, lights are
//! then accumulated over it one full-screen quad at a time.

use crate::binding::{TextureUnits, UniformBinder};
use crate::graphics::{
    Attachment, BlendFactor, Capability, ClearMask, DrawMode, Framebuffer, FramebufferStatus,
    Graphics, Renderbuffer, Texture, TextureFilter, TextureFormat,
};
use crate::meshes::create_plane_xy;
use crate::renderable::{RenderableId, Scene};
use crate::renderer::{
    DrawRequest, DrawView, FramebufferIncompleteErr, Light, RenderError, Renderer,
    ScreenSizeListener,
};
use crate::shader::{ShaderProgram, names};
use crate::surface::RenderSurface;
use crate::texture::{TextureDescriptor, create_texture};
use fizzle_utils::debug_panic;
use nalgebra::Vector3;
use snafu::ensure;
use std::rc::Rc;
use tracing::{debug, instrument, trace, warn};

/// Color targets of the G-buffer, in attachment order.
const TARGET_FORMATS: [TextureFormat; 3] = [
    TextureFormat::Rgba32F, // diffuse
    TextureFormat::Rgba32F, // world position
    TextureFormat::Rgba16F, // world normal
];

/// Framebuffer the geometry pass renders into.
#[derive(Debug)]
pub struct GBuffer {
    pub framebuffer: Framebuffer,
    pub depth: Renderbuffer,
    pub diffuse: Texture,
    pub positions: Texture,
    pub normals: Texture,
    width: u32,
    height: u32,
}

impl GBuffer {
    /// Allocates every target at `width`×`height` and checks the result is
    /// complete. On any failure everything allocated so far is released
    /// again before returning.
    pub fn new(gfx: &Graphics, width: u32, height: u32) -> Result<Self, RenderError> {
        let framebuffer = gfx.create_framebuffer()?;
        gfx.bind_framebuffer(Some(framebuffer));

        let mut allocated = Allocated::default();
        let result = Self::attach_targets(gfx, width, height, &mut allocated);
        gfx.bind_texture(None);
        gfx.bind_framebuffer(None);

        let (depth, [diffuse, positions, normals]) = match result {
            Ok(attachments) => attachments,
            Err(err) => {
                allocated.release(gfx);
                gfx.delete_framebuffer(framebuffer);
                return Err(err);
            }
        };

        debug!("Allocated {width}x{height} G-buffer");
        Ok(Self {
            framebuffer,
            depth,
            diffuse,
            positions,
            normals,
            width,
            height,
        })
    }

    /// Fills the bound framebuffer. Every object is recorded in `allocated`
    /// as soon as it exists.
    fn attach_targets(
        gfx: &Graphics,
        width: u32,
        height: u32,
        allocated: &mut Allocated,
    ) -> Result<(Renderbuffer, [Texture; 3]), RenderError> {
        let depth = gfx.create_renderbuffer()?;
        allocated.depth = Some(depth);
        gfx.bind_renderbuffer(Some(depth));
        gfx.renderbuffer_storage(TextureFormat::Depth24, width, height);
        gfx.bind_renderbuffer(None);
        gfx.framebuffer_renderbuffer(Attachment::Depth, Some(depth));

        let mut target = |slot: u32| -> Result<Texture, RenderError> {
            let format = TARGET_FORMATS[slot as usize];
            let texture = Self::create_target(gfx, format, width, height, slot)?;
            allocated.targets.push(texture);
            Ok(texture)
        };
        let targets = [target(0)?, target(1)?, target(2)?];

        gfx.draw_buffers(&[
            Attachment::Color(0),
            Attachment::Color(1),
            Attachment::Color(2),
        ]);

        let status = gfx.check_framebuffer_status();
        ensure!(
            status == FramebufferStatus::Complete,
            FramebufferIncompleteErr { status }
        );
        Ok((depth, targets))
    }

    fn create_target(
        gfx: &Graphics,
        format: TextureFormat,
        width: u32,
        height: u32,
        slot: u32,
    ) -> Result<Texture, RenderError> {
        let desc = TextureDescriptor::builder()
            .format(format)
            .width(width)
            .height(height)
            .filter(TextureFilter::Nearest)
            .build();
        let texture = create_texture(gfx, &desc, None)?;
        gfx.framebuffer_texture_2d(Attachment::Color(slot), Some(texture));
        Ok(texture)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn destroy(self, gfx: &Graphics) {
        for texture in [self.diffuse, self.positions, self.normals] {
            gfx.delete_texture(texture);
        }
        gfx.delete_renderbuffer(self.depth);
        gfx.delete_framebuffer(self.framebuffer);
    }
}

/// Objects a G-buffer under construction owns so far.
#[derive(Debug, Default)]
struct Allocated {
    depth: Option<Renderbuffer>,
    targets: Vec<Texture>,
}

impl Allocated {
    fn release(self, gfx: &Graphics) {
        for texture in self.targets {
            gfx.delete_texture(texture);
        }
        if let Some(depth) = self.depth {
            gfx.delete_renderbuffer(depth);
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeferredPhase {
    Idle,
    Geometry,
    Composite,
}

/// Callbacks [`DeferredRenderer::render_loop`] runs every frame, in the
/// order they are declared.
pub trait DeferredFrameHandler {
    fn before_draw(&mut self, _renderer: &mut DeferredRenderer) {}

    /// Draws scene geometry. Output goes into the G-buffer.
    fn geometry_pass(&mut self, renderer: &DeferredRenderer);

    /// Accumulates lights, usually one
    /// [`draw_directional_light`](DeferredRenderer::draw_directional_light)
    /// per active light.
    fn composite_pass(&mut self, renderer: &DeferredRenderer);

    fn after_draw(&mut self, _renderer: &mut DeferredRenderer) {}
}

pub struct DeferredRenderer {
    gfx: Rc<Graphics>,
    width: u32,
    height: u32,
    gbuffer: Option<GBuffer>,
    composite_shader: Rc<ShaderProgram>,
    quad_scene: Scene,
    quad: RenderableId,
    phase: DeferredPhase,
    screen_size_listener: Option<Box<dyn ScreenSizeListener>>,
}

impl DeferredRenderer {
    /// Creates the renderer and its full-screen quad. The G-buffer is only
    /// allocated by [`Renderer::init`].
    pub fn new(gfx: Rc<Graphics>, composite_shader: Rc<ShaderProgram>) -> Result<Self, RenderError> {
        let mut quad_scene = Scene::new();
        let quad = quad_scene.insert(create_plane_xy(&*gfx, -1.0, -1.0, 1.0, 1.0)?);

        Ok(Self {
            gfx,
            width: 0,
            height: 0,
            gbuffer: None,
            composite_shader,
            quad_scene,
            quad,
            phase: DeferredPhase::Idle,
            screen_size_listener: None,
        })
    }

    pub fn graphics(&self) -> &Graphics {
        &*self.gfx
    }

    pub fn gbuffer(&self) -> Option<&GBuffer> {
        self.gbuffer.as_ref()
    }

    pub fn phase(&self) -> DeferredPhase {
        self.phase
    }

    fn enter(&mut self, from: DeferredPhase, to: DeferredPhase) {
        if self.phase != from {
            debug_panic!("Deferred pass {to:?} entered from {:?}", self.phase);
        }
        self.phase = to;
    }

    #[profiling::function]
    pub fn start_geometry_pass(&mut self) {
        self.enter(DeferredPhase::Idle, DeferredPhase::Geometry);

        let gfx = &*self.gfx;
        if self.gbuffer.is_none() {
            warn!("Geometry pass without a G-buffer, drawing into the default framebuffer");
        }
        gfx.bind_framebuffer(self.gbuffer.as_ref().map(|gbuffer| gbuffer.framebuffer));
        gfx.viewport(0, 0, self.width, self.height);
        gfx.depth_mask(true);
        gfx.enable(Capability::DepthTest);
        gfx.disable(Capability::Blend);
        gfx.clear(ClearMask::COLOR | ClearMask::DEPTH);
    }

    pub fn end_geometry_pass(&mut self) {
        self.enter(DeferredPhase::Geometry, DeferredPhase::Idle);
        self.gfx.bind_framebuffer(None);
    }

    #[profiling::function]
    pub fn start_composite_pass(&mut self) {
        self.enter(DeferredPhase::Idle, DeferredPhase::Composite);

        let gfx = &*self.gfx;
        gfx.bind_framebuffer(None);
        gfx.viewport(0, 0, self.width, self.height);
        gfx.clear(ClearMask::COLOR | ClearMask::DEPTH);
        gfx.disable(Capability::DepthTest);
        gfx.depth_mask(false);
        gfx.enable(Capability::Blend);
        gfx.blend_func(BlendFactor::One, BlendFactor::One);
    }

    /// Adds one light's contribution over the whole screen.
    #[instrument(skip_all)]
    #[profiling::function]
    pub fn draw_directional_light(&self, camera_position: &Vector3<f32>, light: &Light) {
        if self.phase != DeferredPhase::Composite {
            debug_panic!("Lights can only be drawn during the composite pass");
            return;
        }
        let Some(gbuffer) = &self.gbuffer else {
            trace!("No G-buffer to composite");
            return;
        };

        let binder = |gfx: &Graphics, shader: &ShaderProgram, units: &mut TextureUnits| {
            units.bind(gfx, shader, names::DIFFUSE_TEX, gbuffer.diffuse);
            units.bind(gfx, shader, names::POSITIONS_TEX, gbuffer.positions);
            units.bind(gfx, shader, names::NORMALS_TEX, gbuffer.normals);
            light.bind_uniforms(gfx, shader, None);
        };

        let view = DrawView::screen_space(*camera_position);
        let request = DrawRequest {
            scene: &self.quad_scene,
            shader: Some(&*self.composite_shader),
            mode: DrawMode::Triangles,
            view: &view,
            renderer_binder: Some(&binder),
            binder: None,
        };
        request.draw(&*self.gfx, self.quad);
    }

    pub fn end_composite_pass(&mut self) {
        self.enter(DeferredPhase::Composite, DeferredPhase::Idle);

        let gfx = &*self.gfx;
        gfx.disable(Capability::Blend);
        gfx.depth_mask(true);
        gfx.enable(Capability::DepthTest);
    }

    /// Runs frames until `surface` asks to close.
    ///
    /// Each frame follows the size of the surface's framebuffer, then calls
    /// the handler's before, geometry, composite and after steps before
    /// presenting.
    pub fn render_loop(
        &mut self,
        surface: &mut dyn RenderSurface,
        handler: &mut dyn DeferredFrameHandler,
    ) -> Result<(), RenderError> {
        while !surface.should_close() {
            profiling::scope!("deferred frame");

            let (width, height) = surface.framebuffer_size();
            if (width, height) != (self.width, self.height) && width > 0 && height > 0 {
                self.change_resolution(width, height)?;
            }

            handler.before_draw(self);

            self.start_geometry_pass();
            handler.geometry_pass(self);
            self.end_geometry_pass();

            self.start_composite_pass();
            handler.composite_pass(self);
            self.end_composite_pass();

            handler.after_draw(self);

            surface.swap_buffers();
            surface.poll_events();
            profiling::finish_frame!();
        }
        Ok(())
    }

    fn draw(
        &self,
        scene: &Scene,
        id: RenderableId,
        shader: Option<&ShaderProgram>,
        mode: DrawMode,
        binder: Option<&dyn UniformBinder>,
        view: &DrawView,
    ) {
        let request = DrawRequest {
            scene,
            shader,
            mode,
            view,
            renderer_binder: None,
            binder,
        };
        request.draw(&*self.gfx, id);
    }
}

impl Renderer for DeferredRenderer {
    fn init(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.change_resolution(width, height)
    }

    /// Throws the whole G-buffer away and allocates a new one.
    #[instrument(skip(self))]
    fn change_resolution(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if let Some(old) = self.gbuffer.take() {
            old.destroy(&*self.gfx);
        }

        self.gbuffer = Some(GBuffer::new(&*self.gfx, width, height)?);
        self.width = width;
        self.height = height;

        if let Some(listener) = &mut self.screen_size_listener {
            listener.screen_size_changed(width, height);
        }
        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_screen_size_listener(&mut self, listener: Option<Box<dyn ScreenSizeListener>>) {
        self.screen_size_listener = listener;
    }

    #[profiling::function]
    fn draw_renderable(
        &self,
        scene: &Scene,
        id: RenderableId,
        binder: Option<&dyn UniformBinder>,
        view: &DrawView,
    ) {
        self.draw(scene, id, None, DrawMode::Triangles, binder, view);
    }

    #[profiling::function]
    fn draw_renderable_with_shader(
        &self,
        scene: &Scene,
        id: RenderableId,
        shader: &ShaderProgram,
        binder: Option<&dyn UniformBinder>,
        view: &DrawView,
    ) {
        self.draw(scene, id, Some(shader), DrawMode::Triangles, binder, view);
    }

    #[profiling::function]
    fn draw_lines(
        &self,
        scene: &Scene,
        id: RenderableId,
        shader: &ShaderProgram,
        binder: Option<&dyn UniformBinder>,
        view: &DrawView,
    ) {
        self.draw(scene, id, Some(shader), DrawMode::Lines, binder, view);
    }

    fn destroy(&mut self) {
        let gfx = &*self.gfx;
        if let Some(gbuffer) = self.gbuffer.take() {
            gbuffer.destroy(gfx);
        }
        self.quad_scene.destroy(gfx, self.quad);
        self.phase = DeferredPhase::Idle;
    }
}
