//! Forward shading with up to [`MAX_FORWARD_LIGHTS`] lights and optional
//! per-light shadow maps.

mod shadow;

pub use shadow::{ShadowMap, ShadowMapConfig, shadow_bias_matrix};

use crate::binding::{TextureUnits, UniformBinder};
use crate::graphics::{
    Attachment, Capability, ClearMask, DrawMode, Face, Framebuffer, FramebufferStatus, Graphics,
};
use crate::renderable::{RenderableId, Scene};
use crate::renderer::{
    DrawRequest, DrawView, Light, RenderError, Renderer, ScreenSizeListener, TooManyLightsErr,
};
use crate::shader::{ShaderProgram, names};
use fizzle_utils::{FizzleArgs, debug_panic};
use snafu::ensure;
use static_assertions::const_assert;
use std::rc::Rc;
use tracing::{debug, instrument, trace, warn};

pub const MAX_FORWARD_LIGHTS: usize = 4;

// Every light may claim a shadow sampler on top of the material textures.
const_assert!(MAX_FORWARD_LIGHTS <= 16);

/// Number of leading active lights. Lights are always packed to the front.
pub fn active_light_count(lights: &[Option<Light>]) -> usize {
    lights.iter().take_while(|light| light.is_some()).count()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ShadowPass {
    Idle,
    Generating { light: Option<usize> },
}

pub struct ForwardRenderer {
    gfx: Rc<Graphics>,
    width: u32,
    height: u32,
    active_lights: [Option<Light>; MAX_FORWARD_LIGHTS],
    shadow_framebuffer: Option<Framebuffer>,
    shadow_pass: ShadowPass,
    /// Skips shadow samplers when binding lights. Starts out as the inverse
    /// of `--no-shadows`.
    pub shadows_enabled: bool,
    screen_size_listener: Option<Box<dyn ScreenSizeListener>>,
}

impl ForwardRenderer {
    pub fn new(gfx: Rc<Graphics>) -> Self {
        Self {
            gfx,
            width: 0,
            height: 0,
            active_lights: Default::default(),
            shadow_framebuffer: None,
            shadow_pass: ShadowPass::Idle,
            shadows_enabled: !FizzleArgs::get().no_shadows,
            screen_size_listener: None,
        }
    }

    pub fn graphics(&self) -> &Graphics {
        &*self.gfx
    }

    /// Puts `light` into the first free slot and returns that slot.
    ///
    /// When every slot is taken the light is dropped and its shadow map
    /// released.
    pub fn activate_light(&mut self, mut light: Light) -> Result<usize, RenderError> {
        let index = self.active_light_count();
        if index >= MAX_FORWARD_LIGHTS {
            light.destroy_shadow_map(&*self.gfx);
        }
        ensure!(
            index < MAX_FORWARD_LIGHTS,
            TooManyLightsErr {
                max: MAX_FORWARD_LIGHTS
            }
        );

        debug!("Activated light #{index}");
        self.active_lights[index] = Some(light);
        Ok(index)
    }

    /// Removes the light in slot `index`, moving later lights down so the
    /// active ones stay packed.
    pub fn deactivate_light(&mut self, index: usize) -> Option<Light> {
        let light = self.active_lights.get_mut(index)?.take()?;
        self.active_lights[index..].rotate_left(1);
        debug!("Deactivated light #{index}");
        Some(light)
    }

    pub fn light(&self, index: usize) -> Option<&Light> {
        self.active_lights.get(index)?.as_ref()
    }

    pub fn light_mut(&mut self, index: usize) -> Option<&mut Light> {
        self.active_lights.get_mut(index)?.as_mut()
    }

    pub fn lights(&self) -> impl Iterator<Item = &Light> {
        self.active_lights.iter().map_while(Option::as_ref)
    }

    pub fn active_light_count(&self) -> usize {
        active_light_count(&self.active_lights)
    }

    /// Allocates the depth-only framebuffer every shadow map renders through.
    pub fn setup_shadow_map_rendering(&mut self) -> Result<(), RenderError> {
        if self.shadow_framebuffer.is_some() {
            return Ok(());
        }

        let gfx = &*self.gfx;
        let framebuffer = gfx.create_framebuffer()?;
        gfx.bind_framebuffer(Some(framebuffer));
        gfx.draw_buffers(&[]);
        gfx.bind_framebuffer(None);

        trace!("Allocated shadow framebuffer #{}", framebuffer.id());
        self.shadow_framebuffer = Some(framebuffer);
        Ok(())
    }

    pub fn is_generating_shadows(&self) -> bool {
        matches!(self.shadow_pass, ShadowPass::Generating { .. })
    }

    /// Light whose shadow map is currently being rendered.
    pub fn shadow_light(&self) -> Option<usize> {
        match self.shadow_pass {
            ShadowPass::Generating { light } => light,
            ShadowPass::Idle => None,
        }
    }

    #[instrument(skip_all)]
    #[profiling::function]
    pub fn start_shadow_mapping(&mut self) {
        let Some(framebuffer) = self.shadow_framebuffer else {
            debug_panic!("Shadow mapping started before the shadow framebuffer was set up");
            return;
        };
        if self.is_generating_shadows() {
            debug_panic!("Shadow mapping started twice");
        }

        let gfx = &*self.gfx;
        gfx.bind_framebuffer(Some(framebuffer));
        gfx.enable(Capability::CullFace);
        gfx.cull_face(Face::Front);
        gfx.enable(Capability::PolygonOffsetFill);
        gfx.polygon_offset(1.1, 4.0);

        self.shadow_pass = ShadowPass::Generating { light: None };
    }

    /// Points the shadow framebuffer at light `index`'s depth texture and
    /// clears it.
    ///
    /// Returns the view to draw shadow casters from, or `None` if the light
    /// has no shadow map.
    #[instrument(skip(self))]
    pub fn enable_shadow_mapping_light(&mut self, index: usize) -> Option<DrawView> {
        if !self.is_generating_shadows() {
            debug_panic!("Shadow light enabled outside of shadow mapping");
            return None;
        }

        let gfx = &*self.gfx;
        let light = self.active_lights.get_mut(index)?.as_mut()?;
        let position = light.position;
        let kind = light.kind;
        let shadow_map = light.shadow_map.as_mut()?;
        shadow_map.update_matrices(&position, &kind);

        gfx.framebuffer_texture_2d(Attachment::Depth, Some(shadow_map.texture));
        let status = gfx.check_framebuffer_status();
        if status != FramebufferStatus::Complete {
            warn!("Shadow framebuffer for light #{index} is not usable: {status}");
            return None;
        }

        gfx.viewport(0, 0, shadow_map.size(), shadow_map.size());
        gfx.clear(ClearMask::DEPTH);

        let view = DrawView::new(*shadow_map.projection(), *shadow_map.view(), position);
        self.shadow_pass = ShadowPass::Generating { light: Some(index) };
        Some(view)
    }

    #[instrument(skip_all)]
    #[profiling::function]
    pub fn end_shadow_mapping(&mut self) {
        if !self.is_generating_shadows() {
            debug_panic!("Shadow mapping ended without being started");
        }

        let gfx = &*self.gfx;
        gfx.cull_face(Face::Back);
        gfx.disable(Capability::PolygonOffsetFill);
        gfx.bind_framebuffer(None);
        gfx.viewport(0, 0, self.width, self.height);

        self.shadow_pass = ShadowPass::Idle;
    }

    fn light_binder(&self) -> Option<ForwardLightBinder<'_>> {
        // shadow casters only need depth
        if self.is_generating_shadows() {
            return None;
        }
        Some(ForwardLightBinder {
            lights: &self.active_lights,
            shadows: self.shadows_enabled,
        })
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
        let light_binder = self.light_binder();
        let request = DrawRequest {
            scene,
            shader,
            mode,
            view,
            renderer_binder: light_binder.as_ref().map(|b| b as &dyn UniformBinder),
            binder,
        };
        request.draw(&*self.gfx, id);
    }
}

impl Renderer for ForwardRenderer {
    fn init(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.change_resolution(width, height)
    }

    /// Forward rendering has no resolution dependent targets, only the
    /// viewport changes.
    fn change_resolution(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.width = width;
        self.height = height;
        self.gfx.viewport(0, 0, width, height);

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

    #[instrument(skip_all)]
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

    #[instrument(skip_all)]
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

    #[instrument(skip_all)]
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
        for slot in &mut self.active_lights {
            if let Some(mut light) = slot.take() {
                light.destroy_shadow_map(gfx);
            }
        }
        if let Some(framebuffer) = self.shadow_framebuffer.take() {
            gfx.delete_framebuffer(framebuffer);
        }
        self.shadow_pass = ShadowPass::Idle;
    }
}

/// Writes the active lights and their shadow maps into the indexed light
/// uniforms.
struct ForwardLightBinder<'a> {
    lights: &'a [Option<Light>; MAX_FORWARD_LIGHTS],
    shadows: bool,
}

impl UniformBinder for ForwardLightBinder<'_> {
    fn bind(&self, gfx: &Graphics, shader: &ShaderProgram, units: &mut TextureUnits) {
        let mut light_count = 0;
        let mut shadow_count = 0;

        for (index, light) in self.lights.iter().map_while(Option::as_ref).enumerate() {
            light.bind_uniforms(gfx, shader, Some(index));
            light_count += 1;

            if !self.shadows {
                continue;
            }
            if let Some(shadow_map) = &light.shadow_map {
                shader.set_mat4(
                    gfx,
                    &names::indexed(names::SHADOW_MATRIX, shadow_count),
                    shadow_map.bias_matrix(),
                );
                units.bind(
                    gfx,
                    shader,
                    &names::indexed(names::SHADOW_MAPS, shadow_count),
                    shadow_map.texture,
                );
                shadow_count += 1;
            }
        }

        shader.set_i32(gfx, names::LIGHT_COUNT, light_count as i32);
        shader.set_i32(gfx, names::SHADOW_COUNT, shadow_count as i32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::{GraphicsProvider, HeadlessGraphics, UniformValue};
    use nalgebra::Vector3;

    fn lights(count: usize) -> [Option<Light>; MAX_FORWARD_LIGHTS] {
        std::array::from_fn(|i| (i < count).then(|| Light::point(Vector3::repeat(i as f32))))
    }

    #[test]
    fn counts_leading_lights() {
        assert_eq!(active_light_count(&lights(2)), 2);
        assert_eq!(active_light_count(&lights(0)), 0);
        assert_eq!(active_light_count(&lights(4)), 4);
    }

    #[test]
    fn activation_keeps_lights_packed() {
        let gfx: Rc<Graphics> = Rc::new(HeadlessGraphics::new());
        let mut renderer = ForwardRenderer::new(gfx);

        for i in 0..MAX_FORWARD_LIGHTS {
            assert_eq!(renderer.activate_light(Light::point(Vector3::zeros())).unwrap(), i);
        }
        assert!(matches!(
            renderer.activate_light(Light::point(Vector3::zeros())),
            Err(RenderError::TooManyLights { max: 4 })
        ));

        renderer.light_mut(2).unwrap().strength = 7.0;
        assert!(renderer.deactivate_light(1).is_some());
        assert_eq!(renderer.active_light_count(), 3);
        assert_eq!(renderer.light(1).unwrap().strength, 7.0);
        assert!(renderer.deactivate_light(3).is_none());
    }

    #[test]
    fn binder_writes_counts() {
        let gfx = HeadlessGraphics::new();
        let shader = ShaderProgram::from_sources(
            &gfx,
            "lit",
            "void main() {}",
            "uniform int LIGHT_COUNT; uniform int SHADOW_COUNT; uniform vec3 LIGHT_POSITION[4];
            void main() {}",
        )
        .unwrap();
        gfx.use_program(Some(shader.program()));

        let lights = lights(3);
        let binder = ForwardLightBinder {
            lights: &lights,
            shadows: true,
        };
        let mut units = TextureUnits::new();
        binder.bind(&gfx, &shader, &mut units);

        assert_eq!(gfx.uniform(shader.program(), "LIGHT_COUNT"), Some(UniformValue::I32(3)));
        assert_eq!(gfx.uniform(shader.program(), "SHADOW_COUNT"), Some(UniformValue::I32(0)));
        assert_eq!(
            gfx.uniform(shader.program(), "LIGHT_POSITION[2]"),
            Some(UniformValue::Vec3([2.0, 2.0, 2.0]))
        );
        assert_eq!(units.used(), 0);
    }
}
