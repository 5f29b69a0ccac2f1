//! Renderer contract shared by the forward and deferred pipelines, and the
//! per-node draw routine both of them run.

pub mod deferred;
pub mod forward;
mod light;

pub use light::{Attenuation, Light, LightKind};

use crate::binding::{TextureUnits, UniformBinder};
use crate::camera::Camera;
use crate::graphics::{DrawMode, Graphics, GraphicsError, FramebufferStatus};
use crate::renderable::{MeshError, Renderable, RenderableId, Scene};
use crate::shader::{ShaderProgram, names};
use nalgebra::{Matrix4, Vector3};
use snafu::Snafu;
use tracing::trace;

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)))]
pub enum RenderError {
    #[snafu(display("Framebuffer is not complete: {status}"))]
    FramebufferIncomplete { status: FramebufferStatus },

    #[snafu(display("All {max} light slots are already in use"))]
    TooManyLights { max: usize },

    #[snafu(transparent)]
    Graphics { source: GraphicsError },

    #[snafu(transparent)]
    Mesh { source: MeshError },
}

/// Projection and view a draw happens from.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawView {
    pub projection: Matrix4<f32>,
    pub view: Matrix4<f32>,
    pub camera_position: Vector3<f32>,
}

impl DrawView {
    pub fn new(projection: Matrix4<f32>, view: Matrix4<f32>, camera_position: Vector3<f32>) -> Self {
        Self {
            projection,
            view,
            camera_position,
        }
    }

    pub fn from_camera(projection: Matrix4<f32>, camera: &dyn Camera) -> Self {
        Self::new(projection, camera.view_matrix(), camera.position())
    }

    /// Identity projection and view, for geometry already in clip space.
    pub fn screen_space(camera_position: Vector3<f32>) -> Self {
        Self::new(Matrix4::identity(), Matrix4::identity(), camera_position)
    }
}

/// Notified after a renderer's resolution changed.
pub trait ScreenSizeListener {
    fn screen_size_changed(&mut self, width: u32, height: u32);
}

impl<F: FnMut(u32, u32)> ScreenSizeListener for F {
    fn screen_size_changed(&mut self, width: u32, height: u32) {
        self(width, height)
    }
}

pub trait Renderer {
    /// Allocates resolution dependent resources and notifies the screen size listener.
    fn init(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    /// Reallocates resolution dependent resources from scratch.
    fn change_resolution(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    fn resolution(&self) -> (u32, u32);

    fn set_screen_size_listener(&mut self, listener: Option<Box<dyn ScreenSizeListener>>);

    /// Draws `id` and its subtree with each core's own shader.
    fn draw_renderable(
        &self,
        scene: &Scene,
        id: RenderableId,
        binder: Option<&dyn UniformBinder>,
        view: &DrawView,
    );

    /// Like [`Renderer::draw_renderable`] but every node uses `shader`.
    fn draw_renderable_with_shader(
        &self,
        scene: &Scene,
        id: RenderableId,
        shader: &ShaderProgram,
        binder: Option<&dyn UniformBinder>,
        view: &DrawView,
    );

    /// Draws the subtree as a line list with `shader`.
    fn draw_lines(
        &self,
        scene: &Scene,
        id: RenderableId,
        shader: &ShaderProgram,
        binder: Option<&dyn UniformBinder>,
        view: &DrawView,
    );

    /// Releases every GPU object the renderer owns.
    fn destroy(&mut self);
}

/// Everything a subtree draw needs besides the graphics context.
pub(crate) struct DrawRequest<'a> {
    pub scene: &'a Scene,
    pub shader: Option<&'a ShaderProgram>,
    pub mode: DrawMode,
    pub view: &'a DrawView,
    pub renderer_binder: Option<&'a dyn UniformBinder>,
    pub binder: Option<&'a dyn UniformBinder>,
}

impl DrawRequest<'_> {
    /// Draws `id` and its subtree, composing world transforms on the way down.
    pub fn draw(&self, gfx: &Graphics, id: RenderableId) {
        let parent_transform = self
            .scene
            .get(id)
            .and_then(|node| node.parent())
            .and_then(|parent| self.scene.transform_mat4(parent))
            .unwrap_or_else(Matrix4::identity);

        self.draw_tree(gfx, id, &parent_transform);
        gfx.bind_vertex_array(None);
    }

    #[profiling::function]
    fn draw_tree(&self, gfx: &Graphics, id: RenderableId, parent_transform: &Matrix4<f32>) {
        let Some(node) = self.scene.get(id) else {
            return;
        };
        if !node.is_visible {
            return;
        }

        let model = parent_transform * node.local_transform_mat4();
        if !node.is_group {
            self.draw_node(gfx, node, &model);
        }

        for child in node.children() {
            self.draw_tree(gfx, *child, &model);
        }
    }

    fn draw_node(&self, gfx: &Graphics, node: &Renderable, model: &Matrix4<f32>) {
        let Some(core) = &node.core else {
            return;
        };
        let core = core.borrow();
        if !core.is_drawable() {
            return;
        }

        let Some(shader) = self.shader.or(core.shader.as_deref()) else {
            trace!("Skipping renderable without a shader");
            return;
        };

        gfx.use_program(Some(shader.program()));
        core.bind_attributes(gfx, shader);

        let view = self.view;
        let model_view = view.view * model;
        let mvp = view.projection * model_view;
        shader.set_mat4(gfx, names::MVP_MATRIX, &mvp);
        shader.set_mat4(gfx, names::MV_MATRIX, &model_view);
        shader.set_mat4(gfx, names::M_MATRIX, model);
        shader.set_mat4(gfx, names::V_MATRIX, &view.view);
        shader.set_vec3(gfx, names::CAMERA_WORLD_POSITION, &view.camera_position);

        let mut units = TextureUnits::new();
        core.material.bind(gfx, shader, &mut units);

        if let Some(skeleton) = &core.skeleton {
            shader.set_mat4_array(gfx, names::BONES, &skeleton.pose_matrices());
        }

        if let Some(binder) = self.renderer_binder {
            binder.bind(gfx, shader, &mut units);
        }
        if let Some(binder) = self.binder {
            binder.bind(gfx, shader, &mut units);
        }

        gfx.draw_elements(self.mode, core.element_count, 0);
    }
}
