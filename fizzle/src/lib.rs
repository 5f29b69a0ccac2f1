//! Scene graph renderables with a forward and a deferred renderer, drawn
//! through a swappable [`GraphicsProvider`] backend.

pub mod binding;
pub mod camera;
pub mod graphics;
pub mod material;
pub mod math;
pub mod meshes;
pub mod renderable;
pub mod renderer;
pub mod shader;
pub mod surface;
pub mod texture;

pub use binding::{TextureUnits, UniformBinder};
pub use camera::{Camera, OrbitCamera, YawPitchCamera};
pub use graphics::{Graphics, GraphicsError, GraphicsProvider, HeadlessGraphics};
pub use material::Material;
pub use renderable::{MeshData, MeshError, Renderable, RenderableCore, RenderableId, Scene};
pub use renderer::deferred::{DeferredFrameHandler, DeferredRenderer, GBuffer};
pub use renderer::forward::{ForwardRenderer, ShadowMap, ShadowMapConfig};
pub use renderer::{DrawView, Light, LightKind, RenderError, Renderer, ScreenSizeListener};
pub use shader::{ShaderError, ShaderProgram};
pub use surface::RenderSurface;
pub use texture::{TextureError, TextureManager};

pub use ::fizzle_utils::{BoundingRect, FizzleArgs};
pub use ::tracing;

#[cfg(feature = "gl")]
pub use ::glow;
