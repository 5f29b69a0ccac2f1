use crate::graphics::{Graphics, GraphicsError, Texture, TextureFilter, TextureFormat};
use crate::renderer::LightKind;
use crate::texture::{TextureDescriptor, create_texture};
use bon::Builder;
use fizzle_utils::FizzleArgs;
use nalgebra::{Matrix4, Orthographic3, Perspective3, Point3, Vector3};
use tracing::trace;

/// Maps clip space `[-1, 1]` into texture space `[0, 1]` on every axis.
pub fn shadow_bias_matrix() -> Matrix4<f32> {
    #[rustfmt::skip]
    let bias = Matrix4::new(
        0.5, 0.0, 0.0, 0.5,
        0.0, 0.5, 0.0, 0.5,
        0.0, 0.0, 0.5, 0.5,
        0.0, 0.0, 0.0, 1.0,
    );
    bias
}

#[derive(Debug, Copy, Clone, Builder)]
pub struct ShadowMapConfig {
    /// Edge length of the square depth texture.
    #[builder(default = FizzleArgs::default_shadow_map_size())]
    pub size: u32,
    #[builder(default = 0.5)]
    pub near: f32,
    #[builder(default = 50.0)]
    pub far: f32,
    /// Vertical field of view of point light shadows, in radians.
    #[builder(default = std::f32::consts::FRAC_PI_2)]
    pub fov: f32,
    /// Half extent of the orthographic box of directional light shadows.
    #[builder(default = 20.0)]
    pub ortho_extent: f32,
    /// Where point light shadows look.
    #[builder(default = -Vector3::z())]
    pub direction: Vector3<f32>,
    #[builder(default = Vector3::y())]
    pub up: Vector3<f32>,
}

impl Default for ShadowMapConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Depth texture a light renders the scene into, plus the matrices of the
/// last frame it was rendered from.
#[derive(Debug)]
pub struct ShadowMap {
    pub texture: Texture,
    pub config: ShadowMapConfig,

    projection: Matrix4<f32>,
    view: Matrix4<f32>,
    view_projection: Matrix4<f32>,
    bias_view_projection: Matrix4<f32>,
}

impl ShadowMap {
    pub fn new(gfx: &Graphics, config: &ShadowMapConfig) -> Result<Self, GraphicsError> {
        let desc = TextureDescriptor::builder()
            .format(TextureFormat::Depth32F)
            .width(config.size)
            .height(config.size)
            .filter(TextureFilter::Linear)
            .compare(true)
            .build();
        let texture = create_texture(gfx, &desc, None)?;
        gfx.bind_texture(None);
        trace!("Allocated {0}x{0} shadow map #{1}", config.size, texture.id());

        Ok(Self {
            texture,
            config: *config,
            projection: Matrix4::identity(),
            view: Matrix4::identity(),
            view_projection: Matrix4::identity(),
            bias_view_projection: shadow_bias_matrix(),
        })
    }

    pub fn size(&self) -> u32 {
        self.config.size
    }

    pub fn projection(&self) -> &Matrix4<f32> {
        &self.projection
    }

    pub fn view(&self) -> &Matrix4<f32> {
        &self.view
    }

    pub fn view_projection(&self) -> &Matrix4<f32> {
        &self.view_projection
    }

    /// `bias × projection × view`, the `SHADOW_MATRIX` handed to shaders.
    pub fn bias_matrix(&self) -> &Matrix4<f32> {
        &self.bias_view_projection
    }

    /// Recomputes every matrix from where the light currently is.
    ///
    /// Point lights get a perspective frustum looking along the configured
    /// direction, directional lights an orthographic box along theirs.
    pub fn update_matrices(&mut self, position: &Vector3<f32>, kind: &LightKind) {
        let config = &self.config;
        let (direction, projection) = match kind {
            LightKind::Point { .. } => (
                config.direction,
                Perspective3::new(1.0, config.fov, config.near, config.far).to_homogeneous(),
            ),
            LightKind::Directional { direction } => {
                let e = config.ortho_extent;
                let direction = if *direction == Vector3::zeros() {
                    config.direction
                } else {
                    *direction
                };
                (
                    direction,
                    Orthographic3::new(-e, e, -e, e, config.near, config.far).to_homogeneous(),
                )
            }
        };

        let direction = direction
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| -Vector3::z());
        let up = if direction.cross(&config.up).norm_squared() < 1.0e-6 {
            if direction.x.abs() < 0.9 {
                Vector3::x()
            } else {
                Vector3::z()
            }
        } else {
            config.up
        };

        let eye = Point3::from(*position);
        self.view = Matrix4::look_at_rh(&eye, &(eye + direction), &up);
        self.projection = projection;
        self.view_projection = self.projection * self.view;
        self.bias_view_projection = shadow_bias_matrix() * self.view_projection;
    }

    pub fn destroy(self, gfx: &Graphics) {
        gfx.delete_texture(self.texture);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector4;

    #[test]
    fn bias_maps_clip_corners_to_texture_space() {
        let bias = shadow_bias_matrix();

        let low = bias * Vector4::new(-1.0, -1.0, -1.0, 1.0);
        let high = bias * Vector4::new(1.0, 1.0, 1.0, 1.0);
        let mid = bias * Vector4::new(0.0, 0.0, 0.0, 1.0);

        assert_eq!(low, Vector4::new(0.0, 0.0, 0.0, 1.0));
        assert_eq!(high, Vector4::new(1.0, 1.0, 1.0, 1.0));
        assert_eq!(mid, Vector4::new(0.5, 0.5, 0.5, 1.0));
    }

    #[test]
    fn straight_down_light_still_has_a_view() {
        let config = ShadowMapConfig::builder().size(16).build();
        let mut map = ShadowMap {
            texture: Texture(std::num::NonZeroU32::MIN),
            config,
            projection: Matrix4::identity(),
            view: Matrix4::identity(),
            view_projection: Matrix4::identity(),
            bias_view_projection: Matrix4::identity(),
        };

        map.update_matrices(
            &Vector3::new(0.0, 10.0, 0.0),
            &LightKind::Directional {
                direction: Vector3::new(0.0, -1.0, 0.0),
            },
        );

        assert!(map.view().iter().all(|v| v.is_finite()));
        // the point right below the light ends up in the middle of the map
        let below = map.bias_matrix() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!((below.x - 0.5).abs() < 1.0e-5);
        assert!((below.y - 0.5).abs() < 1.0e-5);
    }
}
