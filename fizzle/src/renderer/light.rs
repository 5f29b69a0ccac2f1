use crate::graphics::{Graphics, GraphicsError};
use crate::renderer::forward::{ShadowMap, ShadowMapConfig};
use crate::shader::{ShaderProgram, names};
use nalgebra::{Vector3, Vector4};
use tracing::warn;

/// Distance falloff of a point light: `1 / (constant + linear·d + quadratic·d²)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LightKind {
    Point { attenuation: Attenuation },
    Directional { direction: Vector3<f32> },
}

/// A light source.
///
/// Shaders tell point and directional lights apart by whether
/// `LIGHT_DIRECTION` is the zero vector, so the kind is only flattened into
/// that layout when the uniforms are written.
#[derive(Debug)]
pub struct Light {
    /// World position. Directional lights use it as the shadow eye.
    pub position: Vector3<f32>,
    pub kind: LightKind,
    pub diffuse_color: Vector4<f32>,
    pub diffuse_intensity: f32,
    pub specular_intensity: f32,
    pub ambient_intensity: f32,
    pub strength: f32,
    pub shadow_map: Option<ShadowMap>,
}

impl Light {
    pub fn point(position: Vector3<f32>) -> Self {
        Self::with_kind(
            position,
            LightKind::Point {
                attenuation: Attenuation::default(),
            },
        )
    }

    pub fn directional(direction: Vector3<f32>) -> Self {
        if direction == Vector3::zeros() {
            warn!("Directional light without a direction will be shaded as a point light");
        }
        Self::with_kind(Vector3::zeros(), LightKind::Directional { direction })
    }

    fn with_kind(position: Vector3<f32>, kind: LightKind) -> Self {
        Self {
            position,
            kind,
            diffuse_color: Vector4::new(1.0, 1.0, 1.0, 1.0),
            diffuse_intensity: 1.0,
            specular_intensity: 1.0,
            ambient_intensity: 0.0,
            strength: 1.0,
            shadow_map: None,
        }
    }

    pub fn is_directional(&self) -> bool {
        matches!(self.kind, LightKind::Directional { .. })
    }

    /// Direction as the shaders see it: zero for point lights.
    pub fn direction(&self) -> Vector3<f32> {
        match self.kind {
            LightKind::Point { .. } => Vector3::zeros(),
            LightKind::Directional { direction } => direction,
        }
    }

    /// Attenuation as the shaders see it: none for directional lights.
    pub fn attenuation(&self) -> Attenuation {
        match self.kind {
            LightKind::Point { attenuation } => attenuation,
            LightKind::Directional { .. } => Attenuation::default(),
        }
    }

    /// Gives the light its own depth texture, replacing any previous one.
    pub fn create_shadow_map(
        &mut self,
        gfx: &Graphics,
        config: &ShadowMapConfig,
    ) -> Result<(), GraphicsError> {
        let shadow_map = ShadowMap::new(gfx, config)?;
        if let Some(old) = self.shadow_map.replace(shadow_map) {
            old.destroy(gfx);
        }
        Ok(())
    }

    pub fn destroy_shadow_map(&mut self, gfx: &Graphics) {
        if let Some(shadow_map) = self.shadow_map.take() {
            shadow_map.destroy(gfx);
        }
    }

    /// Writes the light parameters either into slot `index` of the light
    /// uniform arrays or, with `None`, into the plain names.
    pub(crate) fn bind_uniforms(&self, gfx: &Graphics, shader: &ShaderProgram, index: Option<usize>) {
        let name = |base: &str| match index {
            Some(i) => names::indexed(base, i),
            None => base.to_string(),
        };
        let attenuation = self.attenuation();

        shader.set_vec3(gfx, &name(names::LIGHT_POSITION), &self.position);
        shader.set_vec3(gfx, &name(names::LIGHT_DIRECTION), &self.direction());
        shader.set_vec4(gfx, &name(names::LIGHT_DIFFUSE), &self.diffuse_color);
        shader.set_f32(gfx, &name(names::LIGHT_DIFFUSE_INTENSITY), self.diffuse_intensity);
        shader.set_f32(gfx, &name(names::LIGHT_SPECULAR_INTENSITY), self.specular_intensity);
        shader.set_f32(gfx, &name(names::LIGHT_AMBIENT_INTENSITY), self.ambient_intensity);
        shader.set_f32(gfx, &name(names::LIGHT_CONST_ATTENUATION), attenuation.constant);
        shader.set_f32(gfx, &name(names::LIGHT_LINEAR_ATTENUATION), attenuation.linear);
        shader.set_f32(gfx, &name(names::LIGHT_QUADRATIC_ATTENUATION), attenuation.quadratic);
        shader.set_f32(gfx, &name(names::LIGHT_STRENGTH), self.strength);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::{GraphicsProvider, HeadlessGraphics, UniformValue};

    const VS: &str = "void main() {}";
    const FS: &str = "uniform vec3 LIGHT_DIRECTION[4];
        uniform float LIGHT_CONST_ATTENUATION[4];
        uniform vec3 LIGHT_POSITION;
        void main() {}";

    #[test]
    fn point_lights_write_a_zero_direction() {
        let gfx = HeadlessGraphics::new();
        let shader = ShaderProgram::from_sources(&gfx, "lights", VS, FS).unwrap();
        gfx.use_program(Some(shader.program()));

        let mut point = Light::point(Vector3::new(1.0, 2.0, 3.0));
        point.kind = LightKind::Point {
            attenuation: Attenuation {
                constant: 2.0,
                ..Attenuation::default()
            },
        };
        let sun = Light::directional(Vector3::new(0.0, -1.0, 0.0));

        point.bind_uniforms(&gfx, &shader, Some(0));
        sun.bind_uniforms(&gfx, &shader, Some(1));

        assert_eq!(
            gfx.uniform(shader.program(), "LIGHT_DIRECTION[0]"),
            Some(UniformValue::Vec3([0.0, 0.0, 0.0]))
        );
        assert_eq!(
            gfx.uniform(shader.program(), "LIGHT_DIRECTION[1]"),
            Some(UniformValue::Vec3([0.0, -1.0, 0.0]))
        );
        assert_eq!(
            gfx.uniform(shader.program(), "LIGHT_CONST_ATTENUATION[0]"),
            Some(UniformValue::F32(2.0))
        );
        assert_eq!(
            gfx.uniform(shader.program(), "LIGHT_CONST_ATTENUATION[1]"),
            Some(UniformValue::F32(1.0))
        );
    }

    #[test]
    fn plain_names_without_index() {
        let gfx = HeadlessGraphics::new();
        let shader = ShaderProgram::from_sources(&gfx, "lights", VS, FS).unwrap();
        gfx.use_program(Some(shader.program()));

        Light::point(Vector3::new(4.0, 5.0, 6.0)).bind_uniforms(&gfx, &shader, None);
        assert_eq!(
            gfx.uniform(shader.program(), "LIGHT_POSITION"),
            Some(UniformValue::Vec3([4.0, 5.0, 6.0]))
        );
    }
}
