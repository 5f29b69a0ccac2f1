use crate::graphics::{Graphics, Texture, mat4_to_array};
use crate::shader::ShaderProgram;
use nalgebra::{Matrix4, Vector3, Vector4};

/// Running count of texture units consumed by one draw call.
///
/// Every binder in a chain allocates from the same counter so they never
/// bind two samplers to the same unit.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct TextureUnits(u32);

impl TextureUnits {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn used(&self) -> u32 {
        self.0
    }

    /// Binds `texture` to the next free unit and points the sampler `name` at
    /// it. Returns the unit, or `None` if the shader has no such sampler, in
    /// which case no unit is consumed.
    pub fn bind(
        &mut self,
        gfx: &Graphics,
        shader: &ShaderProgram,
        name: &str,
        texture: Texture,
    ) -> Option<u32> {
        let location = shader.uniform_location(gfx, name)?;
        let unit = self.0;

        gfx.active_texture(unit);
        gfx.bind_texture(Some(texture));
        gfx.uniform_i32(location, unit as i32);

        self.0 += 1;
        Some(unit)
    }
}

/// A step in the per-draw uniform binding chain.
///
/// The renderer runs its own binder first and a caller supplied one after
/// it, threading the same [`TextureUnits`] through both.
pub trait UniformBinder {
    fn bind(&self, gfx: &Graphics, shader: &ShaderProgram, units: &mut TextureUnits);
}

impl<F> UniformBinder for F
where
    F: Fn(&Graphics, &ShaderProgram, &mut TextureUnits),
{
    fn bind(&self, gfx: &Graphics, shader: &ShaderProgram, units: &mut TextureUnits) {
        self(gfx, shader, units)
    }
}

// Uniform setters that silently skip names the shader doesn't declare.
// Each returns whether the value was uploaded.
impl ShaderProgram {
    pub fn set_i32(&self, gfx: &Graphics, name: &str, value: i32) -> bool {
        self.uniform_location(gfx, name)
            .map(|location| gfx.uniform_i32(location, value))
            .is_some()
    }

    pub fn set_f32(&self, gfx: &Graphics, name: &str, value: f32) -> bool {
        self.uniform_location(gfx, name)
            .map(|location| gfx.uniform_f32(location, value))
            .is_some()
    }

    pub fn set_vec3(&self, gfx: &Graphics, name: &str, value: &Vector3<f32>) -> bool {
        self.uniform_location(gfx, name)
            .map(|location| gfx.uniform_vec3(location, [value.x, value.y, value.z]))
            .is_some()
    }

    pub fn set_vec4(&self, gfx: &Graphics, name: &str, value: &Vector4<f32>) -> bool {
        self.uniform_location(gfx, name)
            .map(|location| gfx.uniform_vec4(location, [value.x, value.y, value.z, value.w]))
            .is_some()
    }

    pub fn set_mat4(&self, gfx: &Graphics, name: &str, value: &Matrix4<f32>) -> bool {
        self.uniform_location(gfx, name)
            .map(|location| gfx.uniform_mat4(location, &mat4_to_array(value)))
            .is_some()
    }

    pub fn set_mat4_array(&self, gfx: &Graphics, name: &str, values: &[Matrix4<f32>]) -> bool {
        let Some(location) = self.uniform_location(gfx, name) else {
            return false;
        };
        let flat: Vec<[f32; 16]> = values.iter().map(mat4_to_array).collect();
        gfx.uniform_mat4_array(location, &flat);
        true
    }
}
