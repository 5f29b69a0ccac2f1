use crate::binding::{TextureUnits, UniformBinder};
use crate::graphics::{Graphics, Texture};
use crate::shader::{ShaderProgram, names};
use nalgebra::Vector4;

pub const MAX_CUSTOM_TEXTURES: usize = 4;

/// Surface parameters of a renderable core.
///
/// Textures are only referenced here. Their lifetime belongs to whoever
/// created them, usually a [`TextureManager`](crate::texture::TextureManager).
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub diffuse_color: Vector4<f32>,
    pub specular_color: Vector4<f32>,
    pub shininess: f32,

    pub diffuse_tex: Option<Texture>,
    pub normals_tex: Option<Texture>,
    pub specular_tex: Option<Texture>,
    pub custom_tex: [Option<Texture>; MAX_CUSTOM_TEXTURES],
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse_color: Vector4::new(1.0, 1.0, 1.0, 1.0),
            specular_color: Vector4::new(1.0, 1.0, 1.0, 1.0),
            shininess: 0.01,
            diffuse_tex: None,
            normals_tex: None,
            specular_tex: None,
            custom_tex: [None; MAX_CUSTOM_TEXTURES],
        }
    }
}

impl Material {
    pub fn with_diffuse(diffuse_color: Vector4<f32>) -> Self {
        Self {
            diffuse_color,
            ..Self::default()
        }
    }
}

impl UniformBinder for Material {
    fn bind(&self, gfx: &Graphics, shader: &ShaderProgram, units: &mut TextureUnits) {
        shader.set_vec4(gfx, names::MATERIAL_DIFFUSE, &self.diffuse_color);
        shader.set_vec4(gfx, names::MATERIAL_SPECULAR, &self.specular_color);
        shader.set_f32(gfx, names::MATERIAL_SHININESS, self.shininess);

        let textures = [
            (names::MATERIAL_TEX_DIFFUSE, self.diffuse_tex),
            (names::MATERIAL_TEX_NORMALS, self.normals_tex),
            (names::MATERIAL_TEX_SPECULAR, self.specular_tex),
        ]
        .into_iter()
        .chain(names::MATERIAL_TEX.into_iter().zip(self.custom_tex));

        for (name, texture) in textures {
            if let Some(texture) = texture {
                units.bind(gfx, shader, name, texture);
            }
        }
    }
}
