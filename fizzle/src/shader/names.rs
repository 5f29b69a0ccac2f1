//! Well-known uniform and attribute names.
//!
//! A shader only has to declare the names it actually uses. Anything it
//! leaves out is skipped when binding.

pub const MVP_MATRIX: &str = "MVP_MATRIX";
pub const MV_MATRIX: &str = "MV_MATRIX";
pub const M_MATRIX: &str = "M_MATRIX";
pub const V_MATRIX: &str = "V_MATRIX";
pub const CAMERA_WORLD_POSITION: &str = "CAMERA_WORLD_POSITION";

pub const MATERIAL_DIFFUSE: &str = "MATERIAL_DIFFUSE";
pub const MATERIAL_SPECULAR: &str = "MATERIAL_SPECULAR";
pub const MATERIAL_SHININESS: &str = "MATERIAL_SHININESS";
pub const MATERIAL_TEX_DIFFUSE: &str = "MATERIAL_TEX_DIFFUSE";
pub const MATERIAL_TEX_NORMALS: &str = "MATERIAL_TEX_NORMALS";
pub const MATERIAL_TEX_SPECULAR: &str = "MATERIAL_TEX_SPECULAR";
pub const MATERIAL_TEX: [&str; 4] = [
    "MATERIAL_TEX_0",
    "MATERIAL_TEX_1",
    "MATERIAL_TEX_2",
    "MATERIAL_TEX_3",
];

pub const BONES: &str = "BONES";

pub const VERTEX_POSITION: &str = "VERTEX_POSITION";
pub const VERTEX_NORMAL: &str = "VERTEX_NORMAL";
pub const VERTEX_UV_0: &str = "VERTEX_UV_0";
pub const VERTEX_TANGENT: &str = "VERTEX_TANGENT";
pub const VERTEX_BONE_IDS: &str = "VERTEX_BONE_IDS";
pub const VERTEX_BONE_WEIGHTS: &str = "VERTEX_BONE_WEIGHTS";

pub const LIGHT_POSITION: &str = "LIGHT_POSITION";
pub const LIGHT_DIRECTION: &str = "LIGHT_DIRECTION";
pub const LIGHT_DIFFUSE: &str = "LIGHT_DIFFUSE";
pub const LIGHT_DIFFUSE_INTENSITY: &str = "LIGHT_DIFFUSE_INTENSITY";
pub const LIGHT_SPECULAR_INTENSITY: &str = "LIGHT_SPECULAR_INTENSITY";
pub const LIGHT_AMBIENT_INTENSITY: &str = "LIGHT_AMBIENT_INTENSITY";
pub const LIGHT_CONST_ATTENUATION: &str = "LIGHT_CONST_ATTENUATION";
pub const LIGHT_LINEAR_ATTENUATION: &str = "LIGHT_LINEAR_ATTENUATION";
pub const LIGHT_QUADRATIC_ATTENUATION: &str = "LIGHT_QUADRATIC_ATTENUATION";
pub const LIGHT_STRENGTH: &str = "LIGHT_STRENGTH";
pub const LIGHT_COUNT: &str = "LIGHT_COUNT";

pub const SHADOW_MATRIX: &str = "SHADOW_MATRIX";
pub const SHADOW_MAPS: &str = "SHADOW_MAPS";
pub const SHADOW_COUNT: &str = "SHADOW_COUNT";

pub const DIFFUSE_TEX: &str = "DIFFUSE_TEX";
pub const POSITIONS_TEX: &str = "POSITIONS_TEX";
pub const NORMALS_TEX: &str = "NORMALS_TEX";

/// `NAME[i]`, the form array elements are looked up by.
pub fn indexed(name: &str, index: usize) -> String {
    format!("{name}[{index}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_names_use_array_syntax() {
        assert_eq!(indexed(LIGHT_POSITION, 2), "LIGHT_POSITION[2]");
        assert_eq!(indexed(SHADOW_MAPS, 0), "SHADOW_MAPS[0]");
    }
}
