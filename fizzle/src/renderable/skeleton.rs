use crate::renderable::MeshError;
use nalgebra::Matrix4;
use tracing::warn;

/// Largest number of skinning matrices a shader's `BONES` array holds.
pub const MAX_BONES: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    /// Index of the parent bone. Parents always come before their children.
    pub parent: Option<usize>,
    /// Inverse bind matrix, mesh space into bone space.
    pub offset: Matrix4<f32>,
    /// Current local transform relative to the parent bone.
    pub pose: Matrix4<f32>,
}

impl Bone {
    pub fn new(name: impl Into<String>, parent: Option<usize>, offset: Matrix4<f32>) -> Self {
        Self {
            name: name.into(),
            parent,
            offset,
            pose: Matrix4::identity(),
        }
    }
}

/// Bone hierarchy of a skinned mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    bones: Vec<Bone>,
}

impl Skeleton {
    pub fn new(bones: Vec<Bone>) -> Result<Self, MeshError> {
        for (index, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent
                && parent >= index
            {
                return Err(MeshError::BoneOrder { index, parent });
            }
        }

        if bones.len() > MAX_BONES {
            warn!(
                "Skeleton has {} bones, only the first {MAX_BONES} will be skinned",
                bones.len()
            );
        }

        Ok(Self { bones })
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|bone| bone.name == name)
    }

    pub fn set_pose(&mut self, index: usize, pose: Matrix4<f32>) -> bool {
        match self.bones.get_mut(index) {
            Some(bone) => {
                bone.pose = pose;
                true
            }
            None => false,
        }
    }

    pub fn reset_pose(&mut self) {
        for bone in &mut self.bones {
            bone.pose = Matrix4::identity();
        }
    }

    /// Skinning matrices (`global pose × offset`) for at most [`MAX_BONES`] bones.
    pub fn pose_matrices(&self) -> Vec<Matrix4<f32>> {
        let count = self.bones.len().min(MAX_BONES);
        let mut globals: Vec<Matrix4<f32>> = Vec::with_capacity(count);

        for bone in &self.bones[..count] {
            let global = match bone.parent {
                Some(parent) => globals[parent] * bone.pose,
                None => bone.pose,
            };
            globals.push(global);
        }

        globals
            .iter()
            .zip(&self.bones)
            .map(|(global, bone)| global * bone.offset)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn parents_must_come_first() {
        let bones = vec![
            Bone::new("child", Some(1), Matrix4::identity()),
            Bone::new("root", None, Matrix4::identity()),
        ];
        assert!(matches!(
            Skeleton::new(bones),
            Err(MeshError::BoneOrder {
                index: 0,
                parent: 1
            })
        ));
    }

    #[test]
    fn child_pose_inherits_parent() {
        let mut skeleton = Skeleton::new(vec![
            Bone::new("root", None, Matrix4::identity()),
            Bone::new("arm", Some(0), Matrix4::identity()),
        ])
        .unwrap();

        skeleton.set_pose(0, Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0)));
        skeleton.set_pose(1, Matrix4::new_translation(&Vector3::new(0.0, 2.0, 0.0)));

        let matrices = skeleton.pose_matrices();
        assert_eq!(matrices.len(), 2);
        assert_eq!(
            matrices[1].column(3).xyz(),
            Vector3::new(1.0, 2.0, 0.0)
        );
    }

    #[test]
    fn skinning_matrices_are_capped() {
        let bones = (0..MAX_BONES + 4)
            .map(|i| Bone::new(format!("b{i}"), None, Matrix4::identity()))
            .collect();
        let skeleton = Skeleton::new(bones).unwrap();
        assert_eq!(skeleton.pose_matrices().len(), MAX_BONES);
    }
}
