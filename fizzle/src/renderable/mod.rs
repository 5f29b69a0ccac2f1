//! Scene graph nodes and their shareable GPU payload.

mod core;
mod mesh_data;
mod scene;
mod skeleton;

pub use self::core::{AttributeBuffer, RenderableCore};
pub use mesh_data::MeshData;
pub use scene::{RenderableId, Scene, SceneError};
pub use skeleton::{Bone, MAX_BONES, Skeleton};

use crate::graphics::{Graphics, GraphicsError};
use fizzle_utils::BoundingRect;
use nalgebra::{Matrix4, UnitQuaternion, Vector3};
use snafu::Snafu;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)))]
pub enum MeshError {
    #[snafu(display("Mesh has no vertices or no indices"))]
    Empty,

    #[snafu(display("Mesh has {actual} {attribute} for {expected} vertices"))]
    AttributeLength {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },

    #[snafu(display("Cannot upload into a destroyed core"))]
    Destroyed,

    #[snafu(display("Mesh has a non-finite value in its {attribute}"))]
    NonFinite { attribute: &'static str },

    #[snafu(display("Index {index} is out of range for {vertices} vertices"))]
    IndexOutOfRange { index: u32, vertices: usize },

    #[snafu(display("Bone #{index} references parent #{parent} which does not precede it"))]
    BoneOrder { index: usize, parent: usize },

    #[snafu(transparent)]
    Graphics { source: GraphicsError },
}

pub type SharedCore = Rc<RefCell<RenderableCore>>;

/// One node of the scene graph.
///
/// Transform state belongs to the node. The core holds the GPU data and may
/// be shared by many nodes, so editing the core's shader or material shows
/// up on every node that shares it.
#[derive(Debug, Clone)]
pub struct Renderable {
    pub location: Vector3<f32>,
    pub scale: Vector3<f32>,
    /// World rotation, applied after translation.
    pub rotation: UnitQuaternion<f32>,
    /// Rotation about the node's own origin, applied before translation.
    pub local_rotation: UnitQuaternion<f32>,

    pub is_visible: bool,
    /// Groups have no geometry of their own and only draw their children.
    pub is_group: bool,

    /// Unscaled, unrotated bounds of the source vertices.
    pub bounding_rect: BoundingRect,
    pub face_count: u32,

    pub core: Option<SharedCore>,

    pub(crate) parent: Option<RenderableId>,
    pub(crate) children: Vec<RenderableId>,
}

impl Renderable {
    /// A visible node with identity transform and a fresh, empty core.
    pub fn new(gfx: &Graphics) -> Result<Self, GraphicsError> {
        let core = RenderableCore::new(gfx)?;
        Ok(Self::with_core(Rc::new(RefCell::new(core))))
    }

    pub fn with_core(core: SharedCore) -> Self {
        Self {
            is_group: false,
            core: Some(core),
            ..Self::new_group()
        }
    }

    /// A core-less container node.
    pub fn new_group() -> Self {
        Self {
            location: Vector3::zeros(),
            scale: Vector3::repeat(1.0),
            rotation: UnitQuaternion::identity(),
            local_rotation: UnitQuaternion::identity(),
            is_visible: true,
            is_group: true,
            bounding_rect: BoundingRect::empty(),
            face_count: 0,
            core: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Creates a node and uploads `mesh` into its core.
    pub fn from_mesh(gfx: &Graphics, mesh: &MeshData) -> Result<Self, MeshError> {
        let mut renderable = Self::new(gfx)?;
        if let Some(core) = &renderable.core {
            let result = mesh.upload(gfx, &mut core.borrow_mut());
            if let Err(err) = result {
                core.borrow_mut().destroy(gfx);
                return Err(err);
            }
        }
        renderable.bounding_rect = mesh.bounding_rect();
        renderable.face_count = mesh.face_count();
        Ok(renderable)
    }

    pub fn parent(&self) -> Option<RenderableId> {
        self.parent
    }

    pub fn children(&self) -> &[RenderableId] {
        &self.children
    }

    /// `rotation × translation × local rotation × scale`
    pub fn local_transform_mat4(&self) -> Matrix4<f32> {
        self.rotation.to_homogeneous()
            * Matrix4::new_translation(&self.location)
            * self.local_rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    /// Releases the core's GPU objects right away, regardless of who else
    /// holds it. Other holders keep an empty core that no longer draws.
    pub fn destroy_core(&mut self, gfx: &Graphics) {
        if let Some(core) = self.core.take() {
            core.borrow_mut().destroy(gfx);
        }
    }

    pub fn shares_core_with(&self, other: &Renderable) -> bool {
        match (&self.core, &other.core) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
