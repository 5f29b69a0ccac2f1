use crate::graphics::Graphics;
use crate::renderable::Renderable;
use fizzle_utils::BoundingRect;
use nalgebra::Matrix4;
use slotmap::{SlotMap, new_key_type};
use snafu::{Snafu, ensure};
use std::rc::Rc;
use tracing::trace;

new_key_type! {
    pub struct RenderableId;
}

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)))]
pub enum SceneError {
    #[snafu(display("Renderable {id:?} is not part of this scene"))]
    UnknownRenderable { id: RenderableId },

    #[snafu(display("Attaching {child:?} to {parent:?} would create a cycle"))]
    Cycle {
        parent: RenderableId,
        child: RenderableId,
    },
}

/// Arena owning every renderable of a scene graph.
///
/// Children are owned by the arena and referenced by id, the parent link is
/// a plain id as well.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: SlotMap<RenderableId, Renderable>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a renderable as a new root. Any parent or child links it carried
    /// are dropped.
    pub fn insert(&mut self, mut renderable: Renderable) -> RenderableId {
        renderable.parent = None;
        renderable.children.clear();
        self.nodes.insert(renderable)
    }

    pub fn get(&self, id: RenderableId) -> Option<&Renderable> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: RenderableId) -> Option<&mut Renderable> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: RenderableId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> impl Iterator<Item = RenderableId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| id)
    }

    /// Appends `child` to `parent`'s children, detaching it from its previous
    /// parent first.
    pub fn add_child(&mut self, parent: RenderableId, child: RenderableId) -> Result<(), SceneError> {
        ensure!(self.contains(parent), UnknownRenderableErr { id: parent });
        ensure!(self.contains(child), UnknownRenderableErr { id: child });
        ensure!(!self.is_ancestor_or_self(child, parent), CycleErr { parent, child });

        self.detach(child);

        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
        Ok(())
    }

    /// Turns `child` into a root again.
    pub fn detach(&mut self, child: RenderableId) {
        let Some(old_parent) = self.nodes.get_mut(child).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(old_parent) {
            node.children.retain(|id| *id != child);
        }
    }

    fn is_ancestor_or_self(&self, ancestor: RenderableId, mut node: RenderableId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes.get(node).and_then(|n| n.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    /// World transform: the parent's world transform times the node's local
    /// transform. Roots compose with the identity.
    pub fn transform_mat4(&self, id: RenderableId) -> Option<Matrix4<f32>> {
        let node = self.nodes.get(id)?;
        let local = node.local_transform_mat4();
        match node.parent {
            Some(parent) => Some(self.transform_mat4(parent)? * local),
            None => Some(local),
        }
    }

    /// The node's own mesh bounds in world space. Children are not included.
    pub fn world_bounds(&self, id: RenderableId) -> Option<BoundingRect> {
        let node = self.nodes.get(id)?;
        Some(node.bounding_rect.transformed(&self.transform_mat4(id)?))
    }

    /// Copies `id` and its whole subtree as a new root.
    ///
    /// Transform state and children are deep copies. Cores are shared with
    /// the originals.
    pub fn clone_renderable(&mut self, id: RenderableId) -> Option<RenderableId> {
        let source = self.nodes.get(id)?;
        let children = source.children.clone();

        let mut copy = source.clone();
        copy.parent = None;
        copy.children.clear();
        let copy_id = self.nodes.insert(copy);

        for child in children {
            if let Some(child_copy) = self.clone_renderable(child)
                && let Some(node) = self.nodes.get_mut(child_copy)
            {
                node.parent = Some(copy_id);
                if let Some(copy) = self.nodes.get_mut(copy_id) {
                    copy.children.push(child_copy);
                }
            }
        }

        Some(copy_id)
    }

    /// Calls `f` on `id` and then on every descendant, depth first.
    pub fn map<F>(&mut self, id: RenderableId, mut f: F)
    where
        F: FnMut(RenderableId, &mut Renderable),
    {
        self.map_inner(id, &mut f);
    }

    fn map_inner<F>(&mut self, id: RenderableId, f: &mut F)
    where
        F: FnMut(RenderableId, &mut Renderable),
    {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        f(id, node);

        let children = node.children.clone();
        for child in children {
            self.map_inner(child, f);
        }
    }

    /// Ids of `id` and its descendants in pre-order.
    pub fn subtree(&self, id: RenderableId) -> Vec<RenderableId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(node) = self.nodes.get(next) else {
                continue;
            };
            out.push(next);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Removes `id` and its subtree from the scene.
    ///
    /// A core is released on the GPU only when the removed node was its last
    /// holder. Cores still shared with surviving clones stay alive.
    pub fn destroy(&mut self, gfx: &Graphics, id: RenderableId) {
        self.detach(id);

        for node_id in self.subtree(id) {
            let Some(node) = self.nodes.remove(node_id) else {
                continue;
            };
            let Some(core) = node.core else {
                continue;
            };
            match Rc::try_unwrap(core) {
                Ok(core) => {
                    trace!("Releasing core of {node_id:?}");
                    core.into_inner().destroy(gfx);
                }
                Err(_) => trace!("Core of {node_id:?} is still shared"),
            }
        }
    }
}
