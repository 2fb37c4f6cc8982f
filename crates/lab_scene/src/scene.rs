//! Scene graph collaborator
//!
//! The ingestion subsystem only needs to insert and remove root nodes and to
//! query their world transform. [`Scene`] is the in-memory implementation used
//! by the headless viewer and the tests.

use std::collections::BTreeMap;

use glam::Mat4;

use crate::node::SceneNode;

/// Identifier of a root node inserted into a scene graph
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Scene graph operations consumed by the asset manager
pub trait SceneGraph {
    /// Take ownership of `node` and make it visible
    fn insert(&mut self, node: SceneNode) -> NodeId;

    /// Detach and return the node, `None` if the id is unknown
    fn remove(&mut self, id: NodeId) -> Option<SceneNode>;

    fn get(&self, id: NodeId) -> Option<&SceneNode>;

    fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode>;

    /// World transform of a root node
    fn world_transform(&self, id: NodeId) -> Option<Mat4> {
        self.get(id).map(|node| node.transform.to_matrix())
    }
}

/// Flat list of root nodes keyed by id
#[derive(Debug, Default)]
pub struct Scene {
    roots: BTreeMap<NodeId, SceneNode>,
    next_id: u64,
    /// Mutations applied since creation, one per insert or remove
    revision: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.roots.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.roots.keys().copied()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl SceneGraph for Scene {
    fn insert(&mut self, node: SceneNode) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        log::trace!("Scene: insert {:?} '{}'", id, node.name);
        self.roots.insert(id, node);
        self.revision += 1;
        id
    }

    fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        let node = self.roots.remove(&id)?;
        log::trace!("Scene: remove {:?} '{}'", id, node.name);
        self.revision += 1;
        Some(node)
    }

    fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.roots.get(&id)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.roots.get_mut(&id)
    }
}
