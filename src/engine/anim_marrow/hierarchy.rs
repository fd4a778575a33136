use std::ops::Range;
use bitcode::{Decode, Encode};
use glam::Mat4;
use crate::{BoneIndex, BoneRegistry, SourceNode};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct NodeIndex(pub u32);
impl NodeIndex
{
    pub const ROOT: Self = Self(0);

    #[inline] #[must_use] pub const fn index(self) -> usize { self.0 as usize }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyNode
{
    pub name: String,
    pub bind_transform: Mat4, // parent-relative
    pub parent: Option<NodeIndex>,
    pub bone: Option<BoneIndex>,
    pub subtree_end: NodeIndex, // one past this node's last descendant
}

/// The bind-pose node tree, flattened in pre-order: every parent comes before its children
/// and each subtree is a contiguous run of nodes
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonHierarchy
{
    nodes: Box<[HierarchyNode]>,
}
impl SkeletonHierarchy
{
    pub fn from_source(root: &SourceNode, registry: &BoneRegistry) -> Self
    {
        let mut nodes = Vec::with_capacity(root.subtree_len());
        push_subtree(&mut nodes, root, None, registry);
        Self { nodes: nodes.into_boxed_slice() }
    }

    /// Nodes must already be in pre-order with valid parents and subtree ends
    pub(crate) fn from_nodes(nodes: Vec<HierarchyNode>) -> Self
    {
        debug_assert!(nodes.iter().enumerate().all(|(i, n)|
            n.parent.is_none_or(|p| p.index() < i) && n.subtree_end.index() > i && n.subtree_end.index() <= nodes.len()));
        Self { nodes: nodes.into_boxed_slice() }
    }

    #[inline] #[must_use] pub fn nodes(&self) -> &[HierarchyNode] { &self.nodes }
    #[inline] #[must_use] pub fn node(&self, index: NodeIndex) -> Option<&HierarchyNode> { self.nodes.get(index.index()) }
    #[inline] #[must_use] pub fn len(&self) -> usize { self.nodes.len() }
    #[inline] #[must_use] pub fn is_empty(&self) -> bool { self.nodes.is_empty() }
    #[inline] #[must_use] pub fn root(&self) -> Option<&HierarchyNode> { self.nodes.first() }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<NodeIndex>
    {
        self.nodes.iter().position(|n| n.name == name).map(|i| NodeIndex(i as u32))
    }

    /// `index` and all of its descendants
    #[must_use]
    pub fn subtree(&self, index: NodeIndex) -> Range<usize>
    {
        match self.nodes.get(index.index())
        {
            Some(node) => index.index()..node.subtree_end.index(),
            None => 0..0,
        }
    }

    /// Direct children, in authored order
    pub fn children(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_
    {
        let range = self.subtree(index);
        let mut next = range.start + 1;
        std::iter::from_fn(move ||
        {
            if next >= range.end { return None; }
            let child = next;
            next = self.nodes[child].subtree_end.index();
            Some(NodeIndex(child as u32))
        })
    }

    /// Registered bones that no node in the tree drives. Their pose stays at identity
    pub fn unbound_bones(&self, registry: &BoneRegistry) -> Vec<BoneIndex>
    {
        let mut bound = vec![false; registry.len()];
        for bone in self.nodes.iter().filter_map(|n| n.bone)
        {
            bound[bone.index()] = true;
        }
        registry.iter().map(|(i, _)| i).filter(|i| !bound[i.index()]).collect()
    }
}

fn push_subtree(nodes: &mut Vec<HierarchyNode>, source: &SourceNode, parent: Option<NodeIndex>, registry: &BoneRegistry)
{
    let index = NodeIndex(nodes.len() as u32);
    nodes.push(HierarchyNode
    {
        name: source.name.clone(),
        bind_transform: source.transform,
        parent,
        bone: registry.lookup(&source.name),
        subtree_end: index, // patched below
    });

    for child in &source.children
    {
        push_subtree(nodes, child, Some(index), registry);
    }

    nodes[index.index()].subtree_end = NodeIndex(nodes.len() as u32);
}
