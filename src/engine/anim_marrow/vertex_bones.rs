use bitcode::{Decode, Encode};
use nab_marrow::debug_panic;
use crate::BoneIndex;

pub const MAX_BONE_INFLUENCES: usize = 4;

/// Up to four bone influences for one vertex. Unused slots are (0, 0.0).
/// Weights are kept as authored; they aren't guaranteed to sum to 1
#[derive(Debug, Default, Clone, Copy, PartialEq, Encode, Decode)]
#[repr(C)]
pub struct VertexBoneBinding
{
    pub bone_ids: [u32; MAX_BONE_INFLUENCES],
    pub weights: [f32; MAX_BONE_INFLUENCES],
}
impl VertexBoneBinding
{
    /// Write into the first slot without weight. Returns false (and drops the influence) if all slots are taken
    pub fn add(&mut self, bone: BoneIndex, weight: f32) -> bool
    {
        match self.weights.iter().position(|w| *w == 0.0)
        {
            Some(slot) =>
            {
                self.bone_ids[slot] = bone.0;
                self.weights[slot] = weight;
                true
            }
            None => false,
        }
    }

    pub fn influences(&self) -> impl Iterator<Item = (BoneIndex, f32)> + '_
    {
        self.bone_ids.iter().zip(self.weights.iter())
            .filter(|(_, w)| **w != 0.0)
            .map(|(b, w)| (BoneIndex(*b), *w))
    }

    #[inline] #[must_use]
    pub fn total_weight(&self) -> f32 { self.weights.iter().sum() }
}

/// Per-vertex bone bindings for every mesh of a model, vertex ids global across meshes
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VertexBindings
{
    bindings: Vec<VertexBoneBinding>,
    dropped_influences: usize,
}
impl VertexBindings
{
    /// Grow to hold `count` more vertices, returning the global id of the first new one
    pub fn append_vertices(&mut self, count: u32) -> u32
    {
        let base = self.bindings.len() as u32;
        self.bindings.resize(self.bindings.len() + count as usize, VertexBoneBinding::default());
        base
    }

    pub fn bind_weight(&mut self, vertex: u32, bone: BoneIndex, weight: f32)
    {
        let Some(binding) = self.bindings.get_mut(vertex as usize)
        else
        {
            debug_panic!("Vertex {} is out of bounds ({} vertices)", vertex, self.bindings.len());
            log::warn!("Ignoring bone {bone} weight for out of bounds vertex {vertex}");
            return;
        };

        if !binding.add(bone, weight)
        {
            self.dropped_influences += 1;
        }
    }

    #[inline] #[must_use] pub fn get(&self, vertex: u32) -> Option<&VertexBoneBinding> { self.bindings.get(vertex as usize) }
    #[inline] #[must_use] pub fn as_slice(&self) -> &[VertexBoneBinding] { &self.bindings }
    #[inline] #[must_use] pub fn len(&self) -> usize { self.bindings.len() }
    #[inline] #[must_use] pub fn is_empty(&self) -> bool { self.bindings.is_empty() }
    /// Influences past the fourth non-zero one on a vertex
    #[inline] #[must_use] pub fn dropped_influences(&self) -> usize { self.dropped_influences }
}
impl From<Vec<VertexBoneBinding>> for VertexBindings
{
    fn from(bindings: Vec<VertexBoneBinding>) -> Self { Self { bindings, dropped_influences: 0 } }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn first_four_win()
    {
        let mut bindings = VertexBindings::default();
        assert_eq!(bindings.append_vertices(1), 0);

        for (bone, weight) in [(3, 0.4), (1, 0.3), (7, 0.2), (2, 0.1), (9, 0.5)]
        {
            bindings.bind_weight(0, BoneIndex(bone), weight);
        }

        let binding = bindings.get(0).unwrap();
        assert_eq!(binding.bone_ids, [3, 1, 7, 2]);
        assert_eq!(binding.weights, [0.4, 0.3, 0.2, 0.1]);
        assert_eq!(bindings.dropped_influences(), 1);
    }

    #[test]
    fn weights_not_normalized()
    {
        let mut binding = VertexBoneBinding::default();
        assert!(binding.add(BoneIndex(0), 0.25));
        assert!(binding.add(BoneIndex(1), 0.25));
        assert_eq!(binding.total_weight(), 0.5);
        assert_eq!(binding.influences().count(), 2);
        assert_eq!(binding.bone_ids[2..], [0, 0]);
        assert_eq!(binding.weights[2..], [0.0, 0.0]);
    }

    #[test]
    fn zero_weight_slot_is_reused()
    {
        let mut binding = VertexBoneBinding::default();
        assert!(binding.add(BoneIndex(5), 0.0));
        assert!(binding.add(BoneIndex(6), 0.7));
        assert_eq!(binding.bone_ids[0], 6);
        assert_eq!(binding.weights[0], 0.7);
    }

    #[test]
    fn global_vertex_ids()
    {
        let mut bindings = VertexBindings::default();
        assert_eq!(bindings.append_vertices(3), 0);
        assert_eq!(bindings.append_vertices(2), 3);
        assert_eq!(bindings.len(), 5);

        bindings.bind_weight(4, BoneIndex(2), 1.0);
        assert_eq!(bindings.get(4).unwrap().influences().collect::<Vec<_>>(), vec![(BoneIndex(2), 1.0)]);
        assert!(bindings.get(5).is_none());
    }
}
