use std::fmt::{Display, Formatter};
use bitcode::{Decode, Encode};
use glam::Mat4;
use math_marrow::DualQuat;
use nab_marrow::hashing::MetroHashMap;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct BoneIndex(pub u32);
impl BoneIndex
{
    #[inline] #[must_use] pub const fn index(self) -> usize { self.0 as usize }
}
impl Display for BoneIndex
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Display::fmt(&self.0, f) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bone
{
    pub name: String,
    pub inverse_offset: Mat4,
    pub inverse_offset_dq: DualQuat, // derived from inverse_offset at load, scale is dropped
}
impl Bone
{
    pub fn new(name: impl Into<String>, inverse_offset: Mat4) -> Self
    {
        Self
        {
            name: name.into(),
            inverse_offset,
            inverse_offset_dq: DualQuat::from(&inverse_offset).true_normalized(),
        }
    }
}

/// Load-time bone collection. Indices are handed out in first-seen order
#[derive(Debug, Default)]
pub struct BoneRegistryBuilder
{
    bones: Vec<Bone>,
    lookup: MetroHashMap<String, BoneIndex>,
}
impl BoneRegistryBuilder
{
    pub fn new() -> Self { Self::default() }

    /// Returns the existing index if `name` was registered before (its offset is kept), otherwise allocates the next index
    pub fn register_bone(&mut self, name: &str, inverse_offset: Mat4) -> BoneIndex
    {
        if let Some(existing) = self.lookup.get(name)
        {
            return *existing;
        }

        let index = BoneIndex(self.bones.len() as u32);
        self.bones.push(Bone::new(name, inverse_offset));
        self.lookup.insert(name.to_string(), index);
        index
    }

    #[inline] #[must_use] pub fn lookup(&self, name: &str) -> Option<BoneIndex> { self.lookup.get(name).copied() }
    #[inline] #[must_use] pub fn len(&self) -> usize { self.bones.len() }
    #[inline] #[must_use] pub fn is_empty(&self) -> bool { self.bones.is_empty() }

    pub fn finish(self) -> BoneRegistry
    {
        BoneRegistry
        {
            bones: self.bones.into_boxed_slice(),
            lookup: self.lookup,
        }
    }
}

/// Immutable bone arena plus its name lookup
#[derive(Debug, Clone)]
pub struct BoneRegistry
{
    bones: Box<[Bone]>,
    lookup: MetroHashMap<String, BoneIndex>,
}
impl BoneRegistry
{
    #[inline] #[must_use] pub fn lookup(&self, name: &str) -> Option<BoneIndex> { self.lookup.get(name).copied() }
    #[inline] #[must_use] pub fn bone(&self, index: BoneIndex) -> Option<&Bone> { self.bones.get(index.index()) }
    #[inline] #[must_use] pub fn bones(&self) -> &[Bone] { &self.bones }
    #[inline] #[must_use] pub fn len(&self) -> usize { self.bones.len() }
    #[inline] #[must_use] pub fn is_empty(&self) -> bool { self.bones.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (BoneIndex, &Bone)>
    {
        self.bones.iter().enumerate().map(|(i, b)| (BoneIndex(i as u32), b))
    }
}
