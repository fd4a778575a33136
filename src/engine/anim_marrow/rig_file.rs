use bitcode::{Decode, Encode};
use glam::{Mat4, Quat, Vec3};
use math_marrow::DualQuat;
use nab_marrow::hashing::MetroHashMap;
use crate::{AnimationConfig, BoneChannel, BoneIndex, BoneRegistryBuilder, ClipStore, HierarchyNode, KeyTrack, Keyframe, LoadError, NodeIndex, SkeletonHierarchy, SkinnedRig, VertexBindings, VertexBoneBinding};

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct BoneFile
{
    pub name: String,
    pub inverse_offset: Mat4,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct NodeFile
{
    pub name: String,
    pub bind_transform: Mat4,
    pub parent: Option<u32>,
    pub bone: Option<u32>,
    pub subtree_end: u32,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct ChannelFile
{
    pub bone: u32,
    pub rotation_keys: Vec<Keyframe<Quat>>,
    pub translation_keys: Vec<Keyframe<Vec3>>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct ClipFile
{
    pub name: String,
    pub ticks_per_second: f32,
    pub channels: Vec<ChannelFile>,
}

/// A loaded rig flattened for storage. Everything the loader derived (indices, hold keys) is kept as-is
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct RigFile
{
    pub bones: Vec<BoneFile>, // in bone index order
    pub nodes: Vec<NodeFile>, // pre-order
    pub clips: Vec<ClipFile>,
    pub vertex_bindings: Vec<VertexBoneBinding>,
    pub global_inverse: Mat4,
}

fn corrupt(reason: impl Into<String>) -> LoadError { LoadError::CorruptRigFile(reason.into()) }

impl SkinnedRig
{
    pub fn to_file(&self) -> RigFile
    {
        let bones = self.registry.bones().iter()
            .map(|b| BoneFile { name: b.name.clone(), inverse_offset: b.inverse_offset })
            .collect();

        let nodes = self.hierarchy.nodes().iter()
            .map(|n| NodeFile
            {
                name: n.name.clone(),
                bind_transform: n.bind_transform,
                parent: n.parent.map(|p| p.0),
                bone: n.bone.map(|b| b.0),
                subtree_end: n.subtree_end.0,
            })
            .collect();

        let clips = self.clips.clips().iter()
            .map(|clip|
            {
                let index = self.clips.clip_index(&clip.name);
                let channels = index.into_iter()
                    .flat_map(|i| self.clips.clip_channels(i))
                    .map(|(bone, channel)| ChannelFile
                    {
                        bone: bone.0,
                        rotation_keys: channel.rotation.keys().to_vec(),
                        translation_keys: channel.translation.keys().to_vec(),
                    })
                    .collect();
                ClipFile { name: clip.name.clone(), ticks_per_second: clip.ticks_per_second, channels }
            })
            .collect();

        RigFile
        {
            bones,
            nodes,
            clips,
            vertex_bindings: self.vertex_bindings.as_slice().to_vec(),
            global_inverse: self.global_inverse,
        }
    }

    /// Rebuild a rig from a stored file, checking every index it carries
    pub fn from_file(file: RigFile, config: &AnimationConfig) -> Result<Self, LoadError>
    {
        if file.bones.is_empty() { return Err(LoadError::NoBones); }
        if file.nodes.is_empty() { return Err(LoadError::NoHierarchyRoot); }

        let mut bones = BoneRegistryBuilder::new();
        for (i, bone) in file.bones.iter().enumerate()
        {
            if bones.register_bone(&bone.name, bone.inverse_offset).index() != i
            {
                return Err(corrupt(format!("Duplicate bone '{}'", bone.name)));
            }
        }
        let registry = bones.finish();
        let bone_count = registry.len() as u32;

        let node_count = file.nodes.len() as u32;
        let mut nodes = Vec::with_capacity(file.nodes.len());
        // (index, subtree_end) of every node whose subtree is still open, innermost last
        let mut open: Vec<(u32, u32)> = Vec::new();
        for (i, node) in file.nodes.into_iter().enumerate()
        {
            let i = i as u32;
            while open.last().is_some_and(|&(_, end)| end <= i)
            {
                open.pop();
            }

            // the parent must be the innermost open subtree, and only the first node may be a root
            let enclosing = open.last().copied();
            if node.parent != enclosing.map(|(p, _)| p) || (i > 0 && enclosing.is_none())
            {
                return Err(corrupt(format!("Node '{}' has an invalid parent", node.name)));
            }
            if node.subtree_end <= i || node.subtree_end > enclosing.map_or(node_count, |(_, end)| end)
            {
                return Err(corrupt(format!("Node '{}' has an invalid subtree", node.name)));
            }
            open.push((i, node.subtree_end));
            if node.bone.is_some_and(|b| b >= bone_count)
            {
                return Err(corrupt(format!("Node '{}' references bone {:?} of {bone_count}", node.name, node.bone)));
            }

            nodes.push(HierarchyNode
            {
                name: node.name,
                bind_transform: node.bind_transform,
                parent: node.parent.map(NodeIndex),
                bone: node.bone.map(BoneIndex),
                subtree_end: NodeIndex(node.subtree_end),
            });
        }

        let mut clip_names = MetroHashMap::default();
        let mut clips = ClipStore::new(registry.len());
        for clip in file.clips
        {
            if clip_names.insert(clip.name.clone(), ()).is_some()
            {
                return Err(corrupt(format!("Duplicate clip '{}'", clip.name)));
            }

            let mut channels = Vec::with_capacity(clip.channels.len());
            for channel in clip.channels
            {
                if channel.bone >= bone_count
                {
                    return Err(corrupt(format!("Clip '{}' has a channel for bone {} of {bone_count}", clip.name, channel.bone)));
                }
                let rotation = KeyTrack::new(channel.rotation_keys)
                    .map_err(|fault| corrupt(format!("Clip '{}' bone {} rotation keys: {fault:?}", clip.name, channel.bone)))?;
                let translation = KeyTrack::new(channel.translation_keys)
                    .map_err(|fault| corrupt(format!("Clip '{}' bone {} translation keys: {fault:?}", clip.name, channel.bone)))?;
                channels.push((BoneIndex(channel.bone), BoneChannel { rotation, translation }));
            }
            clips.add_clip(clip.name, clip.ticks_per_second, channels);
        }

        if let Some(bad) = file.vertex_bindings.iter().position(|v| v.influences().any(|(b, _)| b.0 >= bone_count))
        {
            return Err(corrupt(format!("Vertex {bad} is bound to a bone out of range")));
        }

        Ok(Self
        {
            global_inverse_dq: DualQuat::from(&file.global_inverse).true_normalized(),
            global_inverse: file.global_inverse,
            registry,
            hierarchy: SkeletonHierarchy::from_nodes(nodes),
            clips,
            vertex_bindings: VertexBindings::from(file.vertex_bindings),
            config: config.clone(),
        })
    }

    pub fn bake(&self) -> Vec<u8>
    {
        bitcode::encode(&self.to_file())
    }

    pub fn load_baked(bytes: &[u8], config: &AnimationConfig) -> Result<Self, LoadError>
    {
        let file = bitcode::decode::<RigFile>(bytes).map_err(|err| corrupt(err.to_string()))?;
        let rig = Self::from_file(file, config)?;
        log::debug!("Loaded baked rig with {} bones and {} clips", rig.bone_count(), rig.clips.len());
        Ok(rig)
    }
}
