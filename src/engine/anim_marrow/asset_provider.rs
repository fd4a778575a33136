use glam::{Mat4, Quat, Vec3};
use crate::Keyframe;

/// A node of the rig's bind-pose hierarchy, as authored in the source asset
#[derive(Debug, Clone, PartialEq)]
pub struct SourceNode
{
    pub name: String,
    pub transform: Mat4, // parent-relative
    pub children: Vec<SourceNode>,
}
impl SourceNode
{
    pub fn new(name: impl Into<String>, transform: Mat4) -> Self
    {
        Self { name: name.into(), transform, children: Vec::new() }
    }

    #[must_use]
    pub fn with_child(mut self, child: SourceNode) -> Self
    {
        self.children.push(child);
        self
    }

    /// Number of nodes in this subtree, including this one
    pub fn subtree_len(&self) -> usize
    {
        1 + self.children.iter().map(SourceNode::subtree_len).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceBone
{
    pub name: String,
    pub inverse_offset: Mat4, // mesh space -> bone space
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceVertexWeight
{
    pub vertex_id: u32, // relative to the mesh
    pub bone_name: String,
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceChannel
{
    pub bone_name: String,
    pub rotation_keys: Vec<Keyframe<Quat>>,
    pub translation_keys: Vec<Keyframe<Vec3>>,
    pub ticks_per_second: f32, // 0 if the source doesn't say
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMesh
{
    pub vertex_count: u32,
    pub weights: Vec<SourceVertexWeight>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceClip
{
    pub name: String,
    pub channels: Vec<SourceChannel>,
}

/// Everything the animation core needs from a parsed model file.
/// Read once at load time; nothing here is touched per frame
pub trait SceneAssetProvider
{
    fn root_node(&self) -> Option<&SourceNode>;
    fn bones(&self) -> Vec<SourceBone>;

    fn mesh_count(&self) -> usize;
    fn mesh_vertex_count(&self, mesh_index: usize) -> u32;
    fn vertex_bone_weights(&self, mesh_index: usize) -> Vec<SourceVertexWeight>;

    fn clip_names(&self) -> Vec<String>;
    fn animation_channels(&self, clip_name: &str) -> Vec<SourceChannel>;
}

/// A scene already parsed into memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneAsset
{
    pub root: Option<SourceNode>,
    pub bones: Vec<SourceBone>,
    pub meshes: Vec<SourceMesh>,
    pub clips: Vec<SourceClip>,
}
impl SceneAsset
{
    pub fn new(root: SourceNode) -> Self
    {
        Self { root: Some(root), ..Default::default() }
    }

    #[must_use]
    pub fn with_bone(mut self, name: impl Into<String>, inverse_offset: Mat4) -> Self
    {
        self.bones.push(SourceBone { name: name.into(), inverse_offset });
        self
    }

    #[must_use]
    pub fn with_mesh(mut self, mesh: SourceMesh) -> Self
    {
        self.meshes.push(mesh);
        self
    }

    #[must_use]
    pub fn with_clip(mut self, name: impl Into<String>, channels: Vec<SourceChannel>) -> Self
    {
        self.clips.push(SourceClip { name: name.into(), channels });
        self
    }
}
impl SceneAssetProvider for SceneAsset
{
    fn root_node(&self) -> Option<&SourceNode> { self.root.as_ref() }
    fn bones(&self) -> Vec<SourceBone> { self.bones.clone() }

    fn mesh_count(&self) -> usize { self.meshes.len() }
    fn mesh_vertex_count(&self, mesh_index: usize) -> u32
    {
        self.meshes.get(mesh_index).map_or(0, |m| m.vertex_count)
    }
    fn vertex_bone_weights(&self, mesh_index: usize) -> Vec<SourceVertexWeight>
    {
        self.meshes.get(mesh_index).map(|m| m.weights.clone()).unwrap_or_default()
    }

    fn clip_names(&self) -> Vec<String> { self.clips.iter().map(|c| c.name.clone()).collect() }
    fn animation_channels(&self, clip_name: &str) -> Vec<SourceChannel>
    {
        self.clips.iter()
            .find(|c| c.name == clip_name)
            .map(|c| c.channels.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use nab_marrow::timing::FTicks;

    #[test]
    fn in_memory_provider()
    {
        let root = SourceNode::new("root", Mat4::IDENTITY)
            .with_child(SourceNode::new("hips", Mat4::IDENTITY)
                .with_child(SourceNode::new("spine", Mat4::IDENTITY)))
            .with_child(SourceNode::new("prop", Mat4::IDENTITY));
        assert_eq!(root.subtree_len(), 4);

        let scene = SceneAsset::new(root)
            .with_bone("hips", Mat4::IDENTITY)
            .with_mesh(SourceMesh
            {
                vertex_count: 3,
                weights: vec![SourceVertexWeight { vertex_id: 1, bone_name: "hips".into(), weight: 1.0 }],
            })
            .with_clip("walk", vec![SourceChannel
            {
                bone_name: "hips".into(),
                rotation_keys: vec![Keyframe::new(FTicks(0.0), Quat::IDENTITY)],
                translation_keys: vec![Keyframe::new(FTicks(0.0), Vec3::ZERO)],
                ticks_per_second: 24.0,
            }]);

        assert_eq!(scene.root_node().map(|r| r.name.as_str()), Some("root"));
        assert_eq!(scene.bones().len(), 1);
        assert_eq!(scene.mesh_count(), 1);
        assert_eq!(scene.mesh_vertex_count(0), 3);
        assert_eq!(scene.mesh_vertex_count(7), 0);
        assert_eq!(scene.vertex_bone_weights(0).len(), 1);
        assert!(scene.vertex_bone_weights(2).is_empty());
        assert_eq!(scene.clip_names(), vec!["walk".to_string()]);
        assert_eq!(scene.animation_channels("walk").len(), 1);
        assert!(scene.animation_channels("run").is_empty());
    }
}
