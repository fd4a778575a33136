use glam::Mat4;
use math_marrow::DualQuat;
use crate::{AnimationConfig, BoneChannel, BoneIndex, BoneRegistry, BoneRegistryBuilder, ClipStore, LoadError, SceneAssetProvider, SkeletonHierarchy, SkeletonPoser, SourceNode, SourceVertexWeight, VertexBindings};

/// A fully loaded, immutable animated model. Frame state lives in [`SkeletonPoser`]
#[derive(Debug, Clone)]
pub struct SkinnedRig
{
    pub(crate) registry: BoneRegistry,
    pub(crate) hierarchy: SkeletonHierarchy,
    pub(crate) clips: ClipStore,
    pub(crate) vertex_bindings: VertexBindings,
    pub(crate) global_inverse: Mat4,
    pub(crate) global_inverse_dq: DualQuat,
    pub(crate) config: AnimationConfig,
}
impl SkinnedRig
{
    pub fn load(provider: &impl SceneAssetProvider, config: &AnimationConfig) -> Result<Self, LoadError>
    {
        RigBuilder::from_provider(provider, config)
    }

    #[inline] #[must_use] pub fn registry(&self) -> &BoneRegistry { &self.registry }
    #[inline] #[must_use] pub fn hierarchy(&self) -> &SkeletonHierarchy { &self.hierarchy }
    #[inline] #[must_use] pub fn clips(&self) -> &ClipStore { &self.clips }
    #[inline] #[must_use] pub fn config(&self) -> &AnimationConfig { &self.config }
    #[inline] #[must_use] pub fn bone_count(&self) -> usize { self.registry.len() }
    #[inline] #[must_use] pub fn global_inverse(&self) -> Mat4 { self.global_inverse }
    #[inline] #[must_use] pub fn global_inverse_dq(&self) -> DualQuat { self.global_inverse_dq }

    /// Bone influences per vertex, laid out for upload alongside the vertex buffer
    #[inline] #[must_use] pub fn vertex_bindings(&self) -> &VertexBindings { &self.vertex_bindings }

    pub fn clip_names(&self) -> impl Iterator<Item = &str>
    {
        self.clips.clips().iter().map(|c| c.name.as_str())
    }

    /// `None` if either name is unknown or the bone isn't animated by the clip
    pub fn lookup_channel(&self, clip_name: &str, bone_name: &str) -> Option<&BoneChannel>
    {
        self.clips.lookup(clip_name, self.registry.lookup(bone_name)?)
    }

    pub fn poser(&self) -> SkeletonPoser<'_>
    {
        SkeletonPoser::new(self)
    }
}

/// Load-time state for assembling a [`SkinnedRig`]
#[derive(Debug)]
pub struct RigBuilder
{
    config: AnimationConfig,
    bones: BoneRegistryBuilder,
    vertex_bindings: VertexBindings,
    vertex_offset: u32, // global id of the next mesh's first vertex
    unknown_weight_bones: usize,
}
impl RigBuilder
{
    pub fn new(config: AnimationConfig) -> Self
    {
        Self
        {
            config,
            bones: BoneRegistryBuilder::new(),
            vertex_bindings: VertexBindings::default(),
            vertex_offset: 0,
            unknown_weight_bones: 0,
        }
    }

    pub fn from_provider(provider: &impl SceneAssetProvider, config: &AnimationConfig) -> Result<SkinnedRig, LoadError>
    {
        puffin::profile_function!();

        let root = provider.root_node().ok_or(LoadError::NoHierarchyRoot)?;

        let mut builder = Self::new(config.clone());
        for bone in provider.bones()
        {
            builder.register_bone(&bone.name, bone.inverse_offset);
        }
        if builder.bones.is_empty()
        {
            return Err(LoadError::NoBones);
        }

        for mesh in 0..provider.mesh_count()
        {
            builder.add_mesh(provider.mesh_vertex_count(mesh), &provider.vertex_bone_weights(mesh));
        }

        builder.finish(root, provider)
    }

    pub fn register_bone(&mut self, name: &str, inverse_offset: Mat4) -> BoneIndex
    {
        self.bones.register_bone(name, inverse_offset)
    }

    /// Append a mesh's vertices and bind its weights. Weights naming unregistered bones are skipped
    pub fn add_mesh(&mut self, vertex_count: u32, weights: &[SourceVertexWeight])
    {
        let base = self.vertex_offset;
        debug_assert_eq!(base as usize, self.vertex_bindings.len());
        self.vertex_bindings.append_vertices(vertex_count);
        self.vertex_offset += vertex_count;

        for weight in weights
        {
            let Some(bone) = self.bones.lookup(&weight.bone_name)
            else
            {
                log::warn!("Vertex {} is weighted to '{}', which is not a bone", weight.vertex_id, weight.bone_name);
                self.unknown_weight_bones += 1;
                continue;
            };

            if weight.vertex_id >= vertex_count
            {
                log::warn!("Skipping bone '{}' weight for vertex {} of a {vertex_count} vertex mesh", weight.bone_name, weight.vertex_id);
                continue;
            }

            self.vertex_bindings.bind_weight(base + weight.vertex_id, bone, weight.weight);
        }
    }

    pub fn finish(self, root: &SourceNode, provider: &impl SceneAssetProvider) -> Result<SkinnedRig, LoadError>
    {
        let registry = self.bones.finish();
        let hierarchy = SkeletonHierarchy::from_source(root, &registry);
        let clips = ClipStore::load(provider, &registry, &self.config)?;

        for orphan in hierarchy.unbound_bones(&registry)
        {
            log::warn!("Bone '{}' is not in the node hierarchy and will not be posed",
                registry.bone(orphan).map_or("", |b| b.name.as_str()));
        }
        if self.vertex_bindings.dropped_influences() > 0
        {
            log::warn!("Dropped {} bone influences from vertices with more than four bones", self.vertex_bindings.dropped_influences());
        }

        let global_inverse = root.transform.inverse();
        let rig = SkinnedRig
        {
            global_inverse_dq: DualQuat::from(&global_inverse).true_normalized(),
            global_inverse,
            registry,
            hierarchy,
            clips,
            vertex_bindings: self.vertex_bindings,
            config: self.config,
        };

        log::debug!("Loaded rig with {} bones, {} nodes, {} vertices, {} clips ({} weights on unknown bones)",
            rig.registry.len(), rig.hierarchy.len(), rig.vertex_bindings.len(), rig.clips.len(), self.unknown_weight_bones);
        Ok(rig)
    }
}
