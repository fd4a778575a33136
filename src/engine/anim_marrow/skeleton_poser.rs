use std::ops::Range;
use glam::Mat4;
use math_marrow::DualQuat;
use nab_marrow::timing::{FSeconds, FTicks};
use crate::{BoneIndex, ClipIndex, HierarchyNode, NodeIndex, PoseError, SkinnedRig};

/// Final skinning transform of one bone, in both forms the renderer can skin with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneTransform
{
    pub matrix: Mat4,
    pub dual_quat: DualQuat,
}
impl BoneTransform
{
    pub const IDENTITY: Self = Self { matrix: Mat4::IDENTITY, dual_quat: DualQuat::IDENTITY };
}
impl Default for BoneTransform
{
    fn default() -> Self { Self::IDENTITY }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct NodeGlobal
{
    matrix: Mat4,
    dual_quat: DualQuat,
}
impl NodeGlobal
{
    const IDENTITY: Self = Self { matrix: Mat4::IDENTITY, dual_quat: DualQuat::IDENTITY };
}

type BoneWrites = Vec<(BoneIndex, BoneTransform)>;

/// Per-frame pose state for one rig. The pose buffer is indexed by [`BoneIndex`]
pub struct SkeletonPoser<'r>
{
    rig: &'r SkinnedRig,
    pose: Box<[BoneTransform]>,
    parallel_subtrees: bool,
}
impl<'r> SkeletonPoser<'r>
{
    pub fn new(rig: &'r SkinnedRig) -> Self
    {
        Self
        {
            rig,
            pose: vec![BoneTransform::IDENTITY; rig.bone_count()].into_boxed_slice(),
            parallel_subtrees: rig.config().parallel_subtrees,
        }
    }

    #[inline] #[must_use] pub fn rig(&self) -> &'r SkinnedRig { self.rig }
    #[inline] #[must_use] pub fn transforms(&self) -> &[BoneTransform] { &self.pose }

    pub fn set_parallel_subtrees(&mut self, parallel: bool) { self.parallel_subtrees = parallel; }

    /// Pose the rig with `clip_name` at `time` seconds of playback, wrapped per the rig's loop behavior
    pub fn evaluate(&mut self, clip_name: &str, time: FSeconds) -> Result<&[BoneTransform], PoseError>
    {
        let clips = self.rig.clips();
        let Some((index, clip)) = clips.clip_index(clip_name).and_then(|i| Some((i, clips.clip(i)?)))
        else
        {
            return Err(PoseError::UnknownClip(clip_name.to_string()));
        };

        let clip_time = clip.clip_time(time, self.rig.config().loop_behavior);
        Ok(self.evaluate_clip_at(index, clip_time))
    }

    /// Pose the rig at clip-local `time`, which must already be within the clip's duration
    pub fn evaluate_clip_at(&mut self, clip: ClipIndex, time: FTicks) -> &[BoneTransform]
    {
        self.pose_with(Some((clip, time)))
    }

    /// Pose with no clip applied: every node holds its bind transform
    pub fn evaluate_bind_pose(&mut self) -> &[BoneTransform]
    {
        self.pose_with(None)
    }

    fn pose_with(&mut self, sample: Option<(ClipIndex, FTicks)>) -> &[BoneTransform]
    {
        puffin::profile_function!();

        let node_count = self.rig.hierarchy().len();
        let writes = if self.parallel_subtrees && node_count > 1
        {
            evaluate_parallel(self.rig, sample)
        }
        else
        {
            vec![evaluate_range(self.rig, sample, 0..node_count, NodeGlobal::IDENTITY)]
        };

        for (bone, transform) in writes.into_iter().flatten()
        {
            self.pose[bone.index()] = transform;
        }
        &self.pose
    }
}

fn local_transform(rig: &SkinnedRig, node: &HierarchyNode, sample: Option<(ClipIndex, FTicks)>) -> NodeGlobal
{
    let channel = match (node.bone, sample)
    {
        (Some(bone), Some((clip, time))) => rig.clips().channel(clip, bone).map(|c| c.sample(time)),
        _ => None,
    };

    match channel
    {
        Some((rotation, translation)) => NodeGlobal
        {
            matrix: Mat4::from_rotation_translation(rotation, translation),
            dual_quat: DualQuat::from_rot_trans(rotation, translation).true_normalized(),
        },
        None => NodeGlobal
        {
            matrix: node.bind_transform,
            dual_quat: DualQuat::IDENTITY,
        },
    }
}

/// Walk a contiguous pre-order run of nodes. Nodes whose parent lies outside the run hang off `outer`
fn evaluate_range(rig: &SkinnedRig, sample: Option<(ClipIndex, FTicks)>, range: Range<usize>, outer: NodeGlobal) -> BoneWrites
{
    let nodes = &rig.hierarchy().nodes()[range.clone()];
    let mut globals: Vec<NodeGlobal> = Vec::with_capacity(nodes.len());
    let mut writes = BoneWrites::new();

    for node in nodes
    {
        let parent = match node.parent
        {
            Some(p) if p.index() >= range.start => globals[p.index() - range.start],
            _ => outer,
        };

        let local = local_transform(rig, node, sample);
        let global = NodeGlobal
        {
            matrix: parent.matrix * local.matrix,
            dual_quat: parent.dual_quat.chain(local.dual_quat),
        };
        globals.push(global);

        let Some(bone_index) = node.bone else { continue; };
        let Some(bone) = rig.registry().bone(bone_index) else { continue; };
        writes.push((bone_index, BoneTransform
        {
            matrix: rig.global_inverse() * global.matrix * bone.inverse_offset,
            dual_quat: rig.global_inverse_dq().chain(global.dual_quat).chain(bone.inverse_offset_dq),
        }));
    }

    writes
}

/// Pose the root, then each subtree under it on its own scoped thread. Writes come back in subtree order
fn evaluate_parallel(rig: &SkinnedRig, sample: Option<(ClipIndex, FTicks)>) -> Vec<BoneWrites>
{
    let hierarchy = rig.hierarchy();
    let Some(root) = hierarchy.root() else { return Vec::new(); };

    let root_local = local_transform(rig, root, sample);
    let root_global = NodeGlobal
    {
        matrix: NodeGlobal::IDENTITY.matrix * root_local.matrix,
        dual_quat: NodeGlobal::IDENTITY.dual_quat.chain(root_local.dual_quat),
    };

    let mut all_writes = vec![evaluate_range(rig, sample, 0..1, NodeGlobal::IDENTITY)];

    let subtrees: Vec<Range<usize>> = hierarchy.children(NodeIndex::ROOT).map(|c| hierarchy.subtree(c)).collect();
    let joined = crossbeam::scope(|scope|
    {
        let handles: Vec<_> = subtrees.into_iter()
            .map(|range| scope.spawn(move |_| evaluate_range(rig, sample, range, root_global)))
            .collect();
        handles.into_iter().map(|h| h.join()).collect::<Vec<_>>()
    });

    let results = match joined
    {
        Ok(results) => results,
        Err(panic) => std::panic::resume_unwind(panic),
    };
    for result in results
    {
        match result
        {
            Ok(writes) => all_writes.push(writes),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    all_writes
}

#[cfg(test)]
mod tests
{
    use std::f32::consts::FRAC_PI_2;
    use approx::assert_abs_diff_eq;
    use glam::{Quat, Vec3};
    use crate::{AnimationConfig, Keyframe, SceneAsset, SourceChannel, SourceNode};
    use super::*;

    fn channel(bone: &str, rotations: &[(f32, Quat)], translations: &[(f32, Vec3)]) -> SourceChannel
    {
        SourceChannel
        {
            bone_name: bone.into(),
            rotation_keys: rotations.iter().map(|(t, r)| Keyframe::new(FTicks(*t), *r)).collect(),
            translation_keys: translations.iter().map(|(t, v)| Keyframe::new(FTicks(*t), *v)).collect(),
            ticks_per_second: 1.0,
        }
    }

    // scene -> a -> b -> c, plus a second limb scene -> d -> e
    fn chain_rig(config: AnimationConfig) -> SkinnedRig
    {
        let ta = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let tb = Mat4::from_rotation_translation(Quat::from_rotation_z(FRAC_PI_2), Vec3::new(0.0, 2.0, 0.0));
        let tc = Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0));
        let root = SourceNode::new("scene", Mat4::IDENTITY)
            .with_child(SourceNode::new("a", ta)
                .with_child(SourceNode::new("b", tb)
                    .with_child(SourceNode::new("c", tc))))
            .with_child(SourceNode::new("d", Mat4::from_translation(-Vec3::X))
                .with_child(SourceNode::new("pivot", Mat4::from_rotation_y(0.3))
                    .with_child(SourceNode::new("e", Mat4::from_translation(-Vec3::Y)))));

        let scene = SceneAsset::new(root)
            .with_bone("a", Mat4::IDENTITY)
            .with_bone("b", Mat4::IDENTITY)
            .with_bone("c", Mat4::IDENTITY)
            .with_bone("d", Mat4::IDENTITY)
            .with_bone("e", Mat4::IDENTITY)
            .with_bone("orphan", Mat4::from_translation(Vec3::Z))
            .with_clip("swing", vec![
                channel("b", &[(0.0, Quat::IDENTITY), (2.0, Quat::from_rotation_x(1.0))], &[(0.0, Vec3::Y), (2.0, Vec3::new(0.0, 3.0, 0.0))]),
                channel("e", &[(0.0, Quat::from_rotation_z(0.5)), (4.0, Quat::from_rotation_z(-0.5))], &[(0.0, -Vec3::Y)]),
            ]);

        SkinnedRig::load(&scene, &config).unwrap()
    }

    #[test]
    fn bind_pose_chain()
    {
        let rig = chain_rig(AnimationConfig::default());
        let mut poser = rig.poser();
        let pose = poser.evaluate_bind_pose();
        assert_eq!(pose.len(), 6);

        let ta = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let tb = Mat4::from_rotation_translation(Quat::from_rotation_z(FRAC_PI_2), Vec3::new(0.0, 2.0, 0.0));
        let tc = Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(pose[0].matrix, ta);
        assert_eq!(pose[1].matrix, ta * tb);
        assert_eq!(pose[2].matrix, ta * tb * tc);

        // pivot nodes still contribute their bind transform
        assert_abs_diff_eq!(pose[4].matrix,
            Mat4::from_translation(-Vec3::X) * Mat4::from_rotation_y(0.3) * Mat4::from_translation(-Vec3::Y), epsilon = 1e-6);
    }

    #[test]
    fn unanimated_nodes_hold_bind()
    {
        let rig = chain_rig(AnimationConfig::default());
        let mut poser = rig.poser();
        let ta = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));

        for t in [0.0, 0.7, 1.5, 2.0]
        {
            let pose = poser.evaluate("swing", FSeconds(t)).unwrap();
            assert_eq!(pose[0].matrix, ta);
            assert_eq!(pose[3].matrix, Mat4::from_translation(-Vec3::X));
        }
    }

    #[test]
    fn animated_chain()
    {
        let rig = chain_rig(AnimationConfig::default());
        let mut poser = rig.poser();
        let pose = poser.evaluate("swing", FSeconds(2.0)).unwrap();

        let ta = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let b_local = Mat4::from_rotation_translation(Quat::from_rotation_x(1.0), Vec3::new(0.0, 3.0, 0.0));
        let tc = Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0));
        assert_abs_diff_eq!(pose[1].matrix, ta * b_local, epsilon = 1e-6);
        assert_abs_diff_eq!(pose[2].matrix, ta * b_local * tc, epsilon = 1e-6);
    }

    #[test]
    fn matrix_and_dual_quat_agree()
    {
        let ta = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0));
        let scene = SceneAsset::new(SourceNode::new("scene", Mat4::IDENTITY).with_child(SourceNode::new("arm", ta)))
            .with_bone("arm", ta.inverse())
            .with_clip("raise", vec![channel("arm",
                &[(0.0, Quat::IDENTITY), (1.0, Quat::from_rotation_z(FRAC_PI_2))],
                &[(0.0, Vec3::Y), (1.0, Vec3::new(0.5, 1.0, 0.0))])]);
        let rig = SkinnedRig::load(&scene, &AnimationConfig::default()).unwrap();
        let mut poser = rig.poser();

        for t in [0.0, 0.25, 0.5, 0.9]
        {
            let pose = poser.evaluate("raise", FSeconds(t)).unwrap();
            assert_abs_diff_eq!(pose[0].matrix, pose[0].dual_quat.to_mat4(), epsilon = 1e-4);
            assert_abs_diff_eq!(pose[0].dual_quat.real().length(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn orphan_bones_stay_identity()
    {
        let rig = chain_rig(AnimationConfig::default());
        let mut poser = rig.poser();
        let pose = poser.evaluate("swing", FSeconds(1.0)).unwrap();
        assert_eq!(pose[5], BoneTransform::IDENTITY);
    }

    #[test]
    fn unknown_clip()
    {
        let rig = chain_rig(AnimationConfig::default());
        let mut poser = rig.poser();
        assert_eq!(poser.evaluate("dance", FSeconds(0.0)).unwrap_err(), PoseError::UnknownClip("dance".into()));
    }

    #[test]
    fn repeatable()
    {
        let rig = chain_rig(AnimationConfig::default());
        let mut poser = rig.poser();
        let first = poser.evaluate("swing", FSeconds(1.3)).unwrap().to_vec();
        let second = poser.evaluate("swing", FSeconds(1.3)).unwrap().to_vec();
        assert_eq!(first, second);

        // looping wraps back onto the same frame
        let looped = poser.evaluate("swing", FSeconds(5.3)).unwrap().to_vec();
        assert_abs_diff_eq!(first[1].matrix, looped[1].matrix, epsilon = 1e-5);
    }

    #[test]
    fn parallel_matches_sequential()
    {
        let rig = chain_rig(AnimationConfig { parallel_subtrees: true, ..Default::default() });
        let mut poser = rig.poser();

        for t in [0.0, 0.4, 1.1, 2.9, 3.99]
        {
            poser.set_parallel_subtrees(false);
            let sequential = poser.evaluate("swing", FSeconds(t)).unwrap().to_vec();
            poser.set_parallel_subtrees(true);
            let parallel = poser.evaluate("swing", FSeconds(t)).unwrap().to_vec();
            assert_eq!(sequential, parallel);
        }
    }
}
