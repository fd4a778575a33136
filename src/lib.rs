//! CPU skeletal animation: load a skinned rig once, then pose it every frame into
//! per-bone skinning matrices and dual quaternions.

pub use anim_marrow as anim;
pub use math_marrow as math;
pub use nab_marrow as nab;

pub use anim_marrow::{AnimationConfig, BoneTransform, LoadError, LoopBehavior, PoseError, SceneAsset, SceneAssetProvider, SkeletonPoser, SkinnedRig};
pub use math_marrow::DualQuat;
pub use nab_marrow::timing::FSeconds;

/// Load a rig from any provider, logging (and returning) the reason it can't be animated
pub fn load_rig(provider: &impl SceneAssetProvider, config: &AnimationConfig) -> Result<SkinnedRig, LoadError>
{
    SkinnedRig::load(provider, config).inspect_err(|err|
        log::error!("{err}; falling back to the static bind pose"))
}
