mod errors;
pub use errors::*;

pub mod config;
pub use config::{AnimationConfig, LoopBehavior};

pub mod asset_provider;
pub use asset_provider::*;

#[cfg(feature = "gltf")]
pub mod gltf_import;

pub mod bone_registry;
pub use bone_registry::*;

pub mod vertex_bones;
pub use vertex_bones::*;

pub mod keyframe_sampler;
pub use keyframe_sampler::*;

pub mod clip_store;
pub use clip_store::*;

pub mod hierarchy;
pub use hierarchy::*;

pub mod rig;
pub use rig::*;

pub mod rig_file;

pub mod skeleton_poser;
pub use skeleton_poser::*;
