use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use nab_marrow::timing::FTicks;

/// The asset can't be animated. Rendering may continue with the static bind pose
#[derive(Debug)]
pub enum LoadError
{
    NoHierarchyRoot,
    NoBones,
    EmptyKeyTrack { clip: String, bone: String },
    UnsortedKeyTrack { clip: String, bone: String },
    NegativeKeyTime { clip: String, bone: String },
    CorruptRigFile(String),
    Import(Box<dyn Error + Send + Sync>),
}
impl Display for LoadError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match self
        {
            LoadError::NoHierarchyRoot => f.write_str("Asset has no hierarchy root, cannot animate this asset"),
            LoadError::NoBones => f.write_str("Asset has no bones, cannot animate this asset"),
            LoadError::EmptyKeyTrack { clip, bone } => write!(f, "Channel for bone '{bone}' in clip '{clip}' has an empty key track"),
            LoadError::UnsortedKeyTrack { clip, bone } => write!(f, "Channel for bone '{bone}' in clip '{clip}' has keys out of time order"),
            LoadError::NegativeKeyTime { clip, bone } => write!(f, "Channel for bone '{bone}' in clip '{clip}' has keys before time 0"),
            LoadError::CorruptRigFile(reason) => write!(f, "Corrupt rig file: {reason}"),
            LoadError::Import(err) => write!(f, "Failed to import asset: {err}"),
        }
    }
}
impl Error for LoadError
{
    fn source(&self) -> Option<&(dyn Error + 'static)>
    {
        match self
        {
            LoadError::Import(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PoseError
{
    UnknownClip(String),
}
impl Display for PoseError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match self
        {
            PoseError::UnknownClip(name) => write!(f, "No animation clip named '{name}'"),
        }
    }
}
impl Error for PoseError { }

/// A key track was sampled outside of its time range. This is a caller bug: clip time must be wrapped before sampling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRangeError
{
    pub time: FTicks,
    pub first_key: FTicks,
    pub last_key: FTicks,
}
impl Display for SampleRangeError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        write!(f, "Sample time {} is outside of the key track range [0, {}] (first key at {})",
            self.time.0, self.last_key.0, self.first_key.0)
    }
}
impl Error for SampleRangeError { }
