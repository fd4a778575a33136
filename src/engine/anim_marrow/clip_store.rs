use bitcode::{Decode, Encode};
use glam::{Quat, Vec3};
use nab_marrow::hashing::MetroHashMap;
use nab_marrow::timing::{FSeconds, FTicks};
use crate::{AnimationConfig, BoneIndex, BoneRegistry, KeyTrack, LoadError, LoopBehavior, SceneAssetProvider, TrackFault};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub struct ClipIndex(pub u32);
impl ClipIndex
{
    #[inline] #[must_use] pub const fn index(self) -> usize { self.0 as usize }
}

/// Keyframes driving one bone within one clip
#[derive(Debug, Clone, PartialEq)]
pub struct BoneChannel
{
    pub rotation: KeyTrack<Quat>,
    pub translation: KeyTrack<Vec3>,
}
impl BoneChannel
{
    #[inline] #[must_use]
    pub fn last_time(&self) -> FTicks { self.rotation.last_time().max(self.translation.last_time()) }

    /// Local rotation and translation at `time` (clip ticks, already wrapped). Panics if `time` is out of range
    #[inline]
    pub fn sample(&self, time: FTicks) -> (Quat, Vec3)
    {
        (self.rotation.sample(time), self.translation.sample(time))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip
{
    pub name: String,
    pub ticks_per_second: f32,
    pub duration: FTicks, // last key of the longest channel
}
impl AnimationClip
{
    /// Absolute playback time to clip-local ticks within `[0, duration]`
    #[must_use]
    pub fn clip_time(&self, time: FSeconds, loop_behavior: LoopBehavior) -> FTicks
    {
        loop_behavior.wrap(time.to_ticks(self.ticks_per_second), self.duration)
    }
}

/// Every clip's channels, as a (clip × bone) table of optional channels
#[derive(Debug, Clone, Default)]
pub struct ClipStore
{
    bone_count: usize,
    clips: Vec<AnimationClip>,
    clip_lookup: MetroHashMap<String, ClipIndex>,
    channels: Vec<BoneChannel>,
    table: Vec<Option<u32>>, // index into `channels`
}
impl ClipStore
{
    pub fn new(bone_count: usize) -> Self
    {
        Self { bone_count, ..Default::default() }
    }

    /// Pull every clip out of `provider`. Channels targeting names that aren't registered bones are skipped
    pub fn load(provider: &impl SceneAssetProvider, registry: &BoneRegistry, config: &AnimationConfig) -> Result<Self, LoadError>
    {
        let mut store = Self::new(registry.len());

        for clip_name in provider.clip_names()
        {
            if store.clip_index(&clip_name).is_some()
            {
                log::warn!("Skipping duplicate animation clip '{clip_name}'");
                continue;
            }

            let source_channels = provider.animation_channels(&clip_name);
            let source_rate = source_channels.first().map_or(0.0, |c| c.ticks_per_second);
            if let Some(other) = source_channels.iter().find(|c| c.ticks_per_second != source_rate)
            {
                log::warn!("Clip '{clip_name}' mixes tick rates ({source_rate} and {} for '{}'), using {source_rate}",
                    other.ticks_per_second, other.bone_name);
            }
            let ticks_per_second = config.ticks_per_second_or_default(source_rate);

            let mut channels = Vec::with_capacity(source_channels.len());
            for source in source_channels
            {
                let Some(bone) = registry.lookup(&source.bone_name)
                else
                {
                    log::debug!("Clip '{clip_name}' has a channel for '{}', which is not a bone", source.bone_name);
                    continue;
                };

                let track_error = |fault: TrackFault|
                {
                    let (clip, bone) = (clip_name.clone(), source.bone_name.clone());
                    match fault
                    {
                        TrackFault::Empty => LoadError::EmptyKeyTrack { clip, bone },
                        TrackFault::Unsorted => LoadError::UnsortedKeyTrack { clip, bone },
                        TrackFault::Negative => LoadError::NegativeKeyTime { clip, bone },
                    }
                };
                let rotation = KeyTrack::new(source.rotation_keys.clone()).map_err(track_error)?;
                let translation = KeyTrack::new(source.translation_keys.clone()).map_err(track_error)?;
                channels.push((bone, BoneChannel { rotation, translation }));
            }

            store.add_clip(clip_name, ticks_per_second, channels);
        }

        log::debug!("Loaded {} animation clips with {} bone channels", store.clips.len(), store.channels.len());
        Ok(store)
    }

    /// Add a clip. Its duration is the last key of its longest channel; shorter channels hold their last key until then.
    /// Only the first channel for a bone is kept
    pub fn add_clip(&mut self, name: String, ticks_per_second: f32, channels: Vec<(BoneIndex, BoneChannel)>) -> ClipIndex
    {
        let clip_index = ClipIndex(self.clips.len() as u32);
        let mut row: Vec<Option<BoneChannel>> = vec![None; self.bone_count];

        for (bone, channel) in channels
        {
            let Some(slot) = row.get_mut(bone.index())
            else
            {
                log::warn!("Clip '{name}' has a channel for unknown bone {bone}");
                continue;
            };
            if slot.is_some()
            {
                log::warn!("Clip '{name}' has more than one channel for bone {bone}, keeping the first");
                continue;
            }
            *slot = Some(channel);
        }

        // only the channels that were kept set the clip length
        let duration = row.iter().flatten()
            .map(BoneChannel::last_time)
            .max()
            .unwrap_or_default();

        for channel in row
        {
            let Some(channel) = channel
            else
            {
                self.table.push(None);
                continue;
            };
            self.table.push(Some(self.channels.len() as u32));
            self.channels.push(BoneChannel
            {
                rotation: channel.rotation.with_hold_until(duration),
                translation: channel.translation.with_hold_until(duration),
            });
        }

        self.clip_lookup.insert(name.clone(), clip_index);
        self.clips.push(AnimationClip { name, ticks_per_second, duration });
        clip_index
    }

    #[inline] #[must_use] pub fn clip_index(&self, name: &str) -> Option<ClipIndex> { self.clip_lookup.get(name).copied() }
    #[inline] #[must_use] pub fn clip(&self, clip: ClipIndex) -> Option<&AnimationClip> { self.clips.get(clip.index()) }
    #[inline] #[must_use] pub fn clips(&self) -> &[AnimationClip] { &self.clips }
    #[inline] #[must_use] pub fn len(&self) -> usize { self.clips.len() }
    #[inline] #[must_use] pub fn is_empty(&self) -> bool { self.clips.is_empty() }
    #[inline] #[must_use] pub fn bone_count(&self) -> usize { self.bone_count }

    /// The channel driving `bone` in `clip`. `None` means the bone holds its bind pose
    #[inline] #[must_use]
    pub fn channel(&self, clip: ClipIndex, bone: BoneIndex) -> Option<&BoneChannel>
    {
        if bone.index() >= self.bone_count
        {
            return None;
        }
        let slot = (*self.table.get(clip.index() * self.bone_count + bone.index())?)?;
        self.channels.get(slot as usize)
    }

    pub fn lookup(&self, clip_name: &str, bone: BoneIndex) -> Option<&BoneChannel>
    {
        self.channel(self.clip_index(clip_name)?, bone)
    }

    /// Every (bone, channel) pair of a clip, in bone order
    pub fn clip_channels(&self, clip: ClipIndex) -> impl Iterator<Item = (BoneIndex, &BoneChannel)>
    {
        (0..self.bone_count)
            .filter_map(move |b| self.channel(clip, BoneIndex(b as u32)).map(|c| (BoneIndex(b as u32), c)))
    }
}
