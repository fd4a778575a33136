use bitcode::{Decode, Encode};
use glam::{Quat, Vec3};
use math_marrow::inv_lerp;
use nab_marrow::timing::FTicks;
use crate::SampleRangeError;

pub trait Interpolate: Copy
{
    fn interpolate(from: Self, to: Self, factor: f32) -> Self;
}
impl Interpolate for Vec3
{
    #[inline]
    fn interpolate(from: Self, to: Self, factor: f32) -> Self { from.lerp(to, factor) }
}
impl Interpolate for Quat
{
    // glam's slerp takes the shorter arc
    #[inline]
    fn interpolate(from: Self, to: Self, factor: f32) -> Self { from.slerp(to, factor).normalize() }
}

#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub struct Keyframe<T>
{
    pub time: FTicks,
    pub value: T,
}
impl<T> Keyframe<T>
{
    #[inline] #[must_use]
    pub const fn new(time: FTicks, value: T) -> Self { Self { time, value } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackFault
{
    Empty,
    Unsorted,
    Negative,
}

/// A non-empty run of keys, non-decreasing in time and starting at or after 0
#[derive(Debug, Clone, PartialEq)]
pub struct KeyTrack<T>
{
    keys: Box<[Keyframe<T>]>,
}
impl<T: Interpolate> KeyTrack<T>
{
    pub fn new(keys: impl Into<Vec<Keyframe<T>>>) -> Result<Self, TrackFault>
    {
        let keys = keys.into();
        if keys.is_empty()
        {
            return Err(TrackFault::Empty);
        }
        // also rejects NaN times
        if !keys.windows(2).all(|w| w[0].time.0 <= w[1].time.0)
        {
            return Err(TrackFault::Unsorted);
        }
        if !(keys[0].time.0 >= 0.0)
        {
            return Err(TrackFault::Negative);
        }
        Ok(Self { keys: keys.into_boxed_slice() })
    }

    /// Repeat the last key at `end` so that the track covers `[0, end]`. Single-key tracks are left alone
    #[must_use]
    pub fn with_hold_until(self, end: FTicks) -> Self
    {
        let Some(last) = self.keys.last().copied() else { return self; };
        if self.keys.len() < 2 || last.time >= end
        {
            return self;
        }

        let mut keys = self.keys.into_vec();
        keys.push(Keyframe::new(end, last.value));
        Self { keys: keys.into_boxed_slice() }
    }

    #[inline] #[must_use] pub fn keys(&self) -> &[Keyframe<T>] { &self.keys }
    #[inline] #[must_use] pub fn len(&self) -> usize { self.keys.len() }
    #[inline] #[must_use] pub fn is_empty(&self) -> bool { self.keys.is_empty() }
    #[inline] #[must_use] pub fn first_time(&self) -> FTicks { self.keys[0].time }
    #[inline] #[must_use] pub fn last_time(&self) -> FTicks { self.keys[self.keys.len() - 1].time }

    /// Sample the track at `time`, which must lie within `[0, last key]`.
    /// Times before the first key hold the first key
    pub fn try_sample(&self, time: FTicks) -> Result<T, SampleRangeError>
    {
        let (first, last) = match self.keys.as_ref()
        {
            [only] => return Ok(only.value),
            [first, .., last] => (first, last),
            [] => unreachable!("Key tracks are never empty"),
        };

        if !(time.0 >= 0.0 && time <= last.time)
        {
            return Err(SampleRangeError { time, first_key: first.time, last_key: last.time });
        }
        if time == last.time
        {
            return Ok(last.value);
        }

        // first key strictly after `time`
        let next = self.keys.partition_point(|k| k.time <= time).max(1);
        let from = &self.keys[next - 1];
        let to = &self.keys[next];

        let factor = inv_lerp(from.time.0, to.time.0, time.0).clamp(0.0, 1.0);
        // key values come back untouched at the interval ends
        if factor <= 0.0 { return Ok(from.value); }
        if factor >= 1.0 { return Ok(to.value); }
        Ok(T::interpolate(from.value, to.value, factor))
    }

    /// Like [`Self::try_sample`] but panics if `time` is out of range
    pub fn sample(&self, time: FTicks) -> T
    {
        match self.try_sample(time)
        {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}
