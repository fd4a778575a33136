use std::cmp::Ordering;
use std::ops::{Add, Div, Mul, Sub};
use std::time::Duration;
use bitcode::{Decode, Encode};

macro_rules! generate_time_primitive
{
    ($name:ident, $type:ty) =>
    {
        #[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd, Encode, Decode)]
        pub struct $name(pub $type);
        impl Ord for $name
        {
            fn cmp(&self, other: &Self) -> Ordering
            {
                self.0.total_cmp(&other.0)
            }
        }
        impl Eq for $name { }
        impl Add for $name
        {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output { Self(self.0 + rhs.0) }
        }
        impl Sub for $name
        {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output { Self(self.0 - rhs.0) }
        }
        impl Mul for $name
        {
            type Output = Self;
            fn mul(self, rhs: Self) -> Self::Output { Self(self.0 * rhs.0) }
        }
        impl Div for $name
        {
            type Output = Self;
            fn div(self, rhs: Self) -> Self::Output { Self(self.0 / rhs.0) }
        }
    };
}

generate_time_primitive!(FSeconds, f32);
// animation clip-local time, in the clip's own tick rate
generate_time_primitive!(FTicks, f32);

impl From<FSeconds> for Duration { fn from(sec: FSeconds) -> Self { Self::from_secs_f32(sec.0) } }
impl From<Duration> for FSeconds { fn from(duration: Duration) -> Self { Self(duration.as_secs_f32()) } }

impl FSeconds
{
    #[inline] #[must_use]
    pub fn to_ticks(self, ticks_per_second: f32) -> FTicks { FTicks(self.0 * ticks_per_second) }
}
impl FTicks
{
    #[inline] #[must_use]
    pub fn to_seconds(self, ticks_per_second: f32) -> FSeconds { FSeconds(self.0 / ticks_per_second) }
}
