use std::error::Error;
use std::path::Path;
use nab_marrow::timing::FTicks;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopBehavior
{
    #[default]
    Loop,
    StopAtLastFrame,
}
impl LoopBehavior
{
    /// Bring an absolute clip time into the clip's range. Clips with no duration always sample at 0
    #[must_use]
    pub fn wrap(self, time: FTicks, duration: FTicks) -> FTicks
    {
        if !(duration.0 > 0.0) || !time.0.is_finite()
        {
            return FTicks(0.0);
        }

        match self
        {
            LoopBehavior::Loop => FTicks(time.0.rem_euclid(duration.0)),
            LoopBehavior::StopAtLastFrame => FTicks(time.0.clamp(0.0, duration.0)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig
{
    /// Used for clips whose source reports a tick rate of 0
    pub default_ticks_per_second: f32,
    pub loop_behavior: LoopBehavior,
    /// Evaluate the subtrees under the hierarchy root on worker threads
    pub parallel_subtrees: bool,
}
impl Default for AnimationConfig
{
    fn default() -> Self
    {
        Self
        {
            default_ticks_per_second: 25.0,
            loop_behavior: LoopBehavior::Loop,
            parallel_subtrees: false,
        }
    }
}
impl AnimationConfig
{
    pub fn from_toml_str(toml: &str) -> Result<Self, toml::de::Error>
    {
        toml::from_str(toml)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>>
    {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("Loaded animation config from {:?}: {:?}", path.as_ref(), config);
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error>
    {
        toml::to_string(self)
    }

    #[inline] #[must_use]
    pub fn ticks_per_second_or_default(&self, ticks_per_second: f32) -> f32
    {
        if ticks_per_second > 0.0 { ticks_per_second } else { self.default_ticks_per_second }
    }
}
