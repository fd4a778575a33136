mod dual_quat;
pub use dual_quat::*;

mod lerp;
pub use lerp::*;
