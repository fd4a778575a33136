use std::fmt::{Display, Formatter};
use std::ops::{Add, Mul, Neg};
use approx::{AbsDiffEq, RelativeEq};
use bitcode::{Decode, Encode};
use glam::{Mat4, Quat, Vec3};

/// A rigid transform (rotation + translation) as a dual quaternion.
/// `q` and `-q` encode the same transform; [`DualQuat::nearest_to`] picks between them.
#[derive(Debug, PartialEq, Clone, Copy, Encode, Decode)]
pub struct DualQuat
{
    real: Quat, // also called primal
    dual: Quat,
}
impl DualQuat
{
    pub const IDENTITY: Self = Self { real: Quat::IDENTITY, dual: Quat::from_xyzw(0.0, 0.0, 0.0, 0.0) };

    #[inline] #[must_use]
    pub fn from_rot_trans(rotation: Quat, translation: Vec3) -> Self
    {
        let dual = Quat::from_vec4(translation.extend(0.0)) * 0.5 * rotation;
        Self { real: rotation, dual }
    }

    #[inline] #[must_use]
    pub const fn from_parts(real: Quat, dual: Quat) -> Self { Self { real, dual } }

    #[inline] #[must_use] pub fn real(&self) -> Quat { self.real }
    #[inline] #[must_use] pub fn dual(&self) -> Quat { self.dual }

    #[inline] #[must_use] pub fn rotation(&self) -> Quat { self.real }
    #[inline] #[must_use] pub fn translation(&self) -> Vec3 { 2.0 * (self.dual * self.real.conjugate()).xyz() }

    #[inline] #[must_use] pub fn simple_length(&self) -> f32 { self.real.length() }
    #[inline] #[must_use] pub fn simple_length_squared(&self) -> f32 { self.real.length_squared() }

    #[inline] #[must_use]
    pub fn simple_normalized(&self) -> Self
    {
        let len = self.simple_length();
        Self { real: self.real / len, dual: self.dual / len }
    }
    /// Unit real part, and a dual part orthogonal to it
    #[inline] #[must_use]
    pub fn true_normalized(&self) -> Self
    {
        let real_len = self.real.length();
        let real_norm = self.real / real_len;
        Self
        {
            real: real_norm,
            dual: (self.dual / real_len) - real_norm * (self.real.dot(self.dual) / (real_len * real_len)),
        }
    }

    /// Dot product of the real parts
    #[inline] #[must_use]
    pub fn dot(&self, other: &Self) -> f32 { self.real.dot(other.real) }

    /// Whichever of `self` and `-self` lies in the same hemisphere as `reference`
    #[inline] #[must_use]
    pub fn nearest_to(self, reference: &Self) -> Self
    {
        if self.dot(reference) < 0.0 { -self } else { self }
    }

    /// `self * rhs`, with `rhs` sign-matched to `self` and the result renormalized.
    /// Used to accumulate transforms down a chain without sign flips or drift
    #[inline] #[must_use]
    pub fn chain(self, rhs: Self) -> Self
    {
        (self * rhs.nearest_to(&self)).true_normalized()
    }

    #[inline] #[must_use]
    pub fn conjugate(&self) -> Self
    {
        Self
        {
            real: self.real.conjugate(),
            dual: self.dual.conjugate(),
        }
    }
    #[inline] #[must_use]
    pub fn dual_number_conjugate(&self) -> Self
    {
        Self
        {
            real: self.real,
            dual: -self.dual,
        }
    }
    #[inline] #[must_use]
    pub fn combined_conjugate(&self) -> Self
    {
        Self
        {
            real: self.real.conjugate(),
            dual: -self.dual.conjugate(),
        }
    }

    #[inline] #[must_use]
    pub fn inverse(&self) -> Self
    {
        let real_inv = self.real.conjugate() / self.real.length_squared();
        Self
        {
            real: real_inv,
            dual: -(real_inv * self.dual * real_inv),
        }
    }

    #[inline] #[must_use]
    pub fn transform_point3(&self, point: Vec3) -> Vec3
    {
        self.real * point + self.translation()
    }

    #[inline] #[must_use]
    pub fn to_mat4(&self) -> Mat4
    {
        Mat4::from_rotation_translation(self.real.normalize(), self.translation())
    }
}
impl Default for DualQuat
{
    fn default() -> Self { Self::IDENTITY }
}
// Ignores scale
impl From<&Mat4> for DualQuat
{
    fn from(value: &Mat4) -> Self
    {
        let (_, rotation, translation) = value.to_scale_rotation_translation();
        Self::from_rot_trans(rotation.normalize(), translation)
    }
}
impl From<&DualQuat> for Mat4
{
    fn from(value: &DualQuat) -> Self { value.to_mat4() }
}

impl Mul<DualQuat> for DualQuat
{
    type Output = DualQuat;

    fn mul(self, rhs: DualQuat) -> Self::Output
    {
        Self::Output
        {
            real: self.real * rhs.real,
            dual: self.real * rhs.dual + self.dual * rhs.real,
        }
    }
}
impl Mul<f32> for DualQuat
{
    type Output = DualQuat;

    fn mul(self, scalar: f32) -> Self::Output
    {
        Self::Output
        {
            real: self.real * scalar,
            dual: self.dual * scalar,
        }
    }
}
impl Add<DualQuat> for DualQuat
{
    type Output = DualQuat;

    fn add(self, rhs: DualQuat) -> Self::Output
    {
        Self::Output
        {
            real: self.real + rhs.real,
            dual: self.dual + rhs.dual,
        }
    }
}
impl Neg for DualQuat
{
    type Output = DualQuat;

    fn neg(self) -> Self::Output
    {
        Self::Output
        {
            real: -self.real,
            dual: -self.dual,
        }
    }
}

impl Display for DualQuat
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        write!(f, "[r: {} d: {} | t: {}]", self.real, self.dual, self.translation())
    }
}

impl AbsDiffEq for DualQuat
{
    type Epsilon = f32;

    fn default_epsilon() -> Self::Epsilon { f32::EPSILON }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool
    {
        AbsDiffEq::abs_diff_eq(&self.real, &other.real, epsilon) &&
        AbsDiffEq::abs_diff_eq(&self.dual, &other.dual, epsilon)
    }
}
impl RelativeEq for DualQuat
{
    fn default_max_relative() -> Self::Epsilon { f32::EPSILON }

    fn relative_eq(&self, other: &Self, epsilon: Self::Epsilon, max_relative: Self::Epsilon) -> bool
    {
        RelativeEq::relative_eq(&self.real, &other.real, epsilon, max_relative) &&
        RelativeEq::relative_eq(&self.dual, &other.dual, epsilon, max_relative)
    }
}
