// Where `value` sits between `from` and `to`, 0 at `from` and 1 at `to`. A zero-width range maps to 0
#[inline] #[must_use]
pub fn inv_lerp(from: f32, to: f32, value: f32) -> f32
{
    let range = to - from;
    if range == 0.0 { 0.0 } else { (value - from) / range }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn relative_position()
    {
        assert_eq!(inv_lerp(2.0, 4.0, 3.0), 0.5);
        assert_eq!(inv_lerp(2.0, 4.0, 2.0), 0.0);
        assert_eq!(inv_lerp(2.0, 4.0, 4.0), 1.0);
    }

    #[test]
    fn degenerate_range()
    {
        assert_eq!(inv_lerp(5.0, 5.0, 5.0), 0.0);
    }
}
