//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Wrap an angle into the range (-pi, pi].
pub fn wrap_to_pi<T>(angle: T) -> T
where
    T: Float
{
    let pi_t = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    // [-pi, pi) first, then move the lower bound across
    let wrapped = rem_euclid(angle + pi_t, tau_t) - pi_t;

    if wrapped <= -pi_t {
        wrapped + tau_t
    }
    else {
        wrapped
    }
}

/// Get the signed shortest angular distance from `a` to `b`, in the range (-pi, pi].
///
/// Positive results mean `b` lies anticlockwise of `a`.
pub fn get_ang_dist<T>(a: T, b: T) -> T
where
    T: Float
{
    wrap_to_pi(b - a)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

#[cfg(test)]
mod test {
    use super::*;

    const PI: f64 = std::f64::consts::PI;
    const TAU: f64 = std::f64::consts::TAU;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_wrap_to_pi() {
        assert!(close(wrap_to_pi(0.0), 0.0));
        assert!(close(wrap_to_pi(PI), PI));
        assert!(close(wrap_to_pi(-PI), PI));
        assert!(close(wrap_to_pi(TAU + 1.0), 1.0));
        assert!(close(wrap_to_pi(-TAU - 1.0), -1.0));
        assert!(close(wrap_to_pi(3.0 * PI / 2.0), -PI / 2.0));

        for i in -40..40 {
            let a = wrap_to_pi(i as f64 * 0.7);
            assert!(a > -PI && a <= PI);
        }
    }

    #[test]
    fn test_get_ang_dist() {
        assert!(close(get_ang_dist(1.0, 2.0), 1.0));
        assert!(close(get_ang_dist(2.0, 1.0), -1.0));
        assert!(close(get_ang_dist(0.0, TAU), 0.0));
        assert!(close(get_ang_dist(PI - 0.1, -PI + 0.1), 0.2));
    }
}
