//! Convex hull of a planar point set (Andrew's monotone chain)

use nalgebra::Vector2;
use ordered_float::OrderedFloat;

/// Compute the convex hull of the points, counter-clockwise, without repeating the first point.
///
/// Collinear boundary points are dropped. Inputs of fewer than three distinct points are
/// returned deduplicated and sorted.
pub fn convex_hull(points: &[Vector2<f64>]) -> Vec<Vector2<f64>> {
    let mut pts: Vec<Vector2<f64>> = points.to_vec();
    pts.sort_by_key(|p| (OrderedFloat(p.x), OrderedFloat(p.y)));
    pts.dedup();

    if pts.len() < 3 {
        return pts;
    }

    let mut lower: Vec<Vector2<f64>> = Vec::with_capacity(pts.len());
    for p in pts.iter() {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0
        {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Vector2<f64>> = Vec::with_capacity(pts.len());
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0
        {
            upper.pop();
        }
        upper.push(*p);
    }

    // Last point of each chain is the first of the other
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Z component of (a - o) x (b - o)
fn cross(o: &Vector2<f64>, a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_square_with_interior() {
        let pts = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(2.0, 0.0),
            Vector2::new(2.0, 2.0),
            Vector2::new(0.0, 2.0),
            Vector2::new(1.0, 0.0),
        ];

        let hull = convex_hull(&pts);

        assert_eq!(
            hull,
            vec![
                Vector2::new(0.0, 0.0),
                Vector2::new(2.0, 0.0),
                Vector2::new(2.0, 2.0),
                Vector2::new(0.0, 2.0),
            ]
        );
    }

    #[test]
    fn test_degenerate() {
        assert!(convex_hull(&[]).is_empty());

        let two = convex_hull(&[Vector2::new(1.0, 0.0), Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0)]);
        assert_eq!(two, vec![Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0)]);

        let line = convex_hull(&[
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(2.0, 0.0),
        ]);
        assert_eq!(line, vec![Vector2::new(0.0, 0.0), Vector2::new(2.0, 0.0)]);
    }
}
