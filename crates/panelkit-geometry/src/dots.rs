//! Dot generator
//!
//! Walks the arc length of a path at a fixed pitch and emits evenly spaced
//! points for mouse-bite drill hits or flashes.
//!
//! Rules at primitive boundaries:
//! - inside a path, a primitive keeps placing dots while the travel is less
//!   than half the width past its end; the unconsumed remainder carries over
//!   to the next primitive.
//! - the last primitive of an open path never places a dot past its end.
//! - the last primitive of a closed path stops half a pitch before the join,
//!   so no dot lands within half a pitch of the first dot.
//!
//! Circles and full arcs never take part.

use crate::path::Path;
use panelkit_core::Point;

/// Extra reach at the end of an open path so a dot landing exactly on the
/// final endpoint survives floating-point noise.
const END_SLACK: f64 = 1e-9;

/// Evenly spaced points along `path`.
///
/// Returns nothing for a non-positive pitch.
pub fn generate_dots(path: &Path, pitch: f64, width: f64) -> Vec<Point> {
    let mut dots = Vec::new();
    if pitch <= 0.0 || !pitch.is_finite() {
        return dots;
    }

    let closed = path.is_closed();
    let primitives = path.primitives();
    let last = primitives.len().saturating_sub(1);
    let mut carry = 0.0;

    for (idx, primitive) in primitives.iter().enumerate() {
        if primitive.is_closed() {
            continue;
        }
        let length = primitive.length();
        let limit = if idx < last {
            length + width / 2.0
        } else if closed {
            length - pitch / 2.0
        } else {
            length + path.error_range().max(END_SLACK)
        };

        let mut travel = carry;
        while travel < limit {
            dots.push(primitive.point_at(travel));
            travel += pitch;
        }
        carry = travel - length;
    }

    dots
}

/// Dots for every path, in path order.
pub fn generate_dots_for<'a>(
    paths: impl IntoIterator<Item = &'a Path>,
    pitch: f64,
    width: f64,
) -> Vec<Point> {
    paths
        .into_iter()
        .flat_map(|path| generate_dots(path, pitch, width))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::{Arc, Circle, GraphicPrimitive, Line};
    use panelkit_core::is_equal_point;

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> GraphicPrimitive {
        GraphicPrimitive::Line(Line::new(Point::new(x0, y0), Point::new(x1, y1)))
    }

    #[test]
    fn test_full_circle_yields_no_dots() {
        let circle = GraphicPrimitive::Circle(Circle::new(Point::origin(), 5.0));
        assert!(generate_dots(&Path::new(circle, 0.001), 1.0, 0.5).is_empty());

        let full_arc = GraphicPrimitive::Arc(Arc::from_angles(Point::origin(), 5.0, 0.0, 360.0, true));
        assert!(generate_dots(&Path::new(full_arc, 0.001), 1.0, 0.5).is_empty());
    }

    #[test]
    fn test_open_line_stops_at_end() {
        let path = Path::new(line(0.0, 0.0, 10.0, 0.0), 0.001);
        let dots = generate_dots(&path, 1.0, 0.5);
        assert_eq!(dots.len(), 11);
        assert!(is_equal_point(dots[10], Point::new(10.0, 0.0), 1e-9));

        let dots = generate_dots(&path, 3.0, 0.5);
        assert_eq!(dots.len(), 4);
        assert!(dots.iter().all(|p| p.x <= 10.0));
    }

    #[test]
    fn test_remainder_carries_across_primitives() {
        let path = Path::from_primitives(
            vec![line(0.0, 0.0, 2.5, 0.0), line(2.5, 0.0, 2.5, 5.0)],
            0.001,
        )
        .unwrap();
        let dots = generate_dots(&path, 1.0, 0.0);
        // 0, 1, 2 on the first leg then 0.5, 1.5 .. 4.5 on the second
        assert_eq!(dots.len(), 8);
        assert!(is_equal_point(dots[3], Point::new(2.5, 0.5), 1e-9));
        assert!(is_equal_point(dots[7], Point::new(2.5, 4.5), 1e-9));
    }

    #[test]
    fn test_closed_square_has_no_duplicate_at_join() {
        let path = Path::from_primitives(
            vec![
                line(0.0, 0.0, 4.0, 0.0),
                line(4.0, 0.0, 4.0, 4.0),
                line(4.0, 4.0, 0.0, 4.0),
                line(0.0, 4.0, 0.0, 0.0),
            ],
            0.001,
        )
        .unwrap();
        let dots = generate_dots(&path, 1.0, 0.0);
        assert_eq!(dots.len(), 16);
        let first = dots[0];
        for dot in &dots[1..] {
            assert!(dot.distance_to(&first) >= 0.5);
        }
    }

    #[test]
    fn test_arc_dots_follow_radius() {
        let arc = GraphicPrimitive::Arc(Arc::from_angles(Point::origin(), 2.0, 0.0, 180.0, true));
        let dots = generate_dots(&Path::new(arc, 0.001), 1.0, 0.0);
        assert_eq!(dots.len(), 7);
        for dot in &dots {
            assert!((dot.distance_to(&Point::origin()) - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_non_positive_pitch() {
        let path = Path::new(line(0.0, 0.0, 1.0, 0.0), 0.001);
        assert!(generate_dots(&path, 0.0, 0.5).is_empty());
    }
}
