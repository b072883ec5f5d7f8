//! Contiguous runs of primitives.

use crate::primitive::GraphicPrimitive;
use panelkit_core::{is_equal_point, Point, Transform};
use serde::{Deserialize, Serialize};

/// An ordered, end-to-start connected sequence of primitives.
///
/// A path is never empty. Its `error_range` travels with it and is
/// rescaled together with the geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    primitives: Vec<GraphicPrimitive>,
    error_range: f64,
}

impl Path {
    pub fn new(primitive: GraphicPrimitive, error_range: f64) -> Self {
        Self {
            primitives: vec![primitive],
            error_range,
        }
    }

    /// Path over already-connected primitives. Returns `None` when empty.
    pub fn from_primitives(primitives: Vec<GraphicPrimitive>, error_range: f64) -> Option<Self> {
        if primitives.is_empty() {
            return None;
        }
        Some(Self {
            primitives,
            error_range,
        })
    }

    pub fn primitives(&self) -> &[GraphicPrimitive] {
        &self.primitives
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn error_range(&self) -> f64 {
        self.error_range
    }

    pub fn start(&self) -> Point {
        self.primitives
            .first()
            .map(GraphicPrimitive::start)
            .unwrap_or_default()
    }

    pub fn end(&self) -> Point {
        self.primitives
            .last()
            .map(GraphicPrimitive::end)
            .unwrap_or_default()
    }

    /// Start and end coincide within the path's error range. A single
    /// primitive only closes a path when it is a circle or full arc.
    pub fn is_closed(&self) -> bool {
        if self.primitives.len() == 1 {
            return self.is_intrinsically_closed();
        }
        is_equal_point(self.start(), self.end(), self.error_range)
    }

    /// The path is a single circle or full arc.
    pub fn is_intrinsically_closed(&self) -> bool {
        self.primitives.len() == 1 && self.primitives[0].is_closed()
    }

    pub fn length(&self) -> f64 {
        self.primitives.iter().map(GraphicPrimitive::length).sum()
    }

    /// Reverse the traversal direction.
    pub fn reverse(&mut self) {
        self.primitives.reverse();
        for primitive in &mut self.primitives {
            primitive.reverse();
        }
    }

    /// Element-wise equality, forward or reversed.
    pub fn is_equal_to(&self, other: &Path, error_range: f64) -> bool {
        if self.primitives.len() != other.primitives.len() {
            return false;
        }
        let forward = self
            .primitives
            .iter()
            .zip(&other.primitives)
            .all(|(a, b)| a.is_equal_to(b, error_range));
        forward
            || self
                .primitives
                .iter()
                .zip(other.primitives.iter().rev())
                .all(|(a, b)| a.is_equal_to(b, error_range))
    }

    /// Equality of closed contours regardless of where traversal starts.
    pub fn is_same_contour(&self, other: &Path, error_range: f64) -> bool {
        let n = self.primitives.len();
        if n != other.primitives.len() {
            return false;
        }
        (0..n).any(|shift| {
            let forward = (0..n).all(|k| {
                self.primitives[k].is_equal_to(&other.primitives[(k + shift) % n], error_range)
            });
            forward
                || (0..n).all(|k| {
                    self.primitives[k]
                        .is_equal_to(&other.primitives[(shift + n - k) % n], error_range)
                })
        })
    }

    /// Whether any primitive of this path matches `primitive`.
    pub fn contains(&self, primitive: &GraphicPrimitive, error_range: f64) -> bool {
        self.primitives
            .iter()
            .any(|p| p.is_equal_to(primitive, error_range))
    }

    /// Join `other` onto this path at a shared endpoint.
    ///
    /// Endpoints are tried in order end->start, end->end, start->end,
    /// start->start; the last two prepend. Closed paths never merge.
    /// Returns `false` and leaves `self` untouched when no join applies.
    pub fn merge(&mut self, other: &Path) -> bool {
        if self.is_closed() || other.is_closed() {
            return false;
        }
        let eps = self.error_range;
        if is_equal_point(self.end(), other.start(), eps) {
            self.append(other.clone())
        } else if is_equal_point(self.end(), other.end(), eps) {
            let mut other = other.clone();
            other.reverse();
            self.append(other)
        } else if is_equal_point(self.start(), other.end(), eps) {
            self.prepend(other.clone())
        } else if is_equal_point(self.start(), other.start(), eps) {
            let mut other = other.clone();
            other.reverse();
            self.prepend(other)
        } else {
            false
        }
    }

    fn append(&mut self, other: Path) -> bool {
        if self.is_equal_to(&other, self.error_range) {
            return false;
        }
        match splice(&self.primitives, &other.primitives, self.error_range) {
            Some(joined) => {
                self.primitives = joined;
                true
            }
            None => false,
        }
    }

    fn prepend(&mut self, other: Path) -> bool {
        if self.is_equal_to(&other, self.error_range) {
            return false;
        }
        match splice(&other.primitives, &self.primitives, self.error_range) {
            Some(joined) => {
                self.primitives = joined;
                true
            }
            None => false,
        }
    }
}

/// Concatenate `front` and `back`, dropping the overlap they share.
///
/// The tail of `front` may retrace the head of `back`, and the head of
/// `front` may retrace the tail of `back`; both copies of a retraced
/// primitive are removed. When the overlap would consume either side
/// entirely the join is refused.
fn splice(
    front: &[GraphicPrimitive],
    back: &[GraphicPrimitive],
    error_range: f64,
) -> Option<Vec<GraphicPrimitive>> {
    let n = front.len();
    let m = back.len();
    let limit = n.min(m);
    let tail = (0..limit)
        .take_while(|&k| front[n - 1 - k].is_equal_to(&back[k], error_range))
        .count();
    let head = (0..limit)
        .take_while(|&k| front[k].is_equal_to(&back[m - 1 - k], error_range))
        .count();
    if tail + head >= n || tail + head >= m {
        return None;
    }
    let mut joined = Vec::with_capacity(n + m - 2 * (tail + head));
    joined.extend_from_slice(&front[head..n - tail]);
    joined.extend_from_slice(&back[tail..m - head]);
    Some(joined)
}

impl Transform for Path {
    fn offset(&mut self, dx: f64, dy: f64) {
        for primitive in &mut self.primitives {
            primitive.offset(dx, dy);
        }
    }

    fn rotate(&mut self, angle: f64, center: Point) {
        for primitive in &mut self.primitives {
            primitive.rotate(angle, center);
        }
    }

    fn scale(&mut self, factor: f64) {
        for primitive in &mut self.primitives {
            primitive.scale(factor);
        }
        self.error_range *= factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::Line;

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> GraphicPrimitive {
        GraphicPrimitive::Line(Line::new(Point::new(x0, y0), Point::new(x1, y1)))
    }

    fn path(prims: Vec<GraphicPrimitive>) -> Path {
        Path::from_primitives(prims, 0.001).unwrap()
    }

    #[test]
    fn test_merge_end_to_start() {
        let mut a = path(vec![line(0.0, 0.0, 1.0, 0.0)]);
        let b = path(vec![line(1.0, 0.0, 1.0, 1.0)]);
        assert!(a.merge(&b));
        assert_eq!(a.len(), 2);
        assert_eq!(a.end(), Point::new(1.0, 1.0));
    }

    #[test]
    fn test_merge_reverses_end_to_end() {
        let mut a = path(vec![line(0.0, 0.0, 1.0, 0.0)]);
        let b = path(vec![line(1.0, 1.0, 1.0, 0.0)]);
        assert!(a.merge(&b));
        assert_eq!(a.start(), Point::new(0.0, 0.0));
        assert_eq!(a.end(), Point::new(1.0, 1.0));
    }

    #[test]
    fn test_merge_prepends() {
        let mut a = path(vec![line(1.0, 0.0, 2.0, 0.0)]);
        let b = path(vec![line(0.0, 0.0, 1.0, 0.0)]);
        assert!(a.merge(&b));
        assert_eq!(a.start(), Point::new(0.0, 0.0));

        let mut c = path(vec![line(1.0, 0.0, 2.0, 0.0)]);
        let d = path(vec![line(1.0, 0.0, 0.0, 0.0)]);
        assert!(c.merge(&d));
        assert_eq!(c.start(), Point::new(0.0, 0.0));
        assert_eq!(c.end(), Point::new(2.0, 0.0));
    }

    #[test]
    fn test_merge_refuses_duplicate_and_disjoint() {
        let mut a = path(vec![line(0.0, 0.0, 1.0, 0.0)]);
        let b = path(vec![line(1.0, 0.0, 0.0, 0.0)]);
        assert!(!a.merge(&b));
        let c = path(vec![line(5.0, 5.0, 6.0, 6.0)]);
        assert!(!a.merge(&c));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_merge_strips_shared_overlap() {
        // a: A B, b: B C, joined end-to-start after dropping the retraced B
        let mut a = path(vec![line(0.0, 0.0, 1.0, 0.0), line(1.0, 0.0, 2.0, 0.0)]);
        let b = path(vec![line(2.0, 0.0, 1.0, 0.0), line(1.0, 0.0, 1.0, 1.0)]);
        assert!(a.merge(&b));
        assert_eq!(a.len(), 2);
        assert_eq!(a.end(), Point::new(1.0, 1.0));
    }

    #[test]
    fn test_closed_paths_do_not_merge() {
        let mut square = path(vec![
            line(0.0, 0.0, 1.0, 0.0),
            line(1.0, 0.0, 1.0, 1.0),
            line(1.0, 1.0, 0.0, 1.0),
            line(0.0, 1.0, 0.0, 0.0),
        ]);
        assert!(square.is_closed());
        assert!(!square.merge(&path(vec![line(0.0, 0.0, -1.0, 0.0)])));
    }

    #[test]
    fn test_single_primitive_closes_only_as_circle() {
        let point = path(vec![line(2.0, 2.0, 2.0, 2.0)]);
        assert!(!point.is_closed());

        let circle = path(vec![GraphicPrimitive::Circle(crate::primitive::Circle::new(
            Point::new(0.0, 0.0),
            1.0,
        ))]);
        assert!(circle.is_closed());
    }

    #[test]
    fn test_same_contour_ignores_start_and_direction() {
        let a = path(vec![
            line(0.0, 0.0, 1.0, 0.0),
            line(1.0, 0.0, 1.0, 1.0),
            line(1.0, 1.0, 0.0, 0.0),
        ]);
        let mut b = path(vec![
            line(1.0, 0.0, 1.0, 1.0),
            line(1.0, 1.0, 0.0, 0.0),
            line(0.0, 0.0, 1.0, 0.0),
        ]);
        assert!(!a.is_equal_to(&b, 0.001));
        assert!(a.is_same_contour(&b, 0.001));
        b.reverse();
        assert!(a.is_same_contour(&b, 0.001));
    }

    #[test]
    fn test_scale_rescales_error_range() {
        let mut a = path(vec![line(0.0, 0.0, 1.0, 0.0)]);
        a.scale(25.4);
        assert!((a.error_range() - 0.0254).abs() < 1e-12);
        assert!((a.length() - 25.4).abs() < 1e-12);
    }
}
