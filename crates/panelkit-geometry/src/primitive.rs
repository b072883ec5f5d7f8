//! Geometric primitive adapter.
//!
//! Wraps each CAD entity supplied by the parsing layer in a uniform
//! [`GraphicPrimitive`] exposing endpoints, closure, tolerance-aware
//! equality, reversal and the in-place transforms. Polylines are
//! disassembled into elementary line and arc segments at ingestion.

use panelkit_core::{is_equal_point, is_equal_value, Point, Transform};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Sweeps within this many degrees of a full turn count as closed.
const FULL_TURN_EPSILON: f64 = 1e-9;

/// A straight segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub start: Point,
    pub end: Point,
}

impl Line {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    /// Point at `distance` from the start along the line direction.
    ///
    /// Distances past the end extrapolate along the same direction.
    pub fn point_at(&self, distance: f64) -> Point {
        let length = self.length();
        if length == 0.0 {
            return self.start;
        }
        let t = distance / length;
        Point::new(
            self.start.x + (self.end.x - self.start.x) * t,
            self.start.y + (self.end.y - self.start.y) * t,
        )
    }

    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.start, &mut self.end);
    }
}

/// A circular arc.
///
/// `start_angle`/`end_angle` are absolute bearings in degrees. The endpoints
/// are stored alongside the angles and kept in sync by every transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub center: Point,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    /// Counter-clockwise travel from start to end.
    pub ccw: bool,
    pub start: Point,
    pub end: Point,
}

impl Arc {
    /// Arc from its center, radius and bearings. Endpoints are derived.
    pub fn from_angles(center: Point, radius: f64, start_angle: f64, end_angle: f64, ccw: bool) -> Self {
        Self {
            center,
            radius,
            start_angle,
            end_angle,
            ccw,
            start: polar(center, radius, start_angle),
            end: polar(center, radius, end_angle),
        }
    }

    /// Arc spanning the chord `start -> end` with the given polyline bulge.
    ///
    /// The included angle is `4 * atan(bulge)`; the center lies on the
    /// perpendicular bisector of the chord. Positive bulge is counter-clockwise.
    pub fn from_bulge(start: Point, end: Point, bulge: f64) -> Self {
        let angle = 4.0 * bulge.atan();
        let t = 1.0 / (angle / 2.0).tan();
        let center = Point::new(
            (start.x + end.x - t * (end.y - start.y)) / 2.0,
            (start.y + end.y + t * (end.x - start.x)) / 2.0,
        );
        let radius = start.distance_to(&center);
        Self {
            center,
            radius,
            start_angle: bearing(center, start),
            end_angle: bearing(center, end),
            ccw: angle > 0.0,
            start,
            end,
        }
    }

    /// Swept angle in degrees, in `(0, 360]`.
    pub fn sweep(&self) -> f64 {
        let raw = if self.ccw {
            self.end_angle - self.start_angle
        } else {
            self.start_angle - self.end_angle
        };
        let sweep = raw.rem_euclid(360.0);
        if sweep <= FULL_TURN_EPSILON {
            if raw.abs() <= FULL_TURN_EPSILON {
                // degenerate zero-length arc
                0.0
            } else {
                360.0
            }
        } else {
            sweep
        }
    }

    pub fn length(&self) -> f64 {
        self.radius * self.sweep().to_radians()
    }

    pub fn is_full(&self) -> bool {
        self.sweep() >= 360.0 - FULL_TURN_EPSILON
    }

    /// Point at arc length `distance` from the start, continuing past the end.
    pub fn point_at(&self, distance: f64) -> Point {
        if self.radius == 0.0 {
            return self.center;
        }
        let delta = (distance / self.radius).to_degrees();
        let angle = if self.ccw {
            self.start_angle + delta
        } else {
            self.start_angle - delta
        };
        polar(self.center, self.radius, angle)
    }

    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.start, &mut self.end);
        std::mem::swap(&mut self.start_angle, &mut self.end_angle);
        self.ccw = !self.ccw;
    }
}

/// A full circle. Its start and end coincide at bearing 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Point, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn start(&self) -> Point {
        Point::new(self.center.x + self.radius, self.center.y)
    }

    pub fn length(&self) -> f64 {
        2.0 * PI * self.radius
    }
}

/// Uniform shape over every drawable entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GraphicPrimitive {
    Line(Line),
    Arc(Arc),
    Circle(Circle),
}

impl GraphicPrimitive {
    pub fn start(&self) -> Point {
        match self {
            Self::Line(line) => line.start,
            Self::Arc(arc) => arc.start,
            Self::Circle(circle) => circle.start(),
        }
    }

    pub fn end(&self) -> Point {
        match self {
            Self::Line(line) => line.end,
            Self::Arc(arc) => arc.end,
            Self::Circle(circle) => circle.start(),
        }
    }

    /// Intrinsic closure: full circles and arcs sweeping a whole turn.
    pub fn is_closed(&self) -> bool {
        match self {
            Self::Line(_) => false,
            Self::Arc(arc) => arc.is_full(),
            Self::Circle(_) => true,
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            Self::Line(line) => line.length(),
            Self::Arc(arc) => arc.length(),
            Self::Circle(circle) => circle.length(),
        }
    }

    pub fn point_at(&self, distance: f64) -> Point {
        match self {
            Self::Line(line) => line.point_at(distance),
            Self::Arc(arc) => arc.point_at(distance),
            Self::Circle(circle) => {
                let angle = if circle.radius == 0.0 {
                    0.0
                } else {
                    (distance / circle.radius).to_degrees()
                };
                polar(circle.center, circle.radius, angle)
            }
        }
    }

    pub fn reverse(&mut self) {
        match self {
            Self::Line(line) => line.reverse(),
            Self::Arc(arc) => arc.reverse(),
            Self::Circle(_) => {}
        }
    }

    /// Geometric equality within `error_range`, in either traversal direction.
    pub fn is_equal_to(&self, other: &GraphicPrimitive, error_range: f64) -> bool {
        match (self, other) {
            (Self::Line(a), Self::Line(b)) => {
                (is_equal_point(a.start, b.start, error_range)
                    && is_equal_point(a.end, b.end, error_range))
                    || (is_equal_point(a.start, b.end, error_range)
                        && is_equal_point(a.end, b.start, error_range))
            }
            (Self::Arc(a), Self::Arc(b)) => {
                if !is_equal_point(a.center, b.center, error_range)
                    || !is_equal_value(a.radius, b.radius, error_range)
                {
                    return false;
                }
                let forward = is_equal_point(a.start, b.start, error_range)
                    && is_equal_point(a.end, b.end, error_range)
                    && a.ccw == b.ccw;
                let backward = is_equal_point(a.start, b.end, error_range)
                    && is_equal_point(a.end, b.start, error_range)
                    && a.ccw != b.ccw;
                forward || backward
            }
            (Self::Circle(a), Self::Circle(b)) => {
                is_equal_point(a.center, b.center, error_range)
                    && is_equal_value(a.radius, b.radius, error_range)
            }
            _ => false,
        }
    }
}

impl Transform for GraphicPrimitive {
    fn offset(&mut self, dx: f64, dy: f64) {
        match self {
            Self::Line(line) => {
                line.start = line.start.offset(dx, dy);
                line.end = line.end.offset(dx, dy);
            }
            Self::Arc(arc) => {
                arc.center = arc.center.offset(dx, dy);
                arc.start = arc.start.offset(dx, dy);
                arc.end = arc.end.offset(dx, dy);
            }
            Self::Circle(circle) => {
                circle.center = circle.center.offset(dx, dy);
            }
        }
    }

    fn rotate(&mut self, angle: f64, center: Point) {
        match self {
            Self::Line(line) => {
                line.start = line.start.rotated(angle, center);
                line.end = line.end.rotated(angle, center);
            }
            Self::Arc(arc) => {
                // bearings are absolute, shift them rather than recomputing
                arc.center = arc.center.rotated(angle, center);
                arc.start = arc.start.rotated(angle, center);
                arc.end = arc.end.rotated(angle, center);
                arc.start_angle += angle;
                arc.end_angle += angle;
            }
            Self::Circle(circle) => {
                circle.center = circle.center.rotated(angle, center);
            }
        }
    }

    fn scale(&mut self, factor: f64) {
        match self {
            Self::Line(line) => {
                line.start = line.start.scaled(factor);
                line.end = line.end.scaled(factor);
            }
            Self::Arc(arc) => {
                arc.center = arc.center.scaled(factor);
                arc.radius *= factor;
                arc.start = arc.start.scaled(factor);
                arc.end = arc.end.scaled(factor);
            }
            Self::Circle(circle) => {
                circle.center = circle.center.scaled(factor);
                circle.radius *= factor;
            }
        }
    }
}

/// One vertex of a lightweight polyline. `bulge` describes the segment
/// leaving this vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolylineVertex {
    pub point: Point,
    pub bulge: f64,
}

impl PolylineVertex {
    pub fn new(x: f64, y: f64, bulge: f64) -> Self {
        Self {
            point: Point::new(x, y),
            bulge,
        }
    }
}

/// A CAD entity as delivered by the parsing layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CadEntity {
    Line {
        start: Point,
        end: Point,
    },
    /// Counter-clockwise arc between two bearings in degrees.
    Arc {
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
    Circle {
        center: Point,
        radius: f64,
    },
    Polyline {
        vertices: Vec<PolylineVertex>,
        closed: bool,
    },
}

impl CadEntity {
    pub fn is_polyline(&self) -> bool {
        matches!(self, Self::Polyline { .. })
    }

    /// Adapt the entity into elementary primitives.
    ///
    /// Lines, arcs and circles map one-to-one; a polyline yields one
    /// segment per vertex pair, plus the closing segment when closed.
    pub fn decompose(&self) -> Vec<GraphicPrimitive> {
        match self {
            Self::Line { start, end } => vec![GraphicPrimitive::Line(Line::new(*start, *end))],
            Self::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            } => vec![GraphicPrimitive::Arc(Arc::from_angles(
                *center,
                *radius,
                *start_angle,
                *end_angle,
                true,
            ))],
            Self::Circle { center, radius } => {
                vec![GraphicPrimitive::Circle(Circle::new(*center, *radius))]
            }
            Self::Polyline { vertices, closed } => decompose_polyline(vertices, *closed),
        }
    }
}

fn decompose_polyline(vertices: &[PolylineVertex], closed: bool) -> Vec<GraphicPrimitive> {
    let count = vertices.len();
    if count < 2 {
        return Vec::new();
    }
    let segments = if closed { count } else { count - 1 };
    (0..segments)
        .map(|idx| {
            let from = vertices[idx];
            let to = vertices[(idx + 1) % count];
            if from.bulge == 0.0 {
                GraphicPrimitive::Line(Line::new(from.point, to.point))
            } else {
                GraphicPrimitive::Arc(Arc::from_bulge(from.point, to.point, from.bulge))
            }
        })
        .collect()
}

fn polar(center: Point, radius: f64, angle_deg: f64) -> Point {
    let rad = angle_deg.to_radians();
    Point::new(center.x + radius * rad.cos(), center.y + radius * rad.sin())
}

fn bearing(center: Point, p: Point) -> f64 {
    (p.y - center.y).atan2(p.x - center.x).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_line_equality_ignores_direction() {
        let a = GraphicPrimitive::Line(Line::new(Point::new(0.0, 0.0), Point::new(1.0, 0.0)));
        let b = GraphicPrimitive::Line(Line::new(Point::new(1.0, 0.0005), Point::new(0.0, 0.0)));
        assert!(a.is_equal_to(&b, 0.001));
        assert!(!a.is_equal_to(&b, 0.0001));
    }

    #[test]
    fn test_arc_sweep_and_length() {
        let arc = Arc::from_angles(Point::origin(), 2.0, 0.0, 90.0, true);
        assert!((arc.sweep() - 90.0).abs() < EPS);
        assert!((arc.length() - PI).abs() < EPS);
        assert!(is_equal_point(arc.end, Point::new(0.0, 2.0), EPS));

        let mut reversed = arc;
        reversed.reverse();
        assert!((reversed.sweep() - 90.0).abs() < EPS);
        assert!(GraphicPrimitive::Arc(arc).is_equal_to(&GraphicPrimitive::Arc(reversed), EPS));
    }

    #[test]
    fn test_full_arc_is_closed() {
        let arc = GraphicPrimitive::Arc(Arc::from_angles(Point::origin(), 1.0, 0.0, 360.0, true));
        assert!(arc.is_closed());
        let half = GraphicPrimitive::Arc(Arc::from_angles(Point::origin(), 1.0, 0.0, 180.0, true));
        assert!(!half.is_closed());
    }

    #[test]
    fn test_bulge_semicircle() {
        let arc = Arc::from_bulge(Point::new(0.0, 0.0), Point::new(2.0, 0.0), 1.0);
        assert!(is_equal_point(arc.center, Point::new(1.0, 0.0), 1e-9));
        assert!((arc.radius - 1.0).abs() < EPS);
        assert!(arc.ccw);
        assert!((arc.sweep() - 180.0).abs() < 1e-6);
        // counter-clockwise from 180 degrees passes below the chord
        let mid = arc.point_at(arc.length() / 2.0);
        assert!(is_equal_point(mid, Point::new(1.0, -1.0), 1e-9));
    }

    #[test]
    fn test_polyline_decomposition() {
        let entity = CadEntity::Polyline {
            vertices: vec![
                PolylineVertex::new(0.0, 0.0, 0.0),
                PolylineVertex::new(4.0, 0.0, 0.0),
                PolylineVertex::new(4.0, 4.0, -0.5),
            ],
            closed: true,
        };
        let parts = entity.decompose();
        assert_eq!(parts.len(), 3);
        assert!(matches!(parts[0], GraphicPrimitive::Line(_)));
        assert!(matches!(parts[2], GraphicPrimitive::Arc(a) if !a.ccw));
        assert!(is_equal_point(parts[2].end(), Point::new(0.0, 0.0), 1e-9));
    }

    #[test]
    fn test_rotate_arc_shifts_bearings() {
        let mut prim =
            GraphicPrimitive::Arc(Arc::from_angles(Point::new(1.0, 0.0), 1.0, 0.0, 90.0, true));
        prim.rotate(90.0, Point::origin());
        let GraphicPrimitive::Arc(arc) = prim else {
            panic!("expected arc");
        };
        assert!((arc.start_angle - 90.0).abs() < EPS);
        assert!((arc.end_angle - 180.0).abs() < EPS);
        assert!(is_equal_point(arc.center, Point::new(0.0, 1.0), 1e-9));
        assert!(is_equal_point(arc.start, Point::new(0.0, 2.0), 1e-9));
        assert!(is_equal_point(arc.end, Point::new(-1.0, 1.0), 1e-9));
    }
}
