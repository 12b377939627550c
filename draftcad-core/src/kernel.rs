//! Closed-form 2D constructions shared by the editing commands.
//!
//! Every function is pure. Near-degenerate input yields an explicit
//! [`Degenerate`] or an empty result, never NaN geometry.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{Arc, EntityKind};
use crate::geometry::{Point2, Vector2};

/// Determinant threshold below which lines or point triples are treated as degenerate.
pub const EPSILON: f64 = 1e-10;

/// Parameter slack for segment containment.
pub const SEGMENT_SLACK: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Degenerate {
    #[error("the three points are collinear")]
    Collinear,
    #[error("the lines are parallel")]
    Parallel,
    #[error("zero-length vector")]
    ZeroLength,
}

/// Circle through three points. Angles are radians; `start_angle` is always p1's angle
/// and a clockwise traversal p1 → p2 → p3 is encoded as `end_angle < start_angle`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleFit {
    pub center: Point2,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
}

impl CircleFit {
    #[inline]
    pub fn is_clockwise(&self) -> bool {
        self.end_angle < self.start_angle
    }

    /// Counter-clockwise arc in degrees covering the same points. A clockwise fit
    /// swaps its endpoints so the stored sweep still passes through p2.
    pub fn to_arc(&self) -> Arc {
        let (start, end) = if self.is_clockwise() {
            (self.end_angle, self.start_angle)
        } else {
            (self.start_angle, self.end_angle)
        };
        Arc {
            center: self.center,
            radius: self.radius,
            start_angle: normalize_degrees(start.to_degrees()),
            end_angle: normalize_degrees(end.to_degrees()),
        }
    }
}

pub fn circle_through_3_points(p1: Point2, p2: Point2, p3: Point2) -> Result<CircleFit, Degenerate> {
    let (x1, y1) = (p1.x(), p1.y());
    let (x2, y2) = (p2.x(), p2.y());
    let (x3, y3) = (p3.x(), p3.y());

    let d = 2.0 * (x1 * (y2 - y3) + x2 * (y3 - y1) + x3 * (y1 - y2));
    if d.abs() < EPSILON {
        return Err(Degenerate::Collinear);
    }

    let s1 = x1 * x1 + y1 * y1;
    let s2 = x2 * x2 + y2 * y2;
    let s3 = x3 * x3 + y3 * y3;
    let cx = (s1 * (y2 - y3) + s2 * (y3 - y1) + s3 * (y1 - y2)) / d;
    let cy = (s1 * (x3 - x2) + s2 * (x1 - x3) + s3 * (x2 - x1)) / d;
    let center = Point2::new(cx, cy);
    let radius = center.distance_to(p1);

    let a1 = polar_angle(center, p1);
    let a2 = polar_angle(center, p2);
    let a3 = polar_angle(center, p3);
    let to_p2 = normalize_radians(a2 - a1);
    let to_p3 = normalize_radians(a3 - a1);

    let end_angle = if to_p2 < to_p3 {
        a1 + to_p3
    } else {
        a1 + to_p3 - TAU
    };

    Ok(CircleFit {
        center,
        radius,
        start_angle: a1,
        end_angle,
    })
}

/// Intersection point with its parameter along the first line (0 at p1, 1 at p2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineHit {
    pub point: Point2,
    pub t: f64,
}

/// Intersection of two infinite lines, `t` measured along (p1, p2) without bounds.
pub fn infinite_line_intersection(
    p1: Point2,
    p2: Point2,
    p3: Point2,
    p4: Point2,
) -> Result<LineHit, Degenerate> {
    let r = p1.vector_to(p2);
    let s = p3.vector_to(p4);
    let det = r.cross(s);
    if det.abs() < EPSILON {
        return Err(Degenerate::Parallel);
    }
    let t = p1.vector_to(p3).cross(s) / det;
    Ok(LineHit {
        point: p1.translate(r * t),
        t,
    })
}

/// Zero, one (tangent) or two intersections of the infinite line (p1, p2) with a circle.
pub fn line_circle_intersection(p1: Point2, p2: Point2, center: Point2, radius: f64) -> Vec<LineHit> {
    let direction = p1.vector_to(p2);
    let a = direction.length_squared();
    if a < EPSILON {
        return Vec::new();
    }
    // Closest approach of the line to the center, then walk ±half-chord.
    let t_mid = p1.vector_to(center).dot(direction) / a;
    let closest = p1.translate(direction * t_mid);
    let distance_sq = closest.vector_to(center).length_squared();
    let discriminant = radius * radius - distance_sq;
    let tolerance = 1e-9 * radius.max(1.0) * radius.max(1.0);

    if discriminant < -tolerance {
        Vec::new()
    } else if discriminant <= tolerance {
        vec![LineHit {
            point: closest,
            t: t_mid,
        }]
    } else {
        let dt = (discriminant / a).sqrt();
        [t_mid - dt, t_mid + dt]
            .into_iter()
            .map(|t| LineHit {
                point: p1.translate(direction * t),
                t,
            })
            .collect()
    }
}

/// Intersections of two full circles.
pub fn circle_circle_intersection(c1: Point2, r1: f64, c2: Point2, r2: f64) -> Vec<Point2> {
    let between = c1.vector_to(c2);
    let d = between.length();
    if d < EPSILON || d > r1 + r2 + 1e-9 || d < (r1 - r2).abs() - 1e-9 {
        return Vec::new();
    }
    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h_sq = r1 * r1 - a * a;
    let unit = between * (1.0 / d);
    let base = c1.translate(unit * a);
    if h_sq <= 1e-12 {
        return vec![base];
    }
    let h = h_sq.sqrt();
    vec![
        base.translate(unit.perp() * h),
        base.translate(unit.perp() * -h),
    ]
}

/// Projection parameter of `point` onto the line (a, b).
pub fn segment_parameter(point: Point2, a: Point2, b: Point2) -> f64 {
    let direction = a.vector_to(b);
    let length_sq = direction.length_squared();
    if length_sq < EPSILON {
        return 0.0;
    }
    a.vector_to(point).dot(direction) / length_sq
}

/// True when `point` lies on segment (a, b) with t in [-0.001, 1.001].
pub fn is_on_segment(point: Point2, a: Point2, b: Point2) -> bool {
    let t = segment_parameter(point, a, b);
    if !(-SEGMENT_SLACK..=1.0 + SEGMENT_SLACK).contains(&t) {
        return false;
    }
    let length = a.distance_to(b).max(1.0);
    let foot = a.translate(a.vector_to(b) * t);
    foot.distance_to(point) <= 1e-6 * length
}

/// Angular containment test for a point already on the arc's circle.
pub fn is_on_arc(point: Point2, arc: &Arc) -> bool {
    let angle = normalize_degrees(polar_angle(arc.center, point).to_degrees());
    angle_in_sweep(angle, arc.start_angle, arc.end_angle, 0.01)
}

/// Degrees `angle` lies in the counter-clockwise sweep start → end, with slack.
pub fn angle_in_sweep(angle: f64, start: f64, end: f64, slack: f64) -> bool {
    let start = normalize_degrees(start);
    let end = normalize_degrees(end);
    let angle = normalize_degrees(angle);
    let near = |a: f64, b: f64| {
        let diff = (a - b).rem_euclid(360.0);
        diff <= slack || diff >= 360.0 - slack
    };
    if near(angle, start) || near(angle, end) {
        return true;
    }
    if start <= end {
        angle >= start && angle <= end
    } else {
        angle >= start || angle <= end
    }
}

#[inline]
pub fn polar_angle(center: Point2, point: Point2) -> f64 {
    center.vector_to(point).angle()
}

/// Wraps radians into [0, 2π).
pub fn normalize_radians(angle: f64) -> f64 {
    let result = angle.rem_euclid(TAU);
    if result >= TAU { 0.0 } else { result }
}

/// Wraps degrees into [0, 360).
pub fn normalize_degrees(angle: f64) -> f64 {
    let result = angle.rem_euclid(360.0);
    if result >= 360.0 { 0.0 } else { result }
}

pub fn distance_to_segment(point: Point2, a: Point2, b: Point2) -> f64 {
    let t = segment_parameter(point, a, b).clamp(0.0, 1.0);
    a.translate(a.vector_to(b) * t).distance_to(point)
}

/// Shortest distance from `point` to the drawn outline of an entity, used for picking.
pub fn distance_to_entity(point: Point2, kind: &EntityKind) -> f64 {
    let polyline_distance = |points: &[Point2], closed: bool| {
        let mut best = f64::INFINITY;
        for pair in points.windows(2) {
            best = best.min(distance_to_segment(point, pair[0], pair[1]));
        }
        if closed && points.len() > 2 {
            best = best.min(distance_to_segment(point, points[points.len() - 1], points[0]));
        }
        if points.len() == 1 {
            best = points[0].distance_to(point);
        }
        best
    };

    match kind {
        EntityKind::Line(line) => distance_to_segment(point, line.start, line.end),
        EntityKind::Circle(circle) => (circle.center.distance_to(point) - circle.radius).abs(),
        EntityKind::Arc(arc) => {
            let on_circle = arc
                .center
                .translate(Vector2::from_angle(polar_angle(arc.center, point)) * arc.radius);
            if is_on_arc(on_circle, arc) {
                (arc.center.distance_to(point) - arc.radius).abs()
            } else {
                arc.start_point()
                    .distance_to(point)
                    .min(arc.end_point().distance_to(point))
            }
        }
        EntityKind::Polyline(polyline) => polyline_distance(&polyline.points(), polyline.closed),
        EntityKind::Text(text) => text.position.distance_to(point),
        EntityKind::Point(mark) => mark.position.distance_to(point),
        EntityKind::Insert(insert) => insert.position.distance_to(point),
        EntityKind::Ellipse(ellipse) => {
            let major = ellipse.major_axis;
            let minor = major.perp() * ellipse.ratio;
            let samples: Vec<Point2> = (0..=64)
                .map(|i| {
                    let t = TAU * f64::from(i) / 64.0;
                    ellipse.center.translate(major * t.cos()).translate(minor * t.sin())
                })
                .collect();
            polyline_distance(&samples, false)
        }
        EntityKind::Spline(spline) => {
            let points = if spline.fit_points.is_empty() {
                &spline.control_points
            } else {
                &spline.fit_points
            };
            polyline_distance(points, spline.closed)
        }
        EntityKind::Hatch(hatch) => hatch
            .boundary_paths
            .iter()
            .map(|path| polyline_distance(path, true))
            .fold(f64::INFINITY, f64::min),
        EntityKind::Dimension(dimension) => dimension
            .definition_point
            .distance_to(point)
            .min(dimension.middle_point.distance_to(point)),
        EntityKind::Solid(solid) => polyline_distance(&solid.outline(), true),
        EntityKind::Attrib(attrib) => attrib.position.distance_to(point),
        EntityKind::Leader(leader) => polyline_distance(&leader.vertices, false),
    }
}

/// Unbounded curve underlying a trim or extend target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Carrier {
    /// Infinite line through two points; hits report the line parameter.
    Line { start: Point2, end: Point2 },
    /// Full circle; hits report the polar angle in degrees, in [0, 360).
    Circle { center: Point2, radius: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarrierHit {
    pub point: Point2,
    pub param: f64,
}

impl Carrier {
    pub fn param_of(&self, point: Point2) -> f64 {
        match *self {
            Carrier::Line { start, end } => segment_parameter(point, start, end),
            Carrier::Circle { center, .. } => {
                normalize_degrees(polar_angle(center, point).to_degrees())
            }
        }
    }

    /// Intersections of the unbounded carrier with the bounded outline of `boundary`.
    /// Entity kinds without a straight or circular outline contribute nothing.
    pub fn hits(&self, boundary: &EntityKind) -> Vec<CarrierHit> {
        let points = match boundary {
            EntityKind::Line(line) => self.hits_segment(line.start, line.end),
            EntityKind::Polyline(polyline) => polyline
                .segments()
                .into_iter()
                .flat_map(|(a, b)| self.hits_segment(a, b))
                .collect(),
            EntityKind::Circle(circle) => self.hits_circle(circle.center, circle.radius),
            EntityKind::Arc(arc) => self
                .hits_circle(arc.center, arc.radius)
                .into_iter()
                .filter(|point| is_on_arc(*point, arc))
                .collect(),
            _ => Vec::new(),
        };
        points
            .into_iter()
            .map(|point| CarrierHit {
                point,
                param: self.param_of(point),
            })
            .collect()
    }

    fn hits_segment(&self, a: Point2, b: Point2) -> Vec<Point2> {
        match *self {
            Carrier::Line { start, end } => infinite_line_intersection(start, end, a, b)
                .ok()
                .filter(|hit| is_on_segment(hit.point, a, b))
                .map(|hit| hit.point)
                .into_iter()
                .collect(),
            Carrier::Circle { center, radius } => line_circle_intersection(a, b, center, radius)
                .into_iter()
                .filter(|hit| (-SEGMENT_SLACK..=1.0 + SEGMENT_SLACK).contains(&hit.t))
                .map(|hit| hit.point)
                .collect(),
        }
    }

    fn hits_circle(&self, center: Point2, radius: f64) -> Vec<Point2> {
        match *self {
            Carrier::Line { start, end } => line_circle_intersection(start, end, center, radius)
                .into_iter()
                .map(|hit| hit.point)
                .collect(),
            Carrier::Circle {
                center: own_center,
                radius: own_radius,
            } => circle_circle_intersection(own_center, own_radius, center, radius),
        }
    }
}
