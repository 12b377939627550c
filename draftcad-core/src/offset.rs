//! Parallel copies of lines, circles, arcs and polylines at a fixed distance.

use crate::document::{Arc, Circle, EntityKind, Line, Polyline};
use crate::geometry::{Point2, Vector2};
use crate::kernel::{Degenerate, distance_to_segment, infinite_line_intersection};

/// Offsets a supported entity toward `side`. Unsupported kinds yield `None`.
pub fn offset_entity(kind: &EntityKind, distance: f64, side: Point2) -> Option<Result<EntityKind, Degenerate>> {
    let result = match kind {
        EntityKind::Line(line) => offset_line(line, distance, side).map(EntityKind::Line),
        EntityKind::Circle(circle) => offset_circle(circle, distance, side).map(EntityKind::Circle),
        EntityKind::Arc(arc) => offset_arc(arc, distance, side).map(EntityKind::Arc),
        EntityKind::Polyline(polyline) => {
            offset_polyline(polyline, distance, side).map(EntityKind::Polyline)
        }
        _ => return None,
    };
    Some(result)
}

pub fn offset_line(line: &Line, distance: f64, side: Point2) -> Result<Line, Degenerate> {
    let direction = line.start.vector_to(line.end);
    let normal = direction.normalize().ok_or(Degenerate::ZeroLength)?.perp();
    let sign = side_sign(direction, line.start.vector_to(side));
    let shift = normal * (distance * sign);
    Ok(Line {
        start: line.start.translate(shift),
        end: line.end.translate(shift),
    })
}

pub fn offset_circle(circle: &Circle, distance: f64, side: Point2) -> Result<Circle, Degenerate> {
    let radius = offset_radius(circle.center, circle.radius, distance, side)?;
    Ok(Circle {
        center: circle.center,
        radius,
    })
}

pub fn offset_arc(arc: &Arc, distance: f64, side: Point2) -> Result<Arc, Degenerate> {
    let radius = offset_radius(arc.center, arc.radius, distance, side)?;
    Ok(Arc { radius, ..*arc })
}

/// Offsets every straight segment and rejoins neighbours at the intersection of their
/// infinite lines. Parallel neighbours keep the plain offset vertex.
pub fn offset_polyline(polyline: &Polyline, distance: f64, side: Point2) -> Result<Polyline, Degenerate> {
    let mut points = polyline.points();
    points.dedup_by(|a, b| a.distance_to(*b) < 1e-9);
    if polyline.closed && points.len() > 1 && points[0].distance_to(points[points.len() - 1]) < 1e-9 {
        points.pop();
    }
    if points.len() < 2 {
        return Err(Degenerate::ZeroLength);
    }

    let mut segments: Vec<(Point2, Point2)> = points.windows(2).map(|pair| (pair[0], pair[1])).collect();
    let closed = polyline.closed && points.len() > 2;
    if closed {
        segments.push((points[points.len() - 1], points[0]));
    }

    let nearest = segments
        .iter()
        .min_by(|a, b| {
            distance_to_segment(side, a.0, a.1).total_cmp(&distance_to_segment(side, b.0, b.1))
        })
        .copied()
        .ok_or(Degenerate::ZeroLength)?;
    let sign = side_sign(nearest.0.vector_to(nearest.1), nearest.0.vector_to(side));

    let shifted: Vec<(Point2, Point2)> = segments
        .iter()
        .map(|&(a, b)| {
            let normal = a.vector_to(b).normalize().unwrap_or(Vector2::new(0.0, 0.0)).perp();
            let shift = normal * (distance * sign);
            (a.translate(shift), b.translate(shift))
        })
        .collect();

    let join = |previous: (Point2, Point2), next: (Point2, Point2)| {
        infinite_line_intersection(previous.0, previous.1, next.0, next.1)
            .map(|hit| hit.point)
            .unwrap_or(next.0)
    };

    let count = shifted.len();
    let mut vertices = Vec::with_capacity(points.len());
    if closed {
        for index in 0..count {
            let previous = shifted[(index + count - 1) % count];
            vertices.push(join(previous, shifted[index]));
        }
    } else {
        vertices.push(shifted[0].0);
        for index in 1..count {
            vertices.push(join(shifted[index - 1], shifted[index]));
        }
        vertices.push(shifted[count - 1].1);
    }

    Ok(Polyline::from_points(vertices, polyline.closed))
}

fn side_sign(direction: Vector2, to_side: Vector2) -> f64 {
    if direction.cross(to_side) >= 0.0 { 1.0 } else { -1.0 }
}

fn offset_radius(center: Point2, radius: f64, distance: f64, side: Point2) -> Result<f64, Degenerate> {
    let outward = center.distance_to(side) > radius;
    let radius = if outward { radius + distance } else { radius - distance };
    if radius <= 1e-9 {
        Err(Degenerate::ZeroLength)
    } else {
        Ok(radius)
    }
}
