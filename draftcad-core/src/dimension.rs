//! Dimension construction: extension lines, dimension line, arrowheads and text placement.

use serde::{Deserialize, Serialize};

use crate::document::{Dimension, DimensionKind};
use crate::geometry::{Point2, Vector2};
use crate::kernel::{Degenerate, infinite_line_intersection, normalize_degrees, polar_angle};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimStyle {
    pub arrow_size: f64,
    /// Gap between the measured point and the start of its extension line.
    pub extension_offset: f64,
    /// How far extension lines run past the dimension line.
    pub extension_beyond: f64,
    pub text_height: f64,
    pub text_gap: f64,
    /// Angle between an arrowhead wing and the dimension line, in degrees.
    pub arrow_half_angle: f64,
}

impl Default for DimStyle {
    fn default() -> Self {
        Self {
            arrow_size: 2.5,
            extension_offset: 0.625,
            extension_beyond: 1.25,
            text_height: 2.5,
            text_gap: 0.625,
            arrow_half_angle: 15.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DimOrientation {
    /// Horizontal or vertical, picked from where the location point lies.
    Auto,
    Horizontal,
    Vertical,
    /// Parallel to the measured points.
    Aligned,
    /// Dimension line at a fixed angle in degrees.
    Rotated(f64),
}

impl DimOrientation {
    /// Resolves `Auto`: a location that strays further vertically than horizontally from the
    /// midpoint of the measured points gets a horizontal dimension line, and vice versa.
    pub fn resolve(self, first: Point2, second: Point2, location: Point2) -> DimOrientation {
        match self {
            DimOrientation::Auto => {
                let mid = first.midpoint(second);
                let dx = (location.x() - mid.x()).abs();
                let dy = (location.y() - mid.y()).abs();
                if dy > dx {
                    DimOrientation::Horizontal
                } else {
                    DimOrientation::Vertical
                }
            }
            other => other,
        }
    }
}

/// Tip plus the two wing ends of a filled arrowhead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrowhead {
    pub tip: Point2,
    pub wings: [Point2; 2],
}

impl Arrowhead {
    /// Arrow at `tip` whose wings trail back along `back` (a unit vector pointing away
    /// from the tip), each rotated by ±`half_angle` degrees.
    pub fn new(tip: Point2, back: Vector2, size: f64, half_angle: f64) -> Self {
        let base = back.angle();
        let spread = half_angle.to_radians();
        let wing = |angle: f64| tip.translate(Vector2::from_angle(angle) * size);
        Self {
            tip,
            wings: [wing(base + spread), wing(base - spread)],
        }
    }

    pub fn segments(&self) -> [(Point2, Point2); 3] {
        [
            (self.tip, self.wings[0]),
            (self.wings[0], self.wings[1]),
            (self.wings[1], self.tip),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearLayout {
    pub kind: DimensionKind,
    pub first: Point2,
    pub second: Point2,
    pub extension_lines: [(Point2, Point2); 2],
    pub dimension_line: (Point2, Point2),
    pub arrows: [Arrowhead; 2],
    pub text_position: Point2,
    /// Text rotation in degrees, kept readable (never upside down).
    pub text_rotation: f64,
    /// Dimension line direction in degrees.
    pub rotation: f64,
    pub measurement: f64,
}

impl LinearLayout {
    pub fn segments(&self) -> Vec<(Point2, Point2)> {
        let mut segments = vec![self.extension_lines[0], self.extension_lines[1], self.dimension_line];
        for arrow in &self.arrows {
            segments.extend(arrow.segments());
        }
        segments
    }

    pub fn text(&self) -> String {
        format_measurement(self.measurement)
    }

    pub fn to_dimension(&self) -> Dimension {
        Dimension {
            kind: self.kind,
            flags: 0,
            definition_point: self.dimension_line.1,
            middle_point: self.text_position,
            first_point: Some(self.first),
            second_point: Some(self.second),
            text: self.text(),
            rotation: self.rotation,
        }
    }
}

/// Lays out a linear or aligned dimension measuring `first` → `second`, with the dimension
/// line passing through `location`.
pub fn linear_layout(
    first: Point2,
    second: Point2,
    location: Point2,
    orientation: DimOrientation,
    style: &DimStyle,
) -> Result<LinearLayout, Degenerate> {
    let (direction, kind) = match orientation.resolve(first, second, location) {
        DimOrientation::Horizontal => (Vector2::new(1.0, 0.0), DimensionKind::Linear),
        DimOrientation::Vertical => (Vector2::new(0.0, 1.0), DimensionKind::Linear),
        DimOrientation::Rotated(angle) => {
            (Vector2::from_angle(angle.to_radians()), DimensionKind::Linear)
        }
        DimOrientation::Aligned | DimOrientation::Auto => (
            first
                .vector_to(second)
                .normalize()
                .ok_or(Degenerate::ZeroLength)?,
            DimensionKind::Aligned,
        ),
    };

    let project = |point: Point2| location.translate(direction * location.vector_to(point).dot(direction));
    let foot1 = project(first);
    let foot2 = project(second);
    let measurement = first.vector_to(second).dot(direction).abs();

    // Side of the measured points the dimension line sits on.
    let normal = {
        let away = first.midpoint(second).vector_to(location);
        let side = direction.perp();
        if away.dot(side) < 0.0 { -side } else { side }
    };

    let extension = |measured: Point2, foot: Point2| {
        let toward = measured.vector_to(foot).normalize().unwrap_or(normal);
        (
            measured.translate(toward * style.extension_offset),
            foot.translate(toward * style.extension_beyond),
        )
    };

    let along = foot1.vector_to(foot2).normalize().unwrap_or(direction);
    let arrows = [
        Arrowhead::new(foot1, along, style.arrow_size, style.arrow_half_angle),
        Arrowhead::new(foot2, -along, style.arrow_size, style.arrow_half_angle),
    ];

    let rotation = normalize_degrees(direction.angle().to_degrees());
    let text_position = foot1
        .midpoint(foot2)
        .translate(normal * (style.text_gap + style.text_height / 2.0));

    Ok(LinearLayout {
        kind,
        first,
        second,
        extension_lines: [extension(first, foot1), extension(second, foot2)],
        dimension_line: (foot1, foot2),
        arrows,
        text_position,
        text_rotation: readable_rotation(rotation),
        rotation,
        measurement,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct AngularLayout {
    pub vertex: Point2,
    pub radius: f64,
    /// Counter-clockwise sweep of the dimension arc, degrees.
    pub start_angle: f64,
    pub end_angle: f64,
    pub extension_lines: Vec<(Point2, Point2)>,
    pub arrows: [Arrowhead; 2],
    pub text_position: Point2,
    pub measurement: f64,
    pub first_ray: Point2,
    pub second_ray: Point2,
}

impl AngularLayout {
    pub fn arc_points(&self) -> [Point2; 3] {
        let mid = self.start_angle + self.measurement / 2.0;
        [
            self.vertex.polar(self.radius, self.start_angle),
            self.vertex.polar(self.radius, mid),
            self.vertex.polar(self.radius, self.end_angle),
        ]
    }

    pub fn text(&self) -> String {
        format!("{}°", format_measurement(self.measurement))
    }

    pub fn to_dimension(&self) -> Dimension {
        Dimension {
            kind: DimensionKind::Angular,
            flags: 0,
            definition_point: self.arc_points()[1],
            middle_point: self.text_position,
            first_point: Some(self.first_ray),
            second_point: Some(self.second_ray),
            text: self.text(),
            rotation: 0.0,
        }
    }
}

/// Angular dimension between two lines, placed in the sector containing `location`.
pub fn angular_layout(
    first_line: (Point2, Point2),
    second_line: (Point2, Point2),
    location: Point2,
    style: &DimStyle,
) -> Result<AngularLayout, Degenerate> {
    let vertex = infinite_line_intersection(first_line.0, first_line.1, second_line.0, second_line.1)?.point;
    let radius = vertex.distance_to(location);
    if radius < 1e-9 {
        return Err(Degenerate::ZeroLength);
    }

    let far_end = |(a, b): (Point2, Point2)| {
        if vertex.distance_to(a) > vertex.distance_to(b) { a } else { b }
    };
    let ray_a = far_end(first_line);
    let ray_b = far_end(second_line);
    let angle_a = normalize_degrees(polar_angle(vertex, ray_a).to_degrees());
    let angle_b = normalize_degrees(polar_angle(vertex, ray_b).to_degrees());
    let angle_loc = normalize_degrees(polar_angle(vertex, location).to_degrees());

    // Four sectors bounded by the two lines; pick the one the location falls in.
    let mut sector = None;
    'search: for start in [angle_a, angle_a + 180.0] {
        for end in [angle_b, angle_b + 180.0] {
            for (from, to) in [(start, end), (end, start)] {
                let sweep = normalize_degrees(to - from);
                let offset = normalize_degrees(angle_loc - from);
                if sweep > 1e-9 && sweep < 180.0 + 1e-9 && offset <= sweep {
                    sector = Some((normalize_degrees(from), sweep));
                    break 'search;
                }
            }
        }
    }
    let (start_angle, measurement) = sector.ok_or(Degenerate::Parallel)?;
    let end_angle = normalize_degrees(start_angle + measurement);

    let mut extension_lines = Vec::new();
    for line in [first_line, second_line] {
        let far = far_end(line);
        let ray_angle = polar_angle(vertex, far).to_degrees();
        let reach = vertex.distance_to(far);
        for bound in [start_angle, end_angle] {
            let diff = (ray_angle - bound).rem_euclid(360.0);
            let on_bound = diff < 1e-6 || diff > 360.0 - 1e-6;
            if on_bound && reach < radius {
                let direction = Vector2::from_angle(bound.to_radians());
                extension_lines.push((
                    vertex.translate(direction * (reach + style.extension_offset)),
                    vertex.translate(direction * (radius + style.extension_beyond)),
                ));
            }
        }
    }

    let start_tip = vertex.polar(radius, start_angle);
    let end_tip = vertex.polar(radius, end_angle);
    let start_tangent = Vector2::from_angle((start_angle + 90.0).to_radians());
    let end_tangent = Vector2::from_angle((end_angle - 90.0).to_radians());
    let arrows = [
        Arrowhead::new(start_tip, start_tangent, style.arrow_size, style.arrow_half_angle),
        Arrowhead::new(end_tip, end_tangent, style.arrow_size, style.arrow_half_angle),
    ];

    let text_position = vertex.polar(
        radius + style.text_gap + style.text_height / 2.0,
        start_angle + measurement / 2.0,
    );

    Ok(AngularLayout {
        vertex,
        radius,
        start_angle,
        end_angle,
        extension_lines,
        arrows,
        text_position,
        measurement,
        first_ray: ray_a,
        second_ray: ray_b,
    })
}

/// Flips angles that would render upside down.
pub fn readable_rotation(degrees: f64) -> f64 {
    let degrees = normalize_degrees(degrees);
    if degrees > 90.0 && degrees <= 270.0 {
        degrees - 180.0
    } else {
        degrees
    }
}

/// Measurement text: four decimals with trailing zeros removed.
pub fn format_measurement(value: f64) -> String {
    let text = format!("{value:.4}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" { "0".to_string() } else { text.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_orientation_follows_location_offset() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(10.0, 4.0);
        assert_eq!(
            DimOrientation::Auto.resolve(a, b, Point2::new(5.0, 12.0)),
            DimOrientation::Horizontal
        );
        assert_eq!(
            DimOrientation::Auto.resolve(a, b, Point2::new(-8.0, 2.0)),
            DimOrientation::Vertical
        );
    }

    #[test]
    fn horizontal_layout_projects_feet_onto_location() {
        let style = DimStyle::default();
        let layout = linear_layout(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 3.0),
            Point2::new(5.0, 8.0),
            DimOrientation::Auto,
            &style,
        )
        .expect("layout");

        assert_eq!(layout.kind, DimensionKind::Linear);
        assert!((layout.measurement - 10.0).abs() < 1e-9);
        assert!((layout.dimension_line.0.y() - 8.0).abs() < 1e-9);
        assert!((layout.dimension_line.1.x() - 10.0).abs() < 1e-9);
        let (ext_start, ext_end) = layout.extension_lines[0];
        assert!((ext_start.y() - style.extension_offset).abs() < 1e-9);
        assert!((ext_end.y() - (8.0 + style.extension_beyond)).abs() < 1e-9);
        assert!(layout.text_position.y() > 8.0);
        assert_eq!(layout.text(), "10");

        let arrow = layout.arrows[0];
        for wing in arrow.wings {
            assert!((wing.distance_to(arrow.tip) - style.arrow_size).abs() < 1e-9);
            assert!(wing.x() > arrow.tip.x());
        }
    }

    #[test]
    fn aligned_layout_measures_true_length() {
        let layout = linear_layout(
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 4.0),
            Point2::new(-2.0, 3.0),
            DimOrientation::Aligned,
            &DimStyle::default(),
        )
        .expect("layout");
        assert_eq!(layout.kind, DimensionKind::Aligned);
        assert!((layout.measurement - 5.0).abs() < 1e-9);

        let same = linear_layout(
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
            DimOrientation::Aligned,
            &DimStyle::default(),
        );
        assert_eq!(same, Err(Degenerate::ZeroLength));
    }

    #[test]
    fn angular_layout_picks_sector_of_location() {
        let layout = angular_layout(
            (Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)),
            (Point2::new(0.0, 0.0), Point2::new(0.0, 10.0)),
            Point2::new(3.0, 3.0),
            &DimStyle::default(),
        )
        .expect("layout");
        assert!((layout.measurement - 90.0).abs() < 1e-9);
        assert!(layout.start_angle.abs() < 1e-9);
        assert!((layout.end_angle - 90.0).abs() < 1e-9);
        assert_eq!(layout.text(), "90°");

        let obtuse = angular_layout(
            (Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)),
            (Point2::new(0.0, 0.0), Point2::new(0.0, 10.0)),
            Point2::new(-3.0, 3.0),
            &DimStyle::default(),
        )
        .expect("layout");
        assert!((obtuse.start_angle - 90.0).abs() < 1e-9);
        assert!((obtuse.end_angle - 180.0).abs() < 1e-9);
    }

    #[test]
    fn measurement_text_drops_trailing_zeros() {
        assert_eq!(format_measurement(2.5), "2.5");
        assert_eq!(format_measurement(7.0710678), "7.0711");
        assert_eq!(format_measurement(-0.00001), "0");
    }
}
