pub mod dimension;
pub mod kernel;
pub mod offset;

pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 2D point backed by `glam::DVec2`; all drawing coordinates are double precision.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn origin() -> Self {
            Self(DVec2::ZERO)
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn distance_to(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn midpoint(self, other: Point2) -> Point2 {
            Self((self.0 + other.0) * 0.5)
        }

        /// Point reached from `self` by walking `distance` along `angle_degrees`.
        #[inline]
        pub fn polar(self, distance: f64, angle_degrees: f64) -> Point2 {
            self.translate(Vector2::from_angle(angle_degrees.to_radians()) * distance)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    impl std::fmt::Display for Point2 {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "({:.4}, {:.4})", self.x(), self.y())
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        /// Unit vector at `radians` from the positive X axis.
        #[inline]
        pub fn from_angle(radians: f64) -> Self {
            Self(DVec2::new(radians.cos(), radians.sin()))
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn normalize(self) -> Option<Self> {
            let len = self.0.length();
            if len <= f64::EPSILON {
                None
            } else {
                Some(Self(self.0 / len))
            }
        }

        /// Counter-clockwise perpendicular.
        #[inline]
        pub fn perp(self) -> Self {
            Self(self.0.perp())
        }

        #[inline]
        pub fn dot(self, other: Vector2) -> f64 {
            self.0.dot(other.0)
        }

        /// Z component of the 3D cross product; positive when `other` is to the left.
        #[inline]
        pub fn cross(self, other: Vector2) -> f64 {
            self.0.perp_dot(other.0)
        }

        #[inline]
        pub fn angle(self) -> f64 {
            self.0.y.atan2(self.0.x)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    impl std::ops::Mul<f64> for Vector2 {
        type Output = Vector2;

        fn mul(self, rhs: f64) -> Self::Output {
            Self(self.0 * rhs)
        }
    }

    impl std::ops::Neg for Vector2 {
        type Output = Vector2;

        fn neg(self) -> Self::Output {
            Self(-self.0)
        }
    }

    /// Axis-aligned bounding box used for drawing and entity extents.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        /// Normalized box spanning two arbitrary corners.
        pub fn from_corners(a: Point2, b: Point2) -> Self {
            Self {
                min: Point2::from_vec(a.as_vec2().min(b.as_vec2())),
                max: Point2::from_vec(a.as_vec2().max(b.as_vec2())),
            }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            self.max.x() - self.min.x()
        }

        #[inline]
        pub fn height(&self) -> f64 {
            self.max.y() - self.min.y()
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        pub fn contains(&self, point: Point2) -> bool {
            !self.is_empty()
                && point.x() >= self.min.x()
                && point.x() <= self.max.x()
                && point.y() >= self.min.y()
                && point.y() <= self.max.y()
        }

        /// The four corners, counter-clockwise from `min`.
        pub fn corners(&self) -> [Point2; 4] {
            [
                self.min,
                Point2::new(self.max.x(), self.min.y()),
                self.max,
                Point2::new(self.min.x(), self.max.y()),
            ]
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let min_vec = self.min.as_vec2();
            let max_vec = self.max.as_vec2();
            let center = (min_vec + max_vec) * 0.5;
            Point2::from_vec(center)
        }
    }
}

pub mod document {
    use std::collections::{HashMap, HashSet};
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    use indexmap::IndexMap;
    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2, Vector2};
    use crate::kernel::normalize_radians;

    pub const DEFAULT_LAYER: &str = "0";
    pub const DEFAULT_LINE_TYPE: &str = "CONTINUOUS";

    /// Extents reported for a drawing with no measurable entities.
    pub const DEFAULT_BOUNDS: ([f64; 2], [f64; 2]) = ([0.0, 0.0], [100.0, 100.0]);

    /// Session-local entity identity. Never persisted, never reused.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    /// AutoCAD Color Index with the two inheritance sentinels split out.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum Color {
        ByBlock,
        ByLayer,
        Index(u8),
    }

    impl Color {
        pub const BY_BLOCK_ACI: i16 = 0;
        pub const BY_LAYER_ACI: i16 = 256;

        /// Values outside 1..=255 never name a palette entry; they inherit.
        pub fn from_aci(raw: i16) -> Self {
            match raw {
                Self::BY_BLOCK_ACI => Color::ByBlock,
                1..=255 => Color::Index(raw as u8),
                _ => Color::ByLayer,
            }
        }

        pub fn to_aci(self) -> i16 {
            match self {
                Color::ByBlock => Self::BY_BLOCK_ACI,
                Color::ByLayer => Self::BY_LAYER_ACI,
                Color::Index(index) => i16::from(index),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
        pub color: u8,
        pub frozen: bool,
        pub off: bool,
        pub line_type: String,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                color: 7,
                frozen: false,
                off: false,
                line_type: DEFAULT_LINE_TYPE.to_string(),
            }
        }

        #[inline]
        pub fn is_visible(&self) -> bool {
            !self.frozen && !self.off
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct LineType {
        pub name: String,
        pub description: String,
    }

    impl LineType {
        pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                description: description.into(),
            }
        }
    }

    /// Named entity group instanced by `Insert`; entities use block-local coordinates.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Block {
        pub name: String,
        pub base_point: Point2,
        pub entities: Vec<Entity>,
    }

    impl Block {
        pub fn new(name: impl Into<String>, base_point: Point2) -> Self {
            Self {
                name: name.into(),
                base_point,
                entities: Vec::new(),
            }
        }
    }

    /// Attributes shared by every entity variant.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct EntityAttrs {
        pub handle: Option<String>,
        pub layer: String,
        pub color: Option<Color>,
        pub line_type: Option<String>,
    }

    impl Default for EntityAttrs {
        fn default() -> Self {
            Self {
                handle: None,
                layer: DEFAULT_LAYER.to_string(),
                color: None,
                line_type: None,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Entity {
        pub attrs: EntityAttrs,
        pub kind: EntityKind,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum EntityKind {
        Line(Line),
        Circle(Circle),
        Arc(Arc),
        Polyline(Polyline),
        Text(Text),
        Point(PointMark),
        Insert(Insert),
        Ellipse(Ellipse),
        Spline(Spline),
        Hatch(Hatch),
        Dimension(Dimension),
        Solid(Solid),
        Attrib(Attrib),
        Leader(Leader),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
    }

    /// Arc swept counter-clockwise from `start_angle` to `end_angle`, both in degrees.
    /// `end_angle < start_angle` means the sweep wraps through 0°.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
    }

    impl Arc {
        pub fn start_point(&self) -> Point2 {
            self.center.polar(self.radius, self.start_angle)
        }

        pub fn end_point(&self) -> Point2 {
            self.center.polar(self.radius, self.end_angle)
        }

        /// Counter-clockwise sweep in degrees, in `(0, 360]`.
        pub fn sweep(&self) -> f64 {
            let sweep = (self.end_angle - self.start_angle).rem_euclid(360.0);
            if sweep <= 1e-9 { 360.0 } else { sweep }
        }

        pub fn mid_point(&self) -> Point2 {
            self.center
                .polar(self.radius, self.start_angle + self.sweep() / 2.0)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct PolylineVertex {
        pub position: Point2,
        pub bulge: f64,
    }

    impl PolylineVertex {
        #[inline]
        pub fn new(position: Point2) -> Self {
            Self {
                position,
                bulge: 0.0,
            }
        }

        #[inline]
        pub fn with_bulge(position: Point2, bulge: f64) -> Self {
            Self { position, bulge }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<PolylineVertex>,
        pub closed: bool,
    }

    impl Polyline {
        pub fn from_points(points: impl IntoIterator<Item = Point2>, closed: bool) -> Self {
            Self {
                vertices: points.into_iter().map(PolylineVertex::new).collect(),
                closed,
            }
        }

        pub fn points(&self) -> Vec<Point2> {
            self.vertices.iter().map(|vertex| vertex.position).collect()
        }

        /// Straight segments between consecutive vertices, including the closing one.
        pub fn segments(&self) -> Vec<(Point2, Point2)> {
            let points = self.points();
            let mut segments: Vec<_> = points.windows(2).map(|pair| (pair[0], pair[1])).collect();
            if self.closed && points.len() > 2 {
                segments.push((points[points.len() - 1], points[0]));
            }
            segments
        }
    }

    /// Horizontal justification carried by group code 72.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub enum TextAlignment {
        #[default]
        Left,
        Center,
        Right,
        Aligned,
        Middle,
        Fit,
        Other(i16),
    }

    impl TextAlignment {
        pub fn from_code(code: i16) -> Self {
            match code {
                0 => TextAlignment::Left,
                1 => TextAlignment::Center,
                2 => TextAlignment::Right,
                3 => TextAlignment::Aligned,
                4 => TextAlignment::Middle,
                5 => TextAlignment::Fit,
                other => TextAlignment::Other(other),
            }
        }

        pub fn code(self) -> i16 {
            match self {
                TextAlignment::Left => 0,
                TextAlignment::Center => 1,
                TextAlignment::Right => 2,
                TextAlignment::Aligned => 3,
                TextAlignment::Middle => 4,
                TextAlignment::Fit => 5,
                TextAlignment::Other(code) => code,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Text {
        pub position: Point2,
        pub content: String,
        pub height: f64,
        /// Degrees.
        pub rotation: f64,
        pub alignment: TextAlignment,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct PointMark {
        pub position: Point2,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Insert {
        pub block_name: String,
        pub position: Point2,
        pub scale: Vector2,
        /// Degrees.
        pub rotation: f64,
    }

    impl Insert {
        /// Maps a block-local point into drawing coordinates.
        pub fn transform(&self, base_point: Point2, local: Point2) -> Point2 {
            let offset = base_point.vector_to(local);
            let scaled = Vector2::new(offset.x() * self.scale.x(), offset.y() * self.scale.y());
            let (sin, cos) = self.rotation.to_radians().sin_cos();
            let rotated = Vector2::new(
                scaled.x() * cos - scaled.y() * sin,
                scaled.x() * sin + scaled.y() * cos,
            );
            self.position.translate(rotated)
        }
    }

    /// Ellipse with parameter angles in radians, unlike `Arc`.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Ellipse {
        pub center: Point2,
        pub major_axis: Vector2,
        pub ratio: f64,
        pub start_parameter: f64,
        pub end_parameter: f64,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Spline {
        pub degree: i32,
        pub control_points: Vec<Point2>,
        pub fit_points: Vec<Point2>,
        pub knots: Vec<f64>,
        pub closed: bool,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Hatch {
        pub boundary_paths: Vec<Vec<Point2>>,
        pub solid: bool,
        pub pattern_name: String,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum DimensionKind {
        Linear,
        Aligned,
        Angular,
        Diameter,
        Radius,
        Angular3Point,
        Ordinate,
        Other(i16),
    }

    impl DimensionKind {
        /// Decodes the low bits of group code 70. The higher bits are kept in [`Dimension::flags`].
        pub fn from_code(code: i16) -> Self {
            match code & 0x0F {
                0 => DimensionKind::Linear,
                1 => DimensionKind::Aligned,
                2 => DimensionKind::Angular,
                3 => DimensionKind::Diameter,
                4 => DimensionKind::Radius,
                5 => DimensionKind::Angular3Point,
                6 => DimensionKind::Ordinate,
                other => DimensionKind::Other(other),
            }
        }

        pub fn code(self) -> i16 {
            match self {
                DimensionKind::Linear => 0,
                DimensionKind::Aligned => 1,
                DimensionKind::Angular => 2,
                DimensionKind::Diameter => 3,
                DimensionKind::Radius => 4,
                DimensionKind::Angular3Point => 5,
                DimensionKind::Ordinate => 6,
                DimensionKind::Other(code) => code,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Dimension {
        pub kind: DimensionKind,
        /// Bits of group code 70 above the type (block reference, user text position).
        #[serde(default)]
        pub flags: i16,
        pub definition_point: Point2,
        pub middle_point: Point2,
        pub first_point: Option<Point2>,
        pub second_point: Option<Point2>,
        pub text: String,
        /// Degrees.
        pub rotation: f64,
    }

    /// Filled quadrilateral in AutoCAD vertex order 0,1,3,2. Triangles repeat the last corner.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Solid {
        pub corners: [Point2; 4],
    }

    impl Solid {
        /// Corners in drawing order around the outline.
        pub fn outline(&self) -> [Point2; 4] {
            let [a, b, c, d] = self.corners;
            [a, b, d, c]
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Attrib {
        pub tag: String,
        pub text: String,
        pub position: Point2,
        pub height: f64,
        pub rotation: f64,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Leader {
        pub vertices: Vec<Point2>,
        pub has_arrowhead: bool,
    }

    impl Entity {
        pub fn new(kind: EntityKind) -> Self {
            Self {
                attrs: EntityAttrs::default(),
                kind,
            }
        }

        pub fn on_layer(mut self, layer: impl Into<String>) -> Self {
            self.attrs.layer = layer.into();
            self
        }

        pub fn line(start: Point2, end: Point2) -> Self {
            Self::new(EntityKind::Line(Line { start, end }))
        }

        pub fn circle(center: Point2, radius: f64) -> Self {
            Self::new(EntityKind::Circle(Circle { center, radius }))
        }

        pub fn arc(arc: Arc) -> Self {
            Self::new(EntityKind::Arc(arc))
        }

        pub fn polyline(polyline: Polyline) -> Self {
            Self::new(EntityKind::Polyline(polyline))
        }

        #[inline]
        pub fn layer(&self) -> &str {
            &self.attrs.layer
        }

        /// DXF record name of the variant.
        pub fn type_name(&self) -> &'static str {
            match &self.kind {
                EntityKind::Line(_) => "LINE",
                EntityKind::Circle(_) => "CIRCLE",
                EntityKind::Arc(_) => "ARC",
                EntityKind::Polyline(_) => "LWPOLYLINE",
                EntityKind::Text(_) => "TEXT",
                EntityKind::Point(_) => "POINT",
                EntityKind::Insert(_) => "INSERT",
                EntityKind::Ellipse(_) => "ELLIPSE",
                EntityKind::Spline(_) => "SPLINE",
                EntityKind::Hatch(_) => "HATCH",
                EntityKind::Dimension(_) => "DIMENSION",
                EntityKind::Solid(_) => "SOLID",
                EntityKind::Attrib(_) => "ATTRIB",
                EntityKind::Leader(_) => "LEADER",
            }
        }

        /// Local 2D extents. Inserts only report their insertion point here;
        /// `Drawing::entity_bounds` expands them through the referenced block.
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            match &self.kind {
                EntityKind::Line(line) => {
                    bounds.include_point(line.start);
                    bounds.include_point(line.end);
                }
                EntityKind::Circle(circle) => {
                    let radius = circle.radius.abs();
                    let center = circle.center;
                    bounds.include_point(Point2::new(center.x() - radius, center.y() - radius));
                    bounds.include_point(Point2::new(center.x() + radius, center.y() + radius));
                }
                EntityKind::Arc(arc) => arc_bounds(arc, &mut bounds),
                EntityKind::Polyline(polyline) => {
                    for vertex in &polyline.vertices {
                        bounds.include_point(vertex.position);
                    }
                }
                EntityKind::Text(text) => bounds.include_point(text.position),
                EntityKind::Point(point) => bounds.include_point(point.position),
                EntityKind::Insert(insert) => bounds.include_point(insert.position),
                EntityKind::Ellipse(ellipse) => ellipse_bounds(ellipse, &mut bounds),
                EntityKind::Spline(spline) => {
                    for point in spline.control_points.iter().chain(&spline.fit_points) {
                        bounds.include_point(*point);
                    }
                }
                EntityKind::Hatch(hatch) => {
                    for point in hatch.boundary_paths.iter().flatten() {
                        bounds.include_point(*point);
                    }
                }
                EntityKind::Dimension(dimension) => {
                    bounds.include_point(dimension.definition_point);
                    bounds.include_point(dimension.middle_point);
                    for point in [dimension.first_point, dimension.second_point]
                        .into_iter()
                        .flatten()
                    {
                        bounds.include_point(point);
                    }
                }
                EntityKind::Solid(solid) => {
                    for corner in solid.corners {
                        bounds.include_point(corner);
                    }
                }
                EntityKind::Attrib(attrib) => bounds.include_point(attrib.position),
                EntityKind::Leader(leader) => {
                    for vertex in &leader.vertices {
                        bounds.include_point(*vertex);
                    }
                }
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }

        /// Copy of the entity moved by `offset`; identity attributes are kept.
        pub fn translated(&self, offset: Vector2) -> Entity {
            let mv = |point: Point2| point.translate(offset);
            let kind = match &self.kind {
                EntityKind::Line(line) => EntityKind::Line(Line {
                    start: mv(line.start),
                    end: mv(line.end),
                }),
                EntityKind::Circle(circle) => EntityKind::Circle(Circle {
                    center: mv(circle.center),
                    ..*circle
                }),
                EntityKind::Arc(arc) => EntityKind::Arc(Arc {
                    center: mv(arc.center),
                    ..*arc
                }),
                EntityKind::Polyline(polyline) => EntityKind::Polyline(Polyline {
                    vertices: polyline
                        .vertices
                        .iter()
                        .map(|vertex| PolylineVertex::with_bulge(mv(vertex.position), vertex.bulge))
                        .collect(),
                    closed: polyline.closed,
                }),
                EntityKind::Text(text) => EntityKind::Text(Text {
                    position: mv(text.position),
                    ..text.clone()
                }),
                EntityKind::Point(point) => EntityKind::Point(PointMark {
                    position: mv(point.position),
                }),
                EntityKind::Insert(insert) => EntityKind::Insert(Insert {
                    position: mv(insert.position),
                    ..insert.clone()
                }),
                EntityKind::Ellipse(ellipse) => EntityKind::Ellipse(Ellipse {
                    center: mv(ellipse.center),
                    ..*ellipse
                }),
                EntityKind::Spline(spline) => EntityKind::Spline(Spline {
                    control_points: spline.control_points.iter().copied().map(mv).collect(),
                    fit_points: spline.fit_points.iter().copied().map(mv).collect(),
                    ..spline.clone()
                }),
                EntityKind::Hatch(hatch) => EntityKind::Hatch(Hatch {
                    boundary_paths: hatch
                        .boundary_paths
                        .iter()
                        .map(|path| path.iter().copied().map(mv).collect())
                        .collect(),
                    ..hatch.clone()
                }),
                EntityKind::Dimension(dimension) => EntityKind::Dimension(Dimension {
                    definition_point: mv(dimension.definition_point),
                    middle_point: mv(dimension.middle_point),
                    first_point: dimension.first_point.map(mv),
                    second_point: dimension.second_point.map(mv),
                    ..dimension.clone()
                }),
                EntityKind::Solid(solid) => EntityKind::Solid(Solid {
                    corners: solid.corners.map(mv),
                }),
                EntityKind::Attrib(attrib) => EntityKind::Attrib(Attrib {
                    position: mv(attrib.position),
                    ..attrib.clone()
                }),
                EntityKind::Leader(leader) => EntityKind::Leader(Leader {
                    vertices: leader.vertices.iter().copied().map(mv).collect(),
                    has_arrowhead: leader.has_arrowhead,
                }),
            };
            Entity {
                attrs: self.attrs.clone(),
                kind,
            }
        }

        /// One-line human readable summary used by listings.
        pub fn describe(&self) -> String {
            match &self.kind {
                EntityKind::Line(line) => format!("LINE {} -> {}", line.start, line.end),
                EntityKind::Circle(circle) => {
                    format!("CIRCLE center {} radius {:.4}", circle.center, circle.radius)
                }
                EntityKind::Arc(arc) => format!(
                    "ARC center {} radius {:.4} {:.2}° -> {:.2}°",
                    arc.center, arc.radius, arc.start_angle, arc.end_angle
                ),
                EntityKind::Polyline(polyline) => format!(
                    "LWPOLYLINE {} vertices{}",
                    polyline.vertices.len(),
                    if polyline.closed { " closed" } else { "" }
                ),
                EntityKind::Text(text) => format!("TEXT {:?} at {}", text.content, text.position),
                EntityKind::Point(point) => format!("POINT {}", point.position),
                EntityKind::Insert(insert) => {
                    format!("INSERT {} at {}", insert.block_name, insert.position)
                }
                EntityKind::Ellipse(ellipse) => format!(
                    "ELLIPSE center {} ratio {:.4}",
                    ellipse.center, ellipse.ratio
                ),
                EntityKind::Spline(spline) => format!(
                    "SPLINE degree {} with {} control points",
                    spline.degree,
                    spline.control_points.len()
                ),
                EntityKind::Hatch(hatch) => format!(
                    "HATCH {} with {} loops",
                    hatch.pattern_name,
                    hatch.boundary_paths.len()
                ),
                EntityKind::Dimension(dimension) => {
                    format!("DIMENSION {:?} {:?}", dimension.kind, dimension.text)
                }
                EntityKind::Solid(solid) => format!("SOLID at {}", solid.corners[0]),
                EntityKind::Attrib(attrib) => format!("ATTRIB {}={:?}", attrib.tag, attrib.text),
                EntityKind::Leader(leader) => {
                    format!("LEADER {} vertices", leader.vertices.len())
                }
            }
        }
    }

    /// The editable document: tables, blocks and the ordered entity list.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Drawing {
        layers: IndexMap<String, Layer>,
        line_types: IndexMap<String, LineType>,
        blocks: IndexMap<String, Block>,
        entities: Vec<(EntityId, Entity)>,
        next_entity_id: u64,
        bounds: Bounds2D,
        measured: bool,
    }

    impl Default for Drawing {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drawing {
        pub fn new() -> Self {
            let mut drawing = Self {
                layers: IndexMap::new(),
                line_types: IndexMap::new(),
                blocks: IndexMap::new(),
                entities: Vec::new(),
                next_entity_id: 0,
                bounds: default_bounds(),
                measured: false,
            };
            drawing.ensure_layer(DEFAULT_LAYER);
            drawing.add_line_type(LineType::new(DEFAULT_LINE_TYPE, "Solid line"));
            drawing
        }

        pub fn ensure_layer(&mut self, name: impl AsRef<str>) {
            let key = name.as_ref();
            if !self.layers.contains_key(key) {
                self.layers.insert(key.to_string(), Layer::new(key));
            }
        }

        /// Inserts or replaces a layer definition, keeping its original position.
        pub fn add_layer(&mut self, layer: Layer) {
            self.layers.insert(layer.name.clone(), layer);
        }

        #[inline]
        pub fn layer(&self, name: &str) -> Option<&Layer> {
            self.layers.get(name)
        }

        #[inline]
        pub fn layers(&self) -> impl Iterator<Item = &Layer> {
            self.layers.values()
        }

        /// Undeclared layers and layer "0" are always visible.
        pub fn is_layer_visible(&self, name: &str) -> bool {
            if name == DEFAULT_LAYER {
                return true;
            }
            self.layers.get(name).is_none_or(Layer::is_visible)
        }

        pub fn add_line_type(&mut self, line_type: LineType) {
            self.line_types.insert(line_type.name.clone(), line_type);
        }

        #[inline]
        pub fn line_types(&self) -> impl Iterator<Item = &LineType> {
            self.line_types.values()
        }

        pub fn add_block(&mut self, block: Block) {
            for entity in &block.entities {
                self.ensure_layer(entity.layer());
            }
            self.blocks.insert(block.name.clone(), block);
            self.recompute_bounds();
        }

        #[inline]
        pub fn block(&self, name: &str) -> Option<&Block> {
            self.blocks.get(name)
        }

        #[inline]
        pub fn blocks(&self) -> impl Iterator<Item = &Block> {
            self.blocks.values()
        }

        pub fn add_entity(&mut self, entity: Entity) -> EntityId {
            self.ensure_layer(entity.layer());
            let id = self.next_id();
            if let Some(entity_bounds) = self.bounds_of(&entity) {
                if self.measured {
                    self.bounds.include_bounds(&entity_bounds);
                } else {
                    self.bounds = entity_bounds;
                    self.measured = true;
                }
            }
            self.entities.push((id, entity));
            id
        }

        pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
            let index = self.entities.iter().position(|(entity_id, _)| *entity_id == id)?;
            let (_, entity) = self.entities.remove(index);
            self.recompute_bounds();
            Some(entity)
        }

        /// Removes every listed entity with one extents pass. The result follows the order of
        /// `ids`; unknown and repeated ids are skipped.
        pub fn remove_entities(&mut self, ids: &[EntityId]) -> Vec<(EntityId, Entity)> {
            let wanted: HashSet<EntityId> = ids.iter().copied().collect();
            let (mut removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entities)
                .into_iter()
                .partition(|(id, _)| wanted.contains(id));
            self.entities = kept;
            if !removed.is_empty() {
                self.recompute_bounds();
            }
            let order: HashMap<EntityId, usize> =
                ids.iter().enumerate().rev().map(|(index, id)| (*id, index)).collect();
            removed.sort_by_key(|(id, _)| order.get(id).copied());
            removed
        }

        /// Delete-then-insert: the replacement receives a fresh id at the end of draw order.
        pub fn replace_entity(&mut self, id: EntityId, entity: Entity) -> Option<(Entity, EntityId)> {
            let previous = self.remove_entity(id)?;
            let new_id = self.add_entity(entity);
            Some((previous, new_id))
        }

        #[inline]
        pub fn entity(&self, id: EntityId) -> Option<&Entity> {
            self.entities
                .iter()
                .find_map(|(entity_id, entity)| (*entity_id == id).then_some(entity))
        }

        #[inline]
        pub fn entities(&self) -> impl Iterator<Item = &(EntityId, Entity)> {
            self.entities.iter()
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.entities.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.entities.is_empty()
        }

        /// Derived extents; the fixed default rectangle when nothing is measurable.
        #[inline]
        pub fn bounds(&self) -> Bounds2D {
            self.bounds
        }

        /// Extents of the entities only, `None` when nothing is measurable.
        #[inline]
        pub fn extents(&self) -> Option<Bounds2D> {
            self.measured.then_some(self.bounds)
        }

        pub fn entity_bounds(&self, id: EntityId) -> Option<Bounds2D> {
            self.entity(id).and_then(|entity| self.bounds_of(entity))
        }

        /// Extents including block content for inserts. A missing block contributes
        /// only the insertion point.
        pub fn bounds_of(&self, entity: &Entity) -> Option<Bounds2D> {
            let EntityKind::Insert(insert) = &entity.kind else {
                return entity.bounds();
            };
            let mut bounds = Bounds2D::empty();
            bounds.include_point(insert.position);
            if let Some(block) = self.blocks.get(&insert.block_name) {
                for child in &block.entities {
                    if let Some(child_bounds) = child.bounds() {
                        for corner in child_bounds.corners() {
                            bounds.include_point(insert.transform(block.base_point, corner));
                        }
                    }
                }
            }
            Some(bounds)
        }

        /// Palette index for an entity, resolving the inheritance sentinels.
        /// `insert_color` is the color of the enclosing insert, if any.
        pub fn resolve_color(&self, entity: &Entity, insert_color: Option<u8>) -> u8 {
            let layer_color = self.layers.get(entity.layer()).map_or(7, |layer| layer.color);
            match entity.attrs.color {
                Some(Color::Index(index)) => index,
                Some(Color::ByBlock) => insert_color.unwrap_or(7),
                Some(Color::ByLayer) | None => layer_color,
            }
        }

        fn recompute_bounds(&mut self) {
            let mut bounds = Bounds2D::empty();
            for (_, entity) in &self.entities {
                if let Some(entity_bounds) = self.bounds_of(entity) {
                    bounds.include_bounds(&entity_bounds);
                }
            }
            self.measured = !bounds.is_empty();
            self.bounds = if self.measured {
                bounds
            } else {
                default_bounds()
            };
        }

        #[inline]
        fn next_id(&mut self) -> EntityId {
            let id = self.next_entity_id;
            self.next_entity_id += 1;
            EntityId(id)
        }
    }

    fn default_bounds() -> Bounds2D {
        let (min, max) = DEFAULT_BOUNDS;
        Bounds2D::new(Point2::new(min[0], min[1]), Point2::new(max[0], max[1]))
    }

    fn canonical_interval(start: f64, end: f64) -> (f64, f64) {
        let start = normalize_radians(start);
        let mut end = normalize_radians(end);
        if (end - start).abs() < 1e-9 {
            end = start + TAU;
        } else if end < start {
            end += TAU;
        }
        (start, end)
    }

    fn arc_bounds(arc: &Arc, bounds: &mut Bounds2D) {
        let radius = arc.radius.abs();
        if radius <= f64::EPSILON {
            bounds.include_point(arc.center);
            return;
        }

        let (start, end) =
            canonical_interval(arc.start_angle.to_radians(), arc.end_angle.to_radians());
        let point_at = |angle: f64| arc.center.translate(Vector2::from_angle(angle) * radius);
        bounds.include_point(point_at(start));
        bounds.include_point(point_at(end));

        const QUADRANTS: [f64; 4] = [0.0, FRAC_PI_2, PI, FRAC_PI_2 * 3.0];
        for base in QUADRANTS {
            let mut candidate = base;
            while candidate < start {
                candidate += TAU;
            }
            if candidate <= end {
                bounds.include_point(point_at(candidate));
            }
        }
    }

    fn ellipse_bounds(ellipse: &Ellipse, bounds: &mut Bounds2D) {
        let major_vec = ellipse.major_axis.as_vec2();
        let major_length = major_vec.length();
        if major_length <= f64::EPSILON {
            bounds.include_point(ellipse.center);
            return;
        }
        let minor_vec = major_vec.perp() * ellipse.ratio.abs();

        let (start, end) = if (ellipse.end_parameter - ellipse.start_parameter).abs() < 1e-9 {
            (ellipse.start_parameter, ellipse.start_parameter + TAU)
        } else {
            canonical_interval(ellipse.start_parameter, ellipse.end_parameter)
        };
        let span = end - start;
        let step_count = ((span / (TAU / 64.0)).ceil() as usize).max(16);
        for i in 0..=step_count {
            let t = start + span * (i as f64 / step_count as f64);
            let offset = major_vec * t.cos() + minor_vec * t.sin();
            bounds.include_point(ellipse.center.translate(Vector2::from(offset)));
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn empty_drawing_has_default_bounds_and_layer() {
            let drawing = Drawing::new();
            let bounds = drawing.bounds();
            assert_eq!(bounds.min(), Point2::new(0.0, 0.0));
            assert_eq!(bounds.max(), Point2::new(100.0, 100.0));
            assert!(drawing.layer(DEFAULT_LAYER).is_some());
            assert_eq!(drawing.line_types().count(), 1);
        }

        #[test]
        fn bounds_follow_entity_changes() {
            let mut drawing = Drawing::new();
            let line = drawing.add_entity(Entity::line(Point2::new(-5.0, 2.0), Point2::new(5.0, 4.0)));
            let circle = drawing.add_entity(Entity::circle(Point2::new(20.0, 0.0), 1.0));

            let bounds = drawing.bounds();
            assert!((bounds.min().x() + 5.0).abs() < 1e-9);
            assert!((bounds.max().x() - 21.0).abs() < 1e-9);
            assert!((bounds.min().y() + 1.0).abs() < 1e-9);

            drawing.remove_entity(circle);
            let bounds = drawing.bounds();
            assert!((bounds.max().x() - 5.0).abs() < 1e-9);
            assert!((bounds.min().y() - 2.0).abs() < 1e-9);

            drawing.remove_entity(line);
            assert_eq!(drawing.bounds().max(), Point2::new(100.0, 100.0));
        }

        #[test]
        fn batch_removal_keeps_requested_order() {
            let mut drawing = Drawing::new();
            let a = drawing.add_entity(Entity::line(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)));
            let b = drawing.add_entity(Entity::circle(Point2::new(30.0, 0.0), 2.0));
            let c = drawing.add_entity(Entity::line(Point2::new(0.0, 0.0), Point2::new(0.0, 3.0)));

            let removed = drawing.remove_entities(&[b, a, b, EntityId::new(999)]);
            let ids: Vec<EntityId> = removed.iter().map(|(id, _)| *id).collect();
            assert_eq!(ids, vec![b, a]);
            assert_eq!(drawing.len(), 1);
            assert!(drawing.entity(c).is_some());
            assert_eq!(drawing.bounds().min(), Point2::new(0.0, 0.0));
            assert_eq!(drawing.bounds().max(), Point2::new(0.0, 3.0));

            assert!(drawing.remove_entities(&[a]).is_empty());
        }

        #[test]
        fn replace_assigns_fresh_id_and_keeps_count() {
            let mut drawing = Drawing::new();
            let id = drawing.add_entity(Entity::line(Point2::new(0.0, 0.0), Point2::new(5.0, 0.0)));
            let (previous, new_id) = drawing
                .replace_entity(id, Entity::line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)))
                .expect("entity exists");

            assert_ne!(id, new_id);
            assert!(drawing.entity(id).is_none());
            assert_eq!(drawing.len(), 1);
            match previous.kind {
                EntityKind::Line(line) => assert_eq!(line.end, Point2::new(5.0, 0.0)),
                other => panic!("expected line, got {other:?}"),
            }
            assert!(drawing.replace_entity(id, Entity::circle(Point2::origin(), 1.0)).is_none());
        }

        #[test]
        fn arc_bounds_cover_crossed_quadrants() {
            let entity = Entity::arc(Arc {
                center: Point2::new(0.0, 0.0),
                radius: 2.0,
                start_angle: 45.0,
                end_angle: 135.0,
            });
            let bounds = entity.bounds().expect("arc has bounds");
            assert!((bounds.max().y() - 2.0).abs() < 1e-9);
            assert!((bounds.min().x() + 2.0_f64.sqrt()).abs() < 1e-9);

            let wrapped = Entity::arc(Arc {
                center: Point2::new(0.0, 0.0),
                radius: 1.0,
                start_angle: 270.0,
                end_angle: 90.0,
            });
            let bounds = wrapped.bounds().expect("arc has bounds");
            assert!((bounds.max().x() - 1.0).abs() < 1e-9);
            assert!(bounds.min().x().abs() < 1e-9);
        }

        #[test]
        fn insert_bounds_use_block_and_tolerate_missing_block() {
            let mut drawing = Drawing::new();
            let mut block = Block::new("BOX", Point2::new(0.0, 0.0));
            block
                .entities
                .push(Entity::line(Point2::new(0.0, 0.0), Point2::new(2.0, 1.0)));
            drawing.add_block(block);

            let insert = Entity::new(EntityKind::Insert(Insert {
                block_name: "BOX".into(),
                position: Point2::new(10.0, 10.0),
                scale: Vector2::new(2.0, 2.0),
                rotation: 0.0,
            }));
            let bounds = drawing.bounds_of(&insert).expect("insert has bounds");
            assert!((bounds.max().x() - 14.0).abs() < 1e-9);
            assert!((bounds.max().y() - 12.0).abs() < 1e-9);

            let orphan = Entity::new(EntityKind::Insert(Insert {
                block_name: "MISSING".into(),
                position: Point2::new(3.0, 4.0),
                scale: Vector2::new(1.0, 1.0),
                rotation: 0.0,
            }));
            let bounds = drawing.bounds_of(&orphan).expect("insertion point bounds");
            assert_eq!(bounds.min(), Point2::new(3.0, 4.0));
        }

        #[test]
        fn color_sentinels_inherit() {
            assert_eq!(Color::from_aci(0), Color::ByBlock);
            assert_eq!(Color::from_aci(256), Color::ByLayer);
            assert_eq!(Color::from_aci(-3), Color::ByLayer);
            assert_eq!(Color::from_aci(1), Color::Index(1));

            let mut drawing = Drawing::new();
            let mut layer = Layer::new("RED");
            layer.color = 1;
            drawing.add_layer(layer);
            let mut entity = Entity::line(Point2::origin(), Point2::new(1.0, 0.0)).on_layer("RED");
            assert_eq!(drawing.resolve_color(&entity, None), 1);
            entity.attrs.color = Some(Color::ByBlock);
            assert_eq!(drawing.resolve_color(&entity, Some(3)), 3);
            entity.attrs.color = Some(Color::Index(5));
            assert_eq!(drawing.resolve_color(&entity, Some(3)), 5);
        }

        #[test]
        fn frozen_or_off_layers_are_hidden() {
            let mut drawing = Drawing::new();
            let mut frozen = Layer::new("F");
            frozen.frozen = true;
            drawing.add_layer(frozen);
            let mut off = Layer::new("O");
            off.off = true;
            drawing.add_layer(off);

            assert!(!drawing.is_layer_visible("F"));
            assert!(!drawing.is_layer_visible("O"));
            assert!(drawing.is_layer_visible("UNDECLARED"));
            assert!(drawing.is_layer_visible(DEFAULT_LAYER));
        }

        #[test]
        fn translated_moves_every_point() {
            let entity = Entity::polyline(Polyline::from_points(
                [Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)],
                false,
            ))
            .on_layer("GEOM");
            let moved = entity.translated(Vector2::new(2.0, -1.0));
            assert_eq!(moved.layer(), "GEOM");
            match moved.kind {
                EntityKind::Polyline(polyline) => {
                    assert_eq!(polyline.vertices[1].position, Point2::new(3.0, 0.0));
                }
                other => panic!("expected polyline, got {other:?}"),
            }
        }
    }
}
