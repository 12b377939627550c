//! Cursor-driven previews attached to pending requests.

use draftcad_core::dimension::{DimOrientation, DimStyle, angular_layout, linear_layout};
use draftcad_core::document::{Entity, EntityKind};
use draftcad_core::geometry::Point2;

use crate::interaction::{Jig, Presentation, PreviewShape};

/// Line from a fixed anchor to the cursor.
pub struct RubberBand {
    pub anchor: Point2,
}

impl Jig for RubberBand {
    fn update(&mut self, cursor: Point2, view: &mut dyn Presentation) {
        view.show_preview(&[PreviewShape::Line {
            start: self.anchor,
            end: cursor,
        }]);
    }
}

/// Circle centred on a fixed point through the cursor.
pub struct CircleDrag {
    pub center: Point2,
    /// Show the cursor distance as a diameter.
    pub diameter: bool,
}

impl Jig for CircleDrag {
    fn update(&mut self, cursor: Point2, view: &mut dyn Presentation) {
        let distance = self.center.distance_to(cursor);
        let radius = if self.diameter { distance / 2.0 } else { distance };
        view.show_preview(&[
            PreviewShape::Circle {
                center: self.center,
                radius,
            },
            PreviewShape::Line {
                start: self.center,
                end: cursor,
            },
        ]);
    }
}

/// Axis-aligned rectangle from a fixed corner to the cursor.
pub struct RectangleDrag {
    pub corner: Point2,
}

impl Jig for RectangleDrag {
    fn update(&mut self, cursor: Point2, view: &mut dyn Presentation) {
        view.show_preview(&[PreviewShape::Rectangle {
            first: self.corner,
            second: cursor,
        }]);
    }
}

/// Arc through two fixed points and the cursor.
pub struct ThreePointArc {
    pub start: Point2,
    pub mid: Point2,
}

impl Jig for ThreePointArc {
    fn update(&mut self, cursor: Point2, view: &mut dyn Presentation) {
        view.show_preview(&[PreviewShape::Arc {
            start: self.start,
            mid: self.mid,
            end: cursor,
        }]);
    }
}

/// Counter-clockwise arc around a centre from a start point toward the cursor.
pub struct CenterArc {
    pub center: Point2,
    pub start: Point2,
}

impl Jig for CenterArc {
    fn update(&mut self, cursor: Point2, view: &mut dyn Presentation) {
        let radius = self.center.distance_to(self.start);
        let start_angle = self.center.vector_to(self.start).angle().to_degrees();
        let end_angle = self.center.vector_to(cursor).angle().to_degrees();
        let sweep = (end_angle - start_angle).rem_euclid(360.0);
        view.show_preview(&[
            PreviewShape::Arc {
                start: self.start,
                mid: self.center.polar(radius, start_angle + sweep / 2.0),
                end: self.center.polar(radius, end_angle),
            },
            PreviewShape::Line {
                start: self.center,
                end: cursor,
            },
        ]);
    }
}

/// Placed vertices plus a rubber band to the cursor.
pub struct PolylineDrag {
    pub points: Vec<Point2>,
}

impl Jig for PolylineDrag {
    fn update(&mut self, cursor: Point2, view: &mut dyn Presentation) {
        let mut points = self.points.clone();
        points.push(cursor);
        view.show_preview(&[PreviewShape::Polyline { points, closed: false }]);
    }
}

/// Snapshot of entity outlines dragged by the cursor offset from `base`.
pub struct Drag {
    pub base: Point2,
    pub shapes: Vec<PreviewShape>,
}

impl Drag {
    pub fn new(base: Point2, entities: &[&Entity]) -> Self {
        let shapes = entities
            .iter()
            .filter_map(|entity| preview_of(entity))
            .collect();
        Self { base, shapes }
    }
}

impl Jig for Drag {
    fn update(&mut self, cursor: Point2, view: &mut dyn Presentation) {
        let offset = self.base.vector_to(cursor);
        let mut shapes: Vec<PreviewShape> = self
            .shapes
            .iter()
            .map(|shape| shape.translated(offset))
            .collect();
        shapes.push(PreviewShape::Line {
            start: self.base,
            end: cursor,
        });
        view.show_preview(&shapes);
    }
}

/// Linear dimension laid out live through the cursor.
pub struct LinearDimensionDrag {
    pub first: Point2,
    pub second: Point2,
    pub orientation: DimOrientation,
    pub style: DimStyle,
}

impl Jig for LinearDimensionDrag {
    fn update(&mut self, cursor: Point2, view: &mut dyn Presentation) {
        match linear_layout(self.first, self.second, cursor, self.orientation, &self.style) {
            Ok(layout) => view.show_preview(&[PreviewShape::Dimension {
                segments: layout.segments(),
                text_position: layout.text_position,
                text: layout.text(),
            }]),
            Err(_) => view.clear_preview(),
        }
    }
}

/// Angular dimension between two lines, sector chosen by the cursor.
pub struct AngularDimensionDrag {
    pub first: (Point2, Point2),
    pub second: (Point2, Point2),
    pub style: DimStyle,
}

impl Jig for AngularDimensionDrag {
    fn update(&mut self, cursor: Point2, view: &mut dyn Presentation) {
        match angular_layout(self.first, self.second, cursor, &self.style) {
            Ok(layout) => {
                let [start, mid, end] = layout.arc_points();
                let mut segments = layout.extension_lines.clone();
                for arrow in &layout.arrows {
                    segments.extend(arrow.segments());
                }
                view.show_preview(&[
                    PreviewShape::Arc { start, mid, end },
                    PreviewShape::Dimension {
                        segments,
                        text_position: layout.text_position,
                        text: layout.text(),
                    },
                ]);
            }
            Err(_) => view.clear_preview(),
        }
    }
}

/// Outline used when dragging an existing entity. Kinds without a simple outline
/// fall back to their bounding box.
pub fn preview_of(entity: &Entity) -> Option<PreviewShape> {
    let shape = match &entity.kind {
        EntityKind::Line(line) => PreviewShape::Line {
            start: line.start,
            end: line.end,
        },
        EntityKind::Circle(circle) => PreviewShape::Circle {
            center: circle.center,
            radius: circle.radius,
        },
        EntityKind::Arc(arc) => PreviewShape::Arc {
            start: arc.start_point(),
            mid: arc.mid_point(),
            end: arc.end_point(),
        },
        EntityKind::Polyline(polyline) => PreviewShape::Polyline {
            points: polyline.points(),
            closed: polyline.closed,
        },
        _ => {
            let bounds = entity.bounds()?;
            PreviewShape::Rectangle {
                first: bounds.min(),
                second: bounds.max(),
            }
        }
    };
    Some(shape)
}

#[cfg(test)]
mod tests {
    use draftcad_core::document::Entity;
    use draftcad_core::geometry::Bounds2D;

    use super::*;
    use crate::command::EditRecord;

    #[derive(Default)]
    struct View {
        shapes: Vec<PreviewShape>,
        cleared: usize,
    }

    impl Presentation for View {
        fn show_preview(&mut self, shapes: &[PreviewShape]) {
            self.shapes = shapes.to_vec();
        }

        fn clear_preview(&mut self) {
            self.shapes.clear();
            self.cleared += 1;
        }

        fn zoom_extents(&mut self, _bounds: Bounds2D, _padding: f64) {}

        fn zoom_window(&mut self, _first: Point2, _second: Point2) {}

        fn entities_changed(&mut self, _record: &EditRecord) {}
    }

    #[test]
    fn drag_translates_snapshotted_outlines() {
        let line = Entity::line(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0));
        let mut jig = Drag::new(Point2::new(0.0, 0.0), &[&line]);
        let mut view = View::default();
        jig.update(Point2::new(5.0, 5.0), &mut view);
        assert_eq!(
            view.shapes[0],
            PreviewShape::Line {
                start: Point2::new(5.0, 5.0),
                end: Point2::new(6.0, 5.0)
            }
        );
        jig.clear(&mut view);
        assert!(view.shapes.is_empty());
        assert_eq!(view.cleared, 1);
    }

    #[test]
    fn degenerate_dimension_preview_clears_instead_of_drawing() {
        let point = Point2::new(1.0, 1.0);
        let mut jig = LinearDimensionDrag {
            first: point,
            second: point,
            orientation: DimOrientation::Aligned,
            style: DimStyle::default(),
        };
        let mut view = View::default();
        jig.update(Point2::new(3.0, 3.0), &mut view);
        assert!(view.shapes.is_empty());
        assert_eq!(view.cleared, 1);
    }
}
