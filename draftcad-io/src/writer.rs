//! ASCII DXF output: HEADER extents, LTYPE/LAYER tables, blocks and entities.

use draftcad_core::document::{Block, Drawing, Entity, EntityKind, Layer, LineType};
use draftcad_core::geometry::Point2;

use crate::text::escape_text;

pub(crate) fn write(drawing: &Drawing) -> String {
    let mut writer = DxfWriter::default();
    writer.header(drawing);
    writer.tables(drawing);
    writer.blocks(drawing);
    writer.section("ENTITIES", |writer| {
        for (_, entity) in drawing.entities() {
            writer.entity(entity);
        }
    });
    writer.record("EOF");
    writer.out
}

#[derive(Default)]
struct DxfWriter {
    out: String,
}

impl DxfWriter {
    /// Codes are right-aligned in a three character field.
    fn code(&mut self, code: i32) {
        self.out.push_str(&format!("{code:>3}\n"));
    }

    fn text(&mut self, code: i32, value: &str) {
        self.code(code);
        self.out.push_str(value);
        self.out.push('\n');
    }

    fn int(&mut self, code: i32, value: i64) {
        self.code(code);
        self.out.push_str(&value.to_string());
        self.out.push('\n');
    }

    fn double(&mut self, code: i32, value: f64) {
        self.code(code);
        let formatted = if value == value.trunc() && value.abs() < 1e15 {
            format!("{value:.1}")
        } else {
            value.to_string()
        };
        self.out.push_str(&formatted);
        self.out.push('\n');
    }

    /// Writes `point` with the X code; Y uses `code + 10`.
    fn point(&mut self, code: i32, point: Point2) {
        self.double(code, point.x());
        self.double(code + 10, point.y());
    }

    fn record(&mut self, name: &str) {
        self.text(0, name);
    }

    fn section(&mut self, name: &str, body: impl FnOnce(&mut Self)) {
        self.record("SECTION");
        self.text(2, name);
        body(self);
        self.record("ENDSEC");
    }

    fn header(&mut self, drawing: &Drawing) {
        let bounds = drawing.bounds();
        self.section("HEADER", |writer| {
            writer.text(9, "$ACADVER");
            writer.text(1, "AC1015");
            writer.text(9, "$INSUNITS");
            writer.int(70, 4);
            writer.text(9, "$EXTMIN");
            writer.point(10, bounds.min());
            writer.text(9, "$EXTMAX");
            writer.point(10, bounds.max());
        });
    }

    fn tables(&mut self, drawing: &Drawing) {
        self.section("TABLES", |writer| {
            let line_types: Vec<&LineType> = drawing.line_types().collect();
            writer.table("LTYPE", line_types.len(), |writer| {
                for line_type in line_types {
                    writer.record("LTYPE");
                    writer.text(2, &line_type.name);
                    writer.int(70, 0);
                    writer.text(3, &line_type.description);
                    writer.int(72, 65);
                    writer.int(73, 0);
                    writer.double(40, 0.0);
                }
            });
            let layers: Vec<&Layer> = drawing.layers().collect();
            writer.table("LAYER", layers.len(), |writer| {
                for layer in layers {
                    writer.layer(layer);
                }
            });
        });
    }

    fn table(&mut self, name: &str, count: usize, body: impl FnOnce(&mut Self)) {
        self.record("TABLE");
        self.text(2, name);
        self.int(70, count as i64);
        body(self);
        self.record("ENDTAB");
    }

    fn layer(&mut self, layer: &Layer) {
        self.record("LAYER");
        self.text(2, &layer.name);
        self.int(70, i64::from(layer.frozen));
        let color = i64::from(layer.color.max(1));
        self.int(62, if layer.off { -color } else { color });
        self.text(6, &layer.line_type);
    }

    fn blocks(&mut self, drawing: &Drawing) {
        self.section("BLOCKS", |writer| {
            for block in drawing.blocks() {
                writer.block(block);
            }
        });
    }

    fn block(&mut self, block: &Block) {
        self.record("BLOCK");
        self.text(8, "0");
        self.text(2, &block.name);
        self.int(70, 0);
        self.point(10, block.base_point);
        self.text(3, &block.name);
        for entity in &block.entities {
            self.entity(entity);
        }
        self.record("ENDBLK");
        self.text(8, "0");
    }

    fn entity(&mut self, entity: &Entity) {
        self.record(entity.type_name());
        if let Some(handle) = &entity.attrs.handle {
            self.text(5, handle);
        }
        self.text(8, &entity.attrs.layer);
        if let Some(line_type) = &entity.attrs.line_type {
            self.text(6, line_type);
        }
        if let Some(color) = entity.attrs.color {
            self.int(62, i64::from(color.to_aci()));
        }

        match &entity.kind {
            EntityKind::Line(line) => {
                self.point(10, line.start);
                self.point(11, line.end);
            }
            EntityKind::Circle(circle) => {
                self.point(10, circle.center);
                self.double(40, circle.radius);
            }
            EntityKind::Arc(arc) => {
                self.point(10, arc.center);
                self.double(40, arc.radius);
                self.double(50, arc.start_angle);
                self.double(51, arc.end_angle);
            }
            EntityKind::Polyline(polyline) => {
                self.int(90, polyline.vertices.len() as i64);
                self.int(70, i64::from(polyline.closed));
                for vertex in &polyline.vertices {
                    self.point(10, vertex.position);
                    if vertex.bulge != 0.0 {
                        self.double(42, vertex.bulge);
                    }
                }
            }
            EntityKind::Text(text) => {
                self.point(10, text.position);
                self.double(40, text.height);
                self.text(1, &escape_text(&text.content));
                self.double(50, text.rotation);
                let alignment = text.alignment.code();
                if alignment != 0 {
                    self.int(72, i64::from(alignment));
                    self.point(11, text.position);
                }
            }
            EntityKind::Point(point) => self.point(10, point.position),
            EntityKind::Insert(insert) => {
                self.text(2, &insert.block_name);
                self.point(10, insert.position);
                self.double(41, insert.scale.x());
                self.double(42, insert.scale.y());
                self.double(43, 1.0);
                self.double(50, insert.rotation);
            }
            EntityKind::Ellipse(ellipse) => {
                self.point(10, ellipse.center);
                self.double(11, ellipse.major_axis.x());
                self.double(21, ellipse.major_axis.y());
                self.double(40, ellipse.ratio);
                self.double(41, ellipse.start_parameter);
                self.double(42, ellipse.end_parameter);
            }
            EntityKind::Spline(spline) => {
                self.int(70, 8 | i64::from(spline.closed));
                self.int(71, i64::from(spline.degree));
                self.int(72, spline.knots.len() as i64);
                self.int(73, spline.control_points.len() as i64);
                self.int(74, spline.fit_points.len() as i64);
                for knot in &spline.knots {
                    self.double(40, *knot);
                }
                for point in &spline.control_points {
                    self.point(10, *point);
                }
                for point in &spline.fit_points {
                    self.point(11, *point);
                }
            }
            EntityKind::Hatch(hatch) => {
                self.point(10, Point2::origin());
                self.text(2, &hatch.pattern_name);
                self.int(70, i64::from(hatch.solid));
                self.int(71, 0);
                self.int(91, hatch.boundary_paths.len() as i64);
                for path in &hatch.boundary_paths {
                    self.int(92, 2);
                    self.int(72, 0);
                    self.int(73, 1);
                    self.int(93, path.len() as i64);
                    for point in path {
                        self.point(10, *point);
                    }
                    self.int(97, 0);
                }
                self.int(75, 0);
                self.int(76, 1);
                if !hatch.solid {
                    self.double(52, 0.0);
                    self.double(41, 1.0);
                    self.int(77, 0);
                    self.int(78, 0);
                }
                self.int(98, 0);
            }
            EntityKind::Dimension(dimension) => {
                self.point(10, dimension.definition_point);
                self.point(11, dimension.middle_point);
                self.int(70, i64::from(dimension.kind.code() | dimension.flags));
                self.text(1, &escape_text(&dimension.text));
                if let Some(first) = dimension.first_point {
                    self.point(13, first);
                }
                if let Some(second) = dimension.second_point {
                    self.point(14, second);
                }
                self.double(50, dimension.rotation);
            }
            EntityKind::Solid(solid) => {
                for (index, corner) in solid.corners.iter().enumerate() {
                    self.point(10 + index as i32, *corner);
                }
            }
            EntityKind::Attrib(attrib) => {
                self.point(10, attrib.position);
                self.double(40, attrib.height);
                self.text(1, &escape_text(&attrib.text));
                self.text(2, &attrib.tag);
                self.int(70, 0);
                self.double(50, attrib.rotation);
            }
            EntityKind::Leader(leader) => {
                self.int(71, i64::from(leader.has_arrowhead));
                self.int(76, leader.vertices.len() as i64);
                for vertex in &leader.vertices {
                    self.point(10, *vertex);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_right_aligned_and_integral_doubles_keep_a_decimal() {
        let mut writer = DxfWriter::default();
        writer.double(10, 5.0);
        writer.double(40, 0.25);
        writer.int(0, 1);
        assert_eq!(writer.out, " 10\n5.0\n 40\n0.25\n  0\n1\n");
    }

    #[test]
    fn off_layers_write_a_negative_color() {
        let mut writer = DxfWriter::default();
        let mut layer = Layer::new("HIDDEN");
        layer.color = 3;
        layer.off = true;
        writer.layer(&layer);
        assert!(writer.out.contains(" 62\n-3\n"));
    }
}
