
use std::path::PathBuf;

use draftcad_core::document::{
    Arc, Attrib, Block, Color, Dimension, DimensionKind, Drawing, Ellipse, Entity, EntityKind,
    Hatch, Insert, Layer, Leader, LineType, PointMark, Polyline, PolylineVertex, Solid, Spline,
    Text, TextAlignment,
};
use draftcad_core::geometry::{Point2, Vector2};
use glam::DVec2;
use golden::assert_golden;
use serde_json::json;
use draftcad_io::{DocumentLoader, DocumentSaver, DxfFacade, FormatError, IoError, decode, encode};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

/// Builds DXF text from `(code, value)` pairs.
fn dxf(pairs: &[(i32, &str)]) -> String {
    pairs
        .iter()
        .map(|(code, value)| format!("{code}\n{value}\n"))
        .collect()
}

fn entities_section(body: &[(i32, &str)]) -> String {
    let mut pairs = vec![(0, "SECTION"), (2, "ENTITIES")];
    pairs.extend_from_slice(body);
    pairs.extend_from_slice(&[(0, "ENDSEC"), (0, "EOF")]);
    dxf(&pairs)
}

fn only_entity(drawing: &Drawing) -> &Entity {
    assert_eq!(drawing.len(), 1, "expected exactly one entity");
    let (_, entity) = drawing.entities().next().expect("entity");
    entity
}

#[test]
fn decodes_single_line_on_default_layer() {
    let source = "0\nSECTION\n2\nENTITIES\n0\nLINE\n8\n0\n10\n0\n20\n0\n11\n10\n21\n0\n0\nENDSEC\n0\nEOF\n";
    let drawing = decode(source).expect("decode");
    let entity = only_entity(&drawing);
    assert_eq!(entity.layer(), "0");
    match &entity.kind {
        EntityKind::Line(line) => {
            assert_eq!(line.start, Point2::new(0.0, 0.0));
            assert_eq!(line.end, Point2::new(10.0, 0.0));
        }
        other => panic!("expected a line, got {other:?}"),
    }
}

#[test]
fn empty_input_is_an_empty_drawing_with_default_bounds() {
    let drawing = decode("").expect("decode");
    assert!(drawing.is_empty());
    assert_eq!(drawing.bounds().min(), Point2::new(0.0, 0.0));
    assert_eq!(drawing.bounds().max(), Point2::new(100.0, 100.0));
    assert!(drawing.layer("0").is_some());
}

#[test]
fn load_basic_entities_matches_expected_document() {
    let drawing = DxfFacade::new()
        .load(&fixture("basic_entities.dxf"))
        .expect("load fixture");

    assert_golden(
        &drawing,
        json!({
            "layers": [
                { "name": "0", "color": 7, "visible": true },
                { "name": "WALLS", "color": 1, "visible": true },
                { "name": "HIDDEN", "color": 3, "visible": false },
                { "name": "FROZEN", "color": 5, "visible": false }
            ],
            "blocks": [
                { "name": "DOOR", "base_point": [0.0, 0.0], "entities": ["LINE", "ARC"] }
            ],
            "entities": [
                {
                    "id": 0, "kind": "LINE", "layer": "WALLS",
                    "data": { "start": [0.0, 0.0], "end": [10.0, 0.0] }
                },
                {
                    "id": 1, "kind": "CIRCLE", "layer": "WALLS",
                    "data": { "center": [20.0, 5.0], "radius": 2.5 }
                },
                {
                    "id": 2, "kind": "LWPOLYLINE", "layer": "0",
                    "data": {
                        "vertices": [
                            { "position": [0.0, 0.0], "bulge": 1.0 },
                            { "position": [10.0, 0.0], "bulge": 0.0 }
                        ],
                        "closed": false
                    }
                },
                {
                    "id": 3, "kind": "TEXT", "layer": "HIDDEN",
                    "data": {
                        "position": [1.0, 2.0],
                        "content": "Hello\nWorld",
                        "height": 0.5,
                        "rotation": 0.0,
                        "alignment": "Left"
                    }
                },
                {
                    "id": 4, "kind": "INSERT", "layer": "0",
                    "data": {
                        "block_name": "DOOR",
                        "position": [30.0, 10.0],
                        "scale": [2.0, 2.0],
                        "rotation": 0.0
                    }
                }
            ]
        }),
    );

    assert!(drawing.line_types().any(|line_type| line_type.name == "DASHED"));
    assert!(drawing.block("*Model_Space").is_none());
    assert!(!drawing.is_layer_visible("HIDDEN"));
    assert!(drawing.is_layer_visible("UNDECLARED"));
}

#[test]
fn fixture_colors_and_insert_bounds_resolve() {
    let drawing = DxfFacade::new()
        .load(&fixture("basic_entities.dxf"))
        .expect("load fixture");
    let entities: Vec<&Entity> = drawing.entities().map(|(_, entity)| entity).collect();

    // Line: BYLAYER on WALLS; circle: explicit index.
    assert_eq!(entities[0].attrs.color, None);
    assert_eq!(drawing.resolve_color(entities[0], None), 1);
    assert_eq!(entities[1].attrs.color, Some(Color::Index(2)));
    assert_eq!(entities[0].attrs.handle.as_deref(), Some("1A"));

    let door = drawing.block("DOOR").expect("DOOR block");
    assert_eq!(door.entities[1].attrs.color, Some(Color::ByBlock));
    assert_eq!(drawing.resolve_color(&door.entities[1], Some(4)), 4);

    // DOOR spans (0,0)-(1,1) locally; the insert doubles it at (30,10).
    let bounds = drawing.bounds_of(entities[4]).expect("insert bounds");
    assert_eq!(bounds.max(), Point2::new(32.0, 12.0));
    assert_eq!(drawing.bounds().max(), Point2::new(32.0, 12.0));
    assert_eq!(drawing.bounds().min(), Point2::new(0.0, 0.0));
}

#[test]
fn unknown_entities_and_sections_are_skipped() {
    let mut pairs = vec![
        (0, "SECTION"),
        (2, "THUMBNAILIMAGE"),
        (90, "4"),
        (310, "DEADBEEF"),
        (0, "ENDSEC"),
    ];
    pairs.extend_from_slice(&[
        (0, "SECTION"),
        (2, "ENTITIES"),
        (0, "MESH"),
        (8, "0"),
        (10, "1.0"),
        (0, "POINT"),
        (8, "MARKS"),
        (10, "3.0"),
        (20, "4.0"),
        (0, "ENDSEC"),
        (0, "EOF"),
    ]);
    let drawing = decode(&dxf(&pairs)).expect("decode");
    let entity = only_entity(&drawing);
    assert_eq!(
        entity.kind,
        EntityKind::Point(PointMark {
            position: Point2::new(3.0, 4.0)
        })
    );
    assert!(drawing.layer("MARKS").is_some());
}

#[test]
fn missing_terminators_are_errors() {
    let no_endsec = dxf(&[
        (0, "SECTION"),
        (2, "ENTITIES"),
        (0, "LINE"),
        (10, "0"),
        (20, "0"),
        (11, "1"),
        (21, "1"),
    ]);
    assert!(matches!(decode(&no_endsec), Err(FormatError::Truncated { .. })));

    let no_endtab = dxf(&[
        (0, "SECTION"),
        (2, "TABLES"),
        (0, "TABLE"),
        (2, "LAYER"),
        (0, "LAYER"),
        (2, "WALLS"),
        (0, "ENDSEC"),
        (0, "EOF"),
    ]);
    match decode(&no_endtab) {
        Err(FormatError::Invalid { message, .. }) => assert!(message.contains("ENDTAB"), "{message}"),
        other => panic!("expected missing ENDTAB error, got {other:?}"),
    }

    let no_endblk = dxf(&[
        (0, "SECTION"),
        (2, "BLOCKS"),
        (0, "BLOCK"),
        (2, "BOLT"),
        (10, "0"),
        (20, "0"),
        (0, "CIRCLE"),
        (10, "0"),
        (20, "0"),
        (40, "1"),
        (0, "ENDSEC"),
        (0, "EOF"),
    ]);
    match decode(&no_endblk) {
        Err(FormatError::Invalid { message, .. }) => assert!(message.contains("ENDBLK"), "{message}"),
        other => panic!("expected missing ENDBLK error, got {other:?}"),
    }
}

#[test]
fn malformed_numbers_report_the_line() {
    let source = entities_section(&[(0, "CIRCLE"), (10, "0"), (20, "zero"), (40, "1")]);
    match decode(&source) {
        Err(FormatError::Invalid { line, message }) => {
            assert_eq!(line, 9);
            assert!(message.starts_with("CIRCLE:"), "{message}");
        }
        other => panic!("expected invalid number error, got {other:?}"),
    }

    let missing_radius = entities_section(&[(0, "CIRCLE"), (10, "0"), (20, "0")]);
    assert!(matches!(decode(&missing_radius), Err(FormatError::Invalid { .. })));
}

#[test]
fn missing_eof_record_is_tolerated() {
    let source = dxf(&[(0, "SECTION"), (2, "HEADER"), (0, "ENDSEC")]);
    let drawing = decode(&source).expect("decode");
    assert!(drawing.is_empty());
}

#[test]
fn mtext_is_flattened_to_text() {
    let source = entities_section(&[
        (0, "MTEXT"),
        (8, "NOTES"),
        (10, "5.0"),
        (20, "6.0"),
        (40, "2.5"),
        (71, "5"),
        (3, "{\\fArial;Line1\\P"),
        (1, "Line2}"),
        (11, "0.0"),
        (21, "1.0"),
    ]);
    let drawing = decode(&source).expect("decode");
    let EntityKind::Text(text) = &only_entity(&drawing).kind else {
        panic!("MTEXT should decode as text");
    };
    assert_eq!(text.content, "Line1\nLine2");
    assert_eq!(text.position, Point2::new(5.0, 6.0));
    assert_eq!(text.alignment, TextAlignment::Center);
    assert!((text.rotation - 90.0).abs() < 1e-9);
    assert!((text.height - 2.5).abs() < 1e-12);
}

#[test]
fn heavy_polyline_becomes_lightweight() {
    let source = entities_section(&[
        (0, "POLYLINE"),
        (8, "0"),
        (66, "1"),
        (70, "1"),
        (0, "VERTEX"),
        (10, "0.0"),
        (20, "0.0"),
        (0, "VERTEX"),
        (10, "4.0"),
        (20, "0.0"),
        (42, "0.5"),
        (0, "VERTEX"),
        (10, "4.0"),
        (20, "3.0"),
        (0, "SEQEND"),
        (8, "0"),
        (0, "POLYLINE"),
        (70, "64"),
        (0, "VERTEX"),
        (10, "0.0"),
        (20, "0.0"),
        (0, "SEQEND"),
    ]);
    let drawing = decode(&source).expect("decode");
    let EntityKind::Polyline(polyline) = &only_entity(&drawing).kind else {
        panic!("expected a polyline");
    };
    assert!(polyline.closed);
    assert_eq!(polyline.vertices.len(), 3);
    assert!((polyline.vertices[1].bulge - 0.5).abs() < 1e-12);

    let unterminated = entities_section(&[(0, "POLYLINE"), (0, "VERTEX"), (10, "0"), (20, "0")]);
    assert!(decode(&unterminated).is_err());
}

#[test]
fn hatch_edge_and_polyline_loops_are_flattened() {
    let source = entities_section(&[
        (0, "HATCH"),
        (8, "0"),
        (10, "0.0"),
        (20, "0.0"),
        (2, "ANSI31"),
        (70, "0"),
        (71, "1"),
        (91, "2"),
        // Edge loop: a triangle of line edges.
        (92, "1"),
        (93, "3"),
        (72, "1"),
        (10, "0.0"),
        (20, "0.0"),
        (11, "10.0"),
        (21, "0.0"),
        (72, "1"),
        (10, "10.0"),
        (20, "0.0"),
        (11, "10.0"),
        (21, "10.0"),
        (72, "1"),
        (10, "10.0"),
        (20, "10.0"),
        (11, "0.0"),
        (21, "0.0"),
        (97, "1"),
        (330, "2F"),
        // Polyline loop.
        (92, "2"),
        (72, "0"),
        (73, "1"),
        (93, "3"),
        (10, "20.0"),
        (20, "0.0"),
        (10, "30.0"),
        (20, "0.0"),
        (10, "30.0"),
        (20, "5.0"),
        (97, "0"),
        (75, "1"),
        (76, "1"),
        (52, "0.0"),
        (41, "1.0"),
        (77, "0"),
        (78, "1"),
        (53, "45.0"),
        (43, "0.0"),
        (44, "0.0"),
        (45, "-0.1"),
        (46, "0.1"),
        (79, "0"),
        (98, "1"),
        (10, "5.0"),
        (20, "2.0"),
    ]);
    let drawing = decode(&source).expect("decode");
    let EntityKind::Hatch(hatch) = &only_entity(&drawing).kind else {
        panic!("expected a hatch");
    };
    assert_eq!(hatch.pattern_name, "ANSI31");
    assert!(!hatch.solid);
    assert_eq!(hatch.boundary_paths.len(), 2);
    assert_eq!(
        hatch.boundary_paths[0],
        vec![Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), Point2::new(10.0, 10.0)]
    );
    assert_eq!(hatch.boundary_paths[1].len(), 3);
    assert_eq!(hatch.boundary_paths[1][2], Point2::new(30.0, 5.0));
}

#[test]
fn hatch_arc_edges_are_tessellated() {
    let source = entities_section(&[
        (0, "HATCH"),
        (2, "SOLID"),
        (70, "1"),
        (91, "1"),
        (92, "0"),
        (93, "2"),
        (72, "2"),
        (10, "0.0"),
        (20, "0.0"),
        (40, "5.0"),
        (50, "0.0"),
        (51, "180.0"),
        (73, "1"),
        (72, "1"),
        (10, "-5.0"),
        (20, "0.0"),
        (11, "5.0"),
        (21, "0.0"),
        (97, "0"),
        (75, "0"),
        (76, "1"),
        (98, "0"),
    ]);
    let drawing = decode(&source).expect("decode");
    let EntityKind::Hatch(hatch) = &only_entity(&drawing).kind else {
        panic!("expected a hatch");
    };
    assert!(hatch.solid);
    let path = &hatch.boundary_paths[0];
    assert!(path.len() > 4);
    for point in path {
        assert!(point.distance_to(Point2::new(0.0, 0.0)) <= 5.0 + 1e-9);
        assert!(point.y() >= -1e-9);
    }
}

fn sample_drawing() -> Drawing {
    let mut drawing = Drawing::new();
    let mut walls = Layer::new("WALLS");
    walls.color = 1;
    drawing.add_layer(walls);
    let mut hidden = Layer::new("HIDDEN");
    hidden.off = true;
    hidden.frozen = true;
    hidden.color = 8;
    drawing.add_layer(hidden);
    drawing.add_line_type(LineType::new("DASHED", "Dashed"));

    let mut block = Block::new("BOLT", Point2::new(1.0, 1.0));
    block.entities.push(Entity::circle(Point2::new(1.0, 1.0), 0.5));
    drawing.add_block(block);

    let mut line = Entity::line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)).on_layer("WALLS");
    line.attrs.handle = Some("2A".to_string());
    line.attrs.color = Some(Color::Index(3));
    line.attrs.line_type = Some("DASHED".to_string());
    drawing.add_entity(line);
    let mut by_block = Entity::circle(Point2::new(5.0, 5.0), 1.25);
    by_block.attrs.color = Some(Color::ByBlock);
    drawing.add_entity(by_block);
    drawing.add_entity(Entity::arc(Arc {
        center: Point2::new(0.0, 0.0),
        radius: 3.0,
        start_angle: 30.0,
        end_angle: 300.0,
    }));
    drawing.add_entity(Entity::polyline(Polyline {
        vertices: vec![
            PolylineVertex::new(Point2::new(0.0, 0.0)),
            PolylineVertex::with_bulge(Point2::new(4.0, 0.0), -0.25),
            PolylineVertex::new(Point2::new(4.0, 4.0)),
        ],
        closed: true,
    }));
    drawing.add_entity(Entity::new(EntityKind::Text(Text {
        position: Point2::new(1.0, 1.0),
        content: "two\nlines with C:\\path".to_string(),
        height: 2.5,
        rotation: 15.0,
        alignment: TextAlignment::Right,
    })));
    drawing.add_entity(Entity::new(EntityKind::Point(PointMark {
        position: Point2::new(7.0, 8.0),
    })));
    drawing.add_entity(Entity::new(EntityKind::Insert(Insert {
        block_name: "BOLT".to_string(),
        position: Point2::new(20.0, 20.0),
        scale: Vector2::new(2.0, 0.5),
        rotation: 45.0,
    })));
    drawing.add_entity(Entity::new(EntityKind::Ellipse(Ellipse {
        center: Point2::new(0.0, 0.0),
        major_axis: Vector2::new(4.0, 0.0),
        ratio: 0.5,
        start_parameter: 0.0,
        end_parameter: std::f64::consts::PI,
    })));
    drawing.add_entity(Entity::new(EntityKind::Spline(Spline {
        degree: 3,
        control_points: vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 2.0),
            Point2::new(3.0, 2.0),
            Point2::new(4.0, 0.0),
        ],
        fit_points: vec![Point2::new(0.0, 0.0), Point2::new(4.0, 0.0)],
        knots: vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
        closed: false,
    })));
    drawing.add_entity(Entity::new(EntityKind::Hatch(Hatch {
        boundary_paths: vec![vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
        ]],
        solid: true,
        pattern_name: "SOLID".to_string(),
    })));
    drawing.add_entity(Entity::new(EntityKind::Dimension(Dimension {
        kind: DimensionKind::Aligned,
        flags: 32,
        definition_point: Point2::new(0.0, 5.0),
        middle_point: Point2::new(5.0, 5.0),
        first_point: Some(Point2::new(0.0, 0.0)),
        second_point: Some(Point2::new(10.0, 0.0)),
        text: "10".to_string(),
        rotation: 0.0,
    })));
    drawing.add_entity(Entity::new(EntityKind::Solid(Solid {
        corners: [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.0, 1.0),
        ],
    })));
    drawing.add_entity(Entity::new(EntityKind::Attrib(Attrib {
        tag: "PART".to_string(),
        text: "M8".to_string(),
        position: Point2::new(3.0, 3.0),
        height: 1.0,
        rotation: 0.0,
    })));
    drawing.add_entity(Entity::new(EntityKind::Leader(Leader {
        vertices: vec![Point2::new(0.0, 0.0), Point2::new(5.0, 5.0), Point2::new(8.0, 5.0)],
        has_arrowhead: false,
    })));
    drawing.add_entity(
        Entity::line(Point2::from_vec(DVec2::new(0.1, 0.2)), Point2::new(1.0 / 3.0, -7.25)).on_layer("HIDDEN"),
    );
    drawing
}

#[test]
fn encode_then_decode_preserves_supported_fields() {
    let drawing = sample_drawing();
    let decoded = decode(&encode(&drawing)).expect("decode encoded drawing");

    let original: Vec<&Entity> = drawing.entities().map(|(_, entity)| entity).collect();
    let restored: Vec<&Entity> = decoded.entities().map(|(_, entity)| entity).collect();
    assert_eq!(original, restored);

    let layers: Vec<&Layer> = drawing.layers().collect();
    let restored_layers: Vec<&Layer> = decoded.layers().collect();
    assert_eq!(layers, restored_layers);
    assert_eq!(drawing.block("BOLT"), decoded.block("BOLT"));
    assert!(decoded.line_types().any(|line_type| line_type.name == "DASHED"));
}

#[test]
fn unnamed_solid_hatch_keeps_its_empty_pattern() {
    let mut drawing = Drawing::new();
    drawing.add_entity(Entity::new(EntityKind::Hatch(Hatch {
        boundary_paths: vec![vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
        ]],
        solid: true,
        pattern_name: String::new(),
    })));

    let decoded = decode(&encode(&drawing)).expect("decode encoded drawing");
    match decoded.entities().next().map(|(_, entity)| &entity.kind) {
        Some(EntityKind::Hatch(hatch)) => {
            assert!(hatch.solid);
            assert_eq!(hatch.pattern_name, "");
            assert_eq!(hatch.boundary_paths[0].len(), 3);
        }
        other => panic!("expected hatch, got {other:?}"),
    }
}

#[test]
fn dimension_flag_bits_survive_a_round_trip() {
    let text = "0\nSECTION\n2\nENTITIES\n0\nDIMENSION\n8\n0\n70\n33\n10\n0\n20\n5\n11\n5\n21\n5\n0\nENDSEC\n0\nEOF\n";
    let drawing = decode(text).expect("decode dimension");
    let dimension = match drawing.entities().next().map(|(_, entity)| &entity.kind) {
        Some(EntityKind::Dimension(dimension)) => dimension.clone(),
        other => panic!("expected dimension, got {other:?}"),
    };
    assert_eq!(dimension.kind, DimensionKind::Aligned);
    assert_eq!(dimension.flags, 32);

    let encoded = encode(&drawing);
    assert!(encoded.contains(" 70\n33\n"));
    let again = decode(&encoded).expect("decode re-encoded drawing");
    assert!(matches!(
        again.entities().next().map(|(_, entity)| &entity.kind),
        Some(EntityKind::Dimension(restored)) if *restored == dimension
    ));
}

#[test]
fn encoded_sections_follow_fixed_order() {
    let text = encode(&sample_drawing());
    let position = |marker: &str| text.find(marker).unwrap_or_else(|| panic!("missing {marker}"));
    let header = position("HEADER");
    let tables = position("TABLES");
    let ltype = position("\nLTYPE\n");
    let layer = position("\nLAYER\n");
    let blocks = position("BLOCKS");
    let entities = position("ENTITIES");
    assert!(header < tables && tables < ltype && ltype < layer && layer < blocks && blocks < entities);
    assert!(text.ends_with("  0\nEOF\n"));
    assert!(!text.contains("\nPOLYLINE\n"));
}

#[test]
fn facade_saves_and_loads_through_the_filesystem() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("roundtrip.dxf");
    let facade = DxfFacade::new();
    let drawing = sample_drawing();
    facade.save(&drawing, &path).expect("save");
    let loaded = facade.load(&path).expect("load");
    assert_eq!(loaded.len(), drawing.len());
    assert_eq!(loaded.bounds(), drawing.bounds());
}

#[test]
fn load_reports_format_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.dxf");
    std::fs::write(&path, "0\nSECTION\n2\n").expect("write");
    let err = DxfFacade::new().load(&path).expect_err("broken file");
    assert!(matches!(err, IoError::Format(FormatError::Invalid { .. })));
}
