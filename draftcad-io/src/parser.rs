use std::f64::consts::TAU;

use draftcad_core::document::{
    Arc, Attrib, Block, Circle, Color, DEFAULT_LAYER, Dimension, DimensionKind, Drawing, Ellipse,
    Entity, EntityAttrs, EntityKind, Hatch, Insert, Layer, Leader, Line, LineType, PointMark,
    Polyline, PolylineVertex, Solid, Spline, Text, TextAlignment,
};
use draftcad_core::geometry::{Point2, Vector2};
use tracing::debug;

use crate::FormatError;
use crate::reader::TokenCursor;
use crate::text::{decode_inline_text, decode_mtext};

/// Accumulates the type-specific attributes of one entity record.
trait EntityBuilder {
    fn accept(&mut self, code: i32, value: &str) -> Result<(), String>;
    fn finish(self: Box<Self>) -> Result<EntityKind, String>;
}

type BuilderFactory = fn() -> Box<dyn EntityBuilder>;

fn boxed<B: EntityBuilder + Default + 'static>() -> Box<dyn EntityBuilder> {
    Box::<B>::default()
}

const ENTITY_PARSERS: &[(&str, BuilderFactory)] = &[
    ("LINE", boxed::<LineBuilder>),
    ("CIRCLE", boxed::<CircleBuilder>),
    ("ARC", boxed::<ArcBuilder>),
    ("LWPOLYLINE", boxed::<LwPolylineBuilder>),
    ("TEXT", boxed::<TextBuilder>),
    ("MTEXT", boxed::<MTextBuilder>),
    ("POINT", boxed::<PointBuilder>),
    ("INSERT", boxed::<InsertBuilder>),
    ("ELLIPSE", boxed::<EllipseBuilder>),
    ("SPLINE", boxed::<SplineBuilder>),
    ("HATCH", boxed::<HatchBuilder>),
    ("DIMENSION", boxed::<DimensionBuilder>),
    ("SOLID", boxed::<SolidBuilder>),
    ("ATTRIB", boxed::<AttribBuilder>),
    ("LEADER", boxed::<LeaderBuilder>),
];

pub(crate) fn parse(source: &str) -> Result<Drawing, FormatError> {
    let mut cursor = TokenCursor::tokenize(source)?;
    let mut drawing = Drawing::new();
    if cursor.is_empty() {
        return Ok(drawing);
    }

    while let Some((code, value)) = cursor.next_pair() {
        if code != 0 {
            return Err(cursor.invalid(format!(
                "unexpected group code {code} at top level (expected 0 for SECTION or EOF)"
            )));
        }
        match value {
            "SECTION" => {
                let name = match cursor.next_pair() {
                    Some((2, name)) => name.trim(),
                    Some((other, _)) => {
                        return Err(cursor.invalid(format!(
                            "SECTION name uses group code {other} (expected 2)"
                        )));
                    }
                    None => {
                        return Err(FormatError::Truncated {
                            context: "SECTION name".to_string(),
                        });
                    }
                };
                match name {
                    "TABLES" => parse_tables(&mut cursor, &mut drawing)?,
                    "BLOCKS" => parse_blocks(&mut cursor, &mut drawing)?,
                    "ENTITIES" => parse_entities(&mut cursor, &mut drawing)?,
                    other => {
                        debug!(section = other, "skipping section");
                        skip_section(&mut cursor, other)?;
                    }
                }
            }
            "EOF" => break,
            unexpected => {
                return Err(cursor.invalid(format!(
                    "unexpected record {unexpected}, expected SECTION or EOF"
                )));
            }
        }
    }

    debug!(
        entities = drawing.len(),
        layers = drawing.layers().count(),
        blocks = drawing.blocks().count(),
        "decoded drawing"
    );
    Ok(drawing)
}

fn skip_section(cursor: &mut TokenCursor<'_>, name: &str) -> Result<(), FormatError> {
    loop {
        match cursor.next_pair() {
            Some((0, "ENDSEC")) => return Ok(()),
            Some(_) => continue,
            None => {
                return Err(FormatError::Truncated {
                    context: format!("{name} section (missing ENDSEC)"),
                });
            }
        }
    }
}

fn parse_tables(cursor: &mut TokenCursor<'_>, drawing: &mut Drawing) -> Result<(), FormatError> {
    loop {
        match cursor.next_pair() {
            Some((0, "ENDSEC")) => return Ok(()),
            Some((0, "TABLE")) => {
                let table = match cursor.next_pair() {
                    Some((2, name)) => name.trim().to_string(),
                    Some(_) => return Err(cursor.invalid("TABLE without a name (group code 2)")),
                    None => {
                        return Err(FormatError::Truncated {
                            context: "TABLE name".to_string(),
                        });
                    }
                };
                cursor.skip_record("TABLE")?;
                parse_table(cursor, drawing, &table)?;
            }
            Some((0, _)) => cursor.skip_record("TABLES entry")?,
            Some((code, _)) => {
                return Err(cursor.invalid(format!(
                    "unexpected group code {code} in TABLES section"
                )));
            }
            None => {
                return Err(FormatError::Truncated {
                    context: "TABLES section (missing ENDSEC)".to_string(),
                });
            }
        }
    }
}

fn parse_table(cursor: &mut TokenCursor<'_>, drawing: &mut Drawing, table: &str) -> Result<(), FormatError> {
    loop {
        match cursor.next_pair() {
            Some((0, "ENDTAB")) => {
                cursor.skip_record("ENDTAB")?;
                return Ok(());
            }
            Some((0, "ENDSEC")) => {
                return Err(cursor.invalid(format!("{table} table is missing ENDTAB")));
            }
            Some((0, "LAYER")) if table == "LAYER" => {
                let layer = parse_layer(cursor)?;
                drawing.add_layer(layer);
            }
            Some((0, "LTYPE")) if table == "LTYPE" => {
                let line_type = parse_line_type(cursor)?;
                drawing.add_line_type(line_type);
            }
            Some((0, _)) => cursor.skip_record(table)?,
            Some((code, _)) => {
                return Err(cursor.invalid(format!(
                    "unexpected group code {code} in {table} table"
                )));
            }
            None => {
                return Err(FormatError::Truncated {
                    context: format!("{table} table (missing ENDTAB)"),
                });
            }
        }
    }
}

fn parse_layer(cursor: &mut TokenCursor<'_>) -> Result<Layer, FormatError> {
    let mut layer = Layer::new(DEFAULT_LAYER);
    let mut named = false;
    while let Some((code, value)) = cursor.attribute("LAYER")? {
        match code {
            2 => {
                layer.name = value.trim().to_string();
                named = true;
            }
            62 => {
                let raw = parse_i16(value, "LAYER color (62)").map_err(|m| cursor.invalid(m))?;
                layer.off = raw < 0;
                layer.color = u8::try_from(raw.unsigned_abs()).ok().filter(|c| *c > 0).unwrap_or(7);
            }
            70 => {
                let flags = parse_i16(value, "LAYER flags (70)").map_err(|m| cursor.invalid(m))?;
                layer.frozen = flags & 1 != 0;
            }
            6 => layer.line_type = value.trim().to_string(),
            _ => {}
        }
    }
    if !named {
        return Err(cursor.invalid("LAYER entry without a name (group code 2)"));
    }
    Ok(layer)
}

fn parse_line_type(cursor: &mut TokenCursor<'_>) -> Result<LineType, FormatError> {
    let mut name = None;
    let mut description = String::new();
    while let Some((code, value)) = cursor.attribute("LTYPE")? {
        match code {
            2 => name = Some(value.trim().to_string()),
            3 => description = value.to_string(),
            _ => {}
        }
    }
    let name = name.ok_or_else(|| cursor.invalid("LTYPE entry without a name (group code 2)"))?;
    Ok(LineType { name, description })
}

fn parse_blocks(cursor: &mut TokenCursor<'_>, drawing: &mut Drawing) -> Result<(), FormatError> {
    loop {
        match cursor.next_pair() {
            Some((0, "ENDSEC")) => return Ok(()),
            Some((0, "BLOCK")) => {
                if let Some(block) = parse_block(cursor)? {
                    drawing.add_block(block);
                }
            }
            Some((0, _)) => cursor.skip_record("BLOCKS entry")?,
            Some((code, _)) => {
                return Err(cursor.invalid(format!(
                    "unexpected group code {code} in BLOCKS section"
                )));
            }
            None => {
                return Err(FormatError::Truncated {
                    context: "BLOCKS section (missing ENDSEC)".to_string(),
                });
            }
        }
    }
}

/// Returns `None` for structural `*`-prefixed blocks (model/paper space).
fn parse_block(cursor: &mut TokenCursor<'_>) -> Result<Option<Block>, FormatError> {
    let mut name: Option<String> = None;
    let mut base = Coord::default();
    while let Some((code, value)) = cursor.attribute("BLOCK")? {
        match code {
            2 => name = Some(value.trim().to_string()),
            3 if name.is_none() => name = Some(value.trim().to_string()),
            10 => base.set_x(value, "BLOCK base X").map_err(|m| cursor.invalid(m))?,
            20 => base.set_y(value, "BLOCK base Y").map_err(|m| cursor.invalid(m))?,
            _ => {}
        }
    }
    let name = name.ok_or_else(|| cursor.invalid("BLOCK without a name (group code 2)"))?;
    let structural = name.starts_with('*');

    let mut block = Block::new(name, base.or_origin());
    loop {
        match cursor.next_pair() {
            Some((0, "ENDBLK")) => {
                cursor.skip_record("ENDBLK")?;
                break;
            }
            Some((0, "ENDSEC")) => {
                return Err(cursor.invalid(format!("block {} is missing ENDBLK", block.name)));
            }
            Some((0, kind)) => {
                if let Some(entity) = read_entity(cursor, kind)? {
                    block.entities.push(entity);
                }
            }
            Some((code, _)) => {
                return Err(cursor.invalid(format!(
                    "unexpected group code {code} in block {}",
                    block.name
                )));
            }
            None => {
                return Err(FormatError::Truncated {
                    context: format!("block {} (missing ENDBLK)", block.name),
                });
            }
        }
    }

    if structural {
        debug!(block = %block.name, "skipping structural block");
        return Ok(None);
    }
    Ok(Some(block))
}

fn parse_entities(cursor: &mut TokenCursor<'_>, drawing: &mut Drawing) -> Result<(), FormatError> {
    loop {
        match cursor.next_pair() {
            Some((0, "ENDSEC")) => return Ok(()),
            Some((0, kind)) => {
                if let Some(entity) = read_entity(cursor, kind)? {
                    drawing.add_entity(entity);
                }
            }
            Some((code, _)) => {
                return Err(cursor.invalid(format!(
                    "ENTITIES section hit group code {code} (expected 0 to start an entity)"
                )));
            }
            None => {
                return Err(FormatError::Truncated {
                    context: "ENTITIES section (missing ENDSEC)".to_string(),
                });
            }
        }
    }
}

/// Reads one entity record whose code-0 pair was just consumed. Unknown kinds are skipped.
fn read_entity(cursor: &mut TokenCursor<'_>, kind: &str) -> Result<Option<Entity>, FormatError> {
    if kind == "POLYLINE" {
        return parse_heavy_polyline(cursor);
    }
    let Some((_, factory)) = ENTITY_PARSERS.iter().find(|(name, _)| *name == kind) else {
        if kind != "SEQEND" {
            debug!(kind, line = cursor.line(), "skipping unsupported entity");
        }
        cursor.skip_record(kind)?;
        return Ok(None);
    };

    let mut attrs = EntityAttrs::default();
    let mut builder = factory();
    while let Some((code, value)) = cursor.attribute(kind)? {
        let handled = apply_common(&mut attrs, code, value)
            .map_err(|message| cursor.invalid(format!("{kind}: {message}")))?;
        if !handled {
            builder
                .accept(code, value)
                .map_err(|message| cursor.invalid(format!("{kind}: {message}")))?;
        }
    }
    let entity_kind = builder
        .finish()
        .map_err(|message| cursor.invalid(format!("{kind}: {message}")))?;
    Ok(Some(Entity {
        attrs,
        kind: entity_kind,
    }))
}

/// Handle (5), layer (8), color (62) and line type (6) are shared by every entity.
fn apply_common(attrs: &mut EntityAttrs, code: i32, value: &str) -> Result<bool, String> {
    match code {
        5 => attrs.handle = Some(value.trim().to_string()),
        8 => {
            let layer = value.trim();
            attrs.layer = if layer.is_empty() {
                DEFAULT_LAYER.to_string()
            } else {
                layer.to_string()
            };
        }
        62 => attrs.color = Some(Color::from_aci(parse_i16(value, "color (62)")?)),
        6 => attrs.line_type = Some(value.trim().to_string()),
        _ => return Ok(false),
    }
    Ok(true)
}

/// Old-style POLYLINE followed by VERTEX records and SEQEND. Meshes are skipped.
fn parse_heavy_polyline(cursor: &mut TokenCursor<'_>) -> Result<Option<Entity>, FormatError> {
    let mut attrs = EntityAttrs::default();
    let mut flags = 0;
    while let Some((code, value)) = cursor.attribute("POLYLINE")? {
        let handled = apply_common(&mut attrs, code, value).map_err(|m| cursor.invalid(m))?;
        if !handled && code == 70 {
            flags = parse_i16(value, "POLYLINE flags (70)").map_err(|m| cursor.invalid(m))?;
        }
    }

    let mut vertices = Vec::new();
    loop {
        match cursor.next_pair() {
            Some((0, "VERTEX")) => {
                let mut position = Coord::default();
                let mut bulge = 0.0;
                while let Some((code, value)) = cursor.attribute("VERTEX")? {
                    let result = match code {
                        10 => position.set_x(value, "VERTEX X"),
                        20 => position.set_y(value, "VERTEX Y"),
                        42 => parse_f64(value, "VERTEX bulge").map(|b| bulge = b),
                        _ => Ok(()),
                    };
                    result.map_err(|m| cursor.invalid(m))?;
                }
                let position = position.require("VERTEX position").map_err(|m| cursor.invalid(m))?;
                vertices.push(PolylineVertex::with_bulge(position, bulge));
            }
            Some((0, "SEQEND")) => {
                cursor.skip_record("SEQEND")?;
                break;
            }
            Some((0, other)) => {
                return Err(cursor.invalid(format!(
                    "POLYLINE is missing SEQEND (found {other})"
                )));
            }
            Some((code, _)) => {
                return Err(cursor.invalid(format!("unexpected group code {code} in POLYLINE")));
            }
            None => {
                return Err(FormatError::Truncated {
                    context: "POLYLINE (missing SEQEND)".to_string(),
                });
            }
        }
    }

    if flags & (16 | 64) != 0 {
        debug!(flags, "skipping polygon or polyface mesh");
        return Ok(None);
    }
    Ok(Some(Entity {
        attrs,
        kind: EntityKind::Polyline(Polyline {
            vertices,
            closed: flags & 1 != 0,
        }),
    }))
}

#[derive(Debug, Default, Clone, Copy)]
struct Coord {
    x: Option<f64>,
    y: Option<f64>,
}

impl Coord {
    fn set_x(&mut self, raw: &str, what: &str) -> Result<(), String> {
        self.x = Some(parse_f64(raw, what)?);
        Ok(())
    }

    fn set_y(&mut self, raw: &str, what: &str) -> Result<(), String> {
        self.y = Some(parse_f64(raw, what)?);
        Ok(())
    }

    fn is_set(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }

    fn require(&self, what: &str) -> Result<Point2, String> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Ok(Point2::new(x, y)),
            _ => Err(format!("missing {what}")),
        }
    }

    fn or_origin(&self) -> Point2 {
        Point2::new(self.x.unwrap_or(0.0), self.y.unwrap_or(0.0))
    }
}

/// Sequences of interleaved X/Y codes (vertices, control points).
#[derive(Debug, Default)]
struct PointList {
    points: Vec<Point2>,
    pending_x: Option<f64>,
}

impl PointList {
    fn push_x(&mut self, raw: &str, what: &str) -> Result<(), String> {
        if self.pending_x.is_some() {
            return Err(format!("{what} X without a matching Y"));
        }
        self.pending_x = Some(parse_f64(raw, what)?);
        Ok(())
    }

    fn push_y(&mut self, raw: &str, what: &str) -> Result<(), String> {
        let x = self
            .pending_x
            .take()
            .ok_or_else(|| format!("{what} Y without a preceding X"))?;
        self.points.push(Point2::new(x, parse_f64(raw, what)?));
        Ok(())
    }

    fn finish(self, what: &str) -> Result<Vec<Point2>, String> {
        if self.pending_x.is_some() {
            return Err(format!("{what} X without a matching Y"));
        }
        Ok(self.points)
    }
}

#[derive(Default)]
struct LineBuilder {
    start: Coord,
    end: Coord,
}

impl EntityBuilder for LineBuilder {
    fn accept(&mut self, code: i32, value: &str) -> Result<(), String> {
        match code {
            10 => self.start.set_x(value, "start X"),
            20 => self.start.set_y(value, "start Y"),
            11 => self.end.set_x(value, "end X"),
            21 => self.end.set_y(value, "end Y"),
            _ => Ok(()),
        }
    }

    fn finish(self: Box<Self>) -> Result<EntityKind, String> {
        Ok(EntityKind::Line(Line {
            start: self.start.require("start point (10/20)")?,
            end: self.end.require("end point (11/21)")?,
        }))
    }
}

#[derive(Default)]
struct CircleBuilder {
    center: Coord,
    radius: Option<f64>,
}

impl EntityBuilder for CircleBuilder {
    fn accept(&mut self, code: i32, value: &str) -> Result<(), String> {
        match code {
            10 => self.center.set_x(value, "center X"),
            20 => self.center.set_y(value, "center Y"),
            40 => parse_f64(value, "radius").map(|r| self.radius = Some(r)),
            _ => Ok(()),
        }
    }

    fn finish(self: Box<Self>) -> Result<EntityKind, String> {
        Ok(EntityKind::Circle(Circle {
            center: self.center.require("center (10/20)")?,
            radius: self.radius.ok_or("missing radius (40)")?,
        }))
    }
}

#[derive(Default)]
struct ArcBuilder {
    center: Coord,
    radius: Option<f64>,
    start_angle: Option<f64>,
    end_angle: Option<f64>,
}

impl EntityBuilder for ArcBuilder {
    fn accept(&mut self, code: i32, value: &str) -> Result<(), String> {
        match code {
            10 => self.center.set_x(value, "center X"),
            20 => self.center.set_y(value, "center Y"),
            40 => parse_f64(value, "radius").map(|r| self.radius = Some(r)),
            50 => parse_f64(value, "start angle").map(|a| self.start_angle = Some(a)),
            51 => parse_f64(value, "end angle").map(|a| self.end_angle = Some(a)),
            _ => Ok(()),
        }
    }

    fn finish(self: Box<Self>) -> Result<EntityKind, String> {
        Ok(EntityKind::Arc(Arc {
            center: self.center.require("center (10/20)")?,
            radius: self.radius.ok_or("missing radius (40)")?,
            start_angle: self.start_angle.unwrap_or(0.0),
            end_angle: self.end_angle.unwrap_or(360.0),
        }))
    }
}

#[derive(Default)]
struct LwPolylineBuilder {
    vertices: Vec<PolylineVertex>,
    pending_x: Option<f64>,
    closed: bool,
}

impl EntityBuilder for LwPolylineBuilder {
    fn accept(&mut self, code: i32, value: &str) -> Result<(), String> {
        match code {
            70 => self.closed = parse_i16(value, "flags (70)")? & 1 != 0,
            10 => {
                if self.pending_x.is_some() {
                    return Err("vertex X without a matching Y".to_string());
                }
                self.pending_x = Some(parse_f64(value, "vertex X")?);
            }
            20 => {
                let x = self
                    .pending_x
                    .take()
                    .ok_or("vertex Y without a preceding X")?;
                let y = parse_f64(value, "vertex Y")?;
                self.vertices.push(PolylineVertex::new(Point2::new(x, y)));
            }
            42 => {
                let bulge = parse_f64(value, "bulge")?;
                if let Some(vertex) = self.vertices.last_mut() {
                    vertex.bulge = bulge;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<EntityKind, String> {
        if self.pending_x.is_some() {
            return Err("vertex X without a matching Y".to_string());
        }
        Ok(EntityKind::Polyline(Polyline {
            vertices: self.vertices,
            closed: self.closed,
        }))
    }
}

#[derive(Default)]
struct TextBuilder {
    position: Coord,
    content: String,
    height: Option<f64>,
    rotation: f64,
    alignment: i16,
}

impl EntityBuilder for TextBuilder {
    fn accept(&mut self, code: i32, value: &str) -> Result<(), String> {
        match code {
            10 => self.position.set_x(value, "position X")?,
            20 => self.position.set_y(value, "position Y")?,
            40 => self.height = Some(parse_f64(value, "height")?),
            50 => self.rotation = parse_f64(value, "rotation")?,
            72 => self.alignment = parse_i16(value, "horizontal alignment (72)")?,
            1 => self.content = decode_inline_text(value),
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<EntityKind, String> {
        Ok(EntityKind::Text(Text {
            position: self.position.or_origin(),
            content: self.content,
            height: self.height.unwrap_or(1.0),
            rotation: self.rotation,
            alignment: TextAlignment::from_code(self.alignment),
        }))
    }
}

/// MTEXT is flattened into a `Text` with formatting codes removed.
#[derive(Default)]
struct MTextBuilder {
    position: Coord,
    chunks: String,
    last: String,
    height: Option<f64>,
    rotation: Option<f64>,
    direction: Coord,
    attachment: i16,
}

impl EntityBuilder for MTextBuilder {
    fn accept(&mut self, code: i32, value: &str) -> Result<(), String> {
        match code {
            10 => self.position.set_x(value, "position X")?,
            20 => self.position.set_y(value, "position Y")?,
            11 => self.direction.set_x(value, "direction X")?,
            21 => self.direction.set_y(value, "direction Y")?,
            40 => self.height = Some(parse_f64(value, "height")?),
            50 => self.rotation = Some(parse_f64(value, "rotation")?),
            71 => self.attachment = parse_i16(value, "attachment point (71)")?,
            3 => self.chunks.push_str(value),
            1 => self.last = value.to_string(),
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<EntityKind, String> {
        let rotation = match (self.rotation, self.direction.x, self.direction.y) {
            (Some(rotation), _, _) => rotation,
            (None, Some(x), Some(y)) => y.atan2(x).to_degrees(),
            _ => 0.0,
        };
        let alignment = match self.attachment {
            2 | 5 | 8 => TextAlignment::Center,
            3 | 6 | 9 => TextAlignment::Right,
            _ => TextAlignment::Left,
        };
        Ok(EntityKind::Text(Text {
            position: self.position.or_origin(),
            content: decode_mtext(&(self.chunks + &self.last)),
            height: self.height.unwrap_or(1.0),
            rotation,
            alignment,
        }))
    }
}

#[derive(Default)]
struct PointBuilder {
    position: Coord,
}

impl EntityBuilder for PointBuilder {
    fn accept(&mut self, code: i32, value: &str) -> Result<(), String> {
        match code {
            10 => self.position.set_x(value, "X"),
            20 => self.position.set_y(value, "Y"),
            _ => Ok(()),
        }
    }

    fn finish(self: Box<Self>) -> Result<EntityKind, String> {
        Ok(EntityKind::Point(PointMark {
            position: self.position.require("location (10/20)")?,
        }))
    }
}

#[derive(Default)]
struct InsertBuilder {
    block_name: Option<String>,
    position: Coord,
    scale_x: Option<f64>,
    scale_y: Option<f64>,
    rotation: f64,
}

impl EntityBuilder for InsertBuilder {
    fn accept(&mut self, code: i32, value: &str) -> Result<(), String> {
        match code {
            2 => self.block_name = Some(value.trim().to_string()),
            10 => self.position.set_x(value, "insertion X")?,
            20 => self.position.set_y(value, "insertion Y")?,
            41 => self.scale_x = Some(parse_f64(value, "X scale")?),
            42 => self.scale_y = Some(parse_f64(value, "Y scale")?),
            50 => self.rotation = parse_f64(value, "rotation")?,
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<EntityKind, String> {
        Ok(EntityKind::Insert(Insert {
            block_name: self.block_name.ok_or("missing block name (2)")?,
            position: self.position.or_origin(),
            scale: Vector2::new(self.scale_x.unwrap_or(1.0), self.scale_y.unwrap_or(1.0)),
            rotation: self.rotation,
        }))
    }
}

#[derive(Default)]
struct EllipseBuilder {
    center: Coord,
    major_axis: Coord,
    ratio: Option<f64>,
    start: Option<f64>,
    end: Option<f64>,
}

impl EntityBuilder for EllipseBuilder {
    fn accept(&mut self, code: i32, value: &str) -> Result<(), String> {
        match code {
            10 => self.center.set_x(value, "center X")?,
            20 => self.center.set_y(value, "center Y")?,
            11 => self.major_axis.set_x(value, "major axis X")?,
            21 => self.major_axis.set_y(value, "major axis Y")?,
            40 => self.ratio = Some(parse_f64(value, "axis ratio")?),
            41 => self.start = Some(parse_f64(value, "start parameter")?),
            42 => self.end = Some(parse_f64(value, "end parameter")?),
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<EntityKind, String> {
        let axis = self.major_axis.require("major axis (11/21)")?;
        Ok(EntityKind::Ellipse(Ellipse {
            center: self.center.require("center (10/20)")?,
            major_axis: Vector2::new(axis.x(), axis.y()),
            ratio: self.ratio.unwrap_or(1.0),
            start_parameter: self.start.unwrap_or(0.0),
            end_parameter: self.end.unwrap_or(TAU),
        }))
    }
}

#[derive(Default)]
struct SplineBuilder {
    flags: i16,
    degree: Option<i32>,
    knots: Vec<f64>,
    control: PointList,
    fit: PointList,
}

impl EntityBuilder for SplineBuilder {
    fn accept(&mut self, code: i32, value: &str) -> Result<(), String> {
        match code {
            70 => self.flags = parse_i16(value, "flags (70)")?,
            71 => self.degree = Some(parse_i32(value, "degree (71)")?),
            40 => self.knots.push(parse_f64(value, "knot value")?),
            10 => self.control.push_x(value, "control point")?,
            20 => self.control.push_y(value, "control point")?,
            11 => self.fit.push_x(value, "fit point")?,
            21 => self.fit.push_y(value, "fit point")?,
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<EntityKind, String> {
        Ok(EntityKind::Spline(Spline {
            degree: self.degree.unwrap_or(3),
            control_points: self.control.finish("control point")?,
            fit_points: self.fit.finish("fit point")?,
            knots: self.knots,
            closed: self.flags & 1 != 0,
        }))
    }
}

/// Where the HATCH reader is within the record's nested layout.
#[derive(Debug, Default)]
enum HatchStage {
    /// Before the loop count; 10/20 here is the elevation point.
    #[default]
    Header,
    /// Between loops, waiting for the next 92 flag.
    BetweenLoops,
    Polyline(PolylineLoop),
    Edges(EdgeLoop),
    /// Source boundary handles (330) after a loop's 97.
    SourceRefs,
    /// Pattern definition data and seed points.
    Trailer,
}

#[derive(Debug, Default)]
struct PolylineLoop {
    has_bulge: bool,
    vertices: Vec<PolylineVertex>,
    pending_x: Option<f64>,
}

#[derive(Debug, Default)]
struct EdgeLoop {
    points: Vec<Point2>,
    edge: Option<EdgeDraft>,
}

#[derive(Debug)]
struct EdgeDraft {
    edge_type: i16,
    first: Coord,
    second: Coord,
    radius: f64,
    start_angle: f64,
    end_angle: f64,
    counter_clockwise: bool,
    control: PointList,
    fit: PointList,
    fit_count_seen: bool,
}

impl EdgeDraft {
    fn new(edge_type: i16) -> Result<Self, String> {
        if !(1..=4).contains(&edge_type) {
            return Err(format!("unknown hatch edge type {edge_type}"));
        }
        Ok(Self {
            edge_type,
            first: Coord::default(),
            second: Coord::default(),
            radius: 0.0,
            start_angle: 0.0,
            end_angle: 360.0,
            counter_clockwise: true,
            control: PointList::default(),
            fit: PointList::default(),
            fit_count_seen: false,
        })
    }

    fn accept(&mut self, code: i32, value: &str) -> Result<(), String> {
        match (self.edge_type, code) {
            (4, 10) => self.control.push_x(value, "spline edge control point"),
            (4, 20) => self.control.push_y(value, "spline edge control point"),
            (4, 11) => self.fit.push_x(value, "spline edge fit point"),
            (4, 21) => self.fit.push_y(value, "spline edge fit point"),
            (4, 97) => {
                self.fit_count_seen = true;
                Ok(())
            }
            (_, 10) => self.first.set_x(value, "edge X"),
            (_, 20) => self.first.set_y(value, "edge Y"),
            (_, 11) => self.second.set_x(value, "edge second X"),
            (_, 21) => self.second.set_y(value, "edge second Y"),
            (2 | 3, 40) => parse_f64(value, "edge radius").map(|r| self.radius = r),
            (2 | 3, 50) => parse_f64(value, "edge start angle").map(|a| self.start_angle = a),
            (2 | 3, 51) => parse_f64(value, "edge end angle").map(|a| self.end_angle = a),
            (2 | 3, 73) => {
                self.counter_clockwise = parse_i16(value, "edge direction")? != 0;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Appends the edge outline to `points`, skipping a repeated joint vertex.
    fn flatten(self, points: &mut Vec<Point2>) -> Result<(), String> {
        let outline = match self.edge_type {
            1 => vec![self.first.require("line edge start")?, self.second.require("line edge end")?],
            2 => arc_outline(
                self.first.require("arc edge center")?,
                self.radius,
                self.start_angle,
                self.end_angle,
                self.counter_clockwise,
            ),
            3 => {
                let center = self.first.require("ellipse edge center")?;
                let major = self.second.require("ellipse edge major axis")?;
                ellipse_outline(
                    center,
                    Vector2::new(major.x(), major.y()),
                    self.radius,
                    self.start_angle,
                    self.end_angle,
                    self.counter_clockwise,
                )
            }
            _ => {
                let fit = self.fit.finish("spline edge fit point")?;
                if fit.is_empty() {
                    self.control.finish("spline edge control point")?
                } else {
                    fit
                }
            }
        };
        for point in outline {
            if points.last().is_none_or(|last| last.distance_to(point) > 1e-9) {
                points.push(point);
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct HatchBuilder {
    pattern_name: String,
    solid: bool,
    paths: Vec<Vec<Point2>>,
    stage: HatchStage,
}

impl HatchBuilder {
    fn close_loop(&mut self) -> Result<(), String> {
        match std::mem::take(&mut self.stage) {
            HatchStage::Polyline(mut polyline) => {
                if polyline.pending_x.take().is_some() {
                    return Err("hatch vertex X without a matching Y".to_string());
                }
                let count = polyline.vertices.len();
                let mut points = Vec::with_capacity(count);
                for (index, vertex) in polyline.vertices.iter().enumerate() {
                    points.push(vertex.position);
                    if polyline.has_bulge && vertex.bulge.abs() > 1e-9 {
                        let next = polyline.vertices[(index + 1) % count].position;
                        points.extend(bulge_outline(vertex.position, next, vertex.bulge));
                    }
                }
                self.paths.push(points);
            }
            HatchStage::Edges(mut edges) => {
                if let Some(edge) = edges.edge.take() {
                    edge.flatten(&mut edges.points)?;
                }
                if edges.points.len() > 1
                    && edges.points[0].distance_to(edges.points[edges.points.len() - 1]) < 1e-9
                {
                    edges.points.pop();
                }
                self.paths.push(edges.points);
            }
            other => self.stage = other,
        }
        Ok(())
    }

    fn start_loop(&mut self, flags: i32) -> Result<(), String> {
        self.close_loop()?;
        self.stage = if flags & 2 != 0 {
            HatchStage::Polyline(PolylineLoop::default())
        } else {
            HatchStage::Edges(EdgeLoop::default())
        };
        Ok(())
    }
}

impl EntityBuilder for HatchBuilder {
    fn accept(&mut self, code: i32, value: &str) -> Result<(), String> {
        if matches!(self.stage, HatchStage::Header) {
            match code {
                2 => self.pattern_name = value.trim().to_string(),
                70 => self.solid = parse_i16(value, "solid fill flag (70)")? != 0,
                91 => self.stage = HatchStage::BetweenLoops,
                _ => {}
            }
            return Ok(());
        }
        if code == 92 && !matches!(self.stage, HatchStage::Trailer) {
            return self.start_loop(parse_i32(value, "boundary path flags (92)")?);
        }
        if code == 75 && !matches!(self.stage, HatchStage::Trailer) {
            self.close_loop()?;
            self.stage = HatchStage::Trailer;
            return Ok(());
        }

        match &mut self.stage {
            HatchStage::Polyline(polyline) => match code {
                72 => polyline.has_bulge = parse_i16(value, "has bulge flag (72)")? != 0,
                10 => {
                    if polyline.pending_x.is_some() {
                        return Err("hatch vertex X without a matching Y".to_string());
                    }
                    polyline.pending_x = Some(parse_f64(value, "hatch vertex X")?);
                }
                20 => {
                    let x = polyline
                        .pending_x
                        .take()
                        .ok_or("hatch vertex Y without a preceding X")?;
                    let y = parse_f64(value, "hatch vertex Y")?;
                    polyline.vertices.push(PolylineVertex::new(Point2::new(x, y)));
                }
                42 => {
                    let bulge = parse_f64(value, "hatch vertex bulge")?;
                    if let Some(vertex) = polyline.vertices.last_mut() {
                        vertex.bulge = bulge;
                    }
                }
                97 => {
                    self.close_loop()?;
                    self.stage = HatchStage::SourceRefs;
                }
                _ => {}
            },
            HatchStage::Edges(edges) => match code {
                72 => {
                    if let Some(edge) = edges.edge.take() {
                        edge.flatten(&mut edges.points)?;
                    }
                    edges.edge = Some(EdgeDraft::new(parse_i16(value, "edge type (72)")?)?);
                }
                97 if edges
                    .edge
                    .as_ref()
                    .is_some_and(|edge| edge.edge_type == 4 && !edge.fit_count_seen) =>
                {
                    if let Some(edge) = edges.edge.as_mut() {
                        edge.accept(code, value)?;
                    }
                }
                97 => {
                    self.close_loop()?;
                    self.stage = HatchStage::SourceRefs;
                }
                93 => {}
                _ => {
                    if let Some(edge) = edges.edge.as_mut() {
                        edge.accept(code, value)?;
                    }
                }
            },
            HatchStage::Header
            | HatchStage::BetweenLoops
            | HatchStage::SourceRefs
            | HatchStage::Trailer => {}
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<EntityKind, String> {
        self.close_loop()?;
        Ok(EntityKind::Hatch(Hatch {
            boundary_paths: self.paths,
            solid: self.solid,
            pattern_name: self.pattern_name,
        }))
    }
}

#[derive(Default)]
struct DimensionBuilder {
    kind: i16,
    definition: Coord,
    middle: Coord,
    first: Coord,
    second: Coord,
    text: String,
    rotation: f64,
}

impl EntityBuilder for DimensionBuilder {
    fn accept(&mut self, code: i32, value: &str) -> Result<(), String> {
        match code {
            10 => self.definition.set_x(value, "definition point X")?,
            20 => self.definition.set_y(value, "definition point Y")?,
            11 => self.middle.set_x(value, "text midpoint X")?,
            21 => self.middle.set_y(value, "text midpoint Y")?,
            13 => self.first.set_x(value, "first point X")?,
            23 => self.first.set_y(value, "first point Y")?,
            14 => self.second.set_x(value, "second point X")?,
            24 => self.second.set_y(value, "second point Y")?,
            70 => self.kind = parse_i16(value, "dimension type (70)")?,
            1 => self.text = decode_inline_text(value),
            50 => self.rotation = parse_f64(value, "rotation")?,
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<EntityKind, String> {
        let optional = |coord: Coord, what: &str| -> Result<Option<Point2>, String> {
            if coord.is_set() { coord.require(what).map(Some) } else { Ok(None) }
        };
        Ok(EntityKind::Dimension(Dimension {
            kind: DimensionKind::from_code(self.kind),
            flags: self.kind & !0x0F,
            definition_point: self.definition.or_origin(),
            middle_point: self.middle.or_origin(),
            first_point: optional(self.first, "first point (13/23)")?,
            second_point: optional(self.second, "second point (14/24)")?,
            text: self.text,
            rotation: self.rotation,
        }))
    }
}

#[derive(Default)]
struct SolidBuilder {
    corners: [Coord; 4],
}

impl EntityBuilder for SolidBuilder {
    fn accept(&mut self, code: i32, value: &str) -> Result<(), String> {
        match code {
            10..=13 => self.corners[(code - 10) as usize].set_x(value, "corner X"),
            20..=23 => self.corners[(code - 20) as usize].set_y(value, "corner Y"),
            _ => Ok(()),
        }
    }

    fn finish(self: Box<Self>) -> Result<EntityKind, String> {
        let first = self.corners[0].require("first corner (10/20)")?;
        let second = self.corners[1].require("second corner (11/21)")?;
        let third = self.corners[2].require("third corner (12/22)")?;
        let fourth = if self.corners[3].is_set() {
            self.corners[3].require("fourth corner (13/23)")?
        } else {
            third
        };
        Ok(EntityKind::Solid(Solid {
            corners: [first, second, third, fourth],
        }))
    }
}

#[derive(Default)]
struct AttribBuilder {
    tag: String,
    text: String,
    position: Coord,
    height: Option<f64>,
    rotation: f64,
}

impl EntityBuilder for AttribBuilder {
    fn accept(&mut self, code: i32, value: &str) -> Result<(), String> {
        match code {
            10 => self.position.set_x(value, "position X")?,
            20 => self.position.set_y(value, "position Y")?,
            40 => self.height = Some(parse_f64(value, "height")?),
            50 => self.rotation = parse_f64(value, "rotation")?,
            1 => self.text = decode_inline_text(value),
            2 => self.tag = value.trim().to_string(),
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<EntityKind, String> {
        Ok(EntityKind::Attrib(Attrib {
            tag: self.tag,
            text: self.text,
            position: self.position.or_origin(),
            height: self.height.unwrap_or(1.0),
            rotation: self.rotation,
        }))
    }
}

struct LeaderBuilder {
    vertices: PointList,
    has_arrowhead: bool,
}

impl Default for LeaderBuilder {
    fn default() -> Self {
        Self {
            vertices: PointList::default(),
            has_arrowhead: true,
        }
    }
}

impl EntityBuilder for LeaderBuilder {
    fn accept(&mut self, code: i32, value: &str) -> Result<(), String> {
        match code {
            71 => self.has_arrowhead = parse_i16(value, "arrowhead flag (71)")? != 0,
            10 => self.vertices.push_x(value, "leader vertex")?,
            20 => self.vertices.push_y(value, "leader vertex")?,
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<EntityKind, String> {
        Ok(EntityKind::Leader(Leader {
            vertices: self.vertices.finish("leader vertex")?,
            has_arrowhead: self.has_arrowhead,
        }))
    }
}

const ARC_STEP_DEGREES: f64 = 10.0;

/// Points along a hatch arc edge. Clockwise edges store mirrored angles.
fn arc_outline(center: Point2, radius: f64, start: f64, end: f64, counter_clockwise: bool) -> Vec<Point2> {
    let mut sweep = (end - start).rem_euclid(360.0);
    if sweep < 1e-9 {
        sweep = 360.0;
    }
    let steps = ((sweep / ARC_STEP_DEGREES).ceil() as usize).max(2);
    (0..=steps)
        .map(|step| {
            let angle = start + sweep * step as f64 / steps as f64;
            let angle = if counter_clockwise { angle } else { -angle };
            center.polar(radius, angle)
        })
        .collect()
}

fn ellipse_outline(
    center: Point2,
    major: Vector2,
    ratio: f64,
    start: f64,
    end: f64,
    counter_clockwise: bool,
) -> Vec<Point2> {
    let minor = major.perp() * ratio;
    let mut sweep = (end - start).rem_euclid(360.0);
    if sweep < 1e-9 {
        sweep = 360.0;
    }
    let steps = ((sweep / ARC_STEP_DEGREES).ceil() as usize).max(2);
    (0..=steps)
        .map(|step| {
            let angle = start + sweep * step as f64 / steps as f64;
            let angle = if counter_clockwise { angle } else { -angle };
            let angle = angle.to_radians();
            center.translate(major * angle.cos()).translate(minor * angle.sin())
        })
        .collect()
}

/// Interior points of a bulged polyline segment (endpoints excluded).
fn bulge_outline(start: Point2, end: Point2, bulge: f64) -> Vec<Point2> {
    let chord = start.distance_to(end);
    if chord < 1e-12 {
        return Vec::new();
    }
    let sweep = 4.0 * bulge.atan();
    let radius = chord / (2.0 * (sweep / 2.0).sin()).abs();
    let mid = start.midpoint(end);
    let normal = start.vector_to(end).perp() * (1.0 / chord);
    let sagitta_to_center = radius - (bulge.abs() * chord / 2.0);
    let center = if bulge > 0.0 {
        mid.translate(normal * sagitta_to_center)
    } else {
        mid.translate(normal * -sagitta_to_center)
    };
    let start_angle = center.vector_to(start).angle();
    let steps = ((sweep.abs().to_degrees() / ARC_STEP_DEGREES).ceil() as usize).max(2);
    (1..steps)
        .map(|step| {
            let angle = start_angle + sweep * step as f64 / steps as f64;
            center.translate(Vector2::from_angle(angle) * radius)
        })
        .collect()
}

fn parse_f64(raw: &str, what: &str) -> Result<f64, String> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| format!("{what} is not a number (value {raw:?})"))
}

fn parse_i32(raw: &str, what: &str) -> Result<i32, String> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| format!("{what} is not an integer (value {raw:?})"))
}

fn parse_i16(raw: &str, what: &str) -> Result<i16, String> {
    let value = parse_i32(raw, what)?;
    i16::try_from(value).map_err(|_| format!("{what} is out of range (value {value})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_bulge_bows_to_the_right_of_the_chord() {
        // Half circle from (0,0) to (2,0), counter-clockwise: passes through (1,-1).
        let points = bulge_outline(Point2::new(0.0, 0.0), Point2::new(2.0, 0.0), 1.0);
        assert!(!points.is_empty());
        for point in &points {
            assert!((point.distance_to(Point2::new(1.0, 0.0)) - 1.0).abs() < 1e-9);
            assert!(point.y() < 0.0);
        }
    }

    #[test]
    fn clockwise_arc_edges_mirror_their_angles() {
        let points = arc_outline(Point2::new(0.0, 0.0), 1.0, 0.0, 90.0, false);
        let last = points.last().copied().expect("points");
        assert!((last.y() + 1.0).abs() < 1e-9);
    }
}
