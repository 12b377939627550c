//! LINE, CIRCLE, ARC, RECTANGLE and PLINE.

use draftcad_core::document::{Arc, Circle, EntityId, EntityKind, Line, Polyline};
use draftcad_core::geometry::Point2;
use draftcad_core::kernel::{Degenerate, EPSILON, circle_through_3_points, normalize_degrees, polar_angle};

use super::{Command, CommandContext, Step};
use crate::errors::CommandError;
use crate::interaction::{Keyword, Reply, Request};
use crate::jig::{CenterArc, CircleDrag, PolylineDrag, RectangleDrag, RubberBand, ThreePointArc};

const CLOSE: Keyword = Keyword::new("Close", "C");
const UNDO: Keyword = Keyword::new("Undo", "U");
const DIAMETER: Keyword = Keyword::new("Diameter", "D");
const CENTER: Keyword = Keyword::new("Center", "CE");

/// Continuous line drawing: every accepted point commits one segment.
#[derive(Debug, Default)]
pub struct LineCommand {
    chain_start: Option<Point2>,
    current: Option<Point2>,
    /// Committed segments with their start points, newest last.
    segments: Vec<(EntityId, Point2)>,
}

impl LineCommand {
    fn next_point(&self, from: Point2) -> Step {
        let keywords: &[Keyword] = if self.segments.len() >= 2 {
            &[CLOSE, UNDO]
        } else {
            &[UNDO]
        };
        Step::Prompt(
            Request::point("Specify next point")
                .keywords(keywords)
                .base(from)
                .allow_empty()
                .jig(RubberBand { anchor: from }),
        )
    }
}

impl Command for LineCommand {
    fn start(&mut self, _ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        Ok(Step::Prompt(Request::point("Specify first point")))
    }

    fn resume(&mut self, reply: Reply, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        ctx.checkpoint()?;
        let Some(current) = self.current else {
            return match reply {
                Reply::Point(point) => {
                    self.chain_start = Some(point);
                    self.current = Some(point);
                    Ok(self.next_point(point))
                }
                _ => Ok(Step::Done),
            };
        };

        match reply {
            Reply::Point(point) => {
                if point.distance_to(current) < EPSILON {
                    ctx.warn("Zero-length segment ignored.");
                    return Ok(self.next_point(current));
                }
                let id = ctx.add_kind(EntityKind::Line(Line {
                    start: current,
                    end: point,
                }));
                self.segments.push((id, current));
                self.current = Some(point);
                Ok(self.next_point(point))
            }
            Reply::Keyword("Undo") => {
                match self.segments.pop() {
                    Some((id, start)) => {
                        ctx.delete(id);
                        self.current = Some(start);
                    }
                    None => ctx.warn("All segments have already been undone."),
                }
                let from = self.current.unwrap_or(current);
                Ok(self.next_point(from))
            }
            Reply::Keyword("Close") => {
                if let Some(start) = self.chain_start {
                    ctx.add_kind(EntityKind::Line(Line {
                        start: current,
                        end: start,
                    }));
                }
                Ok(Step::Done)
            }
            _ => Ok(Step::Done),
        }
    }
}

/// Circles by centre and radius (or diameter), repeated until Enter.
#[derive(Debug, Default)]
pub struct CircleCommand {
    center: Option<Point2>,
    diameter: bool,
    drawn: usize,
}

impl CircleCommand {
    fn center_prompt(&self) -> Step {
        let request = Request::point("Specify center point for circle");
        Step::Prompt(if self.drawn > 0 { request.allow_empty() } else { request })
    }

    fn size_prompt(&self, center: Point2) -> Step {
        let request = if self.diameter {
            Request::distance("Specify diameter of circle")
        } else {
            Request::distance("Specify radius of circle").keywords(&[DIAMETER])
        };
        Step::Prompt(request.base(center).jig(CircleDrag {
            center,
            diameter: self.diameter,
        }))
    }
}

impl Command for CircleCommand {
    fn start(&mut self, _ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        Ok(self.center_prompt())
    }

    fn resume(&mut self, reply: Reply, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        ctx.checkpoint()?;
        let Some(center) = self.center else {
            return match reply {
                Reply::Point(point) => {
                    self.center = Some(point);
                    self.diameter = false;
                    Ok(self.size_prompt(point))
                }
                _ => Ok(Step::Done),
            };
        };

        match reply {
            Reply::Keyword("Diameter") => {
                self.diameter = true;
                Ok(self.size_prompt(center))
            }
            Reply::Distance(value) => {
                let radius = if self.diameter { value / 2.0 } else { value };
                if !(radius > EPSILON) {
                    ctx.warn("Value must be positive and nonzero.");
                    return Ok(self.size_prompt(center));
                }
                ctx.add_kind(EntityKind::Circle(Circle { center, radius }));
                ctx.print(format!("Circle created: center {center}, radius {radius:.4}"));
                self.center = None;
                self.drawn += 1;
                Ok(self.center_prompt())
            }
            _ => Ok(Step::Done),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum ArcStage {
    #[default]
    Start,
    Second { start: Point2 },
    End { start: Point2, second: Point2 },
    Center,
    CenterStart { center: Point2 },
    CenterEnd { center: Point2, start: Point2 },
}

/// Arcs through three points, or by centre, start and end.
#[derive(Debug, Default)]
pub struct ArcCommand {
    stage: ArcStage,
}

impl ArcCommand {
    fn commit(ctx: &mut CommandContext<'_>, arc: Arc) -> Step {
        ctx.add_kind(EntityKind::Arc(arc));
        ctx.print(format!("Arc created: center {}, radius {:.4}", arc.center, arc.radius));
        Step::Done
    }
}

impl Command for ArcCommand {
    fn start(&mut self, _ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        self.stage = ArcStage::Start;
        Ok(Step::Prompt(Request::point("Specify start point of arc").keywords(&[CENTER])))
    }

    fn resume(&mut self, reply: Reply, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        ctx.checkpoint()?;
        let point = match reply {
            Reply::Point(point) => point,
            Reply::Keyword("Center") if matches!(self.stage, ArcStage::Start) => {
                self.stage = ArcStage::Center;
                return Ok(Step::Prompt(Request::point("Specify center point of arc")));
            }
            _ => return Ok(Step::Done),
        };

        match self.stage {
            ArcStage::Start => {
                self.stage = ArcStage::Second { start: point };
                Ok(Step::Prompt(
                    Request::point("Specify second point of arc")
                        .base(point)
                        .jig(RubberBand { anchor: point }),
                ))
            }
            ArcStage::Second { start } => {
                self.stage = ArcStage::End { start, second: point };
                Ok(Step::Prompt(
                    Request::point("Specify end point of arc")
                        .base(point)
                        .jig(ThreePointArc { start, mid: point }),
                ))
            }
            ArcStage::End { start, second } => {
                let fit = circle_through_3_points(start, second, point)
                    .map_err(CommandError::degenerate("Cannot create arc"))?;
                Ok(Self::commit(ctx, fit.to_arc()))
            }
            ArcStage::Center => {
                self.stage = ArcStage::CenterStart { center: point };
                Ok(Step::Prompt(
                    Request::point("Specify start point of arc")
                        .base(point)
                        .jig(RubberBand { anchor: point }),
                ))
            }
            ArcStage::CenterStart { center } => {
                if center.distance_to(point) < EPSILON {
                    return Err(CommandError::Degenerate {
                        context: "Cannot create arc",
                        source: Degenerate::ZeroLength,
                    });
                }
                self.stage = ArcStage::CenterEnd { center, start: point };
                Ok(Step::Prompt(
                    Request::point("Specify end point of arc")
                        .base(center)
                        .jig(CenterArc { center, start: point }),
                ))
            }
            ArcStage::CenterEnd { center, start } => {
                let arc = Arc {
                    center,
                    radius: center.distance_to(start),
                    start_angle: normalize_degrees(polar_angle(center, start).to_degrees()),
                    end_angle: normalize_degrees(polar_angle(center, point).to_degrees()),
                };
                Ok(Self::commit(ctx, arc))
            }
        }
    }
}

/// Axis-aligned rectangle committed as a closed four-vertex polyline.
#[derive(Debug, Default)]
pub struct RectangleCommand {
    corner: Option<Point2>,
}

impl Command for RectangleCommand {
    fn start(&mut self, _ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        Ok(Step::Prompt(Request::point("Specify first corner point")))
    }

    fn resume(&mut self, reply: Reply, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        ctx.checkpoint()?;
        let Reply::Point(point) = reply else {
            return Ok(Step::Done);
        };
        let Some(corner) = self.corner else {
            self.corner = Some(point);
            return Ok(Step::Prompt(
                Request::point("Specify other corner point")
                    .base(point)
                    .jig(RectangleDrag { corner: point }),
            ));
        };

        if (point.x() - corner.x()).abs() < EPSILON || (point.y() - corner.y()).abs() < EPSILON {
            return Err(CommandError::Degenerate {
                context: "Cannot create rectangle",
                source: Degenerate::ZeroLength,
            });
        }
        let outline = [
            corner,
            Point2::new(point.x(), corner.y()),
            point,
            Point2::new(corner.x(), point.y()),
        ];
        ctx.add_kind(EntityKind::Polyline(Polyline::from_points(outline, true)));
        ctx.print(format!(
            "Rectangle created: {:.4} x {:.4}",
            (point.x() - corner.x()).abs(),
            (point.y() - corner.y()).abs()
        ));
        Ok(Step::Done)
    }
}

/// Polyline built vertex by vertex and committed once at the end.
#[derive(Debug, Default)]
pub struct PlineCommand {
    points: Vec<Point2>,
}

impl PlineCommand {
    fn next_point(&self) -> Step {
        let keywords: &[Keyword] = if self.points.len() >= 3 {
            &[CLOSE, UNDO]
        } else {
            &[UNDO]
        };
        let mut request = Request::point("Specify next point")
            .keywords(keywords)
            .allow_empty()
            .jig(PolylineDrag {
                points: self.points.clone(),
            });
        if let Some(last) = self.points.last() {
            request = request.base(*last);
        }
        Step::Prompt(request)
    }

    fn commit(&mut self, ctx: &mut CommandContext<'_>, closed: bool) -> Step {
        let points = std::mem::take(&mut self.points);
        let count = points.len();
        ctx.add_kind(EntityKind::Polyline(Polyline::from_points(points, closed)));
        ctx.print(format!("Polyline created with {count} vertices"));
        Step::Done
    }
}

impl Command for PlineCommand {
    fn start(&mut self, _ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        Ok(Step::Prompt(Request::point("Specify start point")))
    }

    fn resume(&mut self, reply: Reply, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        ctx.checkpoint()?;
        match reply {
            Reply::Point(point) => {
                if self.points.last().is_some_and(|last| last.distance_to(point) < EPSILON) {
                    ctx.warn("Duplicate vertex ignored.");
                } else {
                    self.points.push(point);
                }
                Ok(self.next_point())
            }
            Reply::Keyword("Undo") => {
                if self.points.len() > 1 {
                    self.points.pop();
                } else {
                    ctx.warn("Nothing to undo.");
                }
                Ok(self.next_point())
            }
            Reply::Keyword("Close") => {
                if self.points.len() < 3 {
                    ctx.warn("Need at least three vertices to close.");
                    return Ok(self.next_point());
                }
                Ok(self.commit(ctx, true))
            }
            Reply::Empty if self.points.len() >= 2 => Ok(self.commit(ctx, false)),
            _ => Ok(Step::Done),
        }
    }
}
