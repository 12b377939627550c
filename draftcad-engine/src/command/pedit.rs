use draftcad_core::document::{Entity, EntityAttrs, EntityId, EntityKind, Polyline, PolylineVertex};
use draftcad_core::geometry::Point2;

use super::{Command, CommandContext, Step};
use crate::errors::CommandError;
use crate::interaction::{Keyword, Reply, Request};

const YES: Keyword = Keyword::new("Yes", "Y");
const NO: Keyword = Keyword::new("No", "N");
const CLOSE: Keyword = Keyword::new("Close", "C");
const OPEN: Keyword = Keyword::new("Open", "O");
const JOIN: Keyword = Keyword::new("Join", "J");
const REVERSE: Keyword = Keyword::new("Reverse", "R");
const EXIT: Keyword = Keyword::new("eXit", "X");

/// Endpoints closer than this are considered coincident when joining.
const JOIN_TOLERANCE: f64 = 1e-6;

/// Polyline editing: close, open, join touching lines and reverse.
#[derive(Debug, Default)]
pub struct PeditCommand {
    target: Option<EntityId>,
    /// Line waiting for the convert-to-polyline answer.
    convert: Option<EntityId>,
}

impl PeditCommand {
    fn select_prompt() -> Step {
        Step::Prompt(Request::point("Select polyline"))
    }

    fn option_prompt(closed: bool) -> Step {
        let toggle = if closed { OPEN } else { CLOSE };
        Step::Prompt(
            Request::point("Enter an option")
                .keywords(&[toggle, JOIN, REVERSE, EXIT])
                .allow_empty(),
        )
    }

    fn polyline(ctx: &CommandContext<'_>, id: EntityId) -> Option<(EntityAttrs, Polyline)> {
        let entity = ctx.entity(id)?;
        match &entity.kind {
            EntityKind::Polyline(polyline) => Some((entity.attrs.clone(), polyline.clone())),
            _ => None,
        }
    }

    /// Swaps the target for `polyline` and prompts for the next option.
    fn store(&mut self, ctx: &mut CommandContext<'_>, target: EntityId, attrs: EntityAttrs, polyline: Polyline, extra: &[EntityId]) -> Step {
        let closed = polyline.closed;
        let mut remove = vec![target];
        remove.extend_from_slice(extra);
        let added = ctx.apply(
            &remove,
            vec![Entity {
                attrs,
                kind: EntityKind::Polyline(polyline),
            }],
        );
        self.target = added.first().copied();
        Self::option_prompt(closed)
    }

    fn apply_option(&mut self, ctx: &mut CommandContext<'_>, target: EntityId, option: &str) -> Step {
        let Some((attrs, mut polyline)) = Self::polyline(ctx, target) else {
            return Step::Done;
        };
        match option {
            "Close" | "Open" => {
                polyline.closed = option == "Close";
                self.store(ctx, target, attrs, polyline, &[])
            }
            "Reverse" => {
                reverse(&mut polyline);
                self.store(ctx, target, attrs, polyline, &[])
            }
            "Join" => {
                if polyline.closed {
                    ctx.warn("Cannot join to a closed polyline.");
                    return Self::option_prompt(true);
                }
                let joined = join_lines(ctx, target, &mut polyline);
                ctx.print(format!("{} segments added to polyline", joined.len()));
                if joined.is_empty() {
                    return Self::option_prompt(false);
                }
                self.store(ctx, target, attrs, polyline, &joined)
            }
            _ => Step::Done,
        }
    }
}

impl Command for PeditCommand {
    fn start(&mut self, _ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        Ok(Self::select_prompt())
    }

    fn resume(&mut self, reply: Reply, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        ctx.checkpoint()?;

        if let Some(line_id) = self.convert.take() {
            return Ok(match reply {
                Reply::Keyword("Yes") | Reply::Empty => {
                    let Some(entity) = ctx.entity(line_id).cloned() else {
                        return Ok(Step::Done);
                    };
                    let EntityKind::Line(line) = entity.kind else {
                        return Ok(Step::Done);
                    };
                    let polyline = Polyline::from_points([line.start, line.end], false);
                    self.store(ctx, line_id, entity.attrs, polyline, &[])
                }
                _ => Step::Done,
            });
        }

        let Some(target) = self.target else {
            let Reply::Point(point) = reply else {
                return Ok(Step::Done);
            };
            let Some(id) = ctx.pick(point) else {
                ctx.warn("No object found.");
                return Ok(Self::select_prompt());
            };
            return Ok(match ctx.entity(id).map(|entity| &entity.kind) {
                Some(EntityKind::Polyline(polyline)) => {
                    let closed = polyline.closed;
                    self.target = Some(id);
                    Self::option_prompt(closed)
                }
                Some(EntityKind::Line(_)) => {
                    self.convert = Some(id);
                    Step::Prompt(
                        Request::point("Object selected is not a polyline. Do you want to turn it into one? <Y>")
                            .keywords(&[YES, NO])
                            .allow_empty(),
                    )
                }
                _ => {
                    ctx.warn("Object selected is not a polyline.");
                    Self::select_prompt()
                }
            });
        };

        match reply {
            Reply::Keyword("eXit") | Reply::Empty => Ok(Step::Done),
            Reply::Keyword(option) => Ok(self.apply_option(ctx, target, option)),
            Reply::Point(_) => {
                ctx.warn("Enter an option keyword.");
                let closed = Self::polyline(ctx, target).is_some_and(|(_, polyline)| polyline.closed);
                Ok(Self::option_prompt(closed))
            }
            _ => Ok(Step::Done),
        }
    }
}

/// Reverses vertex order. Each bulge moves to the vertex that now starts its segment
/// and flips sign, so arcs keep their shape.
pub(crate) fn reverse(polyline: &mut Polyline) {
    let count = polyline.vertices.len();
    if count < 2 {
        return;
    }
    let bulges: Vec<f64> = polyline.vertices.iter().map(|vertex| vertex.bulge).collect();
    polyline.vertices.reverse();
    for (index, vertex) in polyline.vertices.iter_mut().enumerate() {
        vertex.bulge = if index + 1 < count {
            -bulges[count - 2 - index]
        } else {
            -bulges[count - 1]
        };
    }
}

/// Appends lines touching either open end, repeatedly. Returns the consumed line ids.
fn join_lines(ctx: &CommandContext<'_>, target: EntityId, polyline: &mut Polyline) -> Vec<EntityId> {
    let mut candidates: Vec<(EntityId, Point2, Point2)> = ctx
        .drawing()
        .entities()
        .filter(|(id, _)| *id != target)
        .filter_map(|(id, entity)| match &entity.kind {
            EntityKind::Line(line) => Some((*id, line.start, line.end)),
            _ => None,
        })
        .collect();

    let mut joined = Vec::new();
    loop {
        let (Some(first), Some(last)) = (polyline.vertices.first(), polyline.vertices.last()) else {
            break;
        };
        let (head, tail) = (first.position, last.position);
        let touching = candidates.iter().position(|(_, start, end)| {
            [start, end]
                .iter()
                .any(|point| point.distance_to(head) < JOIN_TOLERANCE || point.distance_to(tail) < JOIN_TOLERANCE)
        });
        let Some(index) = touching else {
            break;
        };
        let (id, start, end) = candidates.swap_remove(index);
        if start.distance_to(tail) < JOIN_TOLERANCE || end.distance_to(tail) < JOIN_TOLERANCE {
            let far = if start.distance_to(tail) < JOIN_TOLERANCE { end } else { start };
            if let Some(last) = polyline.vertices.last_mut() {
                last.bulge = 0.0;
            }
            polyline.vertices.push(PolylineVertex::new(far));
        } else {
            let far = if start.distance_to(head) < JOIN_TOLERANCE { end } else { start };
            polyline.vertices.insert(0, PolylineVertex::new(far));
        }
        joined.push(id);
    }
    joined
}
