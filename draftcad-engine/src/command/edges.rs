//! TRIM and EXTEND against a set of boundary edges.

use draftcad_core::document::{Arc, Entity, EntityAttrs, EntityId, EntityKind, Line};
use draftcad_core::geometry::Point2;
use draftcad_core::kernel::{Carrier, CarrierHit, normalize_degrees};

use super::{Command, CommandContext, Step};
use crate::errors::CommandError;
use crate::interaction::{Reply, Request};

/// Hits this close to an end of the target (in line parameter or degrees) are ignored.
const PARAM_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMode {
    Trim,
    Extend,
}

impl EdgeMode {
    fn boundary_prompt(self) -> &'static str {
        match self {
            EdgeMode::Trim => "Select cutting edges (Enter for all objects)",
            EdgeMode::Extend => "Select boundary edges (Enter for all objects)",
        }
    }

    fn target_prompt(self) -> &'static str {
        match self {
            EdgeMode::Trim => "Select object to trim",
            EdgeMode::Extend => "Select object to extend",
        }
    }
}

#[derive(Debug)]
pub struct EdgeCommand {
    mode: EdgeMode,
    boundaries: Option<Vec<EntityId>>,
}

impl EdgeCommand {
    pub fn new(mode: EdgeMode) -> Self {
        Self { mode, boundaries: None }
    }

    fn target_prompt(&self) -> Step {
        Step::Prompt(Request::point(self.mode.target_prompt()).allow_empty())
    }

    /// Intersections of `carrier` with every boundary other than the target itself.
    fn hits(&self, ctx: &CommandContext<'_>, carrier: &Carrier, target: EntityId) -> Vec<CarrierHit> {
        self.boundaries
            .iter()
            .flatten()
            .filter(|id| **id != target)
            .filter_map(|id| ctx.entity(*id))
            .flat_map(|boundary| carrier.hits(&boundary.kind))
            .collect()
    }

    fn edit(&mut self, ctx: &mut CommandContext<'_>, target: EntityId, pick: Point2) {
        let Some(entity) = ctx.entity(target).cloned() else {
            return;
        };
        let result = match self.mode {
            EdgeMode::Trim => self.trimmed(ctx, &entity.kind, target, pick),
            EdgeMode::Extend => self.extended(ctx, &entity.kind, target, pick),
        };
        match result {
            Ok(pieces) => {
                let replacements = pieces
                    .into_iter()
                    .map(|kind| Entity {
                        attrs: EntityAttrs {
                            handle: None,
                            ..entity.attrs.clone()
                        },
                        kind,
                    })
                    .collect();
                let added = ctx.apply(&[target], replacements);
                // a trimmed boundary keeps cutting through its remaining pieces
                if let Some(boundaries) = self.boundaries.as_mut() {
                    if let Some(index) = boundaries.iter().position(|id| *id == target) {
                        boundaries.remove(index);
                        boundaries.extend(added);
                    }
                }
            }
            Err(message) => ctx.warn(message),
        }
    }

    fn trimmed(
        &self,
        ctx: &CommandContext<'_>,
        kind: &EntityKind,
        target: EntityId,
        pick: Point2,
    ) -> Result<Vec<EntityKind>, &'static str> {
        match kind {
            EntityKind::Line(line) => {
                let carrier = Carrier::Line {
                    start: line.start,
                    end: line.end,
                };
                let hits: Vec<CarrierHit> = self
                    .hits(ctx, &carrier, target)
                    .into_iter()
                    .filter(|hit| hit.param > PARAM_EPSILON && hit.param < 1.0 - PARAM_EPSILON)
                    .collect();
                let picked = carrier.param_of(pick);
                let (before, after) = bracket(&hits, picked, |hit| hit.param);
                let piece = |start: Point2, end: Point2| EntityKind::Line(Line { start, end });
                match (before, after) {
                    (None, None) => Err("No cutting edge crosses the object."),
                    (Some(before), None) => Ok(vec![piece(line.start, before.point)]),
                    (None, Some(after)) => Ok(vec![piece(after.point, line.end)]),
                    (Some(before), Some(after)) => Ok(vec![
                        piece(line.start, before.point),
                        piece(after.point, line.end),
                    ]),
                }
            }
            EntityKind::Circle(circle) => {
                let carrier = Carrier::Circle {
                    center: circle.center,
                    radius: circle.radius,
                };
                let mut angles: Vec<f64> = self
                    .hits(ctx, &carrier, target)
                    .into_iter()
                    .map(|hit| hit.param)
                    .collect();
                angles.sort_by(f64::total_cmp);
                angles.dedup_by(|a, b| (*a - *b).abs() < PARAM_EPSILON);
                if angles.len() < 2 {
                    return Err("A circle needs two cutting intersections.");
                }
                let picked = carrier.param_of(pick);
                let ahead = |angle: &&f64| (**angle - picked).rem_euclid(360.0);
                // the removed piece runs from the last hit before the pick to the first after it
                let first_after = angles.iter().min_by(|a, b| ahead(a).total_cmp(&ahead(b)));
                let last_before = angles.iter().max_by(|a, b| ahead(a).total_cmp(&ahead(b)));
                match (first_after, last_before) {
                    (Some(start), Some(end)) => Ok(vec![EntityKind::Arc(Arc {
                        center: circle.center,
                        radius: circle.radius,
                        start_angle: *start,
                        end_angle: *end,
                    })]),
                    _ => Err("A circle needs two cutting intersections."),
                }
            }
            EntityKind::Arc(arc) => {
                let carrier = Carrier::Circle {
                    center: arc.center,
                    radius: arc.radius,
                };
                let sweep = arc.sweep();
                let offset = |angle: f64| (angle - arc.start_angle).rem_euclid(360.0);
                let offsets: Vec<f64> = self
                    .hits(ctx, &carrier, target)
                    .into_iter()
                    .map(|hit| offset(hit.param))
                    .filter(|off| *off > PARAM_EPSILON && *off < sweep - PARAM_EPSILON)
                    .collect();
                let picked = offset(carrier.param_of(pick));
                let (before, after) = bracket(&offsets, picked, |off| *off);
                let piece = |from: f64, to: f64| {
                    EntityKind::Arc(Arc {
                        start_angle: normalize_degrees(arc.start_angle + from),
                        end_angle: normalize_degrees(arc.start_angle + to),
                        ..*arc
                    })
                };
                match (before, after) {
                    (None, None) => Err("No cutting edge crosses the object."),
                    (Some(before), None) => Ok(vec![piece(0.0, *before)]),
                    (None, Some(after)) => Ok(vec![piece(*after, sweep)]),
                    (Some(before), Some(after)) => Ok(vec![piece(0.0, *before), piece(*after, sweep)]),
                }
            }
            _ => Err("Only lines, arcs and circles can be trimmed."),
        }
    }

    fn extended(
        &self,
        ctx: &CommandContext<'_>,
        kind: &EntityKind,
        target: EntityId,
        pick: Point2,
    ) -> Result<Vec<EntityKind>, &'static str> {
        const NO_BOUNDARY: &str = "No boundary edge lies in that direction.";
        match kind {
            EntityKind::Line(line) => {
                let carrier = Carrier::Line {
                    start: line.start,
                    end: line.end,
                };
                let hits = self.hits(ctx, &carrier, target);
                if carrier.param_of(pick) >= 0.5 {
                    let reach = hits
                        .iter()
                        .filter(|hit| hit.param > 1.0 + PARAM_EPSILON)
                        .min_by(|a, b| a.param.total_cmp(&b.param))
                        .ok_or(NO_BOUNDARY)?;
                    Ok(vec![EntityKind::Line(Line {
                        start: line.start,
                        end: reach.point,
                    })])
                } else {
                    let reach = hits
                        .iter()
                        .filter(|hit| hit.param < -PARAM_EPSILON)
                        .max_by(|a, b| a.param.total_cmp(&b.param))
                        .ok_or(NO_BOUNDARY)?;
                    Ok(vec![EntityKind::Line(Line {
                        start: reach.point,
                        end: line.end,
                    })])
                }
            }
            EntityKind::Arc(arc) => {
                let carrier = Carrier::Circle {
                    center: arc.center,
                    radius: arc.radius,
                };
                let sweep = arc.sweep();
                let gap = 360.0 - sweep;
                let angles: Vec<f64> = self
                    .hits(ctx, &carrier, target)
                    .into_iter()
                    .map(|hit| hit.param)
                    .collect();
                if pick.distance_to(arc.end_point()) <= pick.distance_to(arc.start_point()) {
                    let grow = angles
                        .iter()
                        .map(|angle| (angle - arc.end_angle).rem_euclid(360.0))
                        .filter(|grow| *grow > PARAM_EPSILON && *grow < gap - PARAM_EPSILON)
                        .min_by(f64::total_cmp)
                        .ok_or(NO_BOUNDARY)?;
                    Ok(vec![EntityKind::Arc(Arc {
                        end_angle: normalize_degrees(arc.end_angle + grow),
                        ..*arc
                    })])
                } else {
                    let grow = angles
                        .iter()
                        .map(|angle| (arc.start_angle - angle).rem_euclid(360.0))
                        .filter(|grow| *grow > PARAM_EPSILON && *grow < gap - PARAM_EPSILON)
                        .min_by(f64::total_cmp)
                        .ok_or(NO_BOUNDARY)?;
                    Ok(vec![EntityKind::Arc(Arc {
                        start_angle: normalize_degrees(arc.start_angle - grow),
                        ..*arc
                    })])
                }
            }
            _ => Err("Only lines and arcs can be extended."),
        }
    }
}

/// Nearest items strictly below and above `value` by `key`.
fn bracket<T>(items: &[T], value: f64, key: impl Fn(&T) -> f64) -> (Option<&T>, Option<&T>) {
    let before = items
        .iter()
        .filter(|item| key(*item) < value)
        .max_by(|a, b| key(*a).total_cmp(&key(*b)));
    let after = items
        .iter()
        .filter(|item| key(*item) > value)
        .min_by(|a, b| key(*a).total_cmp(&key(*b)));
    (before, after)
}

impl Command for EdgeCommand {
    fn start(&mut self, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        let preselected = ctx.take_selection();
        if preselected.is_empty() {
            Ok(Step::Prompt(Request::selection(self.mode.boundary_prompt()).allow_empty()))
        } else {
            self.boundaries = Some(preselected);
            Ok(self.target_prompt())
        }
    }

    fn resume(&mut self, reply: Reply, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        ctx.checkpoint()?;
        if self.boundaries.is_none() {
            let boundaries = match reply {
                Reply::Selection(ids) => ids,
                Reply::Empty => ctx.scene().visible_entities().collect(),
                _ => return Ok(Step::Done),
            };
            self.boundaries = Some(boundaries);
            return Ok(self.target_prompt());
        }

        match reply {
            Reply::Point(pick) => {
                match ctx.pick(pick) {
                    Some(target) => self.edit(ctx, target, pick),
                    None => ctx.warn("No object found."),
                }
                Ok(self.target_prompt())
            }
            _ => Ok(Step::Done),
        }
    }
}
