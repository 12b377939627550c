use draftcad_core::document::{Entity, EntityAttrs, EntityId};
use draftcad_core::kernel::EPSILON;
use draftcad_core::offset::offset_entity;

use super::{Command, CommandContext, Step};
use crate::errors::CommandError;
use crate::interaction::{Reply, Request};

/// Parallel copies at a fixed distance; the distance is remembered for the next OFFSET.
#[derive(Debug, Default)]
pub struct OffsetCommand {
    distance: Option<f64>,
    target: Option<EntityId>,
}

impl OffsetCommand {
    fn distance_prompt(ctx: &CommandContext<'_>) -> Step {
        Step::Prompt(match ctx.scene().offset_distance() {
            Some(previous) => Request::distance(format!("Specify offset distance <{previous:.4}>")).allow_empty(),
            None => Request::distance("Specify offset distance"),
        })
    }

    fn select_prompt() -> Step {
        Step::Prompt(Request::point("Select object to offset").allow_empty())
    }

    fn side_prompt() -> Step {
        Step::Prompt(Request::point("Specify point on side to offset"))
    }
}

impl Command for OffsetCommand {
    fn start(&mut self, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        Ok(Self::distance_prompt(ctx))
    }

    fn resume(&mut self, reply: Reply, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        ctx.checkpoint()?;
        let Some(distance) = self.distance else {
            let distance = match reply {
                Reply::Distance(value) => value,
                Reply::Empty => match ctx.scene().offset_distance() {
                    Some(previous) => previous,
                    None => return Ok(Step::Done),
                },
                _ => return Ok(Step::Done),
            };
            if !(distance > EPSILON) {
                ctx.warn("Value must be positive and nonzero.");
                return Ok(Self::distance_prompt(ctx));
            }
            self.distance = Some(distance);
            ctx.set_offset_distance(distance);
            return Ok(Self::select_prompt());
        };

        let Reply::Point(point) = reply else {
            return Ok(Step::Done);
        };

        let Some(target) = self.target.take() else {
            return Ok(match ctx.pick(point) {
                Some(id) => {
                    self.target = Some(id);
                    Self::side_prompt()
                }
                None => {
                    ctx.warn("No object found.");
                    Self::select_prompt()
                }
            });
        };

        let Some(entity) = ctx.entity(target).cloned() else {
            return Ok(Self::select_prompt());
        };
        match offset_entity(&entity.kind, distance, point) {
            Some(Ok(kind)) => {
                ctx.add(Entity {
                    attrs: EntityAttrs {
                        handle: None,
                        ..entity.attrs
                    },
                    kind,
                });
            }
            Some(Err(reason)) => ctx.warn(format!("Cannot offset that object: {reason}.")),
            None => ctx.warn("Only lines, arcs, circles and polylines can be offset."),
        }
        Ok(Self::select_prompt())
    }
}
