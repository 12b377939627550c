//! MOVE, COPY and ERASE.

use draftcad_core::document::{Entity, EntityId};
use draftcad_core::geometry::Point2;

use super::{Command, CommandContext, Step};
use crate::errors::CommandError;
use crate::interaction::{Reply, Request};
use crate::jig::Drag;

/// MOVE (`copy == false`) or COPY: selection, base point, then displacement.
#[derive(Debug)]
pub struct TransformCommand {
    copy: bool,
    ids: Vec<EntityId>,
    base: Option<Point2>,
    copies: usize,
}

impl TransformCommand {
    pub fn new(copy: bool) -> Self {
        Self {
            copy,
            ids: Vec::new(),
            base: None,
            copies: 0,
        }
    }

    fn base_prompt() -> Step {
        Step::Prompt(Request::point("Specify base point"))
    }

    fn target_prompt(&self, ctx: &CommandContext<'_>, base: Point2) -> Step {
        let entities: Vec<&Entity> = self.ids.iter().filter_map(|id| ctx.entity(*id)).collect();
        let request = Request::point("Specify second point")
            .base(base)
            .jig(Drag::new(base, &entities));
        Step::Prompt(if self.copy && self.copies > 0 {
            request.allow_empty()
        } else {
            request
        })
    }

    fn displaced(&self, ctx: &CommandContext<'_>, base: Point2, target: Point2) -> Vec<Entity> {
        let offset = base.vector_to(target);
        self.ids
            .iter()
            .filter_map(|id| ctx.entity(*id))
            .map(|entity| {
                let mut moved = entity.translated(offset);
                if self.copy {
                    moved.attrs.handle = None;
                }
                moved
            })
            .collect()
    }
}

impl Command for TransformCommand {
    fn start(&mut self, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        self.ids = ctx.take_selection();
        if self.ids.is_empty() {
            Ok(Step::Prompt(Request::selection("Select objects")))
        } else {
            Ok(Self::base_prompt())
        }
    }

    fn resume(&mut self, reply: Reply, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        ctx.checkpoint()?;
        if self.ids.is_empty() {
            return match reply {
                Reply::Selection(ids) if !ids.is_empty() => {
                    self.ids = ids;
                    Ok(Self::base_prompt())
                }
                _ => Ok(Step::Done),
            };
        }

        let Some(base) = self.base else {
            return match reply {
                Reply::Point(point) => {
                    self.base = Some(point);
                    Ok(self.target_prompt(ctx, point))
                }
                _ => Ok(Step::Done),
            };
        };

        let Reply::Point(target) = reply else {
            return Ok(Step::Done);
        };
        let moved = self.displaced(ctx, base, target);
        if moved.is_empty() {
            return Err(CommandError::Failed("The selected objects no longer exist.".to_string()));
        }
        let count = moved.len();
        if self.copy {
            ctx.apply(&[], moved);
            self.copies += 1;
            ctx.print(format!("{count} objects copied"));
            Ok(self.target_prompt(ctx, base))
        } else {
            let ids = std::mem::take(&mut self.ids);
            ctx.apply(&ids, moved);
            ctx.print(format!("{count} objects moved"));
            Ok(Step::Done)
        }
    }
}

#[derive(Debug, Default)]
pub struct EraseCommand;

impl EraseCommand {
    fn erase(ctx: &mut CommandContext<'_>, ids: &[EntityId]) -> Step {
        ctx.apply(ids, Vec::new());
        ctx.print(format!("{} objects erased", ids.len()));
        Step::Done
    }
}

impl Command for EraseCommand {
    fn start(&mut self, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        let ids = ctx.take_selection();
        if ids.is_empty() {
            Ok(Step::Prompt(Request::selection("Select objects")))
        } else {
            Ok(Self::erase(ctx, &ids))
        }
    }

    fn resume(&mut self, reply: Reply, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        ctx.checkpoint()?;
        match reply {
            Reply::Selection(ids) => Ok(Self::erase(ctx, &ids)),
            _ => Ok(Step::Done),
        }
    }
}
