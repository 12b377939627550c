//! Linear, aligned and angular dimensions.

use draftcad_core::dimension::{DimOrientation, angular_layout, linear_layout};
use draftcad_core::document::EntityKind;
use draftcad_core::geometry::Point2;
use draftcad_core::kernel::{Degenerate, EPSILON};

use super::{Command, CommandContext, Step};
use crate::errors::CommandError;
use crate::interaction::{Reply, Request};
use crate::jig::{AngularDimensionDrag, LinearDimensionDrag, RubberBand};

const CONTEXT: &str = "Cannot create dimension";

#[derive(Debug)]
pub struct LinearDimCommand {
    orientation: DimOrientation,
    first: Option<Point2>,
    second: Option<Point2>,
}

impl LinearDimCommand {
    pub fn new(orientation: DimOrientation) -> Self {
        Self {
            orientation,
            first: None,
            second: None,
        }
    }
}

impl Command for LinearDimCommand {
    fn start(&mut self, _ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        Ok(Step::Prompt(Request::point("Specify first extension line origin")))
    }

    fn resume(&mut self, reply: Reply, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        ctx.checkpoint()?;
        let Reply::Point(point) = reply else {
            return Ok(Step::Done);
        };

        match (self.first, self.second) {
            (None, _) => {
                self.first = Some(point);
                Ok(Step::Prompt(
                    Request::point("Specify second extension line origin")
                        .base(point)
                        .jig(RubberBand { anchor: point }),
                ))
            }
            (Some(first), None) => {
                if first.distance_to(point) < EPSILON {
                    return Err(CommandError::Degenerate {
                        context: CONTEXT,
                        source: Degenerate::ZeroLength,
                    });
                }
                self.second = Some(point);
                Ok(Step::Prompt(Request::point("Specify dimension line location").jig(
                    LinearDimensionDrag {
                        first,
                        second: point,
                        orientation: self.orientation,
                        style: ctx.settings().dim_style,
                    },
                )))
            }
            (Some(first), Some(second)) => {
                let style = ctx.settings().dim_style;
                let layout = linear_layout(first, second, point, self.orientation, &style)
                    .map_err(CommandError::degenerate(CONTEXT))?;
                ctx.add_kind(EntityKind::Dimension(layout.to_dimension()));
                ctx.print(format!("Dimension text = {}", layout.text()));
                Ok(Step::Done)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct AngularDimCommand {
    first: Option<(Point2, Point2)>,
    second: Option<(Point2, Point2)>,
}

impl AngularDimCommand {
    fn line_at(ctx: &mut CommandContext<'_>, point: Point2) -> Option<(Point2, Point2)> {
        let picked = ctx
            .pick(point)
            .and_then(|id| ctx.entity(id))
            .and_then(|entity| match &entity.kind {
                EntityKind::Line(line) => Some((line.start, line.end)),
                _ => None,
            });
        if picked.is_none() {
            ctx.warn("Object must be a line.");
        }
        picked
    }
}

impl Command for AngularDimCommand {
    fn start(&mut self, _ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        Ok(Step::Prompt(Request::point("Select first line")))
    }

    fn resume(&mut self, reply: Reply, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        ctx.checkpoint()?;
        let Reply::Point(point) = reply else {
            return Ok(Step::Done);
        };

        match (self.first, self.second) {
            (None, _) => {
                self.first = Self::line_at(ctx, point);
                Ok(Step::Prompt(Request::point(if self.first.is_some() {
                    "Select second line"
                } else {
                    "Select first line"
                })))
            }
            (Some(first), None) => {
                let Some(second) = Self::line_at(ctx, point) else {
                    return Ok(Step::Prompt(Request::point("Select second line")));
                };
                self.second = Some(second);
                Ok(Step::Prompt(
                    Request::point("Specify dimension arc line location").jig(AngularDimensionDrag {
                        first,
                        second,
                        style: ctx.settings().dim_style,
                    }),
                ))
            }
            (Some(first), Some(second)) => {
                let style = ctx.settings().dim_style;
                let layout = angular_layout(first, second, point, &style)
                    .map_err(CommandError::degenerate(CONTEXT))?;
                ctx.add_kind(EntityKind::Dimension(layout.to_dimension()));
                ctx.print(format!("Dimension text = {}", layout.text()));
                Ok(Step::Done)
            }
        }
    }
}
