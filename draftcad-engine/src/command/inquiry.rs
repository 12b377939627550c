use draftcad_core::dimension::format_measurement;
use draftcad_core::geometry::Point2;
use draftcad_core::kernel::normalize_degrees;

use super::{Command, CommandContext, Step};
use crate::errors::CommandError;
use crate::interaction::{Reply, Request};
use crate::jig::RubberBand;

/// Reports distance, angle and deltas between two points.
#[derive(Debug, Default)]
pub struct DistCommand {
    first: Option<Point2>,
}

pub(crate) fn describe_distance(first: Point2, second: Point2) -> String {
    let delta = first.vector_to(second);
    let angle = if delta.length() > 0.0 {
        normalize_degrees(delta.angle().to_degrees())
    } else {
        0.0
    };
    format!(
        "Distance = {:.4}, Angle in XY Plane = {}, Delta X = {:.4}, Delta Y = {:.4}",
        delta.length(),
        format_measurement(angle),
        delta.x(),
        delta.y()
    )
}

impl Command for DistCommand {
    fn start(&mut self, _ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        Ok(Step::Prompt(Request::point("Specify first point")))
    }

    fn resume(&mut self, reply: Reply, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        ctx.checkpoint()?;
        let Reply::Point(point) = reply else {
            return Ok(Step::Done);
        };
        match self.first {
            None => {
                self.first = Some(point);
                Ok(Step::Prompt(
                    Request::point("Specify second point")
                        .base(point)
                        .jig(RubberBand { anchor: point }),
                ))
            }
            Some(first) => {
                ctx.print(describe_distance(first, point));
                Ok(Step::Done)
            }
        }
    }
}
