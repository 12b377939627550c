//! ZOOM and its shortcuts.

use draftcad_core::document::DEFAULT_BOUNDS;
use draftcad_core::geometry::{Bounds2D, Point2};
use draftcad_core::kernel::EPSILON;

use super::{Command, CommandContext, Step};
use crate::errors::CommandError;
use crate::interaction::{Keyword, Reply, Request};
use crate::jig::RectangleDrag;

const ALL: Keyword = Keyword::new("All", "A");
const EXTENTS: Keyword = Keyword::new("Extents", "E");
const WINDOW: Keyword = Keyword::new("Window", "W");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomStart {
    /// Ask for a window corner or an option.
    Prompt,
    Window,
    Extents,
    All,
}

#[derive(Debug)]
pub struct ZoomCommand {
    start: ZoomStart,
    first: Option<Point2>,
}

impl ZoomCommand {
    pub fn new(start: ZoomStart) -> Self {
        Self { start, first: None }
    }

    /// Drawing extents united with the default drawing area.
    fn zoom_all(ctx: &mut CommandContext<'_>) -> Step {
        let ([min_x, min_y], [max_x, max_y]) = DEFAULT_BOUNDS;
        let mut bounds = Bounds2D::new(Point2::new(min_x, min_y), Point2::new(max_x, max_y));
        if let Some(extents) = ctx.drawing().extents() {
            bounds.include_bounds(&extents);
        }
        let padding = ctx.settings().zoom_padding;
        ctx.presentation().zoom_extents(bounds, padding);
        Step::Done
    }

    fn zoom_extents(ctx: &mut CommandContext<'_>) -> Step {
        let bounds = ctx.drawing().bounds();
        let padding = ctx.settings().zoom_padding;
        ctx.presentation().zoom_extents(bounds, padding);
        Step::Done
    }

    fn first_corner() -> Step {
        Step::Prompt(Request::point("Specify first corner"))
    }

    fn opposite_corner(&mut self, corner: Point2) -> Step {
        self.first = Some(corner);
        Step::Prompt(
            Request::point("Specify opposite corner")
                .base(corner)
                .jig(RectangleDrag { corner }),
        )
    }
}

impl Command for ZoomCommand {
    fn start(&mut self, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        Ok(match self.start {
            ZoomStart::Prompt => Step::Prompt(
                Request::point("Specify corner of window").keywords(&[ALL, EXTENTS, WINDOW]),
            ),
            ZoomStart::Window => Self::first_corner(),
            ZoomStart::Extents => Self::zoom_extents(ctx),
            ZoomStart::All => Self::zoom_all(ctx),
        })
    }

    fn resume(&mut self, reply: Reply, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        ctx.checkpoint()?;
        Ok(match (self.first, reply) {
            (None, Reply::Keyword("All")) => Self::zoom_all(ctx),
            (None, Reply::Keyword("Extents")) => Self::zoom_extents(ctx),
            (None, Reply::Keyword("Window")) => Self::first_corner(),
            (None, Reply::Point(corner)) => self.opposite_corner(corner),
            (Some(first), Reply::Point(second)) => {
                if (first.x() - second.x()).abs() < EPSILON || (first.y() - second.y()).abs() < EPSILON {
                    ctx.warn("Zoom window has no area.");
                } else {
                    ctx.presentation().zoom_window(first, second);
                }
                Step::Done
            }
            _ => Step::Done,
        })
    }
}
