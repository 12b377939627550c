//! The request/reply protocol between running commands and the host, plus the
//! host-side surfaces commands draw into.

use std::fmt;

use draftcad_core::document::EntityId;
use draftcad_core::geometry::{Bounds2D, Point2, Vector2};

use crate::command::EditRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Point,
    Distance,
    Selection,
}

/// Option word offered by a request, matched case-insensitively by full name or alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keyword {
    pub name: &'static str,
    pub alias: &'static str,
}

impl Keyword {
    pub const fn new(name: &'static str, alias: &'static str) -> Self {
        Self { name, alias }
    }

    pub fn matches(&self, token: &str) -> bool {
        token.eq_ignore_ascii_case(self.name) || token.eq_ignore_ascii_case(self.alias)
    }
}

/// Live preview driven by cursor motion while a request is pending.
pub trait Jig {
    fn update(&mut self, cursor: Point2, view: &mut dyn Presentation);

    fn clear(&mut self, view: &mut dyn Presentation) {
        view.clear_preview();
    }
}

/// One outstanding question to the user.
pub struct Request {
    pub kind: RequestKind,
    pub message: String,
    pub keywords: Vec<Keyword>,
    /// Anchor for relative input, distances and rubber bands.
    pub base_point: Option<Point2>,
    /// Whether a bare Enter resolves to [`Reply::Empty`].
    pub allow_empty: bool,
    pub jig: Option<Box<dyn Jig>>,
}

impl Request {
    fn new(kind: RequestKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            keywords: Vec::new(),
            base_point: None,
            allow_empty: false,
            jig: None,
        }
    }

    pub fn point(message: impl Into<String>) -> Self {
        Self::new(RequestKind::Point, message)
    }

    pub fn distance(message: impl Into<String>) -> Self {
        Self::new(RequestKind::Distance, message)
    }

    pub fn selection(message: impl Into<String>) -> Self {
        Self::new(RequestKind::Selection, message)
    }

    pub fn keywords(mut self, keywords: &[Keyword]) -> Self {
        self.keywords.extend_from_slice(keywords);
        self
    }

    pub fn base(mut self, point: Point2) -> Self {
        self.base_point = Some(point);
        self
    }

    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    pub fn jig(mut self, jig: impl Jig + 'static) -> Self {
        self.jig = Some(Box::new(jig));
        self
    }

    pub fn keyword(&self, token: &str) -> Option<&'static str> {
        self.keywords
            .iter()
            .find(|keyword| keyword.matches(token))
            .map(|keyword| keyword.name)
    }

    /// Prompt line shown to the user, e.g. `Specify next point [Close/Undo]:`.
    pub fn prompt(&self) -> String {
        if self.keywords.is_empty() {
            return format!("{}:", self.message);
        }
        let names: Vec<&str> = self.keywords.iter().map(|keyword| keyword.name).collect();
        format!("{} [{}]:", self.message, names.join("/"))
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("keywords", &self.keywords)
            .field("base_point", &self.base_point)
            .field("allow_empty", &self.allow_empty)
            .field("jig", &self.jig.is_some())
            .finish()
    }
}

/// Resolution of a pending request. Exactly one reply is delivered per request.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Point(Point2),
    Distance(f64),
    Selection(Vec<EntityId>),
    Keyword(&'static str),
    Empty,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Warning,
    Error,
}

/// Transient geometry drawn on top of the document.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewShape {
    Line { start: Point2, end: Point2 },
    Circle { center: Point2, radius: f64 },
    Rectangle { first: Point2, second: Point2 },
    /// Arc through three points.
    Arc { start: Point2, mid: Point2, end: Point2 },
    Polyline { points: Vec<Point2>, closed: bool },
    Dimension {
        segments: Vec<(Point2, Point2)>,
        text_position: Point2,
        text: String,
    },
}

impl PreviewShape {
    pub fn translated(&self, offset: Vector2) -> PreviewShape {
        let shift = |point: &Point2| point.translate(offset);
        match self {
            PreviewShape::Line { start, end } => PreviewShape::Line {
                start: shift(start),
                end: shift(end),
            },
            PreviewShape::Circle { center, radius } => PreviewShape::Circle {
                center: shift(center),
                radius: *radius,
            },
            PreviewShape::Rectangle { first, second } => PreviewShape::Rectangle {
                first: shift(first),
                second: shift(second),
            },
            PreviewShape::Arc { start, mid, end } => PreviewShape::Arc {
                start: shift(start),
                mid: shift(mid),
                end: shift(end),
            },
            PreviewShape::Polyline { points, closed } => PreviewShape::Polyline {
                points: points.iter().map(shift).collect(),
                closed: *closed,
            },
            PreviewShape::Dimension {
                segments,
                text_position,
                text,
            } => PreviewShape::Dimension {
                segments: segments.iter().map(|(a, b)| (shift(a), shift(b))).collect(),
                text_position: shift(text_position),
                text: text.clone(),
            },
        }
    }
}

/// View-side operations: previews, view fitting and change notifications.
pub trait Presentation {
    fn show_preview(&mut self, shapes: &[PreviewShape]);
    fn clear_preview(&mut self);
    fn zoom_extents(&mut self, bounds: Bounds2D, padding: f64);
    fn zoom_window(&mut self, first: Point2, second: Point2);
    fn entities_changed(&mut self, record: &EditRecord);
}

/// Command-line side: messages and the current prompt.
pub trait Console {
    fn print(&mut self, text: &str, kind: MessageKind);
    fn set_prompt(&mut self, text: &str);
}

/// Everything a session talks to.
pub trait Host: Presentation + Console {
    fn presentation(&mut self) -> &mut dyn Presentation;
}

impl<T: Presentation + Console> Host for T {
    fn presentation(&mut self) -> &mut dyn Presentation {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLOSE: Keyword = Keyword::new("Close", "C");
    const UNDO: Keyword = Keyword::new("Undo", "U");

    #[test]
    fn prompt_lists_keywords() {
        let request = Request::point("Specify next point").keywords(&[CLOSE, UNDO]);
        assert_eq!(request.prompt(), "Specify next point [Close/Undo]:");
        assert_eq!(Request::distance("Specify radius").prompt(), "Specify radius:");
    }

    #[test]
    fn keywords_match_name_or_alias_ignoring_case() {
        let request = Request::point("Next").keywords(&[CLOSE, UNDO]);
        assert_eq!(request.keyword("c"), Some("Close"));
        assert_eq!(request.keyword("UNDO"), Some("Undo"));
        assert_eq!(request.keyword("Cl"), None);
    }

    #[test]
    fn translated_preview_moves_every_point() {
        let shape = PreviewShape::Polyline {
            points: vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)],
            closed: false,
        };
        let moved = shape.translated(Vector2::new(2.0, 3.0));
        assert_eq!(
            moved,
            PreviewShape::Polyline {
                points: vec![Point2::new(2.0, 3.0), Point2::new(3.0, 3.0)],
                closed: false
            }
        );
    }
}
