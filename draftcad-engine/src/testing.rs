//! In-memory host and a small driver for scripted command sessions.

use draftcad_core::document::{Drawing, Entity, EntityId, EntityKind};
use draftcad_core::geometry::{Bounds2D, Point2};

use crate::command::EditRecord;
use crate::interaction::{Console, MessageKind, Presentation, PreviewShape};
use crate::session::{EngineSettings, Input, Session};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ViewCall {
    ZoomExtents { bounds: Bounds2D, padding: f64 },
    ZoomWindow { first: Point2, second: Point2 },
}

#[derive(Debug, Default)]
pub(crate) struct RecordingHost {
    pub messages: Vec<(String, MessageKind)>,
    pub prompts: Vec<String>,
    pub preview: Vec<PreviewShape>,
    pub preview_clears: usize,
    pub view_calls: Vec<ViewCall>,
    pub changes: Vec<EditRecord>,
}

impl RecordingHost {
    pub fn printed(&self, text: &str) -> bool {
        self.messages.iter().any(|(message, _)| message == text)
    }

    pub fn last_prompt(&self) -> Option<&str> {
        self.prompts.last().map(String::as_str)
    }
}

impl Presentation for RecordingHost {
    fn show_preview(&mut self, shapes: &[PreviewShape]) {
        self.preview = shapes.to_vec();
    }

    fn clear_preview(&mut self) {
        self.preview.clear();
        self.preview_clears += 1;
    }

    fn zoom_extents(&mut self, bounds: Bounds2D, padding: f64) {
        self.view_calls.push(ViewCall::ZoomExtents { bounds, padding });
    }

    fn zoom_window(&mut self, first: Point2, second: Point2) {
        self.view_calls.push(ViewCall::ZoomWindow { first, second });
    }

    fn entities_changed(&mut self, record: &EditRecord) {
        self.changes.push(record.clone());
    }
}

impl Console for RecordingHost {
    fn print(&mut self, text: &str, kind: MessageKind) {
        self.messages.push((text.to_string(), kind));
    }

    fn set_prompt(&mut self, text: &str) {
        self.prompts.push(text.to_string());
    }
}

pub(crate) struct Harness {
    pub session: Session,
    pub host: RecordingHost,
}

impl Harness {
    pub fn new(drawing: Drawing) -> Self {
        Self {
            session: Session::new(drawing, EngineSettings::default()).expect("default registry"),
            host: RecordingHost::default(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Drawing::new())
    }

    /// Types each line in turn, as if entered at the command prompt.
    pub fn run(&mut self, lines: &[&str]) -> &mut Self {
        for line in lines {
            self.session.submit(Input::Text(line.to_string()), &mut self.host);
        }
        self
    }

    pub fn click(&mut self, x: f64, y: f64) -> &mut Self {
        self.session.submit(Input::Point(Point2::new(x, y)), &mut self.host);
        self
    }

    pub fn hover(&mut self, x: f64, y: f64) -> &mut Self {
        self.session.pointer_moved(Point2::new(x, y), &mut self.host);
        self
    }

    pub fn cancel(&mut self) -> &mut Self {
        self.session.submit(Input::Cancel, &mut self.host);
        self
    }

    pub fn add(&mut self, entity: Entity) -> EntityId {
        let mut drawing = self.session.drawing().clone();
        let id = drawing.add_entity(entity);
        self.session.load_drawing(drawing).expect("idle session");
        id
    }

    pub fn kinds(&self) -> Vec<EntityKind> {
        self.session
            .drawing()
            .entities()
            .map(|(_, entity)| entity.kind.clone())
            .collect()
    }
}

pub(crate) fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-6, "expected {expected}, got {actual}");
}

pub(crate) fn assert_point(actual: Point2, x: f64, y: f64) {
    assert!(
        (actual.x() - x).abs() < 1e-6 && (actual.y() - y).abs() < 1e-6,
        "expected ({x}, {y}), got {actual:?}"
    );
}
