use std::io::Write;

use draftcad_core::geometry::{Bounds2D, Point2};
use draftcad_engine::{Console, EditRecord, MessageKind, Presentation, PreviewShape};
use glam::DVec2;
use tracing::{debug, warn};

/// Visible region: world point at the screen centre and pixels per drawing unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Point2,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: Point2::origin(),
            zoom: 1.0,
        }
    }
}

/// Console host without a canvas. Messages and prompts go to `out`; previews and the
/// viewport are tracked so they can be inspected.
pub struct HeadlessView<W: Write> {
    out: W,
    echo_prompts: bool,
    size: DVec2,
    viewport: Viewport,
    preview: Vec<PreviewShape>,
    edits: usize,
}

impl<W: Write> HeadlessView<W> {
    pub fn new(out: W, width: u32, height: u32, echo_prompts: bool) -> Self {
        Self {
            out,
            echo_prompts,
            size: DVec2::new(f64::from(width.max(1)), f64::from(height.max(1))),
            viewport: Viewport::default(),
            preview: Vec::new(),
            edits: 0,
        }
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[inline]
    pub fn preview(&self) -> &[PreviewShape] {
        &self.preview
    }

    /// Committed edits reported since the view was created.
    #[inline]
    pub fn edit_count(&self) -> usize {
        self.edits
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Writes a line that does not come from the engine (listings, host verbs).
    pub fn line(&mut self, text: &str) {
        if let Err(err) = writeln!(self.out, "{text}") {
            warn!(error = %err, "console write failed");
        }
    }

    fn fit(&mut self, bounds: Bounds2D, padding: f64) {
        let extent = (bounds.max().as_vec2() - bounds.min().as_vec2()) * (1.0 + 2.0 * padding.max(0.0));
        self.viewport.center = bounds.center();
        if extent.x > f64::EPSILON || extent.y > f64::EPSILON {
            let scale = self.size / extent.max(DVec2::splat(f64::EPSILON));
            self.viewport.zoom = if extent.x <= f64::EPSILON {
                scale.y
            } else if extent.y <= f64::EPSILON {
                scale.x
            } else {
                scale.min_element()
            };
        }
        debug!(
            center_x = self.viewport.center.x(),
            center_y = self.viewport.center.y(),
            zoom = self.viewport.zoom,
            "viewport fitted"
        );
    }
}

impl<W: Write> Presentation for HeadlessView<W> {
    fn show_preview(&mut self, shapes: &[PreviewShape]) {
        self.preview = shapes.to_vec();
    }

    fn clear_preview(&mut self) {
        self.preview.clear();
    }

    fn zoom_extents(&mut self, bounds: Bounds2D, padding: f64) {
        self.fit(bounds, padding);
    }

    fn zoom_window(&mut self, first: Point2, second: Point2) {
        self.fit(Bounds2D::from_corners(first, second), 0.0);
    }

    fn entities_changed(&mut self, record: &EditRecord) {
        self.edits += 1;
        debug!(added = record.added.len(), removed = record.removed.len(), "view refreshed");
    }
}

impl<W: Write> Console for HeadlessView<W> {
    fn print(&mut self, text: &str, kind: MessageKind) {
        match kind {
            MessageKind::Info => self.line(text),
            MessageKind::Warning => self.line(&format!("Warning: {text}")),
            MessageKind::Error => self.line(&format!("Error: {text}")),
        }
    }

    fn set_prompt(&mut self, text: &str) {
        if self.echo_prompts {
            self.line(text);
        }
    }
}
