//! Command lifecycle: triggering, request resolution, cancellation and edit bookkeeping.

use std::mem;

use draftcad_core::dimension::DimStyle;
use draftcad_core::document::{DEFAULT_LAYER, Drawing, EntityId};
use draftcad_core::geometry::Point2;
use tracing::{debug, info};

use crate::command::{ActiveCommand, CommandContext, EditRecord, Step};
use crate::errors::{CommandError, EngineError, RegistryError};
use crate::input::{parse_distance, parse_point};
use crate::interaction::{Host, MessageKind, Reply, Request, RequestKind};
use crate::registry::{CommandRegistry, CommandSpec};
use crate::scene::Scene;

pub const IDLE_PROMPT: &str = "Command:";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// World-space radius around a click within which entities are picked.
    pub pick_tolerance: f64,
    /// Fraction of the fitted extents added on every side when zooming to fit.
    pub zoom_padding: f64,
    pub default_layer: String,
    pub dim_style: DimStyle,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            pick_tolerance: 0.5,
            zoom_padding: 0.2,
            default_layer: DEFAULT_LAYER.to_string(),
            dim_style: DimStyle::default(),
        }
    }
}

/// User input delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// A typed line: command name, coordinate, number, keyword, `ALL`, or empty for Enter.
    Text(String),
    /// A click in world coordinates.
    Point(Point2),
    /// Entities chosen by the view, e.g. a window selection.
    Selection(Vec<EntityId>),
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started { name: String },
    Finished { name: String, outcome: Outcome },
}

struct Running {
    name: String,
    command: ActiveCommand,
    pending: Option<Request>,
    /// Entities gathered so far by a pending selection request.
    picked: Vec<EntityId>,
}

/// Drives one command at a time against a drawing.
pub struct Session {
    scene: Scene,
    registry: CommandRegistry,
    settings: EngineSettings,
    running: Option<Running>,
    cursor: Option<Point2>,
    records: Vec<EditRecord>,
    events: Vec<SessionEvent>,
}

impl Session {
    pub fn new(drawing: Drawing, settings: EngineSettings) -> Result<Self, RegistryError> {
        Ok(Self::with_registry(drawing, settings, CommandRegistry::with_defaults()?))
    }

    pub fn with_registry(drawing: Drawing, settings: EngineSettings, registry: CommandRegistry) -> Self {
        Self {
            scene: Scene::with_drawing(drawing),
            registry,
            settings,
            running: None,
            cursor: None,
            records: Vec::new(),
            events: Vec::new(),
        }
    }

    #[inline]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    #[inline]
    pub fn drawing(&self) -> &Drawing {
        self.scene.drawing()
    }

    #[inline]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[inline]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.running.is_none()
    }

    pub fn current_command(&self) -> Option<&str> {
        self.running.as_ref().map(|running| running.name.as_str())
    }

    pub fn pending_request(&self) -> Option<&Request> {
        self.running.as_ref().and_then(|running| running.pending.as_ref())
    }

    /// Commands matching a typed prefix, for completion.
    pub fn complete(&self, prefix: &str) -> Vec<(&str, &CommandSpec)> {
        self.registry.search(prefix)
    }

    /// Swaps in another drawing. Refused while a command runs.
    pub fn load_drawing(&mut self, drawing: Drawing) -> Result<(), EngineError> {
        if let Some(running) = &self.running {
            debug!(command = %running.name, "drawing replacement refused");
            return Err(EngineError::Busy);
        }
        self.scene.load_drawing(drawing);
        self.records.clear();
        Ok(())
    }

    /// Pre-selects an entity for the next command that takes a selection.
    pub fn select(&mut self, id: EntityId) -> Result<(), EngineError> {
        self.scene.select(id)
    }

    pub fn clear_selection(&mut self) {
        self.scene.clear_selection();
    }

    pub fn take_edit_records(&mut self) -> Vec<EditRecord> {
        mem::take(&mut self.records)
    }

    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        mem::take(&mut self.events)
    }

    /// Starts a command by global name or alias.
    pub fn trigger(&mut self, name: &str, host: &mut dyn Host) -> Result<(), EngineError> {
        if let Some(running) = &self.running {
            host.print(
                &format!("{} cannot start while {} is active.", name.trim().to_uppercase(), running.name),
                MessageKind::Warning,
            );
            return Err(EngineError::Busy);
        }
        let Some(spec) = self.registry.lookup(name) else {
            let name = name.trim().to_uppercase();
            host.print(&format!("Unknown command \"{name}\"."), MessageKind::Warning);
            return Err(EngineError::UnknownCommand(name));
        };

        let name = spec.global.clone();
        let command = ActiveCommand::new(spec.command);
        info!(command = %name, "command started");
        self.events.push(SessionEvent::Started { name: name.clone() });
        self.running = Some(Running {
            name,
            command,
            pending: None,
            picked: Vec::new(),
        });
        self.advance(host, false, |command, ctx| command.start(ctx));
        Ok(())
    }

    /// Feeds one input to the pending request, or treats text as a command name when idle.
    pub fn submit(&mut self, input: Input, host: &mut dyn Host) {
        let Some(running) = self.running.as_mut() else {
            self.submit_idle(input, host);
            return;
        };
        let Some(request) = running.pending.as_ref() else {
            return;
        };

        let reply = resolve(
            request,
            &mut running.picked,
            input,
            &self.scene,
            &self.settings,
            self.cursor,
            host,
        );
        let Some(reply) = reply else {
            return;
        };

        if let Some(mut request) = running.pending.take() {
            if let Some(jig) = request.jig.as_mut() {
                jig.clear(host.presentation());
            }
        }
        running.picked.clear();
        if let Reply::Point(point) = reply {
            self.scene.set_last_point(point);
        }
        let cancelled = reply == Reply::Cancelled;
        self.advance(host, cancelled, move |command, ctx| command.resume(reply, ctx));
    }

    /// Cursor motion; refreshes the pending request's preview.
    pub fn pointer_moved(&mut self, point: Point2, host: &mut dyn Host) {
        self.cursor = Some(point);
        let jig = self
            .running
            .as_mut()
            .and_then(|running| running.pending.as_mut())
            .and_then(|request| request.jig.as_mut());
        if let Some(jig) = jig {
            jig.update(point, host.presentation());
        }
    }

    fn submit_idle(&mut self, input: Input, host: &mut dyn Host) {
        match input {
            Input::Text(text) => {
                let name = text.trim();
                if !name.is_empty() {
                    let _ = self.trigger(name, host);
                }
            }
            Input::Point(point) => {
                if let Some(id) = self.scene.pick(point, self.settings.pick_tolerance) {
                    let _ = self.scene.toggle_selection(id);
                    debug!(id = id.get(), selected = self.scene.is_selected(id), "selection toggled");
                }
            }
            Input::Selection(ids) => {
                for id in ids {
                    let _ = self.scene.select(id);
                }
            }
            Input::Cancel => self.scene.clear_selection(),
        }
    }

    fn advance<F>(&mut self, host: &mut dyn Host, cancelled: bool, drive: F)
    where
        F: FnOnce(&mut ActiveCommand, &mut CommandContext<'_>) -> Result<Step, CommandError>,
    {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        let result = {
            let mut ctx = CommandContext::new(&mut self.scene, &mut *host, &self.settings, &mut self.records, cancelled);
            drive(&mut running.command, &mut ctx)
        };

        match result {
            Ok(Step::Prompt(request)) if !cancelled => {
                host.set_prompt(&request.prompt());
                let request = running.pending.insert(request);
                if let (Some(cursor), Some(jig)) = (self.cursor, request.jig.as_mut()) {
                    jig.update(cursor, host.presentation());
                }
            }
            Ok(Step::Prompt(_)) | Err(CommandError::Cancelled) => self.finish(host, Outcome::Cancelled),
            Ok(Step::Done) => self.finish(host, Outcome::Completed),
            Err(err) => {
                host.print(&err.to_string(), MessageKind::Error);
                self.finish(host, Outcome::Failed);
            }
        }
    }

    fn finish(&mut self, host: &mut dyn Host, outcome: Outcome) {
        if let Some(mut running) = self.running.take() {
            if let Some(jig) = running.pending.as_mut().and_then(|request| request.jig.as_mut()) {
                jig.clear(host.presentation());
            }
            if outcome == Outcome::Cancelled {
                host.print("*Cancel*", MessageKind::Info);
            }
            info!(command = %running.name, ?outcome, "command finished");
            self.events.push(SessionEvent::Finished {
                name: running.name,
                outcome,
            });
        }
        host.set_prompt(IDLE_PROMPT);
    }
}

/// Interprets `input` against the pending request. `None` keeps the request open.
fn resolve(
    request: &Request,
    picked: &mut Vec<EntityId>,
    input: Input,
    scene: &Scene,
    settings: &EngineSettings,
    cursor: Option<Point2>,
    host: &mut dyn Host,
) -> Option<Reply> {
    if input == Input::Cancel {
        return Some(Reply::Cancelled);
    }
    if request.kind == RequestKind::Selection {
        return resolve_selection(request, picked, input, scene, settings, host);
    }

    let token = match input {
        Input::Text(text) => text,
        Input::Point(point) => {
            return match request.kind {
                RequestKind::Distance => match request.base_point {
                    Some(base) => Some(Reply::Distance(base.distance_to(point))),
                    None => {
                        host.print("Type a distance; there is no base point to measure from.", MessageKind::Warning);
                        None
                    }
                },
                _ => Some(Reply::Point(point)),
            };
        }
        Input::Selection(_) | Input::Cancel => {
            host.print("A point or a value is required.", MessageKind::Warning);
            return None;
        }
    };

    let token = token.trim();
    if token.is_empty() {
        if request.allow_empty {
            return Some(Reply::Empty);
        }
        host.print("A point or a value is required.", MessageKind::Warning);
        return None;
    }
    if let Some(keyword) = request.keyword(token) {
        return Some(Reply::Keyword(keyword));
    }

    let parsed = match request.kind {
        RequestKind::Distance => parse_distance(token, request.base_point).map(Reply::Distance),
        _ => parse_point(token, request.base_point.or(scene.last_point()), cursor).map(Reply::Point),
    };
    match parsed {
        Ok(reply) => Some(reply),
        Err(err) => {
            host.print(&format!("{err}. Try again."), MessageKind::Warning);
            None
        }
    }
}

fn resolve_selection(
    request: &Request,
    picked: &mut Vec<EntityId>,
    input: Input,
    scene: &Scene,
    settings: &EngineSettings,
    host: &mut dyn Host,
) -> Option<Reply> {
    match input {
        Input::Point(point) => {
            match scene.pick(point, settings.pick_tolerance) {
                Some(id) => {
                    add(picked, id);
                    host.print("1 found", MessageKind::Info);
                }
                None => host.print("0 found", MessageKind::Info),
            }
            None
        }
        Input::Selection(ids) => {
            for id in ids.into_iter().filter(|id| scene.entity(*id).is_some()) {
                add(picked, id);
            }
            complete_selection(request, picked, host)
        }
        Input::Text(text) => {
            let token = text.trim();
            if token.is_empty() {
                return complete_selection(request, picked, host);
            }
            if token.eq_ignore_ascii_case("ALL") {
                let mut found = 0;
                for id in scene.visible_entities() {
                    add(picked, id);
                    found += 1;
                }
                host.print(&format!("{found} found"), MessageKind::Info);
                return None;
            }
            if let Some(keyword) = request.keyword(token) {
                return Some(Reply::Keyword(keyword));
            }
            host.print("Expects a point or ALL.", MessageKind::Warning);
            None
        }
        Input::Cancel => Some(Reply::Cancelled),
    }
}

fn add(picked: &mut Vec<EntityId>, id: EntityId) {
    if !picked.contains(&id) {
        picked.push(id);
    }
}

fn complete_selection(request: &Request, picked: &mut Vec<EntityId>, host: &mut dyn Host) -> Option<Reply> {
    if !picked.is_empty() {
        return Some(Reply::Selection(mem::take(picked)));
    }
    if request.allow_empty {
        return Some(Reply::Empty);
    }
    host.print("Nothing selected.", MessageKind::Warning);
    None
}

#[cfg(test)]
mod tests {
    use draftcad_core::document::{Entity, EntityKind, Line};
    use draftcad_core::geometry::Point2;

    use super::*;
    use crate::testing::{Harness, ViewCall, assert_close, assert_point};

    fn lines(harness: &Harness) -> Vec<Line> {
        harness
            .kinds()
            .into_iter()
            .filter_map(|kind| match kind {
                EntityKind::Line(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn arc_through_three_typed_points() {
        let mut harness = Harness::empty();
        harness.run(&["ARC", "0,0", "10,0", "10,10"]);

        assert!(harness.host.printed("Arc created: center (5.0000, 5.0000), radius 7.0711"));
        assert!(harness.session.is_idle());
        assert!(matches!(harness.kinds().as_slice(), [EntityKind::Arc(_)]));
    }

    #[test]
    fn center_start_end_arc_sweeps_counter_clockwise() {
        let mut harness = Harness::empty();
        harness.run(&["ARC", "CE"]);
        assert_eq!(harness.host.last_prompt(), Some("Specify center point of arc:"));
        harness.run(&["2,1", "7,1", "2,6"]);

        assert!(harness.host.printed("Arc created: center (2.0000, 1.0000), radius 5.0000"));
        let arc = match harness.kinds().as_slice() {
            [EntityKind::Arc(arc)] => *arc,
            other => panic!("expected one arc, got {other:?}"),
        };
        assert_point(arc.center, 2.0, 1.0);
        assert_close(arc.radius, 5.0);
        assert_close(arc.start_angle, 0.0);
        assert_close(arc.end_angle, 90.0);
        assert_close(arc.sweep(), 90.0);
        assert_point(arc.mid_point(), 2.0 + 5.0 * 0.5_f64.sqrt(), 1.0 + 5.0 * 0.5_f64.sqrt());

        // End before start in angle: the arc still runs counter-clockwise from the start.
        harness.run(&["ARC", "CE", "0,0", "0,4", "4,0"]);
        let arc = match harness.kinds().last() {
            Some(EntityKind::Arc(arc)) => *arc,
            other => panic!("expected arc, got {other:?}"),
        };
        assert_close(arc.start_angle, 90.0);
        assert_close(arc.end_angle, 0.0);
        assert_close(arc.sweep(), 270.0);
        assert_point(arc.mid_point(), -4.0 * 0.5_f64.sqrt(), -4.0 * 0.5_f64.sqrt());
        assert!(harness.session.is_idle());
    }

    #[test]
    fn collinear_arc_points_fail_the_command() {
        let mut harness = Harness::empty();
        harness.run(&["ARC", "0,0", "5,0", "10,0"]);

        let (message, kind) = harness.host.messages.last().expect("error message");
        assert_eq!(*kind, MessageKind::Error);
        assert!(message.starts_with("Cannot create arc"));
        assert!(harness.session.drawing().is_empty());
        let events = harness.session.take_events();
        assert_eq!(
            events.last(),
            Some(&SessionEvent::Finished {
                name: "ARC".into(),
                outcome: Outcome::Failed
            })
        );
    }

    #[test]
    fn zoom_all_fits_default_area_and_extents() {
        let mut harness = Harness::empty();
        harness.add(Entity::line(Point2::new(0.0, 0.0), Point2::new(200.0, 50.0)));
        harness.run(&["ZOOM"]);
        assert_eq!(harness.host.last_prompt(), Some("Specify corner of window [All/Extents/Window]:"));

        harness.run(&["A"]);
        assert!(harness.session.is_idle());
        assert_eq!(harness.host.last_prompt(), Some(IDLE_PROMPT));
        let [ViewCall::ZoomExtents { bounds, padding }] = harness.host.view_calls.as_slice() else {
            panic!("expected a single zoom, got {:?}", harness.host.view_calls);
        };
        assert_close(*padding, 0.2);
        assert_point(bounds.min(), 0.0, 0.0);
        assert_point(bounds.max(), 200.0, 100.0);
    }

    #[test]
    fn zoom_shortcuts_run_without_prompting() {
        let mut harness = Harness::empty();
        harness.run(&["ZA"]);
        assert_eq!(harness.host.prompts, vec![IDLE_PROMPT.to_string()]);
        assert_eq!(harness.host.view_calls.len(), 1);

        harness.add(Entity::circle(Point2::new(10.0, 10.0), 5.0));
        harness.run(&["ZE"]);
        let Some(ViewCall::ZoomExtents { bounds, .. }) = harness.host.view_calls.last() else {
            panic!("expected zoom extents");
        };
        assert_point(bounds.min(), 5.0, 5.0);
        assert_point(bounds.max(), 15.0, 15.0);
    }

    #[test]
    fn zoom_window_uses_both_corners() {
        let mut harness = Harness::empty();
        harness.run(&["ZW", "0,0", "10,5"]);
        assert_eq!(
            harness.host.view_calls,
            vec![ViewCall::ZoomWindow {
                first: Point2::new(0.0, 0.0),
                second: Point2::new(10.0, 5.0)
            }]
        );
    }

    #[test]
    fn extend_reaches_the_boundary() {
        let mut harness = Harness::empty();
        harness.add(Entity::line(Point2::new(0.0, 0.0), Point2::new(5.0, 0.0)));
        harness.add(Entity::line(Point2::new(10.0, -5.0), Point2::new(10.0, 5.0)));

        harness.run(&["EXTEND", ""]);
        assert_eq!(harness.host.last_prompt(), Some("Select object to extend:"));
        harness.click(4.0, 0.0).run(&[""]);

        let extended = lines(&harness)
            .into_iter()
            .find(|line| line.start.y().abs() < 1e-9 && line.end.y().abs() < 1e-9)
            .expect("horizontal line");
        assert_point(extended.start, 0.0, 0.0);
        assert_point(extended.end, 10.0, 0.0);
        assert!(harness.session.is_idle());
    }

    #[test]
    fn extend_without_boundary_in_reach_warns() {
        let mut harness = Harness::empty();
        harness.add(Entity::line(Point2::new(0.0, 0.0), Point2::new(5.0, 0.0)));
        harness.add(Entity::line(Point2::new(10.0, 1.0), Point2::new(10.0, 5.0)));

        harness.run(&["EX", ""]).click(4.0, 0.0);
        assert!(harness.host.printed("No boundary edge lies in that direction."));
        assert_eq!(harness.session.drawing().len(), 2);
    }

    #[test]
    fn trim_line_between_two_cutting_edges() {
        let mut harness = Harness::empty();
        harness.add(Entity::line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)));
        harness.add(Entity::line(Point2::new(3.0, -5.0), Point2::new(3.0, 5.0)));
        harness.add(Entity::line(Point2::new(7.0, -5.0), Point2::new(7.0, 5.0)));

        harness.run(&["TRIM", ""]).click(5.0, 0.0).run(&[""]);

        let mut pieces: Vec<Line> = lines(&harness)
            .into_iter()
            .filter(|line| line.start.y().abs() < 1e-9 && line.end.y().abs() < 1e-9)
            .collect();
        pieces.sort_by(|a, b| a.start.x().total_cmp(&b.start.x()));
        assert_eq!(pieces.len(), 2);
        assert_point(pieces[0].start, 0.0, 0.0);
        assert_point(pieces[0].end, 3.0, 0.0);
        assert_point(pieces[1].start, 7.0, 0.0);
        assert_point(pieces[1].end, 10.0, 0.0);
    }

    #[test]
    fn trim_circle_keeps_the_unpicked_side() {
        let mut harness = Harness::empty();
        harness.add(Entity::circle(Point2::new(0.0, 0.0), 5.0));
        harness.add(Entity::line(Point2::new(-10.0, 0.0), Point2::new(10.0, 0.0)));

        harness.run(&["TR", ""]).click(0.0, 5.0).cancel();

        let arc = harness
            .kinds()
            .into_iter()
            .find_map(|kind| match kind {
                EntityKind::Arc(arc) => Some(arc),
                _ => None,
            })
            .expect("trimmed arc");
        assert_close(arc.radius, 5.0);
        assert_close(arc.start_angle, 180.0);
        assert_close(arc.end_angle, 0.0);
        // edits made before the cancel stay in place
        assert!(harness.host.printed("*Cancel*"));
        assert_eq!(harness.session.drawing().len(), 2);
    }

    #[test]
    fn offset_remembers_the_distance() {
        let mut harness = Harness::empty();
        harness.add(Entity::line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)));

        harness.run(&["OFFSET", "2"]).click(5.0, 0.0).click(5.0, 3.0).run(&[""]);
        let shifted = lines(&harness)
            .into_iter()
            .find(|line| line.start.y() > 1.0)
            .expect("offset line");
        assert_point(shifted.start, 0.0, 2.0);
        assert_point(shifted.end, 10.0, 2.0);

        harness.run(&["O"]);
        assert_eq!(harness.host.last_prompt(), Some("Specify offset distance <2.0000>:"));
        harness.run(&[""]);
        assert_eq!(harness.host.last_prompt(), Some("Select object to offset:"));
        harness.cancel();
        assert!(harness.session.is_idle());
    }

    #[test]
    fn offset_rejects_non_positive_distance() {
        let mut harness = Harness::empty();
        harness.run(&["OFFSET", "0"]);
        assert!(harness.host.printed("Value must be positive and nonzero."));
        assert_eq!(harness.host.last_prompt(), Some("Specify offset distance:"));
    }

    #[test]
    fn pedit_converts_joins_and_closes() {
        let mut harness = Harness::empty();
        harness.add(Entity::line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)));
        harness.add(Entity::line(Point2::new(10.0, 10.0), Point2::new(10.0, 0.0)));

        harness.run(&["PEDIT"]).click(5.0, 0.0).run(&["", "J"]);
        assert!(harness.host.printed("1 segments added to polyline"));
        harness.run(&["C", "X"]);

        let kinds = harness.kinds();
        let [EntityKind::Polyline(polyline)] = kinds.as_slice() else {
            panic!("expected a single polyline, got {kinds:?}");
        };
        assert!(polyline.closed);
        assert_eq!(
            polyline.points(),
            vec![Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), Point2::new(10.0, 10.0)]
        );
    }

    #[test]
    fn pedit_reverse_flips_vertex_order() {
        let mut harness = Harness::empty();
        harness.run(&["PL", "0,0", "10,0", "10,10", ""]);
        assert!(harness.host.printed("Polyline created with 3 vertices"));

        harness.run(&["PE"]).click(10.0, 5.0).run(&["R", ""]);
        let kinds = harness.kinds();
        let [EntityKind::Polyline(polyline)] = kinds.as_slice() else {
            panic!("expected a single polyline");
        };
        assert!(!polyline.closed);
        assert_eq!(polyline.points()[0], Point2::new(10.0, 10.0));
    }

    #[test]
    fn line_draws_continuously_with_undo_and_close() {
        let mut harness = Harness::empty();
        harness.run(&["LINE", "0,0", "10,0", "10,10"]);
        assert_eq!(harness.host.last_prompt(), Some("Specify next point [Close/Undo]:"));
        harness.run(&["U", "0,10", "C"]);

        let drawn = lines(&harness);
        assert_eq!(drawn.len(), 3);
        assert_point(drawn[1].start, 10.0, 0.0);
        assert_point(drawn[1].end, 0.0, 10.0);
        assert_point(drawn[2].end, 0.0, 0.0);
        assert!(harness.session.is_idle());
    }

    #[test]
    fn relative_and_polar_input_follow_the_last_point() {
        let mut harness = Harness::empty();
        harness.run(&["L", "1,1", "@4,0", "@2<90", ""]);
        let drawn = lines(&harness);
        assert_eq!(drawn.len(), 2);
        assert_point(drawn[0].end, 5.0, 1.0);
        assert_point(drawn[1].end, 5.0, 3.0);
    }

    #[test]
    fn invalid_input_keeps_the_request_pending() {
        let mut harness = Harness::empty();
        harness.run(&["LINE", "abc"]);

        let (message, kind) = harness.host.messages.last().expect("warning");
        assert_eq!(*kind, MessageKind::Warning);
        assert!(message.ends_with("Try again."));
        assert_eq!(harness.session.current_command(), Some("LINE"));
        assert_eq!(
            harness.session.pending_request().map(Request::prompt).as_deref(),
            Some("Specify first point:")
        );
    }

    #[test]
    fn cancel_prints_marker_and_clears_preview_once() {
        let mut harness = Harness::empty();
        harness.run(&["LINE", "0,0"]).hover(5.0, 0.0);
        assert_eq!(harness.host.preview.len(), 1);

        harness.cancel();
        assert!(harness.host.printed("*Cancel*"));
        assert!(harness.host.preview.is_empty());
        assert_eq!(harness.host.preview_clears, 1);
        assert_eq!(
            harness.session.take_events(),
            vec![
                SessionEvent::Started { name: "LINE".into() },
                SessionEvent::Finished {
                    name: "LINE".into(),
                    outcome: Outcome::Cancelled
                },
            ]
        );
    }

    #[test]
    fn circle_by_diameter_and_by_click() {
        let mut harness = Harness::empty();
        harness.run(&["C", "0,0", "D", "10"]);
        assert!(harness.host.printed("Circle created: center (0.0000, 0.0000), radius 5.0000"));
        assert_eq!(harness.host.last_prompt(), Some("Specify center point for circle:"));

        harness.run(&["20,0"]).click(23.0, 4.0).run(&[""]);
        assert!(harness.host.printed("Circle created: center (20.0000, 0.0000), radius 5.0000"));
        assert_eq!(harness.session.drawing().len(), 2);
        assert!(harness.session.is_idle());
    }

    #[test]
    fn rectangle_is_a_closed_polyline() {
        let mut harness = Harness::empty();
        harness.run(&["REC", "0,0", "4,3"]);
        assert!(harness.host.printed("Rectangle created: 4.0000 x 3.0000"));
        let kinds = harness.kinds();
        let [EntityKind::Polyline(polyline)] = kinds.as_slice() else {
            panic!("expected a polyline");
        };
        assert!(polyline.closed);
        assert_eq!(polyline.vertices.len(), 4);
    }

    #[test]
    fn move_uses_the_preselection() {
        let mut harness = Harness::empty();
        let id = harness.add(Entity::circle(Point2::new(0.0, 0.0), 1.0));
        harness.session.select(id).expect("select");

        harness.run(&["MOVE", "0,0", "5,5"]);
        assert!(harness.host.printed("1 found"));
        assert!(harness.host.printed("1 objects moved"));
        let kinds = harness.kinds();
        let [EntityKind::Circle(circle)] = kinds.as_slice() else {
            panic!("expected one circle");
        };
        assert_point(circle.center, 5.0, 5.0);
        assert!(harness.session.drawing().entity(id).is_none());
    }

    #[test]
    fn copy_repeats_until_enter() {
        let mut harness = Harness::empty();
        harness.add(Entity::circle(Point2::new(0.0, 0.0), 1.0));

        harness.run(&["CO"]).click(1.0, 0.0);
        assert!(harness.host.printed("1 found"));
        harness.click(50.0, 50.0);
        assert!(harness.host.printed("0 found"));
        harness.run(&["", "0,0", "10,0", "20,0", ""]);

        assert_eq!(harness.session.drawing().len(), 3);
        let copied = harness
            .host
            .messages
            .iter()
            .filter(|(message, _)| message == "1 objects copied")
            .count();
        assert_eq!(copied, 2);
    }

    #[test]
    fn erase_all_and_empty_selection() {
        let mut harness = Harness::empty();
        harness.add(Entity::line(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)));
        harness.add(Entity::line(Point2::new(0.0, 1.0), Point2::new(1.0, 1.0)));

        harness.run(&["ERASE", ""]);
        assert!(harness.host.printed("Nothing selected."));
        assert_eq!(harness.session.current_command(), Some("ERASE"));

        harness.run(&["ALL"]);
        assert!(harness.host.printed("2 found"));
        harness.run(&[""]);
        assert!(harness.host.printed("2 objects erased"));
        assert!(harness.session.drawing().is_empty());
    }

    #[test]
    fn dist_reports_measurements() {
        let mut harness = Harness::empty();
        harness.run(&["DI", "0,0", "@10,10"]);
        assert!(harness
            .host
            .printed("Distance = 14.1421, Angle in XY Plane = 45, Delta X = 10.0000, Delta Y = 10.0000"));
        assert!(harness.session.drawing().is_empty());
    }

    #[test]
    fn linear_and_angular_dimensions() {
        let mut harness = Harness::empty();
        harness.run(&["DLI", "0,0", "10,0", "5,5"]);
        assert!(harness.host.printed("Dimension text = 10"));

        harness.add(Entity::line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)));
        harness.add(Entity::line(Point2::new(0.0, 0.0), Point2::new(0.0, 10.0)));
        harness.run(&["DAN"]).click(5.0, 0.0).click(0.0, 5.0).click(3.0, 3.0);
        assert!(harness.host.printed("Dimension text = 90°"));
        let dimensions = harness
            .kinds()
            .into_iter()
            .filter(|kind| matches!(kind, EntityKind::Dimension(_)))
            .count();
        assert_eq!(dimensions, 2);
    }

    #[test]
    fn angular_dimension_requires_lines() {
        let mut harness = Harness::empty();
        harness.add(Entity::circle(Point2::new(0.0, 0.0), 2.0));
        harness.run(&["DIMANGULAR"]).click(2.0, 0.0);
        assert!(harness.host.printed("Object must be a line."));
        assert_eq!(harness.host.last_prompt(), Some("Select first line:"));
    }

    #[test]
    fn busy_and_unknown_triggers_are_reported() {
        let mut harness = Harness::empty();
        harness.run(&["FROB"]);
        assert!(harness.host.printed("Unknown command \"FROB\"."));
        assert!(harness.session.is_idle());

        harness.run(&["LINE"]);
        let err = harness.session.trigger("circle", &mut harness.host).unwrap_err();
        assert!(matches!(err, EngineError::Busy));
        assert!(harness.host.printed("CIRCLE cannot start while LINE is active."));
        assert!(matches!(harness.session.load_drawing(Drawing::new()), Err(EngineError::Busy)));
    }

    #[test]
    fn edits_are_recorded_and_reported() {
        let mut harness = Harness::empty();
        harness.run(&["LINE", "0,0", "1,0", "1,1", ""]);

        let records = harness.session.take_edit_records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|record| record.added.len() == 1 && record.removed.is_empty()));
        assert_eq!(harness.host.changes, records);
        assert!(harness.session.take_edit_records().is_empty());
    }

    #[test]
    fn idle_clicks_toggle_the_selection() {
        let mut harness = Harness::empty();
        let id = harness.add(Entity::line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)));

        harness.click(5.0, 0.2);
        assert!(harness.session.scene().is_selected(id));
        harness.click(5.0, 0.2);
        assert!(!harness.session.scene().is_selected(id));

        harness.click(5.0, 0.0).cancel();
        assert_eq!(harness.session.scene().selection_len(), 0);
    }

    #[test]
    fn completion_searches_names_and_aliases() {
        let harness = Harness::empty();
        let names: Vec<&str> = harness
            .session
            .complete("dim")
            .into_iter()
            .map(|(_, spec)| spec.global.as_str())
            .collect();
        assert!(names.contains(&"DIMLINEAR"));
        assert!(names.contains(&"DIMANGULAR"));
    }
}
