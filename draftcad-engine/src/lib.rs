pub mod command;
pub mod input;
pub mod interaction;
pub mod jig;
pub mod registry;
pub mod session;

#[cfg(test)]
mod testing;

pub use command::{CommandContext, CommandId, EditRecord, Step};
pub use interaction::{Console, Host, Keyword, MessageKind, Presentation, PreviewShape, Reply, Request, RequestKind};
pub use registry::{CommandGroup, CommandRegistry, CommandSpec};
pub use session::{EngineSettings, Input, Outcome, Session, SessionEvent};

pub mod errors {
    use draftcad_core::kernel::Degenerate;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("entity with id {0} not found")]
        EntityNotFound(u64),
        #[error("a command is already running")]
        Busy,
        #[error("unknown command {0:?}")]
        UnknownCommand(String),
    }

    /// Registration failures; both names are compared case-insensitively.
    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum RegistryError {
        #[error("command name {name:?} is already registered in group {group:?}")]
        Conflict { name: String, group: String },
        #[error("command name must not be empty")]
        EmptyName,
    }

    /// Why a command body stopped before completing normally.
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum CommandError {
        #[error("*Cancel*")]
        Cancelled,
        #[error("{context}: {source}")]
        Degenerate {
            context: &'static str,
            #[source]
            source: Degenerate,
        },
        #[error("{0}")]
        Failed(String),
    }

    impl CommandError {
        pub fn degenerate(context: &'static str) -> impl FnOnce(Degenerate) -> Self {
            move |source| CommandError::Degenerate { context, source }
        }
    }

    /// Rejected typed input; the pending request stays open.
    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum InputError {
        #[error("invalid {what}: {token:?}")]
        Invalid { what: &'static str, token: String },
        #[error("relative input needs a base point")]
        MissingBase,
        #[error("empty input")]
        Empty,
    }
}

pub mod scene {
    use draftcad_core::document::{Drawing, Entity, EntityId};
    use draftcad_core::geometry::Point2;
    use draftcad_core::kernel::distance_to_entity;
    use indexmap::IndexSet;
    use tracing::debug;

    use crate::errors::EngineError;

    /// Editable state shared by every command: the drawing, the current selection
    /// and the remembered points and distances that commands fall back to.
    #[derive(Debug)]
    pub struct Scene {
        drawing: Drawing,
        selected: IndexSet<EntityId>,
        last_point: Option<Point2>,
        offset_distance: Option<f64>,
    }

    impl Scene {
        pub fn new() -> Self {
            Self::with_drawing(Drawing::new())
        }

        pub fn with_drawing(drawing: Drawing) -> Self {
            Self {
                drawing,
                selected: IndexSet::new(),
                last_point: None,
                offset_distance: None,
            }
        }

        /// Replaces the drawing and resets the runtime state.
        pub fn load_drawing(&mut self, drawing: Drawing) {
            self.drawing = drawing;
            self.selected.clear();
            self.last_point = None;
            self.offset_distance = None;
            debug!(entities = self.drawing.len(), "scene drawing replaced");
        }

        #[inline]
        pub fn drawing(&self) -> &Drawing {
            &self.drawing
        }

        #[inline]
        pub fn drawing_mut(&mut self) -> &mut Drawing {
            &mut self.drawing
        }

        #[inline]
        pub fn entity(&self, id: EntityId) -> Option<&Entity> {
            self.drawing.entity(id)
        }

        #[inline]
        pub fn selection_len(&self) -> usize {
            self.selected.len()
        }

        #[inline]
        pub fn is_selected(&self, id: EntityId) -> bool {
            self.selected.contains(&id)
        }

        pub fn select(&mut self, id: EntityId) -> Result<(), EngineError> {
            if self.drawing.entity(id).is_none() {
                return Err(EngineError::EntityNotFound(id.get()));
            }
            self.selected.insert(id);
            Ok(())
        }

        pub fn deselect(&mut self, id: EntityId) -> bool {
            self.selected.shift_remove(&id)
        }

        /// Returns the state after toggling.
        pub fn toggle_selection(&mut self, id: EntityId) -> Result<bool, EngineError> {
            if self.drawing.entity(id).is_none() {
                return Err(EngineError::EntityNotFound(id.get()));
            }
            if self.selected.shift_remove(&id) {
                Ok(false)
            } else {
                self.selected.insert(id);
                Ok(true)
            }
        }

        #[inline]
        pub fn clear_selection(&mut self) {
            self.selected.clear();
        }

        /// Selected ids in selection order.
        #[inline]
        pub fn selection(&self) -> impl Iterator<Item = EntityId> + '_ {
            self.selected.iter().copied()
        }

        /// Entities on visible layers, in draw order.
        pub fn visible_entities(&self) -> impl Iterator<Item = EntityId> + '_ {
            self.drawing
                .entities()
                .filter(|(_, entity)| self.drawing.is_layer_visible(entity.layer()))
                .map(|(id, _)| *id)
        }

        /// Nearest visible entity whose outline lies within `tolerance` of `point`.
        pub fn pick(&self, point: Point2, tolerance: f64) -> Option<EntityId> {
            self.drawing
                .entities()
                .filter(|(_, entity)| self.drawing.is_layer_visible(entity.layer()))
                .map(|(id, entity)| (*id, distance_to_entity(point, &entity.kind)))
                .filter(|(_, distance)| *distance <= tolerance)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(id, _)| id)
        }

        /// Drops selected ids whose entities no longer exist.
        pub(crate) fn prune_selection(&mut self) {
            let drawing = &self.drawing;
            self.selected.retain(|id| drawing.entity(*id).is_some());
        }

        #[inline]
        pub fn last_point(&self) -> Option<Point2> {
            self.last_point
        }

        #[inline]
        pub fn set_last_point(&mut self, point: Point2) {
            self.last_point = Some(point);
        }

        #[inline]
        pub fn offset_distance(&self) -> Option<f64> {
            self.offset_distance
        }

        #[inline]
        pub fn set_offset_distance(&mut self, distance: f64) {
            self.offset_distance = Some(distance);
        }
    }

    impl Default for Scene {
        fn default() -> Self {
            Self::new()
        }
    }

    #[cfg(test)]
    mod tests {
        use draftcad_core::document::Layer;

        use super::*;

        fn sample() -> (Scene, EntityId, EntityId) {
            let mut drawing = Drawing::new();
            let line = drawing.add_entity(Entity::line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)));
            let circle = drawing.add_entity(Entity::circle(Point2::new(20.0, 0.0), 2.0));
            (Scene::with_drawing(drawing), line, circle)
        }

        #[test]
        fn selection_operations_work() {
            let (mut scene, line, circle) = sample();
            assert_eq!(scene.selection_len(), 0);

            scene.select(circle).expect("select circle");
            scene.select(line).expect("select line");
            assert_eq!(scene.selection().collect::<Vec<_>>(), vec![circle, line]);

            // toggle should remove when already selected
            assert!(!scene.toggle_selection(circle).expect("toggle"));
            assert!(!scene.is_selected(circle));
            assert!(scene.toggle_selection(circle).expect("toggle again"));

            assert!(scene.deselect(line));
            assert!(!scene.deselect(line));

            let err = scene.select(EntityId::new(9_999)).unwrap_err();
            assert!(matches!(err, EngineError::EntityNotFound(9_999)));
        }

        #[test]
        fn pick_prefers_the_nearest_visible_entity() {
            let (mut scene, line, circle) = sample();
            assert_eq!(scene.pick(Point2::new(5.0, 0.3), 0.5), Some(line));
            assert_eq!(scene.pick(Point2::new(22.2, 0.0), 0.5), Some(circle));
            assert_eq!(scene.pick(Point2::new(5.0, 3.0), 0.5), None);

            let mut hidden = Layer::new("HIDDEN");
            hidden.off = true;
            scene.drawing_mut().add_layer(hidden);
            let ghost = scene
                .drawing_mut()
                .add_entity(Entity::line(Point2::new(0.0, 0.1), Point2::new(10.0, 0.1)).on_layer("HIDDEN"));
            assert_eq!(scene.pick(Point2::new(5.0, 0.1), 0.5), Some(line));
            assert!(!scene.visible_entities().any(|id| id == ghost));
        }

        #[test]
        fn load_drawing_resets_runtime_state() {
            let (mut scene, line, _) = sample();
            scene.select(line).expect("select");
            scene.set_last_point(Point2::new(1.0, 1.0));
            scene.load_drawing(Drawing::new());
            assert_eq!(scene.selection_len(), 0);
            assert_eq!(scene.last_point(), None);
            assert!(scene.drawing().is_empty());
        }
    }
}
