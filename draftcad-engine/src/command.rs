use draftcad_core::document::{Drawing, Entity, EntityId, EntityKind};
use draftcad_core::geometry::Point2;
use tracing::debug;

use crate::errors::CommandError;
use crate::interaction::{Host, MessageKind, Presentation, Reply, Request};
use crate::scene::Scene;
use crate::session::EngineSettings;

mod annotate;
mod draw;
mod edges;
mod inquiry;
mod modify;
mod offset;
mod pedit;
mod view;

/// Built-in command bodies. Registry names map onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    Line,
    Circle,
    Arc,
    Rectangle,
    Pline,
    Move,
    Copy,
    Erase,
    Trim,
    Extend,
    Offset,
    Pedit,
    DimLinear,
    DimHorizontal,
    DimVertical,
    DimAligned,
    DimAngular,
    Dist,
    Zoom,
    ZoomWindow,
    ZoomExtents,
    ZoomAll,
}

/// What a command wants next.
#[derive(Debug)]
pub enum Step {
    Prompt(Request),
    Done,
}

/// One committed change to the drawing. Replacements show up as a removal plus
/// an addition with a fresh id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditRecord {
    pub added: Vec<EntityId>,
    pub removed: Vec<(EntityId, Entity)>,
}

impl EditRecord {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Everything a command body may touch while it runs.
pub struct CommandContext<'a> {
    scene: &'a mut Scene,
    host: &'a mut dyn Host,
    settings: &'a EngineSettings,
    records: &'a mut Vec<EditRecord>,
    cancelled: bool,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        scene: &'a mut Scene,
        host: &'a mut dyn Host,
        settings: &'a EngineSettings,
        records: &'a mut Vec<EditRecord>,
        cancelled: bool,
    ) -> Self {
        Self {
            scene,
            host,
            settings,
            records,
            cancelled,
        }
    }

    /// Fails with [`CommandError::Cancelled`] once the user has cancelled.
    #[inline]
    pub fn checkpoint(&self) -> Result<(), CommandError> {
        if self.cancelled {
            Err(CommandError::Cancelled)
        } else {
            Ok(())
        }
    }

    #[inline]
    pub fn scene(&self) -> &Scene {
        &*self.scene
    }

    #[inline]
    pub fn drawing(&self) -> &Drawing {
        self.scene.drawing()
    }

    #[inline]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.scene.entity(id)
    }

    #[inline]
    pub fn settings(&self) -> &EngineSettings {
        self.settings
    }

    pub fn print(&mut self, text: impl AsRef<str>) {
        self.host.print(text.as_ref(), MessageKind::Info);
    }

    pub fn warn(&mut self, text: impl AsRef<str>) {
        self.host.print(text.as_ref(), MessageKind::Warning);
    }

    pub fn presentation(&mut self) -> &mut dyn Presentation {
        self.host.presentation()
    }

    /// Nearest visible entity within the pick tolerance.
    pub fn pick(&self, point: Point2) -> Option<EntityId> {
        self.scene.pick(point, self.settings.pick_tolerance)
    }

    /// Consumes the current selection, reporting how many entities it holds.
    pub fn take_selection(&mut self) -> Vec<EntityId> {
        let ids: Vec<EntityId> = self.scene.selection().collect();
        self.scene.clear_selection();
        if !ids.is_empty() {
            self.print(format!("{} found", ids.len()));
        }
        ids
    }

    pub fn set_offset_distance(&mut self, distance: f64) {
        self.scene.set_offset_distance(distance);
    }

    /// New entity on the configured default layer.
    pub fn new_entity(&self, kind: EntityKind) -> Entity {
        Entity::new(kind).on_layer(self.settings.default_layer.clone())
    }

    pub fn add(&mut self, entity: Entity) -> EntityId {
        let id = self.scene.drawing_mut().add_entity(entity);
        self.commit(EditRecord {
            added: vec![id],
            removed: Vec::new(),
        });
        id
    }

    pub fn add_kind(&mut self, kind: EntityKind) -> EntityId {
        let entity = self.new_entity(kind);
        self.add(entity)
    }

    pub fn delete(&mut self, id: EntityId) {
        self.apply(&[id], Vec::new());
    }

    /// Removes `remove` and inserts `add` as one edit. Returns the new ids in order.
    pub fn apply(&mut self, remove: &[EntityId], add: Vec<Entity>) -> Vec<EntityId> {
        let drawing = self.scene.drawing_mut();
        let removed = drawing.remove_entities(remove);
        let added = add.into_iter().map(|entity| drawing.add_entity(entity)).collect();
        let record = EditRecord { added, removed };
        let added = record.added.clone();
        self.commit(record);
        added
    }

    fn commit(&mut self, record: EditRecord) {
        if record.is_empty() {
            return;
        }
        self.scene.prune_selection();
        debug!(added = record.added.len(), removed = record.removed.len(), "drawing edited");
        self.host.entities_changed(&record);
        self.records.push(record);
    }
}

/// A command body: a resumable state machine that yields one request at a time.
pub(crate) trait Command {
    fn start(&mut self, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError>;

    fn resume(&mut self, reply: Reply, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError>;
}

/// The running instance of one of the built-in commands.
pub(crate) enum ActiveCommand {
    Line(draw::LineCommand),
    Circle(draw::CircleCommand),
    Arc(draw::ArcCommand),
    Rectangle(draw::RectangleCommand),
    Pline(draw::PlineCommand),
    Transform(modify::TransformCommand),
    Erase(modify::EraseCommand),
    Edges(edges::EdgeCommand),
    Offset(offset::OffsetCommand),
    Pedit(pedit::PeditCommand),
    LinearDim(annotate::LinearDimCommand),
    AngularDim(annotate::AngularDimCommand),
    Dist(inquiry::DistCommand),
    Zoom(view::ZoomCommand),
}

impl ActiveCommand {
    pub(crate) fn new(id: CommandId) -> Self {
        use draftcad_core::dimension::DimOrientation;

        match id {
            CommandId::Line => ActiveCommand::Line(Default::default()),
            CommandId::Circle => ActiveCommand::Circle(Default::default()),
            CommandId::Arc => ActiveCommand::Arc(Default::default()),
            CommandId::Rectangle => ActiveCommand::Rectangle(Default::default()),
            CommandId::Pline => ActiveCommand::Pline(Default::default()),
            CommandId::Move => ActiveCommand::Transform(modify::TransformCommand::new(false)),
            CommandId::Copy => ActiveCommand::Transform(modify::TransformCommand::new(true)),
            CommandId::Erase => ActiveCommand::Erase(Default::default()),
            CommandId::Trim => ActiveCommand::Edges(edges::EdgeCommand::new(edges::EdgeMode::Trim)),
            CommandId::Extend => ActiveCommand::Edges(edges::EdgeCommand::new(edges::EdgeMode::Extend)),
            CommandId::Offset => ActiveCommand::Offset(Default::default()),
            CommandId::Pedit => ActiveCommand::Pedit(Default::default()),
            CommandId::DimLinear => {
                ActiveCommand::LinearDim(annotate::LinearDimCommand::new(DimOrientation::Auto))
            }
            CommandId::DimHorizontal => {
                ActiveCommand::LinearDim(annotate::LinearDimCommand::new(DimOrientation::Horizontal))
            }
            CommandId::DimVertical => {
                ActiveCommand::LinearDim(annotate::LinearDimCommand::new(DimOrientation::Vertical))
            }
            CommandId::DimAligned => {
                ActiveCommand::LinearDim(annotate::LinearDimCommand::new(DimOrientation::Aligned))
            }
            CommandId::DimAngular => ActiveCommand::AngularDim(Default::default()),
            CommandId::Dist => ActiveCommand::Dist(Default::default()),
            CommandId::Zoom => ActiveCommand::Zoom(view::ZoomCommand::new(view::ZoomStart::Prompt)),
            CommandId::ZoomWindow => ActiveCommand::Zoom(view::ZoomCommand::new(view::ZoomStart::Window)),
            CommandId::ZoomExtents => ActiveCommand::Zoom(view::ZoomCommand::new(view::ZoomStart::Extents)),
            CommandId::ZoomAll => ActiveCommand::Zoom(view::ZoomCommand::new(view::ZoomStart::All)),
        }
    }

    fn body(&mut self) -> &mut dyn Command {
        match self {
            ActiveCommand::Line(command) => command,
            ActiveCommand::Circle(command) => command,
            ActiveCommand::Arc(command) => command,
            ActiveCommand::Rectangle(command) => command,
            ActiveCommand::Pline(command) => command,
            ActiveCommand::Transform(command) => command,
            ActiveCommand::Erase(command) => command,
            ActiveCommand::Edges(command) => command,
            ActiveCommand::Offset(command) => command,
            ActiveCommand::Pedit(command) => command,
            ActiveCommand::LinearDim(command) => command,
            ActiveCommand::AngularDim(command) => command,
            ActiveCommand::Dist(command) => command,
            ActiveCommand::Zoom(command) => command,
        }
    }

    pub(crate) fn start(&mut self, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        self.body().start(ctx)
    }

    pub(crate) fn resume(&mut self, reply: Reply, ctx: &mut CommandContext<'_>) -> Result<Step, CommandError> {
        self.body().resume(reply, ctx)
    }
}
