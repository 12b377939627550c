//! Line-oriented console session.
//!
//! While idle a line is a command name or one of the host verbs `OPEN`, `SAVE`, `NEW`,
//! `LIST`, `HELP` and `QUIT`. While a command waits for input a line is a typed token. A leading
//! apostrophe (`'10,5`) delivers a click at that point and `ESC` cancels.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use draftcad_config::AppConfig;
use draftcad_core::document::Drawing;
use draftcad_core::geometry::Point2;
use draftcad_engine::input::{InputValue, parse};
use draftcad_engine::session::IDLE_PROMPT;
use draftcad_engine::{Console, EngineSettings, Input, Session, SessionEvent};
use tracing::{debug, info, warn};

use crate::errors::FrontendError;
use crate::loader::{DocumentSource, load_or_empty, save};
use crate::view::HeadlessView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Maps the editor and dimension sections onto engine settings.
pub fn engine_settings(config: &AppConfig) -> EngineSettings {
    EngineSettings {
        pick_tolerance: config.editor.pick_tolerance,
        zoom_padding: config.editor.zoom_padding,
        default_layer: config.editor.default_layer.clone(),
        dim_style: config.dimension,
    }
}

pub struct Repl<W: Write> {
    session: Session,
    view: HeadlessView<W>,
    path: Option<PathBuf>,
}

impl<W: Write> Repl<W> {
    pub fn new(config: &AppConfig, file: Option<&Path>, out: W) -> Result<Self, FrontendError> {
        let loaded = load_or_empty(file);
        let path = match loaded.source {
            DocumentSource::File(path) => Some(path),
            DocumentSource::Empty => None,
        };
        let session = Session::new(loaded.drawing, engine_settings(config))?;
        let view = HeadlessView::new(
            out,
            config.frontend.view_width,
            config.frontend.view_height,
            config.frontend.echo_prompts,
        );
        Ok(Self { session, view, path })
    }

    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[inline]
    pub fn view(&self) -> &HeadlessView<W> {
        &self.view
    }

    pub fn into_output(self) -> W {
        self.view.into_inner()
    }

    /// Reads lines until `QUIT` or end of input. A command still running at the end is cancelled.
    pub fn run(&mut self, input: impl BufRead) -> Result<(), FrontendError> {
        self.greet();
        for line in input.lines() {
            if self.handle_line(&line?) == Flow::Quit {
                return Ok(());
            }
        }
        if !self.session.is_idle() {
            self.session.submit(Input::Cancel, &mut self.view);
        }
        Ok(())
    }

    fn greet(&mut self) {
        let source = match &self.path {
            Some(path) => path.display().to_string(),
            None => "new drawing".to_string(),
        };
        self.view
            .line(&format!("draftcad: {source}, {} entities", self.session.drawing().len()));
        self.view.set_prompt(IDLE_PROMPT);
    }

    pub fn handle_line(&mut self, raw: &str) -> Flow {
        let line = raw.trim();
        debug!(line, "console input");

        let flow = if line.eq_ignore_ascii_case("ESC") {
            self.session.submit(Input::Cancel, &mut self.view);
            Flow::Continue
        } else if let Some(point) = line.strip_prefix('\'') {
            match parse_click(point) {
                Some(point) => self.session.submit(Input::Point(point), &mut self.view),
                None => self.view.line(&format!("Warning: '{point}' is not an absolute point.")),
            }
            Flow::Continue
        } else if self.session.is_idle() {
            self.idle_line(line)
        } else {
            self.session.submit(Input::Text(line.to_string()), &mut self.view);
            Flow::Continue
        };

        for event in self.session.take_events() {
            if let SessionEvent::Finished { name, outcome } = event {
                info!(command = %name, ?outcome, "command ended");
            }
        }
        flow
    }

    fn idle_line(&mut self, line: &str) -> Flow {
        let (verb, argument) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, Some(rest.trim()).filter(|rest| !rest.is_empty())),
            None => (line, None),
        };

        match verb.to_ascii_uppercase().as_str() {
            "QUIT" | "EXIT" => return Flow::Quit,
            "NEW" => self.replace(Drawing::new(), None),
            "OPEN" => match argument {
                Some(path) => self.open(Path::new(path)),
                None => self.view.line("Warning: OPEN needs a file name."),
            },
            "SAVE" => {
                if let Err(err) = self.save(argument.map(Path::new)) {
                    warn!(error = %err, "save failed");
                    self.view.line(&format!("Error: {err}"));
                }
            }
            "LIST" => self.list(),
            "HELP" => self.help(),
            _ => self.session.submit(Input::Text(line.to_string()), &mut self.view),
        }
        Flow::Continue
    }

    fn open(&mut self, path: &Path) {
        let loaded = load_or_empty(Some(path));
        match loaded.source {
            DocumentSource::File(path) => {
                let count = loaded.drawing.len();
                self.replace(loaded.drawing, Some(path));
                self.view.line(&format!("Opened {count} entities."));
            }
            DocumentSource::Empty => {
                self.view
                    .line(&format!("Warning: could not open {}; started a new drawing.", path.display()));
                self.replace(loaded.drawing, None);
            }
        }
    }

    fn replace(&mut self, drawing: Drawing, path: Option<PathBuf>) {
        // only reached while idle
        if let Err(err) = self.session.load_drawing(drawing) {
            warn!(error = %err, "drawing not replaced");
            return;
        }
        self.session.take_edit_records();
        self.path = path;
    }

    fn save(&mut self, target: Option<&Path>) -> Result<(), FrontendError> {
        let path = match target {
            Some(path) => path.to_path_buf(),
            None => self.path.clone().ok_or(FrontendError::NoFileName)?,
        };
        save(self.session.drawing(), &path)?;
        self.view.line(&format!("Saved {}.", path.display()));
        self.path = Some(path);
        Ok(())
    }

    /// One line per command group: `GLOBAL (ALIAS)` entries in registration order.
    fn help(&mut self) {
        let lines: Vec<String> = self
            .session
            .registry()
            .groups()
            .map(|group| {
                let names: Vec<String> = group
                    .commands()
                    .iter()
                    .map(|spec| {
                        if spec.local == spec.global {
                            spec.global.clone()
                        } else {
                            format!("{} ({})", spec.global, spec.local)
                        }
                    })
                    .collect();
                format!("{}: {}", group.name, names.join(", "))
            })
            .collect();
        for line in lines {
            self.view.line(&line);
        }
    }

    fn list(&mut self) {
        let lines: Vec<String> = self
            .session
            .drawing()
            .entities()
            .map(|(id, entity)| format!("#{} [{}] {}", id.get(), entity.layer(), entity.describe()))
            .collect();
        if lines.is_empty() {
            self.view.line("Drawing is empty.");
        }
        for line in lines {
            self.view.line(&line);
        }
    }
}

/// Clicks must be absolute coordinates.
fn parse_click(token: &str) -> Option<Point2> {
    match parse(token, None) {
        Ok(InputValue::Point(point)) => Some(point),
        _ => None,
    }
}
