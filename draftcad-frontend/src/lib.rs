pub mod cli;
pub mod errors;
pub mod loader;
pub mod view;

use std::io;
use std::path::Path;

use draftcad_config::AppConfig;
use errors::FrontendError;
use tracing::info;

pub use cli::{Flow, Repl, engine_settings};
pub use view::{HeadlessView, Viewport};

/// Runs the console session on stdin/stdout until `QUIT` or end of input.
pub fn run_console(config: &AppConfig, file: Option<&Path>) -> Result<(), FrontendError> {
    info!(file = ?file, "starting console frontend");
    let stdout = io::stdout();
    let mut repl = Repl::new(config, file, stdout.lock())?;
    repl.run(io::stdin().lock())?;
    let edits = repl.view().edit_count();
    info!(edits, "console frontend finished");
    Ok(())
}
