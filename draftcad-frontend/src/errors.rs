use draftcad_engine::errors::RegistryError;
use draftcad_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Document(#[from] IoError),
    #[error("command registry could not be built: {0}")]
    Registry(#[from] RegistryError),
    #[error("console I/O failed: {0}")]
    Console(#[from] std::io::Error),
    #[error("no file name given and the drawing has never been saved")]
    NoFileName,
}
