use std::path::{Path, PathBuf};

use draftcad_core::document::Drawing;
use draftcad_io::{DocumentLoader, DocumentSaver, DxfFacade};
use tracing::{info, warn};

use crate::errors::FrontendError;

/// Where the current drawing came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    File(PathBuf),
    /// A new drawing, either requested or substituted after a failed load.
    Empty,
}

#[derive(Debug)]
pub struct LoadedDrawing {
    pub drawing: Drawing,
    pub source: DocumentSource,
}

/// Loads `path`, or starts an empty drawing when the file is missing or malformed.
pub fn load_or_empty(path: Option<&Path>) -> LoadedDrawing {
    let Some(path) = path else {
        return LoadedDrawing {
            drawing: Drawing::new(),
            source: DocumentSource::Empty,
        };
    };

    match DxfFacade::new().load(path) {
        Ok(drawing) => {
            info!(path = %path.display(), entities = drawing.len(), "drawing opened");
            LoadedDrawing {
                drawing,
                source: DocumentSource::File(path.to_path_buf()),
            }
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to open drawing, starting a new one");
            LoadedDrawing {
                drawing: Drawing::new(),
                source: DocumentSource::Empty,
            }
        }
    }
}

pub fn save(drawing: &Drawing, path: &Path) -> Result<(), FrontendError> {
    DxfFacade::new().save(drawing, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use draftcad_core::document::Entity;
    use draftcad_core::geometry::Point2;

    use super::*;

    #[test]
    fn malformed_file_falls_back_to_an_empty_drawing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("broken.dxf");
        fs::write(&path, "0\nSECTION\n2\nENTITIES\n0\nLINE\n10\nnot-a-number\n").expect("write");

        let loaded = load_or_empty(Some(&path));
        assert_eq!(loaded.source, DocumentSource::Empty);
        assert!(loaded.drawing.is_empty());

        let missing = load_or_empty(Some(&dir.path().join("absent.dxf")));
        assert_eq!(missing.source, DocumentSource::Empty);
    }

    #[test]
    fn saved_drawing_opens_again() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("saved.dxf");
        let mut drawing = Drawing::new();
        drawing.add_entity(Entity::line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)));

        save(&drawing, &path).expect("save");
        let loaded = load_or_empty(Some(&path));
        assert_eq!(loaded.source, DocumentSource::File(path));
        assert_eq!(loaded.drawing.len(), 1);
    }
}
