use std::fs;
use std::path::{Path, PathBuf};

use draftcad_core::document::Drawing;
use thiserror::Error;
use tracing::info;

mod parser;
mod reader;
mod text;
mod writer;

/// Malformed group-code stream. Line numbers are 1-based and point at the group code line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("invalid DXF at line {line}: {message}")]
    Invalid { line: usize, message: String },
    #[error("unexpected end of DXF input in {context}")]
    Truncated { context: String },
}

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Parses DXF text into a drawing.
///
/// Empty input yields an empty drawing with default bounds. HEADER, OBJECTS and
/// unknown sections are skipped, as are unsupported entity kinds.
pub fn decode(source: &str) -> Result<Drawing, FormatError> {
    parser::parse(source)
}

/// Serializes a drawing as ASCII DXF (AC1015).
pub fn encode(drawing: &Drawing) -> String {
    writer::write(drawing)
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Drawing, IoError>;
}

pub trait DocumentSaver {
    fn save(&self, drawing: &Drawing, path: &Path) -> Result<(), IoError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Drawing, IoError> {
        let data = read_source(path)?;
        let drawing = decode(&data)?;
        info!(path = %path.display(), entities = drawing.len(), "loaded DXF");
        Ok(drawing)
    }
}

impl DocumentSaver for DxfFacade {
    fn save(&self, drawing: &Drawing, path: &Path) -> Result<(), IoError> {
        fs::write(path, encode(drawing)).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), entities = drawing.len(), "saved DXF");
        Ok(())
    }
}

/// Reads a file as text. Legacy code-page files are decoded byte-per-char instead of failing.
fn read_source(path: &Path) -> Result<String, IoError> {
    let bytes = fs::read(path).map_err(|source| IoError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.starts_with(b"AutoCAD Binary DXF") {
        return Err(IoError::UnsupportedFeature("binary DXF".to_string()));
    }
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => err.into_bytes().into_iter().map(char::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_errors_render_with_line_numbers() {
        let err = FormatError::Invalid {
            line: 7,
            message: "LINE: missing end point (11/21)".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid DXF at line 7: LINE: missing end point (11/21)"
        );
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = DxfFacade::new()
            .load(Path::new("/definitely/not/here.dxf"))
            .expect_err("missing file");
        assert!(matches!(err, IoError::ReadError { ref path, .. } if path.ends_with("here.dxf")));
    }
}
