//! Input decoding: turns a source file into an ordered list of raw text lines.
//!
//! Supported formats:
//! - `.txt` / `.feature` - line-delimited text
//! - `.csv` - first column of every row, blank cells dropped
//! - `.docx` - paragraph text, blank paragraphs dropped

pub mod docx;
pub mod tabular;

use std::fs;
use std::path::Path;

use thiserror::Error;

/// Result type for decoding operations
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors raised while decoding an input file
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("unsupported file type: {0:?}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid document archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("document has no body part ({0})")]
    MissingPart(&'static str),
}

/// Recognized input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Line-delimited plain text
    Text,
    /// Comma-separated values
    Tabular,
    /// Office Open XML word-processing document
    Document,
    /// A previously written Gherkin file, read as plain text
    Feature,
}

impl InputFormat {
    /// Detect the format from a path's extension (case-insensitive)
    pub fn from_path(path: &Path) -> DecodeResult<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "txt" => Ok(InputFormat::Text),
            "csv" => Ok(InputFormat::Tabular),
            "docx" => Ok(InputFormat::Document),
            "feature" => Ok(InputFormat::Feature),
            _ => Err(DecodeError::UnsupportedFormat(format!(".{}", ext))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::Text => "text",
            InputFormat::Tabular => "csv",
            InputFormat::Document => "docx",
            InputFormat::Feature => "feature",
        }
    }
}

/// Decode a file into raw lines according to its extension
pub fn decode(path: &Path) -> DecodeResult<Vec<String>> {
    let format = InputFormat::from_path(path)?;
    let lines = match format {
        InputFormat::Text | InputFormat::Feature => {
            let content = fs::read_to_string(path)?;
            content.lines().map(str::to_string).collect()
        }
        InputFormat::Tabular => {
            let content = fs::read_to_string(path)?;
            tabular::first_column(&content)
        }
        InputFormat::Document => docx::read_paragraphs(path)?,
    };
    tracing::debug!(path = %path.display(), format = format.as_str(), lines = lines.len(), "decoded input");
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("a.txt")).unwrap(), InputFormat::Text);
        assert_eq!(InputFormat::from_path(Path::new("a.CSV")).unwrap(), InputFormat::Tabular);
        assert_eq!(InputFormat::from_path(Path::new("a.docx")).unwrap(), InputFormat::Document);
        assert_eq!(InputFormat::from_path(Path::new("login.feature")).unwrap(), InputFormat::Feature);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = InputFormat::from_path(&PathBuf::from("notes.pdf")).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedFormat(ref e) if e == ".pdf"));

        let err = InputFormat::from_path(Path::new("Makefile")).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_decode_text_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("login.txt");
        fs::write(&path, "test scenario Login\r\nopen localhost:3000\n\nclick Submit\n").unwrap();

        let lines = decode(&path).unwrap();
        assert_eq!(lines, vec!["test scenario Login", "open localhost:3000", "", "click Submit"]);
    }

    #[test]
    fn test_decode_csv_first_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.csv");
        fs::write(&path, "test scenario Search,ignored\nverify Results,x\n,only second\n").unwrap();

        let lines = decode(&path).unwrap();
        assert_eq!(lines, vec!["test scenario Search", "verify Results"]);
    }

    #[test]
    fn test_decode_missing_file() {
        let err = decode(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)));
    }
}
