use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use serde_json::Value;

use crate::editor::flatten::write_pretty_json;
use crate::error::{AppError, Result};

/// Human-readable outcome of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub message: String,
}

/// Destination for an edited document.
pub trait DocumentSink {
    fn save(&self, document: &Value) -> Result<SaveReceipt>;
}

/// Writes the document as pretty JSON to a file.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentSink for FileSink {
    fn save(&self, document: &Value) -> Result<SaveReceipt> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::PersistenceFailure(format!("{}: {}", parent.display(), e))
            })?;
        }
        let failure = |e: std::io::Error| {
            AppError::PersistenceFailure(format!("{}: {}", self.path.display(), e))
        };
        let mut writer = BufWriter::new(fs::File::create(&self.path).map_err(failure)?);
        write_pretty_json(&mut writer, document)?;
        writer.flush().map_err(failure)?;
        tracing::info!(path = %self.path.display(), "document saved");
        Ok(SaveReceipt {
            message: format!("Saved {}", self.path.display()),
        })
    }
}

/// Save through `sink`, logging failures. Never retries.
pub fn save_with(sink: &dyn DocumentSink, document: &Value) -> Result<SaveReceipt> {
    sink.save(document).inspect_err(|e| {
        tracing::error!(error = %e, "saving document failed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    struct FailingSink {
        calls: Cell<usize>,
    }

    impl DocumentSink for FailingSink {
        fn save(&self, _document: &Value) -> Result<SaveReceipt> {
            self.calls.set(self.calls.get() + 1);
            Err(AppError::PersistenceFailure("endpoint unreachable".into()))
        }
    }

    #[test]
    fn file_sink_writes_pretty_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out").join("family.json");
        let sink = FileSink::new(&path);
        let doc = json!({ "name": "A", "children": [ { "name": "B" } ] });

        let receipt = sink.save(&doc).expect("save");
        assert!(receipt.message.contains("family.json"));

        let text = std::fs::read_to_string(&path).expect("read back");
        assert!(text.contains("    \"name\": \"A\""));
        let back: Value = serde_json::from_str(&text).expect("parse");
        assert_eq!(back, doc);
    }

    #[test]
    fn file_sink_reports_unwritable_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        // a directory cannot be overwritten by a file write
        let sink = FileSink::new(dir.path());
        let err = sink.save(&json!({ "name": "A" })).unwrap_err();
        assert!(matches!(err, AppError::PersistenceFailure(_)));
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_errors_are_persistence_failures() {
        let err = write_pretty_json(BrokenPipe, &json!({ "name": "A" })).unwrap_err();
        assert!(matches!(err, AppError::PersistenceFailure(_)));
    }

    #[test]
    fn save_with_does_not_retry() {
        let sink = FailingSink {
            calls: Cell::new(0),
        };
        let err = save_with(&sink, &json!({})).unwrap_err();
        assert!(matches!(err, AppError::PersistenceFailure(_)));
        assert_eq!(sink.calls.get(), 1);
    }
}
