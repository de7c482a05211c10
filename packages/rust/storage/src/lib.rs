//! Append-only JSON log of generated completions.
//!
//! Each pipeline owns one [`LogStore`]: a single file holding a JSON array,
//! normally of strings, in generation order. Entries are only ever appended; the whole
//! array is rewritten on every append.
//!
//! **Access rules:** one writer, sequential invocation. There is no locking
//! and the rewrite is not atomic with respect to concurrent writers.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use genscribe_shared::{GenscribeError, Result};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::{debug, info, warn};

/// Indentation used when rewriting a log file.
const LOG_INDENT: &[u8] = b"    ";

/// Handle to one append-only log file.
#[derive(Debug, Clone)]
pub struct LogStore {
    path: PathBuf,
}

impl LogStore {
    /// Point a store at `path`. Nothing is read or created until used.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry in order.
    ///
    /// A missing file and a file that is not valid JSON both load as an
    /// empty log. Entries that are not strings are rendered as compact JSON.
    /// Valid JSON that is not an array is a parse error, as is any other
    /// read failure an I/O error.
    pub fn load(&self) -> Result<Vec<String>> {
        Ok(self.load_raw()?.into_iter().map(render_entry).collect())
    }

    /// Append `entry` as the new last element and rewrite the file.
    ///
    /// Existing elements are written back untouched, whatever their JSON
    /// type. Returns the length of the log after the append. Parent
    /// directories are created when missing.
    pub fn append(&self, entry: &str) -> Result<usize> {
        let mut entries = self.load_raw()?;
        entries.push(Value::String(entry.to_owned()));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| GenscribeError::io(parent, e))?;
        }

        let body = to_pretty_json(&entries)?;
        std::fs::write(&self.path, body).map_err(|e| GenscribeError::io(&self.path, e))?;

        info!(path = %self.path.display(), len = entries.len(), "appended log entry");
        Ok(entries.len())
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> Result<usize> {
        Ok(self.load_raw()?.len())
    }

    /// Whether the log holds no entries.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Entry at 1-based `position`, if present.
    pub fn entry(&self, position: usize) -> Result<Option<String>> {
        if position == 0 {
            return Ok(None);
        }
        Ok(self.load()?.into_iter().nth(position - 1))
    }

    /// Elements of the backing array as stored.
    fn load_raw(&self) -> Result<Vec<Value>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "log file not found, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(GenscribeError::io(&self.path, e)),
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Array(entries)) => Ok(entries),
            Ok(other) => Err(GenscribeError::parse(format!(
                "{} holds a JSON {} instead of an array; refusing to overwrite it",
                self.path.display(),
                json_kind(&other)
            ))),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "log file is not valid JSON, starting empty"
                );
                Ok(Vec::new())
            }
        }
    }
}

fn render_entry(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn to_pretty_json(entries: &[Value]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(LOG_INDENT));
    entries
        .serialize(&mut ser)
        .map_err(|e| GenscribeError::validation(format!("JSON serialization failed: {e}")))?;
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
