//! Versioned materialization of a code bundle.
//!
//! Creates the following layout for each dropdown run:
//! ```text
//! <root>/r<N>/
//! ├── code.json    ({"HTML": ..., "CSS": ...})
//! ├── index.html
//! └── styles.css
//! ```
//!
//! `N` starts at the preferred version the caller passes in. The version
//! directory is claimed with a non-recursive create, so an existing `r<N>`
//! is never reused: the next free number is taken instead.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use genscribe_shared::{CodeBundle, GenscribeError, Result};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::{debug, info, instrument, warn};

/// Snapshot of the bundle as extracted.
pub const CODE_SNAPSHOT_FILE: &str = "code.json";

/// The bundle's `HTML` field, verbatim.
pub const HTML_FILE: &str = "index.html";

/// The bundle's `CSS` field, verbatim.
pub const CSS_FILE: &str = "styles.css";

/// Where one bundle ended up on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedBundle {
    /// Version actually used (may exceed the preferred one on collision).
    pub version: usize,
    /// Version the caller asked for, i.e. the log position of the entry.
    pub preferred_version: usize,
    pub dir: PathBuf,
    pub snapshot_path: PathBuf,
    pub html_path: PathBuf,
    pub css_path: PathBuf,
}

/// Directory name for a version, e.g. `r3`.
pub fn version_dir_name(version: usize) -> String {
    format!("r{version}")
}

/// Write `bundle` into a freshly claimed `root/r<N>` directory.
///
/// Writes happen in order: snapshot, HTML, CSS. A failed write aborts
/// immediately and leaves whatever was already written in place.
#[instrument(skip_all, fields(root = %root.display(), preferred_version = preferred_version))]
pub fn materialize(
    root: &Path,
    bundle: &CodeBundle,
    preferred_version: usize,
) -> Result<MaterializedBundle> {
    let (version, dir) = claim_version_dir(root, preferred_version)?;

    let snapshot_path = dir.join(CODE_SNAPSHOT_FILE);
    write_json(&snapshot_path, bundle)?;

    let html_path = dir.join(HTML_FILE);
    write_text(&html_path, &bundle.html)?;

    let css_path = dir.join(CSS_FILE);
    write_text(&css_path, &bundle.css)?;

    info!(version, preferred_version, path = %dir.display(), "bundle materialized");

    Ok(MaterializedBundle {
        version,
        preferred_version,
        dir,
        snapshot_path,
        html_path,
        css_path,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create `root` if needed, then claim the first free `r<N>` with `N >= preferred`.
fn claim_version_dir(root: &Path, preferred: usize) -> Result<(usize, PathBuf)> {
    std::fs::create_dir_all(root).map_err(|e| GenscribeError::io(root, e))?;

    let mut version = preferred;
    loop {
        let dir = root.join(version_dir_name(version));
        match std::fs::create_dir(&dir) {
            Ok(()) => {
                debug!(path = %dir.display(), "claimed version directory");
                return Ok((version, dir));
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                warn!(
                    path = %dir.display(),
                    log_position = preferred,
                    "version directory already taken, trying next"
                );
                version += 1;
            }
            Err(e) => return Err(GenscribeError::io(&dir, e)),
        }
    }
}

/// Write a JSON file (pretty-printed, 4-space indent).
fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    data.serialize(&mut ser)
        .map_err(|e| GenscribeError::validation(format!("JSON serialization failed: {e}")))?;
    std::fs::write(path, buf).map_err(|e| GenscribeError::io(path, e))?;
    debug!(path = %path.display(), "wrote JSON file");
    Ok(())
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| GenscribeError::io(path, e))?;
    debug!(path = %path.display(), size = content.len(), "wrote file");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
