//! Code extraction and versioned materialization for generated widgets.
//!
//! [`extract_bundle`] recovers a [`CodeBundle`](genscribe_shared::CodeBundle)
//! from raw model output; [`materialize`] writes it to a fresh `r<N>`
//! directory.

pub mod extract;
pub mod materialize;

pub use extract::{FENCE, JSON_TAG, extract_bundle};
pub use materialize::{
    CODE_SNAPSHOT_FILE, CSS_FILE, HTML_FILE, MaterializedBundle, materialize, version_dir_name,
};
