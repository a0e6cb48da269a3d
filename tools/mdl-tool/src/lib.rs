//! mdl-tool library
//!
//! Command implementations behind the `mdl-tool` binary, usable from tests and
//! other tools without going through the CLI.

pub mod commands;
pub mod summary;

pub use commands::{export_json, import_json, list_materials, load_config, rewrite};
pub use summary::{MeshSummary, ModelSummary, inspect};
