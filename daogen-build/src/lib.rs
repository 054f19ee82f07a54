//! Build-time Model and DAO generator for daogen entities.
//!
//! Give it a sample value of a `#[derive(Entity)]` type and it writes two files
//! under the output root: `model/<entity>.rs` with the persisted record and
//! `dao/<entity>.rs` with a typed access object built on [`daogen::Query`].
//!
//! # Example
//!
//! In your `build.rs`:
//!
//! ```ignore
//! fn main() {
//!     daogen_build::Generator::new()
//!         .output_root("src/generated")
//!         .model_module("crate::generated::model")
//!         .generate(&my_app::User::default())
//!         .expect("Failed to generate User DAO");
//! }
//! ```

mod config;
mod emitter;
mod error;
mod generator;
mod scanner;

use std::path::PathBuf;

use daogen::Entity;

pub use config::{DEFAULT_OUTPUT_ROOT, GeneratorConfig};
pub use emitter::{HEADER, RESERVED_NAMES, Rendered, render, render_dao, render_model};
pub use error::GenerateError;
pub use generator::{GeneratedFiles, Generator, WriteOutcome};
pub use scanner::{scan_file, scan_source};

/// Generate the Model and DAO for `sample` under `root` with default settings.
///
/// An empty `root` writes under [`DEFAULT_OUTPUT_ROOT`].
pub fn generate<T: Entity>(sample: &T, root: impl Into<PathBuf>) -> Result<GeneratedFiles, GenerateError> {
    Generator::new().output_root(root).generate(sample)
}
