//! Writes the rendered Model and DAO files for an entity.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use daogen::{Entity, EntitySchema};
use log::{debug, info, warn};

use crate::{config::GeneratorConfig, emitter, error::GenerateError};

/// Whether a file was rewritten or already had the rendered content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

/// Paths produced by one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFiles {
    pub dao: PathBuf,
    pub model: PathBuf,
    pub dao_outcome: WriteOutcome,
    pub model_outcome: WriteOutcome,
}

/// Builder for configuring and running the Model/DAO generator.
#[derive(Debug, Clone, Default)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    /// Create a generator writing under `dist/`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Set the directory receiving the `dao/` and `model/` subdirectories.
    ///
    /// Default: `dist`
    pub fn output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_root = path.into();
        self
    }

    /// Default: `dao`
    pub fn dao_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.dao_dir = dir.into();
        self
    }

    /// Default: `model`
    pub fn model_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.model_dir = dir.into();
        self
    }

    /// Module path the generated DAO imports the Model from.
    ///
    /// Default: `crate::model`
    pub fn model_module(mut self, module: impl Into<String>) -> Self {
        self.config.model_module = module.into();
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate the Model and DAO for the type of `sample`.
    pub fn generate<T: Entity>(&self, sample: &T) -> Result<GeneratedFiles, GenerateError> {
        let schema = EntitySchema::introspect(sample)?;
        self.generate_schema(&schema)
    }

    /// Generate both files for an already built schema.
    ///
    /// Both artifacts are rendered before anything touches the filesystem. The
    /// DAO is written first; if the Model write then fails, the DAO file is
    /// put back the way it was.
    pub fn generate_schema(&self, schema: &EntitySchema) -> Result<GeneratedFiles, GenerateError> {
        let rendered = emitter::render(schema, &self.config)?;
        let file_name = format!("{}.rs", rendered.file_stem);

        let dao_dir = self.config.dao_path();
        let model_dir = self.config.model_path();
        create_dir(&dao_dir)?;
        create_dir(&model_dir)?;

        let dao = dao_dir.join(&file_name);
        let model = model_dir.join(&file_name);

        let previous_dao = read_existing(&dao)?;
        let previous_model = read_existing(&model)?;
        let dao_outcome = write_if_changed(&dao, &rendered.dao, previous_dao.as_deref())?;

        let model_outcome = match write_if_changed(&model, &rendered.model, previous_model.as_deref()) {
            Ok(outcome) => outcome,
            Err(err) => {
                if dao_outcome == WriteOutcome::Written {
                    restore(&dao, previous_dao.as_deref());
                }
                return Err(err);
            }
        };

        info!(
            "daogen-build: generated {} ({} fields) into {}",
            schema.name,
            schema.fields.len(),
            self.config.resolved_output_root().display()
        );

        Ok(GeneratedFiles {
            dao,
            model,
            dao_outcome,
            model_outcome,
        })
    }
}

fn create_dir(path: &Path) -> Result<(), GenerateError> {
    fs::create_dir_all(path).map_err(|source| GenerateError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Current bytes of `path`, or `None` when there is nothing to preserve.
fn read_existing(path: &Path) -> Result<Option<Vec<u8>>, GenerateError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        // A directory in the way is reported by the write that follows.
        Err(_) if path.is_dir() => Ok(None),
        Err(source) => Err(GenerateError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_if_changed(path: &Path, content: &str, existing: Option<&[u8]>) -> Result<WriteOutcome, GenerateError> {
    if existing == Some(content.as_bytes()) {
        debug!("daogen-build: {} is up to date", path.display());
        return Ok(WriteOutcome::Unchanged);
    }
    fs::write(path, content).map_err(|source| GenerateError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("daogen-build: wrote {}", path.display());
    Ok(WriteOutcome::Written)
}

fn restore(path: &Path, previous: Option<&[u8]>) {
    let result = match previous {
        Some(content) => fs::write(path, content),
        None => fs::remove_file(path).or_else(|err| match err.kind() {
            io::ErrorKind::NotFound => Ok(()),
            _ => Err(err),
        }),
    };
    if let Err(err) = result {
        warn!("daogen-build: could not roll back {}: {err}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daogen::FieldMetadata;

    fn schema() -> EntitySchema {
        EntitySchema::new(
            "Note",
            vec![FieldMetadata {
                name: "body".into(),
                key: "body".into(),
                ty: "String".into(),
            }],
        )
        .unwrap()
    }

    #[test]
    fn builder_overrides_config() {
        let generator = Generator::new().output_root("gen").dao_dir("access").model_module("crate::m");
        assert_eq!(generator.config().dao_path(), Path::new("gen").join("access"));
        assert_eq!(generator.config().model_dir, "model");
        assert_eq!(generator.config().model_module, "crate::m");
    }

    #[test]
    fn second_run_reports_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new().output_root(dir.path());

        let first = generator.generate_schema(&schema()).unwrap();
        assert_eq!(first.dao_outcome, WriteOutcome::Written);
        assert_eq!(first.model_outcome, WriteOutcome::Written);

        let second = generator.generate_schema(&schema()).unwrap();
        assert_eq!(second.dao_outcome, WriteOutcome::Unchanged);
        assert_eq!(second.model_outcome, WriteOutcome::Unchanged);
    }

    #[test]
    fn restore_removes_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.rs");
        fs::write(&path, "new").unwrap();
        restore(&path, None);
        assert!(!path.exists());

        fs::write(&path, "new").unwrap();
        restore(&path, Some(&b"old\xff"[..]));
        assert_eq!(fs::read(&path).unwrap(), b"old\xff");
    }

    #[test]
    fn unreadable_existing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_existing(&dir.path().join("absent.rs")).unwrap().is_none());

        let plain = dir.path().join("plain");
        fs::write(&plain, "not a directory").unwrap();
        let err = read_existing(&plain.join("x.rs")).unwrap_err();
        assert!(matches!(err, GenerateError::Read { .. }));
    }
}
