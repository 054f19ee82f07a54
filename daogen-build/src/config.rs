//! Generator settings, loadable from a `daogen.toml` file.

use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::GenerateError;

/// Output root used when none is configured.
pub const DEFAULT_OUTPUT_ROOT: &str = "dist";

/// Where generated files go and how they refer to each other.
///
/// ```toml
/// output_root = "src/generated"
/// model_module = "crate::generated::model"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Directory that receives the `dao/` and `model/` subdirectories.
    pub output_root: PathBuf,
    /// Subdirectory of the output root for DAO files.
    pub dao_dir: String,
    /// Subdirectory of the output root for Model files.
    pub model_dir: String,
    /// Module path under which the Model files are mounted.
    pub model_module: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            dao_dir: "dao".to_string(),
            model_dir: "model".to_string(),
            model_module: "crate::model".to_string(),
        }
    }
}

impl GeneratorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, GenerateError> {
        toml::from_str(content).map_err(|err| GenerateError::Config {
            path: None,
            message: err.to_string(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, GenerateError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| GenerateError::Config {
            path: Some(path.to_path_buf()),
            message: err.to_string(),
        })?;
        toml::from_str(&content).map_err(|err| GenerateError::Config {
            path: Some(path.to_path_buf()),
            message: err.to_string(),
        })
    }

    /// The configured output root, or [`DEFAULT_OUTPUT_ROOT`] when it is empty.
    pub fn resolved_output_root(&self) -> PathBuf {
        if self.output_root.as_os_str().is_empty() {
            PathBuf::from(DEFAULT_OUTPUT_ROOT)
        } else {
            self.output_root.clone()
        }
    }

    pub fn dao_path(&self) -> PathBuf {
        self.resolved_output_root().join(&self.dao_dir)
    }

    pub fn model_path(&self) -> PathBuf {
        self.resolved_output_root().join(&self.model_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = GeneratorConfig::from_toml_str("output_root = \"gen\"\n").unwrap();
        assert_eq!(config.output_root, PathBuf::from("gen"));
        assert_eq!(config.dao_dir, "dao");
        assert_eq!(config.model_module, "crate::model");
    }

    #[test]
    fn empty_output_root_falls_back_to_dist() {
        let config = GeneratorConfig {
            output_root: PathBuf::new(),
            ..GeneratorConfig::default()
        };
        assert_eq!(config.dao_path(), Path::new("dist").join("dao"));
        assert_eq!(config.model_path(), Path::new("dist").join("model"));
    }

    #[test]
    fn load_reads_daogen_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daogen.toml");
        fs::write(&path, "model_module = \"crate::generated::model\"\ndao_dir = \"access\"\n").unwrap();

        let config = GeneratorConfig::load(&path).unwrap();
        assert_eq!(config.model_module, "crate::generated::model");
        assert_eq!(config.dao_path(), Path::new("dist").join("access"));

        let missing = GeneratorConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, GenerateError::Config { path: Some(_), .. }));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = GeneratorConfig::from_toml_str("output_root = [").unwrap_err();
        assert!(matches!(err, GenerateError::Config { path: None, .. }));
    }
}
