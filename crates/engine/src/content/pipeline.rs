use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::AppPaths;

use super::compiler::{compile_level_database, ContentCompileError};
use super::database::LevelDatabase;

pub const BUILTIN_SOURCE_LABEL: &str = "<builtin>";

#[derive(Debug, Error)]
pub enum ContentPipelineError {
    #[error("failed to read level definitions at {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Compile(#[from] ContentCompileError),
}

/// Where the active level database came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelSource {
    File(PathBuf),
    Builtin,
}

impl LevelSource {
    pub fn label(&self) -> String {
        match self {
            LevelSource::File(path) => path.display().to_string(),
            LevelSource::Builtin => BUILTIN_SOURCE_LABEL.to_string(),
        }
    }
}

/// Prefers the on-disk levels file under the project root and falls back to
/// `builtin_xml` when no file exists. A file that exists but fails to read or
/// compile is an error, never a silent fallback.
pub fn build_or_load_level_database(
    app_paths: Option<&AppPaths>,
    builtin_xml: &str,
) -> Result<(LevelDatabase, LevelSource), ContentPipelineError> {
    let source = match app_paths {
        Some(paths) if paths.levels_file.is_file() => {
            LevelSource::File(paths.levels_file.clone())
        }
        _ => LevelSource::Builtin,
    };

    let database = match &source {
        LevelSource::File(path) => {
            let raw = fs::read_to_string(path).map_err(|error| ContentPipelineError::ReadFile {
                path: path.clone(),
                source: error,
            })?;
            compile_level_database(&source.label(), &raw)?
        }
        LevelSource::Builtin => compile_level_database(BUILTIN_SOURCE_LABEL, builtin_xml)?,
    };

    info!(
        source = %source.label(),
        level_count = database.level_count(),
        fingerprint = %database.fingerprint(),
        "content_source_selected"
    );

    Ok((database, source))
}
