mod compiler;
mod database;
mod hashing;
mod pipeline;

pub use compiler::{
    compile_level_database, ContentCompileError, ContentErrorCode, SourceLocation,
};
pub use database::{LevelDatabase, LevelDef};
pub use hashing::sha256_hex;
pub use pipeline::{
    build_or_load_level_database, ContentPipelineError, LevelSource, BUILTIN_SOURCE_LABEL,
};
