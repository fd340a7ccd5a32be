//! Heuristic import of project documents: markup, JSON, plain text, and image
//! collections parsed into [`VianeoProject`] records and mapped onto engine inputs.

pub mod error;
pub mod files;
pub mod html;
pub mod mapper;
pub mod project;

pub use error::ImportError;
pub use files::{FileKind, ImportReport, SourceFile, detect_kind, import_paths, parse_file_set};
pub use html::parse_document;
pub use mapper::{InputMapper, MapperDefaults, MappingTrace};
pub use project::{ExtractedField, FieldSource, VianeoProject};
