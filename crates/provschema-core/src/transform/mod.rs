//! Inference of resources, functions and types from a parsed document.

pub mod enums;
pub mod extract;
pub mod functions;
pub mod naming;
pub mod path_normalizer;
pub mod resources;
pub mod session;
pub mod type_resolver;

pub use extract::{ExtractOptions, Extraction, extract};
pub use session::{ExtractionSession, Scope};
