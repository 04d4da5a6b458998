pub mod config;
pub mod error;
pub mod exclusions;
pub mod ir;
pub mod parse;
pub mod transform;

pub use error::{DuplicateEnumError, ExtractError};
pub use transform::{ExtractOptions, Extraction, extract};
