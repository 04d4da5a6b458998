//! Rules that remove operations from extraction.

pub mod evaluator;
pub mod matcher;

pub use evaluator::{Exclusion, ExclusionEvaluator};
pub use matcher::{ExactMatcher, PathMatcher, PatternType, RegexMatcher, WildcardMatcher};
