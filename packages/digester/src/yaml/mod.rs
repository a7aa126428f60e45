//! YAML support: declarative rule files and rendering of digested records.

mod rules;
mod writer;

pub use rules::{PatternRules, RuleFile, RuleSpec};
pub use writer::{generate_yaml, save_yaml, to_yaml_value};
