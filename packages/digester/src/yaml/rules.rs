//! Declarative rule files.
//!
//! A rule file lists patterns and the built-in rules bound to each:
//!
//! ```yaml
//! options:
//!   case_folding: false
//! patterns:
//!   - pattern: config
//!     rules:
//!       - object_create: { class: Record }
//!       - set_properties: {}
//!   - pattern: config/server
//!     rules:
//!       - object_create: { class: Record }
//!       - set_properties: { attributes: [addr], properties: [address] }
//!       - set_next: { method: addServer }
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::config::DigesterConfig;
use crate::convert::ScalarKind;
use crate::digester::Digester;
use crate::error::{DigestError, Result};
use crate::registry::handlers::{
    CallMethodRule, CallParamRule, ObjectCreateRule, SetNextRule, SetPropertiesRule,
    SetPropertyRule,
};
use crate::registry::RuleSet;

/// A parsed rule file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RuleFile {
    /// Digester options the file was written for.
    #[serde(default)]
    pub options: Option<DigesterConfig>,

    /// Pattern bindings in registration order.
    pub patterns: Vec<PatternRules>,
}

/// Rules bound to one pattern.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PatternRules {
    pub pattern: String,
    pub rules: Vec<RuleSpec>,
}

/// One built-in rule and its settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSpec {
    ObjectCreate {
        class: String,
        #[serde(default)]
        attribute: Option<String>,
    },
    SetProperties {
        #[serde(default)]
        attributes: Vec<String>,
        #[serde(default)]
        properties: Vec<String>,
        #[serde(default)]
        ignore_missing: Option<bool>,
    },
    SetProperty {
        name: String,
        value: String,
    },
    SetNext {
        method: String,
    },
    CallMethod {
        method: String,
        #[serde(default)]
        params: usize,
        #[serde(default)]
        types: Option<Vec<String>>,
        #[serde(default)]
        target: isize,
    },
    CallParam {
        index: usize,
        #[serde(default)]
        attribute: Option<String>,
        #[serde(default)]
        from_stack: Option<usize>,
    },
}

impl RuleFile {
    /// Parse a rule file from YAML text.
    ///
    /// # Errors
    /// `RuleFile` if the text is not a valid rule file.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(text)?)
    }

    /// Read and parse a rule file.
    ///
    /// # Errors
    /// `Io` if the file cannot be read, `RuleFile` if it is invalid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DigestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&text)
    }
}

impl RuleSet for RuleFile {
    fn add_rule_instances(&self, digester: &mut Digester) -> Result<()> {
        for entry in &self.patterns {
            for spec in &entry.rules {
                tracing::debug!(pattern = %entry.pattern, rule = ?spec, "Adding rule");
                spec.add_to(digester, &entry.pattern)?;
            }
        }
        Ok(())
    }
}

impl RuleSpec {
    /// Register this rule on `digester` under `pattern`.
    fn add_to(&self, digester: &mut Digester, pattern: &str) -> Result<()> {
        match self {
            Self::ObjectCreate { class, attribute } => {
                let rule = ObjectCreateRule::new(class);
                match attribute {
                    Some(attribute) => digester.add_rule(pattern, rule.with_attribute(attribute)),
                    None => digester.add_rule(pattern, rule),
                }
            }
            Self::SetProperties {
                attributes,
                properties,
                ignore_missing,
            } => {
                let ignore = ignore_missing.unwrap_or(digester.config().ignore_missing_property);
                let rule = SetPropertiesRule::with_mapping(attributes.clone(), properties.clone())
                    .with_ignore_missing_property(ignore);
                digester.add_rule(pattern, rule)
            }
            Self::SetProperty { name, value } => {
                digester.add_rule(pattern, SetPropertyRule::new(name, value))
            }
            Self::SetNext { method } => digester.add_rule(pattern, SetNextRule::new(method)),
            Self::CallMethod {
                method,
                params,
                types,
                target,
            } => {
                let mut rule = CallMethodRule::new(method, *params).with_target_offset(*target);
                if let Some(types) = types {
                    let kinds = types
                        .iter()
                        .map(|name| name.parse::<ScalarKind>())
                        .collect::<Result<Vec<_>>>()?;
                    rule = rule.with_param_types(kinds);
                }
                digester.add_rule(pattern, rule)
            }
            Self::CallParam {
                index,
                attribute,
                from_stack,
            } => {
                let rule = match (attribute, from_stack) {
                    (Some(_), Some(_)) => {
                        return Err(DigestError::protocol(format!(
                            "call_param at \"{pattern}\" sets both attribute and from_stack"
                        )));
                    }
                    (Some(attribute), None) => CallParamRule::from_attribute(*index, attribute),
                    (None, Some(stack_index)) => CallParamRule::from_stack(*index, *stack_index),
                    (None, None) => CallParamRule::new(*index),
                };
                digester.add_rule(pattern, rule)
            }
        }
    }
}
