//! Error types for the digester.
//!
//! Every failure aborts the current parse. Errors raised from inside a rule
//! hook are wrapped in [`DigestError::Rule`] by the digester so the caller can
//! see which rule fired, in which phase, and at which match path.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the digester library.
#[derive(Debug, Error)]
pub enum DigestError {
    /// A file could not be read or written.
    #[error("Cannot access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document stream could not be read.
    #[error("Cannot read XML stream: {0}")]
    Read(#[from] std::io::Error),

    /// The document is not well-formed XML.
    #[error("XML parsing failed on line {line}, column {column}: {source}")]
    Xml {
        line: u32,
        column: u32,
        #[source]
        source: roxmltree::Error,
    },

    /// A raw string could not be coerced to the requested scalar kind.
    #[error("Cannot convert '{value}' to {kind}")]
    Conversion { value: String, kind: String },

    /// The target object exposes no invocable member with this name.
    #[error("Type \"{type_name}\" has no method named \"{method}\"")]
    NoSuchMethod { type_name: String, method: String },

    /// The target object exposes no settable property with this name.
    #[error("Type \"{type_name}\" has no property named \"{property}\"")]
    NoSuchProperty { type_name: String, property: String },

    /// No type is registered under the requested name.
    #[error("Type \"{0}\" is not registered")]
    ClassNotFound(String),

    /// The requested type name is not a valid qualified name.
    #[error("Illegal type name '{0}'")]
    IllegalClassName(String),

    /// The rule/stack protocol was violated (null call target, malformed
    /// pattern, parameter frame underflow).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A dispatched member received an argument of the wrong shape.
    #[error("Invalid argument {index} for \"{member}\": {message}")]
    Argument {
        member: String,
        index: usize,
        message: String,
    },

    /// A rule hook failed while processing the element at `path`.
    #[error("{rule} failed in {phase}() at \"{path}\": {source}")]
    Rule {
        rule: String,
        phase: &'static str,
        path: String,
        #[source]
        source: Box<DigestError>,
    },

    /// A declarative rule file could not be read or deserialized.
    #[error("Invalid rule file: {0}")]
    RuleFile(#[from] serde_yaml_ng::Error),

    /// An object graph could not be rendered as YAML.
    #[error("Cannot render YAML: {0}")]
    Render(#[source] serde_yaml_ng::Error),

    /// Failure raised by a caller-supplied rule or factory.
    #[error("{0}")]
    Custom(String),
}

impl DigestError {
    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Create a caller-defined error.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Return the innermost cause, looking through [`DigestError::Rule`]
    /// wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &DigestError {
        match self {
            Self::Rule { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type alias for digester operations.
pub type Result<T> = std::result::Result<T, DigestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DigestError::NoSuchMethod {
            type_name: "Server".to_string(),
            method: "addPort".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Type \"Server\" has no method named \"addPort\""
        );
    }

    #[test]
    fn test_rule_error_display() {
        let err = DigestError::Rule {
            rule: "CallMethodRule[methodName=setPort]".to_string(),
            phase: "end",
            path: "config/server".to_string(),
            source: Box::new(DigestError::Conversion {
                value: "eighty".to_string(),
                kind: "integer".to_string(),
            }),
        };
        assert_eq!(
            err.to_string(),
            "CallMethodRule[methodName=setPort] failed in end() at \"config/server\": \
             Cannot convert 'eighty' to integer"
        );
    }

    #[test]
    fn test_root_cause() {
        let err = DigestError::Rule {
            rule: "SetNextRule[methodName=addItem]".to_string(),
            phase: "end",
            path: "root/item".to_string(),
            source: Box::new(DigestError::protocol("empty stack")),
        };
        assert!(matches!(err.root_cause(), DigestError::Protocol(_)));
    }
}
