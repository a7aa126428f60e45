//! RegelRecht Digester - Build object graphs from XML with pattern rules.
//!
//! A [`Digester`] holds a table of nesting patterns (`config/server`,
//! `*/server`) bound to rules. While it reads a document it tracks the path of
//! open elements and fires the rules whose pattern matches: creating objects,
//! setting properties from attributes, calling methods with attribute or body
//! text arguments, and linking each child to its parent.
//!
//! # Example
//!
//! ```
//! use regelrecht_digester::{Digester, Record};
//!
//! let mut digester = Digester::new();
//! digester.add_object_create("root", "Record", None).unwrap();
//! digester.add_object_create("root/item", "Record", None).unwrap();
//! digester.add_set_properties("root/item").unwrap();
//! digester.add_set_next("root/item", "addItem").unwrap();
//!
//! let root = digester
//!     .parse_str(r#"<root><item name="a"/><item name="b"/></root>"#)
//!     .unwrap()
//!     .unwrap();
//!
//! let root = root.borrow::<Record>().unwrap();
//! let names: Vec<String> = root
//!     .children_named("item")
//!     .map(|item| item.borrow::<Record>().unwrap().get("name").unwrap().to_string())
//!     .collect();
//! assert_eq!(names, ["a", "b"]);
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Constants, pattern and type name validation, options
//! - [`error`]: Error types and Result alias
//! - [`object`]: Name-based dispatch for bindable types
//! - [`convert`]: Scalar conversion of raw strings
//! - [`loader`]: Type registry used by object-create rules
//! - [`types`]: Generic [`Record`] type
//! - [`registry`]: Pattern registry, rule trait and built-in rules
//! - [`digester`]: The event-driven digester
//! - [`xml`]: XML event source
//! - [`yaml`]: Declarative rule files and YAML output
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod convert;
pub mod digester;
pub mod error;
pub mod loader;
pub mod object;
pub mod registry;
pub mod types;
pub mod xml;
pub mod yaml;

// Re-export commonly used items
pub use config::DigesterConfig;
pub use convert::ScalarKind;
pub use digester::Digester;
pub use error::{DigestError, Result};
pub use loader::TypeRegistry;
pub use object::{Args, Bindable, Members, ObjectRef, Value};
pub use registry::{Attributes, Rule, RuleSet, Rules};
pub use types::Record;
pub use yaml::RuleFile;
