//! Generic record type for digesting documents without dedicated types.
//!
//! A [`Record`] accepts every property and every method. It is what the
//! command-line tool builds, and a convenient target when a rule set only
//! needs to capture the shape of a document.

use std::sync::LazyLock;

use crate::object::{Args, Bindable, Members, ObjectRef, Value};

/// Dispatch table accepting any member name.
static RECORD_MEMBERS: LazyLock<Members> = LazyLock::new(|| {
    Members::builder::<Record>(Record::TYPE_NAME)
        .any_property(|record, name, value| {
            record.set(name, value);
            Ok(())
        })
        .any_method(|record, name, args| {
            record.apply(name, args);
            Ok(())
        })
        .build()
});

/// Open-ended object: ordered string properties plus ordered named children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    properties: Vec<(String, String)>,
    children: Vec<(String, ObjectRef)>,
}

impl Record {
    /// Name under which records are registered by default.
    pub const TYPE_NAME: &'static str = "Record";

    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, keeping the position of an earlier value.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.properties.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.properties.push((name.to_string(), value.to_string())),
        }
    }

    /// Get a property value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// All properties in the order they were first set.
    #[must_use]
    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    /// All children in the order they were added.
    #[must_use]
    pub fn children(&self) -> &[(String, ObjectRef)] {
        &self.children
    }

    /// Children added under `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ObjectRef> {
        self.children
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, child)| child)
    }

    /// Apply a method call.
    ///
    /// Object arguments become children, scalar arguments become a property
    /// (joined with `,` when there are several) and a call without arguments
    /// sets the property to `true`. The member name is derived from the
    /// method name with an `add`/`set` prefix removed.
    pub fn apply(&mut self, method: &str, args: &Args) {
        let name = member_name(method);

        let mut scalars: Vec<String> = Vec::new();
        for value in args.values() {
            match value {
                Value::Object(child) => self.children.push((name.clone(), child.clone())),
                scalar => scalars.push(scalar.to_string()),
            }
        }

        if args.is_empty() {
            self.set(&name, "true");
        } else if !scalars.is_empty() {
            self.set(&name, &scalars.join(","));
        }
    }
}

impl Bindable for Record {
    fn members() -> &'static Members {
        &RECORD_MEMBERS
    }
}

/// Derive a member name from a method name: `addServer` becomes `server`.
fn member_name(method: &str) -> String {
    let stripped = ["add", "set"]
        .iter()
        .find_map(|prefix| {
            method
                .strip_prefix(prefix)
                .filter(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()))
        })
        .unwrap_or(method);

    let mut chars = stripped.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_name() {
        assert_eq!(member_name("addServer"), "server");
        assert_eq!(member_name("setPort"), "port");
        assert_eq!(member_name("address"), "address");
        assert_eq!(member_name("settings"), "settings");
        assert_eq!(member_name("Title"), "title");
    }

    #[test]
    fn test_record_properties_keep_order() {
        let record = ObjectRef::new(Record::new());
        record.set_property("name", "a").unwrap();
        record.set_property("kind", "b").unwrap();
        record.set_property("name", "c").unwrap();

        let record = record.borrow::<Record>().unwrap();
        assert_eq!(
            record.properties(),
            &[
                ("name".to_string(), "c".to_string()),
                ("kind".to_string(), "b".to_string())
            ]
        );
    }

    #[test]
    fn test_record_accepts_any_method() {
        let parent = ObjectRef::new(Record::new());
        let child = ObjectRef::new(Record::new());

        parent
            .invoke("addItem", &Args::new("addItem", vec![Value::Object(child.clone())]))
            .unwrap();
        parent
            .invoke("setPort", &Args::new("setPort", vec![Value::Int(80)]))
            .unwrap();
        parent.invoke("enable", &Args::new("enable", vec![])).unwrap();

        let parent = parent.borrow::<Record>().unwrap();
        assert_eq!(parent.children_named("item").count(), 1);
        assert_eq!(parent.get("port"), Some("80"));
        assert_eq!(parent.get("enable"), Some("true"));
    }
}
