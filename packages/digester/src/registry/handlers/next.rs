//! Parent/child linking rule.

use crate::digester::Digester;
use crate::error::{DigestError, Result};
use crate::object::{Args, Value};
use crate::registry::handler::Rule;

/// Rule that passes the top object to a method on the object below it.
///
/// Fires when the element closes, before object-create rules registered
/// earlier for the same pattern pop the child. Neither object is removed.
pub struct SetNextRule {
    method_name: String,
}

impl SetNextRule {
    /// Create a rule calling `method_name` on the parent.
    pub fn new(method_name: impl Into<String>) -> Self {
        Self {
            method_name: method_name.into(),
        }
    }
}

impl Rule for SetNextRule {
    fn end(&self, digester: &mut Digester) -> Result<()> {
        let (Some(child), Some(parent)) = (digester.peek(0), digester.peek(1)) else {
            tracing::debug!(
                path = %digester.current_path(),
                method = %self.method_name,
                "No parent/child pair to link"
            );
            return Ok(());
        };

        if !parent.members().has_method(&self.method_name) {
            return Err(DigestError::NoSuchMethod {
                type_name: parent.type_name().to_string(),
                method: self.method_name.clone(),
            });
        }

        tracing::debug!(
            path = %digester.current_path(),
            parent = %parent.type_name(),
            child = %child.type_name(),
            method = %self.method_name,
            "Linking child"
        );
        parent.invoke(
            &self.method_name,
            &Args::new(&self.method_name, vec![Value::Object(child)]),
        )
    }

    fn describe(&self) -> String {
        format!("SetNextRule[methodName={}]", self.method_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Bindable, Members, ObjectRef};
    use crate::types::Record;
    use std::sync::LazyLock;

    #[test]
    fn test_links_child_to_parent() {
        let mut digester = Digester::new();
        let parent = ObjectRef::new(Record::new());
        let child = ObjectRef::new(Record::new());
        digester.push(parent.clone());
        digester.push(child.clone());

        SetNextRule::new("addItem").end(&mut digester).unwrap();

        assert_eq!(digester.count(), 2);
        let parent = parent.borrow::<Record>().unwrap();
        let items: Vec<&ObjectRef> = parent.children_named("item").collect();
        assert_eq!(items, vec![&child]);
    }

    #[test]
    fn test_missing_parent_is_ignored() {
        let mut digester = Digester::new();
        digester.push(ObjectRef::new(Record::new()));

        assert!(SetNextRule::new("addItem").end(&mut digester).is_ok());
    }

    #[derive(Default)]
    struct Sealed;

    static SEALED_MEMBERS: LazyLock<Members> =
        LazyLock::new(|| Members::builder::<Sealed>("Sealed").build());

    impl Bindable for Sealed {
        fn members() -> &'static Members {
            &SEALED_MEMBERS
        }
    }

    #[test]
    fn test_parent_without_method() {
        let mut digester = Digester::new();
        digester.push(ObjectRef::new(Sealed));
        digester.push(ObjectRef::new(Record::new()));

        let err = SetNextRule::new("addItem").end(&mut digester).unwrap_err();
        assert!(matches!(err, DigestError::NoSuchMethod { method, .. } if method == "addItem"));
    }
}
