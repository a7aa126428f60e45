//! Type registry resolving qualified type names to constructors.

use std::collections::HashMap;

use crate::config::{simple_class_name, validate_class_name};
use crate::error::{DigestError, Result};
use crate::object::{Bindable, ObjectRef};
use crate::types::Record;

type Constructor = fn() -> ObjectRef;

fn construct<T: Bindable + Default>() -> ObjectRef {
    ObjectRef::new(T::default())
}

/// Registry mapping type names to constructors.
///
/// Object-create rules resolve their type name here. A name is looked up as
/// given first, then by its last `::` segment, so `app::config::Server`
/// finds a type registered as `Server`.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    constructors: HashMap<String, Constructor>,
}

impl TypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register `T` under `name`, replacing any earlier registration.
    ///
    /// # Errors
    /// `IllegalClassName` if `name` is not a valid qualified name.
    pub fn register<T: Bindable + Default>(&mut self, name: &str) -> Result<()> {
        validate_class_name(name)?;
        self.constructors.insert(name.to_string(), construct::<T>);
        Ok(())
    }

    /// Check if a name resolves to a registered type.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Resolve a type name and instantiate it.
    ///
    /// # Errors
    /// * `IllegalClassName` if `name` is not a valid qualified name
    /// * `ClassNotFound` if no type is registered under it
    pub fn instantiate(&self, name: &str) -> Result<ObjectRef> {
        validate_class_name(name)?;
        let constructor = self
            .lookup(name)
            .ok_or_else(|| DigestError::ClassNotFound(name.to_string()))?;
        Ok(constructor())
    }

    /// Return all registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn lookup(&self, name: &str) -> Option<Constructor> {
        self.constructors
            .get(name)
            .or_else(|| self.constructors.get(simple_class_name(name)))
            .copied()
    }
}

impl Default for TypeRegistry {
    /// A registry that knows the generic [`Record`] type.
    fn default() -> Self {
        let mut registry = Self::new();
        registry
            .constructors
            .insert(Record::TYPE_NAME.to_string(), construct::<Record>);
        registry
    }
}
