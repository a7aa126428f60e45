//! Object creation rules.
//!
//! Both rules push a new object when their element opens and pop it again
//! when the element closes, so the object is the stack top for every rule
//! fired by the element's descendants.

use crate::digester::Digester;
use crate::error::Result;
use crate::object::ObjectRef;
use crate::registry::handler::Rule;
use crate::registry::types::Attributes;

/// Rule that instantiates a registered type by name.
///
/// When an attribute name is configured and the element carries that
/// attribute, its value overrides the type name.
pub struct ObjectCreateRule {
    class_name: String,
    attribute_name: Option<String>,
}

impl ObjectCreateRule {
    /// Create a rule instantiating `class_name`.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            attribute_name: None,
        }
    }

    /// Let the attribute `attribute_name` override the type name.
    #[must_use]
    pub fn with_attribute(mut self, attribute_name: impl Into<String>) -> Self {
        self.attribute_name = Some(attribute_name.into());
        self
    }
}

impl Rule for ObjectCreateRule {
    fn begin(&self, digester: &mut Digester, attributes: &Attributes) -> Result<()> {
        let class_name = self
            .attribute_name
            .as_deref()
            .and_then(|name| attributes.get(name))
            .unwrap_or(&self.class_name);

        tracing::debug!(path = %digester.current_path(), class = %class_name, "New object");

        let object = digester.types().instantiate(class_name)?;
        digester.push(object);
        Ok(())
    }

    fn end(&self, digester: &mut Digester) -> Result<()> {
        if let Some(top) = digester.pop() {
            tracing::debug!(path = %digester.current_path(), class = %top.type_name(), "Pop object");
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "ObjectCreateRule[className={}, attributeName={}]",
            self.class_name,
            self.attribute_name.as_deref().unwrap_or_default()
        )
    }
}

/// Factory used by [`FactoryCreateRule`] to build objects from attributes.
pub trait ObjectCreationFactory {
    /// Create the object for an element with these attributes.
    fn create_object(&self, digester: &Digester, attributes: &Attributes) -> Result<ObjectRef>;
}

impl<F> ObjectCreationFactory for F
where
    F: Fn(&Attributes) -> Result<ObjectRef>,
{
    fn create_object(&self, _digester: &Digester, attributes: &Attributes) -> Result<ObjectRef> {
        self(attributes)
    }
}

/// Rule that delegates object creation to an [`ObjectCreationFactory`].
pub struct FactoryCreateRule {
    factory: Box<dyn ObjectCreationFactory>,
}

impl FactoryCreateRule {
    /// Create a rule using `factory`.
    pub fn new(factory: impl ObjectCreationFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
        }
    }
}

impl Rule for FactoryCreateRule {
    fn begin(&self, digester: &mut Digester, attributes: &Attributes) -> Result<()> {
        let object = self.factory.create_object(digester, attributes)?;
        tracing::debug!(path = %digester.current_path(), class = %object.type_name(), "New object");
        digester.push(object);
        Ok(())
    }

    fn end(&self, digester: &mut Digester) -> Result<()> {
        if let Some(top) = digester.pop() {
            tracing::debug!(path = %digester.current_path(), class = %top.type_name(), "Pop object");
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "FactoryCreateRule[]".to_string()
    }
}
