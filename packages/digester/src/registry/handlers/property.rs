//! Property binding rules.
//!
//! These rules copy XML attributes onto the object at the top of the stack
//! when their element opens.

use crate::digester::Digester;
use crate::error::{DigestError, Result};
use crate::registry::handler::Rule;
use crate::registry::types::Attributes;

/// Rule that sets one property per attribute on the top object.
///
/// Attribute names map to property names of the same name, unless a
/// positional remapping is configured: `attribute_names[i]` maps to
/// `property_names[i]`. An attribute remapped past the end of the property
/// list, or onto an empty name, is dropped.
pub struct SetPropertiesRule {
    attribute_names: Vec<String>,
    property_names: Vec<String>,
    ignore_missing_property: bool,
}

impl SetPropertiesRule {
    /// Create a rule mapping attributes to properties of the same name.
    #[must_use]
    pub fn new() -> Self {
        Self {
            attribute_names: Vec::new(),
            property_names: Vec::new(),
            ignore_missing_property: true,
        }
    }

    /// Create a rule with a positional attribute → property remapping.
    pub fn with_mapping<A, P>(attribute_names: A, property_names: P) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            attribute_names: attribute_names.into_iter().map(Into::into).collect(),
            property_names: property_names.into_iter().map(Into::into).collect(),
            ignore_missing_property: true,
        }
    }

    /// Fail with `NoSuchProperty` instead of skipping unknown attributes.
    #[must_use]
    pub fn with_ignore_missing_property(mut self, ignore: bool) -> Self {
        self.ignore_missing_property = ignore;
        self
    }

    /// Check if unknown attributes are skipped.
    #[must_use]
    pub fn ignores_missing_property(&self) -> bool {
        self.ignore_missing_property
    }

    /// Resolve the property name for an attribute, `None` if it is dropped.
    fn property_name<'a>(&'a self, attribute: &'a str) -> Option<&'a str> {
        match self.attribute_names.iter().position(|name| name == attribute) {
            Some(index) => self
                .property_names
                .get(index)
                .map(String::as_str)
                .filter(|name| !name.is_empty()),
            None => Some(attribute),
        }
    }
}

impl Default for SetPropertiesRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for SetPropertiesRule {
    fn begin(&self, digester: &mut Digester, attributes: &Attributes) -> Result<()> {
        let Some(top) = digester.peek(0) else {
            tracing::debug!(path = %digester.current_path(), "No object to set properties on");
            return Ok(());
        };

        for (attribute, value) in attributes.iter() {
            let Some(name) = self.property_name(attribute) else {
                continue;
            };

            if !top.members().has_property(name) {
                if self.ignore_missing_property {
                    tracing::debug!(
                        path = %digester.current_path(),
                        class = %top.type_name(),
                        property = %name,
                        "Skipping unknown property"
                    );
                    continue;
                }
                return Err(DigestError::NoSuchProperty {
                    type_name: top.type_name().to_string(),
                    property: name.to_string(),
                });
            }

            tracing::debug!(
                path = %digester.current_path(),
                property = %name,
                value = %value,
                "Setting property"
            );
            top.set_property(name, value)?;
        }

        Ok(())
    }

    fn describe(&self) -> String {
        "SetPropertiesRule[]".to_string()
    }
}

/// Rule that sets a single property whose name and value both come from
/// attributes.
///
/// For `<param name="port" value="80"/>` with `SetPropertyRule::new("name",
/// "value")` the top object's `port` property is set to `80`.
pub struct SetPropertyRule {
    name: String,
    value: String,
}

impl SetPropertyRule {
    /// Create a rule reading the property name from attribute `name` and
    /// the value from attribute `value`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Rule for SetPropertyRule {
    fn begin(&self, digester: &mut Digester, attributes: &Attributes) -> Result<()> {
        let property = attributes.get(&self.name).unwrap_or_default();
        let value = attributes.get(&self.value).unwrap_or_default();

        let Some(top) = digester.peek(0) else {
            tracing::debug!(path = %digester.current_path(), "No object to set property on");
            return Ok(());
        };

        tracing::debug!(
            path = %digester.current_path(),
            class = %top.type_name(),
            property = %property,
            value = %value,
            "Setting property"
        );
        top.set_property(property, value)
    }

    fn describe(&self) -> String {
        format!("SetPropertyRule[name={}, value={}]", self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Bindable, Members, ObjectRef};
    use std::sync::LazyLock;

    #[derive(Default)]
    struct Address {
        city: String,
        country: String,
    }

    static ADDRESS_MEMBERS: LazyLock<Members> = LazyLock::new(|| {
        Members::builder::<Address>("Address")
            .property("city", |address, value| {
                address.city = value.to_string();
                Ok(())
            })
            .property("country", |address, value| {
                address.country = value.to_string();
                Ok(())
            })
            .build()
    });

    impl Bindable for Address {
        fn members() -> &'static Members {
            &ADDRESS_MEMBERS
        }
    }

    fn digester_with_address() -> (Digester, ObjectRef) {
        let mut digester = Digester::new();
        let address = ObjectRef::new(Address::default());
        digester.push(address.clone());
        (digester, address)
    }

    #[test]
    fn test_set_properties_by_name() {
        let (mut digester, address) = digester_with_address();
        let attributes: Attributes = [("city", "Utrecht"), ("country", "NL")].into_iter().collect();

        SetPropertiesRule::new()
            .begin(&mut digester, &attributes)
            .unwrap();

        let address = address.borrow::<Address>().unwrap();
        assert_eq!(address.city, "Utrecht");
        assert_eq!(address.country, "NL");
    }

    #[test]
    fn test_set_properties_with_mapping() {
        let (mut digester, address) = digester_with_address();
        let attributes: Attributes =
            [("alt-city", "Paris"), ("country", "FR")].into_iter().collect();

        SetPropertiesRule::with_mapping(["alt-city"], ["city"])
            .begin(&mut digester, &attributes)
            .unwrap();

        let address = address.borrow::<Address>().unwrap();
        assert_eq!(address.city, "Paris");
        assert_eq!(address.country, "FR");
    }

    #[test]
    fn test_set_properties_mapping_drops_unmatched() {
        let (mut digester, address) = digester_with_address();
        let attributes: Attributes = [("city", "Gouda"), ("country", "NL")].into_iter().collect();

        SetPropertiesRule::with_mapping(["city", "country"], ["", "country"])
            .with_ignore_missing_property(false)
            .begin(&mut digester, &attributes)
            .unwrap();

        let address = address.borrow::<Address>().unwrap();
        assert_eq!(address.city, "");
        assert_eq!(address.country, "NL");
    }

    #[test]
    fn test_set_properties_missing_property() {
        let (mut digester, _) = digester_with_address();
        let attributes: Attributes = [("zip", "1234AB")].into_iter().collect();

        let ignoring = SetPropertiesRule::new();
        assert!(ignoring.ignores_missing_property());
        assert!(ignoring.begin(&mut digester, &attributes).is_ok());

        let strict = SetPropertiesRule::new().with_ignore_missing_property(false);
        let err = strict.begin(&mut digester, &attributes).unwrap_err();
        assert!(matches!(err, DigestError::NoSuchProperty { property, .. } if property == "zip"));
    }

    #[test]
    fn test_set_properties_without_object() {
        let mut digester = Digester::new();
        let attributes: Attributes = [("city", "Delft")].into_iter().collect();

        assert!(SetPropertiesRule::new()
            .begin(&mut digester, &attributes)
            .is_ok());
    }

    #[test]
    fn test_set_property_from_attributes() {
        let (mut digester, address) = digester_with_address();
        let attributes: Attributes = [("name", "city"), ("value", "Leiden")].into_iter().collect();

        SetPropertyRule::new("name", "value")
            .begin(&mut digester, &attributes)
            .unwrap();

        assert_eq!(address.borrow::<Address>().unwrap().city, "Leiden");
    }

    #[test]
    fn test_set_property_unknown() {
        let (mut digester, _) = digester_with_address();
        let attributes: Attributes = [("name", "street"), ("value", "Dam")].into_iter().collect();

        let err = SetPropertyRule::new("name", "value")
            .begin(&mut digester, &attributes)
            .unwrap_err();
        assert!(matches!(err, DigestError::NoSuchProperty { .. }));
    }
}
